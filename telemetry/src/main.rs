use chrono::{DateTime, Utc};
use eload_shared::status::Status;
use influxdb::{Client, InfluxDbWriteable, WriteQuery};
use std::error::Error;
use std::io::{self, BufRead, ErrorKind};
use std::time::Duration;

const DATABASE: &str = "eload";
const MEASUREMENT: &str = "eload";

// Readings per write, and how many may pile up while the server is away
const BATCH_SIZE: usize = 20;
const MAX_BACKLOG: usize = 1000;

#[derive(Clone, Debug, PartialEq, InfluxDbWriteable)]
pub struct Reading {
    time: DateTime<Utc>,

    #[influxdb(tag)]
    mode: String,

    target_a: f64,
    measured_a: f64,
    load_enabled: bool,
    duty: u32,
}

impl Reading {
    fn new(status: &Status, time: DateTime<Utc>) -> Self {
        Reading {
            time,
            mode: status.mode.to_string(),
            target_a: status.target_a as f64,
            measured_a: status.measured_a as f64,
            load_enabled: status.load_enabled,
            duty: status.duty as u32,
        }
    }

    /// Status lines become readings, anything else the firmware prints is not one.
    fn from_line(line: &str, time: DateTime<Utc>) -> Option<Self> {
        line.trim()
            .parse::<Status>()
            .ok()
            .map(|status| Reading::new(&status, time))
    }
}

#[derive(Default)]
struct Backlog {
    queries: Vec<WriteQuery>,
}

impl Backlog {
    fn push(&mut self, reading: Reading) {
        self.queries.push(reading.into_query(MEASUREMENT));
    }

    fn ready(&self) -> bool {
        self.queries.len() >= BATCH_SIZE
    }

    fn exhausted(&self) -> bool {
        self.queries.len() >= MAX_BACKLOG
    }

    fn len(&self) -> usize {
        self.queries.len()
    }
}

#[derive(Debug, PartialEq)]
enum Line {
    Complete(String),
    /// Timed out mid-line; the bytes so far stay in the buffer.
    Pending,
    Closed,
}

/// Reads up to the next newline. Bytes that are not UTF-8, which show up while
/// the device boots or re-enumerates, are replaced instead of failing the read.
fn next_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Line> {
    match reader.read_until(b'\n', buf) {
        Ok(0) if buf.is_empty() => Ok(Line::Closed),
        Ok(_) => {
            let line = String::from_utf8_lossy(buf).into_owned();
            buf.clear();
            Ok(Line::Complete(line))
        }
        Err(e) if e.kind() == ErrorKind::TimedOut => Ok(Line::Pending),
        Err(e) => Err(e),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let token = std::env::var("INFLUX_TOKEN")?;
    let ip = std::env::var("INFLUX_IP")?;
    let client = Client::new(ip, DATABASE).with_token(token);

    let port_name = match std::env::var("ELOAD_PORT") {
        Ok(name) => name,
        Err(_) => find_port()?.ok_or("ESP32 not found")?,
    };
    println!("ESP32 @ {}", port_name);

    // Baudrate doesn't matter because this port is CDC
    let port = serialport::new(&port_name, 1_000_000)
        .timeout(Duration::from_millis(1000))
        .open()?;

    let mut reader = std::io::BufReader::new(port);
    let mut backlog = Backlog::default();
    let mut buf = Vec::new();

    loop {
        let line = match next_line(&mut reader, &mut buf)? {
            Line::Complete(line) => line,
            Line::Pending => continue,
            Line::Closed => return Err(format!("{} closed", port_name).into()),
        };

        match Reading::from_line(&line, Utc::now()) {
            Some(reading) => backlog.push(reading),
            None => println!("{}", line.trim()), // pass through normal print statements
        }

        if backlog.ready() {
            if let Err(e) = client.query(&backlog.queries).await {
                if backlog.exhausted() {
                    println!("Too many failed write attempts ({} readings): {}", backlog.len(), e);
                    println!("\x07"); // terminal bell
                    std::process::exit(1);
                }
                println!("Write failed, continuing... ({})", e);
            } else {
                backlog.queries.clear();
            }
        }
    }
}

fn find_port() -> Result<Option<String>, serialport::Error> {
    let port = serialport::available_ports()?
        .into_iter()
        .find(|p| match &p.port_type {
            serialport::SerialPortType::UsbPort(usb_port) => usb_port
                .manufacturer
                .as_deref()
                .is_some_and(|m| m.eq_ignore_ascii_case("espressif")),
            _ => false,
        });
    Ok(port.map(|p| p.port_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::{BufReader, Read};

    const STATUS: &str = "target=1.00A measured=0.00A load=off mode=CC duty=0";

    /// Serial port stand-in: hands out one scripted chunk or error per read.
    struct Serial(VecDeque<io::Result<Vec<u8>>>);

    impl Read for Serial {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                None => Ok(0),
                Some(Err(e)) => Err(e),
                Some(Ok(chunk)) => {
                    out[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
            }
        }
    }

    fn lines<R: BufRead>(reader: &mut R) -> Vec<Line> {
        let mut buf = Vec::new();
        let mut seen = Vec::new();
        loop {
            match next_line(reader, &mut buf).unwrap() {
                Line::Closed => return seen,
                line => seen.push(line),
            }
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn status_lines_become_readings() {
        let reading =
            Reading::from_line("target=2.50A measured=2.48A load=on mode=CC duty=42\r\n", now())
                .unwrap();
        assert_eq!(reading.mode, "CC");
        assert_eq!(reading.target_a, 2.5);
        assert!((reading.measured_a - 2.48).abs() < 1e-6);
        assert!(reading.load_enabled);
        assert_eq!(reading.duty, 42);
        assert_eq!(reading.time, now());
    }

    #[test]
    fn other_lines_pass_through() {
        assert_eq!(Reading::from_line("booted!\n", now()), None);
        assert_eq!(Reading::from_line("panel: display write failed: BusWriteError\n", now()), None);
        assert_eq!(Reading::from_line("\n", now()), None);
    }

    #[test]
    fn backlog_writes_in_batches_and_gives_up_when_full() {
        let reading = Reading::from_line("target=1.00A measured=0.00A load=off mode=CC duty=0", now())
            .unwrap();
        let mut backlog = Backlog::default();

        for _ in 0..BATCH_SIZE - 1 {
            backlog.push(reading.clone());
        }
        assert!(!backlog.ready());
        backlog.push(reading.clone());
        assert!(backlog.ready());
        assert!(!backlog.exhausted());

        while backlog.len() < MAX_BACKLOG {
            backlog.push(reading.clone());
        }
        assert!(backlog.exhausted());
    }

    #[test]
    fn garbled_bytes_do_not_stop_the_bridge() {
        let mut input = b"\xff\xfe\x80boot\n".to_vec();
        input.extend_from_slice(STATUS.as_bytes());
        input.push(b'\n');

        let seen = lines(&mut BufReader::new(input.as_slice()));
        assert_eq!(seen.len(), 2);

        let Line::Complete(noise) = &seen[0] else {
            panic!("expected a line, got {:?}", seen[0]);
        };
        assert!(noise.ends_with("boot\n"));
        assert_eq!(Reading::from_line(noise, now()), None);

        let Line::Complete(status) = &seen[1] else {
            panic!("expected a line, got {:?}", seen[1]);
        };
        let reading = Reading::from_line(status, now()).unwrap();
        assert_eq!(reading.target_a, 1.0);
        assert!(!reading.load_enabled);
    }

    #[test]
    fn timeout_keeps_the_partial_line() {
        let (head, tail) = STATUS.split_at(20);
        let mut serial = BufReader::new(Serial(VecDeque::from([
            Ok(head.as_bytes().to_vec()),
            Err(io::Error::from(ErrorKind::TimedOut)),
            Ok(format!("{}\n", tail).into_bytes()),
        ])));

        let seen = lines(&mut serial);
        assert_eq!(
            seen,
            [Line::Pending, Line::Complete(format!("{}\n", STATUS))]
        );
    }

    #[test]
    fn other_read_errors_still_fail() {
        let mut serial = BufReader::new(Serial(VecDeque::from([Err(io::Error::from(
            ErrorKind::BrokenPipe,
        ))])));
        let mut buf = Vec::new();
        let err = next_line(&mut serial, &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }
}
