// One-line status report printed by the firmware and parsed by the telemetry bridge.
//
//   target=2.50A measured=2.48A load=on mode=CC duty=42

use core::fmt;
use core::str::FromStr;

use crate::state::Mode;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Status {
    pub target_a: f32,
    pub measured_a: f32,
    pub load_enabled: bool,
    pub mode: Mode,
    pub duty: u8,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "target={:.2}A measured={:.2}A load={} mode={} duty={}",
            self.target_a,
            self.measured_a,
            if self.load_enabled { "on" } else { "off" },
            self.mode,
            self.duty
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    MissingField(&'static str),
    InvalidValue(&'static str),
    UnknownMode,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingField(field) => write!(f, "status line has no `{field}` field"),
            ParseError::InvalidValue(field) => write!(f, "status field `{field}` is malformed"),
            ParseError::UnknownMode => f.write_str("status line names an unknown mode"),
        }
    }
}

impl core::error::Error for ParseError {}

const FIELDS: [&str; 5] = ["target", "measured", "load", "mode", "duty"];

impl FromStr for Status {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut values: [Option<&str>; 5] = [None; 5];
        for pair in line.split_whitespace() {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            if let Some(slot) = FIELDS.iter().position(|f| *f == key) {
                values[slot] = Some(value);
            }
        }

        let field = |slot: usize| values[slot].ok_or(ParseError::MissingField(FIELDS[slot]));

        let amps = |slot: usize| -> Result<f32, ParseError> {
            field(slot)?
                .strip_suffix('A')
                .and_then(|v| v.parse().ok())
                .ok_or(ParseError::InvalidValue(FIELDS[slot]))
        };

        let load_enabled = match field(2)? {
            "on" | "1" => true,
            "off" | "0" => false,
            _ => return Err(ParseError::InvalidValue(FIELDS[2])),
        };

        Ok(Status {
            target_a: amps(0)?,
            measured_a: amps(1)?,
            load_enabled,
            mode: Mode::from_label(field(3)?).ok_or(ParseError::UnknownMode)?,
            duty: field(4)?
                .parse()
                .map_err(|_| ParseError::InvalidValue(FIELDS[4]))?,
        })
    }
}
