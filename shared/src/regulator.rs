//! Constant-current regulation step, run once per regulator tick.
//!
//! Disabled  --load on-->  Regulating  --load off-->  Disabled
//!
//! While disabled the controller memory is cleared on every tick, not just
//! on the transition, and the load output is held at zero.

use core::fmt;

use embedded_hal::pwm::SetDutyCycle;

use crate::pid::{self, Pid};
use crate::sense::{self, CurrentSensor};
use crate::state::RegulatorPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<P> {
    /// The load output rejected the duty write.
    Load(P),
}

impl<P: fmt::Debug> fmt::Display for Error<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Load(e) => write!(f, "load output write failed: {e:?}"),
        }
    }
}

pub struct Regulator {
    pub pid: Pid,
    pub sense: sense::Config,
}

impl Regulator {
    pub fn new(pid: pid::Config, sense: sense::Config) -> Self {
        Self {
            pid: Pid::new(pid),
            sense,
        }
    }

    /// Measures, regulates and writes the load output. Returns the duty
    /// level (out of 255) that was applied.
    pub fn tick<S: CurrentSensor, P: SetDutyCycle>(
        &mut self,
        port: &RegulatorPort<'_>,
        sensor: &mut S,
        load: &mut P,
        now_ms: u32,
    ) -> Result<u8, Error<P::Error>> {
        let measured = self.sense.measure(sensor);
        port.set_measured_a(measured);

        let duty = if port.load_enabled() {
            self.pid.update(measured, port.target_a(), now_ms)
        } else {
            self.pid.reset();
            0
        };

        port.set_duty(duty);
        load.set_duty_cycle_fraction(duty as u16, u8::MAX as u16)
            .map_err(Error::Load)?;
        Ok(duty)
    }
}

impl Default for Regulator {
    fn default() -> Self {
        Self::new(pid::Config::default(), sense::Config::default())
    }
}
