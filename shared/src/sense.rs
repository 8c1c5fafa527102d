// Current sense: shunt resistor into one ADC channel

/// Source of raw ADC codes for the current sense input.
pub trait CurrentSensor {
    fn read_raw(&mut self) -> u16;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub reference_v: f32,
    /// ADC code at `reference_v`.
    pub max_code: f32,
    pub shunt_ohms: f32,
    /// Raw reads averaged per measurement. 1 means no filtering.
    pub samples: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reference_v: 3.3,
            max_code: 4095.0,
            shunt_ohms: 0.15,
            samples: 1,
        }
    }
}

impl Config {
    pub fn volts(&self, raw: f32) -> f32 {
        raw * self.reference_v / self.max_code
    }

    pub fn amps(&self, raw: f32) -> f32 {
        self.volts(raw) / self.shunt_ohms
    }

    /// Takes `samples` reads (at least one) and converts their mean to amps.
    pub fn measure<S: CurrentSensor>(&self, sensor: &mut S) -> f32 {
        let samples = self.samples.max(1) as u32;
        let mut sum: u32 = 0;
        for _ in 0..samples {
            sum += sensor.read_raw() as u32;
        }
        self.amps(sum as f32 / samples as f32)
    }
}
