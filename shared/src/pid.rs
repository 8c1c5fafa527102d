/// Fixed controller gains and limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Upper clamp of the output, the actuator's full scale.
    pub output_max: f32,
    /// Substituted for any elapsed time that is not strictly positive.
    pub min_dt_s: f32,
}

impl Config {
    pub const LOAD_CURRENT: Self = Self {
        kp: 0.7,
        ki: 0.01,
        kd: 0.0001,
        output_max: 255.0,
        min_dt_s: 0.001,
    };
}

impl Default for Config {
    fn default() -> Self {
        Self::LOAD_CURRENT
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Pid {
    pub config: Config,

    pub target: f32,

    pub p: f32,
    /// Integral accumulator (error * seconds). Never clamped on its own.
    pub i: f32,
    pub d: f32,

    pub prev_error: f32,
    pub last_ms: u32,

    pub output: f32,
}

impl Pid {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Runs one step using the time elapsed since the previous call.
    pub fn update(&mut self, measured: f32, target: f32, now_ms: u32) -> u8 {
        let dt_s = now_ms.wrapping_sub(self.last_ms) as f32 / 1000.0;
        self.last_ms = now_ms;
        self.step(measured, target, dt_s)
    }

    /// Runs one step with an explicit elapsed time in seconds.
    pub fn step(&mut self, measured: f32, target: f32, dt_s: f32) -> u8 {
        let cfg = &self.config;
        // Also catches NaN.
        let dt_s = if dt_s > 0.0 { dt_s } else { cfg.min_dt_s };

        self.target = target;
        let error = self.target - measured;

        self.i += error * dt_s;
        let derivative = (error - self.prev_error) / dt_s;

        self.p = cfg.kp * error;
        self.d = cfg.kd * derivative;

        let output = self.p + cfg.ki * self.i + self.d;
        self.output = if output.is_nan() {
            0.0
        } else {
            output.clamp(0.0, cfg.output_max)
        };
        self.prev_error = error;

        self.output as u8
    }

    /// Clears the controller memory. The sample timestamp is kept.
    pub fn reset(&mut self) {
        self.target = 0.0;

        self.p = 0.0;
        self.i = 0.0;
        self.d = 0.0;
        self.prev_error = 0.0;

        self.output = 0.0;
    }
}
