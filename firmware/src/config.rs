// Board wiring and task timing

// ADC1 inputs: GPIO0 joystick X, GPIO1 joystick Y, GPIO2 shunt amplifier
// LEDC outputs: GPIO3 load MOSFET gate, GPIO4 load-on LED, GPIO5 buzzer
// Buttons to ground: GPIO6 load, GPIO7 confirm, GPIO9 back
// SSD1306 at 0x3C: GPIO10 SDA, GPIO8 SCL

pub const REGULATOR_PERIOD_MS: u64 = 1;
pub const PANEL_PERIOD_MS: u64 = 100;
pub const STATUS_PERIOD_MS: u64 = 1_000;

// How long a dead display stays on the console before we give up
pub const DISPLAY_FAULT_HOLD_MS: u32 = 20_000;

pub const I2C_FREQUENCY_KHZ: u32 = 400;

// 8 bit duty so one PWM step is one controller output level
pub const LOAD_PWM_FREQUENCY_KHZ: u32 = 20;
pub const INDICATOR_PWM_FREQUENCY_KHZ: u32 = 1;

pub const BUZZER_FREQUENCY_HZ: u32 = 2_500;
pub const BUZZER_DUTY_PCT: u8 = 2;
pub const BUZZER_BEEP_MS: u32 = 200;
