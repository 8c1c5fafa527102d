// LEDC outputs: load gate, indicator LED and buzzer

use embedded_hal::delay::DelayNs;
use embedded_hal::pwm::{ErrorType, SetDutyCycle};
use eload_shared::menu::Alert;
use esp_hal::gpio::OutputPin;
use esp_hal::ledc::channel::{self, ChannelIFace};
use esp_hal::ledc::timer::{self, TimerIFace};
use esp_hal::ledc::{Ledc, LowSpeed};
use esp_hal::peripheral::Peripheral;
use esp_hal::time::Rate;
use esp_println::println;
use static_cell::StaticCell;

use crate::config;

static LOAD_TIMER: StaticCell<timer::Timer<'static, LowSpeed>> = StaticCell::new();
static INDICATOR_TIMER: StaticCell<timer::Timer<'static, LowSpeed>> = StaticCell::new();
static BUZZER_TIMER: StaticCell<timer::Timer<'static, LowSpeed>> = StaticCell::new();

/// One LEDC channel, owned by exactly one RTIC task.
pub struct Pwm(channel::Channel<'static, LowSpeed>);

// SAFETY: the channel holds references to LEDC registers and its timer, which
// keeps it !Send. Each Pwm is moved into a single task once at init and the
// esp32c3 has one core, so its registers are never written concurrently.
unsafe impl Send for Pwm {}

impl ErrorType for Pwm {
    type Error = channel::Error;
}

impl SetDutyCycle for Pwm {
    fn max_duty_cycle(&self) -> u16 {
        self.0.max_duty_cycle()
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.0.set_duty_cycle(duty)
    }
}

pub struct Outputs {
    pub load: Pwm,
    pub indicator: Pwm,
    pub buzzer: Pwm,
}

#[derive(Debug)]
pub enum Error {
    Timer(timer::Error),
    Channel(channel::Error),
}

impl From<timer::Error> for Error {
    fn from(e: timer::Error) -> Self {
        Error::Timer(e)
    }
}

impl From<channel::Error> for Error {
    fn from(e: channel::Error) -> Self {
        Error::Channel(e)
    }
}

fn configure_timer(
    cell: &'static StaticCell<timer::Timer<'static, LowSpeed>>,
    ledc: &Ledc<'static>,
    number: timer::Number,
    duty: timer::config::Duty,
    frequency: Rate,
) -> Result<&'static timer::Timer<'static, LowSpeed>, Error> {
    let mut t = ledc.timer::<LowSpeed>(number);
    t.configure(timer::config::Config {
        duty,
        clock_source: timer::LSClockSource::APBClk,
        frequency,
    })?;
    Ok(cell.init(t))
}

fn configure_channel(
    ledc: &Ledc<'static>,
    number: channel::Number,
    timer: &'static timer::Timer<'static, LowSpeed>,
    pin: impl Peripheral<P = impl OutputPin> + 'static,
) -> Result<Pwm, Error> {
    let mut ch = ledc.channel(number, pin);
    ch.configure(channel::config::Config {
        timer,
        duty_pct: 0,
        pin_config: channel::config::PinConfig::PushPull,
    })?;
    Ok(Pwm(ch))
}

/// Brings up the three LEDC outputs, all starting at zero duty.
pub fn init(
    ledc: &Ledc<'static>,
    load_pin: impl Peripheral<P = impl OutputPin> + 'static,
    indicator_pin: impl Peripheral<P = impl OutputPin> + 'static,
    buzzer_pin: impl Peripheral<P = impl OutputPin> + 'static,
) -> Result<Outputs, Error> {
    let load_timer = configure_timer(
        &LOAD_TIMER,
        ledc,
        timer::Number::Timer0,
        timer::config::Duty::Duty8Bit,
        Rate::from_khz(config::LOAD_PWM_FREQUENCY_KHZ),
    )?;
    let indicator_timer = configure_timer(
        &INDICATOR_TIMER,
        ledc,
        timer::Number::Timer1,
        timer::config::Duty::Duty8Bit,
        Rate::from_khz(config::INDICATOR_PWM_FREQUENCY_KHZ),
    )?;
    let buzzer_timer = configure_timer(
        &BUZZER_TIMER,
        ledc,
        timer::Number::Timer2,
        timer::config::Duty::Duty10Bit,
        Rate::from_hz(config::BUZZER_FREQUENCY_HZ),
    )?;

    Ok(Outputs {
        load: configure_channel(ledc, channel::Number::Channel0, load_timer, load_pin)?,
        indicator: configure_channel(
            ledc,
            channel::Number::Channel1,
            indicator_timer,
            indicator_pin,
        )?,
        buzzer: configure_channel(ledc, channel::Number::Channel2, buzzer_timer, buzzer_pin)?,
    })
}

/// Short fixed tone. Blocks the calling task for the length of the beep.
pub struct Buzzer<D> {
    pwm: Pwm,
    delay: D,
}

impl<D: DelayNs> Buzzer<D> {
    pub fn new(pwm: Pwm, delay: D) -> Self {
        Self { pwm, delay }
    }
}

impl<D: DelayNs> Alert for Buzzer<D> {
    fn sound(&mut self) {
        if let Err(e) = self.pwm.set_duty_cycle_percent(config::BUZZER_DUTY_PCT) {
            println!("buzzer: {:?}", e);
            return;
        }
        self.delay.delay_ms(config::BUZZER_BEEP_MS);
        if let Err(e) = self.pwm.set_duty_cycle_fully_off() {
            println!("buzzer: {:?}", e);
        }
    }
}
