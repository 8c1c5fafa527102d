#![no_std]
#![no_main]

mod analog;
mod config;
mod oled;
mod pwm;

use eload_shared::menu::{ConstantCurrent, Screen};
use eload_shared::panel::StartupError;
use esp_hal::delay::Delay;

static CONSTANT_CURRENT: ConstantCurrent = ConstantCurrent {
    max_a: ConstantCurrent::MAX_CURRENT_A,
};
static SCREENS: [&dyn Screen; 1] = [&CONSTANT_CURRENT];

// Give the USB console time to enumerate so the reason is not lost, then halt
fn display_fault(err: StartupError<oled::Error>) -> ! {
    Delay::new().delay_millis(config::DISPLAY_FAULT_HOLD_MS);
    panic!("{}", err);
}

#[rtic::app(device = esp32c3, dispatchers = [FROM_CPU_INTR0, FROM_CPU_INTR1])]
mod app {
    use eload_shared::menu::Menu;
    use eload_shared::panel::{self, ActiveLowButtons, FrontPanel, StartupError};
    use eload_shared::regulator::Regulator;
    use eload_shared::state::{ControlState, RegulatorPort};
    use eload_shared::task::{next_deadline, FaultLatch, Report};
    use esp_backtrace as _;
    use esp_hal::analog::adc::{Adc, AdcConfig, Attenuation};
    use esp_hal::delay::Delay;
    use esp_hal::gpio::{Input, InputConfig, Pull};
    use esp_hal::i2c::master::{self, I2c};
    use esp_hal::ledc::{LSGlobalClkSource, Ledc};
    use esp_hal::time::Rate;
    use esp_println::println;
    use fugit::ExtU64;
    use rtic_monotonics::esp32c3::prelude::*;
    use static_cell::StaticCell;

    use super::{display_fault, SCREENS};
    use crate::analog::{AnalogFrontEnd, Locked};
    use crate::config;
    use crate::oled::{self, Oled};
    use crate::pwm::{self, Buzzer, Pwm};

    esp32c3_systimer_monotonic!(Mono);

    static STATE: StaticCell<ControlState> = StaticCell::new();

    type Buttons = ActiveLowButtons<Input<'static>, Input<'static>, Input<'static>>;
    type Panel = FrontPanel<'static, Buttons, Pwm, Buzzer<Delay>, Oled>;

    #[shared]
    struct Shared {
        analog: AnalogFrontEnd,
    }

    #[local]
    struct Local {
        regulator: Regulator,
        regulator_port: RegulatorPort<'static>,
        load: Pwm,
        panel: Panel,
        debounce: Delay,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local) {
        let peripherals = esp_hal::init(esp_hal::Config::default());
        Mono::start(cx.device.SYSTIMER);

        println!("booted!");

        let mut adc_config = AdcConfig::new();
        let current = adc_config.enable_pin(peripherals.GPIO2, Attenuation::_11dB);
        let joystick_x = adc_config.enable_pin(peripherals.GPIO0, Attenuation::_11dB);
        let joystick_y = adc_config.enable_pin(peripherals.GPIO1, Attenuation::_11dB);
        let analog = AnalogFrontEnd {
            adc: Adc::new(peripherals.ADC1, adc_config),
            current,
            joystick_x,
            joystick_y,
        };

        let mut ledc = Ledc::new(peripherals.LEDC);
        ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);
        let outputs = pwm::init(&ledc, peripherals.GPIO3, peripherals.GPIO4, peripherals.GPIO5)
            .expect("LEDC outputs");

        let oled = match I2c::new(
            peripherals.I2C0,
            master::Config::default().with_frequency(Rate::from_khz(config::I2C_FREQUENCY_KHZ)),
        )
        .map_err(oled::Error::Bus)
        .and_then(|i2c| Oled::new(i2c.with_sda(peripherals.GPIO10).with_scl(peripherals.GPIO8)))
        {
            Ok(oled) => oled,
            Err(e) => display_fault(StartupError::DisplayInit(e)),
        };

        let pull_up = InputConfig::default().with_pull(Pull::Up);
        let buttons = ActiveLowButtons {
            load: Input::new(peripherals.GPIO6, pull_up),
            confirm: Input::new(peripherals.GPIO7, pull_up),
            back: Input::new(peripherals.GPIO9, pull_up),
        };

        let (regulator_port, panel_port) = STATE.init(ControlState::new()).split();

        let panel = FrontPanel::new(
            panel::Config::default(),
            Menu::new(&SCREENS),
            panel_port,
            buttons,
            outputs.indicator,
            Buzzer::new(outputs.buzzer, Delay::new()),
            oled,
        );

        regulate::spawn().expect("regulator task");
        front_panel::spawn().expect("panel task");

        (
            Shared { analog },
            Local {
                regulator: Regulator::default(),
                regulator_port,
                load: outputs.load,
                panel,
                debounce: Delay::new(),
            },
        )
    }

    #[task(priority = 2, shared = [analog], local = [regulator, regulator_port, load])]
    async fn regulate(cx: regulate::Context) {
        let mut sensor = Locked(cx.shared.analog);
        let mut faults = FaultLatch::default();
        let mut next = Mono::now();

        loop {
            let now_ms = Mono::now().duration_since_epoch().to_millis() as u32;
            let port = &*cx.local.regulator_port;
            let result = cx.local.regulator.tick(port, &mut sensor, cx.local.load, now_ms);
            match faults.observe(result) {
                Some(Report::Failed(e)) => println!("regulator: {}", e),
                Some(Report::Recovered { repeats }) => {
                    println!("regulator: recovered after {} more failures", repeats)
                }
                None => {}
            }

            next = next_deadline(next, Mono::now(), config::REGULATOR_PERIOD_MS.millis());
            Mono::delay_until(next).await;
        }
    }

    #[task(priority = 1, shared = [analog], local = [panel, debounce])]
    async fn front_panel(cx: front_panel::Context) {
        let mut joystick = Locked(cx.shared.analog);
        let mut faults = FaultLatch::default();
        let mut last_status = Mono::now();

        loop {
            match faults.observe(cx.local.panel.tick(&mut joystick, cx.local.debounce)) {
                Some(Report::Failed(e)) => println!("panel: {}", e),
                Some(Report::Recovered { repeats }) => {
                    println!("panel: recovered after {} more failures", repeats)
                }
                None => {}
            }

            let now = Mono::now();
            if now - last_status >= config::STATUS_PERIOD_MS.millis() {
                println!("{}", cx.local.panel.status());
                last_status = now;
            }

            Mono::delay(config::PANEL_PERIOD_MS.millis()).await;
        }
    }
}
