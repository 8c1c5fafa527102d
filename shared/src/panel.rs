//! Front panel: joystick, three buttons, load indicator, buzzer and display.
//!
//! [`FrontPanel::tick`] is one pass of the input loop. Buttons are sampled
//! once per tick and each press is followed by a fixed blocking wait, which
//! is all the debouncing the panel gets.

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::menu::{Alert, Clamped, Menu};
use crate::state::PanelPort;
use crate::status::Status;

/// Text surface of the panel display.
pub trait Display {
    type Error;

    fn clear(&mut self);

    fn draw_text(&mut self, x: i32, y: i32, scale: u8, text: &str) -> Result<(), Self::Error>;

    /// Pushes everything drawn since the last `clear` to the glass.
    fn present(&mut self) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Switches the load on and off.
    Load,
    /// Enters and leaves editing.
    Confirm,
    /// Cycles screens.
    Back,
}

pub trait Buttons {
    fn is_pressed(&mut self, button: Button) -> bool;
}

/// Buttons wired to ground with pull-ups. A failed read counts as released.
pub struct ActiveLowButtons<L, C, B> {
    pub load: L,
    pub confirm: C,
    pub back: B,
}

impl<L: InputPin, C: InputPin, B: InputPin> Buttons for ActiveLowButtons<L, C, B> {
    fn is_pressed(&mut self, button: Button) -> bool {
        match button {
            Button::Load => self.load.is_low().unwrap_or(false),
            Button::Confirm => self.confirm.is_low().unwrap_or(false),
            Button::Back => self.back.is_low().unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

pub trait Joystick {
    /// Raw ADC code of one axis, centered around [`Config::joystick_center`].
    fn read_axis(&mut self, axis: Axis) -> u16;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub joystick_center: u16,
    pub debounce_ms: u32,
    /// Indicator brightness out of 255 while the load is on.
    pub indicator_on: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            joystick_center: 2048,
            debounce_ms: 200,
            indicator_on: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<D, I> {
    Display(D),
    Indicator(I),
}

impl<D: fmt::Debug, I: fmt::Debug> fmt::Display for Error<D, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Display(e) => write!(f, "display write failed: {e:?}"),
            Error::Indicator(e) => write!(f, "indicator write failed: {e:?}"),
        }
    }
}

/// The one failure the device cannot run without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupError<E> {
    DisplayInit(E),
}

impl<E: fmt::Debug> fmt::Display for StartupError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::DisplayInit(e) => write!(f, "display init failed: {e:?}"),
        }
    }
}

pub struct FrontPanel<'a, B, I, A, D> {
    config: Config,
    menu: Menu<'a>,
    port: PanelPort<'a>,
    buttons: B,
    indicator: I,
    alert: A,
    display: D,
}

impl<'a, B, I, A, D> FrontPanel<'a, B, I, A, D>
where
    B: Buttons,
    I: SetDutyCycle,
    A: Alert,
    D: Display,
{
    pub fn new(
        config: Config,
        menu: Menu<'a>,
        port: PanelPort<'a>,
        buttons: B,
        indicator: I,
        alert: A,
        display: D,
    ) -> Self {
        Self {
            config,
            menu,
            port,
            buttons,
            indicator,
            alert,
            display,
        }
    }

    pub fn menu(&self) -> &Menu<'a> {
        &self.menu
    }

    pub fn status(&self) -> Status {
        self.port.status(self.menu.screen().mode())
    }

    fn centered(&self, raw: u16) -> i16 {
        (raw as i32 - self.config.joystick_center as i32).clamp(i16::MIN as i32, i16::MAX as i32)
            as i16
    }

    /// One pass of the input loop: joystick, load / confirm / back buttons,
    /// then a redraw. Returns the range clamp the joystick step hit, if any.
    pub fn tick<J: Joystick, T: DelayNs>(
        &mut self,
        joystick: &mut J,
        delay: &mut T,
    ) -> Result<Option<Clamped>, Error<D::Error, I::Error>> {
        let dx = self.centered(joystick.read_axis(Axis::X));
        let dy = self.centered(joystick.read_axis(Axis::Y));
        let clamped = self.menu.joystick(dx, dy, &self.port, &mut self.alert);

        if self.buttons.is_pressed(Button::Load) {
            let enabled = self.port.toggle_load();
            let level = if enabled { self.config.indicator_on } else { 0 };
            self.indicator
                .set_duty_cycle_fraction(level as u16, u8::MAX as u16)
                .map_err(Error::Indicator)?;
            delay.delay_ms(self.config.debounce_ms);
        }

        if self.buttons.is_pressed(Button::Confirm) {
            self.menu.confirm();
            delay.delay_ms(self.config.debounce_ms);
        }

        if self.buttons.is_pressed(Button::Back) {
            self.menu.back();
            delay.delay_ms(self.config.debounce_ms);
        }

        self.redraw()?;
        Ok(clamped)
    }

    pub fn redraw(&mut self) -> Result<(), Error<D::Error, I::Error>> {
        let frame = self.menu.compose(&self.port);
        self.display.clear();
        for line in &frame {
            self.display
                .draw_text(line.x, line.y, line.scale, &line.text)
                .map_err(Error::Display)?;
        }
        self.display.present().map_err(Error::Display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::{ConstantCurrent, Screen};
    use crate::state::{ControlState, Mode};
    use core::convert::Infallible;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State as PinState, Transaction};
    use std::string::{String, ToString};
    use std::vec::Vec;

    static CC: ConstantCurrent = ConstantCurrent {
        max_a: ConstantCurrent::MAX_CURRENT_A,
    };
    static SCREENS: [&dyn Screen; 1] = [&CC];

    #[derive(Default)]
    struct Pressed(Vec<Button>);

    impl Buttons for Pressed {
        fn is_pressed(&mut self, button: Button) -> bool {
            self.0.contains(&button)
        }
    }

    struct Stick(u16, u16);

    impl Joystick for Stick {
        fn read_axis(&mut self, axis: Axis) -> u16 {
            match axis {
                Axis::X => self.0,
                Axis::Y => self.1,
            }
        }
    }

    #[derive(Default)]
    struct Led(u16);

    impl embedded_hal::pwm::ErrorType for Led {
        type Error = Infallible;
    }

    impl SetDutyCycle for Led {
        fn max_duty_cycle(&self) -> u16 {
            255
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
            self.0 = duty;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Beeps(u32);

    impl Alert for Beeps {
        fn sound(&mut self) {
            self.0 += 1;
        }
    }

    #[derive(Default)]
    struct Screenshot {
        lines: Vec<String>,
        presented: Vec<String>,
        frames: u32,
    }

    impl Display for Screenshot {
        type Error = Infallible;

        fn clear(&mut self) {
            self.lines.clear();
        }

        fn draw_text(&mut self, _x: i32, _y: i32, _scale: u8, text: &str) -> Result<(), Infallible> {
            self.lines.push(text.to_string());
            Ok(())
        }

        fn present(&mut self) -> Result<(), Infallible> {
            self.presented = self.lines.clone();
            self.frames += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Sleeps {
        ms: u32,
    }

    impl DelayNs for Sleeps {
        fn delay_ns(&mut self, ns: u32) {
            self.ms += ns / 1_000_000;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.ms += ms;
        }
    }

    fn centered_stick() -> Stick {
        Stick(2048, 2048)
    }

    fn panel<'a>(port: PanelPort<'a>) -> FrontPanel<'a, Pressed, Led, Beeps, Screenshot> {
        FrontPanel::new(
            Config::default(),
            Menu::new(&SCREENS),
            port,
            Pressed::default(),
            Led::default(),
            Beeps::default(),
            Screenshot::default(),
        )
    }

    #[test]
    fn idle_tick_only_redraws() {
        let mut state = ControlState::new();
        let (_, port) = state.split();
        let mut panel = panel(port);
        let mut sleeps = Sleeps::default();

        assert_eq!(panel.tick(&mut centered_stick(), &mut sleeps), Ok(None));
        assert_eq!(sleeps.ms, 0);
        assert_eq!(panel.display.frames, 1);
        assert_eq!(
            panel.display.presented,
            ["CC", "Current: 2.50A", "Target: 2.50A"]
        );
    }

    #[test]
    fn load_button_toggles_load_and_indicator() {
        let mut state = ControlState::new();
        let (reader, port) = state.split();
        let mut panel = panel(port);
        let mut sleeps = Sleeps::default();
        panel.buttons.0.push(Button::Load);

        panel.tick(&mut centered_stick(), &mut sleeps).unwrap();
        assert!(reader.load_enabled());
        assert_eq!(panel.indicator.0, 60);
        assert_eq!(sleeps.ms, 200);

        panel.tick(&mut centered_stick(), &mut sleeps).unwrap();
        assert!(!reader.load_enabled());
        assert_eq!(panel.indicator.0, 0);
        assert_eq!(sleeps.ms, 400);
    }

    #[test]
    fn confirm_then_joystick_edits_target() {
        let mut state = ControlState::new();
        let (reader, port) = state.split();
        let mut panel = panel(port);
        let mut sleeps = Sleeps::default();

        panel.buttons.0.push(Button::Confirm);
        panel.tick(&mut centered_stick(), &mut sleeps).unwrap();
        assert!(panel.menu().editing());
        panel.buttons.0.clear();

        // right deflection, applied before the buttons on the next tick
        panel.tick(&mut Stick(4095, 2048), &mut sleeps).unwrap();
        assert_eq!(reader.target_a(), 2.51);
        assert_eq!(sleeps.ms, 200);
    }

    #[test]
    fn joystick_while_viewing_changes_nothing() {
        let mut state = ControlState::new();
        let (reader, port) = state.split();
        let mut panel = panel(port);
        let mut sleeps = Sleeps::default();

        panel.tick(&mut Stick(4095, 0), &mut sleeps).unwrap();
        assert_eq!(reader.target_a(), 2.5);
    }

    #[test]
    fn clamp_sounds_the_alert() {
        let mut state = ControlState::new();
        let (reader, port) = state.split();
        port.set_target_a(5.0);
        let mut panel = panel(port);
        let mut sleeps = Sleeps::default();
        panel.menu.confirm();

        let clamped = panel.tick(&mut Stick(4095, 2048), &mut sleeps).unwrap();
        assert_eq!(clamped, Some(Clamped::High));
        assert_eq!(panel.alert.0, 1);
        assert_eq!(reader.target_a(), 5.0);
    }

    #[test]
    fn back_and_confirm_in_one_tick_wait_twice() {
        let mut state = ControlState::new();
        let (_, port) = state.split();
        let mut panel = panel(port);
        let mut sleeps = Sleeps::default();
        panel.buttons.0.extend([Button::Confirm, Button::Back]);

        panel.tick(&mut centered_stick(), &mut sleeps).unwrap();
        assert_eq!(sleeps.ms, 400);
        assert_eq!(panel.status().mode, Mode::ConstantCurrent);
    }

    #[test]
    fn status_reflects_shared_state() {
        let mut state = ControlState::new();
        let (regulator, port) = state.split();
        regulator.set_duty(12);
        regulator.set_measured_a(0.5);
        let panel = panel(port);

        let status = panel.status();
        assert_eq!(status.duty, 12);
        assert_eq!(status.measured_a, 0.5);
        assert_eq!(status.target_a, 2.5);
        assert!(!status.load_enabled);
    }

    #[test]
    fn active_low_buttons_read_pins() {
        let mut buttons = ActiveLowButtons {
            load: PinMock::new(&[Transaction::get(PinState::Low)]),
            confirm: PinMock::new(&[Transaction::get(PinState::High)]),
            back: PinMock::new(&[]),
        };

        assert!(buttons.is_pressed(Button::Load));
        assert!(!buttons.is_pressed(Button::Confirm));

        buttons.load.done();
        buttons.confirm.done();
        buttons.back.done();
    }

    #[test]
    fn extreme_raw_values_center_without_overflow() {
        let mut state = ControlState::new();
        let (_, port) = state.split();
        let panel = panel(port);
        assert_eq!(panel.centered(0), -2048);
        assert_eq!(panel.centered(4095), 2047);
        assert_eq!(panel.centered(u16::MAX), i16::MAX);
    }
}
