//! Menu screens and the digit editor.
//!
//! The editor works on a `D.DD` readout. The selectable digits are the
//! hundredths (index 0), the tenths (index 1) and the ones (index 3); index 2
//! is the decimal point and can never be selected. Adjustments are done in
//! integer hundredths so that repeated steps land exactly on the grid the
//! readout shows.

use core::fmt::Write;

use heapless::{String, Vec};

use crate::state::{Mode, PanelPort};

/// Minimum centered joystick deflection treated as a gesture.
pub const DEAD_ZONE: i16 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Digit {
    #[default]
    Hundredths,
    Tenths,
    Ones,
}

impl Digit {
    pub const ALL: [Digit; 3] = [Digit::Hundredths, Digit::Tenths, Digit::Ones];

    /// Index counted from the right of the `D.DD` readout; the point is 2.
    pub fn index(self) -> usize {
        match self {
            Digit::Hundredths => 0,
            Digit::Tenths => 1,
            Digit::Ones => 3,
        }
    }

    pub fn step_centi(self) -> i32 {
        match self {
            Digit::Hundredths => 1,
            Digit::Tenths => 10,
            Digit::Ones => 100,
        }
    }

    /// Next more significant digit, stays on the ones.
    pub fn left(self) -> Self {
        match self {
            Digit::Hundredths => Digit::Tenths,
            Digit::Tenths | Digit::Ones => Digit::Ones,
        }
    }

    /// Next less significant digit, stays on the hundredths.
    pub fn right(self) -> Self {
        match self {
            Digit::Ones => Digit::Tenths,
            Digit::Tenths | Digit::Hundredths => Digit::Hundredths,
        }
    }

    /// Character position of this digit in the `D.DD` readout.
    // Only valid for values below 10.
    pub fn glyph_position(self) -> usize {
        3 - self.index()
    }
}

/// Which bound a post-adjustment check had to enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clamped {
    Low,
    High,
}

/// Audible feedback for rejected adjustments. Blocks for the tone length.
pub trait Alert {
    fn sound(&mut self);
}

/// One regulation mode as seen from the menu.
///
/// The editor only talks to screens through this trait, so adding a mode
/// means adding an implementation and listing it in the screen set.
pub trait Screen: Sync {
    fn mode(&self) -> Mode;

    /// Unit suffix of both readouts.
    fn unit(&self) -> char;

    /// Upper bound of the setpoint; the lower bound is always zero.
    fn limit(&self) -> f32;

    fn setpoint(&self, port: &PanelPort<'_>) -> f32;

    fn store_setpoint(&self, port: &PanelPort<'_>, value: f32);

    fn measured(&self, port: &PanelPort<'_>) -> f32;

    fn label(&self) -> &'static str {
        self.mode().label()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConstantCurrent {
    pub max_a: f32,
}

impl ConstantCurrent {
    pub const MAX_CURRENT_A: f32 = 5.0;
}

impl Default for ConstantCurrent {
    fn default() -> Self {
        Self {
            max_a: Self::MAX_CURRENT_A,
        }
    }
}

impl Screen for ConstantCurrent {
    fn mode(&self) -> Mode {
        Mode::ConstantCurrent
    }

    fn unit(&self) -> char {
        'A'
    }

    fn limit(&self) -> f32 {
        self.max_a
    }

    fn setpoint(&self, port: &PanelPort<'_>) -> f32 {
        port.target_a()
    }

    fn store_setpoint(&self, port: &PanelPort<'_>, value: f32) {
        port.set_target_a(value);
    }

    fn measured(&self, port: &PanelPort<'_>) -> f32 {
        port.measured_a()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub x: i32,
    pub y: i32,
    pub scale: u8,
    pub text: String<24>,
}

impl Line {
    fn new(x: i32, y: i32, text: String<24>) -> Self {
        Self {
            x,
            y,
            scale: 1,
            text,
        }
    }
}

pub type Frame = Vec<Line, 4>;

fn to_centi(value: f32) -> i32 {
    if value >= 0.0 {
        (value * 100.0 + 0.5) as i32
    } else {
        (value * 100.0 - 0.5) as i32
    }
}

pub struct Menu<'s> {
    screens: &'s [&'s dyn Screen],
    current: usize,
    editing: bool,
    digit: Digit,
    blink: bool,
}

impl<'s> Menu<'s> {
    /// `screens` must not be empty; the first entry is shown at start-up.
    pub fn new(screens: &'s [&'s dyn Screen]) -> Self {
        assert!(!screens.is_empty(), "menu needs at least one screen");
        Self {
            screens,
            current: 0,
            editing: false,
            digit: Digit::default(),
            blink: false,
        }
    }

    pub fn screen(&self) -> &'s dyn Screen {
        self.screens[self.current]
    }

    pub fn editing(&self) -> bool {
        self.editing
    }

    pub fn digit(&self) -> Digit {
        self.digit
    }

    /// Confirm button: enter or leave editing. The selected digit is kept.
    pub fn confirm(&mut self) {
        self.editing = !self.editing;
    }

    /// Back button: move on to the next screen.
    pub fn back(&mut self) {
        self.current = (self.current + 1) % self.screens.len();
    }

    /// Applies one centered joystick sample.
    ///
    /// `dx` steps the setpoint by the selected digit, `dy` moves the digit.
    /// While editing, the stored setpoint is range checked on every call and
    /// pulled back into `0..=limit` with an alert if needed.
    pub fn joystick<A: Alert>(
        &mut self,
        dx: i16,
        dy: i16,
        port: &PanelPort<'_>,
        alert: &mut A,
    ) -> Option<Clamped> {
        if !self.editing {
            return None;
        }

        let screen = self.screen();
        let mut centi = to_centi(screen.setpoint(port));
        if dx > DEAD_ZONE {
            centi += self.digit.step_centi();
        } else if dx < -DEAD_ZONE {
            centi -= self.digit.step_centi();
        }

        if dy > DEAD_ZONE {
            self.digit = self.digit.right();
        } else if dy < -DEAD_ZONE {
            self.digit = self.digit.left();
        }

        let limit = to_centi(screen.limit());
        let clamped = if centi < 0 {
            centi = 0;
            Some(Clamped::Low)
        } else if centi > limit {
            centi = limit;
            Some(Clamped::High)
        } else {
            None
        };
        if clamped.is_some() {
            alert.sound();
        }

        screen.store_setpoint(port, centi as f32 / 100.0);
        clamped
    }

    /// Builds the next display frame. Every call flips the blink phase.
    pub fn compose(&mut self, port: &PanelPort<'_>) -> Frame {
        self.blink = !self.blink;

        let screen = self.screen();
        let unit = screen.unit();
        let mut frame = Frame::new();

        let mut label = String::new();
        let _ = label.push_str(screen.label());
        let _ = frame.push(Line::new(10, 0, label));

        let mut measured = String::new();
        let _ = write!(measured, "Current: {:.2}{}", screen.measured(port), unit);
        let _ = frame.push(Line::new(0, 32, measured));

        let mut readout: String<8> = String::new();
        let _ = write!(readout, "{:.2}", screen.setpoint(port));

        let mut target = String::new();
        let _ = target.push_str("Target: ");
        if self.editing && self.blink {
            let blank = self.digit.glyph_position();
            for (i, c) in readout.chars().enumerate() {
                let _ = target.push(if i == blank { ' ' } else { c });
            }
        } else {
            let _ = target.push_str(&readout);
        }
        let _ = target.push(unit);
        let _ = frame.push(Line::new(0, 48, target));

        frame
    }
}
