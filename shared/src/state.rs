//! Control state shared between the regulator and the front panel.
//!
//! Every field has exactly one writer. [`ControlState::split`] hands out the
//! two write sides once: [`RegulatorPort`] owns the measured current and the
//! duty level, [`PanelPort`] owns the target current and the load switch.
//! Both sides may read everything. All accesses are relaxed single-word
//! loads and stores, so neither side ever waits on the other; a reader sees
//! at worst the value from the previous cycle.

use portable_atomic::{AtomicBool, AtomicF32, AtomicU8, Ordering};

use crate::status::Status;

pub const INITIAL_TARGET_A: f32 = 2.5;
pub const INITIAL_MEASURED_A: f32 = 2.5;

/// Regulation mode. Each menu screen drives one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    ConstantCurrent,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::ConstantCurrent => "CC",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "CC" => Some(Mode::ConstantCurrent),
            _ => None,
        }
    }
}

impl core::fmt::Display for Mode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug)]
pub struct ControlState {
    target_a: AtomicF32,
    measured_a: AtomicF32,
    load_enabled: AtomicBool,
    duty: AtomicU8,
}

impl ControlState {
    pub const fn new() -> Self {
        Self {
            target_a: AtomicF32::new(INITIAL_TARGET_A),
            measured_a: AtomicF32::new(INITIAL_MEASURED_A),
            load_enabled: AtomicBool::new(false),
            duty: AtomicU8::new(0),
        }
    }

    /// Splits the state into its two single-writer handles.
    pub fn split(&mut self) -> (RegulatorPort<'_>, PanelPort<'_>) {
        let state: &ControlState = self;
        (RegulatorPort { state }, PanelPort { state })
    }

    pub fn target_a(&self) -> f32 {
        self.target_a.load(Ordering::Relaxed)
    }

    pub fn measured_a(&self) -> f32 {
        self.measured_a.load(Ordering::Relaxed)
    }

    pub fn load_enabled(&self) -> bool {
        self.load_enabled.load(Ordering::Relaxed)
    }

    pub fn duty(&self) -> u8 {
        self.duty.load(Ordering::Relaxed)
    }

    pub fn status(&self, mode: Mode) -> Status {
        Status {
            target_a: self.target_a(),
            measured_a: self.measured_a(),
            load_enabled: self.load_enabled(),
            mode,
            duty: self.duty(),
        }
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new()
    }
}

/// Write side of the regulator task. Not `Copy`, so it can only ever live in
/// one task.
///
/// ```compile_fail
/// use eload_shared::state::ControlState;
///
/// let mut state = ControlState::new();
/// let (port, _) = state.split();
/// let second = port;
/// port.set_duty(1);
/// ```
#[derive(Debug)]
pub struct RegulatorPort<'a> {
    state: &'a ControlState,
}

impl RegulatorPort<'_> {
    pub fn set_measured_a(&self, amps: f32) {
        self.state.measured_a.store(amps, Ordering::Relaxed);
    }

    pub fn set_duty(&self, duty: u8) {
        self.state.duty.store(duty, Ordering::Relaxed);
    }
}

/// Write side of the front panel task.
///
/// ```compile_fail
/// use eload_shared::state::ControlState;
///
/// let mut state = ControlState::new();
/// let (_, port) = state.split();
/// let second = port.clone();
/// second.set_load_enabled(true);
/// ```
#[derive(Debug)]
pub struct PanelPort<'a> {
    state: &'a ControlState,
}

impl PanelPort<'_> {
    pub fn set_target_a(&self, amps: f32) {
        self.state.target_a.store(amps, Ordering::Relaxed);
    }

    pub fn set_load_enabled(&self, enabled: bool) {
        self.state.load_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Flips the load switch and returns the new setting. This is the only
    /// writer, so a load followed by a store is enough.
    pub fn toggle_load(&self) -> bool {
        let enabled = !self.state.load_enabled();
        self.set_load_enabled(enabled);
        enabled
    }
}

impl core::ops::Deref for RegulatorPort<'_> {
    type Target = ControlState;

    fn deref(&self) -> &ControlState {
        self.state
    }
}

impl core::ops::Deref for PanelPort<'_> {
    type Target = ControlState;

    fn deref(&self) -> &ControlState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disabled_at_initial_target() {
        let state = ControlState::new();
        assert_eq!(state.target_a(), 2.5);
        assert_eq!(state.measured_a(), 2.5);
        assert!(!state.load_enabled());
        assert_eq!(state.duty(), 0);
    }

    #[test]
    fn ports_write_their_own_fields() {
        let mut state = ControlState::new();
        let (regulator, panel) = state.split();

        panel.set_target_a(1.25);
        regulator.set_measured_a(1.0);
        regulator.set_duty(17);

        assert_eq!(regulator.target_a(), 1.25);
        assert_eq!(panel.measured_a(), 1.0);
        assert_eq!(panel.duty(), 17);
    }

    #[test]
    fn toggle_load_flips_and_reports() {
        let mut state = ControlState::new();
        let (regulator, panel) = state.split();
        assert!(panel.toggle_load());
        assert!(regulator.load_enabled());
        assert!(!panel.toggle_load());
        assert!(!regulator.load_enabled());
    }

    #[test]
    fn mode_labels_round_trip() {
        assert_eq!(Mode::ConstantCurrent.label(), "CC");
        assert_eq!(Mode::from_label("CC"), Some(Mode::ConstantCurrent));
        assert_eq!(Mode::from_label("CV"), None);
    }
}
