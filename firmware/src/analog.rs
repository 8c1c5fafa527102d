// ADC1 front end shared by the current sense input and the joystick

use eload_shared::panel::{Axis, Joystick};
use eload_shared::sense::CurrentSensor;
use esp_hal::analog::adc::{Adc, AdcPin};
use esp_hal::gpio::GpioPin;
use esp_hal::peripherals::ADC1;
use esp_hal::Blocking;
use rtic::Mutex;

pub struct AnalogFrontEnd {
    pub adc: Adc<'static, ADC1, Blocking>,
    pub current: AdcPin<GpioPin<2>, ADC1>,
    pub joystick_x: AdcPin<GpioPin<0>, ADC1>,
    pub joystick_y: AdcPin<GpioPin<1>, ADC1>,
}

impl AnalogFrontEnd {
    // One-shot reads only ever report WouldBlock, which block! spins through
    pub fn read_current(&mut self) -> u16 {
        nb::block!(self.adc.read_oneshot(&mut self.current)).unwrap_or_default()
    }

    pub fn read_axis(&mut self, axis: Axis) -> u16 {
        let sample = match axis {
            Axis::X => nb::block!(self.adc.read_oneshot(&mut self.joystick_x)),
            Axis::Y => nb::block!(self.adc.read_oneshot(&mut self.joystick_y)),
        };
        sample.unwrap_or_default()
    }
}

/// Takes the RTIC lock around every conversion, so the regulator is held
/// off for one sample at most while the panel reads the joystick.
pub struct Locked<M>(pub M);

impl<M: Mutex<T = AnalogFrontEnd>> CurrentSensor for Locked<M> {
    fn read_raw(&mut self) -> u16 {
        self.0.lock(|afe| afe.read_current())
    }
}

impl<M: Mutex<T = AnalogFrontEnd>> Joystick for Locked<M> {
    fn read_axis(&mut self, axis: Axis) -> u16 {
        self.0.lock(|afe| afe.read_axis(axis))
    }
}
