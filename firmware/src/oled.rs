// 128x64 SSD1306 over I2C, drawn through a RAM frame buffer

use core::fmt;

use display_interface::DisplayError;
use eload_shared::panel::Display;
use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use esp_hal::i2c::master::{self, I2c};
use esp_hal::Blocking;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

type Driver = Ssd1306<
    I2CInterface<I2c<'static, Blocking>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

#[derive(Debug)]
pub enum Error {
    Bus(master::ConfigError),
    Controller(DisplayError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "i2c bus: {:?}", e),
            Error::Controller(e) => write!(f, "ssd1306: {:?}", e),
        }
    }
}

pub struct Oled {
    display: Driver,
}

impl Oled {
    pub fn new(i2c: I2c<'static, Blocking>) -> Result<Self, Error> {
        let mut display = Ssd1306::new(
            I2CDisplayInterface::new(i2c),
            DisplaySize128x64,
            DisplayRotation::Rotate0,
        )
        .into_buffered_graphics_mode();
        display.init().map_err(Error::Controller)?;
        display.clear_buffer();
        display.flush().map_err(Error::Controller)?;
        Ok(Self { display })
    }
}

impl Display for Oled {
    type Error = DisplayError;

    fn clear(&mut self) {
        self.display.clear_buffer();
    }

    fn draw_text(&mut self, x: i32, y: i32, scale: u8, text: &str) -> Result<(), DisplayError> {
        let font = if scale >= 2 { &FONT_10X20 } else { &FONT_6X10 };
        let style = MonoTextStyle::new(font, BinaryColor::On);
        Text::with_baseline(text, Point::new(x, y), style, Baseline::Top).draw(&mut self.display)?;
        Ok(())
    }

    fn present(&mut self) -> Result<(), DisplayError> {
        self.display.flush()
    }
}
