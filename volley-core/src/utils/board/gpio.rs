//! GPIO seam for the Volley board.
//!
//! Board routines never touch registers directly. They talk to a [`GpioBank`],
//! which the firmware implements over the MCU's port registers and the tests
//! implement with a recording fake.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin, PinState, StatefulOutputPin};
use serde::{Deserialize, Serialize};

/// GPIO banks used on this board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Port {
    A,
    B,
    C,
}

/// A single pad, identified by bank and pin number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pad {
    pub port: Port,
    pub pin: u8,
}

impl Pad {
    pub const fn new(
        port: Port,
        pin: u8,
    ) -> Self {
        Pad { port, pin }
    }
}

impl core::fmt::Display for Pad {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "P{:?}{}", self.port, self.pin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputType {
    PushPull,
    OpenDrain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speed {
    Low,
    Mid1,
    Mid2,
    Highest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pull {
    Floating,
    PullUp,
    PullDown,
}

/// Electrical mode of a pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PadMode {
    /// Plain digital input, no pull.
    Input,
    /// Digital input with an internal pull resistor.
    InputPull(Pull),
    /// Analog input (digital buffer disconnected).
    Analog,
    /// General purpose output.
    Output {
        otype: OutputType,
        speed: Speed,
        pull: Pull,
    },
    /// Pad routed to a peripheral through alternate function `af`.
    Alternate {
        af: u8,
        otype: OutputType,
        speed: Speed,
        pull: Pull,
    },
}

impl PadMode {
    pub const INPUT_PULLUP: PadMode = PadMode::InputPull(Pull::PullUp);

    /// Push-pull output at the highest slew rate.
    pub const OUTPUT_PUSHPULL: PadMode = PadMode::Output {
        otype: OutputType::PushPull,
        speed: Speed::Highest,
        pull: Pull::Floating,
    };

    /// Push-pull alternate function at the highest slew rate, floating.
    pub const fn alternate_pushpull(af: u8) -> PadMode {
        PadMode::Alternate {
            af,
            otype: OutputType::PushPull,
            speed: Speed::Highest,
            pull: Pull::Floating,
        }
    }

    /// Open-drain alternate function with pull-up, as used by bus lines.
    pub const fn alternate_opendrain(af: u8) -> PadMode {
        PadMode::Alternate {
            af,
            otype: OutputType::OpenDrain,
            speed: Speed::Mid1,
            pull: Pull::PullUp,
        }
    }

    /// Open-drain GPIO output with pull-up, used while bit-banging the bus.
    pub const OUTPUT_OPENDRAIN: PadMode = PadMode::Output {
        otype: OutputType::OpenDrain,
        speed: Speed::Mid1,
        pull: Pull::PullUp,
    };
}

/// Pad-level access to the GPIO banks.
///
/// None of these calls can fail; a misconfigured board only shows up as
/// downstream symptoms.
pub trait GpioBank {
    /// Enable the peripheral clock of a bank.
    fn enable_clock(
        &mut self,
        port: Port,
    );

    fn set_pad_mode(
        &mut self,
        pad: Pad,
        mode: PadMode,
    );

    fn read_pad(
        &mut self,
        pad: Pad,
    ) -> PinState;

    fn write_pad(
        &mut self,
        pad: Pad,
        state: PinState,
    );

    /// Drive the pad high (or release it, for open-drain pads).
    fn set_pad(
        &mut self,
        pad: Pad,
    ) {
        self.write_pad(pad, PinState::High);
    }

    /// Drive the pad low.
    fn clear_pad(
        &mut self,
        pad: Pad,
    ) {
        self.write_pad(pad, PinState::Low);
    }
}

impl<G: GpioBank + ?Sized> GpioBank for &mut G {
    fn enable_clock(
        &mut self,
        port: Port,
    ) {
        (**self).enable_clock(port)
    }

    fn set_pad_mode(
        &mut self,
        pad: Pad,
        mode: PadMode,
    ) {
        (**self).set_pad_mode(pad, mode)
    }

    fn read_pad(
        &mut self,
        pad: Pad,
    ) -> PinState {
        (**self).read_pad(pad)
    }

    fn write_pad(
        &mut self,
        pad: Pad,
        state: PinState,
    ) {
        (**self).write_pad(pad, state)
    }
}

/// Adapts one pad of a [`GpioBank`] to the `embedded-hal` output traits.
///
/// The pad must already be configured as an output (see `init_gpio`).
pub struct PadPin<G> {
    gpio: G,
    pad: Pad,
    state: PinState,
}

impl<G: GpioBank> PadPin<G> {
    pub fn new(
        gpio: G,
        pad: Pad,
    ) -> Self {
        PadPin {
            gpio,
            pad,
            state: PinState::Low,
        }
    }

    pub fn pad(&self) -> Pad {
        self.pad
    }
}

impl<G> ErrorType for PadPin<G> {
    type Error = Infallible;
}

impl<G: GpioBank> OutputPin for PadPin<G> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.gpio.clear_pad(self.pad);
        self.state = PinState::Low;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.gpio.set_pad(self.pad);
        self.state = PinState::High;
        Ok(())
    }
}

impl<G: GpioBank> StatefulOutputPin for PadPin<G> {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.state == PinState::High)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.state == PinState::Low)
    }
}
