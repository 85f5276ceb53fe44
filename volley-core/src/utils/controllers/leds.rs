//! Status LEDs and gate-driver outputs of the Volley board.
//!
//! Thin wrappers over `embedded-hal` output pins. On the board the pins are
//! [`PadPin`](crate::utils::board::gpio::PadPin)s; anything implementing
//! `OutputPin` works.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::digital::{OutputPin, StatefulOutputPin};
use serde::{Deserialize, Serialize};

/// Channel used to receive LED commands (`LedCommand` messages).
pub static LED_CHANNEL: embassy_sync::channel::Channel<CriticalSectionRawMutex, LedCommand, 8> =
    embassy_sync::channel::Channel::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Led {
    Green,
    Red,
}

/// LED command variants.
///
/// Serialized as JSON with tag `"lc"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "lc", rename_all = "snake_case")]
pub enum LedCommand {
    On { led: Led },
    Off { led: Led },
    Toggle { led: Led },
}

/// The green and red status LEDs.
pub struct StatusLeds<G, R> {
    green: G,
    red: R,
}

impl<G, R, E> StatusLeds<G, R>
where
    G: StatefulOutputPin<Error = E>,
    R: StatefulOutputPin<Error = E>,
{
    pub fn new(
        green: G,
        red: R,
    ) -> Self {
        StatusLeds { green, red }
    }

    pub fn ex_command(
        &mut self,
        cmd: LedCommand,
    ) -> Result<(), E> {
        match cmd {
            LedCommand::On { led: Led::Green } => self.green.set_high(),
            LedCommand::On { led: Led::Red } => self.red.set_high(),
            LedCommand::Off { led: Led::Green } => self.green.set_low(),
            LedCommand::Off { led: Led::Red } => self.red.set_low(),
            LedCommand::Toggle { led: Led::Green } => self.green.toggle(),
            LedCommand::Toggle { led: Led::Red } => self.red.toggle(),
        }
    }
}

/// Enable line of the gate driver. Starts disabled.
pub struct GateDriver<P> {
    enable: P,
    enabled: bool,
}

impl<P: OutputPin> GateDriver<P> {
    /// Take the enable pin and drive it low.
    pub fn new(mut enable: P) -> Result<Self, P::Error> {
        enable.set_low()?;
        Ok(GateDriver {
            enable,
            enabled: false,
        })
    }

    pub fn enable(&mut self) -> Result<(), P::Error> {
        self.enable.set_high()?;
        self.enabled = true;
        tracing::info!("gate driver enabled");
        Ok(())
    }

    pub fn disable(&mut self) -> Result<(), P::Error> {
        self.enable.set_low()?;
        self.enabled = false;
        tracing::info!("gate driver disabled");
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// DC calibration switch of the current-sense amplifiers.
pub struct DcCal<P> {
    pin: P,
}

impl<P: OutputPin> DcCal<P> {
    pub fn new(pin: P) -> Self {
        DcCal { pin }
    }

    pub fn on(&mut self) -> Result<(), P::Error> {
        self.pin.set_high()
    }

    pub fn off(&mut self) -> Result<(), P::Error> {
        self.pin.set_low()
    }
}
