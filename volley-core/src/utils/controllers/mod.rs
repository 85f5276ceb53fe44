//! Runtime controllers of the Volley board.
//!
//! - `i2c`: shared I2C bus lifecycle and stuck-bus recovery
//! - `leds`: status LEDs, gate enable and DC calibration outputs
//!
//! [`SystemCommand`] is the serialized form of everything other tasks may ask
//! for; [`SystemCommand::dispatch`] routes it to `BUS_CHANNEL` or
//! `LED_CHANNEL`.

pub mod i2c;
pub mod leds;

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embedded_hal_async::delay::DelayNs;
use serde::{Deserialize, Serialize};

pub use i2c::{BusPeripheral, I2cBus};
pub use leds::{LedCommand, StatusLeds, LED_CHANNEL};

use crate::utils::board::{
    adc::{self, AdcSequencer},
    gpio::GpioBank,
    identity::{self, BoardId, ControllerIdentity, DirectionInversion},
    pins,
};

/// Channel used to receive bus commands (`BusCommand` messages).
pub static BUS_CHANNEL: embassy_sync::channel::Channel<CriticalSectionRawMutex, BusCommand, 4> =
    embassy_sync::channel::Channel::new();

/// Bus lifecycle requests.
///
/// Serialized as JSON with tag `"bc"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "bc", rename_all = "snake_case")]
pub enum BusCommand {
    Start,
    Stop,
    Recover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ct", rename_all = "snake_case")] // ct = command type
pub enum SystemCommand {
    B(BusCommand),
    L(LedCommand),
}

impl SystemCommand {
    /// Queue the command on the channel of the controller that handles it.
    pub async fn dispatch(self) {
        match self {
            SystemCommand::B(cmd) => BUS_CHANNEL.sender().send(cmd).await,
            SystemCommand::L(cmd) => LED_CHANNEL.sender().send(cmd).await,
        }
    }
}

/// One-shot startup configuration of the board.
pub struct BoardSupport<G, S> {
    gpio: G,
    adc: S,
}

impl<G: GpioBank, S: AdcSequencer> BoardSupport<G, S> {
    pub fn new(
        gpio: G,
        adc: S,
    ) -> Self {
        BoardSupport { gpio, adc }
    }

    /// Run the startup sequence: pads, ADC maps, configuration patches and
    /// finally the I2C bus.
    pub async fn init<A, C, M, BG, P, D>(
        &mut self,
        app_conf: &mut A,
        mc_conf: &mut C,
        bus: &I2cBus<M, BG, P, D>,
    ) -> BoardId
    where
        A: ControllerIdentity + ?Sized,
        C: DirectionInversion + ?Sized,
        M: RawMutex,
        BG: GpioBank,
        P: BusPeripheral,
        D: DelayNs,
    {
        pins::init_gpio(&mut self.gpio);
        adc::setup_adc_channels(&mut self.adc);
        identity::init_app_config(&mut self.gpio, app_conf);
        identity::init_mc_config(&mut self.gpio, mc_conf);
        bus.start().await;

        let id = self.board_id();
        tracing::info!(id = id.get(), "board initialised");
        id
    }

    pub fn board_id(&mut self) -> BoardId {
        identity::hw_id_from_pins(&mut self.gpio)
    }
}

/// Serves bus commands for the rest of the firmware.
pub struct SystemController<'a, M: RawMutex, G, P, D> {
    bus: &'a I2cBus<M, G, P, D>,
}

impl<'a, M, G, P, D> SystemController<'a, M, G, P, D>
where
    M: RawMutex,
    G: GpioBank,
    P: BusPeripheral,
    D: DelayNs,
{
    pub fn new(bus: &'a I2cBus<M, G, P, D>) -> Self {
        SystemController { bus }
    }

    pub async fn execute(
        &self,
        cmd: BusCommand,
    ) {
        match cmd {
            BusCommand::Start => self.bus.start().await,
            BusCommand::Stop => self.bus.stop().await,
            BusCommand::Recover => self.bus.try_restore().await,
        }
    }

    pub async fn bus_ch(&self) -> ! {
        loop {
            let cmd = BUS_CHANNEL.receiver().receive().await;
            tracing::info!("Received bus command: {:?}", cmd);
            self.execute(cmd).await;
        }
    }
}
