//! I2C bus lifecycle for the Volley board.
//!
//! [`I2cBus`] owns the bus peripheral, the GPIO handle for its two lines and
//! the running flag behind one async mutex, so start, stop and recovery never
//! interleave with each other or with other bus users going through
//! [`I2cBus::with_peripheral`].
//!
//! A device interrupted mid-transfer can keep SDA low forever. Reinitialising
//! the peripheral does not clear that; clocking the bus by hand does. The
//! bit-banged sequence lives in [`RECOVERY_SEQUENCE`] and is executed by
//! [`run_recovery`].

use embassy_sync::{blocking_mutex::raw::RawMutex, mutex::Mutex};
use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use serde::{Deserialize, Serialize};

use crate::utils::board::{
    gpio::{GpioBank, Pad, PadMode},
    pins::{AF_I2C2, I2C_SCL, I2C_SDA},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpMode {
    I2c,
    SmbusDevice,
    SmbusHost,
}

/// Fast-mode duty cycle (ignored in standard mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DutyCycle {
    Standard,
    FastDuty2,
    FastDuty16By9,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct I2cConfig {
    pub op_mode: OpMode,
    /// Bus clock in Hz.
    pub clock_speed: u32,
    pub duty_cycle: DutyCycle,
}

/// Standard-mode 100 kHz configuration used on every start.
pub const I2C_CONFIG: I2cConfig = I2cConfig {
    op_mode: OpMode::I2c,
    clock_speed: 100_000,
    duty_cycle: DutyCycle::Standard,
};

/// Driver side of the bus peripheral.
pub trait BusPeripheral {
    fn start(
        &mut self,
        config: &I2cConfig,
    );

    fn stop(&mut self);

    /// Mark the driver as stopped without touching the hardware, so the next
    /// `start` reinitialises it from scratch.
    fn force_stopped(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Line {
    Scl,
    Sda,
}

/// The two pads of the bus and the alternate function routing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusLines {
    pub scl: Pad,
    pub sda: Pad,
    pub af: u8,
}

pub const VOLLEY_BUS_LINES: BusLines = BusLines {
    scl: I2C_SCL,
    sda: I2C_SDA,
    af: AF_I2C2,
};

impl BusLines {
    pub const fn pad(
        &self,
        line: Line,
    ) -> Pad {
        match line {
            Line::Scl => self.scl,
            Line::Sda => self.sda,
        }
    }

    fn set_mode<G: GpioBank>(
        &self,
        gpio: &mut G,
        mode: PadMode,
    ) {
        gpio.set_pad_mode(self.scl, mode);
        gpio.set_pad_mode(self.sda, mode);
    }

    fn route_to_peripheral<G: GpioBank>(
        &self,
        gpio: &mut G,
    ) {
        self.set_mode(gpio, PadMode::alternate_opendrain(self.af));
    }
}

/// What a recovery step does to the bus lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusAction {
    /// Both lines become open-drain GPIO outputs.
    LinesAsGpio,
    /// Both lines go back to the peripheral.
    LinesAsPeripheral,
    /// Let the line float high.
    Release(Line),
    /// Pull the line low.
    Drive(Line),
}

/// One action followed by a hold before the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryStep {
    pub action: BusAction,
    pub hold: Duration,
}

impl RecoveryStep {
    pub const fn new(
        action: BusAction,
        hold: Duration,
    ) -> Self {
        RecoveryStep { action, hold }
    }
}

/// One tick of the firmware scheduler.
pub const RECOVERY_HOLD: Duration = Duration::from_micros(100);
const NO_HOLD: Duration = Duration::from_ticks(0);

/// Enough SCL pulses to clock out the longest transfer a device can be stuck in.
pub const RECOVERY_CLOCK_PULSES: usize = 16;
pub const RECOVERY_STEPS: usize = 3 + 2 * RECOVERY_CLOCK_PULSES + 5;

pub const RECOVERY_SEQUENCE: [RecoveryStep; RECOVERY_STEPS] = recovery_sequence();

const fn recovery_sequence() -> [RecoveryStep; RECOVERY_STEPS] {
    use BusAction::*;

    let mut seq = [RecoveryStep::new(LinesAsGpio, NO_HOLD); RECOVERY_STEPS];
    seq[1] = RecoveryStep::new(Release(Line::Scl), NO_HOLD);
    seq[2] = RecoveryStep::new(Release(Line::Sda), RECOVERY_HOLD);

    let mut i = 0;
    while i < RECOVERY_CLOCK_PULSES {
        seq[3 + 2 * i] = RecoveryStep::new(Drive(Line::Scl), RECOVERY_HOLD);
        seq[4 + 2 * i] = RecoveryStep::new(Release(Line::Scl), RECOVERY_HOLD);
        i += 1;
    }

    // START (SDA falls, SCL high), one more clock, then STOP (SDA rises, SCL high)
    let tail = 3 + 2 * RECOVERY_CLOCK_PULSES;
    seq[tail] = RecoveryStep::new(Drive(Line::Sda), RECOVERY_HOLD);
    seq[tail + 1] = RecoveryStep::new(Drive(Line::Scl), RECOVERY_HOLD);
    seq[tail + 2] = RecoveryStep::new(Release(Line::Scl), RECOVERY_HOLD);
    seq[tail + 3] = RecoveryStep::new(Release(Line::Sda), NO_HOLD);
    seq[tail + 4] = RecoveryStep::new(LinesAsPeripheral, NO_HOLD);
    seq
}

/// Execute recovery steps in order, holding after each one as requested.
pub async fn run_recovery<G: GpioBank, D: DelayNs>(
    lines: &BusLines,
    gpio: &mut G,
    delay: &mut D,
    steps: &[RecoveryStep],
) {
    for step in steps {
        match step.action {
            BusAction::LinesAsGpio => lines.set_mode(gpio, PadMode::OUTPUT_OPENDRAIN),
            BusAction::LinesAsPeripheral => lines.route_to_peripheral(gpio),
            BusAction::Release(line) => gpio.set_pad(lines.pad(line)),
            BusAction::Drive(line) => gpio.clear_pad(lines.pad(line)),
        }
        if step.hold.as_ticks() == 0 {
            continue;
        }
        match u32::try_from(step.hold.as_micros()) {
            Ok(us) => delay.delay_us(us).await,
            Err(_) => {
                delay
                    .delay_ms(u32::try_from(step.hold.as_millis()).unwrap_or(u32::MAX))
                    .await
            }
        }
    }
}

struct BusState<G, P, D> {
    gpio: G,
    peripheral: P,
    delay: D,
    running: bool,
}

/// Owned handle to the shared I2C bus.
///
/// Construct once at startup (typically in a `StaticCell`) and hand out
/// `&I2cBus` to every task that needs the bus.
pub struct I2cBus<M: RawMutex, G, P, D> {
    lines: BusLines,
    state: Mutex<M, BusState<G, P, D>>,
}

impl<M, G, P, D> I2cBus<M, G, P, D>
where
    M: RawMutex,
    G: GpioBank,
    P: BusPeripheral,
    D: DelayNs,
{
    /// Create a stopped bus.
    pub fn new(
        lines: BusLines,
        gpio: G,
        peripheral: P,
        delay: D,
    ) -> Self {
        I2cBus {
            lines,
            state: Mutex::new(BusState {
                gpio,
                peripheral,
                delay,
                running: false,
            }),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.running
    }

    /// Route the lines to the peripheral and start it. No-op if running.
    pub async fn start(&self) {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if state.running {
            return;
        }

        self.lines.route_to_peripheral(&mut state.gpio);
        state.peripheral.start(&I2C_CONFIG);
        state.running = true;
        tracing::info!(clock_speed = I2C_CONFIG.clock_speed, "I2C bus started");
    }

    /// Release the lines and stop the peripheral. No-op if stopped.
    pub async fn stop(&self) {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if !state.running {
            return;
        }

        self.lines.set_mode(&mut state.gpio, PadMode::Input);
        state.peripheral.stop();
        state.running = false;
        tracing::info!("I2C bus stopped");
    }

    /// Clock a stuck bus free and reinitialise the peripheral.
    ///
    /// Does nothing unless the bus was started. Always leaves a started bus
    /// running, whether or not the lines actually came free.
    pub async fn try_restore(&self) {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if !state.running {
            tracing::debug!("I2C restore skipped, bus not running");
            return;
        }

        tracing::warn!(pulses = RECOVERY_CLOCK_PULSES, "restoring I2C bus");
        run_recovery(&self.lines, &mut state.gpio, &mut state.delay, &RECOVERY_SEQUENCE).await;

        state.peripheral.force_stopped();
        state.peripheral.start(&I2C_CONFIG);
    }

    /// Run `f` on the peripheral while holding the bus.
    ///
    /// Returns `None` without calling `f` when the bus is stopped.
    pub async fn with_peripheral<R>(
        &self,
        f: impl FnOnce(&mut P) -> R,
    ) -> Option<R> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if !state.running {
            return None;
        }
        Some(f(&mut state.peripheral))
    }
}
