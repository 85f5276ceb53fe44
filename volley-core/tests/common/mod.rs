//! Recording fakes shared by the integration tests.
#![allow(dead_code)]

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use embedded_hal::digital::PinState;
use embedded_hal_async::delay::DelayNs;
use volley_core::utils::{
    board::{
        adc::{Adc, AdcSequencer, ChannelSlot, Sequence},
        gpio::{GpioBank, Pad, PadMode, Port},
    },
    controllers::i2c::{BusPeripheral, I2cConfig},
};

/// Everything the fakes saw, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Clock(Port),
    Mode(Pad, PadMode),
    Read(Pad),
    Write(Pad, PinState),
    DelayUs(u32),
    DelayMs(u32),
    Adc(Adc, Sequence, ChannelSlot),
    PeriphStart(I2cConfig),
    PeriphStop,
    PeriphForceStopped,
}

pub type Log = Rc<RefCell<Vec<Event>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn take(log: &Log) -> Vec<Event> {
    log.borrow_mut().drain(..).collect()
}

#[derive(Clone)]
pub struct FakeGpio {
    log: Log,
    inputs: Rc<RefCell<HashMap<Pad, PinState>>>,
}

impl FakeGpio {
    pub fn new(log: &Log) -> Self {
        FakeGpio {
            log: log.clone(),
            inputs: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Level returned by later reads of `pad`; unset pads read low.
    pub fn drive_input(
        &self,
        pad: Pad,
        state: PinState,
    ) {
        self.inputs.borrow_mut().insert(pad, state);
    }
}

impl GpioBank for FakeGpio {
    fn enable_clock(
        &mut self,
        port: Port,
    ) {
        self.log.borrow_mut().push(Event::Clock(port));
    }

    fn set_pad_mode(
        &mut self,
        pad: Pad,
        mode: PadMode,
    ) {
        self.log.borrow_mut().push(Event::Mode(pad, mode));
    }

    fn read_pad(
        &mut self,
        pad: Pad,
    ) -> PinState {
        self.log.borrow_mut().push(Event::Read(pad));
        self.inputs
            .borrow()
            .get(&pad)
            .copied()
            .unwrap_or(PinState::Low)
    }

    fn write_pad(
        &mut self,
        pad: Pad,
        state: PinState,
    ) {
        self.log.borrow_mut().push(Event::Write(pad, state));
    }
}

pub struct FakeAdc {
    log: Log,
}

impl FakeAdc {
    pub fn new(log: &Log) -> Self {
        FakeAdc { log: log.clone() }
    }
}

impl AdcSequencer for FakeAdc {
    fn configure_channel(
        &mut self,
        adc: Adc,
        sequence: Sequence,
        slot: ChannelSlot,
    ) {
        self.log.borrow_mut().push(Event::Adc(adc, sequence, slot));
    }
}

pub struct FakePeripheral {
    log: Log,
}

impl FakePeripheral {
    pub fn new(log: &Log) -> Self {
        FakePeripheral { log: log.clone() }
    }
}

impl BusPeripheral for FakePeripheral {
    fn start(
        &mut self,
        config: &I2cConfig,
    ) {
        self.log.borrow_mut().push(Event::PeriphStart(*config));
    }

    fn stop(&mut self) {
        self.log.borrow_mut().push(Event::PeriphStop);
    }

    fn force_stopped(&mut self) {
        self.log.borrow_mut().push(Event::PeriphForceStopped);
    }
}

/// Logs each delay and yields once, so other futures get a chance to run.
pub struct FakeDelay {
    log: Log,
}

impl FakeDelay {
    pub fn new(log: &Log) -> Self {
        FakeDelay { log: log.clone() }
    }
}

impl DelayNs for FakeDelay {
    async fn delay_ns(
        &mut self,
        ns: u32,
    ) {
        self.log.borrow_mut().push(Event::DelayUs(ns / 1_000));
        embassy_futures::yield_now().await;
    }

    async fn delay_us(
        &mut self,
        us: u32,
    ) {
        self.log.borrow_mut().push(Event::DelayUs(us));
        embassy_futures::yield_now().await;
    }

    async fn delay_ms(
        &mut self,
        ms: u32,
    ) {
        self.log.borrow_mut().push(Event::DelayMs(ms));
        embassy_futures::yield_now().await;
    }
}

/// Line levels and framing conditions reconstructed from pad writes.
#[derive(Debug, Default)]
pub struct WireTrace {
    pub scl_falling_edges: usize,
    pub starts: usize,
    pub stops: usize,
    pub scl_high: bool,
    pub sda_high: bool,
}

impl WireTrace {
    /// Replay the writes of `events`; both lines start released.
    pub fn replay(
        events: &[Event],
        scl: Pad,
        sda: Pad,
    ) -> Self {
        let mut trace = WireTrace {
            scl_high: true,
            sda_high: true,
            ..Default::default()
        };
        for event in events {
            let Event::Write(pad, state) = event else {
                continue;
            };
            let high = *state == PinState::High;
            if *pad == scl {
                if trace.scl_high && !high {
                    trace.scl_falling_edges += 1;
                }
                trace.scl_high = high;
            } else if *pad == sda {
                if trace.scl_high && trace.sda_high && !high {
                    trace.starts += 1;
                }
                if trace.scl_high && !trace.sda_high && high {
                    trace.stops += 1;
                }
                trace.sda_high = high;
            }
        }
        trace
    }
}
