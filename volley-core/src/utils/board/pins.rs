//! Pin assignment of the Volley board.
//!
//! The board wiring is data: [`VOLLEY_PAD_TABLE`] lists every pad with its
//! mode and [`apply_pad_table`] pushes any such table to a [`GpioBank`].

use embedded_hal::digital::PinState;

use super::gpio::{GpioBank, Pad, PadMode, Port};

/// Alternate function routing TIM1 to its output pads.
pub const AF_TIM1: u8 = 1;
/// Alternate function routing I2C2 to PB10/PB11.
pub const AF_I2C2: u8 = 4;

pub const LED_GREEN: Pad = Pad::new(Port::C, 4);
pub const LED_RED: Pad = Pad::new(Port::C, 5);
/// Gate-driver enable, active high.
pub const GATE_ENABLE: Pad = Pad::new(Port::C, 10);
/// Current-sense DC calibration control.
pub const DCCAL: Pad = Pad::new(Port::B, 12);
/// Gate-driver fault output, active low.
pub const FAULT: Pad = Pad::new(Port::C, 12);

pub const HALL_1: Pad = Pad::new(Port::C, 6);
pub const HALL_2: Pad = Pad::new(Port::C, 7);
pub const HALL_3: Pad = Pad::new(Port::C, 8);

/// Identity straps, low bit first.
pub const ID_STRAPS: [Pad; 2] = [Pad::new(Port::C, 1), Pad::new(Port::C, 3)];

pub const I2C_SCL: Pad = Pad::new(Port::B, 10);
pub const I2C_SDA: Pad = Pad::new(Port::B, 11);

/// Banks whose clocks are enabled before any pad is touched.
pub const GPIO_BANKS: [Port; 3] = [Port::A, Port::B, Port::C];

/// One entry of a pad table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadConfig {
    pub pad: Pad,
    pub mode: PadMode,
    /// Level written right after the mode, before the next entry.
    pub initial: Option<PinState>,
}

impl PadConfig {
    pub const fn new(
        pad: Pad,
        mode: PadMode,
    ) -> Self {
        PadConfig {
            pad,
            mode,
            initial: None,
        }
    }

    pub const fn with_initial(
        self,
        state: PinState,
    ) -> Self {
        PadConfig {
            initial: Some(state),
            ..self
        }
    }
}

const fn analog(
    port: Port,
    pin: u8,
) -> PadConfig {
    PadConfig::new(Pad::new(port, pin), PadMode::Analog)
}

const fn pwm(
    port: Port,
    pin: u8,
) -> PadConfig {
    PadConfig::new(Pad::new(port, pin), PadMode::alternate_pushpull(AF_TIM1))
}

pub const VOLLEY_PAD_TABLE: [PadConfig; 27] = [
    // LEDs
    PadConfig::new(LED_GREEN, PadMode::OUTPUT_PUSHPULL),
    PadConfig::new(LED_RED, PadMode::OUTPUT_PUSHPULL),
    // Gate driver, disabled before any PWM pad reaches the timer
    PadConfig::new(GATE_ENABLE, PadMode::OUTPUT_PUSHPULL).with_initial(PinState::Low),
    PadConfig::new(DCCAL, PadMode::OUTPUT_PUSHPULL),
    // TIM1 high side
    pwm(Port::A, 8),
    pwm(Port::A, 9),
    pwm(Port::A, 10),
    // TIM1 low side
    pwm(Port::B, 13),
    pwm(Port::B, 14),
    pwm(Port::B, 15),
    // Hall sensors
    PadConfig::new(HALL_1, PadMode::INPUT_PULLUP),
    PadConfig::new(HALL_2, PadMode::INPUT_PULLUP),
    PadConfig::new(HALL_3, PadMode::INPUT_PULLUP),
    PadConfig::new(FAULT, PadMode::INPUT_PULLUP),
    // ADC inputs
    analog(Port::A, 0),
    analog(Port::A, 1),
    analog(Port::A, 2),
    analog(Port::A, 3),
    analog(Port::A, 4),
    analog(Port::A, 5),
    analog(Port::A, 6),
    analog(Port::B, 0),
    analog(Port::B, 1),
    analog(Port::C, 0),
    analog(Port::C, 1),
    analog(Port::C, 2),
    analog(Port::C, 3),
];

/// Enable the given bank clocks, then set every pad of `table` in order,
/// writing each entry's initial level right after its mode.
pub fn apply_pad_table<G: GpioBank>(
    gpio: &mut G,
    banks: &[Port],
    table: &[PadConfig],
) {
    for &port in banks {
        gpio.enable_clock(port);
    }
    for entry in table {
        gpio.set_pad_mode(entry.pad, entry.mode);
        if let Some(state) = entry.initial {
            gpio.write_pad(entry.pad, state);
        }
    }
    tracing::debug!(banks = banks.len(), pads = table.len(), "pad table applied");
}

/// Configure every pad of the board, leaving the gate driver disabled.
pub fn init_gpio<G: GpioBank>(gpio: &mut G) {
    apply_pad_table(gpio, &GPIO_BANKS, &VOLLEY_PAD_TABLE);
}
