//! Board identity from the strap resistors.
//!
//! Three identical boards drive the three motors of one machine. Two strap
//! resistors tell them apart:
//!
//! | PC3 | PC1 | id | position |
//! |-----|-----|----|----------|
//! | 0   | 0   | 10 | top      |
//! | 0   | 1   | 11 | left     |
//! | 1   | 0   | 12 | right    |
//! | 1   | 1   | 13 | unused   |

use embedded_hal::digital::PinState;
use serde::{Deserialize, Serialize};

use super::{
    gpio::{GpioBank, PadMode},
    pins::ID_STRAPS,
    BoardError,
};

/// Offset added to the strap value.
pub const ID_BASE: u8 = 10;

/// Controller id derived from the straps, always in `10..=13`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardId(u8);

impl BoardId {
    pub const TOP: BoardId = BoardId(ID_BASE);
    pub const LEFT: BoardId = BoardId(ID_BASE + 1);
    pub const RIGHT: BoardId = BoardId(ID_BASE + 2);
    pub const RESERVED: BoardId = BoardId(ID_BASE + 3);

    /// Build the id from the two strap levels, `low` being PC1.
    pub const fn from_straps(
        low: bool,
        high: bool,
    ) -> BoardId {
        BoardId((((high as u8) << 1) | low as u8) + ID_BASE)
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl From<BoardId> for u8 {
    fn from(id: BoardId) -> u8 {
        id.0
    }
}

/// Which motor this board drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorPosition {
    Top,
    Left,
    Right,
}

impl TryFrom<BoardId> for MotorPosition {
    type Error = BoardError;

    fn try_from(id: BoardId) -> Result<Self, Self::Error> {
        match id {
            BoardId::TOP => Ok(MotorPosition::Top),
            BoardId::LEFT => Ok(MotorPosition::Left),
            BoardId::RIGHT => Ok(MotorPosition::Right),
            other => Err(BoardError::ReservedId(other.get())),
        }
    }
}

/// Write access to the controller id of an application configuration.
pub trait ControllerIdentity {
    fn set_controller_id(
        &mut self,
        id: u8,
    );
}

/// Write access to the direction flag of a motor configuration.
pub trait DirectionInversion {
    fn set_invert_direction(
        &mut self,
        invert: bool,
    );
}

/// Application configuration fields touched by the board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfiguration {
    pub controller_id: u8,
}

impl ControllerIdentity for AppConfiguration {
    fn set_controller_id(
        &mut self,
        id: u8,
    ) {
        self.controller_id = id;
    }
}

/// Motor configuration fields touched by the board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McConfiguration {
    pub m_invert_direction: bool,
}

impl DirectionInversion for McConfiguration {
    fn set_invert_direction(
        &mut self,
        invert: bool,
    ) {
        self.m_invert_direction = invert;
    }
}

/// Sample the straps and derive the board id.
///
/// The strap pads are switched to input mode first, so this is safe to call
/// after `init_gpio` has made them analog.
pub fn hw_id_from_pins<G: GpioBank>(gpio: &mut G) -> BoardId {
    let mut levels = [false; ID_STRAPS.len()];
    for (level, &pad) in levels.iter_mut().zip(ID_STRAPS.iter()) {
        gpio.set_pad_mode(pad, PadMode::Input);
        *level = gpio.read_pad(pad) == PinState::High;
    }

    let id = BoardId::from_straps(levels[0], levels[1]);
    tracing::debug!(id = id.get(), "board id from straps");
    id
}

pub fn init_app_config<G: GpioBank, C: ControllerIdentity + ?Sized>(
    gpio: &mut G,
    conf: &mut C,
) {
    let id = hw_id_from_pins(gpio);
    conf.set_controller_id(id.get());
}

/// Only the left motor keeps its default direction.
pub fn init_mc_config<G: GpioBank, C: DirectionInversion + ?Sized>(
    gpio: &mut G,
    conf: &mut C,
) {
    let id = hw_id_from_pins(gpio);
    conf.set_invert_direction(id != BoardId::LEFT);
}
