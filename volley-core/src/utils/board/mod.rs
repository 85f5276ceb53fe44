//! Board support for the Volley motor controller.
//!
//! - `gpio`: pad-level GPIO seam and pad modes
//! - `pins`: pad assignment table and `init_gpio`
//! - `adc`: converter channel/rank maps
//! - `identity`: strap-derived board id and configuration patchers

pub mod adc;
pub mod gpio;
pub mod identity;
pub mod pins;

use adc::Sequence;

/// Errors raised at the typed edges of the board layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    /// Id 13 (both straps set) has no motor position.
    ReservedId(u8),
    InvalidRank { sequence: Sequence, rank: u8 },
}

impl core::fmt::Display for BoardError {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        match self {
            BoardError::ReservedId(id) => write!(f, "board id {id} is reserved"),
            BoardError::InvalidRank { sequence, rank } => {
                write!(f, "rank {rank} is out of range for the {sequence:?} sequence")
            }
        }
    }
}
