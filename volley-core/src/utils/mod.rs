//! Utility re-exports and helper macros for the Volley board.
//!
//! - `board`: pad table, ADC channel maps and strap-derived board identity
//! - `controllers`: I2C bus lifecycle, board outputs and command routing
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod board;
pub mod controllers;

pub use board::identity::{hw_id_from_pins, BoardId, MotorPosition};
pub use controllers::{BoardSupport, SystemCommand, SystemController};
pub use embassy_time::Duration;
#[doc(hidden)]
pub use static_cell;

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: $crate::utils::static_cell::StaticCell<$t> =
            $crate::utils::static_cell::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}
