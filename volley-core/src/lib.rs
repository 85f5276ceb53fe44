//! Board support for the Volley motor controller on no-std embedded platforms.
//!
//! For a hosted run of the startup sequence, see `volley-app/mock-mcu`.
#![no_std]

pub mod utils;
