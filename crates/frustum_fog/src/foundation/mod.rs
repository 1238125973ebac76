//! Shared utilities: nalgebra aliases, slotmap handles, the frame clock and
//! logger setup

pub mod collections;
pub mod logging;
pub mod math;
pub mod time;
