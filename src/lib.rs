//! ascii-generator library crate.
//!
//! The rendering engine lives in [`ascii`]; the other modules are the
//! collaborators the binary wires around it.

pub mod ascii;
pub mod cli;
pub mod config;
pub mod convert;
pub mod fonts;
pub mod logging;
pub mod raster;
pub mod video;
