//! SimCapture Manager Library
//!
//! Command implementations behind the `simcapture` binary.

pub mod commands;
