//! Ambient utilities shared by the Pinkcoin crates: the logging facade and a drop-reporting stopwatch.

extern crate self as pink_core;

pub mod log;
pub mod time;
