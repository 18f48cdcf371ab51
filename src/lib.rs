//! Phaseprobe - phased HTTP latency probe
//!
//! Core library: raw request serialization, response boundary detection
//! and the sequential resolve/connect/send/receive timing cycle.

pub mod config;
pub mod http;
pub mod probe;
pub mod report;
