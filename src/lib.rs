//! The _scepc_ library crate: a client for the Simple Certificate
//! Enrollment Protocol.

pub mod cli;
pub mod commons;
pub mod config;
pub mod constants;
pub mod scep;
