//! # `health` module
//!
//! Background probing of every provider in the registry. Failed probes walk
//! the same failure counter as failed requests, so backends that die quietly
//! drift into cooldown before a caller ever trips over them.

pub mod check;
