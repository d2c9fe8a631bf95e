//! # `mux` module
//!
//! The `mux` module is the core and center of ethmux.
//! It hides a fixed set of upstream providers behind one interface,
//! picks which one serves each request, retries the rest on failure,
//! and remembers recent answers so identical requests don't pay twice.
//!
//! Per-provider health lives here too, in the registry records that
//! selection reads and request outcomes write.

pub mod cache;
pub mod error;
pub mod multiplexer;
pub mod registry;
pub mod selection;
