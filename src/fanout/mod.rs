//! Cross-process fanout
//!
//! One process's publish reaches subscribers connected to any other process
//! by riding the distributed bus; this module delivers whatever arrives on
//! the bus (and locally-originated broadcasts) to the local members held in
//! the channel registry, suppressing the echo back to the origin connection.

pub mod relay;

pub use relay::FanoutRelay;
