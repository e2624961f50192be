//! Individual device probes
//!
//! Each probe reads one facet of the host and returns a display value. Probes
//! may fail or panic; containment is the aggregator's job.

pub mod device;
pub mod fingerprint;
pub mod identity;
pub mod network;
pub mod timing;

pub use identity::{BrowserIdentity, IdentityParser};
