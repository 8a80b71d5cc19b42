//! Read-only observers of inbound traffic.
//!
//! - [`topology`]: learns which bus carries the forward camera
//! - [`fingerprint`]: identifies the vehicle wiring variant from accumulated evidence

pub mod fingerprint;
pub mod topology;

pub use fingerprint::{Candidate, FingerprintMatcher, ForwardingProfile, ProfileRoute};
pub use topology::{TopologyChange, TopologyDetector, TopologyState};
