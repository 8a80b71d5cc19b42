//! Forwarding Policy Engine.
//!
//! Every strategy answers one question per frame: which bus (if any) should
//! this frame be relayed to. `None` means drop.
//!
//! - [`DefaultPolicy`]: topology-only fail-safe bridge
//! - [`BridgePolicy`]: plain camera-bus bridge armed by the forward mode
//! - [`ArbitrationPolicy`]: LKAS command arbitration between two controllers
//! - [`ProfilePolicy`]: table lookup into the matched fingerprint profile
//!
//! Some targets are encoded values understood by the bus driver rather than
//! plain bus numbers; they are passed through untouched.

pub mod arbitration;
pub mod bridge;
pub mod default;
pub mod profile;

pub use arbitration::{ArbitrationConfig, ArbitrationPolicy, ArbitrationState};
pub use bridge::BridgePolicy;
pub use default::DefaultPolicy;
pub use profile::ProfilePolicy;

use crate::detection::{ForwardingProfile, TopologyState};
use crate::types::{BusId, Frame};

/// Observations a policy may consult, all fully applied before routing
#[derive(Debug, Clone, Copy)]
pub struct RouteContext<'a> {
    /// Forwarding not yet revoked by the safety state
    pub enabled: bool,
    pub topology: &'a TopologyState,
    /// Profile of the identified car, if any
    pub profile: Option<&'a ForwardingProfile>,
}

/// Routing strategy trait
pub trait ForwardingPolicy {
    fn route(&mut self, ctx: &RouteContext<'_>, source_bus: BusId, frame: &Frame) -> Option<BusId>;
}

/// The strategy selected at configuration time
#[derive(Debug, Clone)]
pub enum Policy {
    Default(DefaultPolicy),
    Bridge(BridgePolicy),
    Arbitration(ArbitrationPolicy),
    Profile(ProfilePolicy),
}

impl Policy {
    pub fn arbitration(&self) -> Option<&ArbitrationPolicy> {
        match self {
            Policy::Arbitration(policy) => Some(policy),
            _ => None,
        }
    }

    pub fn arbitration_mut(&mut self) -> Option<&mut ArbitrationPolicy> {
        match self {
            Policy::Arbitration(policy) => Some(policy),
            _ => None,
        }
    }
}

impl ForwardingPolicy for Policy {
    fn route(&mut self, ctx: &RouteContext<'_>, source_bus: BusId, frame: &Frame) -> Option<BusId> {
        match self {
            Policy::Default(policy) => policy.route(ctx, source_bus, frame),
            Policy::Bridge(policy) => policy.route(ctx, source_bus, frame),
            Policy::Arbitration(policy) => policy.route(ctx, source_bus, frame),
            Policy::Profile(policy) => policy.route(ctx, source_bus, frame),
        }
    }
}
