use super::{ForwardingPolicy, RouteContext};
use crate::types::{BusId, Frame};

/// Direct lookup into the matched candidate's forwarding profile.
///
/// Drops everything until a car is identified, once forwarding is revoked,
/// and any bus the profile does not map.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfilePolicy;

impl ForwardingPolicy for ProfilePolicy {
    fn route(&mut self, ctx: &RouteContext<'_>, source_bus: BusId, _frame: &Frame) -> Option<BusId> {
        if !ctx.enabled {
            return None;
        }
        ctx.profile?.target(source_bus)
    }
}
