use tracing::trace;

use super::{ForwardingPolicy, RouteContext};
use crate::types::{BusId, Frame};

/// Added to the camera bus when relaying primary-bus traffic to it
pub const CAMERA_BRIDGE_OFFSET: BusId = 10;
/// Target for camera-bus traffic heading to the primary bus
pub const PRIMARY_BRIDGE_TARGET: BusId = 10;
/// Target for everything arriving on bus 1
pub const BUS1_RELAY_TARGET: BusId = 20;

/// Fail-safe topology-only bridge.
///
/// Bridges bus 0 and the learned camera bus, and relays bus 1, until the
/// camera turns up on bus 0. From then on every frame is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl ForwardingPolicy for DefaultPolicy {
    fn route(&mut self, ctx: &RouteContext<'_>, source_bus: BusId, _frame: &Frame) -> Option<BusId> {
        if !ctx.enabled || ctx.topology.camera_detected {
            return None;
        }

        let camera_bus = ctx.topology.camera_bus;
        let mut target = None;
        if source_bus == 0 {
            target = camera_bus.and_then(|bus| bus.checked_add(CAMERA_BRIDGE_OFFSET));
        }
        if camera_bus == Some(source_bus) {
            target = Some(PRIMARY_BRIDGE_TARGET);
        }
        // bus 1 wins even when it is also the camera bus
        if source_bus == 1 {
            target = Some(BUS1_RELAY_TARGET);
        }
        trace!(source_bus, ?target, "default route");
        target
    }
}
