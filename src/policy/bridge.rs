use super::{ForwardingPolicy, RouteContext};
use crate::types::{BusId, Frame};

/// Plain bridge between bus 0 and the camera bus, active only while armed
#[derive(Debug, Clone, Copy, Default)]
pub struct BridgePolicy;

impl ForwardingPolicy for BridgePolicy {
    fn route(&mut self, ctx: &RouteContext<'_>, source_bus: BusId, _frame: &Frame) -> Option<BusId> {
        if !ctx.enabled {
            return None;
        }
        let camera_bus = ctx.topology.camera_bus?;
        if source_bus == 0 {
            Some(camera_bus)
        } else if source_bus == camera_bus {
            Some(0)
        } else {
            None
        }
    }
}
