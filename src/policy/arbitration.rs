use serde::Deserialize;
use tracing::{debug, trace, warn};

use super::{ForwardingPolicy, RouteContext};
use crate::detection::topology::{LKAS_COMMAND_ID, PRIMARY_BUS};
use crate::error::{GatewayError, Result};
use crate::tamper::TORQUE_STATUS_ID;
use crate::types::{BusId, CanId, Config, Frame};

/// Routing constants of the arbitration mode.
///
/// Targets are encoded values handed to the bus driver as-is.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArbitrationConfig {
    /// LKAS command issued by both the camera and the local controller
    pub command_id: CanId,
    /// Status frame that echoes the active steering command
    pub status_id: CanId,
    /// Bus the camera talks on
    pub camera_bus: BusId,
    /// Target for bus 0 traffic
    pub primary_target: BusId,
    /// Target for the status frame while the local command is live
    pub status_target: BusId,
    /// Target for bus 1 traffic
    pub bus1_target: BusId,
    /// Camera commands suppressed per local command
    pub live_countdown: u8,
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        Self {
            command_id: LKAS_COMMAND_ID,
            status_id: TORQUE_STATUS_ID,
            camera_bus: 2,
            primary_target: 12,
            status_target: 10,
            bus1_target: 20,
            live_countdown: 20,
        }
    }
}

impl Config for ArbitrationConfig {
    fn validate(&self) -> Result<()> {
        if self.camera_bus == PRIMARY_BUS || self.camera_bus == 1 {
            return Err(GatewayError::InvalidArbitration(format!(
                "camera bus {} collides with bus 0 or bus 1 routing",
                self.camera_bus
            )));
        }
        if self.live_countdown == 0 {
            return Err(GatewayError::InvalidArbitration(
                "live countdown must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArbitrationState {
    /// Cleared for good when the camera command shows up on bus 0
    pub forwarding_enabled: bool,
    /// One camera command has been let through since the countdown ran out
    pub own_command_forwarded: bool,
    /// Camera commands still to suppress before one may pass
    pub own_command_live_countdown: u8,
}

impl Default for ArbitrationState {
    fn default() -> Self {
        Self {
            forwarding_enabled: true,
            own_command_forwarded: false,
            own_command_live_countdown: 0,
        }
    }
}

/// Arbitrates the LKAS command between the camera and the local controller.
///
/// While the local command is live, camera commands on the camera bus are
/// suppressed one per countdown tick. When the countdown runs out exactly
/// one camera command passes, then suppression resumes until the next local
/// command rearms the countdown.
#[derive(Debug, Clone, Default)]
pub struct ArbitrationPolicy {
    config: ArbitrationConfig,
    state: ArbitrationState,
}

impl ArbitrationPolicy {
    pub fn new(config: ArbitrationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: ArbitrationState::default(),
        })
    }

    pub fn config(&self) -> &ArbitrationConfig {
        &self.config
    }

    pub fn state(&self) -> &ArbitrationState {
        &self.state
    }

    pub fn forwarding_enabled(&self) -> bool {
        self.state.forwarding_enabled
    }

    /// Watches inbound traffic; returns true on the frame that engages the fallback
    pub fn observe(&mut self, frame: &Frame) -> bool {
        if !self.state.forwarding_enabled
            || frame.bus() != PRIMARY_BUS
            || !frame.carries(self.config.command_id)
        {
            return false;
        }
        warn!(
            id = self.config.command_id,
            "camera command on bus 0, arbitration disabled, swapping bus 0 and 1"
        );
        self.state.forwarding_enabled = false;
        true
    }

    /// Records an outbound frame. A local LKAS command rearms the countdown
    /// only after the previous one ran out and released its camera command.
    pub fn note_transmit(&mut self, frame: &Frame) {
        let state = &self.state;
        if !frame.carries(self.config.command_id)
            || state.own_command_live_countdown > 0
            || !state.own_command_forwarded
        {
            return;
        }
        debug!(
            countdown = self.config.live_countdown,
            "local LKAS command live, countdown rearmed"
        );
        self.state.own_command_live_countdown = self.config.live_countdown;
        self.state.own_command_forwarded = false;
    }

    fn route_camera_command(&mut self) -> Option<BusId> {
        let state = &mut self.state;
        if state.own_command_live_countdown > 0 {
            state.own_command_live_countdown -= 1;
            trace!(
                countdown = state.own_command_live_countdown,
                "camera command suppressed"
            );
            return None;
        }
        if state.own_command_forwarded {
            return None;
        }
        debug!("countdown expired, releasing one camera command");
        state.own_command_forwarded = true;
        Some(PRIMARY_BUS)
    }

    pub fn reset(&mut self) {
        self.state = ArbitrationState::default();
    }
}

impl ForwardingPolicy for ArbitrationPolicy {
    fn route(&mut self, _ctx: &RouteContext<'_>, source_bus: BusId, frame: &Frame) -> Option<BusId> {
        if !self.state.forwarding_enabled {
            return match source_bus {
                0 => Some(1),
                1 => Some(0),
                _ => None,
            };
        }

        match source_bus {
            0 if frame.carries(self.config.status_id)
                && self.state.own_command_live_countdown > 0 =>
            {
                Some(self.config.status_target)
            }
            0 => Some(self.config.primary_target),
            1 => Some(self.config.bus1_target),
            bus if bus == self.config.camera_bus => {
                if frame.carries(self.config.command_id) {
                    self.route_camera_command()
                } else {
                    Some(PRIMARY_BUS)
                }
            }
            _ => None,
        }
    }
}
