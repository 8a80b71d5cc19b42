use tracing::{info, warn};

use super::{GatewayState, SafetyHooks, TxDecision};
use crate::detection::TopologyChange;
use crate::types::{Frame, TransmitPath};

/// Topology observation shared by the default bridge modes.
///
/// Forwarding is revoked and the transmit path disabled exactly once, on the
/// frame that reveals the camera on the primary bus.
fn default_receive<P: TransmitPath>(state: &mut GatewayState, path: &mut P, frame: &Frame) {
    state.topology.observe(frame);
    if state.safety.enabled && state.topology.camera_detected() {
        warn!("camera connected to the primary bus, forwarding disabled");
        state.safety.enabled = false;
        path.disable_transmit_path();
    }
}

/// Tampers the frame if targeted and lets it go out
fn send_tampered(state: &mut GatewayState, frame: &Frame) -> TxDecision {
    TxDecision::Send(state.tamper(frame))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoOutputHooks;

impl SafetyHooks for NoOutputHooks {
    fn init(&self, state: &mut GatewayState, _param: i16) {
        state.safety.controls_allowed = false;
        state.safety.enabled = true;
    }

    fn receive<P: TransmitPath>(&self, state: &mut GatewayState, path: &mut P, frame: &Frame) {
        default_receive(state, path, frame);
    }

    fn transmit(&self, _state: &mut GatewayState, frame: &Frame) -> TxDecision {
        TxDecision::Send(*frame)
    }

    fn transmit_lin(&self, _channel: u8, _data: &[u8]) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AllOutputHooks;

impl SafetyHooks for AllOutputHooks {
    fn init(&self, state: &mut GatewayState, _param: i16) {
        state.safety.controls_allowed = true;
        state.safety.enabled = true;
    }

    fn receive<P: TransmitPath>(&self, state: &mut GatewayState, path: &mut P, frame: &Frame) {
        default_receive(state, path, frame);
    }

    fn transmit(&self, _state: &mut GatewayState, frame: &Frame) -> TxDecision {
        TxDecision::Send(*frame)
    }

    fn transmit_lin(&self, _channel: u8, _data: &[u8]) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardHooks;

impl SafetyHooks for ForwardHooks {
    fn init(&self, state: &mut GatewayState, _param: i16) {
        state.safety.controls_allowed = false;
        state.safety.enabled = false;
    }

    fn receive<P: TransmitPath>(&self, state: &mut GatewayState, path: &mut P, frame: &Frame) {
        state.topology.observe(frame);
        let topology = state.topology.state();

        if !state.safety.enabled && !topology.camera_detected && topology.secondary_switch {
            info!(camera_bus = ?topology.camera_bus, "secondary switch seen, forwarding enabled");
            state.safety.enabled = true;
            path.enable_transmit_path();
        }
        if state.safety.enabled && state.topology.camera_detected() {
            warn!("camera connected to the primary bus, forwarding disabled");
            state.safety.enabled = false;
            path.disable_transmit_path();
        }
    }

    fn transmit(&self, state: &mut GatewayState, frame: &Frame) -> TxDecision {
        if !state.safety.enabled {
            return TxDecision::Block;
        }
        send_tampered(state, frame)
    }

    fn transmit_lin(&self, _channel: u8, _data: &[u8]) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ArbitrationHooks;

impl SafetyHooks for ArbitrationHooks {
    fn init(&self, state: &mut GatewayState, _param: i16) {
        state.safety.controls_allowed = false;
        state.safety.enabled = true;
    }

    fn receive<P: TransmitPath>(&self, state: &mut GatewayState, _path: &mut P, frame: &Frame) {
        state.topology.observe(frame);
        if let Some(arbitration) = state.policy.arbitration_mut() {
            arbitration.observe(frame);
        }
    }

    fn transmit(&self, state: &mut GatewayState, frame: &Frame) -> TxDecision {
        match state.policy.arbitration_mut() {
            Some(arbitration) if arbitration.forwarding_enabled() => {
                arbitration.note_transmit(frame);
            }
            _ => return TxDecision::Block,
        }
        send_tampered(state, frame)
    }

    fn transmit_lin(&self, _channel: u8, _data: &[u8]) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintHooks;

impl SafetyHooks for FingerprintHooks {
    fn init(&self, state: &mut GatewayState, _param: i16) {
        state.safety.controls_allowed = false;
        state.safety.enabled = false;
    }

    fn receive<P: TransmitPath>(&self, state: &mut GatewayState, path: &mut P, frame: &Frame) {
        let camera_change = state.topology.observe(frame);
        if let Some(index) = state.fingerprint.observe(frame) {
            state.safety.identified_car = Some(index);
            if !state.topology.camera_detected() {
                state.safety.enabled = true;
                path.enable_transmit_path();
            }
        }
        if camera_change.contains(TopologyChange::CAMERA_DETECTED) {
            warn!(
                identified_car = ?state.safety.identified_car,
                "camera connected to the primary bus, profile forwarding disabled"
            );
            state.safety.enabled = false;
            path.disable_transmit_path();
        }
    }

    fn transmit(&self, state: &mut GatewayState, frame: &Frame) -> TxDecision {
        if !state.safety.enabled || state.safety.identified_car.is_none() {
            return TxDecision::Block;
        }
        TxDecision::Send(*frame)
    }

    fn transmit_lin(&self, _channel: u8, _data: &[u8]) -> bool {
        false
    }
}
