//! Safety state and the hook contract offered to the CAN driver.
//!
//! All mutable gateway state lives in one [`GatewayState`] value owned by a
//! [`Gateway`]. The driver calls the hooks one at a time and each runs to
//! completion, so an inbound frame's effect on topology, fingerprint and
//! arbitration state is always applied before the next routing decision.

pub mod hooks;


use serde::Deserialize;
use tracing::debug;

use crate::config::GatewayConfig;
use crate::data_link::Mailbox;
use crate::detection::{FingerprintMatcher, TopologyDetector};
use crate::error::Result;
use crate::policy::{
    ArbitrationPolicy, BridgePolicy, DefaultPolicy, ForwardingPolicy, Policy, ProfilePolicy,
    RouteContext,
};
use crate::tamper::TamperUnit;
use crate::types::{BusId, Config, Frame, Ignition, TransmitPath};

pub use hooks::{AllOutputHooks, ArbitrationHooks, FingerprintHooks, ForwardHooks, NoOutputHooks};

/// Operating mode, selected at configuration time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyMode {
    /// Fail-safe default bridge, local controls disallowed
    #[default]
    NoOutput,
    /// Default bridge with controls allowed from init
    AllOutput,
    /// Camera-bus bridge armed by the secondary switch, torque ramp injected
    Forward,
    /// LKAS arbitration between camera and local controller
    HkgArbitration,
    /// Vehicle fingerprinting with profile-based forwarding
    Fingerprint,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafetyState {
    /// Forwarding permitted by the mode; revoked for good on unsafe topology
    pub enabled: bool,
    /// Gates local actuation commands
    pub controls_allowed: bool,
    /// Set at most once per session
    pub identified_car: Option<usize>,
}

/// Outcome of the transmit hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxDecision {
    Block,
    /// Transmit this frame; it may be a rewritten copy of the one offered
    Send(Frame),
}

impl TxDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, TxDecision::Send(_))
    }

    pub fn frame(&self) -> Option<&Frame> {
        match self {
            TxDecision::Send(frame) => Some(frame),
            TxDecision::Block => None,
        }
    }
}

/// Everything the hooks mutate
#[derive(Debug, Clone)]
pub struct GatewayState {
    pub safety: SafetyState,
    pub topology: TopologyDetector,
    pub fingerprint: FingerprintMatcher,
    pub policy: Policy,
    pub tamper: TamperUnit,
}

impl GatewayState {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let policy = match config.mode {
            SafetyMode::NoOutput | SafetyMode::AllOutput => Policy::Default(DefaultPolicy),
            SafetyMode::Forward => Policy::Bridge(BridgePolicy),
            SafetyMode::HkgArbitration => {
                Policy::Arbitration(ArbitrationPolicy::new(config.arbitration.clone())?)
            }
            SafetyMode::Fingerprint => Policy::Profile(ProfilePolicy),
        };
        Ok(Self {
            safety: SafetyState::default(),
            topology: TopologyDetector::new(),
            fingerprint: FingerprintMatcher::new(config.candidates.clone())?,
            policy,
            tamper: TamperUnit::new(config.tamper.clone())?,
        })
    }

    /// Runs the active forwarding policy against the current observations
    pub fn route(&mut self, source_bus: BusId, frame: &Frame) -> Option<BusId> {
        let ctx = RouteContext {
            enabled: self.safety.enabled,
            topology: self.topology.state(),
            profile: self
                .fingerprint
                .identified_candidate()
                .map(|candidate| &candidate.profile),
        };
        self.policy.route(&ctx, source_bus, frame)
    }

    /// Passes `frame` through the tamper unit if it is the target
    pub fn tamper(&mut self, frame: &Frame) -> Frame {
        if self.tamper.targets(frame) {
            self.tamper.apply(frame)
        } else {
            *frame
        }
    }
}

/// Hook contract, one implementation per operating mode
pub trait SafetyHooks {
    /// Sets the initial safety state
    fn init(&self, state: &mut GatewayState, param: i16);

    /// Observes one inbound frame
    fn receive<P: TransmitPath>(&self, state: &mut GatewayState, path: &mut P, frame: &Frame);

    /// Decides whether an outbound frame may go out, and in which form
    fn transmit(&self, state: &mut GatewayState, frame: &Frame) -> TxDecision;

    fn transmit_lin(&self, channel: u8, data: &[u8]) -> bool;

    /// Always defers to hardware ignition sensing
    fn ignition(&self) -> Ignition {
        Ignition::Unknown
    }

    /// Routing decision for a frame received on `source_bus`; `None` drops it
    fn forward(&self, state: &mut GatewayState, source_bus: BusId, frame: &Frame) -> Option<BusId> {
        state.route(source_bus, frame)
    }
}

impl SafetyHooks for SafetyMode {
    fn init(&self, state: &mut GatewayState, param: i16) {
        match self {
            SafetyMode::NoOutput => NoOutputHooks.init(state, param),
            SafetyMode::AllOutput => AllOutputHooks.init(state, param),
            SafetyMode::Forward => ForwardHooks.init(state, param),
            SafetyMode::HkgArbitration => ArbitrationHooks.init(state, param),
            SafetyMode::Fingerprint => FingerprintHooks.init(state, param),
        }
    }

    fn receive<P: TransmitPath>(&self, state: &mut GatewayState, path: &mut P, frame: &Frame) {
        match self {
            SafetyMode::NoOutput => NoOutputHooks.receive(state, path, frame),
            SafetyMode::AllOutput => AllOutputHooks.receive(state, path, frame),
            SafetyMode::Forward => ForwardHooks.receive(state, path, frame),
            SafetyMode::HkgArbitration => ArbitrationHooks.receive(state, path, frame),
            SafetyMode::Fingerprint => FingerprintHooks.receive(state, path, frame),
        }
    }

    fn transmit(&self, state: &mut GatewayState, frame: &Frame) -> TxDecision {
        match self {
            SafetyMode::NoOutput => NoOutputHooks.transmit(state, frame),
            SafetyMode::AllOutput => AllOutputHooks.transmit(state, frame),
            SafetyMode::Forward => ForwardHooks.transmit(state, frame),
            SafetyMode::HkgArbitration => ArbitrationHooks.transmit(state, frame),
            SafetyMode::Fingerprint => FingerprintHooks.transmit(state, frame),
        }
    }

    fn transmit_lin(&self, channel: u8, data: &[u8]) -> bool {
        match self {
            SafetyMode::NoOutput => NoOutputHooks.transmit_lin(channel, data),
            SafetyMode::AllOutput => AllOutputHooks.transmit_lin(channel, data),
            SafetyMode::Forward => ForwardHooks.transmit_lin(channel, data),
            SafetyMode::HkgArbitration => ArbitrationHooks.transmit_lin(channel, data),
            SafetyMode::Fingerprint => FingerprintHooks.transmit_lin(channel, data),
        }
    }
}

/// The gateway engine: configuration, state and the transmit path capability
pub struct Gateway<P: TransmitPath> {
    config: GatewayConfig,
    initial: GatewayState,
    state: GatewayState,
    path: P,
}

impl<P: TransmitPath> Gateway<P> {
    /// Validates `config`, builds the startup state and runs the init hook
    pub fn new(config: GatewayConfig, path: P) -> Result<Self> {
        config.validate()?;
        let initial = GatewayState::new(&config)?;
        let mut gateway = Self {
            state: initial.clone(),
            initial,
            config,
            path,
        };
        gateway.init(gateway.config.init_param);
        Ok(gateway)
    }

    pub fn mode(&self) -> SafetyMode {
        self.config.mode
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    pub fn transmit_path(&self) -> &P {
        &self.path
    }

    pub fn transmit_path_mut(&mut self) -> &mut P {
        &mut self.path
    }

    pub fn init(&mut self, param: i16) {
        debug!(mode = ?self.config.mode, param, "safety init");
        self.config.mode.init(&mut self.state, param);
    }

    pub fn receive(&mut self, frame: &Frame) {
        self.config.mode.receive(&mut self.state, &mut self.path, frame);
    }

    /// Decodes the mailbox registers and observes the frame
    pub fn receive_mailbox(&mut self, mailbox: &Mailbox) {
        self.receive(&Frame::from(mailbox));
    }

    pub fn transmit(&mut self, frame: &Frame) -> TxDecision {
        self.config.mode.transmit(&mut self.state, frame)
    }

    pub fn transmit_lin(&self, channel: u8, data: &[u8]) -> bool {
        self.config.mode.transmit_lin(channel, data)
    }

    pub fn ignition(&self) -> Ignition {
        self.config.mode.ignition()
    }

    pub fn forward(&mut self, source_bus: BusId, frame: &Frame) -> Option<BusId> {
        self.config.mode.forward(&mut self.state, source_bus, frame)
    }

    /// Returns every piece of state to its startup value, as a process reset
    /// would. The transmit path goes back to its power-on state, disabled,
    /// until a mode arms it again.
    pub fn reset(&mut self) {
        debug!(mode = ?self.config.mode, "gateway reset, transmit path disabled");
        self.path.disable_transmit_path();
        self.state = self.initial.clone();
        self.init(self.config.init_param);
    }
}
