use bitflags::bitflags;
use tracing::{info, warn};

use crate::types::{BusId, CanId, Frame};

/// Lane-keep command sent by the camera, used to locate the camera
pub const LKAS_COMMAND_ID: CanId = 832;

/// Bus shared by the gateway and the vehicle side
pub const PRIMARY_BUS: BusId = 0;

bitflags! {
    /// What a single observation changed
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TopologyChange: u8 {
        const CAMERA_DETECTED = 1;
        const CAMERA_BUS_LEARNED = 2;
        const SECONDARY_SWITCH = 4;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyState {
    /// Camera seen on the primary bus
    pub camera_detected: bool,
    pub camera_bus: Option<BusId>,
    /// Camera seen again on its own bus: the secondary wiring variant
    pub secondary_switch: bool,
}

/// Learns the camera placement from LKAS command traffic.
///
/// State only ever tightens: once the camera shows up on the primary bus the
/// detector stops updating, and a learned camera bus is never reassigned.
#[derive(Debug, Clone, Default)]
pub struct TopologyDetector {
    state: TopologyState,
}

impl TopologyDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TopologyState {
        &self.state
    }

    pub fn camera_detected(&self) -> bool {
        self.state.camera_detected
    }

    pub fn camera_bus(&self) -> Option<BusId> {
        self.state.camera_bus
    }

    pub fn secondary_switch(&self) -> bool {
        self.state.secondary_switch
    }

    /// Feeds one inbound frame and reports what changed
    pub fn observe(&mut self, frame: &Frame) -> TopologyChange {
        let mut change = TopologyChange::empty();
        if self.state.camera_detected || !frame.carries(LKAS_COMMAND_ID) {
            return change;
        }

        if frame.bus() == PRIMARY_BUS {
            warn!(bus = frame.bus(), "camera LKAS command seen on the primary bus");
            self.state.camera_detected = true;
            change |= TopologyChange::CAMERA_DETECTED;
            return change;
        }

        match self.state.camera_bus {
            None => {
                info!(bus = frame.bus(), "camera bus learned");
                self.state.camera_bus = Some(frame.bus());
                change |= TopologyChange::CAMERA_BUS_LEARNED;
            }
            Some(bus) if bus == frame.bus() && !self.state.secondary_switch => {
                info!(bus, "camera seen again on its bus, secondary switch set");
                self.state.secondary_switch = true;
                change |= TopologyChange::SECONDARY_SWITCH;
            }
            Some(_) => {}
        }
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lkas(bus: BusId) -> Frame {
        Frame::standard(bus, LKAS_COMMAND_ID, &[0; 8]).unwrap()
    }

    #[test]
    fn test_camera_on_primary_bus() {
        let mut detector = TopologyDetector::new();
        let change = detector.observe(&lkas(0));
        assert_eq!(change, TopologyChange::CAMERA_DETECTED);
        assert!(detector.camera_detected());
        assert_eq!(detector.camera_bus(), None);
    }

    #[test]
    fn test_camera_bus_then_secondary_switch() {
        let mut detector = TopologyDetector::new();
        assert_eq!(
            detector.observe(&lkas(2)),
            TopologyChange::CAMERA_BUS_LEARNED
        );
        assert!(!detector.secondary_switch());
        assert_eq!(detector.observe(&lkas(2)), TopologyChange::SECONDARY_SWITCH);
        assert!(detector.secondary_switch());
        // already set, nothing new to report
        assert!(detector.observe(&lkas(2)).is_empty());
    }

    #[test]
    fn test_camera_bus_never_reassigned() {
        let mut detector = TopologyDetector::new();
        detector.observe(&lkas(2));
        assert!(detector.observe(&lkas(1)).is_empty());
        assert_eq!(detector.camera_bus(), Some(2));
        assert!(!detector.secondary_switch());
    }

    #[test]
    fn test_no_updates_after_camera_detected() {
        let mut detector = TopologyDetector::new();
        detector.observe(&lkas(0));
        assert!(detector.observe(&lkas(2)).is_empty());
        assert!(detector.observe(&lkas(2)).is_empty());
        assert_eq!(
            detector.state(),
            &TopologyState {
                camera_detected: true,
                camera_bus: None,
                secondary_switch: false,
            }
        );
    }

    #[test]
    fn test_ignores_other_and_extended_frames() {
        let mut detector = TopologyDetector::new();
        detector.observe(&Frame::standard(0, 593, &[0; 8]).unwrap());
        detector.observe(&Frame::extended(0, LKAS_COMMAND_ID, &[0; 8]).unwrap());
        assert_eq!(detector.state(), &TopologyState::default());
    }
}
