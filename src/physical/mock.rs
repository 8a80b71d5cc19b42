use crate::types::TransmitPath;

/// One call made on the transmit path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathEvent {
    Enabled,
    Disabled,
}

/// Mock transmit path for testing.
///
/// Records every capability call so tests can assert how often, and in which
/// order, the engine switched the hardware.
#[derive(Debug, Default)]
pub struct RecordingTransmitPath {
    enabled: bool,
    events: Vec<PathEvent>,
}

impl RecordingTransmitPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn events(&self) -> &[PathEvent] {
        &self.events
    }

    pub fn enable_calls(&self) -> usize {
        self.count(PathEvent::Enabled)
    }

    pub fn disable_calls(&self) -> usize {
        self.count(PathEvent::Disabled)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    fn count(&self, event: PathEvent) -> usize {
        self.events.iter().filter(|e| **e == event).count()
    }
}

impl TransmitPath for RecordingTransmitPath {
    fn enable_transmit_path(&mut self) {
        self.enabled = true;
        self.events.push(PathEvent::Enabled);
    }

    fn disable_transmit_path(&mut self) {
        self.enabled = false;
        self.events.push(PathEvent::Disabled);
    }
}
