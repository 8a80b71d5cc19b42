use serde::Deserialize;

use crate::error::{GatewayError, Result};

/// CAN ID type
pub type CanId = u32;

/// CAN bus number as carried in the mailbox bus field
pub type BusId = u8;

/// Highest identifier of an 11-bit standard frame
pub const MAX_STANDARD_ID: CanId = 0x7FF;

/// Highest identifier of a 29-bit extended frame
pub const MAX_EXTENDED_ID: CanId = 0x1FFF_FFFF;

/// Highest bus number the 4-bit bus field can carry
pub const MAX_BUS: BusId = 0xF;

/// Classic CAN payload limit
pub const MAX_PAYLOAD: usize = 8;

/// One CAN frame as seen by the gateway.
///
/// Immutable once built: rewriting a payload yields a new frame. `len` is
/// the declared length from the wire and may exceed the payload limit on a
/// malformed frame; `payload()` never reads past eight bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    bus: BusId,
    id: CanId,
    len: u8,
    data: [u8; MAX_PAYLOAD],
    is_extended: bool,
}

impl Frame {
    /// Creates a standard (11-bit) frame
    pub fn standard(bus: BusId, id: CanId, payload: &[u8]) -> Result<Self> {
        Self::build(bus, id, payload, false)
    }

    /// Creates an extended (29-bit) frame
    pub fn extended(bus: BusId, id: CanId, payload: &[u8]) -> Result<Self> {
        Self::build(bus, id, payload, true)
    }

    fn build(bus: BusId, id: CanId, payload: &[u8], is_extended: bool) -> Result<Self> {
        if bus > MAX_BUS {
            return Err(GatewayError::BusOutOfRange(bus));
        }
        let limit = if is_extended {
            MAX_EXTENDED_ID
        } else {
            MAX_STANDARD_ID
        };
        if id > limit {
            return Err(GatewayError::IdOutOfRange { id, limit });
        }
        if payload.len() > MAX_PAYLOAD {
            return Err(GatewayError::PayloadTooLong(payload.len()));
        }

        let mut data = [0u8; MAX_PAYLOAD];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            bus,
            id,
            len: payload.len() as u8,
            data,
            is_extended,
        })
    }

    /// Builds a frame from already-masked wire fields
    pub(crate) fn from_wire(
        bus: BusId,
        id: CanId,
        len: u8,
        data: [u8; MAX_PAYLOAD],
        is_extended: bool,
    ) -> Self {
        Self {
            bus: bus & MAX_BUS,
            id: id & MAX_EXTENDED_ID,
            len,
            data,
            is_extended,
        }
    }

    pub fn bus(&self) -> BusId {
        self.bus
    }

    pub fn id(&self) -> CanId {
        self.id
    }

    /// Declared length, possibly above eight on a malformed frame
    pub fn len(&self) -> u8 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_extended(&self) -> bool {
        self.is_extended
    }

    /// All eight payload bytes, including any beyond the declared length
    pub fn data(&self) -> &[u8; MAX_PAYLOAD] {
        &self.data
    }

    /// Payload bytes covered by the declared length
    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.len).min(MAX_PAYLOAD)]
    }

    /// Whether topology and fingerprint logic may look at this frame.
    ///
    /// Extended frames and frames declaring more than eight bytes are relayed
    /// at most, never pattern-matched.
    pub fn is_interpretable(&self) -> bool {
        !self.is_extended && self.id <= MAX_STANDARD_ID && usize::from(self.len) <= MAX_PAYLOAD
    }

    /// The (bus, id, length) triple used for matching, if the frame is interpretable
    pub fn signature(&self) -> Option<Signature> {
        self.is_interpretable().then_some(Signature {
            bus: self.bus,
            id: self.id,
            len: self.len,
        })
    }

    /// Whether this is an interpretable frame carrying `id`
    pub fn carries(&self, id: CanId) -> bool {
        self.is_interpretable() && self.id == id
    }

    /// Returns a new frame with the same header and a replaced 8-byte payload
    pub fn with_payload(&self, data: [u8; MAX_PAYLOAD]) -> Self {
        Self {
            data,
            len: MAX_PAYLOAD as u8,
            ..*self
        }
    }
}

/// The (bus, identifier, length) triple a fingerprint entry is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct Signature {
    pub bus: BusId,
    pub id: CanId,
    pub len: u8,
}

impl Signature {
    pub const fn new(bus: BusId, id: CanId, len: u8) -> Self {
        Self { bus, id, len }
    }
}

/// Ignition state reported by the safety hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignition {
    /// Defer to hardware ignition sensing
    Unknown,
    Off,
    On,
}

/// Configuration trait that must be implemented by all gateway configurations
pub trait Config {
    fn validate(&self) -> Result<()>;
}

/// Hardware capability that gates the bus arbitration transmit path.
///
/// Implemented by platform code; both calls must be idempotent.
pub trait TransmitPath {
    fn enable_transmit_path(&mut self);
    fn disable_transmit_path(&mut self);
}

impl<T: TransmitPath + ?Sized> TransmitPath for &mut T {
    fn enable_transmit_path(&mut self) {
        (**self).enable_transmit_path();
    }

    fn disable_transmit_path(&mut self) {
        (**self).disable_transmit_path();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_frame_limits() {
        assert!(Frame::standard(0, 0x7FF, &[0; 8]).is_ok());
        assert!(matches!(
            Frame::standard(0, 0x800, &[]),
            Err(GatewayError::IdOutOfRange { id: 0x800, .. })
        ));
        assert!(matches!(
            Frame::standard(0, 0x100, &[0; 9]),
            Err(GatewayError::PayloadTooLong(9))
        ));
        assert!(matches!(
            Frame::standard(16, 0x100, &[]),
            Err(GatewayError::BusOutOfRange(16))
        ));
    }

    #[test]
    fn test_extended_frames_are_not_interpretable() {
        let frame = Frame::extended(0, 832, &[0; 8]).unwrap();
        assert!(!frame.is_interpretable());
        assert_eq!(frame.signature(), None);
        assert!(!frame.carries(832));
    }

    #[test]
    fn test_signature_of_standard_frame() {
        let frame = Frame::standard(2, 832, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(frame.signature(), Some(Signature::new(2, 832, 8)));
        assert_eq!(frame.payload(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_wire_fields_are_masked() {
        let frame = Frame::from_wire(0xFA, 0x100, 8, [0; 8], false);
        assert_eq!(frame.bus(), 0xA);
    }

    #[test]
    fn test_oversized_declared_length_is_clamped() {
        let frame = Frame::from_wire(0, 0x100, 15, [0xAA; 8], false);
        assert_eq!(frame.payload().len(), 8);
        assert!(!frame.is_interpretable());
    }
}
