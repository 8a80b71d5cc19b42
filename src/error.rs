use thiserror::Error;

use crate::types::{BusId, CanId};

#[derive(Debug, Error)]
pub enum GatewayError {
    // Frame model errors
    #[error("payload of {0} bytes exceeds the 8 byte CAN limit")]
    PayloadTooLong(usize),
    #[error("identifier {id:#x} exceeds the {limit:#x} identifier limit")]
    IdOutOfRange { id: CanId, limit: CanId },
    #[error("bus {0} does not fit the 4-bit bus field")]
    BusOutOfRange(BusId),

    // Fingerprint table errors
    #[error("fingerprint candidate `{0}` has no entries")]
    EmptyCandidate(String),
    #[error("fingerprint candidate `{name}` has {count} entries, at most {limit} are supported")]
    CandidateTooLarge {
        name: String,
        count: usize,
        limit: usize,
    },
    #[error("fingerprint candidate `{name}` lists identifier {id:#x} outside the standard range")]
    CandidateIdOutOfRange { name: String, id: CanId },
    #[error("fingerprint candidate `{name}` lists a {len} byte frame, at most 8 are possible")]
    CandidateLengthOutOfRange { name: String, len: u8 },
    #[error("fingerprint candidate `{name}` lists bus {bus}, which the 4-bit bus field cannot carry")]
    CandidateBusOutOfRange { name: String, bus: BusId },

    // Configuration errors
    #[error("invalid tamper script: {0}")]
    InvalidTamperScript(String),
    #[error("invalid arbitration settings: {0}")]
    InvalidArbitration(String),
    #[error("failed to parse gateway configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
