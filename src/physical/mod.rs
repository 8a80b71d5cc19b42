//! Physical side of the gateway.
//!
//! The CAN peripheral driver and its interrupt plumbing live outside this
//! crate. The engine only reaches the hardware through the
//! [`TransmitPath`](crate::types::TransmitPath) capability, which platform
//! code implements to switch the bus arbitration transmit path.
//!
//! # Examples
//!
//! ```rust
//! use libcangate::physical::mock::RecordingTransmitPath;
//! use libcangate::types::TransmitPath;
//!
//! let mut path = RecordingTransmitPath::new();
//! path.enable_transmit_path();
//! assert!(path.is_enabled());
//! ```

pub mod mock;
