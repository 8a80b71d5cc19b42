//! CAN bus safety gateway engine.
//!
//! Decides frame by frame whether to allow transmission, where to route
//! traffic between buses, and in one mode how to rewrite a payload before it
//! is relayed. The CAN driver feeds inbound frames to `receive`, asks
//! `transmit` before sending and `forward` for every relay decision.
//!
//! ```rust
//! use libcangate::config::GatewayConfig;
//! use libcangate::physical::mock::RecordingTransmitPath;
//! use libcangate::safety::{Gateway, SafetyMode};
//! use libcangate::types::Frame;
//!
//! let config = GatewayConfig::with_mode(SafetyMode::NoOutput);
//! let mut gateway = Gateway::new(config, RecordingTransmitPath::new()).unwrap();
//!
//! gateway.receive(&Frame::standard(2, 832, &[0; 8]).unwrap());
//! let frame = Frame::standard(0, 0x100, &[0; 8]).unwrap();
//! assert_eq!(gateway.forward(0, &frame), Some(12));
//! ```

// Frame model and wire encoding
pub mod data_link; // Mailbox register layout
pub mod physical; // Transmit path capability
pub mod types;

// Decision engine
pub mod detection; // Topology and fingerprint observers
pub mod policy; // Forwarding strategies
pub mod safety; // Hook contract and operating modes
pub mod tamper; // Torque status rewriting

// Common types and traits
pub mod config;
pub mod error;

// Re-exports for convenience
pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use safety::{Gateway, SafetyMode, TxDecision};
pub use types::Frame;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
