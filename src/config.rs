//! Gateway configuration.
//!
//! Defaults reproduce the stock firmware. A configuration can also be loaded
//! from TOML:
//!
//! ```rust
//! use libcangate::config::GatewayConfig;
//! use libcangate::safety::SafetyMode;
//!
//! let config = GatewayConfig::from_toml_str(
//!     r#"
//!     mode = "fingerprint"
//!
//!     [[candidates]]
//!     name = "camera_on_bus2"
//!     entries = [{ bus = 2, id = 832, len = 8 }, { bus = 0, id = 339, len = 8 }]
//!     profile.routes = [{ from = 0, to = 2 }, { from = 2, to = 0 }]
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.mode, SafetyMode::Fingerprint);
//! assert_eq!(config.candidates.len(), 1);
//! ```

use serde::Deserialize;

use crate::detection::{Candidate, ForwardingProfile};
use crate::error::Result;
use crate::policy::ArbitrationConfig;
use crate::safety::SafetyMode;
use crate::tamper::TamperScript;
use crate::types::{Config, Signature};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub mode: SafetyMode,
    /// Parameter handed to the init hook
    pub init_param: i16,
    /// Fingerprint candidates in priority order
    pub candidates: Vec<Candidate>,
    pub arbitration: ArbitrationConfig,
    pub tamper: TamperScript,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mode: SafetyMode::default(),
            init_param: 0,
            candidates: builtin_candidates(),
            arbitration: ArbitrationConfig::default(),
            tamper: TamperScript::default(),
        }
    }
}

impl GatewayConfig {
    /// Default configuration running `mode`
    pub fn with_mode(mode: SafetyMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }
}

impl Config for GatewayConfig {
    fn validate(&self) -> Result<()> {
        for candidate in &self.candidates {
            candidate.validate()?;
        }
        self.arbitration.validate()?;
        self.tamper.validate()
    }
}

/// Known wiring variants: camera isolated on bus 2 or on bus 1
pub fn builtin_candidates() -> Vec<Candidate> {
    vec![
        Candidate::new(
            "hkg_camera_bus2",
            &[
                Signature::new(2, 832, 8),
                Signature::new(0, 339, 8),
                Signature::new(0, 593, 8),
            ],
            ForwardingProfile::new(&[(0, 2), (2, 0)]),
        ),
        Candidate::new(
            "hkg_camera_bus1",
            &[
                Signature::new(1, 832, 8),
                Signature::new(0, 339, 8),
                Signature::new(0, 593, 8),
            ],
            ForwardingProfile::new(&[(0, 1), (1, 0)]),
        ),
    ]
}
