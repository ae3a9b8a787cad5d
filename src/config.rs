//! Bridge configuration
//!
//! Engine capability flags and size bounds. Loaded from JSON so that a host
//! can describe the engine family it is embedding without recompiling.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a call's receiver is bound when native code supplies `null`,
/// `undefined` or a primitive as `this`.
///
/// Target engines genuinely disagree here, so the bridge exposes the choice
/// instead of normalizing it away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThisCoercion {
    /// Nullish receivers bind the global object; primitives are boxed
    #[default]
    Sloppy,
    /// Nullish receivers bind the global object; primitive receivers are
    /// rejected with an object-expected failure
    ObjectRequired,
    /// The receiver is delivered exactly as supplied
    Passthrough,
}

impl std::str::FromStr for ThisCoercion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sloppy" => Ok(ThisCoercion::Sloppy),
            "object-required" => Ok(ThisCoercion::ObjectRequired),
            "passthrough" => Ok(ThisCoercion::Passthrough),
            other => Err(format!(
                "unknown this-coercion mode '{}' (expected sloppy, object-required or passthrough)",
                other
            )),
        }
    }
}

/// Bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Receiver binding rule for `call`
    pub this_coercion: ThisCoercion,
    /// Largest array length `array_with_length` accepts
    pub max_array_length: u64,
    /// Deepest handle scope nesting allowed
    pub max_scope_depth: usize,
    /// Longest string, in UTF-16 code units, the engine can hold
    pub max_string_length: usize,
    /// Run pending finalizers when the environment is dropped
    pub finalize_on_drop: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            this_coercion: ThisCoercion::default(),
            max_array_length: u32::MAX as u64,
            max_scope_depth: 65_536,
            max_string_length: (1 << 29) - 24,
            finalize_on_drop: true,
        }
    }
}

impl BridgeConfig {
    /// Parse a configuration from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Set the receiver binding rule
    pub fn with_this_coercion(mut self, mode: ThisCoercion) -> Self {
        self.this_coercion = mode;
        self
    }
}

/// Engine capabilities a native caller can query at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Receiver binding rule in effect
    pub this_coercion: ThisCoercion,
    /// Native API version this surface corresponds to
    pub api_version: u32,
}
