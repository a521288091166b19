// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Module parameters.
//!
//! The device takes a single integer parameter, `param`, which selects the
//! instance (node suffix and minor number). It is read once at load time,
//! either from a YAML file or from insmod-style `key=value` arguments, and
//! is read-only afterwards. Invalid values stop the device from loading.

use std::path::Path;

use serde::Deserialize;

use crate::error::{DeviceError, DeviceResult, HardValidationError};
use crate::types::InstanceId;

/// Raw parameters as parsed from YAML (before validation).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawParams {
    #[serde(default)]
    param: i64,
}

/// Raw root configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    params: RawParams,
}

/// Validated module parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleParams {
    instance_id: InstanceId,
}

impl ModuleParams {
    pub fn new(instance_id: InstanceId) -> Self {
        Self { instance_id }
    }

    /// The `param` value.
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate parameters from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> DeviceResult<ModuleParams> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DeviceError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| DeviceError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load and validate parameters from a YAML string. An empty document
    /// yields the defaults.
    pub fn load_string(content: &str) -> DeviceResult<ModuleParams> {
        if content.trim().is_empty() {
            return Self::validate(RawConfig::default());
        }

        let raw: RawConfig = serde_yaml::from_str(content).map_err(|e| DeviceError::ConfigParse {
            message: format!("YAML parse error: {}", e),
        })?;

        Self::validate(raw)
    }

    /// Parse insmod-style arguments such as `["param=2"]`. Later arguments
    /// override earlier ones.
    pub fn parse_args<I, S>(args: I) -> DeviceResult<ModuleParams>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut raw = RawConfig::default();

        for arg in args {
            let arg = arg.as_ref().trim();
            if arg.is_empty() {
                continue;
            }

            let (key, value) =
                arg.split_once('=')
                    .ok_or_else(|| HardValidationError::MalformedArgument {
                        argument: arg.to_string(),
                    })?;

            match key.trim() {
                "param" => raw.params.param = parse_int(value.trim())?,
                other => {
                    return Err(HardValidationError::UnknownParameter {
                        name: other.to_string(),
                    }
                    .into())
                }
            }
        }

        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> DeviceResult<ModuleParams> {
        let instance_id = InstanceId::new(raw.params.param)?;
        Ok(ModuleParams { instance_id })
    }
}

/// Parse an integer the way the kernel parses `int` parameters: optional
/// sign, then decimal, `0x` hex or leading-zero octal.
fn parse_int(value: &str) -> Result<i64, HardValidationError> {
    let invalid = || HardValidationError::InvalidFieldValue {
        field: "param",
        value: value.to_string(),
        reason: "Not an integer".to_string(),
    };

    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };

    let (radix, body) = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };

    // One sign only; `from_str_radix` would accept a second one.
    if body.starts_with(['+', '-']) {
        return Err(invalid());
    }

    let magnitude = i64::from_str_radix(body, radix).map_err(|_| invalid())?;

    if negative {
        magnitude.checked_neg().ok_or_else(invalid)
    } else {
        Ok(magnitude)
    }
}
