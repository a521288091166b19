// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! All types validate their invariants at creation time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;

/// Bits reserved for the minor number in an encoded device number.
pub const MINOR_BITS: u32 = 20;

/// Largest representable minor number.
pub const MAX_MINOR: u32 = (1 << MINOR_BITS) - 1;

/// Largest representable major number.
pub const MAX_MAJOR: u32 = (1 << (32 - MINOR_BITS)) - 1;

/// Validated device instance identifier.
/// Selects the node suffix and the minor number, so it must fit in a minor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct InstanceId(u32);

impl InstanceId {
    /// Create a new InstanceId with range validation.
    pub fn new(value: i64) -> Result<Self, HardValidationError> {
        if value < 0 || value > i64::from(MAX_MINOR) {
            return Err(HardValidationError::InvalidFieldValue {
                field: "param",
                value: value.to_string(),
                reason: format!("Must be between 0 and {}", MAX_MINOR),
            });
        }
        Ok(Self(value as u32))
    }

    /// Get the inner value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for InstanceId {
    type Error = HardValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<InstanceId> for i64 {
    fn from(id: InstanceId) -> Self {
        i64::from(id.0)
    }
}

/// A `major:minor` device number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceNumber {
    major: u32,
    minor: u32,
}

impl DeviceNumber {
    /// Build a device number. Callers hand in numbers that were already
    /// range-checked (a registered major and an [`InstanceId`]).
    pub fn new(major: u32, instance: InstanceId) -> Self {
        Self {
            major,
            minor: instance.value(),
        }
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// Pack into the kernel's `dev_t` layout (`MKDEV`).
    pub fn encode(&self) -> u32 {
        (self.major << MINOR_BITS) | (self.minor & MAX_MINOR)
    }

    /// Unpack a `dev_t` value.
    pub fn decode(raw: u32) -> Self {
        Self {
            major: raw >> MINOR_BITS,
            minor: raw & MAX_MINOR,
        }
    }
}

impl fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}
