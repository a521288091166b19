// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Device registration states.
//!
//! Registration walks Empty → IdentityRegistered → ClassRegistered →
//! NodeCreated. Failed is reachable from every non-terminal state and is
//! absorbing. Stop moves NodeCreated to Stopped.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Nothing registered yet.
    Empty,

    /// The identity (major number and operation set) is registered.
    IdentityRegistered,

    /// The device class exists.
    ClassRegistered,

    /// The device node exists. Clients can open the device.
    NodeCreated,

    /// A registration step failed and the completed steps were rolled back.
    Failed,

    /// Everything was torn down by `stop()`.
    Stopped,
}

impl LifecycleState {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::IdentityRegistered => "IdentityRegistered",
            Self::ClassRegistered => "ClassRegistered",
            Self::NodeCreated => "NodeCreated",
            Self::Failed => "Failed",
            Self::Stopped => "Stopped",
        }
    }

    /// Check if transition to the target state is valid.
    pub fn can_transition_to(&self, target: LifecycleState) -> bool {
        matches!(
            (self, target),
            (Self::Empty, Self::IdentityRegistered)
                | (Self::IdentityRegistered, Self::ClassRegistered)
                | (Self::ClassRegistered, Self::NodeCreated)
                | (Self::Empty, Self::Failed)
                | (Self::IdentityRegistered, Self::Failed)
                | (Self::ClassRegistered, Self::Failed)
                | (Self::NodeCreated, Self::Stopped)
        )
    }

    /// No further transitions are possible.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Failed | Self::Stopped)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
