// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Device registration and teardown.
//!
//! `start()` registers the identity, the class and the node, in that order.
//! If a step fails, the steps already completed are released in reverse
//! order before the host's error is returned. `stop()` releases all three in
//! the same reverse order and keeps going past errors.
//!
//! Handles live in `Option` slots and are taken out as they are released, so
//! rollback and teardown share one path and nothing is released twice.

use std::sync::Arc;

use serde::Serialize;

use crate::channel::OperationSet;
use crate::error::{HostError, LifecycleError, RegistrationStep};
use crate::state::LifecycleState;
use crate::types::{DeviceNumber, InstanceId};

/// Name used for the identity, the class, and as the node name prefix.
pub const DEVICE_NAME: &str = "hello";

/// Preferred major passed to the host. Zero asks for a dynamic major.
pub const DYNAMIC_MAJOR: u32 = 0;

/// Proof that an identity is registered.
#[derive(Debug, PartialEq, Eq)]
pub struct IdentityHandle {
    major: u32,
    name: String,
}

impl IdentityHandle {
    pub fn new(major: u32, name: impl Into<String>) -> Self {
        Self {
            major,
            name: name.into(),
        }
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Proof that a device class is registered.
#[derive(Debug, PartialEq, Eq)]
pub struct ClassHandle {
    id: u64,
    name: String,
}

impl ClassHandle {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Proof that a device node exists.
#[derive(Debug, PartialEq, Eq)]
pub struct NodeHandle {
    device_number: DeviceNumber,
    name: String,
}

impl NodeHandle {
    pub fn new(device_number: DeviceNumber, name: impl Into<String>) -> Self {
        Self {
            device_number,
            name: name.into(),
        }
    }

    pub fn device_number(&self) -> DeviceNumber {
        self.device_number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path clients open, e.g. `/dev/hello0`.
    pub fn path(&self) -> String {
        format!("/dev/{}", self.name)
    }
}

/// The hosting registration subsystem.
///
/// Handles are not `Clone`: releasing one consumes it.
pub trait RegistrationHost {
    /// Register `ops` under `name`. A `preferred_major` of 0 asks the host to
    /// pick a free major.
    fn register_identity(
        &self,
        preferred_major: u32,
        name: &str,
        ops: OperationSet,
    ) -> Result<IdentityHandle, HostError>;

    fn unregister_identity(&self, identity: IdentityHandle) -> Result<(), HostError>;

    fn register_class(&self, name: &str) -> Result<ClassHandle, HostError>;

    fn unregister_class(&self, class: ClassHandle) -> Result<(), HostError>;

    fn create_node(
        &self,
        class: &ClassHandle,
        device_number: DeviceNumber,
        name: &str,
    ) -> Result<NodeHandle, HostError>;

    fn destroy_node(&self, class: &ClassHandle, device_number: DeviceNumber)
        -> Result<(), HostError>;
}

impl<H: RegistrationHost + ?Sized> RegistrationHost for Arc<H> {
    fn register_identity(
        &self,
        preferred_major: u32,
        name: &str,
        ops: OperationSet,
    ) -> Result<IdentityHandle, HostError> {
        (**self).register_identity(preferred_major, name, ops)
    }

    fn unregister_identity(&self, identity: IdentityHandle) -> Result<(), HostError> {
        (**self).unregister_identity(identity)
    }

    fn register_class(&self, name: &str) -> Result<ClassHandle, HostError> {
        (**self).register_class(name)
    }

    fn unregister_class(&self, class: ClassHandle) -> Result<(), HostError> {
        (**self).unregister_class(class)
    }

    fn create_node(
        &self,
        class: &ClassHandle,
        device_number: DeviceNumber,
        name: &str,
    ) -> Result<NodeHandle, HostError> {
        (**self).create_node(class, device_number, name)
    }

    fn destroy_node(
        &self,
        class: &ClassHandle,
        device_number: DeviceNumber,
    ) -> Result<(), HostError> {
        (**self).destroy_node(class, device_number)
    }
}

/// Handles acquired so far. `node` implies `class` implies `identity`.
#[derive(Debug, Default)]
pub struct DeviceHandles {
    identity: Option<IdentityHandle>,
    class: Option<ClassHandle>,
    node: Option<NodeHandle>,
}

impl DeviceHandles {
    pub fn identity(&self) -> Option<&IdentityHandle> {
        self.identity.as_ref()
    }

    pub fn class(&self) -> Option<&ClassHandle> {
        self.class.as_ref()
    }

    pub fn node(&self) -> Option<&NodeHandle> {
        self.node.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.identity.is_none() && self.class.is_none() && self.node.is_none()
    }
}

/// Status snapshot of a device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    pub name: &'static str,
    pub instance_id: u32,
    pub state: String,
    pub device_number: Option<String>,
    pub node_path: Option<String>,
    pub capacity: Option<usize>,
}

/// Registration lifecycle of one device instance.
///
/// `start` and `stop` must be called from one thread, at most once each,
/// `start` first. A second `start` is rejected; `stop` in any state other
/// than `NodeCreated` does nothing. Dropping a started lifecycle stops it.
#[derive(Debug)]
pub struct DeviceLifecycle<H: RegistrationHost> {
    host: H,
    instance: InstanceId,
    state: LifecycleState,
    handles: DeviceHandles,
    capacity: Option<usize>,
}

impl<H: RegistrationHost> DeviceLifecycle<H> {
    pub fn new(host: H, instance: InstanceId) -> Self {
        Self {
            host,
            instance,
            state: LifecycleState::Empty,
            handles: DeviceHandles::default(),
            capacity: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn handles(&self) -> &DeviceHandles {
        &self.handles
    }

    /// Name of the node this instance creates, e.g. `hello2`.
    pub fn node_name(&self) -> String {
        format!("{}{}", DEVICE_NAME, self.instance)
    }

    /// Register the device and bind `ops` to it.
    ///
    /// On failure every completed step has been released and the lifecycle
    /// is `Failed`; the host's error is returned unchanged inside
    /// [`LifecycleError::RegistrationFailed`].
    pub fn start(&mut self, ops: OperationSet) -> Result<&DeviceHandles, LifecycleError> {
        if self.state != LifecycleState::Empty {
            return Err(LifecycleError::InvalidState {
                operation: "start",
                state: self.state,
            });
        }

        tracing::info!(param = %self.instance, "Loading with param");

        if let Err(err) = self.register(ops) {
            tracing::error!(error = %err, state = %self.state, "Registration failed, rolling back");
            self.release_all();
            self.transition_to(LifecycleState::Failed);
            return Err(err);
        }

        Ok(&self.handles)
    }

    /// Tear the device down. Never fails: errors from individual steps are
    /// logged and the remaining steps still run.
    pub fn stop(&mut self) {
        if self.state != LifecycleState::NodeCreated {
            tracing::warn!(state = %self.state, "Stop requested on a device that is not running");
            return;
        }

        tracing::info!("Unloading");
        self.release_all();
        self.transition_to(LifecycleState::Stopped);
    }

    pub fn report(&self) -> DeviceReport {
        DeviceReport {
            name: DEVICE_NAME,
            instance_id: self.instance.value(),
            state: self.state.to_string(),
            device_number: self.handles.node().map(|n| n.device_number().to_string()),
            node_path: self.handles.node().map(NodeHandle::path),
            capacity: self.capacity,
        }
    }

    fn register(&mut self, ops: OperationSet) -> Result<(), LifecycleError> {
        let capacity = ops.capacity();

        let identity = self
            .host
            .register_identity(DYNAMIC_MAJOR, DEVICE_NAME, ops)
            .map_err(|source| LifecycleError::RegistrationFailed {
                step: RegistrationStep::Identity,
                source,
            })?;
        let device_number = DeviceNumber::new(identity.major(), self.instance);
        self.handles.identity = Some(identity);
        self.capacity = Some(capacity);
        self.transition_to(LifecycleState::IdentityRegistered);

        let class = self.host.register_class(DEVICE_NAME).map_err(|source| {
            LifecycleError::RegistrationFailed {
                step: RegistrationStep::Class,
                source,
            }
        })?;
        self.transition_to(LifecycleState::ClassRegistered);

        let node_name = self.node_name();
        let class = self.handles.class.insert(class);
        let node = self
            .host
            .create_node(class, device_number, &node_name)
            .map_err(|source| LifecycleError::RegistrationFailed {
                step: RegistrationStep::Node,
                source,
            })?;
        tracing::info!(node = %node.path(), device_number = %device_number, "Device node created");
        self.handles.node = Some(node);
        self.transition_to(LifecycleState::NodeCreated);

        Ok(())
    }

    /// Release whatever is held, innermost first.
    fn release_all(&mut self) {
        if let Some(node) = self.handles.node.take() {
            match self.handles.class.as_ref() {
                Some(class) => {
                    if let Err(err) = self.host.destroy_node(class, node.device_number()) {
                        tracing::warn!(node = %node.path(), error = %err, "Failed to destroy device node");
                    }
                }
                None => {
                    tracing::error!(node = %node.path(), "Device node held without a class, cannot destroy it");
                }
            }
        }

        if let Some(class) = self.handles.class.take() {
            if let Err(err) = self.host.unregister_class(class) {
                tracing::warn!(error = %err, "Failed to unregister device class");
            }
        }

        if let Some(identity) = self.handles.identity.take() {
            let major = identity.major();
            if let Err(err) = self.host.unregister_identity(identity) {
                tracing::warn!(major, error = %err, "Failed to unregister device identity");
            }
        }

        self.capacity = None;
    }

    fn transition_to(&mut self, target: LifecycleState) {
        debug_assert!(
            self.state.can_transition_to(target),
            "invalid lifecycle transition {} -> {}",
            self.state,
            target
        );

        tracing::debug!(from = self.state.name(), to = target.name(), "State transition");
        self.state = target;
    }
}

impl<H: RegistrationHost> Drop for DeviceLifecycle<H> {
    fn drop(&mut self) {
        if self.state == LifecycleState::NodeCreated {
            self.stop();
        }
    }
}
