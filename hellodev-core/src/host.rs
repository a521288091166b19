// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! SimHost - in-memory registration subsystem.
//!
//! Stands in for the kernel's chrdev/class/device registries: allocates
//! majors, rejects duplicates, resolves `/dev/<node>` paths to the operation
//! set bound to the node's major, and counts every call so tests can check
//! that each handle is released exactly once.
//!
//! A [`FaultPlan`] makes chosen steps fail with a chosen errno. Faults are
//! deterministic and fixed when the host is built.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use dashmap::DashMap;
use nix::errno::Errno;

use crate::channel::OperationSet;
use crate::error::{HostError, RegistrationStep};
use crate::lifecycle::{ClassHandle, IdentityHandle, NodeHandle, RegistrationHost};
use crate::session::Session;
use crate::signal::SessionSignal;
use crate::types::{DeviceNumber, MAX_MAJOR};

/// Highest major handed out dynamically; allocation walks downwards.
pub const DYNAMIC_MAJOR_START: u32 = 254;

/// Lowest major handed out dynamically.
pub const DYNAMIC_MAJOR_END: u32 = 234;

/// Host entry points, for call accounting and teardown faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCall {
    RegisterIdentity,
    UnregisterIdentity,
    RegisterClass,
    UnregisterClass,
    CreateNode,
    DestroyNode,
}

impl HostCall {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RegisterIdentity => "register_chrdev",
            Self::UnregisterIdentity => "unregister_chrdev",
            Self::RegisterClass => "class_create",
            Self::UnregisterClass => "class_destroy",
            Self::CreateNode => "device_create",
            Self::DestroyNode => "device_destroy",
        }
    }

    fn is_teardown(&self) -> bool {
        matches!(
            self,
            Self::UnregisterIdentity | Self::UnregisterClass | Self::DestroyNode
        )
    }
}

impl From<RegistrationStep> for HostCall {
    fn from(step: RegistrationStep) -> Self {
        match step {
            RegistrationStep::Identity => Self::RegisterIdentity,
            RegistrationStep::Class => Self::RegisterClass,
            RegistrationStep::Node => Self::CreateNode,
        }
    }
}

/// Faults to inject into a [`SimHost`].
///
/// ```
/// use hellodev_core::host::{FaultPlan, HostCall};
/// use hellodev_core::error::RegistrationStep;
/// use nix::errno::Errno;
///
/// let plan = FaultPlan::new()
///     .fail(RegistrationStep::Class, Errno::ENOMEM)
///     .fail_teardown(HostCall::DestroyNode, Errno::EIO);
/// assert_eq!(plan.fault_for(HostCall::RegisterClass), Some(Errno::ENOMEM));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    faults: HashMap<HostCall, Errno>,
}

impl FaultPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a registration step fail.
    pub fn fail(mut self, step: RegistrationStep, errno: Errno) -> Self {
        self.faults.insert(step.into(), errno);
        self
    }

    /// Make a teardown call report `errno` and leave its resource in place.
    /// Registration calls are rejected in debug builds and ignored in
    /// release builds; use [`Self::fail`] for those.
    pub fn fail_teardown(mut self, call: HostCall, errno: Errno) -> Self {
        debug_assert!(
            call.is_teardown(),
            "{} is not a teardown call",
            call.name()
        );
        if call.is_teardown() {
            self.faults.insert(call, errno);
        }
        self
    }

    pub fn fault_for(&self, call: HostCall) -> Option<Errno> {
        self.faults.get(&call).copied()
    }
}

#[derive(Debug)]
struct IdentityEntry {
    name: String,
    ops: OperationSet,
}

#[derive(Debug)]
struct NodeEntry {
    class_id: u64,
    name: String,
}

/// In-memory registration subsystem.
#[derive(Debug, Default)]
pub struct SimHost {
    identities: DashMap<u32, IdentityEntry>,
    classes: DashMap<u64, String>,
    /// Keyed by the encoded device number.
    nodes: DashMap<u32, NodeEntry>,
    next_class_id: AtomicU64,
    calls: DashMap<HostCall, usize>,
    teardown_log: Mutex<Vec<HostCall>>,
    faults: FaultPlan,
}

impl SimHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: FaultPlan) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }

    /// Number of identities, classes and nodes currently registered.
    pub fn outstanding(&self) -> usize {
        self.identities.len() + self.classes.len() + self.nodes.len()
    }

    /// How many times `call` was made, successful or not.
    pub fn calls(&self, call: HostCall) -> usize {
        self.calls.get(&call).map(|c| *c).unwrap_or(0)
    }

    /// Teardown calls in the order they were made.
    pub fn teardown_log(&self) -> Vec<HostCall> {
        self.teardown_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Paths of all device nodes, sorted.
    pub fn node_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .nodes
            .iter()
            .map(|n| format!("/dev/{}", n.name))
            .collect();
        paths.sort();
        paths
    }

    /// Open a device node the way a client would, e.g. `/dev/hello0`.
    pub fn open(&self, path: &str, signal: SessionSignal) -> Result<Session, HostError> {
        let name = path.strip_prefix("/dev/").unwrap_or(path);

        let device_number = self
            .nodes
            .iter()
            .find(|n| n.name == name)
            .map(|n| DeviceNumber::decode(*n.key()))
            .ok_or_else(|| HostError::NodeNotFound {
                path: path.to_string(),
            })?;

        let ops = self
            .identities
            .get(&device_number.major())
            .map(|entry| OperationSet::clone(&entry.ops))
            .ok_or(HostError::IdentityNotFound {
                major: device_number.major(),
            })?;

        Ok(Session::open(ops, signal))
    }

    /// Count the call and apply any injected fault.
    fn enter(&self, call: HostCall) -> Result<(), HostError> {
        *self.calls.entry(call).or_insert(0) += 1;

        if call.is_teardown() {
            if let Ok(mut log) = self.teardown_log.lock() {
                log.push(call);
            }
        }

        match self.faults.fault_for(call) {
            Some(errno) => {
                tracing::debug!(call = call.name(), %errno, "Injected host fault");
                Err(errno_error(call, errno))
            }
            None => Ok(()),
        }
    }

    fn allocate_major(&self) -> Option<u32> {
        (DYNAMIC_MAJOR_END..=DYNAMIC_MAJOR_START)
            .rev()
            .find(|major| !self.identities.contains_key(major))
    }
}

fn errno_error(call: HostCall, errno: Errno) -> HostError {
    HostError::Errno {
        operation: call.name(),
        errno,
    }
}

impl RegistrationHost for SimHost {
    fn register_identity(
        &self,
        preferred_major: u32,
        name: &str,
        ops: OperationSet,
    ) -> Result<IdentityHandle, HostError> {
        let call = HostCall::RegisterIdentity;
        self.enter(call)?;

        let major = match preferred_major {
            0 => self
                .allocate_major()
                .ok_or_else(|| errno_error(call, Errno::EBUSY))?,
            major if major > MAX_MAJOR => return Err(errno_error(call, Errno::EINVAL)),
            major if self.identities.contains_key(&major) => {
                return Err(errno_error(call, Errno::EBUSY))
            }
            major => major,
        };

        self.identities.insert(
            major,
            IdentityEntry {
                name: name.to_string(),
                ops,
            },
        );
        tracing::debug!(major, name, "Registered identity");

        Ok(IdentityHandle::new(major, name))
    }

    fn unregister_identity(&self, identity: IdentityHandle) -> Result<(), HostError> {
        let call = HostCall::UnregisterIdentity;
        self.enter(call)?;

        match self.identities.remove(&identity.major()) {
            Some((_, entry)) if entry.name == identity.name() => Ok(()),
            Some((major, entry)) => {
                self.identities.insert(major, entry);
                Err(errno_error(call, Errno::EINVAL))
            }
            None => Err(errno_error(call, Errno::EINVAL)),
        }
    }

    fn register_class(&self, name: &str) -> Result<ClassHandle, HostError> {
        let call = HostCall::RegisterClass;
        self.enter(call)?;

        if self.classes.iter().any(|c| c.value() == name) {
            return Err(errno_error(call, Errno::EEXIST));
        }

        let id = self.next_class_id.fetch_add(1, Ordering::Relaxed);
        self.classes.insert(id, name.to_string());
        tracing::debug!(id, name, "Registered class");

        Ok(ClassHandle::new(id, name))
    }

    fn unregister_class(&self, class: ClassHandle) -> Result<(), HostError> {
        let call = HostCall::UnregisterClass;
        self.enter(call)?;

        self.classes
            .remove(&class.id())
            .map(|_| ())
            .ok_or_else(|| errno_error(call, Errno::EINVAL))
    }

    fn create_node(
        &self,
        class: &ClassHandle,
        device_number: DeviceNumber,
        name: &str,
    ) -> Result<NodeHandle, HostError> {
        let call = HostCall::CreateNode;
        self.enter(call)?;

        if !self.classes.contains_key(&class.id()) {
            return Err(errno_error(call, Errno::EINVAL));
        }
        if self.nodes.contains_key(&device_number.encode())
            || self.nodes.iter().any(|n| n.name == name)
        {
            return Err(errno_error(call, Errno::EEXIST));
        }

        self.nodes.insert(
            device_number.encode(),
            NodeEntry {
                class_id: class.id(),
                name: name.to_string(),
            },
        );
        tracing::debug!(%device_number, name, "Created node");

        Ok(NodeHandle::new(device_number, name))
    }

    fn destroy_node(
        &self,
        class: &ClassHandle,
        device_number: DeviceNumber,
    ) -> Result<(), HostError> {
        let call = HostCall::DestroyNode;
        self.enter(call)?;

        self.nodes
            .remove_if(&device_number.encode(), |_, node| node.class_id == class.id())
            .map(|_| ())
            .ok_or_else(|| errno_error(call, Errno::ENODEV))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::channel::BufferedChannel;
    use crate::types::InstanceId;

    fn ops() -> OperationSet {
        Arc::new(BufferedChannel::new())
    }

    #[test]
    fn test_dynamic_majors_count_down() {
        let host = SimHost::new();
        let first = host.register_identity(0, "a", ops()).unwrap();
        let second = host.register_identity(0, "b", ops()).unwrap();
        assert_eq!(first.major(), DYNAMIC_MAJOR_START);
        assert_eq!(second.major(), DYNAMIC_MAJOR_START - 1);
    }

    #[test]
    fn test_preferred_major_conflict() {
        let host = SimHost::new();
        host.register_identity(60, "a", ops()).unwrap();
        let err = host.register_identity(60, "b", ops()).unwrap_err();
        assert_eq!(err.errno(), Errno::EBUSY);
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let host = SimHost::new();
        host.register_class("hello").unwrap();
        let err = host.register_class("hello").unwrap_err();
        assert_eq!(err.errno(), Errno::EEXIST);
    }

    #[test]
    fn test_open_resolves_node_to_operation_set() {
        let host = SimHost::new();
        let identity = host.register_identity(0, "hello", ops()).unwrap();
        let class = host.register_class("hello").unwrap();
        let devt = DeviceNumber::new(identity.major(), InstanceId::new(4).unwrap());
        host.create_node(&class, devt, "hello4").unwrap();

        assert_eq!(host.node_paths(), vec!["/dev/hello4".to_string()]);
        assert!(host.open("/dev/hello4", SessionSignal::none()).is_ok());
        assert!(matches!(
            host.open("/dev/hello5", SessionSignal::none()),
            Err(HostError::NodeNotFound { .. })
        ));
    }

    #[test]
    fn test_destroy_requires_matching_class() {
        let host = SimHost::new();
        let identity = host.register_identity(0, "hello", ops()).unwrap();
        let class = host.register_class("hello").unwrap();
        let other = host.register_class("other").unwrap();
        let devt = DeviceNumber::new(identity.major(), InstanceId::default());
        host.create_node(&class, devt, "hello0").unwrap();

        assert!(host.destroy_node(&other, devt).is_err());
        assert!(host.destroy_node(&class, devt).is_ok());
        assert!(host.destroy_node(&class, devt).is_err());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "is not a teardown call")]
    fn test_teardown_fault_rejects_registration_call() {
        let _ = FaultPlan::new().fail_teardown(HostCall::RegisterClass, Errno::EIO);
    }

    #[test]
    fn test_teardown_fault_keeps_resource() {
        let host = SimHost::with_faults(
            FaultPlan::new().fail_teardown(HostCall::UnregisterClass, Errno::EIO),
        );
        let class = host.register_class("hello").unwrap();
        let err = host.unregister_class(class).unwrap_err();
        assert_eq!(err.errno(), Errno::EIO);
        assert_eq!(host.outstanding(), 1);
        assert_eq!(host.calls(HostCall::UnregisterClass), 1);
    }
}
