//! hellodev Core Library
//!
//! A character device exposing one fixed-size shared buffer. Provides the
//! lock-guarded buffered channel, client sessions, the registration
//! lifecycle with ordered rollback, module parameters, and an in-memory
//! registration host.

pub mod channel;
pub mod config;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod session;
pub mod signal;
pub mod state;
pub mod types;
pub mod uaccess;

// Re-export commonly used types
pub use channel::{BufferedChannel, OperationSet, Transfer, DEFAULT_CAPACITY};
pub use config::{ConfigLoader, ModuleParams};
pub use error::{
    ChannelError, DeviceError, DeviceResult, HardValidationError, HostError, LifecycleError,
    RegistrationStep,
};
pub use host::{FaultPlan, HostCall, SimHost};
pub use lifecycle::{DeviceLifecycle, DeviceReport, RegistrationHost, DEVICE_NAME};
pub use session::Session;
pub use signal::{SessionSignal, SignalSource};
pub use state::LifecycleState;
pub use types::{DeviceNumber, InstanceId};
