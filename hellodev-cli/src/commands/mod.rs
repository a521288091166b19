// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

pub mod echo;
pub mod load;
pub mod stress;
pub mod validate;

use std::sync::Arc;

use hellodev_core::{
    BufferedChannel, ConfigLoader, DeviceLifecycle, DeviceResult, FaultPlan, ModuleParams,
    SimHost,
};

/// Resolve module parameters: the file first, then the `--param` override.
pub fn resolve_params(config: Option<&str>, param: Option<&str>) -> DeviceResult<ModuleParams> {
    if let Some(value) = param {
        return ConfigLoader::parse_args([format!("param={}", value)]);
    }

    match config {
        Some(path) => ConfigLoader::load_file(path),
        None => Ok(ModuleParams::default()),
    }
}

/// Load the device into a fresh in-memory host.
///
/// A failed registration exits with the host's errno, as a failed module
/// load would.
pub fn load_device(
    params: ModuleParams,
    faults: FaultPlan,
) -> (Arc<SimHost>, DeviceLifecycle<Arc<SimHost>>) {
    let host = Arc::new(SimHost::with_faults(faults));
    let mut device = DeviceLifecycle::new(Arc::clone(&host), params.instance_id());

    if let Err(err) = device.start(Arc::new(BufferedChannel::new())) {
        eprintln!("✗ Failed to load device: {}", err);
        eprintln!("  Registered handles left behind: {}", host.outstanding());
        std::process::exit(err.errno() as i32);
    }

    (host, device)
}
