// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `hellodev load` command - Register the device and report its status.

use clap::ValueEnum;
use nix::errno::Errno;

use hellodev_core::{FaultPlan, ModuleParams, RegistrationStep};

/// Registration step to fail on purpose.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FailStep {
    Identity,
    Class,
    Node,
}

impl From<FailStep> for RegistrationStep {
    fn from(step: FailStep) -> Self {
        match step {
            FailStep::Identity => RegistrationStep::Identity,
            FailStep::Class => RegistrationStep::Class,
            FailStep::Node => RegistrationStep::Node,
        }
    }
}

pub async fn execute(
    params: ModuleParams,
    json: bool,
    fail: Option<FailStep>,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(param = %params.instance_id(), "Loading device");

    let faults = match fail {
        Some(step) => FaultPlan::new().fail(step.into(), Errno::ENOMEM),
        None => FaultPlan::new(),
    };
    let (host, mut device) = super::load_device(params, faults);

    let report = device.report();
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("✓ Device loaded");
        println!();
        println!("  Name:          {}", report.name);
        println!("  Instance:      {}", report.instance_id);
        println!("  State:         {}", report.state);
        if let Some(devt) = &report.device_number {
            println!("  Device number: {}", devt);
        }
        if let Some(path) = &report.node_path {
            println!("  Node:          {}", path);
        }
        if let Some(capacity) = report.capacity {
            println!("  Buffer:        {} bytes", capacity);
        }
        println!("  Host handles:  {}", host.outstanding());
    }

    device.stop();

    if !json {
        println!();
        println!("✓ Device unloaded ({} handles outstanding)", host.outstanding());
    }

    Ok(())
}
