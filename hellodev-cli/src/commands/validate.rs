// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `hellodev validate` command - Validate a module parameter file.

use hellodev_core::{ConfigLoader, DEVICE_NAME};

pub async fn execute(file: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(file = %file, "Validating module parameters");

    match ConfigLoader::load_file(file) {
        Ok(params) => {
            println!("✓ Module parameters are valid");
            println!();
            println!("  param:         {}", params.instance_id());
            println!("  Node:          /dev/{}{}", DEVICE_NAME, params.instance_id());
            println!("  Minor number:  {}", params.instance_id().value());
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Module parameter validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}
