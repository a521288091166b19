// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `hellodev echo` command - Write text and read it back.
//!
//! Uses two separate sessions so the data visibly goes through the shared
//! buffer rather than a per-session copy.

use hellodev_core::{FaultPlan, ModuleParams, SessionSignal};

pub async fn execute(params: ModuleParams, text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (host, mut device) = super::load_device(params, FaultPlan::new());
    let path = device.report().node_path.unwrap_or_default();

    let mut writer = host.open(&path, SessionSignal::none())?;
    let written = writer.write(text.as_bytes()).await?;
    writer.close();

    if written.is_partial() {
        println!(
            "! Buffer full: wrote {} of {} bytes",
            written.transferred, written.requested
        );
    }

    let mut reader = host.open(&path, SessionSignal::none())?;
    let mut out = vec![0u8; written.transferred];
    let read = reader.read(&mut out).await?;
    reader.close();
    out.truncate(read.transferred);

    println!("{} → {}", path, String::from_utf8_lossy(&out));

    device.stop();
    Ok(())
}
