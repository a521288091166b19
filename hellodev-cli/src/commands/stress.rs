// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `hellodev stress` command - Concurrent writers on disjoint ranges.
//!
//! Each writer session fills its own span of the buffer with its own byte,
//! in small chunks so the sessions contend for the lock. A final full read
//! checks that no span was torn. Ctrl-C raises the session signal, which
//! interrupts any writer waiting on the lock.

use std::sync::Arc;
use std::time::Instant;

use hellodev_core::{ChannelError, FaultPlan, ModuleParams, SessionSignal, SignalSource};

use crate::error::CliError;

pub async fn execute(
    params: ModuleParams,
    writers: usize,
    chunk: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let (host, mut device) = super::load_device(params, FaultPlan::new());
    let capacity = device.report().capacity.unwrap_or_default();
    let path = device.report().node_path.unwrap_or_default();

    if writers == 0 || writers > capacity {
        return Err(CliError::InvalidWriterCount {
            writers,
            max: capacity,
        }
        .into());
    }
    if chunk == 0 {
        return Err(CliError::ZeroChunk.into());
    }

    let source = Arc::new(SignalSource::new());
    let ctrl_c = {
        let source = Arc::clone(&source);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl-C received, interrupting sessions");
                source.raise();
            }
        })
    };

    let span = capacity / writers;
    let started = Instant::now();

    let mut tasks = Vec::with_capacity(writers);
    for i in 0..writers {
        let mut session = host.open(&path, source.signal())?;
        tasks.push(tokio::spawn(async move {
            let pattern = vec![fill_byte(i); span];
            session.seek_to((i * span) as u64);

            let mut written = 0;
            for piece in pattern.chunks(chunk) {
                written += session.write(piece).await?.transferred;
            }
            Ok::<usize, ChannelError>(written)
        }));
    }

    let mut total = 0;
    for task in tasks {
        match task.await? {
            Ok(written) => total += written,
            Err(ChannelError::Interrupted) => {
                ctrl_c.abort();
                return Err(CliError::Interrupted.into());
            }
        }
    }
    ctrl_c.abort();
    let elapsed = started.elapsed();

    let mut reader = host.open(&path, SessionSignal::none())?;
    let mut out = vec![0u8; span * writers];
    reader.read(&mut out).await?;
    reader.close();

    verify(&out, span)?;

    println!("✓ {} writers, {} bytes in {:?}", writers, total, elapsed);
    println!("✓ All {} spans intact", writers);

    device.stop();
    Ok(())
}

fn fill_byte(writer: usize) -> u8 {
    (writer % 255) as u8 + 1
}

fn verify(buffer: &[u8], span: usize) -> Result<(), CliError> {
    for (i, bytes) in buffer.chunks(span).enumerate() {
        let expected = fill_byte(i);
        if let Some(offset) = bytes.iter().position(|&b| b != expected) {
            return Err(CliError::TornSpan {
                span: i,
                offset: i * span + offset,
                expected,
                found: bytes[offset],
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_detects_torn_span() {
        let mut buffer = vec![fill_byte(0); 4];
        buffer.extend(vec![fill_byte(1); 4]);
        assert!(verify(&buffer, 4).is_ok());

        buffer[6] = fill_byte(0);
        match verify(&buffer, 4) {
            Err(CliError::TornSpan { span, offset, .. }) => {
                assert_eq!(span, 1);
                assert_eq!(offset, 6);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_fill_bytes_are_never_zero() {
        assert!((0..1000).all(|i| fill_byte(i) != 0));
    }
}
