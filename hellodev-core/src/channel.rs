// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! BufferedChannel - the device's single shared buffer.
//!
//! One fixed-capacity, zero-initialised byte buffer behind one lock. Every
//! transfer is clamped to the buffer, so no offset or length supplied by a
//! client can reach outside it. Copies to and from client buffers may stop
//! short; the short count is returned to the client and the cursor only
//! advances by what actually moved.

use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::error::ChannelError;
use crate::signal::SessionSignal;
use crate::uaccess::{UserReader, UserWriter};

/// Capacity of the device buffer in bytes.
pub const DEFAULT_CAPACITY: usize = 4096;

const DEFAULT_CAPACITY_NONZERO: NonZeroUsize = match NonZeroUsize::new(DEFAULT_CAPACITY) {
    Some(capacity) => capacity,
    None => panic!("DEFAULT_CAPACITY must be non-zero"),
};

/// The `{open, close, read, write}` set bound to a device identity.
pub type OperationSet = Arc<BufferedChannel>;

/// Outcome of a read or write.
///
/// `transferred < requested` is a normal result: the request was clamped to
/// the buffer, or the client buffer faulted mid-copy. The caller decides
/// whether to retry from the advanced cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub requested: usize,
    pub transferred: usize,
}

impl Transfer {
    pub fn is_partial(&self) -> bool {
        self.transferred < self.requested
    }
}

/// The shared buffer and the lock guarding it.
#[derive(Debug)]
pub struct BufferedChannel {
    capacity: usize,
    storage: Mutex<Box<[u8]>>,
}

impl BufferedChannel {
    /// Create a channel with [`DEFAULT_CAPACITY`] bytes.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY_NONZERO)
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        let capacity = capacity.get();
        tracing::debug!(capacity, "Created buffered channel");
        Self {
            capacity,
            storage: Mutex::new(vec![0u8; capacity].into_boxed_slice()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// A client opened the device. Nothing to set up.
    pub fn open(&self) {
        tracing::info!("Open");
    }

    /// A client closed the device. Nothing to tear down.
    pub fn close(&self) {
        tracing::info!("Close");
    }

    /// Copy from the buffer at `*offset` into `dest`, then advance `*offset`
    /// by the number of bytes copied.
    pub async fn read<W>(
        &self,
        dest: &mut W,
        offset: &mut u64,
        signal: &SessionSignal,
    ) -> Result<Transfer, ChannelError>
    where
        W: UserWriter + ?Sized,
    {
        let storage = self.lock(signal).await?;

        let requested = dest.len();
        let window = self.window(*offset, requested);
        let effective = window.len();
        let untransferred = dest.copy_to_user(&storage[window]).min(effective);
        drop(storage);

        let transferred = effective - untransferred;
        *offset += transferred as u64;

        tracing::debug!(requested, effective, transferred, offset = *offset, "read");

        Ok(Transfer {
            requested,
            transferred,
        })
    }

    /// Copy `src` into the buffer at `*offset`, then advance `*offset` by the
    /// number of bytes copied.
    pub async fn write<R>(
        &self,
        src: &mut R,
        offset: &mut u64,
        signal: &SessionSignal,
    ) -> Result<Transfer, ChannelError>
    where
        R: UserReader + ?Sized,
    {
        let mut storage = self.lock(signal).await?;

        let requested = src.len();
        let window = self.window(*offset, requested);
        let effective = window.len();
        let untransferred = src.copy_from_user(&mut storage[window]).min(effective);
        drop(storage);

        let transferred = effective - untransferred;
        *offset += transferred as u64;

        tracing::debug!(requested, effective, transferred, offset = *offset, "write");

        Ok(Transfer {
            requested,
            transferred,
        })
    }

    /// Take the buffer lock, giving up if the session is signalled first.
    ///
    /// An uncontended lock is always taken, even with the signal raised.
    async fn lock(&self, signal: &SessionSignal) -> Result<MutexGuard<'_, Box<[u8]>>, ChannelError> {
        tokio::select! {
            biased;
            guard = self.storage.lock() => Ok(guard),
            _ = signal.raised() => {
                tracing::debug!("Interrupted while waiting for buffer lock");
                Err(ChannelError::Interrupted)
            }
        }
    }

    /// Part of the buffer a transfer of `len` bytes at `offset` may touch.
    /// Empty when `offset` is at or past the end.
    fn window(&self, offset: u64, len: usize) -> Range<usize> {
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.capacity);
        let end = start.saturating_add(len).min(self.capacity);
        start..end
    }
}

impl Default for BufferedChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::signal::SignalSource;
    use crate::uaccess::{UserSlice, UserSliceMut};

    fn channel(capacity: usize) -> BufferedChannel {
        BufferedChannel::with_capacity(NonZeroUsize::new(capacity).unwrap())
    }

    async fn read_at(ch: &BufferedChannel, offset: &mut u64, len: usize) -> (Transfer, Vec<u8>) {
        let mut out = vec![0u8; len];
        let transfer = ch
            .read(&mut UserSliceMut::new(&mut out), offset, &SessionSignal::none())
            .await
            .unwrap();
        out.truncate(transfer.transferred);
        (transfer, out)
    }

    async fn write_at(ch: &BufferedChannel, offset: &mut u64, data: &[u8]) -> Transfer {
        ch.write(&mut UserSlice::new(data), offset, &SessionSignal::none())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_new_buffer_is_zeroed() {
        let ch = BufferedChannel::new();
        assert_eq!(ch.capacity(), DEFAULT_CAPACITY);

        let mut offset = 0;
        let (transfer, data) = read_at(&ch, &mut offset, DEFAULT_CAPACITY).await;
        assert_eq!(transfer.transferred, DEFAULT_CAPACITY);
        assert!(data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_default_matches_new() {
        assert_eq!(BufferedChannel::default().capacity(), DEFAULT_CAPACITY);
        assert_eq!(DEFAULT_CAPACITY_NONZERO.get(), DEFAULT_CAPACITY);
    }

    #[tokio::test]
    async fn test_read_clamps_at_every_offset() {
        let ch = channel(16);
        for start in 0..16u64 {
            for len in [0usize, 1, 7, 16, 40] {
                let mut offset = start;
                let (transfer, _) = read_at(&ch, &mut offset, len).await;
                let expected = len.min(16 - start as usize);
                assert_eq!(transfer.transferred, expected, "offset {start} len {len}");
                assert_eq!(offset, start + expected as u64);
            }
        }
    }

    #[tokio::test]
    async fn test_offset_past_end_transfers_nothing() {
        let ch = channel(16);
        for start in [16u64, 17, 4096, u64::MAX] {
            let mut offset = start;
            let (transfer, _) = read_at(&ch, &mut offset, 8).await;
            assert_eq!(transfer.transferred, 0);
            assert_eq!(offset, start);

            let transfer = write_at(&ch, &mut offset, b"abc").await;
            assert_eq!(transfer.transferred, 0);
            assert_eq!(offset, start);
        }
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let ch = BufferedChannel::new();
        let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();

        let mut offset = 0;
        assert_eq!(write_at(&ch, &mut offset, &payload).await.transferred, 1000);
        assert_eq!(offset, 1000);

        let mut offset = 0;
        let (_, data) = read_at(&ch, &mut offset, 1000).await;
        assert_eq!(data, payload);
    }

    #[tokio::test]
    async fn test_capacity_16_scenario() {
        let ch = channel(16);
        let mut offset = 0;

        let transfer = write_at(&ch, &mut offset, &[7u8; 20]).await;
        assert_eq!(transfer.transferred, 16);
        assert!(transfer.is_partial());
        assert_eq!(offset, 16);

        let transfer = write_at(&ch, &mut offset, &[1u8]).await;
        assert_eq!(transfer.transferred, 0);
        assert_eq!(offset, 16);
    }

    #[tokio::test]
    async fn test_exact_fit_is_not_shortened() {
        // offset + len == capacity: the whole request fits and is transferred.
        let ch = channel(16);
        let mut offset = 10;
        let transfer = write_at(&ch, &mut offset, b"abcdef").await;
        assert_eq!(transfer.transferred, 6);
        assert!(!transfer.is_partial());
        assert_eq!(offset, 16);

        let mut offset = 10;
        let (transfer, data) = read_at(&ch, &mut offset, 6).await;
        assert_eq!(transfer.transferred, 6);
        assert_eq!(data, b"abcdef");
    }

    #[tokio::test]
    async fn test_read_fault_advances_by_copied_bytes_only() {
        let ch = channel(16);
        let mut offset = 0;
        write_at(&ch, &mut offset, b"0123456789").await;

        let mut out = [0u8; 10];
        let mut offset = 2;
        let transfer = ch
            .read(
                &mut UserSliceMut::new(&mut out).with_fault_at(3),
                &mut offset,
                &SessionSignal::none(),
            )
            .await
            .unwrap();
        assert_eq!(transfer.transferred, 3);
        assert_eq!(offset, 5);
        assert_eq!(&out[..3], b"234");
    }

    #[tokio::test]
    async fn test_write_fault_advances_by_copied_bytes_only() {
        let ch = channel(16);
        let mut offset = 4;
        let transfer = ch
            .write(
                &mut UserSlice::new(b"abcdef").with_fault_at(2),
                &mut offset,
                &SessionSignal::none(),
            )
            .await
            .unwrap();
        assert_eq!(transfer.transferred, 2);
        assert_eq!(offset, 6);

        let mut offset = 4;
        let (_, data) = read_at(&ch, &mut offset, 2).await;
        assert_eq!(data, b"ab");
    }

    #[tokio::test]
    async fn test_interrupted_while_waiting_for_lock() {
        let ch = Arc::new(channel(16));
        let held = ch.storage.lock().await;

        let source = SignalSource::new();
        let signal = source.signal();
        let reader = {
            let ch = Arc::clone(&ch);
            tokio::spawn(async move {
                let mut out = [0xAAu8; 8];
                let mut offset = 3u64;
                let result = ch
                    .read(&mut UserSliceMut::new(&mut out), &mut offset, &signal)
                    .await;
                (result, offset, out)
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        source.raise();

        let (result, offset, out) = tokio::time::timeout(Duration::from_secs(1), reader)
            .await
            .expect("waiter did not unblock")
            .unwrap();
        assert_eq!(result, Err(ChannelError::Interrupted));
        assert_eq!(offset, 3);
        assert_eq!(out, [0xAA; 8]);
        drop(held);
    }

    #[tokio::test]
    async fn test_raised_signal_does_not_block_uncontended_lock() {
        let ch = channel(16);
        let source = SignalSource::new();
        source.raise();

        let mut offset = 0;
        let transfer = ch
            .write(&mut UserSlice::new(b"hi"), &mut offset, &source.signal())
            .await
            .unwrap();
        assert_eq!(transfer.transferred, 2);
    }
}
