// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Client sessions on an open device node.
//!
//! A session is one open file handle: it owns the cursor and the signal
//! handle, and borrows the shared channel through the operation set bound to
//! the device identity. Dropping a session closes it.

use crate::channel::{OperationSet, Transfer};
use crate::error::ChannelError;
use crate::signal::SessionSignal;
use crate::uaccess::{UserReader, UserSlice, UserSliceMut, UserWriter};

#[derive(Debug)]
pub struct Session {
    ops: OperationSet,
    offset: u64,
    signal: SessionSignal,
}

impl Session {
    /// Open a session on `ops` with the cursor at 0.
    pub fn open(ops: OperationSet, signal: SessionSignal) -> Self {
        ops.open();
        Self {
            ops,
            offset: 0,
            signal,
        }
    }

    /// Current cursor position.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Move the cursor. Positions past the end are allowed; transfers from
    /// there move no bytes.
    pub fn seek_to(&mut self, offset: u64) {
        self.offset = offset;
    }

    pub fn rewind(&mut self) {
        self.seek_to(0);
    }

    /// Read into `buf` from the cursor.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<Transfer, ChannelError> {
        self.read_into(&mut UserSliceMut::new(buf)).await
    }

    /// Read into an arbitrary client buffer from the cursor.
    pub async fn read_into<W>(&mut self, dest: &mut W) -> Result<Transfer, ChannelError>
    where
        W: UserWriter + ?Sized,
    {
        self.ops.read(dest, &mut self.offset, &self.signal).await
    }

    /// Write `data` at the cursor.
    pub async fn write(&mut self, data: &[u8]) -> Result<Transfer, ChannelError> {
        self.write_from(&mut UserSlice::new(data)).await
    }

    /// Write from an arbitrary client buffer at the cursor.
    pub async fn write_from<R>(&mut self, src: &mut R) -> Result<Transfer, ChannelError>
    where
        R: UserReader + ?Sized,
    {
        self.ops.write(src, &mut self.offset, &self.signal).await
    }

    /// Close the session.
    pub fn close(self) {}
}

impl Drop for Session {
    fn drop(&mut self) {
        self.ops.close();
    }
}
