// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Client buffer access.
//!
//! Client buffers sit on the other side of a trust boundary: a copy into or
//! out of them may stop part way. Both directions therefore report the number
//! of bytes that did NOT transfer, and never fail in any other way.

/// Destination buffer supplied by a client for `read`.
pub trait UserWriter {
    /// Number of bytes the client asked for.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `src` to the start of the client buffer.
    /// Returns how many bytes of `src` could not be written.
    fn copy_to_user(&mut self, src: &[u8]) -> usize;
}

/// Source buffer supplied by a client for `write`.
pub trait UserReader {
    /// Number of bytes the client offered.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill `dst` from the start of the client buffer.
    /// Returns how many bytes of `dst` could not be filled.
    fn copy_from_user(&mut self, dst: &mut [u8]) -> usize;
}

/// Writable client buffer backed by a byte slice.
///
/// With a fault point set, only the first `fault_at` bytes are accessible,
/// which models a buffer that becomes unmapped during the copy.
#[derive(Debug)]
pub struct UserSliceMut<'a> {
    buf: &'a mut [u8],
    fault_at: Option<usize>,
}

impl<'a> UserSliceMut<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            fault_at: None,
        }
    }

    /// Make every byte at or past `offset` inaccessible.
    pub fn with_fault_at(mut self, offset: usize) -> Self {
        self.fault_at = Some(offset);
        self
    }

    fn accessible(&self) -> usize {
        self.fault_at.map_or(self.buf.len(), |f| f.min(self.buf.len()))
    }
}

impl UserWriter for UserSliceMut<'_> {
    fn len(&self) -> usize {
        self.buf.len()
    }

    fn copy_to_user(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.accessible());
        self.buf[..n].copy_from_slice(&src[..n]);
        src.len() - n
    }
}

/// Readable client buffer backed by a byte slice.
#[derive(Debug, Clone, Copy)]
pub struct UserSlice<'a> {
    buf: &'a [u8],
    fault_at: Option<usize>,
}

impl<'a> UserSlice<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            fault_at: None,
        }
    }

    /// Make every byte at or past `offset` unreadable.
    pub fn with_fault_at(mut self, offset: usize) -> Self {
        self.fault_at = Some(offset);
        self
    }

    fn accessible(&self) -> usize {
        self.fault_at.map_or(self.buf.len(), |f| f.min(self.buf.len()))
    }
}

impl UserReader for UserSlice<'_> {
    fn len(&self) -> usize {
        self.buf.len()
    }

    fn copy_from_user(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.accessible());
        dst[..n].copy_from_slice(&self.buf[..n]);
        dst.len() - n
    }
}
