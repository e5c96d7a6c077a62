//! HID report parsing utilities
//!
//! Oasis frames carry multi-byte integers in network (big-endian) order, so
//! the parser and builder here read and write big-endian only.

use crate::{HidCommonError, HidCommonResult};

fn end_of_data() -> HidCommonError {
    HidCommonError::InvalidReport("Unexpected end of data".to_string())
}

pub struct ReportParser {
    buffer: Vec<u8>,
    position: usize,
}

impl ReportParser {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            buffer: data.into(),
            position: 0,
        }
    }

    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            buffer: data.to_vec(),
            position: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    pub fn read_u8(&mut self) -> HidCommonResult<u8> {
        let value = *self.buffer.get(self.position).ok_or_else(end_of_data)?;
        self.position += 1;
        Ok(value)
    }

    /// Read exactly `N` bytes.
    pub fn read_array<const N: usize>(&mut self) -> HidCommonResult<[u8; N]> {
        let end = self.position.checked_add(N).ok_or_else(end_of_data)?;
        let bytes = self
            .buffer
            .get(self.position..end)
            .ok_or_else(end_of_data)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.position = end;
        Ok(out)
    }

    pub fn read_u32_be(&mut self) -> HidCommonResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32_be(&mut self) -> HidCommonResult<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn skip(&mut self, count: usize) {
        self.position = self.position.saturating_add(count).min(self.buffer.len());
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }
}

pub struct ReportBuilder {
    buffer: Vec<u8>,
}

impl ReportBuilder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buffer.push(value);
        self
    }

    pub fn write_u32_be(&mut self, value: u32) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(data);
        self
    }

    /// Write `data` into a fixed-width field, truncating or zero-padding to `width`.
    pub fn write_padded(&mut self, data: &[u8], width: usize) -> &mut Self {
        let taken = data.len().min(width);
        self.buffer.extend_from_slice(data.get(..taken).unwrap_or_default());
        self.buffer.resize(self.buffer.len() + (width - taken), 0);
        self
    }

    /// Zero-pad the buffer up to `len` bytes; longer buffers are left untouched.
    pub fn pad_to(&mut self, len: usize) -> &mut Self {
        if self.buffer.len() < len {
            self.buffer.resize(len, 0);
        }
        self
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::with_capacity(65)
    }
}
