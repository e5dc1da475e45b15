//! Bounds-checked little-endian reads over a byte slice.

use byteorder::{ByteOrder, LittleEndian};

use crate::util::{Error, Result};

fn truncated() -> Error {
    Error::invalid("unexpected end of data")
}

/// Convert a stored size or offset, rejecting values the host cannot index.
pub(crate) fn to_usize(v: u64) -> Result<usize> {
    usize::try_from(v).map_err(|_| Error::invalid(format!("size {v} does not fit in memory")))
}

/// Read position inside a borrowed byte slice.
#[derive(Clone, Debug)]
pub(crate) struct Bytes<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Bytes<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn at(data: &'a [u8], pos: usize) -> Result<Self> {
        if pos > data.len() {
            return Err(truncated());
        }
        Ok(Self { data, pos })
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// The next `n` bytes without consuming them.
    pub fn peek(&self, n: usize) -> Option<&'a [u8]> {
        self.data.get(self.pos..self.pos.checked_add(n)?)
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let bytes = self.peek(n).ok_or_else(truncated)?;
        self.pos += n;
        Ok(bytes)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    /// Everything up to the end of the slice.
    pub fn rest(&mut self) -> &'a [u8] {
        let bytes = self.data.get(self.pos..).unwrap_or(&[]);
        self.pos = self.data.len();
        bytes
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    /// Unsigned integer of 1 to 8 bytes.
    pub fn uint(&mut self, size: usize) -> Result<u64> {
        if !(1..=8).contains(&size) {
            return Err(Error::invalid(format!("unsupported integer width {size}")));
        }
        Ok(LittleEndian::read_uint(self.take(size)?, size))
    }

    /// Consume a structure signature.
    pub fn expect(&mut self, signature: &[u8], what: &str) -> Result<()> {
        if self.take(signature.len())? != signature {
            return Err(Error::invalid(format!("missing {what} signature")));
        }
        Ok(())
    }
}
