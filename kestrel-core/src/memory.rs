//! Typed little-endian reads from target memory.
//!
//! Thin wrappers over [`probe_rs::MemoryInterface`] that attach a description
//! of what was being read to any transport failure, so a broken walk reports
//! which kernel structure it died on.

use crate::error::RtosError;
use probe_rs::MemoryInterface;

/// Read an unsigned 8-bit value from `address`.
pub fn read_u8<M>(mem: &mut M, address: u64, what: &str) -> Result<u8, RtosError>
where
    M: MemoryInterface + ?Sized,
{
    mem.read_word_8(address).map_err(|e| fail(what, e))
}

/// Read an unsigned little-endian 16-bit value from `address`.
pub fn read_u16<M>(mem: &mut M, address: u64, what: &str) -> Result<u16, RtosError>
where
    M: MemoryInterface + ?Sized,
{
    mem.read_word_16(address).map_err(|e| fail(what, e))
}

/// Read an unsigned little-endian 32-bit value from `address`.
pub fn read_u32<M>(mem: &mut M, address: u64, what: &str) -> Result<u32, RtosError>
where
    M: MemoryInterface + ?Sized,
{
    mem.read_word_32(address).map_err(|e| fail(what, e))
}

/// Read `len` raw bytes starting at `address`.
pub fn read_bytes<M>(mem: &mut M, address: u64, len: usize, what: &str) -> Result<Vec<u8>, RtosError>
where
    M: MemoryInterface + ?Sized,
{
    let mut buf = vec![0u8; len];
    mem.read_8(address, &mut buf).map_err(|e| fail(what, e))?;
    Ok(buf)
}

fn fail(what: &str, source: probe_rs::Error) -> RtosError {
    log::error!("Failed to read {}: {}", what, source);
    RtosError::io(what, source)
}
