//! RTOS awareness: rebuilds a target's thread state from raw kernel memory.
//!
//! The session owner drives one [`RtosAware`] implementation through a fixed
//! lifecycle: publish required symbols, `detect`, `create`, then
//! `update_threads` / `thread_registers` on demand. All target access is
//! synchronous and blocking; the owning session serializes calls.

pub mod nuttx;
pub mod stackings;

use crate::error::RtosError;
use crate::symbols::{SymbolRequirement, SymbolResolver, SymbolTable};
use crate::target::TargetDescription;
use probe_rs::MemoryInterface;
use serde::{Deserialize, Serialize};
use stackings::RegisterStacking;

/// One register value in the shape the remote-protocol server expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtosRegister {
    /// Protocol register number.
    pub number: u32,
    /// Register width in bits.
    pub size_bits: u32,
    /// Raw little-endian value; the first `(size_bits + 7) / 8` bytes are
    /// significant.
    pub value: [u8; 16],
}

impl RtosRegister {
    /// Build a register from little-endian value bytes.
    pub fn from_le_bytes(number: u32, size_bits: u32, raw: &[u8]) -> Self {
        let mut value = [0u8; 16];
        let len = raw.len().min(value.len());
        value[..len].copy_from_slice(&raw[..len]);
        Self {
            number,
            size_bits,
            value,
        }
    }

    /// The significant little-endian bytes of the value.
    pub fn bytes(&self) -> &[u8] {
        let len = ((self.size_bits as usize + 7) / 8).min(self.value.len());
        &self.value[..len]
    }
}

/// Live access to the target beyond plain memory reads.
///
/// Adds the register cache of the currently executing context on top of
/// [`MemoryInterface`]. The running thread's registers are not on any task
/// stack and must come from here.
pub trait TargetAccess: MemoryInterface {
    /// General-purpose registers of the currently executing context, copied
    /// out of the live register cache into an owned list.
    fn cached_general_registers(&mut self) -> Result<Vec<RtosRegister>, RtosError>;
}

/// Generic stack unwinding service.
///
/// Extracts register values from a saved context frame at `frame_address`
/// using an architecture stacking descriptor. Implemented outside this
/// module; failures are surfaced to the caller verbatim.
pub trait StackUnwinder {
    /// Produce the register list saved in the frame at `frame_address`.
    fn unwind(
        &self,
        target: &mut dyn TargetAccess,
        stacking: &'static RegisterStacking,
        frame_address: u32,
    ) -> Result<Vec<RtosRegister>, RtosError>;
}

/// One discovered thread.
///
/// The list is rebuilt in full on every refresh; thread identity is the raw
/// task-control-block address and carries no continuity guarantee across
/// refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadInfo {
    /// Opaque thread identity: the task control block's base address.
    pub thread_id: u64,
    /// Always true for a discovered thread.
    pub exists: bool,
    /// Kernel process id.
    pub pid: u16,
    /// Human-readable scheduler state, when the raw value falls inside the
    /// known vocabulary.
    pub state: Option<String>,
    /// Task name, or the placeholder `"None"` when the kernel keeps no names.
    pub name: String,
}

impl ThreadInfo {
    /// Extra per-thread info string for the protocol front end.
    pub fn extra_info(&self) -> Option<String> {
        self.state
            .as_ref()
            .map(|state| format!("pid:{}, {}", self.pid, state))
    }
}

/// Interface between one RTOS flavor and the owning debug session.
pub trait RtosAware: Send {
    /// Display name of the RTOS.
    fn name(&self) -> &str;

    /// Kernel symbols that must be resolved before this RTOS can operate.
    fn required_symbols(&self) -> &'static [SymbolRequirement];

    /// Whether the resolved symbol space looks like this RTOS. A negative is
    /// not an error, the kernel signature is simply absent.
    fn detect(&self, symbols: &SymbolTable) -> bool;

    /// Check target compatibility and record the session's target profile.
    fn create(&mut self, target: &TargetDescription) -> Result<(), RtosError>;

    /// Rebuild the thread list from target memory.
    ///
    /// On failure the previously refreshed list is left untouched as the
    /// last known good snapshot.
    fn update_threads(
        &mut self,
        target: &mut dyn TargetAccess,
        symbols: &SymbolTable,
    ) -> Result<(), RtosError>;

    /// Register values for one thread, either from the live register cache
    /// (currently running thread) or unwound from its saved stack frame.
    fn thread_registers(
        &self,
        target: &mut dyn TargetAccess,
        unwinder: &dyn StackUnwinder,
        symbols: &SymbolTable,
        thread_id: u64,
    ) -> Result<Vec<RtosRegister>, RtosError>;

    /// Threads from the last successful refresh, in hash-bucket order.
    fn threads(&self) -> &[ThreadInfo];

    /// Identity of the currently running thread, if a refresh ran.
    fn current_thread(&self) -> Option<u64>;
}

/// Probe the resolved symbol space for a supported RTOS.
pub fn detect_rtos(resolver: &dyn SymbolResolver) -> Option<(Box<dyn RtosAware>, SymbolTable)> {
    let nuttx = nuttx::Nuttx::new();
    let symbols = SymbolTable::resolve(nuttx.required_symbols(), resolver);
    if nuttx.detect(&symbols) {
        return Some((Box::new(nuttx), symbols));
    }
    None
}

impl TargetAccess for probe_rs::Core<'_> {
    fn cached_general_registers(&mut self) -> Result<Vec<RtosRegister>, RtosError> {
        // The protocol register number is the position in the core's general
        // register list.
        let ids: Vec<u16> = self
            .registers()
            .core_registers()
            .map(|reg| reg.id().0)
            .collect();

        let mut cached = Vec::with_capacity(ids.len());
        for (number, id) in ids.into_iter().enumerate() {
            let value: probe_rs::RegisterValue =
                self.read_core_reg(id).map_err(RtosError::RegisterCache)?;
            let reg = match value {
                probe_rs::RegisterValue::U32(v) => {
                    RtosRegister::from_le_bytes(number as u32, 32, &v.to_le_bytes())
                }
                probe_rs::RegisterValue::U64(v) => {
                    RtosRegister::from_le_bytes(number as u32, 64, &v.to_le_bytes())
                }
                probe_rs::RegisterValue::U128(v) => {
                    RtosRegister::from_le_bytes(number as u32, 128, &v.to_le_bytes())
                }
            };
            cached.push(reg);
        }
        Ok(cached)
    }
}
