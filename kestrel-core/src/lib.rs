//! Kestrel Core - RTOS awareness backend for the Kestrel debugger.
//!
//! This crate reconstructs the live thread state of a NuttX target by reading
//! the kernel's raw task bookkeeping through a debug probe, and exposes it as
//! a thread list with per-thread register sets for a remote-protocol front
//! end. Memory access, symbol resolution, the live register cache and the
//! generic stack unwinder are consumed through trait seams.

pub mod error;
pub mod memory;
pub mod rtos;
pub mod symbols;
pub mod target;

// Re-export commonly used types
pub use error::RtosError;
pub use rtos::nuttx::Nuttx;
pub use rtos::stackings::{RegisterSlot, RegisterStacking, StackRegisterOffset};
pub use rtos::{detect_rtos, RtosAware, RtosRegister, StackUnwinder, TargetAccess, ThreadInfo};
pub use symbols::{ElfSymbolFile, SymbolRequirement, SymbolResolver, SymbolTable};
pub use target::{FpFeature, TargetDescription};
