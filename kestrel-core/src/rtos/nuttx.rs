//! NuttX thread awareness.
//!
//! NuttX tracks every task control block in a pid hash table. The walker
//! reads the table plus a kernel-published offset descriptor (`g_tcbinfo`)
//! and decodes each TCB without compile-time knowledge of the kernel's
//! configuration; field offsets, the table size and the table address all
//! come from target memory. See `nuttx/sched/nx_start.c` for the globals
//! involved.

use crate::error::RtosError;
use crate::memory;
use crate::rtos::stackings::{
    RegisterStacking, NUTTX_STACKING_CORTEX_M, NUTTX_STACKING_CORTEX_M_FPU, NUTTX_STACKING_RISCV,
};
use crate::rtos::{RtosAware, RtosRegister, StackUnwinder, TargetAccess, ThreadInfo};
use crate::symbols::{SymbolRequirement, SymbolTable};
use crate::target::{FpFeature, TargetDescription};

const NAME_SIZE: usize = 32;

/// Only 32-bit targets are supported. Wider pointers would need the width
/// read from the target and the walker adapted accordingly.
const PTR_WIDTH: usize = 4;

/// Coprocessor access control register and the CP10/CP11 full-access bits.
const FPU_CPACR: u64 = 0xE000_ED88;
const CPACR_CP10_CP11: u32 = 0x00F0_0000;

/// Head of the ready-to-run list; its first entry is the running task.
pub const SYM_READYTORUN: &str = "g_readytorun";
/// Address of the pid hash table.
pub const SYM_PIDHASH: &str = "g_pidhash";
/// Number of entries in the pid hash table.
pub const SYM_NPIDHASH: &str = "g_npidhash";
/// TCB field-offset descriptor published by the kernel.
pub const SYM_TCBINFO: &str = "g_tcbinfo";

static NUTTX_SYMBOLS: &[SymbolRequirement] = &[
    SymbolRequirement {
        name: SYM_READYTORUN,
        optional: false,
    },
    SymbolRequirement {
        name: SYM_PIDHASH,
        optional: false,
    },
    SymbolRequirement {
        name: SYM_NPIDHASH,
        optional: false,
    },
    SymbolRequirement {
        name: SYM_TCBINFO,
        optional: false,
    },
];

/// Scheduler states, indexed by the raw TCB state byte.
static TASK_STATE_NAMES: &[&str] = &[
    "INVALID",
    "PENDING",
    "READYTORUN",
    "RUNNING",
    "INACTIVE",
    "WAIT_SEM",
    "WAIT_SIG",
    "WAIT_MQNOTEMPTY",
    "WAIT_MQNOTFULL",
    "WAIT_PAGEFILL",
    "STOPPED",
];

/// How to pick a stacking descriptor for one architecture family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StackingStrategy {
    /// Probe the FPU configuration, then pick the integer or FPU layout.
    CortexM,
    /// One fixed layout, no probing.
    Riscv,
}

struct NuttxParams {
    target_name: &'static str,
    strategy: StackingStrategy,
}

/// Compatibility list; matching is exact and the first hit wins.
static NUTTX_TARGETS: &[NuttxParams] = &[
    NuttxParams {
        target_name: "cortex_m",
        strategy: StackingStrategy::CortexM,
    },
    NuttxParams {
        target_name: "hla_target",
        strategy: StackingStrategy::CortexM,
    },
    NuttxParams {
        target_name: "esp32c3",
        strategy: StackingStrategy::Riscv,
    },
];

/// Field offsets into an opaque TCB, published by the kernel as `g_tcbinfo`.
///
/// Seven unsigned 16-bit little-endian values, decoded explicitly; the raw
/// buffer is never reinterpreted as a struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcbInfo {
    /// Offset of the pid field.
    pub pid_off: u16,
    /// Offset of the scheduler state byte.
    pub state_off: u16,
    /// Offset of the priority field.
    pub pri_off: u16,
    /// Offset of the task name, or zero when names are compiled out.
    pub name_off: u16,
    /// Offset of the saved-register-frame pointer.
    pub regs_off: u16,
    /// Number of general-purpose registers in a saved frame.
    pub basic_num: u16,
    /// Total number of registers in a saved frame.
    pub total_num: u16,
}

impl TcbInfo {
    /// Encoded size of the descriptor in target memory.
    pub const SIZE: usize = 14;
    /// Byte offset of `regs_off` within the descriptor.
    pub const REGS_OFF_FIELD: u64 = 8;

    /// Decode the descriptor from its raw little-endian encoding.
    pub fn decode(raw: &[u8; Self::SIZE]) -> Self {
        let field = |i: usize| u16::from_le_bytes([raw[2 * i], raw[2 * i + 1]]);
        Self {
            pid_off: field(0),
            state_off: field(1),
            pri_off: field(2),
            name_off: field(3),
            regs_off: field(4),
            basic_num: field(5),
            total_num: field(6),
        }
    }
}

/// Session-scoped association between the connected target and its stacking
/// strategy, recorded by a successful [`RtosAware::create`].
struct TargetProfile {
    description: TargetDescription,
    strategy: StackingStrategy,
}

/// NuttX awareness state for one debug session.
pub struct Nuttx {
    profile: Option<TargetProfile>,
    threads: Vec<ThreadInfo>,
    current_thread: Option<u64>,
}

impl Nuttx {
    /// A fresh, unattached instance.
    pub fn new() -> Self {
        Self {
            profile: None,
            threads: Vec::new(),
            current_thread: None,
        }
    }

    fn cortexm_has_fpu(target: &mut dyn TargetAccess, description: &TargetDescription) -> bool {
        if description.fp_feature != FpFeature::Fpv4SinglePrecision {
            return false;
        }
        match target.read_word_32(FPU_CPACR) {
            Ok(cpacr) => cpacr & CPACR_CP10_CP11 != 0,
            Err(e) => {
                log::error!("Could not read CPACR register to check FPU state: {}", e);
                false
            }
        }
    }

    /// Pick the stacking descriptor for the session's architecture.
    ///
    /// Re-evaluated on every call since the FPU configuration can change at
    /// runtime. Only valid after `create` succeeded.
    fn select_stacking(
        &self,
        target: &mut dyn TargetAccess,
    ) -> Result<&'static RegisterStacking, RtosError> {
        let profile = self.profile.as_ref().ok_or_else(|| {
            log::error!("Stacking info requested before target creation");
            RtosError::Logic("stacking selection requires a successful create()")
        })?;
        Ok(match profile.strategy {
            StackingStrategy::CortexM => {
                if Self::cortexm_has_fpu(target, &profile.description) {
                    &NUTTX_STACKING_CORTEX_M_FPU
                } else {
                    &NUTTX_STACKING_CORTEX_M
                }
            }
            StackingStrategy::Riscv => &NUTTX_STACKING_RISCV,
        })
    }

    fn registers_from_stack(
        &self,
        target: &mut dyn TargetAccess,
        unwinder: &dyn StackUnwinder,
        symbols: &SymbolTable,
        thread_id: u64,
    ) -> Result<Vec<RtosRegister>, RtosError> {
        let stacking = self.select_stacking(target)?;

        // Read regs_off fresh from the descriptor rather than reusing the
        // walker's copy.
        let tcbinfo_addr = symbols
            .address(SYM_TCBINFO)
            .ok_or(RtosError::MissingSymbol(SYM_TCBINFO))?;
        let regs_off = memory::read_u16(
            target,
            tcbinfo_addr + TcbInfo::REGS_OFF_FIELD,
            "registers' offset",
        )?;
        let frame_addr = memory::read_u32(
            target,
            thread_id + u64::from(regs_off),
            "registers' address",
        )?;

        unwinder.unwind(target, stacking, frame_addr)
    }
}

impl Default for Nuttx {
    fn default() -> Self {
        Self::new()
    }
}

impl RtosAware for Nuttx {
    fn name(&self) -> &str {
        "NuttX"
    }

    fn required_symbols(&self) -> &'static [SymbolRequirement] {
        NUTTX_SYMBOLS
    }

    fn detect(&self, symbols: &SymbolTable) -> bool {
        symbols.address(SYM_READYTORUN).is_some() && symbols.address(SYM_PIDHASH).is_some()
    }

    fn create(&mut self, target: &TargetDescription) -> Result<(), RtosError> {
        let params = NUTTX_TARGETS
            .iter()
            .find(|params| params.target_name == target.name)
            .ok_or_else(|| {
                log::error!(
                    "Could not find \"{}\" target in NuttX compatibility list",
                    target.name
                );
                RtosError::UnsupportedTarget(target.name.clone())
            })?;

        log::info!("Detected target \"{}\"", params.target_name);
        self.profile = Some(TargetProfile {
            description: target.clone(),
            strategy: params.strategy,
        });
        Ok(())
    }

    fn update_threads(
        &mut self,
        target: &mut dyn TargetAccess,
        symbols: &SymbolTable,
    ) -> Result<(), RtosError> {
        let readytorun_addr = symbols
            .address(SYM_READYTORUN)
            .ok_or(RtosError::MissingSymbol(SYM_READYTORUN))?;
        let pidhash_sym = symbols
            .address(SYM_PIDHASH)
            .ok_or(RtosError::MissingSymbol(SYM_PIDHASH))?;
        let npidhash_sym = symbols
            .address(SYM_NPIDHASH)
            .ok_or(RtosError::MissingSymbol(SYM_NPIDHASH))?;
        let tcbinfo_addr = symbols
            .address(SYM_TCBINFO)
            .ok_or(RtosError::MissingSymbol(SYM_TCBINFO))?;

        // The kernel tracks every TCB in a hash table: g_npidhash entries
        // starting at the address stored in g_pidhash.
        let npidhash = memory::read_u32(target, npidhash_sym, "g_npidhash")?;
        log::debug!("Hash table size (g_npidhash) = {}", npidhash);

        let pidhash_addr = memory::read_u32(target, pidhash_sym, "g_pidhash")?;
        log::debug!("Hash table address (g_pidhash) = {:#x}", pidhash_addr);

        let pidhash = memory::read_bytes(
            target,
            u64::from(pidhash_addr),
            npidhash as usize * PTR_WIDTH,
            "pid hash table",
        )?;

        let raw = memory::read_bytes(target, tcbinfo_addr, TcbInfo::SIZE, "g_tcbinfo")?;
        let mut encoded = [0u8; TcbInfo::SIZE];
        encoded.copy_from_slice(&raw);
        let tcbinfo = TcbInfo::decode(&encoded);

        // The head of g_readytorun is the currently running task; widened to
        // 64 bits for the thread-identity space.
        let current_thread = memory::read_u32(target, readytorun_addr, "g_readytorun")?;

        let mut threads = Vec::new();
        for (bucket, entry) in pidhash.chunks_exact(PTR_WIDTH).enumerate() {
            let tcb_addr = u32::from_le_bytes([entry[0], entry[1], entry[2], entry[3]]);
            if tcb_addr == 0 {
                continue;
            }
            let base = u64::from(tcb_addr);

            let pid = memory::read_u16(
                target,
                base + u64::from(tcbinfo.pid_off),
                &format!("PID of TCB@{:#x} from pidhash[{}]", tcb_addr, bucket),
            )?;
            let state = memory::read_u8(
                target,
                base + u64::from(tcbinfo.state_off),
                &format!("state of TCB@{:#x} from pidhash[{}]", tcb_addr, bucket),
            )?;

            let state_label = TASK_STATE_NAMES
                .get(state as usize)
                .map(|label| (*label).to_string());

            let name = if tcbinfo.name_off != 0 {
                let raw = memory::read_bytes(
                    target,
                    base + u64::from(tcbinfo.name_off),
                    NAME_SIZE,
                    "thread's name",
                )?;
                let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
                String::from_utf8_lossy(&raw[..end]).to_string()
            } else {
                "None".to_string()
            };

            threads.push(ThreadInfo {
                thread_id: base,
                exists: true,
                pid,
                state: state_label,
                name,
            });
        }

        // Swap the fresh snapshot in only once the whole walk succeeded; a
        // failed refresh keeps the previous list as last known good.
        self.threads = threads;
        self.current_thread = Some(u64::from(current_thread));
        Ok(())
    }

    fn thread_registers(
        &self,
        target: &mut dyn TargetAccess,
        unwinder: &dyn StackUnwinder,
        symbols: &SymbolTable,
        thread_id: u64,
    ) -> Result<Vec<RtosRegister>, RtosError> {
        if self.current_thread == Some(thread_id) {
            // The running context's registers are not on its task stack.
            return target.cached_general_registers();
        }
        self.registers_from_stack(target, unwinder, symbols, thread_id)
    }

    fn threads(&self) -> &[ThreadInfo] {
        &self.threads
    }

    fn current_thread(&self) -> Option<u64> {
        self.current_thread
    }
}
