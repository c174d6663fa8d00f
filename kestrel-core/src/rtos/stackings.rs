//! Architecture stacking descriptors for NuttX saved-context frames.
//!
//! The layouts follow the kernel's own context save areas
//! (`arch/arm/src/armv7-m` and `arch/risc-v`): a software-saved block at the
//! low offsets and, on Cortex-M, the hardware exception frame above it.
//! Descriptors are selected per session, never constructed at runtime.

/// Where a register's value lives relative to the saved frame address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterSlot {
    /// Stored in the frame at this byte offset.
    Stacked(u16),
    /// Not part of the frame; reported as zero.
    Unavailable,
}

/// Placement of one output register within a saved frame.
#[derive(Debug, Clone, Copy)]
pub struct StackRegisterOffset {
    /// Protocol register number.
    pub number: u32,
    /// Where the value lives.
    pub slot: RegisterSlot,
    /// Register width in bits.
    pub width_bits: u32,
}

/// Direction the stack grows in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackGrowth {
    /// Towards lower addresses.
    Down,
    /// Towards higher addresses.
    Up,
}

/// Immutable description of an architecture's saved-context frame.
#[derive(Debug)]
pub struct RegisterStacking {
    /// Total frame size in bytes.
    pub stack_registers_size: u32,
    /// Direction the stack grows in.
    pub stack_growth: StackGrowth,
    /// Output registers in protocol order.
    pub register_offsets: &'static [StackRegisterOffset],
}

impl RegisterStacking {
    /// Number of registers this descriptor produces.
    pub fn register_count(&self) -> usize {
        self.register_offsets.len()
    }

    /// Slot of protocol register `number`, if the descriptor covers it.
    pub fn slot_of(&self, number: u32) -> Option<RegisterSlot> {
        self.register_offsets
            .iter()
            .find(|reg| reg.number == number)
            .map(|reg| reg.slot)
    }
}

const fn stacked(number: u32, offset: u16) -> StackRegisterOffset {
    StackRegisterOffset {
        number,
        slot: RegisterSlot::Stacked(offset),
        width_bits: 32,
    }
}

const fn unavailable(number: u32) -> StackRegisterOffset {
    StackRegisterOffset {
        number,
        slot: RegisterSlot::Unavailable,
        width_bits: 32,
    }
}

/// Cortex-M integer-only frame.
///
/// sp and r4-r11 live in the software-saved block at the low offsets,
/// r0-r3/r12/lr/pc/xPSR in the hardware exception frame above it.
pub static NUTTX_STACKING_CORTEX_M: RegisterStacking = RegisterStacking {
    stack_registers_size: 0x48,
    stack_growth: StackGrowth::Down,
    register_offsets: &[
        stacked(0, 0x28),  // r0
        stacked(1, 0x2c),  // r1
        stacked(2, 0x30),  // r2
        stacked(3, 0x34),  // r3
        stacked(4, 0x08),  // r4
        stacked(5, 0x0c),  // r5
        stacked(6, 0x10),  // r6
        stacked(7, 0x14),  // r7
        stacked(8, 0x18),  // r8
        stacked(9, 0x1c),  // r9
        stacked(10, 0x20), // r10
        stacked(11, 0x24), // r11
        stacked(12, 0x38), // r12
        stacked(13, 0x00), // sp
        stacked(14, 0x3c), // lr
        stacked(15, 0x40), // pc
        stacked(16, 0x44), // xPSR
    ],
};

/// Cortex-M frame with the FPU enabled.
///
/// The software-saved block additionally holds s16-s31, which pushes the
/// hardware exception frame (and s0-s15/FPSCR above it) up by 0x44 bytes.
pub static NUTTX_STACKING_CORTEX_M_FPU: RegisterStacking = RegisterStacking {
    stack_registers_size: 0xd0,
    stack_growth: StackGrowth::Down,
    register_offsets: &[
        stacked(0, 0x6c),  // r0
        stacked(1, 0x70),  // r1
        stacked(2, 0x74),  // r2
        stacked(3, 0x78),  // r3
        stacked(4, 0x08),  // r4
        stacked(5, 0x0c),  // r5
        stacked(6, 0x10),  // r6
        stacked(7, 0x14),  // r7
        stacked(8, 0x18),  // r8
        stacked(9, 0x1c),  // r9
        stacked(10, 0x20), // r10
        stacked(11, 0x24), // r11
        stacked(12, 0x7c), // r12
        stacked(13, 0x00), // sp
        stacked(14, 0x80), // lr
        stacked(15, 0x84), // pc
        stacked(16, 0x88), // xPSR
    ],
};

/// RISC-V frame: the saved epc sits at offset 0, x1-x31 follow at `4 * n`.
/// x0 is hardwired zero and never stacked.
pub static NUTTX_STACKING_RISCV: RegisterStacking = RegisterStacking {
    stack_registers_size: 0x80,
    stack_growth: StackGrowth::Down,
    register_offsets: &[
        unavailable(0),    // zero
        stacked(1, 0x04),  // ra
        stacked(2, 0x08),  // sp
        stacked(3, 0x0c),  // gp
        stacked(4, 0x10),  // tp
        stacked(5, 0x14),  // t0
        stacked(6, 0x18),  // t1
        stacked(7, 0x1c),  // t2
        stacked(8, 0x20),  // s0/fp
        stacked(9, 0x24),  // s1
        stacked(10, 0x28), // a0
        stacked(11, 0x2c), // a1
        stacked(12, 0x30), // a2
        stacked(13, 0x34), // a3
        stacked(14, 0x38), // a4
        stacked(15, 0x3c), // a5
        stacked(16, 0x40), // a6
        stacked(17, 0x44), // a7
        stacked(18, 0x48), // s2
        stacked(19, 0x4c), // s3
        stacked(20, 0x50), // s4
        stacked(21, 0x54), // s5
        stacked(22, 0x58), // s6
        stacked(23, 0x5c), // s7
        stacked(24, 0x60), // s8
        stacked(25, 0x64), // s9
        stacked(26, 0x68), // s10
        stacked(27, 0x6c), // s11
        stacked(28, 0x70), // t3
        stacked(29, 0x74), // t4
        stacked(30, 0x78), // t5
        stacked(31, 0x7c), // t6
        stacked(32, 0x00), // pc (saved epc)
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    fn check_offsets_within_frame(stacking: &RegisterStacking) {
        for reg in stacking.register_offsets {
            if let RegisterSlot::Stacked(offset) = reg.slot {
                let end = u32::from(offset) + reg.width_bits / 8;
                assert!(
                    end <= stacking.stack_registers_size,
                    "register {} spills past the frame",
                    reg.number
                );
            }
        }
    }

    #[test]
    fn test_frames_contain_all_offsets() {
        check_offsets_within_frame(&NUTTX_STACKING_CORTEX_M);
        check_offsets_within_frame(&NUTTX_STACKING_CORTEX_M_FPU);
        check_offsets_within_frame(&NUTTX_STACKING_RISCV);
    }

    #[test]
    fn test_cortex_m_outputs_gp_register_set() {
        assert_eq!(NUTTX_STACKING_CORTEX_M.register_count(), 17);
        assert_eq!(NUTTX_STACKING_CORTEX_M_FPU.register_count(), 17);
        // r0..r12, sp, lr, pc, xPSR all present.
        for number in 0..17 {
            assert!(NUTTX_STACKING_CORTEX_M.slot_of(number).is_some());
        }
        assert_eq!(
            NUTTX_STACKING_CORTEX_M.slot_of(13),
            Some(RegisterSlot::Stacked(0))
        );
    }

    #[test]
    fn test_fpu_frame_shifts_hardware_frame_only() {
        // The software-saved block is identical; the hardware frame moves up.
        for number in 4..12 {
            assert_eq!(
                NUTTX_STACKING_CORTEX_M.slot_of(number),
                NUTTX_STACKING_CORTEX_M_FPU.slot_of(number)
            );
        }
        assert_eq!(
            NUTTX_STACKING_CORTEX_M_FPU.slot_of(15),
            Some(RegisterSlot::Stacked(0x84))
        );
        assert!(
            NUTTX_STACKING_CORTEX_M_FPU.stack_registers_size
                > NUTTX_STACKING_CORTEX_M.stack_registers_size
        );
    }

    #[test]
    fn test_riscv_frame_layout() {
        assert_eq!(NUTTX_STACKING_RISCV.register_count(), 33);
        assert_eq!(NUTTX_STACKING_RISCV.slot_of(0), Some(RegisterSlot::Unavailable));
        // pc is the saved epc at the bottom of the frame.
        assert_eq!(NUTTX_STACKING_RISCV.slot_of(32), Some(RegisterSlot::Stacked(0)));
        assert_eq!(NUTTX_STACKING_RISCV.slot_of(2), Some(RegisterSlot::Stacked(8)));
    }
}
