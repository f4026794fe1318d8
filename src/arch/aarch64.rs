//! AArch64 implementation: DAIF interrupt masking, MPIDR processor ids and
//! GICv2 software-generated interrupts for rescheduling.

use core::arch::asm;
use core::ptr::write_volatile;

use super::Arch;
use crate::sched::CpuId;

// GIC distributor base - platform dependent
#[cfg(feature = "qemu-virt")]
const GICD_BASE: usize = 0x0800_0000; // QEMU virt GIC Distributor
#[cfg(not(feature = "qemu-virt"))]
const GICD_BASE: usize = 0xFF84_1000; // BCM2837 GIC Distributor

/// Software Generated Interrupt Register
const GICD_SGIR: usize = 0xF00;

/// SGI used to request a dispatch on another processor.
pub const RESCHEDULE_SGI: u32 = 1;

/// GICv2 only routes SGIs to the first eight processors.
const GIC_MAX_TARGETS: CpuId = 8;

/// AArch64 architecture implementation.
pub struct Aarch64Arch;

impl Arch for Aarch64Arch {
    fn enable_interrupts() {
        unsafe {
            asm!("msr daifclr, #2", options(nomem, nostack));
        }
    }

    fn disable_interrupts() {
        unsafe {
            asm!("msr daifset, #2", options(nomem, nostack));
        }
    }

    fn interrupts_enabled() -> bool {
        let daif: u64;
        unsafe {
            asm!(
                "mrs {daif}, daif",
                daif = out(reg) daif,
                options(nostack, readonly)
            );
        }
        (daif & 0x80) == 0
    }

    fn current_cpu() -> CpuId {
        let mpidr: u64;
        unsafe {
            asm!(
                "mrs {mpidr}, mpidr_el1",
                mpidr = out(reg) mpidr,
                options(nomem, nostack, preserves_flags)
            );
        }
        // Affinity level 0 is the core number on Cortex-A53 clusters
        (mpidr & 0xFF) as CpuId
    }

    fn send_interrupt(cpu: CpuId) {
        if cpu >= GIC_MAX_TARGETS {
            log::warn!("cannot signal processor {}: outside GICv2 target list", cpu);
            return;
        }
        let target_list = 1u32 << (16 + cpu as u32);
        unsafe {
            // Make heir updates visible before the target takes the interrupt
            asm!("dsb ishst", options(nostack, preserves_flags));
            write_volatile((GICD_BASE + GICD_SGIR) as *mut u32, target_list | RESCHEDULE_SGI);
        }
    }
}
