//! Architecture abstraction layer for interrupt masking and processor signaling.
//!
//! The scheduler core never talks to an interrupt controller directly. It
//! reads the identity of the executing processor, masks interrupts around
//! yield, and hands back a list of processors that must be interrupted. This
//! trait is where those three things meet the hardware.

use core::marker::PhantomData;

use crate::sched::CpuId;

/// Architecture abstraction trait.
///
/// This trait must be implemented for each supported CPU architecture to
/// provide interrupt control, processor identification, and inter-processor
/// interrupts.
pub trait Arch {
    /// Enable interrupts on the current CPU.
    fn enable_interrupts();

    /// Disable interrupts on the current CPU.
    ///
    /// This creates a critical section where the current execution context
    /// cannot be preempted on this processor.
    fn disable_interrupts();

    /// Check if interrupts are currently enabled.
    fn interrupts_enabled() -> bool;

    /// Index of the processor executing the caller.
    fn current_cpu() -> CpuId;

    /// Ask `cpu` to run its dispatch point as soon as possible.
    ///
    /// Called only for processors other than the current one.
    fn send_interrupt(cpu: CpuId);
}

/// Scoped interrupt mask.
///
/// Disables interrupts on creation and restores the previous state when
/// dropped, including on early return.
pub struct InterruptGuard<A: Arch> {
    was_enabled: bool,
    _arch: PhantomData<fn() -> A>,
}

impl<A: Arch> InterruptGuard<A> {
    pub fn new() -> Self {
        let was_enabled = A::interrupts_enabled();
        A::disable_interrupts();
        Self {
            was_enabled,
            _arch: PhantomData,
        }
    }
}

impl<A: Arch> Default for InterruptGuard<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Arch> Drop for InterruptGuard<A> {
    fn drop(&mut self) {
        if self.was_enabled {
            A::enable_interrupts();
        }
    }
}

/// A no-op architecture implementation for testing and fallback purposes.
///
/// Always reports processor 0 and drops every interrupt request.
pub struct NoOpArch;

impl Arch for NoOpArch {
    fn enable_interrupts() {
        // No-op for testing
    }

    fn disable_interrupts() {
        // No-op for testing
    }

    fn interrupts_enabled() -> bool {
        true
    }

    fn current_cpu() -> CpuId {
        0
    }

    fn send_interrupt(_cpu: CpuId) {}
}

#[cfg(target_arch = "aarch64")]
pub mod aarch64;

#[cfg(target_arch = "aarch64")]
pub use aarch64::Aarch64Arch as DefaultArch;

// For testing/std-shim on non-aarch64 hosts
#[cfg(all(not(target_arch = "aarch64"), feature = "std-shim"))]
pub use NoOpArch as DefaultArch;

#[cfg(test)]
mod tests {
    use super::*;
    use portable_atomic::{AtomicBool, AtomicUsize, Ordering};

    static ENABLED: AtomicBool = AtomicBool::new(true);
    static TRANSITIONS: AtomicUsize = AtomicUsize::new(0);

    struct FlagArch;

    impl Arch for FlagArch {
        fn enable_interrupts() {
            ENABLED.store(true, Ordering::SeqCst);
            TRANSITIONS.fetch_add(1, Ordering::SeqCst);
        }

        fn disable_interrupts() {
            ENABLED.store(false, Ordering::SeqCst);
            TRANSITIONS.fetch_add(1, Ordering::SeqCst);
        }

        fn interrupts_enabled() -> bool {
            ENABLED.load(Ordering::SeqCst)
        }

        fn current_cpu() -> CpuId {
            0
        }

        fn send_interrupt(_cpu: CpuId) {}
    }

    #[test]
    fn test_interrupt_guard_restores_state() {
        {
            let _outer = InterruptGuard::<FlagArch>::new();
            assert!(!FlagArch::interrupts_enabled());
            {
                // Nested guard must not re-enable on drop
                let _inner = InterruptGuard::<FlagArch>::new();
            }
            assert!(!FlagArch::interrupts_enabled());
        }
        assert!(FlagArch::interrupts_enabled());
        assert_eq!(TRANSITIONS.load(Ordering::SeqCst), 3);
    }
}
