#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![forbid(unreachable_pub)]

//! Global earliest-deadline-first scheduling for SMP kernels.
//!
//! This library is the scheduler core of a multiprocessor kernel: it decides
//! which ready threads own the processors. Under global EDF the P most urgent
//! ready threads run on the P processors, wherever they ran before.
//!
//! # Features
//!
//! - `std-shim`: Use the no-op architecture as [`DefaultArch`] on hosts
//! - `qemu-virt`: GIC addresses of the QEMU virt machine (aarch64)
//!
//! # Quick Start
//!
//! ```ignore
//! use global_edf::{DefaultArch, GlobalEdf, Kernel, Priority, Scheduler, SchedulerConfig};
//! use spin::Lazy;
//!
//! static KERNEL: Lazy<Kernel<DefaultArch, GlobalEdf<DefaultArch>>> = Lazy::new(|| {
//!     let config = SchedulerConfig::new(4, 64).with_timeslice(10);
//!     Kernel::new(GlobalEdf::new(config).expect("scheduler configuration"))
//! });
//!
//! fn kernel_main() {
//!     let idle: Vec<_> = (0..4)
//!         .map(|_| KERNEL.scheduler().allocate(Priority::IDLE).unwrap())
//!         .collect();
//!     KERNEL.bring_up(&idle).expect("Failed to start processors");
//!
//!     let worker = KERNEL.spawn(Priority::from_deadline(100)).unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! - [`ReadyQueue`]: ready threads without a processor, ordered by deadline
//! - [`ScheduledSet`]: threads owning a processor, the least urgent at the tail
//! - Processor exchange through per-processor heir slots
//! - Reschedule interrupts returned as [`Notifications`] instead of being sent
//!   from inside the scheduler

// Core modules
pub mod arch;
pub mod config;
pub mod errors;
pub mod kernel;
pub mod sched;
pub mod thread;
pub mod time;

#[cfg(test)]
extern crate std;

extern crate alloc;

#[cfg(test)]
mod tests;

// ============================================================================
// Public API
// ============================================================================

// Architecture abstraction
pub use arch::{Arch, InterruptGuard, NoOpArch};
#[cfg(any(target_arch = "aarch64", feature = "std-shim"))]
pub use arch::DefaultArch;

// Configuration
pub use config::{SchedulerConfig, MAX_PROCESSORS};

// Kernel
pub use kernel::Kernel;

// Scheduler
pub use sched::{
    CpuId, CpuMask, GlobalEdf, Notifications, PerCpu, ReadyQueue, ScheduledSet, Scheduler,
    SchedulerStats, Switch, TieBreak,
};

// Threads
pub use thread::{Location, PresenceState, ThreadId, ThreadInfo, ThreadRecord, ThreadTable};

// Time
pub use time::{priority_compare, Priority, TickCounter, TimeSlice};

// Errors
pub use errors::{InitError, SchedError, SchedResult};
