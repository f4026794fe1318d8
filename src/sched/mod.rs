//! Global EDF scheduler and the structures it is built from.
//!
//! - [`ReadyQueue`]: ready threads without a processor, ordered by urgency
//! - [`ScheduledSet`]: threads that own a processor, most urgent first
//! - [`Processors`]: per-processor heir and dispatch state
//! - [`GlobalEdf`]: the operations tying them together

mod allocator;
pub mod global_edf;
pub mod notify;
pub mod percpu;
pub mod ready;
pub mod scheduled;
pub mod trait_def;

pub use global_edf::{GlobalEdf, TieBreak};
pub use notify::{CpuMask, CpuMaskIter, Notifications};
pub use percpu::{PerCpu, Processor, Processors, Switch};
pub use ready::ReadyQueue;
pub use scheduled::{ScheduledIter, ScheduledSet};
pub use trait_def::{CpuId, Scheduler, SchedulerStats};

/// Default scheduler type.
pub type DefaultScheduler<A> = GlobalEdf<A>;
