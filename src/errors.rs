//! Error types for the scheduler core.
//!
//! Bringing the scheduler instance up is fatal for the kernel when it fails.
//! Allocating a per-thread scheduler record can fail softly (the
//! task-creation path must refuse the new thread), and releasing one is
//! refused while the thread is still queued, scheduled or running. Queue
//! operations are total functions over their preconditions.

#![allow(clippy::uninlined_format_args)]

use core::fmt;

use crate::sched::CpuId;
use crate::thread::ThreadId;

/// Result type for scheduler operations.
pub type SchedResult<T> = Result<T, SchedError>;

/// Error type for all fallible scheduler operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// Scheduler instance could not be created
    Init(InitError),
    /// The thread-record workspace is exhausted
    NoStorage,
    /// Processor index outside the configured processor count
    InvalidCpu(CpuId),
    /// Thread is still linked into the ready queue or scheduled set
    StillPlaced(ThreadId),
    /// Thread is still the executing thread of a processor
    StillExecuting(ThreadId),
    /// Processors were already brought up
    AlreadyStarted,
}

/// Errors raised while creating the scheduler instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// Processor count of zero
    NoProcessors,
    /// More processors than a processor mask can address
    TooManyProcessors { requested: usize, max: usize },
    /// Fewer thread records than processors (no room for the idle threads)
    NotEnoughThreadSlots { slots: usize, processors: usize },
    /// Bring-up needs exactly one idle thread per processor
    IdleThreadMismatch { idle: usize, processors: usize },
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::Init(e) => write!(f, "Scheduler initialization error: {}", e),
            SchedError::NoStorage => write!(f, "No storage left for a scheduler thread record"),
            SchedError::InvalidCpu(cpu) => write!(f, "Invalid processor: {}", cpu),
            SchedError::StillPlaced(thread) => {
                write!(f, "Thread {} is still queued or scheduled", thread)
            }
            SchedError::StillExecuting(thread) => {
                write!(f, "Thread {} is still executing on a processor", thread)
            }
            SchedError::AlreadyStarted => write!(f, "Processors are already running"),
        }
    }
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::NoProcessors => write!(f, "At least one processor is required"),
            InitError::TooManyProcessors { requested, max } => {
                write!(f, "Requested {} processors, at most {} are supported", requested, max)
            }
            InitError::NotEnoughThreadSlots { slots, processors } => write!(
                f,
                "{} thread records cannot hold an idle thread for each of {} processors",
                slots, processors
            ),
            InitError::IdleThreadMismatch { idle, processors } => write!(
                f,
                "Got {} idle threads for {} processors",
                idle, processors
            ),
        }
    }
}

impl From<InitError> for SchedError {
    fn from(error: InitError) -> Self {
        SchedError::Init(error)
    }
}
