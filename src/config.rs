//! Scheduler instance configuration.
//!
//! Mirrors the application configuration table of the kernel: how many
//! processors take part in global scheduling, how many thread records the
//! scheduler workspace holds, and whether executing threads are budgeted.

use crate::errors::InitError;

/// Maximum number of processors, bounded by the width of [`CpuMask`].
///
/// [`CpuMask`]: crate::sched::CpuMask
pub const MAX_PROCESSORS: usize = 64;

/// Configuration consumed by [`GlobalEdf::new`].
///
/// [`GlobalEdf::new`]: crate::sched::GlobalEdf::new
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    processors: usize,
    max_threads: usize,
    timeslice: Option<u32>,
}

impl SchedulerConfig {
    /// Create a configuration for `processors` processors and `max_threads`
    /// thread records, with budgets disabled.
    pub const fn new(processors: usize, max_threads: usize) -> Self {
        Self {
            processors,
            max_threads,
            timeslice: None,
        }
    }

    pub fn with_processors(mut self, processors: usize) -> Self {
        self.processors = processors;
        self
    }

    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Give every non-idle thread a budget of `ticks` ticks; the thread yields
    /// to its equally urgent peers once the budget is spent.
    pub fn with_timeslice(mut self, ticks: u32) -> Self {
        self.timeslice = if ticks == 0 { None } else { Some(ticks) };
        self
    }

    pub fn processors(&self) -> usize {
        self.processors
    }

    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    pub fn timeslice(&self) -> Option<u32> {
        self.timeslice
    }

    /// Check the configuration before the instance is created.
    pub fn validate(&self) -> Result<(), InitError> {
        if self.processors == 0 {
            return Err(InitError::NoProcessors);
        }
        if self.processors > MAX_PROCESSORS {
            return Err(InitError::TooManyProcessors {
                requested: self.processors,
                max: MAX_PROCESSORS,
            });
        }
        if self.max_threads < self.processors {
            return Err(InitError::NotEnoughThreadSlots {
                slots: self.max_threads,
                processors: self.processors,
            });
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(4, 64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SchedulerConfig::default();
        assert_eq!(config.processors(), 4);
        assert_eq!(config.max_threads(), 64);
        assert_eq!(config.timeslice(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        assert_eq!(
            SchedulerConfig::new(0, 8).validate(),
            Err(InitError::NoProcessors)
        );
        assert_eq!(
            SchedulerConfig::new(65, 128).validate(),
            Err(InitError::TooManyProcessors { requested: 65, max: 64 })
        );
        assert_eq!(
            SchedulerConfig::new(4, 3).validate(),
            Err(InitError::NotEnoughThreadSlots { slots: 3, processors: 4 })
        );
    }

    #[test]
    fn test_zero_timeslice_disables_budgets() {
        let config = SchedulerConfig::default().with_timeslice(0);
        assert_eq!(config.timeslice(), None);
        let config = config.with_timeslice(5);
        assert_eq!(config.timeslice(), Some(5));
    }
}
