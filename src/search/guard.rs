use std::time::{Duration, Instant};

use crate::error::{Error, Limit, Result};
use crate::types::SearchOptions;

/// Guard clauses that terminate a search once a limit is breached.
///
/// The deadline is fixed when the guard is created.
#[derive(Debug, Clone)]
pub struct LimitGuard {
    max_depth: usize,
    max_items: usize,
    max_duration: Duration,
    deadline: Option<Instant>,
}

impl LimitGuard {
    pub fn new(options: &SearchOptions) -> Self {
        Self {
            max_depth: options.max_depth,
            max_items: options.max_items,
            max_duration: options.max_duration,
            // An unrepresentable deadline means no deadline.
            deadline: Instant::now().checked_add(options.max_duration),
        }
    }

    pub fn check_deadline(&self) -> Result<()> {
        match self.deadline {
            Some(deadline) if Instant::now() > deadline => {
                Err(Error::LimitExceeded(Limit::Duration(self.max_duration)))
            }
            _ => Ok(()),
        }
    }

    /// Checks one emitted item at `depth`, the `count`-th of the search.
    pub fn check(&self, depth: usize, count: usize) -> Result<()> {
        self.check_deadline()?;
        if depth > self.max_depth {
            return Err(Error::LimitExceeded(Limit::Depth(self.max_depth)));
        }
        if count > self.max_items {
            return Err(Error::LimitExceeded(Limit::Items(self.max_items)));
        }
        Ok(())
    }
}
