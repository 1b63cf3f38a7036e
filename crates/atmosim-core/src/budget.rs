//! Per-tick processing budget.
//!
//! Phases call [`ProcessingBudget::tick`] once per item. The wall clock is
//! only read every `lag_check_iterations` items; an optional item limit
//! gives deterministic cut-offs for tests and the harness.

use std::time::{Duration, Instant};

use crate::config::AtmosConfig;

#[derive(Debug, Clone)]
pub struct ProcessingBudget {
    deadline: Option<Instant>,
    item_limit: Option<usize>,
    processed: usize,
    lag_check_iterations: usize,
}

impl ProcessingBudget {
    /// Never runs out.
    pub fn unlimited() -> Self {
        Self {
            deadline: None,
            item_limit: None,
            processed: 0,
            lag_check_iterations: 1,
        }
    }

    /// Runs out once `max_time` has elapsed from now.
    pub fn with_time(max_time: Duration, lag_check_iterations: u32) -> Self {
        Self {
            deadline: Some(Instant::now() + max_time),
            item_limit: None,
            processed: 0,
            lag_check_iterations: lag_check_iterations.max(1) as usize,
        }
    }

    /// Runs out after `items` items.
    pub fn with_item_limit(items: usize) -> Self {
        Self {
            deadline: None,
            item_limit: Some(items),
            processed: 0,
            lag_check_iterations: 1,
        }
    }

    /// The wall-clock budget one `update` call gets.
    pub fn for_tick(config: &AtmosConfig) -> Self {
        Self::with_time(config.max_process_time(), config.lag_check_iterations)
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Count one processed item. Returns true when the budget is spent.
    pub fn tick(&mut self) -> bool {
        self.processed += 1;
        if let Some(limit) = self.item_limit {
            if self.processed >= limit {
                return true;
            }
        }
        if self.processed % self.lag_check_iterations != 0 {
            return false;
        }
        self.deadline_passed()
    }

    /// Spent, without counting an item.
    pub fn is_exhausted(&self) -> bool {
        if let Some(limit) = self.item_limit {
            if self.processed >= limit {
                return true;
            }
        }
        self.deadline_passed()
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.map(|d| Instant::now() >= d).unwrap_or(false)
    }
}
