//! Query year resolution.
//!
//! Endpoints that take an optional `year` resolve it the same way: an
//! explicit integer is used verbatim, otherwise the latest year present in
//! the collection, otherwise the current calendar year.

use crate::store::{CaseStore, StoreError};
use chrono::{Datelike, Utc};
use std::sync::Arc;
use tracing::debug;

/// Source of the current calendar year.
pub trait CalendarClock: Send + Sync {
    fn current_year(&self) -> i32;
}

/// Calendar year from the system clock, in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl CalendarClock for SystemClock {
    fn current_year(&self) -> i32 {
        Utc::now().year()
    }
}

/// A clock stuck on one year.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i32);

impl CalendarClock for FixedClock {
    fn current_year(&self) -> i32 {
        self.0
    }
}

/// Lenient parse of a raw `year` query value.
///
/// Anything that is not an integer counts as "not supplied".
pub fn parse_year_param(raw: Option<&str>) -> Option<i32> {
    raw.and_then(|s| s.trim().parse::<i32>().ok())
}

/// Turns an optional requested year into a concrete one.
#[derive(Clone)]
pub struct YearResolver {
    store: Arc<dyn CaseStore>,
    clock: Arc<dyn CalendarClock>,
}

impl YearResolver {
    pub fn new(store: Arc<dyn CaseStore>, clock: Arc<dyn CalendarClock>) -> Self {
        Self { store, clock }
    }

    /// Current calendar year according to the injected clock.
    pub fn current_year(&self) -> i32 {
        self.clock.current_year()
    }

    /// Resolve the year to query.
    pub fn resolve(&self, requested: Option<i32>) -> Result<i32, StoreError> {
        if let Some(year) = requested {
            return Ok(year);
        }

        let year = match self.store.max_year()? {
            Some(latest) => latest,
            None => self.clock.current_year(),
        };
        debug!("No year requested, resolved to {}", year);
        Ok(year)
    }
}
