//! Fetch windows and day iteration.

use chrono::NaiveDate;

use crate::WindowError;

/// A half-open range of settlement dates `[start, end)` requested in one
/// planning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchWindow {
    /// First settlement date (inclusive).
    pub start: NaiveDate,
    /// Settlement date after the last one requested (exclusive).
    pub end: NaiveDate,
}

impl FetchWindow {
    /// Creates a new window, validating that start <= end.
    ///
    /// # Errors
    ///
    /// Returns an error if start > end.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Returns an iterator over every settlement date in the window.
    pub fn days(&self) -> DayIterator {
        DayIterator {
            current: self.start,
            end: self.end,
        }
    }

    /// Returns the number of settlement dates in the window.
    #[must_use]
    pub fn total_days(&self) -> usize {
        (self.end - self.start).num_days().max(0) as usize
    }

    /// Returns true if the window contains no dates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl std::fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Iterator over the settlement dates of a [`FetchWindow`].
#[derive(Debug, Clone)]
pub struct DayIterator {
    current: NaiveDate,
    end: NaiveDate,
}

impl Iterator for DayIterator {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.end {
            return None;
        }

        let result = self.current;
        self.current = self.current.succ_opt()?;
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let days = (self.end - self.current).num_days().max(0) as usize;
        (days, Some(days))
    }
}

impl ExactSizeIterator for DayIterator {}
