//! Client-side page bookkeeping for multi-page documents.
//!
//! The engine keeps at most one page open at a time. Working on several
//! pages therefore means parking the open page with `suspend_page` and
//! reviving it later with `resume_page`. [`PageSet`] mirrors that state
//! outside the engine so transitions can be validated before a primitive
//! is issued: which page is open, how many exist, and which numbers sit
//! in the suspended set.

use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// Record of created, open, and suspended pages.
///
/// Page numbers start at 1; `0` is reserved for "no page open".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSet {
    current: u32,
    total: u32,
    suspended: BTreeSet<u32>,
}

impl PageSet {
    /// Create an empty set with no pages.
    pub fn new() -> Self {
        Self::default()
    }

    /// The page currently open for drawing, if any.
    pub fn current(&self) -> Option<u32> {
        (self.current != 0).then_some(self.current)
    }

    /// Whether a page is currently open.
    pub fn has_current(&self) -> bool {
        self.current != 0
    }

    /// Total number of pages created so far.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Whether the given page number is parked in the suspended set.
    pub fn is_suspended(&self, number: u32) -> bool {
        self.suspended.contains(&number)
    }

    /// Suspended page numbers in ascending order.
    pub fn suspended(&self) -> Vec<u32> {
        self.suspended.iter().copied().collect()
    }

    /// Number of suspended pages.
    pub fn suspended_count(&self) -> usize {
        self.suspended.len()
    }

    /// Highest suspended page number, if any.
    pub fn last_suspended(&self) -> Option<u32> {
        self.suspended.iter().next_back().copied()
    }

    /// Record a freshly begun page and return its number.
    ///
    /// The caller must have parked any open page first; numbers are
    /// issued sequentially from 1.
    pub fn begin(&mut self) -> u32 {
        self.total += 1;
        self.current = self.total;
        self.total
    }

    /// Move the current page into the suspended set.
    ///
    /// Returns the parked number, or `None` when no page was open.
    pub fn park(&mut self) -> Option<u32> {
        let number = self.current()?;
        self.suspended.insert(number);
        self.current = 0;
        Some(number)
    }

    /// Take a page out of the suspended set and make it current.
    pub fn resume(&mut self, number: u32) -> Result<()> {
        if !self.suspended.remove(&number) {
            return Err(Error::PageNotSuspended(number));
        }
        self.current = number;
        Ok(())
    }

    /// Record that the current page was closed for good.
    pub fn finish(&mut self) {
        self.current = 0;
    }
}
