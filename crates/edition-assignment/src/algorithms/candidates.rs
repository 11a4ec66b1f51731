//! Candidate number sequence
//!
//! Yields 1, 2, 3, ... skipping every number held by a frozen item.
//! Reserved numbers may sit anywhere, including far ahead of the cursor.

use std::collections::BTreeSet;

/// Cursor over edition numbers that are free to hand out.
#[derive(Debug, Clone)]
pub struct CandidateSequence<'a> {
    reserved: &'a BTreeSet<u32>,
    /// Next number to consider; `None` once u32 space is exhausted.
    cursor: Option<u32>,
}

impl<'a> CandidateSequence<'a> {
    pub fn new(reserved: &'a BTreeSet<u32>) -> Self {
        Self {
            reserved,
            cursor: Some(1),
        }
    }

    /// The next free candidate without consuming it.
    pub fn peek(&self) -> Option<u32> {
        let mut candidate = self.cursor?;
        while self.reserved.contains(&candidate) {
            candidate = candidate.checked_add(1)?;
        }
        Some(candidate)
    }
}

impl Iterator for CandidateSequence<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let candidate = self.peek()?;
        self.cursor = candidate.checked_add(1);
        Some(candidate)
    }
}
