//! Value objects for Edition Assignment

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

use super::errors::AssignmentError;

/// Upper bound on product identifier length (bytes).
pub const MAX_PRODUCT_ID_LEN: usize = 255;

/// Stable, string-typed product identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Wrap a trusted identifier without validation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse an identifier coming from an untrusted caller.
    ///
    /// Surrounding whitespace is trimmed; empty or oversized identifiers are
    /// rejected.
    pub fn parse(raw: &str) -> Result<Self, AssignmentError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AssignmentError::InvalidProductId(
                "product id is empty".to_string(),
            ));
        }
        if trimmed.len() > MAX_PRODUCT_ID_LEN {
            return Err(AssignmentError::InvalidProductId(format!(
                "product id is {} bytes, max {}",
                trimmed.len(),
                MAX_PRODUCT_ID_LEN
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one purchased unit.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemId(String);

impl LineItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a product's editions are capped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditionKind {
    /// No upper bound; `edition_total` is always null.
    Open,
    /// At most `n` editions exist.
    Limited(NonZeroU32),
}

impl EditionKind {
    /// Null and zero sizes both mean open edition.
    pub fn from_size(edition_size: Option<u32>) -> Self {
        match edition_size.and_then(NonZeroU32::new) {
            Some(size) => EditionKind::Limited(size),
            None => EditionKind::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, EditionKind::Open)
    }

    /// Value stored in `edition_total` on every assigned item.
    pub fn edition_total(&self) -> Option<u32> {
        match self {
            EditionKind::Open => None,
            EditionKind::Limited(size) => Some(size.get()),
        }
    }

    /// True if `number` fits within the edition.
    pub fn admits(&self, number: u32) -> bool {
        match self {
            EditionKind::Open => true,
            EditionKind::Limited(size) => number <= size.get(),
        }
    }
}

/// Purchase record lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineItemStatus {
    Active,
    /// Cancelled, refunded or restocked.
    Inactive,
}

/// Human-facing edition label, e.g. "3 of 10".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditionLabel {
    pub number: u32,
    pub total: Option<u32>,
}

impl fmt::Display for EditionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            Some(total) => write!(f, "{} of {}", self.number, total),
            None => write!(f, "#{}", self.number),
        }
    }
}
