//! Core entities for Edition Assignment

use super::value_objects::{
    EditionKind, EditionLabel, LineItemId, LineItemStatus, ProductId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Product configuration relevant to edition numbering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub title: String,
    /// Null or zero means open edition.
    #[serde(default)]
    pub edition_size: Option<u32>,
}

impl Product {
    pub fn new(id: ProductId, edition_size: Option<u32>) -> Self {
        Self {
            id,
            title: String::new(),
            edition_size,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn edition_kind(&self) -> EditionKind {
        EditionKind::from_size(self.edition_size)
    }
}

/// One purchased unit of a product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub product_id: ProductId,
    #[serde(default)]
    pub order_id: Option<String>,
    pub status: LineItemStatus,
    #[serde(default)]
    pub edition_number: Option<u32>,
    #[serde(default)]
    pub edition_total: Option<u32>,
    /// Set once the collector authenticates the physical piece.
    #[serde(default)]
    pub nfc_claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl LineItem {
    /// New active, unnumbered, unclaimed item.
    pub fn new(id: LineItemId, product_id: ProductId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            product_id,
            order_id: None,
            status: LineItemStatus::Active,
            edition_number: None,
            edition_total: None,
            nfc_claimed_at: None,
            created_at,
        }
    }

    pub fn with_order(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn with_status(mut self, status: LineItemStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_edition(mut self, number: u32, total: Option<u32>) -> Self {
        self.edition_number = Some(number);
        self.edition_total = total;
        self
    }

    pub fn with_claim(mut self, at: DateTime<Utc>) -> Self {
        self.nfc_claimed_at = Some(at);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == LineItemStatus::Active
    }

    pub fn is_claimed(&self) -> bool {
        self.nfc_claimed_at.is_some()
    }

    /// Claimed and numbered: the number is printed on a certificate.
    pub fn is_frozen(&self) -> bool {
        self.is_claimed() && self.edition_number.is_some()
    }

    pub fn label(&self) -> Option<EditionLabel> {
        self.edition_number.map(|number| EditionLabel {
            number,
            total: self.edition_total,
        })
    }
}

/// A single edition number write produced by the planner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditionWrite {
    pub line_item_id: LineItemId,
    pub edition_number: u32,
    pub edition_total: Option<u32>,
    /// Number held before this run, if any.
    pub previous_number: Option<u32>,
}

impl EditionWrite {
    pub fn is_change(&self) -> bool {
        self.previous_number != Some(self.edition_number)
    }
}

/// Complete numbering for one product, computed before anything is written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentPlan {
    pub product_id: ProductId,
    pub kind: EditionKind,
    /// Numbers held by frozen items.
    pub reserved: BTreeSet<u32>,
    /// Writes in assignment (oldest-first) order.
    pub writes: Vec<EditionWrite>,
}

impl AssignmentPlan {
    pub fn assigned_count(&self) -> usize {
        self.writes.len()
    }

    /// Writes whose number differs from what the item held before.
    pub fn changed(&self) -> impl Iterator<Item = &EditionWrite> {
        self.writes.iter().filter(|w| w.is_change())
    }

    /// Highest number in use after the plan is applied.
    pub fn highest_number(&self) -> Option<u32> {
        let written = self.writes.iter().map(|w| w.edition_number).max();
        let reserved = self.reserved.iter().next_back().copied();
        written.max(reserved)
    }
}

/// Outcome of a committed assignment run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentReport {
    pub product_id: ProductId,
    /// Items (re)numbered in this run.
    pub assigned: usize,
    /// Items whose number actually changed.
    pub renumbered: usize,
    /// Frozen numbers skipped over.
    pub reserved: usize,
    pub kind: EditionKind,
}

impl AssignmentReport {
    pub fn from_plan(plan: &AssignmentPlan) -> Self {
        Self {
            product_id: plan.product_id.clone(),
            assigned: plan.assigned_count(),
            renumbered: plan.changed().count(),
            reserved: plan.reserved.len(),
            kind: plan.kind,
        }
    }
}

/// A single problem found by an integrity audit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityViolation {
    DuplicateNumber {
        edition_number: u32,
        line_items: Vec<LineItemId>,
    },
    OverCapacity {
        line_item_id: LineItemId,
        edition_number: u32,
        edition_size: u32,
    },
    TotalMismatch {
        line_item_id: LineItemId,
        expected: Option<u32>,
        actual: Option<u32>,
    },
    Unnumbered {
        line_item_id: LineItemId,
    },
    Gap {
        missing: u32,
    },
}

/// Read-only audit of a product's current numbering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub product_id: ProductId,
    pub kind: EditionKind,
    pub active_items: usize,
    /// Active items holding a claimed number
    pub frozen_items: usize,
    /// Active items with an NFC claim, numbered or not
    pub claimed_items: usize,
    pub violations: Vec<IntegrityViolation>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}
