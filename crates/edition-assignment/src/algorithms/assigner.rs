//! Edition Assignment Planner
//!
//! Computes the complete numbering for one product before anything is written:
//!
//! 1. Derive the edition kind from the product (missing product → open).
//! 2. Collect the reserved set: numbers held by active, claimed, numbered items.
//! 3. Treat every other active item as cleared.
//! 4. Walk active items oldest-first, skip frozen ones, and hand each remaining
//!    item the next candidate not in the reserved set.
//! 5. Abort on the first candidate above a limited edition's size.
//!
//! Because the plan is computed in full first, an overflow yields no writes at
//! all and the caller's store is left untouched.

use super::candidates::CandidateSequence;
use crate::domain::entities::{AssignmentPlan, EditionWrite, LineItem, Product};
use crate::domain::errors::{AssignmentError, AssignmentResult};
use crate::domain::value_objects::{EditionKind, ProductId};
use std::collections::BTreeSet;

/// Plan edition numbers for all active line items of `product_id`.
///
/// Items belonging to other products are ignored, as are inactive items.
pub fn plan_assignment(
    product_id: &ProductId,
    product: Option<&Product>,
    items: &[LineItem],
) -> AssignmentResult<AssignmentPlan> {
    let kind = product
        .map(Product::edition_kind)
        .unwrap_or(EditionKind::Open);
    let edition_total = kind.edition_total();

    let mut active: Vec<&LineItem> = items
        .iter()
        .filter(|item| &item.product_id == product_id && item.is_active())
        .collect();

    let reserved: BTreeSet<u32> = active
        .iter()
        .filter(|item| item.is_frozen())
        .filter_map(|item| item.edition_number)
        .collect();

    // Oldest first; id breaks timestamp ties so reruns are deterministic
    active.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut candidates = CandidateSequence::new(&reserved);
    let mut writes = Vec::with_capacity(active.len());

    for item in active.into_iter().filter(|item| !item.is_frozen()) {
        let candidate = candidates
            .next()
            .ok_or_else(|| AssignmentError::TooManyLineItems {
                count: writes.len() + 1,
                max: u32::MAX as usize,
            })?;

        if let EditionKind::Limited(size) = kind {
            if candidate > size.get() {
                return Err(AssignmentError::CapacityExceeded {
                    product_id: product_id.clone(),
                    candidate,
                    edition_size: size.get(),
                });
            }
        }

        writes.push(EditionWrite {
            line_item_id: item.id.clone(),
            edition_number: candidate,
            edition_total,
            previous_number: item.edition_number,
        });
    }

    Ok(AssignmentPlan {
        product_id: product_id.clone(),
        kind,
        reserved,
        writes,
    })
}
