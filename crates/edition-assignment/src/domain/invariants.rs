//! Domain invariants for Edition Assignment
//!
//! Each check works over all line items of one product; inactive items are
//! ignored everywhere.

use super::entities::{IntegrityReport, IntegrityViolation, LineItem};
use super::value_objects::{EditionKind, LineItemId, ProductId};
use std::collections::{BTreeMap, BTreeSet, HashMap};

fn active(items: &[LineItem]) -> impl Iterator<Item = &LineItem> {
    items.iter().filter(|item| item.is_active())
}

/// Uniqueness
/// No two active items share an edition number.
pub fn invariant_unique_editions(items: &[LineItem]) -> bool {
    let mut seen = BTreeSet::new();
    active(items)
        .filter_map(|item| item.edition_number)
        .all(|number| seen.insert(number))
}

/// Claim Immutability
/// Every frozen item in `before` still holds the same number in `after`.
pub fn invariant_claims_frozen(before: &[LineItem], after: &[LineItem]) -> bool {
    let after_by_id: HashMap<&LineItemId, &LineItem> =
        after.iter().map(|item| (&item.id, item)).collect();

    before.iter().filter(|item| item.is_frozen()).all(|frozen| {
        after_by_id
            .get(&frozen.id)
            .map(|now| now.edition_number == frozen.edition_number)
            .unwrap_or(false)
    })
}

/// Capacity
/// Limited editions never hand out a number above their size.
pub fn invariant_within_capacity(items: &[LineItem], kind: EditionKind) -> bool {
    active(items)
        .filter_map(|item| item.edition_number)
        .all(|number| kind.admits(number))
}

/// Open editions carry no total.
pub fn invariant_open_totals_null(items: &[LineItem], kind: EditionKind) -> bool {
    if !kind.is_open() {
        return true;
    }
    active(items).all(|item| item.edition_total.is_none())
}

/// Numbered active items of a limited edition carry its size as total.
pub fn invariant_totals_match(items: &[LineItem], kind: EditionKind) -> bool {
    active(items)
        .filter(|item| item.edition_number.is_some())
        .all(|item| item.edition_total == kind.edition_total())
}

/// Gap Closure
/// Unclaimed items hold exactly the lowest numbers not reserved by frozen items.
pub fn invariant_gap_free(items: &[LineItem]) -> bool {
    let (reserved, mutable) = partition(items);
    let expected = lowest_free_numbers(&reserved, mutable.len());
    let held: BTreeSet<u32> = mutable
        .iter()
        .filter_map(|item| item.edition_number)
        .collect();
    held.len() == mutable.len() && held == expected
}

/// Full audit producing every violation found, for admin tooling.
pub fn audit(product_id: &ProductId, kind: EditionKind, items: &[LineItem]) -> IntegrityReport {
    let mut violations = Vec::new();

    let mut holders: BTreeMap<u32, Vec<LineItemId>> = BTreeMap::new();
    for item in active(items) {
        if let Some(number) = item.edition_number {
            holders.entry(number).or_default().push(item.id.clone());
        }
    }
    for (number, ids) in &holders {
        if ids.len() > 1 {
            violations.push(IntegrityViolation::DuplicateNumber {
                edition_number: *number,
                line_items: ids.clone(),
            });
        }
    }

    for item in active(items) {
        let Some(number) = item.edition_number else {
            violations.push(IntegrityViolation::Unnumbered {
                line_item_id: item.id.clone(),
            });
            continue;
        };
        if let EditionKind::Limited(size) = kind {
            if number > size.get() {
                violations.push(IntegrityViolation::OverCapacity {
                    line_item_id: item.id.clone(),
                    edition_number: number,
                    edition_size: size.get(),
                });
            }
        }
        if item.edition_total != kind.edition_total() {
            violations.push(IntegrityViolation::TotalMismatch {
                line_item_id: item.id.clone(),
                expected: kind.edition_total(),
                actual: item.edition_total,
            });
        }
    }

    let (reserved, mutable) = partition(items);
    let held: BTreeSet<u32> = mutable
        .iter()
        .filter_map(|item| item.edition_number)
        .collect();
    for missing in lowest_free_numbers(&reserved, mutable.len()) {
        if !held.contains(&missing) {
            violations.push(IntegrityViolation::Gap { missing });
        }
    }

    IntegrityReport {
        product_id: product_id.clone(),
        kind,
        active_items: active(items).count(),
        frozen_items: active(items).filter(|item| item.is_frozen()).count(),
        claimed_items: active(items).filter(|item| item.is_claimed()).count(),
        violations,
    }
}

/// Split active items into the reserved number set and the renumberable items.
fn partition(items: &[LineItem]) -> (BTreeSet<u32>, Vec<&LineItem>) {
    let mut reserved = BTreeSet::new();
    let mut mutable = Vec::new();
    for item in active(items) {
        match (item.is_frozen(), item.edition_number) {
            (true, Some(number)) => {
                reserved.insert(number);
            }
            _ => mutable.push(item),
        }
    }
    (reserved, mutable)
}

fn lowest_free_numbers(reserved: &BTreeSet<u32>, count: usize) -> BTreeSet<u32> {
    (1u32..)
        .filter(|n| !reserved.contains(n))
        .take(count)
        .collect()
}
