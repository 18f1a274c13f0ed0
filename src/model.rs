//! # Domain Model: Items, Quantities, and Partial Updates
//!
//! This module defines the core data structures: [`ItemRecord`], [`Quantity`],
//! and [`ItemPatch`].
//!
//! ## The Amount Problem
//!
//! An item's amount is either a number ("2 L of milk") or a stock flag
//! ("butter: in stock"). Keeping a numeric field and a boolean field side by
//! side invites the two drifting apart, so the amount is a tagged variant:
//!
//! - [`Quantity::Measured`] — numeric amount, display unit, optional minimum
//!   threshold. Only measured quantities carry a unit or a minimum.
//! - [`Quantity::Flag`] — a plain in-stock/out-of-stock boolean.
//!
//! Accessing the numeric payload of a flag is not expressible, and switching
//! an item to a flag structurally drops its minimum and unit.
//!
//! ## Partial Updates
//!
//! [`ItemPatch`] merges onto an existing record. Fields left as `None` are
//! preserved. `minimum` and `planned_restock` use an explicit outer presence
//! check so callers can intentionally clear them. `quantity` replaces the
//! whole tagged value, keeping kind, amount, and unit coherent in one move.
//!
//! ## Field Validation
//!
//! Names and categories travel inside a pipe-separated line format, so `|`
//! and line breaks would corrupt the document. [`is_valid_field_text`] is
//! exported for calling layers; the mutators themselves do not re-validate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Characters that would corrupt the persisted line grammar.
pub const FORBIDDEN_FIELD_CHARS: [char; 3] = ['|', '\n', '\r'];

/// Returns true if the text is safe to embed in an item line.
pub fn is_valid_field_text(text: &str) -> bool {
    !text.contains(&FORBIDDEN_FIELD_CHARS[..])
}

/// Classification of a measured quantity, inferred from its unit string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasureKind {
    Count,
    Portion,
    Weight,
    Volume,
}

/// Tagged amount. The shape of the payload is the unit type: measured
/// quantities are numeric, flags are boolean, and never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Quantity {
    Measured {
        kind: MeasureKind,
        amount: f64,
        unit: String,
        minimum: Option<f64>,
    },
    Flag {
        in_stock: bool,
    },
}

impl Quantity {
    pub fn measured(kind: MeasureKind, amount: f64, unit: impl Into<String>) -> Self {
        Self::Measured {
            kind,
            amount,
            unit: unit.into(),
            minimum: None,
        }
    }

    pub fn flag(in_stock: bool) -> Self {
        Self::Flag { in_stock }
    }

    pub fn is_flag(&self) -> bool {
        matches!(self, Self::Flag { .. })
    }

    /// Numeric amount, or `None` for flags.
    pub fn amount(&self) -> Option<f64> {
        match self {
            Self::Measured { amount, .. } => Some(*amount),
            Self::Flag { .. } => None,
        }
    }

    /// Minimum threshold, or `None` for flags and unset thresholds.
    pub fn minimum(&self) -> Option<f64> {
        match self {
            Self::Measured { minimum, .. } => *minimum,
            Self::Flag { .. } => None,
        }
    }

    pub fn with_minimum(self, min: Option<f64>) -> Self {
        match self {
            Self::Measured {
                kind, amount, unit, ..
            } => Self::Measured {
                kind,
                amount,
                unit,
                minimum: min,
            },
            flag => flag,
        }
    }
}

/// One tracked inventory entity.
///
/// Ids are assigned at creation, unique within a store, and never persisted
/// in the text form; every load assigns fresh ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: Uuid,
    pub name: String,
    /// Free-text grouping label. Empty string means "uncategorized".
    pub category: String,
    pub quantity: Quantity,
    pub planned_restock: bool,
}

impl ItemRecord {
    pub fn new(name: impl Into<String>, category: impl Into<String>, quantity: Quantity) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category: category.into(),
            quantity,
            planned_restock: false,
        }
    }

    /// Merge a partial update onto this record. Absent fields are preserved.
    pub fn apply(&mut self, patch: &ItemPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(quantity) = &patch.quantity {
            self.quantity = quantity.clone();
        }
        // Explicit presence: Some(None) clears the threshold, None leaves it.
        if let Some(minimum) = patch.minimum {
            self.quantity = self.quantity.clone().with_minimum(minimum);
        }
        if let Some(planned) = patch.planned_restock {
            self.planned_restock = planned;
        }
    }
}

/// Partial update applied by `RecordStore::update_item`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    /// Replaces kind, amount, and unit together so they cannot disagree.
    pub quantity: Option<Quantity>,
    /// `Some(None)` clears the minimum; plain `None` leaves it untouched.
    /// Ignored on flag quantities.
    pub minimum: Option<Option<f64>>,
    pub planned_restock: Option<bool>,
}

impl ItemPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn recategorize(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_text_validation() {
        assert!(is_valid_field_text("Olive Oil"));
        assert!(!is_valid_field_text("a|b"));
        assert!(!is_valid_field_text("two\nlines"));
    }

    #[test]
    fn test_flag_has_no_numeric_payload() {
        let q = Quantity::flag(true);
        assert!(q.is_flag());
        assert_eq!(q.amount(), None);
        assert_eq!(q.minimum(), None);
    }

    #[test]
    fn test_with_minimum_ignored_on_flag() {
        let q = Quantity::flag(false).with_minimum(Some(2.0));
        assert_eq!(q.minimum(), None);
    }

    #[test]
    fn test_apply_preserves_absent_fields() {
        let mut item = ItemRecord::new(
            "Milk",
            "Dairy",
            Quantity::measured(MeasureKind::Volume, 2.0, "L").with_minimum(Some(1.0)),
        );
        item.apply(&ItemPatch::rename("Whole Milk"));

        assert_eq!(item.name, "Whole Milk");
        assert_eq!(item.category, "Dairy");
        assert_eq!(item.quantity.amount(), Some(2.0));
        assert_eq!(item.quantity.minimum(), Some(1.0));
    }

    #[test]
    fn test_apply_clears_minimum_explicitly() {
        let mut item = ItemRecord::new(
            "Milk",
            "Dairy",
            Quantity::measured(MeasureKind::Volume, 2.0, "L").with_minimum(Some(1.0)),
        );
        item.apply(&ItemPatch {
            minimum: Some(None),
            ..ItemPatch::default()
        });
        assert_eq!(item.quantity.minimum(), None);
    }

    #[test]
    fn test_switching_to_flag_drops_minimum_and_unit() {
        let mut item = ItemRecord::new(
            "Butter",
            "Dairy",
            Quantity::measured(MeasureKind::Weight, 0.5, "kg").with_minimum(Some(1.0)),
        );
        item.apply(&ItemPatch {
            quantity: Some(Quantity::flag(true)),
            ..ItemPatch::default()
        });

        assert!(item.quantity.is_flag());
        assert_eq!(item.quantity.minimum(), None);
        assert_eq!(item.quantity.amount(), None);
    }

    #[test]
    fn test_apply_toggles_planned_restock() {
        let mut item = ItemRecord::new("Eggs", "", Quantity::measured(MeasureKind::Count, 0.0, "pcs"));
        item.apply(&ItemPatch {
            planned_restock: Some(true),
            ..ItemPatch::default()
        });
        assert!(item.planned_restock);
    }
}
