//! # Document Codec
//!
//! Converts between a list document's text and an ordered set of
//! [`ItemRecord`]s plus document metadata. The format is deliberately
//! human-editable, so the parser is tolerant: malformed metadata falls back
//! to defaults, unknown lines are skipped, and a mangled amount field
//! degrades to a stock flag instead of dropping the item.
//!
//! ## Format
//!
//! ```text
//! ---
//! stoker-plugin: inventory
//! version: 1
//! lastUpdated: 2025-01-29
//! ---
//!
//! ## Dairy
//! - [ ] Milk | 2 L | min: 1
//! - [x] Butter | in stock
//! ```
//!
//! A line that is exactly `---` toggles the metadata block. Outside it,
//! `## Heading` opens a category ("Uncategorized", case-insensitive, is the
//! empty category) and `- [<c>] name | amount | …` is an item line. The
//! trailing `min: <n>` and `restock` tokens are optional and
//! order-independent.
//!
//! ## Round Trip
//!
//! `parse(serialize(items))` reproduces the same set of items. Item ids are
//! not persisted; every load assigns fresh ones. The status character is
//! recomputed from the derived stock status on every serialize, never echoed
//! from the source text.

use chrono::{Local, NaiveDate};
use std::collections::BTreeMap;

use crate::model::{ItemRecord, MeasureKind, Quantity};
use crate::status::{stock_status, StockStatus};

/// Metadata key identifying a document as one of ours.
pub const MARKER_KEY: &str = "stoker-plugin";
/// Metadata value written next to [`MARKER_KEY`].
pub const MARKER_VALUE: &str = "inventory";

const HR: &str = "---";
const UNCATEGORIZED_HEADING: &str = "Uncategorized";

const WEIGHT_UNITS: [&str; 4] = ["kg", "g", "lb", "oz"];
const VOLUME_UNITS: [&str; 4] = ["l", "ml", "gal", "fl oz"];
const PORTION_UNITS: [&str; 2] = ["", "portion"];
const COUNT_UNITS: [&str; 4] = ["pcs", "pieces", "items", "units"];

/// Result of parsing one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub version: u32,
    pub last_updated: NaiveDate,
    pub items: Vec<ItemRecord>,
}

/// Parse a document's text into items and metadata.
///
/// Absent or malformed `version:` defaults to 1; absent or malformed
/// `lastUpdated:` defaults to today. Lines that match no rule are ignored.
pub fn parse(text: &str) -> ParsedDocument {
    let mut version = 1;
    let mut last_updated = Local::now().date_naive();
    let mut items = Vec::new();
    let mut category = String::new();
    let mut in_metadata = false;

    for raw in text.lines() {
        let line = raw.trim_end();
        if line.trim() == HR {
            in_metadata = !in_metadata;
            continue;
        }

        if in_metadata {
            if let Some((key, value)) = line.split_once(':') {
                match key.trim() {
                    "version" => {
                        if let Ok(v) = value.trim().parse() {
                            version = v;
                        }
                    }
                    "lastUpdated" => {
                        if let Ok(d) = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
                            last_updated = d;
                        }
                    }
                    _ => {}
                }
            }
            continue;
        }

        if let Some(heading) = line.strip_prefix("## ") {
            let heading = heading.trim();
            category = if heading.eq_ignore_ascii_case("uncategorized") {
                String::new()
            } else {
                heading.to_string()
            };
            continue;
        }

        if let Some(item) = parse_item_line(line, &category) {
            items.push(item);
        }
    }

    ParsedDocument {
        version,
        last_updated,
        items,
    }
}

/// Serialize items back to document text.
///
/// `version` is preserved from the parse; `lastUpdated` is stamped fresh.
/// Categories are sorted lexicographically with the empty category rendered
/// last under the literal `Uncategorized` heading.
pub fn serialize(version: u32, items: &[ItemRecord]) -> String {
    let mut out = String::new();
    out.push_str(HR);
    out.push('\n');
    out.push_str(&format!("{}: {}\n", MARKER_KEY, MARKER_VALUE));
    out.push_str(&format!("version: {}\n", version));
    out.push_str(&format!(
        "lastUpdated: {}\n",
        Local::now().format("%Y-%m-%d")
    ));
    out.push_str(HR);
    out.push('\n');

    let mut groups: BTreeMap<&str, Vec<&ItemRecord>> = BTreeMap::new();
    for item in items {
        groups.entry(item.category.as_str()).or_default().push(item);
    }
    // BTreeMap iterates lexicographically; pull the empty category out so it
    // lands at the end.
    let uncategorized = groups.remove("");

    for (name, group) in &groups {
        render_category(&mut out, name, group);
    }
    if let Some(group) = uncategorized {
        render_category(&mut out, UNCATEGORIZED_HEADING, &group);
    }

    out
}

/// Extract a metadata-block value without a full parse. Used by discovery
/// to recognize marker-bearing documents.
pub fn marker_value(text: &str, key: &str) -> Option<String> {
    let mut in_metadata = false;
    for raw in text.lines() {
        let line = raw.trim_end();
        if line.trim() == HR {
            if in_metadata {
                return None;
            }
            in_metadata = true;
            continue;
        }
        if in_metadata {
            if let Some((k, value)) = line.split_once(':') {
                if k.trim() == key {
                    return Some(value.trim().to_string());
                }
            }
        }
    }
    None
}

/// Classify a measured quantity by its unit string.
///
/// Unknown units fall back on a heuristic: a fractional amount with a short
/// unit token reads like a portion, anything else counts pieces. The
/// heuristic can misread legitimate short units ("ea"); it matches the
/// historical behavior and is idempotent on its own output.
pub fn infer_kind(amount: f64, unit: &str) -> MeasureKind {
    let unit = unit.to_ascii_lowercase();
    let unit = unit.as_str();
    if WEIGHT_UNITS.contains(&unit) {
        MeasureKind::Weight
    } else if VOLUME_UNITS.contains(&unit) {
        MeasureKind::Volume
    } else if PORTION_UNITS.contains(&unit) {
        MeasureKind::Portion
    } else if COUNT_UNITS.contains(&unit) {
        MeasureKind::Count
    } else if amount.fract() != 0.0 && unit.chars().count() <= 3 {
        MeasureKind::Portion
    } else {
        MeasureKind::Count
    }
}

fn parse_item_line(line: &str, category: &str) -> Option<ItemRecord> {
    let rest = line.trim_start().strip_prefix("- [")?;
    let mut chars = rest.chars();
    let status = chars.next()?;
    let content = chars.as_str().strip_prefix(']')?.trim();
    if content.is_empty() {
        return None;
    }

    let fields: Vec<&str> = content.split('|').map(str::trim).collect();
    let name = fields[0];
    if name.is_empty() {
        return None;
    }

    // A missing or unreadable amount field degrades to a flag whose value
    // comes from the status character.
    let mut quantity = fields
        .get(1)
        .and_then(|f| parse_amount_field(f))
        .unwrap_or_else(|| Quantity::flag(status == 'x'));

    let mut planned_restock = false;
    for field in fields.iter().skip(2) {
        if let Some(value) = field.strip_prefix("min:") {
            if let Ok(min) = value.trim().parse::<f64>() {
                if min.is_finite() && min >= 0.0 {
                    quantity = quantity.with_minimum(Some(min));
                }
            }
        } else if field.eq_ignore_ascii_case("restock") {
            planned_restock = true;
        }
    }

    // The out-of-stock character overrides whatever the amount field said.
    if status == '-' {
        quantity = match quantity {
            Quantity::Measured {
                kind,
                unit,
                minimum,
                ..
            } => Quantity::Measured {
                kind,
                amount: 0.0,
                unit,
                minimum,
            },
            Quantity::Flag { .. } => Quantity::flag(false),
        };
    }

    let mut item = ItemRecord::new(name, category, quantity);
    item.planned_restock = planned_restock;
    Some(item)
}

fn parse_amount_field(field: &str) -> Option<Quantity> {
    if field.eq_ignore_ascii_case("in stock") {
        return Some(Quantity::flag(true));
    }
    if field.eq_ignore_ascii_case("out of stock") {
        return Some(Quantity::flag(false));
    }

    let number_end = field
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit() && *c != '.')
        .map(|(i, _)| i)
        .unwrap_or(field.len());
    let amount: f64 = field[..number_end].parse().ok()?;
    let unit = field[number_end..].trim();

    Some(Quantity::measured(infer_kind(amount, unit), amount, unit))
}

fn render_category(out: &mut String, heading: &str, items: &[&ItemRecord]) {
    out.push('\n');
    out.push_str("## ");
    out.push_str(heading);
    out.push('\n');
    for item in items {
        out.push_str(&render_item(item));
        out.push('\n');
    }
}

fn render_item(item: &ItemRecord) -> String {
    let status = status_char(stock_status(item));
    let amount_field = match &item.quantity {
        Quantity::Flag { in_stock } => {
            if *in_stock { "in stock" } else { "out of stock" }.to_string()
        }
        Quantity::Measured { amount, unit, .. } => {
            if unit.is_empty() {
                format_number(*amount)
            } else {
                format!("{} {}", format_number(*amount), unit)
            }
        }
    };

    let mut line = format!("- [{}] {} | {}", status, item.name, amount_field);
    if let Some(min) = item.quantity.minimum() {
        line.push_str(&format!(" | min: {}", format_number(min)));
    }
    if item.planned_restock {
        line.push_str(" | restock");
    }
    line
}

fn status_char(status: StockStatus) -> char {
    match status {
        StockStatus::Normal => ' ',
        StockStatus::Warning => '!',
        StockStatus::Out => '-',
        StockStatus::InStock => 'x',
    }
}

// f64 Display already drops a trailing ".0" (2.0 -> "2", 0.5 -> "0.5").
fn format_number(n: f64) -> String {
    format!("{}", n)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = "---\n\
stoker-plugin: inventory\n\
version: 1\n\
lastUpdated: 2025-01-29\n\
---\n\
\n\
## Dairy\n\
- [ ] Milk | 2 L | min: 1\n\
- [!] Cheese | 0.5 kg | min: 1\n\
- [-] Eggs | 0 pcs\n\
- [x] Butter | in stock\n";

    fn find<'a>(doc: &'a ParsedDocument, name: &str) -> &'a ItemRecord {
        doc.items.iter().find(|i| i.name == name).unwrap()
    }

    #[test]
    fn test_parse_example_document() {
        let doc = parse(EXAMPLE);
        assert_eq!(doc.version, 1);
        assert_eq!(
            doc.last_updated,
            NaiveDate::from_ymd_opt(2025, 1, 29).unwrap()
        );
        assert_eq!(doc.items.len(), 4);

        let milk = find(&doc, "Milk");
        assert_eq!(milk.category, "Dairy");
        assert_eq!(
            milk.quantity,
            Quantity::measured(MeasureKind::Volume, 2.0, "L").with_minimum(Some(1.0))
        );
        assert_eq!(stock_status(milk), StockStatus::Normal);

        let cheese = find(&doc, "Cheese");
        assert_eq!(
            cheese.quantity,
            Quantity::measured(MeasureKind::Weight, 0.5, "kg").with_minimum(Some(1.0))
        );
        assert_eq!(stock_status(cheese), StockStatus::Warning);

        let eggs = find(&doc, "Eggs");
        assert_eq!(eggs.quantity, Quantity::measured(MeasureKind::Count, 0.0, "pcs"));
        assert_eq!(stock_status(eggs), StockStatus::Out);

        let butter = find(&doc, "Butter");
        assert_eq!(butter.quantity, Quantity::flag(true));
        assert_eq!(stock_status(butter), StockStatus::InStock);
    }

    #[test]
    fn test_serialize_example_is_byte_stable() {
        let doc = parse(EXAMPLE);
        let text = serialize(doc.version, &doc.items);

        let expected = format!(
            "---\n\
stoker-plugin: inventory\n\
version: 1\n\
lastUpdated: {}\n\
---\n\
\n\
## Dairy\n\
- [ ] Milk | 2 L | min: 1\n\
- [!] Cheese | 0.5 kg | min: 1\n\
- [-] Eggs | 0 pcs\n\
- [x] Butter | in stock\n",
            Local::now().format("%Y-%m-%d")
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_round_trip_preserves_items() {
        let doc = parse(EXAMPLE);
        let reparsed = parse(&serialize(doc.version, &doc.items));

        assert_eq!(reparsed.items.len(), doc.items.len());
        for (a, b) in doc.items.iter().zip(&reparsed.items) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.category, b.category);
            assert_eq!(a.quantity, b.quantity);
            assert_eq!(a.planned_restock, b.planned_restock);
            // Ids are regenerated on every load.
            assert_ne!(a.id, b.id);
        }
    }

    #[test]
    fn test_unit_inference() {
        assert_eq!(infer_kind(2.0, "kg"), MeasureKind::Weight);
        assert_eq!(infer_kind(2.0, "KG"), MeasureKind::Weight);
        assert_eq!(infer_kind(1.0, "fl oz"), MeasureKind::Volume);
        assert_eq!(infer_kind(1.5, ""), MeasureKind::Portion);
        assert_eq!(infer_kind(3.0, "pcs"), MeasureKind::Count);
        // Unknown short units: fractional reads as portion, integer as count.
        assert_eq!(infer_kind(2.0, "ea"), MeasureKind::Count);
        assert_eq!(infer_kind(1.5, "ea"), MeasureKind::Portion);
        assert_eq!(infer_kind(1.5, "bottles"), MeasureKind::Count);
    }

    #[test]
    fn test_out_status_char_overrides_amount() {
        let doc = parse("- [-] Milk | 2 L\n- [-] Butter | in stock\n");
        assert_eq!(doc.items[0].quantity.amount(), Some(0.0));
        assert_eq!(doc.items[1].quantity, Quantity::flag(false));
    }

    #[test]
    fn test_missing_amount_field_degrades_to_flag() {
        let doc = parse("- [x] Butter\n- [ ] Mystery | ???\n");
        assert_eq!(doc.items[0].quantity, Quantity::flag(true));
        assert_eq!(doc.items[1].quantity, Quantity::flag(false));
    }

    #[test]
    fn test_min_and_restock_tokens_are_order_independent() {
        let doc = parse("- [ ] Milk | 2 L | restock | min: 1\n");
        let item = &doc.items[0];
        assert_eq!(item.quantity.minimum(), Some(1.0));
        assert!(item.planned_restock);
    }

    #[test]
    fn test_negative_minimum_is_rejected() {
        let doc = parse("- [ ] Milk | 2 L | min: -3\n");
        assert_eq!(doc.items[0].quantity.minimum(), None);
    }

    #[test]
    fn test_uncategorized_heading_normalizes_to_empty() {
        let doc = parse("## uncategorized\n- [ ] Twine | 1 pcs\n");
        assert_eq!(doc.items[0].category, "");
    }

    #[test]
    fn test_uncategorized_renders_last() {
        let items = vec![
            ItemRecord::new("Twine", "", Quantity::measured(MeasureKind::Count, 1.0, "pcs")),
            ItemRecord::new("Milk", "Dairy", Quantity::measured(MeasureKind::Volume, 2.0, "L")),
            ItemRecord::new("Rice", "Pantry", Quantity::measured(MeasureKind::Weight, 1.0, "kg")),
        ];
        let text = serialize(1, &items);

        let dairy = text.find("## Dairy").unwrap();
        let pantry = text.find("## Pantry").unwrap();
        let uncat = text.find("## Uncategorized").unwrap();
        assert!(dairy < pantry);
        assert!(pantry < uncat);
    }

    #[test]
    fn test_malformed_metadata_falls_back_to_defaults() {
        let doc = parse("---\nversion: banana\nlastUpdated: soon\n---\n");
        assert_eq!(doc.version, 1);
        assert_eq!(doc.last_updated, Local::now().date_naive());
    }

    #[test]
    fn test_empty_text_parses_to_empty_inventory() {
        let doc = parse("");
        assert_eq!(doc.version, 1);
        assert!(doc.items.is_empty());
    }

    #[test]
    fn test_restock_token_round_trips() {
        let mut item = ItemRecord::new("Milk", "Dairy", Quantity::measured(MeasureKind::Volume, 2.0, "L"));
        item.planned_restock = true;
        let reparsed = parse(&serialize(1, &[item]));
        assert!(reparsed.items[0].planned_restock);
    }

    #[test]
    fn test_empty_unit_round_trips_as_portion() {
        let item = ItemRecord::new("Dough", "", Quantity::measured(MeasureKind::Portion, 1.5, ""));
        let reparsed = parse(&serialize(1, &[item.clone()]));
        assert_eq!(reparsed.items[0].quantity, item.quantity);
    }

    #[test]
    fn test_marker_value_extraction() {
        assert_eq!(
            marker_value(EXAMPLE, MARKER_KEY).as_deref(),
            Some(MARKER_VALUE)
        );
        assert_eq!(marker_value(EXAMPLE, "missing"), None);
        assert_eq!(marker_value("no metadata here", MARKER_KEY), None);
        // Keys after the block closes are not marker values.
        assert_eq!(
            marker_value("---\n---\nstoker-plugin: inventory\n", MARKER_KEY),
            None
        );
    }

    #[test]
    fn test_version_is_preserved_across_rewrites() {
        let doc = parse("---\nversion: 7\n---\n\n## Dairy\n- [ ] Milk | 2 L\n");
        assert_eq!(doc.version, 7);
        let reparsed = parse(&serialize(doc.version, &doc.items));
        assert_eq!(reparsed.version, 7);
    }
}
