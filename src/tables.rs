use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{ledger::Ledger, quantity::energy::KilowattHours};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

pub fn build_totals_table(ledger: &Ledger) -> Table {
    let totals = &ledger.totals;
    let mut table = new_table();
    table.set_header(vec!["Period", "Key", "Total"]);
    table.add_row(vec![
        Cell::new("Today"),
        Cell::new(totals.day_date.map_or_else(|| "-".to_string(), |date| date.to_string()))
            .add_attribute(Attribute::Dim),
        Cell::new(totals.day).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Month"),
        Cell::new(totals.month_key.map_or_else(|| "-".to_string(), |month| month.to_string()))
            .add_attribute(Attribute::Dim),
        Cell::new(totals.month).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Lifetime"),
        Cell::new(
            ledger
                .cursor
                .last_processed_at()
                .map_or_else(|| "-".to_string(), |timestamp| timestamp.to_string()),
        )
        .add_attribute(Attribute::Dim),
        Cell::new(totals.lifetime).set_alignment(CellAlignment::Right),
    ]);
    table
}

pub fn build_history_table(ledger: &Ledger) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Date", "Total", "CO₂", "Trees", "Households"]);
    for entry in ledger.history.to_sorted_vec() {
        table.add_row(vec![
            Cell::new(entry.date.format("%a %b %d")),
            Cell::new(entry.total).set_alignment(CellAlignment::Right).fg(
                if entry.total > KilowattHours::ZERO { Color::Green } else { Color::Red },
            ),
            Cell::new(format!("{:.1} kg", entry.environmental.co2_avoided_kg))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}", entry.environmental.trees_planted))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", entry.environmental.households_powered))
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
        ]);
    }
    table
}
