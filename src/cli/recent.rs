use anyhow::Result;
use chrono::Local;
use comfy_table::{Cell, Table};

use crate::recent::{JsonFileStorage, RecentItems, RecentKind};
use crate::settings::{load_settings, recent_path};

pub fn run(clear: bool) -> Result<()> {
    let settings = load_settings();
    let mut recent = RecentItems::load(JsonFileStorage::new(recent_path()), settings.recent_limit)?;

    if clear {
        recent.clear()?;
        println!("Recent list cleared.");
        return Ok(());
    }
    if recent.is_empty() {
        println!("Nothing imported yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Kind", "Item", "Last used"]);
    for item in recent.items() {
        let kind = match item.kind {
            RecentKind::Card => "card",
            RecentKind::Statement => "statement",
        };
        table.add_row(vec![
            Cell::new(kind),
            Cell::new(&item.label),
            Cell::new(item.used_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")),
        ]);
    }
    println!("Recent ({} of {})\n{table}", recent.len(), settings.recent_limit);
    Ok(())
}
