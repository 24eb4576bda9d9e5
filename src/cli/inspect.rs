use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Table};

use crate::cli::statement::{apply_overrides, load, print_dropped};
use crate::settings::load_settings;
use crate::wizard::Wizard;

pub fn run(file: &Path, overrides: &[String]) -> Result<()> {
    let mut wizard = Wizard::new(load_settings().date_order);
    load(&mut wizard, file)?;
    apply_overrides(&mut wizard, overrides)?;
    let Some(uploaded) = wizard.file() else {
        return Ok(());
    };
    let table = &uploaded.table;

    let mut columns = Table::new();
    columns.set_header(vec!["#", "Column", "Sample", "Mapped to"]);
    for (i, header) in table.headers().iter().enumerate() {
        let mapped: Vec<&str> = wizard
            .mapping()
            .iter()
            .filter(|(_, h)| *h == header.as_str())
            .map(|(f, _)| f.key())
            .collect();
        columns.add_row(vec![
            Cell::new(i + 1),
            Cell::new(header),
            Cell::new(table.get(0, header).unwrap_or("")),
            Cell::new(mapped.join(", ")),
        ]);
    }
    println!("{} ({} data rows)\n{columns}", uploaded.name, table.len());
    if table.is_empty() {
        println!("The file has a header row but no data rows.");
    }
    print_dropped(table);

    if wizard.mapping().is_empty() {
        println!("No columns were recognised.");
    }
    if !wizard.mapping().is_complete() {
        let missing = wizard.mapping().missing_required();
        let names: Vec<&str> = missing.iter().map(|f| f.key()).collect();
        println!("Required fields not mapped: {}", names.join(", "));
        println!("Use --map field=Header to choose a column.");
    }
    Ok(())
}
