use anyhow::{bail, Context, Result};
use colored::Colorize;
use comfy_table::{Cell, Table};
use dialoguer::Select;

use crate::cli::StatementArgs;
use crate::error::ImportError;
use crate::fmt::{amount, plural};
use crate::mapping::{parse_override, ALL_FIELDS};
use crate::recent::{RecentItems, RecentKind, RecentStorage};
use crate::settings::Settings;
use crate::table::ParsedTable;
use crate::wizard::Wizard;

/// Read a statement from disk and push it through the upload step.
pub fn load(wizard: &mut Wizard, path: &std::path::Path) -> Result<()> {
    let data = std::fs::read(path).with_context(|| format!("Could not read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    wizard.load_file(&name, None, &data)?;
    Ok(())
}

pub fn apply_overrides(wizard: &mut Wizard, overrides: &[String]) -> Result<()> {
    for raw in overrides {
        let (field, header) = parse_override(raw)?;
        wizard.map_field(field, header.as_deref())?;
    }
    Ok(())
}

/// Let the operator pick a column for each field.
fn prompt_mapping(wizard: &mut Wizard) -> Result<()> {
    let Some(file) = wizard.file() else {
        return Ok(());
    };
    let headers = file.table.headers().to_vec();
    let mut choices = vec!["(not mapped)".to_string()];
    choices.extend(headers.iter().cloned());

    for field in ALL_FIELDS {
        let current = wizard
            .mapping()
            .get(*field)
            .and_then(|h| headers.iter().position(|x| x == h))
            .map_or(0, |i| i + 1);
        let marker = if field.is_required() { " (required)" } else { "" };
        let picked = Select::new()
            .with_prompt(format!("{}{marker}", field.label()))
            .items(&choices)
            .default(current)
            .interact()?;
        let header = (picked > 0).then(|| headers[picked - 1].as_str());
        wizard.map_field(*field, header)?;
    }
    Ok(())
}

/// Upload, map, and advance to preview. Validation problems are printed one
/// per line before failing.
pub fn prepare<S: RecentStorage>(
    args: &StatementArgs,
    settings: &Settings,
    recent: &RecentItems<S>,
) -> Result<Wizard> {
    let mut wizard = Wizard::new(args.date_order.unwrap_or(settings.date_order));
    load(&mut wizard, &args.file)?;
    if let Some(file) = wizard.file() {
        print_dropped(&file.table);
    }
    apply_overrides(&mut wizard, &args.map)?;
    if args.interactive {
        prompt_mapping(&mut wizard)?;
    }

    let card = match &args.card {
        Some(card) => Some(card.clone()),
        None => recent.most_recent(RecentKind::Card).map(|item| {
            println!("Using most recent card: {}", item.label.bold());
            item.key.clone()
        }),
    };
    if let Some(card) = card {
        wizard.select_card(&card)?;
    }
    wizard.set_period(args.period_start, args.period_end)?;

    advance(&mut wizard)?;
    Ok(wizard)
}

/// Step back from preview, pick the columns again, and re-run the preview.
pub fn remap(wizard: &mut Wizard) -> Result<()> {
    wizard.back()?;
    prompt_mapping(wizard)?;
    advance(wizard)
}

fn advance(wizard: &mut Wizard) -> Result<()> {
    match wizard.advance_to_preview() {
        Ok(_) => Ok(()),
        Err(ImportError::Validation(issues)) => {
            println!("{}", "Not ready to preview:".red().bold());
            for issue in &issues {
                println!("  {} {issue}", "\u{2717}".red());
            }
            bail!("{} to fix", plural(issues.len(), "problem"));
        }
        Err(e) => Err(e.into()),
    }
}

pub fn print_dropped(table: &ParsedTable) {
    let dropped = table.dropped();
    if dropped.is_empty() {
        return;
    }
    let expected = table.headers().len();
    println!(
        "{}",
        format!(
            "Skipped {} with the wrong number of columns (expected {expected}):",
            plural(dropped.len(), "line")
        )
        .yellow()
    );
    for d in dropped {
        println!("  Line {}: {}", d.line, plural(d.fields, "field"));
    }
}

pub fn print_preview(wizard: &Wizard, settings: &Settings, max_rows: usize) -> Result<()> {
    let rows = wizard.preview()?;
    let summary = rows.summary();

    let mut table = Table::new();
    table.set_header(vec!["Date", "Amount", "Merchant", "Description", "Reference"]);
    for txn in rows.transactions.iter().take(max_rows) {
        let amt = if txn.amount < 0.0 {
            amount(txn.amount).red().to_string()
        } else {
            amount(txn.amount).green().to_string()
        };
        table.add_row(vec![
            Cell::new(&txn.transaction_date),
            Cell::new(amt),
            Cell::new(txn.merchant_name.as_deref().unwrap_or("")),
            Cell::new(txn.description.as_deref().unwrap_or("")),
            Cell::new(txn.transaction_reference.as_deref().unwrap_or("")),
        ]);
    }
    if !rows.transactions.is_empty() {
        println!("{table}");
        if rows.transactions.len() > max_rows {
            println!("  ... and {} more", rows.transactions.len() - max_rows);
        }
    }

    if !rows.errors.is_empty() {
        println!();
        println!("{}", format!("{} could not be read:", plural(summary.rejected, "row")).yellow().bold());
        for err in rows.errors.iter().take(settings.error_display_limit) {
            println!("  Row {}: {}", err.row_number, err.message);
        }
        if rows.errors.len() > settings.error_display_limit {
            println!("  ... and {} more", rows.errors.len() - settings.error_display_limit);
        }
    }

    println!();
    let ready = format!("{} ready to import", plural(summary.ready, "transaction"));
    if summary.ready > 0 {
        println!("{}", ready.green().bold());
    } else {
        println!("{}", ready.red().bold());
    }
    if let (Some(first), Some(last)) = (&summary.first_date, &summary.last_date) {
        println!("Dates:    {first} to {last}");
    }
    println!(
        "Total:    {}  (debits {}, credits {})",
        amount(summary.total),
        amount(summary.debits),
        amount(summary.credits)
    );
    Ok(())
}
