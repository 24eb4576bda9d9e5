use anyhow::{bail, Result};
use colored::Colorize;
use dialoguer::{Confirm, Select};
use zeroize::Zeroizing;

use crate::cli::statement::{self, prepare, print_preview};
use crate::cli::StatementArgs;
use crate::fmt::plural;
use crate::recent::{JsonFileStorage, MemoryStorage, RecentItems, RecentKind, RecentStorage};
use crate::settings::{load_settings, recent_path, Settings};
use crate::submit::HttpSubmitter;
use crate::wizard::WizardStep;

pub fn run(args: &StatementArgs, yes: bool, prompt_token: bool, no_history: bool) -> Result<()> {
    let settings = load_settings();
    if no_history {
        let recent = RecentItems::load(MemoryStorage::default(), settings.recent_limit)?;
        import(args, &settings, recent, yes, prompt_token)
    } else {
        let recent = RecentItems::load(JsonFileStorage::new(recent_path()), settings.recent_limit)?;
        import(args, &settings, recent, yes, prompt_token)
    }
}

fn import<S: RecentStorage>(
    args: &StatementArgs,
    settings: &Settings,
    mut recent: RecentItems<S>,
    yes: bool,
    prompt_token: bool,
) -> Result<()> {
    let mut wizard = prepare(args, settings, &recent)?;
    print_preview(&wizard, settings, args.rows)?;

    if !wizard.can_submit() {
        bail!("No valid transactions to import");
    }

    let fingerprint = wizard.file().map(|f| f.fingerprint.clone()).unwrap_or_default();
    if let Some(previous) = recent.find(RecentKind::Statement, &fingerprint) {
        println!(
            "{}",
            format!(
                "This file was already imported on {} ({}).",
                previous.used_at.format("%Y-%m-%d %H:%M"),
                previous.label
            )
            .yellow()
        );
    }

    while !yes {
        let count = wizard.summary().map_or(0, |s| s.ready);
        let confirmed = Confirm::new()
            .with_prompt(format!("Import {}?", plural(count, "transaction")))
            .default(false)
            .interact()?;
        if confirmed {
            break;
        }
        let change_mapping = args.interactive
            && Select::new()
                .with_prompt("What next?")
                .items(&["Change column mapping", "Cancel import"])
                .default(1)
                .interact()?
                == 0;
        if !change_mapping {
            println!("Import cancelled.");
            return Ok(());
        }
        statement::remap(&mut wizard)?;
        print_preview(&wizard, settings, args.rows)?;
        if !wizard.can_submit() {
            bail!("No valid transactions to import");
        }
    }

    let token = if prompt_token {
        Some(Zeroizing::new(rpassword::prompt_password("API token: ")?))
    } else {
        settings.api_token()
    };
    let submitter = HttpSubmitter::new(
        &settings.api_base_url(),
        &settings.import_path,
        token,
        settings.timeout(),
        settings.use_system_proxy,
    )?;
    tracing::info!(url = submitter.url(), "sending statement");

    let receipt = match wizard.submit(&submitter) {
        Ok(receipt) => receipt,
        Err(e) => {
            if let WizardStep::ImportFailed { message } = wizard.step() {
                println!("{}", format!("Import failed: {message}").red().bold());
                println!("Nothing was imported. Fix the problem and run the import again.");
            }
            return Err(e.into());
        }
    };

    tracing::info!(status = receipt.status, statement = ?receipt.statement_id, "statement accepted");
    let imported = receipt
        .imported
        .map(|n| n as usize)
        .or_else(|| wizard.summary().map(|s| s.ready))
        .unwrap_or(0);
    println!("{}", format!("Imported {}.", plural(imported, "transaction")).green().bold());
    if let Some(id) = &receipt.statement_id {
        println!("Statement: {id}");
    }
    if let Some(message) = &receipt.message {
        println!("{message}");
    }

    if let (Some(card), Some(file)) = (wizard.card_id(), wizard.file()) {
        let period = match (args.period_start, args.period_end) {
            (Some(start), Some(end)) => format!("{start} to {end}"),
            _ => String::new(),
        };
        let label = format!("{} \u{2192} {card} ({period})", file.name);
        recent.touch(RecentKind::Card, card, card)?;
        recent.touch(RecentKind::Statement, &file.fingerprint, &label)?;
    }
    Ok(())
}
