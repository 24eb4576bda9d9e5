use anyhow::Result;

use crate::cli::statement::{prepare, print_preview};
use crate::cli::StatementArgs;
use crate::recent::{JsonFileStorage, MemoryStorage, RecentItems, RecentStorage};
use crate::settings::{load_settings, recent_path, Settings};

pub fn run(args: &StatementArgs, no_history: bool) -> Result<()> {
    let settings = load_settings();
    if no_history {
        let recent = RecentItems::load(MemoryStorage::default(), settings.recent_limit)?;
        show(args, &settings, &recent)
    } else {
        let recent = RecentItems::load(JsonFileStorage::new(recent_path()), settings.recent_limit)?;
        show(args, &settings, &recent)
    }
}

fn show<S: RecentStorage>(args: &StatementArgs, settings: &Settings, recent: &RecentItems<S>) -> Result<()> {
    let wizard = prepare(args, settings, recent)?;
    print_preview(&wizard, settings, args.rows)
}
