//! Preference command handlers

use anyhow::Context;

use crate::config::Config;
use crate::db::Store;
use crate::domain::{Locale, ResultLimit, UserId};
use crate::models::{Preferences, PreferencesPatch};
use crate::services::{PreferenceStore, SeaOrmPreferenceStore};

fn print_preferences(user: UserId, prefs: &Preferences) {
    println!("Preferences for user {user}");
    println!("{:-<40}", "");
    println!(
        "  Thumbnails: {}",
        if prefs.show_thumbnail { "on" } else { "off" }
    );
    println!("  Results:    {}", prefs.result_limit);
    println!(
        "  Locale:     {}",
        prefs.locale.as_ref().map_or("(none)", Locale::as_str)
    );
}

pub async fn cmd_prefs_show(config: &Config, user: i64) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let user = UserId::new(user);
    let prefs = SeaOrmPreferenceStore::new(store).get(user).await?;
    print_preferences(user, &prefs);
    Ok(())
}

pub async fn cmd_prefs_set(
    config: &Config,
    user: i64,
    thumbnails: Option<bool>,
    limit: Option<i64>,
    locale: Option<&str>,
) -> anyhow::Result<()> {
    let patch = PreferencesPatch {
        show_thumbnail: thumbnails,
        result_limit: limit.map(ResultLimit::new).transpose()?,
        locale: locale
            .map(|raw| match raw.trim() {
                "" | "none" => Ok(None),
                code => Locale::parse(code).map(Some),
            })
            .transpose()
            .context("Invalid --locale")?,
    };

    if patch.is_empty() {
        println!("Nothing to change. Use --thumbnails, --limit or --locale.");
        return Ok(());
    }

    let store = Store::new(&config.general.database_path).await?;
    let user = UserId::new(user);
    let prefs = SeaOrmPreferenceStore::new(store)
        .update(user, &patch)
        .await?;

    println!("✓ Preferences updated");
    print_preferences(user, &prefs);
    Ok(())
}
