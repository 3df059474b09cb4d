//! `confsync apply` — write configuration objects to their destinations.

use anyhow::{bail, Context as _, Result};
use clap::Args;
use colored::Colorize;

use crate::commands::Context;

/// Arguments for `confsync apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Key of the configuration object to apply (omit when using `--all`).
    pub key: Option<String>,

    /// Apply every configured object once.
    #[arg(long, conflicts_with_all = ["key", "poll"])]
    pub all: bool,

    /// Keep polling the source, rewriting the destination on every update.
    #[arg(short, long)]
    pub poll: bool,
}

impl ApplyArgs {
    pub async fn run(self, ctx: &Context) -> Result<()> {
        if self.all {
            return apply_all(ctx).await;
        }

        let key = self.key.context("provide an object key or use `--all`")?;
        let controller = ctx.controller(&key).await?;

        if self.poll {
            controller
                .sync()
                .await
                .with_context(|| format!("sync loop for '{key}' failed"))?;
        } else {
            controller
                .apply()
                .await
                .with_context(|| format!("apply failed for '{key}'"))?;
            println!("{} '{key}' applied", "✓".green());
        }
        Ok(())
    }
}

async fn apply_all(ctx: &Context) -> Result<()> {
    let controllers = ctx.all_controllers().await?;
    if controllers.is_empty() {
        println!("No objects configured.");
        return Ok(());
    }

    let outcomes = confsync_agent::apply_all(controllers).await;
    let mut failures = 0usize;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(()) => println!("{} '{}' applied", "✓".green(), outcome.key),
            Err(err) => {
                failures += 1;
                println!("{} '{}' failed: {err}", "✗".red(), outcome.key);
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} objects failed", outcomes.len());
    }
    Ok(())
}
