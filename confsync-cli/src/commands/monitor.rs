//! `confsync monitor` — poll every configured object and write on updates.
//!
//! This is the long-running service entry point; a supervising init system
//! receives a readiness signal once each loop has applied its first value.

use anyhow::Result;
use clap::Args;

use crate::commands::Context;

/// Arguments for `confsync monitor`.
#[derive(Args, Debug)]
pub struct MonitorArgs {}

impl MonitorArgs {
    pub async fn run(self, ctx: Context) -> Result<()> {
        let controllers = ctx.all_controllers().await?;
        if controllers.is_empty() {
            println!("No objects configured; nothing to monitor.");
            return Ok(());
        }

        confsync_agent::monitor_all(controllers).await?;
        Ok(())
    }
}
