//! `confsync get` — print the rendered value of a configuration object.

use anyhow::Result;
use clap::Args;

use crate::commands::Context;

/// Arguments for `confsync get`.
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Key of the configuration object to retrieve.
    pub key: String,

    /// Keep polling the source, printing on every update.
    #[arg(short, long)]
    pub poll: bool,
}

impl GetArgs {
    pub async fn run(self, ctx: &Context) -> Result<()> {
        let controller = ctx.controller(&self.key).await?;
        let mut print = |text: &str| println!("{text}");

        if self.poll {
            controller.watch(&mut print).await?;
        } else {
            controller.get(&mut print).await?;
        }
        Ok(())
    }
}
