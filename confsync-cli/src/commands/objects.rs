//! `confsync objects` — list the configured objects.

use anyhow::Result;
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use confsync_core::ObjectSpec;

use crate::commands::Context;

/// Arguments for `confsync objects`.
#[derive(Args, Debug)]
pub struct ObjectsArgs {}

#[derive(Tabled)]
struct ObjectRow {
    #[tabled(rename = "key")]
    key: String,
    #[tabled(rename = "backend")]
    backend: String,
    #[tabled(rename = "format")]
    format: String,
    #[tabled(rename = "destination")]
    destination: String,
    #[tabled(rename = "hooks")]
    hooks: String,
}

impl ObjectsArgs {
    pub fn run(self, ctx: &Context) -> Result<()> {
        let specs = ctx.settings.object_specs()?;
        if specs.is_empty() {
            println!("No objects configured.");
            return Ok(());
        }

        let rows: Vec<ObjectRow> = specs.iter().map(row_for).collect();
        let mut table = Table::new(rows);
        table.with(Style::sharp());
        println!("{table}");
        Ok(())
    }
}

fn row_for(spec: &ObjectSpec) -> ObjectRow {
    let hooks = if spec.hooks.is_empty() {
        "-".to_string()
    } else {
        spec.hooks
            .iter()
            .map(|h| h.0.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    ObjectRow {
        key: spec.key.to_string(),
        backend: spec.source.backend.to_string(),
        format: spec.source.format.to_string(),
        destination: spec.dest.to_string(),
        hooks,
    }
}
