// SPDX-License-Identifier: MIT

//! `es cache` — inspect HTTP response cache contents.

use anyhow::Result;
use clap::Subcommand;
use es_wire::{Query, Response};

use crate::output::{handle_list, OutputFormat};
use crate::table::{Column, Table};

#[derive(Subcommand)]
pub enum CacheCommand {
    /// List cached responses in a named cache
    List { cache_name: String },
}

pub async fn handle(command: CacheCommand, format: OutputFormat) -> Result<()> {
    let mut client = super::connect().await?;
    match command {
        CacheCommand::List { cache_name } => {
            let response = client.query(Query::ListCacheEntries { cache_name }).await?;
            let Response::CacheEntries { entries } = response else {
                anyhow::bail!("unexpected response to ListCacheEntries");
            };
            handle_list(format, &entries, "No cached responses found.", |items, out| {
                let mut table = Table::new(vec![
                    Column::left("URL").with_max(60),
                    Column::status("STATUS"),
                    Column::left("SIZE"),
                    Column::muted("EXPIRES AT"),
                ]);
                for entry in items {
                    table.row(vec![
                        entry.url.clone(),
                        entry.status.to_string(),
                        format!("{}B", entry.size),
                        entry.expires_at.map(|e| e.to_string()).unwrap_or_else(|| "-".to_string()),
                    ]);
                }
                table.render(out);
            })
        }
    }
}
