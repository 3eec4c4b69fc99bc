// SPDX-License-Identifier: MIT

//! `es kv` — inspect key-value namespace contents.

use anyhow::Result;
use clap::Subcommand;
use es_wire::{Query, Response};

use crate::output::{format_or_json, handle_list, OutputFormat};
use crate::table::{Column, Table};

#[derive(Subcommand)]
pub enum KvCommand {
    /// List keys in a namespace
    List {
        namespace: String,
        /// Only list keys starting with this prefix
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Get a single key's value
    Get { namespace: String, key: String },
}

pub async fn handle(command: KvCommand, format: OutputFormat) -> Result<()> {
    let mut client = super::connect().await?;
    match command {
        KvCommand::List { namespace, prefix } => {
            let response = client.query(Query::ListKvEntries { namespace, prefix }).await?;
            let Response::KvEntries { entries } = response else {
                anyhow::bail!("unexpected response to ListKvEntries");
            };
            handle_list(format, &entries, "No keys found.", |items, out| {
                let mut table =
                    Table::new(vec![Column::left("KEY"), Column::left("SIZE"), Column::muted("EXPIRATION")]);
                for entry in items {
                    table.row(vec![
                        entry.key.clone(),
                        format!("{}B", entry.size),
                        entry.expiration.map(|e| e.to_string()).unwrap_or_else(|| "-".to_string()),
                    ]);
                }
                table.render(out);
            })
        }
        KvCommand::Get { namespace, key } => {
            let response = client.query(Query::GetKvEntry { namespace, key: key.clone() }).await?;
            let Response::KvEntry { entry } = response else {
                anyhow::bail!("unexpected response to GetKvEntry");
            };
            match entry {
                None => {
                    println!("Key not found: {key}");
                    Ok(())
                }
                Some(entry) => format_or_json(format, &entry, || {
                    println!("{}", String::from_utf8_lossy(&entry.value));
                }),
            }
        }
    }
}
