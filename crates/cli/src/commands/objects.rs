// SPDX-License-Identifier: MIT

//! `es r2` — inspect object-store bucket contents.

use anyhow::Result;
use clap::Subcommand;
use es_wire::{Query, Response};

use crate::output::{format_or_json, handle_list, OutputFormat};
use crate::table::{Column, Table};

#[derive(Subcommand)]
pub enum ObjectsCommand {
    /// List objects in a bucket
    List {
        bucket: String,
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Get a single object's metadata
    Get { bucket: String, key: String },
}

pub async fn handle(command: ObjectsCommand, format: OutputFormat) -> Result<()> {
    let mut client = super::connect().await?;
    match command {
        ObjectsCommand::List { bucket, prefix } => {
            let response = client.query(Query::ListObjectEntries { bucket, prefix }).await?;
            let Response::ObjectEntries { entries } = response else {
                anyhow::bail!("unexpected response to ListObjectEntries");
            };
            handle_list(format, &entries, "No objects found.", |items, out| {
                let mut table = Table::new(vec![
                    Column::left("KEY"),
                    Column::left("SIZE"),
                    Column::muted("ETAG"),
                    Column::status("CLASS"),
                ]);
                for entry in items {
                    table.row(vec![
                        entry.key.clone(),
                        format!("{}B", entry.size),
                        entry.etag.clone(),
                        entry.storage_class.clone(),
                    ]);
                }
                table.render(out);
            })
        }
        ObjectsCommand::Get { bucket, key } => {
            let response = client.query(Query::GetObjectEntry { bucket, key: key.clone() }).await?;
            let Response::ObjectEntry { entry } = response else {
                anyhow::bail!("unexpected response to GetObjectEntry");
            };
            match entry {
                None => {
                    println!("Object not found: {key}");
                    Ok(())
                }
                Some(entry) => format_or_json(format, &entry, || {
                    println!("key: {}", entry.key);
                    println!("size: {}B", entry.size);
                    println!("etag: {}", entry.etag);
                    println!("version: {}", entry.version);
                    println!("storage class: {}", entry.storage_class);
                }),
            }
        }
    }
}
