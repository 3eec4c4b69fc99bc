// SPDX-License-Identifier: MIT

//! `es queues` — inspect queue message state.

use anyhow::Result;
use clap::Subcommand;
use es_wire::{Query, Response};

use crate::output::{handle_list, OutputFormat};
use crate::table::{Column, Table};

#[derive(Subcommand)]
pub enum QueuesCommand {
    /// List messages on a queue
    Messages {
        queue: String,
        /// Filter by status: pending, acked, failed
        #[arg(long)]
        status: Option<String>,
    },
}

pub async fn handle(command: QueuesCommand, format: OutputFormat) -> Result<()> {
    let mut client = super::connect().await?;
    match command {
        QueuesCommand::Messages { queue, status } => {
            let response = client.query(Query::ListQueueMessages { queue, status }).await?;
            let Response::QueueMessages { messages } = response else {
                anyhow::bail!("unexpected response to ListQueueMessages");
            };
            handle_list(format, &messages, "No messages found.", |items, out| {
                let mut table = Table::new(vec![
                    Column::muted("ID"),
                    Column::status("STATUS"),
                    Column::left("ATTEMPTS"),
                    Column::left("VISIBLE AT"),
                    Column::left("CREATED AT"),
                ]);
                for message in items {
                    table.row(vec![
                        message.id.clone(),
                        message.status.clone(),
                        message.attempts.to_string(),
                        message.visible_at.to_string(),
                        message.created_at.to_string(),
                    ]);
                }
                table.render(out);
            })
        }
    }
}
