// SPDX-License-Identifier: MIT

//! `es crons` — inspect and manually trigger configured cron schedules.

use anyhow::Result;
use clap::Subcommand;
use es_wire::{Query, Response};

use crate::output::{handle_list, OutputFormat};
use crate::table::{Column, Table};

#[derive(Subcommand)]
pub enum CronsCommand {
    /// List configured cron expressions
    List,
    /// Trigger the scheduled handler for a cron expression once
    Trigger { cron: String },
}

pub async fn handle(command: CronsCommand, _format: OutputFormat) -> Result<()> {
    let mut client = super::connect().await?;
    match command {
        CronsCommand::List => {
            let response = client.query(Query::ListCrons).await?;
            let Response::Crons { crons } = response else {
                anyhow::bail!("unexpected response to ListCrons");
            };
            handle_list(_format, &crons, "No cron triggers configured.", |items, out| {
                let mut table = Table::new(vec![Column::left("EXPRESSION"), Column::muted("LAST FIRED AT")]);
                for cron in items {
                    table.row(vec![
                        cron.expression.clone(),
                        cron.last_fired_at.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string()),
                    ]);
                }
                table.render(out);
            })
        }
        CronsCommand::Trigger { cron } => {
            let invoked = client.trigger_scheduled(&cron).await?;
            if invoked {
                println!("Triggered scheduled handler for '{cron}'");
            } else {
                println!("Scheduled handler for '{cron}' failed; see daemon logs");
            }
            Ok(())
        }
    }
}
