// SPDX-License-Identifier: MIT

//! `es status` — cross-binding status overview.

use anyhow::Result;
use es_wire::{Query, Response};

use crate::output::OutputFormat;

pub async fn handle(format: OutputFormat) -> Result<()> {
    let mut client = match super::connect().await {
        Ok(client) => client,
        Err(_) => {
            println!("Daemon is not running");
            return Ok(());
        }
    };

    let response = client.query(Query::StatusOverview).await?;
    let Response::StatusOverview(overview) = response else {
        anyhow::bail!("unexpected response to StatusOverview");
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&overview)?);
        }
        OutputFormat::Text => {
            println!("uptime: {}s", overview.uptime_secs);

            if overview.namespaces.is_empty() {
                println!("actors: none resident");
            } else {
                println!("actors:");
                for ns in &overview.namespaces {
                    println!("  {} — {} resident", ns.class, ns.resident_count);
                }
            }

            if overview.queues.is_empty() {
                println!("queues: none configured");
            } else {
                println!("queues:");
                for queue in &overview.queues {
                    println!("  {} — pending={} failed={}", queue.queue, queue.pending, queue.failed);
                }
            }

            if overview.crons.is_empty() {
                println!("crons: none configured");
            } else {
                println!("crons:");
                for cron in &overview.crons {
                    println!("  {}", cron.expression);
                }
            }
        }
    }

    Ok(())
}
