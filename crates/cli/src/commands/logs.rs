// SPDX-License-Identifier: MIT

//! `es ai-proxy` / `es email` / `es analytics` — inspection-only log tables
//! (spec §3's inspection rows): no proxied functionality lives here, just
//! the recorded-call history.

use anyhow::Result;
use clap::Subcommand;
use es_wire::{Query, Response};

use crate::output::{handle_list, OutputFormat};
use crate::table::{Column, Table};

#[derive(Subcommand)]
pub enum AiProxyCommand {
    /// List recorded AI proxy calls
    List,
}

pub async fn handle_ai_proxy(command: AiProxyCommand, format: OutputFormat) -> Result<()> {
    let mut client = super::connect().await?;
    match command {
        AiProxyCommand::List => {
            let response = client.query(Query::ListAiProxyLogs).await?;
            let Response::AiProxyLogs { logs } = response else {
                anyhow::bail!("unexpected response to ListAiProxyLogs");
            };
            handle_list(format, &logs, "No AI proxy calls recorded.", |items, out| {
                let mut table = Table::new(vec![
                    Column::muted("ID"),
                    Column::left("MODEL"),
                    Column::status("STATUS"),
                    Column::left("CREATED AT"),
                ]);
                for log in items {
                    table.row(vec![
                        log.id.clone(),
                        log.model.clone(),
                        log.status.clone(),
                        log.created_at.to_string(),
                    ]);
                }
                table.render(out);
            })
        }
    }
}

#[derive(Subcommand)]
pub enum EmailCommand {
    /// List recorded outbound email messages
    List,
}

pub async fn handle_email(command: EmailCommand, format: OutputFormat) -> Result<()> {
    let mut client = super::connect().await?;
    match command {
        EmailCommand::List => {
            let response = client.query(Query::ListEmailMessages).await?;
            let Response::EmailMessages { messages } = response else {
                anyhow::bail!("unexpected response to ListEmailMessages");
            };
            handle_list(format, &messages, "No email messages recorded.", |items, out| {
                let mut table = Table::new(vec![
                    Column::left("FROM"),
                    Column::left("TO"),
                    Column::left("SUBJECT").with_max(40),
                    Column::left("SIZE"),
                ]);
                for message in items {
                    table.row(vec![
                        message.from_addr.clone(),
                        message.to_addr.clone(),
                        message.subject.clone(),
                        format!("{}B", message.raw_size),
                    ]);
                }
                table.render(out);
            })
        }
    }
}

#[derive(Subcommand)]
pub enum AnalyticsCommand {
    /// List recorded analytics data points for a dataset
    List { dataset: String },
}

pub async fn handle_analytics(command: AnalyticsCommand, format: OutputFormat) -> Result<()> {
    let mut client = super::connect().await?;
    match command {
        AnalyticsCommand::List { dataset } => {
            let response = client.query(Query::ListAnalyticsDataPoints { dataset }).await?;
            let Response::AnalyticsDataPoints { points } = response else {
                anyhow::bail!("unexpected response to ListAnalyticsDataPoints");
            };
            handle_list(format, &points, "No analytics data points recorded.", |items, out| {
                let mut table = Table::new(vec![Column::left("DATASET"), Column::left("CREATED AT")]);
                for point in items {
                    table.row(vec![point.dataset.clone(), point.created_at.to_string()]);
                }
                table.render(out);
            })
        }
    }
}
