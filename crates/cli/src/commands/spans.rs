// SPDX-License-Identifier: MIT

//! `es spans` — inspect recorded tracing spans.

use anyhow::Result;
use clap::Subcommand;
use es_wire::{Query, Response};

use crate::output::{handle_list, OutputFormat};
use crate::table::{Column, Table};

#[derive(Subcommand)]
pub enum SpansCommand {
    /// List recorded spans
    List {
        /// Only list spans belonging to this trace
        #[arg(long)]
        trace: Option<String>,
    },
    /// List a span's recorded events
    Events { span_id: String },
}

pub async fn handle(command: SpansCommand, format: OutputFormat) -> Result<()> {
    let mut client = super::connect().await?;
    match command {
        SpansCommand::List { trace } => {
            let response = client.query(Query::ListSpans { trace_id: trace }).await?;
            let Response::Spans { spans } = response else {
                anyhow::bail!("unexpected response to ListSpans");
            };
            handle_list(format, &spans, "No spans recorded.", |items, out| {
                let mut table = Table::new(vec![
                    Column::muted("SPAN ID"),
                    Column::left("NAME"),
                    Column::left("KIND"),
                    Column::status("STATUS"),
                    Column::left("START TIME"),
                ]);
                for span in items {
                    table.row(vec![
                        span.span_id.clone(),
                        span.name.clone(),
                        span.kind.clone(),
                        span.status.clone(),
                        span.start_time.to_string(),
                    ]);
                }
                table.render(out);
            })
        }
        SpansCommand::Events { span_id } => {
            let response = client.query(Query::ListSpanEvents { span_id }).await?;
            let Response::SpanEvents { events } = response else {
                anyhow::bail!("unexpected response to ListSpanEvents");
            };
            handle_list(format, &events, "No span events recorded.", |items, out| {
                let mut table = Table::new(vec![Column::left("NAME"), Column::left("TIME")]);
                for event in items {
                    table.row(vec![event.name.clone(), event.time.to_string()]);
                }
                table.render(out);
            })
        }
    }
}
