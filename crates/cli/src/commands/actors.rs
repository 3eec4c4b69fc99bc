// SPDX-License-Identifier: MIT

//! `es actors` — inspect Durable Object instances, their storage, and alarms.

use anyhow::Result;
use clap::Subcommand;
use es_wire::{Query, Response};

use crate::output::{format_or_json, handle_list, OutputFormat};
use crate::table::{Column, Table};

#[derive(Subcommand)]
pub enum ActorsCommand {
    /// List known actor instances
    List {
        /// Only list instances of this class
        #[arg(long)]
        class: Option<String>,
    },
    /// Get a single actor instance
    Get { class: String, id: String },
    /// List an instance's storage entries
    Storage { class: String, id: String },
    /// List all scheduled alarms across instances
    Alarms,
}

pub async fn handle(command: ActorsCommand, format: OutputFormat) -> Result<()> {
    let mut client = super::connect().await?;
    match command {
        ActorsCommand::List { class } => {
            let response = client.query(Query::ListActors { class }).await?;
            let Response::Actors { actors } = response else {
                anyhow::bail!("unexpected response to ListActors");
            };
            handle_list(format, &actors, "No actor instances found.", |items, out| {
                let mut table = Table::new(vec![
                    Column::left("CLASS"),
                    Column::muted("ID"),
                    Column::left("NAME"),
                    Column::status("RESIDENT"),
                ]);
                for actor in items {
                    table.row(vec![
                        actor.class.clone(),
                        actor.id.clone(),
                        actor.name.clone().unwrap_or_else(|| "-".to_string()),
                        actor.resident.to_string(),
                    ]);
                }
                table.render(out);
            })
        }
        ActorsCommand::Get { class, id } => {
            let response = client.query(Query::GetActor { class, id: id.clone() }).await?;
            let Response::Actor { actor } = response else {
                anyhow::bail!("unexpected response to GetActor");
            };
            match actor {
                None => {
                    println!("Actor not found: {id}");
                    Ok(())
                }
                Some(actor) => format_or_json(format, &actor, || {
                    println!("class: {}", actor.class);
                    println!("id: {}", actor.id);
                    println!("name: {}", actor.name.as_deref().unwrap_or("-"));
                    println!("resident: {}", actor.resident);
                }),
            }
        }
        ActorsCommand::Storage { class, id } => {
            let response = client.query(Query::ListActorStorage { class, id }).await?;
            let Response::ActorStorageEntries { entries } = response else {
                anyhow::bail!("unexpected response to ListActorStorage");
            };
            handle_list(format, &entries, "No storage entries found.", |items, out| {
                let mut table = Table::new(vec![Column::left("KEY"), Column::left("VALUE")]);
                for entry in items {
                    table.row(vec![entry.key.clone(), entry.value.to_string()]);
                }
                table.render(out);
            })
        }
        ActorsCommand::Alarms => {
            let response = client.query(Query::ListActorAlarms).await?;
            let Response::ActorAlarms { alarms } = response else {
                anyhow::bail!("unexpected response to ListActorAlarms");
            };
            handle_list(format, &alarms, "No alarms scheduled.", |items, out| {
                let mut table =
                    Table::new(vec![Column::left("CLASS"), Column::muted("ID"), Column::left("ALARM TIME")]);
                for alarm in items {
                    table.row(vec![alarm.class.clone(), alarm.id.clone(), alarm.alarm_time.to_string()]);
                }
                table.render(out);
            })
        }
    }
}
