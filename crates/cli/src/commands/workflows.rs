// SPDX-License-Identifier: MIT

//! `es workflows` — inspect workflow instances, steps, and events.

use anyhow::Result;
use clap::Subcommand;
use es_wire::{Query, Response};

use crate::output::{format_or_json, handle_list, OutputFormat};
use crate::table::{Column, Table};

#[derive(Subcommand)]
pub enum WorkflowsCommand {
    /// List workflow instances
    List {
        /// Only list instances of this workflow
        #[arg(long)]
        workflow: Option<String>,
    },
    /// Get a single workflow instance
    Get { id: String },
    /// List a workflow instance's completed steps
    Steps { id: String },
    /// List a workflow instance's event log
    Events { id: String },
}

pub async fn handle(command: WorkflowsCommand, format: OutputFormat) -> Result<()> {
    let mut client = super::connect().await?;
    match command {
        WorkflowsCommand::List { workflow } => {
            let response =
                client.query(Query::ListWorkflowInstances { workflow_name: workflow }).await?;
            let Response::WorkflowInstances { instances } = response else {
                anyhow::bail!("unexpected response to ListWorkflowInstances");
            };
            handle_list(format, &instances, "No workflow instances found.", |items, out| {
                let mut table = Table::new(vec![
                    Column::left("WORKFLOW"),
                    Column::muted("ID"),
                    Column::status("STATUS"),
                    Column::left("UPDATED AT"),
                ]);
                for instance in items {
                    table.row(vec![
                        instance.workflow_name.clone(),
                        instance.id.clone(),
                        instance.status.clone(),
                        instance.updated_at.to_string(),
                    ]);
                }
                table.render(out);
            })
        }
        WorkflowsCommand::Get { id } => {
            let response = client.query(Query::GetWorkflowInstance { id: id.clone() }).await?;
            let Response::WorkflowInstance { instance } = response else {
                anyhow::bail!("unexpected response to GetWorkflowInstance");
            };
            match instance {
                None => {
                    println!("Workflow instance not found: {id}");
                    Ok(())
                }
                Some(instance) => format_or_json(format, &instance, || {
                    println!("workflow: {}", instance.workflow_name);
                    println!("id: {}", instance.id);
                    println!("status: {}", instance.status);
                    if let Some(error) = &instance.error {
                        println!("error: {error}");
                    }
                }),
            }
        }
        WorkflowsCommand::Steps { id } => {
            let response = client.query(Query::ListWorkflowSteps { instance_id: id }).await?;
            let Response::WorkflowSteps { steps } = response else {
                anyhow::bail!("unexpected response to ListWorkflowSteps");
            };
            handle_list(format, &steps, "No completed steps found.", |items, out| {
                let mut table = Table::new(vec![Column::left("STEP"), Column::left("COMPLETED AT")]);
                for step in items {
                    table.row(vec![step.step_name.clone(), step.completed_at.to_string()]);
                }
                table.render(out);
            })
        }
        WorkflowsCommand::Events { id } => {
            let response = client.query(Query::ListWorkflowEvents { instance_id: id }).await?;
            let Response::WorkflowEvents { events } = response else {
                anyhow::bail!("unexpected response to ListWorkflowEvents");
            };
            handle_list(format, &events, "No events recorded.", |items, out| {
                let mut table = Table::new(vec![Column::left("EVENT"), Column::left("CREATED AT")]);
                for event in items {
                    table.row(vec![event.event_type.clone(), event.created_at.to_string()]);
                }
                table.render(out);
            })
        }
    }
}
