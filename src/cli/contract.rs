//! Contract CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use crate::domain::{
    BlueprintId, ContractDetail, ContractDraft, ContractFilter, ContractStatus, ValueInput,
};
use crate::engine::ContractEngine;
use crate::storage::Project;

#[derive(Subcommand)]
pub enum ContractCommands {
    /// Create a contract from a blueprint
    ///
    /// Example:
    ///   accord contract new "Acme NDA" --blueprint bp-7f2b4c1a9e --value fd-0a1b2c3d4e=Acme
    New {
        /// Contract name
        name: String,

        /// Blueprint ID
        #[arg(long, short)]
        blueprint: String,

        /// Field value as FIELD_ID=TEXT (repeatable)
        #[arg(long = "value", value_parser = parse_value_arg)]
        values: Vec<ValueInput>,
    },

    /// List contracts
    List {
        /// Only contracts in this status
        #[arg(long, short)]
        status: Option<ContractStatus>,

        /// Only contracts from this blueprint
        #[arg(long, short)]
        blueprint: Option<String>,
    },

    /// Show contract details, values and allowed next statuses
    Show {
        /// Contract ID
        id: String,
    },

    /// Move a contract to its next status
    Status {
        /// Contract ID
        id: String,

        /// Target status (APPROVED, SENT, SIGNED, LOCKED, REVOKED)
        status: ContractStatus,

        /// Reason recorded in the audit log
        #[arg(long, short)]
        reason: Option<String>,
    },

    /// Set field values on a contract
    Values {
        /// Contract ID
        id: String,

        /// Field value as FIELD_ID=TEXT (repeatable)
        #[arg(long = "value", value_parser = parse_value_arg, required = true)]
        values: Vec<ValueInput>,
    },

    /// Delete a contract that is not locked or revoked
    Delete {
        /// Contract ID
        id: String,
    },

    /// Show the status history of a contract
    Audit {
        /// Contract ID
        id: String,
    },
}

pub fn run(cmd: ContractCommands, output: &Output) -> Result<()> {
    match cmd {
        ContractCommands::New {
            name,
            blueprint,
            values,
        } => create_contract(output, name, blueprint, values),
        ContractCommands::List { status, blueprint } => {
            list_contracts(output, status, blueprint.as_deref())
        }
        ContractCommands::Show { id } => show_contract(output, &id),
        ContractCommands::Status { id, status, reason } => {
            update_status(output, &id, status, reason)
        }
        ContractCommands::Values { id, values } => update_values(output, &id, &values),
        ContractCommands::Delete { id } => delete_contract(output, &id),
        ContractCommands::Audit { id } => show_audit(output, &id),
    }
}

/// Parses `FIELD_ID=TEXT`; the text may be empty
pub fn parse_value_arg(raw: &str) -> Result<ValueInput, String> {
    let (field_id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("Invalid value '{}', expected FIELD_ID=TEXT", raw))?;

    if field_id.trim().is_empty() {
        return Err(format!("Invalid value '{}', field ID is empty", raw));
    }

    Ok(ValueInput::new(field_id.trim(), value))
}

fn create_contract(
    output: &Output,
    name: String,
    blueprint_id: String,
    values: Vec<ValueInput>,
) -> Result<()> {
    let project = Project::open_current()?;
    let mut db = project.database()?;

    let detail = ContractEngine::new(&mut db).create(ContractDraft {
        name,
        blueprint_id,
        values,
    })?;

    if output.is_json() {
        output.data(&detail);
    } else {
        output.success(&format!(
            "Created contract: {} - {} [{}]",
            detail.contract.id, detail.contract.name, detail.contract.status
        ));
    }

    Ok(())
}

fn list_contracts(
    output: &Output,
    status: Option<ContractStatus>,
    blueprint: Option<&str>,
) -> Result<()> {
    let project = Project::open_current()?;
    let mut db = project.database()?;

    // A malformed blueprint ID matches no contract
    let contracts = match blueprint.map(str::parse::<BlueprintId>).transpose() {
        Ok(blueprint_id) => {
            let filter = ContractFilter {
                status,
                blueprint_id,
            };
            ContractEngine::new(&mut db).list(&filter)?
        }
        Err(err) => {
            output.verbose_ctx("contract", &format!("Ignoring blueprint filter: {}", err));
            Vec::new()
        }
    };

    if output.is_json() {
        output.data(&contracts);
        return Ok(());
    }

    if contracts.is_empty() {
        output.success("No contracts found");
        return Ok(());
    }

    for item in &contracts {
        output.row(&[
            &item.contract.id.to_string(),
            item.contract.status.as_str(),
            &item.contract.name,
            &item.blueprint.name,
        ]);
    }

    Ok(())
}

fn show_contract(output: &Output, id: &str) -> Result<()> {
    let project = Project::open_current()?;
    let mut db = project.database()?;
    let detail = ContractEngine::new(&mut db).get(id)?;

    if output.is_json() {
        output.data(&detail);
    } else {
        print_contract(output, &detail);
    }

    Ok(())
}

fn print_contract(output: &Output, detail: &ContractDetail) {
    let contract = &detail.contract;

    println!("ID:        {}", contract.id);
    println!("Name:      {}", contract.name);
    println!("Blueprint: {} ({})", detail.blueprint.name, detail.blueprint.id);
    println!("Status:    {}", contract.status);
    println!("Updated:   {}", contract.updated_at.format("%Y-%m-%d %H:%M"));

    if detail.is_terminal {
        println!("Next:      none (terminal)");
    } else {
        let next: Vec<&str> = detail.allowed_actions.iter().map(|s| s.as_str()).collect();
        println!("Next:      {}", next.join(", "));
    }

    output.blank();
    println!("Values:");
    for field in &detail.blueprint.fields {
        let value = detail.value_of(&field.id).unwrap_or("");
        let marker = if field.required { "*" } else { "" };
        let label = format!("{}{}", field.label, marker);
        output.row(&["  ", &field.id.to_string(), &label, value]);
    }
}

fn update_status(
    output: &Output,
    id: &str,
    status: ContractStatus,
    reason: Option<String>,
) -> Result<()> {
    let project = Project::open_current()?;
    let mut db = project.database()?;

    output.verbose_ctx("contract", &format!("Requesting {} -> {}", id, status));
    let detail = ContractEngine::new(&mut db).update_status(id, status, reason)?;

    if output.is_json() {
        output.data(&detail);
    } else {
        output.success(&format!(
            "Contract {} is now {}",
            detail.contract.id, detail.contract.status
        ));
    }

    Ok(())
}

fn update_values(output: &Output, id: &str, values: &[ValueInput]) -> Result<()> {
    let project = Project::open_current()?;
    let mut db = project.database()?;
    let detail = ContractEngine::new(&mut db).update_values(id, values)?;

    if output.is_json() {
        output.data(&detail);
    } else {
        output.success(&format!(
            "Updated {} value(s) on contract {}",
            values.len(),
            detail.contract.id
        ));
    }

    Ok(())
}

fn delete_contract(output: &Output, id: &str) -> Result<()> {
    let project = Project::open_current()?;
    let mut db = project.database()?;
    ContractEngine::new(&mut db).delete(id)?;

    output.success(&format!("Deleted contract: {}", id));
    Ok(())
}

fn show_audit(output: &Output, id: &str) -> Result<()> {
    let project = Project::open_current()?;
    let mut db = project.database()?;
    let logs = ContractEngine::new(&mut db).audit_logs(id)?;

    if output.is_json() {
        output.data(&logs);
        return Ok(());
    }

    if logs.is_empty() {
        output.success("No status changes recorded");
        return Ok(());
    }

    for entry in &logs {
        let when = entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string();
        let change = format!("{} -> {}", entry.from_status, entry.to_status);
        output.row(&[&when, &change, entry.reason.as_deref().unwrap_or("")]);
    }

    Ok(())
}
