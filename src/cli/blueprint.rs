//! Blueprint CLI commands

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

use super::output::Output;
use crate::domain::{Blueprint, BlueprintDraft, BlueprintPatch, FieldSpec, FieldType};
use crate::engine::BlueprintService;
use crate::storage::Project;

#[derive(Subcommand)]
pub enum BlueprintCommands {
    /// Create a blueprint
    ///
    /// Examples:
    ///   accord blueprint new NDA --field TEXT:Company:required --field SIGNATURE:Signature@0,5
    ///   accord blueprint new NDA --fields-file nda-fields.json
    New {
        /// Blueprint name
        name: String,

        /// Optional description
        #[arg(long, short)]
        description: Option<String>,

        /// Field as TYPE:Label[:required][@x,y] (repeatable, in order)
        #[arg(long = "field", value_parser = parse_field_arg)]
        fields: Vec<FieldSpec>,

        /// JSON file holding an array of {type, label, positionX, positionY, required}
        #[arg(long, conflicts_with = "fields")]
        fields_file: Option<PathBuf>,
    },

    /// List blueprints
    List,

    /// Show blueprint details
    Show {
        /// Blueprint ID
        id: String,
    },

    /// Update a blueprint
    ///
    /// Supplying fields replaces the whole field list, which is only
    /// allowed while no contract uses the blueprint.
    Update {
        /// Blueprint ID
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New description
        #[arg(long, short)]
        description: Option<String>,

        /// Replacement field as TYPE:Label[:required][@x,y] (repeatable)
        #[arg(long = "field", value_parser = parse_field_arg)]
        fields: Vec<FieldSpec>,

        /// JSON file holding the replacement field list
        #[arg(long, conflicts_with = "fields")]
        fields_file: Option<PathBuf>,
    },

    /// Delete a blueprint that no contract uses
    Delete {
        /// Blueprint ID
        id: String,
    },
}

pub fn run(cmd: BlueprintCommands, output: &Output) -> Result<()> {
    match cmd {
        BlueprintCommands::New {
            name,
            description,
            fields,
            fields_file,
        } => {
            let fields = match fields_file {
                Some(path) => read_fields_file(&path)?,
                None => fields,
            };
            create_blueprint(output, name, description, fields)
        }
        BlueprintCommands::List => list_blueprints(output),
        BlueprintCommands::Show { id } => show_blueprint(output, &id),
        BlueprintCommands::Update {
            id,
            name,
            description,
            fields,
            fields_file,
        } => {
            let fields = match fields_file {
                Some(path) => Some(read_fields_file(&path)?),
                None if fields.is_empty() => None,
                None => Some(fields),
            };
            let patch = BlueprintPatch {
                name,
                description,
                fields,
            };
            update_blueprint(output, &id, patch)
        }
        BlueprintCommands::Delete { id } => delete_blueprint(output, &id),
    }
}

/// Parses `TYPE:Label[:required][@x,y]`
pub fn parse_field_arg(raw: &str) -> Result<FieldSpec, String> {
    let (body, position) = match raw.rsplit_once('@') {
        Some((body, pos)) => match parse_position(pos) {
            Some(position) => (body, Some(position)),
            None => return Err(format!("Invalid position '{}', expected x,y", pos)),
        },
        None => (raw, None),
    };

    let (type_str, rest) = body
        .split_once(':')
        .ok_or_else(|| format!("Invalid field '{}', expected TYPE:Label", raw))?;
    let field_type: FieldType = type_str.parse()?;

    let (label, required) = match rest.rsplit_once(':') {
        Some((label, flag)) if flag.eq_ignore_ascii_case("required") => (label, true),
        _ => (rest, false),
    };

    if label.trim().is_empty() {
        return Err(format!("Invalid field '{}', label is empty", raw));
    }

    let mut spec = FieldSpec::new(field_type, label.trim());
    if required {
        spec = spec.required();
    }
    if let Some((x, y)) = position {
        spec = spec.at(x, y);
    }

    Ok(spec)
}

fn parse_position(raw: &str) -> Option<(f64, f64)> {
    let (x, y) = raw.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

fn read_fields_file(path: &Path) -> Result<Vec<FieldSpec>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read fields file: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse fields file: {}", path.display()))
}

fn create_blueprint(
    output: &Output,
    name: String,
    description: Option<String>,
    fields: Vec<FieldSpec>,
) -> Result<()> {
    let project = Project::open_current()?;
    let mut db = project.database()?;

    output.verbose_ctx("blueprint", &format!("Creating '{}' with {} fields", name, fields.len()));
    let blueprint = BlueprintService::new(&mut db).create(BlueprintDraft {
        name,
        description,
        fields,
    })?;

    if output.is_json() {
        output.data(&blueprint);
    } else {
        output.success(&format!(
            "Created blueprint: {} - {} ({} fields)",
            blueprint.id,
            blueprint.name,
            blueprint.fields.len()
        ));
    }

    Ok(())
}

fn list_blueprints(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let mut db = project.database()?;
    let blueprints = BlueprintService::new(&mut db).list()?;

    if output.is_json() {
        output.data(&blueprints);
        return Ok(());
    }

    if blueprints.is_empty() {
        output.success("No blueprints found");
        return Ok(());
    }

    for bp in &blueprints {
        let fields = format!("{} fields", bp.fields.len());
        let contracts = format!("{} contracts", bp.contract_count);
        output.row(&[&bp.id.to_string(), &bp.name, &fields, &contracts]);
    }

    Ok(())
}

fn show_blueprint(output: &Output, id: &str) -> Result<()> {
    let project = Project::open_current()?;
    let mut db = project.database()?;
    let blueprint = BlueprintService::new(&mut db).get(id)?;

    if output.is_json() {
        output.data(&blueprint);
    } else {
        print_blueprint(output, &blueprint);
    }

    Ok(())
}

fn print_blueprint(output: &Output, bp: &Blueprint) {
    println!("ID:          {}", bp.id);
    println!("Name:        {}", bp.name);
    if let Some(description) = &bp.description {
        println!("Description: {}", description);
    }
    println!("Contracts:   {}", bp.contract_count);
    println!("Created:     {}", bp.created_at.format("%Y-%m-%d %H:%M"));

    output.blank();
    println!("Fields:");
    for field in &bp.fields {
        let position = format!("@{},{}", field.position_x, field.position_y);
        let required = if field.required { "required" } else { "" };
        output.row(&[
            "  ",
            &field.id.to_string(),
            field.field_type.as_str(),
            &field.label,
            required,
            &position,
        ]);
    }

    if bp.is_field_locked() {
        output.blank();
        println!("Fields are locked: contracts use this blueprint.");
    }
}

fn update_blueprint(output: &Output, id: &str, patch: BlueprintPatch) -> Result<()> {
    let project = Project::open_current()?;
    let mut db = project.database()?;

    let replaces_fields = patch.fields.is_some();
    let blueprint = BlueprintService::new(&mut db).update(id, patch)?;

    if output.is_json() {
        output.data(&blueprint);
    } else if replaces_fields {
        output.success(&format!(
            "Updated blueprint: {} ({} fields, previous field IDs replaced)",
            blueprint.id,
            blueprint.fields.len()
        ));
    } else {
        output.success(&format!("Updated blueprint: {}", blueprint.id));
    }

    Ok(())
}

fn delete_blueprint(output: &Output, id: &str) -> Result<()> {
    let project = Project::open_current()?;
    let mut db = project.database()?;
    BlueprintService::new(&mut db).delete(id)?;

    output.success(&format!("Deleted blueprint: {}", id));
    Ok(())
}
