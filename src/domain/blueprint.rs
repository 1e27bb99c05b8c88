//! Blueprint domain model
//!
//! A blueprint is a named template holding an ordered list of typed fields.
//! Contracts are instantiated from blueprints and fill in the fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{BlueprintId, FieldId};
use super::validation::ValidationError;

/// Type of a blueprint field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    #[default]
    Text,
    Date,
    Signature,
    Checkbox,
}

impl FieldType {
    /// Returns the wire name (`TEXT`, `DATE`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "TEXT",
            FieldType::Date => "DATE",
            FieldType::Signature => "SIGNATURE",
            FieldType::Checkbox => "CHECKBOX",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TEXT" => Ok(FieldType::Text),
            "DATE" => Ok(FieldType::Date),
            "SIGNATURE" => Ok(FieldType::Signature),
            "CHECKBOX" => Ok(FieldType::Checkbox),
            _ => Err(format!("Unknown field type: {}", s)),
        }
    }
}

/// A field as supplied by a caller, before it has an identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: FieldType,

    pub label: String,

    #[serde(default)]
    pub position_x: f64,

    #[serde(default)]
    pub position_y: f64,

    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    /// Creates a field spec at the origin
    pub fn new(field_type: FieldType, label: impl Into<String>) -> Self {
        Self {
            field_type,
            label: label.into(),
            position_x: 0.0,
            position_y: 0.0,
            required: false,
        }
    }

    /// Marks the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the layout position
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position_x = x;
        self.position_y = y;
        self
    }
}

/// A field of a persisted blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: FieldId,

    pub blueprint_id: BlueprintId,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    pub label: String,

    pub position_x: f64,

    pub position_y: f64,

    pub required: bool,

    pub created_at: DateTime<Utc>,
}

impl Field {
    /// Materializes a spec into a field owned by `blueprint_id`
    pub fn from_spec(blueprint_id: &BlueprintId, spec: &FieldSpec, now: DateTime<Utc>) -> Self {
        Self {
            id: FieldId::new(&spec.label, now),
            blueprint_id: blueprint_id.clone(),
            field_type: spec.field_type,
            label: spec.label.trim().to_string(),
            position_x: spec.position_x,
            position_y: spec.position_y,
            required: spec.required,
            created_at: now,
        }
    }
}

/// A blueprint with its ordered fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub id: BlueprintId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub fields: Vec<Field>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Number of contracts instantiated from this blueprint
    #[serde(default)]
    pub contract_count: usize,
}

impl Blueprint {
    /// Returns true once any contract references this blueprint
    pub fn is_field_locked(&self) -> bool {
        self.contract_count > 0
    }

    /// Returns the fields marked required
    pub fn required_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Looks up a field by ID
    pub fn field(&self, id: &FieldId) -> Option<&Field> {
        self.fields.iter().find(|f| &f.id == id)
    }

    /// Returns the id/name pair embedded in contract responses
    pub fn summary(&self) -> BlueprintSummary {
        BlueprintSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Minimal blueprint reference embedded in contract listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueprintSummary {
    pub id: BlueprintId,
    pub name: String,
}

/// Input for creating a blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintDraft {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl BlueprintDraft {
    /// Checks name and field list
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        if self.fields.is_empty() {
            return Err(ValidationError::NoFields);
        }
        validate_labels(&self.fields)
    }
}

/// Partial update of a blueprint; absent members are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlueprintPatch {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub fields: Option<Vec<FieldSpec>>,
}

impl BlueprintPatch {
    /// Checks the members that are present
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(fields) = &self.fields {
            if fields.is_empty() {
                return Err(ValidationError::NoFields);
            }
            validate_labels(fields)?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName { entity: "Blueprint" });
    }
    Ok(())
}

fn validate_labels(fields: &[FieldSpec]) -> Result<(), ValidationError> {
    let empty: Vec<usize> = fields
        .iter()
        .enumerate()
        .filter(|(_, f)| f.label.trim().is_empty())
        .map(|(i, _)| i)
        .collect();

    if empty.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::EmptyLabels(empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(fields: Vec<FieldSpec>) -> BlueprintDraft {
        BlueprintDraft {
            name: "NDA".to_string(),
            description: None,
            fields,
        }
    }

    #[test]
    fn draft_requires_a_field() {
        assert_eq!(draft(vec![]).validate(), Err(ValidationError::NoFields));
    }

    #[test]
    fn draft_requires_a_name() {
        let mut d = draft(vec![FieldSpec::new(FieldType::Text, "Company")]);
        d.name = "   ".to_string();
        assert!(matches!(
            d.validate(),
            Err(ValidationError::EmptyName { .. })
        ));
    }

    #[test]
    fn draft_reports_every_empty_label() {
        let d = draft(vec![
            FieldSpec::new(FieldType::Text, ""),
            FieldSpec::new(FieldType::Date, "Effective Date"),
            FieldSpec::new(FieldType::Signature, "  "),
        ]);
        assert_eq!(d.validate(), Err(ValidationError::EmptyLabels(vec![0, 2])));
    }

    #[test]
    fn empty_patch_is_valid() {
        assert!(BlueprintPatch::default().validate().is_ok());
    }

    #[test]
    fn patch_with_empty_field_list_is_rejected() {
        let patch = BlueprintPatch {
            fields: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(patch.validate(), Err(ValidationError::NoFields));
    }

    #[test]
    fn field_spec_defaults_from_json() {
        let spec: FieldSpec = serde_json::from_str(r#"{"type":"CHECKBOX","label":"Mutual"}"#).unwrap();
        assert_eq!(spec.field_type, FieldType::Checkbox);
        assert!(!spec.required);
        assert_eq!(spec.position_x, 0.0);
    }

    #[test]
    fn field_type_parses_any_case() {
        assert_eq!("signature".parse::<FieldType>().unwrap(), FieldType::Signature);
        assert!("number".parse::<FieldType>().is_err());
    }

    #[test]
    fn from_spec_trims_label() {
        let bp = BlueprintId::new("NDA", Utc::now());
        let field = Field::from_spec(&bp, &FieldSpec::new(FieldType::Text, " Company ").required(), Utc::now());
        assert_eq!(field.label, "Company");
        assert!(field.required);
        assert_eq!(field.blueprint_id, bp);
    }
}
