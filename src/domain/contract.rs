//! Contract domain model
//!
//! A contract is an instance of a blueprint: it carries one optional value
//! per blueprint field and a lifecycle status. The checks here tie a
//! contract's values to its blueprint's fields and never touch storage.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::blueprint::{Blueprint, BlueprintSummary, Field};
use super::id::{AuditId, BlueprintId, ContractId, FieldId, ValueId};
use super::lifecycle::{ContractStatus, Lifecycle};
use super::validation::ValidationError;

/// A contract row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: ContractId,

    pub name: String,

    /// Fixed at creation
    pub blueprint_id: BlueprintId,

    pub status: ContractStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Contract {
    /// Creates a new contract in CREATED status
    pub fn new(name: impl Into<String>, blueprint_id: BlueprintId) -> Self {
        let name = name.into().trim().to_string();
        let now = Utc::now();
        Self {
            id: ContractId::new(&name, now),
            name,
            blueprint_id,
            status: ContractStatus::Created,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the contract is LOCKED or REVOKED
    pub fn is_terminal(&self) -> bool {
        Lifecycle::global().is_terminal(self.status)
    }

    /// Returns the statuses this contract may move to next
    pub fn allowed_actions(&self) -> Vec<ContractStatus> {
        Lifecycle::global().allowed_next_statuses(self.status)
    }

    /// Checks that `requested` is a legal next status
    pub fn check_transition(&self, requested: ContractStatus) -> Result<(), ValidationError> {
        let lifecycle = Lifecycle::global();

        if lifecycle.is_terminal(self.status) {
            return Err(ValidationError::TerminalStatus(self.status));
        }

        if !lifecycle.is_valid_transition(self.status, requested) {
            return Err(ValidationError::IllegalTransition {
                from: self.status,
                to: requested,
                allowed: lifecycle.allowed_next_statuses(self.status),
            });
        }

        Ok(())
    }

    /// Checks that values may still be written
    pub fn check_values_mutable(&self) -> Result<(), ValidationError> {
        if self.is_terminal() {
            return Err(ValidationError::ValuesLocked(self.status));
        }
        Ok(())
    }

    /// Checks that the contract may be deleted
    pub fn check_deletable(&self) -> Result<(), ValidationError> {
        if self.is_terminal() {
            return Err(ValidationError::DeleteLocked(self.status));
        }
        Ok(())
    }
}

/// A stored field value of a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractValue {
    pub id: ValueId,

    pub contract_id: ContractId,

    pub field_id: FieldId,

    pub value: Option<String>,
}

/// A value as supplied by a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueInput {
    /// Kept as text so unknown or malformed IDs can be reported back verbatim
    pub field_id: String,

    #[serde(default)]
    pub value: Option<String>,
}

impl ValueInput {
    pub fn new(field_id: impl ToString, value: impl Into<String>) -> Self {
        Self {
            field_id: field_id.to_string(),
            value: Some(value.into()),
        }
    }
}

/// Returns true if a value satisfies a required field
pub fn is_filled(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Supplied values resolved against a blueprint's fields
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedValues {
    entries: Vec<(FieldId, Option<String>)>,
}

impl ResolvedValues {
    /// Resolves each supplied field ID against the blueprint.
    ///
    /// Every ID that does not name a field of `blueprint` is collected into a
    /// single error. When a field is supplied more than once the last value
    /// wins and the field keeps its first position.
    pub fn resolve(blueprint: &Blueprint, supplied: &[ValueInput]) -> Result<Self, ValidationError> {
        let mut invalid = Vec::new();
        let mut entries: Vec<(FieldId, Option<String>)> = Vec::new();
        let mut positions: HashMap<FieldId, usize> = HashMap::new();

        for input in supplied {
            let field_id = match input.field_id.parse::<FieldId>() {
                Ok(id) if blueprint.field(&id).is_some() => id,
                _ => {
                    invalid.push(input.field_id.clone());
                    continue;
                }
            };

            match positions.get(&field_id) {
                Some(&pos) => entries[pos].1 = input.value.clone(),
                None => {
                    positions.insert(field_id.clone(), entries.len());
                    entries.push((field_id, input.value.clone()));
                }
            }
        }

        if !invalid.is_empty() {
            return Err(ValidationError::InvalidFieldIds(invalid));
        }

        Ok(Self { entries })
    }

    /// Checks required fields against these values merged over `stored`.
    ///
    /// A supplied value replaces the stored one for the same field, so
    /// blanking a required field is a violation even if it was set before.
    pub fn check_required(
        &self,
        blueprint: &Blueprint,
        stored: &[ContractValue],
    ) -> Result<(), ValidationError> {
        let mut effective: HashMap<&FieldId, Option<&str>> = stored
            .iter()
            .map(|v| (&v.field_id, v.value.as_deref()))
            .collect();
        for (field_id, value) in &self.entries {
            effective.insert(field_id, value.as_deref());
        }

        let missing: Vec<String> = blueprint
            .required_fields()
            .filter(|f| !is_filled(effective.get(&f.id).copied().flatten()))
            .map(|f| f.label.clone())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingRequired(missing))
        }
    }

    /// Iterates resolved (field, value) pairs in supplied order
    pub fn iter(&self) -> impl Iterator<Item = (&FieldId, Option<&str>)> {
        self.entries.iter().map(|(id, v)| (id, v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Orders values by the position of their field in the blueprint
pub fn order_by_fields(values: &mut [ContractValue], fields: &[Field]) {
    let order: HashMap<&FieldId, usize> = fields.iter().enumerate().map(|(i, f)| (&f.id, i)).collect();
    values.sort_by_key(|v| order.get(&v.field_id).copied().unwrap_or(usize::MAX));
}

/// A contract with its blueprint, values and lifecycle hints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDetail {
    #[serde(flatten)]
    pub contract: Contract,

    pub blueprint: Blueprint,

    pub values: Vec<ContractValue>,

    pub allowed_actions: Vec<ContractStatus>,

    pub is_terminal: bool,
}

impl ContractDetail {
    pub fn new(contract: Contract, blueprint: Blueprint, mut values: Vec<ContractValue>) -> Self {
        order_by_fields(&mut values, &blueprint.fields);
        Self {
            allowed_actions: contract.allowed_actions(),
            is_terminal: contract.is_terminal(),
            contract,
            blueprint,
            values,
        }
    }

    /// Returns the stored value for a field
    pub fn value_of(&self, field_id: &FieldId) -> Option<&str> {
        self.values
            .iter()
            .find(|v| &v.field_id == field_id)
            .and_then(|v| v.value.as_deref())
    }
}

/// A contract as shown in listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractListItem {
    #[serde(flatten)]
    pub contract: Contract,

    pub blueprint: BlueprintSummary,

    pub values: Vec<ContractValue>,
}

/// Input for creating a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDraft {
    pub name: String,

    /// Kept as text so an unknown blueprint reads as NotFound
    pub blueprint_id: String,

    #[serde(default)]
    pub values: Vec<ValueInput>,
}

impl ContractDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName { entity: "Contract" });
        }
        Ok(())
    }
}

/// Filters for listing contracts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractFilter {
    pub status: Option<ContractStatus>,
    pub blueprint_id: Option<BlueprintId>,
}

/// One accepted status transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: AuditId,

    pub contract_id: ContractId,

    pub from_status: ContractStatus,

    pub to_status: ContractStatus,

    #[serde(default)]
    pub reason: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    /// Records a transition of `contract_id` happening now
    pub fn record(
        contract_id: &ContractId,
        from_status: ContractStatus,
        to_status: ContractStatus,
        reason: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AuditId::new(&contract_id.to_string(), now),
            contract_id: contract_id.clone(),
            from_status,
            to_status,
            reason: reason.filter(|r| !r.trim().is_empty()),
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::blueprint::{FieldSpec, FieldType};

    fn blueprint(specs: &[FieldSpec]) -> Blueprint {
        let now = Utc::now();
        let id = BlueprintId::new("NDA", now);
        Blueprint {
            fields: specs.iter().map(|s| Field::from_spec(&id, s, now)).collect(),
            id,
            name: "NDA".to_string(),
            description: None,
            created_at: now,
            updated_at: now,
            contract_count: 0,
        }
    }

    fn nda() -> Blueprint {
        blueprint(&[
            FieldSpec::new(FieldType::Text, "Company").required(),
            FieldSpec::new(FieldType::Date, "Effective Date").required(),
            FieldSpec::new(FieldType::Checkbox, "Mutual"),
        ])
    }

    fn stored(contract: &ContractId, field: &FieldId, value: &str) -> ContractValue {
        ContractValue {
            id: ValueId::new("v", Utc::now()),
            contract_id: contract.clone(),
            field_id: field.clone(),
            value: Some(value.to_string()),
        }
    }

    #[test]
    fn unknown_field_ids_are_all_reported() {
        let bp = nda();
        let other = blueprint(&[FieldSpec::new(FieldType::Text, "Other")]);
        let values = vec![
            ValueInput::new(&bp.fields[0].id, "Acme"),
            ValueInput::new(&other.fields[0].id, "x"),
            ValueInput::new("not-an-id", "y"),
        ];

        let err = ResolvedValues::resolve(&bp, &values).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidFieldIds(vec![other.fields[0].id.to_string(), "not-an-id".into()])
        );
    }

    #[test]
    fn missing_required_lists_labels() {
        let bp = nda();
        let resolved = ResolvedValues::resolve(&bp, &[]).unwrap();

        assert_eq!(
            resolved.check_required(&bp, &[]),
            Err(ValidationError::MissingRequired(vec![
                "Company".into(),
                "Effective Date".into()
            ]))
        );
    }

    #[test]
    fn whitespace_does_not_satisfy_required() {
        let bp = nda();
        let values = vec![
            ValueInput::new(&bp.fields[0].id, "   "),
            ValueInput::new(&bp.fields[1].id, "2025-01-01"),
        ];
        let resolved = ResolvedValues::resolve(&bp, &values).unwrap();

        assert_eq!(
            resolved.check_required(&bp, &[]),
            Err(ValidationError::MissingRequired(vec!["Company".into()]))
        );
    }

    #[test]
    fn stored_values_satisfy_required_when_omitted() {
        let bp = nda();
        let contract = ContractId::new("c", Utc::now());
        let existing = vec![
            stored(&contract, &bp.fields[0].id, "Acme"),
            stored(&contract, &bp.fields[1].id, "2025-01-01"),
        ];
        let resolved = ResolvedValues::resolve(&bp, &[ValueInput::new(&bp.fields[2].id, "true")]).unwrap();

        assert!(resolved.check_required(&bp, &existing).is_ok());
    }

    #[test]
    fn blanking_a_stored_required_value_is_rejected() {
        let bp = nda();
        let contract = ContractId::new("c", Utc::now());
        let existing = vec![
            stored(&contract, &bp.fields[0].id, "Acme"),
            stored(&contract, &bp.fields[1].id, "2025-01-01"),
        ];
        let blank = ValueInput {
            field_id: bp.fields[0].id.to_string(),
            value: None,
        };
        let resolved = ResolvedValues::resolve(&bp, &[blank]).unwrap();

        assert_eq!(
            resolved.check_required(&bp, &existing),
            Err(ValidationError::MissingRequired(vec!["Company".into()]))
        );
    }

    #[test]
    fn duplicate_field_keeps_last_value() {
        let bp = nda();
        let values = vec![
            ValueInput::new(&bp.fields[0].id, "First"),
            ValueInput::new(&bp.fields[2].id, "true"),
            ValueInput::new(&bp.fields[0].id, "Second"),
        ];
        let resolved = ResolvedValues::resolve(&bp, &values).unwrap();
        let pairs: Vec<_> = resolved.iter().collect();

        assert_eq!(resolved.len(), 2);
        assert_eq!(pairs[0], (&bp.fields[0].id, Some("Second")));
        assert_eq!(pairs[1], (&bp.fields[2].id, Some("true")));
    }

    #[test]
    fn transitions_follow_lifecycle() {
        let mut contract = Contract::new("Acme NDA", BlueprintId::new("NDA", Utc::now()));
        assert!(contract.check_transition(ContractStatus::Approved).is_ok());

        let err = contract.check_transition(ContractStatus::Sent).unwrap_err();
        assert_eq!(
            err,
            ValidationError::IllegalTransition {
                from: ContractStatus::Created,
                to: ContractStatus::Sent,
                allowed: vec![ContractStatus::Approved, ContractStatus::Revoked],
            }
        );

        contract.status = ContractStatus::Locked;
        assert_eq!(
            contract.check_transition(ContractStatus::Revoked),
            Err(ValidationError::TerminalStatus(ContractStatus::Locked))
        );
        assert!(contract.check_values_mutable().is_err());
        assert!(contract.check_deletable().is_err());
    }

    #[test]
    fn values_ordered_by_field_position() {
        let bp = nda();
        let contract = ContractId::new("c", Utc::now());
        let mut values = vec![
            stored(&contract, &bp.fields[2].id, "true"),
            stored(&contract, &bp.fields[0].id, "Acme"),
        ];
        order_by_fields(&mut values, &bp.fields);

        assert_eq!(values[0].field_id, bp.fields[0].id);
        assert_eq!(values[1].field_id, bp.fields[2].id);
    }

    #[test]
    fn audit_entry_drops_blank_reason() {
        let contract = ContractId::new("c", Utc::now());
        let entry = AuditLogEntry::record(
            &contract,
            ContractStatus::Created,
            ContractStatus::Approved,
            Some("  ".to_string()),
        );
        assert!(entry.reason.is_none());
        assert_eq!(entry.from_status, ContractStatus::Created);
    }
}
