//! Validation failures raised by the blueprint and contract rules
//!
//! Every variant carries the full list of offending items so a caller can
//! fix them all in one round trip.

use thiserror::Error;

use super::lifecycle::ContractStatus;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("{entity} name is required")]
    EmptyName { entity: &'static str },

    #[error("At least one field is required")]
    NoFields,

    #[error("Field label is required (fields: {})", join_positions(.0))]
    EmptyLabels(Vec<usize>),

    #[error("Cannot modify fields on a blueprint that has contracts. Create a new blueprint instead.")]
    FieldsLocked,

    #[error("Cannot delete a blueprint that has contracts ({0} referencing it).")]
    BlueprintInUse(usize),

    #[error("Invalid field IDs: {}", .0.join(", "))]
    InvalidFieldIds(Vec<String>),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("Cannot modify values of a locked or revoked contract (status: {0})")]
    ValuesLocked(ContractStatus),

    #[error("Cannot delete a locked or revoked contract (status: {0})")]
    DeleteLocked(ContractStatus),

    #[error("Cannot transition from terminal status: {0}")]
    TerminalStatus(ContractStatus),

    #[error(
        "Invalid transition from {from} to {to}. Allowed transitions: {}",
        join_statuses(.allowed)
    )]
    IllegalTransition {
        from: ContractStatus,
        to: ContractStatus,
        allowed: Vec<ContractStatus>,
    },

    #[error("Contract status changed concurrently; it is no longer {0}. Reload and retry.")]
    StatusConflict(ContractStatus),

    #[error("Validation failed: {0}")]
    Malformed(String),
}

fn join_positions(positions: &[usize]) -> String {
    positions
        .iter()
        .map(|p| format!("#{}", p + 1))
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_statuses(statuses: &[ContractStatus]) -> String {
    if statuses.is_empty() {
        return "none".to_string();
    }
    statuses
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_transition_lists_allowed() {
        let err = ValidationError::IllegalTransition {
            from: ContractStatus::Created,
            to: ContractStatus::Sent,
            allowed: vec![ContractStatus::Approved, ContractStatus::Revoked],
        };
        assert_eq!(
            err.to_string(),
            "Invalid transition from CREATED to SENT. Allowed transitions: APPROVED, REVOKED"
        );
    }

    #[test]
    fn lists_every_missing_label() {
        let err = ValidationError::MissingRequired(vec!["Company".into(), "Start Date".into()]);
        assert_eq!(err.to_string(), "Missing required fields: Company, Start Date");
    }

    #[test]
    fn empty_labels_are_one_based() {
        let err = ValidationError::EmptyLabels(vec![0, 2]);
        assert_eq!(err.to_string(), "Field label is required (fields: #1, #3)");
    }

    #[test]
    fn terminal_messages_name_the_status() {
        assert!(ValidationError::ValuesLocked(ContractStatus::Locked)
            .to_string()
            .contains("LOCKED"));
        assert!(ValidationError::DeleteLocked(ContractStatus::Revoked)
            .to_string()
            .contains("REVOKED"));
    }
}
