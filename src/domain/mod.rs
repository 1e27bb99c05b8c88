//! Domain models for Accord
//!
//! Contains the lifecycle and the blueprint/contract rules without any I/O concerns.

mod id;
mod lifecycle;
mod blueprint;
mod contract;
mod validation;

pub use id::{AuditId, BlueprintId, ContractId, FieldId, IdError, ValueId};
pub use lifecycle::{ContractStatus, Lifecycle};
pub use blueprint::{
    Blueprint, BlueprintDraft, BlueprintPatch, BlueprintSummary, Field, FieldSpec, FieldType,
};
pub use contract::{
    is_filled, order_by_fields, AuditLogEntry, Contract, ContractDetail, ContractDraft,
    ContractFilter, ContractListItem, ContractValue, ResolvedValues, ValueInput,
};
pub use validation::ValidationError;
