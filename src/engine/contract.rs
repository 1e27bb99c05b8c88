//! Contract Engine
//!
//! Creates contracts from blueprints, writes their values, and drives them
//! through the lifecycle. Every rejected call returns before the first
//! write; every accepted multi-row change is one store transaction.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::error::{EngineError, EngineResult};
use crate::domain::{
    AuditLogEntry, Blueprint, BlueprintId, Contract, ContractDetail, ContractDraft, ContractFilter,
    ContractId, ContractListItem, ContractStatus, ContractValue, ResolvedValues, ValidationError,
    ValueId, ValueInput, order_by_fields,
};
use crate::storage::Database;

pub struct ContractEngine<'a> {
    db: &'a mut Database,
}

impl<'a> ContractEngine<'a> {
    pub fn new(db: &'a mut Database) -> Self {
        Self { db }
    }

    /// Creates a contract in CREATED status with its initial values
    pub fn create(&mut self, draft: ContractDraft) -> EngineResult<ContractDetail> {
        draft.validate()?;

        let blueprint = self.load_blueprint(&draft.blueprint_id)?;
        let resolved = ResolvedValues::resolve(&blueprint, &draft.values)?;
        resolved.check_required(&blueprint, &[])?;

        let contract = Contract::new(draft.name, blueprint.id.clone());
        let values: Vec<ContractValue> = resolved
            .iter()
            .map(|(field_id, value)| ContractValue {
                id: ValueId::new(&field_id.to_string(), contract.created_at),
                contract_id: contract.id.clone(),
                field_id: field_id.clone(),
                value: value.map(str::to_string),
            })
            .collect();

        self.db.insert_contract(&contract, &values)?;
        info!(
            id = %contract.id,
            blueprint = %blueprint.id,
            values = values.len(),
            "Created contract"
        );

        self.get(&contract.id.to_string())
    }

    /// Upserts values on a non-terminal contract.
    ///
    /// Required fields are checked against the stored values with the
    /// supplied ones applied on top.
    pub fn update_values(
        &mut self,
        id: &str,
        values: &[ValueInput],
    ) -> EngineResult<ContractDetail> {
        let contract = self.load_contract(id)?;
        contract.check_values_mutable()?;

        let blueprint = self.blueprint_of(&contract)?;
        let resolved = ResolvedValues::resolve(&blueprint, values)?;
        let stored = self.db.values_for(&contract.id)?;
        resolved.check_required(&blueprint, &stored)?;

        if !self.db.upsert_values(&contract.id, resolved.iter(), Utc::now())? {
            // Lost a race with a transition into a terminal status or a delete
            let current = self.load_contract(id)?;
            warn!(id = %contract.id, status = %current.status, "Value update lost race");
            return Err(ValidationError::ValuesLocked(current.status).into());
        }
        info!(id = %contract.id, values = resolved.len(), "Updated contract values");

        self.get(id)
    }

    /// Moves a contract to `requested`, recording one audit row
    pub fn update_status(
        &mut self,
        id: &str,
        requested: ContractStatus,
        reason: Option<String>,
    ) -> EngineResult<ContractDetail> {
        let contract = self.load_contract(id)?;

        if let Err(err) = contract.check_transition(requested) {
            debug!(id = %contract.id, from = %contract.status, to = %requested, "Rejected transition");
            return Err(err.into());
        }

        let entry = AuditLogEntry::record(&contract.id, contract.status, requested, reason);
        if !self.db.apply_transition(&entry)? {
            warn!(id = %contract.id, expected = %contract.status, "Status changed concurrently");
            return Err(ValidationError::StatusConflict(contract.status).into());
        }
        info!(id = %contract.id, from = %entry.from_status, to = %entry.to_status, "Transitioned contract");

        self.get(id)
    }

    /// Hard-deletes a non-terminal contract and its values
    pub fn delete(&mut self, id: &str) -> EngineResult<()> {
        let contract = self.load_contract(id)?;
        contract.check_deletable()?;

        if !self.db.delete_contract(&contract.id)? {
            let current = self.load_contract(id)?;
            return Err(ValidationError::DeleteLocked(current.status).into());
        }
        info!(id = %contract.id, "Deleted contract");

        Ok(())
    }

    /// Audit rows for a contract, newest first; empty for unknown contracts
    pub fn audit_logs(&self, id: &str) -> EngineResult<Vec<AuditLogEntry>> {
        match id.parse::<ContractId>() {
            Ok(parsed) => Ok(self.db.audit_logs(&parsed)?),
            Err(_) => Ok(Vec::new()),
        }
    }

    /// Lists contracts matching `filter`, newest first
    pub fn list(&self, filter: &ContractFilter) -> EngineResult<Vec<ContractListItem>> {
        let blueprints: HashMap<BlueprintId, Blueprint> = self
            .db
            .list_blueprints()?
            .into_iter()
            .map(|b| (b.id.clone(), b))
            .collect();

        self.db
            .list_contracts(filter)?
            .into_iter()
            .map(|contract| -> EngineResult<ContractListItem> {
                let blueprint = blueprints.get(&contract.blueprint_id).ok_or_else(|| {
                    EngineError::Internal(anyhow::anyhow!(
                        "Contract {} references missing blueprint {}",
                        contract.id,
                        contract.blueprint_id
                    ))
                })?;

                let mut values = self.db.values_for(&contract.id)?;
                order_by_fields(&mut values, &blueprint.fields);

                Ok(ContractListItem {
                    blueprint: blueprint.summary(),
                    contract,
                    values,
                })
            })
            .collect()
    }

    /// Loads a contract with its blueprint, values and allowed actions
    pub fn get(&self, id: &str) -> EngineResult<ContractDetail> {
        let contract = self.load_contract(id)?;
        let blueprint = self.blueprint_of(&contract)?;
        let values = self.db.values_for(&contract.id)?;

        Ok(ContractDetail::new(contract, blueprint, values))
    }

    fn load_contract(&self, id: &str) -> EngineResult<Contract> {
        let Ok(parsed) = id.parse::<ContractId>() else {
            return Err(EngineError::not_found("Contract", id));
        };

        self.db
            .contract(&parsed)?
            .ok_or_else(|| EngineError::not_found("Contract", id))
    }

    fn load_blueprint(&self, id: &str) -> EngineResult<Blueprint> {
        let Ok(parsed) = id.trim().parse::<BlueprintId>() else {
            return Err(EngineError::not_found("Blueprint", id));
        };

        self.db
            .blueprint(&parsed)?
            .ok_or_else(|| EngineError::not_found("Blueprint", id))
    }

    /// The blueprint of an existing contract; its absence is a store fault
    fn blueprint_of(&self, contract: &Contract) -> EngineResult<Blueprint> {
        self.db.blueprint(&contract.blueprint_id)?.ok_or_else(|| {
            EngineError::Internal(anyhow::anyhow!(
                "Contract {} references missing blueprint {}",
                contract.id,
                contract.blueprint_id
            ))
        })
    }
}
