//! Blueprint Service
//!
//! Thin layer over the store: validates input, enforces the rule that a
//! blueprint's fields freeze once a contract uses it, and refuses to delete
//! blueprints that still have contracts.

use chrono::Utc;
use tracing::{debug, info, warn};

use super::error::{EngineError, EngineResult};
use crate::domain::{Blueprint, BlueprintDraft, BlueprintId, BlueprintPatch, Field, ValidationError};
use crate::storage::Database;

pub struct BlueprintService<'a> {
    db: &'a mut Database,
}

impl<'a> BlueprintService<'a> {
    pub fn new(db: &'a mut Database) -> Self {
        Self { db }
    }

    /// Creates a blueprint and its fields in one transaction
    pub fn create(&mut self, draft: BlueprintDraft) -> EngineResult<Blueprint> {
        draft.validate()?;

        let now = Utc::now();
        let name = draft.name.trim().to_string();
        let id = BlueprintId::new(&name, now);
        let fields = draft
            .fields
            .iter()
            .map(|spec| Field::from_spec(&id, spec, now))
            .collect();

        let blueprint = Blueprint {
            id,
            name,
            description: draft.description,
            fields,
            created_at: now,
            updated_at: now,
            contract_count: 0,
        };

        self.db.insert_blueprint(&blueprint)?;
        info!(id = %blueprint.id, name = %blueprint.name, fields = blueprint.fields.len(), "Created blueprint");

        Ok(blueprint)
    }

    /// Lists blueprints, newest first
    pub fn list(&self) -> EngineResult<Vec<Blueprint>> {
        Ok(self.db.list_blueprints()?)
    }

    pub fn get(&self, id: &str) -> EngineResult<Blueprint> {
        let Ok(parsed) = id.parse::<BlueprintId>() else {
            return Err(EngineError::not_found("Blueprint", id));
        };

        self.db
            .blueprint(&parsed)?
            .ok_or_else(|| EngineError::not_found("Blueprint", id))
    }

    /// Applies a partial update.
    ///
    /// Supplying `fields` replaces the whole field list with new identities,
    /// which is only allowed while no contract references the blueprint.
    pub fn update(&mut self, id: &str, patch: BlueprintPatch) -> EngineResult<Blueprint> {
        let existing = self.get(id)?;
        patch.validate()?;

        if patch.fields.is_some() && existing.is_field_locked() {
            debug!(id = %existing.id, contracts = existing.contract_count, "Rejected field change");
            return Err(ValidationError::FieldsLocked.into());
        }

        let now = Utc::now();
        let fields: Option<Vec<Field>> = patch.fields.as_ref().map(|specs| {
            specs
                .iter()
                .map(|spec| Field::from_spec(&existing.id, spec, now))
                .collect()
        });
        let name = patch.name.as_deref().map(str::trim);

        let written = self.db.update_blueprint(
            &existing.id,
            name,
            patch.description.as_deref(),
            fields.as_deref(),
            now,
        )?;
        if !written {
            warn!(id = %existing.id, "Contract created before field change was written");
            return Err(ValidationError::FieldsLocked.into());
        }
        info!(id = %existing.id, fields_replaced = fields.is_some(), "Updated blueprint");

        self.get(id)
    }

    /// Deletes a blueprint that no contract references
    pub fn delete(&mut self, id: &str) -> EngineResult<()> {
        let existing = self.get(id)?;

        let count = self.db.contract_count(&existing.id)?;
        if count > 0 {
            return Err(ValidationError::BlueprintInUse(count).into());
        }

        if !self.db.delete_blueprint(&existing.id)? {
            return Err(EngineError::not_found("Blueprint", id));
        }
        info!(id = %existing.id, "Deleted blueprint");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Contract, FieldSpec, FieldType};

    fn nda_draft() -> BlueprintDraft {
        BlueprintDraft {
            name: "  NDA ".to_string(),
            description: Some("Mutual NDA".to_string()),
            fields: vec![
                FieldSpec::new(FieldType::Text, "Company").required(),
                FieldSpec::new(FieldType::Signature, "Signature").at(10.0, 200.0),
            ],
        }
    }

    #[test]
    fn create_and_get() {
        let mut db = Database::open_in_memory().unwrap();
        let mut service = BlueprintService::new(&mut db);

        let created = service.create(nda_draft()).unwrap();
        assert_eq!(created.name, "NDA");

        let loaded = service.get(&created.id.to_string()).unwrap();
        assert_eq!(loaded.fields.len(), 2);
        assert_eq!(loaded.fields[1].position_y, 200.0);
        assert_eq!(service.list().unwrap().len(), 1);
    }

    #[test]
    fn create_without_fields_fails() {
        let mut db = Database::open_in_memory().unwrap();
        let mut draft = nda_draft();
        draft.fields.clear();

        let err = BlueprintService::new(&mut db).create(draft).unwrap_err();
        assert!(matches!(err, EngineError::Validation(ValidationError::NoFields)));
        assert!(db.list_blueprints().unwrap().is_empty());
    }

    #[test]
    fn unknown_or_malformed_id_is_not_found() {
        let mut db = Database::open_in_memory().unwrap();
        let service = BlueprintService::new(&mut db);

        assert!(matches!(service.get("bp-0000000000"), Err(EngineError::NotFound { .. })));
        assert!(matches!(service.get("garbage"), Err(EngineError::NotFound { .. })));
    }

    #[test]
    fn replace_fields_without_contracts() {
        let mut db = Database::open_in_memory().unwrap();
        let mut service = BlueprintService::new(&mut db);
        let created = service.create(nda_draft()).unwrap();

        let patch = BlueprintPatch {
            fields: Some(vec![FieldSpec::new(FieldType::Date, "Effective Date")]),
            ..Default::default()
        };
        let updated = service.update(&created.id.to_string(), patch).unwrap();

        assert_eq!(updated.name, "NDA");
        assert_eq!(updated.fields.len(), 1);
        assert_eq!(updated.fields[0].label, "Effective Date");
    }

    #[test]
    fn fields_freeze_once_a_contract_exists() {
        let mut db = Database::open_in_memory().unwrap();
        let created = BlueprintService::new(&mut db).create(nda_draft()).unwrap();
        db.insert_contract(&Contract::new("Acme", created.id.clone()), &[])
            .unwrap();

        let mut service = BlueprintService::new(&mut db);
        let id = created.id.to_string();

        let patch = BlueprintPatch {
            fields: Some(vec![FieldSpec::new(FieldType::Text, "Other")]),
            ..Default::default()
        };
        assert!(matches!(
            service.update(&id, patch),
            Err(EngineError::Validation(ValidationError::FieldsLocked))
        ));

        // Renaming is still allowed
        let rename = BlueprintPatch {
            name: Some("NDA v2".to_string()),
            ..Default::default()
        };
        let renamed = service.update(&id, rename).unwrap();
        assert_eq!(renamed.name, "NDA v2");
        assert_eq!(renamed.fields, created.fields);
        assert_eq!(renamed.contract_count, 1);
    }

    #[test]
    fn delete_rules() {
        let mut db = Database::open_in_memory().unwrap();
        let used = BlueprintService::new(&mut db).create(nda_draft()).unwrap();
        let unused = BlueprintService::new(&mut db).create(nda_draft()).unwrap();
        db.insert_contract(&Contract::new("Acme", used.id.clone()), &[])
            .unwrap();

        let mut service = BlueprintService::new(&mut db);
        assert!(matches!(
            service.delete(&used.id.to_string()),
            Err(EngineError::Validation(ValidationError::BlueprintInUse(1)))
        ));

        service.delete(&unused.id.to_string()).unwrap();
        assert!(matches!(
            service.get(&unused.id.to_string()),
            Err(EngineError::NotFound { .. })
        ));
    }
}
