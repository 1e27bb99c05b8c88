//! Sample data for demos and manual testing
//!
//! Loads three blueprints (NDA, employment, service) and one contract per
//! blueprint, walked through the lifecycle by the Contract Engine so each
//! sample carries a real audit trail.

use serde::Serialize;
use tracing::info;

use super::error::{EngineError, EngineResult};
use super::{BlueprintService, ContractEngine};
use crate::domain::{
    Blueprint, BlueprintDraft, ContractDraft, ContractStatus, FieldSpec, FieldType, ValueInput,
};
use crate::storage::Database;

use FieldType::{Checkbox, Date, Signature, Text};

struct SampleBlueprint {
    name: &'static str,
    description: &'static str,
    /// (type, label, required)
    fields: &'static [(FieldType, &'static str, bool)],
}

struct SampleContract {
    name: &'static str,
    blueprint: usize,
    /// (field label, value)
    values: &'static [(&'static str, &'static str)],
    /// Walked in order after creation
    path: &'static [ContractStatus],
}

const BLUEPRINTS: &[SampleBlueprint] = &[
    SampleBlueprint {
        name: "Non-Disclosure Agreement",
        description: "Standard NDA template for external partnerships",
        fields: &[
            (Text, "Company Name", true),
            (Text, "Counterparty Name", true),
            (Date, "Effective Date", true),
            (Text, "Governing Law State", true),
            (Checkbox, "Mutual NDA", false),
            (Signature, "Company Representative Signature", true),
            (Signature, "Counterparty Signature", true),
        ],
    },
    SampleBlueprint {
        name: "Employment Agreement",
        description: "Standard employment contract template",
        fields: &[
            (Text, "Employee Full Name", true),
            (Text, "Job Title", true),
            (Date, "Start Date", true),
            (Text, "Salary", true),
            (Checkbox, "Full Time Position", true),
            (Signature, "Employee Signature", true),
            (Signature, "Employer Signature", true),
        ],
    },
    SampleBlueprint {
        name: "Service Agreement",
        description: "Professional services contract template",
        fields: &[
            (Text, "Service Provider", true),
            (Text, "Client Name", true),
            (Text, "Service Description", true),
            (Date, "Service Start Date", true),
            (Date, "Service End Date", false),
            (Text, "Total Fee", true),
            (Signature, "Service Provider Signature", true),
            (Signature, "Client Signature", true),
        ],
    },
];

const CONTRACTS: &[SampleContract] = &[
    SampleContract {
        name: "NDA - TechCorp Partnership",
        blueprint: 0,
        values: &[
            ("Company Name", "Acme Inc"),
            ("Counterparty Name", "TechCorp LLC"),
            ("Effective Date", "2024-01-15"),
            ("Governing Law State", "California"),
            ("Mutual NDA", "true"),
            ("Company Representative Signature", "/s/ Dana Reyes"),
            ("Counterparty Signature", "/s/ Sam Okafor"),
        ],
        path: &[
            ContractStatus::Approved,
            ContractStatus::Sent,
            ContractStatus::Signed,
        ],
    },
    SampleContract {
        name: "Employment - John Doe",
        blueprint: 1,
        values: &[
            ("Employee Full Name", "John Doe"),
            ("Job Title", "Senior Developer"),
            ("Start Date", "2024-02-01"),
            ("Salary", "$120,000/year"),
            ("Full Time Position", "true"),
            ("Employee Signature", "/s/ John Doe"),
            ("Employer Signature", "/s/ Priya Natarajan"),
        ],
        path: &[ContractStatus::Approved],
    },
    SampleContract {
        name: "Service - Website Development",
        blueprint: 2,
        values: &[
            ("Service Provider", "WebDev Pro"),
            ("Client Name", "StartupXYZ"),
            ("Service Description", "Full-stack web application development"),
            ("Service Start Date", "2024-03-01"),
            ("Total Fee", "$25,000"),
            ("Service Provider Signature", "/s/ Lee Morgan"),
            ("Client Signature", "/s/ Alex Kim"),
        ],
        path: &[],
    },
];

/// What a seed run created
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSummary {
    pub blueprints: usize,
    pub contracts: usize,
}

/// Loads the sample blueprints and contracts
pub fn seed(db: &mut Database) -> EngineResult<SeedSummary> {
    let mut blueprints = Vec::with_capacity(BLUEPRINTS.len());

    for sample in BLUEPRINTS {
        let fields = sample
            .fields
            .iter()
            .enumerate()
            .map(|(i, (field_type, label, required))| {
                let spec = FieldSpec::new(*field_type, *label).at(0.0, i as f64);
                if *required {
                    spec.required()
                } else {
                    spec
                }
            })
            .collect();

        let blueprint = BlueprintService::new(db).create(BlueprintDraft {
            name: sample.name.to_string(),
            description: Some(sample.description.to_string()),
            fields,
        })?;
        blueprints.push(blueprint);
    }

    for sample in CONTRACTS {
        let blueprint = &blueprints[sample.blueprint];
        let values = sample
            .values
            .iter()
            .map(|(label, value)| Ok(ValueInput::new(field_id(blueprint, label)?, *value)))
            .collect::<EngineResult<Vec<_>>>()?;

        let mut engine = ContractEngine::new(db);
        let created = engine.create(ContractDraft {
            name: sample.name.to_string(),
            blueprint_id: blueprint.id.to_string(),
            values,
        })?;

        let id = created.contract.id.to_string();
        for status in sample.path {
            engine.update_status(&id, *status, Some("Sample data".to_string()))?;
        }
    }

    let summary = SeedSummary {
        blueprints: blueprints.len(),
        contracts: CONTRACTS.len(),
    };
    info!(blueprints = summary.blueprints, contracts = summary.contracts, "Seeded database");

    Ok(summary)
}

fn field_id(blueprint: &Blueprint, label: &str) -> EngineResult<String> {
    blueprint
        .fields
        .iter()
        .find(|f| f.label == label)
        .map(|f| f.id.to_string())
        .ok_or_else(|| {
            EngineError::Internal(anyhow::anyhow!(
                "Sample field '{}' missing from blueprint '{}'",
                label,
                blueprint.name
            ))
        })
}
