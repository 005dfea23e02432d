//! Workspaces and the form they are created from.

use crate::constants::DEFAULT_WORKSPACE_NAME;
use crate::filter::{CodeType, FilterSpec};
use chrono::{DateTime, Utc};
use cohort_types::{non_blank, NonEmptyText, TextError};
use cohort_uuid::TimestampId;
use serde::{Deserialize, Serialize};

/// A named, persisted filter specification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: TimestampId,
    pub name: NonEmptyText,
    #[serde(default)]
    pub filters: FilterSpec,
    pub created_at: DateTime<Utc>,
}

impl Workspace {
    /// `id` also supplies `createdAt`, so the two always agree.
    pub fn new(id: TimestampId, name: NonEmptyText, filters: FilterSpec) -> Self {
        let created_at = id.timestamp();
        Self {
            id,
            name,
            filters,
            created_at,
        }
    }
}

/// Draft input collected while a workspace is being configured.
///
/// Every field is raw text as typed; conversion to a [`FilterSpec`] drops blank fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkspaceForm {
    pub workspace_name: String,
    pub age_ranges: String,
    pub gender: String,
    pub start_year: String,
    pub end_year: String,
    pub named_condition: String,
    pub condition_code_type: String,
    pub condition_codes: String,
    pub named_treatment: String,
    pub treatment_code_type: String,
    pub treatment_codes: String,
}

/// One input of the creation form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormField {
    WorkspaceName,
    AgeRanges,
    Gender,
    StartYear,
    EndYear,
    NamedCondition,
    ConditionCodeType,
    ConditionCodes,
    NamedTreatment,
    TreatmentCodeType,
    TreatmentCodes,
}

impl WorkspaceForm {
    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        let slot = match field {
            FormField::WorkspaceName => &mut self.workspace_name,
            FormField::AgeRanges => &mut self.age_ranges,
            FormField::Gender => &mut self.gender,
            FormField::StartYear => &mut self.start_year,
            FormField::EndYear => &mut self.end_year,
            FormField::NamedCondition => &mut self.named_condition,
            FormField::ConditionCodeType => &mut self.condition_code_type,
            FormField::ConditionCodes => &mut self.condition_codes,
            FormField::NamedTreatment => &mut self.named_treatment,
            FormField::TreatmentCodeType => &mut self.treatment_code_type,
            FormField::TreatmentCodes => &mut self.treatment_codes,
        };
        *slot = value;
    }

    /// The name to create the workspace under, defaulting when blank.
    pub fn name(&self) -> Result<NonEmptyText, TextError> {
        NonEmptyText::new_or(&self.workspace_name, DEFAULT_WORKSPACE_NAME)
    }

    pub fn filters(&self) -> FilterSpec {
        FilterSpec {
            age_range: non_blank(&self.age_ranges),
            gender: non_blank(&self.gender),
            start_year: non_blank(&self.start_year),
            end_year: non_blank(&self.end_year),
            condition: non_blank(&self.named_condition),
            condition_code_type: non_blank(&self.condition_code_type).map(CodeType::from),
            condition_codes: non_blank(&self.condition_codes),
            treatment: non_blank(&self.named_treatment),
            treatment_code_type: non_blank(&self.treatment_code_type).map(CodeType::from),
            treatment_codes: non_blank(&self.treatment_codes),
        }
    }
}
