//! The Filter Engine.
//!
//! [`apply`] maps a row sequence and an optional [`FilterSpec`] to the matching subsequence,
//! preserving input order. Every predicate is independent and the results are ANDed. A predicate
//! that is absent, blank or cannot be parsed is skipped: a malformed filter never excludes rows
//! and is never an error.
//!
//! The filter is compiled once per call into a [`CompiledFilter`], then rows are checked in a
//! single pass.

use crate::constants::ALL_GENDERS;
use crate::row::DataRow;
use chrono::NaiveDate;
use cohort_types::non_blank;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// The persisted, user-authored query of a workspace.
///
/// All fields are optional; absence means "no constraint". Code types and codes are carried for
/// future coded-value matching but are not evaluated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    /// Inclusive `"min-max"` age range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<String>,
    /// Exact gender; `"All"` or blank means no filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(
        default,
        deserialize_with = "text_or_integer",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_year: Option<String>,
    #[serde(
        default,
        deserialize_with = "text_or_integer",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_year: Option<String>,
    /// Case-insensitive substring of `diagnosis`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_code_type: Option<CodeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_codes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment_code_type: Option<CodeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment_codes: Option<String>,
}

/// A single editable field of a [`FilterSpec`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterField {
    AgeRange,
    Gender,
    StartYear,
    EndYear,
    Condition,
    ConditionCodeType,
    ConditionCodes,
    Treatment,
    TreatmentCodeType,
    TreatmentCodes,
}

impl FilterSpec {
    /// Sets one field from raw text. Blank text clears the field.
    pub fn set(&mut self, field: FilterField, value: &str) {
        let value = non_blank(value);
        match field {
            FilterField::AgeRange => self.age_range = value,
            FilterField::Gender => self.gender = value,
            FilterField::StartYear => self.start_year = value,
            FilterField::EndYear => self.end_year = value,
            FilterField::Condition => self.condition = value,
            FilterField::ConditionCodeType => self.condition_code_type = value.map(CodeType::from),
            FilterField::ConditionCodes => self.condition_codes = value,
            FilterField::Treatment => self.treatment = value,
            FilterField::TreatmentCodeType => self.treatment_code_type = value.map(CodeType::from),
            FilterField::TreatmentCodes => self.treatment_codes = value,
        }
    }

    /// Compiles the evaluated predicates, dropping any that cannot be parsed.
    pub fn compile(&self) -> CompiledFilter {
        CompiledFilter {
            age: self.age_range.as_deref().and_then(parse_age_range),
            gender: self
                .gender
                .as_deref()
                .and_then(non_blank)
                .filter(|g| g != ALL_GENDERS),
            window: date_window(self.start_year.as_deref(), self.end_year.as_deref()),
            condition: self
                .condition
                .as_deref()
                .and_then(non_blank)
                .map(|c| c.to_lowercase()),
        }
    }

    /// One-line description used in workspace listings.
    pub fn summary_line(&self) -> String {
        format!(
            "Age {}, {}, {}",
            self.age_range.as_deref().unwrap_or("Any"),
            self.gender.as_deref().unwrap_or("All genders"),
            self.condition.as_deref().unwrap_or("All conditions"),
        )
    }
}

/// The well-formed subset of a [`FilterSpec`], ready to evaluate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompiledFilter {
    age: Option<(i64, i64)>,
    gender: Option<String>,
    window: Option<(NaiveDate, NaiveDate)>,
    condition: Option<String>,
}

impl CompiledFilter {
    /// True when no predicate survived compilation.
    pub fn is_unconstrained(&self) -> bool {
        self.age.is_none()
            && self.gender.is_none()
            && self.window.is_none()
            && self.condition.is_none()
    }

    pub fn matches(&self, row: &DataRow) -> bool {
        if let Some((min, max)) = self.age {
            let age = i64::from(row.age);
            if age < min || age > max {
                return false;
            }
        }

        if let Some(gender) = &self.gender {
            if row.gender != *gender {
                return false;
            }
        }

        if let Some((start, end)) = self.window {
            if row.encounter_date < start || row.encounter_date > end {
                return false;
            }
        }

        if let Some(condition) = &self.condition {
            if !row.diagnosis.to_lowercase().contains(condition.as_str()) {
                return false;
            }
        }

        true
    }
}

/// Applies `spec` to `records`, returning the matching rows in their original order.
///
/// With no filter (no active workspace) the records are returned unchanged.
pub fn apply(records: &[DataRow], spec: Option<&FilterSpec>) -> Vec<DataRow> {
    let Some(spec) = spec else {
        return records.to_vec();
    };

    let compiled = spec.compile();
    if compiled.is_unconstrained() {
        return records.to_vec();
    }

    records
        .iter()
        .filter(|row| compiled.matches(row))
        .cloned()
        .collect()
}

/// Parses `"min-max"`. Both halves must be integers, otherwise the predicate is skipped.
fn parse_age_range(raw: &str) -> Option<(i64, i64)> {
    let (min, max) = raw.trim().split_once('-')?;
    let min = min.trim().parse().ok()?;
    let max = max.trim().parse().ok()?;
    Some((min, max))
}

/// Builds the inclusive window `[Jan 1 start, Dec 31 end]`. Both years are required.
fn date_window(start: Option<&str>, end: Option<&str>) -> Option<(NaiveDate, NaiveDate)> {
    let start: i32 = start?.trim().parse().ok()?;
    let end: i32 = end?.trim().parse().ok()?;
    Some((
        NaiveDate::from_ymd_opt(start, 1, 1)?,
        NaiveDate::from_ymd_opt(end, 12, 31)?,
    ))
}

/// Accepts `"2023"`, `2023` or `null` for a year field, keeping the raw text.
fn text_or_integer<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(i64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => non_blank(s),
        Some(Raw::Integer(n)) => Some(n.to_string()),
        None => None,
    })
}

/// Terminology a condition or treatment code is drawn from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CodeType {
    Icd10,
    Icd9,
    Snomed,
    Ndc,
    RxNorm,
    Hcpcs,
    Other(String),
}

impl CodeType {
    pub fn as_str(&self) -> &str {
        match self {
            CodeType::Icd10 => "icd10",
            CodeType::Icd9 => "icd9",
            CodeType::Snomed => "snomed",
            CodeType::Ndc => "ndc",
            CodeType::RxNorm => "rxnorm",
            CodeType::Hcpcs => "hcpcs",
            CodeType::Other(other) => other,
        }
    }
}

impl From<String> for CodeType {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "icd10" => CodeType::Icd10,
            "icd9" => CodeType::Icd9,
            "snomed" => CodeType::Snomed,
            "ndc" => CodeType::Ndc,
            "rxnorm" => CodeType::RxNorm,
            "hcpcs" => CodeType::Hcpcs,
            _ => CodeType::Other(value),
        }
    }
}

impl From<CodeType> for String {
    fn from(value: CodeType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
