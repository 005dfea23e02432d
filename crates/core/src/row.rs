//! Patient-encounter rows.
//!
//! A [`DataRow`] is one record in the Record Store. Field names on the wire follow the dataset's
//! column names (`encounterDate`, `systolicBP`, ...), and BMI travels as a one-decimal string.

use crate::format::fixed1;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One patient encounter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRow {
    /// Stable identifier, unique within the Record Store.
    pub id: String,
    /// External medical record number. Not required to be unique.
    pub mrn: String,
    pub age: u32,
    pub gender: String,
    pub diagnosis: String,
    pub treatment: String,
    /// Serialized as `YYYY-MM-DD`.
    pub encounter_date: NaiveDate,
    pub lab_value: f64,
    #[serde(rename = "systolicBP")]
    pub systolic_bp: f64,
    #[serde(rename = "diastolicBP")]
    pub diastolic_bp: f64,
    pub bmi: Bmi,
}

impl DataRow {
    /// A blank row as produced by "add row": every editable field at its default.
    pub fn blank(id: String, mrn: String, encounter_date: NaiveDate) -> Self {
        Self {
            id,
            mrn,
            age: 0,
            gender: String::new(),
            diagnosis: String::new(),
            treatment: String::new(),
            encounter_date,
            lab_value: 0.0,
            systolic_bp: 0.0,
            diastolic_bp: 0.0,
            bmi: Bmi::default(),
        }
    }

    /// Applies a partial edit. The `id` is never touched.
    pub fn apply(&mut self, patch: RowPatch) {
        let RowPatch {
            mrn,
            age,
            gender,
            diagnosis,
            treatment,
            encounter_date,
            lab_value,
            systolic_bp,
            diastolic_bp,
            bmi,
        } = patch;

        if let Some(mrn) = mrn {
            self.mrn = mrn;
        }
        if let Some(age) = age {
            self.age = age;
        }
        if let Some(gender) = gender {
            self.gender = gender;
        }
        if let Some(diagnosis) = diagnosis {
            self.diagnosis = diagnosis;
        }
        if let Some(treatment) = treatment {
            self.treatment = treatment;
        }
        if let Some(encounter_date) = encounter_date {
            self.encounter_date = encounter_date;
        }
        if let Some(lab_value) = lab_value {
            self.lab_value = lab_value;
        }
        if let Some(systolic_bp) = systolic_bp {
            self.systolic_bp = systolic_bp;
        }
        if let Some(diastolic_bp) = diastolic_bp {
            self.diastolic_bp = diastolic_bp;
        }
        if let Some(bmi) = bmi {
            self.bmi = bmi;
        }
    }
}

/// Partial update for a single row, as produced by an inline cell edit.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RowPatch {
    pub mrn: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub encounter_date: Option<NaiveDate>,
    pub lab_value: Option<f64>,
    #[serde(rename = "systolicBP")]
    pub systolic_bp: Option<f64>,
    #[serde(rename = "diastolicBP")]
    pub diastolic_bp: Option<f64>,
    pub bmi: Option<Bmi>,
}

/// Body-mass index.
///
/// Serialized as a decimal string with one fractional digit (`"27.4"`). Deserializes from either
/// such a string or a bare JSON number.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Bmi(f64);

impl Bmi {
    /// Wraps `value`, rejecting negative or non-finite input.
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && value >= 0.0).then_some(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Bmi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&fixed1(self.0))
    }
}

impl FromStr for Bmi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid BMI '{}': {}", s, e))?;
        Bmi::new(value).ok_or_else(|| format!("BMI must be a non-negative number, got '{}'", s))
    }
}

impl Serialize for Bmi {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Bmi {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(f64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
            Raw::Number(n) => Bmi::new(n).ok_or_else(|| {
                serde::de::Error::custom(format!("BMI must be a non-negative number, got {}", n))
            }),
        }
    }
}
