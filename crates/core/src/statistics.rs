//! The Statistics Aggregator.
//!
//! [`summarize`] is stateless and recomputed from scratch on every change to the filtered view.
//! An empty view yields `None`, so no average is ever taken over zero rows.

use crate::format::{fixed1, round_half_up};
use crate::row::DataRow;
use serde::Serialize;
use std::collections::BTreeMap;

/// Age aggregates. `avg` is pre-formatted with one decimal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AgeStats {
    pub min: u32,
    pub max: u32,
    pub avg: String,
}

/// Aggregates over a non-empty filtered view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSummary {
    pub total_records: usize,
    pub age_stats: AgeStats,
    pub gender_distribution: BTreeMap<String, usize>,
    pub condition_distribution: BTreeMap<String, usize>,
    /// Mean BMI, one decimal.
    #[serde(rename = "avgBMI")]
    pub avg_bmi: String,
    pub avg_systolic: i64,
    pub avg_diastolic: i64,
}

/// Summarises `records` in one pass. Returns `None` for an empty slice.
pub fn summarize(records: &[DataRow]) -> Option<StatisticsSummary> {
    let first = records.first()?;

    let mut min_age = first.age;
    let mut max_age = first.age;
    let mut age_sum = 0f64;
    let mut bmi_sum = 0f64;
    let mut systolic_sum = 0f64;
    let mut diastolic_sum = 0f64;
    let mut gender_distribution = BTreeMap::new();
    let mut condition_distribution = BTreeMap::new();

    for row in records {
        min_age = min_age.min(row.age);
        max_age = max_age.max(row.age);
        age_sum += f64::from(row.age);
        bmi_sum += row.bmi.value();
        systolic_sum += row.systolic_bp;
        diastolic_sum += row.diastolic_bp;
        *gender_distribution.entry(row.gender.clone()).or_insert(0) += 1;
        *condition_distribution
            .entry(row.diagnosis.clone())
            .or_insert(0) += 1;
    }

    let n = records.len() as f64;
    Some(StatisticsSummary {
        total_records: records.len(),
        age_stats: AgeStats {
            min: min_age,
            max: max_age,
            avg: fixed1(age_sum / n),
        },
        gender_distribution,
        condition_distribution,
        avg_bmi: fixed1(bmi_sum / n),
        avg_systolic: round_half_up(systolic_sum / n),
        avg_diastolic: round_half_up(diastolic_sum / n),
    })
}

impl StatisticsSummary {
    /// The `n` most frequent diagnoses, by count descending then name ascending.
    pub fn top_conditions(&self, n: usize) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .condition_distribution
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(n);
        ranked
    }

    /// Each gender's share of the view as a whole-number percentage.
    pub fn gender_shares(&self) -> BTreeMap<&str, i64> {
        let total = self.total_records as f64;
        self.gender_distribution
            .iter()
            .map(|(gender, count)| (gender.as_str(), round_half_up(*count as f64 * 100.0 / total)))
            .collect()
    }

    /// Blood pressure as displayed, e.g. `128/79`.
    pub fn blood_pressure(&self) -> String {
        format!("{}/{}", self.avg_systolic, self.avg_diastolic)
    }
}
