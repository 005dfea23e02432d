//! The ingestion collaborator.
//!
//! A [`RowSource`] is asked for a number of rows and eventually answers with rows or an
//! [`IngestionError`]. The session tracks at most one outstanding request, identified by an
//! [`IngestionTicket`]; a completion carrying any other ticket is stale and dropped.

use crate::constants::{MRN_PREFIX, ROW_ID_PREFIX};
use crate::error::IngestionError;
use crate::row::{Bmi, DataRow};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};

const CONDITIONS: [&str; 8] = [
    "Hypertension",
    "Diabetes Type 2",
    "Asthma",
    "Chronic Kidney Disease",
    "Coronary Artery Disease",
    "COPD",
    "Heart Failure",
    "Atrial Fibrillation",
];

const TREATMENTS: [&str; 8] = [
    "Metformin",
    "Lisinopril",
    "Atorvastatin",
    "Albuterol",
    "Insulin",
    "Amlodipine",
    "Metoprolol",
    "Warfarin",
];

const GENDERS: [&str; 2] = ["Male", "Female"];

#[async_trait]
pub trait RowSource: Send + Sync {
    /// Requests `count` rows from the source.
    async fn request_rows(&self, count: usize) -> Result<Vec<DataRow>, IngestionError>;
}

/// Identifies one ingestion request within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IngestionTicket(u64);

impl IngestionTicket {
    pub(crate) fn new(generation: u64) -> Self {
        Self(generation)
    }
}

/// How completed rows are merged into the Record Store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestionMode {
    /// Discard the current rows first. Used on workspace activation.
    Replace,
    /// Add to the current rows. Used when connecting another data source.
    Append,
}

/// An outstanding request the caller must fulfil with a [`RowSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IngestionRequest {
    pub ticket: IngestionTicket,
    pub count: usize,
    pub mode: IngestionMode,
}

/// Generates plausible synthetic encounters.
///
/// Seeded sources are deterministic: the n-th call on two sources with the same seed returns the
/// same rows.
#[derive(Debug, Default)]
pub struct MockRowSource {
    seed: Option<u64>,
    calls: AtomicU64,
}

impl MockRowSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            calls: AtomicU64::new(0),
        }
    }

    /// Synchronous form of [`RowSource::request_rows`].
    pub fn generate(&self, count: usize) -> Vec<DataRow> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(call)),
            None => StdRng::from_entropy(),
        };

        (1..=count).map(|seq| mock_row(&mut rng, seq)).collect()
    }
}

#[async_trait]
impl RowSource for MockRowSource {
    async fn request_rows(&self, count: usize) -> Result<Vec<DataRow>, IngestionError> {
        let rows = self.generate(count);
        tracing::debug!("mock source generated {} rows", rows.len());
        Ok(rows)
    }
}

fn mock_row(rng: &mut StdRng, seq: usize) -> DataRow {
    let year_start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    let encounter_date = year_start
        .checked_add_days(Days::new(rng.gen_range(0..365)))
        .unwrap_or(year_start);
    let bmi_tenths: u32 = rng.gen_range(200..350);

    DataRow {
        id: format!("{}{:03}", ROW_ID_PREFIX, seq),
        mrn: format!("{}{:03}", MRN_PREFIX, seq),
        age: rng.gen_range(20..80),
        gender: GENDERS[rng.gen_range(0..GENDERS.len())].to_string(),
        diagnosis: CONDITIONS[rng.gen_range(0..CONDITIONS.len())].to_string(),
        treatment: TREATMENTS[rng.gen_range(0..TREATMENTS.len())].to_string(),
        encounter_date,
        lab_value: f64::from(rng.gen_range(50u32..250)),
        systolic_bp: f64::from(rng.gen_range(110u32..150)),
        diastolic_bp: f64::from(rng.gen_range(70u32..90)),
        bmi: Bmi::new(f64::from(bmi_tenths) / 10.0).unwrap_or_default(),
    }
}
