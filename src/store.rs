//! Read-only beneficiary record store with linkage-count indexes.

use crate::types::record::Record;
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Record source loaded once at startup and shared read-only by all
/// concurrent pipeline requests.
pub struct RecordStore {
    records: Vec<Record>,
    by_id: HashMap<String, usize>,
    identity_counts: HashMap<String, u32>,
    phone_counts: HashMap<String, u32>,
    bank_counts: HashMap<String, u32>,
    household_counts: HashMap<String, u32>,
}

impl RecordStore {
    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(records.len());
        let mut identity_counts: HashMap<String, u32> = HashMap::new();
        let mut phone_counts: HashMap<String, u32> = HashMap::new();
        let mut bank_counts: HashMap<String, u32> = HashMap::new();
        let mut household_counts: HashMap<String, u32> = HashMap::new();

        for (row, record) in records.iter().enumerate() {
            if record.beneficiary_id.trim().is_empty() {
                bail!("record at row {} has no beneficiary_id", row);
            }
            if by_id.contains_key(&record.beneficiary_id) {
                warn!(
                    beneficiary_id = %record.beneficiary_id,
                    "duplicate beneficiary_id in record store, keeping first"
                );
                continue;
            }
            by_id.insert(record.beneficiary_id.clone(), row);

            let mut bump = |counts: &mut HashMap<String, u32>, value: &Option<String>| {
                if let Some(v) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                    *counts.entry(v.to_string()).or_insert(0) += 1;
                }
            };
            bump(&mut identity_counts, &record.identity_number);
            bump(&mut phone_counts, &record.phone_number);
            bump(&mut bank_counts, &record.bank_account);
            bump(&mut household_counts, &record.household_id);
        }

        Ok(Self {
            records,
            by_id,
            identity_counts,
            phone_counts,
            bank_counts,
            household_counts,
        })
    }

    /// Load records from a CSV file.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open record store at {}", path.display()))?;

        let mut records = Vec::new();
        for row in reader.deserialize() {
            let record: Record =
                row.with_context(|| format!("Malformed record in {}", path.display()))?;
            records.push(record);
        }

        info!(count = records.len(), path = %path.display(), "record store loaded");
        Self::from_records(records)
    }

    pub fn get(&self, beneficiary_id: &str) -> Option<&Record> {
        self.by_id.get(beneficiary_id).map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Number of records registered under this identity number.
    pub fn identity_count(&self, value: &str) -> u32 {
        Self::lookup(&self.identity_counts, value)
    }

    /// Number of records sharing this phone number.
    pub fn phone_count(&self, value: &str) -> u32 {
        Self::lookup(&self.phone_counts, value)
    }

    /// Number of records sharing this bank account.
    pub fn bank_count(&self, value: &str) -> u32 {
        Self::lookup(&self.bank_counts, value)
    }

    /// Number of records in this household.
    pub fn household_size(&self, value: &str) -> u32 {
        Self::lookup(&self.household_counts, value)
    }

    fn lookup(counts: &HashMap<String, u32>, value: &str) -> u32 {
        if value.trim().is_empty() {
            return 0;
        }
        counts.get(value).copied().unwrap_or(0)
    }
}
