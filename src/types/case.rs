//! Case input and normalized pipeline request types.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Default annual income assumed when the upstream extractor found none.
pub const DEFAULT_ANNUAL_INCOME: f64 = 50_000.0;
/// Default district for cases with no district field.
pub const DEFAULT_DISTRICT: &str = "District_1";

/// Raw case fields produced by the upstream extraction collaborator.
///
/// Everything is optional at this boundary; normalization decides what is
/// required and what takes a documented default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseInput {
    #[serde(default)]
    pub beneficiary_id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub district: Option<String>,

    #[serde(default)]
    pub phone_number: Option<String>,

    #[serde(default)]
    pub bank_account: Option<String>,

    #[serde(default, alias = "aadhaar_like_id")]
    pub identity_number: Option<String>,

    #[serde(default)]
    pub household_id: Option<String>,

    #[serde(default)]
    pub annual_income: Option<f64>,

    /// How many registrations were filed under this identity number
    #[serde(default, alias = "registrations_per_aadhaar")]
    pub registrations_per_identity: Option<u32>,

    /// How many beneficiaries share this bank account
    #[serde(default)]
    pub bank_shared_count: Option<u32>,

    /// How many beneficiaries share this phone number
    #[serde(default)]
    pub phone_shared_count: Option<u32>,
}

/// Normalized feature record handed to every scoring stage of one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRequest {
    /// Correlates concurrent stage calls for one orchestration
    pub request_id: String,
    pub beneficiary_id: String,
    pub name: String,
    pub district: String,
    pub phone_number: String,
    pub bank_account: String,
    pub identity_number: String,
    pub household_id: String,
    pub annual_income: f64,
    pub registrations_per_identity: u32,
    pub bank_shared_count: u32,
    pub phone_shared_count: u32,
}

impl PipelineRequest {
    /// Create a request with defaults for everything but the id.
    pub fn new(beneficiary_id: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            beneficiary_id: beneficiary_id.into(),
            name: String::new(),
            district: DEFAULT_DISTRICT.to_string(),
            phone_number: String::new(),
            bank_account: String::new(),
            identity_number: String::new(),
            household_id: String::new(),
            annual_income: DEFAULT_ANNUAL_INCOME,
            registrations_per_identity: 1,
            bank_shared_count: 1,
            phone_shared_count: 1,
        }
    }

    /// Normalize raw upstream input into a pipeline request.
    ///
    /// Fails hard only when no beneficiary id can be produced; every other
    /// field falls back to its documented default.
    pub fn normalize(input: CaseInput) -> Result<Self, PipelineError> {
        let beneficiary_id = input
            .beneficiary_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| PipelineError::InvalidRequest {
                message: "beneficiary_id is required".to_string(),
            })?;

        let mut request = Self::new(beneficiary_id);
        if let Some(name) = input.name {
            request.name = name;
        }
        if let Some(district) = input.district.filter(|d| !d.trim().is_empty()) {
            request.district = district;
        }
        if let Some(phone) = input.phone_number {
            request.phone_number = phone;
        }
        if let Some(bank) = input.bank_account {
            request.bank_account = bank;
        }
        if let Some(identity) = input.identity_number {
            request.identity_number = identity;
        }
        if let Some(household) = input.household_id {
            request.household_id = household;
        }
        if let Some(income) = input.annual_income {
            request.annual_income = income;
        }
        if let Some(registrations) = input.registrations_per_identity {
            request.registrations_per_identity = registrations;
        }
        if let Some(bank_shared) = input.bank_shared_count {
            request.bank_shared_count = bank_shared;
        }
        if let Some(phone_shared) = input.phone_shared_count {
            request.phone_shared_count = phone_shared;
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_defaults() {
        let input = CaseInput {
            beneficiary_id: Some("BEN0001".to_string()),
            ..CaseInput::default()
        };

        let request = PipelineRequest::normalize(input).unwrap();

        assert_eq!(request.beneficiary_id, "BEN0001");
        assert_eq!(request.district, DEFAULT_DISTRICT);
        assert_eq!(request.annual_income, DEFAULT_ANNUAL_INCOME);
        assert_eq!(request.registrations_per_identity, 1);
        assert_eq!(request.bank_shared_count, 1);
        assert_eq!(request.phone_shared_count, 1);
        assert!(!request.request_id.is_empty());
    }

    #[test]
    fn test_normalize_requires_id() {
        assert!(PipelineRequest::normalize(CaseInput::default()).is_err());

        let blank = CaseInput {
            beneficiary_id: Some("   ".to_string()),
            ..CaseInput::default()
        };
        assert!(PipelineRequest::normalize(blank).is_err());
    }

    #[test]
    fn test_normalize_keeps_provided_fields() {
        let input = CaseInput {
            beneficiary_id: Some("BEN0002".to_string()),
            annual_income: Some(85_000.0),
            phone_shared_count: Some(7),
            district: Some("District_9".to_string()),
            ..CaseInput::default()
        };

        let request = PipelineRequest::normalize(input).unwrap();

        assert_eq!(request.annual_income, 85_000.0);
        assert_eq!(request.phone_shared_count, 7);
        assert_eq!(request.district, "District_9");
    }

    #[test]
    fn test_case_input_aliases() {
        let json = r#"{"beneficiary_id":"BEN0003","aadhaar_like_id":"ID7","registrations_per_aadhaar":3}"#;
        let input: CaseInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.identity_number.as_deref(), Some("ID7"));
        assert_eq!(input.registrations_per_identity, Some(3));
    }
}
