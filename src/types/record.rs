//! Beneficiary record data structures.

use serde::{Deserialize, Serialize};

/// Record attributes whose shared value between two records implies a
/// relationship edge in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkAttribute {
    Phone,
    BankAccount,
    Agent,
    IdentityNumber,
}

impl LinkAttribute {
    /// All linking attributes, in the order edges are constructed.
    pub const ALL: [LinkAttribute; 4] = [
        LinkAttribute::Phone,
        LinkAttribute::BankAccount,
        LinkAttribute::Agent,
        LinkAttribute::IdentityNumber,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkAttribute::Phone => "phone_number",
            LinkAttribute::BankAccount => "bank_account",
            LinkAttribute::Agent => "agent_id",
            LinkAttribute::IdentityNumber => "identity_number",
        }
    }
}

/// One beneficiary registration record. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Unique record identifier
    pub beneficiary_id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub district: Option<String>,

    /// Contact phone number (linking attribute)
    #[serde(default)]
    pub phone_number: Option<String>,

    /// Disbursement bank account (linking attribute)
    #[serde(default)]
    pub bank_account: Option<String>,

    /// Registering agent (linking attribute)
    #[serde(default)]
    pub agent_id: Option<String>,

    /// Government identity number (linking attribute)
    #[serde(default, alias = "aadhaar_like_id")]
    pub identity_number: Option<String>,

    #[serde(default)]
    pub household_id: Option<String>,

    #[serde(default)]
    pub annual_income: Option<f64>,
}

impl Record {
    /// Create a record with only its id set.
    pub fn new(beneficiary_id: impl Into<String>) -> Self {
        Self {
            beneficiary_id: beneficiary_id.into(),
            name: None,
            district: None,
            phone_number: None,
            bank_account: None,
            agent_id: None,
            identity_number: None,
            household_id: None,
            annual_income: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone_number = Some(phone.into());
        self
    }

    pub fn with_bank_account(mut self, account: impl Into<String>) -> Self {
        self.bank_account = Some(account.into());
        self
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent_id = Some(agent.into());
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity_number = Some(identity.into());
        self
    }

    pub fn with_household(mut self, household: impl Into<String>) -> Self {
        self.household_id = Some(household.into());
        self
    }

    /// Non-empty value of one linking attribute. Empty strings never link.
    pub fn linking_value(&self, attr: LinkAttribute) -> Option<&str> {
        let value = match attr {
            LinkAttribute::Phone => self.phone_number.as_deref(),
            LinkAttribute::BankAccount => self.bank_account.as_deref(),
            LinkAttribute::Agent => self.agent_id.as_deref(),
            LinkAttribute::IdentityNumber => self.identity_number.as_deref(),
        };
        value.filter(|v| !v.trim().is_empty())
    }
}
