//! Funding category rules and the per-category claim payloads.
//!
//! Categories are owned by an administrative collaborator; the review core only reads them and
//! snapshots the applicable ceiling onto each application at submission time.

mod catalog;
mod payload;

pub use catalog::{CategoryCatalog, CategoryError, CategoryProvider};
pub use payload::{
    BereavementClaim, ClaimPayload, DisasterClaim, EmergencyClaim, InpatientClaim,
    OutpatientClaim, Relationship,
};

use serde::{Deserialize, Serialize};

use crate::money::Amount;

/// Identifier wrapper for funding categories (e.g. `CAT-ILLNESS-OUTPATIENT`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub String);

impl CategoryId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which payload shape a claim in a category must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Outpatient,
    Inpatient,
    Bereavement,
    Disaster,
    Emergency,
}

impl ClaimKind {
    pub const fn label(self) -> &'static str {
        match self {
            ClaimKind::Outpatient => "outpatient",
            ClaimKind::Inpatient => "inpatient",
            ClaimKind::Bereavement => "bereavement",
            ClaimKind::Disaster => "disaster",
            ClaimKind::Emergency => "emergency",
        }
    }
}

/// Rule set for one category of claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingCategory {
    pub id: CategoryId,
    pub name: String,
    pub max_amount: Amount,
    pub requires_committee_approval: bool,
    pub active: bool,
    pub claim_kind: ClaimKind,
}

impl FundingCategory {
    pub fn ceiling(&self) -> Ceiling {
        Ceiling {
            max_amount: self.max_amount,
            requires_committee_approval: self.requires_committee_approval,
        }
    }
}

/// Category rules frozen onto an application when it is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ceiling {
    pub max_amount: Amount,
    pub requires_committee_approval: bool,
}
