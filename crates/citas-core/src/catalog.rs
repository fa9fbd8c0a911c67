//! Server-provided catalogs: branches and appointment reasons.
//!
//! The core treats these as opaque foreign keys; only the id travels in the
//! booking request.

use serde::{Deserialize, Serialize};

/// A physical service location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchRef {
    #[serde(alias = "branchId")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

/// An appointment type (the reason for the visit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonRef {
    #[serde(alias = "appointmentTypeId")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Catalogs loaded once when a booking session starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalogs {
    pub branches: Vec<BranchRef>,
    pub reasons: Vec<ReasonRef>,
}

impl Catalogs {
    pub fn branch(&self, id: i64) -> Option<&BranchRef> {
        self.branches.iter().find(|b| b.id == id)
    }

    pub fn reason(&self, id: i64) -> Option<&ReasonRef> {
        self.reasons.iter().find(|r| r.id == id)
    }
}
