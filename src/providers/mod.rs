//! DynHost provider abstraction and the OVH implementation.

mod ovh;

pub use ovh::{dynhost_access_rules, AccessRule, CredentialRequest, OvhClient};

use crate::config::Target;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Provider-assigned identifier of a DynHost record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Provider-side view of a DynHost record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynHostRecord {
    #[serde(default)]
    pub id: Option<RecordId>,
    /// Currently published address; absent on malformed records.
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub sub_domain: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
}

/// Trait for DynHost record APIs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DynHostProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &'static str;

    /// Find the single record matching `target`.
    async fn find_record(&self, target: &Target) -> Result<RecordId>;

    /// Read the current value of a record.
    async fn read_record(&self, zone: &str, id: RecordId) -> Result<DynHostRecord>;

    /// Point a record at `ip`.
    async fn update_record(&self, zone: &str, id: RecordId, ip: Ipv4Addr) -> Result<()>;
}
