//! Wire types of the external-dns webhook contract
//!
//! Field names follow the upstream external-dns JSON encoding: endpoints use
//! camelCase (`dnsName`, `recordType`, `recordTTL`), change batches use the
//! capitalized Go field names (`Create`, `UpdateOld`, `UpdateNew`, `Delete`).
//! All fields are optional on decode.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Record type tag of an address endpoint
pub const RECORD_TYPE_A: &str = "A";

/// Record type tag of an alias endpoint
pub const RECORD_TYPE_CNAME: &str = "CNAME";

/// A single DNS endpoint as exchanged with external-dns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Endpoint {
    /// Fully qualified record name
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dns_name: String,

    /// Record targets; exactly one is populated for representable records
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,

    /// Record type (A, CNAME, ...)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub record_type: String,

    /// Distinguishes endpoints sharing a name and type
    #[serde(skip_serializing_if = "String::is_empty")]
    pub set_identifier: String,

    /// Record time-to-live in seconds
    #[serde(rename = "recordTTL", skip_serializing_if = "ttl_is_unset")]
    pub record_ttl: i64,

    /// Labels attached by external-dns
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

fn ttl_is_unset(ttl: &i64) -> bool {
    *ttl == 0
}

impl Endpoint {
    /// Create an endpoint with a single target
    pub fn new(
        dns_name: impl Into<String>,
        record_type: impl Into<String>,
        target: impl Into<String>,
        record_ttl: i64,
    ) -> Self {
        Self {
            dns_name: dns_name.into(),
            record_type: record_type.into(),
            targets: vec![target.into()],
            record_ttl,
            ..Self::default()
        }
    }
}

/// A batch of desired endpoint changes, as POSTed by external-dns
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Changes {
    #[serde(rename = "Create", skip_serializing_if = "Vec::is_empty")]
    pub create: Vec<Endpoint>,

    #[serde(rename = "UpdateOld", skip_serializing_if = "Vec::is_empty")]
    pub update_old: Vec<Endpoint>,

    #[serde(rename = "UpdateNew", skip_serializing_if = "Vec::is_empty")]
    pub update_new: Vec<Endpoint>,

    #[serde(rename = "Delete", skip_serializing_if = "Vec::is_empty")]
    pub delete: Vec<Endpoint>,
}

impl Changes {
    /// True when no list carries an endpoint
    pub fn is_empty(&self) -> bool {
        self.create.is_empty()
            && self.update_old.is_empty()
            && self.update_new.is_empty()
            && self.delete.is_empty()
    }
}

/// Domain filter advertised to external-dns during negotiation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
}
