//! Typed DNS record model and endpoint conversions
//!
//! The router stores DNS entries as untyped configuration sections; this
//! module is the typed counterpart. Only address and alias records are
//! representable, every other kind is skipped at the conversion boundaries.

use crate::endpoint::{Endpoint, RECORD_TYPE_A, RECORD_TYPE_CNAME};
use crate::error::{Error, Result};

/// A DNS record managed on the router
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsRecord {
    /// Address record mapping a name to an IP address
    A { name: String, address: String },

    /// Alias record mapping an alias to a canonical target
    Cname { alias: String, target: String },
}

impl DnsRecord {
    /// Check the fields required before a write operation
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::A { name, address } => {
                if name.is_empty() {
                    return Err(Error::invalid_record("name is required"));
                }
                if address.is_empty() {
                    return Err(Error::invalid_record("ip is required"));
                }
            }
            Self::Cname { alias, target } => {
                if alias.is_empty() {
                    return Err(Error::invalid_record("cname is required"));
                }
                if target.is_empty() {
                    return Err(Error::invalid_record("target is required"));
                }
            }
        }

        Ok(())
    }

    /// True when a stored record satisfies this requested record's key.
    /// Address records match by name, alias records by alias; the value
    /// side (address/target) is not compared.
    pub fn matches(&self, stored: &DnsRecord) -> bool {
        match (self, stored) {
            (Self::A { name: a, .. }, Self::A { name: b, .. }) => a == b,
            (Self::Cname { alias: a, .. }, Self::Cname { alias: b, .. }) => a == b,
            _ => false,
        }
    }

    /// Convert from the external endpoint model; `None` for kinds this
    /// provider cannot represent (and for endpoints without a target)
    pub fn from_endpoint(endpoint: &Endpoint) -> Option<Self> {
        let target = endpoint.targets.first()?;

        match endpoint.record_type.as_str() {
            RECORD_TYPE_A => Some(Self::A {
                name: endpoint.dns_name.clone(),
                address: target.clone(),
            }),
            RECORD_TYPE_CNAME => Some(Self::Cname {
                alias: endpoint.dns_name.clone(),
                target: target.clone(),
            }),
            _ => None,
        }
    }

    /// Convert to the external endpoint model with the given TTL
    pub fn to_endpoint(&self, record_ttl: i64) -> Endpoint {
        match self {
            Self::A { name, address } => Endpoint::new(name, RECORD_TYPE_A, address, record_ttl),
            Self::Cname { alias, target } => {
                Endpoint::new(alias, RECORD_TYPE_CNAME, target, record_ttl)
            }
        }
    }
}

/// Convert a batch of endpoints, silently skipping unrepresentable kinds
pub fn endpoints_to_records(endpoints: &[Endpoint]) -> Vec<DnsRecord> {
    endpoints.iter().filter_map(DnsRecord::from_endpoint).collect()
}
