//! Record store over the `dhcp` UCI configuration group
//!
//! DNS entries live as `domain` (address) and `cname` (alias) sections of
//! the router's `dhcp` configuration. The store has no lookup by DNS name:
//! every mutation other than a plain add first materializes the full table
//! and matches client-side. Mutations are not transactional — each RPC is a
//! separate round trip and only the trailing commit is a single call.

use crate::lucirpc::LuciClient;
use extdns_core::{DnsRecord, Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// UCI configuration group holding the DNS sections
const CONFIG_GROUP: &str = "dhcp";

/// Section kind tag of address records
const KIND_DOMAIN: &str = "domain";

/// Section kind tag of alias records
const KIND_CNAME: &str = "cname";

/// Wire form of a UCI section as returned by `get_all`
#[derive(Debug, Deserialize)]
struct RawSection {
    #[serde(rename = ".type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    ip: String,
    #[serde(default)]
    cname: String,
    #[serde(default)]
    target: String,
}

impl RawSection {
    /// Decode into the typed model; `None` for kinds the store ignores
    fn into_record(self) -> Option<DnsRecord> {
        match self.kind.as_str() {
            KIND_DOMAIN => Some(DnsRecord::A {
                name: self.name,
                address: self.ip,
            }),
            KIND_CNAME => Some(DnsRecord::Cname {
                alias: self.cname,
                target: self.target,
            }),
            _ => {
                debug!(kind = %self.kind, "ignoring section");
                None
            }
        }
    }
}

/// Reconciles desired DNS records against the remote UCI table
pub struct UciStore {
    client: LuciClient,
}

impl UciStore {
    pub fn new(client: LuciClient) -> Self {
        Self { client }
    }

    /// Read the full table, keyed by section key
    ///
    /// Sections of any kind other than `domain`/`cname` are dropped.
    pub async fn records(&self) -> Result<HashMap<String, DnsRecord>> {
        let result = self.client.uci("get_all", &[CONFIG_GROUP]).await?;
        let sections: HashMap<String, RawSection> = serde_json::from_str(&result)?;

        let records: HashMap<String, DnsRecord> = sections
            .into_iter()
            .filter_map(|(key, section)| Some((key, section.into_record()?)))
            .collect();

        debug!(?records, "current records");
        Ok(records)
    }

    /// Create one section per record, then commit
    ///
    /// Fails fast on the first error, leaving earlier records applied.
    pub async fn add(&self, records: &[DnsRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        for record in records {
            self.add_section(record).await?;
        }

        self.commit().await?;
        debug!(?records, "added records");
        Ok(())
    }

    /// Replace the matching section of every record, then commit
    ///
    /// Matching is consume-once: every remote entry settles at most one
    /// pending record, the first one whose key matches. Records left
    /// unmatched after the full scan fail the call and nothing is committed.
    pub async fn update(&self, records: Vec<DnsRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let current = self.records().await?;
        let mut pending = records;

        for (key, stored) in &current {
            if let Some(index) = pending.iter().position(|r| r.matches(stored)) {
                self.client.uci("delete", &[CONFIG_GROUP, key]).await?;
                let record = pending.remove(index);
                self.add_section(&record).await?;
                debug!(?record, "updated record");
            }
        }

        if !pending.is_empty() {
            return Err(Error::RecordsNotFound(pending));
        }

        self.commit().await
    }

    /// Delete the matching section of every record, then commit
    ///
    /// Same matching strategy and unmatched-leftover failure as [`update`],
    /// without the re-add.
    ///
    /// [`update`]: UciStore::update
    pub async fn delete(&self, records: Vec<DnsRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let current = self.records().await?;
        let mut pending = records;

        for (key, stored) in &current {
            if let Some(index) = pending.iter().position(|r| r.matches(stored)) {
                self.client.uci("delete", &[CONFIG_GROUP, key]).await?;
                pending.remove(index);
                debug!(record = ?stored, "deleted record");
            }
        }

        if !pending.is_empty() {
            return Err(Error::RecordsNotFound(pending));
        }

        self.commit().await
    }

    /// Create one section of the record's kind and set its fields
    async fn add_section(&self, record: &DnsRecord) -> Result<()> {
        record.validate()?;

        match record {
            DnsRecord::A { name, address } => {
                let key = self.client.uci("add", &[CONFIG_GROUP, KIND_DOMAIN]).await?;
                self.client
                    .uci("set", &[CONFIG_GROUP, &key, "name", name])
                    .await?;
                self.client
                    .uci("set", &[CONFIG_GROUP, &key, "ip", address])
                    .await?;
            }
            DnsRecord::Cname { alias, target } => {
                let key = self.client.uci("add", &[CONFIG_GROUP, KIND_CNAME]).await?;
                self.client
                    .uci("set", &[CONFIG_GROUP, &key, "cname", alias])
                    .await?;
                self.client
                    .uci("set", &[CONFIG_GROUP, &key, "target", target])
                    .await?;
            }
        }

        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.client.uci("commit", &[CONFIG_GROUP]).await?;
        Ok(())
    }
}
