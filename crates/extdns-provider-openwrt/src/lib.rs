// # OpenWrt external-dns Provider
//
// Bridges the external-dns webhook contract to an OpenWrt router. DNS
// records live as `domain`/`cname` sections of the router's `dhcp` UCI
// configuration group and are manipulated over the LuCI JSON-RPC endpoint.
//
// The provider keeps no state of its own: every reconciliation re-reads the
// full remote table, and the only thing cached between requests is the LuCI
// session token held by [`lucirpc::LuciClient`]. Consistency against the
// router is best effort — concurrent reconciliations are not serialized
// here and the last writer wins.

pub mod lucirpc;
pub mod uci;

use async_trait::async_trait;
use extdns_core::endpoint::{Changes, Endpoint};
use extdns_core::record::endpoints_to_records;
use extdns_core::{Provider, Result};
use tracing::debug;

pub use lucirpc::{LuciClient, LuciConfig};
pub use uci::UciStore;

/// TTL attached to every endpoint produced from the remote table
const DEFAULT_TTL: i64 = 300;

/// external-dns provider backed by an OpenWrt router
pub struct OpenWrtProvider {
    store: UciStore,
}

impl OpenWrtProvider {
    /// Build a provider from validated connection settings
    pub fn new(config: LuciConfig) -> Result<Self> {
        config.validate()?;
        let client = LuciClient::new(config)?;

        Ok(Self {
            store: UciStore::new(client),
        })
    }
}

#[async_trait]
impl Provider for OpenWrtProvider {
    async fn records(&self) -> Result<Vec<Endpoint>> {
        let records = self.store.records().await?;

        Ok(records
            .into_values()
            .map(|record| record.to_endpoint(DEFAULT_TTL))
            .collect())
    }

    async fn apply_changes(&self, changes: Changes) -> Result<()> {
        debug!(
            create = changes.create.len(),
            update_old = changes.update_old.len(),
            update_new = changes.update_new.len(),
            delete = changes.delete.len(),
            "apply changes"
        );

        // Pre-flight read of the remote table; the result is discarded.
        self.store.records().await?;

        self.store
            .add(&endpoints_to_records(&changes.create))
            .await?;
        self.store
            .update(endpoints_to_records(&changes.update_old))
            .await?;
        self.store
            .update(endpoints_to_records(&changes.update_new))
            .await?;
        self.store
            .delete(endpoints_to_records(&changes.delete))
            .await?;

        Ok(())
    }
}
