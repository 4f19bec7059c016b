// # Provider Trait
//
// Defines the interface the webhook HTTP layer drives. The four methods map
// one-to-one onto the external-dns webhook routes: negotiate, list records,
// apply changes, adjust endpoints.

use crate::endpoint::{Changes, DomainFilter, Endpoint};
use crate::error::Result;
use async_trait::async_trait;

/// Trait for DNS provider implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe: the webhook layer drives one
/// concurrent call per inbound request against a shared instance.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Current records held by the backing store
    async fn records(&self) -> Result<Vec<Endpoint>>;

    /// Apply a batch of desired changes to the backing store
    ///
    /// Changes are not transactional: a failing step aborts the batch and
    /// leaves earlier steps applied.
    async fn apply_changes(&self, changes: Changes) -> Result<()>;

    /// Rewrite endpoints external-dns is about to request
    ///
    /// The default implementation passes endpoints through unchanged.
    async fn adjust_endpoints(&self, endpoints: Vec<Endpoint>) -> Result<Vec<Endpoint>> {
        Ok(endpoints)
    }

    /// Domain filter advertised during negotiation
    ///
    /// The default implementation places no restriction on domains.
    fn domain_filter(&self) -> DomainFilter {
        DomainFilter::default()
    }
}
