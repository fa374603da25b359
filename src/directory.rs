use crate::models::{FacetCount, FacetKind, Station};
use crate::query::SearchQuery;
use anyhow::Result;
use async_trait::async_trait;

/// Remote station directory as seen by the discovery core.
///
/// Both calls are idempotent reads. A non-success response must surface as
/// an error rather than an empty list.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Raw `{name, population}` records for one facet.
    async fn fetch_facet(&self, kind: FacetKind) -> Result<Vec<FacetCount>>;

    /// Raw, unvalidated search results in directory order.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Station>>;
}
