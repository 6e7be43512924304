//! Source adapters, one per upstream inventory.
//!
//! Each adapter maps its inventory's native schema onto [`ToolCandidate`]
//! records. Adapters share no state and expose a single capability —
//! "produce candidates" — so the merge stage treats them uniformly.
//! Individual malformed entries are skipped with a logged diagnostic; an
//! adapter only fails as a whole when its upstream is unreachable.

pub mod landscape;
pub mod manual;
pub mod opensustain;
pub mod opentools;

use crate::Result;
use crate::candidate::{SourceTag, ToolCandidate};
use async_trait::async_trait;

/// Tool categories recognized by the inventory. Entries from category-aware
/// inventories are kept only when they intersect this set.
pub const TOOL_TYPES: [&str; 4] = ["production-cost", "capacity-expansion", "power-flow", "other"];

/// An upstream inventory that can produce candidate records.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Tag stamped onto every candidate this adapter produces.
    fn tag(&self) -> SourceTag;

    /// Fetch the inventory and map it to candidate records.
    async fn fetch(&self, http: &reqwest::Client) -> Result<Vec<ToolCandidate>>;
}

/// The remote adapters, in upstream concatenation order. The manually
/// curated list is loaded separately since it validates against URLs already
/// collected by these.
#[must_use]
pub fn remote_adapters() -> Vec<Box<dyn SourceAdapter>> {
    vec![
        Box::new(landscape::Landscape),
        Box::new(opensustain::OpenSustain),
        Box::new(opentools::OpenTools),
    ]
}
