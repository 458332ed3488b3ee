//! The decomposition trait implemented by every format handler.

use async_trait::async_trait;

use crate::data::{Children, Data};
use crate::error::DecomposeError;

/// A format handler that turns one [`Data`] node into child nodes.
///
/// `target_score` is the selection mechanism: `None` means "not mine",
/// `Some(score)` bids for the node, and the lowest score wins with earlier
/// registration breaking ties. Structural handlers (extension or MIME match)
/// bid `-1`; catch-all delegates bid high positive scores so they only run
/// when nothing structural matched.
#[async_trait]
pub trait Decomposer: Send + Sync {
    /// Stable handler name, used for registry lookup and configuration.
    fn name(&self) -> &str;

    /// Bid on a node, or decline with `None`.
    fn target_score(&self, data: &Data) -> Option<i32>;

    /// Decompose `data` into children pushed onto the sink. Pushing nothing
    /// is valid and means the node yielded no text.
    async fn decompose(&self, data: &Data, children: &mut Children)
        -> Result<(), DecomposeError>;
}
