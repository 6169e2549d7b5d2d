//! Sync orchestrators: sequence mapping, classification, comparison,
//! conversion and validation for each changed file.
//!
//! Two instances exist:
//! - [`ForwardSync`]: public repo -> docs repo, writing into a local docs checkout;
//! - [`BackwardSync`]: docs repo -> private repos, proposing changes as pull requests.
//!
//! Per file, both walk the same state machine:
//!
//! ```text
//! Mapped? -> CacheEligible? -> TargetExists? -> ContentDiffers? -> Converted -> Validated -> Committed
//! ```
//!
//! Any negative branch ends in a terminal report bucket without side
//! effects. Files are processed sequentially in change-list order; one
//! file failing is recorded in the errored bucket and the run moves on.
//!
//! # Callable From
//! - The CLI crate, and the scenario tests in `tests/`.
//! - Both orchestrators borrow their collaborators; the caller owns the
//!   classification cache and persists it after the run.

mod backward;
mod forward;

pub use backward::BackwardSync;
pub use forward::ForwardSync;

use tracing::info;

use crate::contract::TextGenerator;
use crate::normalize;
use crate::stages::Stages;

/// Decide whether `a` and `b` carry the same content.
///
/// Normalized equality is the fast path; the comparator is only asked when
/// the normalized texts differ. Returns the skip reason when they match.
pub(crate) async fn identical_content<G>(
    stages: &Stages,
    generator: &G,
    (a, label_a): (&str, &str),
    (b, label_b): (&str, &str),
) -> Option<String>
where
    G: TextGenerator + ?Sized,
{
    if normalize::equivalent(a, b) {
        info!("  -> Content is identical (after normalization)");
        return Some("identical content (after normalization)".to_string());
    }
    let verdict = stages.comparator.compare(generator, a, b, label_a, label_b).await;
    if verdict.identical {
        info!(reason = %verdict.reason, "  -> Comparator reports identical content");
        Some(format!("identical content ({})", verdict.reason))
    } else {
        info!(reason = %verdict.reason, "  -> Content differs");
        None
    }
}
