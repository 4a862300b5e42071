//! Error taxonomy for fetching and loading packages.
//!
//! - [`FetchError`] describes a single network transfer into the disk cache.
//! - [`LoadError`] is what callers of the loader see. Its [`LoadErrorKind`]
//!   is the stable classification used by callbacks and aggregation.
//!
//! Both are `Clone` so one failure can be handed to every deduplicated waiter
//! and collected into a dependency aggregate.

mod fetch;
mod load;

pub use fetch::{FetchError, HTTP_CANCELLED_CODE, HTTP_TIMEOUT_CODE};
pub use load::{DependencyFailure, LoadError, LoadErrorKind, LoadResult};
