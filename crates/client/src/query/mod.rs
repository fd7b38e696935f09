//! Query/cache layer.
//!
//! Reads are addressed by a [`QueryKey`] and cached in a [`QueryCache`].
//! Mutations declare which [`QueryFamily`]s they invalidate through
//! [`Mutation::invalidates`].

pub mod cache;
pub mod invalidation;
pub mod key;

pub use cache::{Fetcher, QueryCache, QueryObserver, QuerySnapshot, QueryStatus, WeakQueryCache};
pub use invalidation::Mutation;
pub use key::{CacheValue, QueryFamily, QueryKey};
