//! Cache module for storing API responses to disk
//!
//! Raw API responses are kept in a [`PersistentStore`] saved as a single JSON
//! file. [`CachedFetcher`] serves them while they are younger than the expiry
//! configured for their [`ResourceCategory`], and [`check_freshness`] uses the
//! updated mods feed to keep expensive per-mod resources without refetching
//! them.

mod fetch;
mod freshness;
mod key;
mod policy;
mod store;

pub use fetch::CachedFetcher;
pub use freshness::{check_freshness, ChangeField, Freshness, TrackedResource, FEED_HORIZON_DAYS};
pub use key::CacheKey;
pub use policy::{ExpiryOverrides, ExpiryPolicy, PolicyError, ResourceCategory};
pub use store::{EntryContext, PersistentStore, StoreError};
