//! Rendercache
//!
//! A scoped, event-invalidated cache core for hierarchically addressed
//! content renderings. Given a request for a resource rendered by some
//! component (its "resource type"), the crate:
//!
//! - derives a deterministic cache key whose granularity is configurable
//!   per component ([`generate_key`], [`CacheScope`])
//! - resolves an invalidation policy describing which future content-change
//!   notifications must evict the cached rendering
//!   ([`ConfigurationResolver`])
//! - tracks, per cached entry, whether a matching change notification has
//!   arrived, combined with a time-based expiry ([`RefreshPolicyEngine`])
//!
//! The key/value store that holds rendered output, the content-repository
//! tree, and the web-request abstraction are external collaborators,
//! consumed through the traits in [`collab`].
//!
//! ## Configuration
//!
//! Cache behavior is controlled by [`CacheSettings`], typically embedded in
//! the host's configuration file:
//!
//! ```toml
//! [cache]
//! enabled = true
//! default_ttl_seconds = 3600
//! ```

mod bus;
mod collab;
mod config;
mod definition;
mod error;
mod key;
mod lock;
mod pattern;
mod refresh;
mod registry;
mod resolver;

pub use bus::{ChangeBus, ChangeListener, SubscriptionId};
pub use collab::{ContentTreeReader, PropertyValue, RequestContext, ResourceNode};
pub use config::CacheSettings;
pub use definition::ResourceTypeCacheDefinition;
pub use error::CacheError;
pub use key::{CacheScope, generate_key};
pub use pattern::InvalidationPattern;
pub use refresh::{CacheEntryEvent, FlushScope, RefreshPolicyEngine};
pub use registry::DefinitionRegistry;
pub use resolver::{CacheConfiguration, ConfigurationResolver};
