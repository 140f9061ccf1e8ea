//! Offline support for the PWA shell.
//!
//! The browser worker (`assets/sw.js`) and the server share one policy: the same
//! origin allow-list, the same unsafe-URL heuristics and the same cache buckets.
//! The server applies that policy to `/static/*` through [`OfflineCache`] and
//! ships it to the worker as a JSON prelude of `/sw.js`.

mod cache;
mod messages;
mod policy;
mod static_fetcher;

pub use cache::*;
pub use messages::*;
pub use policy::*;
pub use static_fetcher::*;

/// The cache used by the `/static` routes.
pub type StaticAssetCache = OfflineCache<StaticDirFetcher>;
