//!
//! reading-progress: remember where a reader left off and take them back there.
//!
//! ## Core Concepts
//!
//! * **Positions (`store::PositionRecord`)**: The last vertical offset read on a page, with the time it was written.
//! * **Store (`store::ProgressStore`)**: A bounded mapping from page to position kept as one JSON value in a key-value medium. Capped by count and swept by age.
//! * **Media (`backend::Medium`)**: The pluggable synchronous string store underneath, e.g. a browser's local storage.
//! * **Coalescer (`coalescer::Coalescer`)**: Turns the scroll event stream into occasional samples and even rarer commits.
//! * **Resolver (`resolver::resolve`)**: Decides between a remembered offset and the anchor the reader arrived by.
//! * **Manager (`lifecycle::ProgressManager`)**: Wires the above to one page load through the `host::Host` capability trait.
//!
//! ## Example
//!
//! ```
//! use reading_progress::{Host, InMemory, PageEvent, ProgressConfig, ProgressManager};
//! use tokio::time::Instant;
//!
//! struct Page { offset: u64 }
//!
//! impl Host for Page {
//!     fn location(&self) -> String { "https://blog.example/post".into() }
//!     fn replace_location(&mut self, _location: &str) {}
//!     fn scroll_offset(&self) -> u64 { self.offset }
//!     fn scroll_to(&mut self, offset: u64) { self.offset = offset; }
//!     fn element_offset(&self, _id: &str) -> Option<u64> { None }
//!     fn request_frame(&mut self) {}
//! }
//!
//! let medium = InMemory::new();
//! let mut manager =
//!     ProgressManager::new(ProgressConfig::default(), medium.clone(), Page { offset: 0 }).unwrap();
//! let now = Instant::now();
//! manager.init(now);
//!
//! manager.host_mut().offset = 1200;
//! manager.handle_event(PageEvent::Scroll, now);
//! manager.handle_event(PageEvent::VisibilityHidden, now);
//!
//! let saved = manager.store().get(manager.page_key()).unwrap();
//! assert_eq!(saved.offset, 1200);
//! ```

pub mod backend;
pub mod clock;
pub mod coalescer;
pub mod config;
pub mod constants;
pub mod host;
pub mod lifecycle;
pub mod page;
pub mod resolver;
pub mod store;

pub use backend::{InMemory, Medium};
#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
pub use clock::{Clock, SystemClock};
pub use config::ProgressConfig;
pub use host::{Host, PageEvent};
pub use lifecycle::{LifecycleState, ProgressManager};
pub use page::{AnchorTarget, PageKey};
pub use store::{PositionMap, PositionRecord, ProgressStore};

/// Result type used throughout the reading-progress library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the reading-progress library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Structured medium errors from the backend module
    #[error(transparent)]
    Medium(backend::MediumError),

    /// Structured store errors from the store module
    #[error(transparent)]
    Store(store::StoreError),

    /// Structured resolution conditions from the resolver module
    #[error(transparent)]
    Resolve(resolver::ResolveError),

    /// Structured configuration errors from the config module
    #[error(transparent)]
    Config(config::ConfigError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Medium(_) => "backend",
            Error::Store(_) => "store",
            Error::Resolve(_) => "resolver",
            Error::Config(_) => "config",
        }
    }

    /// Check if stored content was unparsable.
    pub fn is_corrupt_data(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_corrupt_data(),
            _ => false,
        }
    }

    /// Check if the medium rejected a read or write.
    pub fn is_persistence_failure(&self) -> bool {
        match self {
            Error::Medium(_) => true,
            Error::Store(store_err) => store_err.is_persistence_failure(),
            _ => false,
        }
    }

    /// Check if an anchor named a missing element.
    pub fn is_invalid_anchor(&self) -> bool {
        match self {
            Error::Resolve(resolve_err) => resolve_err.is_invalid_anchor(),
            _ => false,
        }
    }

    /// Check if this error is configuration-related.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

impl From<backend::MediumError> for Error {
    fn from(err: backend::MediumError) -> Self {
        Error::Medium(err)
    }
}

impl From<store::StoreError> for Error {
    fn from(err: store::StoreError) -> Self {
        Error::Store(err)
    }
}

impl From<resolver::ResolveError> for Error {
    fn from(err: resolver::ResolveError) -> Self {
        Error::Resolve(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err)
    }
}
