//! Core traits defined in `kite-core` and implemented by other crates.

pub mod cache;
pub mod events;

pub use cache::CacheProvider;
pub use events::EventSink;
