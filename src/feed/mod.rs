//! The live feed synchronisation engine.
//!
//! ```text
//! FeedDescriptor → dispatcher::resolve → FeedRegistry → FeedSession → FeedView
//! ```
//!
//! - [`dispatcher`]: descriptor to pull endpoint and push channel
//! - [`FeedSession`]: merges paginated history with live notes
//! - [`FeedRegistry`]: shares one session between equal feed requests
//! - [`FeedError`]: the error classification attached to a session

pub mod buffer;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{FeedConfig, InitialPagePolicy};
pub use dispatcher::{resolve, FeedRoute};
pub use error::FeedError;
pub use registry::{FeedHandle, FeedRegistry};
pub use session::{ConnectionState, FeedSession, FeedView, PullOutcome, PullState};
