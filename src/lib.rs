//! # Notestream
//!
//! A live mirror of Misskey-compatible timelines.
//!
//! ## Architecture
//!
//! Each feed is served by a session that merges two sources into one
//! newest-first buffer:
//!
//! ```text
//! Pull (HTTP pages) ─┐
//!                    ├→ FeedSession → FeedView → CLI
//! Push (streaming) ──┘
//! ```
//!
//! - [`transport`]: HTTP pagination and websocket streaming adapters
//! - [`feed`]: Dispatcher, session state machine and shared registry
//!
//! ## Quick Start
//!
//! ```bash
//! # Show the configured servers
//! notestream servers
//!
//! # Print three pages of the local timeline
//! notestream page local --pages 3
//!
//! # Follow a list live
//! notestream --server main watch list 9abcdef
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Application context and error types
//! - [`cli`]: Command-line interface definitions
//! - [`config`]: TOML configuration
//! - [`domain`]: Notes, feed descriptors and remote sessions
//! - [`feed`]: Feed sessions and their registry
//! - [`transport`]: Network adapters

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the config,
/// the feed registry and the current server selection.
pub mod app;

/// Command-line interface using clap.
///
/// - `servers` - List configured servers
/// - `page <kind> [param]` - Print pages of a feed
/// - `watch <kind> [param]` - Follow a feed live
pub mod cli;

/// Configuration loaded from `~/.config/notestream/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Note`](domain::Note): An opaque note record keyed by id
/// - [`FeedDescriptor`](domain::FeedDescriptor): Which feed to open
/// - [`RemoteSession`](domain::RemoteSession): Server origin and token
pub mod domain;

/// Feed sessions: dispatch, buffering, state and sharing.
pub mod feed;

/// Pull and push adapters for Misskey-compatible servers.
pub mod transport;
