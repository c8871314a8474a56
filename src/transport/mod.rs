//! Transport adapters for a remote server.
//!
//! Each server gets two independent adapters:
//!
//! ```text
//! PullAdapter  - request/response, cursor paginated history
//! PushAdapter  - persistent subscription delivering new notes
//! ```
//!
//! Both reject with a typed [`TransportError`]; classification into the
//! feed error taxonomy happens once, in [`crate::feed::FeedError`].

mod config;
pub mod http_pull;
pub mod misskey;
pub mod stream_push;

pub use config::TransportConfig;
pub use http_pull::HttpPullAdapter;
pub use misskey::MisskeyTransport;
pub use stream_push::{ReconnectPolicy, StreamPushAdapter};

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::{Note, RemoteSession};
use crate::feed::FeedError;

/// Parameters for one page of history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PullParams {
    /// Only return notes strictly older than this id
    pub cursor: Option<String>,
    /// Endpoint specific parameters (list id, filters, ...)
    pub extra: Map<String, Value>,
}

/// A push subscription target: channel name plus its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PushTopic {
    pub channel: String,
    pub params: Map<String, Value>,
}

/// Typed rejection from a transport adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("API error {code} (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait PullAdapter: Send + Sync {
    /// Fetch one page, newest first. An empty page means there is nothing older.
    async fn pull(&self, endpoint: &str, params: &PullParams) -> Result<Vec<Note>, TransportError>;
}

/// Events delivered by a push subscription, in server emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Connected,
    Disconnected,
    Note(Note),
}

/// Something that can stop a live channel.
pub trait ChannelHandle: Send {
    fn close(&mut self);
}

impl ChannelHandle for JoinHandle<()> {
    fn close(&mut self) {
        self.abort();
    }
}

/// Owns the live side of a subscription. Disposing is idempotent and also
/// happens on drop.
pub struct SubscriptionGuard {
    handle: Option<Box<dyn ChannelHandle>>,
}

impl SubscriptionGuard {
    pub fn new(handle: impl ChannelHandle + 'static) -> Self {
        Self {
            handle: Some(Box::new(handle)),
        }
    }

    pub fn dispose(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.handle.is_none()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.dispose();
    }
}

pub struct Subscription {
    pub events: mpsc::UnboundedReceiver<PushEvent>,
    pub guard: SubscriptionGuard,
}

impl Subscription {
    pub fn new(
        events: mpsc::UnboundedReceiver<PushEvent>,
        handle: impl ChannelHandle + 'static,
    ) -> Self {
        Self {
            events,
            guard: SubscriptionGuard::new(handle),
        }
    }
}

pub trait PushAdapter: Send + Sync {
    /// Open a subscription. Reconnection after a drop is the adapter's job.
    fn subscribe(&self, topic: &PushTopic) -> Subscription;
}

/// The adapter pair for one remote session.
#[derive(Clone)]
pub struct Adapters {
    pub pull: Arc<dyn PullAdapter>,
    pub push: Arc<dyn PushAdapter>,
}

/// Builds adapters for a remote session. Must not touch the network.
pub trait Transport: Send + Sync {
    fn connect(&self, remote: &RemoteSession) -> Result<Adapters, FeedError>;
}
