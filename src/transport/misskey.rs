use std::sync::Arc;

use reqwest::Client;

use crate::domain::RemoteSession;
use crate::feed::FeedError;
use crate::transport::{
    Adapters, HttpPullAdapter, ReconnectPolicy, StreamPushAdapter, Transport, TransportConfig,
};

/// Builds HTTP pull and websocket push adapters sharing one HTTP client.
pub struct MisskeyTransport {
    client: Client,
    page_limit: u32,
    reconnect: ReconnectPolicy,
}

impl MisskeyTransport {
    pub fn new(config: &TransportConfig, page_limit: u32) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            page_limit,
            reconnect: ReconnectPolicy {
                base_delay: config.reconnect_base_delay(),
                max_delay: config.max_reconnect_delay(),
            },
        })
    }
}

impl Transport for MisskeyTransport {
    fn connect(&self, remote: &RemoteSession) -> Result<Adapters, FeedError> {
        let origin = remote.origin_url()?;
        Ok(Adapters {
            pull: Arc::new(HttpPullAdapter::new(
                self.client.clone(),
                &origin,
                &remote.credential,
                self.page_limit,
            )),
            push: Arc::new(StreamPushAdapter::new(
                &origin,
                &remote.credential,
                self.reconnect,
            )),
        })
    }
}
