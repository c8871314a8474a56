//! Websocket push adapter for the `/streaming` endpoint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use crate::domain::Note;
use crate::transport::{PushAdapter, PushEvent, PushTopic, Subscription};

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Exponential backoff between reconnection attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl ReconnectPolicy {
    pub fn delay(&self, attempts: u32) -> Duration {
        let factor = 1u32 << attempts.min(6);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

pub struct StreamPushAdapter {
    stream_url: Url,
    reconnect: ReconnectPolicy,
}

impl StreamPushAdapter {
    pub fn new(origin: &Url, credential: &str, reconnect: ReconnectPolicy) -> Self {
        Self {
            stream_url: streaming_url(origin, credential),
            reconnect,
        }
    }
}

/// `https://host` becomes `wss://host/streaming?i=credential`.
pub fn streaming_url(origin: &Url, credential: &str) -> Url {
    let mut url = origin.clone();
    let scheme = if origin.scheme() == "http" { "ws" } else { "wss" };
    // http(s) -> ws(s) stays within the special schemes, so this cannot fail
    let _ = url.set_scheme(scheme);
    url.set_path("/streaming");
    url.set_fragment(None);
    url.query_pairs_mut().clear().append_pair("i", credential);
    url
}

impl PushAdapter for StreamPushAdapter {
    fn subscribe(&self, topic: &PushTopic) -> Subscription {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let channel_id = format!(
            "notestream-{}",
            NEXT_CHANNEL_ID.fetch_add(1, Ordering::SeqCst)
        );

        let task = tokio::spawn(connection_loop(
            self.stream_url.clone(),
            topic.clone(),
            channel_id,
            self.reconnect,
            event_tx,
        ));

        Subscription::new(event_rx, task)
    }
}

/// Keeps a connection up until the subscriber goes away.
async fn connection_loop(
    stream_url: Url,
    topic: PushTopic,
    channel_id: String,
    reconnect: ReconnectPolicy,
    event_tx: mpsc::UnboundedSender<PushEvent>,
) {
    let mut attempts = 0u32;

    loop {
        match run_connection(&stream_url, &topic, &channel_id, &event_tx, &mut attempts).await {
            Ok(()) => tracing::debug!(channel = %topic.channel, "Stream closed"),
            Err(e) => tracing::debug!(channel = %topic.channel, "Stream failed: {:#}", e),
        }

        if event_tx.send(PushEvent::Disconnected).is_err() {
            break;
        }

        let delay = reconnect.delay(attempts);
        attempts = attempts.saturating_add(1);
        tracing::debug!(
            channel = %topic.channel,
            attempt = attempts,
            "Reconnecting in {:?}",
            delay
        );
        tokio::time::sleep(delay).await;
    }
}

async fn run_connection(
    stream_url: &Url,
    topic: &PushTopic,
    channel_id: &str,
    event_tx: &mpsc::UnboundedSender<PushEvent>,
    attempts: &mut u32,
) -> Result<()> {
    let (ws_stream, _) = connect_async(stream_url.as_str())
        .await
        .context("Failed to connect to streaming endpoint")?;

    *attempts = 0;
    if event_tx.send(PushEvent::Connected).is_err() {
        return Ok(());
    }

    let (mut write, mut read) = ws_stream.split();

    let connect = OutgoingMessage::connect(topic, channel_id);
    let msg = Message::Text(serde_json::to_string(&connect)?.into());
    write
        .send(msg)
        .await
        .context("Failed to send channel connect")?;

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Some(note) = parse_channel_note(text.as_str(), channel_id) {
                    if event_tx.send(PushEvent::Note(note)).is_err() {
                        return Ok(());
                    }
                }
            }
            Ok(Message::Ping(data)) => {
                write
                    .send(Message::Pong(data))
                    .await
                    .context("Failed to answer ping")?;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => return Err(e).context("Streaming connection error"),
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct OutgoingMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    body: ConnectBody<'a>,
}

#[derive(Debug, Serialize)]
struct ConnectBody<'a> {
    channel: &'a str,
    id: &'a str,
    params: &'a Map<String, Value>,
}

impl<'a> OutgoingMessage<'a> {
    fn connect(topic: &'a PushTopic, channel_id: &'a str) -> Self {
        Self {
            kind: "connect",
            body: ConnectBody {
                channel: &topic.channel,
                id: channel_id,
                params: &topic.params,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    body: Value,
}

#[derive(Debug, Deserialize)]
struct ChannelBody {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    body: Value,
}

/// Extract a note addressed to `channel_id`, ignoring everything else.
fn parse_channel_note(text: &str, channel_id: &str) -> Option<Note> {
    let message: IncomingMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::trace!("Ignoring unparsable frame: {}", e);
            return None;
        }
    };
    if message.kind != "channel" {
        return None;
    }
    let channel: ChannelBody = serde_json::from_value(message.body).ok()?;
    if channel.id != channel_id || channel.kind != "note" {
        return None;
    }
    serde_json::from_value(channel.body).ok()
}
