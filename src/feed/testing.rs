//! In-memory adapters for exercising sessions and the registry.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::domain::{Note, RemoteSession};
use crate::feed::{FeedError, FeedSession, FeedView};
use crate::transport::{
    Adapters, ChannelHandle, PullAdapter, PullParams, PushAdapter, PushEvent, PushTopic,
    Subscription, Transport, TransportError,
};

type PageResult = Result<Vec<Note>, TransportError>;

enum Scripted {
    Ready(PageResult),
    Gated(oneshot::Receiver<PageResult>),
}

/// Answers pulls from a queue; an empty queue answers with an empty page.
#[derive(Default)]
pub struct ScriptedPull {
    responses: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<(String, PullParams)>>,
}

impl ScriptedPull {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, ids: &[&str]) {
        self.push(Scripted::Ready(Ok(notes(ids))));
    }

    pub fn fail(&self, error: TransportError) {
        self.push(Scripted::Ready(Err(error)));
    }

    /// The next pull waits until the returned sender fires.
    pub fn gate(&self) -> oneshot::Sender<PageResult> {
        let (tx, rx) = oneshot::channel();
        self.push(Scripted::Gated(rx));
        tx
    }

    pub fn calls(&self) -> Vec<(String, PullParams)> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, scripted: Scripted) {
        self.responses.lock().unwrap().push_back(scripted);
    }
}

#[async_trait]
impl PullAdapter for ScriptedPull {
    async fn pull(&self, endpoint: &str, params: &PullParams) -> PageResult {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), params.clone()));
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Ready(result)) => result,
            Some(Scripted::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(TransportError::Network("gate dropped".into()))),
            None => Ok(Vec::new()),
        }
    }
}

struct CloseCounter(Arc<AtomicUsize>);

impl ChannelHandle for CloseCounter {
    fn close(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Push adapter driven by the test through [`ManualPush::emit`].
#[derive(Default)]
pub struct ManualPush {
    senders: Mutex<Vec<mpsc::UnboundedSender<PushEvent>>>,
    topics: Mutex<Vec<PushTopic>>,
    disposed: Arc<AtomicUsize>,
}

impl ManualPush {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Deliver to the most recent subscription.
    pub fn emit(&self, event: PushEvent) {
        if let Some(tx) = self.senders.lock().unwrap().last() {
            let _ = tx.send(event);
        }
    }

    pub fn emit_to(&self, subscription: usize, event: PushEvent) {
        if let Some(tx) = self.senders.lock().unwrap().get(subscription) {
            let _ = tx.send(event);
        }
    }

    pub fn subscribe_count(&self) -> usize {
        self.senders.lock().unwrap().len()
    }

    pub fn dispose_count(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn topics(&self) -> Vec<PushTopic> {
        self.topics.lock().unwrap().clone()
    }
}

impl PushAdapter for ManualPush {
    fn subscribe(&self, topic: &PushTopic) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().unwrap().push(tx);
        self.topics.lock().unwrap().push(topic.clone());
        Subscription::new(rx, CloseCounter(self.disposed.clone()))
    }
}

/// Hands out the same scripted adapters and counts sessions created.
pub struct CountingTransport {
    pub pull: Arc<ScriptedPull>,
    pub push: Arc<ManualPush>,
    connects: AtomicUsize,
}

impl CountingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pull: ScriptedPull::new(),
            push: ManualPush::new(),
            connects: AtomicUsize::new(0),
        })
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Transport for CountingTransport {
    fn connect(&self, _remote: &RemoteSession) -> Result<Adapters, FeedError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Adapters {
            pull: self.pull.clone(),
            push: self.push.clone(),
        })
    }
}

pub fn notes(ids: &[&str]) -> Vec<Note> {
    ids.iter().map(|id| Note::new(*id)).collect()
}

pub fn ids(notes: &[Note]) -> Vec<&str> {
    notes.iter().map(|n| n.id.as_str()).collect()
}

/// Wait (bounded) until the session's view satisfies `pred`.
pub async fn wait_for(session: &FeedSession, pred: impl Fn(&FeedView) -> bool) -> FeedView {
    let mut rx = session.watch();
    let view = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|v| pred(v)))
        .await
        .expect("timed out waiting for feed view")
        .expect("feed session dropped");
    FeedView::clone(&view)
}
