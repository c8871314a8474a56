//! Reference-counted cache of feed sessions.
//!
//! Equal `(remote, descriptor)` pairs share one [`FeedSession`]. The session
//! is opened on the first [`FeedRegistry::acquire`] and disposed when the
//! last [`FeedHandle`] is released or dropped.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::{FeedDescriptor, RemoteSession};
use crate::feed::config::FeedConfig;
use crate::feed::dispatcher;
use crate::feed::{FeedError, FeedSession};
use crate::transport::Transport;

type FeedKey = (RemoteSession, FeedDescriptor);

/// Requests for the same server and route map to one key.
fn feed_key(remote: &RemoteSession, descriptor: &FeedDescriptor) -> Result<FeedKey, FeedError> {
    Ok((remote.normalized()?, descriptor.normalized()))
}

struct Entry {
    session: FeedSession,
    refs: usize,
}

struct RegistryInner {
    transport: Arc<dyn Transport>,
    config: FeedConfig,
    sessions: Mutex<HashMap<FeedKey, Entry>>,
}

impl RegistryInner {
    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<FeedKey, Entry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, key: &FeedKey) {
        let mut sessions = self.lock_sessions();
        let Some(entry) = sessions.get_mut(key) else {
            return;
        };
        entry.refs -= 1;
        if entry.refs == 0 {
            if let Some(entry) = sessions.remove(key) {
                tracing::debug!("Last consumer of {} on {} released", key.1, key.0.origin);
                entry.session.dispose();
            }
        }
    }
}

#[derive(Clone)]
pub struct FeedRegistry {
    inner: Arc<RegistryInner>,
}

impl FeedRegistry {
    pub fn new(transport: Arc<dyn Transport>, config: FeedConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                transport,
                config,
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Get a handle to the session for this feed, opening it if needed.
    ///
    /// Configuration problems are reported here, before any network I/O.
    /// Must be called inside a tokio runtime.
    pub fn acquire(
        &self,
        remote: &RemoteSession,
        descriptor: &FeedDescriptor,
    ) -> Result<FeedHandle, FeedError> {
        remote.validate()?;
        let route = dispatcher::resolve(descriptor)?;
        let key = feed_key(remote, descriptor)?;

        let mut sessions = self.inner.lock_sessions();
        if let Some(entry) = sessions.get_mut(&key) {
            entry.refs += 1;
            tracing::debug!(
                "Sharing {} on {} ({} consumers)",
                key.1,
                key.0.origin,
                entry.refs
            );
            let session = entry.session.clone();
            return Ok(FeedHandle::new(self.inner.clone(), key, session));
        }

        let adapters = self.inner.transport.connect(&key.0)?;
        let session = FeedSession::open(&key.0.origin, route, adapters, &self.inner.config);
        sessions.insert(
            key.clone(),
            Entry {
                session: session.clone(),
                refs: 1,
            },
        );
        Ok(FeedHandle::new(self.inner.clone(), key, session))
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.inner.lock_sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ref_count(&self, remote: &RemoteSession, descriptor: &FeedDescriptor) -> usize {
        let Ok(key) = feed_key(remote, descriptor) else {
            return 0;
        };
        self.inner
            .lock_sessions()
            .get(&key)
            .map_or(0, |entry| entry.refs)
    }
}

/// A consumer's claim on a shared session. Released exactly once, either
/// explicitly or on drop.
pub struct FeedHandle {
    registry: Arc<RegistryInner>,
    key: FeedKey,
    session: FeedSession,
    released: bool,
}

impl FeedHandle {
    fn new(registry: Arc<RegistryInner>, key: FeedKey, session: FeedSession) -> Self {
        Self {
            registry,
            key,
            session,
            released: false,
        }
    }

    pub fn session(&self) -> &FeedSession {
        &self.session
    }

    pub fn descriptor(&self) -> &FeedDescriptor {
        &self.key.1
    }

    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.registry.release(&self.key);
        }
    }
}

impl Deref for FeedHandle {
    type Target = FeedSession;

    fn deref(&self) -> &FeedSession {
        &self.session
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.release_once();
    }
}
