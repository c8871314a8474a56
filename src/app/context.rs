use std::sync::{Arc, Mutex, PoisonError};

use crate::app::error::{NotestreamError, Result};
use crate::config::Config;
use crate::domain::RemoteSession;
use crate::feed::FeedRegistry;
use crate::transport::{MisskeyTransport, Transport};

/// The last server picked by the user, shared by everything holding the
/// context.
#[derive(Debug, Default)]
pub struct ServerSelection {
    current: Mutex<Option<String>>,
}

impl ServerSelection {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            current: Mutex::new(initial),
        }
    }

    pub fn current(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn select(&self, name: &str) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(name.to_string());
    }
}

/// How the user asked to reach a server.
#[derive(Debug, Clone, Default)]
pub struct ServerTarget {
    pub server: Option<String>,
    pub origin: Option<String>,
    pub credential: Option<String>,
}

pub struct AppContext {
    pub config: Config,
    pub registry: FeedRegistry,
    pub selection: ServerSelection,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let transport = MisskeyTransport::new(&config.transport, config.feed.page_limit)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        let registry = FeedRegistry::new(transport, config.feed.clone());
        let selection = ServerSelection::new(config.default_server.clone());
        Self {
            config,
            registry,
            selection,
        }
    }

    /// Pick the remote to talk to: explicit origin, then named server, then
    /// the current selection, then the first configured server.
    pub fn resolve_remote(&self, target: &ServerTarget) -> Result<RemoteSession> {
        if let Some(origin) = &target.origin {
            return Ok(RemoteSession::new(
                origin.clone(),
                target.credential.clone().unwrap_or_default(),
            ));
        }

        let name = target
            .server
            .clone()
            .or_else(|| self.selection.current())
            .or_else(|| self.config.servers.first().map(|s| s.name.clone()))
            .ok_or_else(|| {
                NotestreamError::ServerNotFound(
                    "no servers configured; add one to the config file or pass --origin".into(),
                )
            })?;

        let server = self
            .config
            .server(&name)
            .ok_or_else(|| NotestreamError::ServerNotFound(name.clone()))?;
        self.selection.select(&server.name);

        let mut remote = server.remote();
        if let Some(credential) = &target.credential {
            remote.credential = credential.clone();
        }
        Ok(remote)
    }
}
