//! Maps a [`FeedDescriptor`] to the pull endpoint and push channel serving it.

use serde_json::{Map, Value};

use crate::domain::{FeedDescriptor, FeedKind};
use crate::feed::FeedError;
use crate::transport::PushTopic;

/// Everything a session needs to know about where its notes come from.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRoute {
    pub kind: FeedKind,
    pub pull_endpoint: &'static str,
    pub pull_params: Map<String, Value>,
    /// `None` for feeds the server offers no channel for.
    pub push: Option<PushTopic>,
}

struct KindRoute {
    endpoint: &'static str,
    channel: Option<&'static str>,
    parameter_key: Option<&'static str>,
}

fn kind_route(kind: FeedKind) -> KindRoute {
    match kind {
        FeedKind::Home => KindRoute {
            endpoint: "notes/timeline",
            channel: Some("homeTimeline"),
            parameter_key: None,
        },
        FeedKind::Local => KindRoute {
            endpoint: "notes/local-timeline",
            channel: Some("localTimeline"),
            parameter_key: None,
        },
        FeedKind::Social => KindRoute {
            endpoint: "notes/hybrid-timeline",
            channel: Some("hybridTimeline"),
            parameter_key: None,
        },
        FeedKind::Global => KindRoute {
            endpoint: "notes/global-timeline",
            channel: Some("globalTimeline"),
            parameter_key: None,
        },
        FeedKind::List => KindRoute {
            endpoint: "notes/user-list-timeline",
            channel: Some("userList"),
            parameter_key: Some("listId"),
        },
        FeedKind::User => KindRoute {
            endpoint: "users/notes",
            channel: None,
            parameter_key: Some("userId"),
        },
    }
}

/// Resolve a descriptor without touching the network.
///
/// Fails with [`FeedError::Configuration`] when `list`/`user` lack their
/// parameter.
pub fn resolve(descriptor: &FeedDescriptor) -> Result<FeedRoute, FeedError> {
    let route = kind_route(descriptor.kind);
    let mut params = Map::new();

    if let Some(key) = route.parameter_key {
        let parameter = descriptor
            .parameter
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                FeedError::Configuration(format!(
                    "The {} feed requires {} to be set.",
                    descriptor.kind, key
                ))
            })?;
        params.insert(key.into(), Value::String(parameter.to_string()));
    }

    if let Some(with_files) = descriptor.options.with_files {
        params.insert("withFiles".into(), Value::Bool(with_files));
    }
    if let Some(with_replies) = descriptor.options.with_replies {
        params.insert("withReplies".into(), Value::Bool(with_replies));
    }

    let push = route.channel.map(|channel| PushTopic {
        channel: channel.to_string(),
        params: params.clone(),
    });

    Ok(FeedRoute {
        kind: descriptor.kind,
        pull_endpoint: route.endpoint,
        pull_params: params,
        push,
    })
}
