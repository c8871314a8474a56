use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The kinds of feed a server can be mirrored from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Home,
    Local,
    Social,
    Global,
    List,
    User,
}

impl FeedKind {
    pub const ALL: [FeedKind; 6] = [
        FeedKind::Home,
        FeedKind::Local,
        FeedKind::Social,
        FeedKind::Global,
        FeedKind::List,
        FeedKind::User,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeedKind::Home => "home",
            FeedKind::Local => "local",
            FeedKind::Social => "social",
            FeedKind::Global => "global",
            FeedKind::List => "list",
            FeedKind::User => "user",
        }
    }

    /// `list` needs a list id and `user` a user id.
    pub fn requires_parameter(self) -> bool {
        matches!(self, FeedKind::List | FeedKind::User)
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No matching feed kind: {0}")]
pub struct UnknownFeedKind(pub String);

impl FromStr for FeedKind {
    type Err = UnknownFeedKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        FeedKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| UnknownFeedKind(s.to_string()))
    }
}

/// Optional server-side filters. Unset fields are left to the server default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedOptions {
    pub with_files: Option<bool>,
    pub with_replies: Option<bool>,
}

/// Declarative description of a feed. Equal descriptors share one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedDescriptor {
    pub kind: FeedKind,
    #[serde(default)]
    pub parameter: Option<String>,
    #[serde(default)]
    pub options: FeedOptions,
}

impl FeedDescriptor {
    pub fn new(kind: FeedKind) -> Self {
        Self {
            kind,
            parameter: None,
            options: FeedOptions::default(),
        }
    }

    pub fn with_parameter(kind: FeedKind, parameter: impl Into<String>) -> Self {
        Self {
            kind,
            parameter: Some(parameter.into()),
            options: FeedOptions::default(),
        }
    }

    pub fn options(mut self, options: FeedOptions) -> Self {
        self.options = options;
        self
    }

    /// The descriptor with its parameter trimmed, and dropped for kinds that
    /// take none. Descriptors naming the same route normalize equal.
    pub fn normalized(&self) -> FeedDescriptor {
        let parameter = self
            .parameter
            .as_deref()
            .map(str::trim)
            .filter(|p| self.kind.requires_parameter() && !p.is_empty())
            .map(String::from);
        FeedDescriptor {
            kind: self.kind,
            parameter,
            options: self.options.clone(),
        }
    }
}

impl fmt::Display for FeedDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parameter {
            Some(parameter) => write!(f, "{}:{}", self.kind, parameter),
            None => write!(f, "{}", self.kind),
        }
    }
}
