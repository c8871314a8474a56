use std::fmt;

use url::Url;

use crate::feed::FeedError;

/// A reachable server plus the credential to talk to it with.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RemoteSession {
    pub origin: String,
    pub credential: String,
}

impl RemoteSession {
    pub fn new(origin: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            credential: credential.into(),
        }
    }

    /// Reject blank origins and credentials before anything touches the network.
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.origin.trim().is_empty() {
            return Err(FeedError::Configuration(
                "No server configured. Add a server first.".into(),
            ));
        }
        if self.credential.trim().is_empty() {
            return Err(FeedError::Configuration(format!(
                "No credential configured for {}.",
                self.origin
            )));
        }
        Ok(())
    }

    /// The origin as a URL, assuming https when no scheme is given.
    pub fn origin_url(&self) -> Result<Url, FeedError> {
        let origin = self.origin.trim().trim_end_matches('/');
        let candidate = if origin.contains("://") {
            origin.to_string()
        } else {
            format!("https://{}", origin)
        };
        let url = Url::parse(&candidate).map_err(|e| {
            FeedError::Configuration(format!("Invalid server origin {}: {}", self.origin, e))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(FeedError::Configuration(format!(
                "Unsupported scheme {} in origin {}",
                other, self.origin
            ))),
        }
    }

    /// Same credential, origin rewritten to its canonical URL form without a
    /// trailing slash.
    pub fn normalized(&self) -> Result<RemoteSession, FeedError> {
        let url = self.origin_url()?;
        Ok(RemoteSession {
            origin: url.as_str().trim_end_matches('/').to_string(),
            credential: self.credential.clone(),
        })
    }
}

impl fmt::Debug for RemoteSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSession")
            .field("origin", &self.origin)
            .field("credential", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_origin() {
        let remote = RemoteSession::new("  ", "token");
        assert!(matches!(
            remote.validate(),
            Err(FeedError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_blank_credential() {
        let remote = RemoteSession::new("https://example.com", "");
        assert!(matches!(
            remote.validate(),
            Err(FeedError::Configuration(_))
        ));
    }

    #[test]
    fn test_origin_url_defaults_to_https() {
        let remote = RemoteSession::new("example.com/", "token");
        assert_eq!(
            remote.origin_url().unwrap().as_str(),
            "https://example.com/"
        );
    }

    #[test]
    fn test_normalized_origin_is_canonical() {
        for origin in ["example.com", "https://example.com/", " HTTPS://Example.com "] {
            let remote = RemoteSession::new(origin, "token").normalized().unwrap();
            assert_eq!(remote, RemoteSession::new("https://example.com", "token"));
        }
    }

    #[test]
    fn test_origin_url_rejects_other_schemes() {
        let remote = RemoteSession::new("ftp://example.com", "token");
        assert!(remote.origin_url().is_err());
    }

    #[test]
    fn test_debug_redacts_credential() {
        let remote = RemoteSession::new("https://example.com", "secret-token");
        let debug = format!("{:?}", remote);
        assert!(!debug.contains("secret-token"));
    }
}
