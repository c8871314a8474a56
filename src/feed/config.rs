use serde::{Deserialize, Serialize};

use crate::transport::http_pull::DEFAULT_PAGE_LIMIT;

/// What to do with the first page when live notes got there first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InitialPagePolicy {
    /// Insert the page behind the live notes
    #[default]
    Merge,
    /// Keep only the live notes and drop the page
    LiveWins,
}

/// Behaviour shared by every feed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Notes requested per page (default: 20)
    pub page_limit: u32,

    /// Policy for an initial page landing after live notes (default: merge)
    pub initial_page: InitialPagePolicy,

    /// Drop notes whose id is already held (default: true)
    pub dedupe: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            initial_page: InitialPagePolicy::Merge,
            dedupe: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = FeedConfig::default();
        assert_eq!(config.page_limit, 20);
        assert_eq!(config.initial_page, InitialPagePolicy::Merge);
        assert!(config.dedupe);
    }

    #[test]
    fn test_policy_names() {
        let config: FeedConfig = toml::from_str(r#"initial_page = "live-wins""#).unwrap();
        assert_eq!(config.initial_page, InitialPagePolicy::LiveWins);
        assert_eq!(config.page_limit, 20);
    }
}
