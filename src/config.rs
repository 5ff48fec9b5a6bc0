//! Gift engine configuration.

use crate::constants::{DEFAULT_DEADLINE_TTL, DEFAULT_SETTLE_POLL_INTERVAL};
use eyre::Context;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use url::Url;

/// Gift engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftConfig {
    /// How long signed transfer messages stay publishable.
    ///
    /// Expired messages are refused by relays; a fresh message must be signed instead.
    #[serde(with = "crate::serde::duration")]
    pub deadline_ttl: Duration,
    /// How often settlement status is polled on the relay.
    #[serde(with = "crate::serde::duration")]
    pub settle_poll_interval: Duration,
    /// The relay endpoint transfers are published to.
    pub relay_endpoint: Url,
    /// The base URL gift links are rendered on.
    pub link_base: Url,
}

impl Default for GiftConfig {
    fn default() -> Self {
        Self {
            deadline_ttl: DEFAULT_DEADLINE_TTL,
            settle_poll_interval: DEFAULT_SETTLE_POLL_INTERVAL,
            relay_endpoint: Url::parse("http://localhost:9119").expect("valid default endpoint"),
            link_base: Url::parse("http://localhost:5173/gift").expect("valid default link base"),
        }
    }
}

impl GiftConfig {
    /// Sets the validity window of signed transfer messages.
    pub fn with_deadline_ttl(mut self, deadline_ttl: Duration) -> Self {
        self.deadline_ttl = deadline_ttl;
        self
    }

    /// Sets the settlement poll interval.
    pub fn with_settle_poll_interval(mut self, settle_poll_interval: Duration) -> Self {
        self.settle_poll_interval = settle_poll_interval;
        self
    }

    /// Sets the relay endpoint.
    pub fn with_relay_endpoint(mut self, relay_endpoint: Url) -> Self {
        self.relay_endpoint = relay_endpoint;
        self
    }

    /// Sets the base URL gift links are rendered on.
    pub fn with_link_base(mut self, link_base: Url) -> Self {
        self.link_base = link_base;
        self
    }

    /// Load from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .wrap_err_with(|| format!("failed to read config file: {}", path.display()))?;
        let config = serde_yaml::from_reader(&file)
            .wrap_err_with(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save to a YAML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> eyre::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
