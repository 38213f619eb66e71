// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Configuration
//!
//! A JSON document describing a connection and one subscription. Every field
//! is optional; credentials left empty are resolved the usual way (URL,
//! environment, then `guest`).
//!
//! ```json
//! {
//!   "user": "pmoore_test1",
//!   "url": "amqps://pulse.mozilla.org:5671",
//!   "subscription": {
//!     "queue_name": "taskprocessing",
//!     "prefetch": 10,
//!     "bindings": [
//!       { "routing_key": "*.*.*.*.*.*.gaia.#", "exchange": "exchange/taskcluster-queue/v1/task-defined" }
//!     ]
//!   }
//! }
//! ```

use crate::{
    binding::SimpleBinding,
    errors::PulseError,
    subscription::{SubscriptionOptions, DEFAULT_PREFETCH},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    pub user: String,
    pub password: String,
    pub url: String,
    /// Queue namespace; the resolved user when absent.
    pub namespace: Option<String>,
    /// Connection name reported to the broker.
    pub connection_name: Option<String>,
    pub subscription: SubscriptionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    pub queue_name: String,
    pub prefetch: u16,
    pub auto_ack: bool,
    pub max_length: Option<i32>,
    pub bindings: Vec<SimpleBinding>,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        SubscriptionConfig {
            queue_name: String::new(),
            prefetch: DEFAULT_PREFETCH,
            auto_ack: false,
            max_length: None,
            bindings: vec![],
        }
    }
}

impl PulseConfig {
    pub fn from_json(raw: &str) -> Result<PulseConfig, PulseError> {
        serde_json::from_str(raw).map_err(|err| PulseError::ConfigError(err.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<PulseConfig, PulseError> {
        debug!(path = %path.display(), "loading configuration");

        let raw = fs::read_to_string(path)
            .map_err(|err| PulseError::ConfigError(format!("{}: {}", path.display(), err)))?;
        PulseConfig::from_json(&raw)
    }
}

impl SubscriptionConfig {
    pub fn options(&self) -> SubscriptionOptions {
        let mut options = SubscriptionOptions::new()
            .queue_name(&self.queue_name)
            .prefetch(self.prefetch)
            .auto_ack(self.auto_ack);
        if let Some(max) = self.max_length {
            options = options.max_length(max);
        }
        options
    }
}
