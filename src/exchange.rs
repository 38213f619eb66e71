// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchange Definitions
//!
//! Subscriptions never create exchanges. Each exchange a binding refers to is
//! checked with a passive declaration, so a mistyped exchange name fails the
//! subscribe call instead of silently creating an exchange nobody publishes to.

use lapin::{options::ExchangeDeclareOptions, ExchangeKind};

/// An exchange as checked before binding to it.
///
/// Pulse publishes exclusively to topic exchanges, which match a message's
/// dot-delimited routing key against binding patterns (`*` matches exactly
/// one word, `#` matches zero or more).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeDefinition {
    pub(crate) name: String,
    pub(crate) passive: bool,
}

impl ExchangeDefinition {
    /// The definition used to verify an exchange a binding refers to:
    /// passive, topic, non-durable, non-autodelete, non-internal.
    pub fn verification(name: &str) -> ExchangeDefinition {
        ExchangeDefinition {
            name: name.to_owned(),
            passive: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn kind(&self) -> ExchangeKind {
        ExchangeKind::Topic
    }

    pub(crate) fn options(&self) -> ExchangeDeclareOptions {
        ExchangeDeclareOptions {
            passive: self.passive,
            durable: false,
            auto_delete: false,
            internal: false,
            nowait: false,
        }
    }
}
