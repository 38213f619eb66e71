// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Bindings
//!
//! A binding pairs a routing-key pattern with the exchange it applies to.
//! Anything implementing [`Binding`] can be handed to a subscribe call, which
//! lets callers pass generated types that only describe exchanges and routing
//! keys known to exist. [`bind`] covers the plain-string case.

use serde::{Deserialize, Serialize};

/// Describes an exchange / routing key pair to bind a queue with.
pub trait Binding {
    /// The routing key pattern, e.g. `*.*.*.my-little-pony.#`.
    fn routing_key(&self) -> &str;

    /// The name of the topic exchange to receive messages from.
    fn exchange_name(&self) -> &str;
}

impl<B: Binding + ?Sized> Binding for &B {
    fn routing_key(&self) -> &str {
        (**self).routing_key()
    }

    fn exchange_name(&self) -> &str {
        (**self).exchange_name()
    }
}

impl<B: Binding + ?Sized> Binding for Box<B> {
    fn routing_key(&self) -> &str {
        (**self).routing_key()
    }

    fn exchange_name(&self) -> &str {
        (**self).exchange_name()
    }
}

/// A binding built from plain strings, returned as-is without validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimpleBinding {
    pub routing_key: String,
    pub exchange: String,
}

impl Binding for SimpleBinding {
    fn routing_key(&self) -> &str {
        &self.routing_key
    }

    fn exchange_name(&self) -> &str {
        &self.exchange
    }
}

impl SimpleBinding {
    pub(crate) fn from_binding<B: Binding + ?Sized>(binding: &B) -> Self {
        bind(binding.routing_key(), binding.exchange_name())
    }
}

/// Returns a binding for the given routing key and exchange.
pub fn bind(routing_key: &str, exchange_name: &str) -> SimpleBinding {
    SimpleBinding {
        routing_key: routing_key.to_owned(),
        exchange: exchange_name.to_owned(),
    }
}
