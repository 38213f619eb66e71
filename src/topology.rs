// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Subscription Topology
//!
//! Sets up the broker side of a subscription on its channel, in order:
//!
//! 1. passively verify every exchange the bindings mention,
//! 2. declare the subscription's queue,
//! 3. bind the queue to each exchange with its routing key.
//!
//! The first failing step aborts the install and nothing after it runs.

use crate::{
    binding::{Binding, SimpleBinding},
    errors::PulseError,
    exchange::ExchangeDefinition,
    queue::QueueDefinition,
    transport::TransportChannel,
};
use std::collections::HashSet;
use tracing::{debug, error, info};

/// The queue and bindings that make up one subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionTopology {
    pub(crate) queue: QueueDefinition,
    pub(crate) bindings: Vec<SimpleBinding>,
}

impl SubscriptionTopology {
    pub fn new(queue: QueueDefinition) -> SubscriptionTopology {
        SubscriptionTopology {
            queue,
            bindings: vec![],
        }
    }

    /// Adds a queue-to-exchange binding to the topology.
    pub fn binding<B: Binding>(mut self, binding: &B) -> Self {
        self.bindings.push(SimpleBinding::from_binding(binding));
        self
    }

    /// Distinct exchange names in the order they were first mentioned.
    pub fn exchanges(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.bindings
            .iter()
            .map(|b| b.exchange_name())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Installs the topology, returning the declared queue name.
    pub async fn install(&self, channel: &dyn TransportChannel) -> Result<String, PulseError> {
        self.verify_exchanges(channel).await?;
        let queue_name = self.install_queue(channel).await?;
        self.binding_queue(channel, &queue_name).await?;
        Ok(queue_name)
    }

    async fn verify_exchanges(&self, channel: &dyn TransportChannel) -> Result<(), PulseError> {
        for name in self.exchanges() {
            debug!("verifying exchange: {}", name);

            let def = ExchangeDefinition::verification(name);
            if let Err(err) = channel.declare_exchange(&def).await {
                error!(
                    error = err.to_string(),
                    name = name,
                    "error to passively declare the exchange"
                );
                return Err(err);
            }
        }

        Ok(())
    }

    async fn install_queue(&self, channel: &dyn TransportChannel) -> Result<String, PulseError> {
        debug!("creating queue: {}", self.queue.name);

        match channel.declare_queue(&self.queue).await {
            Err(err) => {
                error!(
                    error = err.to_string(),
                    name = self.queue.name.as_str(),
                    "error to declare the queue"
                );
                Err(err)
            }
            Ok(name) => {
                debug!("queue: {} was created", name);
                Ok(name)
            }
        }
    }

    async fn binding_queue(
        &self,
        channel: &dyn TransportChannel,
        queue_name: &str,
    ) -> Result<(), PulseError> {
        for binding in &self.bindings {
            info!(
                "binding {} to {} with routing key {}",
                queue_name, binding.exchange, binding.routing_key
            );

            if let Err(err) = channel
                .bind_queue(queue_name, &binding.routing_key, &binding.exchange)
                .await
            {
                error!(error = err.to_string(), "error to bind queue to exchange");
                return Err(err);
            }
        }

        debug!("queue was bound");

        Ok(())
    }
}
