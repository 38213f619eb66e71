// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Transport Abstraction
//!
//! The narrow set of broker operations a subscription needs. The production
//! implementation lives in [`crate::amqp`] and sits on top of `lapin`; the
//! traits exist so that connection and subscription logic can be exercised
//! without a running broker.

use crate::{
    errors::PulseError, exchange::ExchangeDefinition, message::Message, queue::QueueDefinition,
};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

/// Ordered stream of deliveries for one consumer.
pub type DeliveryStream = BoxStream<'static, Result<Message, PulseError>>;

/// Establishes transport connections.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Connects to the broker at `url`, which carries credentials.
    async fn dial(&self, url: &str) -> Result<Arc<dyn Transport>, PulseError>;
}

/// An established connection to the broker.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a fresh channel, owned exclusively by the caller.
    async fn open_channel(&self) -> Result<Arc<dyn TransportChannel>, PulseError>;

    async fn close(&self) -> Result<(), PulseError>;
}

/// A channel on an established connection.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TransportChannel: Send + Sync {
    /// Limits the number of unacknowledged deliveries in flight.
    async fn qos(&self, prefetch_count: u16) -> Result<(), PulseError>;

    async fn declare_exchange(&self, def: &ExchangeDefinition) -> Result<(), PulseError>;

    /// Declares the queue, returning the name the broker assigned it.
    async fn declare_queue(&self, def: &QueueDefinition) -> Result<String, PulseError>;

    async fn bind_queue(
        &self,
        queue_name: &str,
        routing_key: &str,
        exchange_name: &str,
    ) -> Result<(), PulseError>;

    /// Starts a non-exclusive consumer on `queue_name`.
    async fn consume(
        &self,
        queue_name: &str,
        consumer_tag: &str,
        auto_ack: bool,
    ) -> Result<DeliveryStream, PulseError>;

    /// Stops the broker from delivering to `consumer_tag`.
    async fn cancel(&self, consumer_tag: &str) -> Result<(), PulseError>;

    /// Deletes the queue, returning the number of messages it still held.
    async fn delete_queue(&self, queue_name: &str) -> Result<u32, PulseError>;

    async fn close(&self) -> Result<(), PulseError>;
}

/// Settles a single delivery with the broker.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageAcker: Send + Sync {
    async fn ack(&self, multiple: bool) -> Result<(), PulseError>;

    async fn nack(&self, multiple: bool, requeue: bool) -> Result<(), PulseError>;

    async fn reject(&self, requeue: bool) -> Result<(), PulseError>;
}
