// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types for Pulse Subscriptions
//!
//! The `PulseError` enum covers every failure a caller can observe while
//! connecting to the message bus, setting up a subscription, handling
//! deliveries or driving a subscription's lifecycle. Each variant that stems
//! from a declaration names the exchange or queue involved, so a failed
//! subscribe call tells the caller which step broke and on what.

use thiserror::Error;

/// Represents errors that can occur while consuming from the message bus.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PulseError {
    /// Error establishing the transport connection
    #[error("failure to connect: {0}")]
    ConnectionError(String),

    /// Error opening a channel on an established connection
    #[error("failure to create a channel: {0}")]
    ChannelError(String),

    /// Error configuring the prefetch window
    #[error("failure to configure qos: {0}")]
    QoSDeclarationError(String),

    /// The exchange does not exist, or exists with other properties
    #[error("failure to verify exchange `{0}`: {1}")]
    DeclareExchangeError(String, String),

    /// Error declaring the queue with the given name
    #[error("failure to declare queue `{0}`: {1}")]
    DeclareQueueError(String, String),

    /// Error binding a queue to an exchange
    #[error("failure to bind exchange `{0}` to queue `{1}`: {2}")]
    BindingExchangeToQueueError(String, String, String),

    /// Error opening the delivery stream on a queue
    #[error("failure to consume from queue `{0}`: {1}")]
    BindingConsumerError(String, String),

    /// Error cancelling a broker-side consumer
    #[error("failure to cancel consumer `{0}`: {1}")]
    CancelConsumerError(String, String),

    /// Error deleting a queue
    #[error("failure to delete queue `{0}`: {1}")]
    DeleteQueueError(String, String),

    /// Error acknowledging a message
    #[error("failure to ack message: {0}")]
    AckMessageError(String),

    /// Error negative-acknowledging a message
    #[error("failure to nack message: {0}")]
    NackMessageError(String),

    /// Error rejecting a message
    #[error("failure to reject message: {0}")]
    RejectMessageError(String),

    /// Error decoding a message payload
    #[error("failure to parse payload: {0}")]
    ParsePayloadError(String),

    /// Error reading from the delivery stream after subscribing
    #[error("failure to consume message: {0}")]
    ConsumerError(String),

    /// The subscription's dispatch loop has already ended
    #[error("subscription `{0}` is closed")]
    SubscriptionClosed(String),

    /// The lifecycle operation does not apply in the current state
    #[error("subscription `{0}` is {1}")]
    InvalidState(String, String),

    /// Error loading configuration
    #[error("invalid configuration: {0}")]
    ConfigError(String),
}
