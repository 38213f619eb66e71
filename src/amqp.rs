// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Transport
//!
//! The `lapin`-backed implementation of the transport traits. Connections
//! speak AMQP 0.9.1, over TLS for `amqps://` URLs.

use crate::{
    errors::PulseError,
    exchange::ExchangeDefinition,
    message::Message,
    queue::QueueDefinition,
    transport::{DeliveryStream, Dialer, MessageAcker, Transport, TransportChannel},
};
use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::{
    acker::Acker,
    message::Delivery,
    options::{
        BasicAckOptions, BasicCancelOptions, BasicConsumeOptions, BasicNackOptions,
        BasicQosOptions, BasicRejectOptions, QueueBindOptions, QueueDeleteOptions,
    },
    types::{FieldTable, LongString},
    Channel, Connection, ConnectionProperties,
};
use std::sync::Arc;
use tracing::{debug, error};

const REPLY_SUCCESS: u16 = 200;

/// Dials the broker with `lapin`.
#[derive(Debug, Clone, Default)]
pub struct AmqpDialer {
    connection_name: Option<String>,
}

impl AmqpDialer {
    pub fn new() -> AmqpDialer {
        AmqpDialer::default()
    }

    /// Sets the connection name shown in the broker's management UI.
    pub fn with_connection_name(mut self, name: &str) -> Self {
        self.connection_name = Some(name.to_owned());
        self
    }
}

#[async_trait]
impl Dialer for AmqpDialer {
    async fn dial(&self, url: &str) -> Result<Arc<dyn Transport>, PulseError> {
        debug!("creating amqp connection...");

        let mut options = ConnectionProperties::default();
        if let Some(name) = &self.connection_name {
            options = options.with_connection_name(LongString::from(name.clone()));
        }

        let connection = match Connection::connect(url, options).await {
            Ok(c) => Ok(c),
            Err(err) => {
                error!(error = err.to_string(), "failure to connect");
                Err(PulseError::ConnectionError(err.to_string()))
            }
        }?;
        debug!("amqp connected");

        Ok(Arc::new(AmqpTransport { connection }))
    }
}

/// An open `lapin` connection.
pub struct AmqpTransport {
    connection: Connection,
}

#[async_trait]
impl Transport for AmqpTransport {
    async fn open_channel(&self) -> Result<Arc<dyn TransportChannel>, PulseError> {
        debug!("creating amqp channel...");

        match self.connection.create_channel().await {
            Ok(channel) => {
                debug!(channel = channel.id(), "channel created");
                Ok(Arc::new(AmqpChannel { channel }))
            }
            Err(err) => {
                error!(error = err.to_string(), "error to create the channel");
                Err(PulseError::ChannelError(err.to_string()))
            }
        }
    }

    async fn close(&self) -> Result<(), PulseError> {
        self.connection
            .close(REPLY_SUCCESS, "closing")
            .await
            .map_err(|err| {
                error!(error = err.to_string(), "error to close the connection");
                PulseError::ConnectionError(err.to_string())
            })
    }
}

/// A `lapin` channel dedicated to one subscription.
pub struct AmqpChannel {
    channel: Channel,
}

#[async_trait]
impl TransportChannel for AmqpChannel {
    async fn qos(&self, prefetch_count: u16) -> Result<(), PulseError> {
        self.channel
            .basic_qos(prefetch_count, BasicQosOptions { global: false })
            .await
            .map_err(|err| PulseError::QoSDeclarationError(err.to_string()))
    }

    async fn declare_exchange(&self, def: &ExchangeDefinition) -> Result<(), PulseError> {
        self.channel
            .exchange_declare(
                &def.name,
                def.kind(),
                def.options(),
                FieldTable::default(),
            )
            .await
            .map_err(|err| PulseError::DeclareExchangeError(def.name.clone(), err.to_string()))
    }

    async fn declare_queue(&self, def: &QueueDefinition) -> Result<String, PulseError> {
        match self
            .channel
            .queue_declare(&def.name, def.options(), def.arguments())
            .await
        {
            Ok(queue) => Ok(queue.name().to_string()),
            Err(err) => Err(PulseError::DeclareQueueError(
                def.name.clone(),
                err.to_string(),
            )),
        }
    }

    async fn bind_queue(
        &self,
        queue_name: &str,
        routing_key: &str,
        exchange_name: &str,
    ) -> Result<(), PulseError> {
        self.channel
            .queue_bind(
                queue_name,
                exchange_name,
                routing_key,
                QueueBindOptions { nowait: false },
                FieldTable::default(),
            )
            .await
            .map_err(|err| {
                PulseError::BindingExchangeToQueueError(
                    exchange_name.to_owned(),
                    queue_name.to_owned(),
                    err.to_string(),
                )
            })
    }

    async fn consume(
        &self,
        queue_name: &str,
        consumer_tag: &str,
        auto_ack: bool,
    ) -> Result<DeliveryStream, PulseError> {
        let consumer = self
            .channel
            .basic_consume(
                queue_name,
                consumer_tag,
                BasicConsumeOptions {
                    no_local: false,
                    no_ack: auto_ack,
                    exclusive: false,
                    nowait: false,
                },
                FieldTable::default(),
            )
            .await
            .map_err(|err| PulseError::BindingConsumerError(queue_name.to_owned(), err.to_string()))?;

        Ok(consumer
            .map(|result| match result {
                Ok(delivery) => Ok(into_message(delivery)),
                Err(err) => Err(PulseError::ConsumerError(err.to_string())),
            })
            .boxed())
    }

    async fn cancel(&self, consumer_tag: &str) -> Result<(), PulseError> {
        self.channel
            .basic_cancel(consumer_tag, BasicCancelOptions::default())
            .await
            .map_err(|err| PulseError::CancelConsumerError(consumer_tag.to_owned(), err.to_string()))
    }

    async fn delete_queue(&self, queue_name: &str) -> Result<u32, PulseError> {
        self.channel
            .queue_delete(queue_name, QueueDeleteOptions::default())
            .await
            .map_err(|err| PulseError::DeleteQueueError(queue_name.to_owned(), err.to_string()))
    }

    async fn close(&self) -> Result<(), PulseError> {
        self.channel
            .close(REPLY_SUCCESS, "closing")
            .await
            .map_err(|err| PulseError::ChannelError(err.to_string()))
    }
}

fn into_message(delivery: Delivery) -> Message {
    let acker = Arc::new(AmqpAcker {
        acker: delivery.acker,
    });

    let mut msg = Message::new(
        delivery.data,
        delivery.exchange.as_str(),
        delivery.routing_key.as_str(),
        acker,
    );
    msg.delivery_tag = delivery.delivery_tag;
    msg.redelivered = delivery.redelivered;
    msg.properties = delivery.properties;
    msg
}

/// Settles a delivery on the channel it arrived on.
struct AmqpAcker {
    acker: Acker,
}

#[async_trait]
impl MessageAcker for AmqpAcker {
    async fn ack(&self, multiple: bool) -> Result<(), PulseError> {
        self.acker
            .ack(BasicAckOptions { multiple })
            .await
            .map(|_| ())
            .map_err(|err| PulseError::AckMessageError(err.to_string()))
    }

    async fn nack(&self, multiple: bool, requeue: bool) -> Result<(), PulseError> {
        self.acker
            .nack(BasicNackOptions { multiple, requeue })
            .await
            .map(|_| ())
            .map_err(|err| PulseError::NackMessageError(err.to_string()))
    }

    async fn reject(&self, requeue: bool) -> Result<(), PulseError> {
        self.acker
            .reject(BasicRejectOptions { requeue })
            .await
            .map(|_| ())
            .map_err(|err| PulseError::RejectMessageError(err.to_string()))
    }
}
