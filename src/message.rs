// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Delivered Messages
//!
//! A [`Message`] is one delivery handed to a subscription's handler. When the
//! subscription does not auto-acknowledge, the handler settles each message
//! itself with [`Message::ack`], [`Message::nack`] or [`Message::reject`];
//! unsettled messages stay redeliverable.

use crate::{errors::PulseError, transport::MessageAcker};
use lapin::BasicProperties;
use opentelemetry::Context;
use serde::de::DeserializeOwned;
use std::{fmt, sync::Arc};

/// One delivery from a subscribed queue.
#[derive(Clone)]
pub struct Message {
    pub body: Vec<u8>,
    pub exchange: String,
    pub routing_key: String,
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub properties: BasicProperties,
    pub(crate) context: Context,
    pub(crate) acker: Arc<dyn MessageAcker>,
}

impl Message {
    pub(crate) fn new(
        body: Vec<u8>,
        exchange: &str,
        routing_key: &str,
        acker: Arc<dyn MessageAcker>,
    ) -> Message {
        Message {
            body,
            exchange: exchange.to_owned(),
            routing_key: routing_key.to_owned(),
            delivery_tag: 0,
            redelivered: false,
            properties: BasicProperties::default(),
            context: Context::new(),
            acker,
        }
    }

    /// The trace context propagated in the message headers, if any.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The body as UTF-8 text.
    pub fn body_str(&self) -> Result<&str, PulseError> {
        std::str::from_utf8(&self.body).map_err(|err| PulseError::ParsePayloadError(err.to_string()))
    }

    /// Decodes the JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, PulseError> {
        serde_json::from_slice(&self.body)
            .map_err(|err| PulseError::ParsePayloadError(err.to_string()))
    }

    /// Acknowledges this message, and every earlier one on the channel when `multiple` is set.
    pub async fn ack(&self, multiple: bool) -> Result<(), PulseError> {
        self.acker.ack(multiple).await
    }

    pub async fn nack(&self, multiple: bool, requeue: bool) -> Result<(), PulseError> {
        self.acker.nack(multiple, requeue).await
    }

    pub async fn reject(&self, requeue: bool) -> Result<(), PulseError> {
        self.acker.reject(requeue).await
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("exchange", &self.exchange)
            .field("routing_key", &self.routing_key)
            .field("delivery_tag", &self.delivery_tag)
            .field("redelivered", &self.redelivered)
            .field("body_len", &self.body.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockMessageAcker;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct TaskEvent {
        #[serde(rename = "taskId")]
        task_id: String,
    }

    fn message(body: &[u8], acker: MockMessageAcker) -> Message {
        Message::new(body.to_vec(), "exchange/x", "a.b", Arc::new(acker))
    }

    #[test]
    fn decodes_json_body() {
        let msg = message(br#"{"taskId":"abc"}"#, MockMessageAcker::new());
        let event: TaskEvent = msg.json().unwrap();
        assert_eq!(event.task_id, "abc");
        assert_eq!(msg.body_str().unwrap(), r#"{"taskId":"abc"}"#);
    }

    #[test]
    fn reports_undecodable_body() {
        let msg = message(&[0xff, 0xfe], MockMessageAcker::new());
        assert!(matches!(msg.body_str(), Err(PulseError::ParsePayloadError(_))));
        assert!(matches!(
            msg.json::<serde_json::Value>(),
            Err(PulseError::ParsePayloadError(_))
        ));
    }

    #[tokio::test]
    async fn settles_through_the_acker() {
        let mut acker = MockMessageAcker::new();
        acker
            .expect_ack()
            .withf(|multiple| !*multiple)
            .times(1)
            .returning(|_| Ok(()));
        acker
            .expect_nack()
            .withf(|multiple, requeue| !*multiple && *requeue)
            .times(1)
            .returning(|_, _| Err(PulseError::NackMessageError("channel closed".into())));

        let msg = message(b"{}", acker);
        assert!(msg.ack(false).await.is_ok());
        assert_eq!(
            msg.nack(false, true).await,
            Err(PulseError::NackMessageError("channel closed".into()))
        );
    }
}
