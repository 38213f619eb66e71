// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Shared fixtures for unit tests.

use crate::{
    errors::PulseError,
    message::Message,
    transport::{DeliveryStream, MockMessageAcker, MockTransportChannel},
};
use futures_util::{stream, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A message whose acker accepts any settlement.
pub(crate) fn message(routing_key: &str) -> Message {
    let mut acker = MockMessageAcker::new();
    acker.expect_ack().returning(|_| Ok(()));
    acker.expect_nack().returning(|_, _| Ok(()));
    acker.expect_reject().returning(|_| Ok(()));
    Message::new(
        b"{}".to_vec(),
        "exchange/test",
        routing_key,
        Arc::new(acker),
    )
}

/// A delivery stream fed by the returned sender; it ends when the sender drops.
pub(crate) fn delivery_stream() -> (mpsc::UnboundedSender<Message>, DeliveryStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    let stream = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|msg| (Ok::<_, PulseError>(msg), rx))
    })
    .boxed();
    (tx, stream)
}

/// A channel on which qos and every topology call succeed.
///
/// Consume, cancel, delete and close are left to each test.
pub(crate) fn accepting_channel() -> MockTransportChannel {
    let mut channel = MockTransportChannel::new();
    channel.expect_qos().returning(|_| Ok(()));
    channel.expect_declare_exchange().returning(|_| Ok(()));
    channel
        .expect_declare_queue()
        .returning(|def| Ok(def.name().to_owned()));
    channel.expect_bind_queue().returning(|_, _, _| Ok(()));
    channel
}
