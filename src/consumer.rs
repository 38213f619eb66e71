// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Message Consumption
//!
//! Hands a single delivery to the subscription's handler inside a consumer
//! span carrying the trace context the publisher propagated.

use crate::{handler::MessageHandler, message::Message, otel};
use opentelemetry::{
    global::BoxedTracer,
    trace::{Span, Status, TraceContextExt},
};
use std::borrow::Cow;
use tracing::{debug, error};

/// Runs `handler` on `msg` and records the outcome on the message span.
///
/// Settling the message is left to the handler unless the subscription
/// auto-acknowledges.
pub(crate) async fn consume(
    tracer: &BoxedTracer,
    mut msg: Message,
    queue_name: &str,
    handler: &dyn MessageHandler,
) {
    let (ctx, mut span) = otel::new_span(&msg.properties, tracer, &msg.exchange);
    span.set_attribute(opentelemetry::KeyValue::new(
        "messaging.destination.name",
        msg.exchange.clone(),
    ));
    let cx = ctx.with_span(span);

    debug!(
        queue = queue_name,
        exchange = msg.exchange.as_str(),
        routing_key = msg.routing_key.as_str(),
        redelivered = msg.redelivered,
        "received message"
    );

    msg.context = cx.clone();

    match handler.handle(msg).await {
        Ok(()) => {
            debug!("message successfully processed");
            cx.span().set_status(Status::Ok);
        }
        Err(err) => {
            error!(error = err.to_string(), queue = queue_name, "error handling msg");
            cx.span().record_error(&err);
            cx.span().set_status(Status::Error {
                description: Cow::from(err.to_string()),
            });
        }
    }

    cx.span().end();
}
