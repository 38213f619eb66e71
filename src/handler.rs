// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Message Handlers
//!
//! A handler receives every message of one subscription, one at a time. The
//! next message is not pulled from the queue until the handler returns, so a
//! slow handler applies backpressure up to the subscription's prefetch count.
//!
//! Async closures taking a [`Message`] implement [`MessageHandler`] directly:
//!
//! ```no_run
//! # async fn run(conn: pulse::connection::Connection) -> Result<(), pulse::errors::PulseError> {
//! use pulse::{binding::bind, message::Message};
//!
//! let sub = conn
//!     .subscribe(
//!         "",
//!         |msg: Message| async move {
//!             println!("{}", msg.body_str()?);
//!             msg.ack(false).await
//!         },
//!         1,
//!         false,
//!         [bind("#", "exchange/build/normalized")],
//!     )
//!     .await?;
//! sub.wait().await;
//! # Ok(()) }
//! ```

use crate::{errors::PulseError, message::Message};
use async_trait::async_trait;
use std::future::Future;

/// Processes the messages of a subscription.
///
/// An error returned here is logged and recorded on the message's span; it
/// does not stop the subscription and does not settle the message.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: Message) -> Result<(), PulseError>;
}

#[async_trait]
impl<F, Fut> MessageHandler for F
where
    F: Fn(Message) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), PulseError>> + Send + 'static,
{
    async fn handle(&self, message: Message) -> Result<(), PulseError> {
        (self)(message).await
    }
}
