// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Subscriptions
//!
//! A [`Subscription`] is the handle to one queue being consumed. It owns a
//! channel and a dispatch task that pulls messages in arrival order and awaits
//! the handler for each one before pulling the next.
//!
//! The dispatch task stops when the broker closes the stream, when
//! [`Subscription::close`] or [`Subscription::delete`] is called, or when the
//! handle is dropped. It is never restarted. Close and delete release the
//! channel once, even after the stream ended on its own.

use crate::{
    binding::SimpleBinding, consumer::consume, errors::PulseError, handler::MessageHandler,
    message::Message,
    transport::{DeliveryStream, TransportChannel},
};
use futures_util::{FutureExt, StreamExt};
use opentelemetry::global::{self, BoxedTracer};
use std::{
    fmt,
    sync::{Arc, Mutex as StdMutex},
};
use tokio::{
    runtime::Handle,
    sync::{watch, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Default number of unacknowledged messages delivered at a time
pub const DEFAULT_PREFETCH: u16 = 1;

/// Parameters of a subscribe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionOptions {
    pub(crate) queue_name: String,
    pub(crate) prefetch: u16,
    pub(crate) auto_ack: bool,
    pub(crate) max_length: Option<i32>,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        SubscriptionOptions {
            queue_name: String::new(),
            prefetch: DEFAULT_PREFETCH,
            auto_ack: false,
            max_length: None,
        }
    }
}

impl SubscriptionOptions {
    /// Anonymous queue, prefetch 1, manual acknowledgement.
    pub fn new() -> SubscriptionOptions {
        SubscriptionOptions::default()
    }

    /// Names the queue; an empty name requests an anonymous queue.
    pub fn queue_name(mut self, name: &str) -> Self {
        self.queue_name = name.to_owned();
        self
    }

    pub fn prefetch(mut self, prefetch: u16) -> Self {
        self.prefetch = prefetch;
        self
    }

    /// When set, the broker treats a message as settled once it is delivered.
    pub fn auto_ack(mut self, auto_ack: bool) -> Self {
        self.auto_ack = auto_ack;
        self
    }

    pub fn max_length(mut self, max: i32) -> Self {
        self.max_length = Some(max);
        self
    }
}

/// Lifecycle state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Running,
    Paused,
    Closed,
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionState::Running => write!(f, "running"),
            SubscriptionState::Paused => write!(f, "paused"),
            SubscriptionState::Closed => write!(f, "closed"),
        }
    }
}

pub(crate) fn new_consumer_tag() -> String {
    format!("consumer/{}", Uuid::new_v4())
}

/// Handle to a running subscription.
///
/// Dropping the handle without [`Subscription::close`] or
/// [`Subscription::delete`] stops the dispatch task and closes the channel in
/// the background.
pub struct Subscription {
    queue_name: String,
    bindings: Vec<SimpleBinding>,
    channel: Arc<dyn TransportChannel>,
    consumer_tag: Arc<StdMutex<String>>,
    state: Arc<watch::Sender<SubscriptionState>>,
    token: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Subscription {
    /// Spawns the dispatch task over an already opened delivery stream.
    pub(crate) fn start(
        channel: Arc<dyn TransportChannel>,
        queue_name: String,
        bindings: Vec<SimpleBinding>,
        handler: Arc<dyn MessageHandler>,
        auto_ack: bool,
        consumer_tag: String,
        stream: DeliveryStream,
    ) -> Subscription {
        let (state, _) = watch::channel(SubscriptionState::Running);
        let state = Arc::new(state);
        let consumer_tag = Arc::new(StdMutex::new(consumer_tag));
        let token = CancellationToken::new();

        let dispatcher = Dispatcher {
            channel: channel.clone(),
            queue_name: queue_name.clone(),
            handler,
            auto_ack,
            consumer_tag: consumer_tag.clone(),
            state: state.clone(),
            token: token.clone(),
        };

        let worker = tokio::spawn(dispatcher.run(stream));

        Subscription {
            queue_name,
            bindings,
            channel,
            consumer_tag,
            state,
            token,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// The queue name as declared on the broker.
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn bindings(&self) -> &[SimpleBinding] {
        &self.bindings
    }

    /// The tag of the current broker-side consumer; changes on every resume.
    pub fn consumer_tag(&self) -> String {
        match self.consumer_tag.lock() {
            Ok(tag) => tag.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn state(&self) -> SubscriptionState {
        *self.state.borrow()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == SubscriptionState::Closed
    }

    /// Stops delivery by cancelling the broker-side consumer.
    ///
    /// Takes effect once the handler call in progress, if any, returns.
    /// Messages already prefetched but not yet handled are requeued.
    pub fn pause(&self) -> Result<(), PulseError> {
        self.transition(SubscriptionState::Running, SubscriptionState::Paused)
    }

    /// Restarts delivery of a paused subscription under a new consumer tag.
    pub fn resume(&self) -> Result<(), PulseError> {
        self.transition(SubscriptionState::Paused, SubscriptionState::Running)
    }

    /// Stops the dispatch task and closes the subscription's channel.
    ///
    /// An anonymous queue is removed by the broker once the connection drops;
    /// a named queue is kept. Use [`Subscription::delete`] to remove it.
    pub async fn close(&self) -> Result<(), PulseError> {
        self.shutdown().await?;
        self.channel.close().await
    }

    /// Stops the dispatch task, deletes the queue and closes the channel.
    ///
    /// Returns the number of messages the queue still held.
    pub async fn delete(&self) -> Result<u32, PulseError> {
        self.shutdown().await?;
        let remaining = self.channel.delete_queue(&self.queue_name).await?;
        info!(queue = self.queue_name.as_str(), remaining, "queue deleted");
        self.channel.close().await?;
        Ok(remaining)
    }

    /// Waits until the dispatch task has ended.
    pub async fn wait(&self) {
        let mut state = self.state.subscribe();
        let _ = state.wait_for(|s| *s == SubscriptionState::Closed).await;
    }

    async fn shutdown(&self) -> Result<(), PulseError> {
        let Some(worker) = self.worker.lock().await.take() else {
            return Err(PulseError::SubscriptionClosed(self.queue_name.clone()));
        };

        self.token.cancel();
        if let Err(err) = worker.await {
            error!(error = err.to_string(), "dispatch task failed");
        }
        self.state.send_replace(SubscriptionState::Closed);

        Ok(())
    }

    fn transition(&self, from: SubscriptionState, to: SubscriptionState) -> Result<(), PulseError> {
        let mut result = Ok(());

        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                return true;
            }

            result = Err(match *state {
                SubscriptionState::Closed => PulseError::SubscriptionClosed(self.queue_name.clone()),
                other => PulseError::InvalidState(self.queue_name.clone(), other.to_string()),
            });
            false
        });

        if result.is_ok() {
            debug!(queue = self.queue_name.as_str(), state = %to, "subscription state changed");
        }

        result
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("queue_name", &self.queue_name)
            .field("bindings", &self.bindings)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();

        // close() or delete() already released the channel
        let Some(worker) = self.worker.get_mut().take() else {
            return;
        };

        let channel = self.channel.clone();
        let queue = self.queue_name.clone();
        match Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    let _ = worker.await;
                    if let Err(err) = channel.close().await {
                        debug!(error = err.to_string(), queue = queue.as_str(), "channel already closed");
                    }
                });
            }
            Err(_) => warn!(queue = queue.as_str(), "no runtime left to close the channel"),
        }
    }
}

/// Why a delivery stream stopped being read.
#[derive(Debug, PartialEq, Eq)]
enum StreamOutcome {
    Ended,
    Paused,
    Cancelled,
}

/// The dispatch task of one subscription.
struct Dispatcher {
    channel: Arc<dyn TransportChannel>,
    queue_name: String,
    handler: Arc<dyn MessageHandler>,
    auto_ack: bool,
    consumer_tag: Arc<StdMutex<String>>,
    state: Arc<watch::Sender<SubscriptionState>>,
    token: CancellationToken,
}

impl Dispatcher {
    async fn run(self, mut stream: DeliveryStream) {
        let tracer = global::tracer("pulse consumer");
        let mut state = self.state.subscribe();

        loop {
            match self.dispatch(&tracer, &mut stream, &mut state).await {
                StreamOutcome::Ended => {
                    warn!(queue = self.queue_name.as_str(), "delivery stream ended");
                    break;
                }
                StreamOutcome::Cancelled => {
                    let settled = self.cancel_consumer(stream).await;
                    if !settled.is_empty() {
                        warn!(
                            queue = self.queue_name.as_str(),
                            dropped = settled.len(),
                            "auto-acknowledged msgs not handled before close"
                        );
                    }
                    break;
                }
                StreamOutcome::Paused => {
                    for msg in self.cancel_consumer(stream).await {
                        consume(&tracer, msg, &self.queue_name, self.handler.as_ref()).await;
                    }

                    if !self.wait_for_resume(&mut state).await {
                        break;
                    }

                    match self.reopen().await {
                        Some(reopened) => stream = reopened,
                        None => break,
                    }
                }
            }
        }

        self.state.send_replace(SubscriptionState::Closed);
        debug!(queue = self.queue_name.as_str(), "dispatch task finished");
    }

    async fn dispatch(
        &self,
        tracer: &BoxedTracer,
        stream: &mut DeliveryStream,
        state: &mut watch::Receiver<SubscriptionState>,
    ) -> StreamOutcome {
        if *state.borrow_and_update() == SubscriptionState::Paused {
            return StreamOutcome::Paused;
        }

        loop {
            tokio::select! {
                biased;

                _ = self.token.cancelled() => return StreamOutcome::Cancelled,

                changed = state.changed() => {
                    if changed.is_err() {
                        return StreamOutcome::Cancelled;
                    }
                    if *state.borrow_and_update() == SubscriptionState::Paused {
                        return StreamOutcome::Paused;
                    }
                }

                next = stream.next() => match next {
                    Some(Ok(msg)) => {
                        consume(tracer, msg, &self.queue_name, self.handler.as_ref()).await;
                    }
                    Some(Err(err)) => {
                        error!(error = err.to_string(), queue = self.queue_name.as_str(), "error consuming msg");
                        return StreamOutcome::Ended;
                    }
                    None => return StreamOutcome::Ended,
                },
            }
        }
    }

    /// Cancels the current consumer and hands back anything it had prefetched.
    ///
    /// Unsettled messages are requeued. Auto-acknowledged ones are already
    /// settled by the broker and are returned to the caller instead.
    async fn cancel_consumer(&self, mut stream: DeliveryStream) -> Vec<Message> {
        let tag = match self.consumer_tag.lock() {
            Ok(tag) => tag.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        if let Err(err) = self.channel.cancel(&tag).await {
            warn!(error = err.to_string(), consumer = tag.as_str(), "error to cancel consumer");
        }

        let mut settled = vec![];
        while let Some(Some(next)) = stream.next().now_or_never() {
            if let Ok(msg) = next {
                if self.auto_ack {
                    settled.push(msg);
                    continue;
                }
                if let Err(err) = msg.reject(true).await {
                    warn!(error = err.to_string(), "error to requeue prefetched msg");
                }
            }
        }

        settled
    }

    async fn wait_for_resume(&self, state: &mut watch::Receiver<SubscriptionState>) -> bool {
        loop {
            tokio::select! {
                biased;

                _ = self.token.cancelled() => return false,

                changed = state.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                    match *state.borrow_and_update() {
                        SubscriptionState::Running => return true,
                        SubscriptionState::Closed => return false,
                        SubscriptionState::Paused => {}
                    }
                }
            }
        }
    }

    async fn reopen(&self) -> Option<DeliveryStream> {
        let tag = new_consumer_tag();

        match self.channel.consume(&self.queue_name, &tag, self.auto_ack).await {
            Ok(stream) => {
                debug!(queue = self.queue_name.as_str(), consumer = tag.as_str(), "consumer resumed");
                match self.consumer_tag.lock() {
                    Ok(mut current) => *current = tag,
                    Err(poisoned) => *poisoned.into_inner() = tag,
                }
                Some(stream)
            }
            Err(err) => {
                error!(error = err.to_string(), queue = self.queue_name.as_str(), "error to resume consumer");
                None
            }
        }
    }
}
