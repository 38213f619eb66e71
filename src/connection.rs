// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Connections
//!
//! A [`Connection`] holds the resolved credentials and server URL, and the
//! transport connection once one exists. Creating a `Connection` causes no
//! network traffic: the transport is dialled the first time a subscription
//! is requested, and exactly once even when subscriptions race for it.
//!
//! Every subscription gets its own channel on the shared transport.

use crate::{
    amqp::AmqpDialer,
    binding::Binding,
    config::PulseConfig,
    credentials::{self, ResolutionAmbiguity, ResolvedCredentials},
    errors::PulseError,
    handler::MessageHandler,
    queue::QueueDefinition,
    subscription::{new_consumer_tag, Subscription, SubscriptionOptions},
    topology::SubscriptionTopology,
    transport::{DeliveryStream, Dialer, Transport, TransportChannel},
};
use std::{fmt, sync::Arc};
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

/// Connection parameters plus the lazily established transport.
pub struct Connection {
    user: String,
    password: String,
    url: String,
    namespace: String,
    ambiguity: Option<ResolutionAmbiguity>,
    dialer: Arc<dyn Dialer>,
    transport: OnceCell<Arc<dyn Transport>>,
}

impl Connection {
    /// Resolves credentials and prepares a connection; no I/O happens here.
    ///
    /// Empty arguments fall back as described in [`crate::credentials`].
    pub fn new(user: &str, password: &str, url: &str) -> Connection {
        Connection::from_credentials(credentials::resolve(user, password, url))
    }

    pub fn from_credentials(resolved: ResolvedCredentials) -> Connection {
        Connection {
            namespace: resolved.user.clone(),
            user: resolved.user,
            password: resolved.password,
            url: resolved.url,
            ambiguity: resolved.ambiguity,
            dialer: Arc::new(AmqpDialer::new()),
            transport: OnceCell::new(),
        }
    }

    pub fn from_config(cfg: &PulseConfig) -> Connection {
        let mut dialer = AmqpDialer::new();
        if let Some(name) = &cfg.connection_name {
            dialer = dialer.with_connection_name(name);
        }

        let mut conn = Connection::new(&cfg.user, &cfg.password, &cfg.url).with_dialer(Arc::new(dialer));
        if let Some(namespace) = cfg.namespace.as_deref().filter(|ns| !ns.is_empty()) {
            conn = conn.with_namespace(namespace);
        }
        conn
    }

    /// Replaces the transport used to reach the broker.
    pub fn with_dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = dialer;
        self
    }

    /// Sets the namespace queues are created under; defaults to the user.
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_owned();
        self
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// The server URL with the resolved credentials embedded.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Set when the supplied URL did not fit the expected authority grammar.
    pub fn ambiguity(&self) -> Option<ResolutionAmbiguity> {
        self.ambiguity
    }

    pub fn is_established(&self) -> bool {
        self.transport.initialized()
    }

    /// Subscribes to `bindings` with a queue named `queue_name`, or an
    /// anonymous queue when the name is empty.
    pub async fn subscribe<H, I, B>(
        &self,
        queue_name: &str,
        handler: H,
        prefetch: u16,
        auto_ack: bool,
        bindings: I,
    ) -> Result<Subscription, PulseError>
    where
        H: MessageHandler + 'static,
        I: IntoIterator<Item = B>,
        B: Binding,
    {
        let options = SubscriptionOptions::new()
            .queue_name(queue_name)
            .prefetch(prefetch)
            .auto_ack(auto_ack);

        self.subscribe_with(options, handler, bindings).await
    }

    /// Subscribes with full control over the subscription parameters.
    ///
    /// Either every exchange is verified, the queue declared and every
    /// binding applied before messages start flowing, or the call fails and
    /// the subscription's channel is closed.
    pub async fn subscribe_with<H, I, B>(
        &self,
        options: SubscriptionOptions,
        handler: H,
        bindings: I,
    ) -> Result<Subscription, PulseError>
    where
        H: MessageHandler + 'static,
        I: IntoIterator<Item = B>,
        B: Binding,
    {
        let mut queue = QueueDefinition::for_subscription(&self.namespace, &options.queue_name);
        if let Some(max) = options.max_length {
            queue = queue.max_length(max);
        }
        let topology = bindings
            .into_iter()
            .fold(SubscriptionTopology::new(queue), |topology, binding| {
                topology.binding(&binding)
            });

        let transport = self.transport().await?;
        let channel = transport.open_channel().await?;

        match prepare(channel.as_ref(), &topology, &options).await {
            Ok((queue_name, consumer_tag, stream)) => {
                info!(
                    queue = queue_name.as_str(),
                    bindings = topology.bindings.len(),
                    "subscribed"
                );
                Ok(Subscription::start(
                    channel,
                    queue_name,
                    topology.bindings,
                    Arc::new(handler),
                    options.auto_ack,
                    consumer_tag,
                    stream,
                ))
            }
            Err(err) => {
                if let Err(close_err) = channel.close().await {
                    debug!(error = close_err.to_string(), "channel already closed");
                }
                Err(err)
            }
        }
    }

    /// Closes the transport connection if one was established.
    ///
    /// Subscriptions on it stop once the broker closes their streams.
    pub async fn close(&self) -> Result<(), PulseError> {
        match self.transport.get() {
            Some(transport) => transport.close().await,
            None => Ok(()),
        }
    }

    async fn transport(&self) -> Result<Arc<dyn Transport>, PulseError> {
        self.transport
            .get_or_try_init(|| async {
                debug!(user = self.user.as_str(), "establishing connection");
                self.dialer.dial(&self.url).await.map_err(|err| {
                    error!(error = err.to_string(), "failure to connect");
                    err
                })
            })
            .await
            .cloned()
    }
}

/// Applies qos and topology on `channel`, then opens the delivery stream.
async fn prepare(
    channel: &dyn TransportChannel,
    topology: &SubscriptionTopology,
    options: &SubscriptionOptions,
) -> Result<(String, String, DeliveryStream), PulseError> {
    if let Err(err) = channel.qos(options.prefetch).await {
        error!(error = err.to_string(), "failure to configure qos");
        return Err(err);
    }

    let queue_name = topology.install(channel).await?;

    let consumer_tag = new_consumer_tag();
    match channel
        .consume(&queue_name, &consumer_tag, options.auto_ack)
        .await
    {
        Ok(stream) => Ok((queue_name, consumer_tag, stream)),
        Err(err) => {
            error!(error = err.to_string(), "error to create the consumer");
            Err(err)
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("user", &self.user)
            .field("namespace", &self.namespace)
            .field("ambiguity", &self.ambiguity)
            .field("established", &self.is_established())
            .finish_non_exhaustive()
    }
}
