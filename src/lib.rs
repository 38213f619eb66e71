// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Pulse
//!
//! A client for subscribing to topic exchanges on a Pulse AMQP broker.
//!
//! [`connection::Connection`] resolves credentials and dials the broker lazily;
//! [`connection::Connection::subscribe`] installs a queue bound to one or more
//! exchanges and hands each message, in order, to a [`handler::MessageHandler`].

mod consumer;
mod otel;
#[cfg(test)]
mod testing;

pub mod amqp;
pub mod binding;
pub mod config;
pub mod connection;
pub mod credentials;
pub mod errors;
pub mod exchange;
pub mod handler;
pub mod message;
pub mod queue;
pub mod subscription;
pub mod topology;
pub mod transport;
