// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Definitions
//!
//! Every queue a subscription reads from lives under `queue/<namespace>/`,
//! where the namespace defaults to the connecting user. An anonymous queue
//! gets a random name and disappears with the connection; a named queue
//! survives disconnects and may be shared between consumers.

use lapin::{
    options::QueueDeclareOptions,
    types::{AMQPValue, FieldTable, LongInt, ShortString},
};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Argument limiting how many messages a queue holds
pub const AMQP_HEADERS_MAX_LENGTH: &str = "x-max-length";

/// Definition of a queue with its configuration parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueDefinition {
    pub(crate) name: String,
    pub(crate) delete: bool,
    pub(crate) exclusive: bool,
    pub(crate) max_length: Option<i32>,
}

impl QueueDefinition {
    /// Creates a new queue definition with the given name.
    ///
    /// The queue is non-durable, non-exclusive and kept when unused.
    pub fn new(name: &str) -> QueueDefinition {
        QueueDefinition {
            name: name.to_owned(),
            delete: false,
            exclusive: false,
            max_length: None,
        }
    }

    /// A queue private to this connection, deleted when the connection drops.
    pub fn anonymous(namespace: &str) -> QueueDefinition {
        QueueDefinition::new(&format!("queue/{}/{}", namespace, Uuid::new_v4()))
            .delete()
            .exclusive()
    }

    /// A queue that outlives the connection and may be shared by consumers.
    pub fn named(namespace: &str, name: &str) -> QueueDefinition {
        QueueDefinition::new(&format!("queue/{}/{}", namespace, name))
    }

    /// Picks [`QueueDefinition::anonymous`] for an empty name, [`QueueDefinition::named`] otherwise.
    pub fn for_subscription(namespace: &str, name: &str) -> QueueDefinition {
        if name.is_empty() {
            QueueDefinition::anonymous(namespace)
        } else {
            QueueDefinition::named(namespace, name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the queue to auto-delete when no longer used.
    pub fn delete(mut self) -> Self {
        self.delete = true;
        self
    }

    /// Makes the queue exclusive to the connection.
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Sets the maximum number of messages the queue can hold.
    ///
    /// When this limit is reached the broker drops the oldest messages.
    pub fn max_length(mut self, max: i32) -> Self {
        self.max_length = Some(max);
        self
    }

    pub(crate) fn options(&self) -> QueueDeclareOptions {
        QueueDeclareOptions {
            passive: false,
            durable: false,
            exclusive: self.exclusive,
            auto_delete: self.delete,
            nowait: false,
        }
    }

    pub(crate) fn arguments(&self) -> FieldTable {
        let mut args = BTreeMap::new();

        if let Some(max) = self.max_length {
            args.insert(
                ShortString::from(AMQP_HEADERS_MAX_LENGTH),
                AMQPValue::LongInt(LongInt::from(max)),
            );
        }

        FieldTable::from(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_queue_is_exclusive_and_auto_deleted() {
        let def = QueueDefinition::for_subscription("pmoore_test1", "");
        assert!(def.name().starts_with("queue/pmoore_test1/"));
        assert_eq!(def.name().len(), "queue/pmoore_test1/".len() + 36);

        let opts = def.options();
        assert!(!opts.durable);
        assert!(opts.auto_delete);
        assert!(opts.exclusive);
    }

    #[test]
    fn anonymous_queues_get_distinct_names() {
        let a = QueueDefinition::anonymous("u");
        let b = QueueDefinition::anonymous("u");
        assert_ne!(a.name(), b.name());
    }

    #[test]
    fn named_queue_is_shared_and_kept() {
        let def = QueueDefinition::for_subscription("pmoore_test1", "taskprocessing");
        assert_eq!(def.name(), "queue/pmoore_test1/taskprocessing");

        let opts = def.options();
        assert!(!opts.durable);
        assert!(!opts.auto_delete);
        assert!(!opts.exclusive);
        assert!(def.arguments().inner().is_empty());
    }

    #[test]
    fn max_length_becomes_a_queue_argument() {
        let def = QueueDefinition::named("u", "q").max_length(100);
        let args = def.arguments();
        assert_eq!(
            args.inner().get(AMQP_HEADERS_MAX_LENGTH),
            Some(&AMQPValue::LongInt(100))
        );
    }
}
