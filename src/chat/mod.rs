//! Chat stream - a plain message list bound to the `messages` collection.
//!
//! No lifecycle here: messages are written once and rendered in send order.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ChatError;
use crate::identity::Viewer;
use crate::lifecycle::{Clock, UtcClock};
use crate::store::{ChangeStream, ContentStore, Query, RecordStoreExt};
use crate::Record;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Record)]
#[record(collection = "messages")]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[record(id)]
    #[serde(default)]
    pub id: String,
    pub sender_id: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn is_own(&self, viewer: &Viewer) -> bool {
        self.sender_id == viewer.user_id()
    }
}

pub struct ChatStream<S: ContentStore, C = UtcClock> {
    store: S,
    clock: C,
    config: Config,
    subscription: S::Stream,
    messages: HashMap<String, ChatMessage>,
}

impl<S: ContentStore> ChatStream<S, UtcClock> {
    pub fn new(store: S, config: Config) -> Result<Self, ChatError> {
        Self::with_clock(store, UtcClock, config)
    }
}

impl<S: ContentStore, C: Clock> ChatStream<S, C> {
    pub fn with_clock(store: S, clock: C, config: Config) -> Result<Self, ChatError> {
        let subscription = store.subscribe(Query::of::<ChatMessage>())?;
        Ok(Self {
            store,
            clock,
            config,
            subscription,
            messages: HashMap::new(),
        })
    }

    /// Send `text` as `viewer`. Surrounding whitespace is trimmed.
    pub fn send(&self, viewer: &Viewer, text: &str) -> Result<ChatMessage, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let len = text.chars().count();
        if len > self.config.max_message_len {
            return Err(ChatError::TooLong {
                len,
                max: self.config.max_message_len,
            });
        }

        let message = ChatMessage {
            id: String::new(),
            sender_id: viewer.user_id().to_string(),
            text: text.to_string(),
            sent_at: self.clock.now(),
        };
        let message = self.store.create_record(&message)?;
        debug!(message_id = %message.id, sender = %message.sender_id, "message sent");
        Ok(message)
    }

    /// Fold pending changes into the list. Returns the number applied.
    pub fn refresh(&mut self) -> Result<usize, ChatError> {
        let mut applied = 0;
        for change in self.subscription.drain()? {
            match change.document.decode::<ChatMessage>() {
                Ok(message) => {
                    self.messages.insert(message.id.clone(), message);
                    applied += 1;
                }
                Err(err) => {
                    warn!(document = %change.document.reference, error = %err, "skipping undecodable message");
                }
            }
        }
        Ok(applied)
    }

    /// Messages in send order.
    pub fn messages(&self) -> Vec<&ChatMessage> {
        let mut messages: Vec<&ChatMessage> = self.messages.values().collect();
        messages.sort_by(|a, b| a.sent_at.cmp(&b.sent_at).then_with(|| a.id.cmp(&b.id)));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::FixedClock;
    use crate::store::InMemoryContentStore;
    use chrono::{Duration, NaiveDate};

    fn stream() -> (ChatStream<InMemoryContentStore, FixedClock>, FixedClock) {
        let clock = FixedClock::on(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        let chat = ChatStream::with_clock(
            InMemoryContentStore::new(),
            clock.clone(),
            Config::default().with_max_message_len(5),
        )
        .unwrap();
        (chat, clock)
    }

    #[test]
    fn send_trims_and_stores() {
        let (mut chat, _) = stream();
        let ada = Viewer::new("ada");

        let sent = chat.send(&ada, "  hi  ").unwrap();
        assert_eq!(sent.text, "hi");
        assert!(!sent.id.is_empty());
        assert!(sent.is_own(&ada));
        assert!(!sent.is_own(&Viewer::new("bob")));

        assert_eq!(chat.refresh().unwrap(), 1);
        assert_eq!(chat.messages(), vec![&sent]);
    }

    #[test]
    fn rejects_empty_and_too_long() {
        let (chat, _) = stream();
        let ada = Viewer::new("ada");
        assert_eq!(chat.send(&ada, "   ").unwrap_err(), ChatError::EmptyMessage);
        assert_eq!(
            chat.send(&ada, "toolong").unwrap_err(),
            ChatError::TooLong { len: 7, max: 5 }
        );
    }

    #[test]
    fn messages_in_send_order() {
        let (mut chat, clock) = stream();
        let ada = Viewer::new("ada");
        let bob = Viewer::new("bob");

        chat.send(&ada, "one").unwrap();
        clock.advance(Duration::seconds(5));
        chat.send(&bob, "two").unwrap();
        clock.advance(Duration::seconds(5));
        chat.send(&ada, "three").unwrap();

        chat.refresh().unwrap();
        let texts: Vec<&str> = chat.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert_eq!(chat.refresh().unwrap(), 0);
    }
}
