// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use std::collections::{HashMap, VecDeque};

use bevy_ecs::resource::Resource;
use log::{debug, trace};
use slotmap::SlotMap;

use crate::handles::SubscriptionHandle;
use crate::messaging::message::{Message, MessagePayload};

struct Subscriber {
    topic: String,
    inbox: VecDeque<Message>,
    once: bool,
}

/// Topic based pub/sub context. Nothing is dispatched re-entrantly: `publish` only fills
/// inboxes, and each subscriber drains its own inbox with `take_messages` when it is ready.
#[derive(Resource, Default)]
pub struct MessageBus {
    subscribers: SlotMap<SubscriptionHandle, Subscriber>,
    topics: HashMap<String, Vec<SubscriptionHandle>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to every future message on `topic`.
    pub fn subscribe(&mut self, topic: impl Into<String>) -> SubscriptionHandle {
        self.insert_subscriber(topic.into(), false)
    }

    /// Subscribes a one-shot slot: once it holds an image it takes nothing further, and it
    /// is released when its messages have been taken.
    pub fn subscribe_once(&mut self, topic: impl Into<String>) -> SubscriptionHandle {
        self.insert_subscriber(topic.into(), true)
    }

    fn insert_subscriber(&mut self, topic: String, once: bool) -> SubscriptionHandle {
        let handle = self.subscribers.insert(Subscriber {
            topic: topic.clone(),
            inbox: VecDeque::new(),
            once,
        });
        debug!("Subscribed {:?} to '{}' (once: {})", handle, topic, once);
        self.topics.entry(topic).or_default().push(handle);
        handle
    }

    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) -> bool {
        let Some(subscriber) = self.subscribers.remove(handle) else {
            return false;
        };

        if let Some(handles) = self.topics.get_mut(&subscriber.topic) {
            handles.retain(|h| *h != handle);
            if handles.is_empty() {
                self.topics.remove(&subscriber.topic);
            }
        }
        debug!("Unsubscribed {:?} from '{}'", handle, subscriber.topic);
        true
    }

    /// Delivers a copy of the message to every subscriber of exactly `topic`.
    /// Returns the number of inboxes the message landed in.
    pub fn publish(&mut self, topic: &str, payload: MessagePayload) -> usize {
        let Some(handles) = self.topics.get(topic) else {
            trace!("No subscribers for '{}'", topic);
            return 0;
        };

        let mut delivered = 0;
        for handle in handles {
            let Some(subscriber) = self.subscribers.get_mut(*handle) else {
                continue;
            };
            // A one-shot slot is resolved by its first image, not by messages without one.
            if subscriber.once
                && subscriber
                    .inbox
                    .iter()
                    .any(|message| message.image_asset().is_some())
            {
                continue;
            }
            subscriber
                .inbox
                .push_back(Message::new(topic, payload.clone()));
            delivered += 1;
        }
        delivered
    }

    /// Drains the inbox of `handle`. A one-shot subscription is released once it has
    /// handed out its message.
    pub fn take_messages(&mut self, handle: SubscriptionHandle) -> Vec<Message> {
        let Some(subscriber) = self.subscribers.get_mut(handle) else {
            return Vec::new();
        };

        let messages: Vec<Message> = subscriber.inbox.drain(..).collect();
        if subscriber.once && !messages.is_empty() {
            self.unsubscribe(handle);
        }
        messages
    }

    pub fn is_subscribed(&self, handle: SubscriptionHandle) -> bool {
        self.subscribers.contains_key(handle)
    }

    pub fn pending_count(&self, handle: SubscriptionHandle) -> usize {
        self.subscribers
            .get(handle)
            .map_or(0, |subscriber| subscriber.inbox.len())
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
