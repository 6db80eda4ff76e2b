use actix::prelude::*;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const PROJECT_EVENTS_TOPIC: &str = "project-events";

/// Membership-change event announced to downstream consumers. The wire
/// shape is `{"type": "...", "projectId": "...", "userId": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Message)]
#[rtype(result = "()")]
#[serde(tag = "type")]
pub enum ProjectEvent {
    #[serde(rename = "user-added-to-project")]
    UserAdded {
        #[serde(rename = "projectId")]
        project_id: String,
        #[serde(rename = "userId")]
        user_id: String,
    },
    #[serde(rename = "user-removed-from-project")]
    UserRemoved {
        #[serde(rename = "projectId")]
        project_id: String,
        #[serde(rename = "userId")]
        user_id: String,
    },
}

/// Fire-and-forget publication. Called strictly after an atomic unit has
/// committed; implementations must never block or fail the caller.
pub trait NotificationEmitter: Send + Sync {
    fn publish(&self, topic: &str, event: ProjectEvent);
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Publish {
    pub topic: String,
    pub event: ProjectEvent,
}

#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct OutboundEvent {
    pub topic: String,
    pub payload: String,
}

#[derive(Message)]
#[rtype(result = "usize")]
pub struct Subscribe {
    pub addr: Recipient<OutboundEvent>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Unsubscribe {
    pub session_id: usize,
}

/// In-process event bus fanning project events out to websocket sessions.
pub struct EventBus {
    sessions: HashMap<usize, Recipient<OutboundEvent>>,
    next_id: usize,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus { sessions: HashMap::new(), next_id: 0 }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Actor for EventBus {
    type Context = Context<Self>;
}

impl Handler<Subscribe> for EventBus {
    type Result = usize;

    fn handle(&mut self, msg: Subscribe, _: &mut Context<Self>) -> usize {
        self.next_id += 1;
        self.sessions.insert(self.next_id, msg.addr);
        debug!("Event subscriber {} connected", self.next_id);
        self.next_id
    }
}

impl Handler<Unsubscribe> for EventBus {
    type Result = ();

    fn handle(&mut self, msg: Unsubscribe, _: &mut Context<Self>) {
        self.sessions.remove(&msg.session_id);
        debug!("Event subscriber {} disconnected", msg.session_id);
    }
}

impl Handler<Publish> for EventBus {
    type Result = ();

    fn handle(&mut self, msg: Publish, _: &mut Context<Self>) {
        let payload = serde_json::to_string(&msg.event).unwrap_or_default();
        info!("Publishing to {}: {}", msg.topic, payload);
        for addr in self.sessions.values() {
            addr.do_send(OutboundEvent { topic: msg.topic.clone(), payload: payload.clone() });
        }
    }
}

/// Production [`NotificationEmitter`] backed by the [`EventBus`] actor.
pub struct BusEmitter {
    addr: Addr<EventBus>,
}

impl BusEmitter {
    pub fn new(addr: Addr<EventBus>) -> Self {
        BusEmitter { addr }
    }
}

impl NotificationEmitter for BusEmitter {
    fn publish(&self, topic: &str, event: ProjectEvent) {
        // do_send drops the message if the bus is gone; the commit already
        // happened, so the caller never observes emitter failures.
        self.addr.do_send(Publish { topic: topic.to_string(), event });
    }
}
