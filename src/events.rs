use crate::cache::ServerCache;
use crate::features::FeatureFlags;
use crate::memory::Memory;
use crate::tasks::tasksystem::TaskRegistry;
use crate::world::WorldState;
use log::*;
use screeps::RoomName;

#[derive(Clone, Debug, PartialEq)]
pub enum LifecycleEvent {
    TickStart,
    TickEnd,
    /// The environment was rebuilt and memory reloaded from the durable store.
    HardReset,
    RoomDiscovered(RoomName),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    TickStart,
    TickEnd,
    HardReset,
    RoomDiscovered,
}

impl LifecycleEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LifecycleEvent::TickStart => EventKind::TickStart,
            LifecycleEvent::TickEnd => EventKind::TickEnd,
            LifecycleEvent::HardReset => EventKind::HardReset,
            LifecycleEvent::RoomDiscovered(_) => EventKind::RoomDiscovered,
        }
    }
}

pub struct EventContext<'a> {
    pub time: u32,
    pub world: &'a WorldState,
    pub memory: &'a mut Memory,
    pub cache: &'a mut ServerCache,
    pub features: &'a FeatureFlags,
    pub tasks: &'a TaskRegistry,
}

pub type EventHandler = Box<dyn FnMut(&LifecycleEvent, &mut EventContext) + Send + Sync>;

/// Synchronous publish/subscribe for lifecycle transitions. Handlers run in subscription order.
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<(EventKind, &'static str, EventHandler)>,
}

impl EventBus {
    pub fn new() -> EventBus {
        EventBus::default()
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, name: &'static str, handler: F)
    where
        F: FnMut(&LifecycleEvent, &mut EventContext) + Send + Sync + 'static,
    {
        self.handlers.push((kind, name, Box::new(handler)));
    }

    pub fn publish(&mut self, event: &LifecycleEvent, context: &mut EventContext) {
        let kind = event.kind();

        for (handler_kind, name, handler) in self.handlers.iter_mut() {
            if *handler_kind == kind {
                trace!("[Event] {:?} -> {}", event, name);

                (handler)(event, context);
            }
        }
    }

    pub fn subscribers(&self, kind: EventKind) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers
            .iter()
            .filter(move |(handler_kind, _, _)| *handler_kind == kind)
            .map(|(_, name, _)| *name)
    }
}
