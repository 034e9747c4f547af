//! State-change events and their typed publish/subscribe channels.
//!
//! The state store records [`StateChange`]s without knowing who listens.
//! The session drains them and hands each one to [`EventNotifier::publish`],
//! which routes it to the channel of its category.
//!
//! Subscribers are held weakly: a subscription lives exactly as long as the
//! [`Subscription`] guard returned by `subscribe`.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// What happened to the affected entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// A segmentation was added, removed, or had its data or segment state changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationEvent {
    pub kind: ChangeKind,
    pub segmentation_id: String,
}

/// A representation changed within a tool group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepresentationEvent {
    pub kind: ChangeKind,
    pub tool_group_id: String,
    pub segmentation_representation_uid: String,
    pub segmentation_id: String,
}

/// Which configuration layer changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigScope {
    Global,
    ToolGroup(String),
    ColorLut(u32),
}

/// A configuration layer or color table changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEvent {
    pub kind: ChangeKind,
    pub scope: ConfigScope,
}

/// One logical state change, as recorded by the state store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateChange {
    Segmentation(SegmentationEvent),
    Representation(RepresentationEvent),
    Config(ConfigEvent),
}

impl StateChange {
    pub fn segmentation(kind: ChangeKind, segmentation_id: impl Into<String>) -> Self {
        StateChange::Segmentation(SegmentationEvent {
            kind,
            segmentation_id: segmentation_id.into(),
        })
    }

    pub fn config(kind: ChangeKind, scope: ConfigScope) -> Self {
        StateChange::Config(ConfigEvent { kind, scope })
    }
}

type Callback<E> = Rc<dyn Fn(&E)>;

/// RAII guard for a subscriber callback. Dropping it unsubscribes.
pub struct Subscription {
    _guard: Box<dyn Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// A publish/subscribe channel for one event type.
pub struct EventChannel<E> {
    subscribers: RefCell<Vec<Weak<dyn Fn(&E)>>>,
}

impl<E> Default for EventChannel<E> {
    fn default() -> Self {
        Self {
            subscribers: RefCell::new(Vec::new()),
        }
    }
}

impl<E: 'static> EventChannel<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. It stays registered until the guard is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&E) + 'static) -> Subscription {
        let strong: Callback<E> = Rc::new(callback);
        self.subscribers.borrow_mut().push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Deliver an event to live subscribers in registration order.
    /// Returns how many callbacks ran.
    pub fn publish(&self, event: &E) -> usize {
        // Collect first so callbacks may subscribe without a borrow conflict.
        let live: Vec<Callback<E>> = {
            let mut subscribers = self.subscribers.borrow_mut();
            subscribers.retain(|w| w.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        for callback in &live {
            callback(event);
        }
        live.len()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

/// Routes state changes to one channel per category.
#[derive(Default)]
pub struct EventNotifier {
    segmentation: EventChannel<SegmentationEvent>,
    representation: EventChannel<RepresentationEvent>,
    config: EventChannel<ConfigEvent>,
}

impl EventNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segmentation(&self) -> &EventChannel<SegmentationEvent> {
        &self.segmentation
    }

    pub fn representation(&self) -> &EventChannel<RepresentationEvent> {
        &self.representation
    }

    pub fn config(&self) -> &EventChannel<ConfigEvent> {
        &self.config
    }

    /// Publish one change on its category channel.
    pub fn publish(&self, change: &StateChange) -> usize {
        log::debug!("Publishing {:?}", change);
        match change {
            StateChange::Segmentation(e) => self.segmentation.publish(e),
            StateChange::Representation(e) => self.representation.publish(e),
            StateChange::Config(e) => self.config.publish(e),
        }
    }
}
