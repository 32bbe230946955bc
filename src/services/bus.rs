//! Event Bus
//!
//! Typed publish/subscribe registry shared by the services and the widgets.
//!
//! Every channel is a marker type implementing [`Channel`], which ties a
//! channel name to exactly one payload type. Cache and dedup policies are
//! declared once through [`EventBusBuilder`] and cannot change afterwards.
//!
//! ## Delivery
//!
//! ```text
//! publish(payload)
//!       │
//!       ▼
//! dedup check ── equal to previous ──▶ dropped
//!       │
//!       ▼
//! cache update (cached channels)
//!       │
//!       ▼
//! callbacks in registration order (outside the registry lock)
//! ```
//!
//! A panicking callback is caught and logged so the remaining subscribers
//! still receive the value and the publisher never observes the panic.
//!
//! Deliveries (publishes and subscribe-time replays) are serialized per bus
//! with a reentrant lock: a callback may use the bus from its own thread,
//! while other threads wait until the delivery finishes. A subscriber thus
//! never sees an older value after a newer one, even on a multi-thread
//! runtime. Callbacks must not block on another thread that uses the bus.

use ahash::AHashMap;
use parking_lot::{Mutex, ReentrantMutex};
use std::any::{Any, TypeId};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// A named topic with a statically known payload type
pub trait Channel: 'static {
    /// Payload carried by every publish on this channel
    type Payload: Clone + Send + Sync + 'static;

    /// Channel name (e.g. "time.update")
    const NAME: &'static str;
}

/// One-level equality: top-level fields by value, shared nested data by
/// pointer identity.
pub trait ShallowEq {
    fn shallow_eq(&self, other: &Self) -> bool;
}

/// Change-deduplication policy of a channel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Dedup {
    /// Every publish is delivered
    #[default]
    None,
    /// Suppress publishes that are [`ShallowEq`] to the previous one
    Shallow,
    /// Suppress publishes that are structurally equal to the previous one
    Deep,
}

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type Comparator<T> = fn(&T, &T) -> bool;

/// Declaration of a single channel's policies
pub struct ChannelConfig<C: Channel> {
    cached: bool,
    dedup: Dedup,
    comparator: Option<Comparator<C::Payload>>,
    initial: Option<C::Payload>,
}

impl<C: Channel> ChannelConfig<C> {
    /// Uncached channel without deduplication
    pub fn new() -> Self {
        Self {
            cached: false,
            dedup: Dedup::None,
            comparator: None,
            initial: None,
        }
    }

    /// Retain the last published value and replay it to new subscribers
    pub fn cached(mut self) -> Self {
        self.cached = true;
        self
    }

    /// Seed the cache with a default value (implies [`cached`](Self::cached))
    pub fn initial(mut self, value: C::Payload) -> Self {
        self.cached = true;
        self.initial = Some(value);
        self
    }

    /// Drop publishes that are shallow-equal to the previous payload
    pub fn dedup_shallow(mut self) -> Self
    where
        C::Payload: ShallowEq,
    {
        self.dedup = Dedup::Shallow;
        self.comparator = Some(<C::Payload as ShallowEq>::shallow_eq);
        self
    }

    /// Drop publishes that are deeply equal to the previous payload
    pub fn dedup_deep(mut self) -> Self
    where
        C::Payload: PartialEq,
    {
        self.dedup = Dedup::Deep;
        self.comparator = Some(<C::Payload as PartialEq>::eq);
        self
    }
}

impl<C: Channel> Default for ChannelConfig<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-channel registry entry
struct ChannelSlot<T> {
    name: &'static str,
    cached: bool,
    dedup: Dedup,
    comparator: Option<Comparator<T>>,
    /// Last delivered payload (kept for replay and/or dedup)
    last: Option<T>,
    subscribers: Vec<(u64, Callback<T>)>,
}

impl<T: Clone + Send + Sync + 'static> ChannelSlot<T> {
    fn retains_last(&self) -> bool {
        self.cached || self.comparator.is_some()
    }
}

/// Type-erased view of a [`ChannelSlot`] so handles can be removed without
/// knowing the payload type.
trait ErasedSlot: Send {
    fn name(&self) -> &'static str;
    fn dedup(&self) -> Dedup;
    fn is_cached(&self) -> bool;
    fn remove(&mut self, id: u64) -> bool;
    fn subscriber_count(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Clone + Send + Sync + 'static> ErasedSlot for ChannelSlot<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn dedup(&self) -> Dedup {
        self.dedup
    }

    fn is_cached(&self) -> bool {
        self.cached
    }

    fn remove(&mut self, id: u64) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

type Registry = AHashMap<TypeId, Box<dyn ErasedSlot>>;

/// Distinguishes handles of different buses
static NEXT_BUS_ID: AtomicU64 = AtomicU64::new(1);

/// Builder declaring the channels of an [`EventBus`]
#[derive(Default)]
pub struct EventBusBuilder {
    channels: Registry,
}

impl EventBusBuilder {
    /// Declare a channel
    ///
    /// # Panics
    ///
    /// Panics if the channel (or another channel with the same name) was
    /// already declared.
    pub fn channel<C: Channel>(mut self, config: ChannelConfig<C>) -> Self {
        assert!(
            !self.channels.values().any(|slot| slot.name() == C::NAME),
            "channel `{}` declared twice",
            C::NAME
        );

        let slot = ChannelSlot::<C::Payload> {
            name: C::NAME,
            cached: config.cached,
            dedup: config.dedup,
            comparator: config.comparator,
            last: config.initial,
            subscribers: Vec::new(),
        };
        self.channels.insert(TypeId::of::<C>(), Box::new(slot));
        self
    }

    /// Freeze the declarations into a bus
    pub fn build(self) -> EventBus {
        EventBus {
            inner: Arc::new(BusInner {
                id: NEXT_BUS_ID.fetch_add(1, Ordering::Relaxed),
                registry: Mutex::new(self.channels),
                delivery: ReentrantMutex::new(()),
                next_id: AtomicU64::new(1),
            }),
        }
    }
}

struct BusInner {
    id: u64,
    registry: Mutex<Registry>,
    /// Held while callbacks run; never taken while `registry` is held
    delivery: ReentrantMutex<()>,
    next_id: AtomicU64,
}

/// Handle identifying one registration on the bus
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription {
    bus: u64,
    channel: TypeId,
    name: &'static str,
    id: u64,
}

impl Subscription {
    /// Name of the channel this subscription listens on
    pub fn channel_name(&self) -> &'static str {
        self.name
    }

    /// Unique id of the registration
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Unsubscribes when dropped. Tie it to the lifetime of the consumer.
#[must_use = "dropping the guard unsubscribes immediately"]
pub struct SubscriptionGuard {
    bus: Weak<BusInner>,
    subscription: Subscription,
}

impl SubscriptionGuard {
    /// The underlying subscription handle
    pub fn subscription(&self) -> Subscription {
        self.subscription
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            remove_subscription(&inner, self.subscription);
        }
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("subscription", &self.subscription)
            .finish()
    }
}

/// Typed publish/subscribe bus
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Start declaring channels
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::default()
    }

    /// Register `callback` for all future publishes on `C`
    ///
    /// On a cached channel the callback is invoked right away with the
    /// cached value, if there is one.
    ///
    /// # Panics
    ///
    /// Panics if `C` was not declared on this bus.
    pub fn subscribe<C: Channel>(
        &self,
        callback: impl Fn(&C::Payload) + Send + Sync + 'static,
    ) -> Subscription {
        self.register::<C>(Arc::new(callback), None)
    }

    /// Like [`subscribe`](Self::subscribe), but replays `fallback` when
    /// nothing was ever published on the channel.
    pub fn subscribe_with_fallback<C: Channel>(
        &self,
        callback: impl Fn(&C::Payload) + Send + Sync + 'static,
        fallback: C::Payload,
    ) -> Subscription {
        self.register::<C>(Arc::new(callback), Some(fallback))
    }

    /// Like [`subscribe`](Self::subscribe), unsubscribing when the returned
    /// guard is dropped.
    pub fn subscribe_scoped<C: Channel>(
        &self,
        callback: impl Fn(&C::Payload) + Send + Sync + 'static,
    ) -> SubscriptionGuard {
        let subscription = self.subscribe::<C>(callback);
        SubscriptionGuard {
            bus: Arc::downgrade(&self.inner),
            subscription,
        }
    }

    /// Remove a registration. Returns `false` if it was already removed or
    /// belongs to another bus.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        remove_subscription(&self.inner, subscription)
    }

    /// Publish `payload` on `C`
    ///
    /// # Panics
    ///
    /// Panics if `C` was not declared on this bus.
    pub fn publish<C: Channel>(&self, payload: C::Payload) {
        let _delivery = self.inner.delivery.lock();
        let targets = {
            let mut registry = self.inner.registry.lock();
            let slot = slot_mut::<C>(&mut registry);

            if let (Some(same), Some(previous)) = (slot.comparator, slot.last.as_ref()) {
                if same(previous, &payload) {
                    tracing::trace!(channel = C::NAME, "Suppressed duplicate publish");
                    return;
                }
            }

            if slot.retains_last() {
                slot.last = Some(payload.clone());
            }
            slot.subscribers.clone()
        };

        tracing::trace!(
            channel = C::NAME,
            subscribers = targets.len(),
            "Delivering publish"
        );
        for (id, callback) in &targets {
            deliver(C::NAME, *id, callback, &payload);
        }
    }

    /// Last cached value of `C` (`None` for uncached channels)
    pub fn cached<C: Channel>(&self) -> Option<C::Payload> {
        let mut registry = self.inner.registry.lock();
        let slot = slot_mut::<C>(&mut registry);
        if slot.cached { slot.last.clone() } else { None }
    }

    /// Number of live registrations on `C`
    pub fn subscriber_count<C: Channel>(&self) -> usize {
        let mut registry = self.inner.registry.lock();
        slot_mut::<C>(&mut registry).subscribers.len()
    }

    /// Whether `C` was declared on this bus
    pub fn has_channel<C: Channel>(&self) -> bool {
        self.inner
            .registry
            .lock()
            .get(&TypeId::of::<C>())
            .is_some_and(|slot| slot.as_any().is::<ChannelSlot<C::Payload>>())
    }

    fn register<C: Channel>(
        &self,
        callback: Callback<C::Payload>,
        fallback: Option<C::Payload>,
    ) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let _delivery = self.inner.delivery.lock();
        let replay = {
            let mut registry = self.inner.registry.lock();
            let slot = slot_mut::<C>(&mut registry);
            slot.subscribers.push((id, callback.clone()));
            if slot.cached {
                slot.last.clone().or(fallback)
            } else {
                fallback
            }
        };

        tracing::debug!(channel = C::NAME, subscription = id, "Subscribed");

        if let Some(value) = replay {
            deliver(C::NAME, id, &callback, &value);
        }

        Subscription {
            bus: self.inner.id,
            channel: TypeId::of::<C>(),
            name: C::NAME,
            id,
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.inner.registry.lock();
        let mut channels: Vec<_> = registry
            .values()
            .map(|slot| {
                (
                    slot.name(),
                    slot.is_cached(),
                    slot.dedup(),
                    slot.subscriber_count(),
                )
            })
            .collect();
        channels.sort_by_key(|(name, ..)| *name);

        f.debug_struct("EventBus")
            .field("channels", &channels)
            .finish()
    }
}

fn remove_subscription(inner: &BusInner, subscription: Subscription) -> bool {
    if subscription.bus != inner.id {
        tracing::warn!(
            channel = subscription.name,
            subscription = subscription.id,
            "Ignoring unsubscribe with a handle from another bus"
        );
        return false;
    }

    let removed = inner
        .registry
        .lock()
        .get_mut(&subscription.channel)
        .is_some_and(|slot| slot.remove(subscription.id));

    if removed {
        tracing::debug!(
            channel = subscription.name,
            subscription = subscription.id,
            "Unsubscribed"
        );
    }
    removed
}

#[track_caller]
fn slot_mut<C: Channel>(registry: &mut Registry) -> &mut ChannelSlot<C::Payload> {
    registry
        .get_mut(&TypeId::of::<C>())
        .and_then(|slot| slot.as_any_mut().downcast_mut::<ChannelSlot<C::Payload>>())
        .unwrap_or_else(|| panic!("channel `{}` is not declared on this bus", C::NAME))
}

fn deliver<T>(channel: &'static str, id: u64, callback: &Callback<T>, payload: &T) {
    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| callback(payload))) {
        tracing::error!(
            channel,
            subscription = id,
            "Subscriber panicked: {}",
            panic_message(panic.as_ref())
        );
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic>"
    }
}
