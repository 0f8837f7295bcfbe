use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::observer::Observer;
use crate::subscription::{CompositeSubscription, SubscriptionLike};

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity tag carried by every [`Subscriber`], used only to correlate trace
/// events between an upstream and the observers it hands values to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TraceId(u64);

impl TraceId {
  /// Allocate a fresh process-wide id.
  pub fn next() -> Self { TraceId(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed)) }
}

impl fmt::Display for TraceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "s{}", self.0) }
}

type SharedObserver<Item, Err> = Arc<Mutex<Box<dyn Observer<Item = Item, Err = Err> + Send>>>;

/// An observer paired with its subscription lifetime and a trace id.
///
/// Delivery goes through `&self`: the observer sits in a shared cell, so a
/// subscriber can be held by several snapshots at once. Every delivery is
/// gated on [`is_subscribed`](Self::is_subscribed), and a terminal delivery
/// (`error` or `complete`) closes the lifetime, so at most one terminal
/// notification ever reaches the observer.
pub struct Subscriber<Item, Err> {
  observer: SharedObserver<Item, Err>,
  lifetime: CompositeSubscription,
  id: TraceId,
}

impl<Item, Err> Clone for Subscriber<Item, Err> {
  fn clone(&self) -> Self {
    Subscriber { observer: self.observer.clone(), lifetime: self.lifetime.clone(), id: self.id }
  }
}

impl<Item, Err> Subscriber<Item, Err> {
  pub fn new<O>(observer: O) -> Self
  where
    O: Observer<Item = Item, Err = Err> + Send + 'static,
  {
    Self::from_parts(TraceId::next(), CompositeSubscription::default(), observer)
  }

  /// Bind `observer` to a caller-provided lifetime.
  pub fn with_lifetime<O>(lifetime: CompositeSubscription, observer: O) -> Self
  where
    O: Observer<Item = Item, Err = Err> + Send + 'static,
  {
    Self::from_parts(TraceId::next(), lifetime, observer)
  }

  pub fn from_parts<O>(id: TraceId, lifetime: CompositeSubscription, observer: O) -> Self
  where
    O: Observer<Item = Item, Err = Err> + Send + 'static,
  {
    let observer: Box<dyn Observer<Item = Item, Err = Err> + Send> = Box::new(observer);
    Subscriber { observer: Arc::new(Mutex::new(observer)), lifetime, id }
  }

  pub fn id(&self) -> TraceId { self.id }

  /// A handle to this subscriber's lifetime.
  pub fn subscription(&self) -> CompositeSubscription { self.lifetime.clone() }

  pub fn is_subscribed(&self) -> bool { !self.lifetime.is_closed() }

  pub fn next(&self, value: Item) {
    if self.is_subscribed() {
      self.observer.lock().unwrap().next(value);
    }
  }

  pub fn error(&self, err: Err) {
    if !self.is_subscribed() {
      return;
    }
    self.observer.lock().unwrap().error(err);
    self.lifetime.clone().unsubscribe();
  }

  pub fn complete(&self) {
    if !self.is_subscribed() {
      return;
    }
    self.observer.lock().unwrap().complete();
    self.lifetime.clone().unsubscribe();
  }
}
