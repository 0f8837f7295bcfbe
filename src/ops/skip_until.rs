use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::Observer;
use crate::subject::Subject;
use crate::subscriber::Subscriber;
use crate::subscription::{CompositeSubscription, SubscriptionLike};

/// Suppress values from `source` until `notifier` emits its first value.
///
/// The first notifier value opens the gate and releases the notifier
/// subscription. A notifier error propagates downstream at any point, even
/// after the source completed while still gated; a notifier completion
/// without a value leaves the gate closed forever. A gated source completion
/// is swallowed: only the source subscription is released, and the stream
/// stays open for the notifier to terminate it.
#[derive(Clone)]
pub struct SkipUntilOp<S, N> {
  source: S,
  notifier: N,
}

impl<S, N> SkipUntilOp<S, N> {
  pub(crate) fn new(source: S, notifier: N) -> Self { SkipUntilOp { source, notifier } }
}

impl<S, N> Observable for SkipUntilOp<S, N>
where
  S: Observable,
  N: Observable<Err = S::Err>,
  S::Item: Clone + Send + 'static,
  S::Err: Clone + Send + 'static,
  N::Item: 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(
    self, subscriber: Subscriber<S::Item, S::Err>,
  ) -> CompositeSubscription {
    let mut lifetime = subscriber.subscription();
    // The hub adopts the downstream lifetime: a terminal event from either
    // leg, or a downstream unsubscribe, tears down everything at once.
    let hub = Subject::with_subscription(lifetime.clone());
    let input = hub.subscriber();
    hub.observable().actual_subscribe(subscriber);

    let gate = Arc::new(AtomicBool::new(false));

    let trigger_lifetime = CompositeSubscription::default();
    let trigger = Subscriber::with_lifetime(
      trigger_lifetime.clone(),
      TriggerObserver {
        input: input.clone(),
        gate: gate.clone(),
        lifetime: trigger_lifetime.clone(),
        _marker: PhantomData,
      },
    );
    lifetime.add(Box::new(trigger_lifetime));

    let source_lifetime = CompositeSubscription::default();
    let source = Subscriber::with_lifetime(
      source_lifetime.clone(),
      SourceObserver { input, gate, lifetime: source_lifetime.clone() },
    );
    lifetime.add(Box::new(source_lifetime));

    self.notifier.actual_subscribe(trigger);
    self.source.actual_subscribe(source);

    lifetime
  }
}

struct TriggerObserver<NItem, Item, Err> {
  input: Subscriber<Item, Err>,
  gate: Arc<AtomicBool>,
  lifetime: CompositeSubscription,
  _marker: PhantomData<fn(NItem)>,
}

impl<NItem, Item, Err> Observer for TriggerObserver<NItem, Item, Err> {
  type Item = NItem;
  type Err = Err;

  fn next(&mut self, _value: NItem) {
    self.gate.store(true, Ordering::Release);
    self.lifetime.unsubscribe();
  }

  fn error(&mut self, err: Err) { self.input.error(err); }

  // Completing without a value never opens the gate; only this leg ends.
  fn complete(&mut self) { self.lifetime.unsubscribe(); }

  fn is_stopped(&self) -> bool { self.gate.load(Ordering::Acquire) }
}

struct SourceObserver<Item, Err> {
  input: Subscriber<Item, Err>,
  gate: Arc<AtomicBool>,
  lifetime: CompositeSubscription,
}

impl<Item, Err> Observer for SourceObserver<Item, Err> {
  type Item = Item;
  type Err = Err;

  fn next(&mut self, value: Item) {
    if self.gate.load(Ordering::Acquire) {
      self.input.next(value);
    }
  }

  fn error(&mut self, err: Err) { self.input.error(err); }

  fn complete(&mut self) {
    if self.gate.load(Ordering::Acquire) {
      self.input.complete();
    } else {
      self.lifetime.unsubscribe();
    }
  }

  fn is_stopped(&self) -> bool { !self.input.is_subscribed() }
}
