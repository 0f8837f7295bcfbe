use std::marker::PhantomData;

use crate::observer::Observer;
use crate::ops::skip_until::SkipUntilOp;
use crate::subscriber::Subscriber;
use crate::subscription::CompositeSubscription;

/// A source of values: given a downstream subscriber, wires it up and returns
/// the subscription that releases it.
///
/// Observables are `Clone`; each subscribe consumes one handle and is an
/// independent attachment, so multi-subscribe is clone-then-subscribe.
pub trait Observable {
  type Item;
  type Err;

  fn actual_subscribe(self, subscriber: Subscriber<Self::Item, Self::Err>)
    -> CompositeSubscription;
}

/// Consumer-side conveniences over [`Observable`].
pub trait ObservableExt: Observable + Sized {
  /// Subscribe with a value handler. An error reaching this subscription is a
  /// bug in the caller's wiring and panics.
  fn subscribe<N>(self, next: N) -> CompositeSubscription
  where
    N: FnMut(Self::Item) + Send + 'static,
    Self::Item: 'static,
    Self::Err: 'static,
  {
    self.subscribe_all(next, |_| panic!("unhandled error delivered to `subscribe`"), || {})
  }

  fn subscribe_all<N, E, C>(self, next: N, error: E, complete: C) -> CompositeSubscription
  where
    N: FnMut(Self::Item) + Send + 'static,
    E: FnMut(Self::Err) + Send + 'static,
    C: FnMut() + Send + 'static,
    Self::Item: 'static,
    Self::Err: 'static,
  {
    self.actual_subscribe(Subscriber::new(FnObserver {
      next,
      error,
      complete,
      _marker: PhantomData,
    }))
  }

  /// Suppress values from this observable until `notifier` first emits.
  fn skip_until<N>(self, notifier: N) -> SkipUntilOp<Self, N>
  where
    N: Observable<Err = Self::Err>,
  {
    SkipUntilOp::new(self, notifier)
  }
}

impl<T: Observable> ObservableExt for T {}

struct FnObserver<N, E, C, Item, Err> {
  next: N,
  error: E,
  complete: C,
  _marker: PhantomData<fn(Item, Err)>,
}

impl<N, E, C, Item, Err> Observer for FnObserver<N, E, C, Item, Err>
where
  N: FnMut(Item),
  E: FnMut(Err),
  C: FnMut(),
{
  type Item = Item;
  type Err = Err;

  fn next(&mut self, value: Item) { (self.next)(value); }

  fn error(&mut self, err: Err) { (self.error)(err); }

  fn complete(&mut self) { (self.complete)(); }

  fn is_stopped(&self) -> bool { false }
}
