use crate::multicast::MulticastObserver;
use crate::observable::Observable;
use crate::subscriber::Subscriber;
use crate::subscription::CompositeSubscription;

/// A hot stream hub: both a sink and a source.
///
/// Values pushed through [`subscriber`](Self::subscriber) are broadcast to
/// every observer attached through [`observable`](Self::observable). The
/// subject terminates at most once; observers attaching afterwards receive
/// the terminal signal immediately.
pub struct Subject<Item, Err> {
  cast: MulticastObserver<Item, Err>,
}

impl<Item, Err> Clone for Subject<Item, Err> {
  fn clone(&self) -> Self { Subject { cast: self.cast.clone() } }
}

impl<Item, Err> Default for Subject<Item, Err> {
  fn default() -> Self { Self::new() }
}

impl<Item, Err> Subject<Item, Err> {
  /// A subject with a fresh composite lifetime.
  pub fn new() -> Self { Self::with_subscription(CompositeSubscription::default()) }

  /// A subject that adopts `lifetime` as its shared composite. Termination
  /// unsubscribes it; unsubscribing it externally silences the subject.
  pub fn with_subscription(lifetime: CompositeSubscription) -> Self {
    Subject { cast: MulticastObserver::new(lifetime) }
  }

  /// The subject's shared composite lifetime.
  pub fn subscription(&self) -> CompositeSubscription { self.cast.subscription() }

  pub fn has_observers(&self) -> bool { self.cast.has_observers() }
}

impl<Item, Err> Subject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  /// The input subscriber handed to producers.
  pub fn subscriber(&self) -> Subscriber<Item, Err> { self.cast.subscriber() }

  /// The subscription side. The observable holds a strong reference to the
  /// dispatcher, so it keeps the hub alive for as long as a consumer holds it.
  pub fn observable(&self) -> SubjectObservable<Item, Err> {
    SubjectObservable { cast: self.cast.clone() }
  }
}

/// The source half of a [`Subject`]. Every subscribe is an independent
/// admission into the dispatcher.
pub struct SubjectObservable<Item, Err> {
  cast: MulticastObserver<Item, Err>,
}

impl<Item, Err> Clone for SubjectObservable<Item, Err> {
  fn clone(&self) -> Self { SubjectObservable { cast: self.cast.clone() } }
}

impl<Item, Err> Observable for SubjectObservable<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn actual_subscribe(
    self, subscriber: Subscriber<Item, Err>,
  ) -> CompositeSubscription {
    let subscription = subscriber.subscription();
    self.cast.add(self.cast.id(), subscriber);
    subscription
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::observable::ObservableExt;
  use crate::subscription::SubscriptionLike;

  #[test]
  fn base_data_flow() {
    let subject = Subject::<i32, ()>::new();
    let seen = Arc::new(Mutex::new(0));
    let c_seen = seen.clone();

    subject
      .observable()
      .subscribe(move |v| *c_seen.lock().unwrap() = v * 2);

    subject.subscriber().next(1);
    assert_eq!(*seen.lock().unwrap(), 2);
  }

  #[test]
  fn early_and_late_subscribers() {
    let subject = Subject::<i32, ()>::new();
    let early = Arc::new(Mutex::new(vec![]));
    let late = Arc::new(Mutex::new(vec![]));

    let c_early = early.clone();
    subject
      .observable()
      .subscribe(move |v| c_early.lock().unwrap().push(v));

    let input = subject.subscriber();
    input.next(1);

    let c_late = late.clone();
    subject
      .observable()
      .subscribe(move |v| c_late.lock().unwrap().push(v));
    input.next(2);

    assert_eq!(*early.lock().unwrap(), vec![1, 2]);
    assert_eq!(*late.lock().unwrap(), vec![2]);
  }

  #[test]
  fn unsubscribe_stops_delivery() {
    let subject = Subject::<i32, ()>::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();

    let mut sub = subject
      .observable()
      .subscribe(move |v| c_seen.lock().unwrap().push(v));

    let input = subject.subscriber();
    input.next(1);
    sub.unsubscribe();
    input.next(2);

    assert_eq!(*seen.lock().unwrap(), vec![1]);
  }

  #[test]
  fn error_reaches_subscribers() {
    let subject = Subject::<i32, &'static str>::new();
    let errors = Arc::new(Mutex::new(vec![]));
    let c_errors = errors.clone();

    subject.observable().subscribe_all(
      |_| {},
      move |e| c_errors.lock().unwrap().push(e),
      || {},
    );

    subject.subscriber().error("boom");
    assert_eq!(*errors.lock().unwrap(), vec!["boom"]);
  }

  #[test]
  fn late_subscriber_after_completion_is_completed_immediately() {
    let subject = Subject::<i32, ()>::new();
    subject.subscriber().complete();

    let completed = Arc::new(Mutex::new(false));
    let c_completed = completed.clone();
    subject.observable().subscribe_all(
      |_| panic!("no values after termination"),
      |_| {},
      move || *c_completed.lock().unwrap() = true,
    );

    assert!(*completed.lock().unwrap());
  }

  #[test]
  fn has_observers_delegates() {
    let subject = Subject::<i32, ()>::new();
    assert!(!subject.has_observers());
    subject.observable().subscribe(|_| {});
    assert!(subject.has_observers());
  }

  #[test]
  fn adopted_lifetime_is_released_on_termination() {
    let lifetime = CompositeSubscription::default();
    let subject = Subject::<i32, ()>::with_subscription(lifetime.clone());

    subject.subscriber().complete();
    assert!(lifetime.is_closed());
  }

  #[test]
  fn external_unsubscribe_silences_the_subject() {
    let subject = Subject::<i32, ()>::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    subject
      .observable()
      .subscribe(move |v| c_seen.lock().unwrap().push(v));

    subject.subscription().unsubscribe();
    subject.subscriber().next(1);

    assert!(seen.lock().unwrap().is_empty());
  }

  #[test]
  fn clones_share_the_hub() {
    let subject = Subject::<i32, ()>::new();
    let fork = subject.clone();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();

    fork
      .observable()
      .subscribe(move |v| c_seen.lock().unwrap().push(v));
    subject.subscriber().next(5);

    assert_eq!(*seen.lock().unwrap(), vec![5]);
  }
}
