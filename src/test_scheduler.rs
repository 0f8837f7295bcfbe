//! Virtual-time harness for deterministic tests of code built on the Subject
//! contract.
//!
//! [`TestScheduler`] owns a virtual clock that only advances when instructed;
//! actions run synchronously in (time, FIFO) order. [`HotObservable`] plays a
//! scripted message list against whoever is subscribed at each instant and
//! logs every subscription interval; [`TestObserver`] records what it receives
//! together with the virtual time of arrival.
//!
//! [`TestScheduler::start`] follows the usual convention: the observable under
//! test is created at 100, subscribed at 200, and disposed at 1000.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex};

use crate::observable::Observable;
use crate::observer::Observer;
use crate::subject::Subject;
use crate::subscriber::Subscriber;
use crate::subscription::{CompositeSubscription, SubscriptionLike};

pub type VirtualTime = u64;

/// Virtual instant at which [`TestScheduler::start`] invokes the factory.
pub const CREATED: VirtualTime = 100;
/// Virtual instant at which [`TestScheduler::start`] subscribes.
pub const SUBSCRIBED: VirtualTime = 200;
/// Virtual instant at which [`TestScheduler::start`] disposes the
/// subscription, if the stream has not terminated by then.
pub const DISPOSED: VirtualTime = 1000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification<Item, Err> {
  Next(Item),
  Error(Err),
  Completed,
}

/// A notification stamped with the virtual time it was observed (or is
/// scripted to fire).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recorded<Item, Err> {
  pub time: VirtualTime,
  pub notification: Notification<Item, Err>,
}

pub fn next<Item, Err>(time: VirtualTime, value: Item) -> Recorded<Item, Err> {
  Recorded { time, notification: Notification::Next(value) }
}

pub fn error<Item, Err>(time: VirtualTime, err: Err) -> Recorded<Item, Err> {
  Recorded { time, notification: Notification::Error(err) }
}

pub fn completed<Item, Err>(time: VirtualTime) -> Recorded<Item, Err> {
  Recorded { time, notification: Notification::Completed }
}

/// One subscribe/unsubscribe span against a [`HotObservable`]. `until` stays
/// `None` while the subscription is live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscribedInterval {
  pub at: VirtualTime,
  pub until: Option<VirtualTime>,
}

pub fn subscribed(at: VirtualTime, until: VirtualTime) -> SubscribedInterval {
  SubscribedInterval { at, until: Some(until) }
}

struct ScheduledAction {
  due: VirtualTime,
  seq: usize,
  action: Box<dyn FnOnce() + Send>,
}

impl PartialEq for ScheduledAction {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.seq == other.seq }
}

impl Eq for ScheduledAction {}

impl PartialOrd for ScheduledAction {
  fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> { Some(self.cmp(other)) }
}

impl Ord for ScheduledAction {
  // Min-heap: earlier times first, FIFO by sequence at equal times.
  fn cmp(&self, other: &Self) -> CmpOrdering {
    other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
  }
}

#[derive(Default)]
struct SchedulerCore {
  clock: VirtualTime,
  next_seq: usize,
  queue: BinaryHeap<ScheduledAction>,
}

/// A scheduler over virtual time. Handles are cheap clones of a shared core.
#[derive(Clone, Default)]
pub struct TestScheduler {
  core: Arc<Mutex<SchedulerCore>>,
}

impl TestScheduler {
  pub fn new() -> Self { Self::default() }

  /// The current virtual time.
  pub fn clock(&self) -> VirtualTime { self.core.lock().unwrap().clock }

  /// Schedule `action` at the absolute virtual instant `due`. An instant in
  /// the past is clamped to the current clock.
  pub fn schedule_absolute(&self, due: VirtualTime, action: impl FnOnce() + Send + 'static) {
    let mut core = self.core.lock().unwrap();
    let due = due.max(core.clock);
    let seq = core.next_seq;
    core.next_seq += 1;
    core.queue.push(ScheduledAction { due, seq, action: Box::new(action) });
  }

  pub fn schedule_relative(&self, delay: VirtualTime, action: impl FnOnce() + Send + 'static) {
    let due = self.clock() + delay;
    self.schedule_absolute(due, action);
  }

  /// Run every action due at or before `time`, then leave the clock at
  /// `time`. The core lock is never held while an action runs, so actions may
  /// schedule further work or read the clock.
  pub fn advance_to(&self, time: VirtualTime) {
    self.run_due(Some(time));
    let mut core = self.core.lock().unwrap();
    if core.clock < time {
      core.clock = time;
    }
  }

  pub fn advance_by(&self, delta: VirtualTime) {
    let target = self.clock() + delta;
    self.advance_to(target);
  }

  /// Run every pending action; the clock ends at the last action's instant.
  pub fn flush(&self) { self.run_due(None); }

  fn run_due(&self, limit: Option<VirtualTime>) {
    loop {
      let action = {
        let mut core = self.core.lock().unwrap();
        let due_now = core
          .queue
          .peek()
          .is_some_and(|head| limit.is_none_or(|limit| head.due <= limit));
        if !due_now {
          break;
        }
        let head = core.queue.pop().unwrap();
        core.clock = head.due;
        head.action
      };
      action();
    }
  }

  /// A hot observable that plays `messages` at their absolute virtual times,
  /// whether or not anyone is subscribed.
  pub fn make_hot_observable<Item, Err>(
    &self, messages: Vec<Recorded<Item, Err>>,
  ) -> HotObservable<Item, Err>
  where
    Item: Clone + Send + 'static,
    Err: Clone + Send + 'static,
  {
    let subject = Subject::new();
    for Recorded { time, notification } in messages {
      let input = subject.subscriber();
      self.schedule_absolute(time, move || match notification {
        Notification::Next(value) => input.next(value),
        Notification::Error(err) => input.error(err),
        Notification::Completed => input.complete(),
      });
    }
    HotObservable { scheduler: self.clone(), subject, log: Arc::default() }
  }

  /// [`start_at`](Self::start_at) with the 100/200/1000 convention.
  pub fn start<O, F>(&self, create: F) -> TestObserver<O::Item, O::Err>
  where
    F: FnOnce() -> O + Send + 'static,
    O: Observable + Send + 'static,
    O::Item: Clone + Send + 'static,
    O::Err: Clone + Send + 'static,
  {
    self.start_at(CREATED, SUBSCRIBED, DISPOSED, create)
  }

  /// Schedule creation of the observable under test, subscription of a fresh
  /// recording observer, and disposal of that subscription, then run to
  /// quiescence and hand back the observer.
  pub fn start_at<O, F>(
    &self, created: VirtualTime, subscribe_at: VirtualTime, dispose_at: VirtualTime, create: F,
  ) -> TestObserver<O::Item, O::Err>
  where
    F: FnOnce() -> O + Send + 'static,
    O: Observable + Send + 'static,
    O::Item: Clone + Send + 'static,
    O::Err: Clone + Send + 'static,
  {
    let observer = TestObserver::new(self.clone());
    let source: Arc<Mutex<Option<O>>> = Arc::new(Mutex::new(None));
    let subscription: Arc<Mutex<Option<CompositeSubscription>>> = Arc::new(Mutex::new(None));

    {
      let source = source.clone();
      self.schedule_absolute(created, move || {
        *source.lock().unwrap() = Some(create());
      });
    }
    {
      let source = source.clone();
      let subscription = subscription.clone();
      let observer = observer.clone();
      self.schedule_absolute(subscribe_at, move || {
        if let Some(observable) = source.lock().unwrap().take() {
          let sub = observable.actual_subscribe(Subscriber::new(observer));
          *subscription.lock().unwrap() = Some(sub);
        }
      });
    }
    {
      let subscription = subscription.clone();
      self.schedule_absolute(dispose_at, move || {
        if let Some(mut sub) = subscription.lock().unwrap().take() {
          sub.unsubscribe();
        }
      });
    }

    self.flush();
    observer
  }
}

/// Records every received notification with its virtual arrival time.
pub struct TestObserver<Item, Err> {
  scheduler: TestScheduler,
  messages: Arc<Mutex<Vec<Recorded<Item, Err>>>>,
}

impl<Item, Err> Clone for TestObserver<Item, Err> {
  fn clone(&self) -> Self {
    TestObserver { scheduler: self.scheduler.clone(), messages: self.messages.clone() }
  }
}

impl<Item, Err> TestObserver<Item, Err> {
  pub fn new(scheduler: TestScheduler) -> Self {
    TestObserver { scheduler, messages: Arc::default() }
  }

  pub fn messages(&self) -> Vec<Recorded<Item, Err>>
  where
    Item: Clone,
    Err: Clone,
  {
    self.messages.lock().unwrap().clone()
  }
}

impl<Item, Err> Observer for TestObserver<Item, Err> {
  type Item = Item;
  type Err = Err;

  fn next(&mut self, value: Item) {
    let time = self.scheduler.clock();
    self.messages.lock().unwrap().push(next(time, value));
  }

  fn error(&mut self, err: Err) {
    let time = self.scheduler.clock();
    self.messages.lock().unwrap().push(error(time, err));
  }

  fn complete(&mut self) {
    let time = self.scheduler.clock();
    self.messages.lock().unwrap().push(completed(time));
  }

  fn is_stopped(&self) -> bool { false }
}

/// A hot observable built from a scripted message list. Events fire at their
/// scripted instants regardless of subscribers; each subscribe is logged as a
/// [`SubscribedInterval`] whose close is stamped when the subscriber's
/// lifetime is released.
pub struct HotObservable<Item, Err> {
  scheduler: TestScheduler,
  subject: Subject<Item, Err>,
  log: Arc<Mutex<Vec<SubscribedInterval>>>,
}

impl<Item, Err> Clone for HotObservable<Item, Err> {
  fn clone(&self) -> Self {
    HotObservable {
      scheduler: self.scheduler.clone(),
      subject: self.subject.clone(),
      log: self.log.clone(),
    }
  }
}

impl<Item, Err> HotObservable<Item, Err> {
  /// Every subscription interval seen so far, in subscribe order.
  pub fn subscriptions(&self) -> Vec<SubscribedInterval> { self.log.lock().unwrap().clone() }
}

impl<Item, Err> Observable for HotObservable<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn actual_subscribe(
    self, subscriber: Subscriber<Item, Err>,
  ) -> CompositeSubscription {
    let index = {
      let mut log = self.log.lock().unwrap();
      log.push(SubscribedInterval { at: self.scheduler.clock(), until: None });
      log.len() - 1
    };
    let mut lifetime = subscriber.subscription();
    lifetime.add(Box::new(IntervalStamp {
      scheduler: self.scheduler.clone(),
      log: self.log.clone(),
      index,
    }));
    self.subject.observable().actual_subscribe(subscriber)
  }
}

/// Stamps the close instant of one logged interval when the owning lifetime
/// is released.
struct IntervalStamp {
  scheduler: TestScheduler,
  log: Arc<Mutex<Vec<SubscribedInterval>>>,
  index: usize,
}

impl SubscriptionLike for IntervalStamp {
  fn unsubscribe(&mut self) {
    let now = self.scheduler.clock();
    let mut log = self.log.lock().unwrap();
    let entry = &mut log[self.index];
    if entry.until.is_none() {
      entry.until = Some(now);
    }
  }

  fn is_closed(&self) -> bool { self.log.lock().unwrap()[self.index].until.is_some() }
}
