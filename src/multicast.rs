//! The multicast dispatcher behind [`Subject`](crate::subject::Subject).
//!
//! Membership is published as immutable, refcounted snapshots: every
//! admission rebuilds the list (previous members still subscribed, newcomer
//! appended) and bumps a generation counter. The push side keeps a hot copy
//! of the snapshot pointer that is read without the membership lock; only a
//! generation mismatch forces a locked refresh, so steady-state `next` calls
//! acquire no mutex at all.
//!
//! Termination is one-shot. The first `error`/`complete` flips the mode under
//! the lock, detaches the snapshot, notifies the detached members outside the
//! lock, and releases the shared lifetime. Observers admitted afterwards are
//! handed the terminal signal synchronously.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwapOption;
use tracing::trace;

use crate::observer::Observer;
use crate::subscriber::{Subscriber, TraceId};
use crate::subscription::{CompositeSubscription, SubscriptionLike};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Mode {
  Casting,
  Completed,
  Errored,
}

/// One published membership snapshot. Never mutated after construction; an
/// in-flight fan-out keeps reading the snapshot it loaded even while a newer
/// one is being published.
struct Completer<Item, Err> {
  observers: Vec<Subscriber<Item, Err>>,
}

impl<Item, Err> Completer<Item, Err> {
  /// Copy-on-write admission: carry over the previous members that are still
  /// subscribed, append the newcomer.
  fn admit(previous: Option<&Arc<Self>>, observer: Subscriber<Item, Err>) -> Self {
    let mut observers = Vec::with_capacity(previous.map_or(0, |c| c.observers.len()) + 1);
    if let Some(previous) = previous {
      observers.extend(previous.observers.iter().filter(|o| o.is_subscribed()).cloned());
    }
    observers.push(observer);
    Completer { observers }
  }
}

struct Guarded<Item, Err> {
  mode: Mode,
  error: Option<Err>,
  completer: Option<Arc<Completer<Item, Err>>>,
}

struct MulticastState<Item, Err> {
  /// Bumped under the lock on every admission and on termination.
  generation: AtomicUsize,
  guarded: Mutex<Guarded<Item, Err>>,
  lifetime: CompositeSubscription,
}

/// The record shared by every user-facing handle: the state plus the hot-path
/// snapshot pair. `hot_completer`/`hot_generation` are written only while the
/// membership lock is held, and read lock-free on the push path.
struct Binder<Item, Err> {
  state: MulticastState<Item, Err>,
  id: TraceId,
  hot_generation: AtomicUsize,
  hot_completer: ArcSwapOption<Completer<Item, Err>>,
}

/// The multicast dispatcher: admits observers while values flow, fans each
/// value out to the current snapshot, and terminates exactly once.
///
/// Handles are cheap clones of a shared core. The dispatcher itself is the
/// observer on the push side; [`subscriber`](Self::subscriber) wraps it with
/// the shared lifetime for handing to producers.
pub struct MulticastObserver<Item, Err> {
  b: Arc<Binder<Item, Err>>,
}

impl<Item, Err> Clone for MulticastObserver<Item, Err> {
  fn clone(&self) -> Self { MulticastObserver { b: self.b.clone() } }
}

impl<Item, Err> MulticastObserver<Item, Err> {
  pub fn new(lifetime: CompositeSubscription) -> Self {
    MulticastObserver {
      b: Arc::new(Binder {
        state: MulticastState {
          generation: AtomicUsize::new(0),
          guarded: Mutex::new(Guarded { mode: Mode::Casting, error: None, completer: None }),
          lifetime,
        },
        id: TraceId::next(),
        hot_generation: AtomicUsize::new(0),
        hot_completer: ArcSwapOption::const_empty(),
      }),
    }
  }

  pub fn id(&self) -> TraceId { self.b.id }

  /// The shared composite lifetime. Unsubscribing it severs every attached
  /// child and silences the input subscriber.
  pub fn subscription(&self) -> CompositeSubscription { self.b.state.lifetime.clone() }

  /// Whether the current snapshot holds any observers.
  pub fn has_observers(&self) -> bool {
    let guarded = self.b.state.guarded.lock().unwrap();
    guarded.completer.as_ref().is_some_and(|c| !c.observers.is_empty())
  }
}

impl<Item, Err> MulticastObserver<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  /// The input subscriber handed to producers: this dispatcher bound to the
  /// shared lifetime under the dispatcher's own trace id.
  pub fn subscriber(&self) -> Subscriber<Item, Err> {
    Subscriber::from_parts(self.b.id, self.subscription(), self.clone())
  }

  /// Admit `observer`. While casting, publishes a new snapshot; after
  /// termination, replays the terminal signal to the latecomer synchronously.
  /// `from` names the upstream subscriber, for trace correlation only.
  pub fn add(&self, from: TraceId, observer: Subscriber<Item, Err>) {
    trace!(%from, to = %observer.id(), subject = %self.b.id, "admit");
    let state = &self.b.state;
    let mut guarded = state.guarded.lock().unwrap();
    match guarded.mode {
      Mode::Casting => {
        if observer.is_subscribed() {
          let next = Completer::admit(guarded.completer.as_ref(), observer);
          guarded.completer = Some(Arc::new(next));
          state.generation.fetch_add(1, Ordering::Release);
        }
      }
      // Terminal replies happen outside the lock: the latecomer's handler
      // runs arbitrary user code.
      Mode::Completed => {
        drop(guarded);
        observer.complete();
      }
      Mode::Errored => {
        let err = guarded.error.clone();
        drop(guarded);
        if let Some(err) = err {
          observer.error(err);
        }
      }
    }
  }
}

impl<Item, Err> Observer for MulticastObserver<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn next(&mut self, value: Item) {
    let b = &*self.b;
    if b.hot_generation.load(Ordering::Acquire) != b.state.generation.load(Ordering::Acquire) {
      let guarded = b.state.guarded.lock().unwrap();
      b.hot_completer.store(guarded.completer.clone());
      // Re-read under the lock: the counter only moves while it is held.
      b.hot_generation.store(b.state.generation.load(Ordering::Acquire), Ordering::Release);
    }
    let hot = b.hot_completer.load();
    let Some(completer) = hot.as_ref() else { return };
    if completer.observers.is_empty() {
      return;
    }
    for observer in &completer.observers {
      if observer.is_subscribed() {
        observer.next(value.clone());
      }
    }
  }

  fn error(&mut self, err: Err) {
    let b = &*self.b;
    let (completer, mut lifetime) = {
      let mut guarded = b.state.guarded.lock().unwrap();
      if guarded.mode != Mode::Casting {
        return;
      }
      guarded.error = Some(err.clone());
      guarded.mode = Mode::Errored;
      let completer = guarded.completer.take();
      b.hot_completer.store(None);
      b.state.generation.fetch_add(1, Ordering::Release);
      (completer, b.state.lifetime.clone())
    };
    trace!(subject = %b.id, "errored");
    if let Some(completer) = completer {
      for observer in &completer.observers {
        if observer.is_subscribed() {
          observer.error(err.clone());
        }
      }
    }
    lifetime.unsubscribe();
  }

  fn complete(&mut self) {
    let b = &*self.b;
    let (completer, mut lifetime) = {
      let mut guarded = b.state.guarded.lock().unwrap();
      if guarded.mode != Mode::Casting {
        return;
      }
      guarded.mode = Mode::Completed;
      let completer = guarded.completer.take();
      b.hot_completer.store(None);
      b.state.generation.fetch_add(1, Ordering::Release);
      (completer, b.state.lifetime.clone())
    };
    trace!(subject = %b.id, "completed");
    if let Some(completer) = completer {
      for observer in &completer.observers {
        if observer.is_subscribed() {
          observer.complete();
        }
      }
    }
    lifetime.unsubscribe();
  }

  fn is_stopped(&self) -> bool { self.b.state.guarded.lock().unwrap().mode != Mode::Casting }
}
