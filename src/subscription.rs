use std::sync::{Arc, Mutex};

use smallvec::SmallVec;

/// Returned from `Observable::actual_subscribe` to allow deregistering a
/// stream before it has finished receiving all events.
pub trait SubscriptionLike {
  /// Release the subscription. Idempotent.
  fn unsubscribe(&mut self);

  fn is_closed(&self) -> bool;
}

type Child = (usize, Box<dyn SubscriptionLike + Send>);

struct Inner {
  closed: bool,
  next_id: usize,
  // Most lifetimes carry zero or one child.
  children: SmallVec<[Child; 1]>,
}

impl Default for Inner {
  fn default() -> Self { Inner { closed: false, next_id: 0, children: SmallVec::new() } }
}

/// A cancellable handle composed of child handles.
///
/// Handles are cheap to clone and share state. `unsubscribe` releases every
/// attached child exactly once and is itself idempotent; a child added after
/// the composite is already closed is torn down on the spot.
#[derive(Clone, Default)]
pub struct CompositeSubscription(Arc<Mutex<Inner>>);

impl CompositeSubscription {
  /// Attach `child`, returning an id usable with [`remove`](Self::remove).
  ///
  /// If the composite is already unsubscribed the child is released
  /// immediately and the returned id is inert.
  pub fn add(&mut self, mut child: Box<dyn SubscriptionLike + Send>) -> usize {
    let mut inner = self.0.lock().unwrap();
    let id = inner.next_id;
    inner.next_id += 1;
    if inner.closed {
      drop(inner);
      child.unsubscribe();
      return id;
    }
    inner.children.push((id, child));
    id
  }

  /// Detach the child registered under `id` without releasing it.
  pub fn remove(&mut self, id: usize) {
    let mut inner = self.0.lock().unwrap();
    inner.children.retain(|(child_id, _)| *child_id != id);
  }
}

impl SubscriptionLike for CompositeSubscription {
  fn unsubscribe(&mut self) {
    let children = {
      let mut inner = self.0.lock().unwrap();
      if inner.closed {
        return;
      }
      inner.closed = true;
      std::mem::take(&mut inner.children)
    };
    // Children are released outside the lock: their teardown may re-enter a
    // handle to this composite.
    for (_, mut child) in children {
      child.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.0.lock().unwrap().closed }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  #[derive(Clone, Default)]
  struct CountingSub(Arc<AtomicUsize>);

  impl SubscriptionLike for CountingSub {
    fn unsubscribe(&mut self) { self.0.fetch_add(1, Ordering::SeqCst); }

    fn is_closed(&self) -> bool { self.0.load(Ordering::SeqCst) > 0 }
  }

  #[test]
  fn unsubscribe_releases_children_once() {
    let mut composite = CompositeSubscription::default();
    let child = CountingSub::default();
    composite.add(Box::new(child.clone()));

    composite.unsubscribe();
    composite.unsubscribe();

    assert!(composite.is_closed());
    assert_eq!(child.0.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn add_after_close_tears_down_immediately() {
    let mut composite = CompositeSubscription::default();
    composite.unsubscribe();

    let child = CountingSub::default();
    composite.add(Box::new(child.clone()));
    assert_eq!(child.0.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn remove_detaches_without_teardown() {
    let mut composite = CompositeSubscription::default();
    let kept = CountingSub::default();
    let removed = CountingSub::default();
    composite.add(Box::new(kept.clone()));
    let id = composite.add(Box::new(removed.clone()));

    composite.remove(id);
    composite.unsubscribe();

    assert_eq!(kept.0.load(Ordering::SeqCst), 1);
    assert_eq!(removed.0.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn clones_share_state() {
    let mut composite = CompositeSubscription::default();
    let mut other = composite.clone();
    other.unsubscribe();
    assert!(composite.is_closed());

    let child = CountingSub::default();
    composite.add(Box::new(child.clone()));
    assert_eq!(child.0.load(Ordering::SeqCst), 1);
  }
}
