//! skip_until over scripted hot observables, under virtual time.
//!
//! Each case drives two hot sources against the operator with the standard
//! subscribe-at-200 / dispose-at-1000 convention and checks the recorded
//! output as well as both upstream subscription logs.

use rxcast::prelude::*;
use rxcast::test_scheduler::{completed, error, next, subscribed, TestScheduler};
use thiserror::Error;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("skip_until stream error")]
struct StreamError;

#[test]
fn gate_then_pass() {
  let scheduler = TestScheduler::new();

  let source = scheduler.make_hot_observable::<i32, StreamError>(vec![
    next(150, 1),
    next(210, 2),
    next(220, 3),
    next(230, 4),
    next(240, 5),
    completed(250),
  ]);
  let trigger = scheduler.make_hot_observable(vec![next(150, 1), next(225, 99), completed(230)]);

  let s = source.clone();
  let t = trigger.clone();
  let observer = scheduler.start(move || s.clone().skip_until(t.clone()));

  assert_eq!(
    observer.messages(),
    vec![next(230, 4), next(240, 5), completed(250)]
  );
  assert_eq!(source.subscriptions(), vec![subscribed(200, 250)]);
  assert_eq!(trigger.subscriptions(), vec![subscribed(200, 225)]);
}

#[test]
fn trigger_errors() {
  let scheduler = TestScheduler::new();

  let source = scheduler.make_hot_observable::<i32, StreamError>(vec![
    next(150, 1),
    next(210, 2),
    next(220, 3),
    next(230, 4),
    next(240, 5),
    completed(250),
  ]);
  let trigger = scheduler.make_hot_observable(vec![next(150, 1), error(225, StreamError)]);

  let s = source.clone();
  let t = trigger.clone();
  let observer = scheduler.start(move || s.clone().skip_until(t.clone()));

  assert_eq!(observer.messages(), vec![error(225, StreamError)]);
  assert_eq!(source.subscriptions(), vec![subscribed(200, 225)]);
  assert_eq!(trigger.subscriptions(), vec![subscribed(200, 225)]);
}

#[test]
fn source_errors_first() {
  let scheduler = TestScheduler::new();

  let source = scheduler.make_hot_observable(vec![
    next(150, 1),
    next(210, 2),
    error(220, StreamError),
  ]);
  let trigger = scheduler.make_hot_observable(vec![next(150, 1), next(230, 3), completed(250)]);

  let s = source.clone();
  let t = trigger.clone();
  let observer = scheduler.start(move || s.clone().skip_until(t.clone()));

  assert_eq!(observer.messages(), vec![error(220, StreamError)]);
  assert_eq!(source.subscriptions(), vec![subscribed(200, 220)]);
  assert_eq!(trigger.subscriptions(), vec![subscribed(200, 220)]);
}

#[test]
fn trigger_completes_without_emitting() {
  let scheduler = TestScheduler::new();

  let source = scheduler.make_hot_observable::<i32, StreamError>(vec![
    next(150, 1),
    next(210, 2),
    next(220, 3),
    next(230, 4),
    next(240, 5),
    completed(250),
  ]);
  let trigger = scheduler.make_hot_observable(vec![next(150, 1), completed(225)]);

  let s = source.clone();
  let t = trigger.clone();
  let observer = scheduler.start(move || s.clone().skip_until(t.clone()));

  // The gate never opens: no values, and the gated source completion is
  // swallowed rather than forwarded.
  assert_eq!(observer.messages(), vec![]);
  assert_eq!(source.subscriptions(), vec![subscribed(200, 250)]);
  assert_eq!(trigger.subscriptions(), vec![subscribed(200, 225)]);
}

#[test]
fn source_never_trigger_emits_late() {
  let scheduler = TestScheduler::new();

  let source = scheduler.make_hot_observable::<i32, StreamError>(vec![]);
  let trigger = scheduler.make_hot_observable(vec![next(225, 2), completed(250)]);

  let s = source.clone();
  let t = trigger.clone();
  let observer = scheduler.start(move || s.clone().skip_until(t.clone()));

  assert_eq!(observer.messages(), vec![]);
  assert_eq!(source.subscriptions(), vec![subscribed(200, 1000)]);
  assert_eq!(trigger.subscriptions(), vec![subscribed(200, 225)]);
}

#[test]
fn late_error_on_trigger_after_source_completed() {
  let scheduler = TestScheduler::new();

  let source = scheduler.make_hot_observable::<i32, StreamError>(vec![
    next(150, 1),
    next(210, 2),
    next(220, 3),
    next(230, 4),
    next(240, 5),
    completed(250),
  ]);
  let trigger = scheduler.make_hot_observable::<i32, StreamError>(vec![
    next(150, 1),
    error(300, StreamError),
  ]);

  let s = source.clone();
  let t = trigger.clone();
  let observer = scheduler.start(move || s.clone().skip_until(t.clone()));

  // The source completed while still gated, so the stream stayed open for
  // the trigger to error it.
  assert_eq!(observer.messages(), vec![error(300, StreamError)]);
  assert_eq!(source.subscriptions(), vec![subscribed(200, 250)]);
  assert_eq!(trigger.subscriptions(), vec![subscribed(200, 300)]);
}
