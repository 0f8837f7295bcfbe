//! rxcast is a reactive stream multicasting facility built around the
//! [`Subject`](subject::Subject): a hub that is at once a sink for pushed
//! values and a source that fans those values out to every attached observer.
//!
//! The heart of the crate is the multicast dispatcher in [`multicast`]: new
//! observers are admitted while values are flowing, the stream terminates
//! exactly once with completion or an error, and the per-value dispatch path
//! performs no mutex acquisition while membership is unchanged. Observers that
//! attach after termination receive the terminal signal synchronously.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use rxcast::prelude::*;
//!
//! let subject = Subject::<i32, ()>::new();
//! let seen = Arc::new(Mutex::new(vec![]));
//!
//! let c_seen = seen.clone();
//! subject
//!   .observable()
//!   .subscribe(move |v| c_seen.lock().unwrap().push(v));
//!
//! let input = subject.subscriber();
//! input.next(1);
//! input.next(2);
//! input.complete();
//!
//! assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
//! ```
//!
//! [`test_scheduler`] provides a virtual-time harness (scripted hot
//! observables, recorded messages, subscription logs) for deterministic tests
//! of code built on the Subject contract; [`ops::skip_until`] is the reference
//! operator consumer.

pub mod multicast;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod subject;
pub mod subscriber;
pub mod subscription;
pub mod test_scheduler;

pub mod prelude {
  pub use crate::multicast::MulticastObserver;
  pub use crate::observable::{Observable, ObservableExt};
  pub use crate::observer::Observer;
  pub use crate::ops::skip_until::SkipUntilOp;
  pub use crate::subject::{Subject, SubjectObservable};
  pub use crate::subscriber::{Subscriber, TraceId};
  pub use crate::subscription::{CompositeSubscription, SubscriptionLike};
}
