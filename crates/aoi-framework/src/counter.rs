//! Counting successfully completed commands.
//!
//! [`CommandCounter`] is a process-wide tally. Command services are wrapped in
//! [`CountCompletedLayer`], which bumps the counter once for every call that
//! returns `Ok`:
//!
//! ```text
//! ServiceBuilder::new()
//!     .layer(CountCompletedLayer::new(counter))   ← increments on Ok
//!     .service(command_service)
//! ```
//!
//! Failed commands are not counted.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tower::{Layer, Service};

/// A shared, monotonically increasing count of completed commands.
///
/// Clones share the same count.
#[derive(Debug, Clone, Default)]
pub struct CommandCounter(Arc<AtomicU64>);

impl CommandCounter {
    /// Creates a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one completed command.
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the current count.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Wraps a command service so its successful calls are counted.
#[derive(Debug, Clone)]
pub struct CountCompletedLayer {
    counter: CommandCounter,
}

impl CountCompletedLayer {
    /// Creates a layer incrementing `counter`.
    pub fn new(counter: CommandCounter) -> Self {
        Self { counter }
    }
}

impl<S> Layer<S> for CountCompletedLayer {
    type Service = CountCompleted<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CountCompleted {
            inner,
            counter: self.counter.clone(),
        }
    }
}

/// Service produced by [`CountCompletedLayer`].
#[derive(Debug)]
pub struct CountCompleted<S> {
    inner: S,
    counter: CommandCounter,
}

impl<S> Clone for CountCompleted<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        CountCompleted {
            inner: self.inner.clone(),
            counter: self.counter.clone(),
        }
    }
}

impl<S, Req> Service<Req> for CountCompleted<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let fut = self.inner.call(req);
        let counter = self.counter.clone();
        Box::pin(async move {
            let response = fut.await?;
            counter.increment();
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::{ServiceBuilder, ServiceExt, service_fn};

    #[test]
    fn test_counter_is_shared_between_clones() {
        let counter = CommandCounter::new();
        let other = counter.clone();

        counter.increment();
        other.increment();

        assert_eq!(counter.get(), 2);
        assert_eq!(other.get(), 2);
    }

    #[tokio::test]
    async fn test_only_successful_calls_are_counted() {
        let counter = CommandCounter::new();
        let service = ServiceBuilder::new()
            .layer(CountCompletedLayer::new(counter.clone()))
            .service(service_fn(|input: &'static str| async move {
                if input == "fail" {
                    Err("command failed")
                } else {
                    Ok(input.len())
                }
            }));

        assert_eq!(service.clone().oneshot("ping").await, Ok(4));
        assert_eq!(service.clone().oneshot("fail").await, Err("command failed"));
        assert_eq!(service.clone().oneshot("tasks").await, Ok(5));

        assert_eq!(counter.get(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_completions() {
        let counter = CommandCounter::new();
        let service = CountCompletedLayer::new(counter.clone())
            .layer(service_fn(|_: ()| async { Ok::<_, ()>(()) }));

        let calls = (0..50).map(|_| service.clone().oneshot(()));
        for result in futures::future::join_all(calls).await {
            assert!(result.is_ok());
        }

        assert_eq!(counter.get(), 50);
    }
}
