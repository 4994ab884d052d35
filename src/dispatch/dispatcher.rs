//! Request dispatch with failover.
//!
//! # Responsibilities
//! - Pick a node for each request from one selector snapshot
//! - Retry other nodes on failure, up to one attempt per node
//! - Honour the caller's deadline at every attempt boundary
//! - Turn faults raised by caller operations into typed errors

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::time::Instant;

use crate::error::{panic_message, DispatchError, DispatchResult, ErrorKind, NodeError};
use crate::health::passive::HealthReporter;
use crate::load_balancer::node::Node;
use crate::load_balancer::selector::WeightedSelector;
use crate::observability::metrics;

/// A result that can carry an error from a follow-up operation.
pub trait ErrorSink {
    fn attach_error(&mut self, error: DispatchError);
}

/// Dispatches requests across the nodes of a `WeightedSelector`.
pub struct Dispatcher<T: Node> {
    selector: Arc<WeightedSelector<T>>,
    reporter: Option<Arc<dyn HealthReporter<T>>>,
}

impl<T: Node> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            selector: Arc::clone(&self.selector),
            reporter: self.reporter.clone(),
        }
    }
}

impl<T: Node> Dispatcher<T> {
    pub fn new(selector: Arc<WeightedSelector<T>>) -> Self {
        Self {
            selector,
            reporter: None,
        }
    }

    /// Report every attempt outcome to `reporter`.
    pub fn with_reporter(mut self, reporter: Arc<dyn HealthReporter<T>>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn selector(&self) -> &Arc<WeightedSelector<T>> {
        &self.selector
    }

    /// Run `perform` against the node chosen for `request_key`, failing
    /// over to the next candidate on error.
    ///
    /// Gives up when the deadline has passed before an attempt, when an
    /// attempt fails with a hard timeout, or when every node in the
    /// snapshot has been tried once. Never panics on behalf of `perform`.
    pub async fn dispatch<R, F, Fut>(
        &self,
        request_key: i64,
        deadline: Instant,
        mut perform: F,
    ) -> DispatchResult<R>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<R, NodeError>>,
    {
        let start = Instant::now();
        let table = self.selector.snapshot();
        let node_count = table.node_count();

        let Some(mut node) = table.select(request_key, 0).cloned() else {
            tracing::debug!(request_key, "No backend available");
            metrics::record_dispatch("no_backend", 0, start);
            return Err(DispatchError::NoBackendAvailable);
        };

        let mut attempt = 0;
        loop {
            if Instant::now() >= deadline {
                tracing::debug!(request_key, attempt, "Dispatch deadline elapsed");
                metrics::record_dispatch("timed_out", attempt, start);
                return Err(DispatchError::TimedOut { attempts: attempt });
            }

            let call = &mut perform;
            let target = node.clone();
            let result = AssertUnwindSafe(async move { call(target).await })
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(fault_to_error(panic)));

            let error = match result {
                Ok(response) => {
                    self.report_success(&node);
                    metrics::record_dispatch("success", attempt + 1, start);
                    return Ok(response);
                }
                Err(error) => error,
            };
            self.report_failure(&node, error.kind());
            attempt += 1;

            let next = if error.kind() == ErrorKind::Timeout || attempt >= node_count {
                None
            } else {
                table.select(request_key, attempt).cloned()
            };

            match next {
                Some(candidate) => {
                    tracing::debug!(
                        request_key,
                        attempt,
                        failed = %node,
                        next = %candidate,
                        error = %error,
                        "Retrying on next node"
                    );
                    node = candidate;
                }
                None => {
                    tracing::warn!(
                        request_key,
                        attempts = attempt,
                        node = %node,
                        error = %error,
                        "Dispatch failed"
                    );
                    metrics::record_dispatch("failed", attempt, start);
                    return Err(DispatchError::Failed {
                        node: node.to_string(),
                        attempts: attempt,
                        source: error,
                    });
                }
            }
        }
    }

    /// Enrich an existing result on the node chosen for `request_key`.
    ///
    /// Only attempt 0 is tried. A failure is attached to `result` instead
    /// of being returned.
    pub async fn fill_details<R, F>(&self, request_key: i64, result: &mut R, fill: F)
    where
        R: ErrorSink + Send,
        F: for<'a> FnOnce(T, &'a mut R) -> BoxFuture<'a, Result<(), NodeError>>,
    {
        let Some(node) = self.selector.snapshot().select(request_key, 0).cloned() else {
            result.attach_error(DispatchError::NoBackendAvailable);
            return;
        };

        let target = node.clone();
        let slot = &mut *result;
        let outcome = AssertUnwindSafe(async move { fill(target, slot).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(fault_to_error(panic)));

        match outcome {
            Ok(()) => self.report_success(&node),
            Err(error) => {
                self.report_failure(&node, error.kind());
                tracing::debug!(request_key, node = %node, error = %error, "Fill failed");
                result.attach_error(DispatchError::Failed {
                    node: node.to_string(),
                    attempts: 1,
                    source: error,
                });
            }
        }
    }

    fn report_success(&self, node: &T) {
        self.report(node, None);
    }

    fn report_failure(&self, node: &T, kind: ErrorKind) {
        self.report(node, Some(kind));
    }

    // A reporter fault must not escape the request path.
    fn report(&self, node: &T, failure: Option<ErrorKind>) {
        let Some(reporter) = &self.reporter else {
            return;
        };
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| match failure {
            None => reporter.report_success(node),
            Some(kind) => reporter.report_failure(node, kind),
        }));
        if let Err(panic) = outcome {
            tracing::error!(
                node = %node,
                error = %panic_message(panic.as_ref()),
                "Health reporter panicked"
            );
        }
    }
}

fn fault_to_error(panic: Box<dyn Any + Send>) -> NodeError {
    NodeError::Communication(panic_message(panic.as_ref()))
}
