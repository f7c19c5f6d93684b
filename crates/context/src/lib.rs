//! Go-like cancellation contexts for coordinating graceful shutdown across tasks.
//!
//! A [`Handler`] owns a tree of [`Context`]s. Cancelling the handler cancels
//! every context derived from it; [`Handler::shutdown`] waits until every
//! future that was still holding one of those contexts has dropped it, so a
//! server can stop accepting new work and then wait for in-flight work to
//! finish before exiting.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::Poll;

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture, WaitForCancellationFutureOwned};

mod ext;

pub use ext::ContextFutExt;

#[derive(Debug)]
struct ContextTracker(Arc<ContextTrackerInner>);

impl Drop for ContextTracker {
    fn drop(&mut self) {
        let prev = self.0.active_count.fetch_sub(1, Ordering::Relaxed);
        if prev == 1 && self.0.stopped.load(Ordering::Relaxed) {
            self.0.notify.notify_waiters();
        }
    }
}

#[derive(Debug)]
struct ContextTrackerInner {
    stopped: AtomicBool,
    active_count: AtomicUsize,
    notify: tokio::sync::Notify,
}

impl ContextTrackerInner {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            stopped: AtomicBool::new(false),
            active_count: AtomicUsize::new(0),
            notify: tokio::sync::Notify::new(),
        })
    }

    fn child(self: &Arc<Self>) -> ContextTracker {
        self.active_count.fetch_add(1, Ordering::Relaxed);
        ContextTracker(Arc::clone(self))
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    async fn wait(&self) {
        let notified = self.notify.notified();

        if self.active_count.load(Ordering::Relaxed) == 0 {
            return;
        }

        notified.await;
    }
}

/// A cancellable handle, attached to futures so they stop when shutdown begins.
///
/// Contexts form a hierarchy: cancelling a parent cancels every child.
#[derive(Debug)]
pub struct Context {
    token: CancellationToken,
    tracker: ContextTracker,
}

impl Clone for Context {
    fn clone(&self) -> Self {
        Self {
            token: self.token.clone(),
            tracker: self.tracker.0.child(),
        }
    }
}

impl Context {
    /// Creates a new root context backed by the process-global handler.
    #[must_use]
    pub fn new() -> (Self, Handler) {
        Handler::global().new_child()
    }

    /// Derives a child context that is cancelled when either `self` or the
    /// returned handler is cancelled.
    #[must_use]
    pub fn new_child(&self) -> (Self, Handler) {
        let token = self.token.child_token();
        let tracker = ContextTrackerInner::new();

        (
            Self {
                tracker: tracker.child(),
                token: token.clone(),
            },
            Handler {
                token: Arc::new(TokenDropGuard(token)),
                tracker,
            },
        )
    }

    /// The process-global context.
    #[must_use]
    pub fn global() -> Self {
        Handler::global().context()
    }

    /// Resolves once the context has been cancelled.
    pub async fn done(&self) {
        self.token.cancelled().await;
    }

    /// Owning variant of [`Context::done`].
    pub async fn into_done(self) {
        self.done().await;
    }

    /// Returns true if the context has already been cancelled.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug)]
struct TokenDropGuard(CancellationToken);

impl TokenDropGuard {
    #[must_use]
    fn child(&self) -> CancellationToken {
        self.0.child_token()
    }

    fn cancel(&self) {
        self.0.cancel();
    }
}

impl Drop for TokenDropGuard {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Owns the cancellation side of a [`Context`] tree.
#[derive(Debug, Clone)]
pub struct Handler {
    token: Arc<TokenDropGuard>,
    tracker: Arc<ContextTrackerInner>,
}

impl Default for Handler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler {
    /// Creates a fresh handler with no parent.
    #[must_use]
    pub fn new() -> Handler {
        Handler {
            token: Arc::new(TokenDropGuard(CancellationToken::new())),
            tracker: ContextTrackerInner::new(),
        }
    }

    /// The process-global handler, created lazily on first use.
    #[must_use]
    pub fn global() -> &'static Self {
        static GLOBAL: std::sync::OnceLock<Handler> = std::sync::OnceLock::new();
        GLOBAL.get_or_init(Handler::new)
    }

    /// Cancels the handler and waits for every outstanding context to be dropped.
    pub async fn shutdown(&self) {
        self.cancel();
        self.done().await;
    }

    /// Waits for cancellation and for every outstanding context to be dropped.
    pub async fn done(&self) {
        self.token.0.cancelled().await;
        self.tracker.wait().await;
    }

    /// Waits for every outstanding context to be dropped, regardless of
    /// whether the handler itself has been cancelled yet.
    pub async fn wait(&self) {
        self.tracker.wait().await;
    }

    /// Creates a new context under this handler.
    #[must_use]
    pub fn context(&self) -> Context {
        Context {
            token: self.token.child(),
            tracker: self.tracker.child(),
        }
    }

    /// Creates a child context plus its own handler, derived from this handler's context.
    #[must_use]
    pub fn new_child(&self) -> (Context, Handler) {
        self.context().new_child()
    }

    /// Cancels every context derived from this handler.
    pub fn cancel(&self) {
        self.tracker.stop();
        self.token.cancel();
    }

    /// Returns true if [`Handler::cancel`] has already been called.
    pub fn is_done(&self) -> bool {
        self.token.0.is_cancelled()
    }
}

pin_project_lite::pin_project! {
    /// Either an owned or borrowed wait-for-cancellation future, used by [`ContextFutExt`].
    #[project = ContextRefProj]
    pub enum ContextRef<'a> {
        Owned {
            #[pin] fut: WaitForCancellationFutureOwned,
            tracker: ContextTracker,
        },
        Ref {
            #[pin] fut: WaitForCancellationFuture<'a>,
        },
    }
}

impl std::future::Future for ContextRef<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            ContextRefProj::Owned { fut, .. } => fut.poll(cx),
            ContextRefProj::Ref { fut } => fut.poll(cx),
        }
    }
}

impl From<Context> for ContextRef<'_> {
    fn from(ctx: Context) -> Self {
        ContextRef::Owned {
            fut: ctx.token.cancelled_owned(),
            tracker: ctx.tracker,
        }
    }
}

impl<'a> From<&'a Context> for ContextRef<'a> {
    fn from(ctx: &'a Context) -> Self {
        ContextRef::Ref { fut: ctx.token.cancelled() }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rtmprelay_future_ext::FutureExt;

    use super::*;

    #[tokio::test]
    async fn cancel_propagates_to_children() {
        let (parent, parent_handler) = Context::new();
        let (child, _child_handler) = parent.new_child();

        assert!(!child.is_done());
        parent_handler.cancel();
        child.done().await;
        assert!(child.is_done());
    }

    #[tokio::test]
    async fn shutdown_waits_for_dropped_contexts() {
        let handler = Handler::new();
        let ctx = handler.context();

        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(ctx);
        });

        handler.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test]
    async fn with_context_stops_future_on_cancel() {
        let (ctx, handler) = Context::new();

        let fut = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            42
        }
        .with_context(ctx);

        handler.cancel();
        let result = fut.with_timeout(Duration::from_millis(200)).await;
        assert_eq!(result, Ok(None));
    }
}
