use std::future::Future;
use std::pin::Pin;
use std::task::Poll;

#[allow(unused_imports)]
use crate::{Context, ContextRef};

pin_project_lite::pin_project! {
    /// Future returned by [`ContextFutExt::with_context`].
    pub struct WithContext<'a, F> {
        #[pin]
        fut: F,
        #[pin]
        ctx: ContextRef<'a>,
    }
}

impl<F: Future> Future for WithContext<'_, F> {
    type Output = Option<F::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        if let Poll::Ready(output) = this.fut.poll(cx) {
            return Poll::Ready(Some(output));
        }

        if this.ctx.poll(cx).is_ready() { Poll::Ready(None) } else { Poll::Pending }
    }
}

/// Extension trait attaching a cancellation [`Context`] to any future.
pub trait ContextFutExt: Future + Sized {
    /// Races `self` against the context's cancellation.
    ///
    /// Resolves to `Some(output)` if the future completes first, or `None`
    /// if the context is cancelled first, in which case `self` is dropped.
    fn with_context<'a>(self, ctx: impl Into<ContextRef<'a>>) -> WithContext<'a, Self> {
        WithContext {
            fut: self,
            ctx: ctx.into(),
        }
    }
}

impl<F: Future> ContextFutExt for F {}
