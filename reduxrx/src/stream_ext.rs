use futures_core::stream::Stream;
use pin_project::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Adaptors for the state streams returned by [`Store::to_stream`](crate::Store::to_stream).
pub trait StoreStreamExt: Stream {
    /// Yields items until `test` returns true; the matching item is still yielded.
    ///
    /// ```
    /// use futures_signals::signal::SignalExt;
    /// use reduxrx::StoreStreamExt;
    ///
    /// async fn example() {
    ///     let stream = futures_signals::signal::always(0)
    ///         .to_stream()
    ///         .stop_if(|&value| value > 5);
    /// }
    /// ```
    fn stop_if<F>(self, test: F) -> StopIf<Self, F>
    where
        F: FnMut(&Self::Item) -> bool,
        Self: Sized,
    {
        StopIf {
            stream: self,
            stopped: false,
            test,
        }
    }

    /// Projects every item with `selector` and drops projections equal to the
    /// previous one.
    fn select_distinct<T, F>(self, selector: F) -> SelectDistinct<Self, F, T>
    where
        F: FnMut(&Self::Item) -> T,
        T: Clone + PartialEq,
        Self: Sized,
    {
        SelectDistinct {
            stream: self,
            selector,
            last: None,
        }
    }
}

impl<T: ?Sized> StoreStreamExt for T where T: Stream {}

#[pin_project(project = StopIfProj)]
#[derive(Debug)]
#[must_use = "Streams do nothing unless polled"]
pub struct StopIf<A, B> {
    #[pin]
    stream: A,
    stopped: bool,
    test: B,
}

impl<A, B> Stream for StopIf<A, B>
where
    A: Stream,
    B: FnMut(&A::Item) -> bool,
{
    type Item = A::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let StopIfProj {
            stream,
            stopped,
            test,
        } = self.project();

        if *stopped {
            return Poll::Ready(None);
        }
        match stream.poll_next(cx) {
            Poll::Ready(Some(value)) => {
                if test(&value) {
                    *stopped = true;
                }
                Poll::Ready(Some(value))
            }
            Poll::Ready(None) => {
                *stopped = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[pin_project(project = SelectDistinctProj)]
#[derive(Debug)]
#[must_use = "Streams do nothing unless polled"]
pub struct SelectDistinct<A, F, T> {
    #[pin]
    stream: A,
    selector: F,
    last: Option<T>,
}

impl<A, F, T> Stream for SelectDistinct<A, F, T>
where
    A: Stream,
    F: FnMut(&A::Item) -> T,
    T: Clone + PartialEq,
{
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let SelectDistinctProj {
            mut stream,
            selector,
            last,
        } = self.project();

        loop {
            match stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => {
                    let selected = selector(&item);
                    if last.as_ref() == Some(&selected) {
                        continue;
                    }
                    *last = Some(selected.clone());
                    return Poll::Ready(Some(selected));
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
