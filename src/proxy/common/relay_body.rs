// 透传响应体
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use pin_project::{pin_project, pinned_drop};
use thiserror::Error;
use tokio::time::{Instant, Sleep};

#[derive(Debug, Error)]
pub enum RelayBodyError {
    #[error("upstream body error: {0}")]
    Upstream(String),

    #[error("upstream body stalled for {0:?}")]
    Idle(Duration),
}

/// Byte stream copied verbatim from the upstream response.
///
/// Owns the upstream body; dropping it (end of stream, stream error, idle deadline,
/// or the caller hanging up mid-response) drops the inner stream and with it the
/// upstream connection. The idle deadline restarts on every chunk.
#[pin_project(PinnedDrop)]
pub struct RelayBody<S> {
    #[pin]
    inner: S,
    #[pin]
    idle: Sleep,
    idle_timeout: Duration,
    relayed_bytes: u64,
    finished: bool,
}

impl<S> RelayBody<S> {
    pub fn new(inner: S, idle_timeout: Duration) -> Self {
        Self {
            inner,
            idle: tokio::time::sleep(idle_timeout),
            idle_timeout,
            relayed_bytes: 0,
            finished: false,
        }
    }
}

impl<S, E> Stream for RelayBody<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    type Item = Result<Bytes, RelayBodyError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        if *this.finished {
            return Poll::Ready(None);
        }

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                *this.relayed_bytes += chunk.len() as u64;
                this.idle.as_mut().reset(Instant::now() + *this.idle_timeout);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                tracing::error!("[Relay] Upstream body error after {} bytes: {}", this.relayed_bytes, e);
                *this.finished = true;
                Poll::Ready(Some(Err(RelayBodyError::Upstream(e.to_string()))))
            }
            Poll::Ready(None) => {
                *this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => match this.idle.poll(cx) {
                Poll::Ready(()) => {
                    tracing::error!(
                        "[Relay] Upstream body idle for {:?} after {} bytes, aborting",
                        this.idle_timeout,
                        this.relayed_bytes
                    );
                    *this.finished = true;
                    Poll::Ready(Some(Err(RelayBodyError::Idle(*this.idle_timeout))))
                }
                Poll::Pending => Poll::Pending,
            },
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[pinned_drop]
impl<S> PinnedDrop for RelayBody<S> {
    fn drop(self: Pin<&mut Self>) {
        let this = self.project();
        if *this.finished {
            tracing::debug!("[Relay] Body closed after {} bytes", this.relayed_bytes);
        } else {
            tracing::warn!(
                "[Relay] Caller went away after {} bytes, closing upstream stream",
                this.relayed_bytes
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    const IDLE: Duration = Duration::from_secs(5);

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_chunks_pass_through_unchanged() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"{\"candidates\":")),
            Ok(Bytes::from_static(b"[]}")),
        ];
        let mut body = Box::pin(RelayBody::new(futures::stream::iter(chunks), IDLE));

        let mut collected = Vec::new();
        while let Some(chunk) = body.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, b"{\"candidates\":[]}");
        assert_eq!(body.relayed_bytes, 17);
        assert!(body.finished);
    }

    #[tokio::test]
    async fn test_early_drop_releases_inner_stream() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(released.clone());
        let inner = futures::stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"a")),
            Ok(Bytes::from_static(b"b")),
        ])
        .map(move |item| {
            let _keep = &flag;
            item
        });

        let mut body = Box::pin(RelayBody::new(inner, IDLE));
        assert!(body.next().await.is_some());
        assert!(!released.load(Ordering::SeqCst));

        drop(body);
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_error_is_forwarded() {
        let inner = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ]);
        let body = RelayBody::new(inner, IDLE);
        let items: Vec<_> = body.collect().await;
        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], Err(RelayBodyError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_stalled_stream_ends_with_idle_error() {
        let inner = futures::stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(b"{\"cand"))])
            .chain(futures::stream::pending());
        let body = RelayBody::new(inner, Duration::from_millis(100));

        let items: Vec<_> = tokio::time::timeout(Duration::from_secs(5), body.collect())
            .await
            .expect("idle deadline should end the stream");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), &Bytes::from_static(b"{\"cand"));
        assert!(matches!(items[1], Err(RelayBodyError::Idle(_))));
    }

    #[tokio::test]
    async fn test_idle_deadline_restarts_per_chunk() {
        // Three chunks 60ms apart: total exceeds the 100ms idle window, no gap does.
        let inner = futures::stream::iter(0..3).then(|i| async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            Ok::<_, std::io::Error>(Bytes::from(format!("{}", i)))
        });
        let body = RelayBody::new(inner, Duration::from_millis(100));
        let items: Vec<_> = body.collect().await;
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|item| item.is_ok()));
    }
}
