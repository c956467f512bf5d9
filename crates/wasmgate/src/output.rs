use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tokio::io::AsyncWrite;
use wasmtime_wasi::{
    async_trait,
    cli::{IsTerminal, StdoutStream},
    p2::{OutputStream, Pollable, StreamResult},
};

/// Sink holding the first `capacity` bytes a guest wrote to one output stream.
///
/// Every write succeeds from the guest's side. Bytes past the capacity are
/// dropped and counted, so the host decides what an overflow means.
#[derive(Clone, Debug)]
pub struct CapturedOutput {
    inner: Arc<Mutex<Captured>>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct Captured {
    buf: BytesMut,
    dropped: usize,
}

impl CapturedOutput {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::default(),
            capacity,
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the retained bytes.
    #[must_use]
    pub fn contents(&self) -> Bytes {
        self.inner.lock().buf.clone().freeze()
    }

    /// Number of bytes written past the capacity.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.inner.lock().dropped
    }

    #[must_use]
    pub fn overflowed(&self) -> bool {
        self.dropped() > 0
    }

    fn append(&self, bytes: &[u8]) {
        let mut inner = self.inner.lock();
        let keep = bytes.len().min(self.capacity - inner.buf.len());
        inner.buf.extend_from_slice(&bytes[..keep]);
        inner.dropped += bytes.len() - keep;
    }
}

impl IsTerminal for CapturedOutput {
    fn is_terminal(&self) -> bool {
        false
    }
}

impl StdoutStream for CapturedOutput {
    fn p2_stream(&self) -> Box<dyn OutputStream> {
        Box::new(self.clone())
    }

    fn async_stream(&self) -> Box<dyn AsyncWrite + Send + Sync> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl OutputStream for CapturedOutput {
    fn write(&mut self, bytes: Bytes) -> StreamResult<()> {
        self.append(&bytes);
        Ok(())
    }

    fn flush(&mut self) -> StreamResult<()> {
        Ok(())
    }

    fn check_write(&mut self) -> StreamResult<usize> {
        Ok(usize::MAX)
    }
}

#[async_trait]
impl Pollable for CapturedOutput {
    async fn ready(&mut self) {}
}

impl AsyncWrite for CapturedOutput {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.append(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
