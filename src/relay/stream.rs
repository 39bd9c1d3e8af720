//! Relay stream
//!
//! Pumps transcoder output into the HTTP response body. The stream ends
//! when the transcoder exits, when it stalls, or when reading fails, and in
//! each case the process is torn down before end-of-stream is reported. A
//! client disconnect drops the stream, and dropping tears the process down.

use bytes::Bytes;
use futures_util::Stream;
use std::io;
use tokio::io::AsyncReadExt;
use tokio::process::ChildStdout;
use tokio::time::{Duration, Instant};

use crate::config::RelayConfig;
use crate::error::TranscodeError;
use crate::transcode::TranscodeProcess;

use super::session::{RelaySession, SessionPhase};

/// Why a relay stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The transcoder exited
    Exited,
    /// No output for longer than the stall threshold
    Stalled,
    /// Reading the output pipe failed
    ReadFailed,
}

/// Chunked output of one transcoder process
pub struct RelayStream {
    session: RelaySession,
    process: TranscodeProcess,
    stdout: ChildStdout,
    buf: Vec<u8>,
    last_activity: Instant,
    stall_timeout: Duration,
    poll_interval: Duration,
    bytes_sent: u64,
    end: Option<StreamEnd>,
}

impl RelayStream {
    pub fn new(
        mut session: RelaySession,
        mut process: TranscodeProcess,
        config: &RelayConfig,
    ) -> Result<Self, TranscodeError> {
        let stdout = process
            .take_stdout()
            .ok_or(TranscodeError::MissingPipe("stdout"))?;
        session.enter(SessionPhase::Streaming);

        Ok(Self {
            session,
            process,
            stdout,
            buf: vec![0; config.chunk_size.max(1)],
            last_activity: Instant::now(),
            stall_timeout: config.stall_timeout(),
            poll_interval: config.poll_interval(),
            bytes_sent: 0,
            end: None,
        })
    }

    #[cfg(test)]
    pub fn session(&self) -> &RelaySession {
        &self.session
    }

    /// Why the stream ended, once it has
    #[cfg(test)]
    pub fn end_reason(&self) -> Option<StreamEnd> {
        self.end
    }

    /// Next chunk of output, or `None` once the stream has ended.
    pub async fn next_chunk(&mut self) -> Option<Bytes> {
        if self.end.is_some() {
            return None;
        }

        loop {
            match tokio::time::timeout(self.poll_interval, self.stdout.read(&mut self.buf)).await {
                Ok(Ok(0)) => {
                    // Output closed and fully read; keep polling until the
                    // process is gone or the stall threshold is hit.
                    if let Some(end) = self.check_end() {
                        return self.finish(end).await;
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
                Ok(Ok(n)) => {
                    self.last_activity = Instant::now();
                    self.bytes_sent += n as u64;
                    return Some(Bytes::copy_from_slice(&self.buf[..n]));
                }
                Ok(Err(e)) => {
                    tracing::warn!(session = %self.session.id(), "Transcoder read failed: {}", e);
                    return self.finish(StreamEnd::ReadFailed).await;
                }
                // Exit is only checked once the pipe reaches EOF, so output
                // still buffered in it is never dropped.
                Err(_) if self.is_stalled() => return self.finish(StreamEnd::Stalled).await,
                Err(_) => {}
            }
        }
    }

    fn is_stalled(&self) -> bool {
        self.last_activity.elapsed() > self.stall_timeout
    }

    fn check_end(&mut self) -> Option<StreamEnd> {
        if self.process.try_wait().is_some() {
            Some(StreamEnd::Exited)
        } else if self.is_stalled() {
            Some(StreamEnd::Stalled)
        } else {
            None
        }
    }

    async fn finish(&mut self, end: StreamEnd) -> Option<Bytes> {
        self.end = Some(end);
        self.session.enter(SessionPhase::Teardown);
        self.process.teardown().await;
        self.session.enter(SessionPhase::Closed);

        tracing::info!(
            session = %self.session.id(),
            station = %self.session.station(),
            bytes = self.bytes_sent,
            elapsed = ?self.session.elapsed(),
            "Relay ended: {:?}",
            end
        );
        None
    }

    /// Adapt into a response body stream. Never yields an error.
    pub fn into_body_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        futures_util::stream::unfold(self, |mut relay| async move {
            relay.next_chunk().await.map(|chunk| (Ok(chunk), relay))
        })
    }
}

impl Drop for RelayStream {
    fn drop(&mut self) {
        if self.end.is_none() {
            // The process handle schedules its own teardown when dropped.
            self.session.enter(SessionPhase::Teardown);
            tracing::info!(
                session = %self.session.id(),
                station = %self.session.station(),
                bytes = self.bytes_sent,
                elapsed = ?self.session.elapsed(),
                "Relay ended: client disconnected"
            );
        }
    }
}
