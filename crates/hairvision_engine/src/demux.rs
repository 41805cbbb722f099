//! Turns an arbitrarily chunked byte stream into whole log lines.
//!
//! Splitting happens on raw bytes and only complete lines are decoded, so
//! a multi-byte character cut by a chunk boundary is reassembled before it
//! reaches the decoder. Lines are emitted without their `\n`; an empty
//! line between two newlines is emitted as `""`.

use std::fmt::Display;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let search_from = self.pending.len();
        self.pending.extend_from_slice(chunk);
        let Some(offset) = self.pending[search_from..].iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };
        let rest = self.pending.split_off(search_from + offset + 1);
        let mut complete = std::mem::replace(&mut self.pending, rest);
        complete.pop();
        complete
            .split(|b| *b == b'\n')
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }

    /// Bytes received after the last newline.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Flushes the unterminated tail at end of stream, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let tail = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&tail).into_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpEnd {
    Cancelled,
    Read(String),
}

/// Reads `body` to its end, handing completed lines to `on_lines`.
///
/// Cancellation is checked before and after every chunk: once the token
/// fires, nothing more is delivered and any buffered tail is dropped.
/// Returns the number of lines delivered.
pub async fn pump_lines<S, E>(
    mut body: S,
    cancel: &CancellationToken,
    mut on_lines: impl FnMut(Vec<String>),
) -> Result<usize, PumpEnd>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    let mut assembler = LineAssembler::new();
    let mut delivered = 0;
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PumpEnd::Cancelled),
            next = body.next() => next,
        };
        if cancel.is_cancelled() {
            return Err(PumpEnd::Cancelled);
        }
        match next {
            Some(Ok(chunk)) => {
                let lines = assembler.push(&chunk);
                if !lines.is_empty() {
                    delivered += lines.len();
                    on_lines(lines);
                }
            }
            Some(Err(err)) => return Err(PumpEnd::Read(err.to_string())),
            None => break,
        }
    }
    if let Some(tail) = assembler.finish() {
        delivered += 1;
        on_lines(vec![tail]);
    }
    Ok(delivered)
}
