//! Background read-ahead for call sources.
//!
//! Decompressing and parsing a call file costs far more than comparing
//! heads, so with many gzip inputs the merge spends most of its time
//! decoding. `ReadAheadSource` moves decoding of one source onto its own
//! thread and hands fully decoded records to the merge in batches over a
//! bounded channel. The merge itself stays single-threaded and pulls
//! records in exactly the order the source produced them.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │  CallReader     │───>│  Batch channel  │───>│  Merge driver   │
//! │ (background)    │    │   (bounded)     │    │  (main thread)  │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```

use crate::error::Result;
use crate::position::{Call, Position};
use crate::streaming::buffers::{READ_AHEAD_BATCH, READ_AHEAD_CHANNEL};
use crate::streaming::source::CallSource;
use crossbeam_channel::{bounded, Receiver, Sender};
use log::error;
use std::thread::{self, JoinHandle};

type Batch = Vec<(Position, Call, u64)>;

/// A call source decoded on a background thread.
pub struct ReadAheadSource {
    /// Receiver for decoded batches (Option to allow closing before join).
    receiver: Option<Receiver<Result<Batch>>>,
    handle: Option<JoinHandle<()>>,
    name: String,
    current_batch: std::vec::IntoIter<(Position, Call, u64)>,
    line_number: u64,
    done: bool,
}

impl ReadAheadSource {
    /// Start decoding `source` in the background with default batch sizes.
    pub fn spawn<S: CallSource + Send + 'static>(source: S) -> Self {
        Self::with_batch_size(source, READ_AHEAD_BATCH, READ_AHEAD_CHANNEL)
    }

    /// Start decoding with explicit batch size and channel depth.
    pub fn with_batch_size<S: CallSource + Send + 'static>(
        mut source: S,
        batch_size: usize,
        channel_buffer: usize,
    ) -> Self {
        let batch_size = batch_size.max(1);
        let (tx, rx) = bounded(channel_buffer.max(1));
        let name = source.describe();

        let handle = thread::spawn(move || {
            Self::decoder_thread(&mut source, tx, batch_size);
        });

        Self {
            receiver: Some(rx),
            handle: Some(handle),
            name,
            current_batch: Vec::new().into_iter(),
            line_number: 0,
            done: false,
        }
    }

    /// Decoder thread: read batches until EOF, error, or the receiver
    /// goes away. An empty batch marks EOF.
    fn decoder_thread<S: CallSource>(source: &mut S, tx: Sender<Result<Batch>>, batch_size: usize) {
        let mut batch = Vec::with_capacity(batch_size);
        loop {
            match source.next_call() {
                Ok(Some((position, call))) => {
                    batch.push((position, call, source.line_number()));
                    if batch.len() >= batch_size {
                        if tx.send(Ok(batch)).is_err() {
                            return;
                        }
                        batch = Vec::with_capacity(batch_size);
                    }
                }
                Ok(None) => {
                    if !batch.is_empty() && tx.send(Ok(batch)).is_err() {
                        return;
                    }
                    let _ = tx.send(Ok(Vec::new()));
                    return;
                }
                Err(e) => {
                    error!("Error decoding {}: {}", source.describe(), e);
                    // Records decoded before the failure still go out first
                    if !batch.is_empty() && tx.send(Ok(batch)).is_err() {
                        return;
                    }
                    let _ = tx.send(Err(e));
                    return;
                }
            }
        }
    }

    fn close(&mut self) {
        // Dropping the receiver unblocks a decoder waiting on a full channel
        self.receiver.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl CallSource for ReadAheadSource {
    fn next_call(&mut self) -> Result<Option<(Position, Call)>> {
        loop {
            if let Some((position, call, line)) = self.current_batch.next() {
                self.line_number = line;
                return Ok(Some((position, call)));
            }
            if self.done {
                return Ok(None);
            }

            let received = match self.receiver.as_ref() {
                Some(rx) => rx.recv(),
                None => return Ok(None),
            };
            match received {
                Ok(Ok(batch)) if batch.is_empty() => {
                    self.done = true;
                    self.close();
                }
                Ok(Ok(batch)) => self.current_batch = batch.into_iter(),
                Ok(Err(e)) => {
                    self.done = true;
                    self.close();
                    return Err(e);
                }
                // Decoder thread died without an EOF marker
                Err(_) => {
                    self.done = true;
                    self.close();
                    return Err(crate::error::MergeError::InvalidFormat(format!(
                        "read-ahead decoder for {} stopped unexpectedly",
                        self.name
                    )));
                }
            }
        }
    }

    fn describe(&self) -> String {
        self.name.clone()
    }

    fn line_number(&self) -> u64 {
        self.line_number
    }
}

impl Drop for ReadAheadSource {
    fn drop(&mut self) {
        self.close();
    }
}
