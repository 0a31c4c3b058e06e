//! # Frame Processor - Streaming Input Loop
//!
//! ## Purpose
//!
//! Drives a [`ProtocolStack`] over bytes that arrive in arbitrary chunks.
//! Input is appended to a growable buffer; every call to
//! [`process`](FrameProcessor::process) decodes as many complete frames as
//! the buffer holds, dispatches each one and removes exactly the bytes it
//! consumed.
//!
//! ## Failure Handling
//!
//! - `NotEnoughData`: stop and keep the buffer for the next chunk
//! - `ProtocolError`, `InvalidMsgId`, `InvalidData`: resynchronize by
//!   dropping input according to the [`ResyncStrategy`]
//! - anything else (slot occupancy, configuration): returned to the caller
//!
//! Every resynchronization step drops at least one byte, so any finite
//! buffer is consumed in at most `len` iterations.

use crate::dispatch::Dispatch;
use crate::layer::ProtocolLayer;
use crate::stack::ProtocolStack;
use bytes::{Buf, BytesMut};
use serde::Serialize;
use strata_config::{ResyncStrategy, StackConfig};
use strata_types::{ProtocolResult, Status};
use tracing::{trace, warn};

/// Dropped bytes shown in resync warnings
const LOGGED_DROP_PREFIX: usize = 16;

/// Counters kept by a frame processor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessorStats {
    pub frames: u64,
    pub bytes_consumed: u64,
    pub bytes_dropped: u64,
    pub resyncs: u64,
    pub protocol_errors: u64,
    pub invalid_msg_ids: u64,
    pub invalid_data: u64,
}

impl ProcessorStats {
    fn record_error(&mut self, status: Status) {
        match status {
            Status::ProtocolError => self.protocol_errors += 1,
            Status::InvalidMsgId => self.invalid_msg_ids += 1,
            Status::InvalidData => self.invalid_data += 1,
            _ => {}
        }
    }

    /// Errors that triggered resynchronization, by status
    pub fn errors(&self, status: Status) -> u64 {
        match status {
            Status::ProtocolError => self.protocol_errors,
            Status::InvalidMsgId => self.invalid_msg_ids,
            Status::InvalidData => self.invalid_data,
            _ => 0,
        }
    }
}

/// Streaming decoder over a protocol stack
pub struct FrameProcessor<L: ProtocolLayer> {
    stack: ProtocolStack<L>,
    input: BytesMut,
    resync: ResyncStrategy,
    stats: ProcessorStats,
}

impl<L: ProtocolLayer> FrameProcessor<L> {
    pub fn new(stack: ProtocolStack<L>) -> Self {
        Self::with_config(stack, &StackConfig::default())
    }

    /// Take input capacity and resync strategy from `config`
    pub fn with_config(stack: ProtocolStack<L>, config: &StackConfig) -> Self {
        Self {
            stack,
            input: BytesMut::with_capacity(config.input_capacity),
            resync: config.resync,
            stats: ProcessorStats::default(),
        }
    }

    pub fn with_resync(mut self, resync: ResyncStrategy) -> Self {
        self.resync = resync;
        self
    }

    /// Append received bytes
    pub fn feed(&mut self, bytes: &[u8]) {
        self.input.extend_from_slice(bytes);
    }

    /// Decode buffered frames, dispatching each to `handler`
    ///
    /// Returns the number of frames dispatched.
    pub fn process<H>(&mut self, handler: &mut H) -> ProtocolResult<usize>
    where
        H: ?Sized,
        L::Message: Dispatch<H>,
    {
        self.process_with(|message| Dispatch::dispatch(&*message, &mut *handler))
    }

    /// Decode buffered frames, passing each message handle to `on_message`
    ///
    /// With in-place allocation the handle must be dropped before the next
    /// frame can be decoded, so `on_message` must not keep it.
    pub fn process_with<F>(&mut self, mut on_message: F) -> ProtocolResult<usize>
    where
        F: FnMut(L::MsgPtr),
    {
        let mut decoded = 0;

        while !self.input.is_empty() {
            match self.stack.try_read(&self.input) {
                Ok((message, consumed)) => {
                    self.input.advance(consumed);
                    self.stats.frames += 1;
                    self.stats.bytes_consumed += consumed as u64;
                    decoded += 1;
                    on_message(message);
                }
                Err(err) if err.is_retryable() => {
                    trace!(pending = self.input.len(), %err, "Waiting for more input");
                    break;
                }
                Err(err) if err.is_resync() => {
                    let status = err.status();
                    self.stats.record_error(status);
                    let dropped = self.resync_len();
                    warn!(
                        %status,
                        %err,
                        dropped,
                        head = %hex::encode(&self.input[..dropped.min(LOGGED_DROP_PREFIX)]),
                        "Resynchronizing input"
                    );
                    self.input.advance(dropped);
                    self.stats.bytes_dropped += dropped as u64;
                    self.stats.resyncs += 1;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(decoded)
    }

    /// Feed `bytes` and dispatch every frame they complete
    pub fn feed_and_process<H>(&mut self, bytes: &[u8], handler: &mut H) -> ProtocolResult<usize>
    where
        H: ?Sized,
        L::Message: Dispatch<H>,
    {
        self.feed(bytes);
        self.process(handler)
    }

    /// Bytes to drop at the front of the buffer after a failed read
    fn resync_len(&self) -> usize {
        match (self.resync, self.stack.frame_marker()) {
            (ResyncStrategy::ScanForSync, Some(marker)) => self.input[1..]
                .iter()
                .position(|byte| *byte == marker)
                .map_or(self.input.len(), |offset| offset + 1),
            _ => 1,
        }
    }

    /// Buffered bytes not yet consumed
    pub fn pending(&self) -> &[u8] {
        &self.input
    }

    /// Discard all buffered input
    pub fn clear(&mut self) {
        self.input.clear();
    }

    pub fn stats(&self) -> &ProcessorStats {
        &self.stats
    }

    pub fn resync_strategy(&self) -> ResyncStrategy {
        self.resync
    }

    pub fn stack(&self) -> &ProtocolStack<L> {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut ProtocolStack<L> {
        &mut self.stack
    }

    pub fn into_stack(self) -> ProtocolStack<L> {
        self.stack
    }
}

impl<L: ProtocolLayer> std::fmt::Debug for FrameProcessor<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameProcessor")
            .field("pending", &self.input.len())
            .field("resync", &self.resync)
            .field("stats", &self.stats)
            .finish()
    }
}
