use super::{ProtocolLayer, WriteStatus};
use std::marker::PhantomData;
use std::ops::DerefMut;
use strata_types::{Message, OutputSink, ProtocolError, ProtocolResult};

/// Innermost layer: forwards to the message object itself
pub struct PayloadLayer<M, P> {
    _message: PhantomData<fn() -> (M, P)>,
}

impl<M, P> PayloadLayer<M, P> {
    pub fn new() -> Self {
        Self {
            _message: PhantomData,
        }
    }
}

impl<M, P> Default for PayloadLayer<M, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M, P> std::fmt::Debug for PayloadLayer<M, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PayloadLayer")
    }
}

impl<M: Message, P: DerefMut<Target = M>> ProtocolLayer for PayloadLayer<M, P> {
    type Message = M;
    type MsgPtr = P;

    fn read(&mut self, msg: &mut Option<P>, buf: &[u8]) -> ProtocolResult<usize> {
        let message = msg.as_deref_mut().ok_or(ProtocolError::MissingMessage {
            context: "payload read",
        })?;

        let mut cursor = buf;
        message.read(&mut cursor)?;
        if !message.valid() {
            return Err(ProtocolError::invalid_data(
                message.name(),
                "field validation failed after read",
            ));
        }
        Ok(buf.len() - cursor.len())
    }

    fn write<S: OutputSink>(&self, msg: &M, sink: &mut S) -> ProtocolResult<WriteStatus> {
        if !msg.valid() {
            return Err(ProtocolError::invalid_data(
                msg.name(),
                "refusing to write invalid field values",
            ));
        }
        msg.write(sink)?;
        Ok(WriteStatus::Complete)
    }

    fn update(&self, msg: &M, buf: &mut [u8]) -> ProtocolResult<usize> {
        let length = msg.length();
        if buf.len() < length {
            return Err(ProtocolError::not_enough_data(length, buf.len(), "payload update"));
        }
        Ok(length)
    }

    fn length(&self, msg: &M) -> usize {
        msg.length()
    }

    fn cover_trailing(&mut self, _bytes: usize) {}
}
