use super::{ProtocolLayer, WriteStatus};
use crate::checksum::ChecksumAlgorithm;
use std::marker::PhantomData;
use strata_types::wire;
use strata_types::{ByteOrder, OutputSink, ProtocolError, ProtocolResult, WireInt};
use tracing::{trace, warn};

/// Trailing checksum over every byte produced by the inner chain
///
/// On random-access sinks the checksum is computed in the same pass. On
/// forward-only sinks a zero placeholder is written and the write reports
/// [`WriteStatus::UpdateRequired`]; `update` then patches the real value.
#[derive(Debug)]
pub struct ChecksumLayer<C, E, N> {
    algorithm: C,
    next: N,
    _order: PhantomData<E>,
}

impl<C: ChecksumAlgorithm, E: ByteOrder, N> ChecksumLayer<C, E, N> {
    pub fn new(algorithm: C, next: N) -> Self {
        Self {
            algorithm,
            next,
            _order: PhantomData,
        }
    }

    pub fn algorithm(&self) -> &C {
        &self.algorithm
    }

    pub fn next(&self) -> &N {
        &self.next
    }
}

impl<C: ChecksumAlgorithm, E: ByteOrder, N: ProtocolLayer> ProtocolLayer for ChecksumLayer<C, E, N> {
    type Message = N::Message;
    type MsgPtr = N::MsgPtr;

    fn read(&mut self, msg: &mut Option<Self::MsgPtr>, buf: &[u8]) -> ProtocolResult<usize> {
        let covered = self.next.read(msg, buf)?;
        let expected = match wire::decode::<C::Value, E>(&buf[covered..], "checksum") {
            Ok(value) => value,
            Err(err) => {
                *msg = None;
                return Err(err);
            }
        };

        let calculated = self.algorithm.compute(&buf[..covered]);
        if calculated != expected {
            *msg = None;
            warn!(
                algorithm = C::NAME,
                expected = ?expected,
                calculated = ?calculated,
                covered,
                "Checksum mismatch, discarding frame"
            );
            return Err(ProtocolError::checksum_mismatch(
                expected.to_u64(),
                calculated.to_u64(),
                covered,
            ));
        }

        Ok(covered + C::Value::WIDTH)
    }

    fn write<S: OutputSink>(&self, msg: &Self::Message, sink: &mut S) -> ProtocolResult<WriteStatus> {
        let start = sink.position();
        let inner = self.next.write(msg, sink)?;

        if S::RANDOM_ACCESS && inner == WriteStatus::Complete {
            if let Some(written) = sink.written_since(start) {
                let value = self.algorithm.compute(written);
                wire::encode::<C::Value, E>(value, sink)?;
                return Ok(WriteStatus::Complete);
            }
        }

        trace!(algorithm = C::NAME, "Writing checksum placeholder");
        wire::encode::<C::Value, E>(C::Value::default(), sink)?;
        Ok(WriteStatus::UpdateRequired)
    }

    fn update(&self, msg: &Self::Message, buf: &mut [u8]) -> ProtocolResult<usize> {
        let covered = self.next.update(msg, buf)?;
        let end = covered + C::Value::WIDTH;
        if buf.len() < end {
            return Err(ProtocolError::not_enough_data(end, buf.len(), "checksum update"));
        }
        let value = self.algorithm.compute(&buf[..covered]);
        wire::patch::<C::Value, E>(value, &mut buf[covered..end], "checksum update")?;
        Ok(end)
    }

    fn length(&self, msg: &Self::Message) -> usize {
        self.next.length(msg) + C::Value::WIDTH
    }

    fn cover_trailing(&mut self, bytes: usize) {
        self.next.cover_trailing(bytes);
    }
}
