//! Output sinks for frame encoding
//!
//! A sink is either random-access (the bytes just written can be read back
//! and patched in place) or forward-only (bytes leave as soon as they are
//! written). Layers that need to see their own output, such as checksums,
//! branch on [`OutputSink::RANDOM_ACCESS`] once per sink type.

use crate::error::{ProtocolError, ProtocolResult};
use std::io;

/// Object-safe byte output used by fields and messages
pub trait ByteSink {
    /// Append `bytes`, failing without partial output when they don't fit
    fn put(&mut self, bytes: &[u8]) -> ProtocolResult<()>;

    /// Bytes that can still be written
    fn remaining(&self) -> usize;
}

/// Sink used by protocol stacks
pub trait OutputSink: ByteSink {
    /// Whether written bytes can be read back and patched
    const RANDOM_ACCESS: bool;

    /// Absolute write position, usable with [`written_since`](Self::written_since)
    fn position(&self) -> usize;

    /// Bytes written from `start` to the current position
    ///
    /// Always `None` for forward-only sinks.
    fn written_since(&self, start: usize) -> Option<&[u8]>;

    /// Overwrite bytes at absolute position `at`
    fn patch(&mut self, at: usize, bytes: &[u8]) -> ProtocolResult<()>;
}

/// Random-access sink over a caller-provided buffer
#[derive(Debug)]
pub struct SliceWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes written so far
    pub fn written(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    pub fn len(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    /// Rewind to the start, keeping the buffer
    pub fn clear(&mut self) {
        self.pos = 0;
    }
}

impl ByteSink for SliceWriter<'_> {
    fn put(&mut self, bytes: &[u8]) -> ProtocolResult<()> {
        let end = self.pos + bytes.len();
        if end > self.buf.len() {
            return Err(ProtocolError::buffer_overflow(
                bytes.len(),
                self.remaining(),
                "slice writer",
            ));
        }
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

impl OutputSink for SliceWriter<'_> {
    const RANDOM_ACCESS: bool = true;

    fn position(&self) -> usize {
        self.pos
    }

    fn written_since(&self, start: usize) -> Option<&[u8]> {
        self.buf.get(start..self.pos)
    }

    fn patch(&mut self, at: usize, bytes: &[u8]) -> ProtocolResult<()> {
        let end = at + bytes.len();
        if end > self.pos {
            return Err(ProtocolError::buffer_overflow(
                end,
                self.pos,
                "slice writer patch",
            ));
        }
        self.buf[at..end].copy_from_slice(bytes);
        Ok(())
    }
}

/// Growable random-access sink; positions are indices into the vector
impl ByteSink for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) -> ProtocolResult<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn remaining(&self) -> usize {
        isize::MAX as usize - self.len()
    }
}

impl OutputSink for Vec<u8> {
    const RANDOM_ACCESS: bool = true;

    fn position(&self) -> usize {
        self.len()
    }

    fn written_since(&self, start: usize) -> Option<&[u8]> {
        self.get(start..)
    }

    fn patch(&mut self, at: usize, bytes: &[u8]) -> ProtocolResult<()> {
        let end = at + bytes.len();
        match self.get_mut(at..end) {
            Some(target) => {
                target.copy_from_slice(bytes);
                Ok(())
            }
            None => Err(ProtocolError::buffer_overflow(end, self.len(), "vec patch")),
        }
    }
}

/// Forward-only sink over any [`io::Write`]
///
/// Written bytes cannot be revisited, so layers whose value depends on
/// later bytes leave a placeholder and report `UpdateRequired`.
#[derive(Debug)]
pub struct StreamWriter<W> {
    inner: W,
    written: usize,
    limit: usize,
}

impl<W: io::Write> StreamWriter<W> {
    /// Unbounded stream sink
    pub fn new(inner: W) -> Self {
        Self::with_limit(inner, usize::MAX)
    }

    /// Stream sink accepting at most `limit` bytes
    pub fn with_limit(inner: W, limit: usize) -> Self {
        Self {
            inner,
            written: 0,
            limit,
        }
    }

    pub fn bytes_written(&self) -> usize {
        self.written
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: io::Write> ByteSink for StreamWriter<W> {
    fn put(&mut self, bytes: &[u8]) -> ProtocolResult<()> {
        if bytes.len() > self.remaining() {
            return Err(ProtocolError::buffer_overflow(
                bytes.len(),
                self.remaining(),
                "stream writer",
            ));
        }
        self.inner.write_all(bytes)?;
        self.written += bytes.len();
        Ok(())
    }

    fn remaining(&self) -> usize {
        self.limit - self.written
    }
}

impl<W: io::Write> OutputSink for StreamWriter<W> {
    const RANDOM_ACCESS: bool = false;

    fn position(&self) -> usize {
        self.written
    }

    fn written_since(&self, _start: usize) -> Option<&[u8]> {
        None
    }

    fn patch(&mut self, at: usize, _bytes: &[u8]) -> ProtocolResult<()> {
        Err(ProtocolError::Io(format!(
            "forward-only sink cannot patch offset {at}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_writer_overflow_is_atomic() {
        let mut buf = [0u8; 3];
        let mut sink = SliceWriter::new(&mut buf);
        sink.put(&[1, 2]).unwrap();
        let err = sink.put(&[3, 4]).unwrap_err();
        assert!(matches!(err, ProtocolError::BufferOverflow { need: 2, available: 1, .. }));
        assert_eq!(sink.written(), &[1, 2]);
    }

    #[test]
    fn test_slice_writer_patch_and_readback() {
        let mut buf = [0u8; 8];
        let mut sink = SliceWriter::new(&mut buf);
        sink.put(&[0xAA, 0x00, 0x00, 0xBB]).unwrap();
        assert_eq!(sink.written_since(1), Some(&[0x00, 0x00, 0xBB][..]));
        sink.patch(1, &[0x11, 0x22]).unwrap();
        assert_eq!(sink.written(), &[0xAA, 0x11, 0x22, 0xBB]);
        assert!(sink.patch(3, &[0, 0]).is_err());
    }

    #[test]
    fn test_stream_writer_is_forward_only() {
        let mut sink = StreamWriter::with_limit(Vec::new(), 4);
        sink.put(&[1, 2, 3]).unwrap();
        assert_eq!(sink.position(), 3);
        assert!(sink.written_since(0).is_none());
        assert!(sink.patch(0, &[9]).is_err());
        assert!(sink.put(&[4, 5]).is_err());
        assert_eq!(sink.into_inner(), vec![1, 2, 3]);
    }

    #[test]
    fn test_sink_categories() {
        assert!(<SliceWriter<'_> as OutputSink>::RANDOM_ACCESS);
        assert!(<Vec<u8> as OutputSink>::RANDOM_ACCESS);
        assert!(!<StreamWriter<Vec<u8>> as OutputSink>::RANDOM_ACCESS);
    }
}
