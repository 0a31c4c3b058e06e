//! A hand-written message built from field primitives, exercised through
//! both sink categories

use strata_types::{
    BytesField, ByteSink, Field, IntField, LittleEndian, Message, OutputSink, ProtocolError,
    ProtocolResult, SliceWriter, Status, StreamWriter,
};

/// Little-endian record with a length-prefixed label
#[derive(Debug, Default, PartialEq)]
struct Record {
    seq: IntField<u32, LittleEndian>,
    label: BytesField<u16, LittleEndian>,
}

impl Message for Record {
    type Id = u16;

    fn id(&self) -> u16 {
        0x0102
    }

    fn name(&self) -> &'static str {
        "Record"
    }

    fn read(&mut self, buf: &mut &[u8]) -> ProtocolResult<()> {
        let mut cursor = *buf;
        self.seq.read(&mut cursor)?;
        self.label.read(&mut cursor)?;
        *buf = cursor;
        Ok(())
    }

    fn write(&self, sink: &mut dyn ByteSink) -> ProtocolResult<()> {
        self.seq.write(sink)?;
        self.label.write(sink)
    }

    fn length(&self) -> usize {
        self.seq.length() + self.label.length()
    }

    fn valid(&self) -> bool {
        self.seq.valid() && self.label.valid()
    }
}

fn record() -> Record {
    Record {
        seq: IntField::new(0x0A0B0C0D),
        label: BytesField::new(&b"abc"[..]),
    }
}

#[test]
fn test_length_matches_written_bytes() {
    let msg = record();
    let mut out = Vec::new();
    msg.write(&mut out).unwrap();
    assert_eq!(out.len(), msg.length());
    assert_eq!(out, [0x0D, 0x0C, 0x0B, 0x0A, 0x03, 0x00, b'a', b'b', b'c']);
}

#[test]
fn test_read_advances_cursor_exactly() {
    let mut bytes = Vec::new();
    record().write(&mut bytes).unwrap();
    bytes.extend_from_slice(&[0xEE, 0xFF]);

    let mut decoded = Record::default();
    let mut cursor = bytes.as_slice();
    decoded.read(&mut cursor).unwrap();
    assert_eq!(decoded, record());
    assert_eq!(cursor, &[0xEE, 0xFF]);
}

#[test]
fn test_short_input_leaves_cursor_untouched() {
    let mut bytes = Vec::new();
    record().write(&mut bytes).unwrap();
    let truncated = &bytes[..bytes.len() - 1];

    let mut decoded = Record::default();
    let mut cursor = truncated;
    let err = decoded.read(&mut cursor).unwrap_err();
    assert_eq!(err.status(), Status::NotEnoughData);
    assert_eq!(cursor.len(), truncated.len());
}

#[test]
fn test_sink_categories() {
    let msg = record();

    let mut buf = [0u8; 4];
    let mut slice = SliceWriter::new(&mut buf);
    let err = msg.write(&mut slice).unwrap_err();
    assert!(matches!(err, ProtocolError::BufferOverflow { .. }));

    let mut stream = StreamWriter::new(Vec::new());
    msg.write(&mut stream).unwrap();
    assert_eq!(stream.bytes_written(), msg.length());
    assert!(stream.written_since(0).is_none());
    assert!(!<StreamWriter<Vec<u8>> as OutputSink>::RANDOM_ACCESS);
    assert!(<SliceWriter<'_> as OutputSink>::RANDOM_ACCESS);
}
