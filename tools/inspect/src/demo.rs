//! Demo protocol spoken by the inspect tool
//!
//! Three message types on the reference layout
//! `SYNC(2B) | SIZE(2B) | ID(1B) | PAYLOAD | CHECKSUM(2B)`.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use strata_codec::{
    define_message, message_set, BasicSum, BytesField, IntField, Message, MessageRegistry,
    ProtocolLayer, ProtocolStack, StackBuilder, StackConfig,
};

define_message! {
    /// One 16-bit sensor reading
    pub struct Reading: u8 = 0x01 {
        pub value: IntField<u16>,
    }
}

define_message! {
    pub struct Pair: u8 = 0x02 {
        pub first: IntField<u8>,
        pub second: IntField<u8>,
    }
}

define_message! {
    /// Short text, at most 255 bytes
    pub struct Text: u8 = 0x03 {
        pub text: BytesField<u8>,
    }
}

message_set! {
    pub enum Demo: u8, handler DemoHandler {
        Reading,
        Pair,
        Text,
    }
}

/// Reference stack over the demo protocol, runtime values from `config`
pub fn build_stack(config: &StackConfig) -> Result<ProtocolStack<impl ProtocolLayer<Message = Demo>>> {
    let registry = Arc::new(MessageRegistry::<Demo>::from_set());
    let stack = StackBuilder::from_config(registry, config.clone())
        .size::<u16>()
        .checksum(BasicSum::<u16>::new())
        .sync::<u16>()
        .context("Failed to build demo stack")?
        .build();
    Ok(stack)
}

/// Parse `reading:<u16>`, `pair:<u8>,<u8>` or `text:<string>`
pub fn parse_message(input: &str) -> Result<Demo> {
    let (kind, args) = input
        .split_once(':')
        .with_context(|| format!("Expected <kind>:<args>, got {input:?}"))?;

    let message = match kind.to_ascii_lowercase().as_str() {
        "reading" => Reading {
            value: IntField::new(parse_int(args)?),
        }
        .into(),
        "pair" => {
            let (first, second) = args
                .split_once(',')
                .with_context(|| format!("pair needs two values, got {args:?}"))?;
            Pair {
                first: IntField::new(parse_int(first)?),
                second: IntField::new(parse_int(second)?),
            }
            .into()
        }
        "text" => Text {
            text: BytesField::new(args.as_bytes()),
        }
        .into(),
        other => bail!("Unknown message kind {other:?} (expected reading, pair or text)"),
    };
    Ok(message)
}

/// Decimal or `0x`-prefixed hexadecimal
fn parse_int<T>(text: &str) -> Result<T>
where
    T: TryFrom<u64>,
{
    let text = text.trim();
    let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse::<u64>(),
    }
    .with_context(|| format!("Invalid number {text:?}"))?;
    T::try_from(value).map_err(|_| anyhow::anyhow!("{value} out of range"))
}

/// One dispatched message, ready for printing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decoded {
    pub name: &'static str,
    pub id: u8,
    pub length: usize,
    pub fields: Value,
}

impl std::fmt::Display for Decoded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (id {:#04x}, {} bytes) {}", self.name, self.id, self.length, self.fields)
    }
}

/// Handler collecting every dispatched message
#[derive(Debug, Default)]
pub struct Collector {
    pub messages: Vec<Decoded>,
}

impl Collector {
    fn push(&mut self, msg: &dyn Message<Id = u8>, fields: Value) {
        self.messages.push(Decoded {
            name: msg.name(),
            id: msg.id(),
            length: msg.length(),
            fields,
        });
    }
}

impl DemoHandler for Collector {
    fn handle_message(&mut self, msg: &dyn Message<Id = u8>) {
        self.push(msg, Value::Null);
    }

    fn handle_reading(&mut self, msg: &Reading) {
        self.push(msg, json!({ "value": msg.value.get() }));
    }

    fn handle_pair(&mut self, msg: &Pair) {
        self.push(msg, json!({ "first": msg.first.get(), "second": msg.second.get() }));
    }

    fn handle_text(&mut self, msg: &Text) {
        let text = String::from_utf8_lossy(msg.text.as_bytes());
        self.push(msg, json!({ "text": text }));
    }
}
