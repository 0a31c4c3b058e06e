//! # Strata Inspect - Frame Decoder and Encoder
//!
//! Feeds raw bytes through the demo protocol stack and reports every
//! dispatched message, or encodes messages described on the command line.
//! Stack values (sync marker, frame limit, allocation, resync) come from
//! [`StackConfig`].

pub mod demo;

use anyhow::{Context, Result};
use demo::{build_stack, Collector, Decoded, Demo};
use serde::Serialize;
use strata_codec::{FrameProcessor, ProcessorStats, StackConfig};
use tracing::info;

/// Outcome of decoding one input
#[derive(Debug, Serialize)]
pub struct Report {
    pub messages: Vec<Decoded>,
    pub stats: ProcessorStats,
    /// Trailing bytes of an incomplete frame
    pub pending: String,
}

/// Decode `input`, delivering it `chunk` bytes at a time when given
pub fn decode(input: &[u8], config: &StackConfig, chunk: Option<usize>) -> Result<Report> {
    let mut processor = FrameProcessor::with_config(build_stack(config)?, config);
    let mut collector = Collector::default();

    let chunk = chunk.unwrap_or(input.len()).max(1);
    for piece in input.chunks(chunk) {
        processor
            .feed_and_process(piece, &mut collector)
            .context("Frame processing stopped")?;
    }

    let stats = processor.stats().clone();
    info!(
        frames = stats.frames,
        dropped = stats.bytes_dropped,
        pending = processor.pending().len(),
        "Decoding finished"
    );

    Ok(Report {
        messages: collector.messages,
        stats,
        pending: hex::encode(processor.pending()),
    })
}

/// Encode each message into its own frame
pub fn encode(messages: &[Demo], config: &StackConfig) -> Result<Vec<Vec<u8>>> {
    let stack = build_stack(config)?;
    messages
        .iter()
        .map(|msg| {
            stack
                .encode_to_vec(msg)
                .with_context(|| format!("Failed to encode {msg:?}"))
        })
        .collect()
}

/// Parse hex text, ignoring whitespace and an optional `0x` prefix
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let cleaned: String = text.split_whitespace().collect();
    let cleaned = cleaned.strip_prefix("0x").unwrap_or(&cleaned);
    hex::decode(cleaned).context("Input is not valid hex")
}
