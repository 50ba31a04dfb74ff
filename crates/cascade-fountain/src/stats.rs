//! Coder statistics.
//!
//! Counter snapshots kept inside the encoder/decoder state machines and
//! exposed by reference, designed for JSON export.

use serde::Serialize;

// ─── Encoder Stats ──────────────────────────────────────────────────────────

/// Encoder-side counters.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EncoderStats {
    /// Coded packets produced for the current block.
    pub coded_count: u64,
    /// Coded packets produced over the encoder's lifetime.
    pub total_coded_count: u64,
    /// Blocks discarded via `next_block`/targeted skips.
    pub blocks_completed: u64,
}

// ─── Decoder Stats ──────────────────────────────────────────────────────────

/// Decoder-side counters.
///
/// `total_decoded_count + total_failed_count` grows by exactly K each time a
/// block settles (fully decodes or is flushed past), regardless of how many
/// symbols were individually resolved.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DecoderStats {
    /// Unique packets accepted across all blocks.
    pub total_received_count: u64,
    /// Source symbols recovered and passed to the output queue.
    pub total_decoded_count: u64,
    /// Source symbols given up on at block boundaries.
    pub total_failed_count: u64,
    /// Exact duplicates dropped (same block, same sequence number).
    pub duplicate_dropped: u64,
    /// Packets dropped for blocks outside the forward window.
    pub stale_dropped: u64,
    /// Blocks that decoded completely.
    pub blocks_decoded: u64,
    /// Blocks settled (decoded or flushed), i.e. accounted into the totals.
    pub blocks_advanced: u64,
}

impl DecoderStats {
    /// Fraction of settled symbols that were never recovered.
    pub fn failure_rate(&self) -> f64 {
        let settled = self.total_decoded_count + self.total_failed_count;
        if settled == 0 {
            0.0
        } else {
            self.total_failed_count as f64 / settled as f64
        }
    }
}

// ─── UEP Decoder Stats ──────────────────────────────────────────────────────

/// UEP-layer counters, in original (unexpanded) symbols.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UepDecoderStats {
    /// Padding symbols discarded from the most recently demuxed block.
    pub padding_count: u64,
    /// Padding symbols discarded over the decoder's lifetime.
    pub total_padding_count: u64,
    /// Real symbols recovered, per priority class.
    pub decoded_per_class: Vec<u64>,
    /// Symbol slots never recovered, per priority class.
    pub failed_per_class: Vec<u64>,
}

impl UepDecoderStats {
    /// Zeroed counters for `classes` priority classes.
    pub fn new(classes: usize) -> Self {
        UepDecoderStats {
            padding_count: 0,
            total_padding_count: 0,
            decoded_per_class: vec![0; classes],
            failed_per_class: vec![0; classes],
        }
    }

    /// Real symbols recovered across all classes.
    pub fn total_decoded_count(&self) -> u64 {
        self.decoded_per_class.iter().sum()
    }

    /// Symbol slots never recovered, across all classes.
    pub fn total_failed_count(&self) -> u64 {
        self.failed_per_class.iter().sum()
    }

    /// Residual error rate for one priority class.
    pub fn class_error_rate(&self, class: usize) -> f64 {
        let dec = self.decoded_per_class[class];
        let fail = self.failed_per_class[class];
        if dec + fail == 0 {
            0.0
        } else {
            fail as f64 / (dec + fail) as f64
        }
    }
}
