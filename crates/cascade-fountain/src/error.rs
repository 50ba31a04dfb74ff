//! Error types for the coding core.
//!
//! Construction-time and caller-contract violations surface synchronously as
//! typed errors. Run-time network anomalies — loss, duplication, reordering,
//! staleness — are absorbed by the decoder and counted, never returned as
//! errors.

use thiserror::Error;

/// Parameter validation errors. Fatal, surfaced at construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Block size K must be at least 1.
    #[error("block size must be positive")]
    ZeroBlockSize,

    /// Robust-soliton spread parameter out of range.
    #[error("spread parameter c must be positive, got {c}")]
    InvalidSpread {
        /// The rejected value.
        c: f64,
    },

    /// Robust-soliton failure bound out of range.
    #[error("failure bound delta must be in (0, 1], got {delta}")]
    InvalidFailureBound {
        /// The rejected value.
        delta: f64,
    },

    /// Per-class size and repetition-factor lists have different lengths.
    #[error("Ks/RFs length mismatch: {ks} sizes vs {rfs} repetition factors")]
    ClassCountMismatch {
        /// Number of sub-block sizes.
        ks: usize,
        /// Number of repetition factors.
        rfs: usize,
    },

    /// No priority classes configured.
    #[error("at least one priority class is required")]
    NoClasses,

    /// A repetition factor must be at least 1.
    #[error("repetition factor for class {class} must be positive")]
    ZeroRepetition {
        /// Offending class index.
        class: usize,
    },

    /// The expansion factor must be at least 1.
    #[error("expansion factor must be positive")]
    ZeroExpansion,

    /// Weighted row generation: class spans do not cover the block.
    #[error("class spans cover {total} symbols, block size is {k}")]
    ClassSpanMismatch {
        /// Configured block size.
        k: usize,
        /// Sum of the class span lengths.
        total: usize,
    },

    /// Weighted row generation: a class weight must be positive and finite.
    #[error("class weight must be positive and finite, got {weight}")]
    InvalidClassWeight {
        /// The rejected weight.
        weight: f64,
    },
}

/// Encoder-side caller errors. The encoder's state is unchanged when one of
/// these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// `next_coded` was called without a full claimed block.
    #[error("no full input block is available")]
    NoBlock,

    /// The per-block coded sequence space is exhausted.
    #[error("sequence number overflow: block already produced {max} coded packets")]
    SequenceOverflow {
        /// Highest representable sequence number.
        max: u32,
    },

    /// `next_block` was called with nothing to discard.
    #[error("no current block to discard")]
    NoCurrentBlock,

    /// A targeted block skip must land strictly ahead of the current block.
    #[error("target block {target} is not strictly ahead of current block {current}")]
    NotAhead {
        /// Current block number.
        current: u16,
        /// Requested target block number.
        target: u16,
    },

    /// Not enough queued symbols to skip over the requested blocks.
    #[error("insufficient queued symbols to skip: need {needed}, have {queued}")]
    InsufficientQueued {
        /// Symbols that would be dropped by the skip.
        needed: usize,
        /// Symbols currently queued.
        queued: usize,
    },

    /// Source symbols within a stream must share one size.
    #[error("symbol size mismatch: expected {expected} bytes, got {got}")]
    SymbolSizeMismatch {
        /// Size fixed by the first pushed symbol.
        expected: usize,
        /// Size of the rejected symbol.
        got: usize,
    },

    /// Empty symbols cannot be encoded.
    #[error("cannot encode an empty symbol")]
    EmptySymbol,

    /// UEP push with a priority level outside the configured classes.
    #[error("priority {priority} out of range: {classes} classes configured")]
    PriorityOutOfRange {
        /// Requested priority level.
        priority: u8,
        /// Number of configured classes.
        classes: usize,
    },
}

/// Decoder-side protocol violations. Unlike stale or duplicate packets, these
/// indicate an inconsistent peer and are surfaced to the caller; the
/// offending packet is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A packet for a different block reached a single-block decoder.
    #[error("packet for block {got} pushed into a decoder for block {expected}")]
    BlockMismatch {
        /// Block the decoder is collecting.
        expected: u16,
        /// Block the packet belongs to.
        got: u16,
    },

    /// A packet claimed the current block number with a different seed.
    #[error("seed mismatch for block {blockno}: expected {expected:#010x}, got {got:#010x}")]
    SeedMismatch {
        /// Block number both packets claim.
        blockno: u16,
        /// Seed adopted from the block's first packet.
        expected: u32,
        /// Seed carried by the rejected packet.
        got: u32,
    },

    /// A packet for the current block carried a different payload size.
    #[error("payload size mismatch: expected {expected} bytes, got {got}")]
    SizeMismatch {
        /// Size adopted from the block's first packet.
        expected: usize,
        /// Size of the rejected packet.
        got: usize,
    },

    /// Coded packets never carry an empty payload.
    #[error("coded packet with empty payload")]
    EmptyPayload,

    /// Sequence number beyond the space any encoder can emit; accepting it
    /// would let a corrupt packet force unbounded row-cache growth.
    #[error("sequence number {got} exceeds the coded sequence space ({max})")]
    SequenceOutOfRange {
        /// Highest sequence number an encoder assigns.
        max: u32,
        /// Sequence number carried by the rejected packet.
        got: u32,
    },
}
