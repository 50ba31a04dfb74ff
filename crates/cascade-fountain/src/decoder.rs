//! LT decoding — pure logic, no I/O.
//!
//! Two layers, mirroring the encoder side of the stream:
//!
//! - [`BlockDecoder`] collects the packets of a single block: it adopts the
//!   block's identity from the first packet, rejects duplicates, regrows the
//!   row cache to every sequence number it sees, and feeds edges to the
//!   incremental message-passing context on each arrival.
//! - [`Decoder`] sequences blocks: it keeps one current `BlockDecoder` plus
//!   a forward window of acceptable future block numbers (circular distance
//!   modulo 2^16), drops stale packets, and settles each block's accounting
//!   exactly once — when it fully decodes or when it is flushed past.
//!
//! Settled blocks land on an output FIFO in source order, with empty symbols
//! standing in for anything never recovered; the transport above pops them
//! with [`Decoder::next_decoded`].

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, trace};

use crate::buffer::Symbol;
use crate::counter::CircularCounter;
use crate::error::{ConfigError, DecodeError};
use crate::mp::MpContext;
use crate::params::LtParams;
use crate::rowgen::{Row, RowGenerator};
use crate::soliton::RobustSoliton;
use crate::stats::DecoderStats;
use crate::wire::CodedPacket;

/// How many blocks ahead of the current one a packet may claim before it is
/// classified as stale and dropped.
pub const BLOCK_WINDOW: u32 = 100;

// ─── Block Decoder ──────────────────────────────────────────────────────────

/// Identity a block adopts from its first packet.
#[derive(Debug, Clone, Copy)]
struct BlockIdentity {
    blockno: u16,
    seed: u32,
    symbol_size: usize,
}

/// Decoder for a single block's packets.
pub struct BlockDecoder {
    rowgen: RowGenerator,
    ctx: MpContext,
    identity: Option<BlockIdentity>,
    /// Sequence numbers already accepted.
    received: BTreeSet<u32>,
    /// Rows for sequence numbers `0..rows.len()`, grown monotonically; the
    /// generator is only ever stepped forward, never rewound.
    rows: Vec<Row>,
}

impl BlockDecoder {
    /// Block decoder with uniform row generation.
    ///
    /// # Errors
    ///
    /// `ConfigError` when the parameters are out of range.
    pub fn new(params: &LtParams) -> Result<Self, ConfigError> {
        params.validate()?;
        let dist = RobustSoliton::new(params.k, params.c, params.delta)?;
        Ok(Self::with_generator(RowGenerator::new(dist)))
    }

    /// Block decoder over an explicit row generator (e.g. a class-weighted
    /// one). The generator is re-seeded from each block's first packet.
    pub fn with_generator(rowgen: RowGenerator) -> Self {
        let k = rowgen.k();
        BlockDecoder {
            rowgen,
            ctx: MpContext::new(k),
            identity: None,
            received: BTreeSet::new(),
            rows: Vec::new(),
        }
    }

    /// Accept one packet. Returns `Ok(false)` for an exact duplicate
    /// (already-seen sequence number), which leaves all state untouched.
    ///
    /// # Errors
    ///
    /// `DecodeError` when the packet contradicts the block identity adopted
    /// from the first packet (block number, seed, or payload size), or
    /// carries an empty payload.
    pub fn push(&mut self, pkt: &CodedPacket) -> Result<bool, DecodeError> {
        if pkt.payload.is_empty() {
            return Err(DecodeError::EmptyPayload);
        }
        if pkt.sequence_number > crate::encoder::MAX_SEQNO {
            return Err(DecodeError::SequenceOutOfRange {
                max: crate::encoder::MAX_SEQNO,
                got: pkt.sequence_number,
            });
        }
        match self.identity {
            None => {
                self.identity = Some(BlockIdentity {
                    blockno: pkt.block_number,
                    seed: pkt.block_seed,
                    symbol_size: pkt.payload.len(),
                });
                self.rowgen.reset(pkt.block_seed);
            }
            Some(id) => {
                if id.blockno != pkt.block_number {
                    return Err(DecodeError::BlockMismatch {
                        expected: id.blockno,
                        got: pkt.block_number,
                    });
                }
                if id.seed != pkt.block_seed {
                    return Err(DecodeError::SeedMismatch {
                        blockno: id.blockno,
                        expected: id.seed,
                        got: pkt.block_seed,
                    });
                }
                if id.symbol_size != pkt.payload.len() {
                    return Err(DecodeError::SizeMismatch {
                        expected: id.symbol_size,
                        got: pkt.payload.len(),
                    });
                }
            }
        }

        let seqno = pkt.sequence_number;
        if !self.received.insert(seqno) {
            return Ok(false);
        }

        // Grow the row cache through any gap up to this sequence number;
        // rows must be drawn in order to stay aligned with the encoder.
        while self.rows.len() <= seqno as usize {
            let row = self.rowgen.next_row();
            self.rows.push(row);
        }

        let out = self.ctx.add_output(pkt.payload.clone());
        for &i in &self.rows[seqno as usize] {
            self.ctx.add_edge(i, out);
        }
        if !self.ctx.has_decoded() {
            self.ctx.run();
        }
        Ok(true)
    }

    /// True once all K source symbols are recovered.
    pub fn has_decoded(&self) -> bool {
        self.ctx.has_decoded()
    }

    /// Source symbols recovered so far.
    pub fn decoded_count(&self) -> usize {
        self.ctx.decoded_count()
    }

    /// Unique packets accepted.
    pub fn received_count(&self) -> usize {
        self.received.len()
    }

    /// Block size K.
    pub fn k(&self) -> usize {
        self.ctx.input_size()
    }

    /// Block number adopted from the first packet.
    pub fn blockno(&self) -> Option<u16> {
        self.identity.map(|id| id.blockno)
    }

    /// Seed adopted from the first packet.
    pub fn seed(&self) -> Option<u32> {
        self.identity.map(|id| id.seed)
    }

    /// All K source slots in order; unresolved slots are empty symbols.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.ctx.input_symbols()
    }

    /// Forget everything and await a new block's first packet.
    pub fn reset(&mut self) {
        self.ctx.clear();
        self.identity = None;
        self.received.clear();
        self.rows.clear();
    }
}

// ─── Windowed Decoder ───────────────────────────────────────────────────────

/// Windowed LT decoder: block sequencing, staleness/duplicate rejection, and
/// cumulative accounting over a stream of coded packets.
pub struct Decoder {
    block: BlockDecoder,
    /// Number of the block currently being collected.
    blockno: CircularCounter,
    /// Whether the current block's K symbols have already been enqueued and
    /// counted (set when it fully decodes; a flush then only advances).
    settled: bool,
    out_queue: VecDeque<Symbol>,
    stats: DecoderStats,
}

impl Decoder {
    /// Decoder starting at block 0 with an empty window.
    ///
    /// # Errors
    ///
    /// `ConfigError` when the parameters are out of range.
    pub fn new(params: &LtParams) -> Result<Self, ConfigError> {
        Ok(Self::from_block_decoder(BlockDecoder::new(params)?))
    }

    /// Decoder over an explicit block decoder (e.g. one with a weighted row
    /// generator).
    pub fn from_block_decoder(block: BlockDecoder) -> Self {
        Decoder {
            block,
            blockno: CircularCounter::blockno(),
            settled: false,
            out_queue: VecDeque::new(),
            stats: DecoderStats::default(),
        }
    }

    /// Accept one packet from the transport, in any delivery order.
    ///
    /// Packets for the current block feed decoding directly; a packet for a
    /// newer block (within [`BLOCK_WINDOW`]) flushes the current block and
    /// any skipped ones; packets outside the window — including everything
    /// that reads as "behind" after wraparound — are counted and dropped
    /// silently, as are exact duplicates.
    ///
    /// # Errors
    ///
    /// `DecodeError` only for protocol violations: a packet that claims the
    /// current block with a different seed or payload size, or an empty
    /// payload.
    pub fn push(&mut self, pkt: &CodedPacket) -> Result<(), DecodeError> {
        if pkt.payload.is_empty() {
            return Err(DecodeError::EmptyPayload);
        }

        if pkt.block_number as u32 != self.blockno.value() {
            let distance = self.blockno.forward_distance(pkt.block_number as u32);
            if distance > BLOCK_WINDOW {
                self.stats.stale_dropped += 1;
                trace!(
                    blockno = pkt.block_number,
                    current = self.blockno.value(),
                    "dropping packet for a stale block"
                );
                return Ok(());
            }
            debug!(
                from = self.blockno.value(),
                to = pkt.block_number,
                skipped = distance - 1,
                "advancing to a newer block"
            );
            self.advance(distance);
        }

        let was_decoded = self.block.has_decoded();
        if self.block.push(pkt)? {
            self.stats.total_received_count += 1;
            if !was_decoded && self.block.has_decoded() {
                self.settle_decoded();
            }
        } else {
            self.stats.duplicate_dropped += 1;
            trace!(
                seqno = pkt.sequence_number,
                blockno = pkt.block_number,
                "dropping duplicate packet"
            );
        }
        Ok(())
    }

    /// Give up on the current block: its recovered symbols count as decoded,
    /// the rest as failed, and all K slots go to the output queue (empties
    /// for the unresolved). The decoder then waits for the next block.
    pub fn flush(&mut self) {
        self.flush_current();
    }

    /// Flush forward until the current block number equals `target`,
    /// counting every skipped block as entirely failed. A `target` equal to
    /// the current block is a no-op; a target that reads as "behind" wraps
    /// the full 2^16 block space.
    pub fn flush_to(&mut self, target: u16) {
        let distance = self.blockno.forward_distance(target as u32);
        if distance == 0 {
            return;
        }
        self.advance(distance);
    }

    /// Flush the current block and `n - 1` further whole blocks.
    pub fn flush_n_blocks(&mut self, n: usize) {
        for _ in 0..n {
            self.flush_current();
        }
    }

    /// Pop the oldest queued output symbol; empty symbols mark source
    /// symbols that were never recovered.
    pub fn next_decoded(&mut self) -> Option<Symbol> {
        self.out_queue.pop_front()
    }

    /// Queued output symbols.
    pub fn queue_size(&self) -> usize {
        self.out_queue.len()
    }

    /// True while decoded output remains to be popped.
    pub fn has_queued_packets(&self) -> bool {
        !self.out_queue.is_empty()
    }

    /// True when the current block has fully decoded.
    pub fn has_decoded(&self) -> bool {
        self.block.has_decoded()
    }

    /// Symbols recovered in the current block.
    pub fn decoded_count(&self) -> usize {
        self.block.decoded_count()
    }

    /// Unique packets accepted for the current block.
    pub fn received_count(&self) -> usize {
        self.block.received_count()
    }

    /// Number of the block currently being collected.
    pub fn blockno(&self) -> u16 {
        self.blockno.value() as u16
    }

    /// Seed of the current block, once its first packet has arrived.
    pub fn block_seed(&self) -> Option<u32> {
        self.block.seed()
    }

    /// Block size K.
    pub fn k(&self) -> usize {
        self.block.k()
    }

    /// The current block's K source slots; unresolved slots are empty.
    pub fn decoded_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.block.symbols()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    /// Unique packets accepted across all blocks.
    pub fn total_received_count(&self) -> u64 {
        self.stats.total_received_count
    }

    /// Source symbols recovered and enqueued, across all settled blocks.
    pub fn total_decoded_count(&self) -> u64 {
        self.stats.total_decoded_count
    }

    /// Source symbols given up on, across all settled blocks.
    pub fn total_failed_count(&self) -> u64 {
        self.stats.total_failed_count
    }

    /// Move forward `distance` blocks: flush the current one, then fail
    /// `distance - 1` whole blocks.
    fn advance(&mut self, distance: u32) {
        self.flush_current();
        for _ in 1..distance {
            self.fail_whole_block();
        }
    }

    /// A fully decoded block is enqueued and counted the moment it decodes.
    fn settle_decoded(&mut self) {
        let enqueued: Vec<Symbol> = self.block.symbols().cloned().collect();
        self.out_queue.extend(enqueued);
        self.stats.total_decoded_count += self.k() as u64;
        self.stats.blocks_decoded += 1;
        self.stats.blocks_advanced += 1;
        self.settled = true;
        debug!(
            blockno = self.blockno.value(),
            received = self.block.received_count(),
            "block fully decoded"
        );
    }

    fn flush_current(&mut self) {
        if !self.settled {
            let decoded = self.block.decoded_count() as u64;
            let enqueued: Vec<Symbol> = self.block.symbols().cloned().collect();
            self.out_queue.extend(enqueued);
            self.stats.total_decoded_count += decoded;
            self.stats.total_failed_count += self.k() as u64 - decoded;
            self.stats.blocks_advanced += 1;
            debug!(
                blockno = self.blockno.value(),
                decoded,
                k = self.k(),
                "flushing an incomplete block"
            );
        }
        self.blockno.next();
        self.block.reset();
        self.settled = false;
    }

    /// Account a block that no packet will ever be collected for.
    fn fail_whole_block(&mut self) {
        let k = self.k();
        self.out_queue
            .extend(std::iter::repeat_with(Symbol::empty).take(k));
        self.stats.total_failed_count += k as u64;
        self.stats.blocks_advanced += 1;
        self.blockno.next();
    }
}
