//! Block-level LT encoder.
//!
//! Source symbols queue up until K of them can be claimed as a block; the
//! encoder then produces an unbounded stream of coded packets for that block
//! — each one the XOR of the input symbols named by the next row — until the
//! caller moves on with [`Encoder::next_block`] or a targeted skip.
//!
//! Every block gets a fresh 32-bit seed; the seed travels in each coded
//! packet so the receiver can replay the identical row sequence.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::buffer::{Symbol, SymbolAccum};
use crate::counter::CircularCounter;
use crate::error::{ConfigError, EncodeError};
use crate::params::LtParams;
use crate::rowgen::RowGenerator;
use crate::soliton::RobustSoliton;
use crate::stats::EncoderStats;
use crate::wire::CodedPacket;

/// Highest sequence number a block may assign; the per-block coded sequence
/// space is 16 bits wide.
pub const MAX_SEQNO: u32 = u16::MAX as u32;

/// LT encoder over fixed-size source symbols.
pub struct Encoder {
    rowgen: RowGenerator,
    input_queue: VecDeque<Symbol>,
    /// The claimed block; empty or exactly K symbols.
    block: Vec<Symbol>,
    blockno: CircularCounter,
    /// Sequence number the next coded packet will carry.
    next_seqno: u32,
    seed: u32,
    seed_rng: StdRng,
    /// Fixed by the first pushed symbol.
    symbol_size: Option<usize>,
    stats: EncoderStats,
}

impl Encoder {
    /// Encoder with OS-seeded block seeds.
    ///
    /// # Errors
    ///
    /// `ConfigError` when the parameters are out of range.
    pub fn new(params: &LtParams) -> Result<Self, ConfigError> {
        Self::with_rng(params, StdRng::from_os_rng())
    }

    /// Encoder with a deterministic block-seed source, for reproducible
    /// streams in tests and simulations.
    ///
    /// # Errors
    ///
    /// `ConfigError` when the parameters are out of range.
    pub fn with_seed_rng(params: &LtParams, rng_seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(params, StdRng::seed_from_u64(rng_seed))
    }

    /// Encoder over an explicit row generator (e.g. a class-weighted one),
    /// with OS-seeded block seeds. The receiving decoder must be built over
    /// an identically configured generator.
    pub fn from_generator(rowgen: RowGenerator) -> Self {
        Self::assemble(rowgen, StdRng::from_os_rng())
    }

    /// As [`Encoder::from_generator`], with deterministic block seeds.
    pub fn from_generator_seeded(rowgen: RowGenerator, rng_seed: u64) -> Self {
        Self::assemble(rowgen, StdRng::seed_from_u64(rng_seed))
    }

    fn with_rng(params: &LtParams, seed_rng: StdRng) -> Result<Self, ConfigError> {
        params.validate()?;
        let dist = RobustSoliton::new(params.k, params.c, params.delta)?;
        Ok(Self::assemble(RowGenerator::new(dist), seed_rng))
    }

    fn assemble(mut rowgen: RowGenerator, mut seed_rng: StdRng) -> Self {
        let seed: u32 = seed_rng.random();
        rowgen.reset(seed);
        let k = rowgen.k();
        Encoder {
            rowgen,
            input_queue: VecDeque::new(),
            block: Vec::with_capacity(k),
            blockno: CircularCounter::blockno(),
            next_seqno: 0,
            seed,
            seed_rng,
            symbol_size: None,
            stats: EncoderStats::default(),
        }
    }

    /// Enqueue a source symbol. Claims a block automatically once K symbols
    /// are queued and no block is current.
    ///
    /// # Errors
    ///
    /// `EncodeError::EmptySymbol` or `EncodeError::SymbolSizeMismatch` —
    /// symbols of one stream share a fixed non-zero size.
    pub fn push(&mut self, symbol: Symbol) -> Result<(), EncodeError> {
        if symbol.is_empty() {
            return Err(EncodeError::EmptySymbol);
        }
        match self.symbol_size {
            None => self.symbol_size = Some(symbol.len()),
            Some(size) if size != symbol.len() => {
                return Err(EncodeError::SymbolSizeMismatch {
                    expected: size,
                    got: symbol.len(),
                });
            }
            Some(_) => {}
        }
        self.input_queue.push_back(symbol);
        self.check_has_block();
        Ok(())
    }

    /// Produce the next coded packet for the current block.
    ///
    /// # Errors
    ///
    /// `EncodeError::NoBlock` without a claimed block;
    /// `EncodeError::SequenceOverflow` when the block's 16-bit sequence
    /// space is exhausted.
    pub fn next_coded(&mut self) -> Result<CodedPacket, EncodeError> {
        if !self.has_block() {
            return Err(EncodeError::NoBlock);
        }
        if self.next_seqno > MAX_SEQNO {
            return Err(EncodeError::SequenceOverflow { max: MAX_SEQNO });
        }

        let row = self.rowgen.next_row();
        let mut acc = SymbolAccum::from_symbol(&self.block[row[0]]);
        for &i in &row[1..] {
            acc.xor_with(&self.block[i]);
        }

        let packet = CodedPacket {
            block_number: self.blockno.value() as u16,
            block_seed: self.seed,
            sequence_number: self.next_seqno,
            priority: 0,
            uep: false,
            payload: acc.into_symbol(),
        };
        self.next_seqno += 1;
        self.stats.coded_count += 1;
        self.stats.total_coded_count += 1;
        Ok(packet)
    }

    /// Discard the current block and move to the next one: fresh seed,
    /// sequence numbers restarted, block number wrapping modulo 2^16.
    ///
    /// # Errors
    ///
    /// `EncodeError::NoCurrentBlock` when no block is claimed.
    pub fn next_block(&mut self) -> Result<(), EncodeError> {
        if !self.has_block() {
            return Err(EncodeError::NoCurrentBlock);
        }
        let mut target = self.blockno;
        target.next();
        self.jump_to(target.value() as u16);
        self.check_has_block();
        Ok(())
    }

    /// Skip forward to `target`, dropping the current block and
    /// `distance - 1` whole blocks of queued symbols.
    ///
    /// # Errors
    ///
    /// `EncodeError::NotAhead` unless `target` is strictly ahead of the
    /// current block within the comparison window;
    /// `EncodeError::InsufficientQueued` when the queue cannot cover the
    /// skipped blocks.
    pub fn next_block_to(&mut self, target: u16) -> Result<(), EncodeError> {
        if !self.blockno.is_strictly_ahead(target as u32) {
            return Err(EncodeError::NotAhead {
                current: self.blockno.value() as u16,
                target,
            });
        }
        let distance = self.blockno.forward_distance(target as u32) as usize;
        let needed = (distance - 1) * self.k();
        if self.input_queue.len() < needed {
            return Err(EncodeError::InsufficientQueued {
                needed,
                queued: self.input_queue.len(),
            });
        }
        self.input_queue.drain(..needed);
        self.jump_to(target);
        self.check_has_block();
        Ok(())
    }

    /// True when a full block is claimed and coded packets can be produced.
    pub fn has_block(&self) -> bool {
        self.block.len() == self.k()
    }

    /// Block size K.
    pub fn k(&self) -> usize {
        self.rowgen.k()
    }

    /// Current block number.
    pub fn blockno(&self) -> u16 {
        self.blockno.value() as u16
    }

    /// Sequence number of the most recent coded packet of the current block;
    /// 0 before any has been produced.
    pub fn seqno(&self) -> u32 {
        self.next_seqno.saturating_sub(1)
    }

    /// Seed of the current block.
    pub fn block_seed(&self) -> u32 {
        self.seed
    }

    /// Queued symbols not yet claimed into a block.
    pub fn queue_size(&self) -> usize {
        self.input_queue.len()
    }

    /// Total symbols held: queued plus the claimed block.
    pub fn size(&self) -> usize {
        self.input_queue.len() + self.block.len()
    }

    /// The claimed block, in push order. Empty when `!has_block()`.
    pub fn current_block(&self) -> &[Symbol] {
        &self.block
    }

    /// Counter snapshot.
    pub fn stats(&self) -> &EncoderStats {
        &self.stats
    }

    /// Discard any claimed block and restart at `target` with a fresh seed.
    /// Queue handling is the caller's business.
    pub(crate) fn jump_to(&mut self, target: u16) {
        if !self.block.is_empty() {
            self.stats.blocks_completed += 1;
        }
        self.block.clear();
        self.blockno.set(target as u32);
        self.seed = self.seed_rng.random();
        self.rowgen.reset(self.seed);
        self.next_seqno = 0;
        self.stats.coded_count = 0;
        debug!(
            blockno = self.blockno.value(),
            seed = self.seed,
            "encoder moved to next block"
        );
    }

    /// Claim K queued symbols as the current block if possible.
    fn check_has_block(&mut self) {
        if self.block.is_empty() && self.input_queue.len() >= self.k() {
            let k = self.k();
            self.block.extend(self.input_queue.drain(..k));
            debug!(blockno = self.blockno.value(), "claimed a full input block");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_symbol(len: usize, tag: u8) -> Symbol {
        Symbol::from((0..len).map(|i| (i as u8).wrapping_mul(31) ^ tag).collect::<Vec<u8>>())
    }

    fn encoder(k: usize) -> Encoder {
        Encoder::with_seed_rng(&LtParams::new(k, 0.1, 0.5), 7).unwrap()
    }

    #[test]
    fn claims_block_at_k_symbols() {
        let mut enc = encoder(10);
        for i in 0..9 {
            enc.push(random_symbol(8, i)).unwrap();
        }
        assert!(!enc.has_block());
        assert!(matches!(enc.next_coded(), Err(EncodeError::NoBlock)));

        enc.push(random_symbol(8, 9)).unwrap();
        assert!(enc.has_block());
        assert_eq!(enc.queue_size(), 0);
        assert_eq!(enc.size(), 10);
    }

    #[test]
    fn coded_packets_are_stamped() {
        let mut enc = encoder(10);
        for i in 0..30 {
            enc.push(random_symbol(8, i)).unwrap();
        }
        assert_eq!(enc.size(), 30);
        assert_eq!(enc.queue_size(), 20);
        assert_eq!(enc.blockno(), 0);

        for seq in 0..20u32 {
            let pkt = enc.next_coded().unwrap();
            assert_eq!(pkt.payload.len(), 8);
            assert_eq!(pkt.sequence_number, seq);
            assert_eq!(pkt.block_number, 0);
            assert_eq!(pkt.block_seed, enc.block_seed());
        }
        assert_eq!(enc.seqno(), 19);

        enc.next_block().unwrap();
        assert_eq!(enc.blockno(), 1);
        let pkt = enc.next_coded().unwrap();
        assert_eq!(enc.seqno(), 0);
        assert_eq!(pkt.sequence_number, 0);
        assert_eq!(pkt.block_number, 1);
    }

    #[test]
    fn next_block_draws_fresh_seed() {
        let mut enc = encoder(4);
        for i in 0..8 {
            enc.push(random_symbol(4, i)).unwrap();
        }
        let first_seed = enc.block_seed();
        enc.next_block().unwrap();
        assert_ne!(enc.block_seed(), first_seed);
    }

    #[test]
    fn rejects_mismatched_symbols() {
        let mut enc = encoder(4);
        enc.push(random_symbol(8, 0)).unwrap();
        assert!(matches!(
            enc.push(random_symbol(9, 1)),
            Err(EncodeError::SymbolSizeMismatch {
                expected: 8,
                got: 9
            })
        ));
        assert!(matches!(
            enc.push(Symbol::empty()),
            Err(EncodeError::EmptySymbol)
        ));
    }

    #[test]
    fn targeted_skip_semantics() {
        let k = 10;
        let mut enc = encoder(k);
        for b in 0..30 {
            for i in 0..k {
                enc.push(random_symbol(4, (b * k + i) as u8)).unwrap();
            }
        }
        assert_eq!(enc.size(), 30 * k);

        // Not strictly ahead: current and far-wrapped targets.
        assert!(matches!(
            enc.next_block_to(0),
            Err(EncodeError::NotAhead { .. })
        ));
        assert!(matches!(
            enc.next_block_to(0xFF00),
            Err(EncodeError::NotAhead { .. })
        ));
        assert_eq!(enc.size(), 30 * k);

        enc.next_block_to(1).unwrap();
        assert_eq!(enc.blockno(), 1);
        assert_eq!(enc.size(), 29 * k);

        enc.next_block_to(20).unwrap();
        assert_eq!(enc.blockno(), 20);
        assert_eq!(enc.size(), 10 * k);

        enc.next_block_to(29).unwrap();
        assert_eq!(enc.blockno(), 29);
        assert_eq!(enc.size(), k);

        enc.next_block().unwrap();
        assert_eq!(enc.size(), 0);
        assert!(matches!(
            enc.next_block(),
            Err(EncodeError::NoCurrentBlock)
        ));
        assert!(matches!(
            enc.next_block_to(100),
            Err(EncodeError::InsufficientQueued { .. })
        ));
    }

    #[test]
    fn blockno_wraps_at_modulus() {
        let mut enc = encoder(2);
        for b in 0..0xFFFFu32 {
            enc.push(random_symbol(4, b as u8)).unwrap();
            enc.push(random_symbol(4, (b >> 8) as u8)).unwrap();
            enc.next_block().unwrap();
        }
        assert_eq!(enc.blockno(), 0xFFFF);

        enc.push(random_symbol(4, 1)).unwrap();
        enc.push(random_symbol(4, 2)).unwrap();
        enc.next_block().unwrap();
        assert_eq!(enc.blockno(), 0);
    }

    #[test]
    fn sequence_overflow_is_detected() {
        let mut enc = encoder(2);
        enc.push(random_symbol(2, 1)).unwrap();
        enc.push(random_symbol(2, 2)).unwrap();
        for _ in 0..=MAX_SEQNO {
            enc.next_coded().unwrap();
        }
        assert!(matches!(
            enc.next_coded(),
            Err(EncodeError::SequenceOverflow { .. })
        ));
    }

    #[test]
    fn stats_track_coded_packets() {
        let mut enc = encoder(2);
        for i in 0..4 {
            enc.push(random_symbol(4, i)).unwrap();
        }
        enc.next_coded().unwrap();
        enc.next_coded().unwrap();
        assert_eq!(enc.stats().coded_count, 2);
        assert_eq!(enc.stats().total_coded_count, 2);

        enc.next_block().unwrap();
        enc.next_coded().unwrap();
        assert_eq!(enc.stats().coded_count, 1);
        assert_eq!(enc.stats().total_coded_count, 3);
        assert_eq!(enc.stats().blocks_completed, 1);
    }
}
