//! Unequal error protection over the plain LT coder.
//!
//! Priority classes get different effective redundancy by *block expansion*:
//! each class's K_i-symbol sub-block is repeated RF_i times, the classes are
//! concatenated in priority order, and the whole sequence is replicated EF
//! times. The expanded block — all shallow buffer copies — feeds the inner
//! LT encoder as one opaque block of K_out = EF·Σ(K_i·RF_i) symbols, so a
//! class with a higher repetition factor simply owns more of the expanded
//! block and survives more loss.
//!
//! On the receive side the inner decoder recovers expanded blocks; a static
//! position map folds the replicas back onto original (priority, offset)
//! slots, the first recovered replica of each slot wins, padding is counted
//! and discarded, and real symbols are queued per priority in their original
//! global order.
//!
//! Each source symbol is framed with a 4-byte big-endian word before
//! expansion — bit 31 flags padding, bits 0..=30 carry a circular per-source
//! sequence number — which is what lets the decoder tell padding from data
//! and restore ordering without any side channel.

use std::collections::VecDeque;

use bytes::{Buf, BufMut, BytesMut};
use tracing::debug;

use crate::buffer::Symbol;
use crate::counter::CircularCounter;
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::{ConfigError, DecodeError, EncodeError};
use crate::params::UepParams;
use crate::stats::UepDecoderStats;
use crate::wire::CodedPacket;

/// Modulus of the per-source circular sequence space (31 bits; bit 31 is
/// the padding flag).
pub const UEP_SEQNO_MODULUS: u32 = 1 << 31;

/// Framing prefix length.
const FRAME_HEADER: usize = 4;

const PADDING_FLAG: u32 = 1 << 31;

// ─── In-band Framing ────────────────────────────────────────────────────────

/// Prefix a payload with its framing word.
fn frame_symbol(seqno: u32, padding: bool, payload: &[u8]) -> Symbol {
    debug_assert!(seqno < UEP_SEQNO_MODULUS);
    let mut buf = BytesMut::with_capacity(FRAME_HEADER + payload.len());
    let word = if padding { seqno | PADDING_FLAG } else { seqno };
    buf.put_u32(word);
    buf.extend_from_slice(payload);
    Symbol::from(buf.freeze())
}

/// Split a recovered symbol into `(seqno, padding, payload)`. `None` when
/// the symbol is too short to carry the framing word.
fn unframe_symbol(sym: &Symbol) -> Option<(u32, bool, Symbol)> {
    if sym.len() < FRAME_HEADER {
        return None;
    }
    let mut head = sym.as_slice();
    let word = head.get_u32();
    Some((
        word & !PADDING_FLAG,
        word & PADDING_FLAG != 0,
        sym.slice(FRAME_HEADER..),
    ))
}

// ─── Position Map ───────────────────────────────────────────────────────────

/// Static mapping between expanded-block positions and original
/// `(priority, offset)` slots. Total and onto: every original slot is
/// covered exactly `RF_i · EF` times.
#[derive(Debug, Clone)]
pub struct PositionMap {
    ks: Vec<usize>,
    rfs: Vec<usize>,
    ef: usize,
    /// Start of each class's span within one base repetition.
    class_starts: Vec<usize>,
    /// Σ(K_i · RF_i): length of one base repetition.
    base: usize,
    /// `table[p]` for `p` within one base repetition.
    table: Vec<(u8, usize)>,
}

impl PositionMap {
    /// Build the map for a validated parameter set.
    pub fn new(params: &UepParams) -> Self {
        let mut class_starts = Vec::with_capacity(params.ks.len());
        let mut table = Vec::new();
        for (class, (&k, &rf)) in params.ks.iter().zip(&params.rfs).enumerate() {
            class_starts.push(table.len());
            for _ in 0..rf {
                for offset in 0..k {
                    table.push((class as u8, offset));
                }
            }
        }
        PositionMap {
            ks: params.ks.clone(),
            rfs: params.rfs.clone(),
            ef: params.ef,
            class_starts,
            base: table.len(),
            table,
        }
    }

    /// Expanded block size K_out.
    pub fn k_out(&self) -> usize {
        self.base * self.ef
    }

    /// Original slot for an expanded-block position.
    pub fn map(&self, expanded: usize) -> (u8, usize) {
        debug_assert!(expanded < self.k_out());
        self.table[expanded % self.base]
    }

    /// All `RF_i · EF` expanded positions holding replicas of one original
    /// slot.
    pub fn replicas(&self, class: usize, offset: usize) -> impl Iterator<Item = usize> + '_ {
        let start = self.class_starts[class];
        let k = self.ks[class];
        let rf = self.rfs[class];
        let base = self.base;
        (0..self.ef).flat_map(move |e| (0..rf).map(move |r| e * base + start + r * k + offset))
    }
}

// ─── UEP Encoder ────────────────────────────────────────────────────────────

/// UEP encoder: per-priority input queues feeding an inner LT encoder with
/// expanded blocks.
pub struct UepEncoder {
    params: UepParams,
    /// Framed symbols awaiting block assembly, one queue per class.
    queues: Vec<VecDeque<Symbol>>,
    seqno_ctr: CircularCounter,
    inner: Encoder,
    /// Raw payload size, fixed by the first pushed symbol.
    symbol_size: Option<usize>,
    padding_count: u64,
    total_padding_count: u64,
}

impl UepEncoder {
    /// Encoder with OS-seeded block seeds.
    ///
    /// # Errors
    ///
    /// `ConfigError` when the parameter set is invalid.
    pub fn new(params: &UepParams) -> Result<Self, ConfigError> {
        params.validate()?;
        let inner = Encoder::new(&params.lt_params())?;
        Ok(Self::assemble(params.clone(), inner))
    }

    /// Encoder with deterministic block seeds, for reproducible streams.
    ///
    /// # Errors
    ///
    /// `ConfigError` when the parameter set is invalid.
    pub fn with_seed_rng(params: &UepParams, rng_seed: u64) -> Result<Self, ConfigError> {
        params.validate()?;
        let inner = Encoder::with_seed_rng(&params.lt_params(), rng_seed)?;
        Ok(Self::assemble(params.clone(), inner))
    }

    fn assemble(params: UepParams, inner: Encoder) -> Self {
        let queues = params.ks.iter().map(|_| VecDeque::new()).collect();
        UepEncoder {
            params,
            queues,
            seqno_ctr: CircularCounter::new(UEP_SEQNO_MODULUS),
            inner,
            symbol_size: None,
            padding_count: 0,
            total_padding_count: 0,
        }
    }

    /// Enqueue a source symbol under its priority class. A full expanded
    /// block forms automatically once every class holds K_i symbols.
    ///
    /// # Errors
    ///
    /// `EncodeError::PriorityOutOfRange` for an unknown class;
    /// `EncodeError::EmptySymbol`/`SymbolSizeMismatch` as for the plain
    /// encoder.
    pub fn push(&mut self, payload: Symbol, priority: u8) -> Result<(), EncodeError> {
        if priority as usize >= self.queues.len() {
            return Err(EncodeError::PriorityOutOfRange {
                priority,
                classes: self.queues.len(),
            });
        }
        if payload.is_empty() {
            return Err(EncodeError::EmptySymbol);
        }
        match self.symbol_size {
            None => self.symbol_size = Some(payload.len()),
            Some(size) if size != payload.len() => {
                return Err(EncodeError::SymbolSizeMismatch {
                    expected: size,
                    got: payload.len(),
                });
            }
            Some(_) => {}
        }

        let framed = frame_symbol(self.seqno_ctr.value(), false, payload.as_slice());
        self.seqno_ctr.next();
        self.queues[priority as usize].push_back(framed);
        self.check_has_block()
    }

    /// Produce the next coded packet of the current expanded block.
    ///
    /// # Errors
    ///
    /// As for [`Encoder::next_coded`].
    pub fn next_coded(&mut self) -> Result<CodedPacket, EncodeError> {
        let mut pkt = self.inner.next_coded()?;
        pkt.uep = true;
        Ok(pkt)
    }

    /// Fill every class short of K_i with flagged padding symbols so a block
    /// can form without further source data. A no-op while a block is
    /// already available or before any symbol has fixed the payload size.
    ///
    /// # Errors
    ///
    /// Propagates inner encoder errors from block assembly.
    pub fn pad_partial_block(&mut self) -> Result<(), EncodeError> {
        if self.inner.has_block() {
            return Ok(());
        }
        let Some(size) = self.symbol_size else {
            return Ok(());
        };
        let zeros = vec![0u8; size];
        let mut padded = 0u64;
        for (class, queue) in self.queues.iter_mut().enumerate() {
            while queue.len() < self.params.ks[class] {
                queue.push_back(frame_symbol(0, true, &zeros));
                padded += 1;
            }
        }
        if padded > 0 {
            debug!(padded, "padded partial block");
        }
        self.padding_count += padded;
        self.total_padding_count += padded;
        self.check_has_block()
    }

    /// Discard the current expanded block and move on.
    ///
    /// # Errors
    ///
    /// As for [`Encoder::next_block`].
    pub fn next_block(&mut self) -> Result<(), EncodeError> {
        self.inner.next_block()?;
        self.padding_count = 0;
        self.check_has_block()
    }

    /// Skip forward to block `target`, dropping `distance - 1` whole blocks
    /// from every class queue.
    ///
    /// # Errors
    ///
    /// `EncodeError::NotAhead` unless `target` is strictly ahead;
    /// `EncodeError::InsufficientQueued` when any class queue cannot cover
    /// the skipped blocks.
    pub fn next_block_to(&mut self, target: u16) -> Result<(), EncodeError> {
        let mut ctr = CircularCounter::blockno();
        ctr.set(self.inner.blockno() as u32);
        if !ctr.is_strictly_ahead(target as u32) {
            return Err(EncodeError::NotAhead {
                current: self.inner.blockno(),
                target,
            });
        }
        let distance = ctr.forward_distance(target as u32) as usize;

        for (class, queue) in self.queues.iter().enumerate() {
            let needed = (distance - 1) * self.params.ks[class];
            if queue.len() < needed {
                return Err(EncodeError::InsufficientQueued {
                    needed,
                    queued: queue.len(),
                });
            }
        }
        for (class, queue) in self.queues.iter_mut().enumerate() {
            let needed = (distance - 1) * self.params.ks[class];
            queue.drain(..needed);
        }
        self.inner.jump_to(target);
        self.padding_count = 0;
        self.check_has_block()
    }

    /// True when the inner encoder holds a full expanded block.
    pub fn has_block(&self) -> bool {
        self.inner.has_block()
    }

    /// Original block size Σ K_i.
    pub fn block_size_in(&self) -> usize {
        self.params.block_size_in()
    }

    /// Expanded block size K_out.
    pub fn block_size_out(&self) -> usize {
        self.params.block_size_out()
    }

    /// Per-class sub-block sizes.
    pub fn block_sizes(&self) -> &[usize] {
        &self.params.ks
    }

    /// Current block number.
    pub fn blockno(&self) -> u16 {
        self.inner.blockno()
    }

    /// Sequence number of the most recent coded packet.
    pub fn seqno(&self) -> u32 {
        self.inner.seqno()
    }

    /// Seed of the current block.
    pub fn block_seed(&self) -> u32 {
        self.inner.block_seed()
    }

    /// Source symbols queued across all classes, excluding claimed blocks.
    pub fn queue_size(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    /// Padding symbols added to the current block.
    pub fn padding_count(&self) -> u64 {
        self.padding_count
    }

    /// Padding symbols added over the encoder's lifetime.
    pub fn total_padding_count(&self) -> u64 {
        self.total_padding_count
    }

    /// Inner encoder counters.
    pub fn stats(&self) -> &crate::stats::EncoderStats {
        self.inner.stats()
    }

    /// Assemble and hand over an expanded block once every class can supply
    /// its sub-block: repeat each class RF_i times, concatenate in priority
    /// order, replicate the whole sequence EF times. All copies are shallow.
    fn check_has_block(&mut self) -> Result<(), EncodeError> {
        if self.inner.has_block() {
            return Ok(());
        }
        let ready = self
            .queues
            .iter()
            .zip(&self.params.ks)
            .all(|(q, &k)| q.len() >= k);
        if !ready {
            return Ok(());
        }

        let mut base_block = Vec::with_capacity(self.block_size_out() / self.params.ef);
        for (class, queue) in self.queues.iter_mut().enumerate() {
            let k = self.params.ks[class];
            let sub_block: Vec<Symbol> = queue.drain(..k).collect();
            for _ in 0..self.params.rfs[class] {
                base_block.extend(sub_block.iter().cloned());
            }
        }
        for _ in 0..self.params.ef {
            for sym in &base_block {
                self.inner.push(sym.clone())?;
            }
        }
        debug!(
            blockno = self.inner.blockno(),
            k_out = self.block_size_out(),
            "assembled expanded block"
        );
        Ok(())
    }
}

// ─── UEP Decoder ────────────────────────────────────────────────────────────

/// A demultiplexed output symbol with its restored priority tag. An empty
/// payload marks a source symbol that was never recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSymbol {
    /// Original priority class.
    pub priority: u8,
    /// Recovered payload, or empty for a failed slot.
    pub payload: Symbol,
}

/// Entry in a per-priority output queue.
#[derive(Debug)]
struct QueuedSymbol {
    /// Global emit order assigned at demux time; the merge key for
    /// [`UepDecoder::next_decoded`].
    order: u64,
    payload: Symbol,
}

/// UEP decoder: an inner windowed LT decoder over expanded blocks plus the
/// demultiplexer back onto per-priority queues.
pub struct UepDecoder {
    params: UepParams,
    map: PositionMap,
    inner: Decoder,
    queues: Vec<VecDeque<QueuedSymbol>>,
    emit_ctr: u64,
    stats: UepDecoderStats,
}

impl UepDecoder {
    /// Decoder for the given parameter set.
    ///
    /// # Errors
    ///
    /// `ConfigError` when the parameter set is invalid.
    pub fn new(params: &UepParams) -> Result<Self, ConfigError> {
        params.validate()?;
        let inner = Decoder::new(&params.lt_params())?;
        let classes = params.ks.len();
        Ok(UepDecoder {
            params: params.clone(),
            map: PositionMap::new(params),
            inner,
            queues: (0..classes).map(|_| VecDeque::new()).collect(),
            emit_ctr: 0,
            stats: UepDecoderStats::new(classes),
        })
    }

    /// Accept one coded packet; settled expanded blocks are demultiplexed
    /// onto the per-priority queues as they complete.
    ///
    /// # Errors
    ///
    /// As for [`Decoder::push`].
    pub fn push(&mut self, pkt: &CodedPacket) -> Result<(), DecodeError> {
        self.inner.push(pkt)?;
        self.drain_inner();
        Ok(())
    }

    /// Pop the globally oldest demultiplexed symbol across all priority
    /// queues, restoring its priority tag.
    pub fn next_decoded(&mut self) -> Option<DecodedSymbol> {
        let class = self
            .queues
            .iter()
            .enumerate()
            .filter_map(|(class, q)| q.front().map(|e| (class, e.order)))
            .min_by_key(|&(_, order)| order)
            .map(|(class, _)| class)?;
        let entry = self.queues[class].pop_front().expect("front checked");
        Some(DecodedSymbol {
            priority: class as u8,
            payload: entry.payload,
        })
    }

    /// Give up on the current expanded block.
    pub fn flush(&mut self) {
        self.inner.flush();
        self.drain_inner();
    }

    /// Flush forward to block `target`, failing everything on the way.
    pub fn flush_to(&mut self, target: u16) {
        self.inner.flush_to(target);
        self.drain_inner();
    }

    /// Flush the current block and `n - 1` further whole blocks.
    pub fn flush_n_blocks(&mut self, n: usize) {
        self.inner.flush_n_blocks(n);
        self.drain_inner();
    }

    /// True when the current expanded block has fully decoded.
    pub fn has_decoded(&self) -> bool {
        self.inner.has_decoded()
    }

    /// Original block size Σ K_i.
    pub fn block_size_in(&self) -> usize {
        self.params.block_size_in()
    }

    /// Expanded block size K_out.
    pub fn block_size_out(&self) -> usize {
        self.params.block_size_out()
    }

    /// Number of the block currently being collected.
    pub fn blockno(&self) -> u16 {
        self.inner.blockno()
    }

    /// Seed of the current block, once known.
    pub fn block_seed(&self) -> Option<u32> {
        self.inner.block_seed()
    }

    /// Unique packets accepted for the current block.
    pub fn received_count(&self) -> usize {
        self.inner.received_count()
    }

    /// Demultiplexed symbols waiting across all priority queues.
    pub fn queue_size(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    /// True while demultiplexed output remains.
    pub fn has_queued_packets(&self) -> bool {
        self.queues.iter().any(|q| !q.is_empty())
    }

    /// Unique packets accepted across all blocks.
    pub fn total_received_count(&self) -> u64 {
        self.inner.total_received_count()
    }

    /// Real (non-padding) symbols recovered, across all classes.
    pub fn total_decoded_count(&self) -> u64 {
        self.stats.total_decoded_count()
    }

    /// Symbol slots never recovered, across all classes.
    pub fn total_failed_count(&self) -> u64 {
        self.stats.total_failed_count()
    }

    /// Padding symbols discarded over the decoder's lifetime.
    pub fn total_padding_count(&self) -> u64 {
        self.stats.total_padding_count
    }

    /// UEP-layer counters.
    pub fn stats(&self) -> &UepDecoderStats {
        &self.stats
    }

    /// Inner windowed-decoder counters (expanded symbols).
    pub fn inner_stats(&self) -> &crate::stats::DecoderStats {
        self.inner.stats()
    }

    /// Demultiplex every complete expanded block sitting on the inner
    /// decoder's output queue.
    fn drain_inner(&mut self) {
        let k_out = self.map.k_out();
        while self.inner.queue_size() >= k_out {
            let mut block = Vec::with_capacity(k_out);
            for _ in 0..k_out {
                if let Some(sym) = self.inner.next_decoded() {
                    block.push(sym);
                }
            }
            debug_assert_eq!(block.len(), k_out);
            self.demux_block(&block);
        }
    }

    /// Fold an expanded block back onto original slots: for each
    /// (priority, offset), the first recovered replica wins; padding is
    /// counted and discarded; unrecovered slots queue an empty payload.
    fn demux_block(&mut self, block: &[Symbol]) {
        self.stats.padding_count = 0;
        for class in 0..self.params.ks.len() {
            for offset in 0..self.params.ks[class] {
                let winner = self
                    .map
                    .replicas(class, offset)
                    .map(|p| &block[p])
                    .find(|sym| !sym.is_empty());
                match winner.and_then(unframe_symbol) {
                    Some((_seqno, true, _payload)) => {
                        self.stats.padding_count += 1;
                        self.stats.total_padding_count += 1;
                    }
                    Some((_seqno, false, payload)) => {
                        self.stats.decoded_per_class[class] += 1;
                        self.enqueue(class, payload);
                    }
                    None => {
                        self.stats.failed_per_class[class] += 1;
                        self.enqueue(class, Symbol::empty());
                    }
                }
            }
        }
    }

    fn enqueue(&mut self, class: usize, payload: Symbol) {
        let order = self.emit_ctr;
        self.emit_ctr += 1;
        self.queues[class].push_back(QueuedSymbol { order, payload });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> UepParams {
        UepParams {
            ks: vec![2, 3],
            rfs: vec![2, 1],
            ef: 2,
            c: 0.1,
            delta: 0.5,
        }
    }

    fn payload(tag: u8, len: usize) -> Symbol {
        Symbol::from((0..len).map(|i| tag ^ (i as u8)).collect::<Vec<u8>>())
    }

    #[test]
    fn framing_roundtrip() {
        let sym = frame_symbol(0x1234_5678, false, b"abc");
        let (seqno, padding, body) = unframe_symbol(&sym).unwrap();
        assert_eq!(seqno, 0x1234_5678);
        assert!(!padding);
        assert_eq!(body.as_slice(), b"abc");

        let pad = frame_symbol(0, true, &[0; 3]);
        let (_, padding, _) = unframe_symbol(&pad).unwrap();
        assert!(padding);

        assert!(unframe_symbol(&Symbol::copy_from_slice(&[1, 2])).is_none());
    }

    #[test]
    fn position_map_covers_every_slot_rf_ef_times() {
        let ps = params();
        let map = PositionMap::new(&ps);
        assert_eq!(map.k_out(), ps.block_size_out());

        let mut counts = vec![vec![0usize; 3]; 2];
        for e in 0..map.k_out() {
            let (class, offset) = map.map(e);
            counts[class as usize][offset] += 1;
        }
        for offset in 0..2 {
            assert_eq!(counts[0][offset], 2 * 2, "class 0 covered RF·EF times");
        }
        for offset in 0..3 {
            assert_eq!(counts[1][offset], 2, "class 1 covered RF·EF times");
        }
    }

    #[test]
    fn replica_positions_agree_with_forward_map() {
        let map = PositionMap::new(&params());
        for class in 0..2usize {
            let k = [2, 3][class];
            for offset in 0..k {
                let replicas: Vec<usize> = map.replicas(class, offset).collect();
                assert!(!replicas.is_empty());
                for p in replicas {
                    assert_eq!(map.map(p), (class as u8, offset));
                }
            }
        }
    }

    #[test]
    fn expanded_block_layout() {
        let ps = params();
        let mut enc = UepEncoder::with_seed_rng(&ps, 3).unwrap();
        let p0: Vec<Symbol> = (0..2).map(|i| payload(i, 6)).collect();
        let p1: Vec<Symbol> = (0..3).map(|i| payload(0x40 + i, 6)).collect();

        for s in &p0 {
            enc.push(s.clone(), 0).unwrap();
        }
        assert!(!enc.has_block());
        for s in &p1 {
            enc.push(s.clone(), 1).unwrap();
        }
        assert!(enc.has_block());
        assert_eq!(enc.queue_size(), 0);
        assert_eq!(enc.block_size_out(), 14); // 2·(2·2 + 3)

        // The inner block must follow the position map: each expanded slot
        // holds the framed original for its (class, offset).
        let map = PositionMap::new(&ps);
        let origs = [p0, p1];
        let inner_block = enc.inner.current_block().to_vec();
        for (e, framed) in inner_block.iter().enumerate() {
            let (class, offset) = map.map(e);
            let (_, padding, body) = unframe_symbol(framed).unwrap();
            assert!(!padding);
            assert_eq!(&body, &origs[class as usize][offset]);
        }
    }

    #[test]
    fn roundtrip_with_priorities() {
        let ps = params();
        let mut enc = UepEncoder::with_seed_rng(&ps, 5).unwrap();
        let mut dec = UepDecoder::new(&ps).unwrap();

        let p0: Vec<Symbol> = (0..2).map(|i| payload(i, 10)).collect();
        let p1: Vec<Symbol> = (0..3).map(|i| payload(0x80 + i, 10)).collect();
        for s in &p0 {
            enc.push(s.clone(), 0).unwrap();
        }
        for s in &p1 {
            enc.push(s.clone(), 1).unwrap();
        }

        let mut pulls = 0;
        while !dec.has_decoded() {
            dec.push(&enc.next_coded().unwrap()).unwrap();
            pulls += 1;
            assert!(pulls < 2000, "decode must converge");
        }
        assert_eq!(dec.queue_size(), 5);
        assert_eq!(dec.total_decoded_count(), 5);
        assert_eq!(dec.total_failed_count(), 0);

        // Demux order within a block is (priority, offset).
        let expected: Vec<(u8, Symbol)> = p0
            .iter()
            .map(|s| (0u8, s.clone()))
            .chain(p1.iter().map(|s| (1u8, s.clone())))
            .collect();
        for (priority, want) in expected {
            let got = dec.next_decoded().unwrap();
            assert_eq!(got.priority, priority);
            assert_eq!(got.payload, want);
        }
        assert!(dec.next_decoded().is_none());
    }

    #[test]
    fn padding_is_counted_and_excluded() {
        let ps = params();
        let mut enc = UepEncoder::with_seed_rng(&ps, 9).unwrap();
        let mut dec = UepDecoder::new(&ps).unwrap();

        enc.push(payload(1, 8), 0).unwrap();
        enc.push(payload(2, 8), 1).unwrap();
        assert!(!enc.has_block());
        enc.pad_partial_block().unwrap();
        assert!(enc.has_block());
        assert_eq!(enc.padding_count(), 3); // 1 missing in class 0, 2 in class 1
        assert_eq!(enc.total_padding_count(), 3);

        let mut pulls = 0;
        while !dec.has_decoded() {
            dec.push(&enc.next_coded().unwrap()).unwrap();
            pulls += 1;
            assert!(pulls < 2000, "decode must converge");
        }
        assert_eq!(dec.total_padding_count(), 3);
        assert_eq!(dec.queue_size(), 2); // only the real symbols
        assert_eq!(dec.total_decoded_count(), 2);

        let first = dec.next_decoded().unwrap();
        assert_eq!(first.priority, 0);
        assert_eq!(first.payload, payload(1, 8));
        let second = dec.next_decoded().unwrap();
        assert_eq!(second.priority, 1);
        assert_eq!(second.payload, payload(2, 8));
    }

    #[test]
    fn pad_without_any_data_is_a_noop() {
        let mut enc = UepEncoder::with_seed_rng(&params(), 1).unwrap();
        enc.pad_partial_block().unwrap();
        assert!(!enc.has_block());
        assert_eq!(enc.total_padding_count(), 0);
    }

    #[test]
    fn push_rejects_unknown_priority() {
        let mut enc = UepEncoder::with_seed_rng(&params(), 1).unwrap();
        assert!(matches!(
            enc.push(payload(0, 4), 2),
            Err(EncodeError::PriorityOutOfRange {
                priority: 2,
                classes: 2
            })
        ));
    }

    #[test]
    fn targeted_skip_drops_queued_subblocks() {
        let ps = params();
        let mut enc = UepEncoder::with_seed_rng(&ps, 2).unwrap();
        // Three original blocks' worth of symbols.
        for b in 0..3u8 {
            for i in 0..2u8 {
                enc.push(payload(b * 16 + i, 4), 0).unwrap();
            }
            for i in 0..3u8 {
                enc.push(payload(b * 16 + 8 + i, 4), 1).unwrap();
            }
        }
        assert!(enc.has_block());
        assert_eq!(enc.queue_size(), 2 * 5);

        assert!(matches!(
            enc.next_block_to(0),
            Err(EncodeError::NotAhead { .. })
        ));
        enc.next_block_to(2).unwrap();
        assert_eq!(enc.blockno(), 2);
        // One queued block dropped, one claimed.
        assert!(enc.has_block());
        assert_eq!(enc.queue_size(), 0);

        assert!(matches!(
            enc.next_block_to(10),
            Err(EncodeError::InsufficientQueued { .. })
        ));
    }
}
