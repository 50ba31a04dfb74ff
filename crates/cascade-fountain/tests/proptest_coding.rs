//! Property-based tests for the coding core.
//!
//! These pin down the invariants that must hold for *any* parameter choice
//! and delivery schedule: permutation and duplication invariance of
//! decoding, position-map bijectivity, row-generator determinism, and
//! byte-exact wire round-trips.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use cascade_fountain::rowgen::RowGenerator;
use cascade_fountain::soliton::RobustSoliton;
use cascade_fountain::uep::PositionMap;
use cascade_fountain::{CodedPacket, Decoder, Encoder, LtParams, Symbol, UepParams};

// ─── Decoding invariances ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Decoding the same packet set in any delivery order yields the same
    /// symbols.
    #[test]
    fn decode_is_permutation_invariant(
        k in 4usize..=24,
        symbol_len in 1usize..=64,
        stream_seed in any::<u64>(),
        shuffle_seed in any::<u64>(),
    ) {
        let params = LtParams::new(k, 0.1, 0.5);
        let mut enc = Encoder::with_seed_rng(&params, stream_seed).unwrap();
        let original: Vec<Symbol> = (0..k)
            .map(|i| {
                Symbol::from(
                    (0..symbol_len)
                        .map(|j| (i as u8).wrapping_mul(37) ^ (j as u8))
                        .collect::<Vec<u8>>(),
                )
            })
            .collect();
        for s in &original {
            enc.push(s.clone()).unwrap();
        }

        // Enough packets that an in-order decode certainly completes.
        let mut coded: Vec<CodedPacket> = Vec::new();
        let mut reference = Decoder::new(&params).unwrap();
        while !reference.has_decoded() {
            let pkt = enc.next_coded().unwrap();
            reference.push(&pkt).unwrap();
            coded.push(pkt);
        }
        let want: Vec<Symbol> = reference.decoded_symbols().cloned().collect();
        prop_assert_eq!(&want, &original);

        coded.shuffle(&mut StdRng::seed_from_u64(shuffle_seed));
        let mut shuffled = Decoder::new(&params).unwrap();
        for pkt in &coded {
            shuffled.push(pkt).unwrap();
        }
        prop_assert!(shuffled.has_decoded());
        let got: Vec<Symbol> = shuffled.decoded_symbols().cloned().collect();
        prop_assert_eq!(got, original);
    }

    /// Pushing every packet twice changes nothing but the duplicate counter.
    #[test]
    fn duplicates_do_not_disturb_decoding(
        k in 4usize..=16,
        stream_seed in any::<u64>(),
    ) {
        let params = LtParams::new(k, 0.1, 0.5);
        let mut enc = Encoder::with_seed_rng(&params, stream_seed).unwrap();
        for i in 0..k {
            enc.push(Symbol::copy_from_slice(&[i as u8, 0xA5, i as u8 ^ 0x3C])).unwrap();
        }
        let coded: Vec<CodedPacket> = (0..4 * k).map(|_| enc.next_coded().unwrap()).collect();

        let mut clean = Decoder::new(&params).unwrap();
        let mut noisy = Decoder::new(&params).unwrap();
        for pkt in &coded {
            clean.push(pkt).unwrap();
            noisy.push(pkt).unwrap();
            noisy.push(pkt).unwrap();
        }

        prop_assert_eq!(clean.has_decoded(), noisy.has_decoded());
        prop_assert_eq!(clean.decoded_count(), noisy.decoded_count());
        prop_assert_eq!(
            clean.total_received_count(),
            noisy.total_received_count()
        );
        prop_assert_eq!(noisy.stats().duplicate_dropped, coded.len() as u64);
        let a: Vec<Symbol> = clean.decoded_symbols().cloned().collect();
        let b: Vec<Symbol> = noisy.decoded_symbols().cloned().collect();
        prop_assert_eq!(a, b);
    }
}

// ─── Row generator determinism ──────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Independent generators with one seed replay one row sequence; the
    /// rows always hold distinct in-range indices.
    #[test]
    fn row_streams_replay_exactly(
        k in 1usize..=200,
        seed in any::<u32>(),
        rows in 1usize..=100,
    ) {
        let dist = RobustSoliton::new(k, 0.1, 0.5).unwrap();
        let mut a = RowGenerator::new(dist.clone());
        let mut b = RowGenerator::new(dist);
        a.reset(seed);
        b.reset(seed);
        for _ in 0..rows {
            let row = a.next_row();
            prop_assert_eq!(&row, &b.next_row());
            prop_assert!(!row.is_empty());
            prop_assert!(row.len() <= k);
            prop_assert!(row.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(row.iter().all(|&i| i < k));
        }
    }
}

// ─── Position map bijectivity ───────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The expanded-position map is total and covers each original slot
    /// exactly RF_i · EF times.
    #[test]
    fn position_map_is_onto_with_exact_multiplicity(
        ks in prop::collection::vec(1usize..=8, 1..=4),
        rf_picks in prop::collection::vec(1usize..=4, 1..=4),
        ef in 1usize..=4,
    ) {
        let classes = ks.len().min(rf_picks.len());
        let ks = ks[..classes].to_vec();
        let rfs = rf_picks[..classes].to_vec();
        let params = UepParams { ks: ks.clone(), rfs: rfs.clone(), ef, c: 0.1, delta: 0.5 };
        prop_assume!(params.validate().is_ok());

        let map = PositionMap::new(&params);
        prop_assert_eq!(map.k_out(), params.block_size_out());

        let mut counts: Vec<Vec<usize>> = ks.iter().map(|&k| vec![0; k]).collect();
        for e in 0..map.k_out() {
            let (class, offset) = map.map(e);
            counts[class as usize][offset] += 1;
        }
        for (class, class_counts) in counts.iter().enumerate() {
            for (offset, &n) in class_counts.iter().enumerate() {
                prop_assert_eq!(
                    n,
                    rfs[class] * ef,
                    "slot ({}, {}) multiplicity",
                    class,
                    offset
                );
            }
        }

        // The replica listing agrees with the forward map.
        for (class, &k) in ks.iter().enumerate() {
            for offset in 0..k {
                for p in map.replicas(class, offset) {
                    prop_assert_eq!(map.map(p), (class as u8, offset));
                }
            }
        }
    }
}

// ─── Wire round-trips ───────────────────────────────────────────────────────

proptest! {
    /// Packet serialization is byte-exact for arbitrary field values.
    #[test]
    fn wire_roundtrip(
        block_number in any::<u16>(),
        block_seed in any::<u32>(),
        sequence_number in any::<u32>(),
        priority in any::<u8>(),
        uep in any::<bool>(),
        payload in prop::collection::vec(any::<u8>(), 0..=2048),
    ) {
        let pkt = CodedPacket {
            block_number,
            block_seed,
            sequence_number,
            priority,
            uep,
            payload: Symbol::from(payload),
        };
        let encoded = pkt.encode();
        prop_assert_eq!(encoded.len(), pkt.encoded_len());
        let decoded = CodedPacket::decode(&mut encoded.freeze()).unwrap();
        prop_assert_eq!(decoded, pkt);
    }

    /// Truncated buffers never decode.
    #[test]
    fn wire_rejects_truncation(
        payload in prop::collection::vec(any::<u8>(), 0..=64),
        cut_back in 1usize..=16,
    ) {
        let pkt = CodedPacket {
            block_number: 1,
            block_seed: 2,
            sequence_number: 3,
            priority: 0,
            uep: false,
            payload: Symbol::from(payload),
        };
        let encoded = pkt.encode().freeze();
        let cut = encoded.len().saturating_sub(cut_back);
        let mut short = encoded.slice(..cut);
        prop_assert!(CodedPacket::decode(&mut short).is_none());
    }
}
