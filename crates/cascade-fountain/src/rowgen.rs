//! Deterministic row generation.
//!
//! A row is the set of input-symbol indices XORed together to form one coded
//! symbol. Encoder and decoder agree on the bipartite graph through nothing
//! but a shared 32-bit block seed: two generators reset with the same seed
//! produce identical row sequences, so the graph structure never travels on
//! the wire.
//!
//! Degrees come from the robust-soliton distribution; the neighbor indices
//! are drawn without replacement by Floyd's sampling, which costs exactly
//! `degree` RNG draws and keeps the stream position independent of collision
//! luck. The internal PRNG (xoshiro256** seeded via splitmix64) is fixed
//! here rather than taken from a crate so the sequence can never drift
//! between builds or library versions.

use std::collections::BTreeSet;

use crate::error::ConfigError;
use crate::soliton::RobustSoliton;

// ─── Deterministic PRNG ─────────────────────────────────────────────────────

/// xoshiro256** with splitmix64 seeding. Fixed algorithm: both ends of the
/// channel must replay the identical stream for a given seed.
mod xoshiro {
    #[derive(Debug, Clone)]
    pub struct Xoshiro256 {
        s: [u64; 4],
    }

    impl Xoshiro256 {
        pub fn from_seed(seed: u64) -> Self {
            // splitmix64 expansion of the seed into the full state
            let mut s = [0u64; 4];
            let mut z = seed;
            for slot in &mut s {
                z = z.wrapping_add(0x9e3779b97f4a7c15);
                z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
                z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
                *slot = z ^ (z >> 31);
            }
            Xoshiro256 { s }
        }

        pub fn next_u64(&mut self) -> u64 {
            let result = self.s[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);
            let t = self.s[1] << 17;
            self.s[2] ^= self.s[0];
            self.s[3] ^= self.s[1];
            self.s[1] ^= self.s[2];
            self.s[0] ^= self.s[3];
            self.s[2] ^= t;
            self.s[3] = self.s[3].rotate_left(45);
            result
        }

        /// Uniform variate in [0, 1) with 53 bits of precision.
        pub fn next_f64(&mut self) -> f64 {
            (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
        }

        /// Uniform value in [0, n).
        pub fn next_below(&mut self, n: u64) -> u64 {
            debug_assert!(n > 0);
            self.next_u64() % n
        }
    }
}

use xoshiro::Xoshiro256;

/// One row: distinct input indices in `[0, K)`, ascending.
pub type Row = Vec<usize>;

// ─── Neighbor Samplers ──────────────────────────────────────────────────────

/// How neighbor indices are drawn once the degree is fixed. The uniform
/// sampler is the standard LT construction; the weighted sampler biases
/// picks by priority-class span and is selected by configuration, not by a
/// separate generator type.
#[derive(Debug, Clone)]
enum NeighborSampler {
    Uniform,
    Weighted {
        /// (start, len) of each class span in the expanded block.
        spans: Vec<(usize, usize)>,
        /// Cumulative class-selection probabilities.
        cdf: Vec<f64>,
    },
}

// ─── Row Generator ──────────────────────────────────────────────────────────

/// Stateful, seed-deterministic row source.
#[derive(Debug, Clone)]
pub struct RowGenerator {
    dist: RobustSoliton,
    sampler: NeighborSampler,
    rng: Xoshiro256,
    seed: u32,
    rows_generated: u64,
}

impl RowGenerator {
    /// Uniform-neighbor generator over the distribution's block size.
    pub fn new(dist: RobustSoliton) -> Self {
        RowGenerator {
            dist,
            sampler: NeighborSampler::Uniform,
            rng: Xoshiro256::from_seed(0),
            seed: 0,
            rows_generated: 0,
        }
    }

    /// Class-weighted generator: neighbor picks land in class `i`'s span
    /// with probability proportional to `weights[i]`. Spans are consecutive
    /// and must cover the block exactly.
    ///
    /// # Errors
    ///
    /// `ConfigError` when the span lengths do not sum to K, the weight list
    /// length differs from the span list, or a weight is not positive.
    pub fn new_weighted(
        dist: RobustSoliton,
        span_lens: &[usize],
        weights: &[f64],
    ) -> Result<Self, ConfigError> {
        if span_lens.len() != weights.len() {
            return Err(ConfigError::ClassCountMismatch {
                ks: span_lens.len(),
                rfs: weights.len(),
            });
        }
        let total: usize = span_lens.iter().sum();
        if total != dist.k() {
            return Err(ConfigError::ClassSpanMismatch { k: dist.k(), total });
        }
        for &w in weights {
            if !(w > 0.0) || !w.is_finite() {
                return Err(ConfigError::InvalidClassWeight { weight: w });
            }
        }

        let mut spans = Vec::with_capacity(span_lens.len());
        let mut start = 0;
        for &len in span_lens {
            spans.push((start, len));
            start += len;
        }
        let weight_sum: f64 = weights.iter().sum();
        let mut cdf = Vec::with_capacity(weights.len());
        let mut acc = 0.0;
        for &w in weights {
            acc += w / weight_sum;
            cdf.push(acc);
        }
        *cdf.last_mut().expect("at least one class") = 1.0;

        Ok(RowGenerator {
            dist,
            sampler: NeighborSampler::Weighted { spans, cdf },
            rng: Xoshiro256::from_seed(0),
            seed: 0,
            rows_generated: 0,
        })
    }

    /// Re-seed and rewind the generator. After `reset(s)`, the sequence of
    /// rows is a pure function of `s`.
    pub fn reset(&mut self, seed: u32) {
        self.seed = seed;
        self.rng = Xoshiro256::from_seed(seed as u64);
        self.rows_generated = 0;
    }

    /// Produce the next row and advance the stream.
    pub fn next_row(&mut self) -> Row {
        let degree = self.dist.sample(self.rng.next_f64());
        let row = match &self.sampler {
            NeighborSampler::Uniform => sample_uniform(&mut self.rng, self.dist.k(), degree),
            NeighborSampler::Weighted { spans, cdf } => {
                sample_weighted(&mut self.rng, degree, spans, cdf)
            }
        };
        self.rows_generated += 1;
        debug_assert!(!row.is_empty());
        row
    }

    /// Block size K.
    pub fn k(&self) -> usize {
        self.dist.k()
    }

    /// Seed of the current stream.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Rows produced since the last reset.
    pub fn rows_generated(&self) -> u64 {
        self.rows_generated
    }

}

/// Floyd's algorithm: exactly `degree` draws, no rejection.
fn sample_uniform(rng: &mut Xoshiro256, k: usize, degree: usize) -> Row {
    let mut picked = BTreeSet::new();
    for j in (k - degree)..k {
        let t = rng.next_below(j as u64 + 1) as usize;
        if !picked.insert(t) {
            picked.insert(j);
        }
    }
    picked.into_iter().collect()
}

/// Class-biased sampling with redraw on duplicates. Degree never exceeds K,
/// so a free slot always exists.
fn sample_weighted(
    rng: &mut Xoshiro256,
    degree: usize,
    spans: &[(usize, usize)],
    cdf: &[f64],
) -> Row {
    let mut picked = BTreeSet::new();
    while picked.len() < degree {
        let u = rng.next_f64();
        let class = cdf.partition_point(|&p| p < u).min(spans.len() - 1);
        let (start, len) = spans[class];
        if len == 0 {
            continue;
        }
        let idx = start + rng.next_below(len as u64) as usize;
        picked.insert(idx);
    }
    picked.into_iter().collect()
}
