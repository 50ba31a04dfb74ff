//! # cascade-fountain
//!
//! Pure-Rust rateless erasure coding for streaming over lossy networks: an
//! LT (Luby-Transform) fountain code with robust-soliton row generation and
//! an unequal-error-protection (UEP) layer.
//!
//! A sender turns each block of K source symbols into an unbounded stream of
//! coded packets; a receiver rebuilds the block from any sufficiently large
//! subset, however reordered or incomplete. Encoder and decoder agree on the
//! coded rows through nothing but a per-block seed, and blocks advance
//! through a circular 16-bit number space with a forward acceptance window.
//!
//! All types here are pure logic — no sockets, no clocks, no threads.
//! Transport, pacing, and retransmission policy live with the caller, which
//! feeds [`Decoder::push`] received packets and drains
//! [`Encoder::next_coded`] for transmission.
//!
//! ## Crate structure
//!
//! - [`buffer`] — shared symbol buffers and exclusive XOR accumulators
//! - [`counter`] — fixed-modulus circular counters (block numbers mod 2^16)
//! - [`soliton`] — robust-soliton degree distribution
//! - [`rowgen`] — seed-deterministic row generation
//! - [`mp`] — incremental message-passing decoding engine
//! - [`encoder`] — block-level LT encoder
//! - [`decoder`] — per-block and windowed LT decoders
//! - [`uep`] — unequal error protection: block expansion, padding, demux
//! - [`wire`] — bit-exact coded-packet serialization
//! - [`params`] — validated parameter sets
//! - [`error`] — error taxonomy
//! - [`stats`] — serializable counters

#![forbid(unsafe_code)]

pub mod buffer;
pub mod counter;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod mp;
pub mod params;
pub mod rowgen;
pub mod soliton;
pub mod stats;
pub mod uep;
pub mod wire;

pub use buffer::{Symbol, SymbolAccum};
pub use decoder::{BlockDecoder, Decoder, BLOCK_WINDOW};
pub use encoder::{Encoder, MAX_SEQNO};
pub use error::{ConfigError, DecodeError, EncodeError};
pub use params::{LtParams, UepParams};
pub use uep::{DecodedSymbol, UepDecoder, UepEncoder};
pub use wire::CodedPacket;
