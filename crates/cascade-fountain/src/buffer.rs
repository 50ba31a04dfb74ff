//! Symbol byte buffers.
//!
//! Two buffer types enforce the XOR ownership rule at compile time:
//! [`Symbol`] is a shared, immutable handle — cloning is O(1), so the same
//! payload can sit in an input queue, a graph vertex, and an outgoing packet
//! at once, and the UEP layer can fan a sub-block out across its repetition
//! and expansion factors without copying. [`SymbolAccum`] is an exclusively
//! owned accumulator that supports in-place XOR. Combining symbols always
//! goes through an accumulator the caller owns; there is no mutable path
//! into a shared payload.
//!
//! The empty symbol is a valid, distinguished state and the XOR identity:
//! `empty ^ x == x`. Two non-empty symbols must have equal length to combine.

use bytes::{Bytes, BytesMut};
use std::ops::RangeBounds;

// ─── Shared Symbol ──────────────────────────────────────────────────────────

/// A shared, immutable symbol payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Symbol(Bytes);

impl Symbol {
    /// The empty symbol — XOR identity and the decoder's "unresolved" marker.
    pub fn empty() -> Self {
        Symbol(Bytes::new())
    }

    /// Copy a byte slice into a new symbol.
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Symbol(Bytes::copy_from_slice(data))
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the distinguished empty state.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the payload bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// O(1) sub-slice sharing the same storage.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Self {
        Symbol(self.0.slice(range))
    }

    /// Unwrap into the underlying shared buffer.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Bytes> for Symbol {
    fn from(b: Bytes) -> Self {
        Symbol(b)
    }
}

impl From<Vec<u8>> for Symbol {
    fn from(v: Vec<u8>) -> Self {
        Symbol(Bytes::from(v))
    }
}

// ─── Exclusive Accumulator ──────────────────────────────────────────────────

/// An exclusively owned XOR accumulator.
///
/// Starts empty or as a copy of a [`Symbol`]; absorbs further symbols with
/// [`xor_with`](Self::xor_with); freezes into a shared [`Symbol`] when the
/// combination is complete.
#[derive(Debug, Default)]
pub struct SymbolAccum(BytesMut);

impl SymbolAccum {
    /// An empty accumulator.
    pub fn empty() -> Self {
        SymbolAccum(BytesMut::new())
    }

    /// Start from a copy of an existing symbol.
    pub fn from_symbol(sym: &Symbol) -> Self {
        let mut buf = BytesMut::with_capacity(sym.len());
        buf.extend_from_slice(sym.as_slice());
        SymbolAccum(buf)
    }

    /// Accumulated length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True while nothing has been absorbed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// XOR a symbol into the accumulator.
    ///
    /// The empty symbol is the identity in either position. Non-empty
    /// operands must have equal length; the block decoder enforces uniform
    /// payload sizes before any symbol reaches an accumulator.
    pub fn xor_with(&mut self, sym: &Symbol) {
        if sym.is_empty() {
            return;
        }
        if self.0.is_empty() {
            self.0.extend_from_slice(sym.as_slice());
            return;
        }
        assert_eq!(
            self.0.len(),
            sym.len(),
            "cannot XOR symbols of different sizes"
        );
        for (dst, src) in self.0.iter_mut().zip(sym.as_slice()) {
            *dst ^= src;
        }
    }

    /// Borrow the accumulated bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Freeze into a shared symbol.
    pub fn into_symbol(self) -> Symbol {
        Symbol(self.0.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_identity() {
        let x = Symbol::copy_from_slice(&[1, 2, 3]);

        let mut acc = SymbolAccum::empty();
        acc.xor_with(&x);
        assert_eq!(acc.into_symbol(), x);

        let mut acc = SymbolAccum::from_symbol(&x);
        acc.xor_with(&Symbol::empty());
        assert_eq!(acc.into_symbol(), x);
    }

    #[test]
    fn xor_is_self_inverse() {
        let x = Symbol::copy_from_slice(&[0xAA, 0x55, 0xFF]);
        let y = Symbol::copy_from_slice(&[0x0F, 0xF0, 0x3C]);

        let mut acc = SymbolAccum::from_symbol(&x);
        acc.xor_with(&y);
        acc.xor_with(&y);
        assert_eq!(acc.into_symbol(), x);
    }

    #[test]
    fn xor_commutes() {
        let x = Symbol::copy_from_slice(&[1, 2, 3, 4]);
        let y = Symbol::copy_from_slice(&[5, 6, 7, 8]);

        let mut a = SymbolAccum::from_symbol(&x);
        a.xor_with(&y);
        let mut b = SymbolAccum::from_symbol(&y);
        b.xor_with(&x);
        assert_eq!(a.into_symbol(), b.into_symbol());
    }

    #[test]
    #[should_panic(expected = "different sizes")]
    fn mismatched_sizes_panic() {
        let x = Symbol::copy_from_slice(&[1, 2, 3]);
        let y = Symbol::copy_from_slice(&[1, 2]);
        let mut acc = SymbolAccum::from_symbol(&x);
        acc.xor_with(&y);
    }

    #[test]
    fn shallow_clones_share_storage() {
        let x = Symbol::copy_from_slice(&[9; 1500]);
        let copies: Vec<Symbol> = (0..8).map(|_| x.clone()).collect();
        for c in &copies {
            assert_eq!(c.as_slice().as_ptr(), x.as_slice().as_ptr());
        }
    }

    #[test]
    fn slice_shares_storage() {
        let x = Symbol::copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        let tail = x.slice(4..);
        assert_eq!(tail.as_slice(), &[5, 6]);
        assert_eq!(tail.as_slice().as_ptr(), x.as_slice()[4..].as_ptr());
    }
}
