//! Incremental message passing over the bipartite symbol graph.
//!
//! The context holds K input (source) vertices and a growing set of output
//! (coded) vertices. An edge means "this output's partial sum still includes
//! this input". Decoding peels the graph: an output of degree one directly
//! resolves its sole input; newly resolved inputs join the *ripple* and are
//! XORed out of every output still adjacent to them, which may expose more
//! degree-one outputs.
//!
//! Vertices live in index-addressed arenas and the degree-one candidates in
//! an explicit work queue filtered by exact degree at drain time — there is
//! no live iterator to invalidate while edges are removed. Every edge is
//! added once and removed once, so a `run()` call costs the new work since
//! the previous call, not the size of the graph.

use std::mem;

use crate::buffer::{Symbol, SymbolAccum};

// ─── Vertices ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct InputVertex {
    /// Recovered source symbol; empty until decoded.
    symbol: Symbol,
    decoded: bool,
    /// Output vertices whose partial sums still include this input.
    outputs: Vec<usize>,
}

#[derive(Debug)]
struct OutputVertex {
    /// Partial sum: the coded payload minus every input already peeled out.
    accum: SymbolAccum,
    /// Unresolved input neighbors.
    inputs: Vec<usize>,
}

// ─── Context State ──────────────────────────────────────────────────────────

/// Coarse decoding state, for callers that want to log or assert progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpState {
    /// No output symbols yet.
    Empty,
    /// Ripple exhausted with inputs still unresolved; more packets needed.
    Stalled,
    /// All K inputs recovered.
    Decoded,
}

/// Message-passing context for one block.
#[derive(Debug)]
pub struct MpContext {
    inputs: Vec<InputVertex>,
    outputs: Vec<OutputVertex>,
    /// Degree-one candidates; entries may be stale and are re-checked
    /// against the exact degree when drained.
    deg_one: Vec<usize>,
    /// Inputs resolved but not yet propagated to their neighbors.
    ripple: Vec<usize>,
    decoded_count: usize,
}

impl MpContext {
    /// Context with `k` undecoded input symbols and no outputs.
    pub fn new(k: usize) -> Self {
        let mut inputs = Vec::with_capacity(k);
        inputs.resize_with(k, InputVertex::default);
        MpContext {
            inputs,
            outputs: Vec::new(),
            deg_one: Vec::new(),
            ripple: Vec::new(),
            decoded_count: 0,
        }
    }

    /// Number of input symbols.
    pub fn input_size(&self) -> usize {
        self.inputs.len()
    }

    /// Number of output symbols added so far.
    pub fn output_size(&self) -> usize {
        self.outputs.len()
    }

    /// Inputs recovered so far. Only `clear` ever decreases this.
    pub fn decoded_count(&self) -> usize {
        self.decoded_count
    }

    /// True once every input symbol is recovered.
    pub fn has_decoded(&self) -> bool {
        self.decoded_count == self.inputs.len()
    }

    /// Coarse state for logging and stall detection.
    pub fn state(&self) -> MpState {
        if self.has_decoded() {
            MpState::Decoded
        } else if self.outputs.is_empty() {
            MpState::Empty
        } else {
            MpState::Stalled
        }
    }

    /// Add an output vertex carrying a coded payload; returns its index.
    pub fn add_output(&mut self, symbol: Symbol) -> usize {
        self.outputs.push(OutputVertex {
            accum: SymbolAccum::from_symbol(&symbol),
            inputs: Vec::new(),
        });
        self.outputs.len() - 1
    }

    /// Link input `i` to output `j`.
    ///
    /// An edge to an already-decoded input is reduced on the spot — the
    /// input's value is XORed out of the output's partial sum and no edge is
    /// stored — preserving the invariant that adjacency means "sum still
    /// includes this input". Degree transitions seed the degree-one queue
    /// incrementally; nothing is rescanned.
    pub fn add_edge(&mut self, i: usize, j: usize) {
        let input = &mut self.inputs[i];
        let output = &mut self.outputs[j];

        if input.decoded {
            output.accum.xor_with(&input.symbol);
            return;
        }

        debug_assert!(!output.inputs.contains(&i), "parallel edge");
        input.outputs.push(j);
        output.inputs.push(i);
        if output.inputs.len() == 1 {
            self.deg_one.push(j);
        }
    }

    /// Run message passing until the ripple is exhausted or the block is
    /// fully decoded. Idempotent once decoded.
    pub fn run(&mut self) {
        if self.has_decoded() {
            return;
        }

        loop {
            self.decode_degree_one();
            if self.ripple.is_empty() || self.has_decoded() {
                self.ripple.clear();
                break;
            }
            self.process_ripple();
        }
    }

    /// Recovered symbol for input `i`; empty while unresolved.
    pub fn input_symbol(&self, i: usize) -> &Symbol {
        &self.inputs[i].symbol
    }

    /// All K input slots in order; unresolved slots yield empty symbols.
    pub fn input_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.inputs.iter().map(|v| &v.symbol)
    }

    /// Only the recovered inputs, as `(index, symbol)` pairs.
    pub fn decoded(&self) -> impl Iterator<Item = (usize, &Symbol)> {
        self.inputs
            .iter()
            .enumerate()
            .filter(|(_, v)| v.decoded)
            .map(|(i, v)| (i, &v.symbol))
    }

    /// Reset to the initial state, keeping K.
    pub fn clear(&mut self) {
        for input in &mut self.inputs {
            input.symbol = Symbol::empty();
            input.decoded = false;
            input.outputs.clear();
        }
        self.outputs.clear();
        self.deg_one.clear();
        self.ripple.clear();
        self.decoded_count = 0;
    }

    /// Drain the degree-one candidates. The first output to reach an input
    /// resolves it (symbol moves from the output's partial sum into the
    /// input slot); later degree-one neighbors of the same input only lose
    /// their edge. Resolved inputs enter the ripple exactly once.
    fn decode_degree_one(&mut self) {
        let candidates = mem::take(&mut self.deg_one);
        for j in candidates {
            if self.outputs[j].inputs.len() != 1 {
                continue; // stale entry; degree changed since queued
            }
            let i = self.outputs[j].inputs[0];
            self.outputs[j].inputs.clear();
            remove_one(&mut self.inputs[i].outputs, j);

            if !self.inputs[i].decoded && !self.outputs[j].accum.is_empty() {
                let accum = mem::take(&mut self.outputs[j].accum);
                self.inputs[i].symbol = accum.into_symbol();
                self.inputs[i].decoded = true;
                self.decoded_count += 1;
                self.ripple.push(i);
            }
        }
    }

    /// XOR each rippled input out of every output still adjacent to it,
    /// removing the edges and queueing any output that drops to degree one.
    fn process_ripple(&mut self) {
        let ripple = mem::take(&mut self.ripple);
        for i in ripple {
            let sym = self.inputs[i].symbol.clone();
            let neighbors = mem::take(&mut self.inputs[i].outputs);
            for j in neighbors {
                let output = &mut self.outputs[j];
                output.accum.xor_with(&sym);
                remove_one(&mut output.inputs, i);
                if output.inputs.len() == 1 {
                    self.deg_one.push(j);
                }
            }
        }
    }
}

/// Remove one occurrence of `value` from a small unordered list.
fn remove_one(list: &mut Vec<usize>, value: usize) {
    if let Some(pos) = list.iter().position(|&x| x == value) {
        list.swap_remove(pos);
    }
}
