//! Evaluation Sessions
//!
//! A session is the per-call scratch state of one model: the current grid
//! index of every input variable and the aggregated DOM of every output
//! set. It holds nothing else - many sessions can share one model, and
//! because inference reads the model immutably, independent sessions may
//! evaluate on independent threads.

use crate::grid::Dom;
use crate::model::Model;

/// Per-call scratch state bound to one model.
#[derive(Debug, Clone)]
pub struct Session {
    /// Grid index of each input variable's current crisp value
    input_idx: Vec<usize>,
    /// Aggregated DOM per output set, rebuilt by every evaluation
    out_dom: Vec<Dom>,
}

impl Session {
    /// A fresh session sized to `model`, with every input at index 0.
    pub fn new(model: &Model) -> Self {
        Session {
            input_idx: vec![0; model.num_inputs()],
            out_dom: vec![0; model.output().map_or(0, |o| o.num_sets())],
        }
    }

    pub fn num_inputs(&self) -> usize {
        self.input_idx.len()
    }

    pub fn input_idx(&self, var_idx: usize) -> Option<usize> {
        self.input_idx.get(var_idx).copied()
    }

    /// Record the grid index for one input variable. Returns false when the
    /// variable index does not exist.
    pub fn set_input_idx(&mut self, var_idx: usize, idx: usize) -> bool {
        match self.input_idx.get_mut(var_idx) {
            Some(slot) => {
                *slot = idx;
                true
            }
            None => false,
        }
    }

    /// Aggregated output DOMs from the most recent evaluation.
    pub fn out_dom(&self) -> &[Dom] {
        &self.out_dom
    }

    /// Split into the input view and a writable output-DOM view, resized
    /// for a fresh evaluation. Inputs the session never saw sit at index 0,
    /// the same default a fresh session has.
    pub(crate) fn begin_eval(
        &mut self,
        num_inputs: usize,
        num_out_sets: usize,
    ) -> (&[usize], &mut [Dom]) {
        self.input_idx.resize(num_inputs, 0);
        self.out_dom.clear();
        self.out_dom.resize(num_out_sets, 0);
        (&self.input_idx, &mut self.out_dom)
    }
}
