//! Rule Table
//!
//! Rules are stored as a single dense flat array indexed by a mixed-radix
//! encoding of input-set choices: with radices `r_0..r_{k-1}` (the set
//! counts of the input variables, in order), a tuple of set positions
//! `(s_0, .., s_{k-1})` maps to `idx = sum(s_j * stride_j)` where
//! `stride_j = r_{j+1} * .. * r_{k-1}`. A cell holds the position of an
//! output set, or `None` for "no rule".

/// A rule cell: the consequent output-set position, or no rule.
pub type RuleCell = Option<usize>;

/// Radix weights for a mixed-radix rule encoding.
///
/// `strides(&[3, 3])` is `[3, 1]`; the last stride is always 1 and an empty
/// radix list yields an empty stride list.
pub fn strides(radices: &[usize]) -> Vec<usize> {
    let mut out = vec![1usize; radices.len()];
    for j in (0..radices.len().saturating_sub(1)).rev() {
        out[j] = out[j + 1] * radices[j + 1];
    }
    out
}

/// Linear rule index of a tuple of set positions.
pub fn encode(components: &[usize], strides: &[usize]) -> usize {
    components
        .iter()
        .zip(strides.iter())
        .map(|(s, w)| s * w)
        .sum()
}

/// Recover the tuple of set positions from a linear rule index.
///
/// Walks the variables in order, peeling each component off by quotient
/// against its stride.
pub fn decode(mut index: usize, strides: &[usize]) -> Vec<usize> {
    let mut components = Vec::with_capacity(strides.len());
    for &w in strides {
        components.push(index / w);
        index %= w;
    }
    components
}

/// The dense flat rule array of one model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    cells: Vec<RuleCell>,
}

impl RuleTable {
    pub fn new() -> Self {
        RuleTable::default()
    }

    /// Resize to `size` cells, all "no rule". Size 0 is fine - a model with
    /// a set-less input variable cannot have rules yet.
    pub fn alloc(&mut self, size: usize) {
        self.cells.clear();
        self.cells.resize(size, None);
    }

    /// Replace the whole table.
    pub fn replace(&mut self, cells: Vec<RuleCell>) {
        self.cells = cells;
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// True when not a single cell names an output set.
    pub fn no_rules(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    pub fn get(&self, index: usize) -> RuleCell {
        self.cells.get(index).copied().flatten()
    }

    pub fn set(&mut self, index: usize, cell: RuleCell) {
        if let Some(slot) = self.cells.get_mut(index) {
            *slot = cell;
        }
    }

    /// Blank every cell, keeping the size.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = None);
    }

    pub fn cells(&self) -> &[RuleCell] {
        &self.cells
    }

    pub fn take_cells(&mut self) -> Vec<RuleCell> {
        std::mem::take(&mut self.cells)
    }
}
