//! Fuzzy Model
//!
//! The model owns the ordered input variables, the single output variable,
//! the dense rule table, and the inference op. All structural mutation goes
//! through here because adding or removing a set changes the mixed-radix
//! shape of the rule table: existing cells must keep their meaning while the
//! table is rebuilt around them.
//!
//! The model also carries the read-once message slot: every error raised by
//! a model-level operation is recorded as its rendered text before being
//! returned, and reading the slot consumes it.

use crate::curve::{MemberFunc, Ramp};
use crate::defuzz::{CompositionOp, DefuzzMethod};
use crate::error::{FuzzyError, Result};
use crate::grid::GridSpec;
use crate::rules::{self, RuleTable};
use crate::variable::{unique_id, OutputVariable, Variable};

/// The t-norm/s-norm combining antecedent DOMs within a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InferenceOp {
    /// FCL `AND : MIN`
    #[default]
    Min,
    /// FCL `OR : MAX`
    Max,
}

/// Which variable a set operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarRef {
    Input(usize),
    Output,
}

/// A complete fuzzy model.
#[derive(Debug, Clone, Default)]
pub struct Model {
    grid: GridSpec,
    inputs: Vec<Variable>,
    output: Option<OutputVariable>,
    rules: RuleTable,
    inference_op: InferenceOp,
    msg: Option<String>,
}

impl Model {
    pub fn new(grid: GridSpec) -> Self {
        Model {
            grid,
            ..Model::default()
        }
    }

    pub fn grid(&self) -> GridSpec {
        self.grid
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn inputs(&self) -> &[Variable] {
        &self.inputs
    }

    pub fn input(&self, index: usize) -> Option<&Variable> {
        self.inputs.get(index)
    }

    pub fn output(&self) -> Option<&OutputVariable> {
        self.output.as_ref()
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn inference_op(&self) -> InferenceOp {
        self.inference_op
    }

    pub fn set_inference_op(&mut self, op: InferenceOp) {
        self.inference_op = op;
    }

    /// Find an input variable by id, case-insensitively.
    pub fn find_input(&self, id: &str) -> Option<usize> {
        self.inputs
            .iter()
            .position(|v| v.id().eq_ignore_ascii_case(id))
    }

    // === Message slot ===

    /// Record an error's rendered text as the model's current message.
    pub(crate) fn record(&mut self, err: &FuzzyError) {
        self.msg = Some(err.to_string());
    }

    /// Read the last message, consuming it. Subsequent reads return `None`
    /// until a new error is recorded.
    pub fn take_msg(&mut self) -> Option<String> {
        self.msg.take()
    }

    // === Variable management ===

    /// Append an input variable. A fresh variable has no sets, which
    /// collapses the rule-table size to zero; any existing rules are gone.
    pub fn add_input_variable(
        &mut self,
        id: &str,
        left_x: f64,
        right_x: f64,
        auto_unique: bool,
    ) -> Result<usize> {
        self.checked(|m| {
            let taken = m.taken_var_ids();
            let id = unique_id(id, &taken, auto_unique)?;

            let mut var = Variable::new(id, left_x, right_x, m.grid)?;
            let index = m.inputs.len();
            var.set_index(index);
            m.inputs.push(var);

            m.rules.alloc(m.rule_capacity());
            m.recompute_strides();
            tracing::debug!(index, "input_variable_added");
            Ok(index)
        })
    }

    /// Install the output variable. Only one may exist.
    pub fn add_output_variable(&mut self, id: &str, left_x: f64, right_x: f64) -> Result<()> {
        self.checked(|m| {
            if m.output.is_some() {
                return Err(FuzzyError::OutputAlreadyExists);
            }
            let taken = m.taken_var_ids();
            let id = unique_id(id, &taken, false)?;
            m.output = Some(OutputVariable::new(id, left_x, right_x, m.grid)?);
            Ok(())
        })
    }

    /// Remove an input variable. Preserving rule cross-products across a
    /// vanished radix is ambiguous, so the table is cleared at its new size.
    pub fn delete_input_variable(&mut self, index: usize) -> Result<()> {
        self.checked(|m| {
            if index >= m.inputs.len() {
                return Err(FuzzyError::UnknownHandle(format!(
                    "input variable index {index} out of range"
                )));
            }
            m.inputs.remove(index);
            for (new_index, var) in m.inputs.iter_mut().enumerate().skip(index) {
                var.set_index(new_index);
            }
            m.rules.alloc(m.rule_capacity());
            m.recompute_strides();
            tracing::debug!(index, "input_variable_deleted");
            Ok(())
        })
    }

    /// Refuse to remove the output variable (matching the external surface,
    /// where the output variable is addressed separately from inputs).
    pub fn delete_output_variable(&mut self) -> Result<()> {
        self.checked(|_| Err(FuzzyError::CantDeleteOutput))
    }

    /// Rename a variable, enforcing model-wide uniqueness.
    pub fn rename_variable(&mut self, var: VarRef, id: &str) -> Result<()> {
        self.checked(|m| {
            let current = match var {
                VarRef::Input(i) => m
                    .input(i)
                    .ok_or_else(|| {
                        FuzzyError::UnknownHandle(format!("input variable index {i} out of range"))
                    })?
                    .id()
                    .to_string(),
                VarRef::Output => m
                    .output
                    .as_ref()
                    .ok_or(FuzzyError::NoOutputVariable)?
                    .id()
                    .to_string(),
            };
            let taken: Vec<String> = m
                .taken_var_ids()
                .into_iter()
                .filter(|t| !t.eq_ignore_ascii_case(&current))
                .collect();
            let id = unique_id(id, &taken, false)?;
            match var {
                VarRef::Input(i) => m.inputs[i].set_id(id),
                VarRef::Output => {
                    if let Some(out) = m.output.as_mut() {
                        out.base_mut().set_id(id);
                    }
                }
            }
            Ok(())
        })
    }

    /// Change a variable's left domain endpoint. For the output variable
    /// this shifts every defuzzification table, so they are rebuilt.
    pub fn set_left_x(&mut self, var: VarRef, value: f64) -> Result<()> {
        self.checked(|m| {
            match var {
                VarRef::Input(i) => {
                    let v = m.inputs.get_mut(i).ok_or_else(|| {
                        FuzzyError::UnknownHandle(format!("input variable index {i} out of range"))
                    })?;
                    v.map_mut().set_left_x(value)?;
                }
                VarRef::Output => {
                    let grid = m.grid;
                    let out = m.output.as_mut().ok_or(FuzzyError::NoOutputVariable)?;
                    out.base_mut().map_mut().set_left_x(value)?;
                    out.refresh_defuzz(grid);
                }
            }
            Ok(())
        })
    }

    /// Change a variable's right domain endpoint. See [`Model::set_left_x`].
    pub fn set_right_x(&mut self, var: VarRef, value: f64) -> Result<()> {
        self.checked(|m| {
            match var {
                VarRef::Input(i) => {
                    let v = m.inputs.get_mut(i).ok_or_else(|| {
                        FuzzyError::UnknownHandle(format!("input variable index {i} out of range"))
                    })?;
                    v.map_mut().set_right_x(value)?;
                }
                VarRef::Output => {
                    let grid = m.grid;
                    let out = m.output.as_mut().ok_or(FuzzyError::NoOutputVariable)?;
                    out.base_mut().map_mut().set_right_x(value)?;
                    out.refresh_defuzz(grid);
                }
            }
            Ok(())
        })
    }

    // === Set management ===

    /// Add a set to a variable.
    ///
    /// Adding to an input variable grows that radix of the rule table: the
    /// new table is walked in order, cells whose decoded component names the
    /// new set stay "no rule", and every other cell is filled from a
    /// monotone cursor into the old table - both sequences visit the
    /// surviving cells in the same order.
    pub fn add_set(
        &mut self,
        var: VarRef,
        id: &str,
        func: MemberFunc,
        auto_unique: bool,
    ) -> Result<usize> {
        self.checked(|m| match var {
            VarRef::Output => {
                let grid = m.grid;
                let out = m.output.as_mut().ok_or(FuzzyError::NoOutputVariable)?;
                out.add_set(id, func, auto_unique, grid)
            }
            VarRef::Input(var_idx) => {
                if var_idx >= m.inputs.len() {
                    return Err(FuzzyError::UnknownHandle(format!(
                        "input variable index {var_idx} out of range"
                    )));
                }

                let new_position = m.inputs[var_idx].add_set(id, func, auto_unique)?;
                m.recompute_strides();
                let old_cells = m.rules.take_cells();

                let new_size = m.rule_capacity();
                let mut new_cells = vec![None; new_size];

                if !old_cells.is_empty() {
                    let weights = m.input_strides();
                    let mut old_cursor = 0usize;
                    for (new_index, cell) in new_cells.iter_mut().enumerate() {
                        let components = rules::decode(new_index, &weights);
                        if components[var_idx] == new_position {
                            continue;
                        }
                        *cell = old_cells[old_cursor];
                        old_cursor += 1;
                    }
                }

                m.rules.replace(new_cells);
                tracing::debug!(var_idx, new_position, "input_set_added");
                Ok(new_position)
            }
        })
    }

    /// Delete a set from a variable.
    ///
    /// Input side: the dual of [`Model::add_set`] - walk the old table and
    /// keep every cell whose decoded component does not name the deleted
    /// set. Output side: cells naming the deleted position become "no rule"
    /// and cells past it shift down by one.
    pub fn delete_set(&mut self, var: VarRef, position: usize) -> Result<()> {
        self.checked(|m| match var {
            VarRef::Output => {
                let out = m.output.as_mut().ok_or(FuzzyError::NoOutputVariable)?;
                out.base_mut().delete_set(position)?;
                for index in 0..m.rules.len() {
                    match m.rules.get(index) {
                        Some(p) if p == position => m.rules.set(index, None),
                        Some(p) if p > position => m.rules.set(index, Some(p - 1)),
                        _ => {}
                    }
                }
                Ok(())
            }
            VarRef::Input(var_idx) => {
                if var_idx >= m.inputs.len() {
                    return Err(FuzzyError::UnknownHandle(format!(
                        "input variable index {var_idx} out of range"
                    )));
                }
                if position >= m.inputs[var_idx].num_sets() {
                    return Err(FuzzyError::UnknownHandle(format!(
                        "set position {position} out of range"
                    )));
                }

                let old_weights = m.input_strides();
                let old_cells = m.rules.take_cells();

                let mut new_cells =
                    Vec::with_capacity(old_cells.len() / m.inputs[var_idx].num_sets().max(1));
                for (old_index, cell) in old_cells.iter().enumerate() {
                    let components = rules::decode(old_index, &old_weights);
                    if components[var_idx] == position {
                        continue;
                    }
                    new_cells.push(*cell);
                }

                m.inputs[var_idx].delete_set(position)?;
                m.rules.replace(new_cells);
                m.recompute_strides();
                tracing::debug!(var_idx, position, "input_set_deleted");
                Ok(())
            }
        })
    }

    /// Rename a set within a variable.
    pub fn rename_set(&mut self, var: VarRef, position: usize, id: &str) -> Result<()> {
        self.checked(|m| match var {
            VarRef::Output => m
                .output
                .as_mut()
                .ok_or(FuzzyError::NoOutputVariable)?
                .base_mut()
                .rename_set(position, id),
            VarRef::Input(i) => m
                .inputs
                .get_mut(i)
                .ok_or_else(|| {
                    FuzzyError::UnknownHandle(format!("input variable index {i} out of range"))
                })?
                .rename_set(position, id),
        })
    }

    /// Ramp a set against a domain edge. Output-set curves feed the defuzz
    /// tables, so those are refreshed.
    pub fn set_ramp(&mut self, var: VarRef, position: usize, ramp: Ramp) -> Result<()> {
        self.checked(|m| {
            let grid = m.grid;
            match var {
                VarRef::Output => {
                    let out = m.output.as_mut().ok_or(FuzzyError::NoOutputVariable)?;
                    out.base_mut().set_ramp(position, ramp, grid)?;
                    out.refresh_defuzz(grid);
                    Ok(())
                }
                VarRef::Input(i) => m
                    .inputs
                    .get_mut(i)
                    .ok_or_else(|| {
                        FuzzyError::UnknownHandle(format!("input variable index {i} out of range"))
                    })?
                    .set_ramp(position, ramp, grid),
            }
        })
    }

    /// Move one node of a set's curve. Output-set tables are refreshed.
    pub fn move_node(
        &mut self,
        var: VarRef,
        position: usize,
        node_idx: usize,
        x: usize,
        y: crate::grid::Dom,
    ) -> Result<()> {
        self.checked(|m| {
            let grid = m.grid;
            match var {
                VarRef::Output => {
                    let out = m.output.as_mut().ok_or(FuzzyError::NoOutputVariable)?;
                    let set = out.base_mut().set_mut(position).ok_or_else(|| {
                        FuzzyError::UnknownHandle(format!("set position {position} out of range"))
                    })?;
                    set.func_mut().set_node(node_idx, x, y, grid)?;
                    out.refresh_defuzz(grid);
                    Ok(())
                }
                VarRef::Input(i) => {
                    let set = m
                        .inputs
                        .get_mut(i)
                        .ok_or_else(|| {
                            FuzzyError::UnknownHandle(format!(
                                "input variable index {i} out of range"
                            ))
                        })?
                        .set_mut(position)
                        .ok_or_else(|| {
                            FuzzyError::UnknownHandle(format!(
                                "set position {position} out of range"
                            ))
                        })?;
                    set.func_mut().set_node(node_idx, x, y, grid)
                }
            }
        })
    }

    // === Rule management ===

    /// Write one rule cell. The index must be in range.
    pub fn add_rule(&mut self, index: usize, output_set: usize) -> Result<()> {
        self.checked(|m| {
            let out = m.output.as_ref().ok_or(FuzzyError::NoOutputVariable)?;
            if index >= m.rules.len() {
                return Err(FuzzyError::UnknownHandle(format!(
                    "rule index {index} out of range"
                )));
            }
            if output_set >= out.num_sets() {
                return Err(FuzzyError::UnknownHandle(format!(
                    "output set position {output_set} out of range"
                )));
            }
            m.rules.set(index, Some(output_set));
            Ok(())
        })
    }

    /// Blank one rule cell.
    pub fn remove_rule(&mut self, index: usize) {
        self.rules.set(index, None);
    }

    /// Blank the whole table.
    pub fn clear_rules(&mut self) {
        self.rules.clear();
    }

    /// True when not a single rule is defined.
    pub fn no_rules(&self) -> bool {
        self.rules.no_rules()
    }

    /// Decode a linear rule index into per-variable set positions.
    pub fn rule_components(&self, index: usize) -> Vec<usize> {
        rules::decode(index, &self.input_strides())
    }

    // === Output methods ===

    pub fn set_composition(&mut self, op: CompositionOp) -> Result<()> {
        self.checked(|m| {
            m.output
                .as_mut()
                .ok_or(FuzzyError::NoOutputVariable)?
                .set_composition(op);
            Ok(())
        })
    }

    pub fn set_defuzz_method(&mut self, method: DefuzzMethod) -> Result<()> {
        self.checked(|m| {
            let grid = m.grid;
            m.output
                .as_mut()
                .ok_or(FuzzyError::NoOutputVariable)?
                .set_defuzz_method(method, grid);
            Ok(())
        })
    }

    // === Internals ===

    /// Run `op`, mirroring any error into the message slot on the way out.
    fn checked<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        match op(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.record(&err);
                Err(err)
            }
        }
    }

    fn taken_var_ids(&self) -> Vec<String> {
        let mut taken: Vec<String> = self.inputs.iter().map(|v| v.id().to_string()).collect();
        if let Some(out) = &self.output {
            taken.push(out.id().to_string());
        }
        taken
    }

    /// Product of the input set counts: the rule-table size.
    fn rule_capacity(&self) -> usize {
        if self.inputs.is_empty() {
            return 0;
        }
        self.inputs.iter().map(Variable::num_sets).product()
    }

    /// Current per-variable radix weights.
    pub(crate) fn input_strides(&self) -> Vec<usize> {
        let radices: Vec<usize> = self.inputs.iter().map(Variable::num_sets).collect();
        rules::strides(&radices)
    }

    /// Refresh every variable's stride and every set's cached rule stride.
    fn recompute_strides(&mut self) {
        let weights = self.input_strides();
        for (var, weight) in self.inputs.iter_mut().zip(weights) {
            var.set_stride(weight);
        }
    }
}
