//! Fuzzy Variables
//!
//! A variable is an ordered collection of sets over a continuous domain.
//! Input variables carry a per-variable rule stride so the evaluator can
//! accumulate rule indices by integer addition; the output variable
//! additionally owns the defuzzification method and the composition op.
//!
//! Identifier policy: set ids are unique within their variable and variable
//! ids within their model, both case-insensitively. When auto-uniquing is
//! enabled a colliding id gets "Copy of " prepended (repeatedly, with a
//! counter suffix once a plain prefix no longer helps) until it is unique.

use crate::curve::{MemberFunc, Ramp};
use crate::defuzz::{CompositionOp, DefuzzMethod, DefuzzTables};
use crate::error::{FuzzyError, Result};
use crate::grid::{Dom, DomainMap, GridSpec};
use crate::set::FuzzySet;

/// Derive a unique identifier from `wanted` given the taken ids.
///
/// Comparison is case-insensitive. Returns `NonUniqueId` when auto-uniquing
/// is disabled and the id is taken.
pub(crate) fn unique_id(wanted: &str, taken: &[String], auto_unique: bool) -> Result<String> {
    let collides =
        |candidate: &str| taken.iter().any(|t| t.eq_ignore_ascii_case(candidate));

    if !collides(wanted) {
        return Ok(wanted.to_string());
    }
    if !auto_unique {
        return Err(FuzzyError::NonUniqueId(wanted.to_string()));
    }

    let mut candidate = format!("Copy of {wanted}");
    let mut counter = 2usize;
    while collides(&candidate) {
        candidate = format!("Copy of {wanted} {counter}");
        counter += 1;
    }
    Ok(candidate)
}

/// A fuzzy variable: named domain plus ordered sets.
#[derive(Debug, Clone)]
pub struct Variable {
    id: String,
    map: DomainMap,
    sets: Vec<FuzzySet>,
    /// Position of this variable within the model
    index: usize,
    /// Product of the set counts of all later input variables; the radix
    /// weight of this variable in a linear rule index
    stride: usize,
}

impl Variable {
    pub fn new(
        id: impl Into<String>,
        left_x: f64,
        right_x: f64,
        grid: GridSpec,
    ) -> Result<Self> {
        Ok(Variable {
            id: id.into(),
            map: DomainMap::new(left_x, right_x, grid.x_count)?,
            sets: Vec::new(),
            index: 0,
            stride: 1,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn map(&self) -> &DomainMap {
        &self.map
    }

    pub(crate) fn map_mut(&mut self) -> &mut DomainMap {
        &mut self.map
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Refresh this variable's stride and every set's cached rule stride.
    pub(crate) fn set_stride(&mut self, stride: usize) {
        self.stride = stride;
        for (position, set) in self.sets.iter_mut().enumerate() {
            set.set_rule_stride(position * stride);
        }
    }

    pub fn num_sets(&self) -> usize {
        self.sets.len()
    }

    pub fn sets(&self) -> &[FuzzySet] {
        &self.sets
    }

    pub fn set(&self, position: usize) -> Option<&FuzzySet> {
        self.sets.get(position)
    }

    pub(crate) fn set_mut(&mut self, position: usize) -> Option<&mut FuzzySet> {
        self.sets.get_mut(position)
    }

    /// Find a set by id, case-insensitively.
    pub fn find_set(&self, id: &str) -> Option<&FuzzySet> {
        self.sets.iter().find(|s| s.id().eq_ignore_ascii_case(id))
    }

    /// Membership degree of grid column `idx` in the set at `position`.
    pub fn dom_at(&self, position: usize, idx: usize) -> Dom {
        self.sets.get(position).map_or(0, |s| s.dom_at(idx))
    }

    /// Append a set built from `func`, auto-uniquing the id if asked.
    /// Returns the new set's position.
    pub(crate) fn add_set(
        &mut self,
        id: &str,
        func: MemberFunc,
        auto_unique: bool,
    ) -> Result<usize> {
        let taken: Vec<String> = self.sets.iter().map(|s| s.id().to_string()).collect();
        let id = unique_id(id, &taken, auto_unique)?;

        let position = self.sets.len();
        self.sets.push(FuzzySet::new(id, position, func));
        Ok(position)
    }

    /// Remove the set at `position`, shifting later positions down.
    pub(crate) fn delete_set(&mut self, position: usize) -> Result<()> {
        if position >= self.sets.len() {
            return Err(FuzzyError::UnknownHandle(format!(
                "set position {position} out of range for variable '{}'",
                self.id
            )));
        }
        self.sets.remove(position);
        for (new_position, set) in self.sets.iter_mut().enumerate().skip(position) {
            set.set_position(new_position);
        }
        Ok(())
    }

    /// Rename the set at `position`, enforcing uniqueness.
    pub(crate) fn rename_set(&mut self, position: usize, id: &str) -> Result<()> {
        if position >= self.sets.len() {
            return Err(FuzzyError::UnknownHandle(format!(
                "set position {position} out of range for variable '{}'",
                self.id
            )));
        }
        let taken: Vec<String> = self
            .sets
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != position)
            .map(|(_, s)| s.id().to_string())
            .collect();
        let id = unique_id(id, &taken, false)?;
        self.sets[position].set_id(id);
        Ok(())
    }

    /// Ramp the set at `position` against a domain edge and re-rasterize.
    pub(crate) fn set_ramp(&mut self, position: usize, ramp: Ramp, grid: GridSpec) -> Result<()> {
        let set = self.sets.get_mut(position).ok_or_else(|| {
            FuzzyError::UnknownHandle(format!("set position {position} out of range"))
        })?;
        set.func_mut().set_ramp(ramp, grid);
        Ok(())
    }
}

/// The output variable: a variable plus defuzzification strategy and
/// composition op. Each of its sets carries precomputed defuzz tables.
#[derive(Debug, Clone)]
pub struct OutputVariable {
    base: Variable,
    defuzz_method: DefuzzMethod,
    composition: CompositionOp,
}

impl OutputVariable {
    pub fn new(
        id: impl Into<String>,
        left_x: f64,
        right_x: f64,
        grid: GridSpec,
    ) -> Result<Self> {
        Ok(OutputVariable {
            base: Variable::new(id, left_x, right_x, grid)?,
            defuzz_method: DefuzzMethod::default(),
            composition: CompositionOp::default(),
        })
    }

    pub fn base(&self) -> &Variable {
        &self.base
    }

    pub(crate) fn base_mut(&mut self) -> &mut Variable {
        &mut self.base
    }

    pub fn id(&self) -> &str {
        self.base.id()
    }

    pub fn map(&self) -> &DomainMap {
        self.base.map()
    }

    pub fn num_sets(&self) -> usize {
        self.base.num_sets()
    }

    pub fn sets(&self) -> &[FuzzySet] {
        self.base.sets()
    }

    pub fn find_set(&self, id: &str) -> Option<&FuzzySet> {
        self.base.find_set(id)
    }

    pub fn defuzz_method(&self) -> DefuzzMethod {
        self.defuzz_method
    }

    pub fn composition(&self) -> CompositionOp {
        self.composition
    }

    pub(crate) fn set_composition(&mut self, op: CompositionOp) {
        self.composition = op;
    }

    /// Switch the defuzzification method and rebuild every set's tables.
    pub(crate) fn set_defuzz_method(&mut self, method: DefuzzMethod, grid: GridSpec) {
        self.defuzz_method = method;
        self.refresh_defuzz(grid);
    }

    /// Rebuild the defuzzification tables of every set. Called whenever a
    /// curve, the domain map, or the method changes.
    pub(crate) fn refresh_defuzz(&mut self, grid: GridSpec) {
        let method = self.defuzz_method;
        let map = *self.base.map();
        for set in &mut self.base.sets {
            let tables = DefuzzTables::build(method, set.func(), &map, grid);
            set.set_defuzz(Some(tables));
        }
    }

    /// Append a set and build its defuzz tables. Returns the new position.
    pub(crate) fn add_set(
        &mut self,
        id: &str,
        func: MemberFunc,
        auto_unique: bool,
        grid: GridSpec,
    ) -> Result<usize> {
        let position = self.base.add_set(id, func, auto_unique)?;
        let tables = DefuzzTables::build(
            self.defuzz_method,
            self.base.sets[position].func(),
            self.base.map(),
            grid,
        );
        self.base.sets[position].set_defuzz(Some(tables));
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{Node, Shape};

    fn grid() -> GridSpec {
        GridSpec::default()
    }

    fn tri() -> MemberFunc {
        MemberFunc::new(
            Shape::Triangle,
            &[
                Node { x: 0, y: 0 },
                Node { x: 100, y: 0 },
                Node { x: 200, y: 0 },
            ],
            grid(),
        )
        .unwrap()
    }

    #[test]
    fn test_add_and_find_sets() {
        let mut var = Variable::new("Health", 0.0, 100.0, grid()).unwrap();
        assert_eq!(var.add_set("Low", tri(), false).unwrap(), 0);
        assert_eq!(var.add_set("High", tri(), false).unwrap(), 1);

        assert_eq!(var.num_sets(), 2);
        assert_eq!(var.find_set("low").unwrap().position(), 0);
        assert_eq!(var.find_set("HIGH").unwrap().position(), 1);
        assert!(var.find_set("Medium").is_none());
    }

    #[test]
    fn test_duplicate_set_id_rejected_case_insensitively() {
        let mut var = Variable::new("Health", 0.0, 100.0, grid()).unwrap();
        var.add_set("Low", tri(), false).unwrap();
        let err = var.add_set("low", tri(), false);
        assert!(matches!(err, Err(FuzzyError::NonUniqueId(_))));
    }

    #[test]
    fn test_auto_unique_prepends_copy_of() {
        let mut var = Variable::new("Health", 0.0, 100.0, grid()).unwrap();
        var.add_set("Low", tri(), true).unwrap();
        var.add_set("Low", tri(), true).unwrap();
        var.add_set("Low", tri(), true).unwrap();

        let ids: Vec<&str> = var.sets().iter().map(FuzzySet::id).collect();
        assert_eq!(ids, vec!["Low", "Copy of Low", "Copy of Low 2"]);
    }

    #[test]
    fn test_delete_set_shifts_positions() {
        let mut var = Variable::new("Health", 0.0, 100.0, grid()).unwrap();
        var.add_set("A", tri(), false).unwrap();
        var.add_set("B", tri(), false).unwrap();
        var.add_set("C", tri(), false).unwrap();

        var.delete_set(1).unwrap();
        let ids: Vec<&str> = var.sets().iter().map(FuzzySet::id).collect();
        assert_eq!(ids, vec!["A", "C"]);
        assert_eq!(var.find_set("C").unwrap().position(), 1);
    }

    #[test]
    fn test_rename_set_enforces_uniqueness() {
        let mut var = Variable::new("Health", 0.0, 100.0, grid()).unwrap();
        var.add_set("A", tri(), false).unwrap();
        var.add_set("B", tri(), false).unwrap();

        assert!(var.rename_set(1, "a").is_err());
        var.rename_set(1, "Better").unwrap();
        assert_eq!(var.sets()[1].id(), "Better");
        // renaming a set to its own name class is still a collision with
        // others only, not itself
        var.rename_set(0, "A").unwrap();
    }

    #[test]
    fn test_stride_propagates_to_sets() {
        let mut var = Variable::new("Health", 0.0, 100.0, grid()).unwrap();
        var.add_set("A", tri(), false).unwrap();
        var.add_set("B", tri(), false).unwrap();
        var.add_set("C", tri(), false).unwrap();

        var.set_stride(4);
        let strides: Vec<usize> = var.sets().iter().map(FuzzySet::rule_stride).collect();
        assert_eq!(strides, vec![0, 4, 8]);
    }

    #[test]
    fn test_output_variable_builds_defuzz_tables() {
        let mut out = OutputVariable::new("Aggressiveness", 0.0, 4.0, grid()).unwrap();
        out.add_set(
            "Run_Away",
            MemberFunc::new(Shape::Singleton, &[Node { x: 50, y: 0 }], grid()).unwrap(),
            false,
            grid(),
        )
        .unwrap();

        assert!(out.sets()[0].defuzz().is_some());
        assert_eq!(
            out.sets()[0].defuzz().unwrap().method(),
            DefuzzMethod::Cog
        );

        out.set_defuzz_method(DefuzzMethod::Mom, grid());
        assert_eq!(
            out.sets()[0].defuzz().unwrap().method(),
            DefuzzMethod::Mom
        );
    }
}
