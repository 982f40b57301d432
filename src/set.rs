//! Fuzzy Sets (Terms)
//!
//! A set is a named membership function attached to a variable, plus two
//! cached values that exist purely to make inference cheap: its ordinal
//! `position` within the variable and its `rule_stride`, the set's additive
//! contribution to a linear rule index (`position * variable stride`).
//! Output sets additionally carry their precomputed defuzzification tables.

use crate::curve::MemberFunc;
use crate::defuzz::DefuzzTables;
use crate::grid::Dom;

/// A named term of a variable.
#[derive(Debug, Clone)]
pub struct FuzzySet {
    id: String,
    position: usize,
    rule_stride: usize,
    func: MemberFunc,
    /// Present on output sets only; rebuilt whenever the curve, the domain
    /// map, or the defuzzification method changes.
    defuzz: Option<DefuzzTables>,
}

impl FuzzySet {
    pub fn new(id: impl Into<String>, position: usize, func: MemberFunc) -> Self {
        FuzzySet {
            id: id.into(),
            position,
            rule_stride: 0,
            func,
            defuzz: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Ordinal of this set within its variable.
    pub fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Additive contribution of this set to a linear rule index.
    pub fn rule_stride(&self) -> usize {
        self.rule_stride
    }

    pub(crate) fn set_rule_stride(&mut self, stride: usize) {
        self.rule_stride = stride;
    }

    pub fn func(&self) -> &MemberFunc {
        &self.func
    }

    pub(crate) fn func_mut(&mut self) -> &mut MemberFunc {
        &mut self.func
    }

    /// Membership degree of grid column `idx` in this set.
    pub fn dom_at(&self, idx: usize) -> Dom {
        self.func.dom_at(idx)
    }

    pub fn defuzz(&self) -> Option<&DefuzzTables> {
        self.defuzz.as_ref()
    }

    pub(crate) fn set_defuzz(&mut self, tables: Option<DefuzzTables>) {
        self.defuzz = tables;
    }
}
