//! Defuzzification
//!
//! Two interchangeable methods turn the per-output-set activation array into
//! one crisp value. Both front-load their work into per-set lookup tables so
//! that the per-query cost is proportional to the number of output sets, not
//! the grid width:
//!
//! - **Center of Gravity** precomputes, for every DOM level `d`, the area
//!   and moment of the set's curve clipped at height `d`. At query time the
//!   clipped areas/moments of the active sets are summed and the output is
//!   `left_x + moment_sum / area_sum`.
//! - **Mean of Maximum** precomputes the x-value midway between the first
//!   and last node sharing the set's maximum y. At query time the set with
//!   the highest activation wins (ties break toward the lowest position).

use crate::curve::MemberFunc;
use crate::grid::{Dom, DomainMap, GridSpec};

/// Defuzzification strategy of an output variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefuzzMethod {
    /// Center of Gravity (FCL `CoG`)
    #[default]
    Cog,
    /// Mean of Maximum (FCL `MoM`, an extension to the IEC set)
    Mom,
}

/// Operation combining activations across rules that share an output set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositionOp {
    /// t-norm, FCL `ACCU : BSUM`
    Min,
    /// s-norm, FCL `ACCU : MAX`
    #[default]
    Max,
}

/// Per-set precomputed defuzzification tables.
#[derive(Debug, Clone, PartialEq)]
pub enum DefuzzTables {
    Cog {
        /// `area[d]` = clipped area of the curve at DOM level `d`, in
        /// DOM-index units summed over the set's support
        area: Vec<f64>,
        /// `moment[d]` = clipped moment about the variable's left edge, in
        /// variable units (the grid step is folded in)
        moment: Vec<f64>,
    },
    Mom {
        /// Midpoint of the maximum plateau, in variable units
        mean: f64,
    },
}

impl DefuzzTables {
    /// Build the lookup tables for one output set.
    pub fn build(method: DefuzzMethod, func: &MemberFunc, map: &DomainMap, grid: GridSpec) -> Self {
        match method {
            DefuzzMethod::Cog => build_cog(func, map, grid),
            DefuzzMethod::Mom => build_mom(func, map),
        }
    }

    pub fn method(&self) -> DefuzzMethod {
        match self {
            DefuzzTables::Cog { .. } => DefuzzMethod::Cog,
            DefuzzTables::Mom { .. } => DefuzzMethod::Mom,
        }
    }
}

/// Clip the curve at every DOM level and tabulate area and moment.
///
/// Each grid column inside the support is treated as a point mass whose
/// height is `min(samples[i], d)`. The moment picks up one multiplication
/// by the grid step at the end rather than one per column.
fn build_cog(func: &MemberFunc, map: &DomainMap, grid: GridSpec) -> DefuzzTables {
    let start = func.start_x();
    let end = func.end_x().min(grid.x_max());
    let step = map.step();

    let mut area = Vec::with_capacity(grid.y_count);
    let mut moment = Vec::with_capacity(grid.y_count);

    for level in 0..grid.y_count {
        let level = level as Dom;
        let mut area_sum = 0.0f64;
        let mut moment_sum = 0.0f64;

        for x in start..=end {
            let clipped = f64::from(func.dom_at(x).min(level));
            area_sum += clipped;
            moment_sum += x as f64 * clipped;
        }

        area.push(area_sum);
        moment.push(moment_sum * step);
    }

    DefuzzTables::Cog { area, moment }
}

/// Find the first and last node sharing the curve's maximum y and store the
/// midpoint in variable units.
fn build_mom(func: &MemberFunc, map: &DomainMap) -> DefuzzTables {
    let max_y = func.nodes().iter().map(|n| n.y).max().unwrap_or(0);

    let mut first_x = None;
    let mut last_x = 0usize;
    for node in func.nodes() {
        if node.y == max_y {
            if first_x.is_none() {
                first_x = Some(node.x);
            }
            last_x = node.x;
        }
    }
    let first_x = first_x.unwrap_or(0);

    let mid = first_x as f64 + (last_x - first_x) as f64 / 2.0;
    DefuzzTables::Mom {
        mean: map.left_x() + mid * map.step(),
    }
}

/// Aggregate the active output sets into one crisp value.
///
/// `sets` pairs each output set's tables with its aggregated DOM. Returns
/// `None` when no output set is active.
pub fn defuzzify<'a, I>(method: DefuzzMethod, left_x: f64, sets: I) -> Option<f64>
where
    I: Iterator<Item = (&'a DefuzzTables, Dom)>,
{
    match method {
        DefuzzMethod::Cog => {
            let mut area_sum = 0.0f64;
            let mut moment_sum = 0.0f64;
            for (tables, dom) in sets {
                if let DefuzzTables::Cog { area, moment } = tables {
                    let level = (dom as usize).min(area.len() - 1);
                    if area[level] > 0.0 {
                        area_sum += area[level];
                        moment_sum += moment[level];
                    }
                }
            }
            if area_sum == 0.0 {
                None
            } else {
                Some(left_x + moment_sum / area_sum)
            }
        }
        DefuzzMethod::Mom => {
            let mut best_dom: Dom = 0;
            let mut winner: Option<&DefuzzTables> = None;
            for (tables, dom) in sets {
                // strict comparison: the lowest-positioned set wins ties
                if dom > best_dom {
                    best_dom = dom;
                    winner = Some(tables);
                }
            }
            match winner {
                Some(DefuzzTables::Mom { mean }) => Some(*mean),
                _ => None,
            }
        }
    }
}
