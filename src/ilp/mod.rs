//! Solver-agnostic integer linear program.
//!
//! The formulation builds an `IlpModel` (maximization) and hands it to an
//! `IlpBackend`. Variables are addressed by dense `Var` indices, so an
//! assignment is a plain `Vec<f64>` indexed by `Var::index`.

mod microlp_backend;

pub use microlp_backend::MicroLpBackend;

use std::collections::BTreeMap;
use std::time::Duration;

/// Tolerance used when checking assignments and constant constraints.
pub const EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(usize);

impl Var {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Binary,
    Integer { lo: i64, hi: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarDef {
    pub kind: VarKind,
    /// Objective coefficient.
    pub obj: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinExpr {
    pub terms: Vec<(Var, f64)>,
}

impl LinExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sum<I: IntoIterator<Item = Var>>(vars: I) -> Self {
        Self {
            terms: vars.into_iter().map(|v| (v, 1.0)).collect(),
        }
    }

    pub fn add(&mut self, var: Var, coef: f64) -> &mut Self {
        self.terms.push((var, coef));
        self
    }

    pub fn with(mut self, var: Var, coef: f64) -> Self {
        self.terms.push((var, coef));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Merge repeated variables and drop zero coefficients. Terms come out sorted by variable.
    pub fn normalized(&self) -> LinExpr {
        let mut merged: BTreeMap<Var, f64> = BTreeMap::new();
        for &(v, c) in &self.terms {
            *merged.entry(v).or_insert(0.0) += c;
        }
        LinExpr {
            terms: merged.into_iter().filter(|&(_, c)| c != 0.0).collect(),
        }
    }

    pub fn eval(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|&(v, c)| c * values[v.index()]).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Le,
    Ge,
    Eq,
}

impl Cmp {
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Cmp::Le => lhs <= rhs + EPS,
            Cmp::Ge => lhs >= rhs - EPS,
            Cmp::Eq => (lhs - rhs).abs() <= EPS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Constraint family, used for size reporting.
    pub tag: &'static str,
    pub expr: LinExpr,
    pub cmp: Cmp,
    pub rhs: f64,
}

/// A maximization problem over binary and bounded integer variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IlpModel {
    pub vars: Vec<VarDef>,
    pub constraints: Vec<Constraint>,
}

impl IlpModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_binary(&mut self, obj: f64) -> Var {
        self.vars.push(VarDef {
            kind: VarKind::Binary,
            obj,
        });
        Var(self.vars.len() - 1)
    }

    pub fn add_integer(&mut self, lo: i64, hi: i64, obj: f64) -> Var {
        self.vars.push(VarDef {
            kind: VarKind::Integer { lo, hi },
            obj,
        });
        Var(self.vars.len() - 1)
    }

    pub fn add_constraint(&mut self, tag: &'static str, expr: LinExpr, cmp: Cmp, rhs: f64) {
        self.constraints.push(Constraint {
            tag,
            expr,
            cmp,
            rhs,
        });
    }

    pub fn n_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn n_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn objective(&self, values: &[f64]) -> f64 {
        self.vars.iter().zip(values).map(|(d, v)| d.obj * v).sum()
    }

    /// Index of the first constraint violated by `values`, `None` when all hold.
    /// Variable bounds are not checked.
    pub fn first_violation(&self, values: &[f64]) -> Option<usize> {
        if values.len() != self.vars.len() {
            return Some(0);
        }
        self.constraints
            .iter()
            .position(|c| !c.cmp.holds(c.expr.eval(values), c.rhs))
    }

    /// Constraints without variables decide nothing but feasibility.
    /// Returns the tag of the first such constraint that can never hold.
    pub fn constant_violation(&self) -> Option<&'static str> {
        self.constraints
            .iter()
            .find(|c| c.expr.normalized().is_empty() && !c.cmp.holds(0.0, c.rhs))
            .map(|c| c.tag)
    }

    /// Constraint counts per family.
    pub fn family_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for c in &self.constraints {
            *counts.entry(c.tag).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Optimal(Vec<f64>),
    /// Stopped at the time limit holding a feasible incumbent.
    TimeLimitFeasible(Vec<f64>),
    Infeasible,
    Error(String),
}

impl SolveOutcome {
    pub fn assignment(&self) -> Option<&[f64]> {
        match self {
            SolveOutcome::Optimal(v) | SolveOutcome::TimeLimitFeasible(v) => Some(v),
            _ => None,
        }
    }
}

pub trait IlpBackend {
    fn name(&self) -> &'static str;

    fn solve(&self, model: &IlpModel, time_limit: Duration) -> SolveOutcome;
}
