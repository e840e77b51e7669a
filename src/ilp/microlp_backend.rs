use super::{Cmp, IlpBackend, IlpModel, SolveOutcome, VarKind, EPS};
use microlp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem, Solution, Variable};
use std::time::{Duration, Instant};

/// Depth-first branch-and-bound over `microlp` LP relaxations.
///
/// Every node is one relaxation solved on the calling thread. The time limit
/// and the optional node limit are checked between nodes; a search stopped by
/// either returns the best integral assignment found so far.
#[derive(Debug, Default, Clone, Copy)]
pub struct MicroLpBackend {
    /// Stop after this many relaxations.
    pub node_limit: Option<usize>,
}

/// Bound added to one variable on the way down the tree.
#[derive(Debug, Clone, Copy)]
struct Branch {
    var: usize,
    cmp: Cmp,
    rhs: f64,
}

/// Relaxation of `model`: every variable continuous within its bounds.
fn build_problem(model: &IlpModel) -> (Problem, Vec<Variable>) {
    let mut problem = Problem::new(OptimizationDirection::Maximize);
    let vars: Vec<Variable> = model
        .vars
        .iter()
        .map(|def| match def.kind {
            VarKind::Binary => problem.add_var(def.obj, (0.0, 1.0)),
            VarKind::Integer { lo, hi } => problem.add_var(def.obj, (lo as f64, hi as f64)),
        })
        .collect();

    for c in &model.constraints {
        let normalized = c.expr.normalized();
        if normalized.is_empty() {
            continue;
        }
        let mut expr = LinearExpr::empty();
        for &(v, coef) in &normalized.terms {
            expr.add(vars[v.index()], coef);
        }
        problem.add_constraint(expr, comparison(c.cmp), c.rhs);
    }

    (problem, vars)
}

fn comparison(cmp: Cmp) -> ComparisonOp {
    match cmp {
        Cmp::Le => ComparisonOp::Le,
        Cmp::Ge => ComparisonOp::Ge,
        Cmp::Eq => ComparisonOp::Eq,
    }
}

fn apply(node: Solution, vars: &[Variable], b: Branch) -> Result<Solution, microlp::Error> {
    let mut expr = LinearExpr::empty();
    expr.add(vars[b.var], 1.0);
    node.add_constraint(expr, comparison(b.cmp), b.rhs)
}

/// The variable furthest from an integer, with its value.
fn most_fractional(node: &Solution, vars: &[Variable]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64, f64)> = None;
    for (i, &v) in vars.iter().enumerate() {
        let value = node[v];
        let frac = value - value.floor();
        let dist = frac.min(1.0 - frac);
        if dist > EPS && best.is_none_or(|(_, _, d)| dist > d) {
            best = Some((i, value, dist));
        }
    }
    best.map(|(i, value, _)| (i, value))
}

struct Search<'a> {
    vars: &'a [Variable],
    deadline: Option<Instant>,
    node_limit: usize,
    nodes: usize,
    /// With integer objective coefficients a bound can be rounded down.
    integral_objective: bool,
    incumbent: Option<(f64, Vec<f64>)>,
}

impl Search<'_> {
    fn exhausted(&self) -> bool {
        self.nodes >= self.node_limit || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn prunes(&self, bound: f64) -> bool {
        let Some((best, _)) = &self.incumbent else {
            return false;
        };
        let bound = if self.integral_objective { (bound + EPS).floor() } else { bound };
        bound <= best + EPS
    }

    fn offer(&mut self, node: &Solution) {
        if self.prunes(node.objective()) {
            return;
        }
        let values = self.vars.iter().map(|&v| node[v].round()).collect();
        self.incumbent = Some((node.objective(), values));
    }

    /// Run until the tree is exhausted or a limit stops it. `Ok(true)` means stopped early.
    fn run(&mut self, root: &Solution) -> Result<bool, microlp::Error> {
        let mut pending: Vec<Vec<Branch>> = vec![Vec::new()];

        while let Some(mut branches) = pending.pop() {
            if self.exhausted() {
                return Ok(true);
            }
            let mut node = root.clone();
            if !branches.is_empty() {
                self.nodes += 1;
                let mut replayed = Ok(node);
                for &b in &branches {
                    replayed = replayed.and_then(|n| apply(n, self.vars, b));
                }
                node = match replayed {
                    Ok(n) => n,
                    Err(microlp::Error::Infeasible) => continue,
                    Err(e) => return Err(e),
                };
            }

            // Dive, leaving the other side of every branch for later.
            loop {
                if self.prunes(node.objective()) {
                    break;
                }
                let Some((var, value)) = most_fractional(&node, self.vars) else {
                    self.offer(&node);
                    break;
                };
                if self.exhausted() {
                    return Ok(true);
                }
                let floor = value.floor();
                let down = Branch { var, cmp: Cmp::Le, rhs: floor };
                let up = Branch { var, cmp: Cmp::Ge, rhs: floor + 1.0 };
                let (first, second) = if value - floor >= 0.5 { (up, down) } else { (down, up) };

                let mut sibling = branches.clone();
                sibling.push(second);
                pending.push(sibling);
                branches.push(first);

                self.nodes += 1;
                node = match apply(node, self.vars, first) {
                    Ok(n) => n,
                    Err(microlp::Error::Infeasible) => break,
                    Err(e) => return Err(e),
                };
            }
        }
        Ok(false)
    }
}

impl IlpBackend for MicroLpBackend {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(&self, model: &IlpModel, time_limit: Duration) -> SolveOutcome {
        if let Some(tag) = model.constant_violation() {
            log::debug!("microlp: constant {} constraint can never hold", tag);
            return SolveOutcome::Infeasible;
        }
        if model.n_vars() == 0 {
            return SolveOutcome::Optimal(Vec::new());
        }

        let start = Instant::now();
        let (problem, vars) = build_problem(model);
        let root = match problem.solve() {
            Ok(root) => root,
            Err(microlp::Error::Infeasible) => return SolveOutcome::Infeasible,
            Err(e) => return SolveOutcome::Error(e.to_string()),
        };

        let mut search = Search {
            vars: &vars,
            deadline: start.checked_add(time_limit),
            node_limit: self.node_limit.unwrap_or(usize::MAX),
            nodes: 1,
            integral_objective: model.vars.iter().all(|d| d.obj.fract() == 0.0),
            incumbent: None,
        };
        let stopped = match search.run(&root) {
            Ok(stopped) => stopped,
            Err(e) => return SolveOutcome::Error(e.to_string()),
        };
        log::debug!(
            "microlp: {} nodes in {:.3}s{}",
            search.nodes,
            start.elapsed().as_secs_f64(),
            if stopped { ", stopped at the limit" } else { "" }
        );

        match (search.incumbent, stopped) {
            (Some((_, values)), false) => SolveOutcome::Optimal(values),
            (Some((_, values)), true) => SolveOutcome::TimeLimitFeasible(values),
            (None, false) => SolveOutcome::Infeasible,
            (None, true) => SolveOutcome::Error(format!(
                "limit reached after {} nodes and {:.1}s without an incumbent",
                search.nodes,
                start.elapsed().as_secs_f64()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ilp::LinExpr;

    fn solve(model: &IlpModel) -> SolveOutcome {
        MicroLpBackend::default().solve(model, Duration::from_secs(10))
    }

    /// max 5a + 4b + 3c  s.t.  2a + 3b + c <= 4. The relaxation sets b = 1/3.
    fn knapsack() -> IlpModel {
        let mut m = IlpModel::new();
        let a = m.add_binary(5.0);
        let b = m.add_binary(4.0);
        let c = m.add_binary(3.0);
        m.add_constraint(
            "capacity",
            LinExpr::new().with(a, 2.0).with(b, 3.0).with(c, 1.0),
            Cmp::Le,
            4.0,
        );
        m
    }

    #[test]
    fn picks_the_heavier_of_two_exclusive_binaries() {
        let mut m = IlpModel::new();
        let a = m.add_binary(3.0);
        let b = m.add_binary(5.0);
        m.add_constraint("exclusive", LinExpr::sum([a, b]), Cmp::Le, 1.0);

        let values = solve(&m).assignment().unwrap().to_vec();
        assert!(values[a.index()] < 0.5);
        assert!(values[b.index()] > 0.5);
        assert_eq!(m.first_violation(&values), None);
    }

    #[test]
    fn integer_bounds_are_respected() {
        let mut m = IlpModel::new();
        let d = m.add_integer(0, 7, 1.0);
        let a = m.add_binary(0.0);
        // d <= 4 * a
        m.add_constraint("link", LinExpr::new().with(d, 1.0).with(a, -4.0), Cmp::Le, 0.0);

        let values = solve(&m).assignment().unwrap().to_vec();
        assert!((values[d.index()] - 4.0).abs() < 1e-6);
        assert!(values[a.index()] > 0.5);
    }

    #[test]
    fn fractional_relaxation_is_branched_to_the_optimum() {
        let m = knapsack();
        let outcome = solve(&m);
        assert_eq!(outcome, SolveOutcome::Optimal(vec![1.0, 0.0, 1.0]));
        assert_eq!(m.objective(outcome.assignment().unwrap()), 8.0);
    }

    #[test]
    fn node_limit_returns_the_incumbent() {
        // Root plus the first dive step reach b = 0; the b = 1 side is never opened.
        let backend = MicroLpBackend { node_limit: Some(2) };
        let outcome = backend.solve(&knapsack(), Duration::from_secs(10));
        assert_eq!(outcome, SolveOutcome::TimeLimitFeasible(vec![1.0, 0.0, 1.0]));
    }

    #[test]
    fn limit_without_an_incumbent_is_an_error() {
        let backend = MicroLpBackend { node_limit: Some(1) };
        assert!(matches!(
            backend.solve(&knapsack(), Duration::from_secs(10)),
            SolveOutcome::Error(_)
        ));
    }

    #[test]
    fn contradictory_constraints_are_infeasible() {
        let mut m = IlpModel::new();
        let a = m.add_binary(1.0);
        let b = m.add_binary(1.0);
        m.add_constraint("both", LinExpr::sum([a, b]), Cmp::Eq, 2.0);
        m.add_constraint("at_most_one", LinExpr::sum([a, b]), Cmp::Le, 1.0);
        assert_eq!(solve(&m), SolveOutcome::Infeasible);
    }

    #[test]
    fn infeasible_only_after_branching() {
        // The relaxation of a + b = 1/2 is feasible; no branch is.
        let mut m = IlpModel::new();
        let a = m.add_binary(1.0);
        let b = m.add_binary(1.0);
        m.add_constraint("half", LinExpr::sum([a, b]), Cmp::Eq, 0.5);
        assert_eq!(solve(&m), SolveOutcome::Infeasible);
    }

    #[test]
    fn violated_constant_constraint_short_circuits() {
        let mut m = IlpModel::new();
        m.add_binary(1.0);
        m.add_constraint("never", LinExpr::new(), Cmp::Eq, 1.0);
        assert_eq!(solve(&m), SolveOutcome::Infeasible);
    }
}
