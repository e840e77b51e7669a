//! Euler-characteristic formulation.
//!
//! Instead of boundary loops, every component except ocean water keeps the
//! Euler characteristic it has in the input. On the reduced grid a component
//! is the closed union of its claimed big pixels; a vertex or unit edge
//! belongs to it when any big pixel it bounds is claimed, which indicator
//! variables encode.

use super::candidates::Candidates;
use super::constraints::{
    add_coverage, add_face_vars, add_non_extinction, add_separation, add_water_planarity, Formulation,
};
use crate::config::DownsampleConfig;
use crate::ilp::{Cmp, LinExpr, Var};
use crate::im::Topology;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Vertex,
    Edge,
}

impl CellKind {
    fn sign(self) -> f64 {
        match self {
            CellKind::Vertex => 1.0,
            CellKind::Edge => -1.0,
        }
    }
}

/// Vertices and unit edges of the reduced grid, each with the big pixels around it.
fn complex_cells(new_w: usize, new_h: usize) -> Vec<(CellKind, Vec<(isize, isize)>)> {
    let (w, h) = (new_w as isize, new_h as isize);
    let mut cells = Vec::new();
    for vy in 0..=h {
        for vx in 0..=w {
            cells.push((
                CellKind::Vertex,
                vec![(vx - 1, vy - 1), (vx, vy - 1), (vx - 1, vy), (vx, vy)],
            ));
        }
    }
    // Horizontal edges from (vx, vy) to (vx + 1, vy)
    for vy in 0..=h {
        for vx in 0..w {
            cells.push((CellKind::Edge, vec![(vx, vy - 1), (vx, vy)]));
        }
    }
    // Vertical edges from (vx, vy) to (vx, vy + 1)
    for vy in 0..h {
        for vx in 0..=w {
            cells.push((CellKind::Edge, vec![(vx - 1, vy), (vx, vy)]));
        }
    }
    cells
}

fn claim_vars(vars: &BTreeMap<usize, Var>, cands: &Candidates, around: &[(isize, isize)]) -> Vec<Var> {
    around
        .iter()
        .filter(|&&(cx, cy)| cx >= 0 && cy >= 0 && (cx as usize) < cands.new_w && (cy as usize) < cands.new_h)
        .filter_map(|&(cx, cy)| vars.get(&cands.cell_index(cx as usize, cy as usize)).copied())
        .collect()
}

/// Coverage, non-extinction, water planarity and separation as in the loop
/// formulation, plus `V - E + F == euler` for every land component and every
/// water component that does not reach the image edge.
///
/// Components labeled without Euler data are left unconstrained.
pub fn build_euler_formulation(
    topology: &Topology,
    cands: &Candidates,
    cfg: &DownsampleConfig,
) -> Formulation {
    let mut f = Formulation::new(cands.per_component.len(), 0);

    add_face_vars(&mut f, cands);
    add_coverage(&mut f, cands);
    add_non_extinction(&mut f);
    add_water_planarity(&mut f, topology, cands);
    if cfg.separation_constraints {
        add_separation(&mut f, topology, cands);
    }

    let cells = complex_cells(cands.new_w, cands.new_h);
    for (comp, info) in topology.components.iter().enumerate() {
        if !info.is_land && info.touches_border {
            continue;
        }
        let Some(euler) = info.euler else {
            continue;
        };

        let mut characteristic = LinExpr::sum(f.face_vars[comp].values().copied());
        for (kind, around) in &cells {
            let claims = claim_vars(&f.face_vars[comp], cands, around);
            if claims.is_empty() {
                continue;
            }
            // indicator = 1 iff at least one of the n claims is taken
            let n = claims.len() as f64;
            let indicator = f.model.add_binary(0.0);
            let mut link = LinExpr::sum(claims);
            link.add(indicator, -n);
            f.model.add_constraint("euler_link", link.clone(), Cmp::Le, 0.0);
            f.model.add_constraint("euler_link", link, Cmp::Ge, 1.0 - n);
            characteristic.add(indicator, kind.sign());
        }
        f.model
            .add_constraint("euler", characteristic, Cmp::Eq, euler.characteristic() as f64);
    }
    f
}

// Tests
// -----------------------------------------------------------------------------
