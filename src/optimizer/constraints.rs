use super::candidates::Candidates;
use super::vc::{big_num, index_by_vertex, vc_candidates, VcCandidate};
use crate::config::DownsampleConfig;
use crate::ilp::{Cmp, IlpModel, LinExpr, Var};
use crate::im::{Boundary, Topology};
use std::collections::BTreeMap;

/// Loop-encoding variables of one boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryVars {
    pub boundary: Boundary,
    pub big_num: i64,
    pub vcs: Vec<VcCandidate>,
    pub active: Vec<Var>,
    pub dist: Vec<Var>,
    pub last: Vec<Var>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Formulation {
    pub model: IlpModel,
    /// Per component: cell index -> claim variable.
    pub face_vars: Vec<BTreeMap<usize, Var>>,
    pub boundaries: Vec<BoundaryVars>,
}

impl Formulation {
    pub(super) fn new(n_components: usize, n_boundaries: usize) -> Self {
        Self {
            model: IlpModel::new(),
            face_vars: Vec::with_capacity(n_components),
            boundaries: Vec::with_capacity(n_boundaries),
        }
    }

    fn face_var(&self, comp: u32, cands: &Candidates, cx: usize, cy: usize) -> Option<Var> {
        self.face_vars[comp as usize]
            .get(&cands.cell_index(cx, cy))
            .copied()
    }
}

pub(super) fn add_face_vars(f: &mut Formulation, cands: &Candidates) {
    for scores in &cands.per_component {
        let vars = scores
            .iter()
            .map(|(&cell, &score)| (cell, f.model.add_binary(score as f64)))
            .collect();
        f.face_vars.push(vars);
    }
}

/// Exactly one component claims each big pixel.
pub(super) fn add_coverage(f: &mut Formulation, cands: &Candidates) {
    for (cell, comps) in cands.per_cell.iter().enumerate() {
        let expr = LinExpr::sum(comps.iter().map(|&c| f.face_vars[c as usize][&cell]));
        f.model.add_constraint("coverage", expr, Cmp::Eq, 1.0);
    }
}

/// Every component keeps at least one big pixel.
pub(super) fn add_non_extinction(f: &mut Formulation) {
    for vars in &f.face_vars {
        let expr = LinExpr::sum(vars.values().copied());
        f.model.add_constraint("non_extinction", expr, Cmp::Ge, 1.0);
    }
}

/// Water is 4-connected, so around an interior vertex a water component must
/// not meet itself only through a corner.
pub(super) fn add_water_planarity(f: &mut Formulation, topology: &Topology, cands: &Candidates) {
    for comp in topology.num_land..topology.n_components() {
        let comp = comp as u32;
        for vy in 1..cands.new_h {
            for vx in 1..cands.new_w {
                let faces = [(vx - 1, vy - 1), (vx, vy - 1), (vx, vy), (vx - 1, vy)];
                let ff: Vec<Option<Var>> = faces
                    .iter()
                    .map(|&(cx, cy)| f.face_var(comp, cands, cx, cy))
                    .collect();
                let count = ff.iter().filter(|v| v.is_some()).count();

                let mut exprs: Vec<LinExpr> = Vec::new();
                match (count, ff[0], ff[1], ff[2], ff[3]) {
                    (2, Some(a), _, Some(c), _) => exprs.push(LinExpr::sum([a, c])),
                    (2, _, Some(b), _, Some(d)) => exprs.push(LinExpr::sum([b, d])),
                    // Three faces present: claiming both neighbors of the missing
                    // face forces the face opposite to it.
                    (3, None, Some(b), Some(c), Some(d)) => {
                        exprs.push(LinExpr::new().with(b, 1.0).with(c, -1.0).with(d, 1.0))
                    }
                    (3, Some(a), None, Some(c), Some(d)) => {
                        exprs.push(LinExpr::new().with(a, 1.0).with(d, -1.0).with(c, 1.0))
                    }
                    (3, Some(a), Some(b), None, Some(d)) => {
                        exprs.push(LinExpr::new().with(b, 1.0).with(a, -1.0).with(d, 1.0))
                    }
                    (3, Some(a), Some(b), Some(c), None) => {
                        exprs.push(LinExpr::new().with(a, 1.0).with(b, -1.0).with(c, 1.0))
                    }
                    (4, Some(a), Some(b), Some(c), Some(d)) => {
                        exprs.push(
                            LinExpr::new()
                                .with(a, 1.0)
                                .with(b, -1.0)
                                .with(c, 1.0)
                                .with(d, -1.0),
                        );
                        exprs.push(
                            LinExpr::new()
                                .with(a, -1.0)
                                .with(b, 1.0)
                                .with(c, -1.0)
                                .with(d, 1.0),
                        );
                    }
                    _ => {}
                }
                for expr in exprs {
                    f.model.add_constraint("water_planarity", expr, Cmp::Le, 1.0);
                }
            }
        }
    }
}

/// Ordered pairs of touching big pixels `(f, fo, diagonal)`.
fn touching_pairs(new_w: usize, new_h: usize) -> Vec<((usize, usize), (usize, usize), bool)> {
    let mut pairs = Vec::new();
    for vy in 1..new_h {
        for vx in 0..new_w {
            pairs.push(((vx, vy), (vx, vy - 1), false));
            pairs.push(((vx, vy - 1), (vx, vy), false));
        }
    }
    for vy in 0..new_h {
        for vx in 1..new_w {
            pairs.push(((vx, vy), (vx - 1, vy), false));
            pairs.push(((vx - 1, vy), (vx, vy), false));
        }
    }
    for vy in 1..new_h {
        for vx in 1..new_w {
            pairs.push(((vx - 1, vy - 1), (vx, vy), true));
            pairs.push(((vx, vy), (vx - 1, vy - 1), true));
            pairs.push(((vx, vy - 1), (vx - 1, vy), true));
            pairs.push(((vx - 1, vy), (vx, vy - 1), true));
        }
    }
    pairs
}

/// Distinct components of the same type may not touch along an edge;
/// distinct land components may not touch at a corner either.
pub(super) fn add_separation(f: &mut Formulation, topology: &Topology, cands: &Candidates) {
    for ((fx, fy), (ox, oy), diagonal) in touching_pairs(cands.new_w, cands.new_h) {
        let f_cell = cands.cell_index(fx, fy);
        let o_cell = cands.cell_index(ox, oy);
        for &c0 in &cands.per_cell[f_cell] {
            let c0_land = topology.is_land(c0);
            let incompatible: Vec<Var> = cands.per_cell[o_cell]
                .iter()
                .filter(|&&c1| {
                    let c1_land = topology.is_land(c1);
                    c1 != c0
                        && if diagonal {
                            c0_land && c1_land
                        } else {
                            c0_land == c1_land
                        }
                })
                .map(|&c1| f.face_vars[c1 as usize][&o_cell])
                .collect();
            if incompatible.is_empty() {
                continue;
            }
            let mut expr = LinExpr::sum(incompatible);
            expr.add(f.face_vars[c0 as usize][&f_cell], 1.0);
            f.model.add_constraint("separation", expr, Cmp::Le, 1.0);
        }
    }
}

/// Each boundary must be a single closed loop of active VCs. Distances strictly
/// increase along the loop except at the one VC flagged last.
fn add_boundary_loop(
    f: &mut Formulation,
    boundary: &Boundary,
    cands: &Candidates,
    cfg: &DownsampleConfig,
) {
    let big = big_num(boundary, cfg);
    let vcs = vc_candidates(boundary, cands);
    let by_vertex = index_by_vertex(&vcs);

    let mut active = Vec::with_capacity(vcs.len());
    let mut dist = Vec::with_capacity(vcs.len());
    let mut last = Vec::with_capacity(vcs.len());
    for _ in &vcs {
        active.push(f.model.add_binary(0.0));
        dist.push(f.model.add_integer(0, big, 0.0));
        last.push(f.model.add_binary(0.0));
    }

    for (i, vc) in vcs.iter().enumerate() {
        let pos_to = vc.pos_to();
        let next = by_vertex.get(&pos_to);

        if next.is_none() {
            f.model
                .add_constraint("vc_dead_end", LinExpr::sum([active[i]]), Cmp::Eq, 0.0);
        }

        f.model.add_constraint(
            "vc_dist_bound",
            LinExpr::new().with(dist[i], 1.0).with(active[i], -(big as f64)),
            Cmp::Le,
            0.0,
        );

        // Active iff every required cell is claimed by the right component.
        let n = vc.vc_type().n_faces() as f64;
        let mut link = LinExpr::new();
        for (is_land, cx, cy) in vc.faces() {
            let comp = if is_land { boundary.land } else { boundary.water };
            if let Some(v) = f.face_var(comp, cands, cx, cy) {
                link.add(v, 1.0);
            }
        }
        link.add(active[i], -n);
        f.model.add_constraint("vc_link", link.clone(), Cmp::Ge, 0.0);
        f.model.add_constraint("vc_link", link, Cmp::Le, n - 1.0);

        let dir_out = vc.vc_type().dir_out;
        let mut order = LinExpr::new()
            .with(active[i], 1.0)
            .with(dist[i], 1.0)
            .with(last[i], -(big as f64));
        for &j in next.into_iter().flatten() {
            if vcs[j].vc_type().dir_in == dir_out {
                order.add(dist[j], -1.0);
            }
        }
        f.model.add_constraint("vc_order", order, Cmp::Le, 0.0);
    }

    f.model
        .add_constraint("vc_single_last", LinExpr::sum(last.iter().copied()), Cmp::Eq, 1.0);

    f.boundaries.push(BoundaryVars {
        boundary: *boundary,
        big_num: big,
        vcs,
        active,
        dist,
        last,
    });
}

/// Build the full assignment problem.
pub fn build_formulation(
    topology: &Topology,
    boundaries: &[Boundary],
    cands: &Candidates,
    cfg: &DownsampleConfig,
) -> Formulation {
    let mut f = Formulation::new(cands.per_component.len(), boundaries.len());

    add_face_vars(&mut f, cands);
    add_coverage(&mut f, cands);
    add_non_extinction(&mut f);
    add_water_planarity(&mut f, topology, cands);
    if cfg.separation_constraints {
        add_separation(&mut f, topology, cands);
    }
    for boundary in boundaries {
        add_boundary_loop(&mut f, boundary, cands, cfg);
    }
    f
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::im::{enumerate_boundaries, label_components};
    use crate::optimizer::candidates::collect_candidates;
    use crate::test_helpers::land_im_from_ascii;

    fn formulate(grid: &str, cell: usize) -> (Topology, Candidates, Formulation) {
        let mask = land_im_from_ascii(grid);
        let topology = label_components(&mask);
        let boundaries = enumerate_boundaries(&topology).unwrap();
        let cfg = DownsampleConfig::with_cells(cell, cell);
        let cands = collect_candidates(&topology, &cfg);
        let f = build_formulation(&topology, &boundaries, &cands, &cfg);
        (topology, cands, f)
    }

    const CENTRE_BLOCK: &str = r#"
        ......
        ......
        ..##..
        ..##..
        ......
        ......
    "#;

    /// Values for: centre cell land, everything else water, and the VC loop
    /// around the centre active with distances 1..=4.
    fn centre_block_assignment(cands: &Candidates, f: &Formulation) -> Vec<f64> {
        let mut values = vec![0.0; f.model.n_vars()];
        let centre = cands.cell_index(1, 1);
        values[f.face_vars[0][&centre].index()] = 1.0;
        for (&cell, v) in &f.face_vars[1] {
            if cell != centre {
                values[v.index()] = 1.0;
            }
        }
        let b = &f.boundaries[0];
        // Loop order: type 9 at (1,1), 0 at (2,1), 3 at (2,2), 6 at (1,2).
        let loop_order = [(1, 1), (2, 1), (2, 2), (1, 2)];
        for (d, &(vx, vy)) in loop_order.iter().enumerate() {
            let i = b.vcs.iter().position(|vc| (vc.vx, vc.vy) == (vx, vy)).unwrap();
            values[b.active[i].index()] = 1.0;
            values[b.dist[i].index()] = (d + 1) as f64;
            if d == loop_order.len() - 1 {
                values[b.last[i].index()] = 1.0;
            }
        }
        values
    }

    #[test]
    fn centre_block_loop_satisfies_every_constraint() {
        let (_topology, cands, f) = formulate(CENTRE_BLOCK, 2);
        assert_eq!(f.boundaries.len(), 1);
        assert_eq!(f.boundaries[0].vcs.len(), 4);
        assert_eq!(f.boundaries[0].big_num, 10);

        let values = centre_block_assignment(&cands, &f);
        assert_eq!(f.model.first_violation(&values), None);
        // Objective: 8 for the land cell, one water hit per water pixel.
        assert_eq!(f.model.objective(&values), 8.0 + 32.0);
    }

    #[test]
    fn loop_without_a_last_flag_is_rejected() {
        let (_topology, cands, f) = formulate(CENTRE_BLOCK, 2);
        let mut values = centre_block_assignment(&cands, &f);
        for v in &f.boundaries[0].last {
            values[v.index()] = 0.0;
        }
        let broken = f.model.first_violation(&values).unwrap();
        assert!(f.model.constraints[broken].tag.starts_with("vc_"));
    }

    #[test]
    fn inactive_loop_violates_the_link() {
        let (_topology, cands, f) = formulate(CENTRE_BLOCK, 2);
        let mut values = centre_block_assignment(&cands, &f);
        let b = &f.boundaries[0];
        for i in 0..b.vcs.len() {
            values[b.active[i].index()] = 0.0;
            values[b.dist[i].index()] = 0.0;
        }
        let broken = f.model.first_violation(&values).unwrap();
        assert_eq!(f.model.constraints[broken].tag, "vc_link");
    }

    #[test]
    fn separation_constrains_neighboring_land_components() {
        let (topology, _cands, f) = formulate(
            r#"
                ........
                .##.....
                .##..##.
                .....##.
                ........
                ........
            "#,
            2,
        );
        assert_eq!(topology.num_land, 2);
        assert!(f.model.family_counts().get("separation").copied().unwrap_or(0) > 0);
    }

    #[test]
    fn water_planarity_counts() {
        let (_topology, _cands, f) = formulate(CENTRE_BLOCK, 2);
        // Four interior vertices, each missing the centre cell once: one constraint each.
        assert_eq!(f.model.family_counts().get("water_planarity"), Some(&4));
        assert_eq!(f.model.family_counts().get("coverage"), Some(&9));
        assert_eq!(f.model.family_counts().get("non_extinction"), Some(&2));
        assert_eq!(f.model.family_counts().get("separation"), None);
    }
}
