//! Vertex configurations of a land/water boundary on the reduced grid.
//!
//! A boundary is traversed with land on one side and water on the other. At a
//! grid vertex `(vx, vy)` the four surrounding big pixels are addressed by
//! offsets relative to the vertex: `(-1, -1)`, `(0, -1)`, `(0, 0)`, `(-1, 0)`.
//! Each of the 12 types fixes an incoming and an outgoing unit step and the
//! big pixels that must be land or water for the boundary to turn that way.
//!
//! | type | in | out | land            | water           |
//! |------|----|-----|-----------------|-----------------|
//! | 0    | +x | +y  | (-1,0)          | (-1,-1) (0,0)   |
//! | 1    | +x | +x  | (-1,0) (0,0)    | (-1,-1) (0,-1)  |
//! | 2    | +x | -y  | (-1,0) (0,-1)   | (-1,-1)         |
//! | 3    | +y | -x  | (-1,-1)         | (0,-1) (-1,0)   |
//! | 4    | +y | +y  | (-1,-1) (-1,0)  | (0,-1) (0,0)    |
//! | 5    | +y | +x  | (-1,-1) (0,0)   | (0,-1)          |
//! | 6    | -x | -y  | (0,-1)          | (0,0) (-1,-1)   |
//! | 7    | -x | -x  | (0,-1) (-1,-1)  | (0,0) (-1,0)    |
//! | 8    | -x | +y  | (0,-1) (-1,0)   | (0,0)           |
//! | 9    | -y | +x  | (0,0)           | (-1,0) (0,-1)   |
//! | 10   | -y | -y  | (0,0) (0,-1)    | (-1,0) (-1,-1)  |
//! | 11   | -y | -x  | (0,0) (-1,-1)   | (-1,0)          |

use super::candidates::Candidates;
use crate::config::DownsampleConfig;
use crate::im::Boundary;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dir {
    PosX,
    PosY,
    NegX,
    NegY,
}

impl Dir {
    pub fn offset(self) -> (isize, isize) {
        match self {
            Dir::PosX => (1, 0),
            Dir::PosY => (0, 1),
            Dir::NegX => (-1, 0),
            Dir::NegY => (0, -1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VcType {
    pub dir_in: Dir,
    pub dir_out: Dir,
    pub land: &'static [(isize, isize)],
    pub water: &'static [(isize, isize)],
}

impl VcType {
    pub fn n_faces(&self) -> usize {
        self.land.len() + self.water.len()
    }
}

pub const VC_TYPES: [VcType; 12] = [
    VcType { dir_in: Dir::PosX, dir_out: Dir::PosY, land: &[(-1, 0)], water: &[(-1, -1), (0, 0)] },
    VcType { dir_in: Dir::PosX, dir_out: Dir::PosX, land: &[(-1, 0), (0, 0)], water: &[(-1, -1), (0, -1)] },
    VcType { dir_in: Dir::PosX, dir_out: Dir::NegY, land: &[(-1, 0), (0, -1)], water: &[(-1, -1)] },
    VcType { dir_in: Dir::PosY, dir_out: Dir::NegX, land: &[(-1, -1)], water: &[(0, -1), (-1, 0)] },
    VcType { dir_in: Dir::PosY, dir_out: Dir::PosY, land: &[(-1, -1), (-1, 0)], water: &[(0, -1), (0, 0)] },
    VcType { dir_in: Dir::PosY, dir_out: Dir::PosX, land: &[(-1, -1), (0, 0)], water: &[(0, -1)] },
    VcType { dir_in: Dir::NegX, dir_out: Dir::NegY, land: &[(0, -1)], water: &[(0, 0), (-1, -1)] },
    VcType { dir_in: Dir::NegX, dir_out: Dir::NegX, land: &[(0, -1), (-1, -1)], water: &[(0, 0), (-1, 0)] },
    VcType { dir_in: Dir::NegX, dir_out: Dir::PosY, land: &[(0, -1), (-1, 0)], water: &[(0, 0)] },
    VcType { dir_in: Dir::NegY, dir_out: Dir::PosX, land: &[(0, 0)], water: &[(-1, 0), (0, -1)] },
    VcType { dir_in: Dir::NegY, dir_out: Dir::NegY, land: &[(0, 0), (0, -1)], water: &[(-1, 0), (-1, -1)] },
    VcType { dir_in: Dir::NegY, dir_out: Dir::NegX, land: &[(0, 0), (-1, -1)], water: &[(-1, 0)] },
];

/// A vertex configuration that a boundary could take at an interior vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VcCandidate {
    pub ty: usize,
    pub vx: usize,
    pub vy: usize,
}

impl VcCandidate {
    pub fn vc_type(&self) -> &'static VcType {
        &VC_TYPES[self.ty]
    }

    /// Vertex the outgoing step points to.
    pub fn pos_to(&self) -> (isize, isize) {
        let (dx, dy) = self.vc_type().dir_out.offset();
        (self.vx as isize + dx, self.vy as isize + dy)
    }

    /// Cells `(cx, cy)` that must be land, then those that must be water.
    pub fn faces(&self) -> impl Iterator<Item = (bool, usize, usize)> + '_ {
        let t = self.vc_type();
        let (vx, vy) = (self.vx as isize, self.vy as isize);
        let cell = move |is_land: bool, &(dx, dy): &(isize, isize)| {
            (is_land, (vx + dx) as usize, (vy + dy) as usize)
        };
        t.land
            .iter()
            .map(move |o| cell(true, o))
            .chain(t.water.iter().map(move |o| cell(false, o)))
    }
}

/// Every VC of `boundary` at interior vertices whose required cells are all
/// candidates of the boundary's land and water component.
/// Ordered by vertex (row-major), then type.
pub fn vc_candidates(boundary: &Boundary, cands: &Candidates) -> Vec<VcCandidate> {
    let mut out = Vec::new();
    for vy in 1..cands.new_h {
        for vx in 1..cands.new_w {
            for (ty, t) in VC_TYPES.iter().enumerate() {
                let (x, y) = (vx as isize, vy as isize);
                let land_ok = t
                    .land
                    .iter()
                    .all(|&(dx, dy)| cands.has(boundary.land, x + dx, y + dy));
                let water_ok = t
                    .water
                    .iter()
                    .all(|&(dx, dy)| cands.has(boundary.water, x + dx, y + dy));
                if land_ok && water_ok {
                    out.push(VcCandidate { ty, vx, vy });
                }
            }
        }
    }
    out
}

/// VC indices grouped by vertex.
pub fn index_by_vertex(vcs: &[VcCandidate]) -> BTreeMap<(isize, isize), Vec<usize>> {
    let mut map: BTreeMap<(isize, isize), Vec<usize>> = BTreeMap::new();
    for (i, vc) in vcs.iter().enumerate() {
        map.entry((vc.vx as isize, vc.vy as isize)).or_default().push(i);
    }
    map
}

/// Upper bound of a VC distance along `boundary`: the reduced boundary length
/// scaled by the multiplier, never below the floor.
pub fn big_num(boundary: &Boundary, cfg: &DownsampleConfig) -> i64 {
    let reduced = (boundary.weight / cfg.cell_w) as f64;
    ((reduced * cfg.big_num_multiplier) as i64).max(cfg.big_num_floor)
}
