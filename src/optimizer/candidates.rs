use crate::config::DownsampleConfig;
use crate::im::Topology;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Integer offsets within Euclidean distance `radius` of the origin.
pub fn disk_offsets(radius: f64) -> Vec<(isize, isize)> {
    let r = radius.max(0.0) as isize;
    let mut offsets = Vec::new();
    for x in -r..=r {
        for y in -r..=r {
            if ((x * x + y * y) as f64).sqrt() <= radius {
                offsets.push((x, y));
            }
        }
    }
    offsets
}

/// Big pixels each component may claim, with their scores.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidates {
    pub new_w: usize,
    pub new_h: usize,
    /// Per component: cell index -> score.
    pub per_component: Vec<BTreeMap<usize, i64>>,
    /// Per cell: ascending ids of the components that may claim it.
    pub per_cell: Vec<Vec<u32>>,
}

impl Candidates {
    #[inline]
    pub fn cell_index(&self, cx: usize, cy: usize) -> usize {
        cy * self.new_w + cx
    }

    /// Signed cell lookup; false outside the reduced grid.
    pub fn has(&self, comp: u32, cx: isize, cy: isize) -> bool {
        if cx < 0 || cy < 0 || cx as usize >= self.new_w || cy as usize >= self.new_h {
            return false;
        }
        self.per_component[comp as usize].contains_key(&self.cell_index(cx as usize, cy as usize))
    }

    pub fn n_candidates(&self) -> usize {
        self.per_component.iter().map(|c| c.len()).sum()
    }
}

/// Score every big pixel reached by the disk around any pixel of each component.
/// Each (pixel, offset) hit adds the component's type weight to the hit cell.
pub fn collect_candidates(topology: &Topology, cfg: &DownsampleConfig) -> Candidates {
    let w = topology.labels.w;
    let h = topology.labels.h;
    let new_w = w / cfg.cell_w;
    let new_h = h / cfg.cell_h;
    let offsets = disk_offsets(cfg.neighborhood_radius());

    let per_component: Vec<BTreeMap<usize, i64>> = topology
        .components
        .par_iter()
        .map(|info| {
            let weight = if info.is_land { cfg.land_weight } else { cfg.water_weight };
            let mut scores: BTreeMap<usize, i64> = BTreeMap::new();
            for &i in &info.pixel_iz {
                let (x, y) = ((i % w) as isize, (i / w) as isize);
                for &(dx, dy) in &offsets {
                    let (px, py) = (x + dx, y + dy);
                    if px < 0 || py < 0 || px as usize >= w || py as usize >= h {
                        continue;
                    }
                    let cell = (py as usize / cfg.cell_h) * new_w + px as usize / cfg.cell_w;
                    *scores.entry(cell).or_insert(0) += weight;
                }
            }
            scores
        })
        .collect();

    let mut per_cell: Vec<Vec<u32>> = vec![Vec::new(); new_w * new_h];
    for (comp, scores) in per_component.iter().enumerate() {
        for &cell in scores.keys() {
            per_cell[cell].push(comp as u32);
        }
    }

    Candidates {
        new_w,
        new_h,
        per_component,
        per_cell,
    }
}
