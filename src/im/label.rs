use super::core::{LabelIm, LandIm};
use super::roi::ROI;
use crate::error::TopologyError;
use std::collections::{BTreeMap, VecDeque};

/// Label value of a pixel no flood has reached yet.
pub const UNLABELED: u32 = u32::MAX;

const N4: [(isize, isize); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
const N8: [(isize, isize); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Vertex, edge and face counts of a component's cell complex.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Euler {
    pub v: usize,
    pub e: usize,
    pub f: usize,
}

impl Euler {
    pub fn characteristic(&self) -> i64 {
        self.v as i64 - self.e as i64 + self.f as i64
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ComponentInfo {
    pub is_land: bool,
    pub size: usize,
    pub start_x: usize,
    pub start_y: usize,
    pub roi: ROI,
    /// Sorted row-major pixel indices.
    pub pixel_iz: Vec<usize>,
    pub touches_border: bool,
    /// Only filled in by `label_topology`.
    pub euler: Option<Euler>,
}

/// Labeled partition of a mask. Land ids are `0..num_land`, water ids follow.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    pub labels: LabelIm,
    pub num_land: usize,
    pub num_water: usize,
    pub components: Vec<ComponentInfo>,
}

impl Topology {
    #[inline]
    pub fn is_land(&self, id: u32) -> bool {
        (id as usize) < self.num_land
    }

    pub fn n_components(&self) -> usize {
        self.num_land + self.num_water
    }

    /// Water components that do not reach the image edge.
    pub fn num_enclosed_water(&self) -> usize {
        self.components
            .iter()
            .filter(|c| !c.is_land && !c.touches_border)
            .count()
    }
}

/// Adjacent land/water component pair and its shared edge count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub land: u32,
    pub water: u32,
    pub weight: usize,
}

/// Breadth-first flood from `(start_x, start_y)` over pixels of the seed's type.
/// Land follows 8-neighbors, water 4-neighbors.
fn flood_component(
    mask: &LandIm,
    labels: &mut LabelIm,
    start_x: usize,
    start_y: usize,
    fill_val: u32,
) -> ComponentInfo {
    let w = mask.w;
    let h = mask.h;
    let is_land = mask.at(start_x, start_y);
    let offsets: &[(isize, isize)] = if is_land { &N8 } else { &N4 };

    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
    labels.set(start_x, start_y, fill_val);
    queue.push_back((start_x, start_y));

    let mut pixel_iz: Vec<usize> = Vec::new();
    let mut roi = ROI::pixel(start_x, start_y);
    while let Some((x, y)) = queue.pop_front() {
        pixel_iz.push(y * w + x);
        roi.union(ROI::pixel(x, y));

        for &(dx, dy) in offsets {
            let nx = x as isize + dx;
            let ny = y as isize + dy;
            if nx < 0 || ny < 0 || nx as usize >= w || ny as usize >= h {
                continue;
            }
            let (nx, ny) = (nx as usize, ny as usize);
            if labels.at(nx, ny) != UNLABELED || mask.at(nx, ny) != is_land {
                continue;
            }
            labels.set(nx, ny, fill_val);
            queue.push_back((nx, ny));
        }
    }

    pixel_iz.sort_unstable();

    ComponentInfo {
        is_land,
        size: pixel_iz.len(),
        start_x,
        start_y,
        roi,
        pixel_iz,
        touches_border: roi.l == 0 || roi.t == 0 || roi.r == w || roi.b == h,
        euler: None,
    }
}

fn label_mask(mask: &LandIm) -> Topology {
    let w = mask.w;
    let h = mask.h;
    let mut labels = LabelIm::filled(w, h, UNLABELED);

    // Local ids per type; water ids are shifted once the land count is known.
    let mut land: Vec<ComponentInfo> = Vec::new();
    let mut water: Vec<ComponentInfo> = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if labels.at(x, y) != UNLABELED {
                continue;
            }
            if mask.at(x, y) {
                let id = land.len() as u32;
                land.push(flood_component(mask, &mut labels, x, y, id));
            } else {
                let id = water.len() as u32;
                water.push(flood_component(mask, &mut labels, x, y, id));
            }
        }
    }

    let num_land = land.len();
    let num_water = water.len();
    for (i, v) in labels.arr.iter_mut().enumerate() {
        if !mask.arr[i] {
            *v += num_land as u32;
        }
    }

    let mut components = land;
    components.append(&mut water);

    Topology {
        labels,
        num_land,
        num_water,
        components,
    }
}

/// Count each distinct label among `ids` once into the matching counter.
#[inline]
fn count_distinct(ids: &[Option<u32>], counts: &mut [usize]) {
    for (i, id) in ids.iter().enumerate() {
        let Some(id) = *id else { continue };
        if ids[..i].contains(&Some(id)) {
            continue;
        }
        counts[id as usize] += 1;
    }
}

/// Per-component V, E, F where each lattice vertex and unit edge is counted
/// once for every distinct component it touches.
fn euler_counts(labels: &LabelIm, n_components: usize) -> Vec<Euler> {
    let w = labels.w as isize;
    let h = labels.h as isize;
    let at = |x: isize, y: isize| labels.at_signed(x, y);

    let mut v = vec![0usize; n_components];
    let mut e = vec![0usize; n_components];
    let mut f = vec![0usize; n_components];

    for &id in &labels.arr {
        f[id as usize] += 1;
    }

    for vy in 0..=h {
        for vx in 0..=w {
            let corners = [
                at(vx - 1, vy - 1),
                at(vx, vy - 1),
                at(vx - 1, vy),
                at(vx, vy),
            ];
            count_distinct(&corners, &mut v);

            // Horizontal edge from (vx, vy) to (vx + 1, vy)
            if vx < w {
                count_distinct(&[at(vx, vy - 1), at(vx, vy)], &mut e);
            }
            // Vertical edge from (vx, vy) to (vx, vy + 1)
            if vy < h {
                count_distinct(&[at(vx - 1, vy), at(vx, vy)], &mut e);
            }
        }
    }

    (0..n_components)
        .map(|i| Euler {
            v: v[i],
            e: e[i],
            f: f[i],
        })
        .collect()
}

/// Label components and compute their Euler triples.
pub fn label_topology(mask: &LandIm) -> Topology {
    let mut topology = label_mask(mask);
    let eulers = euler_counts(&topology.labels, topology.n_components());
    for (info, euler) in topology.components.iter_mut().zip(eulers) {
        info.euler = Some(euler);
    }
    log::debug!(
        "label_topology: {}x{} -> {} land, {} water components",
        mask.w,
        mask.h,
        topology.num_land,
        topology.num_water
    );
    topology
}

/// Label components without the Euler bookkeeping.
pub fn label_components(mask: &LandIm) -> Topology {
    label_mask(mask)
}

/// Scan every interior grid edge and count land/water face pairs per (land, water) component pair.
pub fn enumerate_boundaries(topology: &Topology) -> Result<Vec<Boundary>, TopologyError> {
    let labels = &topology.labels;
    let label_at = |x: usize, y: usize| -> Result<u32, TopologyError> {
        let id = labels.at(x, y);
        if id == UNLABELED || id as usize >= topology.n_components() {
            return Err(TopologyError::Unlabeled { x, y });
        }
        Ok(id)
    };

    let mut weights: BTreeMap<(u32, u32), usize> = BTreeMap::new();
    let mut add_pair = |a: u32, b: u32| {
        let (land, water) = match (topology.is_land(a), topology.is_land(b)) {
            (true, false) => (a, b),
            (false, true) => (b, a),
            _ => return,
        };
        *weights.entry((land, water)).or_insert(0) += 1;
    };

    for y in 0..labels.h {
        for x in 0..labels.w {
            let id = label_at(x, y)?;
            if y > 0 {
                add_pair(label_at(x, y - 1)?, id);
            }
            if x > 0 {
                add_pair(label_at(x - 1, y)?, id);
            }
        }
    }

    Ok(weights
        .into_iter()
        .map(|((land, water), weight)| Boundary {
            land,
            water,
            weight,
        })
        .collect())
}

/// Turn the smallest enclosed water component into land. Ties go to the lower id.
/// Returns false if there is no enclosed water.
pub fn fill_smallest_lake(mask: &mut LandIm) -> bool {
    let topology = label_components(mask);
    let Some(lake) = topology
        .components
        .iter()
        .filter(|c| !c.is_land && !c.touches_border)
        .min_by_key(|c| c.size)
    else {
        return false;
    };

    log::debug!(
        "fill_smallest_lake: filling {} pixels starting at ({}, {})",
        lake.size,
        lake.start_x,
        lake.start_y
    );
    for &i in &lake.pixel_iz {
        mask.arr[i] = true;
    }
    true
}

// Tests
// -----------------------------------------------------------------------------
