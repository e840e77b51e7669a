//! Solver-free digitization corrector.
//!
//! Flips simple points of the input (pixels whose 3x3 ring has exactly one
//! land group and one water group) until every big pixel is uniform. Each big
//! pixel has a target color, Sigma, initialised by majority; when only
//! negative-score flips remain while some big pixel is still mixed, the
//! target of the offending big pixel is flipped, at most a bounded number of
//! times per big pixel.

use crate::config::CorrectorConfig;
use crate::connectivity::{n8_groups, ring_matching};
use crate::error::DownsampleError;
use crate::im::{LandIm, ROI};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectorOutcome {
    /// Uniform without any Sigma flip.
    Clean = 0,
    /// Uniform after at least one Sigma flip.
    Escalated = 1,
    Failed = 2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    pub outcome: CorrectorOutcome,
    /// Reduced raster; `None` when the outcome is `Failed`.
    pub output: Option<LandIm>,
    pub iterations: usize,
    pub sigma_flips: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    x: usize,
    y: usize,
    /// Value of the pixel when the candidate was scored.
    is_land: bool,
    score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Searching,
    Escalating { cell: usize, candidate: Candidate },
    Done(CorrectorOutcome),
}

struct Corrector<'a> {
    cfg: &'a CorrectorConfig,
    work: LandIm,
    big_w: usize,
    sigma: Vec<bool>,
    land_counts: Vec<usize>,
    attempts: Vec<usize>,
    queue: VecDeque<Candidate>,
    iterations: usize,
    iter_max: usize,
    sigma_flips: usize,
}

impl<'a> Corrector<'a> {
    fn new(mask: &LandIm, cfg: &'a CorrectorConfig) -> Self {
        let cell = cfg.cell_size;
        let big_w = mask.w / cell;
        let big_h = mask.h / cell;
        let n = cell * cell;

        let mut land_counts = vec![0usize; big_w * big_h];
        for y in 0..mask.h {
            for x in 0..mask.w {
                if mask.at(x, y) {
                    land_counts[(y / cell) * big_w + x / cell] += 1;
                }
            }
        }
        let sigma = land_counts.iter().map(|&c| c > n / 2).collect();

        let mut corrector = Self {
            cfg,
            work: mask.clone(),
            big_w,
            sigma,
            land_counts,
            attempts: vec![0; big_w * big_h],
            queue: VecDeque::new(),
            iterations: 0,
            iter_max: mask.w * mask.h / 4,
            sigma_flips: 0,
        };

        if mask.w >= 3 && mask.h >= 3 {
            for y in 1..mask.h - 1 {
                for x in 1..mask.w - 1 {
                    corrector.try_add(x, y);
                }
            }
        }
        log::debug!(
            "corrector: {} initial candidates, iteration budget {}",
            corrector.queue.len(),
            corrector.iter_max
        );
        corrector
    }

    #[inline]
    fn cell_of(&self, x: usize, y: usize) -> usize {
        (y / self.cfg.cell_size) * self.big_w + x / self.cfg.cell_size
    }

    fn is_interior(&self, x: usize, y: usize) -> bool {
        x >= 1 && y >= 1 && x + 1 < self.work.w && y + 1 < self.work.h
    }

    /// Flipping `(x, y)` keeps both the land and the water ring connected.
    fn is_simple(&self, x: usize, y: usize) -> bool {
        let water_ring = ring_matching(&self.work, x, y, false);
        n8_groups(water_ring) == 1 && n8_groups(!water_ring) == 1
    }

    fn score(&self, x: usize, y: usize) -> f64 {
        let cell = self.cell_of(x, y);
        let n = (self.cfg.cell_size * self.cfg.cell_size) as f64;
        let land = self.land_counts[cell] as f64;
        let water = n - land;
        match (self.work.at(x, y), self.sigma[cell]) {
            (true, true) => -(land - 1.0) / n,
            (true, false) => (water + 1.0) / n,
            (false, true) => (land + 1.0) / n,
            (false, false) => -(water - 1.0) / n,
        }
    }

    /// Keep the queue in descending score order; equal scores put the newcomer first.
    fn insert(&mut self, candidate: Candidate) {
        let i = self.queue.partition_point(|c| c.score > candidate.score);
        self.queue.insert(i, candidate);
    }

    fn try_add(&mut self, x: usize, y: usize) {
        if !self.is_interior(x, y) || !self.is_simple(x, y) {
            return;
        }
        let candidate = Candidate {
            x,
            y,
            is_land: self.work.at(x, y),
            score: self.score(x, y),
        };
        self.insert(candidate);
    }

    fn all_pure(&self) -> bool {
        let n = self.cfg.cell_size * self.cfg.cell_size;
        self.land_counts.iter().all(|&c| c == 0 || c == n)
    }

    fn finished(&self) -> CorrectorOutcome {
        if !self.all_pure() {
            CorrectorOutcome::Failed
        } else if self.sigma_flips == 0 {
            CorrectorOutcome::Clean
        } else {
            CorrectorOutcome::Escalated
        }
    }

    fn commit(&mut self, candidate: Candidate) {
        let (x, y) = (candidate.x, candidate.y);
        let cell = self.cell_of(x, y);
        let cs = self.cfg.cell_size;

        self.work.set(x, y, !candidate.is_land);
        if candidate.is_land {
            self.land_counts[cell] -= 1;
        } else {
            self.land_counts[cell] += 1;
        }

        // Scores change in the cell, simple-point status in the 3x3 window.
        let mut region = ROI::cell(x / cs, y / cs, cs, cs);
        region.union(ROI::pixel(x, y).padded(1, self.work.w, self.work.h));

        self.queue.retain(|c| !region.contains(c.x, c.y));
        for (px, py) in region.pixels() {
            self.try_add(px, py);
        }
    }

    fn search(&mut self) -> State {
        if self.iterations >= self.iter_max {
            log::debug!("corrector: iteration budget {} exhausted", self.iter_max);
            return State::Done(self.finished());
        }
        self.iterations += 1;

        let Some(best) = self.queue.pop_front() else {
            return State::Done(self.finished());
        };
        if self.work.at(best.x, best.y) != best.is_land || !self.is_simple(best.x, best.y) {
            return State::Searching;
        }

        if best.score >= 0.0 {
            self.commit(best);
            return State::Searching;
        }
        if self.all_pure() {
            return State::Done(self.finished());
        }
        State::Escalating {
            cell: self.cell_of(best.x, best.y),
            candidate: best,
        }
    }

    fn escalate(&mut self, cell: usize, candidate: Candidate) -> State {
        if self.attempts[cell] >= self.cfg.max_sigma_flips {
            log::debug!("corrector: big pixel {} exceeded its Sigma flip budget", cell);
            return State::Done(CorrectorOutcome::Failed);
        }
        self.attempts[cell] += 1;
        self.sigma[cell] = !self.sigma[cell];
        self.sigma_flips += 1;
        log::debug!(
            "corrector: flipped Sigma of big pixel ({}, {})",
            cell % self.big_w,
            cell / self.big_w
        );

        let cs = self.cfg.cell_size;
        let big_w = self.big_w;
        let (in_cell, rest): (Vec<Candidate>, Vec<Candidate>) = std::mem::take(&mut self.queue)
            .into_iter()
            .partition(|c| (c.y / cs) * big_w + c.x / cs == cell);
        self.queue = rest.into();
        for c in in_cell.into_iter().chain(std::iter::once(candidate)) {
            let score = self.score(c.x, c.y);
            self.insert(Candidate { score, ..c });
        }
        State::Searching
    }

    fn run(&mut self) -> CorrectorOutcome {
        let mut state = State::Searching;
        loop {
            state = match state {
                State::Searching => self.search(),
                State::Escalating { cell, candidate } => self.escalate(cell, candidate),
                State::Done(outcome) => return outcome,
            };
        }
    }

    fn output(&self) -> LandIm {
        let big_h = self.land_counts.len() / self.big_w.max(1);
        let n = self.cfg.cell_size * self.cfg.cell_size;
        let mut out = LandIm::new(self.big_w, big_h);
        for (i, &c) in self.land_counts.iter().enumerate() {
            out.arr[i] = 2 * c >= n;
        }
        out
    }
}

/// Reduce `mask` by `cfg.cell_size` with the greedy corrector.
pub fn correct_digitization(
    mask: &LandIm,
    cfg: &CorrectorConfig,
) -> Result<Correction, DownsampleError> {
    let cell = cfg.cell_size;
    if cell == 0 || mask.w % cell != 0 || mask.h % cell != 0 {
        return Err(DownsampleError::DimensionMismatch {
            w: mask.w,
            h: mask.h,
            cell_w: cell,
            cell_h: cell,
        });
    }

    let mut corrector = Corrector::new(mask, cfg);
    let outcome = corrector.run();
    log::info!(
        "corrector: {:?} after {} iterations, {} Sigma flips",
        outcome,
        corrector.iterations,
        corrector.sigma_flips
    );

    Ok(Correction {
        outcome,
        output: (outcome != CorrectorOutcome::Failed).then(|| corrector.output()),
        iterations: corrector.iterations,
        sigma_flips: corrector.sigma_flips,
    })
}

// Tests
// -----------------------------------------------------------------------------
