//! Topology-preserving downsampling as an integer program.
//!
//! Every component of the input gets a 0/1 variable per big pixel it could
//! claim. Hard constraints keep each big pixel claimed exactly once, keep
//! every component alive, keep water 4-connected, keep distinct same-type
//! components apart and force every land/water boundary into a single loop
//! of vertex configurations. The objective maximizes the claimed scores.
//!
//! `Scheme::Euler` swaps the loops for per-component Euler characteristics
//! (see `euler`).

pub mod candidates;
pub mod constraints;
pub mod euler;
pub mod offsets;
pub mod vc;

use crate::config::{DownsampleConfig, Scheme};
use crate::error::{DownsampleError, DownsampleStatus};
use crate::ilp::{IlpBackend, MicroLpBackend, SolveOutcome};
use crate::im::{enumerate_boundaries, label_components, label_topology, LabelIm, LandIm, Topology, UNLABELED};
use candidates::{collect_candidates, Candidates};
use constraints::{build_formulation, Formulation};
use euler::build_euler_formulation;
use std::time::{Duration, Instant};

/// An active VC of a solved boundary loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveVc {
    pub vx: usize,
    pub vy: usize,
    pub ty: usize,
    pub dist: i64,
    pub last: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolvedBoundary {
    pub land: u32,
    pub water: u32,
    pub vcs: Vec<ActiveVc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownsampleReport {
    pub output: LandIm,
    /// Component id of every input pixel.
    pub input_components: LabelIm,
    /// Component id claiming every big pixel.
    pub output_components: LabelIm,
    pub num_land: usize,
    pub num_water: usize,
    pub objective: f64,
    /// The solver stopped at the time limit with a feasible incumbent.
    pub time_limited: bool,
    pub boundaries: Vec<SolvedBoundary>,
}

fn check_input(mask: &LandIm, cfg: &DownsampleConfig) -> Result<(), DownsampleError> {
    cfg.validate()
        .map_err(|e| DownsampleError::InvalidConfig(e.to_string()))?;
    if mask.w % cfg.cell_w != 0 || mask.h % cfg.cell_h != 0 {
        return Err(DownsampleError::DimensionMismatch {
            w: mask.w,
            h: mask.h,
            cell_w: cfg.cell_w,
            cell_h: cfg.cell_h,
        });
    }
    Ok(())
}

fn solved_boundaries(f: &Formulation, values: &[f64]) -> Vec<SolvedBoundary> {
    f.boundaries
        .iter()
        .map(|b| SolvedBoundary {
            land: b.boundary.land,
            water: b.boundary.water,
            vcs: b
                .vcs
                .iter()
                .enumerate()
                .filter(|&(i, _)| values[b.active[i].index()] > 0.5)
                .map(|(i, vc)| ActiveVc {
                    vx: vc.vx,
                    vy: vc.vy,
                    ty: vc.ty,
                    dist: values[b.dist[i].index()].round() as i64,
                    last: values[b.last[i].index()] > 0.5,
                })
                .collect(),
        })
        .collect()
}

/// Downsample with an explicit backend, returning the full report.
pub fn downsample_with(
    mask: &LandIm,
    cfg: &DownsampleConfig,
    backend: &dyn IlpBackend,
) -> Result<DownsampleReport, DownsampleError> {
    check_input(mask, cfg)?;
    let start = Instant::now();

    let (topology, cands, formulation) = match cfg.scheme {
        Scheme::BoundaryLoops => {
            let topology = label_components(mask);
            let boundaries = enumerate_boundaries(&topology)?;
            log::debug!(
                "downsample: {} land, {} water components, {} boundaries in {:.3}s",
                topology.num_land,
                topology.num_water,
                boundaries.len(),
                start.elapsed().as_secs_f64()
            );
            let cands = collect_candidates(&topology, cfg);
            let formulation = build_formulation(&topology, &boundaries, &cands, cfg);
            (topology, cands, formulation)
        }
        Scheme::Euler => {
            let topology = label_topology(mask);
            log::debug!(
                "downsample: {} land, {} water components, {} enclosed, in {:.3}s",
                topology.num_land,
                topology.num_water,
                topology.num_enclosed_water(),
                start.elapsed().as_secs_f64()
            );
            let cands = collect_candidates(&topology, cfg);
            let formulation = build_euler_formulation(&topology, &cands, cfg);
            (topology, cands, formulation)
        }
    };
    solve_formulation(mask, cfg, backend, topology, &cands, &formulation, start)
}

fn solve_formulation(
    mask: &LandIm,
    cfg: &DownsampleConfig,
    backend: &dyn IlpBackend,
    topology: Topology,
    cands: &Candidates,
    formulation: &Formulation,
    start: Instant,
) -> Result<DownsampleReport, DownsampleError> {
    log::debug!(
        "downsample: {:?}, {} candidates, {} variables, {} constraints {:?} in {:.3}s",
        cfg.scheme,
        cands.n_candidates(),
        formulation.model.n_vars(),
        formulation.model.n_constraints(),
        formulation.model.family_counts(),
        start.elapsed().as_secs_f64()
    );

    let time_limit = Duration::from_secs_f64(cfg.time_limit_secs);
    let outcome = backend.solve(&formulation.model, time_limit);
    let (values, time_limited) = match outcome {
        SolveOutcome::Optimal(values) => (values, false),
        SolveOutcome::TimeLimitFeasible(values) => {
            log::info!("downsample: time limit reached, using the incumbent");
            (values, true)
        }
        SolveOutcome::Infeasible => {
            log::info!("downsample: the problem is infeasible");
            return Err(DownsampleError::Infeasible);
        }
        SolveOutcome::Error(msg) => {
            log::warn!("downsample: {} solve failed: {}", backend.name(), msg);
            return Err(DownsampleError::Solver(msg));
        }
    };

    let mut output = LandIm::new(cands.new_w, cands.new_h);
    let mut output_components = LabelIm::filled(cands.new_w, cands.new_h, UNLABELED);
    for cy in 0..cands.new_h {
        for cx in 0..cands.new_w {
            let cell = cands.cell_index(cx, cy);
            let winner = cands.per_cell[cell]
                .iter()
                .copied()
                .find(|&c| values[formulation.face_vars[c as usize][&cell].index()] > 0.5)
                .ok_or(DownsampleError::Unclaimed { x: cx, y: cy })?;
            output.set(cx, cy, topology.is_land(winner));
            output_components.set(cx, cy, winner);
        }
    }

    let boundaries = solved_boundaries(formulation, &values);
    for b in &boundaries {
        log::debug!(
            "downsample: boundary ({}, {}) has {} active VCs: {:?}",
            b.land,
            b.water,
            b.vcs.len(),
            b.vcs
        );
    }

    let objective = formulation.model.objective(&values);
    log::info!(
        "downsample: {}x{} -> {}x{}, objective {} in {:.3}s",
        mask.w,
        mask.h,
        cands.new_w,
        cands.new_h,
        objective,
        start.elapsed().as_secs_f64()
    );

    Ok(DownsampleReport {
        output,
        input_components: topology.labels,
        output_components,
        num_land: topology.num_land,
        num_water: topology.num_water,
        objective,
        time_limited,
        boundaries,
    })
}

/// Downsample `mask` by `cfg.cell_w x cfg.cell_h` with the default backend.
pub fn downsample(mask: &LandIm, cfg: &DownsampleConfig) -> Result<LandIm, DownsampleError> {
    downsample_with(mask, cfg, &MicroLpBackend::default()).map(|report| report.output)
}

/// Status-code form of `downsample`; `out` is only written on success.
pub fn downsample_into(mask: &LandIm, cfg: &DownsampleConfig, out: &mut LandIm) -> DownsampleStatus {
    match downsample(mask, cfg) {
        Ok(result) => {
            *out = result;
            DownsampleStatus::Success
        }
        Err(e) => {
            log::warn!("downsample: {}", e);
            e.status()
        }
    }
}

// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ilp::IlpModel;
    use crate::test_helpers::{label_im_to_ascii, land_im_from_ascii, land_im_to_ascii, normalize_ascii};

    const SQUARE: &str = r#"
        ........
        ........
        ..###...
        ..###...
        ..###...
        ........
        ........
        ........
    "#;

    struct FailingBackend;

    impl IlpBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn solve(&self, _model: &IlpModel, _time_limit: Duration) -> SolveOutcome {
            SolveOutcome::Error("license expired".to_string())
        }
    }

    /// Hands back an assignment that claims nothing.
    struct EmptyBackend;

    impl IlpBackend for EmptyBackend {
        fn name(&self) -> &'static str {
            "empty"
        }

        fn solve(&self, model: &IlpModel, _time_limit: Duration) -> SolveOutcome {
            SolveOutcome::TimeLimitFeasible(vec![0.0; model.n_vars()])
        }
    }

    /// Reports the optimum as if the time limit had cut the search short.
    struct TimeLimitedBackend;

    impl IlpBackend for TimeLimitedBackend {
        fn name(&self) -> &'static str {
            "time-limited"
        }

        fn solve(&self, model: &IlpModel, time_limit: Duration) -> SolveOutcome {
            match MicroLpBackend::default().solve(model, time_limit) {
                SolveOutcome::Optimal(values) => SolveOutcome::TimeLimitFeasible(values),
                other => other,
            }
        }
    }

    // Every big pixel at cell size 2 is pure, so each has a single candidate.
    const LAKE_RING: &str = r#"
        ................
        ................
        ................
        ................
        ....########....
        ....########....
        ....##....##....
        ....##....##....
        ....##....##....
        ....##....##....
        ....########....
        ....########....
        ................
        ................
        ................
        ................
    "#;

    const LAKE_RING_REDUCED: &str = r#"
        ........
        ........
        ..####..
        ..#..#..
        ..#..#..
        ..####..
        ........
        ........
    "#;

    const TWO_ISLANDS: &str = r#"
        ................
        ................
        ..####..........
        ..####..........
        ..####..........
        ..####..........
        ................
        ................
        ................
        ................
        ..........####..
        ..........####..
        ..........####..
        ..........####..
        ................
        ................
    "#;

    fn assert_topology_kept(mask: &LandIm, out: &LandIm) {
        let before = label_components(mask);
        let after = label_components(out);
        assert_eq!(after.num_land, before.num_land);
        assert_eq!(after.num_enclosed_water(), before.num_enclosed_water());
    }

    #[test]
    fn square_downsamples_with_its_topology() {
        let mask = land_im_from_ascii(SQUARE);
        let before = label_components(&mask);
        assert_eq!((before.num_land, before.num_enclosed_water()), (1, 0));

        let report = downsample_with(&mask, &DownsampleConfig::with_cells(2, 2), &MicroLpBackend::default()).unwrap();
        let out = &report.output;
        assert_eq!((out.w, out.h), (4, 4));

        // The square covers cell (1,1) completely; nothing outside its footprint can be land.
        assert!(out.at(1, 1));
        for cy in 0..4 {
            for cx in 0..4 {
                if out.at(cx, cy) {
                    assert!((1..=2).contains(&cx) && (1..=2).contains(&cy));
                }
            }
        }
        assert!(out.count_land() < 16);

        let after = label_components(out);
        assert_eq!(after.num_land, before.num_land);
        assert_eq!(after.num_enclosed_water(), before.num_enclosed_water());

        assert_eq!(report.boundaries.len(), 1);
        assert_eq!(report.boundaries[0].vcs.iter().filter(|v| v.last).count(), 1);
        assert!(!report.time_limited);
        assert_eq!(report.input_components, before.labels);
        assert!(report.output_components.arr.iter().all(|&c| c != UNLABELED));
    }

    #[test]
    fn lake_inside_a_ring_survives() {
        let mask = land_im_from_ascii(LAKE_RING);
        let before = label_components(&mask);
        assert_eq!((before.num_land, before.num_enclosed_water()), (1, 1));

        let report = downsample_with(&mask, &DownsampleConfig::with_cells(2, 2), &MicroLpBackend::default()).unwrap();
        assert_eq!(land_im_to_ascii(&report.output), normalize_ascii(LAKE_RING_REDUCED));
        assert_topology_kept(&mask, &report.output);
        // Ring 0, ocean 1, lake 2
        assert_eq!(
            label_im_to_ascii(&report.output_components),
            normalize_ascii(
                r#"
                    11111111
                    11111111
                    11000011
                    11022011
                    11022011
                    11000011
                    11111111
                    11111111
                "#
            )
        );
        // Ring/ocean and ring/lake
        assert_eq!(report.boundaries.len(), 2);
    }

    #[test]
    fn separate_islands_stay_separate() {
        let mask = land_im_from_ascii(TWO_ISLANDS);
        let before = label_components(&mask);
        assert_eq!((before.num_land, before.num_enclosed_water()), (2, 0));

        let out = downsample(&mask, &DownsampleConfig::with_cells(2, 2)).unwrap();
        assert_eq!(out.count_land(), 8);
        assert!(out.at(1, 1) && out.at(2, 2) && out.at(5, 5) && out.at(6, 6));
        assert_topology_kept(&mask, &out);
    }

    #[test]
    fn time_limited_incumbent_is_a_success() {
        let mask = land_im_from_ascii(SQUARE);
        let cfg = DownsampleConfig::with_cells(2, 2);
        let optimal = downsample_with(&mask, &cfg, &MicroLpBackend::default()).unwrap();
        let limited = downsample_with(&mask, &cfg, &TimeLimitedBackend).unwrap();

        assert!(limited.time_limited);
        assert!(!optimal.time_limited);
        assert_eq!(limited.output, optimal.output);
        assert_eq!(limited.objective, optimal.objective);
    }

    #[test]
    fn euler_scheme_keeps_lake_and_ring() {
        let mask = land_im_from_ascii(LAKE_RING);
        let cfg = DownsampleConfig {
            scheme: Scheme::Euler,
            ..DownsampleConfig::with_cells(2, 2)
        };
        let report = downsample_with(&mask, &cfg, &MicroLpBackend::default()).unwrap();
        assert_eq!(land_im_to_ascii(&report.output), normalize_ascii(LAKE_RING_REDUCED));
        assert_topology_kept(&mask, &report.output);
        assert!(report.boundaries.is_empty());
    }

    #[test]
    fn euler_scheme_keeps_islands_apart() {
        let mask = land_im_from_ascii(TWO_ISLANDS);
        let cfg = DownsampleConfig {
            scheme: Scheme::Euler,
            ..DownsampleConfig::with_cells(2, 2)
        };
        let out = downsample(&mask, &cfg).unwrap();
        assert_eq!(out.count_land(), 8);
        assert_topology_kept(&mask, &out);
    }

    #[test]
    fn euler_scheme_cannot_keep_a_ring_on_two_by_two() {
        // A 2x2 grid has no land set with Euler characteristic 0.
        let mask = land_im_from_ascii(
            r#"
                ................
                ................
                ................
                ................
                ....########....
                ....#......#....
                ....#......#....
                ....#......#....
                ....#......#....
                ....#......#....
                ....#......#....
                ....########....
                ................
                ................
                ................
                ................
            "#,
        );
        let cfg = DownsampleConfig {
            scheme: Scheme::Euler,
            ..DownsampleConfig::with_cells(8, 8)
        };
        assert_eq!(downsample(&mask, &cfg), Err(DownsampleError::Infeasible));
    }

    #[test]
    fn downsample_into_writes_on_success() {
        let mask = land_im_from_ascii(SQUARE);
        let mut out = LandIm::new(1, 1);
        let status = downsample_into(&mask, &DownsampleConfig::with_cells(2, 2), &mut out);
        assert_eq!(status, DownsampleStatus::Success);
        assert_eq!((out.w, out.h), (4, 4));
    }

    #[test]
    fn indivisible_raster_fails_without_touching_output() {
        let mask = LandIm::new(9, 8);
        let mut out = LandIm::filled(2, 2, true);
        let status = downsample_into(&mask, &DownsampleConfig::with_cells(2, 2), &mut out);
        assert_eq!(status, DownsampleStatus::OtherFailure);
        assert_eq!(out, LandIm::filled(2, 2, true));

        assert!(matches!(
            downsample(&mask, &DownsampleConfig::with_cells(2, 2)),
            Err(DownsampleError::DimensionMismatch { w: 9, h: 8, .. })
        ));
    }

    #[test]
    fn thin_ring_is_infeasible_at_a_coarse_grid() {
        let mask = land_im_from_ascii(
            r#"
                ................
                ................
                ................
                ................
                ....########....
                ....#......#....
                ....#......#....
                ....#......#....
                ....#......#....
                ....#......#....
                ....#......#....
                ....########....
                ................
                ................
                ................
                ................
            "#,
        );
        let mut out = LandIm::new(1, 1);
        let status = downsample_into(&mask, &DownsampleConfig::with_cells(8, 8), &mut out);
        assert_eq!(status, DownsampleStatus::Infeasible);
        assert_eq!(out, LandIm::new(1, 1));
    }

    #[test]
    fn solver_errors_map_to_other_failure() {
        let mask = land_im_from_ascii(SQUARE);
        let err = downsample_with(&mask, &DownsampleConfig::with_cells(2, 2), &FailingBackend).unwrap_err();
        assert_eq!(err, DownsampleError::Solver("license expired".to_string()));
        assert_eq!(err.status(), DownsampleStatus::OtherFailure);
    }

    #[test]
    fn unclaimed_cell_is_reported() {
        let mask = land_im_from_ascii(SQUARE);
        let err = downsample_with(&mask, &DownsampleConfig::with_cells(2, 2), &EmptyBackend).unwrap_err();
        assert_eq!(err, DownsampleError::Unclaimed { x: 0, y: 0 });
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mask = land_im_from_ascii(SQUARE);
        let cfg = DownsampleConfig {
            time_limit_secs: 0.0,
            ..DownsampleConfig::with_cells(2, 2)
        };
        assert!(matches!(
            downsample(&mask, &cfg),
            Err(DownsampleError::InvalidConfig(_))
        ));
    }
}
