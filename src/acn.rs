//! 2x2 decimation by adaptive crossing number.

use crate::connectivity::{n4_groups, n8_groups, ring_matching};
use crate::error::DownsampleError;
use crate::im::{Im, LandIm};
use rayon::prelude::*;

/// Per-pixel ACN. Border pixels are 0.
pub fn acn_im(mask: &LandIm) -> Im<u8, 1> {
    let w = mask.w;
    let h = mask.h;
    let mut acns = Im::<u8, 1>::new(w, h);
    if w < 3 || h < 3 {
        return acns;
    }

    acns.arr
        .par_chunks_mut(w)
        .enumerate()
        .filter(|(y, _)| *y >= 1 && *y + 1 < h)
        .for_each(|(y, row)| {
            for x in 1..w - 1 {
                let ring = ring_matching(mask, x, y, mask.at(x, y));
                row[x] = if ring.count_ones() < 4 {
                    n8_groups(ring)
                } else {
                    n4_groups(ring)
                };
            }
        });
    acns
}

/// Halve both dimensions keeping, per 2x2 block, the pixel with the highest ACN.
/// Ties go to the earliest of top-left, top-right, bottom-right, bottom-left.
pub fn downsample_acn(mask: &LandIm) -> Result<LandIm, DownsampleError> {
    if mask.w % 2 != 0 || mask.h % 2 != 0 {
        return Err(DownsampleError::DimensionMismatch {
            w: mask.w,
            h: mask.h,
            cell_w: 2,
            cell_h: 2,
        });
    }

    let acns = acn_im(mask);
    let new_w = mask.w / 2;
    let new_h = mask.h / 2;
    let mut out = LandIm::new(new_w, new_h);
    for by in 0..new_h {
        for bx in 0..new_w {
            let (x0, y0) = (bx * 2, by * 2);
            let order = [(x0, y0), (x0 + 1, y0), (x0 + 1, y0 + 1), (x0, y0 + 1)];

            let mut best = order[0];
            let mut best_acn = acns.at(best.0, best.1);
            for &(x, y) in &order[1..] {
                let acn = acns.at(x, y);
                if acn > best_acn {
                    best = (x, y);
                    best_acn = acn;
                }
            }
            out.set(bx, by, mask.at(best.0, best.1));
        }
    }

    log::debug!(
        "downsample_acn: {}x{} -> {}x{}",
        mask.w,
        mask.h,
        new_w,
        new_h
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::ISOLATED;
    use crate::test_helpers::{land_im_from_ascii, land_im_to_ascii, normalize_ascii};

    #[test]
    fn acn_of_isolated_and_line_pixels() {
        let mask = land_im_from_ascii(
            r#"
                ......
                .#....
                ......
                ..###.
                ......
            "#,
        );
        let acns = acn_im(&mask);

        assert_eq!(acns.at(0, 0), 0);
        // Lone land pixel: no matching neighbor.
        assert_eq!(acns.at(1, 1), ISOLATED);
        // Middle of a horizontal line: two land neighbors on opposite sides.
        assert_eq!(acns.at(3, 3), 2);
        // Line end: one neighbor.
        assert_eq!(acns.at(2, 3), 1);
        // Water with five matching neighbors falls back to the edge ring.
        assert_eq!(acns.at(2, 2), 1);
    }

    #[test]
    fn thin_line_survives_where_majority_would_drop_it() {
        let mask = land_im_from_ascii(
            r#"
                ........
                ........
                ........
                .######.
                ........
                ........
                ........
                ........
            "#,
        );
        let out = downsample_acn(&mask).unwrap();
        assert_eq!(
            land_im_to_ascii(&out),
            normalize_ascii(
                r#"
                    ....
                    .##.
                    ....
                    ....
                "#
            )
        );
    }

    #[test]
    fn odd_dimensions_are_rejected() {
        let mask = LandIm::new(5, 4);
        assert!(matches!(
            downsample_acn(&mask),
            Err(DownsampleError::DimensionMismatch { w: 5, h: 4, .. })
        ));
    }

    #[test]
    fn acn_is_deterministic() {
        let mask = land_im_from_ascii(
            r#"
                ..#.....
                .###..#.
                ..#..##.
                ......#.
                .##.....
                .#..###.
                ....#.#.
                ........
            "#,
        );
        let a = downsample_acn(&mask).unwrap();
        let b = downsample_acn(&mask).unwrap();
        assert_eq!(a, b);
        assert_eq!(acn_im(&mask), acn_im(&mask));
    }
}
