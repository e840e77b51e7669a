#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ROI {
    pub l: usize,
    pub t: usize,
    /// Exclusive right bound.
    pub r: usize,
    /// Exclusive bottom bound.
    pub b: usize,
}

impl ROI {
    /// Single pixel ROI.
    pub fn pixel(x: usize, y: usize) -> ROI {
        ROI {
            l: x,
            t: y,
            r: x + 1,
            b: y + 1,
        }
    }

    /// The original-resolution pixels covered by big pixel `(cx, cy)`.
    pub fn cell(cx: usize, cy: usize, cell_w: usize, cell_h: usize) -> ROI {
        ROI {
            l: cx * cell_w,
            t: cy * cell_h,
            r: (cx + 1) * cell_w,
            b: (cy + 1) * cell_h,
        }
    }

    /// Width of the ROI.
    pub fn w(&self) -> usize {
        self.r - self.l
    }

    /// Height of the ROI.
    pub fn h(&self) -> usize {
        self.b - self.t
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.l && x < self.r && y >= self.t && y < self.b
    }

    /// Make a new ROI from this one by `pad` pixels in all directions, clamped to the given max dims.
    pub fn padded(&self, pad: usize, max_w: usize, max_h: usize) -> ROI {
        let l = self.l.saturating_sub(pad);
        let t = self.t.saturating_sub(pad);
        let r = (self.r + pad).min(max_w);
        let b = (self.b + pad).min(max_h);
        ROI { l, t, r, b }
    }

    pub fn union(&mut self, other: ROI) {
        self.l = self.l.min(other.l);
        self.t = self.t.min(other.t);
        self.r = self.r.max(other.r);
        self.b = self.b.max(other.b);
    }

    /// Row-major pixel coordinates.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.t..self.b).flat_map(move |y| (self.l..self.r).map(move |x| (x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_roi_covers_the_big_pixel() {
        let roi = ROI::cell(1, 2, 4, 3);
        assert_eq!(roi, ROI { l: 4, t: 6, r: 8, b: 9 });
        assert!(roi.contains(4, 6));
        assert!(!roi.contains(8, 6));
        assert_eq!(roi.pixels().count(), 12);
        assert_eq!(roi.pixels().next(), Some((4, 6)));
    }

    #[test]
    fn padded_clamps_to_image() {
        let roi = ROI::pixel(0, 5).padded(1, 3, 6);
        assert_eq!(roi, ROI { l: 0, t: 4, r: 2, b: 6 });
    }
}
