#[derive(Debug, Clone, PartialEq)]
pub struct Im<T, const N_CH: usize> {
    pub w: usize,
    pub h: usize,
    pub s: usize, // stride in elements (w * N_CH)
    pub arr: Vec<T>,
}

// Constructor
// -----------------------------------------------------------------------------
impl<T: Copy + Default, const N_CH: usize> Im<T, N_CH> {
    pub fn new(w: usize, h: usize) -> Self {
        let s = w * N_CH;
        let arr = vec![T::default(); s * h];
        Self { w, h, s, arr }
    }
}

impl<T: Copy, const N_CH: usize> Im<T, N_CH> {
    pub fn filled(w: usize, h: usize, v: T) -> Self {
        let s = w * N_CH;
        let arr = vec![v; s * h];
        Self { w, h, s, arr }
    }
}

impl<T, const N_CH: usize> Im<T, N_CH> {
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, x: usize, y: usize, ch: usize) -> &T {
        unsafe { self.arr.get_unchecked(y * self.s + x * N_CH + ch) }
    }

    #[inline(always)]
    pub unsafe fn get_unchecked_mut(&mut self, x: usize, y: usize, ch: usize) -> &mut T {
        unsafe { self.arr.get_unchecked_mut(y * self.s + x * N_CH + ch) }
    }

    /// Number of pixels (not elements).
    #[inline]
    pub fn n_pixels(&self) -> usize {
        self.w * self.h
    }
}

// Single-channel helpers
// -----------------------------------------------------------------------------
impl<T: Copy> Im<T, 1> {
    /// Wrap a row-major buffer of exactly `w * h` values.
    pub fn from_vec(w: usize, h: usize, arr: Vec<T>) -> Option<Self> {
        if arr.len() != w * h {
            return None;
        }
        Some(Self { w, h, s: w, arr })
    }

    #[inline(always)]
    pub fn at(&self, x: usize, y: usize) -> T {
        self.arr[y * self.s + x]
    }

    #[inline(always)]
    pub fn set(&mut self, x: usize, y: usize, v: T) {
        self.arr[y * self.s + x] = v;
    }

    /// Signed lookup; `None` outside the image.
    #[inline]
    pub fn at_signed(&self, x: isize, y: isize) -> Option<T> {
        if x < 0 || y < 0 || x as usize >= self.w || y as usize >= self.h {
            return None;
        }
        Some(self.arr[y as usize * self.s + x as usize])
    }
}

pub type RGBAIm = Im<u8, 4>;
pub type LabelIm = Im<u32, 1>;

/// Binary raster; `true` is land.
pub type LandIm = Im<bool, 1>;

impl LandIm {
    pub fn count_land(&self) -> usize {
        self.arr.iter().filter(|&&v| v).count()
    }
}

/// Land pixels become `(r, g, b)`, water becomes opaque black.
pub fn copy_land_im_to_rgba_im(src: &LandIm, dst: &mut RGBAIm, r: u8, g: u8, b: u8) {
    assert_eq!(src.w, dst.w, "width mismatch");
    assert_eq!(src.h, dst.h, "height mismatch");

    for y in 0..src.h {
        for x in 0..src.w {
            let m = unsafe { *src.get_unchecked(x, y, 0) };
            let rgba = if m {
                [r, g, b, 255_u8]
            } else {
                [0_u8, 0_u8, 0_u8, 255_u8]
            };
            for (ch, v) in rgba.into_iter().enumerate() {
                unsafe {
                    *dst.get_unchecked_mut(x, y, ch) = v;
                }
            }
        }
    }
}

/// Encode component ids as RGB: `id * 5` split into base-256 digits (r is least significant).
pub fn label_im_to_rgba_im(labels: &LabelIm) -> RGBAIm {
    let mut dst = RGBAIm::new(labels.w, labels.h);
    for y in 0..labels.h {
        for x in 0..labels.w {
            let index = labels.at(x, y).wrapping_mul(5);
            let rgba = [
                (index % 256) as u8,
                ((index / 256) % 256) as u8,
                ((index / 65536) % 256) as u8,
                255_u8,
            ];
            for (ch, v) in rgba.into_iter().enumerate() {
                unsafe {
                    *dst.get_unchecked_mut(x, y, ch) = v;
                }
            }
        }
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_and_from_vec_agree_on_layout() {
        let im = Im::<u32, 1>::new(3, 2);
        assert_eq!(im.s, 3);
        assert_eq!(im.arr.len(), 6);

        let im = Im::<u32, 1>::from_vec(3, 2, vec![0, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(im.at(2, 1), 5);
        assert_eq!(im.at_signed(-1, 0), None);
        assert_eq!(im.at_signed(0, 2), None);
        assert_eq!(im.at_signed(1, 1), Some(4));

        assert!(Im::<u32, 1>::from_vec(3, 2, vec![0; 5]).is_none());
    }

    #[test]
    fn land_im_counts_and_converts() {
        let mut im = LandIm::new(2, 2);
        im.set(1, 0, true);
        im.set(0, 1, true);
        assert_eq!(im.count_land(), 2);

        let mut rgba = RGBAIm::new(2, 2);
        copy_land_im_to_rgba_im(&im, &mut rgba, 255, 255, 255);
        assert_eq!(&rgba.arr[4..8], &[255, 255, 255, 255]);
        assert_eq!(&rgba.arr[0..4], &[0, 0, 0, 255]);
    }

    #[test]
    fn label_colors_are_base_256_digits_of_id_times_five() {
        let labels = LabelIm::from_vec(2, 1, vec![1, 60]).unwrap();
        let rgba = label_im_to_rgba_im(&labels);
        assert_eq!(&rgba.arr[0..4], &[5, 0, 0, 255]);
        // 60 * 5 = 300 = 1 * 256 + 44
        assert_eq!(&rgba.arr[4..8], &[44, 1, 0, 255]);
    }
}
