use super::core::{Im, LandIm, LabelIm, copy_land_im_to_rgba_im, label_im_to_rgba_im};
use image::ImageResult;
use std::path::Path;

fn dim_mismatch_err() -> image::ImageError {
    image::ImageError::Parameter(image::error::ParameterError::from_kind(
        image::error::ParameterErrorKind::DimensionMismatch,
    ))
}

// PNG I/O
// -----------------------------------------------------------------------------
impl Im<u8, 4> {
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        let img = image::RgbaImage::from_raw(self.w as u32, self.h as u32, self.arr.clone())
            .ok_or_else(dim_mismatch_err)?;

        img.save_with_format(path, image::ImageFormat::Png)
    }

    pub fn load_png<P: AsRef<Path>>(path: P) -> ImageResult<Self> {
        let img = image::open(path)?.into_rgba8();
        let w = img.width() as usize;
        let h = img.height() as usize;
        let raw = img.into_raw();

        if raw.len() != w * h * 4 {
            return Err(dim_mismatch_err());
        }

        Ok(Self {
            w,
            h,
            s: w * 4,
            arr: raw,
        })
    }

    /// A pixel is land iff each of R, G and B reaches `threshold`. Alpha is ignored.
    pub fn binarize(&self, threshold: u8) -> LandIm {
        let mut land_im = LandIm::new(self.w, self.h);
        for y in 0..self.h {
            for x in 0..self.w {
                let (r, g, b) = unsafe {
                    (
                        *self.get_unchecked(x, y, 0),
                        *self.get_unchecked(x, y, 1),
                        *self.get_unchecked(x, y, 2),
                    )
                };
                let v = r >= threshold && g >= threshold && b >= threshold;
                unsafe {
                    *land_im.get_unchecked_mut(x, y, 0) = v;
                }
            }
        }
        land_im
    }
}

impl LandIm {
    pub fn load_png<P: AsRef<Path>>(path: P, threshold: u8) -> ImageResult<Self> {
        Ok(Im::<u8, 4>::load_png(path)?.binarize(threshold))
    }

    /// Land is written white, water black.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        let mut rgba = Im::<u8, 4>::new(self.w, self.h);
        copy_land_im_to_rgba_im(self, &mut rgba, 255, 255, 255);
        rgba.save_png(path)
    }
}

impl LabelIm {
    /// Component ids as RGB, see `label_im_to_rgba_im`.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        label_im_to_rgba_im(self).save_png(path)
    }
}

// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binarize_requires_all_three_channels() {
        let mut rgba = Im::<u8, 4>::new(3, 1);
        rgba.arr[0..4].copy_from_slice(&[26, 26, 26, 0]);
        rgba.arr[4..8].copy_from_slice(&[255, 255, 25, 255]);
        rgba.arr[8..12].copy_from_slice(&[200, 100, 30, 255]);

        let land = rgba.binarize(26);
        assert_eq!(land.arr, vec![true, false, true]);
    }

    #[test]
    fn land_png_round_trips_through_disk() {
        let mut land = LandIm::new(4, 2);
        land.set(1, 0, true);
        land.set(3, 1, true);

        let path = std::env::temp_dir().join(format!("topods_io_test_{}.png", std::process::id()));
        land.save_png(&path).unwrap();
        let loaded = LandIm::load_png(&path, 26).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, land);
    }
}
