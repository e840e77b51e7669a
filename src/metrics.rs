use crate::im::LandIm;

/// Pixel-level agreement between an input mask and its downsampled output,
/// measured at input resolution with land as the positive class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorMetrics {
    pub tp: usize,
    pub fp: usize,
    pub fn_: usize,
    pub tn: usize,
    pub iou: f64,
    pub dice: f64,
    pub precision: f64,
    pub recall: f64,
}

/// An empty denominator means both masks agree there is nothing to find.
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        1.0
    } else {
        num as f64 / den as f64
    }
}

/// Compare every input pixel with the output pixel covering it.
/// None when the output size does not divide the input size.
pub fn error_metrics(input: &LandIm, output: &LandIm) -> Option<ErrorMetrics> {
    let (w, h) = (input.w, input.h);
    let (new_w, new_h) = (output.w, output.h);
    if w == 0 || h == 0 || new_w == 0 || new_h == 0 || w % new_w != 0 || h % new_h != 0 {
        return None;
    }

    let (mut tp, mut fp, mut fn_, mut tn) = (0, 0, 0, 0);
    for y in 0..h {
        let oy = y * new_h / h;
        for x in 0..w {
            let ox = x * new_w / w;
            match (input.at(x, y), output.at(ox, oy)) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => tn += 1,
            }
        }
    }

    let metrics = ErrorMetrics {
        tp,
        fp,
        fn_,
        tn,
        iou: ratio(tp, tp + fp + fn_),
        dice: ratio(2 * tp, 2 * tp + fp + fn_),
        precision: ratio(tp, tp + fp),
        recall: ratio(tp, tp + fn_),
    };
    log::info!(
        "error metrics: IoU {:.4} Dice {:.4} Precision {:.4} Recall {:.4}",
        metrics.iou,
        metrics.dice,
        metrics.precision,
        metrics.recall
    );
    Some(metrics)
}

/// Smallest integer weights `(land, water)` such that `threshold` land pixels
/// outweigh the remaining water pixels of a `total`-pixel cell while
/// `threshold - 1` land pixels do not.
///
/// With `X = threshold` and `Y = total - threshold` this is the smallest `b`
/// admitting an integer `a` with `Y/X * b < a < (Y+1)/(X-1) * b`.
pub fn pixel_weights(total: usize, threshold: usize) -> Option<(i64, i64)> {
    if threshold == 0 || threshold > total {
        return None;
    }
    let x = threshold as i64;
    let y = (total - threshold) as i64;
    if x == 1 {
        // A single land pixel beats y water pixels; zero land never wins.
        return Some((y + 1, 1));
    }

    for b in 1..=10_000i64 {
        let lower = y * b / x;
        let upper = ((y + 1) * b + x - 2) / (x - 1);
        if upper - 1 >= lower + 1 {
            return Some((lower + 1, b));
        }
    }
    log::warn!("pixel_weights: no weights for total {} threshold {}", total, threshold);
    None
}

// Tests
// -----------------------------------------------------------------------------
