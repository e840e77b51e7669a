use crate::im::{LabelIm, LandIm};

/// Parse an ASCII raster: `#` is land, `.` is water. Blank lines and indentation are ignored.
pub fn land_im_from_ascii(grid: &str) -> LandIm {
    let rows: Vec<&str> = grid
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let h = rows.len();
    assert!(h > 0, "grid must have at least one non-empty row");
    let w = rows[0].len();
    assert!(w > 0, "grid rows must be non-empty");
    for r in &rows {
        assert_eq!(r.len(), w, "all rows must have equal length");
    }

    let mut im = LandIm::new(w, h);
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let v = match ch {
                '#' => true,
                '.' => false,
                _ => panic!("invalid raster char '{ch}', expected '#' or '.'"),
            };
            im.arr[y * im.s + x] = v;
        }
    }
    im
}

pub fn land_im_to_ascii(im: &LandIm) -> String {
    let mut out = String::new();
    for y in 0..im.h {
        for x in 0..im.w {
            out.push(if im.at(x, y) { '#' } else { '.' });
        }
        out.push('\n');
    }
    out
}

/// Same layout as `land_im_from_ascii` output, trimmed, for comparing against a literal.
pub fn normalize_ascii(grid: &str) -> String {
    let mut out = String::new();
    for l in grid.lines().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        out.push_str(l);
        out.push('\n');
    }
    out
}

/// Component ids as base-36 digits; `*` for ids that do not fit.
pub fn label_im_to_ascii(im: &LabelIm) -> String {
    let mut out = String::new();
    for y in 0..im.h {
        for x in 0..im.w {
            let v = im.at(x, y);
            let ch = match v {
                0..=9 => (b'0' + (v as u8)) as char,
                10..=35 => (b'A' + ((v as u8) - 10)) as char,
                _ => '*',
            };
            out.push(ch);
        }
        out.push('\n');
    }
    out
}
