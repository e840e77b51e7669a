//! Neighbor-group counts in a 3x3 window.
//!
//! The 8-ring is encoded as a bitmask where bit `k` is ring position `k`,
//! counter-clockwise from the lower-left neighbor (see `RING`).

use crate::im::LandIm;

/// Group count reported when no ring neighbor matches.
pub const ISOLATED: u8 = 5;

/// Ring offsets `(dx, dy)` indexed by bit position.
pub const RING: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
];

const fn n8_count(ring: u8) -> u8 {
    if ring == 0 {
        return ISOLATED;
    }
    if ring == 0xFF {
        return 1;
    }
    let mut runs = 0;
    let mut k = 0;
    while k < 8 {
        let cur = (ring >> k) & 1;
        let prev = (ring >> ((k + 7) % 8)) & 1;
        if cur == 1 && prev == 0 {
            runs += 1;
        }
        k += 1;
    }
    runs
}

const fn n4_count(ring: u8) -> u8 {
    let e = [(ring >> 1) & 1, (ring >> 3) & 1, (ring >> 5) & 1, (ring >> 7) & 1];
    let sum = e[0] + e[1] + e[2] + e[3];
    match sum {
        0 => ISOLATED,
        2 => {
            let mut i = 0;
            while i < 4 {
                if e[i] == 1 && e[(i + 1) % 4] == 1 {
                    return 1;
                }
                i += 1;
            }
            2
        }
        _ => 1,
    }
}

const fn build_n8_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = n8_count(i as u8);
        i += 1;
    }
    table
}

const fn build_n4_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = n4_count(i as u8);
        i += 1;
    }
    table
}

pub const N8_GROUPS: [u8; 256] = build_n8_table();
pub const N4_GROUPS: [u8; 256] = build_n4_table();

/// Number of cyclic runs of set bits in the 8-ring.
#[inline(always)]
pub fn n8_groups(ring: u8) -> u8 {
    N8_GROUPS[ring as usize]
}

/// Groups among the four edge neighbors (bits 1, 3, 5, 7).
#[inline(always)]
pub fn n4_groups(ring: u8) -> u8 {
    N4_GROUPS[ring as usize]
}

/// Bitmask of ring neighbors of `(x, y)` whose value equals `val`.
/// The caller guarantees `(x, y)` is an interior pixel.
#[inline]
pub fn ring_matching(im: &LandIm, x: usize, y: usize, val: bool) -> u8 {
    debug_assert!(x >= 1 && y >= 1 && x + 1 < im.w && y + 1 < im.h);
    let mut ring = 0u8;
    for (k, &(dx, dy)) in RING.iter().enumerate() {
        let nx = (x as isize + dx) as usize;
        let ny = (y as isize + dy) as usize;
        if im.at(nx, ny) == val {
            ring |= 1 << k;
        }
    }
    ring
}

// Tests
// -----------------------------------------------------------------------------
