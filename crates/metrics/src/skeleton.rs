//! Zhang–Suen thinning
//!
//! Reference: T. Y. Zhang and C. Y. Suen, "A fast parallel algorithm for
//! thinning digital patterns", CACM 27(3), 1984.

use ndarray::Array2;

/// Neighbours P2..P9, clockwise from north
const OFFSETS: [(isize, isize); 8] = [
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
];

fn neighbours(image: &Array2<u8>, row: usize, col: usize) -> [bool; 8] {
    let (height, width) = image.dim();
    let mut out = [false; 8];
    for (slot, (dr, dc)) in out.iter_mut().zip(OFFSETS) {
        let r = row.checked_add_signed(dr);
        let c = col.checked_add_signed(dc);
        if let (Some(r), Some(c)) = (r, c) {
            if r < height && c < width {
                *slot = image[[r, c]] != 0;
            }
        }
    }
    out
}

/// Thin the nonzero pixels of `image` to a one-pixel-wide skeleton
///
/// Returns a `{0, 1}` raster; pixels outside the image count as zero.
#[must_use]
pub fn zhang_suen_thin(image: &Array2<u8>) -> Array2<u8> {
    let mut current = image.mapv(|v| u8::from(v != 0));
    let (height, width) = current.dim();

    loop {
        let mut changed = false;
        for pass in 0..2 {
            let mut remove = Vec::new();
            for row in 0..height {
                for col in 0..width {
                    if current[[row, col]] == 0 {
                        continue;
                    }
                    let p = neighbours(&current, row, col);
                    let filled = p.iter().filter(|&&v| v).count();
                    if !(2..=6).contains(&filled) {
                        continue;
                    }
                    let transitions = (0..8).filter(|&i| !p[i] && p[(i + 1) % 8]).count();
                    if transitions != 1 {
                        continue;
                    }
                    // p[0]=P2 p[2]=P4 p[4]=P6 p[6]=P8
                    let keep = if pass == 0 {
                        (p[0] && p[2] && p[4]) || (p[2] && p[4] && p[6])
                    } else {
                        (p[0] && p[2] && p[6]) || (p[0] && p[4] && p[6])
                    };
                    if !keep {
                        remove.push((row, col));
                    }
                }
            }
            changed |= !remove.is_empty();
            for (row, col) in remove {
                current[[row, col]] = 0;
            }
        }
        if !changed {
            return current;
        }
    }
}
