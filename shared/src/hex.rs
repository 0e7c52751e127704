//! Axial hex-grid geometry for the game board
//!
//! Cells are addressed with axial coordinates `(r, q)`. The cube form
//! `(r, q, s)` with `s = -q - r` is derived on demand for rounding,
//! interpolation and distance math.
//!
//! The playable board for a given `board_size` is the `board_size x board_size`
//! rhombus trimmed to a hexagon: a cell is on the board when both coordinates
//! lie in `[0, board_size - 1]` and their sum lies in
//! `[board_size / 2, board_size + board_size / 2 - 1]`.
//!
//! Ring and spiral enumeration are clipped to the board. Off-board cells are
//! skipped, never substituted, so clipped rings are simply shorter.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Rejection-sampling attempts before falling back to a full board scan
pub const MAX_PLACEMENT_ATTEMPTS: usize = 256;

/// Axial coordinate of a single board cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hex {
    pub r: i32,
    pub q: i32,
}

/// Cube coordinate, always satisfying `r + q + s == 0`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cube {
    pub r: i32,
    pub q: i32,
    pub s: i32,
}

/// Cube coordinate with fractional components, produced by scaling or
/// interpolating between cells and turned back into a cell with [`round_cube`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractionalCube {
    pub r: f64,
    pub q: f64,
    pub s: f64,
}

/// The six unit steps, indexed by direction `0..6`.
///
/// Ring walks start `radius` steps along direction 4 and then follow
/// directions 0 through 5 in order.
pub const DIRECTIONS: [Hex; 6] = [
    Hex { r: 0, q: 1 },
    Hex { r: -1, q: 1 },
    Hex { r: -1, q: 0 },
    Hex { r: 0, q: -1 },
    Hex { r: 1, q: -1 },
    Hex { r: 1, q: 0 },
];

impl Hex {
    pub const fn new(r: i32, q: i32) -> Self {
        Self { r, q }
    }

    pub fn to_cube(self) -> Cube {
        Cube {
            r: self.r,
            q: self.q,
            s: -self.q - self.r,
        }
    }

    pub fn add(self, other: Hex) -> Hex {
        Hex::new(self.r + other.r, self.q + other.q)
    }

    pub fn scale(self, factor: i32) -> Hex {
        Hex::new(self.r * factor, self.q * factor)
    }

    /// Adjacent cell in the given direction. Directions wrap modulo 6.
    pub fn neighbor(self, direction: usize) -> Hex {
        self.add(DIRECTIONS[direction % DIRECTIONS.len()])
    }

    /// Number of steps between two cells
    pub fn distance(self, other: Hex) -> i32 {
        let a = self.to_cube();
        let b = other.to_cube();
        ((a.r - b.r).abs() + (a.q - b.q).abs() + (a.s - b.s).abs()) / 2
    }
}

impl Cube {
    pub fn to_axial(self) -> Hex {
        Hex::new(self.r, self.q)
    }
}

impl From<Cube> for FractionalCube {
    fn from(cube: Cube) -> Self {
        Self {
            r: cube.r as f64,
            q: cube.q as f64,
            s: cube.s as f64,
        }
    }
}

/// Rounds a fractional cube to the nearest cell.
///
/// Each component is rounded on its own, then the component with the
/// largest rounding error is recomputed from the other two. Ties resolve in
/// the order q, then r, then s.
pub fn round_cube(frac: FractionalCube) -> Cube {
    let mut r = frac.r.round();
    let mut q = frac.q.round();
    let mut s = frac.s.round();

    let r_diff = (r - frac.r).abs();
    let q_diff = (q - frac.q).abs();
    let s_diff = (s - frac.s).abs();

    if q_diff > r_diff && q_diff > s_diff {
        q = -r - s;
    } else if r_diff > s_diff {
        r = -q - s;
    } else {
        s = -q - r;
    }

    Cube {
        r: r as i32,
        q: q as i32,
        s: s as i32,
    }
}

/// Rounds a fractional axial position to the nearest cell
pub fn round_axial(r: f64, q: f64) -> Hex {
    round_cube(FractionalCube { r, q, s: -q - r }).to_axial()
}

/// Linear interpolation between two cells in cube space
pub fn lerp(a: Hex, b: Hex, t: f64) -> FractionalCube {
    let a = FractionalCube::from(a.to_cube());
    let b = FractionalCube::from(b.to_cube());
    FractionalCube {
        r: a.r + (b.r - a.r) * t,
        q: a.q + (b.q - a.q) * t,
        s: a.s + (b.s - a.s) * t,
    }
}

/// Cells on the straight line from `a` to `b`, both ends included
pub fn line(a: Hex, b: Hex) -> Vec<Hex> {
    let steps = a.distance(b);
    if steps == 0 {
        return vec![a];
    }

    // Nudge off exact cell edges so ties round consistently.
    (0..=steps)
        .map(|i| {
            let p = lerp(a, b, i as f64 / steps as f64);
            round_cube(FractionalCube {
                r: p.r + 1e-6,
                q: p.q + 1e-6,
                s: p.s - 2e-6,
            })
            .to_axial()
        })
        .collect()
}

/// Whether a cell lies inside the playable hexagon
pub fn is_on_board(hex: Hex, board_size: i32) -> bool {
    if board_size <= 0 {
        return false;
    }

    let lower = board_size / 2;
    let upper = board_size + lower - 1;
    let sum = hex.r + hex.q;

    (0..board_size).contains(&hex.r)
        && (0..board_size).contains(&hex.q)
        && sum >= lower
        && sum <= upper
}

/// Every on-board cell, scanned row by row
pub fn board_cells(board_size: i32) -> Vec<Hex> {
    (0..board_size.max(0))
        .flat_map(|r| (0..board_size).map(move |q| Hex::new(r, q)))
        .filter(|hex| is_on_board(*hex, board_size))
        .collect()
}

/// Cells at exactly `radius` steps from `center`, clipped to the board
pub fn ring(board_size: i32, center: Hex, radius: i32) -> Vec<Hex> {
    let mut results = Vec::new();
    let mut hex = center.add(DIRECTIONS[4].scale(radius));

    for direction in 0..DIRECTIONS.len() {
        for _ in 0..radius {
            if is_on_board(hex, board_size) {
                results.push(hex);
            }
            hex = hex.neighbor(direction);
        }
    }

    results
}

/// Rings `1..=radius` around `center`, clipped to the board, followed by
/// `center` itself as the last element
pub fn spiral(board_size: i32, center: Hex, radius: i32) -> Vec<Hex> {
    let mut results = Vec::new();
    for i in 1..=radius {
        results.extend(ring(board_size, center, i));
    }
    results.push(center);
    results
}

/// Picks an on-board cell that is not in `occupied`.
///
/// Samples uniformly over the square grid first. After
/// [`MAX_PLACEMENT_ATTEMPTS`] misses it scans the whole board and picks among
/// the remaining free cells, returning `None` only when the board is full.
pub fn random_free_position<R: Rng + ?Sized>(
    board_size: i32,
    occupied: &HashSet<Hex>,
    rng: &mut R,
) -> Option<Hex> {
    if board_size <= 0 {
        return None;
    }

    for _ in 0..MAX_PLACEMENT_ATTEMPTS {
        let hex = Hex::new(rng.gen_range(0..board_size), rng.gen_range(0..board_size));
        if is_on_board(hex, board_size) && !occupied.contains(&hex) {
            return Some(hex);
        }
    }

    let free: Vec<Hex> = board_cells(board_size)
        .into_iter()
        .filter(|hex| !occupied.contains(hex))
        .collect();
    free.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_cube_round_trip() {
        for r in -5..=5 {
            for q in -5..=5 {
                let hex = Hex::new(r, q);
                let cube = hex.to_cube();
                assert_eq!(cube.r + cube.q + cube.s, 0);
                assert_eq!(cube.to_axial(), hex);
            }
        }
    }

    #[test]
    fn test_round_cube_fixes_largest_error() {
        // q is furthest from its rounded value, so it is recomputed
        let cube = round_cube(FractionalCube {
            r: 1.1,
            q: -0.4,
            s: -0.7,
        });
        assert_eq!(cube, Cube { r: 1, q: 0, s: -1 });

        // q and r tie, so q is left alone and r is recomputed
        let cube = round_cube(FractionalCube {
            r: 0.6,
            q: 0.6,
            s: -1.2,
        });
        assert_eq!(cube, Cube { r: 0, q: 1, s: -1 });
    }

    #[test]
    fn test_round_cube_q_and_s_tie_fixes_s() {
        let cube = round_cube(FractionalCube {
            r: 0.0,
            q: 0.5,
            s: -0.5,
        });
        assert_eq!(cube, Cube { r: 0, q: 1, s: -1 });
    }

    #[test]
    fn test_round_axial_exact_cells_are_stable() {
        assert_eq!(round_axial(3.0, 4.0), Hex::new(3, 4));
        assert_eq!(round_axial(3.2, 3.9), Hex::new(3, 4));
    }

    #[test]
    fn test_lerp_midpoint() {
        let mid = lerp(Hex::new(0, 0), Hex::new(2, 4), 0.5);
        assert_approx_eq!(mid.r, 1.0);
        assert_approx_eq!(mid.q, 2.0);
        assert_approx_eq!(mid.s, -3.0);
    }

    #[test]
    fn test_line_endpoints_and_length() {
        let a = Hex::new(2, 3);
        let b = Hex::new(6, 1);
        let cells = line(a, b);
        assert_eq!(cells.len() as i32, a.distance(b) + 1);
        assert_eq!(cells.first(), Some(&a));
        assert_eq!(cells.last(), Some(&b));
        for pair in cells.windows(2) {
            assert_eq!(pair[0].distance(pair[1]), 1);
        }
    }

    #[test]
    fn test_neighbors_are_adjacent() {
        let center = Hex::new(8, 8);
        for direction in 0..6 {
            assert_eq!(center.distance(center.neighbor(direction)), 1);
        }
        assert_eq!(center.neighbor(6), center.neighbor(0));
    }

    #[test]
    fn test_board_bounds_size_17() {
        assert!(is_on_board(Hex::new(8, 8), 17));
        assert!(is_on_board(Hex::new(0, 8), 17));
        assert!(is_on_board(Hex::new(16, 8), 17));
        assert!(!is_on_board(Hex::new(0, 7), 17));
        assert!(!is_on_board(Hex::new(16, 9), 17));
        assert!(!is_on_board(Hex::new(-1, 10), 17));
        assert!(!is_on_board(Hex::new(17, 0), 17));
    }

    #[test]
    fn test_board_cell_count_is_hexagonal() {
        // a hexagon with side n has 3n(n-1)+1 cells
        assert_eq!(board_cells(5).len(), 19);
        assert_eq!(board_cells(7).len(), 37);
        assert_eq!(board_cells(17).len(), 217);
        assert!(board_cells(0).is_empty());
    }

    #[test]
    fn test_ring_in_open_board() {
        let center = Hex::new(8, 8);
        for radius in 1..=4 {
            let cells = ring(17, center, radius);
            assert_eq!(cells.len() as i32, 6 * radius);
            assert!(cells.iter().all(|c| c.distance(center) == radius));
        }
        assert!(ring(17, center, 0).is_empty());
    }

    #[test]
    fn test_ring_starts_along_direction_four() {
        let cells = ring(17, Hex::new(8, 8), 2);
        assert_eq!(cells[0], Hex::new(10, 6));
    }

    #[test]
    fn test_ring_clipped_at_edge() {
        let corner = Hex::new(0, 8);
        let cells = ring(17, corner, 1);
        assert!(cells.len() < 6);
        assert!(cells.iter().all(|c| is_on_board(*c, 17)));
    }

    #[test]
    fn test_spiral_ends_with_center() {
        let center = Hex::new(4, 4);
        let cells = spiral(9, center, 2);
        assert_eq!(cells.last(), Some(&center));
        assert_eq!(cells.len(), 6 + 12 + 1);

        assert_eq!(spiral(9, center, 0), vec![center]);
    }

    #[test]
    fn test_random_free_position_avoids_occupied() {
        let mut rng = StdRng::seed_from_u64(7);
        let occupied: HashSet<Hex> = board_cells(5).into_iter().skip(1).collect();
        let free = random_free_position(5, &occupied, &mut rng);
        assert_eq!(free, board_cells(5).first().copied());
    }

    #[test]
    fn test_random_free_position_full_board() {
        let mut rng = StdRng::seed_from_u64(7);
        let occupied: HashSet<Hex> = board_cells(5).into_iter().collect();
        assert_eq!(random_free_position(5, &occupied, &mut rng), None);
    }

    #[test]
    fn test_random_free_position_on_board() {
        let mut rng = StdRng::seed_from_u64(42);
        let occupied = HashSet::new();
        for _ in 0..100 {
            let hex = random_free_position(17, &occupied, &mut rng).unwrap();
            assert!(is_on_board(hex, 17));
        }
    }
}
