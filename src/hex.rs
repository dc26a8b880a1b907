//! Hex-board geometry: axial coordinates, directions, distance, and the
//! precomputed adjacency/ring tables the rest of the engine leans on.
//!
//! The board is a radius-4 hexagon (61 cells) in axial coordinates `(q, r)`
//! with an implicit third axis `s = -q - r`. Nothing in this module is
//! fallible -- a `Hex` can always be asked for a distance or a neighbor;
//! whether the result still lies on the board is a separate question
//! (`Hex::is_valid`).

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// The board radius. Valid hexes satisfy `|q|, |r|, |q + r| <= RADIUS`.
pub const RADIUS: i8 = 4;

/// Total number of valid hexes on the board (61 for `RADIUS = 4`).
pub const NUM_HEXES: usize = 61;

/// An axial hex coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hex {
    pub q: i8,
    pub r: i8,
}

impl Hex {
    pub const fn new(q: i8, r: i8) -> Hex {
        Hex { q, r }
    }

    /// The implicit third axial coordinate.
    #[inline]
    pub fn s(&self) -> i8 {
        -self.q - self.r
    }

    /// Whether this hex lies on the radius-4 board.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.q.abs() <= RADIUS && self.r.abs() <= RADIUS && (self.q + self.r).abs() <= RADIUS
    }

    /// Hex distance between two coordinates (max-of-three-axis formula).
    #[inline]
    pub fn distance(&self, other: &Hex) -> u32 {
        let dq = (self.q - other.q).unsigned_abs() as u32;
        let dr = (self.r - other.r).unsigned_abs() as u32;
        let ds = (self.s() - other.s()).unsigned_abs() as u32;
        (dq + dr + ds) / 2
    }

    /// Distance from this hex to the board center `(0, 0)`.
    #[inline]
    pub fn distance_to_center(&self) -> u32 {
        self.distance(&Hex::new(0, 0))
    }

    /// The neighboring hex in a given absolute direction. Not checked for
    /// validity -- the result may fall off the board.
    #[inline]
    pub fn neighbor(&self, dir: Direction) -> Hex {
        let (dq, dr) = dir.vector();
        Hex::new(self.q + dq, self.r + dr)
    }

    /// Iterates the hexes forming the ring of the given radius around this
    /// hex, in the same traversal order as the reference implementation:
    /// starting at the south-west corner and walking each of the six edges.
    pub fn ring(&self, radius: u32) -> RingIter {
        RingIter::new(*self, radius)
    }
}

/// One of the six unit directions on the hex grid, in the fixed rotational
/// order used throughout the engine (index 0..5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    N = 0,
    NE = 1,
    SE = 2,
    S = 3,
    SW = 4,
    NW = 5,
}

pub const ALL_DIRECTIONS: [Direction; 6] = [
    Direction::N,
    Direction::NE,
    Direction::SE,
    Direction::S,
    Direction::SW,
    Direction::NW,
];

impl Direction {
    #[inline]
    pub fn from_index(i: u8) -> Direction {
        ALL_DIRECTIONS[(i % 6) as usize]
    }

    #[inline]
    pub fn index(&self) -> u8 {
        *self as u8
    }

    /// The `(dq, dr)` unit vector for this direction.
    #[inline]
    pub fn vector(&self) -> (i8, i8) {
        match self {
            Direction::N => (0, -1),
            Direction::NE => (1, -1),
            Direction::SE => (1, 0),
            Direction::S => (0, 1),
            Direction::SW => (-1, 1),
            Direction::NW => (-1, 0),
        }
    }

    /// Applies a relative direction (0..5, interpreted modulo 6 from this
    /// facing) and returns the resulting absolute direction.
    #[inline]
    pub fn rotate(&self, relative: RelativeDirection) -> Direction {
        Direction::from_index(self.index().wrapping_add(relative))
    }

    #[inline]
    pub fn opposite(&self) -> Direction {
        Direction::from_index(self.index() + 3)
    }
}

/// A relative direction offset, 0..5, interpreted modulo 6 from a piece's
/// facing. `0` is forward, `3` is directly backward.
pub type RelativeDirection = u8;

pub const FORWARD: RelativeDirection = 0;
pub const FORWARD_RIGHT: RelativeDirection = 1;
pub const BACK_RIGHT: RelativeDirection = 2;
pub const BACKWARD: RelativeDirection = 3;
pub const BACK_LEFT: RelativeDirection = 4;
pub const FORWARD_LEFT: RelativeDirection = 5;

/// The forward arc: `{0, 5, 1}`, the three relative directions flanking
/// straight ahead.
pub const FORWARD_ARC: [RelativeDirection; 3] = [FORWARD, FORWARD_LEFT, FORWARD_RIGHT];

/// All six relative directions.
pub const ALL_RELATIVE_DIRECTIONS: [RelativeDirection; 6] = [0, 1, 2, 3, 4, 5];

/// Maps a displacement `(dq, dr)` to the 60-degree angular sector
/// (direction index) it falls into.
///
/// Ported from the angle-based sector calculation in the original
/// implementation: hexes are projected to pointy-top pixel coordinates and
/// bucketed into 60-degree wedges centered on each of the six directions.
pub fn hex_to_sector(dq: i32, dr: i32) -> Direction {
    if dq == 0 && dr == 0 {
        return Direction::N;
    }
    let angle = angle_degrees(dq, dr);
    if angle < 60.0 {
        Direction::SE
    } else if angle < 120.0 {
        Direction::S
    } else if angle < 180.0 {
        Direction::SW
    } else if angle < 240.0 {
        Direction::NW
    } else if angle < 300.0 {
        Direction::N
    } else {
        Direction::NE
    }
}

/// Pixel-projected angle (degrees, 0..360) of a displacement, pointy-top
/// orientation. Shared by `hex_to_sector` and `in_forward_arc`.
fn angle_degrees(dq: i32, dr: i32) -> f64 {
    let x = 1.5_f64 * dq as f64;
    let y = 0.866_025_4_f64 * dq as f64 + 1.732_050_8_f64 * dr as f64;
    let mut angle = y.atan2(x).to_degrees();
    if angle < 0.0 {
        angle += 360.0;
    }
    angle
}

fn direction_center_degrees(dir: Direction) -> f64 {
    match dir {
        Direction::SE => 30.0,
        Direction::S => 90.0,
        Direction::SW => 150.0,
        Direction::NW => 210.0,
        Direction::N => 270.0,
        Direction::NE => 330.0,
    }
}

/// Whether a displacement falls within +-75 degrees of `facing` -- the
/// tighter window used by forward-arc jumpers, 15 degrees wider per side
/// than the 60-degree sector a plain `hex_to_sector` match would give.
pub fn in_forward_arc(dq: i32, dr: i32, facing: Direction) -> bool {
    if dq == 0 && dr == 0 {
        return true;
    }
    let angle = angle_degrees(dq, dr);
    let center = direction_center_degrees(facing);
    let mut diff = (angle - center).abs();
    if diff > 180.0 {
        diff = 360.0 - diff;
    }
    diff <= 75.0
}

/// Iterator over the hexes at exactly `radius` distance from a center,
/// walking the ring edge by edge.
pub struct RingIter {
    center: Hex,
    radius: u32,
    current: Hex,
    edge: u8,
    step: u32,
    done: bool,
    emitted_center: bool,
}

impl RingIter {
    fn new(center: Hex, radius: u32) -> RingIter {
        if radius == 0 {
            return RingIter {
                center,
                radius,
                current: center,
                edge: 0,
                step: 0,
                done: false,
                emitted_center: false,
            };
        }
        let (dq, dr) = Direction::SW.vector();
        let start = Hex::new(
            center.q + dq * radius as i8,
            center.r + dr * radius as i8,
        );
        RingIter {
            center,
            radius,
            current: start,
            edge: 0,
            step: 0,
            done: false,
            emitted_center: true,
        }
    }
}

impl Iterator for RingIter {
    type Item = Hex;

    fn next(&mut self) -> Option<Hex> {
        if self.done {
            return None;
        }
        if self.radius == 0 {
            self.done = true;
            if self.emitted_center {
                return None;
            }
            self.emitted_center = true;
            return Some(self.center);
        }
        if self.edge >= 6 {
            self.done = true;
            return None;
        }
        let result = self.current;
        self.current = self.current.neighbor(ALL_DIRECTIONS[self.edge as usize]);
        self.step += 1;
        if self.step >= self.radius {
            self.step = 0;
            self.edge += 1;
        }
        Some(result)
    }
}

/// Precomputed, read-only board data: the list of all valid hexes and the
/// per-hex neighbor table. Safe to share freely across worker threads.
pub struct BoardGeometry {
    pub all_hexes: Vec<Hex>,
    pub neighbors: HashMap<Hex, [Option<Hex>; 6]>,
}

impl BoardGeometry {
    pub fn get() -> &'static BoardGeometry {
        &GEOMETRY
    }
}

static GEOMETRY: Lazy<BoardGeometry> = Lazy::new(|| {
    let mut all_hexes = Vec::with_capacity(NUM_HEXES);
    for q in -RADIUS..=RADIUS {
        for r in -RADIUS..=RADIUS {
            let hex = Hex::new(q, r);
            if hex.is_valid() {
                all_hexes.push(hex);
            }
        }
    }
    debug_assert_eq!(all_hexes.len(), NUM_HEXES);

    let mut neighbors = HashMap::with_capacity(NUM_HEXES);
    for &hex in &all_hexes {
        let mut row = [None; 6];
        for dir in ALL_DIRECTIONS {
            let n = hex.neighbor(dir);
            if n.is_valid() {
                row[dir.index() as usize] = Some(n);
            }
        }
        neighbors.insert(hex, row);
    }

    BoardGeometry { all_hexes, neighbors }
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_has_61_hexes() {
        assert_eq!(BoardGeometry::get().all_hexes.len(), NUM_HEXES);
    }

    #[test]
    fn center_distance_is_symmetric() {
        let a = Hex::new(2, -3);
        let b = Hex::new(-1, 1);
        assert_eq!(a.distance(&b), b.distance(&a));
    }

    #[test]
    fn distance_to_center_matches_distance() {
        let h = Hex::new(3, -1);
        assert_eq!(h.distance_to_center(), h.distance(&Hex::new(0, 0)));
    }

    #[test]
    fn neighbor_round_trip() {
        let h = Hex::new(0, 0);
        for dir in ALL_DIRECTIONS {
            let n = h.neighbor(dir);
            assert_eq!(n.neighbor(dir.opposite()), h);
            assert_eq!(n.distance(&h), 1);
        }
    }

    #[test]
    fn ring_radius_zero_yields_center() {
        let h = Hex::new(1, 1);
        let ring: Vec<Hex> = h.ring(0).collect();
        assert_eq!(ring, vec![h]);
    }

    #[test]
    fn ring_radius_k_all_at_distance_k() {
        let center = Hex::new(0, 0);
        for radius in 1..=3u32 {
            let cells: Vec<Hex> = center.ring(radius).collect();
            assert_eq!(cells.len(), 6 * radius as usize);
            for c in cells {
                assert_eq!(c.distance(&center), radius);
            }
        }
    }

    #[test]
    fn rotate_forward_is_identity() {
        for dir in ALL_DIRECTIONS {
            assert_eq!(dir.rotate(FORWARD), dir);
        }
    }

    #[test]
    fn rotate_backward_is_opposite() {
        for dir in ALL_DIRECTIONS {
            assert_eq!(dir.rotate(BACKWARD), dir.opposite());
        }
    }

    #[test]
    fn full_ring_sectors_agree_with_direction_vectors() {
        for dir in ALL_DIRECTIONS {
            let (dq, dr) = dir.vector();
            assert_eq!(hex_to_sector(dq as i32, dr as i32), dir);
        }
    }

    #[test]
    fn forward_arc_admits_the_facing_direction_and_excludes_the_opposite() {
        let (dq, dr) = Direction::N.vector();
        assert!(in_forward_arc(dq as i32, dr as i32, Direction::N));
        let (dq, dr) = Direction::S.vector();
        assert!(!in_forward_arc(dq as i32, dr as i32, Direction::N));
    }

    #[test]
    fn forward_arc_is_wider_than_a_bare_sector_match() {
        // This displacement falls in the SE sector (angle 30), which a
        // bare hex_to_sector match would reject for a S-facing piece, but
        // it is well within the +-75 degree forward-arc window around S.
        assert_eq!(hex_to_sector(2, 0), Direction::SE);
        assert!(in_forward_arc(2, 0, Direction::S));
    }
}
