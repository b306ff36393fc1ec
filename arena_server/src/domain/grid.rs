// Grid geometry: bounds, adjacency and spawn candidates. No game state lives here.

/// A cell coordinate. Signed so out-of-range requests can be represented and rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Square board of `size` x `size` cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    size: u32,
}

impl Grid {
    pub const fn new(size: u32) -> Self {
        Self { size }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        let size = i64::from(self.size);
        (0..size).contains(&i64::from(pos.x)) && (0..size).contains(&i64::from(pos.y))
    }

    /// Orthogonal 4-neighbourhood: exactly one unit along exactly one axis.
    pub fn is_adjacent(a: Position, b: Position) -> bool {
        let dx = (i64::from(a.x) - i64::from(b.x)).abs();
        let dy = (i64::from(a.y) - i64::from(b.y)).abs();
        dx + dy == 1
    }

    /// Deterministic spawn order: the four corners, then the rest of the border
    /// row-major, then the interior row-major.
    pub fn spawn_candidates(&self) -> Vec<Position> {
        if self.size == 0 {
            return Vec::new();
        }
        let last = (self.size - 1) as i32;
        let mut out: Vec<Position> = Vec::with_capacity((self.size * self.size) as usize);
        for corner in [
            Position::new(0, 0),
            Position::new(last, last),
            Position::new(0, last),
            Position::new(last, 0),
        ] {
            if !out.contains(&corner) {
                out.push(corner);
            }
        }

        let cells = || (0..=last).flat_map(|y| (0..=last).map(move |x| Position::new(x, y)));
        let on_border = |p: &Position| p.x == 0 || p.y == 0 || p.x == last || p.y == last;

        for pos in cells().filter(on_border) {
            if !out.contains(&pos) {
                out.push(pos);
            }
        }
        out.extend(cells().filter(|p| !on_border(p)));
        out
    }
}
