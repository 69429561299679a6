//! Bresenham rasterization of a single move.
//!
//! Every path is computed from the endpoint with the lower coordinate on the
//! driving axis and flipped afterwards, so swapping the endpoints only
//! reverses the output.

use std::iter;

use crate::environment::Pos;

/// Slope regime of a segment. `rising` means both deltas share a sign.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Slope {
    Point,
    /// Constant row, only the column changes.
    AlongColumns,
    /// Constant column, only the row changes.
    AlongRows,
    Diagonal { rising: bool },
    /// |dy| > |dx|: the column drives.
    Steep { rising: bool },
    /// |dy| < |dx|: the row drives.
    Shallow { rising: bool },
}

impl Slope {
    fn classify(dx: isize, dy: isize) -> Slope {
        let rising = (dx > 0) == (dy > 0);
        match (dx, dy) {
            (0, 0) => Slope::Point,
            (0, _) => Slope::AlongColumns,
            (_, 0) => Slope::AlongRows,
            _ if dx.abs() == dy.abs() => Slope::Diagonal { rising },
            _ if dy.abs() > dx.abs() => Slope::Steep { rising },
            _ => Slope::Shallow { rising },
        }
    }
}

/// Lattice points crossed moving from `start` to `end`, both included.
pub fn rasterize(start: Pos, end: Pos) -> Vec<Pos> {
    let (dx, dy) = (end.x - start.x, end.y - start.y);
    let slope = Slope::classify(dx, dy);

    // Lower endpoint on the driving axis first.
    let flipped = match slope {
        Slope::Point => false,
        Slope::AlongColumns | Slope::Steep { .. } => dy < 0,
        Slope::AlongRows | Slope::Shallow { .. } | Slope::Diagonal { .. } => dx < 0,
    };
    let (from, to) = if flipped { (end, start) } else { (start, end) };

    let mut path = match slope {
        Slope::Point => vec![from],
        Slope::AlongColumns => (from.y..=to.y).map(|y| Pos::new(from.x, y)).collect(),
        Slope::AlongRows => (from.x..=to.x).map(|x| Pos::new(x, from.y)).collect(),
        Slope::Diagonal { rising } => {
            let step = if rising { 1 } else { -1 };
            (0..=to.x - from.x)
                .map(|i| Pos::new(from.x + i, from.y + step * i))
                .collect()
        }
        Slope::Steep { rising } => walk(from.y, to.y, from.x, (to.x - from.x).abs(), rising)
            .map(|(y, x)| Pos::new(x, y))
            .collect(),
        Slope::Shallow { rising } => walk(from.x, to.x, from.y, (to.y - from.y).abs(), rising)
            .map(|(x, y)| Pos::new(x, y))
            .collect(),
    };

    if flipped {
        path.reverse();
    }
    path
}

/// Error-accumulation walk along a driving axis running `major_from..=major_to`.
/// Yields `(major, minor)` pairs. The start is emitted as is; after each later
/// cell the error grows by `2 * minor_delta` and the minor axis moves one
/// step once it is non-negative, so the step shows up on the following cell.
fn walk(
    major_from: isize,
    major_to: isize,
    minor_from: isize,
    minor_delta: isize,
    rising: bool,
) -> impl Iterator<Item = (isize, isize)> {
    let major_delta = major_to - major_from;
    let minor_step = if rising { 1 } else { -1 };
    let m = 2 * minor_delta;
    let mut error = m - major_delta;
    let mut minor = minor_from;

    iter::once((major_from, minor_from)).chain((major_from + 1..=major_to).map(move |major| {
        let point = (major, minor);
        error += m;
        if error >= 0 {
            minor += minor_step;
            error -= 2 * major_delta;
        }
        point
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[(isize, isize)]) -> Vec<Pos> {
        raw.iter().map(|&p| Pos::from(p)).collect()
    }

    #[test]
    fn diagonal() {
        assert_eq!(
            rasterize(Pos::new(0, 0), Pos::new(5, 5)),
            pts(&[(0, 0), (1, 1), (2, 2), (3, 3), (4, 4), (5, 5)])
        );
        assert_eq!(
            rasterize(Pos::new(5, 5), Pos::new(10, 0)),
            pts(&[(5, 5), (6, 4), (7, 3), (8, 2), (9, 1), (10, 0)])
        );
    }

    #[test]
    fn constant_column() {
        assert_eq!(
            rasterize(Pos::new(0, 3), Pos::new(5, 3)),
            pts(&[(0, 3), (1, 3), (2, 3), (3, 3), (4, 3), (5, 3)])
        );
        assert_eq!(
            rasterize(Pos::new(5, 3), Pos::new(0, 3)),
            pts(&[(5, 3), (4, 3), (3, 3), (2, 3), (1, 3), (0, 3)])
        );
    }

    #[test]
    fn constant_row() {
        assert_eq!(
            rasterize(Pos::new(5, 5), Pos::new(5, 2)),
            pts(&[(5, 5), (5, 4), (5, 3), (5, 2)])
        );
        assert_eq!(rasterize(Pos::new(0, 0), Pos::new(0, 1)), pts(&[(0, 0), (0, 1)]));
    }

    #[test]
    fn single_point() {
        assert_eq!(rasterize(Pos::new(2, 7), Pos::new(2, 7)), pts(&[(2, 7)]));
    }

    #[test]
    fn shallow_rising() {
        assert_eq!(
            rasterize(Pos::new(0, 0), Pos::new(5, 2)),
            pts(&[(0, 0), (1, 0), (2, 1), (3, 1), (4, 2), (5, 2)])
        );
    }

    #[test]
    fn shallow_falling() {
        assert_eq!(
            rasterize(Pos::new(0, 2), Pos::new(5, 0)),
            pts(&[(0, 2), (1, 2), (2, 1), (3, 1), (4, 0), (5, 0)])
        );
    }

    #[test]
    fn steep_rising() {
        assert_eq!(
            rasterize(Pos::new(0, 0), Pos::new(2, 5)),
            pts(&[(0, 0), (0, 1), (1, 2), (1, 3), (2, 4), (2, 5)])
        );
    }

    #[test]
    fn steep_falling() {
        assert_eq!(
            rasterize(Pos::new(2, 0), Pos::new(0, 5)),
            pts(&[(2, 0), (2, 1), (1, 2), (1, 3), (0, 4), (0, 5)])
        );
    }

    #[test]
    fn reversing_endpoints_reverses_path() {
        let span = -6..=6;
        for x in span.clone() {
            for y in span.clone() {
                let a = Pos::new(0, 0);
                let b = Pos::new(x, y);
                let mut back = rasterize(b, a);
                back.reverse();
                assert_eq!(rasterize(a, b), back, "{} -> {}", a, b);
            }
        }
    }

    #[test]
    fn paths_are_connected_and_hit_both_ends() {
        let origin = Pos::new(5, 5);
        for x in 0..=10 {
            for y in 0..=10 {
                let end = Pos::new(x, y);
                let path = rasterize(origin, end);
                let (dx, dy) = ((x - origin.x).abs(), (y - origin.y).abs());

                assert_eq!(path.first(), Some(&origin));
                assert_eq!(path.last(), Some(&end));
                assert_eq!(path.len() as isize, dx.max(dy) + 1, "{} -> {}", origin, end);
                for pair in path.windows(2) {
                    let (sx, sy) = ((pair[1].x - pair[0].x).abs(), (pair[1].y - pair[0].y).abs());
                    assert!(sx <= 1 && sy <= 1 && sx + sy > 0, "gap in {:?}", path);
                }
            }
        }
    }

    #[test]
    fn minor_axis_steps_after_the_first_cell() {
        assert_eq!(
            rasterize(Pos::new(0, 0), Pos::new(3, 2)),
            pts(&[(0, 0), (1, 0), (2, 1), (3, 2)])
        );
        assert_eq!(
            rasterize(Pos::new(3, 2), Pos::new(0, 0)),
            pts(&[(3, 2), (2, 1), (1, 0), (0, 0)])
        );
        assert_eq!(
            rasterize(Pos::new(0, 0), Pos::new(5, 3)),
            pts(&[(0, 0), (1, 0), (2, 1), (3, 2), (4, 2), (5, 3)])
        );
        assert_eq!(
            rasterize(Pos::new(0, 0), Pos::new(2, 3)),
            pts(&[(0, 0), (0, 1), (1, 2), (2, 3)])
        );
    }

    #[test]
    fn stays_within_one_cell_of_the_true_line() {
        let start = Pos::new(10, 5);
        for (x, y) in [(4, 6), (4, 10), (6, 4), (9, 0), (0, 2)] {
            let end = Pos::new(x, y);
            let (dx, dy) = ((end.x - start.x) as f64, (end.y - start.y) as f64);
            for p in rasterize(start, end) {
                // Perpendicular distance scaled by the driving axis length.
                let cross = (dx * (p.y - start.y) as f64 - dy * (p.x - start.x) as f64).abs();
                let major = dx.abs().max(dy.abs());
                assert!(cross / major < 1.0, "{} strays off {} -> {}", p, start, end);
            }
        }
    }
}
