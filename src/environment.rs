use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::{debug, info};
use ndarray::Array2;
use rand::Rng;

use crate::error::{RaceError, Result};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CellKind {
    Open,
    Wall,
    Start,
    Finish,
}

impl CellKind {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '.' => Some(CellKind::Open),
            '#' => Some(CellKind::Wall),
            'S' => Some(CellKind::Start),
            'F' => Some(CellKind::Finish),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            CellKind::Open => '.',
            CellKind::Wall => '#',
            CellKind::Start => 'S',
            CellKind::Finish => 'F',
        }
    }
}

/// Grid coordinate. `x` is the row, `y` the column. Signed so that projected
/// positions past the border can still be represented.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Pos {
    pub x: isize,
    pub y: isize,
}

impl Pos {
    pub const fn new(x: isize, y: isize) -> Self {
        Pos { x, y }
    }

    pub fn offset(self, dx: isize, dy: isize) -> Self {
        Pos {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(isize, isize)> for Pos {
    fn from((x, y): (isize, isize)) -> Self {
        Pos { x, y }
    }
}

// Action
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Acceleration {
    pub x: isize,
    pub y: isize,
}

impl Acceleration {
    /// The nine candidate accelerations, x-major.
    pub const ALL: [Acceleration; 9] = [
        Acceleration { x: -1, y: -1 },
        Acceleration { x: -1, y: 0 },
        Acceleration { x: -1, y: 1 },
        Acceleration { x: 0, y: -1 },
        Acceleration { x: 0, y: 0 },
        Acceleration { x: 0, y: 1 },
        Acceleration { x: 1, y: -1 },
        Acceleration { x: 1, y: 0 },
        Acceleration { x: 1, y: 1 },
    ];

    /// Reduces arbitrary integers to `{-1, 0, 1}` by sign.
    pub fn clamped(x: isize, y: isize) -> Self {
        Acceleration {
            x: x.signum(),
            y: y.signum(),
        }
    }
}

impl fmt::Display for Acceleration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{:+}, {:+}>", self.x, self.y)
    }
}

/// Immutable racetrack grid with its start and finish cells.
#[derive(Debug, Clone)]
pub struct GridTrack {
    cells: Array2<CellKind>,
    starts: Vec<Pos>,
    finishes: Vec<Pos>,
}

impl GridTrack {
    /// Builds a track from row-major cells. Fails unless there is at least one
    /// start and one finish cell.
    pub fn new(cells: Array2<CellKind>) -> Result<Self> {
        let mut starts = Vec::new();
        let mut finishes = Vec::new();
        for ((x, y), kind) in cells.indexed_iter() {
            let pos = Pos::new(x as isize, y as isize);
            match kind {
                CellKind::Start => starts.push(pos),
                CellKind::Finish => finishes.push(pos),
                _ => {}
            }
        }
        if starts.is_empty() {
            return Err(RaceError::format(0, "track has no start cell"));
        }
        if finishes.is_empty() {
            return Err(RaceError::format(0, "track has no finish cell"));
        }
        Ok(GridTrack {
            cells,
            starts,
            finishes,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let track: GridTrack = text.parse()?;
        let (rows, cols) = track.size();
        info!(
            "Loaded track {} ({}x{}, {} start, {} finish cells)",
            path.display(),
            rows,
            cols,
            track.starts.len(),
            track.finishes.len()
        );
        Ok(track)
    }

    /// `(rows, cols)`
    pub fn size(&self) -> (usize, usize) {
        self.cells.dim()
    }

    /// Lookup for callers that treat the outside of the grid as a normal case.
    pub fn get(&self, pos: Pos) -> Option<CellKind> {
        self.index(pos).map(|idx| self.cells[idx])
    }

    pub fn cell_kind(&self, pos: Pos) -> Result<CellKind> {
        self.get(pos).ok_or_else(|| {
            let (rows, cols) = self.size();
            RaceError::OutOfBounds {
                x: pos.x,
                y: pos.y,
                rows,
                cols,
            }
        })
    }

    pub fn start_cells(&self) -> &[Pos] {
        &self.starts
    }

    pub fn finish_cells(&self) -> &[Pos] {
        &self.finishes
    }

    pub fn is_terminal(&self, pos: Pos) -> bool {
        self.get(pos) == Some(CellKind::Finish)
    }

    /// Uniformly picks one of the start cells.
    pub fn sample_start<R: Rng + ?Sized>(&self, rng: &mut R) -> Pos {
        self.starts[rng.gen_range(0..self.starts.len())]
    }

    /// Row-major walk over every cell of the grid.
    pub fn positions(&self) -> TrackIter {
        TrackIter::new(self.size())
    }

    pub(crate) fn index(&self, pos: Pos) -> Option<(usize, usize)> {
        let (rows, cols) = self.size();
        if pos.x < 0 || pos.y < 0 {
            return None;
        }
        let (x, y) = (pos.x as usize, pos.y as usize);
        if x < rows && y < cols {
            Some((x, y))
        } else {
            None
        }
    }
}

impl FromStr for GridTrack {
    type Err = RaceError;

    /// Parses `ROWS,COLS` followed by exactly `ROWS` lines of `COLS` symbols.
    fn from_str(text: &str) -> Result<Self> {
        let mut lines = text.lines().map(|l| l.trim_end_matches('\r'));

        let header = lines
            .next()
            .ok_or_else(|| RaceError::format(1, "missing ROWS,COLS header"))?;
        let (rows, cols) = parse_header(header)?;

        let mut cells = Vec::with_capacity(rows * cols);
        let mut seen = 0;
        for (i, line) in lines.enumerate() {
            let line_no = i + 2;
            if seen == rows {
                if line.trim().is_empty() {
                    continue;
                }
                return Err(RaceError::format(
                    line_no,
                    format!("expected {} rows, found more", rows),
                ));
            }
            let width = line.chars().count();
            if width != cols {
                return Err(RaceError::format(
                    line_no,
                    format!("row has {} cells, expected {}", width, cols),
                ));
            }
            for symbol in line.chars() {
                let kind = CellKind::from_symbol(symbol).ok_or_else(|| {
                    RaceError::format(line_no, format!("unknown cell symbol {:?}", symbol))
                })?;
                cells.push(kind);
            }
            seen += 1;
        }
        if seen != rows {
            return Err(RaceError::format(
                0,
                format!("expected {} rows, found {}", rows, seen),
            ));
        }

        let cells = Array2::from_shape_vec((rows, cols), cells)
            .map_err(|e| RaceError::format(0, e.to_string()))?;
        debug!("Parsed {}x{} track", rows, cols);
        GridTrack::new(cells)
    }
}

fn parse_header(header: &str) -> Result<(usize, usize)> {
    let mut parts = header.split(',').map(str::trim);
    let mut next_dim = |name: &str| -> Result<usize> {
        let raw = parts
            .next()
            .ok_or_else(|| RaceError::format(1, format!("header is missing {}", name)))?;
        raw.parse::<usize>()
            .map_err(|_| RaceError::format(1, format!("{} {:?} is not a count", name, raw)))
    };
    let rows = next_dim("ROWS")?;
    let cols = next_dim("COLS")?;
    if parts.next().is_some() {
        return Err(RaceError::format(1, "header has more than two fields"));
    }
    if rows == 0 || cols == 0 {
        return Err(RaceError::format(1, "track must have at least one row and column"));
    }
    Ok((rows, cols))
}

impl fmt::Display for GridTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (rows, cols) = self.size();
        writeln!(f, "{},{}", rows, cols)?;
        for row in self.cells.outer_iter() {
            let line: String = row.iter().map(|k| k.symbol()).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

pub struct TrackIter {
    next: usize,
    rows: usize,
    cols: usize,
}

impl TrackIter {
    fn new((rows, cols): (usize, usize)) -> TrackIter {
        TrackIter {
            next: 0,
            rows,
            cols,
        }
    }
}

impl Iterator for TrackIter {
    type Item = Pos;

    fn next(&mut self) -> Option<Pos> {
        if self.cols == 0 || self.next >= self.rows * self.cols {
            return None;
        }
        let pos = Pos::new((self.next / self.cols) as isize, (self.next % self.cols) as isize);
        self.next += 1;
        Some(pos)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.rows * self.cols).saturating_sub(self.next);
        (left, Some(left))
    }
}
