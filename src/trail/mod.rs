use log::{debug, info};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrailError {
    #[error("Failed to read map file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Trail map has no cells ({rows} rows, {columns} columns)")]
    EmptyMap { rows: usize, columns: usize },
}

/// State of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    UnvisitedEmpty,
    UnvisitedFood,
    VisitedEmpty,
    VisitedFood,
}

impl Cell {
    /// Any character that is not a known marker is read as an empty cell.
    pub fn from_char(c: char) -> Self {
        match c {
            'X' | 'x' => Cell::UnvisitedFood,
            _ => Cell::UnvisitedEmpty,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Cell::UnvisitedEmpty => '_',
            Cell::UnvisitedFood => 'X',
            Cell::VisitedEmpty => '+',
            Cell::VisitedFood => '*',
        }
    }

    pub fn has_food(self) -> bool {
        matches!(self, Cell::UnvisitedFood | Cell::VisitedFood)
    }
}

/// Marker drawn over the ant's own cell in [`TrailMap::render`].
pub const ANT_MARKER: char = 'A';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Anticlockwise quarter turn.
    pub fn left(self) -> Self {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
        }
    }

    /// Clockwise quarter turn.
    pub fn right(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    /// (row, column) step for one move in this direction.
    fn offset(self) -> (isize, isize) {
        match self {
            Direction::North => (-1, 0),
            Direction::East => (0, 1),
            Direction::South => (1, 0),
            Direction::West => (0, -1),
        }
    }
}

/// Position and heading of the ant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ant {
    pub row: usize,
    pub column: usize,
    pub direction: Direction,
}

impl Default for Ant {
    /// The ant always starts in the top-left corner facing east, whatever
    /// markers the map text contains.
    fn default() -> Self {
        Self {
            row: 0,
            column: 0,
            direction: Direction::East,
        }
    }
}

/// Toroidal food grid that an evolved program steers the ant through.
///
/// One map is built per map file and reused for every evaluation; [`TrailMap::reset`]
/// brings it back to the state it had right after construction. Each primitive
/// action consumes one unit of the action budget and becomes a no-op once the
/// budget is spent, which bounds every simulation episode.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailMap {
    /// Cells as parsed, never modified after construction
    original: Vec<Vec<Cell>>,
    cells: Vec<Vec<Cell>>,
    rows: usize,
    columns: usize,
    ant: Ant,
    actions_taken: usize,
    action_limit: usize,
    consumed_food: usize,
    total_food: usize,
}

impl TrailMap {
    /// Builds a map from the lines of a map file.
    ///
    /// Short rows are padded with empty cells up to the longest row.
    ///
    /// # Arguments
    /// * `lines` - One string per grid row, using `X`/`x` for food and `_`/`-` for empty cells
    /// * `action_limit` - Number of primitive actions the ant may take per episode
    ///
    /// # Returns
    /// * `Result<Self, TrailError>` - `TrailError::EmptyMap` when there is no row or no column
    pub fn new<S: AsRef<str>>(lines: &[S], action_limit: usize) -> Result<Self, TrailError> {
        let rows = lines.len();
        let columns = lines
            .iter()
            .map(|l| l.as_ref().chars().count())
            .max()
            .unwrap_or(0);
        if rows == 0 || columns == 0 {
            return Err(TrailError::EmptyMap { rows, columns });
        }

        let original: Vec<Vec<Cell>> = lines
            .iter()
            .map(|line| {
                let mut row: Vec<Cell> = line.as_ref().chars().map(Cell::from_char).collect();
                row.resize(columns, Cell::UnvisitedEmpty);
                row
            })
            .collect();
        let total_food = original
            .iter()
            .flatten()
            .filter(|cell| cell.has_food())
            .count();

        Ok(Self {
            cells: original.clone(),
            original,
            rows,
            columns,
            ant: Ant::default(),
            actions_taken: 0,
            action_limit,
            consumed_food: 0,
            total_food,
        })
    }

    /// Reads a map file and builds a `TrailMap` from it.
    pub fn load(path: &Path, action_limit: usize) -> Result<Self, TrailError> {
        let content = fs::read_to_string(path).map_err(|source| TrailError::FileReadError {
            path: path.display().to_string(),
            source,
        })?;
        let lines: Vec<&str> = content.lines().collect();
        let map = Self::new(&lines, action_limit)?;
        debug!(
            "Loaded map '{}': {}x{} with {} food",
            path.display(),
            map.rows,
            map.columns,
            map.total_food
        );
        Ok(map)
    }

    /// Restores the cells, food counters, ant pose and action counter.
    pub fn reset(&mut self) {
        self.cells.clone_from(&self.original);
        self.ant = Ant::default();
        self.actions_taken = 0;
        self.consumed_food = self
            .cells
            .iter()
            .flatten()
            .filter(|cell| **cell == Cell::VisitedFood)
            .count();
    }

    pub fn move_forward(&mut self) {
        if !self.has_actions_remaining() {
            return;
        }
        let (row, column) = self.ahead();
        self.ant.row = row;
        self.ant.column = column;

        let cell = &mut self.cells[row][column];
        match *cell {
            Cell::UnvisitedFood => {
                *cell = Cell::VisitedFood;
                self.consumed_food += 1;
            }
            Cell::UnvisitedEmpty => *cell = Cell::VisitedEmpty,
            Cell::VisitedEmpty | Cell::VisitedFood => {}
        }
        self.actions_taken += 1;
    }

    pub fn turn_left(&mut self) {
        if !self.has_actions_remaining() {
            return;
        }
        self.ant.direction = self.ant.direction.left();
        self.actions_taken += 1;
    }

    pub fn turn_right(&mut self) {
        if !self.has_actions_remaining() {
            return;
        }
        self.ant.direction = self.ant.direction.right();
        self.actions_taken += 1;
    }

    /// Whether uneaten food lies one step ahead. Free of charge.
    pub fn is_food_ahead(&self) -> bool {
        let (row, column) = self.ahead();
        self.cells[row][column] == Cell::UnvisitedFood
    }

    pub fn has_actions_remaining(&self) -> bool {
        self.actions_taken < self.action_limit
    }

    /// Cell one step ahead of the ant, wrapping at the grid edges.
    fn ahead(&self) -> (usize, usize) {
        let (d_row, d_column) = self.ant.direction.offset();
        let row = (self.ant.row as isize + d_row).rem_euclid(self.rows as isize) as usize;
        let column = (self.ant.column as isize + d_column).rem_euclid(self.columns as isize) as usize;
        (row, column)
    }

    pub fn consumed_food_count(&self) -> usize {
        self.consumed_food
    }

    pub fn total_food_count(&self) -> usize {
        self.total_food
    }

    pub fn remaining_food_count(&self) -> usize {
        self.total_food - self.consumed_food
    }

    pub fn actions_taken(&self) -> usize {
        self.actions_taken
    }

    pub fn action_limit(&self) -> usize {
        self.action_limit
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn ant(&self) -> Ant {
        self.ant
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<Cell> {
        self.cells.get(row).and_then(|r| r.get(column)).copied()
    }

    /// Renders the grid one row per line with the ant drawn as [`ANT_MARKER`].
    ///
    /// # Arguments
    /// * `latex` - Wrap the grid in a `verbatim` environment for TeX documents
    pub fn render(&self, latex: bool) -> String {
        let grid = self
            .cells
            .iter()
            .enumerate()
            .map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .map(|(c, cell)| {
                        if r == self.ant.row && c == self.ant.column {
                            ANT_MARKER
                        } else {
                            cell.to_char()
                        }
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n");
        if latex {
            format!("\\begin{{verbatim}}\n{}\n\\end{{verbatim}}", grid)
        } else {
            grid
        }
    }
}

impl fmt::Display for TrailMap {
    /// Plain grid without the ant marker.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.cells.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for cell in row {
                write!(f, "{}", cell.to_char())?;
            }
        }
        Ok(())
    }
}

/// Loads every map file in `paths` with the same action limit.
pub fn load_maps<P: AsRef<Path>>(
    paths: &[P],
    action_limit: usize,
) -> Result<Vec<TrailMap>, TrailError> {
    let maps = paths
        .iter()
        .map(|p| TrailMap::load(p.as_ref(), action_limit))
        .collect::<Result<Vec<_>, _>>()?;
    info!("Loaded {} trail map(s).", maps.len());
    Ok(maps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn food_in_view(map: &TrailMap) -> usize {
        map.consumed_food_count() + map.remaining_food_count()
    }

    #[test]
    fn test_parse_pads_rows_and_counts_food() {
        let map = TrailMap::new(&["X_x", "-", "__X_"], 10).unwrap();
        assert_eq!(map.rows(), 3);
        assert_eq!(map.columns(), 4);
        assert_eq!(map.total_food_count(), 3);
        assert_eq!(map.cell(0, 0), Some(Cell::UnvisitedFood));
        assert_eq!(map.cell(0, 2), Some(Cell::UnvisitedFood));
        assert_eq!(map.cell(0, 3), Some(Cell::UnvisitedEmpty));
        assert_eq!(map.cell(1, 3), Some(Cell::UnvisitedEmpty));
        assert_eq!(map.cell(3, 0), None);
        assert_eq!(map.ant(), Ant::default());
        assert_eq!(map.actions_taken(), 0);
    }

    #[test]
    fn test_empty_map_is_rejected() {
        let no_rows: [&str; 0] = [];
        assert!(matches!(
            TrailMap::new(&no_rows, 10),
            Err(TrailError::EmptyMap { rows: 0, .. })
        ));
        assert!(matches!(
            TrailMap::new(&["", ""], 10),
            Err(TrailError::EmptyMap { columns: 0, .. })
        ));
    }

    #[test]
    fn test_start_marker_is_read_as_empty() {
        let map = TrailMap::new(&["X_A_X"], 10).unwrap();
        assert_eq!(map.cell(0, 2), Some(Cell::UnvisitedEmpty));
        assert_eq!(map.ant().column, 0);
        assert_eq!(map.total_food_count(), 2);
    }

    #[test]
    fn test_wraparound_east_and_south() {
        let mut map = TrailMap::new(&["_____", "_____", "_____"], 100).unwrap();
        for _ in 0..map.columns() {
            map.move_forward();
        }
        assert_eq!(map.ant().column, 0);
        assert_eq!(map.ant().row, 0);

        map.turn_right();
        assert_eq!(map.ant().direction, Direction::South);
        for _ in 0..map.rows() {
            map.move_forward();
        }
        assert_eq!(map.ant().row, 0);
        assert_eq!(map.ant().column, 0);
    }

    #[test]
    fn test_wraparound_never_goes_negative() {
        let mut map = TrailMap::new(&["___X", "____", "X___"], 100).unwrap();
        map.turn_left(); // north
        assert!(map.is_food_ahead(), "row -1 must wrap to the last row");
        map.move_forward();
        assert_eq!((map.ant().row, map.ant().column), (2, 0));

        map.turn_left(); // west
        map.turn_left(); // south
        map.turn_left(); // east
        map.turn_left(); // north
        map.turn_left(); // west
        assert_eq!(map.ant().direction, Direction::West);
        map.move_forward();
        assert_eq!((map.ant().row, map.ant().column), (2, 3));
    }

    #[test]
    fn test_action_budget_is_enforced() {
        let mut map = TrailMap::new(&["_X__"], 3).unwrap();
        map.move_forward();
        map.turn_left();
        map.turn_right();
        assert!(!map.has_actions_remaining());
        let frozen = map.clone();

        map.move_forward();
        map.turn_left();
        map.turn_right();
        assert_eq!(map, frozen);
        assert_eq!(map.actions_taken(), 3);
    }

    #[test]
    fn test_food_accounting_is_conserved_and_idempotent() {
        let mut map = TrailMap::new(&["_XX_"], 50).unwrap();
        let total = map.total_food_count();
        for _ in 0..12 {
            map.move_forward();
            assert_eq!(food_in_view(&map), total);
        }
        // three laps over both pellets
        assert_eq!(map.consumed_food_count(), 2);
        assert_eq!(map.remaining_food_count(), 0);
        assert_eq!(map.cell(0, 1), Some(Cell::VisitedFood));
        assert_eq!(map.cell(0, 3), Some(Cell::VisitedEmpty));
    }

    #[test]
    fn test_is_food_ahead_does_not_consume_budget() {
        let map = TrailMap::new(&["_X"], 1).unwrap();
        assert!(map.is_food_ahead());
        assert!(map.is_food_ahead());
        assert_eq!(map.actions_taken(), 0);
        assert!(map.has_actions_remaining());
    }

    #[test]
    fn test_reset_is_idempotent_and_matches_construction() {
        let fresh = TrailMap::new(&["_X_", "X__"], 20).unwrap();
        let mut map = fresh.clone();
        map.move_forward();
        map.turn_right();
        map.move_forward();
        assert_ne!(map, fresh);

        map.reset();
        assert_eq!(map, fresh);
        map.reset();
        map.reset();
        assert_eq!(map, fresh);
        assert_eq!(map.consumed_food_count(), 0);
    }

    #[test]
    fn test_render_marks_the_ant_and_visits() {
        let mut map = TrailMap::new(&["_X_", "___"], 20).unwrap();
        map.move_forward();
        map.move_forward();
        assert_eq!(map.render(false), "_*A\n___");
        assert_eq!(map.to_string(), "_*+\n___");
        let latex = map.render(true);
        assert!(latex.starts_with("\\begin{verbatim}\n"));
        assert!(latex.ends_with("\n\\end{verbatim}"));
    }

    #[test]
    fn test_load_map_from_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("trail.txt");
        let mut file = File::create(&file_path).unwrap();
        write!(file, "_XX\r\n__X\n").unwrap();
        let map = TrailMap::load(&file_path, 400).unwrap();
        assert_eq!(map.rows(), 2);
        assert_eq!(map.columns(), 3);
        assert_eq!(map.total_food_count(), 3);
        assert_eq!(map.action_limit(), 400);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempdir().unwrap();
        let result = load_maps(&[dir.path().join("missing.txt")], 10);
        assert!(matches!(result, Err(TrailError::FileReadError { .. })));
    }

    #[test]
    fn test_bundled_sample_trail_loads() {
        let map = TrailMap::load(Path::new("maps/sample_trail.txt"), 600)
            .expect("Failed to load bundled sample trail");
        assert_eq!(map.rows(), 32);
        assert_eq!(map.columns(), 32);
        assert!(map.total_food_count() > 0);
    }
}
