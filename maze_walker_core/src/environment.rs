use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Coordinate, Direction,
    map::{Grid, GridError},
};

/// The content of a single cell of the maze.
///
/// A cell is either one of the static states or occupied by the player, never
/// both. `Visited` is a trail marker left behind whenever the player vacates a
/// cell, including dead ends abandoned during backtracking, so it means
/// "explored" rather than "on the final path". It never blocks re-entry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Wall,
    Target,
    Visited,
    Player,
}

impl Cell {
    /// Walls and the player are the only cells that cannot be entered.
    pub fn blocks_entry(self) -> bool {
        matches!(self, Cell::Wall | Cell::Player)
    }

    /// ASCII symbol used when printing a field.
    pub fn symbol(self) -> char {
        match self {
            Cell::Empty => ' ',
            Cell::Wall => '#',
            Cell::Target => 'T',
            Cell::Visited => '.',
            Cell::Player => 'P',
        }
    }
}

/// Errors raised while building a [`GameField`].
///
/// Movement never produces these; an illegal move is just a `false` from
/// [`GameField::request_move`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("A player has already been spawned at {existing}")]
    PlayerAlreadySpawned { existing: Coordinate },
    #[error("No player has been spawned")]
    PlayerMissing,
    #[error("A target has already been spawned at {existing}")]
    TargetAlreadySpawned { existing: Coordinate },
    #[error("Cell {coordinate} is already occupied by {cell:?}")]
    CellOccupied { coordinate: Coordinate, cell: Cell },
    #[error("Wall run from {from} to {to} is diagonal")]
    DiagonalWall { from: Coordinate, to: Coordinate },
    #[error("Wall run from {from} to {to} must be given in increasing order")]
    ReversedWallRun { from: Coordinate, to: Coordinate },
}

/// The maze: a fixed-size grid of cells plus the single player moving through it.
///
/// The field is the only authority over the player's position. Every change to
/// the cells after the level is built goes through [`GameField::request_move`]
/// or a [`Player`] handle borrowed from the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameField {
    cells: Grid<Cell>,
    player: Option<Coordinate>,
    target: Option<Coordinate>,
    solved: bool,
}

impl GameField {
    /// Creates an empty, unsolved field.
    pub fn new(width: usize, height: usize) -> Self {
        GameField {
            cells: Grid::new(width, height),
            player: None,
            target: None,
            solved: false,
        }
    }

    pub fn width(&self) -> usize {
        self.cells.width()
    }

    pub fn height(&self) -> usize {
        self.cells.height()
    }

    pub fn cells(&self) -> &Grid<Cell> {
        &self.cells
    }

    /// Returns the cell at `coordinate`, or `None` outside the field.
    pub fn cell(&self, coordinate: Coordinate) -> Option<Cell> {
        self.cells.get(coordinate).copied()
    }

    /// True once the player has stepped onto the target. Never resets.
    pub fn is_solved(&self) -> bool {
        self.solved
    }

    /// Returns the player's current position, if one has been spawned.
    pub fn locate_player(&self) -> Option<Coordinate> {
        self.player
    }

    /// Returns where the target is, if one was spawned and not overwritten.
    ///
    /// Once the player has entered the target the goal cell is still reported.
    pub fn locate_target(&self) -> Option<Coordinate> {
        self.target
    }

    /// Borrows a handle to the spawned player.
    pub fn player(&mut self) -> Result<Player<'_>, FieldError> {
        if self.player.is_none() {
            return Err(FieldError::PlayerMissing);
        }
        Ok(Player { field: self })
    }

    /// Checks that `coordinate` is inside the field and still empty.
    fn ensure_free(&self, coordinate: Coordinate) -> Result<(), FieldError> {
        match self.cells.get(coordinate) {
            None => Err(self.cells.out_of_bounds(coordinate).into()),
            Some(Cell::Empty) => Ok(()),
            Some(cell) => Err(FieldError::CellOccupied {
                coordinate,
                cell: *cell,
            }),
        }
    }

    /// Places the player at `coordinate` and returns a handle to it.
    ///
    /// Only one player may exist and it must start on an empty cell.
    pub fn spawn_player(&mut self, coordinate: Coordinate) -> Result<Player<'_>, FieldError> {
        if let Some(existing) = self.player {
            return Err(FieldError::PlayerAlreadySpawned { existing });
        }
        self.ensure_free(coordinate)?;
        self.cells[coordinate] = Cell::Player;
        self.player = Some(coordinate);
        debug!(%coordinate, "spawned player");
        Ok(Player { field: self })
    }

    /// Marks `coordinate` as the goal cell.
    pub fn spawn_target(&mut self, coordinate: Coordinate) -> Result<(), FieldError> {
        if let Some(existing) = self.target {
            return Err(FieldError::TargetAlreadySpawned { existing });
        }
        self.ensure_free(coordinate)?;
        self.cells[coordinate] = Cell::Target;
        self.target = Some(coordinate);
        debug!(%coordinate, "spawned target");
        Ok(())
    }

    /// Fills the inclusive run of cells from `from` to `to` with walls.
    ///
    /// The run must be horizontal or vertical and given in increasing order
    /// along its varying axis; `from == to` walls a single cell. A rejected run
    /// leaves the field untouched. Walls may overlap existing walls but never
    /// cover the player or the target.
    pub fn spawn_wall(&mut self, from: Coordinate, to: Coordinate) -> Result<(), FieldError> {
        for end in [from, to] {
            if !self.cells.contains(end) {
                return Err(self.cells.out_of_bounds(end).into());
            }
        }

        let step = match (from.x == to.x, from.y == to.y) {
            (false, false) => return Err(FieldError::DiagonalWall { from, to }),
            (true, true) => Direction::Right,
            (false, true) if from.x < to.x => Direction::Right,
            (true, false) if from.y < to.y => Direction::Down,
            _ => return Err(FieldError::ReversedWallRun { from, to }),
        };

        let run: Vec<Coordinate> = std::iter::successors(Some(from), |current| {
            (*current != to).then(|| *current + step)
        })
        .collect();

        for &coordinate in &run {
            let cell = self.cells[coordinate];
            if matches!(cell, Cell::Player | Cell::Target) {
                return Err(FieldError::CellOccupied { coordinate, cell });
            }
        }
        for &coordinate in &run {
            self.cells[coordinate] = Cell::Wall;
        }
        debug!(%from, %to, cells = run.len(), "spawned wall run");
        Ok(())
    }

    /// Requests moving the content of `from` one step to `to`.
    ///
    /// The move is applied and `true` returned only if both cells lie inside
    /// the field, they are exactly one orthogonal step apart, and `to` is
    /// neither a wall nor the player. Otherwise the field is unchanged.
    pub fn request_move(&mut self, from: Coordinate, to: Coordinate) -> bool {
        if !self.cells.contains(from) || !from.is_adjacent(&to) {
            return false;
        }
        match self.cells.get(to) {
            Some(cell) if !cell.blocks_entry() => {
                self.apply_move(from, to);
                true
            }
            _ => false,
        }
    }

    /// Moves whatever occupies `from` into `to` without any legality checks.
    ///
    /// When the player moves, the vacated cell becomes `Visited` and entering
    /// the target marks the field as solved. Callers guarantee both
    /// coordinates are in bounds.
    fn apply_move(&mut self, from: Coordinate, to: Coordinate) {
        if from == to {
            return;
        }
        let replaced = self.cells[to];
        let moving = self.cells[from];
        self.cells[to] = moving;

        match moving {
            Cell::Player => {
                self.player = Some(to);
                self.cells[from] = Cell::Visited;
                if replaced == Cell::Target {
                    self.solved = true;
                }
            }
            other => {
                if other == Cell::Target {
                    self.target = Some(to);
                } else if replaced == Cell::Target {
                    self.target = None;
                }
                self.cells[from] = Cell::Empty;
            }
        }
    }
}

impl fmt::Display for GameField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.rows() {
            let line: String = row.iter().map(|cell| cell.symbol()).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// A handle to the player, borrowed from its [`GameField`].
///
/// The handle holds no state of its own; every query and move is answered by
/// the field it borrows.
#[derive(Debug)]
pub struct Player<'a> {
    field: &'a mut GameField,
}

impl Player<'_> {
    /// The player's current position.
    pub fn position(&self) -> Coordinate {
        self.field
            .player
            .expect("a player handle only exists after the player is spawned")
    }

    /// Read access to the field the player lives in.
    pub fn field(&self) -> &GameField {
        &*self.field
    }

    /// Tries to move one cell in `direction`. Returns whether the move happened.
    pub fn step(&mut self, direction: Direction) -> bool {
        let from = self.position();
        self.field.request_move(from, from + direction)
    }

    /// Teleports the player to `to`, skipping adjacency and wall checks.
    ///
    /// Used to undo exploration by returning to a cell the player already
    /// reached legally. The vacated cell is still marked `Visited`.
    pub fn reposition(&mut self, to: Coordinate) -> Result<(), FieldError> {
        if !self.field.cells.contains(to) {
            return Err(self.field.cells.out_of_bounds(to).into());
        }
        let from = self.position();
        self.field.apply_move(from, to);
        Ok(())
    }
}
