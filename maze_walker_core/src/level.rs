//! Loading a [`GameField`] from a level definition.
//!
//! Two text formats are understood. The command format lists one instruction
//! per line:
//!
//! ```text
//! # comment
//! siz 5,3
//! plr 0,1
//! trg 4,1
//! wal 2,0 2,1
//! ```
//!
//! The map format draws the maze directly, one row per line, with `P` for the
//! player, `T` for the target, `#` for walls and spaces for empty cells. Any
//! text containing a `siz` command is read as the command format.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    Coordinate,
    environment::{FieldError, GameField},
};

/// Largest number of cells a `siz` command may ask for.
pub const MAX_LEVEL_CELLS: usize = 1 << 20;

/// Errors raised while reading a level definition.
#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("Failed to read level file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Level is missing a 'siz' command")]
    MissingSize,
    #[error("Line {line}: unknown command '{command}'")]
    UnknownCommand { line: usize, command: String },
    #[error("Line {line}: '{command}' expects {expected} argument(s), found {found}")]
    ArgumentCount {
        line: usize,
        command: String,
        expected: usize,
        found: usize,
    },
    #[error("Line {line}: '{text}' is not a coordinate, expected 'x,y'")]
    BadCoordinate { line: usize, text: String },
    #[error("Line {line}: level size {size} must be positive in both directions")]
    BadSize { line: usize, size: Coordinate },
    #[error("Line {line}: level size {size} exceeds the limit of {max_cells} cells")]
    LevelTooLarge {
        line: usize,
        size: Coordinate,
        max_cells: usize,
    },
    #[error("Line {line}: {source}")]
    Field {
        line: usize,
        #[source]
        source: FieldError,
    },
    #[error("Map is empty")]
    EmptyMap,
    #[error("Unknown map character '{character}' at {position}")]
    UnknownCharacter {
        character: char,
        position: Coordinate,
    },
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Level has no player")]
    MissingPlayer,
}

/// The two supported level layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelFormat {
    Commands,
    Map,
}

impl LevelFormat {
    /// Guesses the format of `text`.
    pub fn detect(text: &str) -> Self {
        if text.contains("siz") {
            LevelFormat::Commands
        } else {
            LevelFormat::Map
        }
    }
}

/// Reads and parses the level file at `path`.
pub fn load_level_file(path: impl AsRef<Path>) -> Result<GameField, LevelError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_level(&text)
}

/// Builds a field from level text in either format.
///
/// The resulting field always has a player; a target is optional.
pub fn load_level(text: &str) -> Result<GameField, LevelError> {
    let format = LevelFormat::detect(text);
    let field = match format {
        LevelFormat::Commands => load_commands(text)?,
        LevelFormat::Map => load_map(text)?,
    };
    if field.locate_player().is_none() {
        return Err(LevelError::MissingPlayer);
    }
    debug!(
        ?format,
        width = field.width(),
        height = field.height(),
        "loaded level"
    );
    Ok(field)
}

/// One parsed line of the command format.
struct Instruction<'a> {
    line: usize,
    command: &'a str,
    args: Vec<&'a str>,
}

impl Instruction<'_> {
    fn expect_args(&self, expected: usize) -> Result<(), LevelError> {
        if self.args.len() != expected {
            return Err(LevelError::ArgumentCount {
                line: self.line,
                command: self.command.to_string(),
                expected,
                found: self.args.len(),
            });
        }
        Ok(())
    }

    fn coordinate(&self, index: usize) -> Result<Coordinate, LevelError> {
        let text = self.args[index];
        let bad = || LevelError::BadCoordinate {
            line: self.line,
            text: text.to_string(),
        };
        let (x, y) = text.split_once(',').ok_or_else(bad)?;
        let x: i32 = x.trim().parse().map_err(|_| bad())?;
        let y: i32 = y.trim().parse().map_err(|_| bad())?;
        Ok(Coordinate::new(x, y))
    }

    fn field_error(&self) -> impl Fn(FieldError) -> LevelError + '_ {
        move |source| LevelError::Field {
            line: self.line,
            source,
        }
    }
}

fn parse_instructions(text: &str) -> Vec<Instruction<'_>> {
    text.lines()
        .enumerate()
        .filter_map(|(index, raw)| {
            let trimmed = raw.trim();
            if trimmed.len() <= 2 || trimmed.starts_with('#') {
                return None;
            }
            let mut tokens = trimmed.split_whitespace();
            let command = tokens.next()?;
            Some(Instruction {
                line: index + 1,
                command,
                args: tokens.collect(),
            })
        })
        .collect()
}

fn load_commands(text: &str) -> Result<GameField, LevelError> {
    let instructions = parse_instructions(text);

    // The size is applied before anything else, wherever it appears.
    let size_instruction = instructions
        .iter()
        .find(|instruction| instruction.command == "siz")
        .ok_or(LevelError::MissingSize)?;
    size_instruction.expect_args(1)?;
    let size = size_instruction.coordinate(0)?;
    let (Ok(width), Ok(height)) = (usize::try_from(size.x), usize::try_from(size.y)) else {
        return Err(LevelError::BadSize {
            line: size_instruction.line,
            size,
        });
    };
    if width == 0 || height == 0 {
        return Err(LevelError::BadSize {
            line: size_instruction.line,
            size,
        });
    }
    if width
        .checked_mul(height)
        .is_none_or(|cells| cells > MAX_LEVEL_CELLS)
    {
        return Err(LevelError::LevelTooLarge {
            line: size_instruction.line,
            size,
            max_cells: MAX_LEVEL_CELLS,
        });
    }

    let mut field = GameField::new(width, height);
    for instruction in &instructions {
        match instruction.command {
            "siz" => {}
            "plr" => {
                instruction.expect_args(1)?;
                field
                    .spawn_player(instruction.coordinate(0)?)
                    .map_err(instruction.field_error())?;
            }
            "trg" => {
                instruction.expect_args(1)?;
                field
                    .spawn_target(instruction.coordinate(0)?)
                    .map_err(instruction.field_error())?;
            }
            "wal" => {
                instruction.expect_args(2)?;
                field
                    .spawn_wall(instruction.coordinate(0)?, instruction.coordinate(1)?)
                    .map_err(instruction.field_error())?;
            }
            other => {
                return Err(LevelError::UnknownCommand {
                    line: instruction.line,
                    command: other.to_string(),
                });
            }
        }
    }
    Ok(field)
}

fn load_map(text: &str) -> Result<GameField, LevelError> {
    let mut rows: Vec<&str> = text.lines().collect();
    while rows.last().is_some_and(|row| row.is_empty()) {
        rows.pop();
    }
    let width = rows.first().map_or(0, |row| row.chars().count());
    if width == 0 {
        return Err(LevelError::EmptyMap);
    }

    let mut field = GameField::new(width, rows.len());
    for (y, row) in rows.iter().enumerate() {
        let found = row.chars().count();
        if found != width {
            return Err(LevelError::RaggedRow {
                row: y,
                expected: width,
                found,
            });
        }

        for (x, character) in row.chars().enumerate() {
            let position = Coordinate::new(x as i32, y as i32);
            let spawned = match character {
                ' ' => Ok(()),
                '#' => field.spawn_wall(position, position),
                'T' => field.spawn_target(position),
                'P' => field.spawn_player(position).map(|_| ()),
                character => {
                    return Err(LevelError::UnknownCharacter {
                        character,
                        position,
                    });
                }
            };
            spawned.map_err(|source| LevelError::Field { line: y + 1, source })?;
        }
    }
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Cell;

    fn c(x: i32, y: i32) -> Coordinate {
        Coordinate::new(x, y)
    }

    #[test]
    fn detects_format_by_size_command() {
        assert_eq!(LevelFormat::detect("siz 3,3\nplr 0,0"), LevelFormat::Commands);
        assert_eq!(LevelFormat::detect("P T\n###"), LevelFormat::Map);
    }

    #[test]
    fn command_level_builds_the_field() {
        let text = "\
# a small corridor
plr 0,1
siz 5,3
trg 4,1
wal 2,0 2,1

wal 0,2 4,2
";
        let field = load_level(text).unwrap();
        assert_eq!((field.width(), field.height()), (5, 3));
        assert_eq!(field.locate_player(), Some(c(0, 1)));
        assert_eq!(field.locate_target(), Some(c(4, 1)));
        assert_eq!(field.cell(c(2, 0)), Some(Cell::Wall));
        assert_eq!(field.cell(c(2, 1)), Some(Cell::Wall));
        assert_eq!(field.cell(c(3, 2)), Some(Cell::Wall));
        assert_eq!(field.cell(c(3, 1)), Some(Cell::Empty));
    }

    #[test]
    fn command_errors_carry_line_numbers() {
        assert!(matches!(
            load_commands("plr 0,0\ntrg 1,1\n"),
            Err(LevelError::MissingSize)
        ));
        assert!(matches!(
            load_level("siz 3,3\nplr 0,0\njmp 1,1\n"),
            Err(LevelError::UnknownCommand { line: 3, .. })
        ));
        assert!(matches!(
            load_level("siz 3,3\nplr 0;0\n"),
            Err(LevelError::BadCoordinate { line: 2, .. })
        ));
        assert!(matches!(
            load_level("siz 3,3\nplr 0,0\nwal 1,1\n"),
            Err(LevelError::ArgumentCount {
                line: 3,
                expected: 2,
                found: 1,
                ..
            })
        ));
        assert!(matches!(
            load_level("siz 0,3\nplr 0,0\n"),
            Err(LevelError::BadSize { line: 1, .. })
        ));
    }

    #[test]
    fn oversized_level_is_rejected() {
        assert!(matches!(
            load_level("siz 2147483647,2147483647\nplr 0,0\n"),
            Err(LevelError::LevelTooLarge {
                line: 1,
                max_cells: MAX_LEVEL_CELLS,
                ..
            })
        ));
        assert!(matches!(
            load_level("# big\nsiz 1025,1024\nplr 0,0\n"),
            Err(LevelError::LevelTooLarge { line: 2, .. })
        ));
        let field = load_level("siz 1024,1024\nplr 0,0\n").unwrap();
        assert_eq!(field.width() * field.height(), MAX_LEVEL_CELLS);
    }

    #[test]
    fn reversed_wall_command_is_rejected() {
        let err = load_level("siz 5,5\nplr 0,0\nwal 3,2 1,2\n").unwrap_err();
        assert!(matches!(
            err,
            LevelError::Field {
                line: 3,
                source: FieldError::ReversedWallRun { .. }
            }
        ));
    }

    #[test]
    fn map_level_builds_the_field() {
        let text = "#####\n#P  #\n# #T#\n#####\n\n";
        let field = load_level(text).unwrap();
        assert_eq!((field.width(), field.height()), (5, 4));
        assert_eq!(field.locate_player(), Some(c(1, 1)));
        assert_eq!(field.locate_target(), Some(c(3, 2)));
        assert_eq!(field.cell(c(2, 2)), Some(Cell::Wall));
        assert_eq!(field.to_string(), "#####\n#P  #\n# #T#\n#####\n");
    }

    #[test]
    fn map_errors() {
        assert!(matches!(load_level("\n\n"), Err(LevelError::EmptyMap)));
        assert!(matches!(
            load_level("P x\n"),
            Err(LevelError::UnknownCharacter {
                character: 'x',
                position: Coordinate { x: 2, y: 0 }
            })
        ));
        assert!(matches!(
            load_level("P T\n##\n"),
            Err(LevelError::RaggedRow {
                row: 1,
                expected: 3,
                found: 2
            })
        ));
        assert!(matches!(
            load_level("PP\n"),
            Err(LevelError::Field {
                line: 1,
                source: FieldError::PlayerAlreadySpawned { .. }
            })
        ));
        assert!(matches!(
            load_level("# T\n"),
            Err(LevelError::MissingPlayer)
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_level_file("does/not/exist.lvl").unwrap_err();
        assert!(matches!(err, LevelError::Io { .. }));
        assert!(err.to_string().contains("does/not/exist.lvl"));
    }
}
