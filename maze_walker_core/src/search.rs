//! Depth-limited backtracking search that walks the player to the target.
//!
//! The search drives the real player through the field rather than a model of
//! it: every candidate step is a genuine move, and backtracking teleports the
//! player back to the cell it branched from. A caller-supplied callback sees
//! the field after every attempted step, which is how a renderer animates the
//! exploration.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::{
    Coordinate, Direction,
    environment::{FieldError, GameField, Player},
};

/// Deepest recursion a search will attempt. Each level holds a stack frame,
/// so larger requests are clamped to this.
pub const MAX_SEARCH_DEPTH: usize = 1024;

/// Shared flag that stops a running search at its next recursion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How a search ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// The target was reached. `path` lists the cells entered along the
    /// winning branch in order, excluding the start and ending on the target.
    Found { path: Vec<Coordinate> },
    /// Every branch ran out of depth or room. This only means no route exists
    /// within `max_depth + 1` moves; a deeper search may still succeed.
    Exhausted { max_depth: usize },
    /// The search was stopped through its [`CancelToken`].
    Cancelled,
}

/// Result of a search run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchReport {
    #[serde(flatten)]
    pub outcome: SearchOutcome,
    /// Number of times the step callback was invoked.
    pub steps: usize,
}

impl SearchReport {
    pub fn is_found(&self) -> bool {
        matches!(self.outcome, SearchOutcome::Found { .. })
    }

    /// The winning path, if the target was reached.
    pub fn path(&self) -> Option<&[Coordinate]> {
        match &self.outcome {
            SearchOutcome::Found { path } => Some(path),
            _ => None,
        }
    }

    /// Directions of each move along the winning path, starting from `start`.
    pub fn directions(&self, start: Coordinate) -> Option<Vec<Direction>> {
        let path = self.path()?;
        std::iter::once(start)
            .chain(path.iter().copied())
            .zip(path.iter().copied())
            .map(|(from, to)| Direction::from_offset(to - from))
            .collect()
    }
}

/// Outcome of exploring one subtree.
enum Branch {
    /// Reached the target; cells entered from here on, in reverse order.
    Found(Vec<Coordinate>),
    Exhausted,
    Cancelled,
}

/// Configuration for a depth-limited path search.
///
/// Moves are tried in [`Direction::ALL`] order, so the same field and depth
/// always produce the same exploration. The first path found wins; it is not
/// necessarily the shortest.
#[derive(Debug, Clone)]
pub struct Search {
    max_depth: usize,
    cancel: Option<CancelToken>,
}

impl Search {
    /// A search allowing recursion down to `max_depth`, i.e. branches of at
    /// most `max_depth + 1` moves. Depths beyond [`MAX_SEARCH_DEPTH`] are
    /// clamped.
    pub fn new(max_depth: usize) -> Self {
        if max_depth > MAX_SEARCH_DEPTH {
            warn!(
                requested = max_depth,
                limit = MAX_SEARCH_DEPTH,
                "search depth clamped"
            );
        }
        Search {
            max_depth: max_depth.min(MAX_SEARCH_DEPTH),
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Runs the search on `field`, calling `on_step` after every attempted move
    /// that succeeded in moving the player, and once more per level while a
    /// found path unwinds.
    ///
    /// Fails only if the field has no player.
    pub fn run<F>(&self, field: &mut GameField, mut on_step: F) -> Result<SearchReport, FieldError>
    where
        F: FnMut(&GameField),
    {
        let mut player = field.player()?;
        let start = player.position();
        debug!(%start, max_depth = self.max_depth, "starting path search");

        let mut steps = 0;
        let notify = &mut |field: &GameField| {
            steps += 1;
            on_step(field);
        };
        let branch = self.explore(&mut player, notify, 0, None)?;

        let outcome = match branch {
            Branch::Found(mut trail) => {
                trail.reverse();
                SearchOutcome::Found { path: trail }
            }
            Branch::Exhausted => SearchOutcome::Exhausted {
                max_depth: self.max_depth,
            },
            Branch::Cancelled => SearchOutcome::Cancelled,
        };
        debug!(?outcome, steps, "path search finished");
        Ok(SearchReport { outcome, steps })
    }

    fn explore(
        &self,
        player: &mut Player<'_>,
        on_step: &mut dyn FnMut(&GameField),
        depth: usize,
        avoid: Option<Coordinate>,
    ) -> Result<Branch, FieldError> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Ok(Branch::Cancelled);
        }

        let anchor = player.position();
        for direction in Direction::ALL {
            let next = anchor + direction;
            if avoid == Some(next) {
                continue;
            }

            player.reposition(anchor)?;
            if !player.step(direction) {
                continue;
            }
            trace!(depth, from = %anchor, to = %next, "moved");

            if player.field().is_solved() {
                on_step(player.field());
                return Ok(Branch::Found(vec![next]));
            }

            if depth != self.max_depth {
                match self.explore(player, on_step, depth + 1, Some(anchor))? {
                    Branch::Found(mut trail) => {
                        on_step(player.field());
                        trail.push(next);
                        return Ok(Branch::Found(trail));
                    }
                    Branch::Cancelled => return Ok(Branch::Cancelled),
                    Branch::Exhausted => {}
                }
            }

            on_step(player.field());
        }
        Ok(Branch::Exhausted)
    }
}

/// Searches `field` for a path from the player to the target, allowing
/// recursion down to `max_depth`.
pub fn find_path<F>(
    field: &mut GameField,
    on_step: F,
    max_depth: usize,
) -> Result<SearchReport, FieldError>
where
    F: FnMut(&GameField),
{
    Search::new(max_depth).run(field, on_step)
}
