use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── CONSTANTS ─────────────────────────────────────────────────────────────────
//

/// Number of mastery buckets. Level `NUMBER_OF_LEVELS - 1` is terminal.
pub const NUMBER_OF_LEVELS: usize = 5;

/// Consecutive correct answers needed to leave level 0, 1, 2 and 3.
pub const NEEDED_CORRECT_ANSWERS: [u32; NUMBER_OF_LEVELS - 1] = [3, 4, 5, 6];

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("level must be below {NUMBER_OF_LEVELS}, got {0}")]
    InvalidLevel(u32),
}

//
// ─── LEVEL ─────────────────────────────────────────────────────────────────────
//

/// Mastery level of a question, always a valid bucket index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Level(u8);

impl Level {
    pub const FIRST: Level = Level(0);
    #[allow(clippy::cast_possible_truncation)]
    pub const TERMINAL: Level = Level((NUMBER_OF_LEVELS - 1) as u8);

    /// Build a level from a raw number.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidLevel` if `value >= NUMBER_OF_LEVELS`.
    pub fn new(value: u32) -> Result<Self, ProgressError> {
        match u8::try_from(value) {
            Ok(v) if usize::from(v) < NUMBER_OF_LEVELS => Ok(Self(v)),
            _ => Err(ProgressError::InvalidLevel(value)),
        }
    }

    /// All levels in ascending order.
    pub fn all() -> impl Iterator<Item = Level> {
        (0..NUMBER_OF_LEVELS).map(|i| Level(u8::try_from(i).unwrap_or(u8::MAX)))
    }

    #[must_use]
    pub fn value(self) -> u32 {
        u32::from(self.0)
    }

    /// Position of this level's bucket.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::TERMINAL
    }

    /// The following level, or `None` at the terminal level.
    #[must_use]
    pub fn next(self) -> Option<Level> {
        if self.is_terminal() {
            None
        } else {
            Some(Level(self.0 + 1))
        }
    }

    /// Streak required to leave this level; `None` at the terminal level.
    #[must_use]
    pub fn promotion_threshold(self) -> Option<u32> {
        NEEDED_CORRECT_ANSWERS.get(self.index()).copied()
    }
}

impl TryFrom<u32> for Level {
    type Error = ProgressError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Level> for u32 {
    fn from(level: Level) -> Self {
        level.value()
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── USER PROGRESS ─────────────────────────────────────────────────────────────
//

/// Per-question mastery state owned by the learner.
///
/// `comment` is the learner's private note and is unrelated to the
/// authored comment on the question itself.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProgress {
    pub level: Level,
    pub correct_streak: u32,
    pub comment: Option<String>,
}

impl UserProgress {
    #[must_use]
    pub fn new(level: Level, correct_streak: u32) -> Self {
        Self {
            level,
            correct_streak,
            comment: None,
        }
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Apply a correct answer. Returns `true` when the level went up.
    ///
    /// At the terminal level nothing changes, the streak included.
    pub fn register_correct(&mut self) -> bool {
        let Some(threshold) = self.level.promotion_threshold() else {
            return false;
        };

        self.correct_streak = self.correct_streak.saturating_add(1);
        if self.correct_streak < threshold {
            return false;
        }

        match self.level.next() {
            Some(next) => {
                self.correct_streak = 0;
                self.level = next;
                true
            }
            None => false,
        }
    }

    /// Apply an incorrect answer: the streak restarts, the level stays.
    pub fn register_incorrect(&mut self) {
        self.correct_streak = 0;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
