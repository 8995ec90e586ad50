//! Abstraction levels
//!
//! Five fixed levels control both the instruction sent to the model and the
//! shape of the stored comment array.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Commentary granularity, from a one-sentence overview to per-line notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AbstractionLevel {
    Overview = 1,
    KeyComponents = 2,
    Functional = 3,
    Structural = 4,
    LineByLine = 5,
}

/// How many comments a level produces for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentShape {
    /// One comment for the whole file.
    Single,
    /// Exactly one comment per source line, blank lines included.
    PerLine,
}

impl AbstractionLevel {
    pub const ALL: [AbstractionLevel; 5] = [
        AbstractionLevel::Overview,
        AbstractionLevel::KeyComponents,
        AbstractionLevel::Functional,
        AbstractionLevel::Structural,
        AbstractionLevel::LineByLine,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            AbstractionLevel::Overview => "overview",
            AbstractionLevel::KeyComponents => "key components",
            AbstractionLevel::Functional => "functional summary",
            AbstractionLevel::Structural => "structural analysis",
            AbstractionLevel::LineByLine => "line by line",
        }
    }

    pub fn shape(self) -> CommentShape {
        match self {
            AbstractionLevel::LineByLine => CommentShape::PerLine,
            _ => CommentShape::Single,
        }
    }

    /// Number of comments a well-formed result holds for a source of
    /// `source_lines` lines.
    pub fn expected_comment_count(self, source_lines: usize) -> usize {
        match self.shape() {
            CommentShape::Single => 1,
            CommentShape::PerLine => source_lines,
        }
    }

    /// Instruction given to the model for this level.
    pub fn instruction(self) -> &'static str {
        match self {
            AbstractionLevel::Overview => {
                "Summarize what this file does in exactly one sentence. \
                 Reply with that sentence only."
            }
            AbstractionLevel::KeyComponents => {
                "Describe the key components of this file (main types, functions and \
                 their roles) in one short paragraph. Reply with the paragraph only."
            }
            AbstractionLevel::Functional => {
                "Write one paragraph summarizing how this file works: its inputs, the \
                 main steps it performs and what it produces. Reply with the paragraph only."
            }
            AbstractionLevel::Structural => {
                "Write one long paragraph giving a detailed structural analysis of this \
                 file: control flow, data structures, dependencies between parts and \
                 notable edge cases. Reply with the paragraph only."
            }
            AbstractionLevel::LineByLine => {
                "Explain the code line by line. Output exactly one short comment per \
                 non-blank source line, in order, one comment per output line. Do not \
                 number the comments, do not repeat the code and do not add any other text."
            }
        }
    }
}

impl TryFrom<u8> for AbstractionLevel {
    type Error = ApiError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AbstractionLevel::Overview),
            2 => Ok(AbstractionLevel::KeyComponents),
            3 => Ok(AbstractionLevel::Functional),
            4 => Ok(AbstractionLevel::Structural),
            5 => Ok(AbstractionLevel::LineByLine),
            other => Err(ApiError::InvalidLevel(other)),
        }
    }
}

impl From<AbstractionLevel> for u8 {
    fn from(level: AbstractionLevel) -> Self {
        level.as_u8()
    }
}

impl Default for AbstractionLevel {
    fn default() -> Self {
        AbstractionLevel::LineByLine
    }
}

impl fmt::Display for AbstractionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}
