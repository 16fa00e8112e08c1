//! Configuration constants for the quiz runner
//!
//! This module contains the limits and defaults used throughout the
//! crate to keep ingestion and team registration within sane bounds
//! and to give the loader its documented fallback values.

/// Question bank ingestion constants
pub mod bank {
    /// Field delimiter for the tabular question-bank format
    pub const FIELD_DELIMITER: char = ',';
    /// Points awarded for a correct answer when the column is missing or unusable
    pub const DEFAULT_POINTS: u64 = 10;
    /// Fallback 1-based correct-option column value when missing or non-numeric
    pub const DEFAULT_CORRECT_COLUMN: i64 = 1;
    /// Maximum length of question text in characters
    pub const MAX_TEXT_LENGTH: usize = 400;
    /// Maximum length of a single answer option in characters
    pub const MAX_OPTION_LENGTH: usize = 200;
    /// Maximum number of questions kept from a single bank
    pub const MAX_QUESTION_COUNT: usize = 500;
}

/// Team registration constants
pub mod team {
    /// Maximum number of teams in a single session
    pub const MAX_TEAM_COUNT: usize = 32;
    /// Maximum length of an operator-entered team name in characters
    pub const MAX_NAME_LENGTH: usize = 50;
}
