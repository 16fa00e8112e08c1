//! Question bank loading and validation
//!
//! This module parses the delimited question-bank format into validated
//! [`QuestionRecord`]s and produces the randomly permuted sequence used
//! for the rest of the session. Parsing is deliberately forgiving: bad
//! fields are coerced to documented defaults and records that still fail
//! validation are dropped rather than reported.

use std::fmt::Display;

use enum_map::{Enum, EnumMap, enum_map};
use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// One of the four answer positions of a question
///
/// The bank format always carries exactly four options, so the position
/// is a closed enum rather than a raw index. Use [`Choice::from_index`]
/// to convert UI-supplied 0-based indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum Choice {
    /// First option
    A,
    /// Second option
    B,
    /// Third option
    C,
    /// Fourth option
    D,
}

impl Choice {
    /// All answer positions in display order
    pub const ALL: [Choice; 4] = [Choice::A, Choice::B, Choice::C, Choice::D];

    /// Converts a 0-based index into a choice
    ///
    /// # Returns
    ///
    /// `Some` for indices 0 through 3, `None` otherwise
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Converts a 1-based column value into a choice, clamping into [1,4]
    ///
    /// This mirrors the bank format's `correctIndex` column: out-of-range
    /// values are clamped rather than rejected.
    pub fn from_column(value: i64) -> Self {
        Self::ALL[(value.clamp(1, 4) - 1) as usize]
    }

    /// Returns the 0-based index of this choice
    pub fn index(self) -> usize {
        self as usize
    }
}

impl Display for Choice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        })
    }
}

/// Validates that all four options carry non-empty text within bounds
fn validate_options(options: &EnumMap<Choice, String>) -> garde::Result {
    for (choice, text) in options.iter() {
        if text.is_empty() {
            return Err(garde::Error::new(format!("option {choice} is empty")));
        }
        if text.len() > crate::constants::bank::MAX_OPTION_LENGTH {
            return Err(garde::Error::new(format!("option {choice} is too long")));
        }
    }
    Ok(())
}

/// A single validated multiple-choice question
///
/// Records are immutable once constructed; the loader drops anything
/// that fails validation instead of surfacing partially usable rows.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionRecord {
    /// The question text read to and shown to players
    #[garde(length(min = 1, max = crate::constants::bank::MAX_TEXT_LENGTH))]
    text: String,
    /// The four answer options in display order
    #[garde(custom(|v, _| validate_options(v)))]
    options: EnumMap<Choice, String>,
    /// The answer position that scores points
    #[garde(skip)]
    correct: Choice,
    /// Points awarded for a correct answer
    #[garde(range(min = 1))]
    points: u64,
}

impl QuestionRecord {
    /// Returns the question text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns all four options keyed by answer position
    pub fn options(&self) -> &EnumMap<Choice, String> {
        &self.options
    }

    /// Returns the text of a single option
    pub fn option(&self, choice: Choice) -> &str {
        &self.options[choice]
    }

    /// Returns the correct answer position
    pub fn correct(&self) -> Choice {
        self.correct
    }

    /// Returns the points awarded for answering correctly
    pub fn points(&self) -> u64 {
        self.points
    }
}

/// Coerces one data row into a record, defaulting unusable fields
///
/// Missing fields become empty strings (and fail validation later);
/// a missing or non-numeric correct column falls back to the first
/// option, and unusable points fall back to the default award.
fn parse_record(line: &str) -> QuestionRecord {
    let fields = line
        .split(crate::constants::bank::FIELD_DELIMITER)
        .map(str::trim)
        .collect_vec();
    let field = |index: usize| fields.get(index).copied().unwrap_or_default();

    let correct = field(5)
        .parse::<i64>()
        .unwrap_or(crate::constants::bank::DEFAULT_CORRECT_COLUMN);
    let points = field(6)
        .parse::<i64>()
        .ok()
        .filter(|points| *points > 0)
        .map_or(crate::constants::bank::DEFAULT_POINTS, |points| {
            points as u64
        });

    QuestionRecord {
        text: field(0).to_owned(),
        options: enum_map! {
            Choice::A => field(1).to_owned(),
            Choice::B => field(2).to_owned(),
            Choice::C => field(3).to_owned(),
            Choice::D => field(4).to_owned(),
        },
        correct: Choice::from_column(correct),
        points,
    }
}

/// The ordered question sequence for one session
///
/// Produced once per load by [`QuestionBank::parse`]; the order is fixed
/// afterwards. An empty bank is an ordinary value so the caller can show
/// "no questions available" instead of starting a broken quiz.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    /// Validated records in their shuffled presentation order
    questions: Vec<QuestionRecord>,
}

impl QuestionBank {
    /// Parses raw bank text into a shuffled, validated question sequence
    ///
    /// The format is delimited text with a header row and the columns
    /// `question, option1..option4, correctIndex, points` where
    /// `correctIndex` is 1-based and `points` is optional. Fields
    /// containing the delimiter are not supported (there is no escaping).
    /// The first non-empty line is always treated as the header. Records
    /// failing validation are silently dropped, and the survivors are
    /// shuffled exactly once with an unbiased Fisher-Yates pass.
    ///
    /// # Arguments
    ///
    /// * `source` - The raw bank text obtained by the embedding host
    ///
    /// # Returns
    ///
    /// A bank holding every valid record; empty if the source was empty
    /// or no record survived validation
    pub fn parse(source: &str) -> Self {
        let mut lines = source
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty());
        let _header = lines.next();

        let mut questions = lines
            .map(parse_record)
            .filter(|record| record.validate().is_ok())
            .take(crate::constants::bank::MAX_QUESTION_COUNT)
            .collect_vec();
        fastrand::shuffle(&mut questions);

        Self { questions }
    }

    /// Returns the number of questions in the bank
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Checks whether the bank holds no questions
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Returns the question at the given position in presentation order
    pub fn get(&self, index: usize) -> Option<&QuestionRecord> {
        self.questions.get(index)
    }

    /// Iterates over the questions in presentation order
    pub fn iter(&self) -> impl Iterator<Item = &QuestionRecord> {
        self.questions.iter()
    }
}
