//! Team identity and roster management
//!
//! This module defines the opaque team identifier, the team record, and
//! the roster built once at quiz start from operator-entered names.
//! Rosters keep their entry order for the whole session; it doubles as
//! the tie-break order of the standings table.

use std::{fmt::Display, str::FromStr};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;

/// A unique identifier for a team
///
/// Ids are assigned when the roster is built and stay stable for the
/// rest of the session.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random team ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    /// Creates a new random team ID (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Id {
    /// Formats the ID as a UUID string
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    /// Parses an ID from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Errors produced while building a roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum Error {
    /// No usable team name survived filtering
    #[error("at least one non-blank team name is required")]
    Empty,
}

/// A registered team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// The team's stable identifier
    id: Id,
    /// The operator-entered display name
    name: String,
}

impl Team {
    /// Returns the team's identifier
    pub fn id(&self) -> Id {
        self.id
    }

    /// Returns the team's display name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The ordered team list for one session
///
/// Built once at quiz start; teams are never renamed or removed while
/// the quiz is running.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Roster {
    /// Teams in operator entry order
    teams: Vec<Team>,
}

impl Roster {
    /// Builds a roster from operator-entered names
    ///
    /// Names are trimmed; blanks, over-long names, and exact duplicates
    /// (keeping the first occurrence) are filtered out, and the result
    /// is capped at [`crate::constants::team::MAX_TEAM_COUNT`]. Each
    /// surviving name receives a fresh stable ID in entry order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] if no usable name survives filtering.
    pub fn from_names<I, S>(names: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let teams = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_owned())
            .filter(|name| {
                !name.is_empty() && name.len() <= crate::constants::team::MAX_NAME_LENGTH
            })
            .unique()
            .take(crate::constants::team::MAX_TEAM_COUNT)
            .map(|name| Team {
                id: Id::new(),
                name,
            })
            .collect_vec();

        if teams.is_empty() {
            return Err(Error::Empty);
        }
        Ok(Self { teams })
    }

    /// Returns the teams in entry order
    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    /// Returns the number of registered teams
    pub fn len(&self) -> usize {
        self.teams.len()
    }

    /// Checks whether the roster holds no teams
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Looks up a team by its identifier
    pub fn get(&self, id: Id) -> Option<&Team> {
        self.teams.iter().find(|team| team.id == id)
    }

    /// Checks whether a team belongs to this roster
    pub fn contains(&self, id: Id) -> bool {
        self.get(id).is_some()
    }
}
