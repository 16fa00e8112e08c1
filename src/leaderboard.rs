//! Score tracking and standings
//!
//! This module keeps the per-team tallies (score, questions answered,
//! questions answered correctly) and derives the ranked standings table
//! from them. Standings are a pure function of the tallies and the
//! roster; the final table is computed once when the quiz ends and
//! cached for repeated display.

use std::{cmp::Reverse, collections::HashMap};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::team::{self, Roster};

/// Running totals for a single team
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    /// Total points earned
    pub score: u64,
    /// Number of questions this team has answered
    pub answered: u32,
    /// Number of those answers that were correct
    pub correct: u32,
}

/// One row of the ranked standings table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandingsRow {
    /// 1-based rank; ties keep entry order and receive successive ranks
    pub rank: usize,
    /// The team's display name
    pub name: String,
    /// Total points earned
    pub score: u64,
    /// Number of questions answered
    pub answered: u32,
    /// Number of correct answers
    pub correct: u32,
}

/// Tracks tallies for every registered team
///
/// All tallies start at zero when the quiz starts and only ever grow.
/// The `correct <= answered` relation holds by construction: a correct
/// answer always increments both counters together.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Leaderboard {
    /// Per-team running totals
    tallies: HashMap<team::Id, Tally>,

    /// Final standings, computed once when the quiz finishes (cached)
    #[serde(skip)]
    final_standings: once_cell_serde::sync::OnceCell<Vec<StandingsRow>>,
}

impl Leaderboard {
    /// Creates a leaderboard with zeroed tallies for every roster team
    pub fn for_roster(roster: &Roster) -> Self {
        Self {
            tallies: roster
                .teams()
                .iter()
                .map(|team| (team.id(), Tally::default()))
                .collect(),
            final_standings: once_cell_serde::sync::OnceCell::new(),
        }
    }

    /// Records a submitted answer for a team
    ///
    /// Always increments the answered counter; on a correct answer the
    /// question's points are added to the score and the correct counter
    /// is incremented as well.
    ///
    /// # Arguments
    ///
    /// * `team` - The answering team
    /// * `correct` - Whether the selected option was the correct one
    /// * `points` - The question's point value, awarded only when correct
    pub fn record_answer(&mut self, team: team::Id, correct: bool, points: u64) {
        let tally = self.tallies.entry(team).or_default();
        tally.answered += 1;
        if correct {
            tally.correct += 1;
            tally.score += points;
        }
    }

    /// Returns the current tally for a team
    pub fn tally(&self, team: team::Id) -> Option<Tally> {
        self.tallies.get(&team).copied()
    }

    /// Derives the ranked standings table
    ///
    /// Teams are sorted by score descending with a stable sort, so teams
    /// with equal scores keep their original entry order. Each row gets
    /// its 1-based position as rank.
    pub fn standings(&self, roster: &Roster) -> Vec<StandingsRow> {
        roster
            .teams()
            .iter()
            .map(|team| (team, self.tally(team.id()).unwrap_or_default()))
            .sorted_by_key(|(_, tally)| Reverse(tally.score))
            .enumerate()
            .map(|(position, (team, tally))| StandingsRow {
                rank: position + 1,
                name: team.name().to_owned(),
                score: tally.score,
                answered: tally.answered,
                correct: tally.correct,
            })
            .collect_vec()
    }

    /// Gets or computes the final standings with caching
    ///
    /// Called when the quiz transitions to its finished state; later
    /// calls return the cached table without resorting.
    pub fn final_standings(&self, roster: &Roster) -> &[StandingsRow] {
        self.final_standings.get_or_init(|| self.standings(roster))
    }
}
