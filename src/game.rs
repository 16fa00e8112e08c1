//! Quiz session state machine
//!
//! This module contains the session object and the event dispatch that
//! drives a quiz from team registration through question progression,
//! answer scoring, and the final standings. All rule violations are
//! typed, recoverable outcomes: a rejected event leaves the session in
//! its last valid state and tells the caller why.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;

use crate::{
    bank::{Choice, QuestionBank, QuestionRecord},
    leaderboard::{Leaderboard, StandingsRow, Tally},
    narrator::Narrator,
    team::{self, Roster},
};

/// Rejected-action outcomes surfaced to the operator
///
/// Every variant is a local, recoverable condition; none of them
/// invalidates the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum Error {
    /// `Start` was received while a quiz was already running or finished
    #[error("the quiz has already started")]
    AlreadyStarted,
    /// `Start` was received with an empty question bank
    #[error("the question bank has no questions")]
    EmptyBank,
    /// `Start` was received without any usable team name
    #[error("at least one non-blank team name is required")]
    NoTeams,
    /// A gameplay event arrived before the quiz was started
    #[error("the quiz has not started yet")]
    NotStarted,
    /// A gameplay event arrived after the last question was passed
    #[error("the quiz is already over")]
    Finished,
    /// The current question's answer was already submitted
    #[error("this question has already been answered")]
    AlreadyAnswered,
    /// `Submit` arrived before both an option and a team were selected
    #[error("both an option and a team must be selected before submitting")]
    IncompleteAnswer,
    /// The selected team is not part of this quiz
    #[error("the selected team is not part of this quiz")]
    UnknownTeam,
}

impl From<team::Error> for Error {
    fn from(error: team::Error) -> Self {
        match error {
            team::Error::Empty => Self::NoTeams,
        }
    }
}

/// Discrete operator events consumed by the session
///
/// These are the only inputs the state machine accepts; raw UI events
/// are translated into them by the presentation layer.
#[derive(Debug, Clone, Deserialize)]
pub enum Event {
    /// Register teams and start the quiz at the first question
    Start {
        /// Operator-entered team names; blanks and duplicates are filtered
        team_names: Vec<String>,
    },
    /// Record or overwrite the pending option selection
    SelectOption(Choice),
    /// Record or overwrite the pending team selection
    SelectTeam(team::Id),
    /// Score the pending answer and lock the current question
    Submit,
    /// Move to the next question, or finish after the last one
    Advance,
    /// Return to the not-started state, keeping the loaded questions
    Reset,
}

/// Presentation data for the question currently on screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    /// The question text
    pub text: String,
    /// The four options in display order
    pub options: Vec<String>,
    /// Points at stake for a correct answer
    pub points: u64,
}

impl QuestionView {
    fn of(record: &QuestionRecord) -> Self {
        Self {
            text: record.text().to_owned(),
            options: record.options().values().cloned().collect_vec(),
            points: record.points(),
        }
    }
}

/// Summary of the pending selections for the current question
#[skip_serializing_none]
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionSummary {
    /// The currently selected option, if any
    pub choice: Option<Choice>,
    /// The display name of the currently selected team, if any
    pub team: Option<String>,
}

/// The scored outcome of a submitted answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    /// The team that answered
    pub team: team::Id,
    /// That team's display name
    pub team_name: String,
    /// The option the team selected
    pub choice: Choice,
    /// Whether the selected option was the correct one
    pub correct: bool,
    /// The option that was correct
    pub correct_option: Choice,
    /// Points added to the team's score (zero on a wrong answer)
    pub points_awarded: u64,
}

/// Per-option correctness flags for highlighting a locked question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OptionOutcome {
    /// The option this row describes
    pub choice: Choice,
    /// Whether this option was the correct answer
    pub correct: bool,
    /// Whether this option was the one submitted
    pub chosen: bool,
}

/// Incremental view updates emitted by successful events
///
/// Each successful [`Game::apply`] call returns the updates the
/// presentation layer needs to refresh the parts of its view that
/// changed.
#[derive(Debug, Clone, Serialize)]
pub enum UpdateMessage {
    /// A new question is on screen
    QuestionAnnouncement {
        /// 0-based index of the question
        index: usize,
        /// Total number of questions
        count: usize,
        /// The question's presentation data
        question: QuestionView,
    },
    /// The pending selections changed
    SelectionUpdate {
        /// The refreshed selection summary
        selection: SelectionSummary,
    },
    /// An answer was scored and the question is now locked
    AnswerOutcome {
        /// The scored result
        result: AnswerResult,
        /// Per-option flags for highlighting
        options: Vec<OptionOutcome>,
    },
    /// The standings table changed
    Standings {
        /// Ranked rows, best first
        rows: Vec<StandingsRow>,
    },
    /// The quiz passed its last question
    QuizFinished {
        /// The final ranked standings
        standings: Vec<StandingsRow>,
    },
    /// The session returned to its not-started state
    QuizReset,
}

impl UpdateMessage {
    /// Converts the update message to a JSON string for the presentation layer
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Complete view snapshots for synchronizing the presentation layer
///
/// Unlike [`UpdateMessage`], a sync message carries everything needed
/// to rebuild the view from scratch, e.g. after a tab switch.
#[derive(Debug, Clone, Serialize)]
pub enum SyncMessage {
    /// No quiz is running yet
    NotStarted {
        /// Number of questions loaded and ready
        question_count: usize,
    },
    /// A question is on screen and can still be answered
    AwaitingAnswer {
        /// 0-based index of the current question
        index: usize,
        /// Total number of questions
        count: usize,
        /// The question's presentation data
        question: QuestionView,
        /// The pending selections
        selection: SelectionSummary,
        /// Current ranked standings
        standings: Vec<StandingsRow>,
    },
    /// The current question's answer has been submitted and scored
    AnswerLocked {
        /// 0-based index of the current question
        index: usize,
        /// Total number of questions
        count: usize,
        /// The question's presentation data
        question: QuestionView,
        /// The scored result
        result: AnswerResult,
        /// Per-option flags for highlighting
        options: Vec<OptionOutcome>,
        /// Current ranked standings
        standings: Vec<StandingsRow>,
    },
    /// The quiz is over
    Finished {
        /// The final ranked standings
        standings: Vec<StandingsRow>,
    },
}

impl SyncMessage {
    /// Converts the sync message to a JSON string for the presentation layer
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// The joint option-and-team selection for the current question
///
/// The two halves are only meaningful together: an answer is
/// submittable exactly when [`PendingAnswer::complete`] returns `Some`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PendingAnswer {
    /// The selected option, if any
    choice: Option<Choice>,
    /// The selected team, if any
    team: Option<team::Id>,
}

impl PendingAnswer {
    /// Returns the selected option, if any
    pub fn choice(&self) -> Option<Choice> {
        self.choice
    }

    /// Returns the selected team, if any
    pub fn team(&self) -> Option<team::Id> {
        self.team
    }

    /// Returns both halves when the pending answer is well-formed
    pub fn complete(&self) -> Option<(Choice, team::Id)> {
        Some((self.choice?, self.team?))
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Runtime state of the question currently on screen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentQuestion {
    /// Position in the shuffled question sequence
    index: usize,
    /// Selections accumulated towards the next submission
    pending: PendingAnswer,
    /// The scored result once the answer has been submitted
    outcome: Option<AnswerResult>,
}

impl CurrentQuestion {
    fn at(index: usize) -> Self {
        Self {
            index,
            pending: PendingAnswer::default(),
            outcome: None,
        }
    }

    /// Returns the 0-based position of this question
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the pending selections
    pub fn pending(&self) -> &PendingAnswer {
        &self.pending
    }

    /// Returns the scored result once the answer is locked
    pub fn outcome(&self) -> Option<&AnswerResult> {
        self.outcome.as_ref()
    }

    /// Checks whether the answer for this question has been submitted
    pub fn is_locked(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Represents the current phase of the quiz session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum State {
    /// Waiting for the operator to register teams and start
    NotStarted,
    /// A question is on screen
    InProgress(CurrentQuestion),
    /// The last question has been passed
    Finished,
}

/// A complete quiz session
///
/// The session owns the shuffled question bank, the team roster, the
/// tallies, and the current phase. It is driven exclusively through
/// [`Game::apply`]; there are no ambient globals.
#[derive(Debug, Serialize, Deserialize)]
pub struct Game {
    /// The shuffled question sequence, fixed for the session
    bank: QuestionBank,
    /// Registered teams in entry order (empty before the first start)
    roster: Roster,
    /// Per-team score bookkeeping
    leaderboard: Leaderboard,
    /// Current phase of the session
    state: State,
}

impl Game {
    /// Creates a session around a loaded question bank
    ///
    /// The bank may be empty; starting the quiz is where an empty bank
    /// becomes a rejected action.
    pub fn new(bank: QuestionBank) -> Self {
        Self {
            bank,
            roster: Roster::default(),
            leaderboard: Leaderboard::default(),
            state: State::NotStarted,
        }
    }

    /// Returns the question bank backing this session
    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    /// Returns the registered teams
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Returns the current phase of the session
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Returns the current tally for a team
    pub fn tally(&self, team: team::Id) -> Option<Tally> {
        self.leaderboard.tally(team)
    }

    /// Derives the current ranked standings
    pub fn standings(&self) -> Vec<StandingsRow> {
        self.leaderboard.standings(&self.roster)
    }

    /// Returns the question currently on screen, if any
    pub fn current_question(&self) -> Option<(usize, &QuestionRecord)> {
        match &self.state {
            State::InProgress(current) => Some((current.index, self.record(current.index))),
            State::NotStarted | State::Finished => None,
        }
    }

    /// Returns the pending selection summary for display
    pub fn selection(&self) -> SelectionSummary {
        match &self.state {
            State::InProgress(current) => SelectionSummary {
                choice: current.pending.choice,
                team: current
                    .pending
                    .team
                    .and_then(|id| self.roster.get(id))
                    .map(|team| team.name().to_owned()),
            },
            State::NotStarted | State::Finished => SelectionSummary::default(),
        }
    }

    /// Applies one operator event to the session
    ///
    /// On success the session has transitioned and the returned updates
    /// describe what the presentation layer should refresh. On failure
    /// the session is unchanged.
    ///
    /// # Arguments
    ///
    /// * `event` - The operator event to process
    /// * `narrator` - Sink for fire-and-forget announcement lines
    ///
    /// # Errors
    ///
    /// Returns the [`Error`] describing why the event was rejected.
    pub fn apply<N: Narrator>(
        &mut self,
        event: Event,
        narrator: &N,
    ) -> Result<Vec<UpdateMessage>, Error> {
        let result = match event {
            Event::Start { team_names } => self.start(&team_names),
            Event::SelectOption(choice) => self.select_option(choice),
            Event::SelectTeam(team) => self.select_team(team),
            Event::Submit => self.submit(narrator),
            Event::Advance => self.advance(narrator),
            Event::Reset => Ok(self.reset()),
        };
        if let Err(error) = &result {
            log::debug!("rejected action: {error}");
        }
        result
    }

    /// Returns the message necessary to synchronize the presentation layer
    ///
    /// The snapshot carries the full current view: question, selection
    /// summary, locked option outcomes, and standings, depending on the
    /// phase.
    pub fn state_message(&self) -> SyncMessage {
        match &self.state {
            State::NotStarted => SyncMessage::NotStarted {
                question_count: self.bank.len(),
            },
            State::InProgress(current) => {
                let record = self.record(current.index);
                let question = QuestionView::of(record);
                let standings = self.standings();
                match &current.outcome {
                    None => SyncMessage::AwaitingAnswer {
                        index: current.index,
                        count: self.bank.len(),
                        question,
                        selection: self.selection(),
                        standings,
                    },
                    Some(result) => SyncMessage::AnswerLocked {
                        index: current.index,
                        count: self.bank.len(),
                        question,
                        result: result.clone(),
                        options: option_outcomes(record, result),
                        standings,
                    },
                }
            }
            State::Finished => SyncMessage::Finished {
                standings: self.leaderboard.final_standings(&self.roster).to_vec(),
            },
        }
    }

    /// Reads the current question and its options aloud
    ///
    /// Composes a single narration line from the question text and the
    /// four options and hands it to the narrator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotStarted`] or [`Error::Finished`] when there
    /// is no question on screen.
    pub fn narrate_question<N: Narrator>(&self, narrator: &N) -> Result<(), Error> {
        match &self.state {
            State::NotStarted => Err(Error::NotStarted),
            State::Finished => Err(Error::Finished),
            State::InProgress(current) => {
                let record = self.record(current.index);
                let options = record
                    .options()
                    .iter()
                    .map(|(choice, text)| format!("Option {choice}: {text}"))
                    .join(". ");
                narrator.announce(&format!(
                    "Question {} of {}: {} {}.",
                    current.index + 1,
                    self.bank.len(),
                    record.text(),
                    options
                ));
                Ok(())
            }
        }
    }

    fn start(&mut self, team_names: &[String]) -> Result<Vec<UpdateMessage>, Error> {
        if !matches!(self.state, State::NotStarted) {
            return Err(Error::AlreadyStarted);
        }
        if self.bank.is_empty() {
            return Err(Error::EmptyBank);
        }
        let roster = Roster::from_names(team_names)?;
        self.leaderboard = Leaderboard::for_roster(&roster);
        self.roster = roster;
        self.state = State::InProgress(CurrentQuestion::at(0));
        log::debug!(
            "quiz started: {} teams, {} questions",
            self.roster.len(),
            self.bank.len()
        );
        Ok(vec![
            self.question_announcement(0),
            UpdateMessage::Standings {
                rows: self.standings(),
            },
        ])
    }

    fn select_option(&mut self, choice: Choice) -> Result<Vec<UpdateMessage>, Error> {
        self.ensure_unlocked()?;
        if let State::InProgress(current) = &mut self.state {
            current.pending.choice = Some(choice);
        }
        Ok(vec![UpdateMessage::SelectionUpdate {
            selection: self.selection(),
        }])
    }

    fn select_team(&mut self, team: team::Id) -> Result<Vec<UpdateMessage>, Error> {
        self.ensure_unlocked()?;
        if !self.roster.contains(team) {
            return Err(Error::UnknownTeam);
        }
        if let State::InProgress(current) = &mut self.state {
            current.pending.team = Some(team);
        }
        Ok(vec![UpdateMessage::SelectionUpdate {
            selection: self.selection(),
        }])
    }

    fn submit<N: Narrator>(&mut self, narrator: &N) -> Result<Vec<UpdateMessage>, Error> {
        self.ensure_unlocked()?;
        let State::InProgress(current) = &self.state else {
            return Err(Error::NotStarted);
        };
        let (choice, team) = current.pending.complete().ok_or(Error::IncompleteAnswer)?;
        let index = current.index;
        let team_name = self
            .roster
            .get(team)
            .ok_or(Error::UnknownTeam)?
            .name()
            .to_owned();

        let record = self.record(index);
        let correct = choice == record.correct();
        let result = AnswerResult {
            team,
            team_name,
            choice,
            correct,
            correct_option: record.correct(),
            points_awarded: if correct { record.points() } else { 0 },
        };
        let line = outcome_line(&result, record.option(record.correct()));
        let options = option_outcomes(record, &result);
        let points = record.points();

        self.leaderboard.record_answer(team, correct, points);
        if let State::InProgress(current) = &mut self.state {
            current.pending.clear();
            current.outcome = Some(result.clone());
        }
        narrator.announce(&line);
        Ok(vec![
            UpdateMessage::AnswerOutcome { result, options },
            UpdateMessage::Standings {
                rows: self.standings(),
            },
        ])
    }

    fn advance<N: Narrator>(&mut self, narrator: &N) -> Result<Vec<UpdateMessage>, Error> {
        let index = match &self.state {
            State::NotStarted => return Err(Error::NotStarted),
            State::Finished => return Err(Error::Finished),
            State::InProgress(current) => current.index,
        };
        if index + 1 == self.bank.len() {
            self.state = State::Finished;
            let standings = self.leaderboard.final_standings(&self.roster).to_vec();
            log::debug!("quiz finished after {} questions", self.bank.len());
            narrator.announce(&finished_line(&standings));
            Ok(vec![UpdateMessage::QuizFinished { standings }])
        } else {
            let next = index + 1;
            self.state = State::InProgress(CurrentQuestion::at(next));
            Ok(vec![self.question_announcement(next)])
        }
    }

    fn reset(&mut self) -> Vec<UpdateMessage> {
        self.state = State::NotStarted;
        self.roster = Roster::default();
        self.leaderboard = Leaderboard::default();
        vec![UpdateMessage::QuizReset]
    }

    fn ensure_unlocked(&self) -> Result<(), Error> {
        match &self.state {
            State::NotStarted => Err(Error::NotStarted),
            State::Finished => Err(Error::Finished),
            State::InProgress(current) if current.is_locked() => Err(Error::AlreadyAnswered),
            State::InProgress(_) => Ok(()),
        }
    }

    fn question_announcement(&self, index: usize) -> UpdateMessage {
        UpdateMessage::QuestionAnnouncement {
            index,
            count: self.bank.len(),
            question: QuestionView::of(self.record(index)),
        }
    }

    fn record(&self, index: usize) -> &QuestionRecord {
        self.bank
            .get(index)
            .expect("current index stays within the bank while in progress")
    }
}

fn option_outcomes(record: &QuestionRecord, result: &AnswerResult) -> Vec<OptionOutcome> {
    Choice::ALL
        .iter()
        .map(|&choice| OptionOutcome {
            choice,
            correct: choice == record.correct(),
            chosen: choice == result.choice,
        })
        .collect_vec()
}

fn outcome_line(result: &AnswerResult, correct_text: &str) -> String {
    if result.correct {
        format!("{} is correct!", result.team_name)
    } else {
        format!(
            "{} is wrong. Correct answer: {}.",
            result.team_name, correct_text
        )
    }
}

fn finished_line(standings: &[StandingsRow]) -> String {
    standings.first().map_or_else(
        || "The quiz is over!".to_owned(),
        |leader| {
            format!(
                "The quiz is over! {} takes first place with {} points.",
                leader.name, leader.score
            )
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default, Clone)]
    struct RecordingNarrator {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingNarrator {
        fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl Narrator for RecordingNarrator {
        fn announce(&self, line: &str) {
            self.lines.lock().unwrap().push(line.to_owned());
        }
    }

    /// Builds a bank where every record has correct option B and the
    /// given points, so tests stay independent of the shuffle order.
    fn sample_bank(rows: usize, points: u64) -> QuestionBank {
        let mut source =
            String::from("question,option1,option2,option3,option4,correctIndex,points\n");
        for n in 0..rows {
            source.push_str(&format!(
                "Question {n}?,alpha,bravo,charlie,delta,2,{points}\n"
            ));
        }
        QuestionBank::parse(&source)
    }

    fn started_game(rows: usize) -> (Game, RecordingNarrator) {
        let mut game = Game::new(sample_bank(rows, 10));
        let narrator = RecordingNarrator::default();
        game.apply(
            Event::Start {
                team_names: vec!["Red".to_owned(), "Blue".to_owned()],
            },
            &narrator,
        )
        .unwrap();
        (game, narrator)
    }

    fn team_id(game: &Game, name: &str) -> team::Id {
        game.roster()
            .teams()
            .iter()
            .find(|team| team.name() == name)
            .unwrap()
            .id()
    }

    #[test]
    fn test_start_presents_first_question_and_zeroed_standings() {
        let (game, _) = started_game(2);
        let (index, _) = game.current_question().unwrap();
        assert_eq!(index, 0);
        let standings = game.standings();
        assert_eq!(standings.len(), 2);
        assert!(standings.iter().all(|row| row.score == 0));
    }

    #[test]
    fn test_start_requires_questions() {
        let mut game = Game::new(QuestionBank::parse(
            "question,option1,option2,option3,option4,correctIndex,points\n",
        ));
        let narrator = RecordingNarrator::default();
        let result = game.apply(
            Event::Start {
                team_names: vec!["Red".to_owned()],
            },
            &narrator,
        );
        assert_eq!(result.unwrap_err(), Error::EmptyBank);
        assert!(matches!(game.state(), State::NotStarted));
    }

    #[test]
    fn test_start_requires_teams() {
        let mut game = Game::new(sample_bank(1, 10));
        let narrator = RecordingNarrator::default();
        let result = game.apply(
            Event::Start {
                team_names: vec![String::new(), "   ".to_owned()],
            },
            &narrator,
        );
        assert_eq!(result.unwrap_err(), Error::NoTeams);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let (mut game, narrator) = started_game(1);
        let result = game.apply(
            Event::Start {
                team_names: vec!["Green".to_owned()],
            },
            &narrator,
        );
        assert_eq!(result.unwrap_err(), Error::AlreadyStarted);
    }

    #[test]
    fn test_correct_answer_scores_and_locks() {
        let (mut game, narrator) = started_game(2);
        let red = team_id(&game, "Red");
        let correct = game.current_question().unwrap().1.correct();

        game.apply(Event::SelectOption(correct), &narrator).unwrap();
        game.apply(Event::SelectTeam(red), &narrator).unwrap();
        let updates = game.apply(Event::Submit, &narrator).unwrap();

        let tally = game.tally(red).unwrap();
        assert_eq!(tally.score, 10);
        assert_eq!(tally.answered, 1);
        assert_eq!(tally.correct, 1);
        assert!(matches!(
            updates.first(),
            Some(UpdateMessage::AnswerOutcome { result, .. }) if result.correct
        ));
        assert_eq!(narrator.lines(), ["Red is correct!"]);
    }

    #[test]
    fn test_wrong_answer_reveals_correct_option() {
        let (mut game, narrator) = started_game(1);
        let blue = team_id(&game, "Blue");
        let correct = game.current_question().unwrap().1.correct();
        let wrong = Choice::ALL
            .into_iter()
            .find(|choice| *choice != correct)
            .unwrap();

        game.apply(Event::SelectOption(wrong), &narrator).unwrap();
        game.apply(Event::SelectTeam(blue), &narrator).unwrap();
        let updates = game.apply(Event::Submit, &narrator).unwrap();

        let tally = game.tally(blue).unwrap();
        assert_eq!(tally.score, 0);
        assert_eq!(tally.answered, 1);
        assert_eq!(tally.correct, 0);
        assert!(matches!(
            updates.first(),
            Some(UpdateMessage::AnswerOutcome { result, .. })
                if !result.correct && result.correct_option == correct
        ));
        assert_eq!(narrator.lines(), ["Blue is wrong. Correct answer: bravo."]);
    }

    #[test]
    fn test_submit_without_team_is_rejected() {
        let (mut game, narrator) = started_game(1);
        let correct = game.current_question().unwrap().1.correct();
        game.apply(Event::SelectOption(correct), &narrator).unwrap();

        let result = game.apply(Event::Submit, &narrator);
        assert_eq!(result.unwrap_err(), Error::IncompleteAnswer);
        for team in game.roster().teams() {
            assert_eq!(game.tally(team.id()).unwrap().answered, 0);
        }
    }

    #[test]
    fn test_submit_without_option_is_rejected() {
        let (mut game, narrator) = started_game(1);
        let red = team_id(&game, "Red");
        game.apply(Event::SelectTeam(red), &narrator).unwrap();
        assert_eq!(
            game.apply(Event::Submit, &narrator).unwrap_err(),
            Error::IncompleteAnswer
        );
    }

    #[test]
    fn test_double_submit_changes_tallies_only_once() {
        let (mut game, narrator) = started_game(1);
        let red = team_id(&game, "Red");
        let correct = game.current_question().unwrap().1.correct();
        game.apply(Event::SelectOption(correct), &narrator).unwrap();
        game.apply(Event::SelectTeam(red), &narrator).unwrap();
        game.apply(Event::Submit, &narrator).unwrap();

        assert_eq!(
            game.apply(Event::Submit, &narrator).unwrap_err(),
            Error::AlreadyAnswered
        );
        let tally = game.tally(red).unwrap();
        assert_eq!(tally.answered, 1);
        assert_eq!(tally.score, 10);
    }

    #[test]
    fn test_selection_is_rejected_after_lock() {
        let (mut game, narrator) = started_game(1);
        let red = team_id(&game, "Red");
        let correct = game.current_question().unwrap().1.correct();
        game.apply(Event::SelectOption(correct), &narrator).unwrap();
        game.apply(Event::SelectTeam(red), &narrator).unwrap();
        game.apply(Event::Submit, &narrator).unwrap();

        assert_eq!(
            game.apply(Event::SelectOption(Choice::A), &narrator)
                .unwrap_err(),
            Error::AlreadyAnswered
        );
    }

    #[test]
    fn test_unknown_team_is_rejected() {
        let (mut game, narrator) = started_game(1);
        assert_eq!(
            game.apply(Event::SelectTeam(team::Id::new()), &narrator)
                .unwrap_err(),
            Error::UnknownTeam
        );
    }

    #[test]
    fn test_selection_before_start_is_rejected() {
        let mut game = Game::new(sample_bank(1, 10));
        let narrator = RecordingNarrator::default();
        assert_eq!(
            game.apply(Event::SelectOption(Choice::A), &narrator)
                .unwrap_err(),
            Error::NotStarted
        );
    }

    #[test]
    fn test_full_run_through_two_questions() {
        let (mut game, narrator) = started_game(2);
        let red = team_id(&game, "Red");
        let correct = game.current_question().unwrap().1.correct();

        game.apply(Event::SelectOption(correct), &narrator).unwrap();
        game.apply(Event::SelectTeam(red), &narrator).unwrap();
        game.apply(Event::Submit, &narrator).unwrap();
        let tally = game.tally(red).unwrap();
        assert_eq!((tally.score, tally.answered, tally.correct), (10, 1, 1));

        game.apply(Event::Advance, &narrator).unwrap();
        assert_eq!(game.current_question().unwrap().0, 1);

        let updates = game.apply(Event::Advance, &narrator).unwrap();
        assert!(matches!(game.state(), State::Finished));
        assert!(matches!(
            updates.first(),
            Some(UpdateMessage::QuizFinished { .. })
        ));
        assert!(
            narrator
                .lines()
                .last()
                .unwrap()
                .contains("takes first place")
        );
    }

    #[test]
    fn test_progress_is_monotonic() {
        let (mut game, narrator) = started_game(4);
        let mut last = game.current_question().unwrap().0;
        while !matches!(game.state(), State::Finished) {
            game.apply(Event::Advance, &narrator).unwrap();
            if let Some((index, _)) = game.current_question() {
                assert!(index > last);
                assert!(index < game.bank().len());
                last = index;
            }
        }
        assert_eq!(
            game.apply(Event::Advance, &narrator).unwrap_err(),
            Error::Finished
        );
    }

    #[test]
    fn test_advance_clears_selections() {
        let (mut game, narrator) = started_game(2);
        let red = team_id(&game, "Red");
        game.apply(Event::SelectOption(Choice::A), &narrator)
            .unwrap();
        game.apply(Event::SelectTeam(red), &narrator).unwrap();
        game.apply(Event::Advance, &narrator).unwrap();

        assert_eq!(game.selection(), SelectionSummary::default());
    }

    #[test]
    fn test_tied_teams_keep_entry_order_in_standings() {
        let (mut game, narrator) = started_game(2);
        let red = team_id(&game, "Red");
        let blue = team_id(&game, "Blue");
        let correct = game.current_question().unwrap().1.correct();

        game.apply(Event::SelectOption(correct), &narrator).unwrap();
        game.apply(Event::SelectTeam(red), &narrator).unwrap();
        game.apply(Event::Submit, &narrator).unwrap();
        game.apply(Event::Advance, &narrator).unwrap();

        let correct = game.current_question().unwrap().1.correct();
        game.apply(Event::SelectOption(correct), &narrator).unwrap();
        game.apply(Event::SelectTeam(blue), &narrator).unwrap();
        game.apply(Event::Submit, &narrator).unwrap();

        let standings = game.standings();
        assert_eq!(standings[0].score, standings[1].score);
        assert_eq!(standings[0].name, "Red");
        assert_eq!(standings[1].name, "Blue");
    }

    #[test]
    fn test_reset_returns_to_not_started() {
        let (mut game, narrator) = started_game(2);
        let red = team_id(&game, "Red");
        let correct = game.current_question().unwrap().1.correct();
        game.apply(Event::SelectOption(correct), &narrator).unwrap();
        game.apply(Event::SelectTeam(red), &narrator).unwrap();
        game.apply(Event::Submit, &narrator).unwrap();

        game.apply(Event::Reset, &narrator).unwrap();
        assert!(matches!(game.state(), State::NotStarted));
        assert!(game.roster().is_empty());
        assert_eq!(game.bank().len(), 2);

        // Teams are re-entered, not restored.
        game.apply(
            Event::Start {
                team_names: vec!["Green".to_owned()],
            },
            &narrator,
        )
        .unwrap();
        let green = team_id(&game, "Green");
        assert_eq!(game.tally(green).unwrap(), Tally::default());
    }

    #[test]
    fn test_selection_update_reports_team_name() {
        let (mut game, narrator) = started_game(1);
        let blue = team_id(&game, "Blue");
        let updates = game.apply(Event::SelectTeam(blue), &narrator).unwrap();
        assert!(matches!(
            updates.first(),
            Some(UpdateMessage::SelectionUpdate { selection })
                if selection.team.as_deref() == Some("Blue") && selection.choice.is_none()
        ));
    }

    #[test]
    fn test_reselecting_overwrites() {
        let (mut game, narrator) = started_game(1);
        game.apply(Event::SelectOption(Choice::A), &narrator)
            .unwrap();
        game.apply(Event::SelectOption(Choice::C), &narrator)
            .unwrap();
        assert_eq!(game.selection().choice, Some(Choice::C));
    }

    #[test]
    fn test_state_message_tracks_phases() {
        let (mut game, narrator) = started_game(1);
        assert!(matches!(
            game.state_message(),
            SyncMessage::AwaitingAnswer { index: 0, count: 1, .. }
        ));

        let red = team_id(&game, "Red");
        let correct = game.current_question().unwrap().1.correct();
        game.apply(Event::SelectOption(correct), &narrator).unwrap();
        game.apply(Event::SelectTeam(red), &narrator).unwrap();
        game.apply(Event::Submit, &narrator).unwrap();
        assert!(matches!(
            game.state_message(),
            SyncMessage::AnswerLocked { .. }
        ));

        game.apply(Event::Advance, &narrator).unwrap();
        assert!(matches!(game.state_message(), SyncMessage::Finished { .. }));

        game.apply(Event::Reset, &narrator).unwrap();
        assert!(matches!(
            game.state_message(),
            SyncMessage::NotStarted { question_count: 1 }
        ));
    }

    #[test]
    fn test_locked_outcome_marks_options_for_highlighting() {
        let (mut game, narrator) = started_game(1);
        let red = team_id(&game, "Red");
        let correct = game.current_question().unwrap().1.correct();
        let wrong = Choice::ALL
            .into_iter()
            .find(|choice| *choice != correct)
            .unwrap();
        game.apply(Event::SelectOption(wrong), &narrator).unwrap();
        game.apply(Event::SelectTeam(red), &narrator).unwrap();
        game.apply(Event::Submit, &narrator).unwrap();

        let SyncMessage::AnswerLocked { options, .. } = game.state_message() else {
            panic!("expected a locked snapshot");
        };
        assert_eq!(options.len(), 4);
        for outcome in options {
            assert_eq!(outcome.correct, outcome.choice == correct);
            assert_eq!(outcome.chosen, outcome.choice == wrong);
        }
    }

    #[test]
    fn test_narrate_question_reads_text_and_options() {
        let (game, narrator) = started_game(1);
        game.narrate_question(&narrator).unwrap();
        let line = narrator.lines().pop().unwrap();
        assert!(line.starts_with("Question 1 of 1:"));
        assert!(line.contains("Option A: alpha"));
        assert!(line.contains("Option D: delta"));
    }

    #[test]
    fn test_update_messages_serialize_to_json() {
        let (game, _) = started_game(1);
        let json = game.state_message().to_message();
        assert!(json.contains("AwaitingAnswer"));
        assert!(json.contains("standings"));

        let reset = UpdateMessage::QuizReset.to_message();
        assert!(reset.contains("QuizReset"));
    }
}
