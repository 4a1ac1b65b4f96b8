use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info, warn};
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::model::{Level, NUMBER_OF_LEVELS, Question, QuestionId, Quiz, UserProgress};

/// Relative draw weight of each level; weaker material comes up more often.
pub const LEVEL_WEIGHTS: [f64; NUMBER_OF_LEVELS] = [0.5, 0.3, 0.1, 0.07, 0.03];

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SchedulerError {
    /// Every question sits at the terminal level. Not a failure: the session is over.
    #[error("study complete: every question is on the top level")]
    StudyComplete,
    #[error("question {0:?} is not tracked by this scheduler")]
    UnknownQuestion(QuestionHandle),
    #[error("no question has been drawn yet")]
    NoCurrentQuestion,
    #[error("level sampling failed: {0}")]
    Sampling(String),
}

//
// ─── HANDLES & RESULTS ─────────────────────────────────────────────────────────
//

static NEXT_SCHEDULER_ID: AtomicU64 = AtomicU64::new(1);

/// Stable reference to a question owned by a `ReviewScheduler`.
///
/// A handle only resolves in the scheduler that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuestionHandle {
    scheduler: u64,
    position: usize,
}

impl QuestionHandle {
    /// Position of the question in the quiz it came from.
    #[must_use]
    pub fn position(self) -> usize {
        self.position
    }
}

/// Outcome of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Draw {
    Question(QuestionHandle),
    /// Nothing left below the terminal level.
    Exhausted,
}

/// What `record_outcome` did to a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeReport {
    pub handle: QuestionHandle,
    pub question_id: Option<QuestionId>,
    pub previous_level: Level,
    pub progress: UserProgress,
    pub promoted: bool,
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// Leveled review scheduler.
///
/// Questions are kept in one bucket per mastery level. `next_question`
/// picks a bucket by weighted draw (empty buckets excluded) and then a
/// question uniformly from it; `record_outcome` is the only place where a
/// question changes bucket, so membership always matches
/// `user_progress.level`.
///
/// The random source is injectable so sessions can be replayed:
///
/// ```
/// # use quiz_core::{parser::parse, scheduler::ReviewScheduler};
/// # use rand::{SeedableRng, rngs::StdRng};
/// let quiz = parse("## Q\n#### One\n- [x] a\n#### Two\n- [x] b\n")?;
/// let mut scheduler = ReviewScheduler::with_rng(quiz, StdRng::seed_from_u64(7));
///
/// let handle = scheduler.next_question()?;
/// let report = scheduler.record_outcome(handle, true)?;
/// assert_eq!(report.progress.correct_streak, 1);
/// assert_eq!(scheduler.levels_histogram(), [2, 0, 0, 0, 0]);
/// # Ok::<(), quiz_core::Error>(())
/// ```
pub struct ReviewScheduler<R = StdRng> {
    id: u64,
    quiz: Quiz,
    questions: Vec<Question>,
    buckets: [Vec<QuestionHandle>; NUMBER_OF_LEVELS],
    rng: R,
    current: Option<QuestionHandle>,
}

impl ReviewScheduler<StdRng> {
    /// Build a scheduler seeded from OS entropy.
    #[must_use]
    pub fn from_quiz(quiz: Quiz) -> Self {
        Self::with_rng(quiz, StdRng::from_os_rng())
    }
}

impl<R: Rng> ReviewScheduler<R> {
    /// Build a scheduler with an explicit random source.
    ///
    /// Questions without progress get a fresh `UserProgress` at level 0.
    pub fn with_rng(mut quiz: Quiz, rng: R) -> Self {
        let id = NEXT_SCHEDULER_ID.fetch_add(1, Ordering::Relaxed);
        let mut questions = quiz.take_questions();
        let mut buckets: [Vec<QuestionHandle>; NUMBER_OF_LEVELS] = Default::default();

        for (position, question) in questions.iter_mut().enumerate() {
            let level = question.ensure_progress().level;
            buckets[level.index()].push(QuestionHandle {
                scheduler: id,
                position,
            });
        }

        debug!(
            "scheduler for {:?} built with buckets {:?}",
            quiz.name(),
            buckets.each_ref().map(Vec::len)
        );

        Self {
            id,
            quiz,
            questions,
            buckets,
            rng,
            current: None,
        }
    }

    /// Draw the next question, or report that nothing is left to study.
    ///
    /// Each call is an independent draw; the question stays in its bucket.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Sampling` if the level weights cannot be sampled.
    pub fn draw(&mut self) -> Result<Draw, SchedulerError> {
        if !self.has_remaining_work() {
            return Ok(Draw::Exhausted);
        }

        let weights = LEVEL_WEIGHTS
            .iter()
            .zip(&self.buckets)
            .map(|(weight, bucket)| if bucket.is_empty() { 0.0 } else { *weight });
        let levels =
            WeightedIndex::new(weights).map_err(|e| SchedulerError::Sampling(e.to_string()))?;

        loop {
            let level = levels.sample(&mut self.rng);
            if let Some(&handle) = self.buckets[level].choose(&mut self.rng) {
                self.current = Some(handle);
                return Ok(Draw::Question(handle));
            }
            warn!("drew empty level {level}, drawing again");
        }
    }

    /// `draw` with exhaustion reported as `SchedulerError::StudyComplete`.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::StudyComplete` when every question is at the
    /// terminal level.
    pub fn next_question(&mut self) -> Result<QuestionHandle, SchedulerError> {
        match self.draw()? {
            Draw::Question(handle) => Ok(handle),
            Draw::Exhausted => Err(SchedulerError::StudyComplete),
        }
    }

    /// Apply an answer outcome to a question and move it between buckets if promoted.
    ///
    /// Correct answers grow the streak until the level's threshold, then
    /// promote and reset the streak. Incorrect answers only reset the streak;
    /// questions are never demoted.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::UnknownQuestion` if the handle does not belong
    /// to a question tracked in the bucket of its level.
    pub fn record_outcome(
        &mut self,
        handle: QuestionHandle,
        is_correct: bool,
    ) -> Result<OutcomeReport, SchedulerError> {
        let previous_level = self
            .question(handle)
            .and_then(Question::user_progress)
            .map(|p| p.level)
            .ok_or(SchedulerError::UnknownQuestion(handle))?;

        let bucket = &mut self.buckets[previous_level.index()];
        let slot = bucket
            .iter()
            .position(|h| *h == handle)
            .ok_or(SchedulerError::UnknownQuestion(handle))?;

        let question = self
            .questions
            .get_mut(handle.position)
            .ok_or(SchedulerError::UnknownQuestion(handle))?;
        let question_id = question.id();
        let progress = question.ensure_progress();

        let promoted = if is_correct {
            progress.register_correct()
        } else {
            progress.register_incorrect();
            false
        };
        let progress = progress.clone();

        if promoted {
            bucket.swap_remove(slot);
            self.buckets[progress.level.index()].push(handle);
            info!(
                "question {} promoted from level {previous_level} to {}",
                handle.position, progress.level
            );
        }

        Ok(OutcomeReport {
            handle,
            question_id,
            previous_level,
            progress,
            promoted,
        })
    }

    /// `record_outcome` for the most recently drawn question.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::NoCurrentQuestion` before the first draw.
    pub fn record_current(&mut self, is_correct: bool) -> Result<OutcomeReport, SchedulerError> {
        let handle = self.current.ok_or(SchedulerError::NoCurrentQuestion)?;
        self.record_outcome(handle, is_correct)
    }
}

impl<R> ReviewScheduler<R> {
    /// Number of questions per level, in level order.
    #[must_use]
    pub fn levels_histogram(&self) -> [usize; NUMBER_OF_LEVELS] {
        self.buckets.each_ref().map(Vec::len)
    }

    /// True while any level below the terminal one still holds questions.
    #[must_use]
    pub fn has_remaining_work(&self) -> bool {
        self.buckets[..Level::TERMINAL.index()]
            .iter()
            .any(|bucket| !bucket.is_empty())
    }

    #[must_use]
    pub fn question(&self, handle: QuestionHandle) -> Option<&Question> {
        if handle.scheduler != self.id {
            return None;
        }
        self.questions.get(handle.position)
    }

    /// Most recently drawn question, if any.
    #[must_use]
    pub fn current(&self) -> Option<QuestionHandle> {
        self.current
    }

    /// Handle of the stored question with the given id.
    #[must_use]
    pub fn handle_for(&self, id: QuestionId) -> Option<QuestionHandle> {
        self.questions
            .iter()
            .position(|q| q.id() == Some(id))
            .map(|position| self.handle(position))
    }

    pub fn questions(&self) -> impl Iterator<Item = (QuestionHandle, &Question)> {
        self.questions
            .iter()
            .enumerate()
            .map(|(position, q)| (self.handle(position), q))
    }

    fn handle(&self, position: usize) -> QuestionHandle {
        QuestionHandle {
            scheduler: self.id,
            position,
        }
    }

    #[must_use]
    pub fn quiz_name(&self) -> &str {
        self.quiz.name()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Give the quiz back, carrying the progress accumulated in this session.
    #[must_use]
    pub fn into_quiz(self) -> Quiz {
        let mut quiz = self.quiz;
        quiz.set_questions(self.questions);
        quiz
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Answer;

    fn question(text: &str, progress: Option<UserProgress>) -> Question {
        Question::new(text, vec![Answer::new("yes", true), Answer::new("no", false)])
            .unwrap()
            .with_progress(progress)
    }

    fn level(value: u32) -> Level {
        Level::new(value).unwrap()
    }

    fn quiz(questions: Vec<Question>) -> Quiz {
        Quiz::new("scheduler", questions).unwrap()
    }

    fn seeded(questions: Vec<Question>) -> ReviewScheduler<StdRng> {
        ReviewScheduler::with_rng(quiz(questions), StdRng::seed_from_u64(42))
    }

    fn assert_consistent<R>(scheduler: &ReviewScheduler<R>) {
        for (handle, question) in scheduler.questions() {
            let progress = question.user_progress().expect("progress is always present");
            assert!(progress.level.index() < NUMBER_OF_LEVELS);
            let memberships: Vec<usize> = scheduler
                .buckets
                .iter()
                .enumerate()
                .filter(|(_, bucket)| bucket.contains(&handle))
                .map(|(index, _)| index)
                .collect();
            assert_eq!(memberships, vec![progress.level.index()]);
        }
    }

    #[test]
    fn builds_buckets_from_existing_progress() {
        let scheduler = seeded(vec![
            question("fresh", None),
            question("middle", Some(UserProgress::new(level(3), 1))),
            question("also fresh", Some(UserProgress::default())),
        ]);

        assert_eq!(scheduler.levels_histogram(), [2, 0, 0, 1, 0]);
        assert!(scheduler.questions().all(|(_, q)| q.user_progress().is_some()));
        assert_consistent(&scheduler);
    }

    #[test]
    fn three_correct_outcomes_promote_out_of_level_zero() {
        let mut scheduler = seeded(vec![question("only", None)]);
        let handle = scheduler.next_question().unwrap();

        for expected_streak in 1..=2 {
            let report = scheduler.record_outcome(handle, true).unwrap();
            assert!(!report.promoted);
            assert_eq!(report.progress.correct_streak, expected_streak);
        }

        let report = scheduler.record_outcome(handle, true).unwrap();
        assert!(report.promoted);
        assert_eq!(report.previous_level, level(0));
        assert_eq!(report.progress.level, level(1));
        assert_eq!(report.progress.correct_streak, 0);
        assert_eq!(scheduler.levels_histogram(), [0, 1, 0, 0, 0]);

        let report = scheduler.record_outcome(handle, true).unwrap();
        assert_eq!(report.progress.level, level(1));
        assert_eq!(report.progress.correct_streak, 1);
        assert_consistent(&scheduler);
    }

    #[test]
    fn incorrect_outcome_never_demotes() {
        let mut scheduler = seeded(vec![question("q", Some(UserProgress::new(level(2), 4)))]);
        let handle = scheduler.next_question().unwrap();

        let report = scheduler.record_outcome(handle, false).unwrap();
        assert_eq!(report.progress.level, level(2));
        assert_eq!(report.progress.correct_streak, 0);
        assert!(!report.promoted);
        assert_eq!(scheduler.levels_histogram(), [0, 0, 1, 0, 0]);
    }

    #[test]
    fn terminal_level_stays_put() {
        let mut scheduler = seeded(vec![
            question("done", Some(UserProgress::new(Level::TERMINAL, 0))),
            question("open", None),
        ]);
        let done = scheduler.handle(0);

        for _ in 0..10 {
            let report = scheduler.record_outcome(done, true).unwrap();
            assert_eq!(report.progress.level, Level::TERMINAL);
            assert_eq!(report.progress.correct_streak, 0);
        }
        assert_eq!(scheduler.levels_histogram(), [1, 0, 0, 0, 1]);
    }

    #[test]
    fn all_terminal_means_study_complete() {
        let mut scheduler = seeded(vec![
            question("a", Some(UserProgress::new(Level::TERMINAL, 0))),
            question("b", Some(UserProgress::new(Level::TERMINAL, 3))),
        ]);

        assert!(!scheduler.has_remaining_work());
        assert_eq!(scheduler.draw(), Ok(Draw::Exhausted));
        assert_eq!(scheduler.next_question(), Err(SchedulerError::StudyComplete));
    }

    #[test]
    fn empty_quiz_is_complete_immediately() {
        let mut scheduler = seeded(vec![]);
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.next_question(), Err(SchedulerError::StudyComplete));
    }

    #[test]
    fn draws_only_from_populated_levels() {
        let mut scheduler = seeded(vec![
            question("low", Some(UserProgress::new(level(1), 0))),
            question("high", Some(UserProgress::new(level(3), 0))),
        ]);

        for _ in 0..500 {
            let handle = scheduler.next_question().unwrap();
            let drawn = scheduler.question(handle).unwrap().user_progress().unwrap().level;
            assert!(drawn == level(1) || drawn == level(3));
        }
    }

    #[test]
    fn draw_frequencies_favour_weak_levels() {
        let mut scheduler = seeded(vec![
            question("weak", None),
            question("strong", Some(UserProgress::new(level(3), 0))),
        ]);

        let mut weak = 0;
        for _ in 0..2_000 {
            if scheduler.next_question().unwrap().position() == 0 {
                weak += 1;
            }
        }
        // 0.5 / (0.5 + 0.07) ≈ 0.88
        assert!(weak > 1_600, "weak level drawn {weak} times");
    }

    #[test]
    fn same_seed_replays_same_draws() {
        let questions: Vec<_> = (0..6).map(|i| question(&format!("q{i}"), None)).collect();
        let mut first = seeded(questions.clone());
        let mut second = seeded(questions);

        let a: Vec<_> = (0..20)
            .map(|_| first.next_question().unwrap().position())
            .collect();
        let b: Vec<_> = (0..20)
            .map(|_| second.next_question().unwrap().position())
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_handle_is_rejected() {
        let mut scheduler = seeded(vec![question("only", None)]);
        let past_end = scheduler.handle(5);
        assert_eq!(
            scheduler.record_outcome(past_end, true),
            Err(SchedulerError::UnknownQuestion(past_end))
        );
    }

    #[test]
    fn handle_from_another_scheduler_is_rejected() {
        let mut first = seeded(vec![question("a", None), question("b", None)]);
        let mut second = seeded(vec![question("c", None), question("d", None)]);
        let foreign = first.next_question().unwrap();

        assert_eq!(second.question(foreign), None);
        assert_eq!(
            second.record_outcome(foreign, true),
            Err(SchedulerError::UnknownQuestion(foreign))
        );
        assert!(second
            .questions()
            .all(|(_, q)| q.user_progress().unwrap().correct_streak == 0));
        assert!(first.record_outcome(foreign, true).is_ok());
    }

    #[test]
    fn record_current_requires_a_draw() {
        let mut scheduler = seeded(vec![question("only", None)]);
        assert_eq!(
            scheduler.record_current(true),
            Err(SchedulerError::NoCurrentQuestion)
        );

        let handle = scheduler.next_question().unwrap();
        assert_eq!(scheduler.current(), Some(handle));
        assert_eq!(scheduler.record_current(true).unwrap().handle, handle);
    }

    #[test]
    fn studying_to_completion_keeps_buckets_consistent() {
        let questions: Vec<_> = (0..5).map(|i| question(&format!("q{i}"), None)).collect();
        let mut scheduler = seeded(questions);
        let mut draws = 0;

        while let Ok(handle) = scheduler.next_question() {
            draws += 1;
            // every third answer is wrong
            scheduler.record_outcome(handle, draws % 3 != 0).unwrap();
            assert_consistent(&scheduler);
            assert!(draws < 10_000, "session did not converge");
        }

        assert_eq!(scheduler.levels_histogram(), [0, 0, 0, 0, 5]);
        assert!(!scheduler.has_remaining_work());
    }

    #[test]
    fn into_quiz_keeps_question_order_and_progress() {
        let mut scheduler = seeded(vec![question("first", None), question("second", None)]);
        let second = scheduler.handle(1);
        scheduler.record_outcome(second, true).unwrap();

        let quiz = scheduler.into_quiz();
        assert_eq!(quiz.name(), "scheduler");
        assert_eq!(quiz.questions()[0].text(), "first");
        assert_eq!(quiz.questions()[0].user_progress().unwrap().correct_streak, 0);
        assert_eq!(quiz.questions()[1].user_progress().unwrap().correct_streak, 1);
    }

    #[test]
    fn handle_for_finds_stored_questions() {
        let scheduler = seeded(vec![
            question("a", None).with_id(QuestionId::new(10)),
            question("b", None).with_id(QuestionId::new(11)),
        ]);
        assert_eq!(
            scheduler.handle_for(QuestionId::new(11)).map(QuestionHandle::position),
            Some(1)
        );
        assert_eq!(scheduler.handle_for(QuestionId::new(99)), None);
    }
}
