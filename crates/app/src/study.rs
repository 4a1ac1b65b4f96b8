//! Interactive study loop on a line-based terminal.

use std::io::{BufRead, Write};

use anyhow::{Context, bail};
use quiz_core::model::{AnswerCheckError, Level, NUMBER_OF_LEVELS, Question};
use services::{StudyAnswerResult, StudyError, StudyLoopService, StudySession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyEnd {
    Complete,
    Quit,
}

/// Parse answer numbers such as `1 3` or `1,3` into zero-based indices.
///
/// An empty line selects nothing.
pub fn parse_selection(line: &str) -> anyhow::Result<Vec<usize>> {
    let mut selected = Vec::new();
    for token in line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
    {
        let number: usize = token
            .parse()
            .with_context(|| format!("{token:?} is not an answer number"))?;
        if number == 0 {
            bail!("answers are numbered from 1");
        }
        if !selected.contains(&(number - 1)) {
            selected.push(number - 1);
        }
    }
    Ok(selected)
}

/// Ask questions until the quiz is mastered, the learner types `q`, or input ends.
pub async fn run_study<R: BufRead, W: Write>(
    study: &StudyLoopService,
    session: &mut StudySession,
    input: &mut R,
    out: &mut W,
) -> anyhow::Result<StudyEnd> {
    writeln!(out, "Studying {:?}. Enter answer numbers, or q to quit.", session.quiz_name())?;

    'questions: while let Some(handle) = session.next()? {
        let question = session
            .question(handle)
            .context("drawn question is missing")?;
        render_question(out, question)?;

        loop {
            write!(out, "> ")?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(out)?;
                break 'questions;
            }
            let line = line.trim();
            if line.eq_ignore_ascii_case("q") {
                break 'questions;
            }

            let selected = match parse_selection(line) {
                Ok(selected) => selected,
                Err(err) => {
                    writeln!(out, "{err}")?;
                    continue;
                }
            };

            match study.answer_current(session, &selected).await {
                Ok(result) => {
                    render_result(out, session, &result)?;
                    continue 'questions;
                }
                Err(StudyError::AnswerCheck(AnswerCheckError::IndexOutOfRange { index, len })) => {
                    writeln!(out, "There is no answer {}; pick from 1 to {len}.", index + 1)?;
                }
                Err(StudyError::AnswerCheck(err)) => writeln!(out, "{err}")?,
                Err(err) => return Err(err.into()),
            }
        }
    }

    if session.is_complete() {
        writeln!(out, "Study complete: every question reached the top level.")?;
        render_histogram(out, session.levels_histogram())?;
        return Ok(StudyEnd::Complete);
    }

    let answered = session.answered();
    let noun = if answered == 1 { "answer" } else { "answers" };
    writeln!(
        out,
        "Stopped after {answered} {noun} ({} correct).",
        session.correct()
    )?;
    Ok(StudyEnd::Quit)
}

fn render_question<W: Write>(out: &mut W, question: &Question) -> std::io::Result<()> {
    let level = question.user_progress().map_or(Level::FIRST, |p| p.level);
    writeln!(out)?;
    writeln!(out, "[level {level}] {}", question.text())?;
    if let Some(image) = question.image_path() {
        writeln!(out, "  (image: {image})")?;
    }
    for (number, answer) in question.answers().iter().enumerate() {
        writeln!(out, "  {}) {}", number + 1, answer.text())?;
    }
    Ok(())
}

fn render_result<W: Write>(
    out: &mut W,
    session: &StudySession,
    result: &StudyAnswerResult,
) -> std::io::Result<()> {
    if result.check.is_correct {
        writeln!(out, "Correct!")?;
    } else {
        writeln!(
            out,
            "Wrong. Check answers {}.",
            answer_numbers(result.check.mismatched.iter().copied())
        )?;
        if let Some(question) = session.question(result.report.handle) {
            let key = question
                .answers()
                .iter()
                .enumerate()
                .filter(|(_, a)| a.is_correct())
                .map(|(i, _)| i);
            writeln!(out, "Correct answers: {}", answer_numbers(key))?;
        }
    }

    if let Some(comment) = session
        .question(result.report.handle)
        .and_then(Question::comment)
    {
        writeln!(out, "{comment}")?;
    }
    if result.report.promoted {
        writeln!(
            out,
            "Level up: {} -> {}",
            result.report.previous_level, result.report.progress.level
        )?;
    }
    Ok(())
}

fn answer_numbers(indices: impl Iterator<Item = usize>) -> String {
    indices
        .map(|i| (i + 1).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn render_histogram<W: Write>(
    out: &mut W,
    histogram: [usize; NUMBER_OF_LEVELS],
) -> std::io::Result<()> {
    for (level, count) in Level::all().zip(histogram) {
        writeln!(out, "  level {level}: {count}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    use quiz_core::parse;
    use storage::repository::{InMemoryRepository, QuizRepository};

    async fn service_with(doc: &str) -> StudyLoopService {
        let repo = InMemoryRepository::new();
        repo.save_quiz(&parse(doc).unwrap()).await.unwrap();
        StudyLoopService::new(Arc::new(repo.clone()), Arc::new(repo))
    }

    #[test]
    fn selection_accepts_spaces_and_commas() {
        assert_eq!(parse_selection("1 3").unwrap(), vec![0, 2]);
        assert_eq!(parse_selection(" 2,1 ,2 ").unwrap(), vec![1, 0]);
        assert!(parse_selection("").unwrap().is_empty());
    }

    #[test]
    fn selection_rejects_zero_and_words() {
        assert!(parse_selection("0").is_err());
        assert!(parse_selection("one").is_err());
    }

    #[tokio::test]
    async fn quit_stops_the_loop() {
        let study = service_with("## Q\n#### Only\n- [x] yes\n- [ ] no\n").await;
        let mut session = study.start("Q", Some(3)).await.unwrap();
        let mut input = Cursor::new("2\nq\n");
        let mut out = Vec::new();

        let end = run_study(&study, &mut session, &mut input, &mut out)
            .await
            .unwrap();
        let out = String::from_utf8(out).unwrap();

        assert_eq!(end, StudyEnd::Quit);
        assert!(out.contains("1) yes"));
        assert!(out.contains("Wrong. Check answers 1, 2."));
        assert!(out.contains("Correct answers: 1"));
        assert!(out.contains("Stopped after 1 answer (0 correct)."));
    }

    #[tokio::test]
    async fn invalid_numbers_reprompt_the_same_question() {
        let study = service_with("## Q\n#### Only\n- [x] yes\n- [ ] no\n").await;
        let mut session = study.start("Q", Some(3)).await.unwrap();
        let mut input = Cursor::new("5\nabc\n");
        let mut out = Vec::new();

        let end = run_study(&study, &mut session, &mut input, &mut out)
            .await
            .unwrap();
        let out = String::from_utf8(out).unwrap();

        assert_eq!(end, StudyEnd::Quit);
        assert_eq!(session.answered(), 0);
        assert!(out.contains("There is no answer 5; pick from 1 to 2."));
        assert!(out.contains("\"abc\" is not an answer number"));
        assert!(out.contains("Stopped after 0 answers (0 correct)."));
    }

    #[tokio::test]
    async fn stop_summary_counts_several_answers() {
        let study = service_with("## Q\n#### Only\n- [x] yes\n- [ ] no\n").await;
        let mut session = study.start("Q", Some(3)).await.unwrap();
        let mut input = Cursor::new("2\n1\nq\n");
        let mut out = Vec::new();

        run_study(&study, &mut session, &mut input, &mut out)
            .await
            .unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("Stopped after 2 answers (1 correct)."));
    }

    #[tokio::test]
    async fn correct_answers_run_to_completion() {
        let study = service_with("## Q\n#### Only\n- [x] yes\n- [ ] no\nBecause.\n").await;
        let mut session = study.start("Q", Some(3)).await.unwrap();
        let mut input = Cursor::new("1\n".repeat(40));
        let mut out = Vec::new();

        let end = run_study(&study, &mut session, &mut input, &mut out)
            .await
            .unwrap();
        let out = String::from_utf8(out).unwrap();

        assert_eq!(end, StudyEnd::Complete);
        assert_eq!(session.answered(), 18);
        assert!(out.contains("Because."));
        assert!(out.contains("Level up: 3 -> 4"));
        assert!(out.contains("level 4: 1"));
    }
}
