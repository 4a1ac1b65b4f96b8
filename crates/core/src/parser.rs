//! Reader for the markdown-like quiz document format.
//!
//! ```text
//! ## Quiz name
//! #### Question text
//! ![alt](images/picture.png)
//! - [ ] wrong answer
//! - [x] right answer
//! Anything else is kept as the question's comment.
//! ```
//!
//! Blank lines carry no meaning and are skipped. Answer, image and comment
//! lines before the first `####` belong to the first question.

use log::debug;
use thiserror::Error;

use crate::model::{Answer, Question, QuestionError, Quiz, QuizError};

const TITLE_PREFIX: &str = "## ";
const QUESTION_PREFIX: &str = "####";
const ANSWER_PREFIX: char = '-';
const IMAGE_PREFIX: &str = "![";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    #[error("expected a `## <quiz name>` title line, found {line:?}")]
    MalformedDocument { line: String },

    #[error("question heading without text: {line:?}")]
    EmptyQuestion { line: String },
}

//
// ─── PARSER ────────────────────────────────────────────────────────────────────
//

/// Parse a quiz document.
///
/// # Errors
///
/// Returns `ParseError::MalformedDocument` (carrying the offending line) when
/// the first non-blank line is not a `## <name>` title, and
/// `ParseError::EmptyQuestion` for a `####` heading with no text.
///
/// # Examples
///
/// ```
/// # use quiz_core::parser::parse;
/// let quiz = parse("## Arithmetic\n#### 2 + 2?\n- [ ] 3\n- [x] 4\n")?;
/// assert_eq!(quiz.name(), "Arithmetic");
/// assert!(quiz.questions()[0].answers()[1].is_correct());
/// # Ok::<(), quiz_core::parser::ParseError>(())
/// ```
pub fn parse(text: &str) -> Result<Quiz, ParseError> {
    let mut lines = text
        .lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty());

    let title = lines.next().unwrap_or_default();
    let name = parse_title(title).ok_or_else(|| ParseError::MalformedDocument {
        line: title.to_owned(),
    })?;

    let mut draft = QuestionDraft::default();
    let mut questions = Vec::new();

    for line in lines {
        if let Some(rest) = line.strip_prefix(QUESTION_PREFIX) {
            let text = rest.trim();
            if text.is_empty() {
                return Err(ParseError::EmptyQuestion {
                    line: line.to_owned(),
                });
            }
            if draft.heading.is_some() {
                questions.extend(std::mem::take(&mut draft).finish()?);
            }
            draft.heading = Some(Heading {
                line: line.to_owned(),
                text: text.to_owned(),
            });
            continue;
        }

        if line.starts_with(ANSWER_PREFIX) {
            if let Some(answer) = parse_answer(line) {
                draft.answers.push(answer);
                continue;
            }
        } else if line.starts_with(IMAGE_PREFIX) {
            if let Some(path) = parse_image(line) {
                draft.image_path = Some(path.to_owned());
                continue;
            }
        }

        push_line(&mut draft.comment, line);
    }

    if draft.heading.is_none() && draft.has_content() {
        debug!("quiz {name:?} has lines but no question heading, dropping them");
    }
    questions.extend(draft.finish()?);

    debug!("parsed quiz {name:?} with {} questions", questions.len());

    Quiz::new(name, questions).map_err(|QuizError::EmptyName| ParseError::MalformedDocument {
        line: title.to_owned(),
    })
}

struct Heading {
    line: String,
    text: String,
}

/// Accumulators for the question being read. They collect from the first
/// line after the title, so anything above the first heading joins the
/// first question.
#[derive(Default)]
struct QuestionDraft {
    heading: Option<Heading>,
    answers: Vec<Answer>,
    comment: String,
    image_path: Option<String>,
}

impl QuestionDraft {
    fn has_content(&self) -> bool {
        !self.answers.is_empty() || !self.comment.is_empty() || self.image_path.is_some()
    }

    /// `None` until a heading has been seen.
    fn finish(self) -> Result<Option<Question>, ParseError> {
        let Some(heading) = self.heading else {
            return Ok(None);
        };
        let question = Question::new(heading.text, self.answers).map_err(|err| match err {
            QuestionError::EmptyText => ParseError::EmptyQuestion { line: heading.line },
        })?;
        Ok(Some(
            question
                .with_image_path(self.image_path)
                .with_comment(finish_text(self.comment)),
        ))
    }
}

fn parse_title(line: &str) -> Option<&str> {
    let name = line.strip_prefix(TITLE_PREFIX)?.trim();
    (!name.is_empty()).then_some(name)
}

/// `- [ ] text` or `- [x] text`.
fn parse_answer(line: &str) -> Option<Answer> {
    let rest = line.strip_prefix("- [")?;
    let mut chars = rest.chars();
    let mark = chars.next()?;
    let text = chars.as_str().strip_prefix("] ")?;
    if text.trim().is_empty() {
        return None;
    }
    Some(Answer::new(text, matches!(mark, 'x' | 'X')))
}

/// `![alt](path)`, returning the path.
fn parse_image(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(IMAGE_PREFIX)?;
    let (_alt, target) = rest.split_once("](")?;
    let path = target.strip_suffix(')')?;
    (!path.is_empty()).then_some(path)
}

fn push_line(buffer: &mut String, line: &str) {
    buffer.push_str(line);
    buffer.push('\n');
}

fn finish_text(buffer: String) -> Option<String> {
    let trimmed = buffer.trim_end();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE: &str = "## Test quiz

#### Q1. What is 2 + 2?

![Q1](images/question1.png)

- [ ] 1
- [ ] 2
- [ ] 3
- [x] 4

[reference](https://www.google.com/)
";

    #[test]
    fn single_question_document() {
        let quiz = parse(SINGLE).unwrap();
        assert_eq!(quiz.name(), "Test quiz");
        assert_eq!(quiz.description(), None);
        assert_eq!(quiz.questions().len(), 1);

        let question = &quiz.questions()[0];
        assert_eq!(question.text(), "Q1. What is 2 + 2?");
        let texts: Vec<_> = question.answers().iter().map(Answer::text).collect();
        assert_eq!(texts, vec!["1", "2", "3", "4"]);
        let correct: Vec<_> = question.answers().iter().map(Answer::is_correct).collect();
        assert_eq!(correct, vec![false, false, false, true]);
        assert_eq!(question.image_path(), Some("images/question1.png"));
        assert_eq!(question.comment(), Some("[reference](https://www.google.com/)"));
        assert!(question.user_progress().is_none());
        assert!(question.id().is_none());
    }

    #[test]
    fn parsed_quiz_equals_hand_built_model() {
        let expected = Quiz::new(
            "Test quiz",
            vec![
                Question::new(
                    "Q1. What is 2 + 2?",
                    vec![
                        Answer::new("1", false),
                        Answer::new("2", false),
                        Answer::new("3", false),
                        Answer::new("4", true),
                    ],
                )
                .unwrap()
                .with_image_path(Some("images/question1.png".into()))
                .with_comment(Some("[reference](https://www.google.com/)".into())),
            ],
        )
        .unwrap();

        assert_eq!(parse(SINGLE).unwrap(), expected);
    }

    #[test]
    fn questions_do_not_share_state() {
        let text = "## Two
#### First
![a](first.png)
- [x] yes
- [ ] no
first comment
#### Second
- [ ] left
- [X] right
- [x] both
";
        let quiz = parse(text).unwrap();
        let [first, second] = quiz.questions() else {
            panic!("expected two questions");
        };

        assert_eq!(first.text(), "First");
        assert_eq!(first.answers().len(), 2);
        assert_eq!(first.image_path(), Some("first.png"));
        assert_eq!(first.comment(), Some("first comment"));

        assert_eq!(second.text(), "Second");
        assert_eq!(second.answers().len(), 3);
        assert_eq!(
            second.answers().iter().filter(|a| a.is_correct()).count(),
            2
        );
        assert_eq!(second.image_path(), None);
        assert_eq!(second.comment(), None);
    }

    #[test]
    fn multi_line_comment_keeps_order_and_code_blocks() {
        let text = "## Rust
#### What does this print?
- [x] 3
```rust
println!(\"{}\", 1 + 2);
```
> quoted hint

| a | b |
";
        let quiz = parse(text).unwrap();
        assert_eq!(
            quiz.questions()[0].comment(),
            Some("```rust\nprintln!(\"{}\", 1 + 2);\n```\n> quoted hint\n| a | b |")
        );
    }

    #[test]
    fn later_image_overwrites_earlier() {
        let quiz = parse("## I\n#### Q\n![a](one.png)\n![b](two.png)\n- [x] a\n").unwrap();
        assert_eq!(quiz.questions()[0].image_path(), Some("two.png"));
    }

    #[test]
    fn duplicate_question_text_is_kept() {
        let quiz = parse("## D\n#### Same\n- [x] a\n#### Same\n- [x] b\n").unwrap();
        assert_eq!(quiz.questions().len(), 2);
        assert_eq!(quiz.questions()[1].answers()[0].text(), "b");
    }

    #[test]
    fn leading_blank_lines_and_crlf_are_ignored() {
        let quiz = parse("\r\n\r\n## Windows\r\n#### Q\r\n- [x] yes\r\n").unwrap();
        assert_eq!(quiz.name(), "Windows");
        assert_eq!(quiz.questions()[0].answers()[0].text(), "yes");
    }

    #[test]
    fn missing_title_is_malformed() {
        let err = parse("#### Q\n- [x] a\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::MalformedDocument {
                line: "#### Q".into()
            }
        );
    }

    #[test]
    fn title_without_name_is_malformed() {
        assert!(matches!(
            parse("##   \n#### Q\n"),
            Err(ParseError::MalformedDocument { .. })
        ));
        assert!(matches!(
            parse(""),
            Err(ParseError::MalformedDocument { line }) if line.is_empty()
        ));
    }

    #[test]
    fn title_only_yields_empty_quiz() {
        let quiz = parse("## Nothing yet\n").unwrap();
        assert!(quiz.questions().is_empty());
    }

    #[test]
    fn lines_before_first_heading_join_first_question() {
        let quiz = parse("## P\nintro note\n![a](pre.png)\n- [x] early\n#### Q\n- [ ] late\n")
            .unwrap();
        assert_eq!(quiz.description(), None);
        assert_eq!(quiz.questions().len(), 1);

        let question = &quiz.questions()[0];
        assert_eq!(question.text(), "Q");
        let answers: Vec<_> = question
            .answers()
            .iter()
            .map(|a| (a.text(), a.is_correct()))
            .collect();
        assert_eq!(answers, vec![("early", true), ("late", false)]);
        assert_eq!(question.image_path(), Some("pre.png"));
        assert_eq!(question.comment(), Some("intro note"));
    }

    #[test]
    fn lines_without_any_heading_are_dropped() {
        let quiz = parse("## Draft\nsome notes\n- [x] orphan\n").unwrap();
        assert!(quiz.questions().is_empty());
        assert_eq!(quiz.description(), None);
    }

    #[test]
    fn second_question_starts_with_fresh_accumulators() {
        let quiz = parse("## P\nintro\n- [x] early\n#### One\n#### Two\n- [ ] b\n").unwrap();
        assert_eq!(quiz.questions()[0].answers().len(), 1);
        assert_eq!(quiz.questions()[0].comment(), Some("intro"));
        assert_eq!(quiz.questions()[1].answers().len(), 1);
        assert_eq!(quiz.questions()[1].comment(), None);
    }

    #[test]
    fn plain_bullets_fall_back_to_comment() {
        let quiz = parse("## B\n#### Q\n- [x] a\n- see chapter 2\n").unwrap();
        let question = &quiz.questions()[0];
        assert_eq!(question.answers().len(), 1);
        assert_eq!(question.comment(), Some("- see chapter 2"));
    }

    #[test]
    fn heading_without_text_is_rejected() {
        let err = parse("## T\n####\n- [x] a\n").unwrap_err();
        assert_eq!(err, ParseError::EmptyQuestion { line: "####".into() });
    }
}
