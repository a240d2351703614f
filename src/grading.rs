use crate::model::{Question, QuestionFeedback, QuestionKind};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GradeError {
    #[error("cannot grade an empty question set")]
    EmptyQuestionSet,
    #[error("question points add up to more than {}", u32::MAX)]
    PointsOverflow,
}

impl GradeError {
    pub fn code(&self) -> &'static str {
        "validation_failed"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeOutcome {
    pub score: u32,
    pub max_score: u32,
    pub percentage: u32,
    pub feedback: BTreeMap<String, QuestionFeedback>,
}

/// Scores `answers` (question id -> raw answer) against `questions`.
///
/// All-or-nothing per question. Missing answers count as the empty string.
/// Answers keyed by ids that are not in `questions` are ignored.
pub fn grade(
    answers: &BTreeMap<String, String>,
    questions: &[Question],
) -> Result<GradeOutcome, GradeError> {
    if questions.is_empty() {
        return Err(GradeError::EmptyQuestionSet);
    }

    let mut score = 0_u64;
    let mut max_score = 0_u64;
    let mut feedback = BTreeMap::new();

    for q in questions {
        max_score += u64::from(q.points);
        let student = normalize(answers.get(&q.id).map(String::as_str).unwrap_or(""));
        let expected = normalize(&q.correct_answer);
        let correct = answer_matches(&q.kind, &student, &expected);
        if correct {
            score += u64::from(q.points);
        }
        feedback.insert(
            q.id.clone(),
            QuestionFeedback {
                correct,
                correct_answer: q.correct_answer.clone(),
            },
        );
    }

    let (Ok(score), Ok(max_score)) = (u32::try_from(score), u32::try_from(max_score)) else {
        return Err(GradeError::PointsOverflow);
    };
    Ok(GradeOutcome {
        score,
        max_score,
        percentage: rounded_percentage(score, max_score),
        feedback,
    })
}

/// `round(100 * score / max_score)`, or 0 when nothing was gradable.
pub fn rounded_percentage(score: u32, max_score: u32) -> u32 {
    if max_score == 0 {
        return 0;
    }
    (100.0 * f64::from(score) / f64::from(max_score)).round() as u32
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn answer_matches(kind: &QuestionKind, student: &str, expected: &str) -> bool {
    match kind {
        QuestionKind::MultipleChoice { .. } => student == expected,
        QuestionKind::FillBlank => student.contains(expected) || expected.contains(student),
        // Any single keyword passes. Lenient, and easy to game with one word.
        QuestionKind::ShortAnswer => expected
            .split_whitespace()
            .any(|keyword| student.contains(keyword)),
    }
}
