use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use uuid::Uuid;

/// Answer kinds. Only multiple-choice questions carry options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice {
        #[serde(default)]
        options: Vec<String>,
    },
    FillBlank,
    ShortAnswer,
}

/// The tag of a [`QuestionKind`], as clients and the generator name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    FillBlank,
    ShortAnswer,
}

impl QuestionType {
    /// Options are kept only for multiple choice.
    pub fn into_kind(self, options: Option<Vec<String>>) -> QuestionKind {
        match self {
            QuestionType::MultipleChoice => QuestionKind::MultipleChoice {
                options: options.unwrap_or_default(),
            },
            QuestionType::FillBlank => QuestionKind::FillBlank,
            QuestionType::ShortAnswer => QuestionKind::ShortAnswer,
        }
    }
}

impl FromStr for QuestionType {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_tag(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value {0:?}")]
pub struct UnknownTag(pub String);

/// Reads a unit variant by its serde name, ignoring surrounding whitespace
/// and ASCII case. Only for enums whose wire names are lowercase.
pub(crate) fn parse_tag<T: DeserializeOwned>(s: &str) -> Result<T, UnknownTag> {
    let tag = s.trim().to_ascii_lowercase();
    serde_json::from_value(serde_json::Value::String(tag)).map_err(|_| UnknownTag(s.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    #[serde(alias = "question")]
    pub text: String,
    pub correct_answer: String,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub teacher_id: String,
    pub teacher_name: String,
    pub class_id: String,
    pub target_year: Option<u8>,
    pub title: String,
    pub description: String,
    pub questions: Vec<Question>,
    pub due_date: DateTime<Utc>,
    pub total_points: u32,
    pub is_published: bool,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    MissingField(&'static str),
    #[error("assignment needs at least one question")]
    NoQuestions,
    #[error("question {0} must be worth at least one point")]
    ZeroPoints(String),
    #[error("question {id} is worth {points} points, the limit is {}", MAX_QUESTION_POINTS)]
    TooManyPoints { id: String, points: u32 },
    #[error("multiple-choice question {0} has no options")]
    MissingOptions(String),
    #[error("duplicate question id: {0}")]
    DuplicateQuestionId(String),
    #[error("year must be in 1..=4, got {0}")]
    YearOutOfRange(i64),
    #[error("{0}")]
    Invalid(String),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        "validation_failed"
    }
}

pub fn check_year(year: i64) -> Result<u8, ValidationError> {
    if (1..=4).contains(&year) {
        Ok(year as u8)
    } else {
        Err(ValidationError::YearOutOfRange(year))
    }
}

/// Upper bound for a single question's points.
pub const MAX_QUESTION_POINTS: u32 = 1000;

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

/// Client-supplied assignment fields, before the publisher decides its state.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignment {
    pub teacher_id: String,
    pub teacher_name: String,
    pub class_id: String,
    #[serde(default)]
    pub target_year: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<Question>,
    pub due_date: DateTime<Utc>,
}

impl NewAssignment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.teacher_id, "teacherId")?;
        require(&self.class_id, "classId")?;
        require(&self.title, "title")?;
        if let Some(year) = self.target_year {
            check_year(year)?;
        }
        if self.questions.is_empty() {
            return Err(ValidationError::NoQuestions);
        }
        let mut seen = HashSet::new();
        let mut total = 0_u32;
        for q in &self.questions {
            require(&q.id, "question id")?;
            require(&q.text, "question text")?;
            require(&q.correct_answer, "correctAnswer")?;
            if !seen.insert(q.id.as_str()) {
                return Err(ValidationError::DuplicateQuestionId(q.id.clone()));
            }
            if q.points == 0 {
                return Err(ValidationError::ZeroPoints(q.id.clone()));
            }
            if q.points > MAX_QUESTION_POINTS {
                return Err(ValidationError::TooManyPoints {
                    id: q.id.clone(),
                    points: q.points,
                });
            }
            total = total
                .checked_add(q.points)
                .ok_or_else(|| ValidationError::Invalid("total points overflow".into()))?;
            if let QuestionKind::MultipleChoice { options } = &q.kind {
                if options.iter().all(|o| o.trim().is_empty()) {
                    return Err(ValidationError::MissingOptions(q.id.clone()));
                }
            }
        }
        Ok(())
    }

    /// Builds an unpublished, unscheduled assignment. Call `validate` first.
    pub fn build(self, now: DateTime<Utc>) -> Assignment {
        let total_points = self
            .questions
            .iter()
            .fold(0_u32, |acc, q| acc.saturating_add(q.points));
        Assignment {
            id: Uuid::new_v4().to_string(),
            teacher_id: self.teacher_id.trim().to_string(),
            teacher_name: self.teacher_name.trim().to_string(),
            class_id: self.class_id.trim().to_string(),
            target_year: self.target_year.map(|y| y as u8),
            title: self.title.trim().to_string(),
            description: self.description,
            questions: self.questions,
            due_date: self.due_date,
            total_points,
            is_published: false,
            scheduled_at: None,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionFeedback {
    pub correct: bool,
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub assignment_id: String,
    pub student_id: String,
    pub student_name: String,
    pub student_answers: BTreeMap<String, String>,
    pub score: u32,
    pub max_score: u32,
    pub percentage: u32,
    pub feedback: BTreeMap<String, QuestionFeedback>,
    pub corrected_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassStatus {
    Pending,
    Approved,
    Denied,
}

impl PassStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PassStatus::Pending => "Pending",
            PassStatus::Approved => "Approved",
            PassStatus::Denied => "Denied",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [PassStatus::Pending, PassStatus::Approved, PassStatus::Denied]
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassRequest {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub reason: String,
    pub requested_time: DateTime<Utc>,
    pub status: PassStatus,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTiming {
    #[serde(default)]
    pub id: String,
    pub period_number: u32,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub is_break: bool,
    #[serde(default)]
    pub label: String,
}

/// Parses "HH:MM" into minutes past midnight.
pub fn clock_minutes(s: &str) -> Option<u32> {
    let (h, m) = s.trim().split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

pub fn validate_periods(periods: &[PeriodTiming]) -> Result<(), ValidationError> {
    let mut numbers = HashSet::new();
    for p in periods {
        if p.period_number == 0 {
            return Err(ValidationError::Invalid(
                "periodNumber must be positive".into(),
            ));
        }
        if !numbers.insert(p.period_number) {
            return Err(ValidationError::Invalid(format!(
                "duplicate periodNumber {}",
                p.period_number
            )));
        }
        let (Some(start), Some(end)) = (clock_minutes(&p.start_time), clock_minutes(&p.end_time))
        else {
            return Err(ValidationError::Invalid(format!(
                "period {} times must be HH:MM",
                p.period_number
            )));
        };
        if start >= end {
            return Err(ValidationError::Invalid(format!(
                "period {} must start before it ends",
                p.period_number
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 6] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableEntry {
    pub id: String,
    pub class_id: String,
    pub year: u8,
    pub day_of_week: DayOfWeek,
    pub period_number: u32,
    pub subject: String,
    pub teacher_id: String,
    pub teacher_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectMaster {
    pub year: u8,
    pub subjects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub assigned_year: Option<u8>,
    pub assigned_subject: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Points awarded when a generated question omits them.
    pub fn default_points(self) -> u32 {
        match self {
            Difficulty::Easy => 5,
            Difficulty::Medium => 10,
            Difficulty::Hard => 15,
        }
    }
}

impl FromStr for Difficulty {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_tag(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionSource {
    Ai,
    Manual,
}

impl FromStr for QuestionSource {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_tag(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionBankItem {
    pub subject: String,
    pub topic: String,
    #[serde(flatten)]
    pub question: Question,
    pub difficulty: Difficulty,
    pub source: QuestionSource,
    pub created_at: DateTime<Utc>,
}
