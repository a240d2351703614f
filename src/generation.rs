//! Clients for the external text-generation service.
//!
//! The service is any OpenAI-compatible chat-completions endpoint. Responses
//! are only checked for shape; the content of generated questions and plans
//! is taken as-is.

use crate::config::LlmConfig;
use crate::model::{Difficulty, PassRequest, Question, QuestionType};
use crate::performance::YearSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("text generation is not configured (set CAMPUSD_LLM_API_KEY)")]
    NotConfigured,
    #[error("rate limit exceeded, try again in a moment")]
    RateLimited,
    #[error("usage limit reached for the generation service")]
    UsageLimit,
    #[error("generation service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generation request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("generation service returned no content")]
    EmptyResponse,
    #[error("could not parse generated {what}: {reason}")]
    Malformed { what: &'static str, reason: String },
    #[error("{0}")]
    InvalidRequest(String),
}

impl GenerationError {
    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::NotConfigured => "generation_unconfigured",
            GenerationError::RateLimited => "generation_rate_limited",
            GenerationError::UsageLimit => "generation_usage_limit",
            GenerationError::InvalidRequest(_) => "bad_params",
            GenerationError::Status { .. }
            | GenerationError::Transport(_)
            | GenerationError::EmptyResponse
            | GenerationError::Malformed { .. } => "generation_failed",
        }
    }
}

/// One system + user turn in, the model's text out.
pub trait TextGenerator {
    fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError>;
}

pub struct HttpGenerator {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpGenerator {
    pub fn from_config(cfg: &LlmConfig) -> Result<Self, GenerationError> {
        let Some(api_key) = cfg.api_key.clone() else {
            return Err(GenerationError::NotConfigured);
        };
        let http = reqwest::blocking::Client::builder()
            .timeout(cfg.timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: cfg.endpoint.clone(),
            api_key,
            model: cfg.model.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl TextGenerator for HttpGenerator {
    fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ]
        });
        debug!(endpoint = %self.endpoint, model = %self.model, "sending completion request");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            warn!(status = status.as_u16(), body = %text, "generation service error");
            return Err(match status.as_u16() {
                429 => GenerationError::RateLimited,
                402 => GenerationError::UsageLimit,
                code => GenerationError::Status {
                    status: code,
                    body: text,
                },
            });
        }

        let parsed: CompletionResponse =
            response.json().map_err(|e| GenerationError::Malformed {
                what: "completion response",
                reason: e.to_string(),
            })?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }
}

/// Slice from the first `open` to the last `close`, e.g. a JSON array inside
/// a markdown fence.
fn extract_json(content: &str, open: char, close: char) -> &str {
    match (content.find(open), content.rfind(close)) {
        (Some(start), Some(end)) if end > start => &content[start..=end],
        _ => content.trim(),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    pub topic: String,
    pub subject: String,
    pub difficulty: Difficulty,
    pub question_count: u32,
    pub question_types: Vec<String>,
}

impl QuestionRequest {
    fn validate(&self) -> Result<(), GenerationError> {
        if self.topic.trim().is_empty() || self.subject.trim().is_empty() {
            return Err(GenerationError::InvalidRequest(
                "topic and subject are required".into(),
            ));
        }
        if !(1..=50).contains(&self.question_count) {
            return Err(GenerationError::InvalidRequest(
                "questionCount must be in 1..=50".into(),
            ));
        }
        if self.question_types.is_empty() {
            return Err(GenerationError::InvalidRequest(
                "questionTypes must not be empty".into(),
            ));
        }
        if let Some(bad) = self
            .question_types
            .iter()
            .find(|t| t.parse::<QuestionType>().is_err())
        {
            return Err(GenerationError::InvalidRequest(format!(
                "unknown question type: {bad}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    #[serde(flatten)]
    pub question: Question,
    pub difficulty: Difficulty,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    #[serde(rename = "type")]
    kind: String,
    question: String,
    #[serde(default)]
    options: Option<Vec<String>>,
    correct_answer: String,
    #[serde(default)]
    points: Option<u32>,
    #[serde(default)]
    difficulty: Option<String>,
}

fn malformed(reason: impl Into<String>) -> GenerationError {
    GenerationError::Malformed {
        what: "questions",
        reason: reason.into(),
    }
}

pub fn parse_generated_questions(
    content: &str,
    req: &QuestionRequest,
    now: DateTime<Utc>,
) -> Result<Vec<GeneratedQuestion>, GenerationError> {
    let raw: Vec<RawQuestion> = serde_json::from_str(extract_json(content, '[', ']'))
        .map_err(|e| malformed(e.to_string()))?;

    let stamp = now.timestamp_millis();
    raw.into_iter()
        .enumerate()
        .map(|(i, r)| {
            let kind = r
                .kind
                .parse::<QuestionType>()
                .map_err(|_| malformed(format!("unknown question type {:?}", r.kind)))?
                .into_kind(r.options);
            let difficulty = r
                .difficulty
                .as_deref()
                .and_then(|d| d.parse().ok())
                .unwrap_or(req.difficulty);
            let points = r
                .points
                .filter(|p| *p > 0)
                .unwrap_or_else(|| difficulty.default_points());
            Ok(GeneratedQuestion {
                question: Question {
                    id: format!("Q{stamp}_{i}"),
                    kind,
                    text: r.question,
                    correct_answer: r.correct_answer,
                    points,
                },
                difficulty,
            })
        })
        .collect()
}

pub fn generate_questions(
    generator: &dyn TextGenerator,
    req: &QuestionRequest,
    now: DateTime<Utc>,
) -> Result<Vec<GeneratedQuestion>, GenerationError> {
    req.validate()?;
    let types = req.question_types.join(", ");
    let system = format!(
        include_str!("prompts/questions_system.md"),
        COUNT = req.question_count,
        DIFFICULTY = req.difficulty.as_str(),
        TYPES = types,
        SUBJECT = req.subject,
        TOPIC = req.topic,
    );
    let user = format!(
        "Generate {} {} difficulty {} questions about \"{}\" in {}.",
        req.question_count,
        req.difficulty.as_str(),
        req.question_types.join(" and "),
        req.topic,
        req.subject
    );
    let content = generator.complete(&system, &user)?;
    let questions = parse_generated_questions(&content, req, now).inspect_err(|e| {
        warn!(error = %e, "discarding unparseable question batch");
    })?;
    debug!(count = questions.len(), "generated questions");
    Ok(questions)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub subject: String,
    pub topics: Vec<String>,
    pub total_periods: u32,
    pub periods_per_week: u32,
    pub semester_weeks: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SemesterPlan {
    pub greeting: String,
    pub summary: PlanSummary,
    pub weekly_plan: Vec<PlanWeek>,
    pub milestones: Vec<PlanMilestone>,
    pub tips: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanSummary {
    pub total_weeks: u32,
    pub total_periods: u32,
    pub topics_count: u32,
    pub periods_per_topic: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanWeek {
    pub week: u32,
    pub theme: String,
    pub days: Vec<PlanDay>,
    pub week_goal: String,
    pub assessment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanDay {
    pub day: String,
    pub period_number: u32,
    pub topic: String,
    pub subtopic: String,
    pub objectives: Vec<String>,
    pub activities: String,
    pub duration: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanMilestone {
    pub week: u32,
    pub milestone: String,
    pub topics: Vec<String>,
}

pub fn parse_semester_plan(content: &str) -> Result<SemesterPlan, GenerationError> {
    serde_json::from_str(extract_json(content, '{', '}')).map_err(|e| {
        GenerationError::Malformed {
            what: "semester plan",
            reason: e.to_string(),
        }
    })
}

pub fn generate_semester_plan(
    generator: &dyn TextGenerator,
    req: &PlanRequest,
) -> Result<SemesterPlan, GenerationError> {
    if req.subject.trim().is_empty() || req.topics.iter().all(|t| t.trim().is_empty()) {
        return Err(GenerationError::InvalidRequest(
            "subject and at least one topic are required".into(),
        ));
    }
    if req.total_periods == 0 || req.periods_per_week == 0 || req.semester_weeks == 0 {
        return Err(GenerationError::InvalidRequest(
            "totalPeriods, periodsPerWeek and semesterWeeks must be positive".into(),
        ));
    }
    let system = format!(
        include_str!("prompts/semester_plan_system.md"),
        SUBJECT = req.subject,
        TOPICS = req.topics.join(", "),
        TOTAL_PERIODS = req.total_periods,
        PERIODS_PER_WEEK = req.periods_per_week,
        SEMESTER_WEEKS = req.semester_weeks,
    );
    let user = format!(
        "Create a semester plan for {} covering {} topics.",
        req.subject,
        req.topics.len()
    );
    let content = generator.complete(&system, &user)?;
    parse_semester_plan(&content)
}

/// Workspace facts handed to the chat model.
#[derive(Debug, Clone, Default)]
pub struct ChatContext {
    pub pending_requests: Vec<PassRequest>,
    pub performance_by_year: Vec<YearSummary>,
    pub total_assignments: usize,
    pub total_submissions: usize,
}

impl ChatContext {
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.pending_requests.is_empty() {
            out.push_str("No pending pass requests at the moment.\n");
        } else {
            out.push_str(&format!(
                "Pending pass requests ({} total):\n",
                self.pending_requests.len()
            ));
            for (i, r) in self.pending_requests.iter().enumerate() {
                out.push_str(&format!(
                    "{}. {} - \"{}\" (requested {})\n",
                    i + 1,
                    r.student_name,
                    r.reason,
                    r.requested_time.format("%Y-%m-%d %H:%M UTC")
                ));
            }
        }
        if !self.performance_by_year.is_empty() {
            out.push_str("\nStudent performance by year:\n");
            for y in &self.performance_by_year {
                out.push_str(&format!(
                    "- Year {}: average score {}% across {} submissions\n",
                    y.year, y.avg_score, y.submissions
                ));
            }
        }
        out.push_str(&format!(
            "\nOverall: {} assignments created, {} submissions received.",
            self.total_assignments, self.total_submissions
        ));
        out
    }
}

pub fn chat(
    generator: &dyn TextGenerator,
    message: &str,
    context: &str,
) -> Result<String, GenerationError> {
    if message.trim().is_empty() {
        return Err(GenerationError::InvalidRequest(
            "message must not be empty".into(),
        ));
    }
    let system = format!(include_str!("prompts/chat_system.md"), CONTEXT = context);
    generator.complete(&system, message)
}
