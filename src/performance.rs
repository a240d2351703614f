use crate::model::{Assignment, Submission};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Percentage points the recent half must beat (or trail) the older half by.
const TREND_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PerformanceBand {
    Excellent,
    Good,
    Average,
    NeedsAttention,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandThresholds {
    pub excellent: u32,
    pub good: u32,
    pub average: u32,
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            excellent: 90,
            good: 75,
            average: 60,
        }
    }
}

impl BandThresholds {
    pub fn band(&self, percentage: u32) -> PerformanceBand {
        if percentage >= self.excellent {
            PerformanceBand::Excellent
        } else if percentage >= self.good {
            PerformanceBand::Good
        } else if percentage >= self.average {
            PerformanceBand::Average
        } else {
            PerformanceBand::NeedsAttention
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
    pub student_id: String,
    pub student_name: String,
    pub weekly_average: u32,
    pub total_assignments: usize,
    pub completed_assignments: usize,
    pub trend: Trend,
}

pub fn weekly_average(percentages: &[u32]) -> u32 {
    if percentages.is_empty() {
        return 0;
    }
    mean(percentages).round() as u32
}

/// Classifies percentages ordered most-recent-first.
///
/// The first `ceil(n/2)` entries are the recent half.
pub fn classify_trend(percentages: &[u32]) -> Trend {
    if percentages.len() < 2 {
        return Trend::Stable;
    }
    let mid = percentages.len().div_ceil(2);
    let recent_avg = mean(&percentages[..mid]);
    let older_avg = mean(&percentages[mid..]);
    if recent_avg > older_avg + TREND_THRESHOLD {
        Trend::Improving
    } else if recent_avg < older_avg - TREND_THRESHOLD {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

fn mean(values: &[u32]) -> f64 {
    let sum: u64 = values.iter().map(|&v| u64::from(v)).sum();
    sum as f64 / values.len() as f64
}

fn record(student_id: &str, student_name: &str, percentages: &[u32]) -> PerformanceRecord {
    PerformanceRecord {
        student_id: student_id.to_string(),
        student_name: student_name.to_string(),
        weekly_average: weekly_average(percentages),
        total_assignments: percentages.len(),
        completed_assignments: percentages.len(),
        trend: classify_trend(percentages),
    }
}

/// Record for one student. `submissions` must be most-recent-first.
pub fn analyze_student(submissions: &[Submission], student_id: &str) -> PerformanceRecord {
    let mine: Vec<&Submission> = submissions
        .iter()
        .filter(|s| s.student_id == student_id)
        .collect();
    let name = mine
        .first()
        .map(|s| s.student_name.as_str())
        .unwrap_or("");
    let percentages: Vec<u32> = mine.iter().map(|s| s.percentage).collect();
    record(student_id, name, &percentages)
}

/// One record per student, best weekly average first.
///
/// With `year` set, only submissions whose assignment resolves to that year
/// are counted; unresolvable submissions (year 0) never match.
pub fn analyze_cohort(
    submissions: &[Submission],
    year: Option<u8>,
    years: &YearResolver,
) -> Vec<PerformanceRecord> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, (&str, Vec<u32>)> = HashMap::new();

    for s in submissions {
        if let Some(y) = year {
            let resolved = years.resolve(s);
            if resolved == 0 || resolved != y {
                continue;
            }
        }
        let entry = groups.entry(s.student_id.as_str()).or_insert_with(|| {
            order.push(s.student_id.as_str());
            (s.student_name.as_str(), Vec::new())
        });
        entry.1.push(s.percentage);
    }

    let mut records: Vec<PerformanceRecord> = order
        .into_iter()
        .filter_map(|id| groups.get(id).map(|(name, pcts)| record(id, name, pcts)))
        .collect();
    // Stable: ties keep first-seen order.
    records.sort_by(|a, b| b.weekly_average.cmp(&a.weekly_average));
    records
}

/// First ASCII digit in a class id (`"CS-2A"` -> 2), 0 when there is none.
pub fn year_from_class_id(class_id: &str) -> u8 {
    class_id
        .chars()
        .find_map(|c| c.to_digit(10))
        .map(|d| d as u8)
        .unwrap_or(0)
}

/// Maps assignment ids to study years.
#[derive(Debug, Clone, Default)]
pub struct YearResolver {
    by_assignment: HashMap<String, u8>,
}

impl YearResolver {
    pub fn from_assignments(assignments: &[Assignment]) -> Self {
        let by_assignment = assignments
            .iter()
            .map(|a| {
                let year = a
                    .target_year
                    .unwrap_or_else(|| year_from_class_id(&a.class_id));
                (a.id.clone(), year)
            })
            .collect();
        Self { by_assignment }
    }

    pub fn resolve(&self, submission: &Submission) -> u8 {
        self.by_assignment
            .get(&submission.assignment_id)
            .copied()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSummary {
    pub year: u8,
    pub avg_score: u32,
    pub submissions: usize,
}

pub fn year_summaries(submissions: &[Submission], years: &YearResolver) -> Vec<YearSummary> {
    let mut by_year: BTreeMap<u8, Vec<u32>> = BTreeMap::new();
    for s in submissions {
        let y = years.resolve(s);
        if y == 0 {
            continue;
        }
        by_year.entry(y).or_default().push(s.percentage);
    }
    by_year
        .into_iter()
        .map(|(year, pcts)| YearSummary {
            year,
            avg_score: weekly_average(&pcts),
            submissions: pcts.len(),
        })
        .collect()
}
