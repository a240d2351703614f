use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::db_conn;
use crate::ipc::types::{AppState, Request};
use crate::model::Difficulty;
use crate::performance::BandThresholds;
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
pub enum SetupSection {
    Analytics,
    Publisher,
    Assistant,
}

impl SetupSection {
    const ALL: [SetupSection; 3] = [Self::Analytics, Self::Publisher, Self::Assistant];

    fn parse(s: &str) -> Option<Self> {
        match s {
            "analytics" => Some(Self::Analytics),
            "publisher" => Some(Self::Publisher),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Analytics => "analytics",
            Self::Publisher => "publisher",
            Self::Assistant => "assistant",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Analytics => "setup.analytics",
            Self::Publisher => "setup.publisher",
            Self::Assistant => "setup.assistant",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Analytics => {
            let t = BandThresholds::default();
            json!({
                "excellentThreshold": t.excellent,
                "goodThreshold": t.good,
                "averageThreshold": t.average
            })
        }
        SetupSection::Publisher => json!({
            "tickIntervalSeconds": 10
        }),
        SetupSection::Assistant => json!({
            "defaultDifficulty": "medium",
            "defaultQuestionCount": 5
        }),
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Analytics => match k.as_str() {
                "excellentThreshold" | "goodThreshold" | "averageThreshold" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 0, 100)?));
                }
                _ => return Err(format!("unknown analytics field: {}", k)),
            },
            SetupSection::Publisher => match k.as_str() {
                "tickIntervalSeconds" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 3600)?));
                }
                _ => return Err(format!("unknown publisher field: {}", k)),
            },
            SetupSection::Assistant => match k.as_str() {
                "defaultDifficulty" => {
                    let d = v
                        .as_str()
                        .and_then(|d| d.parse::<Difficulty>().ok())
                        .ok_or("defaultDifficulty must be one of: easy, medium, hard")?;
                    obj.insert(k.clone(), Value::String(d.as_str().to_string()));
                }
                "defaultQuestionCount" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 50)?));
                }
                _ => return Err(format!("unknown assistant field: {}", k)),
            },
        }
    }
    if let SetupSection::Analytics = section {
        let t = thresholds_from(current);
        if !(t.excellent > t.good && t.good > t.average) {
            return Err("thresholds must satisfy excellent > good > average".into());
        }
    }
    Ok(())
}

fn thresholds_from(analytics: &Value) -> BandThresholds {
    let d = BandThresholds::default();
    let get = |key: &str, fallback: u32| {
        analytics
            .get(key)
            .and_then(|v| v.as_u64())
            .map(|n| n as u32)
            .unwrap_or(fallback)
    };
    BandThresholds {
        excellent: get("excellentThreshold", d.excellent),
        good: get("goodThreshold", d.good),
        average: get("averageThreshold", d.average),
    }
}

pub fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Malformed saved values fall back to defaults instead of failing reads.
            let mut candidate = current.clone();
            if merge_section_patch(section, &mut candidate, saved_obj).is_ok() {
                current = candidate;
            }
        }
    }
    Ok(current)
}

pub fn band_thresholds(conn: &rusqlite::Connection) -> anyhow::Result<BandThresholds> {
    Ok(thresholds_from(&load_section(conn, SetupSection::Analytics)?))
}

/// `(difficulty, questionCount)` used when a generation request omits them.
pub fn assistant_defaults(conn: Option<&rusqlite::Connection>) -> anyhow::Result<(Difficulty, u32)> {
    let section = match conn {
        Some(c) => load_section(c, SetupSection::Assistant)?,
        None => default_section(SetupSection::Assistant),
    };
    let difficulty = section
        .get("defaultDifficulty")
        .and_then(|v| v.as_str())
        .and_then(|d| d.parse().ok())
        .unwrap_or(Difficulty::Medium);
    let count = section
        .get("defaultQuestionCount")
        .and_then(|v| v.as_u64())
        .map(|n| n as u32)
        .unwrap_or(5);
    Ok((difficulty, count))
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let mut out = Map::new();
    for section in SetupSection::ALL {
        match load_section(conn, section) {
            Ok(v) => {
                out.insert(section.name().to_string(), v);
            }
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    }
    ok(&req.id, Value::Object(out))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "ok": true, section.name(): current }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
