//! Workspace setup sections persisted as JSON in the `settings` table and
//! merged over built-in defaults.

use rusqlite::Connection;
use serde_json::{json, Map, Value};

use crate::db;
use crate::error::EngineResult;
use crate::grading::OverallGradePolicy;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupSection {
    Grading,
}

impl SetupSection {
    pub const ALL: [SetupSection; 1] = [SetupSection::Grading];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "grading" => Some(Self::Grading),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Grading => "grading",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Grading => "setup.grading",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Grading => json!({
            "overallGradePolicy": OverallGradePolicy::default().as_str(),
        }),
    }
}

pub fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = current
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())?;
    for (k, v) in patch {
        match section {
            SetupSection::Grading => match k.as_str() {
                "overallGradePolicy" => {
                    let raw = v
                        .as_str()
                        .ok_or_else(|| format!("{} must be string", k))?
                        .trim()
                        .to_ascii_lowercase();
                    let Some(policy) = OverallGradePolicy::parse(&raw) else {
                        return Err(
                            "overallGradePolicy must be one of: pass_fail, gpa_letter".into(),
                        );
                    };
                    obj.insert(k.clone(), Value::String(policy.as_str().to_string()));
                }
                _ => return Err(format!("unknown grading field: {}", k)),
            },
        }
    }
    Ok(())
}

pub fn load_section(conn: &Connection, section: SetupSection) -> EngineResult<Value> {
    let mut current = default_section(section);
    let saved = match db::settings_get_json(conn, section.key()) {
        Ok(saved) => saved,
        // Undecodable historical values fall back to defaults.
        Err(rusqlite::Error::FromSqlConversionFailure(..)) => {
            tracing::warn!(key = section.key(), "ignoring malformed setup section");
            None
        }
        Err(e) => return Err(e.into()),
    };
    if let Some(saved_obj) = saved.as_ref().and_then(|v| v.as_object()) {
        let _ = merge_section_patch(section, &mut current, saved_obj);
    }
    Ok(current)
}

pub fn update_section(
    conn: &Connection,
    section: SetupSection,
    patch: &Map<String, Value>,
) -> EngineResult<Result<Value, String>> {
    let mut current = load_section(conn, section)?;
    if let Err(msg) = merge_section_patch(section, &mut current, patch) {
        return Ok(Err(msg));
    }
    db::settings_set_json(conn, section.key(), &current)?;
    Ok(Ok(current))
}

pub fn overall_grade_policy(conn: &Connection) -> EngineResult<OverallGradePolicy> {
    let section = load_section(conn, SetupSection::Grading)?;
    Ok(section
        .get("overallGradePolicy")
        .and_then(|v| v.as_str())
        .and_then(OverallGradePolicy::parse)
        .unwrap_or_default())
}

#[cfg(test)]
pub fn set_overall_grade_policy(conn: &Connection, policy: OverallGradePolicy) -> EngineResult<()> {
    let mut patch = Map::new();
    patch.insert(
        "overallGradePolicy".into(),
        Value::String(policy.as_str().to_string()),
    );
    update_section(conn, SetupSection::Grading, &patch)?
        .map(|_| ())
        .map_err(crate::error::EngineError::validation)
}
