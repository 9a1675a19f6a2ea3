use crate::ipc::error::{err, ok};
use crate::ipc::types::AppState;
use crate::locks::Role;
use crate::report::ReportError;
use crate::valoracion::{is_valid_grade, Valoracion};
use rusqlite::{Connection, OptionalExtension};
use serde_json::{json, Value};

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn query(e: impl std::fmt::Display) -> Self {
        Self::new("db_query_failed", e.to_string())
    }

    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<ReportError> for HandlerErr {
    fn from(e: ReportError) -> Self {
        HandlerErr::new(e.code, e.message)
    }
}

pub fn respond(id: &str, result: Result<Value, HandlerErr>) -> Value {
    match result {
        Ok(v) => ok(id, v),
        Err(e) => e.response(id),
    }
}

pub fn db_conn(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// `None` when absent or null; an error when present with the wrong type.
pub fn optional_str(params: &Value, key: &str) -> Result<Option<String>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(HandlerErr::bad_params(format!("{} must be string or null", key))),
    }
}

pub fn required_i64_range(params: &Value, key: &str, min: i64, max: i64) -> Result<i64, HandlerErr> {
    let n = params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    if !(min..=max).contains(&n) {
        return Err(HandlerErr::bad_params(format!(
            "{} must be in {}..={}",
            key, min, max
        ))
        .with_details(json!({ key: n })));
    }
    Ok(n)
}

pub fn optional_i64(params: &Value, key: &str) -> Result<Option<i64>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be integer", key))),
    }
}

pub fn optional_bool(params: &Value, key: &str) -> Result<Option<bool>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(HandlerErr::bad_params(format!("{} must be boolean", key))),
    }
}

pub fn required_role(params: &Value) -> Result<Role, HandlerErr> {
    let raw = required_str(params, "role")?;
    Role::parse(&raw).ok_or_else(|| {
        HandlerErr::bad_params("role must be one of: directivo, preceptor, profesor")
            .with_details(json!({ "role": raw }))
    })
}

/// Grade cell edit: null clears, otherwise an integer in 1..=10.
pub fn parse_grade_value(v: &Value, key: &str) -> Result<Option<i64>, HandlerErr> {
    if v.is_null() {
        return Ok(None);
    }
    let Some(n) = v.as_i64() else {
        return Err(HandlerErr::bad_params(format!("{} must be integer or null", key)));
    };
    if !is_valid_grade(n) {
        return Err(HandlerErr::bad_params(format!("{} must be in 1..=10", key))
            .with_details(json!({ key: n })));
    }
    Ok(Some(n))
}

/// Label cell edit: null or "" clears, otherwise TEA/TEP/TED.
pub fn parse_label_value(v: &Value, key: &str) -> Result<Option<Valoracion>, HandlerErr> {
    match v {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Valoracion::parse(s).map(Some).ok_or_else(|| {
            HandlerErr::bad_params(format!("{} must be one of: TEA, TEP, TED", key))
                .with_details(json!({ key: s }))
        }),
        _ => Err(HandlerErr::bad_params(format!("{} must be string or null", key))),
    }
}

pub fn row_exists(conn: &Connection, table: &str, id: &str) -> Result<bool, HandlerErr> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", table);
    conn.query_row(&sql, [id], |r| r.get::<_, i64>(0))
        .optional()
        .map(|v| v.is_some())
        .map_err(HandlerErr::query)
}

pub fn require_row(conn: &Connection, table: &str, id: &str, what: &str) -> Result<(), HandlerErr> {
    if row_exists(conn, table, id)? {
        Ok(())
    } else {
        Err(HandlerErr::new("not_found", format!("{} not found", what))
            .with_details(json!({ "id": id })))
    }
}
