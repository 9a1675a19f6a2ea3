use crate::attendance::{self, DayCode};
use crate::config;
use crate::ipc::helpers::{db_conn, required_str, require_row, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::report;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;

fn parse_day(raw: &str) -> Result<NaiveDate, HandlerErr> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        HandlerErr::bad_params("date must be YYYY-MM-DD").with_details(json!({ "date": raw }))
    })
}

fn parse_code(raw: Option<&serde_json::Value>) -> Result<Option<DayCode>, HandlerErr> {
    match raw {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => DayCode::parse(s).map(Some).ok_or_else(|| {
            HandlerErr::bad_params("code must be one of: P, A, T, J")
                .with_details(json!({ "code": s }))
        }),
        Some(_) => Err(HandlerErr::bad_params("code must be string or null")),
    }
}

fn attendance_set(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let cycle_id = required_str(params, "cycleId")?;
    let day = parse_day(&required_str(params, "date")?)?;
    let code = parse_code(params.get("code"))?;

    require_row(conn, "students", &student_id, "student")?;
    require_row(conn, "cycles", &cycle_id, "cycle")?;

    let day_text = day.format("%Y-%m-%d").to_string();
    match code {
        None => {
            conn.execute(
                "DELETE FROM attendance_days WHERE student_id = ? AND cycle_id = ? AND day = ?",
                (&student_id, &cycle_id, &day_text),
            )
            .map_err(|e| {
                HandlerErr::new("db_update_failed", e.to_string())
                    .with_details(json!({ "table": "attendance_days" }))
            })?;
        }
        Some(c) => {
            conn.execute(
                "INSERT INTO attendance_days(student_id, cycle_id, day, code)
                 VALUES(?, ?, ?, ?)
                 ON CONFLICT(student_id, cycle_id, day) DO UPDATE SET code = excluded.code",
                (&student_id, &cycle_id, &day_text, c.as_str()),
            )
            .map_err(|e| {
                HandlerErr::new("db_update_failed", e.to_string())
                    .with_details(json!({ "table": "attendance_days" }))
            })?;
        }
    }
    Ok(json!({
        "ok": true,
        "date": day_text,
        "code": code.map(|c| c.as_str())
    }))
}

fn attendance_summary(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let cycle_id = required_str(params, "cycleId")?;
    require_row(conn, "students", &student_id, "student")?;
    require_row(conn, "cycles", &cycle_id, "cycle")?;

    let cfg = config::load_attendance(conn).map_err(HandlerErr::query)?;
    let days = report::load_attendance_days(conn, &student_id, &cycle_id)?;
    let summary = attendance::summarize(&days, &cfg.rules());
    serde_json::to_value(summary).map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let run: fn(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr> =
        match req.method.as_str() {
            "attendance.set" => attendance_set,
            "attendance.summary" => attendance_summary,
            _ => return None,
        };
    let result = db_conn(state).and_then(|conn| run(conn, &req.params));
    Some(respond(&req.id, result))
}
