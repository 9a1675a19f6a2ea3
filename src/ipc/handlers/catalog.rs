use crate::ipc::helpers::{
    db_conn, optional_i64, optional_str, required_i64_range, required_str, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::subjects::normalize_subject_name;
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn cycles_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let label = required_str(params, "label")?;
    let year = required_i64_range(params, "year", 1900, 2999)?;
    let cycle_id = optional_str(params, "id")?
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    conn.execute(
        "INSERT INTO cycles(id, label, year) VALUES(?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET label = excluded.label, year = excluded.year",
        (&cycle_id, &label, year),
    )
    .map_err(|e| {
        HandlerErr::new("db_insert_failed", e.to_string()).with_details(json!({ "table": "cycles" }))
    })?;
    Ok(json!({ "cycleId": cycle_id }))
}

fn cycles_list(conn: &Connection, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare("SELECT id, label, year FROM cycles ORDER BY year DESC, label")
        .map_err(HandlerErr::query)?;
    let cycles = stmt
        .query_map([], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "label": r.get::<_, String>(1)?,
                "year": r.get::<_, i64>(2)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::query)?;
    Ok(json!({ "cycles": cycles }))
}

fn subjects_upsert(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = required_str(params, "name")?;
    let code = optional_str(params, "code")?.filter(|s| !s.is_empty());
    let year = required_i64_range(params, "year", 1, 7)?;
    let subject_id = optional_str(params, "id")?
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    conn.execute(
        "INSERT INTO subjects(id, name, code, year) VALUES(?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           code = excluded.code,
           year = excluded.year",
        (&subject_id, &name, &code, year),
    )
    .map_err(|e| {
        HandlerErr::new("db_insert_failed", e.to_string()).with_details(json!({ "table": "subjects" }))
    })?;
    Ok(json!({
        "subjectId": subject_id,
        "canonicalName": normalize_subject_name(&name)
    }))
}

fn subjects_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let year_filter = optional_i64(params, "year")?;
    let mut stmt = conn
        .prepare("SELECT id, name, code, year FROM subjects ORDER BY year, name, id")
        .map_err(HandlerErr::query)?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, Option<String>>(2)?,
                r.get::<_, i64>(3)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::query)?;
    let subjects: Vec<serde_json::Value> = rows
        .into_iter()
        .filter(|(_, _, _, year)| year_filter.map(|y| y == *year).unwrap_or(true))
        .map(|(id, name, code, year)| {
            json!({
                "id": id,
                "canonicalName": normalize_subject_name(&name),
                "name": name,
                "code": code,
                "year": year
            })
        })
        .collect();
    Ok(json!({ "subjects": subjects }))
}

fn subjects_normalize_name(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = params
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::bad_params("missing name"))?;
    Ok(json!({ "canonicalName": normalize_subject_name(name) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    // Pure lookup; works before a workspace is selected.
    if req.method == "subjects.normalizeName" {
        return Some(respond(&req.id, subjects_normalize_name(&req.params)));
    }
    let run: fn(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr> =
        match req.method.as_str() {
            "cycles.create" => cycles_create,
            "cycles.list" => cycles_list,
            "subjects.upsert" => subjects_upsert,
            "subjects.list" => subjects_list,
            _ => return None,
        };
    let result = db_conn(state).and_then(|conn| run(conn, &req.params));
    Some(respond(&req.id, result))
}
