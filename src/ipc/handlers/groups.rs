use crate::ipc::helpers::{
    db_conn, optional_str, parse_grade_value, parse_label_value, required_i64_range, required_str,
    require_row, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::report;
use crate::subjects::normalize_subject_name;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeSet;
use uuid::Uuid;

fn member_ids(params: &serde_json::Value) -> Result<Vec<String>, HandlerErr> {
    let Some(arr) = params.get("memberSubjectIds").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::bad_params("missing memberSubjectIds"));
    };
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(arr.len());
    for v in arr {
        let Some(id) = v.as_str().map(str::trim).filter(|s| !s.is_empty()) else {
            return Err(HandlerErr::bad_params("memberSubjectIds must be non-empty strings"));
        };
        if seen.insert(id.to_string()) {
            out.push(id.to_string());
        }
    }
    if out.is_empty() {
        return Err(HandlerErr::bad_params("memberSubjectIds must not be empty"));
    }
    Ok(out)
}

fn groups_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let cycle_id = required_str(params, "cycleId")?;
    let name = required_str(params, "name")?;
    let code = optional_str(params, "code")?.filter(|s| !s.is_empty());
    let year = required_i64_range(params, "year", 1, 7)?;
    let members = member_ids(params)?;

    require_row(conn, "cycles", &cycle_id, "cycle")?;
    for subject_id in &members {
        require_row(conn, "subjects", subject_id, "subject")?;
    }

    // A subject may belong to at most one active group per cycle.
    let mut conflict_stmt = conn
        .prepare(
            "SELECT g.id, g.name
             FROM subject_group_members m
             JOIN subject_groups g ON g.id = m.group_id
             WHERE g.cycle_id = ? AND g.active = 1 AND m.subject_id = ?
             LIMIT 1",
        )
        .map_err(HandlerErr::query)?;
    for subject_id in &members {
        let hit: Option<(String, String)> = conflict_stmt
            .query_row((&cycle_id, subject_id), |r| Ok((r.get(0)?, r.get(1)?)))
            .optional()
            .map_err(HandlerErr::query)?;
        if let Some((group_id, group_name)) = hit {
            return Err(HandlerErr::new(
                "group_conflict",
                "subject already belongs to another group in this cycle",
            )
            .with_details(json!({
                "subjectId": subject_id,
                "groupId": group_id,
                "groupName": group_name
            })));
        }
    }

    let group_id = Uuid::new_v4().to_string();
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    tx.execute(
        "INSERT INTO subject_groups(id, cycle_id, name, code, year, active)
         VALUES(?, ?, ?, ?, ?, 1)",
        (&group_id, &cycle_id, &name, &code, year),
    )
    .map_err(|e| {
        HandlerErr::new("db_insert_failed", e.to_string())
            .with_details(json!({ "table": "subject_groups" }))
    })?;
    for subject_id in &members {
        tx.execute(
            "INSERT INTO subject_group_members(group_id, subject_id) VALUES(?, ?)",
            (&group_id, subject_id),
        )
        .map_err(|e| {
            HandlerErr::new("db_insert_failed", e.to_string())
                .with_details(json!({ "table": "subject_group_members" }))
        })?;
    }
    tx.commit()
        .map_err(|e| HandlerErr::new("db_commit_failed", e.to_string()))?;

    tracing::info!(group_id = %group_id, members = members.len(), "subject group created");
    Ok(json!({ "groupId": group_id }))
}

fn groups_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let cycle_id = required_str(params, "cycleId")?;
    let groups = report::load_groups(conn, &cycle_id)?;

    let mut name_stmt = conn
        .prepare("SELECT name FROM subjects WHERE id = ?")
        .map_err(HandlerErr::query)?;
    let mut out = Vec::with_capacity(groups.len());
    for g in groups {
        let mut member_names = Vec::with_capacity(g.member_subject_ids.len());
        for subject_id in &g.member_subject_ids {
            let name: Option<String> = name_stmt
                .query_row([subject_id], |r| r.get(0))
                .optional()
                .map_err(HandlerErr::query)?;
            if let Some(name) = name {
                member_names.push(normalize_subject_name(&name));
            }
        }
        member_names.sort();
        out.push(json!({
            "id": g.id,
            "name": g.name,
            "code": g.code,
            "year": g.year,
            "memberSubjectIds": g.member_subject_ids,
            "memberNames": member_names
        }));
    }
    Ok(json!({ "groups": out }))
}

fn groups_set_assessment(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let group_id = required_str(params, "groupId")?;
    let student_id = required_str(params, "studentId")?;
    let quarter = required_i64_range(params, "quarter", 1, 2)?;
    let calificacion = match params.get("calificacion") {
        None => None,
        Some(raw) => parse_grade_value(raw, "calificacion")?,
    };
    let valoracion = match params.get("valoracion") {
        None => None,
        Some(raw) => parse_label_value(raw, "valoracion")?,
    };

    require_row(conn, "subject_groups", &group_id, "group")?;
    require_row(conn, "students", &student_id, "student")?;

    if calificacion.is_none() && valoracion.is_none() {
        conn.execute(
            "DELETE FROM group_assessments WHERE group_id = ? AND student_id = ? AND quarter = ?",
            (&group_id, &student_id, quarter),
        )
        .map_err(|e| {
            HandlerErr::new("db_update_failed", e.to_string())
                .with_details(json!({ "table": "group_assessments" }))
        })?;
        return Ok(json!({ "ok": true, "cleared": true }));
    }

    conn.execute(
        "INSERT INTO group_assessments(group_id, student_id, quarter, calificacion, valoracion)
         VALUES(?, ?, ?, ?, ?)
         ON CONFLICT(group_id, student_id, quarter) DO UPDATE SET
           calificacion = excluded.calificacion,
           valoracion = excluded.valoracion",
        (
            &group_id,
            &student_id,
            quarter,
            calificacion,
            valoracion.map(|v| v.as_str()),
        ),
    )
    .map_err(|e| {
        HandlerErr::new("db_update_failed", e.to_string())
            .with_details(json!({ "table": "group_assessments" }))
    })?;
    Ok(json!({ "ok": true, "cleared": false }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let run: fn(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr> =
        match req.method.as_str() {
            "groups.create" => groups_create,
            "groups.list" => groups_list,
            "groups.setAssessment" => groups_set_assessment,
            _ => return None,
        };
    let result = db_conn(state).and_then(|conn| run(conn, &req.params));
    Some(respond(&req.id, result))
}
