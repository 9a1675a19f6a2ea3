use crate::ipc::helpers::{
    db_conn, optional_bool, optional_i64, optional_str, required_i64_range, required_str, respond,
    HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn students_upsert(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = optional_str(params, "id")?.filter(|s| !s.is_empty());
    let last_name = required_str(params, "lastName")?;
    let first_name = required_str(params, "firstName")?;
    let document_no = optional_str(params, "documentNo")?;
    let current_year = required_i64_range(params, "currentYear", 1, 7)?;
    let division = optional_str(params, "division")?;
    let active = optional_bool(params, "active")?.unwrap_or(true);
    let sort_order = optional_i64(params, "sortOrder")?.unwrap_or(0);

    let student_id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
    conn.execute(
        "INSERT INTO students(id, last_name, first_name, document_no, current_year, division, active, sort_order)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
           last_name = excluded.last_name,
           first_name = excluded.first_name,
           document_no = excluded.document_no,
           current_year = excluded.current_year,
           division = excluded.division,
           active = excluded.active,
           sort_order = excluded.sort_order",
        (
            &student_id,
            &last_name,
            &first_name,
            &document_no,
            current_year,
            &division,
            active as i64,
            sort_order,
        ),
    )
    .map_err(|e| {
        HandlerErr::new("db_insert_failed", e.to_string()).with_details(json!({ "table": "students" }))
    })?;

    Ok(json!({ "studentId": student_id }))
}

fn students_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let year_filter = optional_i64(params, "currentYear")?;
    let division_filter = optional_str(params, "division")?;

    let mut stmt = conn
        .prepare(
            "SELECT id, last_name, first_name, document_no, current_year, division, active, sort_order
             FROM students
             ORDER BY current_year, division, sort_order, last_name, first_name",
        )
        .map_err(HandlerErr::query)?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, Option<String>>(3)?,
                r.get::<_, i64>(4)?,
                r.get::<_, Option<String>>(5)?,
                r.get::<_, i64>(6)? != 0,
                r.get::<_, i64>(7)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::query)?;

    let students: Vec<serde_json::Value> = rows
        .into_iter()
        .filter(|row| year_filter.map(|y| row.4 == y).unwrap_or(true))
        .filter(|row| {
            division_filter
                .as_deref()
                .map(|d| row.5.as_deref().map(|x| x.eq_ignore_ascii_case(d)) == Some(true))
                .unwrap_or(true)
        })
        .map(
            |(id, last, first, document_no, current_year, division, active, sort_order)| {
                json!({
                    "id": id,
                    "displayName": format!("{}, {}", last, first),
                    "lastName": last,
                    "firstName": first,
                    "documentNo": document_no,
                    "currentYear": current_year,
                    "division": division,
                    "active": active,
                    "sortOrder": sort_order
                })
            },
        )
        .collect();
    Ok(json!({ "students": students }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let run: fn(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr> =
        match req.method.as_str() {
            "students.upsert" => students_upsert,
            "students.list" => students_list,
            _ => return None,
        };
    let result = db_conn(state).and_then(|conn| run(conn, &req.params));
    Some(respond(&req.id, result))
}
