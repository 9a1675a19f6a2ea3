use crate::ipc::helpers::{
    db_conn, optional_str, required_i64_range, required_str, require_row, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::report::{self, BoletinModel};
use rusqlite::Connection;
use serde_json::json;

fn model_json(model: &BoletinModel) -> Result<serde_json::Value, HandlerErr> {
    serde_json::to_value(model).map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))
}

fn boletin_model(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let cycle_id = required_str(params, "cycleId")?;
    let model = report::build_boletin(conn, &student_id, &cycle_id)?;
    model_json(&model)
}

fn course_boletines(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let cycle_id = required_str(params, "cycleId")?;
    let current_year = required_i64_range(params, "currentYear", 1, 7)?;
    let division = optional_str(params, "division")?.filter(|s| !s.is_empty());
    require_row(conn, "cycles", &cycle_id, "cycle")?;

    let student_ids = report::course_student_ids(conn, current_year, division.as_deref())?;
    let mut boletines = Vec::with_capacity(student_ids.len());
    for student_id in &student_ids {
        let model = report::build_boletin(conn, student_id, &cycle_id)?;
        boletines.push(model_json(&model)?);
    }
    tracing::info!(
        cycle_id = %cycle_id,
        current_year,
        students = boletines.len(),
        "course boletines assembled"
    );
    Ok(json!({
        "cycleId": cycle_id,
        "currentYear": current_year,
        "division": division,
        "boletines": boletines
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let run: fn(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr> =
        match req.method.as_str() {
            "reports.boletinModel" => boletin_model,
            "reports.courseBoletines" => course_boletines,
            _ => return None,
        };
    let result = db_conn(state).and_then(|conn| run(conn, &req.params));
    Some(respond(&req.id, result))
}
