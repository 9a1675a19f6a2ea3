use crate::db;
use crate::ipc::helpers::{
    db_conn, optional_bool, optional_str, parse_grade_value, parse_label_value,
    required_i64_range, required_role, required_str, require_row, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::locks::{self, GradeField, LockConfig, Role, GRADE_FIELDS};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde_json::json;
use uuid::Uuid;

pub(crate) fn load_lock_config(conn: &Connection) -> Result<LockConfig, HandlerErr> {
    let raw = db::settings_get_json(conn, locks::SETTINGS_KEY).map_err(HandlerErr::query)?;
    match raw {
        None => Ok(LockConfig::default()),
        Some(v) => serde_json::from_value(v).map_err(|e| {
            HandlerErr::new("db_query_failed", format!("stored lock config is invalid: {}", e))
        }),
    }
}

fn ensure_editable(conn: &Connection, fields: &[GradeField], role: Role) -> Result<(), HandlerErr> {
    if fields.is_empty() {
        return Ok(());
    }
    let config = load_lock_config(conn)?;
    let blocked = locks::locked_fields(&config, fields, role);
    if blocked.is_empty() {
        return Ok(());
    }
    let keys: Vec<&str> = blocked.iter().map(|f| f.key()).collect();
    Err(HandlerErr::new("field_locked", "one or more fields are locked for this role")
        .with_details(json!({ "fields": keys })))
}

fn edit_value(field: GradeField, raw: &serde_json::Value) -> Result<Value, HandlerErr> {
    let key = field.key();
    Ok(match field {
        GradeField::Valoracion1c | GradeField::Valoracion2c => {
            match parse_label_value(raw, key)? {
                Some(v) => Value::Text(v.as_str().to_string()),
                None => Value::Null,
            }
        }
        GradeField::Observaciones => match raw {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::String(s) if s.trim().is_empty() => Value::Null,
            serde_json::Value::String(s) => Value::Text(s.trim().to_string()),
            _ => {
                return Err(HandlerErr::bad_params(format!(
                    "{} must be string or null",
                    key
                )))
            }
        },
        _ => match parse_grade_value(raw, key)? {
            Some(n) => Value::Integer(n),
            None => Value::Null,
        },
    })
}

fn grades_upsert(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let cycle_id = required_str(params, "cycleId")?;
    let subject_id = required_str(params, "subjectId")?;
    let role = required_role(params)?;
    let is_repeating = optional_bool(params, "isRepeating")?;

    require_row(conn, "students", &student_id, "student")?;
    require_row(conn, "cycles", &cycle_id, "cycle")?;
    require_row(conn, "subjects", &subject_id, "subject")?;

    let mut edits: Vec<(GradeField, Value)> = Vec::new();
    for field in GRADE_FIELDS.iter().copied() {
        if field.column().is_none() {
            continue;
        }
        if let Some(raw) = params.get(field.key()) {
            edits.push((field, edit_value(field, raw)?));
        }
    }
    let touched: Vec<GradeField> = edits.iter().map(|(f, _)| *f).collect();
    ensure_editable(conn, &touched, role)?;

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    tx.execute(
        "INSERT INTO subject_grades(id, student_id, cycle_id, subject_id)
         VALUES(?, ?, ?, ?)
         ON CONFLICT(student_id, cycle_id, subject_id) DO NOTHING",
        (Uuid::new_v4().to_string(), &student_id, &cycle_id, &subject_id),
    )
    .map_err(|e| {
        HandlerErr::new("db_insert_failed", e.to_string())
            .with_details(json!({ "table": "subject_grades" }))
    })?;

    let mut sets: Vec<String> = Vec::new();
    let mut binds: Vec<Value> = Vec::new();
    for (field, value) in edits {
        if let Some(col) = field.column() {
            sets.push(format!("{} = ?", col));
            binds.push(value);
        }
    }
    if let Some(flag) = is_repeating {
        sets.push("is_repeating = ?".to_string());
        binds.push(Value::Integer(flag as i64));
    }
    sets.push("updated_at = ?".to_string());
    binds.push(Value::Text(chrono::Utc::now().to_rfc3339()));
    binds.push(Value::Text(student_id.clone()));
    binds.push(Value::Text(cycle_id.clone()));
    binds.push(Value::Text(subject_id.clone()));

    let sql = format!(
        "UPDATE subject_grades SET {} WHERE student_id = ? AND cycle_id = ? AND subject_id = ?",
        sets.join(", ")
    );
    tx.execute(&sql, params_from_iter(binds)).map_err(|e| {
        HandlerErr::new("db_update_failed", e.to_string())
            .with_details(json!({ "table": "subject_grades" }))
    })?;
    tx.commit()
        .map_err(|e| HandlerErr::new("db_commit_failed", e.to_string()))?;

    let updated: Vec<&str> = touched.iter().map(|f| f.key()).collect();
    Ok(json!({ "ok": true, "updated": updated }))
}

fn grades_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let cycle_id = required_str(params, "cycleId")?;
    require_row(conn, "students", &student_id, "student")?;

    let mut stmt = conn
        .prepare(
            "SELECT g.subject_id, s.name, s.year, g.is_repeating,
                    g.valoracion_1c, g.calificacion_1c, g.valoracion_2c, g.calificacion_2c,
                    g.intensificacion_1c, g.intensificacion_dic, g.intensificacion_feb,
                    g.calificacion_final, g.observaciones, g.updated_at
             FROM subject_grades g
             JOIN subjects s ON s.id = g.subject_id
             WHERE g.student_id = ? AND g.cycle_id = ?
             ORDER BY s.year, s.name",
        )
        .map_err(HandlerErr::query)?;
    let grades = stmt
        .query_map((&student_id, &cycle_id), |r| {
            Ok(json!({
                "subjectId": r.get::<_, String>(0)?,
                "subjectName": r.get::<_, String>(1)?,
                "year": r.get::<_, i64>(2)?,
                "isRepeating": r.get::<_, i64>(3)? != 0,
                "valoracion1c": r.get::<_, Option<String>>(4)?,
                "calificacion1c": r.get::<_, Option<i64>>(5)?,
                "valoracion2c": r.get::<_, Option<String>>(6)?,
                "calificacion2c": r.get::<_, Option<i64>>(7)?,
                "intensificacion1c": r.get::<_, Option<i64>>(8)?,
                "intensificacionDic": r.get::<_, Option<i64>>(9)?,
                "intensificacionFeb": r.get::<_, Option<i64>>(10)?,
                "calificacionFinal": r.get::<_, Option<i64>>(11)?,
                "observaciones": r.get::<_, Option<String>>(12)?,
                "updatedAt": r.get::<_, Option<String>>(13)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::query)?;
    Ok(json!({ "grades": grades }))
}

fn bimesters_set(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let cycle_id = required_str(params, "cycleId")?;
    let subject_id = required_str(params, "subjectId")?;
    let bimester = required_i64_range(params, "bimester", 1, 4)?;
    let role = required_role(params)?;

    require_row(conn, "students", &student_id, "student")?;
    require_row(conn, "cycles", &cycle_id, "cycle")?;
    require_row(conn, "subjects", &subject_id, "subject")?;

    let valoracion = match params.get("valoracion") {
        None => None,
        Some(raw) => parse_label_value(raw, "valoracion")?,
    };
    let observacion = optional_str(params, "observacion")?.filter(|s| !s.is_empty());

    ensure_editable(conn, &[GradeField::Bimestre(bimester as u8)], role)?;

    conn.execute(
        "INSERT INTO bimester_assessments(student_id, cycle_id, subject_id, bimester, valoracion, observacion)
         VALUES(?, ?, ?, ?, ?, ?)
         ON CONFLICT(student_id, cycle_id, subject_id, bimester) DO UPDATE SET
           valoracion = excluded.valoracion,
           observacion = excluded.observacion",
        (
            &student_id,
            &cycle_id,
            &subject_id,
            bimester,
            valoracion.map(|v| v.as_str()),
            &observacion,
        ),
    )
    .map_err(|e| {
        HandlerErr::new("db_update_failed", e.to_string())
            .with_details(json!({ "table": "bimester_assessments" }))
    })?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let run: fn(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr> =
        match req.method.as_str() {
            "grades.upsert" => grades_upsert,
            "grades.list" => grades_list,
            "bimesters.set" => bimesters_set,
            _ => return None,
        };
    let result = db_conn(state).and_then(|conn| run(conn, &req.params));
    Some(respond(&req.id, result))
}
