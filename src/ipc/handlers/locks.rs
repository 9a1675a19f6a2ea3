use crate::db;
use crate::ipc::handlers::grades::load_lock_config;
use crate::ipc::helpers::{db_conn, required_role, required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::locks::{self, FieldLock, GradeField, Role};
use rusqlite::Connection;
use serde_json::json;

fn lock_view(config: &locks::LockConfig) -> serde_json::Value {
    let fields: Vec<serde_json::Value> = locks::GRADE_FIELDS
        .iter()
        .map(|f| {
            let lock = config.fields.get(f.key()).cloned().unwrap_or_default();
            json!({
                "field": f.key(),
                "locked": lock.locked,
                "exemptRoles": lock.exempt_roles
            })
        })
        .collect();
    json!({ "fields": fields })
}

fn parse_field(raw: &str) -> Result<GradeField, HandlerErr> {
    GradeField::parse(raw).ok_or_else(|| {
        HandlerErr::bad_params(format!("unknown field: {}", raw)).with_details(json!({ "field": raw }))
    })
}

fn parse_lock(field: &str, raw: &serde_json::Value) -> Result<FieldLock, HandlerErr> {
    let Some(obj) = raw.as_object() else {
        return Err(HandlerErr::bad_params(format!("{} must be an object or null", field)));
    };
    let locked = match obj.get("locked") {
        Some(serde_json::Value::Bool(b)) => *b,
        None => true,
        Some(_) => {
            return Err(HandlerErr::bad_params(format!("{}.locked must be boolean", field)))
        }
    };
    let mut exempt_roles: Vec<Role> = Vec::new();
    if let Some(v) = obj.get("exemptRoles") {
        let Some(arr) = v.as_array() else {
            return Err(HandlerErr::bad_params(format!("{}.exemptRoles must be an array", field)));
        };
        for r in arr {
            let role = r.as_str().and_then(Role::parse).ok_or_else(|| {
                HandlerErr::bad_params(format!("{}.exemptRoles has an unknown role", field))
                    .with_details(json!({ "role": r }))
            })?;
            if !exempt_roles.contains(&role) {
                exempt_roles.push(role);
            }
        }
    }
    Ok(FieldLock {
        locked,
        exempt_roles,
    })
}

fn locks_get(conn: &Connection, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let config = load_lock_config(conn)?;
    Ok(lock_view(&config))
}

fn locks_update(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let Some(patch) = params.get("fields").and_then(|v| v.as_object()) else {
        return Err(HandlerErr::bad_params("missing fields object"));
    };
    let mut config = load_lock_config(conn)?;
    for (key, raw) in patch {
        let field = parse_field(key)?;
        if raw.is_null() {
            config.fields.remove(field.key());
        } else {
            config
                .fields
                .insert(field.key().to_string(), parse_lock(key, raw)?);
        }
    }
    let value = serde_json::to_value(&config)
        .map_err(|e| HandlerErr::new("db_update_failed", e.to_string()))?;
    db::settings_set_json(conn, locks::SETTINGS_KEY, &value)
        .map_err(|e| HandlerErr::new("db_update_failed", e.to_string()))?;
    tracing::info!(changed = patch.len(), "field locks updated");
    Ok(lock_view(&config))
}

fn locks_check(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let field = parse_field(&required_str(params, "field")?)?;
    let role = required_role(params)?;
    let config = load_lock_config(conn)?;
    Ok(json!({
        "field": field.key(),
        "editable": locks::is_editable(&config, field, role)
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let run: fn(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr> =
        match req.method.as_str() {
            "locks.get" => locks_get,
            "locks.update" => locks_update,
            "locks.check" => locks_check,
            _ => return None,
        };
    let result = db_conn(state).and_then(|conn| run(conn, &req.params));
    Some(respond(&req.id, result))
}
