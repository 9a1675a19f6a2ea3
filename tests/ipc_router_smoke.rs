mod test_support;

use serde_json::json;
use test_support::{request, request_err_code, request_ok, send_line, spawn_sidecar, temp_dir};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("boletind-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health.get("version").and_then(|v| v.as_str()).is_some());
    assert!(health.get("workspacePath").map(|v| v.is_null()).unwrap_or(false));
    assert!(health["counts"].is_null());

    // Pure normalization works before a workspace is open.
    let canon = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "subjects.normalizeName",
        json!({ "name": "  prácticas del lenguaje " }),
    );
    assert_eq!(canon["canonicalName"], json!("PRÁCTICAS DEL LENGUAJE"));

    let code = request_err_code(&mut stdin, &mut reader, "3", "students.list", json!({}));
    assert_eq!(code, "no_workspace");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4a",
        "students.upsert",
        json!({ "lastName": "Paz", "firstName": "Ana", "currentYear": 1 }),
    );
    let health = request_ok(&mut stdin, &mut reader, "4b", "health", json!({}));
    assert_eq!(health["dbFile"], json!("boletines.sqlite3"));
    assert_eq!(
        health["counts"],
        json!({ "students": 1, "cycles": 0, "subjects": 0, "groups": 0 })
    );

    for (i, method) in [
        "students.list",
        "cycles.list",
        "subjects.list",
        "locks.get",
        "setup.get",
    ]
    .iter()
    .enumerate()
    {
        let id = format!("5-{}", i);
        let value = request(&mut stdin, &mut reader, &id, method, json!({}));
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            value
        );
    }

    // Handlers reached with missing params answer bad_params, never not_implemented.
    for (i, method) in [
        "grades.upsert",
        "grades.list",
        "bimesters.set",
        "groups.create",
        "groups.list",
        "groups.setAssessment",
        "locks.check",
        "attendance.set",
        "attendance.summary",
        "reports.boletinModel",
        "reports.courseBoletines",
    ]
    .iter()
    .enumerate()
    {
        let id = format!("6-{}", i);
        let code = request_err_code(&mut stdin, &mut reader, &id, method, json!({}));
        assert_eq!(code, "bad_params", "{}", method);
    }

    let code = request_err_code(&mut stdin, &mut reader, "7", "grid.get", json!({}));
    assert_eq!(code, "not_implemented");

    let bad = send_line(&mut stdin, &mut reader, "{not json");
    assert_eq!(bad["ok"], json!(false));
    assert_eq!(bad["error"]["code"], json!("bad_json"));

    // Sidecar keeps serving after a malformed line.
    let _ = request_ok(&mut stdin, &mut reader, "8", "health", json!({}));

    drop(stdin);
    let _ = child.wait();
}
