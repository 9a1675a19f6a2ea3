mod test_support;

use serde_json::json;
use test_support::{request_err_code, request_ok, spawn_sidecar, temp_dir};

#[test]
fn setup_sections_default_validate_and_persist() {
    let workspace = temp_dir("boletind-setup");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let setup = request_ok(&mut stdin, &mut reader, "2", "setup.get", json!({}));
    assert_eq!(setup["attendance"]["q2StartMonth"], json!(8));
    assert_eq!(setup["attendance"]["lateWeight"], json!(0.5));
    assert_eq!(setup["reports"]["schoolName"], json!(""));
    assert_eq!(setup["reports"]["showObservations"], json!(true));
    assert_eq!(setup["reports"]["missingLabel"], json!("-"));

    let rejected = [
        ("attendance", json!({ "q2StartMonth": 0 })),
        ("attendance", json!({ "lateWeight": 1.5 })),
        ("attendance", json!({ "schoolYearStartMonth": 9 })),
        ("reports", json!({ "missingLabel": "none" })),
        ("reports", json!({ "showObservations": "yes" })),
        ("reports", json!({ "schoolName": "x".repeat(121) })),
        ("printer", json!({ "fontScale": 100 })),
    ];
    for (i, (section, patch)) in rejected.iter().enumerate() {
        let code = request_err_code(
            &mut stdin,
            &mut reader,
            &format!("bad{}", i),
            "setup.update",
            json!({ "section": section, "patch": patch }),
        );
        assert_eq!(code, "bad_params", "{} {}", section, patch);
    }

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "setup.update",
        json!({
            "section": "reports",
            "patch": { "schoolName": "Escuela Técnica N° 2", "showObservations": false, "missingLabel": "s/d" }
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "setup.update",
        json!({ "section": "attendance", "patch": { "lateWeight": 0.25 } }),
    );

    drop(stdin);
    let _ = child.wait();

    // Settings live in the workspace database, so a fresh process sees them.
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let setup = request_ok(&mut stdin, &mut reader, "6", "setup.get", json!({}));
    assert_eq!(setup["reports"]["schoolName"], json!("Escuela Técnica N° 2"));
    assert_eq!(setup["reports"]["showObservations"], json!(false));
    assert_eq!(setup["reports"]["missingLabel"], json!("s/d"));
    assert_eq!(setup["attendance"]["lateWeight"], json!(0.25));
    assert_eq!(setup["attendance"]["q2StartMonth"], json!(8));

    drop(stdin);
    let _ = child.wait();
}
