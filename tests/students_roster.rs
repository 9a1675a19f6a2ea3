mod test_support;

use serde_json::json;
use test_support::{request_err_code, request_ok, spawn_sidecar, temp_dir};

#[test]
fn student_params_are_typed_and_roster_follows_sort_order() {
    let workspace = temp_dir("boletind-students-roster");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "2",
        "students.upsert",
        json!({ "lastName": "Vera", "firstName": "Ema", "currentYear": 5, "sortOrder": "3" }),
    );
    assert_eq!(code, "bad_params");
    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "3",
        "students.list",
        json!({ "currentYear": "5" }),
    );
    assert_eq!(code, "bad_params");

    for (i, (last, order)) in [("Vera", 2), ("Acosta", 1)].iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("s{}", i),
            "students.upsert",
            json!({ "lastName": last, "firstName": "Ema", "currentYear": 5, "sortOrder": order }),
        );
    }
    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.list",
        json!({ "currentYear": 5 }),
    );
    let names: Vec<&str> = listed["students"]
        .as_array()
        .expect("students")
        .iter()
        .map(|s| s["lastName"].as_str().expect("lastName"))
        .collect();
    assert_eq!(names, vec!["Acosta", "Vera"]);
    assert_eq!(listed["students"][0]["sortOrder"], json!(1));

    drop(stdin);
    let _ = child.wait();
}
