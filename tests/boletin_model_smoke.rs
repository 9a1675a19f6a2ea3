mod test_support;

use serde_json::json;
use test_support::{open_workspace_with_cycle, request_ok, spawn_sidecar, str_field};

#[test]
fn boletin_model_orders_current_rows_then_repeated_ones() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let cycle_id = open_workspace_with_cycle(&mut stdin, &mut reader, "boletind-boletin-model");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "setup",
        "setup.update",
        json!({ "section": "reports", "patch": { "schoolName": "EEST N° 1" } }),
    );

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "s1",
        "students.upsert",
        json!({
            "lastName": "Gómez",
            "firstName": "Ana",
            "documentNo": "40111222",
            "currentYear": 4,
            "division": "A"
        }),
    );
    let student_id = str_field(&student, "studentId");

    let mut subject = |id: &str, name: &str, year: i64| -> String {
        let created = request_ok(
            &mut stdin,
            &mut reader,
            id,
            "subjects.upsert",
            json!({ "name": name, "year": year }),
        );
        str_field(&created, "subjectId")
    };
    let ed_fisica = subject("m1", "Ed. Fisica", 4);
    let literatura = subject("m2", "literatura", 4);
    let matematica = subject("m3", "Matematica", 3);
    let historia = subject("m4", "Historia", 3);

    let grades = [
        json!({ "subjectId": ed_fisica, "calificacion1c": 8 }),
        json!({ "subjectId": literatura, "calificacion1c": 9, "valoracion1c": "TED" }),
        json!({ "subjectId": matematica, "calificacion1c": 5, "isRepeating": true }),
        json!({ "subjectId": historia, "calificacion1c": 3 }),
    ];
    for (i, g) in grades.iter().enumerate() {
        let mut params = g.clone();
        params["studentId"] = json!(student_id);
        params["cycleId"] = json!(cycle_id);
        params["role"] = json!("profesor");
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("g{}", i),
            "grades.upsert",
            params,
        );
    }

    let model = request_ok(
        &mut stdin,
        &mut reader,
        "model",
        "reports.boletinModel",
        json!({ "studentId": student_id, "cycleId": cycle_id }),
    );

    assert_eq!(model["schoolName"], json!("EEST N° 1"));
    assert_eq!(model["student"]["displayName"], json!("Gómez, Ana"));
    assert_eq!(model["cycle"]["label"], json!("Ciclo 2025"));

    let rows = model["rows"].as_array().expect("rows");
    let names: Vec<&str> = rows
        .iter()
        .map(|r| r["name"].as_str().expect("name"))
        .collect();
    assert_eq!(
        names,
        vec!["LITERATURA", "EDUCACIÓN FÍSICA", "HISTORIA", "MATEMÁTICA"]
    );

    // Explicit label wins over the grade.
    assert_eq!(rows[0]["valoracion1c"], json!("TED"));
    assert_eq!(rows[0]["beingRepeated"], json!(false));
    // Missing label derived from the grade.
    assert_eq!(rows[1]["valoracion1c"], json!("TEA"));
    assert_eq!(rows[1]["calificacion1c"], json!(8));
    assert_eq!(rows[1]["display"]["valoracion2c"], json!("-"));
    assert_eq!(rows[1]["display"]["calificacionFinal"], json!("-"));

    // Earlier-year rows: flagged repeating vs still pending.
    assert_eq!(rows[2]["beingRepeated"], json!(true));
    assert_eq!(rows[2]["pending"], json!(true));
    assert_eq!(rows[2]["valoracion1c"], json!("TED"));
    assert_eq!(rows[3]["beingRepeated"], json!(true));
    assert_eq!(rows[3]["pending"], json!(false));
    assert_eq!(rows[3]["valoracion1c"], json!("TEP"));

    assert!(model["attendance"]["cycle"]["attendancePercent"].is_null());

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn course_boletines_cover_every_active_student_of_the_division() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let cycle_id = open_workspace_with_cycle(&mut stdin, &mut reader, "boletind-course-boletines");

    for (i, (last, division, active)) in [
        ("Alvarez", "A", true),
        ("Benítez", "A", true),
        ("Castro", "B", true),
        ("Duarte", "A", false),
    ]
    .iter()
    .enumerate()
    {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("s{}", i),
            "students.upsert",
            json!({
                "lastName": last,
                "firstName": "X",
                "currentYear": 2,
                "division": division,
                "active": active,
                "sortOrder": i
            }),
        );
    }

    let course = request_ok(
        &mut stdin,
        &mut reader,
        "course",
        "reports.courseBoletines",
        json!({ "cycleId": cycle_id, "currentYear": 2, "division": "a" }),
    );
    let boletines = course["boletines"].as_array().expect("boletines");
    let names: Vec<&str> = boletines
        .iter()
        .map(|b| b["student"]["displayName"].as_str().expect("displayName"))
        .collect();
    assert_eq!(names, vec!["Alvarez, X", "Benítez, X"]);
    assert!(boletines.iter().all(|b| b["rows"].as_array().map(|r| r.is_empty()) == Some(true)));

    drop(stdin);
    let _ = child.wait();
}
