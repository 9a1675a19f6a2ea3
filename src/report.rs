use crate::attendance::{self, AttendanceSummary, DayCode};
use crate::config;
use crate::model::{CycleHeader, GradeRecord, GroupAssessment, StudentHeader, SubjectGroup};
use crate::ordering::{classify_and_order, ReportEntry};
use crate::subjects::normalize_subject_name;
use crate::valoracion::{
    derive_assessment, derive_group_assessment, fill_assessment, group_final_grade, rounded_mean,
    weakest, Valoracion,
};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct ReportError {
    pub code: &'static str,
    pub message: String,
}

impl ReportError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

fn query_err(e: rusqlite::Error) -> ReportError {
    ReportError::new("db_query_failed", e.to_string())
}

/// One line of the report card: an individual subject or a subject group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub name: String,
    pub code: Option<String>,
    pub year: i64,
    pub is_group: bool,
    pub being_repeated: bool,
    pub pending: bool,
    #[serde(skip)]
    pub is_repeating: bool,
    #[serde(rename = "valoracion1c")]
    pub valoracion_1c: Option<Valoracion>,
    #[serde(rename = "calificacion1c")]
    pub calificacion_1c: Option<i64>,
    #[serde(rename = "valoracion2c")]
    pub valoracion_2c: Option<Valoracion>,
    #[serde(rename = "calificacion2c")]
    pub calificacion_2c: Option<i64>,
    pub bimestres: [Option<Valoracion>; 4],
    #[serde(rename = "intensificacion1c")]
    pub intensificacion_1c: Option<i64>,
    pub intensificacion_dic: Option<i64>,
    pub intensificacion_feb: Option<i64>,
    pub calificacion_final: Option<i64>,
    pub observaciones: Option<String>,
    pub members: Vec<String>,
}

impl ReportEntry for ReportRow {
    fn display_name(&self) -> &str {
        &self.name
    }
    fn curriculum_year(&self) -> i64 {
        self.year
    }
    fn is_group(&self) -> bool {
        self.is_group
    }
}

fn subject_row(rec: GradeRecord) -> ReportRow {
    ReportRow {
        name: normalize_subject_name(&rec.subject_name),
        code: rec.subject_code,
        year: rec.year_of_subject,
        is_group: false,
        being_repeated: false,
        pending: false,
        is_repeating: rec.is_repeating,
        valoracion_1c: fill_assessment(rec.valoracion_1c, rec.calificacion_1c),
        calificacion_1c: rec.calificacion_1c,
        valoracion_2c: fill_assessment(rec.valoracion_2c, rec.calificacion_2c),
        calificacion_2c: rec.calificacion_2c,
        bimestres: rec.bimestres,
        intensificacion_1c: rec.intensificacion_1c,
        intensificacion_dic: rec.intensificacion_dic,
        intensificacion_feb: rec.intensificacion_feb,
        calificacion_final: rec.calificacion_final,
        observaciones: rec.observaciones.filter(|o| !o.trim().is_empty()),
        members: Vec::new(),
    }
}

fn override_for<'a>(
    overrides: &'a [GroupAssessment],
    group_id: &str,
    quarter: u8,
) -> Option<&'a GroupAssessment> {
    overrides
        .iter()
        .find(|o| o.group_id == group_id && o.quarter == quarter)
}

fn group_row(group: &SubjectGroup, members: &[GradeRecord], overrides: &[GroupAssessment]) -> ReportRow {
    let q1_grades: Vec<Option<i64>> = members.iter().map(|m| m.calificacion_1c).collect();
    let q2_grades: Vec<Option<i64>> = members.iter().map(|m| m.calificacion_2c).collect();
    let o1 = override_for(overrides, &group.id, 1);
    let o2 = override_for(overrides, &group.id, 2);

    let calificacion_1c = o1
        .and_then(|o| o.calificacion)
        .or_else(|| rounded_mean(&q1_grades));
    let calificacion_2c = o2
        .and_then(|o| o.calificacion)
        .or_else(|| rounded_mean(&q2_grades));
    // A stored grade without a stored label speaks for the whole group.
    let valoracion_1c = o1
        .and_then(|o| o.valoracion.or_else(|| derive_assessment(o.calificacion)))
        .or_else(|| derive_group_assessment(&q1_grades));
    let valoracion_2c = o2
        .and_then(|o| o.valoracion.or_else(|| derive_assessment(o.calificacion)))
        .or_else(|| derive_group_assessment(&q2_grades));

    let mut bimestres = [None; 4];
    for (i, slot) in bimestres.iter_mut().enumerate() {
        *slot = weakest(members.iter().filter_map(|m| m.bimestres[i]));
    }

    let observaciones: Vec<&str> = members
        .iter()
        .filter_map(|m| m.observaciones.as_deref())
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .collect();

    let mut member_names: Vec<String> = members
        .iter()
        .map(|m| normalize_subject_name(&m.subject_name))
        .collect();
    member_names.sort();

    ReportRow {
        name: normalize_subject_name(&group.name),
        code: group.code.clone(),
        year: group.year,
        is_group: true,
        being_repeated: false,
        pending: false,
        is_repeating: false,
        valoracion_1c,
        calificacion_1c,
        valoracion_2c,
        calificacion_2c,
        bimestres,
        intensificacion_1c: None,
        intensificacion_dic: None,
        intensificacion_feb: None,
        calificacion_final: group_final_grade(calificacion_1c, calificacion_2c),
        observaciones: if observaciones.is_empty() {
            None
        } else {
            Some(observaciones.join("; "))
        },
        members: member_names,
    }
}

/// Turns a student's stored rows into the ordered report lines: grouped
/// subjects collapse into their group row, missing labels are derived and
/// everything is classified and sorted for the student's current year.
pub fn build_rows(
    records: Vec<GradeRecord>,
    groups: &[SubjectGroup],
    overrides: &[GroupAssessment],
    student_current_year: i64,
) -> Vec<ReportRow> {
    let mut group_of: HashMap<&str, usize> = HashMap::new();
    for (gi, g) in groups.iter().enumerate() {
        for sid in &g.member_subject_ids {
            group_of.entry(sid.as_str()).or_insert(gi);
        }
    }

    let mut members_by_group: Vec<Vec<GradeRecord>> = vec![Vec::new(); groups.len()];
    let mut rows: Vec<ReportRow> = Vec::new();
    for rec in records {
        match group_of.get(rec.subject_id.as_str()) {
            Some(gi) => members_by_group[*gi].push(rec),
            None => rows.push(subject_row(rec)),
        }
    }
    for (g, members) in groups.iter().zip(members_by_group.iter()) {
        if members.is_empty() {
            continue;
        }
        rows.push(group_row(g, members, overrides));
    }

    classify_and_order(rows, student_current_year)
        .into_iter()
        .map(|o| {
            let mut row = o.entry;
            row.being_repeated = o.being_repeated;
            row.pending = o.being_repeated && !row.is_repeating;
            row
        })
        .collect()
}

/// Renderer-facing strings for a row's labels and grades.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowDisplay {
    #[serde(rename = "valoracion1c")]
    pub valoracion_1c: String,
    #[serde(rename = "calificacion1c")]
    pub calificacion_1c: String,
    #[serde(rename = "valoracion2c")]
    pub valoracion_2c: String,
    #[serde(rename = "calificacion2c")]
    pub calificacion_2c: String,
    pub bimestres: Vec<String>,
    pub calificacion_final: String,
}

pub fn label_text(v: Option<Valoracion>, missing: &str) -> String {
    v.map(|v| v.as_str().to_string())
        .unwrap_or_else(|| missing.to_string())
}

pub fn grade_text(g: Option<i64>, missing: &str) -> String {
    g.map(|g| g.to_string()).unwrap_or_else(|| missing.to_string())
}

pub fn row_display(row: &ReportRow, missing: &str) -> RowDisplay {
    RowDisplay {
        valoracion_1c: label_text(row.valoracion_1c, missing),
        calificacion_1c: grade_text(row.calificacion_1c, missing),
        valoracion_2c: label_text(row.valoracion_2c, missing),
        calificacion_2c: grade_text(row.calificacion_2c, missing),
        bimestres: row.bimestres.iter().map(|b| label_text(*b, missing)).collect(),
        calificacion_final: grade_text(row.calificacion_final, missing),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayedRow {
    #[serde(flatten)]
    pub row: ReportRow,
    pub display: RowDisplay,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoletinModel {
    pub school_name: String,
    pub student: StudentHeader,
    pub cycle: CycleHeader,
    pub show_observations: bool,
    pub rows: Vec<DisplayedRow>,
    pub attendance: AttendanceSummary,
}

pub fn load_student(conn: &Connection, student_id: &str) -> Result<StudentHeader, ReportError> {
    conn.query_row(
        "SELECT id, last_name, first_name, document_no, current_year, division
         FROM students
         WHERE id = ?",
        [student_id],
        |r| {
            let last: String = r.get(1)?;
            let first: String = r.get(2)?;
            Ok(StudentHeader {
                id: r.get(0)?,
                display_name: format!("{}, {}", last, first),
                document_no: r.get(3)?,
                current_year: r.get(4)?,
                division: r.get(5)?,
            })
        },
    )
    .optional()
    .map_err(query_err)?
    .ok_or_else(|| ReportError::new("not_found", "student not found"))
}

pub fn load_cycle(conn: &Connection, cycle_id: &str) -> Result<CycleHeader, ReportError> {
    conn.query_row(
        "SELECT id, label, year FROM cycles WHERE id = ?",
        [cycle_id],
        |r| {
            Ok(CycleHeader {
                id: r.get(0)?,
                label: r.get(1)?,
                year: r.get(2)?,
            })
        },
    )
    .optional()
    .map_err(query_err)?
    .ok_or_else(|| ReportError::new("not_found", "cycle not found"))
}

fn parse_label(raw: Option<String>) -> Option<Valoracion> {
    raw.as_deref().and_then(Valoracion::parse)
}

pub fn load_grade_records(
    conn: &Connection,
    student_id: &str,
    cycle_id: &str,
) -> Result<Vec<GradeRecord>, ReportError> {
    let mut stmt = conn
        .prepare(
            "SELECT g.student_id, g.cycle_id, g.subject_id, s.name, s.code, s.year,
                    g.is_repeating, g.valoracion_1c, g.calificacion_1c,
                    g.valoracion_2c, g.calificacion_2c, g.intensificacion_1c,
                    g.intensificacion_dic, g.intensificacion_feb,
                    g.calificacion_final, g.observaciones
             FROM subject_grades g
             JOIN subjects s ON s.id = g.subject_id
             WHERE g.student_id = ? AND g.cycle_id = ?
             ORDER BY s.year, s.name",
        )
        .map_err(query_err)?;
    let mut records: Vec<GradeRecord> = stmt
        .query_map((student_id, cycle_id), |r| {
            Ok(GradeRecord {
                student_id: r.get(0)?,
                cycle_id: r.get(1)?,
                subject_id: r.get(2)?,
                subject_name: r.get(3)?,
                subject_code: r.get(4)?,
                year_of_subject: r.get(5)?,
                is_repeating: r.get::<_, i64>(6)? != 0,
                valoracion_1c: parse_label(r.get(7)?),
                calificacion_1c: r.get(8)?,
                valoracion_2c: parse_label(r.get(9)?),
                calificacion_2c: r.get(10)?,
                intensificacion_1c: r.get(11)?,
                intensificacion_dic: r.get(12)?,
                intensificacion_feb: r.get(13)?,
                calificacion_final: r.get(14)?,
                observaciones: r.get(15)?,
                bimestres: [None; 4],
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(query_err)?;

    let mut bim_stmt = conn
        .prepare(
            "SELECT subject_id, bimester, valoracion
             FROM bimester_assessments
             WHERE student_id = ? AND cycle_id = ?",
        )
        .map_err(query_err)?;
    let bims = bim_stmt
        .query_map((student_id, cycle_id), |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, i64>(1)?,
                r.get::<_, Option<String>>(2)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(query_err)?;
    for (subject_id, bimester, valoracion) in bims {
        if !(1..=4).contains(&bimester) {
            continue;
        }
        if let Some(rec) = records.iter_mut().find(|r| r.subject_id == subject_id) {
            rec.bimestres[(bimester - 1) as usize] = parse_label(valoracion);
        }
    }
    Ok(records)
}

pub fn load_groups(conn: &Connection, cycle_id: &str) -> Result<Vec<SubjectGroup>, ReportError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, code, year
             FROM subject_groups
             WHERE cycle_id = ? AND active = 1
             ORDER BY year, name, id",
        )
        .map_err(query_err)?;
    let mut groups: Vec<SubjectGroup> = stmt
        .query_map([cycle_id], |r| {
            Ok(SubjectGroup {
                id: r.get(0)?,
                name: r.get(1)?,
                code: r.get(2)?,
                year: r.get(3)?,
                member_subject_ids: Vec::new(),
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(query_err)?;

    let mut member_stmt = conn
        .prepare(
            "SELECT subject_id FROM subject_group_members WHERE group_id = ? ORDER BY subject_id",
        )
        .map_err(query_err)?;
    for g in groups.iter_mut() {
        g.member_subject_ids = member_stmt
            .query_map([&g.id], |r| r.get::<_, String>(0))
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(query_err)?;
    }
    Ok(groups)
}

pub fn load_group_overrides(
    conn: &Connection,
    student_id: &str,
    cycle_id: &str,
) -> Result<Vec<GroupAssessment>, ReportError> {
    let mut stmt = conn
        .prepare(
            "SELECT a.group_id, a.quarter, a.calificacion, a.valoracion
             FROM group_assessments a
             JOIN subject_groups g ON g.id = a.group_id
             WHERE a.student_id = ? AND g.cycle_id = ?",
        )
        .map_err(query_err)?;
    stmt.query_map((student_id, cycle_id), |r| {
        Ok(GroupAssessment {
            group_id: r.get(0)?,
            quarter: r.get::<_, i64>(1)?.clamp(0, 2) as u8,
            calificacion: r.get(2)?,
            valoracion: parse_label(r.get(3)?),
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(query_err)
}

pub fn load_attendance_days(
    conn: &Connection,
    student_id: &str,
    cycle_id: &str,
) -> Result<Vec<(NaiveDate, DayCode)>, ReportError> {
    let mut stmt = conn
        .prepare(
            "SELECT day, code FROM attendance_days
             WHERE student_id = ? AND cycle_id = ?
             ORDER BY day",
        )
        .map_err(query_err)?;
    let raw = stmt
        .query_map((student_id, cycle_id), |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(query_err)?;
    let mut days = Vec::with_capacity(raw.len());
    let mut skipped = 0usize;
    for (day, code) in raw {
        match (NaiveDate::parse_from_str(&day, "%Y-%m-%d"), DayCode::parse(&code)) {
            (Ok(d), Some(c)) => days.push((d, c)),
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::warn!(student_id, cycle_id, skipped, "skipped unreadable attendance rows");
    }
    Ok(days)
}

pub fn build_boletin(
    conn: &Connection,
    student_id: &str,
    cycle_id: &str,
) -> Result<BoletinModel, ReportError> {
    let student = load_student(conn, student_id)?;
    let cycle = load_cycle(conn, cycle_id)?;
    let reports = config::load_reports(conn)
        .map_err(|e| ReportError::new("db_query_failed", e.to_string()))?;
    let attendance_cfg = config::load_attendance(conn)
        .map_err(|e| ReportError::new("db_query_failed", e.to_string()))?;

    let records = load_grade_records(conn, student_id, cycle_id)?;
    let groups = load_groups(conn, cycle_id)?;
    let overrides = load_group_overrides(conn, student_id, cycle_id)?;
    let record_count = records.len();
    let rows = build_rows(records, &groups, &overrides, student.current_year);
    tracing::debug!(
        student_id,
        cycle_id,
        records = record_count,
        rows = rows.len(),
        "assembled boletin rows"
    );

    let days = load_attendance_days(conn, student_id, cycle_id)?;
    let attendance = attendance::summarize(&days, &attendance_cfg.rules());

    let rows = rows
        .into_iter()
        .map(|mut row| {
            if !reports.show_observations {
                row.observaciones = None;
            }
            let display = row_display(&row, &reports.missing_label);
            DisplayedRow { row, display }
        })
        .collect();

    Ok(BoletinModel {
        school_name: reports.school_name,
        student,
        cycle,
        show_observations: reports.show_observations,
        rows,
        attendance,
    })
}

/// Active students of a course, in roll order.
pub fn course_student_ids(
    conn: &Connection,
    current_year: i64,
    division: Option<&str>,
) -> Result<Vec<String>, ReportError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, division FROM students
             WHERE current_year = ? AND active = 1
             ORDER BY sort_order, last_name, first_name, id",
        )
        .map_err(query_err)?;
    let rows = stmt
        .query_map([current_year], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, Option<String>>(1)?))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(query_err)?;
    Ok(rows
        .into_iter()
        .filter(|(_, d)| match division {
            None => true,
            Some(want) => d.as_deref().map(|d| d.eq_ignore_ascii_case(want)) == Some(true),
        })
        .map(|(id, _)| id)
        .collect())
}
