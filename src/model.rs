use crate::valoracion::Valoracion;
use serde::Serialize;

/// One subject's grades for one student in one cycle, as stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradeRecord {
    pub student_id: String,
    pub cycle_id: String,
    pub subject_id: String,
    pub subject_name: String,
    pub subject_code: Option<String>,
    pub year_of_subject: i64,
    pub is_repeating: bool,
    pub valoracion_1c: Option<Valoracion>,
    pub calificacion_1c: Option<i64>,
    pub valoracion_2c: Option<Valoracion>,
    pub calificacion_2c: Option<i64>,
    pub intensificacion_1c: Option<i64>,
    pub intensificacion_dic: Option<i64>,
    pub intensificacion_feb: Option<i64>,
    pub calificacion_final: Option<i64>,
    pub observaciones: Option<String>,
    pub bimestres: [Option<Valoracion>; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectGroup {
    pub id: String,
    pub name: String,
    pub code: Option<String>,
    pub year: i64,
    pub member_subject_ids: Vec<String>,
}

/// Explicitly stored per-quarter values for a group; either side may be
/// missing, in which case the derived value is used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupAssessment {
    pub group_id: String,
    pub quarter: u8,
    pub calificacion: Option<i64>,
    pub valoracion: Option<Valoracion>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentHeader {
    pub id: String,
    pub display_name: String,
    pub document_no: Option<String>,
    pub current_year: i64,
    pub division: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleHeader {
    pub id: String,
    pub label: String,
    pub year: i64,
}
