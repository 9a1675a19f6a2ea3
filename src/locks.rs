use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SETTINGS_KEY: &str = "locks.fields";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Directivo,
    Preceptor,
    Profesor,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "directivo" => Some(Role::Directivo),
            "preceptor" => Some(Role::Preceptor),
            "profesor" => Some(Role::Profesor),
            _ => None,
        }
    }
}

/// Every editable cell of a subject's grade row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GradeField {
    Valoracion1c,
    Calificacion1c,
    Valoracion2c,
    Calificacion2c,
    Intensificacion1c,
    IntensificacionDic,
    IntensificacionFeb,
    CalificacionFinal,
    Observaciones,
    Bimestre(u8),
}

pub const GRADE_FIELDS: &[GradeField] = &[
    GradeField::Valoracion1c,
    GradeField::Calificacion1c,
    GradeField::Valoracion2c,
    GradeField::Calificacion2c,
    GradeField::Intensificacion1c,
    GradeField::IntensificacionDic,
    GradeField::IntensificacionFeb,
    GradeField::CalificacionFinal,
    GradeField::Observaciones,
    GradeField::Bimestre(1),
    GradeField::Bimestre(2),
    GradeField::Bimestre(3),
    GradeField::Bimestre(4),
];

impl GradeField {
    pub fn key(self) -> &'static str {
        match self {
            GradeField::Valoracion1c => "valoracion1c",
            GradeField::Calificacion1c => "calificacion1c",
            GradeField::Valoracion2c => "valoracion2c",
            GradeField::Calificacion2c => "calificacion2c",
            GradeField::Intensificacion1c => "intensificacion1c",
            GradeField::IntensificacionDic => "intensificacionDic",
            GradeField::IntensificacionFeb => "intensificacionFeb",
            GradeField::CalificacionFinal => "calificacionFinal",
            GradeField::Observaciones => "observaciones",
            GradeField::Bimestre(1) => "bimestre1",
            GradeField::Bimestre(2) => "bimestre2",
            GradeField::Bimestre(3) => "bimestre3",
            GradeField::Bimestre(_) => "bimestre4",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        GRADE_FIELDS.iter().copied().find(|f| f.key() == raw)
    }

    /// Storage column in `subject_grades`; bimesters live in their own table.
    pub fn column(self) -> Option<&'static str> {
        match self {
            GradeField::Valoracion1c => Some("valoracion_1c"),
            GradeField::Calificacion1c => Some("calificacion_1c"),
            GradeField::Valoracion2c => Some("valoracion_2c"),
            GradeField::Calificacion2c => Some("calificacion_2c"),
            GradeField::Intensificacion1c => Some("intensificacion_1c"),
            GradeField::IntensificacionDic => Some("intensificacion_dic"),
            GradeField::IntensificacionFeb => Some("intensificacion_feb"),
            GradeField::CalificacionFinal => Some("calificacion_final"),
            GradeField::Observaciones => Some("observaciones"),
            GradeField::Bimestre(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldLock {
    pub locked: bool,
    #[serde(default)]
    pub exempt_roles: Vec<Role>,
}

/// Per-field lock table keyed by the field's wire name. Fields without an
/// entry are unlocked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    pub fields: BTreeMap<String, FieldLock>,
}

pub fn is_editable(config: &LockConfig, field: GradeField, role: Role) -> bool {
    if role == Role::Directivo {
        return true;
    }
    match config.fields.get(field.key()) {
        None => true,
        Some(lock) => !lock.locked || lock.exempt_roles.contains(&role),
    }
}

pub fn locked_fields(config: &LockConfig, fields: &[GradeField], role: Role) -> Vec<GradeField> {
    fields
        .iter()
        .copied()
        .filter(|f| !is_editable(config, *f, role))
        .collect()
}
