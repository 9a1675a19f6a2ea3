use crate::attendance::AttendanceRules;
use crate::db;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

pub const ATTENDANCE_KEY: &str = "setup.attendance";
pub const REPORTS_KEY: &str = "setup.reports";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttendanceSection {
    pub q2_start_month: u32,
    pub late_weight: f64,
}

impl Default for AttendanceSection {
    fn default() -> Self {
        let rules = AttendanceRules::default();
        Self {
            q2_start_month: rules.q2_start_month,
            late_weight: rules.late_weight,
        }
    }
}

impl AttendanceSection {
    pub fn rules(&self) -> AttendanceRules {
        AttendanceRules {
            q2_start_month: self.q2_start_month,
            late_weight: self.late_weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportsSection {
    pub school_name: String,
    pub show_observations: bool,
    pub missing_label: String,
}

impl Default for ReportsSection {
    fn default() -> Self {
        Self {
            school_name: String::new(),
            show_observations: true,
            missing_label: "-".to_string(),
        }
    }
}

/// Stored section merged over defaults; unreadable JSON falls back to the
/// defaults rather than blocking report generation.
fn load_section<T>(conn: &Connection, key: &str) -> anyhow::Result<T>
where
    T: Default + for<'de> Deserialize<'de>,
{
    let Some(raw) = db::settings_get_json(conn, key)? else {
        return Ok(T::default());
    };
    match serde_json::from_value(raw) {
        Ok(v) => Ok(v),
        Err(e) => {
            tracing::warn!(key, error = %e, "ignoring malformed settings section");
            Ok(T::default())
        }
    }
}

pub fn load_attendance(conn: &Connection) -> anyhow::Result<AttendanceSection> {
    load_section(conn, ATTENDANCE_KEY)
}

pub fn load_reports(conn: &Connection) -> anyhow::Result<ReportsSection> {
    load_section(conn, REPORTS_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_sections_fill_in_defaults() {
        let v: ReportsSection =
            serde_json::from_value(serde_json::json!({ "schoolName": "EEST N° 1" }))
                .expect("parse");
        assert_eq!(v.school_name, "EEST N° 1");
        assert!(v.show_observations);
        assert_eq!(v.missing_label, "-");
    }

    #[test]
    fn attendance_defaults_match_rules() {
        let s = AttendanceSection::default();
        assert_eq!(s.rules(), AttendanceRules::default());
    }
}
