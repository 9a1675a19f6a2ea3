use chrono::{Datelike, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayCode {
    Present,
    Absent,
    Late,
    Justified,
}

impl DayCode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "P" => Some(DayCode::Present),
            "A" => Some(DayCode::Absent),
            "T" => Some(DayCode::Late),
            "J" => Some(DayCode::Justified),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DayCode::Present => "P",
            DayCode::Absent => "A",
            DayCode::Late => "T",
            DayCode::Justified => "J",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttendanceRules {
    pub q2_start_month: u32,
    /// Fraction of an absence charged for each late arrival.
    pub late_weight: f64,
}

impl Default for AttendanceRules {
    fn default() -> Self {
        Self {
            q2_start_month: 8,
            late_weight: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceTally {
    pub days_recorded: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub justified: usize,
    pub computed_absences: f64,
    pub attendance_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub q1: AttendanceTally,
    pub q2: AttendanceTally,
    pub cycle: AttendanceTally,
}

/// One-decimal round-off: `Int(10*x + 0.5) / 10`.
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

pub fn quarter_of(day: NaiveDate, rules: &AttendanceRules) -> u8 {
    if day.month() < rules.q2_start_month {
        1
    } else {
        2
    }
}

fn tally<'a, I>(days: I, rules: &AttendanceRules) -> AttendanceTally
where
    I: IntoIterator<Item = &'a DayCode>,
{
    let mut t = AttendanceTally::default();
    for code in days {
        t.days_recorded += 1;
        match code {
            DayCode::Present => t.present += 1,
            DayCode::Absent => t.absent += 1,
            DayCode::Late => t.late += 1,
            DayCode::Justified => t.justified += 1,
        }
    }
    let absences = (t.absent + t.justified) as f64 + (t.late as f64) * rules.late_weight;
    t.computed_absences = round_off_1_decimal(absences);
    t.attendance_percent = if t.days_recorded > 0 {
        let recorded = t.days_recorded as f64;
        Some(round_off_1_decimal(100.0 * (recorded - absences) / recorded))
    } else {
        None
    };
    t
}

pub fn summarize(days: &[(NaiveDate, DayCode)], rules: &AttendanceRules) -> AttendanceSummary {
    let q1: Vec<DayCode> = days
        .iter()
        .filter(|(d, _)| quarter_of(*d, rules) == 1)
        .map(|(_, c)| *c)
        .collect();
    let q2: Vec<DayCode> = days
        .iter()
        .filter(|(d, _)| quarter_of(*d, rules) == 2)
        .map(|(_, c)| *c)
        .collect();
    AttendanceSummary {
        q1: tally(&q1, rules),
        q2: tally(&q2, rules),
        cycle: tally(days.iter().map(|(_, c)| c), rules),
    }
}
