use serde::{Deserialize, Serialize};

pub const MIN_GRADE: i64 = 1;
pub const MAX_GRADE: i64 = 10;

/// Qualitative trajectory label attached to a quarter or a bimester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Valoracion {
    /// Trayectoria educativa avanzada.
    #[serde(rename = "TEA")]
    Tea,
    /// Trayectoria educativa en proceso.
    #[serde(rename = "TEP")]
    Tep,
    /// Trayectoria educativa discontinua.
    #[serde(rename = "TED")]
    Ted,
}

impl Valoracion {
    pub fn as_str(self) -> &'static str {
        match self {
            Valoracion::Tea => "TEA",
            Valoracion::Tep => "TEP",
            Valoracion::Ted => "TED",
        }
    }

    /// Accepts only the three stored spellings; anything else (blank, "-",
    /// legacy junk) counts as "not entered".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "TEA" => Some(Valoracion::Tea),
            "TEP" => Some(Valoracion::Tep),
            "TED" => Some(Valoracion::Ted),
            _ => None,
        }
    }

    fn weakness(self) -> u8 {
        match self {
            Valoracion::Tea => 0,
            Valoracion::Tep => 1,
            Valoracion::Ted => 2,
        }
    }
}

pub fn is_valid_grade(grade: i64) -> bool {
    (MIN_GRADE..=MAX_GRADE).contains(&grade)
}

/// Maps a 1..=10 grade to its label. Missing or out-of-range grades yield
/// `None` ("not yet assessed").
pub fn derive_assessment(grade: Option<i64>) -> Option<Valoracion> {
    let g = grade.filter(|g| is_valid_grade(*g))?;
    if g >= 7 {
        Some(Valoracion::Tea)
    } else if g >= 4 {
        Some(Valoracion::Tep)
    } else {
        Some(Valoracion::Ted)
    }
}

/// An explicitly entered label always wins over the derived one.
pub fn fill_assessment(explicit: Option<Valoracion>, grade: Option<i64>) -> Option<Valoracion> {
    explicit.or_else(|| derive_assessment(grade))
}

/// Weakest-link aggregation over the members of a subject group: every
/// member grade is labelled on its own and the weakest label is the group's.
pub fn derive_group_assessment(member_grades: &[Option<i64>]) -> Option<Valoracion> {
    weakest(member_grades.iter().filter_map(|g| derive_assessment(*g)))
}

/// TED over TEP over TEA; `None` for an empty set.
pub fn weakest<I>(labels: I) -> Option<Valoracion>
where
    I: IntoIterator<Item = Valoracion>,
{
    labels.into_iter().max_by_key(|v| v.weakness())
}

/// Round-half-up mean of the usable grades, or `None` when none is usable.
pub fn rounded_mean(grades: &[Option<i64>]) -> Option<i64> {
    let usable: Vec<i64> = grades
        .iter()
        .filter_map(|g| g.filter(|g| is_valid_grade(*g)))
        .collect();
    if usable.is_empty() {
        return None;
    }
    let sum: i64 = usable.iter().sum();
    Some(round_half_up(sum as f64 / usable.len() as f64))
}

/// Final cycle grade of a group: only produced once both quarters carry an
/// aggregated grade, so a half-year group never looks finished.
pub fn group_final_grade(q1: Option<i64>, q2: Option<i64>) -> Option<i64> {
    match (q1, q2) {
        (Some(a), Some(b)) => Some(round_half_up((a + b) as f64 / 2.0)),
        _ => None,
    }
}

pub fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}
