//! Subject name canonicalization.
//!
//! Historical rows carry every spelling teachers ever typed ("ED. FISICA",
//! "Educacion fisica", "CONSTR. DE CIUD. - MADERAS"). Everything downstream
//! (ordering, grouping, display) works on the canonical accented form
//! produced here.

#[derive(Debug, Clone, Copy)]
enum Pattern {
    Exact(&'static str),
    Prefix(&'static str),
    /// Every fragment must appear somewhere in the key.
    Contains(&'static [&'static str]),
}

impl Pattern {
    fn matches(self, key: &str) -> bool {
        match self {
            Pattern::Exact(p) => key == p,
            Pattern::Prefix(p) => key.starts_with(p),
            Pattern::Contains(parts) => parts.iter().all(|p| key.contains(p)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct NameRule {
    pattern: Pattern,
    canonical: &'static str,
}

const fn rule(pattern: Pattern, canonical: &'static str) -> NameRule {
    NameRule { pattern, canonical }
}

// Patterns are written against `fold_key` output: uppercase, unaccented,
// "." and "-" spaced out, whitespace collapsed. First match wins, so the
// workshop-specific citizenship variants must precede the generic one.
const NAME_RULES: &[NameRule] = &[
    rule(
        Pattern::Contains(&["CIUD", "MADERA"]),
        "CONSTRUCCIÓN DE CIUDADANÍA - MADERAS",
    ),
    rule(
        Pattern::Contains(&["CIUD", "METAL"]),
        "CONSTRUCCIÓN DE CIUDADANÍA - METALES",
    ),
    rule(
        Pattern::Contains(&["CIUD", "ELECTRI"]),
        "CONSTRUCCIÓN DE CIUDADANÍA - ELECTRICIDAD",
    ),
    rule(
        Pattern::Contains(&["CONSTR", "CIUD"]),
        "CONSTRUCCIÓN DE CIUDADANÍA",
    ),
    rule(
        Pattern::Contains(&["POLITICA", "CIUDADANIA"]),
        "POLÍTICA Y CIUDADANÍA",
    ),
    rule(Pattern::Prefix("EDUCACION FISICA"), "EDUCACIÓN FÍSICA"),
    rule(Pattern::Prefix("ED. FISICA"), "EDUCACIÓN FÍSICA"),
    rule(Pattern::Prefix("ED FISICA"), "EDUCACIÓN FÍSICA"),
    rule(Pattern::Prefix("ED. - FISICA"), "EDUCACIÓN FÍSICA"),
    rule(Pattern::Prefix("ED - FISICA"), "EDUCACIÓN FÍSICA"),
    rule(Pattern::Exact("E. F."), "EDUCACIÓN FÍSICA"),
    rule(Pattern::Exact("EF"), "EDUCACIÓN FÍSICA"),
    rule(Pattern::Prefix("EDUCACION ARTISTICA"), "EDUCACIÓN ARTÍSTICA"),
    rule(Pattern::Prefix("ED. ARTISTICA"), "EDUCACIÓN ARTÍSTICA"),
    rule(Pattern::Prefix("ED ARTISTICA"), "EDUCACIÓN ARTÍSTICA"),
    rule(Pattern::Prefix("ED. - ARTISTICA"), "EDUCACIÓN ARTÍSTICA"),
    rule(Pattern::Exact("ARTISTICA"), "EDUCACIÓN ARTÍSTICA"),
    rule(Pattern::Prefix("PRACTICAS DEL LENGUAJE"), "PRÁCTICAS DEL LENGUAJE"),
    rule(Pattern::Prefix("PRACT. DEL LENG"), "PRÁCTICAS DEL LENGUAJE"),
    rule(Pattern::Exact("PDL"), "PRÁCTICAS DEL LENGUAJE"),
    rule(Pattern::Prefix("PRACTICAS PROF"), "PRÁCTICAS PROFESIONALIZANTES"),
    rule(Pattern::Prefix("PRACT. PROF"), "PRÁCTICAS PROFESIONALIZANTES"),
    rule(Pattern::Prefix("MATEMATICA APLICADA"), "MATEMÁTICA APLICADA"),
    rule(Pattern::Prefix("MAT. APLICADA"), "MATEMÁTICA APLICADA"),
    rule(Pattern::Prefix("ANALISIS MAT"), "ANÁLISIS MATEMÁTICO"),
    rule(Pattern::Exact("MATEMATICA"), "MATEMÁTICA"),
    rule(Pattern::Exact("MATEMATICAS"), "MATEMÁTICA"),
    rule(Pattern::Exact("MAT."), "MATEMÁTICA"),
    rule(Pattern::Exact("MATE"), "MATEMÁTICA"),
    rule(Pattern::Exact("MATE."), "MATEMÁTICA"),
    rule(Pattern::Prefix("CIENCIAS NATURALES"), "CIENCIAS NATURALES"),
    rule(Pattern::Prefix("CS. NAT"), "CIENCIAS NATURALES"),
    rule(Pattern::Prefix("CS NAT"), "CIENCIAS NATURALES"),
    rule(Pattern::Prefix("CIENCIAS SOCIALES"), "CIENCIAS SOCIALES"),
    rule(Pattern::Prefix("CS. SOC"), "CIENCIAS SOCIALES"),
    rule(Pattern::Prefix("CS SOC"), "CIENCIAS SOCIALES"),
    rule(Pattern::Exact("INGLES"), "INGLÉS"),
    rule(Pattern::Prefix("LENGUA EXTRANJERA"), "INGLÉS"),
    rule(Pattern::Exact("BIOLOGIA"), "BIOLOGÍA"),
    rule(Pattern::Contains(&["FISICO", "QUIMICA"]), "FÍSICO-QUÍMICA"),
    rule(Pattern::Exact("FISICA"), "FÍSICA"),
    rule(Pattern::Exact("QUIMICA"), "QUÍMICA"),
    rule(Pattern::Exact("HISTORIA"), "HISTORIA"),
    rule(Pattern::Exact("GEOGRAFIA"), "GEOGRAFÍA"),
    rule(Pattern::Prefix("SALUD Y ADOL"), "SALUD Y ADOLESCENCIA"),
    rule(Pattern::Exact("LITERATURA"), "LITERATURA"),
    rule(Pattern::Exact("FILOSOFIA"), "FILOSOFÍA"),
    rule(Pattern::Exact("ARTE"), "ARTE"),
    rule(Pattern::Prefix("DIBUJO TEC"), "DIBUJO TECNOLÓGICO"),
    rule(Pattern::Prefix("LENGUAJES TEC"), "LENGUAJES TECNOLÓGICOS"),
    rule(Pattern::Prefix("LENGUAJE TEC"), "LENGUAJES TECNOLÓGICOS"),
    rule(Pattern::Prefix("LENG. TEC"), "LENGUAJES TECNOLÓGICOS"),
    rule(Pattern::Prefix("PROCEDIMIENTOS TEC"), "PROCEDIMIENTOS TÉCNICOS"),
    rule(Pattern::Prefix("PROC. TEC"), "PROCEDIMIENTOS TÉCNICOS"),
    rule(Pattern::Prefix("SISTEMAS TEC"), "SISTEMAS TECNOLÓGICOS"),
    rule(Pattern::Prefix("SIST. TEC"), "SISTEMAS TECNOLÓGICOS"),
    rule(
        Pattern::Prefix("TECNOLOGIA DE LOS MAT"),
        "TECNOLOGÍA DE LOS MATERIALES",
    ),
    rule(Pattern::Prefix("TEC. DE LOS MAT"), "TECNOLOGÍA DE LOS MATERIALES"),
    rule(
        Pattern::Prefix("INSTALACIONES ELECTRICAS"),
        "INSTALACIONES ELÉCTRICAS",
    ),
    rule(Pattern::Prefix("INST. ELECTRICAS"), "INSTALACIONES ELÉCTRICAS"),
    rule(Pattern::Exact("ELECTROTECNIA"), "ELECTROTECNIA"),
    rule(Pattern::Prefix("EMPRENDIMIENTOS"), "EMPRENDIMIENTOS PRODUCTIVOS"),
];

/// Many-to-one groupings consulted by `names_equivalent` after the exact
/// comparison fails. Entries are canonical names.
const ALIAS_GROUPS: &[&[&str]] = &[
    &[
        "CONSTRUCCIÓN DE CIUDADANÍA",
        "CONSTRUCCIÓN DE CIUDADANÍA - MADERAS",
        "CONSTRUCCIÓN DE CIUDADANÍA - METALES",
        "CONSTRUCCIÓN DE CIUDADANÍA - ELECTRICIDAD",
    ],
    &["PRÁCTICAS DEL LENGUAJE", "LITERATURA"],
    &[
        "MATEMÁTICA",
        "MATEMÁTICA APLICADA",
        "ANÁLISIS MATEMÁTICO",
    ],
];

fn fold_char(c: char) -> char {
    match c {
        'Á' | 'À' | 'Â' | 'Ä' => 'A',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'Ó' | 'Ò' | 'Ô' | 'Ö' => 'O',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'Ñ' => 'N',
        'Ç' => 'C',
        other => other,
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Matching key: uppercase, accents stripped, punctuation spaced.
pub fn fold_key(raw: &str) -> String {
    let spaced = raw.replace('.', ". ").replace('-', " - ");
    let folded: String = spaced.to_uppercase().chars().map(fold_char).collect();
    collapse_whitespace(&folded)
}

/// Best-effort display form for names no rule knows: uppercase with
/// accented letters kept as their uppercase accented counterparts.
fn fallback_upper(raw: &str) -> String {
    collapse_whitespace(raw).to_uppercase()
}

pub fn normalize_subject_name(raw: &str) -> String {
    let key = fold_key(raw);
    NAME_RULES
        .iter()
        .find(|r| r.pattern.matches(&key))
        .map(|r| r.canonical.to_string())
        .unwrap_or_else(|| fallback_upper(raw))
}

fn alias_group_of(folded: &str) -> Option<usize> {
    ALIAS_GROUPS
        .iter()
        .position(|group| group.iter().any(|name| fold_key(name) == folded))
}

/// Whether two free-text names denote the same subject.
///
/// Substring containment is the last resort and can pair short names with
/// longer unrelated ones (e.g. "FÍSICA" inside "EDUCACIÓN FÍSICA").
pub fn names_equivalent(a: &str, b: &str) -> bool {
    let ka = fold_key(&normalize_subject_name(a));
    let kb = fold_key(&normalize_subject_name(b));
    if ka == kb {
        return true;
    }
    if ka.is_empty() || kb.is_empty() {
        return false;
    }
    if let (Some(ga), Some(gb)) = (alias_group_of(&ka), alias_group_of(&kb)) {
        if ga == gb {
            return true;
        }
    }
    ka.contains(&kb) || kb.contains(&ka)
}
