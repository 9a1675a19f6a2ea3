use crate::subjects::names_equivalent;
use std::cmp::Ordering;

/// Canonical report order per curriculum year.
pub const DISPLAY_ORDER: &[(i64, &[&str])] = &[
    (
        1,
        &[
            "PRÁCTICAS DEL LENGUAJE",
            "MATEMÁTICA",
            "CIENCIAS NATURALES",
            "CIENCIAS SOCIALES",
            "CONSTRUCCIÓN DE CIUDADANÍA",
            "EDUCACIÓN ARTÍSTICA",
            "EDUCACIÓN FÍSICA",
            "INGLÉS",
            "LENGUAJES TECNOLÓGICOS",
            "PROCEDIMIENTOS TÉCNICOS",
            "SISTEMAS TECNOLÓGICOS",
        ],
    ),
    (
        2,
        &[
            "PRÁCTICAS DEL LENGUAJE",
            "MATEMÁTICA",
            "BIOLOGÍA",
            "FÍSICO-QUÍMICA",
            "HISTORIA",
            "GEOGRAFÍA",
            "CONSTRUCCIÓN DE CIUDADANÍA",
            "EDUCACIÓN ARTÍSTICA",
            "EDUCACIÓN FÍSICA",
            "INGLÉS",
            "LENGUAJES TECNOLÓGICOS",
            "PROCEDIMIENTOS TÉCNICOS",
            "SISTEMAS TECNOLÓGICOS",
        ],
    ),
    (
        3,
        &[
            "PRÁCTICAS DEL LENGUAJE",
            "MATEMÁTICA",
            "BIOLOGÍA",
            "FÍSICO-QUÍMICA",
            "HISTORIA",
            "GEOGRAFÍA",
            "CONSTRUCCIÓN DE CIUDADANÍA",
            "EDUCACIÓN ARTÍSTICA",
            "EDUCACIÓN FÍSICA",
            "INGLÉS",
            "LENGUAJES TECNOLÓGICOS",
            "PROCEDIMIENTOS TÉCNICOS",
            "SISTEMAS TECNOLÓGICOS",
        ],
    ),
    (
        4,
        &[
            "LITERATURA",
            "INGLÉS",
            "EDUCACIÓN FÍSICA",
            "SALUD Y ADOLESCENCIA",
            "HISTORIA",
            "GEOGRAFÍA",
            "MATEMÁTICA",
            "FÍSICA",
            "QUÍMICA",
            "DIBUJO TECNOLÓGICO",
            "TECNOLOGÍA DE LOS MATERIALES",
            "ELECTROTECNIA",
        ],
    ),
    (
        5,
        &[
            "LITERATURA",
            "INGLÉS",
            "EDUCACIÓN FÍSICA",
            "POLÍTICA Y CIUDADANÍA",
            "HISTORIA",
            "GEOGRAFÍA",
            "ANÁLISIS MATEMÁTICO",
            "FÍSICA",
            "QUÍMICA",
            "TECNOLOGÍA DE LOS MATERIALES",
            "INSTALACIONES ELÉCTRICAS",
        ],
    ),
    (
        6,
        &[
            "LITERATURA",
            "INGLÉS",
            "EDUCACIÓN FÍSICA",
            "FILOSOFÍA",
            "ARTE",
            "MATEMÁTICA APLICADA",
            "INSTALACIONES ELÉCTRICAS",
            "ELECTROTECNIA",
        ],
    ),
    (
        7,
        &[
            "PRÁCTICAS PROFESIONALIZANTES",
            "EMPRENDIMIENTOS PRODUCTIVOS",
            "INSTALACIONES ELÉCTRICAS",
            "ELECTROTECNIA",
        ],
    ),
];

pub fn display_order_for(year: i64) -> &'static [&'static str] {
    DISPLAY_ORDER
        .iter()
        .find(|(y, _)| *y == year)
        .map(|(_, names)| *names)
        .unwrap_or(&[])
}

/// What the ordering needs to know about a report row.
pub trait ReportEntry {
    fn display_name(&self) -> &str;
    fn curriculum_year(&self) -> i64;
    fn is_group(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct Ordered<T> {
    pub entry: T,
    pub being_repeated: bool,
}

pub fn is_being_repeated<T: ReportEntry>(entry: &T, student_current_year: i64) -> bool {
    !entry.is_group() && entry.curriculum_year() < student_current_year
}

/// Position in the year's canonical list: exact (case-insensitive) name
/// first, then the first equivalent entry in list order.
pub fn canonical_position(canonical: &[&str], name: &str) -> Option<usize> {
    let upper = name.to_uppercase();
    canonical
        .iter()
        .position(|c| c.to_uppercase() == upper)
        .or_else(|| canonical.iter().position(|c| names_equivalent(c, name)))
}

fn cmp_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Current rows first (canonical order, then unknown names alphabetically),
/// followed by rows from earlier curriculum years clustered by year.
pub fn classify_and_order<T: ReportEntry>(
    entries: Vec<T>,
    student_current_year: i64,
) -> Vec<Ordered<T>> {
    let canonical = display_order_for(student_current_year);

    let mut placed: Vec<(usize, T)> = Vec::new();
    let mut unplaced: Vec<T> = Vec::new();
    let mut repeated: Vec<T> = Vec::new();

    for entry in entries {
        if is_being_repeated(&entry, student_current_year) {
            repeated.push(entry);
            continue;
        }
        match canonical_position(canonical, entry.display_name()) {
            Some(pos) => placed.push((pos, entry)),
            None => unplaced.push(entry),
        }
    }

    placed.sort_by_key(|(pos, _)| *pos);
    unplaced.sort_by(|a, b| cmp_names(a.display_name(), b.display_name()));
    repeated.sort_by(|a, b| {
        a.curriculum_year()
            .cmp(&b.curriculum_year())
            .then_with(|| cmp_names(a.display_name(), b.display_name()))
    });

    let current = placed
        .into_iter()
        .map(|(_, entry)| entry)
        .chain(unplaced)
        .map(|entry| Ordered {
            entry,
            being_repeated: false,
        });
    let repeated = repeated.into_iter().map(|entry| Ordered {
        entry,
        being_repeated: true,
    });
    current.chain(repeated).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        name: &'static str,
        year: i64,
        group: bool,
    }

    impl ReportEntry for Row {
        fn display_name(&self) -> &str {
            self.name
        }
        fn curriculum_year(&self) -> i64 {
            self.year
        }
        fn is_group(&self) -> bool {
            self.group
        }
    }

    fn subject(name: &'static str, year: i64) -> Row {
        Row {
            name,
            year,
            group: false,
        }
    }

    fn names(out: &[Ordered<Row>]) -> Vec<&'static str> {
        out.iter().map(|o| o.entry.name).collect()
    }

    #[test]
    fn current_rows_follow_canonical_order() {
        let rows = vec![
            subject("DIBUJO TECNOLÓGICO", 4),
            subject("MATEMÁTICA", 4),
            subject("LITERATURA", 4),
            subject("inglés", 4),
        ];
        let out = classify_and_order(rows, 4);
        assert_eq!(
            names(&out),
            vec!["LITERATURA", "inglés", "MATEMÁTICA", "DIBUJO TECNOLÓGICO"]
        );
        assert!(out.iter().all(|o| !o.being_repeated));
    }

    #[test]
    fn equivalent_names_take_first_canonical_slot() {
        let rows = vec![
            subject("GEOGRAFÍA", 1),
            subject("CONSTRUCCIÓN DE CIUDADANÍA - MADERAS", 1),
            subject("MATEMÁTICA", 1),
        ];
        let out = classify_and_order(rows, 1);
        assert_eq!(
            names(&out),
            vec![
                "MATEMÁTICA",
                "CONSTRUCCIÓN DE CIUDADANÍA - MADERAS",
                "GEOGRAFÍA"
            ]
        );
    }

    #[test]
    fn ties_keep_input_order() {
        let forward = vec![
            subject("CONSTRUCCIÓN DE CIUDADANÍA - METALES", 1),
            subject("CONSTRUCCIÓN DE CIUDADANÍA - MADERAS", 1),
            subject("MATEMÁTICA", 1),
        ];
        assert_eq!(
            names(&classify_and_order(forward, 1)),
            vec![
                "MATEMÁTICA",
                "CONSTRUCCIÓN DE CIUDADANÍA - METALES",
                "CONSTRUCCIÓN DE CIUDADANÍA - MADERAS"
            ]
        );

        let reversed = vec![
            subject("CONSTRUCCIÓN DE CIUDADANÍA - MADERAS", 1),
            subject("MATEMÁTICA", 1),
            subject("CONSTRUCCIÓN DE CIUDADANÍA - METALES", 1),
        ];
        assert_eq!(
            names(&classify_and_order(reversed, 1)),
            vec![
                "MATEMÁTICA",
                "CONSTRUCCIÓN DE CIUDADANÍA - MADERAS",
                "CONSTRUCCIÓN DE CIUDADANÍA - METALES"
            ]
        );
    }

    #[test]
    fn equivalence_takes_earliest_canonical_entry() {
        let canonical = ["EDUCACIÓN FÍSICA", "FÍSICA"];
        // Contained in both entries; the scan stops at the first.
        assert_eq!(canonical_position(&canonical, "Fisica"), Some(0));
        // An exact match beats an earlier equivalent entry.
        assert_eq!(canonical_position(&canonical, "física"), Some(1));

        let swapped = ["FÍSICA", "EDUCACIÓN FÍSICA"];
        assert_eq!(canonical_position(&swapped, "Fisica"), Some(0));
        assert_eq!(canonical_position(&swapped, "EDUCACIÓN FÍSICA"), Some(1));
    }

    #[test]
    fn unknown_names_go_last_alphabetically() {
        let rows = vec![
            subject("taller de robótica", 4),
            subject("HISTORIA", 4),
            subject("Ajedrez", 4),
        ];
        let out = classify_and_order(rows, 4);
        assert_eq!(names(&out), vec!["HISTORIA", "Ajedrez", "taller de robótica"]);
    }

    #[test]
    fn repeated_rows_cluster_by_year_then_name() {
        let rows = vec![
            subject("MATEMÁTICA", 3),
            subject("HISTORIA", 2),
            subject("FÍSICA", 4),
            subject("BIOLOGÍA", 2),
            subject("GEOGRAFÍA", 3),
        ];
        let out = classify_and_order(rows, 4);
        assert_eq!(
            names(&out),
            vec!["FÍSICA", "BIOLOGÍA", "HISTORIA", "GEOGRAFÍA", "MATEMÁTICA"]
        );
        let flags: Vec<bool> = out.iter().map(|o| o.being_repeated).collect();
        assert_eq!(flags, vec![false, true, true, true, true]);
    }

    #[test]
    fn groups_are_never_repeated() {
        let rows = vec![Row {
            name: "LENGUAJES TECNOLÓGICOS",
            year: 1,
            group: true,
        }];
        let out = classify_and_order(rows, 3);
        assert!(!out[0].being_repeated);
    }

    #[test]
    fn ordering_is_deterministic() {
        let rows = vec![
            subject("zeta", 5),
            subject("FÍSICA", 5),
            subject("alfa", 5),
            subject("HISTORIA", 2),
            subject("LITERATURA", 5),
        ];
        let first = names(&classify_and_order(rows.clone(), 5));
        for _ in 0..10 {
            assert_eq!(names(&classify_and_order(rows.clone(), 5)), first);
        }
    }

    #[test]
    fn year_without_table_sorts_alphabetically() {
        let rows = vec![subject("b", 9), subject("A", 9)];
        assert_eq!(names(&classify_and_order(rows, 9)), vec!["A", "b"]);
    }
}
