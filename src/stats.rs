use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::domain::MissingColumnsError;
use crate::table::Table;

pub const SUMMARY_COLUMNS: [&str; 3] = ["Title", "Genre", "Author"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Value(String),
    Missing,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Value(v) => write!(f, "{v}"),
            Category::Missing => write!(f, "(unknown)"),
        }
    }
}

/// Value counts of one column, most frequent first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyCount {
    pub column: String,
    entries: Vec<(Category, usize)>,
}

impl FrequencyCount {
    pub fn iter(&self) -> impl Iterator<Item = &(Category, usize)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of counted rows, missing values included.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    /// Number of rows holding a value in the grouped column.
    pub fn present_total(&self) -> usize {
        self.entries
            .iter()
            .filter(|(category, _)| *category != Category::Missing)
            .map(|(_, c)| c)
            .sum()
    }

    /// Percentage of each entry relative to `total()`.
    pub fn shares(&self) -> Vec<f64> {
        let total = self.total();
        if total == 0 {
            return Vec::new();
        }
        self.entries
            .iter()
            .map(|(_, c)| *c as f64 * 100.0 / total as f64)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryStats {
    pub total_books: usize,
    pub unique_genres: usize,
    pub unique_authors: usize,
}

impl fmt::Display for SummaryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total Books: {}\nUnique Genres: {}\nUnique Authors: {}",
            self.total_books, self.unique_genres, self.unique_authors
        )
    }
}

pub fn validate_columns<S: AsRef<str>>(
    table: &Table,
    required: &[S],
) -> Result<(), MissingColumnsError> {
    let missing: BTreeSet<String> = required
        .iter()
        .map(|name| name.as_ref())
        .filter(|name| !table.has_column(name))
        .map(|name| name.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MissingColumnsError { missing })
    }
}

pub fn compute_summary(table: &Table) -> Result<SummaryStats, MissingColumnsError> {
    validate_columns(table, &SUMMARY_COLUMNS)?;
    Ok(SummaryStats {
        total_books: table.len(),
        unique_genres: distinct_count(table, "Genre"),
        unique_authors: distinct_count(table, "Author"),
    })
}

pub fn compute_frequency(
    table: &Table,
    column: &str,
) -> Result<FrequencyCount, MissingColumnsError> {
    validate_columns(table, &[column])?;

    let mut positions: HashMap<Option<&str>, usize> = HashMap::new();
    let mut counts: Vec<(Option<&str>, usize)> = Vec::new();
    if let Some(values) = table.column(column) {
        for value in values.values() {
            let pos = *positions.entry(value).or_insert_with(|| {
                counts.push((value, 0));
                counts.len() - 1
            });
            counts[pos].1 += 1;
        }
    }
    // Stable sort keeps first appearance order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let entries = counts
        .into_iter()
        .map(|(value, count)| {
            let category = match value {
                Some(v) => Category::Value(v.to_string()),
                None => Category::Missing,
            };
            (category, count)
        })
        .collect();
    Ok(FrequencyCount {
        column: column.to_string(),
        entries,
    })
}

fn distinct_count(table: &Table, column: &str) -> usize {
    table
        .column(column)
        .map(|c| c.values().flatten().collect::<HashSet<&str>>().len())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_table(rows: &[[Option<&str>; 3]]) -> Table {
        Table::from_records(
            vec!["Title".into(), "Genre".into(), "Author".into()],
            rows.iter()
                .map(|r| r.iter().map(|c| c.map(String::from)).collect())
                .collect(),
        )
    }

    fn labels(freq: &FrequencyCount) -> Vec<(String, usize)> {
        freq.iter().map(|(c, n)| (c.to_string(), *n)).collect()
    }

    #[test]
    fn scenario_three_books() {
        let table = book_table(&[
            [Some("A"), Some("SciFi"), Some("X")],
            [Some("B"), Some("SciFi"), Some("Y")],
            [Some("C"), Some("Fantasy"), Some("X")],
        ]);
        assert_eq!(
            compute_summary(&table).unwrap(),
            SummaryStats {
                total_books: 3,
                unique_genres: 2,
                unique_authors: 2
            }
        );
        let freq = compute_frequency(&table, "Genre").unwrap();
        assert_eq!(
            labels(&freq),
            vec![("SciFi".to_string(), 2), ("Fantasy".to_string(), 1)]
        );
        assert_eq!(freq.column, "Genre");
    }

    #[test]
    fn missing_author_column() {
        let table = Table::from_records(
            vec!["Title".into(), "Genre".into()],
            vec![vec![Some("A".into()), Some("SciFi".into())]],
        );
        let expected = MissingColumnsError {
            missing: ["Author".to_string()].into(),
        };
        assert_eq!(
            validate_columns(&table, &SUMMARY_COLUMNS),
            Err(expected.clone())
        );
        assert_eq!(compute_summary(&table), Err(expected));
    }

    #[test]
    fn summary_names_exactly_the_missing_columns() {
        let table = Table::from_records(vec!["Genre".into()], Vec::new());
        let err = compute_summary(&table).unwrap_err();
        assert_eq!(
            err.missing,
            ["Author".to_string(), "Title".to_string()].into()
        );

        let err = compute_frequency(&table, "Publisher").unwrap_err();
        assert_eq!(err.missing, ["Publisher".to_string()].into());
    }

    #[test]
    fn empty_table() {
        let table = book_table(&[]);
        assert_eq!(compute_summary(&table).unwrap(), SummaryStats::default());
        let freq = compute_frequency(&table, "Genre").unwrap();
        assert!(freq.is_empty());
        assert_eq!(freq.total(), 0);
        assert!(freq.shares().is_empty());
    }

    #[test]
    fn ties_keep_first_appearance_order() {
        let table = book_table(&[
            [Some("A"), Some("Horror"), Some("X")],
            [Some("B"), Some("Drama"), Some("X")],
            [Some("C"), Some("Poetry"), Some("X")],
            [Some("D"), Some("Drama"), Some("X")],
            [Some("E"), Some("Poetry"), Some("X")],
            [Some("F"), Some("Essay"), Some("X")],
        ]);
        let freq = compute_frequency(&table, "Genre").unwrap();
        assert_eq!(
            labels(&freq),
            vec![
                ("Drama".to_string(), 2),
                ("Poetry".to_string(), 2),
                ("Horror".to_string(), 1),
                ("Essay".to_string(), 1),
            ]
        );
        let counts: Vec<usize> = freq.iter().map(|(_, n)| *n).collect();
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn missing_values_form_their_own_category() {
        let table = book_table(&[
            [Some("A"), None, Some("X")],
            [Some("B"), Some("Drama"), None],
            [Some("C"), None, Some("Y")],
            [Some("D"), Some("Drama"), Some("Y")],
            [Some("E"), Some("Essay"), Some("Y")],
        ]);
        let freq = compute_frequency(&table, "Genre").unwrap();
        assert_eq!(
            freq.iter().cloned().collect::<Vec<_>>(),
            vec![
                (Category::Missing, 2),
                (Category::Value("Drama".into()), 2),
                (Category::Value("Essay".into()), 1),
            ]
        );
        assert_eq!(freq.total(), table.len());
        let present = table.rows().filter(|r| r.get("Genre").is_some()).count();
        assert_eq!(freq.present_total(), present);

        let summary = compute_summary(&table).unwrap();
        assert_eq!(summary.total_books, 5);
        assert_eq!(summary.unique_genres, 2);
        assert_eq!(summary.unique_authors, 2);
    }

    #[test]
    fn frequency_is_idempotent() {
        let table = book_table(&[
            [Some("A"), Some("SciFi"), Some("X")],
            [Some("B"), Some("Fantasy"), Some("Y")],
            [Some("C"), Some("Fantasy"), Some("X")],
        ]);
        assert_eq!(
            compute_frequency(&table, "Author").unwrap(),
            compute_frequency(&table, "Author").unwrap()
        );
    }

    #[test]
    fn shares_add_up() {
        let table = book_table(&[
            [Some("A"), Some("SciFi"), Some("X")],
            [Some("B"), Some("SciFi"), Some("Y")],
            [Some("C"), Some("Fantasy"), Some("X")],
            [Some("D"), Some("Drama"), Some("X")],
        ]);
        let shares = compute_frequency(&table, "Genre").unwrap().shares();
        assert_eq!(shares, vec![50.0, 25.0, 25.0]);
    }

    #[test]
    fn summary_text() {
        let stats = SummaryStats {
            total_books: 8,
            unique_genres: 3,
            unique_authors: 6,
        };
        assert_eq!(
            stats.to_string(),
            "Total Books: 8\nUnique Genres: 3\nUnique Authors: 6"
        );
    }
}
