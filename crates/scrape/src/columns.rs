// ABOUTME: Maps a stats table's header labels to machine field names and 1-based column positions.
// ABOUTME: Column order varies between pages, so a map is built per table and never reused.

use std::collections::HashMap;

use crate::extractors::select::normalize_whitespace;

/// Header label → field name dictionary for player stats tables.
const LABELS: &[(&str, &str)] = &[
    ("Average Combat Score", "acs"),
    ("Kills", "kills"),
    ("Deaths", "deaths"),
    ("Assists", "assists"),
    ("Kill, Assist, Trade, Survive %", "kast"),
    ("Average Damage per Round", "adr"),
    ("Headshot %", "hs"),
    ("First Kills", "first_bloods"),
    ("First Deaths", "first_deaths"),
];

/// Position of the first labeled column; column 1 holds the player identity.
pub const FIRST_LABELED_COLUMN: usize = 2;

/// Field name → 1-based column position for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    positions: HashMap<&'static str, usize>,
}

impl ColumnMap {
    /// Position of a field, if the table has that column.
    pub fn position(&self, field: &str) -> Option<usize> {
        self.positions.get(field).copied()
    }

    /// Number of recognised columns.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Builds a [`ColumnMap`] from the labels of the columns after the player
/// column, in table order.
///
/// Unknown labels are skipped but still take up a position. When a label
/// repeats, its first column wins.
pub fn map_columns<I, S>(header_labels: I) -> ColumnMap
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut positions = HashMap::new();
    for (offset, label) in header_labels.into_iter().enumerate() {
        let label = normalize_whitespace(label.as_ref());
        let Some(field) = field_for_label(&label) else {
            continue;
        };
        positions
            .entry(field)
            .or_insert(offset + FIRST_LABELED_COLUMN);
    }
    ColumnMap { positions }
}

fn field_for_label(label: &str) -> Option<&'static str> {
    LABELS
        .iter()
        .find(|(known, _)| *known == label)
        .map(|(_, field)| *field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_start_at_two() {
        let map = map_columns(["", "Rating 2.0", "Average Combat Score", "Kills"]);
        assert_eq!(map.position("acs"), Some(4));
        assert_eq!(map.position("kills"), Some(5));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_unknown_labels_are_ignored() {
        let map = map_columns(["Clutches Won", "Kills"]);
        assert_eq!(map.position("kills"), Some(3));
        assert_eq!(map.position("clutches"), None);
    }

    #[test]
    fn test_label_whitespace_is_normalized() {
        let map = map_columns(["Kill,  Assist, Trade,\n Survive %"]);
        assert_eq!(map.position("kast"), Some(2));
    }

    #[test]
    fn test_duplicate_label_keeps_first() {
        let map = map_columns(["Deaths", "Deaths"]);
        assert_eq!(map.position("deaths"), Some(2));
    }

    #[test]
    fn test_permuted_headers() {
        let a = map_columns(["Kills", "Deaths", "Headshot %"]);
        let b = map_columns(["Headshot %", "Kills", "Deaths"]);
        assert_eq!(a.position("hs"), Some(4));
        assert_eq!(b.position("hs"), Some(2));
        assert_eq!(b.position("kills"), Some(3));
    }

    #[test]
    fn test_empty_headers() {
        let map = map_columns(Vec::<String>::new());
        assert!(map.is_empty());
    }
}
