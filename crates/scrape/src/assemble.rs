// ABOUTME: Record assembly: zips parallel per-field value sequences into typed records.
// ABOUTME: Builds match summaries from listing pages and team/player results from match pages.

//! Record assembly.
//!
//! The engine yields one slot per scope node for every field. Assembly zips
//! those slots into rows: a row missing a required field, or holding a field
//! that matched more nodes than expected, is a ShapeMismatch for that row
//! only. Structural drift (team count, game ids) rejects the whole match.

use std::collections::{BTreeMap, HashMap};

use chrono::FixedOffset;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use crate::columns::map_columns;
use crate::error::{Result, ScrapeError};
use crate::extractors::select::{Extractor, Slot};
use crate::records::{
    id_from_path, GameResult, MatchDetail, MatchSummary, PlayerResult, TeamResult, STAT_FIELDS,
};

/// Positional field used for every stat column.
pub const STAT_CELL_FIELD: &str = "stat_cell";

const SUMMARY_REQUIRED: &[&str] = &["link"];
const SUMMARY_OPTIONAL: &[&str] = &[
    "start_date",
    "start_time",
    "map_stats",
    "player_stats",
    "stakes",
    "status",
    "event",
];

const TEAM_REQUIRED: &[&str] = &["team_name", "score", "result"];
// Side scores are missing on forfeits and some older layouts.
const TEAM_OPTIONAL: &[&str] = &["attack_score", "defense_score", "start_side"];

const PLAYER_OPTIONAL: &[&str] = &["agent"];

static PATCH_VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)+").expect("valid patch regex"));

/// One zipped row: field name → value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row<'v> {
    values: HashMap<&'static str, &'v str>,
}

impl<'v> Row<'v> {
    /// Value of a field in this row; None for absent optional fields.
    pub fn get(&self, field: &str) -> Option<&'v str> {
        self.values.get(field).copied()
    }

    /// Owned copy of a field's value.
    pub fn owned(&self, field: &str) -> Option<String> {
        self.get(field).map(str::to_string)
    }
}

/// Zips per-scope slots into one row per scope.
///
/// Every field must carry one slot per scope, otherwise the sequences were
/// built for different scopes and the whole group is a ShapeMismatch. Inside
/// a row, an empty `required` field or any overflowing field rejects that row
/// alone; an empty `optional` field is simply absent from it.
pub fn zip_fields<'v>(
    target: &str,
    fields: &'v BTreeMap<String, Vec<Slot>>,
    scopes: usize,
    required: &[&'static str],
    optional: &[&'static str],
) -> Result<Vec<Result<Row<'v>>>> {
    let mut mismatched = Vec::new();
    for name in required.iter().chain(optional) {
        match fields.get(*name) {
            Some(slots) if slots.len() != scopes => {
                mismatched.push(format!("{}={}", name, slots.len()))
            }
            None if scopes > 0 && required.contains(name) => {
                mismatched.push(format!("{}=0", name))
            }
            _ => {}
        }
    }
    if !mismatched.is_empty() {
        return Err(ScrapeError::shape_mismatch(
            target,
            format!(
                "field lengths disagree (expected {}): {}",
                scopes,
                mismatched.join(", ")
            ),
        ));
    }

    let rows: Vec<Result<Row<'v>>> = (0..scopes)
        .map(|index| {
            let mut row = Row::default();
            let mut problems = Vec::new();
            for name in required.iter().chain(optional) {
                match fields.get(*name).and_then(|slots| slots.get(index)) {
                    Some(Slot::Value(value)) => {
                        row.values.insert(*name, value.as_str());
                    }
                    Some(Slot::Overflow(found)) => {
                        problems.push(format!("{} matched {} nodes", name, found))
                    }
                    Some(Slot::Empty) | None => {
                        if required.contains(name) {
                            problems.push(format!("{} is missing", name));
                        }
                    }
                }
            }
            if problems.is_empty() {
                Ok(row)
            } else {
                Err(ScrapeError::shape_mismatch(
                    target,
                    format!("row {}: {}", index + 1, problems.join(", ")),
                ))
            }
        })
        .collect();
    Ok(rows)
}

// ----------------------------------------------------------------------------
// Listing pages
// ----------------------------------------------------------------------------

/// Extracts every match summary on a listing page, in page order.
pub fn assemble_summaries(
    extractor: &Extractor<'_>,
    doc: &Html,
    timezone: FixedOffset,
) -> Result<Vec<MatchSummary>> {
    let cards = extractor.group("cards", doc.root_element())?;
    let mut out = Vec::new();

    for (index, card) in cards.scopes.iter().enumerate() {
        let matches = extractor.group("matches", *card)?;
        let target = format!("listing card {}", index + 1);
        let rows = zip_fields(
            &target,
            &matches.fields,
            matches.scopes.len(),
            SUMMARY_REQUIRED,
            SUMMARY_OPTIONAL,
        )?;

        for row in rows {
            let row = match row {
                Ok(row) => row,
                Err(err) => {
                    warn!(error = %err, "listing item skipped");
                    continue;
                }
            };
            out.push(MatchSummary {
                link: row.owned("link").unwrap_or_default(),
                start_date: row.owned("start_date"),
                start_time: row.owned("start_time"),
                player_stats_label: row.owned("player_stats"),
                map_stats_label: row.owned("map_stats"),
                stakes: row.owned("stakes"),
                status: row.owned("status"),
                event: row.owned("event"),
                timezone,
            });
        }
    }

    debug!(matches = out.len(), "listing page assembled");
    Ok(out)
}

/// Parses listing HTML and extracts its match summaries.
pub fn parse_listing_page(
    extractor: &Extractor<'_>,
    html: &str,
    timezone: FixedOffset,
) -> Result<Vec<MatchSummary>> {
    let doc = Html::parse_document(html);
    assemble_summaries(extractor, &doc, timezone)
}

// ----------------------------------------------------------------------------
// Match pages
// ----------------------------------------------------------------------------

/// Picks the patch version from the primary field, falling back to the old
/// layout's field. Both present with different versions is a conflict.
pub fn resolve_patch(
    target: &str,
    patch: Option<&str>,
    patch_old: Option<&str>,
) -> Result<Option<String>> {
    let patch = patch.and_then(patch_version);
    let patch_old = patch_old.and_then(patch_version);
    match (patch, patch_old) {
        (Some(p), Some(old)) if p != old => Err(ScrapeError::patch_conflict(target, &p, &old)),
        (Some(p), _) => Ok(Some(p)),
        (None, old) => Ok(old),
    }
}

/// `"Patch 9.07"` → `"9.07"`; other non-empty text is kept trimmed.
fn patch_version(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match PATCH_VERSION_RE.find(raw) {
        Some(m) => Some(m.as_str().to_string()),
        None => Some(raw.to_string()),
    }
}

fn first_value(values: Vec<String>) -> Option<String> {
    values.into_iter().find(|v| !v.trim().is_empty())
}

/// Assembles a match report page into per-game team and player results.
///
/// Structural drift (team count, game ids, team rows) fails the whole match
/// with ShapeMismatch. Player rows that are incomplete or whose id cannot be
/// read are dropped individually.
pub fn assemble_match(extractor: &Extractor<'_>, doc: &Html, match_id: u64) -> Result<MatchDetail> {
    let root = doc.root_element();
    let target = format!("match {}", match_id);

    let patch = resolve_patch(
        &target,
        first_value(extractor.values("patch", root)?).as_deref(),
        first_value(extractor.values("patch_old", root)?).as_deref(),
    )?;

    let links = extractor.values("team_links", root)?;
    let team_ids = links
        .iter()
        .map(|link| id_from_path(link))
        .collect::<Option<Vec<u64>>>()
        .ok_or_else(|| {
            ScrapeError::shape_mismatch(&target, format!("unreadable team links {:?}", links))
        })?;
    if team_ids.len() != 2 {
        return Err(ScrapeError::shape_mismatch(
            &target,
            format!("expected 2 team links, found {}", team_ids.len()),
        ));
    }

    let games = extractor.group("games", root)?;
    let mut out = Vec::with_capacity(games.scopes.len());
    for (index, scope) in games.scopes.iter().enumerate() {
        let raw_game_id = games.value("game_id", index).unwrap_or_default();
        let game_id = raw_game_id.trim().parse::<u64>().map_err(|_| {
            ScrapeError::shape_mismatch(&target, format!("unreadable game id {:?}", raw_game_id))
        })?;
        let ctx = GameContext {
            extractor,
            target: &target,
            match_id,
            game_id,
            team_ids: &team_ids,
            patch: patch.as_deref(),
        };
        out.push(GameResult {
            game_id,
            team_results: ctx.team_results(*scope)?,
            player_results: ctx.player_results(*scope)?,
        });
    }

    debug!(match_id, games = out.len(), "match page assembled");
    Ok(MatchDetail {
        match_id,
        patch,
        games: out,
    })
}

/// Parses match page HTML and assembles it.
pub fn parse_match_page(extractor: &Extractor<'_>, html: &str, match_id: u64) -> Result<MatchDetail> {
    let doc = Html::parse_document(html);
    assemble_match(extractor, &doc, match_id)
}

struct GameContext<'e, 'r> {
    extractor: &'e Extractor<'r>,
    target: &'e str,
    match_id: u64,
    game_id: u64,
    team_ids: &'e [u64],
    patch: Option<&'e str>,
}

impl GameContext<'_, '_> {
    fn team_results(&self, game: ElementRef<'_>) -> Result<Vec<TeamResult>> {
        let teams = self.extractor.group("teams", game)?;
        if teams.scopes.len() != self.team_ids.len() {
            return Err(ScrapeError::shape_mismatch(
                self.target,
                format!(
                    "game {} has {} team rows for {} teams",
                    self.game_id,
                    teams.scopes.len(),
                    self.team_ids.len()
                ),
            ));
        }
        let rows = zip_fields(
            self.target,
            &teams.fields,
            teams.scopes.len(),
            TEAM_REQUIRED,
            TEAM_OPTIONAL,
        )?
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

        let results: Vec<TeamResult> = rows
            .iter()
            .zip(self.team_ids)
            .map(|(row, team_id)| TeamResult {
                match_id: self.match_id,
                game_id: self.game_id,
                team_id: *team_id,
                team_name: row.owned("team_name").unwrap_or_default(),
                patch: self.patch.map(str::to_string),
                raw_result: row.owned("result").unwrap_or_default(),
                raw_score: row.owned("score").unwrap_or_default(),
                raw_attack_score: row.owned("attack_score").unwrap_or_default(),
                raw_defense_score: row.owned("defense_score").unwrap_or_default(),
                raw_start_side: row.owned("start_side").unwrap_or_default(),
            })
            .collect();

        for result in &results {
            for err in result.parse_errors() {
                let err = ScrapeError::field_parse(format!("team {}", result.team_id), err);
                warn!(match_id = self.match_id, game_id = self.game_id, error = %err, "team field left null");
            }
        }
        Ok(results)
    }

    fn player_results(&self, game: ElementRef<'_>) -> Result<Vec<PlayerResult>> {
        let tables = self.extractor.group("stat_tables", game)?;
        if tables.scopes.len() > self.team_ids.len() {
            return Err(ScrapeError::shape_mismatch(
                self.target,
                format!(
                    "game {} has {} stat tables for {} teams",
                    self.game_id,
                    tables.scopes.len(),
                    self.team_ids.len()
                ),
            ));
        }

        let mut out = Vec::new();
        for (table, team_id) in tables.scopes.iter().zip(self.team_ids) {
            out.extend(self.table_players(*table, *team_id)?);
        }
        Ok(out)
    }

    fn table_players(&self, table: ElementRef<'_>, team_id: u64) -> Result<Vec<PlayerResult>> {
        // The first header cell belongs to the player column.
        let headers = self.extractor.values("stat_headers", table)?;
        let columns = map_columns(headers.iter().skip(1));

        let players = self.extractor.group("players", table)?;
        let mut fields = players.fields.clone();
        let mut required: Vec<&'static str> = vec!["player_link", "player_name"];
        for stat in STAT_FIELDS {
            match columns.position(stat) {
                Some(position) => {
                    let values =
                        self.extractor
                            .values_at_each(STAT_CELL_FIELD, &players.scopes, position)?;
                    fields.insert(stat.to_string(), values);
                    required.push(stat);
                }
                None => {
                    warn!(match_id = self.match_id, game_id = self.game_id, column = stat, "stat column not found")
                }
            }
        }

        let rows = zip_fields(
            self.target,
            &fields,
            players.scopes.len(),
            &required,
            PLAYER_OPTIONAL,
        )?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let row = match row {
                Ok(row) => row,
                Err(err) => {
                    warn!(game_id = self.game_id, team_id, error = %err, "player record skipped");
                    continue;
                }
            };
            let link = row.get("player_link").unwrap_or_default();
            let Some(player_id) = id_from_path(link) else {
                let err = ScrapeError::shape_mismatch(
                    self.target,
                    format!("unreadable player link {:?}", link),
                );
                warn!(game_id = self.game_id, error = %err, "player record skipped");
                continue;
            };

            let raw_stats = STAT_FIELDS
                .iter()
                .filter_map(|stat| row.owned(stat).map(|v| (*stat, v)))
                .collect();
            let player = PlayerResult {
                match_id: self.match_id,
                game_id: self.game_id,
                team_id,
                player_id,
                player_name: row.owned("player_name").unwrap_or_default(),
                agent: row.owned("agent").filter(|a| !a.trim().is_empty()),
                raw_stats,
            };
            for err in player.parse_errors() {
                let err = ScrapeError::field_parse(format!("player {}", player_id), err);
                warn!(match_id = self.match_id, game_id = self.game_id, error = %err, "player field left null");
            }
            out.push(player);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn slot(value: &str) -> Slot {
        match value {
            "" => Slot::Empty,
            "*" => Slot::Overflow(2),
            v => Slot::Value(v.to_string()),
        }
    }

    fn fields(pairs: &[(&str, &[&str])]) -> BTreeMap<String, Vec<Slot>> {
        pairs
            .iter()
            .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| slot(v)).collect()))
            .collect()
    }

    #[test]
    fn test_zip_aligned() {
        let f = fields(&[("a", &["1", "2"]), ("b", &["x", "y"])]);
        let rows = zip_fields("t", &f, 2, &["a", "b"], &[]).unwrap();
        assert_eq!(rows.len(), 2);
        let second = rows[1].as_ref().unwrap();
        assert_eq!(second.get("a"), Some("2"));
        assert_eq!(second.get("b"), Some("y"));
    }

    #[test]
    fn test_zip_length_mismatch_names_fields() {
        let f = fields(&[("a", &["1", "2"]), ("b", &["x"])]);
        let err = zip_fields("match 7", &f, 2, &["a", "b"], &[]).unwrap_err();
        assert!(err.is_shape_mismatch());
        let msg = err.to_string();
        assert!(msg.contains("match 7"));
        assert!(msg.contains("b=1"));
    }

    #[test]
    fn test_zip_gap_only_affects_its_row() {
        let f = fields(&[("a", &["1", "", "3"]), ("c", &["x", "y", ""])]);
        let rows = zip_fields("t", &f, 3, &["a"], &["c"]).unwrap();

        assert_eq!(rows[0].as_ref().unwrap().get("c"), Some("x"));
        let missing = rows[1].as_ref().unwrap_err();
        assert!(missing.is_shape_mismatch());
        assert!(missing.to_string().contains("row 2: a is missing"));
        let third = rows[2].as_ref().unwrap();
        assert_eq!(third.get("a"), Some("3"));
        assert_eq!(third.get("c"), None);
    }

    #[test]
    fn test_zip_overflow_rejects_row() {
        let f = fields(&[("a", &["1", "2"]), ("c", &["*", "y"])]);
        let rows = zip_fields("t", &f, 2, &["a"], &["c"]).unwrap();
        let err = rows[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("c matched 2 nodes"));
        assert!(rows[1].is_ok());
    }

    #[test]
    fn test_zip_missing_required_field() {
        let f = fields(&[("a", &["1"])]);
        assert!(zip_fields("t", &f, 1, &["a", "b"], &[]).is_err());
        assert_eq!(zip_fields("t", &f, 1, &["a"], &["b"]).unwrap().len(), 1);
        let empty = BTreeMap::new();
        assert!(zip_fields("t", &empty, 0, &["a", "b"], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_patch() {
        assert_eq!(
            resolve_patch("m", Some("Patch 9.07"), None).unwrap(),
            Some("9.07".to_string())
        );
        assert_eq!(
            resolve_patch("m", Some("  "), Some("Patch 8.11")).unwrap(),
            Some("8.11".to_string())
        );
        assert_eq!(
            resolve_patch("m", Some("Patch 9.07"), Some("9.07")).unwrap(),
            Some("9.07".to_string())
        );
        assert_eq!(resolve_patch("m", None, None).unwrap(), None);
        let err = resolve_patch("m", Some("Patch 9.07"), Some("Patch 9.05")).unwrap_err();
        assert!(err.is_patch_conflict());
    }
}
