// ABOUTME: Typed records built from extracted values: match summaries, team results, player results.
// ABOUTME: Raw text is kept as extracted; typed accessors coerce at read time and exports list derived fields statically.

//! Record types.
//!
//! Records hold the raw strings the engine extracted. Typed accessors parse
//! on demand, and each record type declares its exported derived fields in a
//! static table of `(name, derive fn)` pairs so export never needs
//! reflection.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::FieldParseError;
use crate::time_parse::parse_listing_time;

/// Datasource for listing summaries.
pub const RESULTS_DATASOURCE: &str = "valorant_results";
/// Datasource for per-game team results.
pub const TEAM_RESULTS_DATASOURCE: &str = "valorant_match_team_results";
/// Datasource for per-game player results.
pub const PLAYER_RESULTS_DATASOURCE: &str = "valorant_match_player_results";

/// Label marking that a listed match has map stats.
const MAP_STATS_LABEL: &str = "Map";
/// Label marking that a listed match has player stats.
const PLAYER_STATS_LABEL: &str = "Player";

/// A derived export field paired with the function computing it.
pub struct DerivedField<R> {
    pub name: &'static str,
    pub derive: fn(&R) -> Value,
}

/// A record that can be exported as one JSON object.
pub trait Record: Sized + 'static {
    /// Datasource the records are appended to.
    const DATASOURCE: &'static str;

    /// Derived fields, computed at export time.
    const DERIVED: &'static [DerivedField<Self>];

    /// Fields exported as stored.
    fn plain_fields(&self) -> Map<String, Value>;

    /// Plain fields plus every derived field.
    fn export(&self) -> Map<String, Value> {
        let mut out = self.plain_fields();
        for field in Self::DERIVED {
            out.insert(field.name.to_string(), (field.derive)(self));
        }
        out
    }
}

/// Win/loss marker for a team in one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
}

/// Side a team started a game on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Attack,
    Defense,
}

/// Parses a non-negative base-10 counter.
pub fn parse_counter(field: &'static str, raw: Option<&str>) -> Result<u32, FieldParseError> {
    let raw = raw.ok_or(FieldParseError::Missing { field })?;
    raw.trim().parse::<u32>().map_err(|_| FieldParseError::Invalid {
        field,
        value: raw.to_string(),
    })
}

/// Parses `"75%"` into `75`. Anything without the trailing sign, or with a
/// non-numeric remainder, is None.
pub fn parse_percent(raw: Option<&str>) -> Option<u32> {
    let number = raw?.trim().strip_suffix('%')?;
    number.trim().parse().ok()
}

/// Returns true when `raw` contains `token` as a whole whitespace-separated word.
fn has_token(raw: &str, token: &str) -> bool {
    raw.split_whitespace().any(|t| t == token)
}

fn counter_value(parsed: Result<u32, FieldParseError>) -> Value {
    parsed.map(Value::from).unwrap_or(Value::Null)
}

fn trimmed(value: &Option<String>) -> Value {
    match value {
        Some(v) => Value::String(v.trim().to_string()),
        None => Value::Null,
    }
}

/// Pulls the numeric id out of a site path such as `/player/123/tenz` or
/// `/12345/sentinels-vs-fnatic`.
pub fn id_from_path(path: &str) -> Option<u64> {
    path.trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .split('/')
        .filter(|s| !s.is_empty())
        .find_map(|segment| segment.parse::<u64>().ok())
}

// ----------------------------------------------------------------------------
// Match summaries
// ----------------------------------------------------------------------------

/// One match as it appears on a results listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSummary {
    pub link: String,
    pub start_date: Option<String>,
    pub start_time: Option<String>,
    /// Raw label of the player-stats tag.
    pub player_stats_label: Option<String>,
    /// Raw label of the map-stats tag.
    pub map_stats_label: Option<String>,
    pub stakes: Option<String>,
    pub status: Option<String>,
    pub event: Option<String>,
    /// Offset the listing's wall-clock times are rendered in.
    pub timezone: FixedOffset,
}

impl MatchSummary {
    /// Start time in UTC, or None when the date or time does not parse.
    pub fn start_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_listing_time(
            self.start_date.as_deref(),
            self.start_time.as_deref(),
            self.timezone,
        )
    }

    /// True when the listing advertises player stats.
    pub fn player_stats(&self) -> bool {
        self.player_stats_label.as_deref() == Some(PLAYER_STATS_LABEL)
    }

    /// True when the listing advertises map stats.
    pub fn map_stats(&self) -> bool {
        self.map_stats_label.as_deref() == Some(MAP_STATS_LABEL)
    }

    /// Splits the link into `(match_id, stub)` for fetching the detail page.
    pub fn match_ref(&self) -> Option<(u64, String)> {
        let mut parts = self.link.trim().trim_matches('/').split('/');
        let id = parts.next()?.parse().ok()?;
        let stub = parts.next().filter(|s| !s.is_empty())?;
        Some((id, stub.to_string()))
    }
}

fn summary_start_timestamp(m: &MatchSummary) -> Value {
    match m.start_timestamp() {
        Some(ts) => Value::String(ts.to_rfc3339_opts(SecondsFormat::Secs, false)),
        None => Value::Null,
    }
}

fn summary_player_stats(m: &MatchSummary) -> Value {
    Value::Bool(m.player_stats())
}

fn summary_map_stats(m: &MatchSummary) -> Value {
    Value::Bool(m.map_stats())
}

impl Record for MatchSummary {
    const DATASOURCE: &'static str = RESULTS_DATASOURCE;
    const DERIVED: &'static [DerivedField<Self>] = &[
        DerivedField {
            name: "start_timestamp",
            derive: summary_start_timestamp,
        },
        DerivedField {
            name: "player_stats",
            derive: summary_player_stats,
        },
        DerivedField {
            name: "map_stats",
            derive: summary_map_stats,
        },
    ];

    fn plain_fields(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("link".into(), json!(self.link.trim()));
        out.insert("stakes".into(), trimmed(&self.stakes));
        out.insert("status".into(), trimmed(&self.status));
        out.insert("event".into(), trimmed(&self.event));
        out
    }
}

// ----------------------------------------------------------------------------
// Team results
// ----------------------------------------------------------------------------

/// One team's result in one game of a match.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamResult {
    pub match_id: u64,
    pub game_id: u64,
    pub team_id: u64,
    pub team_name: String,
    pub patch: Option<String>,
    /// Class list of the score element; carries the win marker.
    pub raw_result: String,
    pub raw_score: String,
    pub raw_attack_score: String,
    pub raw_defense_score: String,
    /// Class list of the first side element; carries the side marker.
    pub raw_start_side: String,
}

impl TeamResult {
    pub fn result(&self) -> Outcome {
        if has_token(&self.raw_result, "mod-win") {
            Outcome::Win
        } else {
            Outcome::Loss
        }
    }

    pub fn score(&self) -> Result<u32, FieldParseError> {
        parse_counter("score", Some(&self.raw_score))
    }

    pub fn attack_score(&self) -> Result<u32, FieldParseError> {
        parse_counter("attack_score", Some(&self.raw_attack_score))
    }

    pub fn defense_score(&self) -> Result<u32, FieldParseError> {
        parse_counter("defense_score", Some(&self.raw_defense_score))
    }

    /// `mod-t` marks an attack start, `mod-ct` a defense start.
    ///
    /// Historical exports mapped `mod-ct` to attack and everything else to
    /// defense, so rows written before this mapping have the sides swapped.
    /// Markers other than these two are null rather than defense.
    pub fn start_side(&self) -> Option<Side> {
        if has_token(&self.raw_start_side, "mod-t") {
            Some(Side::Attack)
        } else if has_token(&self.raw_start_side, "mod-ct") {
            Some(Side::Defense)
        } else {
            None
        }
    }

    /// Coercion failures for this record, for diagnostics.
    pub fn parse_errors(&self) -> Vec<FieldParseError> {
        [self.score(), self.attack_score(), self.defense_score()]
            .into_iter()
            .filter_map(Result::err)
            .collect()
    }
}

fn team_result(t: &TeamResult) -> Value {
    json!(t.result())
}

fn team_score(t: &TeamResult) -> Value {
    counter_value(t.score())
}

fn team_attack_score(t: &TeamResult) -> Value {
    counter_value(t.attack_score())
}

fn team_defense_score(t: &TeamResult) -> Value {
    counter_value(t.defense_score())
}

fn team_start_side(t: &TeamResult) -> Value {
    t.start_side().map(|s| json!(s)).unwrap_or(Value::Null)
}

impl Record for TeamResult {
    const DATASOURCE: &'static str = TEAM_RESULTS_DATASOURCE;
    const DERIVED: &'static [DerivedField<Self>] = &[
        DerivedField { name: "result", derive: team_result },
        DerivedField { name: "score", derive: team_score },
        DerivedField { name: "attack_score", derive: team_attack_score },
        DerivedField { name: "defense_score", derive: team_defense_score },
        DerivedField { name: "start_side", derive: team_start_side },
    ];

    fn plain_fields(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("match_id".into(), json!(self.match_id));
        out.insert("game_id".into(), json!(self.game_id));
        out.insert("team_id".into(), json!(self.team_id));
        out.insert("team_name".into(), json!(self.team_name));
        out.insert("patch".into(), json!(self.patch));
        out
    }
}

// ----------------------------------------------------------------------------
// Player results
// ----------------------------------------------------------------------------

/// Stat columns a player row carries, keyed by field name.
pub const STAT_FIELDS: [&str; 9] = [
    "kills",
    "deaths",
    "assists",
    "first_bloods",
    "first_deaths",
    "acs",
    "kast",
    "adr",
    "hs",
];

/// One player's line in one game of a match.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerResult {
    pub match_id: u64,
    pub game_id: u64,
    pub team_id: u64,
    pub player_id: u64,
    pub player_name: String,
    pub agent: Option<String>,
    /// Raw stat cell text keyed by a name from [`STAT_FIELDS`]. Columns the
    /// table did not have are absent.
    pub raw_stats: HashMap<&'static str, String>,
}

impl PlayerResult {
    fn stat(&self, field: &'static str) -> Option<&str> {
        self.raw_stats.get(field).map(String::as_str)
    }

    fn counter(&self, field: &'static str) -> Result<u32, FieldParseError> {
        parse_counter(field, self.stat(field))
    }

    pub fn kills(&self) -> Result<u32, FieldParseError> {
        self.counter("kills")
    }

    pub fn deaths(&self) -> Result<u32, FieldParseError> {
        self.counter("deaths")
    }

    pub fn assists(&self) -> Result<u32, FieldParseError> {
        self.counter("assists")
    }

    pub fn first_bloods(&self) -> Result<u32, FieldParseError> {
        self.counter("first_bloods")
    }

    pub fn first_deaths(&self) -> Result<u32, FieldParseError> {
        self.counter("first_deaths")
    }

    pub fn acs(&self) -> Result<u32, FieldParseError> {
        self.counter("acs")
    }

    pub fn adr(&self) -> Result<u32, FieldParseError> {
        self.counter("adr")
    }

    /// KAST percentage; None when the cell is missing or malformed.
    pub fn kast(&self) -> Option<u32> {
        parse_percent(self.stat("kast"))
    }

    /// Headshot percentage; None when the cell is missing or malformed.
    pub fn hs(&self) -> Option<u32> {
        parse_percent(self.stat("hs"))
    }

    /// Coercion failures for this record, for diagnostics.
    pub fn parse_errors(&self) -> Vec<FieldParseError> {
        [
            self.kills(),
            self.deaths(),
            self.assists(),
            self.first_bloods(),
            self.first_deaths(),
            self.acs(),
            self.adr(),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect()
    }
}

fn player_kills(p: &PlayerResult) -> Value {
    counter_value(p.kills())
}

fn player_deaths(p: &PlayerResult) -> Value {
    counter_value(p.deaths())
}

fn player_assists(p: &PlayerResult) -> Value {
    counter_value(p.assists())
}

fn player_first_bloods(p: &PlayerResult) -> Value {
    counter_value(p.first_bloods())
}

fn player_first_deaths(p: &PlayerResult) -> Value {
    counter_value(p.first_deaths())
}

fn player_acs(p: &PlayerResult) -> Value {
    counter_value(p.acs())
}

fn player_kast(p: &PlayerResult) -> Value {
    json!(p.kast())
}

fn player_adr(p: &PlayerResult) -> Value {
    counter_value(p.adr())
}

fn player_hs(p: &PlayerResult) -> Value {
    json!(p.hs())
}

impl Record for PlayerResult {
    const DATASOURCE: &'static str = PLAYER_RESULTS_DATASOURCE;
    const DERIVED: &'static [DerivedField<Self>] = &[
        DerivedField { name: "kills", derive: player_kills },
        DerivedField { name: "deaths", derive: player_deaths },
        DerivedField { name: "assists", derive: player_assists },
        DerivedField { name: "first_bloods", derive: player_first_bloods },
        DerivedField { name: "first_deaths", derive: player_first_deaths },
        DerivedField { name: "acs", derive: player_acs },
        DerivedField { name: "kast", derive: player_kast },
        DerivedField { name: "adr", derive: player_adr },
        DerivedField { name: "hs", derive: player_hs },
    ];

    fn plain_fields(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("match_id".into(), json!(self.match_id));
        out.insert("game_id".into(), json!(self.game_id));
        out.insert("team_id".into(), json!(self.team_id));
        out.insert("player_id".into(), json!(self.player_id));
        out.insert("player_name".into(), json!(self.player_name));
        out.insert("agent".into(), json!(self.agent));
        out
    }
}

// ----------------------------------------------------------------------------
// Match detail containers
// ----------------------------------------------------------------------------

/// Team and player lines for one game (map) of a match.
#[derive(Debug, Clone, PartialEq)]
pub struct GameResult {
    pub game_id: u64,
    pub team_results: Vec<TeamResult>,
    pub player_results: Vec<PlayerResult>,
}

/// Everything assembled from one match report page.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchDetail {
    pub match_id: u64,
    pub patch: Option<String>,
    pub games: Vec<GameResult>,
}

impl MatchDetail {
    /// Team results across all games, in page order.
    pub fn team_results(&self) -> impl Iterator<Item = &TeamResult> {
        self.games.iter().flat_map(|g| g.team_results.iter())
    }

    /// Player results across all games, in page order.
    pub fn player_results(&self) -> impl Iterator<Item = &PlayerResult> {
        self.games.iter().flat_map(|g| g.player_results.iter())
    }
}
