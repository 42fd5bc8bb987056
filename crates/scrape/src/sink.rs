// ABOUTME: EventSink abstraction for appending NDJSON records to named datasources.
// ABOUTME: Provides NDJSON rendering for Record types and an in-memory sink.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{Result, ScrapeError};
use crate::records::{MatchDetail, Record};

/// Destination for exported records.
pub trait EventSink {
    /// Appends newline-delimited JSON to `datasource`.
    fn append(&mut self, datasource: &str, ndjson: &str) -> anyhow::Result<()>;
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn append(&mut self, datasource: &str, ndjson: &str) -> anyhow::Result<()> {
        (**self).append(datasource, ndjson)
    }
}

/// Renders records as one JSON object per line, each line newline-terminated.
pub fn to_ndjson<'a, R, I>(records: I) -> Result<String>
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut out = String::new();
    for record in records {
        let line = serde_json::to_string(&Value::Object(record.export()))
            .map_err(|e| ScrapeError::sink(R::DATASOURCE, e.into()))?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// Exports records to their datasource. Empty batches are not sent.
pub fn append_records<'a, R, I, S>(sink: &mut S, records: I) -> Result<usize>
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a R>,
    S: EventSink + ?Sized,
{
    let records: Vec<&R> = records.into_iter().collect();
    if records.is_empty() {
        return Ok(0);
    }
    let ndjson = to_ndjson(records.iter().copied())?;
    sink.append(R::DATASOURCE, &ndjson)
        .map_err(|e| ScrapeError::sink(R::DATASOURCE, e))?;
    tracing::debug!(datasource = R::DATASOURCE, records = records.len(), "records appended");
    Ok(records.len())
}

/// Exports the team and player results of assembled matches.
pub fn append_match_details<S>(sink: &mut S, details: &[MatchDetail]) -> Result<(usize, usize)>
where
    S: EventSink + ?Sized,
{
    let teams = append_records(sink, details.iter().flat_map(|d| d.team_results()))?;
    let players = append_records(sink, details.iter().flat_map(|d| d.player_results()))?;
    Ok((teams, players))
}

/// Sink collecting NDJSON in memory, keyed by datasource.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub datasources: BTreeMap<String, String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything appended to `datasource`, or "".
    pub fn contents(&self, datasource: &str) -> &str {
        self.datasources
            .get(datasource)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Parsed lines appended to `datasource`.
    pub fn lines(&self, datasource: &str) -> Vec<Value> {
        self.contents(datasource)
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

impl EventSink for MemorySink {
    fn append(&mut self, datasource: &str, ndjson: &str) -> anyhow::Result<()> {
        self.datasources
            .entry(datasource.to_string())
            .or_default()
            .push_str(ndjson);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{TeamResult, TEAM_RESULTS_DATASOURCE};

    fn team(team_id: u64, score: &str) -> TeamResult {
        TeamResult {
            match_id: 4021,
            game_id: 77,
            team_id,
            team_name: "Sentinels".to_string(),
            patch: Some("9.07".to_string()),
            raw_result: "score mod-win".to_string(),
            raw_score: score.to_string(),
            raw_attack_score: "8".to_string(),
            raw_defense_score: "5".to_string(),
            raw_start_side: "mod-t".to_string(),
        }
    }

    #[test]
    fn test_ndjson_one_line_per_record() {
        let records = vec![team(2, "13"), team(3, "x")];
        let out = to_ndjson(&records).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(out.ends_with('\n'));

        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["team_id"], 3);
        assert!(second["score"].is_null());
    }

    #[test]
    fn test_append_records_to_memory_sink() {
        let mut sink = MemorySink::new();
        let records = vec![team(2, "13")];
        assert_eq!(append_records(&mut sink, &records).unwrap(), 1);
        assert_eq!(append_records(&mut sink, &Vec::<TeamResult>::new()).unwrap(), 0);

        let lines = sink.lines(TEAM_RESULTS_DATASOURCE);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["score"], 13);
        assert!(!sink.datasources.contains_key("valorant_results"));
    }

    struct Rejecting;

    impl EventSink for Rejecting {
        fn append(&mut self, _: &str, _: &str) -> anyhow::Result<()> {
            anyhow::bail!("401 unauthorized")
        }
    }

    #[test]
    fn test_sink_failure_is_sink_error() {
        let err = append_records(&mut Rejecting, &vec![team(2, "13")]).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::Sink);
        assert!(err.to_string().contains(TEAM_RESULTS_DATASOURCE));
    }
}
