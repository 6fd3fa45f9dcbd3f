//! Reduction of fingerprint-recognition results
//!
//! Input is the JSON document a recognition service reports:
//! `{status:{code}, metadata?:{music?|humming?:[{title?, score?, artists?:[{name?}]}]}}`.
//! The highest score wins; on ties the earliest candidate is kept.

use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, error};

pub const NO_MATCH_TEXT: &str = "No match found.";
pub const PARSE_FAILED_TEXT: &str = "Result parsing failed.";

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionCandidate {
    pub title: String,
    pub artist: String,
    pub score: f64,
}

impl fmt::Display for RecognitionCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Title: {} | Artist: {} | Score: {}",
            self.title,
            self.artist,
            format_score(self.score)
        )
    }
}

/// Two decimals, halves rounded away from zero on the shortest decimal form
/// (`{:.2}` would turn 0.125 into "0.12")
fn format_score(score: f64) -> String {
    if !score.is_finite() {
        return format!("{:.2}", score);
    }

    let repr = score.abs().to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));
    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(2))
        .map(|b| b - b'0')
        .collect();

    if frac_part.as_bytes().get(2).is_some_and(|&d| d >= b'5') {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, 1);
                break;
            }
            i -= 1;
            if digits[i] == 9 {
                digits[i] = 0;
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let negative = score < 0.0 && digits.iter().any(|&d| d != 0);
    let split = digits.len() - 2;
    let text: String = digits.iter().map(|d| char::from(b'0' + d)).collect();
    format!(
        "{}{}.{}",
        if negative { "-" } else { "" },
        &text[..split],
        &text[split..]
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionSummary {
    best_index: usize,
    candidates: Vec<RecognitionCandidate>,
}

impl RecognitionSummary {
    pub fn best(&self) -> &RecognitionCandidate {
        &self.candidates[self.best_index]
    }

    pub fn best_index(&self) -> usize {
        self.best_index
    }

    /// All candidates in the order the service listed them
    pub fn candidates(&self) -> &[RecognitionCandidate] {
        &self.candidates
    }

    pub fn render(&self) -> String {
        let mut out = format!("Best Match:\n{}\n\n", self.best());
        for (i, candidate) in self.candidates.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, candidate));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionOutcome {
    Match(RecognitionSummary),
    NoMatch,
    ParseError(String),
}

impl RecognitionOutcome {
    /// Text shown to the user for this outcome
    pub fn display_text(&self) -> String {
        match self {
            RecognitionOutcome::Match(summary) => summary.render(),
            RecognitionOutcome::NoMatch => format!("{}\n", NO_MATCH_TEXT),
            RecognitionOutcome::ParseError(_) => format!("{}\n", PARSE_FAILED_TEXT),
        }
    }
}

pub fn reduce(raw: &str) -> RecognitionOutcome {
    debug!("Result JSON: {}", raw);
    match try_reduce(raw) {
        Ok(Some(summary)) => RecognitionOutcome::Match(summary),
        Ok(None) => RecognitionOutcome::NoMatch,
        Err(e) => {
            error!("Failed to parse recognition result: {}", e);
            RecognitionOutcome::ParseError(e)
        }
    }
}

fn try_reduce(raw: &str) -> Result<Option<RecognitionSummary>, String> {
    let json: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;

    let status = json
        .get("status")
        .and_then(Value::as_object)
        .ok_or("missing status object")?;
    let code = status
        .get("code")
        .and_then(as_int)
        .ok_or("missing or non-integer status code")?;

    let metadata = match json.get("metadata") {
        Some(metadata) if code == 0 => metadata
            .as_object()
            .ok_or("metadata is not an object")?,
        _ => return Ok(None),
    };

    // "music" takes precedence when both are present
    let Some(list) = metadata.get("music").or_else(|| metadata.get("humming")) else {
        return Ok(None);
    };
    let entries = list.as_array().ok_or("candidate list is not an array")?;
    if entries.is_empty() {
        return Ok(None);
    }

    let candidates = entries
        .iter()
        .map(parse_candidate)
        .collect::<Result<Vec<_>, _>>()?;

    let mut best_index = 0;
    for (i, candidate) in candidates.iter().enumerate().skip(1) {
        if candidate.score > candidates[best_index].score {
            best_index = i;
        }
    }

    Ok(Some(RecognitionSummary {
        best_index,
        candidates,
    }))
}

fn parse_candidate(entry: &Value) -> Result<RecognitionCandidate, String> {
    let obj = entry.as_object().ok_or("candidate is not an object")?;

    let artist = match obj.get("artists") {
        None | Some(Value::Null) => UNKNOWN.to_string(),
        Some(artists) => {
            let artists = artists.as_array().ok_or("artists is not an array")?;
            match artists.first() {
                Some(first) => {
                    let first = first.as_object().ok_or("artist is not an object")?;
                    opt_string(first, "name")
                }
                None => UNKNOWN.to_string(),
            }
        }
    };

    Ok(RecognitionCandidate {
        title: opt_string(obj, "title"),
        artist,
        score: opt_score(obj),
    })
}

fn opt_string(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        None | Some(Value::Null) => UNKNOWN.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn opt_score(obj: &Map<String, Value>) -> f64 {
    match obj.get("score") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(raw: &str) -> RecognitionSummary {
        match reduce(raw) {
            RecognitionOutcome::Match(summary) => summary,
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[test]
    fn test_single_candidate_is_best_and_listed() {
        let raw = r#"{"status":{"code":0},"metadata":{"music":[
            {"title":"晴天","score":87.5,"artists":[{"name":"周杰伦"},{"name":"Other"}]}
        ]}}"#;
        let s = summary(raw);
        assert_eq!(s.best().title, "晴天");
        assert_eq!(s.best().artist, "周杰伦");
        assert_eq!(s.candidates().len(), 1);
        assert_eq!(
            s.render(),
            "Best Match:\nTitle: 晴天 | Artist: 周杰伦 | Score: 87.50\n\n1. Title: 晴天 | Artist: 周杰伦 | Score: 87.50\n"
        );
    }

    #[test]
    fn test_highest_score_wins_and_list_keeps_order() {
        let raw = r#"{"status":{"code":0},"metadata":{"music":[
            {"title":"A","score":40},
            {"title":"B","score":95},
            {"title":"C","score":70}
        ]}}"#;
        let s = summary(raw);
        assert_eq!(s.best().title, "B");
        assert_eq!(s.best_index(), 1);
        let titles: Vec<&str> = s.candidates().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_tie_keeps_earliest() {
        let raw = r#"{"status":{"code":0},"metadata":{"humming":[
            {"title":"low","score":10},
            {"title":"first","score":90},
            {"title":"second","score":90}
        ]}}"#;
        assert_eq!(summary(raw).best().title, "first");
    }

    #[test]
    fn test_missing_fields_default() {
        let raw = r#"{"status":{"code":0},"metadata":{"music":[{}, {"artists":[]}]}}"#;
        let s = summary(raw);
        assert_eq!(
            s.best(),
            &RecognitionCandidate {
                title: "Unknown".to_string(),
                artist: "Unknown".to_string(),
                score: 0.0,
            }
        );
        assert_eq!(s.best_index(), 0);
        assert!(s.render().contains("2. Title: Unknown | Artist: Unknown | Score: 0.00"));
    }

    #[test]
    fn test_no_match_cases() {
        let cases = [
            r#"{"status":{"code":1001,"msg":"No result"}}"#,
            r#"{"status":{"code":2000},"metadata":{"music":[{"title":"x"}]}}"#,
            r#"{"status":{"code":0}}"#,
            r#"{"status":{"code":0},"metadata":{}}"#,
            r#"{"status":{"code":0},"metadata":{"music":[]}}"#,
        ];
        for raw in cases {
            assert_eq!(reduce(raw), RecognitionOutcome::NoMatch, "input: {}", raw);
        }
        assert_eq!(RecognitionOutcome::NoMatch.display_text(), "No match found.\n");
    }

    #[test]
    fn test_music_preferred_over_humming() {
        let raw = r#"{"status":{"code":0},"metadata":{
            "humming":[{"title":"hum","score":99}],
            "music":[{"title":"track","score":1}]
        }}"#;
        assert_eq!(summary(raw).best().title, "track");
    }

    #[test]
    fn test_structural_failures_are_parse_errors() {
        let cases = [
            "not json",
            r#"{"metadata":{"music":[]}}"#,
            r#"{"status":"ok"}"#,
            r#"{"status":{}}"#,
            r#"{"status":{"code":0},"metadata":{"music":{"title":"x"}}}"#,
            r#"{"status":{"code":0},"metadata":{"music":[{"artists":"nobody"}]}}"#,
        ];
        for raw in cases {
            let outcome = reduce(raw);
            assert!(
                matches!(outcome, RecognitionOutcome::ParseError(_)),
                "input: {} gave {:?}",
                raw,
                outcome
            );
            assert_eq!(outcome.display_text(), "Result parsing failed.\n");
        }
    }

    #[test]
    fn test_string_scores_are_accepted() {
        let raw = r#"{"status":{"code":"0"},"metadata":{"music":[{"title":"x","score":"12.345"}]}}"#;
        assert!((summary(raw).best().score - 12.345).abs() < 1e-9);
    }

    #[test]
    fn test_score_halves_round_up() {
        assert_eq!(format_score(0.125), "0.13");
        assert_eq!(format_score(2.675), "2.68");
        assert_eq!(format_score(9.995), "10.00");
        assert_eq!(format_score(12.344), "12.34");
        assert_eq!(format_score(40.0), "40.00");
        assert_eq!(format_score(0.0), "0.00");
        assert_eq!(format_score(-0.125), "-0.13");
    }

    #[test]
    fn test_summary_uses_half_up_score() {
        let raw = r#"{"status":{"code":0},"metadata":{"music":[{"title":"x","score":0.125}]}}"#;
        assert!(summary(raw).render().contains("Score: 0.13\n"));
    }
}
