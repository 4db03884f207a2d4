//! Loading game feeds from JSON Lines.
//!
//! One raw event per line; blank lines are ignored. Rosters are plain JSON.

use std::fs;
use std::path::Path;

use crate::raw::RawEvent;
use crate::roster::GameRoster;

/// Errors that can occur while loading a feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("roster JSON error: {0}")]
    Roster(#[source] serde_json::Error),
}

/// Parses raw events from JSON Lines content.
pub fn parse_events(content: &str) -> Result<Vec<RawEvent>, FeedError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            RawEvent::from_jsonl(line).map_err(|source| FeedError::Parse { line: i + 1, source })
        })
        .collect()
}

/// Reads raw events from a JSON Lines file.
pub fn read_events(path: &Path) -> Result<Vec<RawEvent>, FeedError> {
    let content = fs::read_to_string(path)?;
    parse_events(&content)
}

/// Reads a roster from a JSON file.
pub fn read_roster(path: &Path) -> Result<GameRoster, FeedError> {
    let content = fs::read_to_string(path)?;
    GameRoster::from_json(&content).map_err(FeedError::Roster)
}

/// Serializes raw events as JSON Lines.
pub fn to_jsonl(events: &[RawEvent]) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    for event in events {
        out.push_str(&event.to_jsonl()?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawEventBuilder;

    #[test]
    fn test_parse_skips_blank_lines() {
        let content = r#"{"sequence":1,"period":1,"type_code":615}

{"sequence":2,"period":1,"type_code":92}
"#;
        let events = parse_events(content).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].sequence, 2);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let content = "{\"sequence\":1,\"period\":1,\"type_code\":615}\nnot json\n";
        match parse_events(content) {
            Err(FeedError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_to_jsonl_parses_back() {
        let events = vec![
            RawEventBuilder::new(1, 615).build(),
            RawEventBuilder::new(2, 92).primary("tatum").scoring().build(),
        ];
        let content = to_jsonl(&events).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert_eq!(parse_events(&content).unwrap(), events);
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_events(Path::new("/nonexistent/feed.jsonl"));
        assert!(matches!(result, Err(FeedError::Io(_))));
    }
}
