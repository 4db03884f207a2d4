//! Event vocabulary: type codes, labels and text tokens.
//!
//! The mapping from source type codes to event kinds, the label fallback,
//! the free-text tokens and the duplicate skip rules are all configuration.
//! [`Vocabulary`], [`TextTokens`] and [`SkipRule`] are the serde forms;
//! [`VocabularyTable`], [`TokenMatcher`] and [`CompiledSkipRule`] are the
//! lookup structures built from them once per process.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// What a type code or label means before any text is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Shot,
    FreeThrow,
    OffensiveRebound,
    DefensiveRebound,
    /// Rebound whose side is decided by the label
    Rebound,
    Turnover,
    Steal,
    Foul,
    OffensiveFoul,
    TechnicalFoul,
    Substitution,
    Timeout,
    JumpBall,
    PeriodStart,
    PeriodEnd,
    GameEnd,
    Ejection,
    Administrative,
}

impl EventKind {
    /// Returns all kinds.
    pub fn all() -> &'static [EventKind] {
        &[
            EventKind::Shot,
            EventKind::FreeThrow,
            EventKind::OffensiveRebound,
            EventKind::DefensiveRebound,
            EventKind::Rebound,
            EventKind::Turnover,
            EventKind::Steal,
            EventKind::Foul,
            EventKind::OffensiveFoul,
            EventKind::TechnicalFoul,
            EventKind::Substitution,
            EventKind::Timeout,
            EventKind::JumpBall,
            EventKind::PeriodStart,
            EventKind::PeriodEnd,
            EventKind::GameEnd,
            EventKind::Ejection,
            EventKind::Administrative,
        ]
    }

    /// Configuration name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Shot => "shot",
            EventKind::FreeThrow => "free_throw",
            EventKind::OffensiveRebound => "offensive_rebound",
            EventKind::DefensiveRebound => "defensive_rebound",
            EventKind::Rebound => "rebound",
            EventKind::Turnover => "turnover",
            EventKind::Steal => "steal",
            EventKind::Foul => "foul",
            EventKind::OffensiveFoul => "offensive_foul",
            EventKind::TechnicalFoul => "technical_foul",
            EventKind::Substitution => "substitution",
            EventKind::Timeout => "timeout",
            EventKind::JumpBall => "jump_ball",
            EventKind::PeriodStart => "period_start",
            EventKind::PeriodEnd => "period_end",
            EventKind::GameEnd => "game_end",
            EventKind::Ejection => "ejection",
            EventKind::Administrative => "administrative",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| VocabularyError::UnknownKind(s.to_string()))
    }
}

/// Errors found while compiling the vocabulary.
#[derive(Debug, thiserror::Error)]
pub enum VocabularyError {
    #[error("unknown event kind '{0}'")]
    UnknownKind(String),
    #[error("type code {code} is mapped to both '{first}' and '{second}'")]
    DuplicateCode {
        code: u32,
        first: EventKind,
        second: EventKind,
    },
    #[error("invalid pattern for '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// Versioned type-code and label mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// Vocabulary name, reported in processing notes
    pub name: String,
    /// Version, bumped when codes change meaning
    pub version: u32,
    /// Event kind name -> type codes
    pub codes: BTreeMap<String, Vec<u32>>,
    /// Lowercase type label -> event kind name, used when a code is unknown
    pub labels: BTreeMap<String, String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        let mut codes = BTreeMap::new();
        codes.insert(
            "shot".to_string(),
            vec![92, 93, 94, 95, 96, 110, 111, 112, 113, 114, 115, 116, 117, 118, 119, 120],
        );
        codes.insert("free_throw".to_string(), (97..=108).collect());
        codes.insert("offensive_rebound".to_string(), vec![155]);
        codes.insert("defensive_rebound".to_string(), vec![156]);
        codes.insert("rebound".to_string(), vec![157]);
        codes.insert(
            "turnover".to_string(),
            vec![62, 63, 64, 65, 66, 67, 68, 69, 70, 71, 73, 74, 84, 85, 86, 90],
        );
        codes.insert("foul".to_string(), (42..=50).collect());
        codes.insert("offensive_foul".to_string(), vec![37, 38]);
        codes.insert("technical_foul".to_string(), vec![35, 36, 39]);
        codes.insert("substitution".to_string(), vec![584]);
        codes.insert("timeout".to_string(), vec![16, 17]);
        codes.insert("jump_ball".to_string(), vec![615]);
        codes.insert("period_start".to_string(), vec![412]);
        codes.insert("period_end".to_string(), vec![402]);
        codes.insert("game_end".to_string(), vec![403]);
        codes.insert("ejection".to_string(), vec![213]);
        codes.insert("administrative".to_string(), vec![214]);

        let mut labels = BTreeMap::new();
        for (label, kind) in [
            ("offensive rebound", "offensive_rebound"),
            ("defensive rebound", "defensive_rebound"),
            ("substitution", "substitution"),
            ("timeout", "timeout"),
            ("full timeout", "timeout"),
            ("jump ball", "jump_ball"),
            ("start period", "period_start"),
            ("end period", "period_end"),
            ("end game", "game_end"),
            ("steal", "steal"),
            ("technical foul", "technical_foul"),
            ("offensive foul", "offensive_foul"),
            ("offensive charge", "offensive_foul"),
            ("personal foul", "foul"),
            ("shooting foul", "foul"),
            ("jump shot", "shot"),
        ] {
            labels.insert(label.to_string(), kind.to_string());
        }

        Self {
            name: "pbp_default".to_string(),
            version: 1,
            codes,
            labels,
        }
    }
}

/// Free-text tokens the classifier looks for in descriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextTokens {
    pub made: Vec<String>,
    pub missed: Vec<String>,
    pub three_point: Vec<String>,
    /// Matched inside a parenthetical only
    pub assist: Vec<String>,
    /// Matched inside a parenthetical only
    pub steal: Vec<String>,
    pub block: Vec<String>,
    /// A foul whose text carries one of these is an offensive foul
    pub charge: Vec<String>,
    pub possession_retaining_free_throw: Vec<String>,
    /// Regex with two capture groups: throw index and trip length
    pub free_throw_sequence: String,
}

impl Default for TextTokens {
    fn default() -> Self {
        fn words(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }

        Self {
            made: words(&["makes", "made"]),
            missed: words(&["misses", "missed"]),
            three_point: words(&["three point", "3-point"]),
            assist: words(&["assists"]),
            steal: words(&["steals"]),
            block: words(&["blocks"]),
            charge: words(&["charge"]),
            possession_retaining_free_throw: words(&["technical", "flagrant", "clear path"]),
            free_throw_sequence: r"(?i)\b(\d+)\s+of\s+(\d+)\b".to_string(),
        }
    }
}

/// Named rule that removes a duplicate encoding of one real event.
///
/// An event whose type code is in `codes` is skipped when the same game has
/// an event of one of the `companions` kinds at the same period and clock
/// with the same primary player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipRule {
    pub name: String,
    pub codes: Vec<u32>,
    pub companions: Vec<String>,
}

impl SkipRule {
    /// The offensive foul that the feed also records as a turnover.
    pub fn offensive_foul_turnover() -> Self {
        Self {
            name: "offensive_foul_turnover".to_string(),
            codes: vec![86],
            companions: vec!["offensive_foul".to_string()],
        }
    }
}

/// Compiled code and label lookup.
#[derive(Debug, Clone)]
pub struct VocabularyTable {
    name: String,
    version: u32,
    by_code: HashMap<u32, EventKind>,
    by_label: HashMap<String, EventKind>,
}

impl VocabularyTable {
    /// Builds the lookup, rejecting unknown kind names and codes mapped twice.
    pub fn compile(vocabulary: &Vocabulary) -> Result<Self, VocabularyError> {
        let mut by_code = HashMap::new();
        for (kind_name, codes) in &vocabulary.codes {
            let kind: EventKind = kind_name.parse()?;
            for &code in codes {
                if let Some(first) = by_code.insert(code, kind) {
                    if first != kind {
                        return Err(VocabularyError::DuplicateCode {
                            code,
                            first,
                            second: kind,
                        });
                    }
                }
            }
        }

        let mut by_label = HashMap::new();
        for (label, kind_name) in &vocabulary.labels {
            by_label.insert(label.trim().to_lowercase(), kind_name.parse()?);
        }

        Ok(Self {
            name: vocabulary.name.clone(),
            version: vocabulary.version,
            by_code,
            by_label,
        })
    }

    /// Looks up a type code.
    pub fn kind_for_code(&self, code: u32) -> Option<EventKind> {
        self.by_code.get(&code).copied()
    }

    /// Looks up a type label, case-insensitively.
    pub fn kind_for_label(&self, label: &str) -> Option<EventKind> {
        self.by_label.get(&label.trim().to_lowercase()).copied()
    }

    /// Code first, then label.
    pub fn lookup(&self, code: u32, label: &str) -> Option<EventKind> {
        self.kind_for_code(code).or_else(|| self.kind_for_label(label))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }
}

/// Compiled token patterns.
#[derive(Debug, Clone)]
pub struct TokenMatcher {
    made: Option<Regex>,
    missed: Option<Regex>,
    three_point: Option<Regex>,
    assist: Option<Regex>,
    steal: Option<Regex>,
    block: Option<Regex>,
    charge: Option<Regex>,
    retaining: Option<Regex>,
    sequence: Regex,
}

impl TokenMatcher {
    /// Compiles every token list into a case-insensitive word-boundary pattern.
    pub fn compile(tokens: &TextTokens) -> Result<Self, VocabularyError> {
        Ok(Self {
            made: word_pattern("made", &tokens.made)?,
            missed: word_pattern("missed", &tokens.missed)?,
            three_point: word_pattern("three_point", &tokens.three_point)?,
            assist: parenthetical_pattern("assist", &tokens.assist)?,
            steal: parenthetical_pattern("steal", &tokens.steal)?,
            block: word_pattern("block", &tokens.block)?,
            charge: word_pattern("charge", &tokens.charge)?,
            retaining: word_pattern(
                "possession_retaining_free_throw",
                &tokens.possession_retaining_free_throw,
            )?,
            sequence: Regex::new(&tokens.free_throw_sequence).map_err(|source| {
                VocabularyError::InvalidPattern {
                    name: "free_throw_sequence".to_string(),
                    source,
                }
            })?,
        })
    }

    pub fn is_made(&self, text: &str) -> bool {
        matches(&self.made, text)
    }

    pub fn is_missed(&self, text: &str) -> bool {
        matches(&self.missed, text)
    }

    pub fn is_three(&self, text: &str) -> bool {
        matches(&self.three_point, text)
    }

    pub fn has_assist(&self, text: &str) -> bool {
        matches(&self.assist, text)
    }

    pub fn has_steal(&self, text: &str) -> bool {
        matches(&self.steal, text)
    }

    pub fn has_block(&self, text: &str) -> bool {
        matches(&self.block, text)
    }

    pub fn has_charge(&self, text: &str) -> bool {
        matches(&self.charge, text)
    }

    pub fn retains_possession(&self, text: &str) -> bool {
        matches(&self.retaining, text)
    }

    /// Extracts the "N of M" position of a free throw.
    pub fn free_throw_position(&self, text: &str) -> Option<(u8, u8)> {
        let caps = self.sequence.captures(text)?;
        let index = caps.get(1)?.as_str().parse().ok()?;
        let total = caps.get(2)?.as_str().parse().ok()?;
        if index == 0 || total == 0 {
            return None;
        }
        Some((index, total))
    }
}

fn matches(pattern: &Option<Regex>, text: &str) -> bool {
    pattern.as_ref().map_or(false, |re| re.is_match(text))
}

fn alternation(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|t| regex::escape(t.trim()))
        .collect::<Vec<_>>()
        .join("|")
}

fn word_pattern(name: &str, tokens: &[String]) -> Result<Option<Regex>, VocabularyError> {
    if tokens.is_empty() {
        return Ok(None);
    }
    build(name, &format!(r"(?i)\b(?:{})\b", alternation(tokens)))
}

fn parenthetical_pattern(name: &str, tokens: &[String]) -> Result<Option<Regex>, VocabularyError> {
    if tokens.is_empty() {
        return Ok(None);
    }
    build(name, &format!(r"(?i)\([^)]*\b(?:{})\b[^)]*\)", alternation(tokens)))
}

fn build(name: &str, pattern: &str) -> Result<Option<Regex>, VocabularyError> {
    Regex::new(pattern)
        .map(Some)
        .map_err(|source| VocabularyError::InvalidPattern {
            name: name.to_string(),
            source,
        })
}

/// Skip rule with its codes and companion kinds resolved.
#[derive(Debug, Clone)]
pub struct CompiledSkipRule {
    pub name: String,
    pub codes: HashSet<u32>,
    pub companions: Vec<EventKind>,
}

impl CompiledSkipRule {
    pub fn compile(rule: &SkipRule) -> Result<Self, VocabularyError> {
        let companions = rule
            .companions
            .iter()
            .map(|k| k.parse())
            .collect::<Result<Vec<EventKind>, _>>()?;
        Ok(Self {
            name: rule.name.clone(),
            codes: rule.codes.iter().copied().collect(),
            companions,
        })
    }

    /// Returns true if this rule covers `code`.
    pub fn applies_to(&self, code: u32) -> bool {
        self.codes.contains(&code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_roundtrip() {
        for &kind in EventKind::all() {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        assert!("goaltending".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_default_table_lookup() {
        let table = VocabularyTable::compile(&Vocabulary::default()).unwrap();
        assert_eq!(table.kind_for_code(92), Some(EventKind::Shot));
        assert_eq!(table.kind_for_code(99), Some(EventKind::FreeThrow));
        assert_eq!(table.kind_for_code(86), Some(EventKind::Turnover));
        assert_eq!(table.kind_for_code(37), Some(EventKind::OffensiveFoul));
        assert_eq!(table.kind_for_code(999), None);
        assert_eq!(table.name(), "pbp_default");
        assert_eq!(table.version(), 1);
    }

    #[test]
    fn test_label_fallback_is_case_insensitive() {
        let table = VocabularyTable::compile(&Vocabulary::default()).unwrap();
        assert_eq!(table.lookup(9000, "Defensive Rebound"), Some(EventKind::DefensiveRebound));
        assert_eq!(table.lookup(9000, "  FULL TIMEOUT "), Some(EventKind::Timeout));
        assert_eq!(table.lookup(9000, "Goaltending"), None);
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let mut vocabulary = Vocabulary::default();
        vocabulary.codes.insert("steal".to_string(), vec![92]);
        match VocabularyTable::compile(&vocabulary) {
            Err(VocabularyError::DuplicateCode { code, .. }) => assert_eq!(code, 92),
            other => panic!("expected duplicate code error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let mut vocabulary = Vocabulary::default();
        vocabulary.labels.insert("goaltending".to_string(), "goaltend".to_string());
        assert!(matches!(
            VocabularyTable::compile(&vocabulary),
            Err(VocabularyError::UnknownKind(k)) if k == "goaltend"
        ));
    }

    #[test]
    fn test_word_tokens_respect_boundaries() {
        let matcher = TokenMatcher::compile(&TextTokens::default()).unwrap();
        assert!(matcher.is_made("Tatum MAKES 22-foot jumper"));
        assert!(matcher.is_missed("Tatum misses layup"));
        assert!(!matcher.is_made("Remakes history"));
        assert!(matcher.is_three("Brown makes 25-foot three point jumper"));
        assert!(matcher.is_three("White misses 3-point jumper"));
        assert!(!matcher.is_three("Hart makes 3-foot dunk"));
    }

    #[test]
    fn test_parenthetical_markers() {
        let matcher = TokenMatcher::compile(&TextTokens::default()).unwrap();
        assert!(matcher.has_assist("Brown makes layup (Tatum assists)"));
        assert!(!matcher.has_assist("Brown assists nobody"));
        assert!(matcher.has_steal("Brunson bad pass (White steals)"));
        assert!(matcher.has_block("Randle misses jumper (Porzingis blocks)"));
    }

    #[test]
    fn test_free_throw_position() {
        let matcher = TokenMatcher::compile(&TextTokens::default()).unwrap();
        assert_eq!(matcher.free_throw_position("makes free throw 2 of 3"), Some((2, 3)));
        assert_eq!(matcher.free_throw_position("Free Throw - 1 of 1"), Some((1, 1)));
        assert_eq!(matcher.free_throw_position("makes technical free throw"), None);
    }

    #[test]
    fn test_retaining_tokens() {
        let matcher = TokenMatcher::compile(&TextTokens::default()).unwrap();
        assert!(matcher.retains_possession("makes technical free throw"));
        assert!(matcher.retains_possession("misses free throw flagrant 1 of 2"));
        assert!(matcher.retains_possession("makes clear path free throw 1 of 2"));
        assert!(!matcher.retains_possession("makes free throw 1 of 2"));
    }

    #[test]
    fn test_empty_token_list_never_matches() {
        let tokens = TextTokens {
            charge: Vec::new(),
            ..TextTokens::default()
        };
        let matcher = TokenMatcher::compile(&tokens).unwrap();
        assert!(!matcher.has_charge("offensive charge"));
    }

    #[test]
    fn test_invalid_sequence_pattern() {
        let tokens = TextTokens {
            free_throw_sequence: "(unclosed".to_string(),
            ..TextTokens::default()
        };
        assert!(matches!(
            TokenMatcher::compile(&tokens),
            Err(VocabularyError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_skip_rule_compile() {
        let rule = CompiledSkipRule::compile(&SkipRule::offensive_foul_turnover()).unwrap();
        assert!(rule.applies_to(86));
        assert!(!rule.applies_to(84));
        assert_eq!(rule.companions, vec![EventKind::OffensiveFoul]);
    }
}
