//! Box score engine: play-by-play in, validated box scores out.
//!
//! Each game runs through a single-threaded pipeline. The classifier turns
//! raw events into typed stat deltas, the possession tracker follows who has
//! the ball, the aggregator folds deltas into player and team lines, and the
//! validator checks the result for internal consistency. Games are
//! independent, so batches run in parallel.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   RawEvent   ┌────────────┐  ClassifiedEvent  ┌────────────┐
//! │ events +   │ ───────────▶ │ classifier │ ────────────────▶ │ possession │
//! │ roster     │              └────────────┘                   └────────────┘
//! └────────────┘                     │                               │ timeline
//!                                    ▼                               ▼
//!                             ┌────────────┐  BoxScoreResult   ┌────────────┐
//!                             │ aggregator │ ────────────────▶ │ validator  │
//!                             └────────────┘                   └────────────┘
//! ```
//!
//! # Modules
//!
//! - [`vocabulary`]: Type code, label and text token tables
//! - [`classifier`]: Raw event classification
//! - [`possession`]: Possession tracking
//! - [`aggregator`]: Box score accumulation and derived metrics
//! - [`validator`]: Consistency checks
//! - [`output`]: Game outputs and JSON Lines I/O
//! - [`config`]: TOML configuration

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod output;
pub mod possession;
pub mod validator;
pub mod vocabulary;

// Re-export config types
pub use config::{
    default_config_toml, BatchConfig, ConfigError, EngineConfig, GameFormat, ValidationConfig,
};

// Re-export vocabulary types
pub use vocabulary::{
    CompiledSkipRule, EventKind, SkipRule, TextTokens, TokenMatcher, Vocabulary, VocabularyError,
    VocabularyTable,
};

// Re-export classifier types
pub use classifier::{ClassifyError, EventClassifier, StreamContext};

// Re-export possession types
pub use possession::{
    track, AmbiguousTransition, BoundaryReason, Continuation, OwnerAt, PossessionBoundary,
    PossessionState, PossessionTimeline, PossessionTracker,
};

// Re-export aggregator types
pub use aggregator::{
    aggregate, estimated_possessions, BoxScoreAggregator, BoxScoreResult, PlayerAccumulator,
    PlayerBox, ShootingSplits, TeamAccumulator, TeamBox, FTA_WEIGHT,
};

// Re-export validator types
pub use validator::{
    CheckResult, CheckRule, ConsistencyValidator, PossessionCrossCheck, ValidationReport,
};

// Re-export output types
pub use output::{GameOutput, OutputError, OutputReader, OutputWriter, ProcessingNotes};

use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;

use pbp_events::{FeedError, GameRoster, RawEvent};

/// Errors that can occur outside a single game's processing.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Error loading configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    /// Error compiling the vocabulary or tokens
    #[error("Vocabulary error: {0}")]
    Vocabulary(#[from] VocabularyError),
    /// Error reading an event feed or roster
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
    /// Error writing or reading output
    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

/// One game's input: its roster and raw events.
#[derive(Debug, Clone, PartialEq)]
pub struct GameInput {
    pub roster: GameRoster,
    pub events: Vec<RawEvent>,
}

impl GameInput {
    pub fn new(roster: GameRoster, events: Vec<RawEvent>) -> Self {
        Self { roster, events }
    }

    /// Loads a JSON Lines event feed and a JSON roster.
    pub fn from_files(events_path: &Path, roster_path: &Path) -> Result<Self, FeedError> {
        let roster = pbp_events::read_roster(roster_path)?;
        let events = pbp_events::read_events(events_path)?;
        Ok(Self { roster, events })
    }

    pub fn game_id(&self) -> &str {
        &self.roster.game_id
    }
}

/// Runs games through classify, track, aggregate and validate.
///
/// The compiled classifier is shared behind an [`Arc`]; a pipeline holds no
/// mutable state, so one instance can process any number of games at once.
#[derive(Debug, Clone)]
pub struct GamePipeline {
    classifier: Arc<EventClassifier>,
    format: GameFormat,
    validator: ConsistencyValidator,
    threads: usize,
}

impl GamePipeline {
    /// Builds a pipeline from configuration, compiling its vocabulary.
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let classifier = EventClassifier::new(config)?;
        Ok(Self::with_classifier(Arc::new(classifier), config))
    }

    /// Loads configuration from a TOML file and builds a pipeline.
    pub fn from_config_file(path: &Path) -> Result<Self, EngineError> {
        let config = EngineConfig::from_file(path)?;
        Self::new(&config)
    }

    /// Builds a pipeline around an already compiled classifier.
    pub fn with_classifier(classifier: Arc<EventClassifier>, config: &EngineConfig) -> Self {
        Self {
            classifier,
            format: config.format.clone(),
            validator: ConsistencyValidator::new(config.validation.clone()),
            threads: config.batch.threads,
        }
    }

    pub fn classifier(&self) -> &Arc<EventClassifier> {
        &self.classifier
    }

    /// Processes one game.
    pub fn process(&self, input: &GameInput) -> GameOutput {
        let game_id = input.game_id().to_string();
        let vocabulary = self.classifier.vocabulary();
        let mut notes = ProcessingNotes::new(vocabulary.name(), vocabulary.version());

        let reordered = input
            .events
            .windows(2)
            .any(|pair| pair[0].sequence > pair[1].sequence);
        let sorted;
        let events: &[RawEvent] = if reordered {
            tracing::warn!("{}: events out of sequence order, sorting", game_id);
            let mut owned = input.events.clone();
            owned.sort_by_key(|event| event.sequence);
            sorted = owned;
            &sorted
        } else {
            &input.events
        };
        notes.reordered = reordered;

        let classified = self.classifier.classify_game(events, &input.roster);
        notes.record_events(&classified);

        let timeline = track(&classified, &input.roster);
        notes.ambiguous_transitions = timeline.ambiguous.clone();

        let box_score = aggregate(
            &classified,
            &timeline,
            &input.roster,
            events.last(),
            &self.format,
        );
        let validation = self.validator.validate(&box_score);

        tracing::debug!(
            "{}: {} events, {} possessions, {}-{}, validation {}",
            game_id,
            events.len(),
            box_score.possessions,
            box_score.home_score,
            box_score.away_score,
            if validation.passed() { "passed" } else { "failed" }
        );

        GameOutput {
            game_id,
            box_score,
            validation,
            notes,
        }
    }

    /// Processes many games in parallel. Outputs keep the input order.
    pub fn process_games(&self, inputs: &[GameInput]) -> Vec<GameOutput> {
        let action = || {
            inputs
                .par_iter()
                .map(|input| self.process(input))
                .collect::<Vec<_>>()
        };

        if self.threads == 0 {
            return action();
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
        {
            Ok(pool) => pool.install(action),
            Err(_) => action(),
        }
    }

    /// Processes many games and writes them to `output_dir`.
    pub fn process_to_dir(
        &self,
        inputs: &[GameInput],
        output_dir: &Path,
    ) -> Result<Vec<GameOutput>, EngineError> {
        let outputs = self.process_games(inputs);

        let mut writer = OutputWriter::new(output_dir)?;
        writer.write_all(&outputs)?;
        writer.flush()?;
        writer.write_summary()?;

        tracing::debug!(
            "wrote {} games to {} ({} failed validation)",
            writer.games_written(),
            output_dir.display(),
            writer.games_failed()
        );
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbp_events::RawEventBuilder;

    fn pipeline() -> GamePipeline {
        GamePipeline::new(&EngineConfig::default()).unwrap()
    }

    fn input(events: Vec<RawEvent>) -> GameInput {
        let roster = GameRoster::new("g1", "BOS", "NYK")
            .with_player("tatum", "BOS")
            .with_player("hart", "NYK");
        GameInput::new(roster, events)
    }

    fn made_two(seq: u64, player: &str, home: u32, away: u32) -> RawEvent {
        RawEventBuilder::new(seq, 92)
            .period(1)
            .clock("11:00")
            .description(format!("{} makes 2-pt jump shot", player))
            .primary(player)
            .scoring()
            .score(home, away)
            .build()
    }

    #[test]
    fn test_process_simple_game() {
        let output = pipeline().process(&input(vec![
            made_two(1, "tatum", 2, 0),
            made_two(2, "hart", 2, 2),
        ]));

        assert_eq!(output.game_id, "g1");
        assert!(output.passed());
        assert!(output.notes.is_clean());
        assert_eq!(output.box_score.home_score, 2);
        assert_eq!(output.box_score.player("tatum").unwrap().stats.pts, 2);
    }

    #[test]
    fn test_out_of_order_input_sorted() {
        let ordered = pipeline().process(&input(vec![
            made_two(1, "tatum", 2, 0),
            made_two(2, "hart", 2, 2),
        ]));
        let shuffled = pipeline().process(&input(vec![
            made_two(2, "hart", 2, 2),
            made_two(1, "tatum", 2, 0),
        ]));

        assert!(shuffled.notes.reordered);
        assert_eq!(shuffled.box_score, ordered.box_score);
        assert_eq!(shuffled.box_score.away_score, 2);
    }

    #[test]
    fn test_unrecognized_noted() {
        let goaltend = RawEventBuilder::new(2, 999)
            .period(1)
            .label("goaltending")
            .primary("hart")
            .build();
        let output = pipeline().process(&input(vec![made_two(1, "tatum", 2, 0), goaltend]));

        assert_eq!(output.notes.unrecognized, vec![2]);
        assert!(output.passed());
    }

    #[test]
    fn test_oversized_clock_does_not_abort_game() {
        let mut shot = made_two(1, "tatum", 2, 0);
        shot.clock = "9999999:00".to_string();
        let output = pipeline().process(&input(vec![shot, made_two(2, "hart", 2, 2)]));

        assert!(output.passed());
        assert_eq!(output.box_score.home_score, 2);
        assert_eq!(output.box_score.player("tatum").unwrap().stats.pts, 2);
        assert_eq!(output.box_score.player("hart").unwrap().stats.pts, 2);
    }

    #[test]
    fn test_empty_game() {
        let output = pipeline().process(&input(Vec::new()));
        assert!(output.passed());
        assert_eq!(output.box_score.possessions, 0);
        assert!(output.box_score.players.is_empty());
    }

    #[test]
    fn test_bad_token_pattern_fails_to_build() {
        let mut config = EngineConfig::default();
        config.tokens.free_throw_sequence = "(".to_string();
        assert!(matches!(
            GamePipeline::new(&config),
            Err(EngineError::Vocabulary(_))
        ));
    }

    #[test]
    fn test_process_games_keeps_order() {
        let mut config = EngineConfig::default();
        config.batch.threads = 2;
        let pipeline = GamePipeline::new(&config).unwrap();

        let inputs: Vec<_> = (0..4)
            .map(|i| {
                let roster = GameRoster::new(format!("g{}", i), "BOS", "NYK")
                    .with_player("tatum", "BOS");
                GameInput::new(roster, vec![made_two(1, "tatum", 2, 0)])
            })
            .collect();

        let outputs = pipeline.process_games(&inputs);
        let ids: Vec<_> = outputs.iter().map(|o| o.game_id.as_str()).collect();
        assert_eq!(ids, vec!["g0", "g1", "g2", "g3"]);
    }
}
