//! Raw play-by-play rows.
//!
//! A [`RawEvent`] is one row of the source log exactly as the data-access
//! layer delivered it. Nothing here interprets the row; classification lives
//! in the engine crate.

use serde::{Deserialize, Deserializer, Serialize};

use crate::clock::GameClock;
use crate::{PlayerId, TeamId};

/// One row of a game's play-by-play log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Strictly increasing within a game; defines the total order
    pub sequence: u64,
    /// Period number, starting at 1
    pub period: u8,
    /// Game clock display string (e.g. "11:42", "45.3")
    #[serde(default)]
    pub clock: String,
    /// Free-text description of the play
    #[serde(default)]
    pub description: String,
    /// Source-specific type code
    pub type_code: u32,
    /// Source-specific type label
    #[serde(default)]
    pub type_label: String,
    /// Primary actor (shooter, rebounder, fouler, turnover committer)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_player: Option<PlayerId>,
    /// Secondary actor (assister, blocker, stealer)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_player: Option<PlayerId>,
    /// Rare tertiary actor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tertiary_player: Option<PlayerId>,
    /// Acting team, when the source provides it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    /// Source scoring flag
    #[serde(default, deserialize_with = "flag")]
    pub scoring_play: bool,
    /// Source shooting-attempt flag
    #[serde(default, deserialize_with = "flag")]
    pub shooting_play: bool,
    /// Running home score after this event
    #[serde(default)]
    pub home_score: u32,
    /// Running away score after this event
    #[serde(default)]
    pub away_score: u32,
}

impl RawEvent {
    /// Parses the clock display string, if it is well formed.
    pub fn clock(&self) -> Option<GameClock> {
        self.clock.parse().ok()
    }

    /// Returns all player ids attached to this event, in actor order.
    pub fn player_ids(&self) -> Vec<&str> {
        [
            &self.primary_player,
            &self.secondary_player,
            &self.tertiary_player,
        ]
        .into_iter()
        .filter_map(|p| p.as_deref())
        .collect()
    }

    /// Checks if a specific player is involved in this event.
    pub fn involves_player(&self, player_id: &str) -> bool {
        self.player_ids().contains(&player_id)
    }

    /// Serializes this event to a JSON line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes an event from a JSON line.
    pub fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Accepts both JSON booleans and the 0/1 integers older feeds emit.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Int(i) => Ok(i != 0),
    }
}

/// Builder for creating raw events with a fluent API.
///
/// # Example
///
/// ```
/// use pbp_events::RawEventBuilder;
///
/// let event = RawEventBuilder::new(1, 92)
///     .description("Jayson Tatum makes 22-foot jumper")
///     .primary("tatum")
///     .scoring()
///     .score(2, 0)
///     .build();
/// assert!(event.scoring_play);
/// ```
#[derive(Debug, Clone)]
pub struct RawEventBuilder {
    event: RawEvent,
}

impl RawEventBuilder {
    /// Creates a builder with the required sequence number and type code.
    pub fn new(sequence: u64, type_code: u32) -> Self {
        Self {
            event: RawEvent {
                sequence,
                period: 1,
                clock: "12:00".to_string(),
                description: String::new(),
                type_code,
                type_label: String::new(),
                primary_player: None,
                secondary_player: None,
                tertiary_player: None,
                team_id: None,
                scoring_play: false,
                shooting_play: false,
                home_score: 0,
                away_score: 0,
            },
        }
    }

    /// Sets the period.
    pub fn period(mut self, period: u8) -> Self {
        self.event.period = period;
        self
    }

    /// Sets the clock display string.
    pub fn clock(mut self, clock: impl Into<String>) -> Self {
        self.event.clock = clock.into();
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.event.description = description.into();
        self
    }

    /// Sets the type label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.event.type_label = label.into();
        self
    }

    /// Sets the primary player.
    pub fn primary(mut self, player_id: impl Into<String>) -> Self {
        self.event.primary_player = Some(player_id.into());
        self
    }

    /// Sets the secondary player.
    pub fn secondary(mut self, player_id: impl Into<String>) -> Self {
        self.event.secondary_player = Some(player_id.into());
        self
    }

    /// Sets the tertiary player.
    pub fn tertiary(mut self, player_id: impl Into<String>) -> Self {
        self.event.tertiary_player = Some(player_id.into());
        self
    }

    /// Sets the acting team.
    pub fn team(mut self, team_id: impl Into<String>) -> Self {
        self.event.team_id = Some(team_id.into());
        self
    }

    /// Marks the event as a scoring play.
    pub fn scoring(mut self) -> Self {
        self.event.scoring_play = true;
        self
    }

    /// Marks the event as a shooting attempt.
    pub fn shooting(mut self) -> Self {
        self.event.shooting_play = true;
        self
    }

    /// Sets the running score after the event.
    pub fn score(mut self, home: u32, away: u32) -> Self {
        self.event.home_score = home;
        self.event.away_score = away;
        self
    }

    /// Builds the event.
    pub fn build(self) -> RawEvent {
        self.event
    }
}
