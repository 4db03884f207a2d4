//! Player-to-team membership for one game.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{PlayerId, TeamId};

/// Home or away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamSide {
    Home,
    Away,
}

impl TeamSide {
    /// Returns the other side.
    pub fn opposite(self) -> Self {
        match self {
            TeamSide::Home => TeamSide::Away,
            TeamSide::Away => TeamSide::Home,
        }
    }
}

impl fmt::Display for TeamSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamSide::Home => write!(f, "home"),
            TeamSide::Away => write!(f, "away"),
        }
    }
}

/// The two teams of a game and which team each player belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRoster {
    /// Game identifier
    pub game_id: String,
    /// Home team id
    pub home_team: TeamId,
    /// Away team id
    pub away_team: TeamId,
    /// Player id -> team id
    #[serde(default)]
    pub players: BTreeMap<PlayerId, TeamId>,
}

impl GameRoster {
    /// Creates a roster with no players.
    pub fn new(
        game_id: impl Into<String>,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            home_team: home_team.into(),
            away_team: away_team.into(),
            players: BTreeMap::new(),
        }
    }

    /// Adds a player to a team.
    pub fn add_player(&mut self, player_id: impl Into<String>, team_id: impl Into<String>) {
        self.players.insert(player_id.into(), team_id.into());
    }

    /// Builder-style variant of [`add_player`](Self::add_player).
    pub fn with_player(mut self, player_id: impl Into<String>, team_id: impl Into<String>) -> Self {
        self.add_player(player_id, team_id);
        self
    }

    /// Returns the team a player belongs to.
    pub fn team_of(&self, player_id: &str) -> Option<&TeamId> {
        self.players.get(player_id)
    }

    /// Returns which side a team plays on, if it is one of the two teams.
    pub fn side_of(&self, team_id: &str) -> Option<TeamSide> {
        if team_id == self.home_team {
            Some(TeamSide::Home)
        } else if team_id == self.away_team {
            Some(TeamSide::Away)
        } else {
            None
        }
    }

    /// Returns the team id playing on `side`.
    pub fn team_on(&self, side: TeamSide) -> &TeamId {
        match side {
            TeamSide::Home => &self.home_team,
            TeamSide::Away => &self.away_team,
        }
    }

    /// Returns the other team, if `team_id` is one of the two teams.
    pub fn opponent_of(&self, team_id: &str) -> Option<&TeamId> {
        self.side_of(team_id)
            .map(|side| self.team_on(side.opposite()))
    }

    /// Returns true if `team_id` is one of the two teams.
    pub fn is_participant(&self, team_id: &str) -> bool {
        self.side_of(team_id).is_some()
    }

    /// Returns the player ids of one team, sorted.
    pub fn players_of(&self, team_id: &str) -> Vec<&PlayerId> {
        self.players
            .iter()
            .filter(|(_, t)| t.as_str() == team_id)
            .map(|(p, _)| p)
            .collect()
    }

    /// Deserializes a roster from JSON.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> GameRoster {
        GameRoster::new("g1", "BOS", "NYK")
            .with_player("tatum", "BOS")
            .with_player("brown", "BOS")
            .with_player("brunson", "NYK")
    }

    #[test]
    fn test_team_of() {
        let roster = roster();
        assert_eq!(roster.team_of("tatum").map(String::as_str), Some("BOS"));
        assert_eq!(roster.team_of("brunson").map(String::as_str), Some("NYK"));
        assert!(roster.team_of("nobody").is_none());
    }

    #[test]
    fn test_opponent_of() {
        let roster = roster();
        assert_eq!(roster.opponent_of("BOS").map(String::as_str), Some("NYK"));
        assert_eq!(roster.opponent_of("NYK").map(String::as_str), Some("BOS"));
        assert!(roster.opponent_of("LAL").is_none());
    }

    #[test]
    fn test_side_of() {
        let roster = roster();
        assert_eq!(roster.side_of("BOS"), Some(TeamSide::Home));
        assert_eq!(roster.side_of("NYK"), Some(TeamSide::Away));
        assert_eq!(TeamSide::Home.opposite(), TeamSide::Away);
    }

    #[test]
    fn test_players_of_sorted() {
        let roster = roster();
        let bos: Vec<&str> = roster.players_of("BOS").into_iter().map(String::as_str).collect();
        assert_eq!(bos, vec!["brown", "tatum"]);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{"game_id":"g1","home_team":"BOS","away_team":"NYK","players":{"tatum":"BOS"}}"#;
        let roster = GameRoster::from_json(json).unwrap();
        assert_eq!(roster.home_team, "BOS");
        assert!(roster.is_participant("NYK"));
        assert_eq!(roster.players.len(), 1);
    }
}
