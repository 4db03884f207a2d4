//! Box score aggregation.
//!
//! Folds classified events into per-player and per-team stat lines, then
//! derives shooting percentages, estimated possessions, pace and ratings.
//! The final score is read from the last raw event, never from the deltas,
//! so the validator can compare the two.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use pbp_events::{
    ClassifiedEvent, DeltaTarget, EventCategory, GameRoster, PlayerId, RawEvent, ReboundKind,
    Stat, StatDelta, StatLine, TeamId, TeamSide,
};

use crate::config::GameFormat;
use crate::possession::PossessionTimeline;

/// Free throw attempts weight in possession estimates and TS%.
pub const FTA_WEIGHT: f64 = 0.44;

/// Divides, returning 0 on a zero denominator.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Shooting percentages derived from a stat line.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ShootingSplits {
    pub fg_pct: f64,
    pub fg3_pct: f64,
    pub ft_pct: f64,
    pub ts_pct: f64,
    pub efg_pct: f64,
}

impl ShootingSplits {
    pub fn from_line(line: &StatLine) -> Self {
        let fga = f64::from(line.fga);
        let fta = f64::from(line.fta);
        Self {
            fg_pct: ratio(f64::from(line.fgm), fga),
            fg3_pct: ratio(f64::from(line.fg3m), f64::from(line.fg3a)),
            ft_pct: ratio(f64::from(line.ftm), fta),
            ts_pct: ratio(f64::from(line.pts), 2.0 * (fga + FTA_WEIGHT * fta)),
            efg_pct: ratio(f64::from(line.fgm) + 0.5 * f64::from(line.fg3m), fga),
        }
    }
}

/// `FGA + 0.44*FTA - OREB + TOV`.
pub fn estimated_possessions(line: &StatLine) -> f64 {
    f64::from(line.fga) + FTA_WEIGHT * f64::from(line.fta) - f64::from(line.oreb)
        + f64::from(line.tov)
}

/// Running stat line of one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerAccumulator {
    pub player_id: PlayerId,
    /// None when the player could not be placed on either team
    pub team_id: Option<TeamId>,
    pub line: StatLine,
}

impl PlayerAccumulator {
    pub fn new(player_id: impl Into<String>, team_id: Option<TeamId>) -> Self {
        Self {
            player_id: player_id.into(),
            team_id,
            line: StatLine::new(),
        }
    }
}

/// Running stat line of one team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamAccumulator {
    pub team_id: TeamId,
    /// Everything credited to the team, players included
    pub line: StatLine,
    /// Contributions with no individual (team rebounds, team turnovers,
    /// bench fouls)
    pub team_only: StatLine,
}

impl TeamAccumulator {
    pub fn new(team_id: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            line: StatLine::new(),
            team_only: StatLine::new(),
        }
    }
}

/// Final line of one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerBox {
    pub player_id: PlayerId,
    pub team_id: Option<TeamId>,
    pub stats: StatLine,
    pub splits: ShootingSplits,
}

/// Final line of one team with its derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamBox {
    pub team_id: TeamId,
    pub side: TeamSide,
    /// Final score from the last raw event
    pub final_score: u32,
    pub stats: StatLine,
    pub team_only: StatLine,
    pub splits: ShootingSplits,
    /// Tracked possessions
    pub possessions: u32,
    pub estimated_possessions: f64,
    pub pace: f64,
    pub offensive_rating: f64,
    pub defensive_rating: f64,
}

/// Complete box score of one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxScoreResult {
    pub game_id: String,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub home_score: u32,
    pub away_score: u32,
    pub periods: u8,
    pub game_minutes: f64,
    /// Tracked possessions, both teams
    pub possessions: u32,
    /// Estimated possessions, both teams
    pub estimated_possessions: f64,
    /// Mean of the two team paces
    pub pace: f64,
    /// Home players by id, then away, then unattributed
    pub players: Vec<PlayerBox>,
    pub home: TeamBox,
    pub away: TeamBox,
}

impl BoxScoreResult {
    /// Both team boxes, home first.
    pub fn teams(&self) -> [&TeamBox; 2] {
        [&self.home, &self.away]
    }

    /// Looks up a player box.
    pub fn player(&self, player_id: &str) -> Option<&PlayerBox> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    /// Looks up a team box.
    pub fn team(&self, team_id: &str) -> Option<&TeamBox> {
        self.teams().into_iter().find(|t| t.team_id == team_id)
    }

    /// Players credited to one team.
    pub fn players_of<'a>(&'a self, team_id: &'a str) -> impl Iterator<Item = &'a PlayerBox> + 'a {
        self.players
            .iter()
            .filter(move |p| p.team_id.as_deref() == Some(team_id))
    }
}

/// Folds one game's classified events into accumulators.
#[derive(Debug)]
pub struct BoxScoreAggregator<'a> {
    roster: &'a GameRoster,
    format: &'a GameFormat,
    players: BTreeMap<PlayerId, PlayerAccumulator>,
    home: TeamAccumulator,
    away: TeamAccumulator,
    periods: u8,
}

impl<'a> BoxScoreAggregator<'a> {
    pub fn new(roster: &'a GameRoster, format: &'a GameFormat) -> Self {
        Self {
            roster,
            format,
            players: BTreeMap::new(),
            home: TeamAccumulator::new(roster.home_team.clone()),
            away: TeamAccumulator::new(roster.away_team.clone()),
            periods: 0,
        }
    }

    /// Applies one event. `owner` is the possession owner when it happened.
    pub fn apply(&mut self, event: &ClassifiedEvent, owner: Option<&TeamId>) {
        self.periods = self.periods.max(event.period);
        for delta in &event.deltas {
            match &delta.target {
                DeltaTarget::Player(player_id) => self.apply_player(event, player_id, delta),
                DeltaTarget::Team => self.apply_team_only(event, owner, delta),
            }
        }
    }

    fn apply_player(&mut self, event: &ClassifiedEvent, player_id: &str, delta: &StatDelta) {
        if !self.players.contains_key(player_id) {
            let team = match self.roster.team_of(player_id) {
                Some(team) => Some(team.clone()),
                None => {
                    let fallback = event
                        .team
                        .clone()
                        .filter(|t| self.roster.is_participant(t));
                    tracing::warn!(
                        "{}: player {} not on roster (sequence {}), credited to {}",
                        self.roster.game_id,
                        player_id,
                        event.sequence,
                        fallback.as_deref().unwrap_or("no team")
                    );
                    fallback
                }
            };
            self.players.insert(
                player_id.to_string(),
                PlayerAccumulator::new(player_id, team),
            );
        }

        let Some(player) = self.players.get_mut(player_id) else {
            return;
        };
        player.line.add(delta.stat, delta.amount);
        let team = player.team_id.clone();
        if let Some(team) = team.as_deref().and_then(|t| self.team_mut(t)) {
            team.line.add(delta.stat, delta.amount);
        }
    }

    fn apply_team_only(&mut self, event: &ClassifiedEvent, owner: Option<&TeamId>, delta: &StatDelta) {
        let target = event
            .team
            .clone()
            .filter(|t| self.roster.is_participant(t))
            .or_else(|| self.team_rebound_target(event, owner));

        match target.as_deref().and_then(|t| self.team_mut(t)) {
            Some(team) => {
                team.line.add(delta.stat, delta.amount);
                team.team_only.add(delta.stat, delta.amount);
            }
            None => tracing::warn!(
                "{}: team-only {} at sequence {} has no team, dropped",
                self.roster.game_id,
                delta.stat,
                event.sequence
            ),
        }
    }

    /// Offensive team rebounds belong to the owner, defensive ones to its opponent.
    fn team_rebound_target(&self, event: &ClassifiedEvent, owner: Option<&TeamId>) -> Option<TeamId> {
        if event.category != EventCategory::TeamRebound {
            return None;
        }
        let owner = owner?;
        match event.rebound? {
            ReboundKind::Offensive => Some(owner.clone()),
            ReboundKind::Defensive => self.roster.opponent_of(owner).cloned(),
        }
    }

    fn team_mut(&mut self, team_id: &str) -> Option<&mut TeamAccumulator> {
        if team_id == self.home.team_id {
            Some(&mut self.home)
        } else if team_id == self.away.team_id {
            Some(&mut self.away)
        } else {
            None
        }
    }

    /// Derives the final box score.
    pub fn finish(self, timeline: &PossessionTimeline, last_raw: Option<&RawEvent>) -> BoxScoreResult {
        let (home_score, away_score) = last_raw.map_or((0, 0), |e| (e.home_score, e.away_score));
        let game_minutes = self.format.game_minutes(self.periods);

        let home_possessions = timeline.count_for(&self.home.team_id);
        let away_possessions = timeline.count_for(&self.away.team_id);

        let home = team_box(
            &self.home,
            TeamSide::Home,
            home_score,
            home_possessions,
            (&self.away, away_possessions),
            game_minutes,
        );
        let away = team_box(
            &self.away,
            TeamSide::Away,
            away_score,
            away_possessions,
            (&self.home, home_possessions),
            game_minutes,
        );

        let rank = |p: &PlayerAccumulator| match p.team_id.as_deref() {
            Some(t) if t == self.roster.home_team => 0,
            Some(t) if t == self.roster.away_team => 1,
            _ => 2,
        };
        let mut players: Vec<&PlayerAccumulator> = self.players.values().collect();
        players.sort_by_key(|p| rank(*p));

        let players = players
            .into_iter()
            .map(|p| PlayerBox {
                player_id: p.player_id.clone(),
                team_id: p.team_id.clone(),
                stats: p.line,
                splits: ShootingSplits::from_line(&p.line),
            })
            .collect();

        BoxScoreResult {
            game_id: self.roster.game_id.clone(),
            home_team: self.roster.home_team.clone(),
            away_team: self.roster.away_team.clone(),
            home_score,
            away_score,
            periods: self.periods,
            game_minutes,
            possessions: timeline.total,
            estimated_possessions: home.estimated_possessions + away.estimated_possessions,
            pace: (home.pace + away.pace) / 2.0,
            players,
            home,
            away,
        }
    }
}

fn team_box(
    team: &TeamAccumulator,
    side: TeamSide,
    final_score: u32,
    possessions: u32,
    (opponent, opponent_possessions): (&TeamAccumulator, u32),
    game_minutes: f64,
) -> TeamBox {
    let own = f64::from(possessions);
    let theirs = f64::from(opponent_possessions);
    TeamBox {
        team_id: team.team_id.clone(),
        side,
        final_score,
        stats: team.line,
        team_only: team.team_only,
        splits: ShootingSplits::from_line(&team.line),
        possessions,
        estimated_possessions: estimated_possessions(&team.line),
        pace: ratio(own, game_minutes / 48.0),
        offensive_rating: ratio(f64::from(team.line.pts) * 100.0, own),
        defensive_rating: ratio(f64::from(opponent.line.pts) * 100.0, theirs),
    }
}

/// Aggregates a whole classified game.
pub fn aggregate(
    events: &[ClassifiedEvent],
    timeline: &PossessionTimeline,
    roster: &GameRoster,
    last_raw: Option<&RawEvent>,
    format: &GameFormat,
) -> BoxScoreResult {
    let mut aggregator = BoxScoreAggregator::new(roster, format);
    for event in events {
        aggregator.apply(event, timeline.owner_at(event.sequence));
    }
    aggregator.finish(timeline, last_raw)
}
