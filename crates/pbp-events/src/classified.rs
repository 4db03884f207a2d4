//! Classified events.
//!
//! A [`ClassifiedEvent`] is the typed, attributed form of one raw row. It
//! refers back to its raw row by sequence number only.

use serde::{Deserialize, Serialize};

use crate::stats::{Stat, StatDelta};
use crate::{PlayerId, TeamId};

/// Closed set of event categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    MadeShot,
    MissedShot,
    BlockedShot,
    FreeThrowMade,
    FreeThrowMissed,
    OffensiveRebound,
    DefensiveRebound,
    TeamRebound,
    Turnover,
    Steal,
    Foul,
    OffensiveFoul,
    TechnicalFoul,
    Administrative,
}

impl EventCategory {
    /// Returns true for field goal attempts (made, missed or blocked).
    pub fn is_field_goal(self) -> bool {
        matches!(
            self,
            EventCategory::MadeShot | EventCategory::MissedShot | EventCategory::BlockedShot
        )
    }

    /// Returns true for free throw attempts.
    pub fn is_free_throw(self) -> bool {
        matches!(self, EventCategory::FreeThrowMade | EventCategory::FreeThrowMissed)
    }

    /// Returns true for rebounds of any kind.
    pub fn is_rebound(self) -> bool {
        matches!(
            self,
            EventCategory::OffensiveRebound
                | EventCategory::DefensiveRebound
                | EventCategory::TeamRebound
        )
    }

    /// Returns true for fouls of any kind.
    pub fn is_foul(self) -> bool {
        matches!(
            self,
            EventCategory::Foul | EventCategory::OffensiveFoul | EventCategory::TechnicalFoul
        )
    }
}

/// Shot metadata for field goal attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotInfo {
    /// 2 or 3
    pub points: u8,
    pub made: bool,
}

impl ShotInfo {
    /// Returns true for three-point attempts.
    pub fn is_three(&self) -> bool {
        self.points == 3
    }
}

/// Position of a free throw within its trip ("2 of 3").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeThrowPosition {
    pub index: u8,
    pub total: u8,
}

impl FreeThrowPosition {
    /// Creates a position, `index` of `total`.
    pub fn new(index: u8, total: u8) -> Self {
        Self { index, total }
    }

    /// Returns true for the last throw of the trip ("2 of 2", "1 of 1").
    pub fn is_final(&self) -> bool {
        self.index >= self.total
    }
}

/// Free throw metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeThrowInfo {
    pub made: bool,
    /// Position within the trip, when the text carries an "N of M" marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<FreeThrowPosition>,
    /// Technical, flagrant and clear-path throws leave the ball with the shooting team
    #[serde(default)]
    pub retains_possession: bool,
}

impl FreeThrowInfo {
    /// Returns true if this throw ends its trip.
    pub fn is_final(&self) -> bool {
        self.position.map_or(false, |p| p.is_final())
    }
}

/// Offensive or defensive rebound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReboundKind {
    Offensive,
    Defensive,
}

/// What an administrative event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminKind {
    Substitution,
    Timeout,
    JumpBall,
    PeriodStart,
    PeriodEnd,
    GameEnd,
    Ejection,
    /// Duplicate encoding removed by a skip rule
    DuplicateSkipped,
    /// Type code and label not in the vocabulary
    Unrecognized,
    Other,
}

impl AdminKind {
    /// Returns true for events that close a period.
    pub fn closes_period(self) -> bool {
        matches!(self, AdminKind::PeriodEnd | AdminKind::GameEnd)
    }
}

/// The typed, attributed form of one raw event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedEvent {
    /// Sequence number of the raw event this was derived from
    pub sequence: u64,
    /// Period number
    pub period: u8,
    /// Event category
    pub category: EventCategory,
    /// Acting team, from the source or resolved through the roster
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamId>,
    /// Primary actor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<PlayerId>,
    /// Shot metadata for field goal attempts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shot: Option<ShotInfo>,
    /// Free throw metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_throw: Option<FreeThrowInfo>,
    /// Rebound kind, including team rebounds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rebound: Option<ReboundKind>,
    /// Administrative kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<AdminKind>,
    /// Stat contributions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deltas: Vec<StatDelta>,
}

impl ClassifiedEvent {
    /// Creates an event of `category` with no metadata or deltas.
    pub fn new(sequence: u64, period: u8, category: EventCategory) -> Self {
        Self {
            sequence,
            period,
            category,
            team: None,
            primary: None,
            shot: None,
            free_throw: None,
            rebound: None,
            admin: None,
            deltas: Vec::new(),
        }
    }

    /// Creates an administrative no-op.
    pub fn administrative(sequence: u64, period: u8, kind: AdminKind) -> Self {
        let mut event = Self::new(sequence, period, EventCategory::Administrative);
        event.admin = Some(kind);
        event
    }

    /// Returns true if this event is a no-op for the stat fold.
    pub fn is_administrative(&self) -> bool {
        self.category == EventCategory::Administrative
    }

    /// Returns true if this event closes a period.
    pub fn closes_period(&self) -> bool {
        self.admin.map_or(false, AdminKind::closes_period)
    }

    /// Returns true for a free throw that ends its trip.
    pub fn is_final_free_throw(&self) -> bool {
        self.free_throw.map_or(false, |ft| ft.is_final())
    }

    /// Sums the deltas of one stat credited to a player.
    pub fn delta_for(&self, player_id: &str, stat: Stat) -> i32 {
        self.deltas
            .iter()
            .filter(|d| d.stat == stat && d.player_id() == Some(player_id))
            .map(|d| d.amount)
            .sum()
    }

    /// Sums the team-only deltas of one stat.
    pub fn team_delta(&self, stat: Stat) -> i32 {
        self.deltas
            .iter()
            .filter(|d| d.stat == stat && d.player_id().is_none())
            .map(|d| d.amount)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_throw_position_final() {
        assert!(FreeThrowPosition::new(1, 1).is_final());
        assert!(FreeThrowPosition::new(2, 2).is_final());
        assert!(FreeThrowPosition::new(3, 3).is_final());
        assert!(!FreeThrowPosition::new(1, 2).is_final());
        assert!(!FreeThrowPosition::new(2, 3).is_final());
    }

    #[test]
    fn test_free_throw_without_position_is_not_final() {
        let ft = FreeThrowInfo {
            made: true,
            position: None,
            retains_possession: true,
        };
        assert!(!ft.is_final());
    }

    #[test]
    fn test_category_predicates() {
        assert!(EventCategory::BlockedShot.is_field_goal());
        assert!(!EventCategory::FreeThrowMade.is_field_goal());
        assert!(EventCategory::FreeThrowMissed.is_free_throw());
        assert!(EventCategory::TeamRebound.is_rebound());
        assert!(EventCategory::TechnicalFoul.is_foul());
    }

    #[test]
    fn test_administrative_closes_period() {
        let end = ClassifiedEvent::administrative(10, 1, AdminKind::PeriodEnd);
        assert!(end.is_administrative());
        assert!(end.closes_period());

        let timeout = ClassifiedEvent::administrative(11, 2, AdminKind::Timeout);
        assert!(!timeout.closes_period());
    }

    #[test]
    fn test_delta_lookup() {
        let mut event = ClassifiedEvent::new(1, 1, EventCategory::MadeShot);
        event.deltas.push(StatDelta::player("tatum", Stat::Pts).with_amount(3));
        event.deltas.push(StatDelta::player("brown", Stat::Ast));
        event.deltas.push(StatDelta::team(Stat::Oreb));

        assert_eq!(event.delta_for("tatum", Stat::Pts), 3);
        assert_eq!(event.delta_for("brown", Stat::Ast), 1);
        assert_eq!(event.delta_for("brown", Stat::Pts), 0);
        assert_eq!(event.team_delta(Stat::Oreb), 1);
    }

    #[test]
    fn test_category_serialization() {
        assert_eq!(
            serde_json::to_string(&EventCategory::FreeThrowMade).unwrap(),
            r#""free_throw_made""#
        );
        assert_eq!(
            serde_json::to_string(&AdminKind::DuplicateSkipped).unwrap(),
            r#""duplicate_skipped""#
        );
    }
}
