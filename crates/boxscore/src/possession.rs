//! Possession tracking.
//!
//! Walks a classified game in order and decides where each possession ends.
//! A made field goal does not end a possession immediately: the tracker
//! waits for the next event that matters, so a shooting foul and its and-one
//! free throw can arrive in between and move the increment onto the throw.
//!
//! Tracking never fails. An acting team that disagrees with the current
//! owner is recorded as an [`AmbiguousTransition`], logged, and the owner is
//! re-aligned without counting a possession.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use pbp_events::{ClassifiedEvent, EventCategory, GameRoster, ReboundKind, TeamId};

/// Why a possession ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryReason {
    MadeShot,
    MadeFinalFreeThrow,
    DefensiveRebound,
    Turnover,
    OffensiveFoul,
    /// Forced at the end of a period; counted in the total, never per team
    PeriodEnd,
}

/// The end of one possession.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PossessionBoundary {
    /// Sequence number of the event that ended the possession
    pub sequence: u64,
    /// Team that had the ball; `None` for a period end
    pub holder: Option<TeamId>,
    pub reason: BoundaryReason,
}

/// An acting team that contradicted the tracked owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguousTransition {
    pub sequence: u64,
    pub owner: TeamId,
    pub actor: TeamId,
}

/// Possession owner when an event was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerAt {
    pub sequence: u64,
    pub owner: Option<TeamId>,
}

/// Pending state carried between events.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum Continuation {
    #[default]
    None,
    /// A made field goal whose possession end waits for a possible and-one
    MadeShot { team: TeamId, sequence: u64 },
    /// Inside a multi-shot free throw trip
    FreeThrows { team: TeamId },
    /// The final free throw missed; the next rebound decides
    AwaitingRebound { team: TeamId },
}

/// Mutable possession state of one game.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PossessionState {
    pub owner: Option<TeamId>,
    pub count: u32,
    pub continuation: Continuation,
    /// The owner has acted since its possession began
    pub active: bool,
}

/// Result of tracking one game.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PossessionTimeline {
    /// Total possessions
    pub total: u32,
    /// Possessions per team, excluding period ends
    pub per_team: BTreeMap<TeamId, u32>,
    pub boundaries: Vec<PossessionBoundary>,
    /// Owner at every event, in event order
    pub owners: Vec<OwnerAt>,
    pub ambiguous: Vec<AmbiguousTransition>,
}

impl PossessionTimeline {
    /// Possessions of one team.
    pub fn count_for(&self, team_id: &str) -> u32 {
        self.per_team.get(team_id).copied().unwrap_or(0)
    }

    /// Owner when the event with `sequence` was observed.
    pub fn owner_at(&self, sequence: u64) -> Option<&TeamId> {
        self.owners
            .binary_search_by_key(&sequence, |o| o.sequence)
            .ok()
            .and_then(|i| self.owners[i].owner.as_ref())
    }

    /// Sequence numbers where possessions ended.
    pub fn boundary_sequences(&self) -> Vec<u64> {
        self.boundaries.iter().map(|b| b.sequence).collect()
    }
}

/// Tracks possessions over one game's classified stream.
#[derive(Debug)]
pub struct PossessionTracker<'a> {
    roster: &'a GameRoster,
    state: PossessionState,
    timeline: PossessionTimeline,
    period: Option<u8>,
    period_open: bool,
    last_sequence: u64,
}

impl<'a> PossessionTracker<'a> {
    /// Creates a tracker for one game.
    pub fn new(roster: &'a GameRoster) -> Self {
        Self {
            roster,
            state: PossessionState::default(),
            timeline: PossessionTimeline::default(),
            period: None,
            period_open: false,
            last_sequence: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> &PossessionState {
        &self.state
    }

    /// Feeds the next event.
    pub fn observe(&mut self, event: &ClassifiedEvent) {
        if let Some(period) = self.period {
            if period != event.period && self.period_open {
                self.close_period(self.last_sequence);
            }
        }
        self.period = Some(event.period);
        self.last_sequence = event.sequence;

        if event.closes_period() {
            if self.period_open {
                self.close_period(event.sequence);
            }
            self.period_open = false;
            self.record_owner(event.sequence);
            return;
        }
        self.period_open = true;

        let team = event.team.clone();
        match event.category {
            EventCategory::Administrative
            | EventCategory::Foul
            | EventCategory::TechnicalFoul
            | EventCategory::Steal => self.record_owner(event.sequence),
            EventCategory::FreeThrowMade | EventCategory::FreeThrowMissed => {
                self.free_throw(event, team)
            }
            EventCategory::MadeShot => {
                self.resolve_pending();
                self.align(team.as_ref(), event.sequence);
                self.record_owner(event.sequence);
                self.state.active = true;
                self.state.continuation = match self.state.owner.clone() {
                    Some(team) => Continuation::MadeShot {
                        team,
                        sequence: event.sequence,
                    },
                    None => Continuation::None,
                };
                // No team at all: end it right away.
                if self.state.owner.is_none() {
                    self.end(event.sequence, BoundaryReason::MadeShot);
                }
            }
            EventCategory::MissedShot | EventCategory::BlockedShot => {
                self.resolve_pending();
                self.align(team.as_ref(), event.sequence);
                self.record_owner(event.sequence);
                self.state.active = true;
                self.state.continuation = Continuation::None;
            }
            EventCategory::OffensiveRebound => self.offensive_rebound(event.sequence, team),
            EventCategory::DefensiveRebound => self.defensive_rebound(event.sequence, team),
            EventCategory::TeamRebound => match event.rebound {
                Some(ReboundKind::Offensive) => self.offensive_rebound(event.sequence, team),
                _ => self.defensive_rebound(event.sequence, team),
            },
            EventCategory::Turnover | EventCategory::OffensiveFoul => {
                self.resolve_pending();
                self.align(team.as_ref(), event.sequence);
                self.record_owner(event.sequence);
                let reason = if event.category == EventCategory::Turnover {
                    BoundaryReason::Turnover
                } else {
                    BoundaryReason::OffensiveFoul
                };
                self.end(event.sequence, reason);
            }
        }
    }

    /// Closes the last period and returns the timeline.
    pub fn finish(mut self) -> PossessionTimeline {
        if self.period_open {
            self.close_period(self.last_sequence);
        }
        self.timeline.total = self.state.count;
        self.timeline
    }

    fn free_throw(&mut self, event: &ClassifiedEvent, team: Option<TeamId>) {
        let Some(ft) = event.free_throw else {
            self.record_owner(event.sequence);
            return;
        };
        if ft.retains_possession {
            self.record_owner(event.sequence);
            return;
        }

        let and_one = matches!(
            (&self.state.continuation, &team),
            (Continuation::MadeShot { team: shooter, .. }, Some(t)) if shooter == t
        );
        if and_one {
            self.state.continuation = Continuation::None;
        } else {
            self.resolve_pending();
        }
        self.align(team.as_ref(), event.sequence);
        self.record_owner(event.sequence);
        self.state.active = true;

        let holder = self.state.owner.clone();
        if ft.is_final() {
            if ft.made {
                self.end(event.sequence, BoundaryReason::MadeFinalFreeThrow);
            } else if let Some(team) = holder {
                self.state.continuation = Continuation::AwaitingRebound { team };
            }
        } else if let Some(team) = holder {
            self.state.continuation = Continuation::FreeThrows { team };
        }
    }

    fn offensive_rebound(&mut self, sequence: u64, team: Option<TeamId>) {
        self.resolve_pending();
        let team = team.or_else(|| self.state.owner.clone());
        self.align(team.as_ref(), sequence);
        self.record_owner(sequence);
        self.state.active = true;
        self.state.continuation = Continuation::None;
    }

    fn defensive_rebound(&mut self, sequence: u64, team: Option<TeamId>) {
        let after_free_throw = matches!(
            self.state.continuation,
            Continuation::AwaitingRebound { .. }
        );
        self.resolve_pending();
        self.record_owner(sequence);

        let owner = self.state.owner.clone();
        let rebounder = team.or_else(|| {
            owner
                .as_deref()
                .and_then(|o| self.roster.opponent_of(o))
                .cloned()
        });

        match (owner, rebounder) {
            (Some(owner), Some(rebounder)) if owner != rebounder => {
                self.end(sequence, BoundaryReason::DefensiveRebound);
            }
            (Some(owner), Some(rebounder)) => {
                if !after_free_throw {
                    self.ambiguous(sequence, owner, rebounder);
                }
                self.state.continuation = Continuation::None;
            }
            (None, Some(rebounder)) => {
                self.state.owner = Some(rebounder);
                self.state.active = true;
                self.state.continuation = Continuation::None;
            }
            (Some(_), None) => {
                self.end(sequence, BoundaryReason::DefensiveRebound);
            }
            (None, None) => {}
        }
    }

    /// Ends a made shot that no continuation free throw claimed.
    fn resolve_pending(&mut self) {
        if let Continuation::MadeShot { sequence, .. } = self.state.continuation {
            self.state.continuation = Continuation::None;
            self.end(sequence, BoundaryReason::MadeShot);
        } else if !matches!(self.state.continuation, Continuation::None) {
            self.state.continuation = Continuation::None;
        }
    }

    fn align(&mut self, team: Option<&TeamId>, sequence: u64) {
        let Some(team) = team else {
            return;
        };
        match self.state.owner.clone() {
            None => self.state.owner = Some(team.clone()),
            Some(owner) if &owner != team => {
                self.ambiguous(sequence, owner, team.clone());
                self.state.owner = Some(team.clone());
            }
            Some(_) => {}
        }
    }

    fn ambiguous(&mut self, sequence: u64, owner: TeamId, actor: TeamId) {
        tracing::warn!(
            "{}: ambiguous possession transition at sequence {} (owner {}, actor {})",
            self.roster.game_id,
            sequence,
            owner,
            actor
        );
        self.timeline.ambiguous.push(AmbiguousTransition {
            sequence,
            owner,
            actor,
        });
    }

    /// Counts a possession and hands the ball to the opponent. A period end
    /// counts toward the total only.
    fn end(&mut self, sequence: u64, reason: BoundaryReason) {
        let holder = self.state.owner.clone();
        let attributed = match reason {
            BoundaryReason::PeriodEnd => None,
            _ => holder.clone(),
        };
        self.state.count += 1;
        if let Some(team) = &attributed {
            *self.timeline.per_team.entry(team.clone()).or_insert(0) += 1;
        }
        self.timeline.boundaries.push(PossessionBoundary {
            sequence,
            holder: attributed,
            reason,
        });
        self.state.owner = holder
            .as_deref()
            .and_then(|h| self.roster.opponent_of(h))
            .cloned();
        self.state.active = false;
        self.state.continuation = Continuation::None;
    }

    fn close_period(&mut self, sequence: u64) {
        let pending_shot = matches!(self.state.continuation, Continuation::MadeShot { .. });
        self.resolve_pending();
        if !pending_shot && self.state.active && self.state.owner.is_some() {
            self.end(sequence, BoundaryReason::PeriodEnd);
        }
        self.state.owner = None;
        self.state.active = false;
        self.state.continuation = Continuation::None;
    }

    fn record_owner(&mut self, sequence: u64) {
        self.timeline.owners.push(OwnerAt {
            sequence,
            owner: self.state.owner.clone(),
        });
    }
}

/// Tracks possessions over a whole classified game.
pub fn track(events: &[ClassifiedEvent], roster: &GameRoster) -> PossessionTimeline {
    let mut tracker = PossessionTracker::new(roster);
    for event in events {
        tracker.observe(event);
    }
    tracker.finish()
}
