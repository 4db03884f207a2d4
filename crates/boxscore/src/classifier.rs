//! Event classification.
//!
//! Turns each [`RawEvent`] into a [`ClassifiedEvent`]: a category from the
//! closed set, shot/free-throw/rebound metadata, the acting team, and the
//! stat deltas the event contributes. The type code (or label) picks the
//! event kind; the description text refines it (made or missed, three
//! pointer, assist, steal and block markers, free throw position).

use std::collections::HashMap;

use pbp_events::{
    AdminKind, ClassifiedEvent, EventCategory, FreeThrowInfo, FreeThrowPosition, GameClock,
    GameRoster, RawEvent, ReboundKind, ShotInfo, Stat, StatDelta,
};

use crate::config::EngineConfig;
use crate::vocabulary::{
    CompiledSkipRule, EventKind, TokenMatcher, VocabularyError, VocabularyTable,
};

/// Errors produced when a single event cannot be classified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("unrecognized event type at sequence {sequence}: code {type_code} ('{type_label}')")]
    UnrecognizedEventType {
        sequence: u64,
        type_code: u32,
        type_label: String,
    },
}

/// Same period, same clock, same primary player.
type CompanionKey = (u8, String, String);

/// Per-game information the classifier needs beyond the event itself.
#[derive(Debug, Clone)]
pub struct StreamContext<'a> {
    roster: &'a GameRoster,
    companions: HashMap<CompanionKey, Vec<EventKind>>,
}

impl<'a> StreamContext<'a> {
    /// Context for classifying one event in isolation; skip rules never fire.
    pub fn standalone(roster: &'a GameRoster) -> Self {
        Self {
            roster,
            companions: HashMap::new(),
        }
    }

    pub fn roster(&self) -> &GameRoster {
        self.roster
    }

    fn has_companion(&self, key: &CompanionKey, kinds: &[EventKind]) -> bool {
        self.companions
            .get(key)
            .map_or(false, |found| found.iter().any(|k| kinds.contains(k)))
    }
}

fn companion_key(raw: &RawEvent) -> Option<CompanionKey> {
    let player = raw.primary_player.as_ref()?;
    let clock = raw
        .clock()
        .map(|c: GameClock| c.tenths().to_string())
        .unwrap_or_else(|| raw.clock.trim().to_string());
    Some((raw.period, clock, player.clone()))
}

/// Classifies raw events using a compiled vocabulary.
///
/// Built once and shared read-only across games.
#[derive(Debug, Clone)]
pub struct EventClassifier {
    table: VocabularyTable,
    tokens: TokenMatcher,
    skip_rules: Vec<CompiledSkipRule>,
}

impl EventClassifier {
    /// Compiles the vocabulary, tokens and skip rules of `config`.
    pub fn new(config: &EngineConfig) -> Result<Self, VocabularyError> {
        let skip_rules = config
            .skip_rules
            .iter()
            .map(CompiledSkipRule::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            table: VocabularyTable::compile(&config.vocabulary)?,
            tokens: TokenMatcher::compile(&config.tokens)?,
            skip_rules,
        })
    }

    /// Returns the compiled vocabulary.
    pub fn vocabulary(&self) -> &VocabularyTable {
        &self.table
    }

    /// Looks up the event kind of a raw event by code, then by label.
    pub fn kind_of(&self, raw: &RawEvent) -> Option<EventKind> {
        self.table.lookup(raw.type_code, &raw.type_label)
    }

    /// Event kind after text refinement: a foul whose description carries
    /// the charge token is an offensive foul.
    pub fn refined_kind_of(&self, raw: &RawEvent) -> Option<EventKind> {
        match self.kind_of(raw)? {
            EventKind::Foul if self.tokens.has_charge(&raw.description) => {
                Some(EventKind::OffensiveFoul)
            }
            kind => Some(kind),
        }
    }

    /// Builds the skip-rule companion index for a whole game.
    pub fn context<'a>(&self, events: &[RawEvent], roster: &'a GameRoster) -> StreamContext<'a> {
        let mut companions: HashMap<CompanionKey, Vec<EventKind>> = HashMap::new();
        for raw in events {
            if let (Some(key), Some(kind)) = (companion_key(raw), self.refined_kind_of(raw)) {
                companions.entry(key).or_default().push(kind);
            }
        }
        StreamContext { roster, companions }
    }

    /// Classifies a whole game.
    ///
    /// Events that cannot be classified are logged and replaced by an
    /// administrative no-op so the rest of the game still aggregates.
    pub fn classify_game(&self, events: &[RawEvent], roster: &GameRoster) -> Vec<ClassifiedEvent> {
        let context = self.context(events, roster);
        events
            .iter()
            .map(|raw| match self.classify(raw, &context) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("{}: {}", roster.game_id, e);
                    ClassifiedEvent::administrative(raw.sequence, raw.period, AdminKind::Unrecognized)
                }
            })
            .collect()
    }

    /// Classifies one event.
    pub fn classify(
        &self,
        raw: &RawEvent,
        context: &StreamContext<'_>,
    ) -> Result<ClassifiedEvent, ClassifyError> {
        let kind = self
            .refined_kind_of(raw)
            .ok_or_else(|| ClassifyError::UnrecognizedEventType {
                sequence: raw.sequence,
                type_code: raw.type_code,
                type_label: raw.type_label.clone(),
            })?;

        let team = raw.team_id.clone().or_else(|| {
            raw.primary_player
                .as_deref()
                .and_then(|p| context.roster.team_of(p))
                .cloned()
        });

        if self.is_duplicate(raw, context) {
            let mut event =
                ClassifiedEvent::administrative(raw.sequence, raw.period, AdminKind::DuplicateSkipped);
            event.team = team;
            event.primary = raw.primary_player.clone();
            return Ok(event);
        }

        let mut event = match kind {
            EventKind::Shot => self.shot(raw),
            EventKind::FreeThrow => self.free_throw(raw),
            EventKind::OffensiveRebound => rebound(raw, ReboundKind::Offensive),
            EventKind::DefensiveRebound => rebound(raw, ReboundKind::Defensive),
            EventKind::Rebound => match self.rebound_side(raw) {
                Some(side) => rebound(raw, side),
                None => {
                    return Err(ClassifyError::UnrecognizedEventType {
                        sequence: raw.sequence,
                        type_code: raw.type_code,
                        type_label: raw.type_label.clone(),
                    })
                }
            },
            EventKind::Turnover => self.turnover(raw),
            EventKind::Steal => {
                let mut event = base(raw, EventCategory::Steal);
                event.deltas.push(credit(raw.primary_player.as_deref(), Stat::Stl));
                event
            }
            EventKind::Foul => {
                let mut event = base(raw, EventCategory::Foul);
                event.deltas.push(credit(raw.primary_player.as_deref(), Stat::Pf));
                event
            }
            EventKind::OffensiveFoul => offensive_foul(raw),
            EventKind::TechnicalFoul => {
                let mut event = base(raw, EventCategory::TechnicalFoul);
                event.deltas.push(credit(raw.primary_player.as_deref(), Stat::Pf));
                event
            }
            EventKind::Substitution => admin(raw, AdminKind::Substitution),
            EventKind::Timeout => admin(raw, AdminKind::Timeout),
            EventKind::JumpBall => admin(raw, AdminKind::JumpBall),
            EventKind::PeriodStart => admin(raw, AdminKind::PeriodStart),
            EventKind::PeriodEnd => admin(raw, AdminKind::PeriodEnd),
            EventKind::GameEnd => admin(raw, AdminKind::GameEnd),
            EventKind::Ejection => admin(raw, AdminKind::Ejection),
            EventKind::Administrative => admin(raw, AdminKind::Other),
        };

        event.team = team;
        Ok(event)
    }

    fn is_duplicate(&self, raw: &RawEvent, context: &StreamContext<'_>) -> bool {
        let rules: Vec<&CompiledSkipRule> = self
            .skip_rules
            .iter()
            .filter(|r| r.applies_to(raw.type_code))
            .collect();
        if rules.is_empty() {
            return false;
        }
        let Some(key) = companion_key(raw) else {
            return false;
        };
        rules
            .iter()
            .any(|rule| context.has_companion(&key, &rule.companions))
    }

    /// Made unless the text says otherwise; the scoring flag settles silent
    /// or contradictory text.
    fn outcome(&self, raw: &RawEvent) -> bool {
        match (
            self.tokens.is_made(&raw.description),
            self.tokens.is_missed(&raw.description),
        ) {
            (true, false) => true,
            (false, true) => false,
            _ => raw.scoring_play,
        }
    }

    fn shot(&self, raw: &RawEvent) -> ClassifiedEvent {
        let text = &raw.description;
        let blocked = self.tokens.has_block(text);
        let made = !blocked && self.outcome(raw);
        let points = if self.tokens.is_three(text) { 3 } else { 2 };
        let shooter = raw.primary_player.as_deref();

        let category = if made {
            EventCategory::MadeShot
        } else if blocked {
            EventCategory::BlockedShot
        } else {
            EventCategory::MissedShot
        };
        let mut event = base(raw, category);
        event.shot = Some(ShotInfo { points, made });

        event.deltas.push(credit(shooter, Stat::Fga));
        if points == 3 {
            event.deltas.push(credit(shooter, Stat::Fg3a));
        }
        if made {
            event.deltas.push(credit(shooter, Stat::Fgm));
            if points == 3 {
                event.deltas.push(credit(shooter, Stat::Fg3m));
            }
            event
                .deltas
                .push(credit(shooter, Stat::Pts).with_amount(i32::from(points)));

            if self.tokens.has_assist(text) {
                if let Some(assister) = &raw.secondary_player {
                    event.deltas.push(StatDelta::player(assister.clone(), Stat::Ast));
                }
            }
        } else if blocked {
            if let Some(blocker) = &raw.secondary_player {
                event.deltas.push(StatDelta::player(blocker.clone(), Stat::Blk));
            }
        }

        event
    }

    fn free_throw(&self, raw: &RawEvent) -> ClassifiedEvent {
        let made = self.outcome(raw);
        let position = self
            .tokens
            .free_throw_position(&raw.description)
            .or_else(|| self.tokens.free_throw_position(&raw.type_label))
            .map(|(index, total)| FreeThrowPosition::new(index, total));
        let retains_possession = self.tokens.retains_possession(&raw.description)
            || self.tokens.retains_possession(&raw.type_label);

        let category = if made {
            EventCategory::FreeThrowMade
        } else {
            EventCategory::FreeThrowMissed
        };
        let mut event = base(raw, category);
        event.free_throw = Some(FreeThrowInfo {
            made,
            position,
            retains_possession,
        });

        let shooter = raw.primary_player.as_deref();
        event.deltas.push(credit(shooter, Stat::Fta));
        if made {
            event.deltas.push(credit(shooter, Stat::Ftm));
            event.deltas.push(credit(shooter, Stat::Pts));
        }
        event
    }

    fn turnover(&self, raw: &RawEvent) -> ClassifiedEvent {
        let mut event = base(raw, EventCategory::Turnover);
        event.deltas.push(credit(raw.primary_player.as_deref(), Stat::Tov));
        if self.tokens.has_steal(&raw.description) {
            if let Some(stealer) = &raw.secondary_player {
                event.deltas.push(StatDelta::player(stealer.clone(), Stat::Stl));
            }
        }
        event
    }

    /// Offensive or defensive from the label, then from the description.
    fn rebound_side(&self, raw: &RawEvent) -> Option<ReboundKind> {
        [raw.type_label.as_str(), raw.description.as_str()]
            .iter()
            .find_map(|text| {
                let lower = text.to_lowercase();
                if lower.contains("offensive") {
                    Some(ReboundKind::Offensive)
                } else if lower.contains("defensive") {
                    Some(ReboundKind::Defensive)
                } else {
                    None
                }
            })
    }
}

fn base(raw: &RawEvent, category: EventCategory) -> ClassifiedEvent {
    let mut event = ClassifiedEvent::new(raw.sequence, raw.period, category);
    event.primary = raw.primary_player.clone();
    event
}

fn admin(raw: &RawEvent, kind: AdminKind) -> ClassifiedEvent {
    let mut event = ClassifiedEvent::administrative(raw.sequence, raw.period, kind);
    event.primary = raw.primary_player.clone();
    event
}

/// `+1` to the player, or to the acting team when there is none.
fn credit(player: Option<&str>, stat: Stat) -> StatDelta {
    match player {
        Some(id) => StatDelta::player(id, stat),
        None => StatDelta::team(stat),
    }
}

fn rebound(raw: &RawEvent, kind: ReboundKind) -> ClassifiedEvent {
    let (category, stat) = match (raw.primary_player.is_some(), kind) {
        (true, ReboundKind::Offensive) => (EventCategory::OffensiveRebound, Stat::Oreb),
        (true, ReboundKind::Defensive) => (EventCategory::DefensiveRebound, Stat::Dreb),
        (false, ReboundKind::Offensive) => (EventCategory::TeamRebound, Stat::Oreb),
        (false, ReboundKind::Defensive) => (EventCategory::TeamRebound, Stat::Dreb),
    };
    let mut event = base(raw, category);
    event.rebound = Some(kind);
    let player = raw.primary_player.as_deref();
    event.deltas.push(credit(player, stat));
    event.deltas.push(credit(player, Stat::Reb));
    event
}

fn offensive_foul(raw: &RawEvent) -> ClassifiedEvent {
    let mut event = base(raw, EventCategory::OffensiveFoul);
    let player = raw.primary_player.as_deref();
    event.deltas.push(credit(player, Stat::Pf));
    event.deltas.push(credit(player, Stat::Tov));
    event
}
