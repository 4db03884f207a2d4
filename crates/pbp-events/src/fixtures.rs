//! Sample data fixtures for testing.
//!
//! This module provides ready-made games for other crates to use.
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! # Example
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // pbp-events = { path = "../pbp-events", features = ["test-fixtures"] }
//!
//! use pbp_events::fixtures;
//!
//! let events = fixtures::sample_events();
//! let roster = fixtures::sample_roster();
//! let game = fixtures::synthetic_game(7, 4, 25);
//! ```

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::clock::GameClock;
use crate::raw::{RawEvent, RawEventBuilder};
use crate::roster::GameRoster;

/// Type codes of the default vocabulary used by the fixtures.
pub mod codes {
    pub const JUMP_SHOT: u32 = 92;
    pub const LAYUP: u32 = 95;
    pub const DUNK: u32 = 96;
    pub const FREE_THROW_1_OF_1: u32 = 97;
    pub const FREE_THROW_1_OF_2: u32 = 98;
    pub const FREE_THROW_2_OF_2: u32 = 99;
    pub const FREE_THROW_TECHNICAL: u32 = 103;
    pub const OFFENSIVE_REBOUND: u32 = 155;
    pub const DEFENSIVE_REBOUND: u32 = 156;
    pub const REBOUND: u32 = 157;
    pub const BAD_PASS: u32 = 62;
    pub const LOST_BALL: u32 = 63;
    pub const TURNOVER: u32 = 84;
    pub const OFFENSIVE_FOUL_TURNOVER: u32 = 86;
    pub const SHOOTING_FOUL: u32 = 42;
    pub const PERSONAL_FOUL: u32 = 44;
    pub const OFFENSIVE_FOUL: u32 = 37;
    pub const OFFENSIVE_CHARGE: u32 = 38;
    pub const TECHNICAL_FOUL: u32 = 35;
    pub const TIMEOUT: u32 = 16;
    pub const SUBSTITUTION: u32 = 584;
    pub const JUMP_BALL: u32 = 615;
    pub const PERIOD_START: u32 = 412;
    pub const PERIOD_END: u32 = 402;
    pub const GAME_END: u32 = 403;
    pub const GOALTENDING: u32 = 999;
}

/// Returns the events of the sample game.
///
/// Two periods between BOS (home) and NYK (away), ending 10-10, with one
/// of each tricky sequence: an and-one, a two-shot trip with a dead-ball team
/// rebound, an offensive charge with its duplicate turnover row, a technical
/// free throw, team rebounds and a shot clock team turnover. The tracker
/// counts 17 possessions (BOS 8, NYK 9).
pub fn sample_events() -> Vec<RawEvent> {
    let jsonl = include_str!("../tests/fixtures/sample_game.jsonl");
    jsonl
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            RawEvent::from_jsonl(l).unwrap_or_else(|e| {
                panic!("Failed to parse event line: {}\nError: {}", l, e)
            })
        })
        .collect()
}

/// Returns the roster of the sample game.
pub fn sample_roster() -> GameRoster {
    let json = include_str!("../tests/fixtures/sample_roster.json");
    GameRoster::from_json(json).expect("Failed to parse sample_roster.json")
}

/// Returns a specific sample event by sequence number.
pub fn get_event(sequence: u64) -> Option<RawEvent> {
    sample_events().into_iter().find(|e| e.sequence == sequence)
}

/// A generated game with a known possession count.
#[derive(Debug, Clone)]
pub struct SyntheticGame {
    pub roster: GameRoster,
    pub events: Vec<RawEvent>,
    /// Possessions generated; every one ends with exactly one ending event
    pub possessions: u32,
}

/// Home team id of synthetic games.
pub const SYNTHETIC_HOME: &str = "HOM";
/// Away team id of synthetic games.
pub const SYNTHETIC_AWAY: &str = "AWY";

/// Generates a seeded random game.
///
/// Every possession is drawn from a fixed set of patterns (made shots,
/// misses with rebounds, turnovers, free throw trips, and-ones, offensive
/// fouls with their duplicate turnover row), optionally preceded by
/// possession-neutral noise (timeouts, substitutions, non-shooting fouls,
/// technical free throws). Running scores are exact, so a correct engine
/// produces a validating box score and exactly `periods * per_period`
/// possessions.
pub fn synthetic_game(seed: u64, periods: u8, per_period: u32) -> SyntheticGame {
    let mut gen = Generator::new(seed);

    for period in 1..=periods {
        gen.start_period(period);
        let mut offense = if period % 2 == 1 { Side::Home } else { Side::Away };
        for _ in 0..per_period {
            gen.noise(offense);
            gen.possession(offense);
            offense = offense.other();
        }
        gen.end_period();
    }

    let mut roster = GameRoster::new(format!("synthetic_{:06}", seed), SYNTHETIC_HOME, SYNTHETIC_AWAY);
    for i in 1..=5 {
        roster.add_player(player_id(Side::Home, i), SYNTHETIC_HOME);
        roster.add_player(player_id(Side::Away, i), SYNTHETIC_AWAY);
    }

    SyntheticGame {
        roster,
        events: gen.events,
        possessions: u32::from(periods) * per_period,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Home,
    Away,
}

impl Side {
    fn other(self) -> Self {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }

    fn team(self) -> &'static str {
        match self {
            Side::Home => SYNTHETIC_HOME,
            Side::Away => SYNTHETIC_AWAY,
        }
    }
}

fn player_id(side: Side, n: u32) -> String {
    match side {
        Side::Home => format!("h{}", n),
        Side::Away => format!("a{}", n),
    }
}

struct Generator {
    rng: SmallRng,
    events: Vec<RawEvent>,
    sequence: u64,
    period: u8,
    clock: u32,
    home: u32,
    away: u32,
}

impl Generator {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            events: Vec::new(),
            sequence: 0,
            period: 1,
            clock: 7200,
            home: 0,
            away: 0,
        }
    }

    fn player(&mut self, side: Side) -> String {
        let n = self.rng.gen_range(1..=5);
        player_id(side, n)
    }

    fn teammate(&mut self, side: Side, not: &str) -> String {
        loop {
            let candidate = self.player(side);
            if candidate != not {
                return candidate;
            }
        }
    }

    fn tick(&mut self) {
        let elapsed = self.rng.gen_range(20..=140);
        self.clock = self.clock.saturating_sub(elapsed).max(10);
    }

    fn score(&mut self, side: Side, points: u32) {
        match side {
            Side::Home => self.home += points,
            Side::Away => self.away += points,
        }
    }

    fn event(&mut self, type_code: u32, label: &str, description: String) -> RawEventBuilder {
        self.sequence += 1;
        RawEventBuilder::new(self.sequence, type_code)
            .period(self.period)
            .clock(GameClock::from_tenths(self.clock).to_string())
            .label(label)
            .description(description)
    }

    fn push(&mut self, builder: RawEventBuilder) {
        let event = builder.score(self.home, self.away).build();
        self.events.push(event);
    }

    fn start_period(&mut self, period: u8) {
        self.period = period;
        self.clock = 7200;
        let b = self.event(codes::PERIOD_START, "Start Period", format!("Start of period {}", period));
        self.push(b);
    }

    fn end_period(&mut self) {
        self.clock = 0;
        let b = self.event(codes::PERIOD_END, "End Period", format!("End of period {}", self.period));
        self.push(b);
    }

    /// Possession-neutral events before a possession.
    fn noise(&mut self, offense: Side) {
        let defense = offense.other();
        let roll = self.rng.gen_range(0..10);
        self.tick();
        match roll {
            0 => {
                let b = self
                    .event(codes::TIMEOUT, "Full Timeout", format!("{} Full timeout", offense.team()))
                    .team(offense.team());
                self.push(b);
            }
            1 => {
                let incoming = self.player(offense);
                let outgoing = self.teammate(offense, &incoming);
                let b = self
                    .event(
                        codes::SUBSTITUTION,
                        "Substitution",
                        format!("{} enters the game for {}", incoming, outgoing),
                    )
                    .primary(incoming)
                    .secondary(outgoing)
                    .team(offense.team());
                self.push(b);
            }
            2 => {
                let fouler = self.player(defense);
                let b = self
                    .event(codes::PERSONAL_FOUL, "Personal Foul", format!("{} personal foul", fouler))
                    .primary(fouler)
                    .team(defense.team());
                self.push(b);
            }
            3 => {
                let fouler = self.player(defense);
                let b = self
                    .event(codes::TECHNICAL_FOUL, "Technical Foul", format!("{} technical foul", fouler))
                    .primary(fouler)
                    .team(defense.team());
                self.push(b);
                let shooter = self.player(offense);
                let made = self.rng.gen_bool(0.8);
                let verb = if made { "makes" } else { "misses" };
                if made {
                    self.score(offense, 1);
                }
                let mut b = self
                    .event(
                        codes::FREE_THROW_TECHNICAL,
                        "Free Throw - Technical",
                        format!("{} {} technical free throw", shooter, verb),
                    )
                    .primary(shooter)
                    .team(offense.team())
                    .shooting();
                if made {
                    b = b.scoring();
                }
                self.push(b);
            }
            _ => {}
        }
    }

    fn possession(&mut self, offense: Side) {
        let defense = offense.other();
        self.tick();
        match self.rng.gen_range(0..10) {
            0 => self.made_shot(offense, false),
            1 => self.made_shot(offense, true),
            2 => {
                let three = self.rng.gen_bool(0.4);
                self.missed_shot(offense, three, None);
                self.tick();
                self.defensive_rebound(defense);
            }
            3 => {
                let blocker = self.player(defense);
                self.missed_shot(offense, false, Some(blocker));
                self.tick();
                let b = self
                    .event(
                        codes::DEFENSIVE_REBOUND,
                        "Defensive Rebound",
                        format!("{} defensive team rebound", defense.team()),
                    )
                    .team(defense.team());
                self.push(b);
            }
            4 => {
                self.missed_shot(offense, false, None);
                self.tick();
                let rebounder = self.player(offense);
                let b = self
                    .event(
                        codes::OFFENSIVE_REBOUND,
                        "Offensive Rebound",
                        format!("{} offensive rebound", rebounder),
                    )
                    .primary(rebounder)
                    .team(offense.team());
                self.push(b);
                self.tick();
                self.made_shot(offense, false);
            }
            5 => {
                let handler = self.player(offense);
                let stealer = self.player(defense);
                let b = self
                    .event(
                        codes::BAD_PASS,
                        "Bad Pass Turnover",
                        format!("{} bad pass ({} steals)", handler, stealer),
                    )
                    .primary(handler)
                    .secondary(stealer)
                    .team(offense.team());
                self.push(b);
            }
            6 => {
                let shooter = self.player(offense);
                self.shooting_foul(defense, &shooter);
                self.free_throw(offense, &shooter, 1, 2);
                let final_made = self.free_throw(offense, &shooter, 2, 2);
                if !final_made {
                    self.tick();
                    self.defensive_rebound(defense);
                }
            }
            7 => {
                let shooter = self.player(offense);
                self.score(offense, 2);
                let b = self
                    .event(codes::LAYUP, "Layup Shot", format!("{} makes driving layup", shooter))
                    .primary(shooter.clone())
                    .team(offense.team())
                    .scoring()
                    .shooting();
                self.push(b);
                self.shooting_foul(defense, &shooter);
                let made = self.free_throw(offense, &shooter, 1, 1);
                if !made {
                    self.tick();
                    self.defensive_rebound(defense);
                }
            }
            8 => {
                let fouler = self.player(offense);
                let victim = self.player(defense);
                let b = self
                    .event(
                        codes::OFFENSIVE_FOUL,
                        "Offensive Foul",
                        format!("{} offensive foul", fouler),
                    )
                    .primary(fouler.clone())
                    .secondary(victim)
                    .team(offense.team());
                self.push(b);
                let b = self
                    .event(
                        codes::OFFENSIVE_FOUL_TURNOVER,
                        "Offensive Foul Turnover",
                        format!("{} offensive foul turnover", fouler),
                    )
                    .primary(fouler)
                    .team(offense.team());
                self.push(b);
            }
            _ => {
                let b = self
                    .event(
                        codes::TURNOVER,
                        "Shot Clock Turnover",
                        format!("{} shot clock turnover", offense.team()),
                    )
                    .team(offense.team());
                self.push(b);
            }
        }
    }

    fn made_shot(&mut self, offense: Side, three: bool) {
        let shooter = self.player(offense);
        let assister = if self.rng.gen_bool(0.5) {
            Some(self.teammate(offense, &shooter))
        } else {
            None
        };
        let points = if three { 3 } else { 2 };
        self.score(offense, points);

        let shot = if three {
            "25-foot three point jumper"
        } else {
            "17-foot jumper"
        };
        let mut description = format!("{} makes {}", shooter, shot);
        if let Some(a) = &assister {
            description.push_str(&format!(" ({} assists)", a));
        }

        let mut b = self
            .event(codes::JUMP_SHOT, "Jump Shot", description)
            .primary(shooter)
            .team(offense.team())
            .scoring()
            .shooting();
        if let Some(a) = assister {
            b = b.secondary(a);
        }
        self.push(b);
    }

    fn missed_shot(&mut self, offense: Side, three: bool, blocker: Option<String>) {
        let shooter = self.player(offense);
        let shot = if three {
            "26-foot three point jumper"
        } else {
            "12-foot jumper"
        };
        let mut description = format!("{} misses {}", shooter, shot);
        if let Some(bl) = &blocker {
            description.push_str(&format!(" ({} blocks)", bl));
        }

        let mut b = self
            .event(codes::JUMP_SHOT, "Jump Shot", description)
            .primary(shooter)
            .team(offense.team())
            .shooting();
        if let Some(bl) = blocker {
            b = b.secondary(bl);
        }
        self.push(b);
    }

    fn defensive_rebound(&mut self, defense: Side) {
        let rebounder = self.player(defense);
        let b = self
            .event(
                codes::DEFENSIVE_REBOUND,
                "Defensive Rebound",
                format!("{} defensive rebound", rebounder),
            )
            .primary(rebounder)
            .team(defense.team());
        self.push(b);
    }

    fn shooting_foul(&mut self, defense: Side, victim: &str) {
        let fouler = self.player(defense);
        let b = self
            .event(codes::SHOOTING_FOUL, "Shooting Foul", format!("{} shooting foul", fouler))
            .primary(fouler)
            .secondary(victim.to_string())
            .team(defense.team());
        self.push(b);
    }

    /// Emits one free throw and returns whether it was made.
    fn free_throw(&mut self, offense: Side, shooter: &str, index: u8, total: u8) -> bool {
        let made = self.rng.gen_bool(0.75);
        if made {
            self.score(offense, 1);
        }
        let code = match (index, total) {
            (1, 1) => codes::FREE_THROW_1_OF_1,
            (1, 2) => codes::FREE_THROW_1_OF_2,
            _ => codes::FREE_THROW_2_OF_2,
        };
        let verb = if made { "makes" } else { "misses" };
        let mut b = self
            .event(
                code,
                &format!("Free Throw - {} of {}", index, total),
                format!("{} {} free throw {} of {}", shooter, verb, index, total),
            )
            .primary(shooter.to_string())
            .team(offense.team())
            .shooting();
        if made {
            b = b.scoring();
        }
        self.push(b);
        made
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_events_load() {
        let events = sample_events();
        assert_eq!(events.len(), 43);
        assert!(events.windows(2).all(|w| w[0].sequence < w[1].sequence));
        let last = events.last().unwrap();
        assert_eq!((last.home_score, last.away_score), (10, 10));
    }

    #[test]
    fn test_sample_roster_load() {
        let roster = sample_roster();
        assert_eq!(roster.home_team, "BOS");
        assert_eq!(roster.away_team, "NYK");
        assert_eq!(roster.team_of("horford").map(String::as_str), Some("BOS"));
    }

    #[test]
    fn test_get_event() {
        let and_one = get_event(10).unwrap();
        assert_eq!(and_one.type_code, codes::FREE_THROW_1_OF_1);
        assert!(get_event(1000).is_none());
    }

    #[test]
    fn test_synthetic_game_is_deterministic() {
        let a = synthetic_game(42, 2, 10);
        let b = synthetic_game(42, 2, 10);
        assert_eq!(a.events, b.events);
        assert_eq!(a.possessions, 20);
    }

    #[test]
    fn test_synthetic_game_sequences_increase() {
        let game = synthetic_game(7, 4, 25);
        assert!(game.events.windows(2).all(|w| w[0].sequence < w[1].sequence));
        assert!(game.events.iter().all(|e| (1..=4).contains(&e.period)));
    }

    #[test]
    fn test_synthetic_game_scores_never_decrease() {
        let game = synthetic_game(99, 4, 30);
        for pair in game.events.windows(2) {
            assert!(pair[1].home_score >= pair[0].home_score);
            assert!(pair[1].away_score >= pair[0].away_score);
        }
    }

    #[test]
    fn test_synthetic_players_on_roster() {
        let game = synthetic_game(3, 1, 40);
        for event in &game.events {
            for id in event.player_ids() {
                assert!(game.roster.team_of(id).is_some(), "{} not on roster", id);
            }
        }
    }
}
