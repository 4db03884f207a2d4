//! Box score counting stats.
//!
//! The fifteen raw counters every player and team line carries, plus the
//! delta type classified events use to move them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

use crate::PlayerId;

/// One raw counting stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Fgm,
    Fga,
    Fg3m,
    Fg3a,
    Ftm,
    Fta,
    Oreb,
    Dreb,
    Reb,
    Ast,
    Stl,
    Blk,
    Tov,
    Pf,
    Pts,
}

impl Stat {
    /// Number of counting stats.
    pub const COUNT: usize = 15;

    /// Returns all stats in box score column order.
    pub fn all() -> &'static [Stat; Stat::COUNT] {
        &[
            Stat::Fgm,
            Stat::Fga,
            Stat::Fg3m,
            Stat::Fg3a,
            Stat::Ftm,
            Stat::Fta,
            Stat::Oreb,
            Stat::Dreb,
            Stat::Reb,
            Stat::Ast,
            Stat::Stl,
            Stat::Blk,
            Stat::Tov,
            Stat::Pf,
            Stat::Pts,
        ]
    }

    /// Column index of this stat in a [`StatLine`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short column name ("fgm", "fg3a", ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Stat::Fgm => "fgm",
            Stat::Fga => "fga",
            Stat::Fg3m => "fg3m",
            Stat::Fg3a => "fg3a",
            Stat::Ftm => "ftm",
            Stat::Fta => "fta",
            Stat::Oreb => "oreb",
            Stat::Dreb => "dreb",
            Stat::Reb => "reb",
            Stat::Ast => "ast",
            Stat::Stl => "stl",
            Stat::Blk => "blk",
            Stat::Tov => "tov",
            Stat::Pf => "pf",
            Stat::Pts => "pts",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of counters, one per [`Stat`].
///
/// Counters are signed so a corrupted stream shows up as a negative value
/// in validation instead of wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatLine {
    pub fgm: i32,
    pub fga: i32,
    pub fg3m: i32,
    pub fg3a: i32,
    pub ftm: i32,
    pub fta: i32,
    pub oreb: i32,
    pub dreb: i32,
    pub reb: i32,
    pub ast: i32,
    pub stl: i32,
    pub blk: i32,
    pub tov: i32,
    pub pf: i32,
    pub pts: i32,
}

impl StatLine {
    /// Creates an all-zero line.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of one stat.
    pub fn get(&self, stat: Stat) -> i32 {
        self[stat]
    }

    /// Adds `amount` to one stat.
    pub fn add(&mut self, stat: Stat, amount: i32) {
        self[stat] += amount;
    }

    /// Adds every counter of `other` into this line.
    pub fn merge(&mut self, other: &StatLine) {
        for &stat in Stat::all() {
            self[stat] += other[stat];
        }
    }

    /// Iterates `(stat, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (Stat, i32)> + '_ {
        Stat::all().iter().map(move |&stat| (stat, self[stat]))
    }

    /// Returns true if every counter is zero.
    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, v)| v == 0)
    }

    /// Returns the most negative counter, if any counter is below zero.
    pub fn most_negative(&self) -> Option<(Stat, i32)> {
        self.iter()
            .filter(|(_, v)| *v < 0)
            .min_by_key(|(_, v)| *v)
    }

    /// Points implied by the shooting counters: `2*(FGM-FG3M) + 3*FG3M + FTM`.
    pub fn points_from_shooting(&self) -> i32 {
        2 * (self.fgm - self.fg3m) + 3 * self.fg3m + self.ftm
    }
}

impl Index<Stat> for StatLine {
    type Output = i32;

    fn index(&self, stat: Stat) -> &i32 {
        match stat {
            Stat::Fgm => &self.fgm,
            Stat::Fga => &self.fga,
            Stat::Fg3m => &self.fg3m,
            Stat::Fg3a => &self.fg3a,
            Stat::Ftm => &self.ftm,
            Stat::Fta => &self.fta,
            Stat::Oreb => &self.oreb,
            Stat::Dreb => &self.dreb,
            Stat::Reb => &self.reb,
            Stat::Ast => &self.ast,
            Stat::Stl => &self.stl,
            Stat::Blk => &self.blk,
            Stat::Tov => &self.tov,
            Stat::Pf => &self.pf,
            Stat::Pts => &self.pts,
        }
    }
}

impl IndexMut<Stat> for StatLine {
    fn index_mut(&mut self, stat: Stat) -> &mut i32 {
        match stat {
            Stat::Fgm => &mut self.fgm,
            Stat::Fga => &mut self.fga,
            Stat::Fg3m => &mut self.fg3m,
            Stat::Fg3a => &mut self.fg3a,
            Stat::Ftm => &mut self.ftm,
            Stat::Fta => &mut self.fta,
            Stat::Oreb => &mut self.oreb,
            Stat::Dreb => &mut self.dreb,
            Stat::Reb => &mut self.reb,
            Stat::Ast => &mut self.ast,
            Stat::Stl => &mut self.stl,
            Stat::Blk => &mut self.blk,
            Stat::Tov => &mut self.tov,
            Stat::Pf => &mut self.pf,
            Stat::Pts => &mut self.pts,
        }
    }
}

/// Who a stat delta is credited to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "id")]
pub enum DeltaTarget {
    /// An individual player
    Player(PlayerId),
    /// The acting team only, never an individual (team rebounds, shot clock turnovers)
    Team,
}

/// One `(target, stat, amount)` contribution of a classified event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatDelta {
    pub target: DeltaTarget,
    pub stat: Stat,
    pub amount: i32,
}

impl StatDelta {
    /// Credits `+1` of `stat` to a player.
    pub fn player(player_id: impl Into<String>, stat: Stat) -> Self {
        Self {
            target: DeltaTarget::Player(player_id.into()),
            stat,
            amount: 1,
        }
    }

    /// Credits `+1` of `stat` to the acting team only.
    pub fn team(stat: Stat) -> Self {
        Self {
            target: DeltaTarget::Team,
            stat,
            amount: 1,
        }
    }

    /// Overrides the amount.
    pub fn with_amount(mut self, amount: i32) -> Self {
        self.amount = amount;
        self
    }

    /// Returns the credited player, if the target is a player.
    pub fn player_id(&self) -> Option<&str> {
        match &self.target {
            DeltaTarget::Player(id) => Some(id),
            DeltaTarget::Team => None,
        }
    }
}
