//! Consistency validation.
//!
//! Runs read-only checks over a finished [`BoxScoreResult`] and reports every
//! failure with its numeric discrepancy. Nothing is corrected.

use serde::{Deserialize, Serialize};
use std::fmt;

use pbp_events::{Stat, StatLine};

use crate::aggregator::{BoxScoreResult, ShootingSplits, FTA_WEIGHT};
use crate::config::ValidationConfig;

/// The named consistency rules, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRule {
    TeamEqualsSum,
    ScoreReconstruction,
    PercentageSanity,
    NonNegativity,
}

impl CheckRule {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckRule::TeamEqualsSum => "team_equals_sum",
            CheckRule::ScoreReconstruction => "score_reconstruction",
            CheckRule::PercentageSanity => "percentage_sanity",
            CheckRule::NonNegativity => "non_negativity",
        }
    }
}

impl fmt::Display for CheckRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one rule for one subject (a team or a player).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub rule: CheckRule,
    /// Team or player id
    pub subject: String,
    pub passed: bool,
    /// Size of the worst mismatch, when the check failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discrepancy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckResult {
    fn pass(rule: CheckRule, subject: &str) -> Self {
        Self {
            rule,
            subject: subject.to_string(),
            passed: true,
            discrepancy: None,
            detail: None,
        }
    }

    fn fail(rule: CheckRule, subject: &str, discrepancy: f64, detail: String) -> Self {
        Self {
            rule,
            subject: subject.to_string(),
            passed: false,
            discrepancy: Some(discrepancy),
            detail: Some(detail),
        }
    }
}

/// Tracked against estimated possessions. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PossessionCrossCheck {
    pub tracked: u32,
    pub estimated: f64,
    /// `|tracked - estimated| / estimated`, 0 when nothing was estimated
    pub drift: f64,
    pub within_tolerance: bool,
}

/// All check results for one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub game_id: String,
    pub checks: Vec<CheckResult>,
    pub possessions: PossessionCrossCheck,
}

impl ValidationReport {
    /// True when every check passed. The possession cross-check is ignored.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Failing checks, in order.
    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }

    /// Checks of one rule, in order.
    pub fn checks_for(&self, rule: CheckRule) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(move |c| c.rule == rule)
    }
}

/// Runs the consistency rules over box scores.
#[derive(Debug, Clone, Default)]
pub struct ConsistencyValidator {
    config: ValidationConfig,
}

impl ConsistencyValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validates one box score.
    pub fn validate(&self, result: &BoxScoreResult) -> ValidationReport {
        let mut checks = Vec::new();
        self.team_equals_sum(result, &mut checks);
        self.score_reconstruction(result, &mut checks);
        self.percentage_sanity(result, &mut checks);
        self.non_negativity(result, &mut checks);

        let estimated = result.estimated_possessions;
        let drift = if estimated == 0.0 {
            0.0
        } else {
            (f64::from(result.possessions) - estimated).abs() / estimated
        };

        let report = ValidationReport {
            game_id: result.game_id.clone(),
            checks,
            possessions: PossessionCrossCheck {
                tracked: result.possessions,
                estimated,
                drift,
                within_tolerance: drift <= self.config.possession_drift_tolerance,
            },
        };

        for failure in report.failures() {
            tracing::warn!(
                "{}: {} failed for {}: {}",
                report.game_id,
                failure.rule,
                failure.subject,
                failure.detail.as_deref().unwrap_or("")
            );
        }
        report
    }

    fn team_equals_sum(&self, result: &BoxScoreResult, checks: &mut Vec<CheckResult>) {
        for team in result.teams() {
            let mut expected = team.team_only;
            for player in result.players_of(&team.team_id) {
                expected.merge(&player.stats);
            }

            let worst = Stat::all()
                .iter()
                .map(|&stat| (stat, team.stats[stat] - expected[stat]))
                .filter(|(_, diff)| *diff != 0)
                .max_by_key(|(_, diff)| diff.abs());

            checks.push(match worst {
                None => CheckResult::pass(CheckRule::TeamEqualsSum, &team.team_id),
                Some((stat, diff)) => CheckResult::fail(
                    CheckRule::TeamEqualsSum,
                    &team.team_id,
                    f64::from(diff),
                    format!(
                        "{}: team {} vs players plus team-only {}",
                        stat, team.stats[stat], expected[stat]
                    ),
                ),
            });
        }
    }

    fn score_reconstruction(&self, result: &BoxScoreResult, checks: &mut Vec<CheckResult>) {
        for team in result.teams() {
            let reconstructed = i64::from(team.stats.points_from_shooting());
            let diff = i64::from(team.final_score) - reconstructed;
            checks.push(if diff == 0 {
                CheckResult::pass(CheckRule::ScoreReconstruction, &team.team_id)
            } else {
                CheckResult::fail(
                    CheckRule::ScoreReconstruction,
                    &team.team_id,
                    diff as f64,
                    format!(
                        "final score {} vs reconstructed {}",
                        team.final_score, reconstructed
                    ),
                )
            });
        }
    }

    fn percentage_sanity(&self, result: &BoxScoreResult, checks: &mut Vec<CheckResult>) {
        let subjects = result
            .teams()
            .into_iter()
            .map(|t| (t.team_id.as_str(), &t.stats, &t.splits))
            .chain(
                result
                    .players
                    .iter()
                    .map(|p| (p.player_id.as_str(), &p.stats, &p.splits)),
            );

        for (subject, line, splits) in subjects {
            checks.push(match self.percentage_problem(line, splits) {
                None => CheckResult::pass(CheckRule::PercentageSanity, subject),
                Some((discrepancy, detail)) => {
                    CheckResult::fail(CheckRule::PercentageSanity, subject, discrepancy, detail)
                }
            });
        }
    }

    /// The worst percentage problem of one line, if any.
    fn percentage_problem(&self, line: &StatLine, splits: &ShootingSplits) -> Option<(f64, String)> {
        let tolerance = self.config.percentage_tolerance;
        let mut worst: Option<(f64, String)> = None;
        let mut note = |discrepancy: f64, detail: String| {
            if worst.as_ref().map_or(true, |(w, _)| discrepancy > *w) {
                worst = Some((discrepancy, detail));
            }
        };

        let bounded = [
            ("fg_pct", splits.fg_pct, line.fgm, line.fga),
            ("fg3_pct", splits.fg3_pct, line.fg3m, line.fg3a),
            ("ft_pct", splits.ft_pct, line.ftm, line.fta),
        ];
        for (name, pct, makes, attempts) in bounded {
            if !pct.is_finite() {
                note(f64::INFINITY, format!("{} is not finite", name));
                continue;
            }
            if !(0.0..=1.0).contains(&pct) {
                let over = if pct < 0.0 { -pct } else { pct - 1.0 };
                note(over, format!("{} {} outside [0, 1]", name, pct));
            }
            let expected = if attempts == 0 {
                0.0
            } else {
                f64::from(makes) / f64::from(attempts)
            };
            let diff = (pct - expected).abs();
            if diff > tolerance {
                note(diff, format!("{} {} vs {}/{}", name, pct, makes, attempts));
            }
        }

        let fga = f64::from(line.fga);
        let fta = f64::from(line.fta);
        let ts_denominator = 2.0 * (fga + FTA_WEIGHT * fta);
        let derived = [
            (
                "ts_pct",
                splits.ts_pct,
                if ts_denominator == 0.0 {
                    0.0
                } else {
                    f64::from(line.pts) / ts_denominator
                },
            ),
            (
                "efg_pct",
                splits.efg_pct,
                if line.fga == 0 {
                    0.0
                } else {
                    (f64::from(line.fgm) + 0.5 * f64::from(line.fg3m)) / fga
                },
            ),
        ];
        for (name, pct, expected) in derived {
            if !pct.is_finite() {
                note(f64::INFINITY, format!("{} is not finite", name));
                continue;
            }
            if pct < 0.0 {
                note(-pct, format!("{} {} is negative", name, pct));
            }
            let diff = (pct - expected).abs();
            if diff > tolerance {
                note(diff, format!("{} {} vs formula {}", name, pct, expected));
            }
        }

        worst
    }

    fn non_negativity(&self, result: &BoxScoreResult, checks: &mut Vec<CheckResult>) {
        let mut subjects: Vec<(&str, Option<(Stat, i32)>)> = Vec::new();
        for team in result.teams() {
            let worst = [team.stats.most_negative(), team.team_only.most_negative()]
                .into_iter()
                .flatten()
                .min_by_key(|(_, v)| *v);
            subjects.push((team.team_id.as_str(), worst));
        }
        for player in &result.players {
            subjects.push((player.player_id.as_str(), player.stats.most_negative()));
        }

        for (subject, worst) in subjects {
            checks.push(match worst {
                None => CheckResult::pass(CheckRule::NonNegativity, subject),
                Some((stat, value)) => CheckResult::fail(
                    CheckRule::NonNegativity,
                    subject,
                    f64::from(value),
                    format!("{} is {}", stat, value),
                ),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{PlayerBox, TeamBox};
    use pbp_events::TeamSide;

    fn line(fgm: i32, fga: i32, fg3m: i32, fg3a: i32, ftm: i32, fta: i32) -> StatLine {
        StatLine {
            fgm,
            fga,
            fg3m,
            fg3a,
            ftm,
            fta,
            pts: 2 * (fgm - fg3m) + 3 * fg3m + ftm,
            ..StatLine::default()
        }
    }

    fn team(team_id: &str, side: TeamSide, stats: StatLine) -> TeamBox {
        TeamBox {
            team_id: team_id.to_string(),
            side,
            final_score: stats.pts as u32,
            stats,
            team_only: StatLine::new(),
            splits: ShootingSplits::from_line(&stats),
            possessions: 0,
            estimated_possessions: 0.0,
            pace: 0.0,
            offensive_rating: 0.0,
            defensive_rating: 0.0,
        }
    }

    fn player(player_id: &str, team_id: &str, stats: StatLine) -> PlayerBox {
        PlayerBox {
            player_id: player_id.to_string(),
            team_id: Some(team_id.to_string()),
            stats,
            splits: ShootingSplits::from_line(&stats),
        }
    }

    fn consistent() -> BoxScoreResult {
        let a1 = line(3, 7, 1, 3, 2, 2);
        let a2 = line(1, 2, 0, 0, 0, 2);
        let b1 = line(4, 9, 2, 5, 1, 1);
        let mut home = a1;
        home.merge(&a2);

        BoxScoreResult {
            game_id: "g1".to_string(),
            home_team: "A".to_string(),
            away_team: "B".to_string(),
            home_score: home.pts as u32,
            away_score: b1.pts as u32,
            periods: 4,
            game_minutes: 48.0,
            possessions: 10,
            estimated_possessions: 10.0,
            pace: 5.0,
            players: vec![player("a1", "A", a1), player("a2", "A", a2), player("b1", "B", b1)],
            home: team("A", TeamSide::Home, home),
            away: team("B", TeamSide::Away, b1),
        }
    }

    fn validator() -> ConsistencyValidator {
        ConsistencyValidator::default()
    }

    #[test]
    fn test_consistent_box_score_passes() {
        let report = validator().validate(&consistent());
        assert!(report.passed(), "{:?}", report.failures().collect::<Vec<_>>());
        // 2 teams for each team rule, 5 subjects for each per-line rule
        assert_eq!(report.checks.len(), 2 + 2 + 5 + 5);
        assert_eq!(report.checks[0].rule, CheckRule::TeamEqualsSum);
        assert_eq!(report.checks.last().unwrap().rule, CheckRule::NonNegativity);
    }

    #[test]
    fn test_team_sum_mismatch_reported() {
        let mut result = consistent();
        result.home.stats.ast += 2;
        let report = validator().validate(&result);

        let failure = report
            .checks_for(CheckRule::TeamEqualsSum)
            .find(|c| c.subject == "A")
            .unwrap();
        assert!(!failure.passed);
        assert_eq!(failure.discrepancy, Some(2.0));
        assert!(failure.detail.as_deref().unwrap().starts_with("ast"));
        assert!(!report.passed());
    }

    #[test]
    fn test_team_only_counts_toward_sum() {
        let mut result = consistent();
        result.away.stats.oreb += 1;
        result.away.team_only.oreb += 1;
        let report = validator().validate(&result);
        assert!(report.passed());
    }

    #[test]
    fn test_score_reconstruction_failure() {
        let mut result = consistent();
        result.away.final_score += 3;
        let report = validator().validate(&result);

        let failure = report
            .checks_for(CheckRule::ScoreReconstruction)
            .find(|c| c.subject == "B")
            .unwrap();
        assert!(!failure.passed);
        assert_eq!(failure.discrepancy, Some(3.0));
    }

    #[test]
    fn test_percentage_out_of_range() {
        let mut result = consistent();
        result.players[0].splits.fg_pct = 1.5;
        let report = validator().validate(&result);

        let failure = report
            .checks_for(CheckRule::PercentageSanity)
            .find(|c| c.subject == "a1")
            .unwrap();
        assert!(!failure.passed);
        assert!(failure.discrepancy.unwrap() > 0.5);
    }

    #[test]
    fn test_percentage_formula_mismatch() {
        let mut result = consistent();
        result.home.splits.efg_pct += 0.01;
        let report = validator().validate(&result);
        let failure = report
            .checks_for(CheckRule::PercentageSanity)
            .find(|c| c.subject == "A")
            .unwrap();
        assert!(!failure.passed);
        assert!((failure.discrepancy.unwrap() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_zero_free_throws_zero_pct() {
        let mut result = consistent();
        let stats = line(1, 1, 0, 0, 0, 0);
        result.players[1] = player("a2", "A", stats);
        assert_eq!(result.players[1].splits.ft_pct, 0.0);

        result.players[1].splits.ft_pct = f64::NAN;
        let report = validator().validate(&result);
        let failure = report
            .checks_for(CheckRule::PercentageSanity)
            .find(|c| c.subject == "a2")
            .unwrap();
        assert!(!failure.passed);
    }

    #[test]
    fn test_negative_counter_reported() {
        let mut result = consistent();
        result.players[2].stats.tov = -1;
        result.away.stats.tov = -1;
        let report = validator().validate(&result);

        let failure = report
            .checks_for(CheckRule::NonNegativity)
            .find(|c| c.subject == "b1")
            .unwrap();
        assert!(!failure.passed);
        assert_eq!(failure.discrepancy, Some(-1.0));
        // the sums still agree
        assert!(report.checks_for(CheckRule::TeamEqualsSum).all(|c| c.passed));
    }

    #[test]
    fn test_possession_cross_check_is_advisory() {
        let mut result = consistent();
        result.estimated_possessions = 20.0;
        let report = validator().validate(&result);

        assert!(report.passed());
        assert_eq!(report.possessions.tracked, 10);
        assert_eq!(report.possessions.drift, 0.5);
        assert!(!report.possessions.within_tolerance);
    }

    #[test]
    fn test_report_serializes_rule_names() {
        let report = validator().validate(&consistent());
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""rule":"team_equals_sum""#));
        assert!(!json.contains("discrepancy"));
    }
}
