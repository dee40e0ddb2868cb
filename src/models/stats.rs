//! Gamification statistics derived from the completion log.
//!
//! Nothing here is persisted: every value is recomputed from the current
//! [`HabitLog`] on access. All derivations are pure and independent of the
//! order in which days are visited.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::HabitLog;

/// XP awarded per completion.
pub const XP_PER_COMPLETION: u64 = 10;

/// Days shown in the progress chart.
pub const PROGRESS_WINDOW_DAYS: u32 = 14;

/// Days of history shown in the consistency heatmap.
pub const HEATMAP_DAYS: u32 = 90;

/// Derived statistics for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserStats {
    pub xp: u64,
    pub level: u32,
    pub total_habits_completed: u64,
}

impl UserStats {
    /// Derive stats from the log.
    ///
    /// `xp = 10 * completions`, `level = floor(sqrt(xp / 100)) + 1`.
    pub fn from_logs(logs: &HabitLog) -> Self {
        Self::from_completions(logs.total_completions())
    }

    pub fn from_completions(total_habits_completed: u64) -> Self {
        let xp = total_habits_completed * XP_PER_COMPLETION;
        Self {
            xp,
            level: level_for_xp(xp),
            total_habits_completed,
        }
    }

    /// Percent filled of the XP bar (`xp % 100`, capped at 100).
    pub fn level_progress(&self) -> u8 {
        (self.xp % 100).min(100) as u8
    }
}

/// `floor(sqrt(xp / 100)) + 1`, computed in integers.
///
/// `floor(sqrt(xp / 100)) == isqrt(floor(xp / 100))`, so no float rounding
/// can push a level boundary off by one.
fn level_for_xp(xp: u64) -> u32 {
    isqrt(xp / 100) as u32 + 1
}

fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut x = (n as f64).sqrt() as u64;
    while x * x > n {
        x -= 1;
    }
    while (x + 1) * (x + 1) <= n {
        x += 1;
    }
    x
}

/// Completions on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub completed: usize,
}

/// Per-day completion counts for the `days` days ending at `end` (inclusive),
/// oldest first.
pub fn daily_counts(logs: &HabitLog, end: NaiveDate, days: u32) -> Vec<DailyCount> {
    (0..days)
        .rev()
        .filter_map(|back| end.checked_sub_days(Days::new(u64::from(back))))
        .map(|date| DailyCount {
            date,
            completed: logs.count_on(date),
        })
        .collect()
}

/// Rounded completion percentage over the window:
/// completions / (habit_count * days). Zero when there is nothing to complete.
pub fn completion_rate(logs: &HabitLog, habit_count: usize, end: NaiveDate, days: u32) -> u32 {
    let possible = habit_count as u64 * u64::from(days);
    if possible == 0 {
        return 0;
    }
    let completed: u64 = daily_counts(logs, end, days)
        .iter()
        .map(|d| d.completed as u64)
        .sum();
    ((completed as f64 / possible as f64) * 100.0).round() as u32
}

/// Heatmap cell intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatmapLevel {
    None,
    Low,
    Medium,
    High,
}

impl HeatmapLevel {
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => HeatmapLevel::None,
            1..=2 => HeatmapLevel::Low,
            3..=4 => HeatmapLevel::Medium,
            _ => HeatmapLevel::High,
        }
    }
}

/// One heatmap cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub date: NaiveDate,
    pub count: usize,
    pub level: HeatmapLevel,
}

/// Heatmap from `end - days` through `end`, oldest first (`days + 1` cells).
pub fn heatmap(logs: &HabitLog, end: NaiveDate, days: u32) -> Vec<HeatmapCell> {
    daily_counts(logs, end, days + 1)
        .into_iter()
        .map(|d| HeatmapCell {
            date: d.date,
            count: d.completed,
            level: HeatmapLevel::from_count(d.completed),
        })
        .collect()
}

/// Growth stage shown for a habit's streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthStage {
    Seed,
    Growing,
    Strong,
    Blooming,
    Mastered,
}

impl GrowthStage {
    pub fn from_streak(streak: u32) -> Self {
        if streak >= 30 {
            GrowthStage::Mastered
        } else if streak >= 14 {
            GrowthStage::Blooming
        } else if streak >= 7 {
            GrowthStage::Strong
        } else if streak >= 3 {
            GrowthStage::Growing
        } else {
            GrowthStage::Seed
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GrowthStage::Seed => "Seed",
            GrowthStage::Growing => "Growing",
            GrowthStage::Strong => "Strong",
            GrowthStage::Blooming => "Blooming",
            GrowthStage::Mastered => "Mastered",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_utils::date_key;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn log_with(counts: &[(u32, usize)]) -> HabitLog {
        counts
            .iter()
            .map(|(d, n)| {
                (
                    date_key(day(*d)),
                    (0..*n).map(|i| format!("habit-{i}")).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_xp_and_level_examples() {
        let cases = [(0, 0, 1), (10, 100, 2), (39, 390, 2), (40, 400, 3)];
        for (completions, xp, level) in cases {
            let stats = UserStats::from_completions(completions);
            assert_eq!(stats.xp, xp, "xp for {completions}");
            assert_eq!(stats.level, level, "level for {completions}");
            assert_eq!(stats.total_habits_completed, completions);
        }
    }

    #[test]
    fn test_level_matches_float_formula() {
        for completions in 0..5_000u64 {
            let xp = completions * 10;
            let expected = ((xp as f64 / 100.0).sqrt().floor() as u32) + 1;
            assert_eq!(UserStats::from_completions(completions).level, expected);
        }
    }

    #[test]
    fn test_from_logs_sums_all_days() {
        let logs = log_with(&[(1, 2), (2, 0), (5, 3)]);
        let stats = UserStats::from_logs(&logs);
        assert_eq!(stats.total_habits_completed, 5);
        assert_eq!(stats.xp, 50);
        assert_eq!(stats.level, 1);
        assert_eq!(UserStats::from_logs(&HabitLog::new()), UserStats::from_completions(0));
    }

    #[test]
    fn test_level_progress() {
        assert_eq!(UserStats::from_completions(0).level_progress(), 0);
        assert_eq!(UserStats::from_completions(7).level_progress(), 70);
        assert_eq!(UserStats::from_completions(10).level_progress(), 0);
    }

    #[test]
    fn test_daily_counts_window() {
        let logs = log_with(&[(1, 1), (10, 2), (14, 4)]);
        let counts = daily_counts(&logs, day(14), PROGRESS_WINDOW_DAYS);

        assert_eq!(counts.len(), 14);
        assert_eq!(counts[0].date, day(1));
        assert_eq!(counts[0].completed, 1);
        assert_eq!(counts[13].date, day(14));
        assert_eq!(counts[13].completed, 4);
    }

    #[test]
    fn test_completion_rate() {
        let logs = log_with(&[(13, 2), (14, 1)]);
        // 3 of 2 habits * 14 days = 28 -> 10.7% -> 11
        assert_eq!(completion_rate(&logs, 2, day(14), 14), 11);
        assert_eq!(completion_rate(&logs, 0, day(14), 14), 0);
    }

    #[test]
    fn test_heatmap_levels() {
        assert_eq!(HeatmapLevel::from_count(0), HeatmapLevel::None);
        assert_eq!(HeatmapLevel::from_count(2), HeatmapLevel::Low);
        assert_eq!(HeatmapLevel::from_count(3), HeatmapLevel::Medium);
        assert_eq!(HeatmapLevel::from_count(4), HeatmapLevel::Medium);
        assert_eq!(HeatmapLevel::from_count(5), HeatmapLevel::High);

        let logs = log_with(&[(20, 5)]);
        let cells = heatmap(&logs, day(20), 10);
        assert_eq!(cells.len(), 11);
        assert_eq!(cells.last().unwrap().level, HeatmapLevel::High);
        assert_eq!(cells[0].date, day(10));
    }

    #[test]
    fn test_growth_stages() {
        assert_eq!(GrowthStage::from_streak(0), GrowthStage::Seed);
        assert_eq!(GrowthStage::from_streak(3), GrowthStage::Growing);
        assert_eq!(GrowthStage::from_streak(7), GrowthStage::Strong);
        assert_eq!(GrowthStage::from_streak(14), GrowthStage::Blooming);
        assert_eq!(GrowthStage::from_streak(29), GrowthStage::Blooming);
        assert_eq!(GrowthStage::from_streak(30).label(), "Mastered");
    }
}
