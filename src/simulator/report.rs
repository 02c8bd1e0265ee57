//! Simulation report generation.

use super::config::SimConfig;
use crate::dungeon::RunEndReason;
use serde::Serialize;
use std::collections::BTreeMap;

/// What one simulated expedition achieved.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpeditionStats {
    pub run_id: String,
    /// Why the run could not start, if it could not.
    pub start_error: Option<String>,
    pub simulated_ms: i64,
    pub victories: u32,
    /// Auto-restarts that actually fired.
    pub restarts: u32,
    pub max_floor: u32,
    /// How the expedition ended; `None` when it was still going at the time limit.
    pub end_reason: Option<RunEndReason>,
    pub gold: i64,
    pub food_spent: i64,
    pub potions_used: i64,
    pub combat_xp: u64,
    pub combat_ms: i64,
    /// Replay events dropped across every finished run.
    pub truncated_events: u32,
    pub loot: BTreeMap<String, i64>,
}

impl ExpeditionStats {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            ..Self::default()
        }
    }

    pub fn outcome_label(&self) -> &'static str {
        if self.start_error.is_some() {
            return "not started";
        }
        match self.end_reason {
            Some(reason) => reason.label(),
            None => "still running",
        }
    }
}

/// Aggregated results from a batch of expeditions.
#[derive(Debug, Clone)]
pub struct SimReport {
    pub dungeon_id: String,
    pub num_runs: u32,
    pub duration_ms: i64,
    pub failed_starts: u32,

    // Outcomes
    pub wipes: u32,
    pub out_of_food: u32,
    pub stopped: u32,
    pub still_running: u32,

    // Averages over started expeditions
    pub avg_victories: f64,
    pub avg_max_floor: f64,
    pub avg_gold: f64,
    pub avg_food_spent: f64,
    pub avg_potions_used: f64,
    pub avg_combat_xp: f64,
    /// Victories per simulated hour.
    pub clears_per_hour: f64,

    pub total_truncated_events: u32,
    pub loot_totals: BTreeMap<String, i64>,

    // Individual expedition stats for detailed analysis
    pub expeditions: Vec<ExpeditionStats>,
}

impl SimReport {
    pub fn from_expeditions(config: &SimConfig, expeditions: Vec<ExpeditionStats>) -> Self {
        let started: Vec<&ExpeditionStats> = expeditions
            .iter()
            .filter(|e| e.start_error.is_none())
            .collect();
        let n = started.len().max(1) as f64;
        let avg = |f: &dyn Fn(&ExpeditionStats) -> f64| started.iter().map(|e| f(e)).sum::<f64>() / n;
        let count = |reason: Option<RunEndReason>| {
            started.iter().filter(|e| e.end_reason == reason).count() as u32
        };

        let mut loot_totals = BTreeMap::new();
        for stats in &started {
            for (item_id, quantity) in &stats.loot {
                *loot_totals.entry(item_id.clone()).or_insert(0) += quantity;
            }
        }

        let simulated_hours = started.iter().map(|e| e.simulated_ms).sum::<i64>() as f64 / 3_600_000.0;
        let total_victories: u32 = started.iter().map(|e| e.victories).sum();

        Self {
            dungeon_id: config.dungeon_id.clone(),
            num_runs: config.num_runs,
            duration_ms: config.duration_ms,
            failed_starts: (expeditions.len() - started.len()) as u32,
            wipes: count(Some(RunEndReason::Wipe)),
            out_of_food: count(Some(RunEndReason::OutOfFood)),
            stopped: count(Some(RunEndReason::Stopped)),
            still_running: count(None),
            avg_victories: avg(&|e| e.victories as f64),
            avg_max_floor: avg(&|e| e.max_floor as f64),
            avg_gold: avg(&|e| e.gold as f64),
            avg_food_spent: avg(&|e| e.food_spent as f64),
            avg_potions_used: avg(&|e| e.potions_used as f64),
            avg_combat_xp: avg(&|e| e.combat_xp as f64),
            clears_per_hour: if simulated_hours > 0.0 {
                total_victories as f64 / simulated_hours
            } else {
                0.0
            },
            total_truncated_events: started.iter().map(|e| e.truncated_events).sum(),
            loot_totals,
            expeditions,
        }
    }

    /// Generate a text report.
    pub fn to_text(&self) -> String {
        let mut report = String::new();

        report.push_str("═══════════════════════════════════════════════════════════════\n");
        report.push_str("                   DUNGEON SIMULATION REPORT\n");
        report.push_str(&format!("                 {}\n", self.dungeon_id));
        report.push_str("═══════════════════════════════════════════════════════════════\n\n");

        report.push_str(&format!(
            "Expeditions: {} total, {} failed to start, {:.1} min each\n\n",
            self.num_runs,
            self.failed_starts,
            self.duration_ms as f64 / 60_000.0
        ));

        report.push_str("── OUTCOMES ─────────────────────────────────────────────────────\n");
        report.push_str(&format!(
            "  Avg Victories:       {:.2}\n",
            self.avg_victories
        ));
        report.push_str(&format!(
            "  Clears per Hour:     {:.2}\n",
            self.clears_per_hour
        ));
        report.push_str(&format!(
            "  Avg Max Floor:       {:.1}\n",
            self.avg_max_floor
        ));
        report.push_str(&format!("  Wipes:               {}\n", self.wipes));
        report.push_str(&format!("  Out of Food:         {}\n", self.out_of_food));
        report.push_str(&format!("  Stopped:             {}\n", self.stopped));
        report.push_str(&format!(
            "  Still Running:       {}\n\n",
            self.still_running
        ));

        report.push_str("── ECONOMY ──────────────────────────────────────────────────────\n");
        report.push_str(&format!("  Avg Gold:            {:.0}\n", self.avg_gold));
        report.push_str(&format!(
            "  Avg Food Spent:      {:.1}\n",
            self.avg_food_spent
        ));
        report.push_str(&format!(
            "  Avg Potions Used:    {:.1}\n",
            self.avg_potions_used
        ));
        report.push_str(&format!(
            "  Avg Combat XP:       {:.0}\n\n",
            self.avg_combat_xp
        ));

        if !self.loot_totals.is_empty() {
            report.push_str("── LOOT ─────────────────────────────────────────────────────────\n");
            for (item_id, quantity) in &self.loot_totals {
                report.push_str(&format!("  {:<20} {}\n", item_id, quantity));
            }
            report.push('\n');
        }

        if self.total_truncated_events > 0 {
            report.push_str(&format!(
                "⚠ {} replay events were truncated\n",
                self.total_truncated_events
            ));
        }

        report
    }

    /// Export report as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Serialize for SimReport {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("SimReport", 19)?;
        state.serialize_field("dungeon_id", &self.dungeon_id)?;
        state.serialize_field("num_runs", &self.num_runs)?;
        state.serialize_field("duration_ms", &self.duration_ms)?;
        state.serialize_field("failed_starts", &self.failed_starts)?;
        state.serialize_field("wipes", &self.wipes)?;
        state.serialize_field("out_of_food", &self.out_of_food)?;
        state.serialize_field("stopped", &self.stopped)?;
        state.serialize_field("still_running", &self.still_running)?;
        state.serialize_field("avg_victories", &self.avg_victories)?;
        state.serialize_field("avg_max_floor", &self.avg_max_floor)?;
        state.serialize_field("avg_gold", &self.avg_gold)?;
        state.serialize_field("avg_food_spent", &self.avg_food_spent)?;
        state.serialize_field("avg_potions_used", &self.avg_potions_used)?;
        state.serialize_field("avg_combat_xp", &self.avg_combat_xp)?;
        state.serialize_field("clears_per_hour", &self.clears_per_hour)?;
        state.serialize_field("total_truncated_events", &self.total_truncated_events)?;
        state.serialize_field("loot_totals", &self.loot_totals)?;
        state.serialize_field("expeditions", &self.expeditions)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expedition(victories: u32, end_reason: Option<RunEndReason>) -> ExpeditionStats {
        let mut stats = ExpeditionStats::new("sim-test");
        stats.simulated_ms = 3_600_000;
        stats.victories = victories;
        stats.max_floor = 10;
        stats.end_reason = end_reason;
        stats.gold = 65 * victories as i64;
        stats.food_spent = 20;
        stats.loot.insert("copper_ore".to_string(), 5);
        stats
    }

    fn report() -> SimReport {
        let mut failed = ExpeditionStats::new("sim-bad");
        failed.start_error = Some("not enough food".to_string());
        let config = SimConfig {
            num_runs: 4,
            ..Default::default()
        };
        SimReport::from_expeditions(
            &config,
            vec![
                expedition(4, None),
                expedition(2, Some(RunEndReason::Wipe)),
                expedition(0, Some(RunEndReason::OutOfFood)),
                failed,
            ],
        )
    }

    #[test]
    fn test_report_averages_over_started_expeditions() {
        let report = report();
        assert_eq!(report.failed_starts, 1);
        assert_eq!(report.wipes, 1);
        assert_eq!(report.out_of_food, 1);
        assert_eq!(report.still_running, 1);
        assert!((report.avg_victories - 2.0).abs() < 1e-9);
        assert!((report.clears_per_hour - 2.0).abs() < 1e-9);
        assert_eq!(report.loot_totals["copper_ore"], 15);
    }

    #[test]
    fn test_report_text_has_sections() {
        let text = report().to_text();
        assert!(text.contains("DUNGEON SIMULATION REPORT"));
        assert!(text.contains("OUTCOMES"));
        assert!(text.contains("copper_ore"));
    }

    #[test]
    fn test_report_json_is_parseable() {
        let json = report().to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["wipes"], 1);
        assert_eq!(value["expeditions"].as_array().unwrap().len(), 4);
    }
}
