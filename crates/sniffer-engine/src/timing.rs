//! Per-pass counters and per-rule timing statistics

use std::collections::HashMap;
use std::time::Duration;

/// Time spent in one rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTiming {
    pub rule: String,
    pub total_time: Duration,
    /// Number of times the rule fired
    pub firings: usize,
    /// Diagnostics recorded while it fired
    pub matches: usize,
}

impl RuleTiming {
    pub fn new(rule: &str) -> Self {
        Self {
            rule: rule.to_string(),
            ..Default::default()
        }
    }

    /// Average time per firing
    pub fn avg_time(&self) -> Duration {
        if self.firings > 0 {
            self.total_time / self.firings as u32
        } else {
            Duration::ZERO
        }
    }

    fn absorb(&mut self, other: &RuleTiming) {
        self.total_time += other.total_time;
        self.firings += other.firings;
        self.matches += other.matches;
    }
}

/// Counters for one or more dispatcher passes
#[derive(Debug, Clone, Default)]
pub struct PassStats {
    pub tokens_visited: usize,
    pub firings: usize,
    pub faults: usize,
    /// rule code -> timing
    pub timings: HashMap<String, RuleTiming>,
}

impl PassStats {
    /// Add another pass (or file) into this one
    pub fn merge(&mut self, other: &PassStats) {
        self.tokens_visited += other.tokens_visited;
        self.firings += other.firings;
        self.faults += other.faults;
        for (rule, timing) in &other.timings {
            self.timings
                .entry(rule.clone())
                .or_insert_with(|| RuleTiming::new(rule))
                .absorb(timing);
        }
    }

    /// Timings sorted by total time, slowest first
    pub fn sorted_timings(&self) -> Vec<&RuleTiming> {
        let mut timings: Vec<_> = self.timings.values().collect();
        timings.sort_by(|a, b| b.total_time.cmp(&a.total_time).then(a.rule.cmp(&b.rule)));
        timings
    }

    /// Render a table of rule timings
    pub fn format_timings(&self) -> String {
        let timings = self.sorted_timings();
        if timings.is_empty() {
            return "No timing data available".to_string();
        }

        let total: Duration = timings.iter().map(|t| t.total_time).sum();
        let mut output = format!(
            "{:<40} {:>12} {:>8} {:>8} {:>7}\n",
            "Rule", "Time", "Firings", "Matches", "Share"
        );
        output.push_str(&"-".repeat(79));
        output.push('\n');

        for timing in timings {
            let share = if total.is_zero() {
                0.0
            } else {
                timing.total_time.as_secs_f64() / total.as_secs_f64() * 100.0
            };
            output.push_str(&format!(
                "{:<40} {:>12.3?} {:>8} {:>8} {:>6.1}%\n",
                timing.rule, timing.total_time, timing.firings, timing.matches, share
            ));
        }

        output
    }
}
