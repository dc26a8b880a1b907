//! Per-ruleset fitness history and a conservative UCB selection rule: the
//! driver's only durable memory across generations (§5 "Shared resources" --
//! owned exclusively by the driver; workers return values, they don't share
//! this).

use std::collections::HashMap;

use crate::ruleset::Ruleset;
use crate::tournament::TournamentResult;

/// One fitness evaluation for a ruleset, plus its full tournament
/// breakdown when one was kept (cheap exploratory mutant probes may omit
/// it).
#[derive(Debug, Clone)]
pub struct FitnessSample {
    pub fitness: f64,
    pub full_result: Option<TournamentResult>,
}

/// Fitness history keyed by ruleset signature, plus the ruleset object
/// itself so a later winner can be reconstructed even after it has been
/// evicted from the population.
#[derive(Debug, Clone, Default)]
pub struct FitnessTracker {
    history: HashMap<String, Vec<FitnessSample>>,
    rulesets: HashMap<String, Ruleset>,
}

impl FitnessTracker {
    pub fn new() -> FitnessTracker {
        FitnessTracker::default()
    }

    /// Appends a sample to `ruleset`'s signature history, remembering the
    /// ruleset itself the first time its signature is seen.
    pub fn record(&mut self, ruleset: &Ruleset, fitness: f64, full_result: Option<TournamentResult>) {
        let signature = ruleset.signature();
        self.rulesets.entry(signature.clone()).or_insert_with(|| ruleset.clone());
        self.history.entry(signature).or_default().push(FitnessSample { fitness, full_result });
    }

    /// A conservative upper-confidence-bound: `mean - c / sqrt(n)` for a
    /// seen signature, so under-sampled configurations are penalised
    /// rather than rewarded for their uncertainty. An unseen signature
    /// falls back to `current` (the candidate fitness the caller already
    /// has on hand, defaulting to a neutral 0.5) minus the same penalty,
    /// so a never-evaluated mutant never outranks a proven one by default.
    pub fn ucb(&self, ruleset: &Ruleset, current: Option<f64>, c: f64) -> f64 {
        let signature = ruleset.signature();
        match self.history.get(&signature) {
            Some(samples) if !samples.is_empty() => {
                let n = samples.len() as f64;
                let mean = samples.iter().map(|s| s.fitness).sum::<f64>() / n;
                mean - c / n.sqrt()
            }
            _ => current.unwrap_or(0.5) - c,
        }
    }

    pub fn has_enough_evals(&self, ruleset: &Ruleset, min_evals: usize) -> bool {
        self.n_evals(&ruleset.signature()) >= min_evals
    }

    /// The signature with the highest UCB among those with at least
    /// `min_evals` samples, or `None` if no signature qualifies.
    pub fn best_confident(&self, min_evals: usize, c: f64) -> Option<(String, f64)> {
        self.history
            .iter()
            .filter(|(_, samples)| samples.len() >= min_evals)
            .map(|(signature, samples)| {
                let n = samples.len() as f64;
                let mean = samples.iter().map(|s| s.fitness).sum::<f64>() / n;
                (signature.clone(), mean - c / n.sqrt())
            })
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
    }

    pub fn n_evals(&self, signature: &str) -> usize {
        self.history.get(signature).map_or(0, Vec::len)
    }

    pub fn mean_fitness(&self, signature: &str) -> Option<f64> {
        let samples = self.history.get(signature)?;
        if samples.is_empty() {
            return None;
        }
        Some(samples.iter().map(|s| s.fitness).sum::<f64>() / samples.len() as f64)
    }

    pub fn min_fitness(&self, signature: &str) -> Option<f64> {
        self.history
            .get(signature)
            .and_then(|samples| samples.iter().map(|s| s.fitness).fold(None, fold_min))
    }

    pub fn max_fitness(&self, signature: &str) -> Option<f64> {
        self.history
            .get(signature)
            .and_then(|samples| samples.iter().map(|s| s.fitness).fold(None, fold_max))
    }

    /// The remembered ruleset for a signature, if any sample was ever
    /// recorded for it.
    pub fn ruleset_for(&self, signature: &str) -> Option<&Ruleset> {
        self.rulesets.get(signature)
    }

    /// `ruleset`'s recorded white win rate, aggregated across every
    /// matchup of every full tournament result kept for its signature.
    /// `None` if the signature has no samples yet, or only exploratory
    /// ones that dropped their full breakdown.
    pub fn white_win_rate_of(&self, ruleset: &Ruleset) -> Option<f64> {
        let samples = self.history.get(&ruleset.signature())?;
        let (mut white_wins, mut black_wins) = (0u32, 0u32);
        for sample in samples {
            if let Some(result) = &sample.full_result {
                for (_, stats) in &result.matchups {
                    white_wins += stats.white_wins;
                    black_wins += stats.black_wins;
                }
            }
        }
        let decided = white_wins + black_wins;
        if decided == 0 {
            None
        } else {
            Some(white_wins as f64 / decided as f64)
        }
    }
}

fn fold_min(acc: Option<f64>, x: f64) -> Option<f64> {
    Some(acc.map_or(x, |a| a.min(x)))
}

fn fold_max(acc: Option<f64>, x: f64) -> Option<f64> {
    Some(acc.map_or(x, |a| a.max(x)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pieces::PieceId;
    use crate::template::TemplateId;

    fn ruleset(tag: &'static str) -> Ruleset {
        Ruleset {
            white_king: PieceId("K1"),
            white_pieces: vec![PieceId(tag); 8],
            black_king: PieceId("K1"),
            black_pieces: vec![PieceId("A1"); 8],
            white_template: TemplateId::E,
            black_template: TemplateId::E,
            white_positions: None,
            black_positions: None,
            white_facings: None,
            black_facings: None,
            name: None,
        }
    }

    #[test]
    fn unseen_signature_falls_back_to_current_minus_c() {
        let tracker = FitnessTracker::new();
        let rs = ruleset("A1");
        assert_eq!(tracker.ucb(&rs, Some(0.7), 0.3), 0.4);
        assert_eq!(tracker.ucb(&rs, None, 0.3), 0.2);
    }

    #[test]
    fn ucb_penalizes_a_single_sample_more_than_a_large_history() {
        let mut tracker = FitnessTracker::new();
        let thin = ruleset("A2");
        let thick = ruleset("A3");
        tracker.record(&thin, 0.8, None);
        for _ in 0..16 {
            tracker.record(&thick, 0.8, None);
        }
        assert!(tracker.ucb(&thick, None, 0.3) > tracker.ucb(&thin, None, 0.3));
    }

    #[test]
    fn has_enough_evals_respects_the_threshold() {
        let mut tracker = FitnessTracker::new();
        let rs = ruleset("A4");
        for _ in 0..7 {
            tracker.record(&rs, 0.5, None);
        }
        assert!(!tracker.has_enough_evals(&rs, 8));
        tracker.record(&rs, 0.5, None);
        assert!(tracker.has_enough_evals(&rs, 8));
    }

    #[test]
    fn best_confident_ignores_under_sampled_signatures() {
        let mut tracker = FitnessTracker::new();
        let promising_but_thin = ruleset("A5");
        let proven = ruleset("B1");
        tracker.record(&promising_but_thin, 0.95, None);
        for _ in 0..8 {
            tracker.record(&proven, 0.6, None);
        }
        let (signature, _) = tracker.best_confident(8, 0.3).expect("one qualifying signature");
        assert_eq!(signature, proven.signature());
    }

    #[test]
    fn record_remembers_the_ruleset_object() {
        let mut tracker = FitnessTracker::new();
        let rs = ruleset("B2");
        tracker.record(&rs, 0.5, None);
        assert_eq!(tracker.ruleset_for(&rs.signature()).unwrap().signature(), rs.signature());
    }

    #[test]
    fn min_and_max_fitness_track_the_recorded_range() {
        let mut tracker = FitnessTracker::new();
        let rs = ruleset("B3");
        tracker.record(&rs, 0.4, None);
        tracker.record(&rs, 0.9, None);
        tracker.record(&rs, 0.6, None);
        assert_eq!(tracker.min_fitness(&rs.signature()), Some(0.4));
        assert_eq!(tracker.max_fitness(&rs.signature()), Some(0.9));
    }
}
