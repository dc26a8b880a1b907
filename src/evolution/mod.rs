//! The evolutionary driver: proposes rulesets, schedules their tournament
//! evaluation across the worker pool, and tracks which signature earns a
//! champion record. No original Python module survived the retrieval pack
//! for this part (`evolution.py` is a docstring-plus-imports stub and
//! `balance.py` only imports the names it would define -- see DESIGN.md).

pub mod mutation;

use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::color::Color;
use crate::hex::Direction;
use crate::pieces::{self, PieceId};
use crate::ruleset::{default_facing, piece_zone, Ruleset, BLACK_KING_POS, WHITE_KING_POS};
use crate::template::TemplateId;
use crate::tournament::TournamentResult;
use crate::workerpool::{Command, Report, WorkerPool};

use crate::fitness::FitnessTracker;
use crate::namegen::signature_to_name;

/// One side pinned to a fixed composition: every generated individual's
/// `color` side is forced to this army, and mutation/crossover never touch
/// it. Supports balancing new compositions against a fixed opponent army.
#[derive(Debug, Clone)]
pub struct FixedSide {
    pub color: Color,
    pub king: PieceId,
    pub pieces: Vec<PieceId>,
    pub template: TemplateId,
    /// King first, then one entry per `pieces` entry.
    pub positions: Vec<(i8, i8)>,
    pub facings: Vec<Direction>,
}

/// Tunable parameters for one evolutionary run.
#[derive(Debug, Clone)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub elite_count: usize,
    pub min_evals: usize,
    pub ucb_c: f64,
    /// Carried for API completeness; not yet wired into `matchup_schedule`,
    /// which still hardcodes its own 4/2-games-per-tier split the way the
    /// original schedule builder did.
    pub games_per_matchup: u32,
    pub base_depth: u8,
    pub reduced_tournament: bool,
    pub max_generations: usize,
    pub worker_count: Option<usize>,
    pub seed: u64,
    pub fixed_side: Option<FixedSide>,
}

impl Default for EvolutionConfig {
    fn default() -> EvolutionConfig {
        EvolutionConfig {
            population_size: 8,
            elite_count: 3,
            min_evals: 8,
            ucb_c: 0.3,
            games_per_matchup: 4,
            base_depth: 4,
            reduced_tournament: false,
            max_generations: 20,
            worker_count: None,
            seed: 0,
            fixed_side: None,
        }
    }
}

/// One candidate in the population.
#[derive(Debug, Clone)]
pub struct Individual {
    pub ruleset: Ruleset,
}

/// A ruleset's evolutionary run stops and this is emitted the first time
/// its signature's sample count crosses `min_evals`.
#[derive(Debug, Clone)]
pub struct ChampionRecord {
    pub name: String,
    pub signature: String,
    pub generation_reached: usize,
    pub n_evals: usize,
    pub ucb_score: f64,
    pub mean_fitness: f64,
    pub min_fitness: f64,
    pub max_fitness: f64,
    pub ruleset: Ruleset,
}

/// Number of clone/mutant slots reallocated per surviving elite when
/// rebuilding the next generation, following the reallocation rule
/// ("reinvest an under-sampled elite's slot into clones, a proven elite's
/// into mutants") without pinning it to a fixed per-elite width; 2 keeps a
/// population of 8 fillable from 3 elites without the crossover/fallback
/// stages doing all the work.
const SLOTS_PER_ELITE: usize = 2;

/// Caps the crossover-fill loop so a population that keeps landing on
/// already-seen signatures falls through to fallback fill instead of
/// spinning forever.
const MAX_CROSSOVER_ATTEMPTS: usize = 200;

/// Caps how many extra evaluation rounds the final verification phase will
/// spend trying to push a signature past `min_evals`, so a pathological run
/// (every worker failing, say) can't loop forever.
const MAX_VERIFICATION_ROUNDS: usize = 50;

pub struct EvolutionDriver {
    config: EvolutionConfig,
    tracker: FitnessTracker,
    rng: ChaCha8Rng,
    pool: WorkerPool,
    n_workers: usize,
    next_task_id: u64,
    emitted_signatures: HashSet<String>,
    champions: Vec<ChampionRecord>,
}

impl EvolutionDriver {
    pub fn new(config: EvolutionConfig) -> EvolutionDriver {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let n_workers = config.worker_count.unwrap_or_else(|| {
            crate::workerpool::probe_worker_count(64, |n| sample_throughput(n, config.base_depth))
        });
        let pool = WorkerPool::new(n_workers);
        EvolutionDriver {
            config,
            tracker: FitnessTracker::new(),
            rng,
            pool,
            n_workers,
            next_task_id: 0,
            emitted_signatures: HashSet::new(),
            champions: Vec::new(),
        }
    }

    /// Runs generations until `max_generations` is reached, then verifies
    /// and returns the best confident champion found.
    pub fn run(&mut self) -> ChampionRecord {
        let mut population = self.initial_population();
        let mut generation = 0usize;

        loop {
            generation += 1;
            let _span = tracing::info_span!("generation", generation).entered();
            let elites = self.run_generation(&population, generation);
            tracing::info!(generation, n_elites = elites.len(), n_champions = self.champions.len(), "generation complete");

            if generation >= self.config.max_generations {
                return self.final_verification(&elites, generation);
            }
            population = self.reproduce(&elites);
        }
    }

    /// All champion records emitted so far, in emission order.
    pub fn champions(&self) -> &[ChampionRecord] {
        &self.champions
    }

    fn initial_population(&mut self) -> Vec<Individual> {
        (0..self.config.population_size)
            .map(|_| Individual { ruleset: self.random_individual() })
            .collect()
    }

    fn random_individual(&mut self) -> Ruleset {
        let ruleset = self.random_ruleset();
        self.constrain(ruleset)
    }

    fn random_ruleset(&mut self) -> Ruleset {
        let (white_king, white_pieces, white_positions, white_facings) = self.random_side(Color::White);
        let (black_king, black_pieces, black_positions, black_facings) = self.random_side(Color::Black);
        Ruleset {
            white_king,
            white_pieces,
            black_king,
            black_pieces,
            white_template: TemplateId::E,
            black_template: TemplateId::E,
            white_positions: Some(white_positions),
            black_positions: Some(black_positions),
            white_facings: Some(white_facings),
            black_facings: Some(black_facings),
            name: None,
        }
    }

    fn random_side(&mut self, color: Color) -> (PieceId, Vec<PieceId>, Vec<(i8, i8)>, Vec<u8>) {
        let king = *pieces::KING_PIECE_IDS.choose(&mut self.rng).unwrap();
        let mut zone: Vec<_> = piece_zone(color).into_iter().collect();
        zone.shuffle(&mut self.rng);
        let count = self.rng.gen_range(8..=12usize.min(zone.len()));
        zone.truncate(count);

        let king_pos = match color {
            Color::White => WHITE_KING_POS,
            Color::Black => BLACK_KING_POS,
        };
        let mut positions = vec![(king_pos.q, king_pos.r)];
        let mut facings = vec![default_facing(color).index()];
        let mut army = Vec::with_capacity(count);
        for hex in zone {
            army.push(*pieces::REGULAR_PIECE_IDS.choose(&mut self.rng).unwrap());
            positions.push((hex.q, hex.r));
            facings.push(Direction::from_index(self.rng.gen_range(0..6u8)).index());
        }
        (king, army, positions, facings)
    }

    /// Overwrites the fixed side's army/positions/facings onto `ruleset`, if
    /// one is configured. Mutation/crossover operators stay pin-agnostic --
    /// this single pass is the only place a fixed side is enforced.
    fn constrain(&self, mut ruleset: Ruleset) -> Ruleset {
        let Some(fixed) = &self.config.fixed_side else { return ruleset };
        let facings: Vec<u8> = fixed.facings.iter().map(|d| d.index()).collect();
        match fixed.color {
            Color::White => {
                ruleset.white_king = fixed.king;
                ruleset.white_pieces = fixed.pieces.clone();
                ruleset.white_template = fixed.template;
                ruleset.white_positions = Some(fixed.positions.clone());
                ruleset.white_facings = Some(facings);
            }
            Color::Black => {
                ruleset.black_king = fixed.king;
                ruleset.black_pieces = fixed.pieces.clone();
                ruleset.black_template = fixed.template;
                ruleset.black_positions = Some(fixed.positions.clone());
                ruleset.black_facings = Some(facings);
            }
        }
        ruleset
    }

    /// Evaluates one generation: dispatches every not-yet-proven candidate
    /// (the population plus enough exploratory mutants to keep every
    /// worker busy) through the pool, records results into the tracker,
    /// emits any newly-proven champion, and returns this generation's
    /// UCB-ranked, signature-deduplicated elites.
    fn run_generation(&mut self, population: &[Individual], generation: usize) -> Vec<Ruleset> {
        let mut candidates: Vec<Ruleset> = population.iter().map(|ind| ind.ruleset.clone()).collect();
        self.fill_with_exploratory_mutants(&mut candidates);

        let fitness = self.evaluate_candidates(&candidates, generation);

        let mut scored: Vec<(Ruleset, f64)> = candidates
            .into_iter()
            .zip(fitness)
            .map(|(rs, f)| {
                let ucb = self.tracker.ucb(&rs, Some(f), self.config.ucb_c);
                (rs, ucb)
            })
            .collect();
        self.select_unique_elites(&mut scored)
    }

    /// Appends randomly-mutated elites (by current UCB) to `candidates`
    /// until the not-yet-proven count reaches the worker count, so a
    /// generation never leaves idle workers when there's exploration to
    /// spend their cycles on.
    fn fill_with_exploratory_mutants(&mut self, candidates: &mut Vec<Ruleset>) {
        let unproven = |this: &Self, c: &[Ruleset]| {
            c.iter().filter(|rs| !this.tracker.has_enough_evals(rs, this.config.min_evals)).count()
        };
        if unproven(self, candidates) >= self.n_workers {
            return;
        }

        let mut ranked = candidates.clone();
        ranked.sort_by(|a, b| {
            let ucb_a = self.tracker.ucb(a, None, self.config.ucb_c);
            let ucb_b = self.tracker.ucb(b, None, self.config.ucb_c);
            ucb_b.partial_cmp(&ucb_a).unwrap()
        });

        let mut seen: HashSet<String> = candidates.iter().map(|rs| rs.signature()).collect();
        let mut guard = 0;
        while unproven(self, candidates) < self.n_workers && guard < self.n_workers * 10 {
            guard += 1;
            let Some(parent) = ranked.choose(&mut self.rng) else { break };
            let mut mutant = parent.clone();
            mutation::random_mutation(&mut mutant, Color::White, &mut self.rng);
            mutation::random_mutation(&mut mutant, Color::Black, &mut self.rng);
            mutant = self.constrain(mutant);
            let sig = mutant.signature();
            if seen.insert(sig) {
                candidates.push(mutant);
            }
        }
    }

    /// Reuses the cached mean fitness for any candidate already past
    /// `min_evals`; dispatches the rest to the worker pool and waits for
    /// every dispatched task to report back, recording each into the
    /// tracker and emitting a champion the first time it crosses the
    /// threshold.
    fn evaluate_candidates(&mut self, candidates: &[Ruleset], generation: usize) -> Vec<f64> {
        let mut fitness = vec![0.0; candidates.len()];
        let mut task_to_index: HashMap<u64, usize> = HashMap::new();

        for (i, rs) in candidates.iter().enumerate() {
            if self.tracker.has_enough_evals(rs, self.config.min_evals) {
                fitness[i] = self.tracker.mean_fitness(&rs.signature()).unwrap_or(0.0);
                continue;
            }
            let task_id = self.next_task_id;
            self.next_task_id += 1;
            task_to_index.insert(task_id, i);
            self.pool.submit(Command::Evaluate {
                task_id,
                ruleset: rs.clone(),
                base_depth: self.config.base_depth,
                base_seed: self.rng.gen(),
                reduced: self.config.reduced_tournament,
            });
        }

        let mut remaining = task_to_index.len();
        while remaining > 0 {
            let Some(report) = self.pool.recv() else { break };
            match report {
                Report::Done { task_id, result } => {
                    if let Some(&idx) = task_to_index.get(&task_id) {
                        fitness[idx] = result.fitness;
                        self.record_and_maybe_emit(&candidates[idx], result, generation);
                    }
                    remaining -= 1;
                }
                Report::Failed { task_id, .. } => {
                    // Leave this candidate's fitness at its neutral default
                    // for this generation; it simply isn't sampled today.
                    let _ = task_id;
                    remaining -= 1;
                }
            }
        }
        fitness
    }

    fn record_and_maybe_emit(&mut self, ruleset: &Ruleset, result: TournamentResult, generation: usize) {
        let signature = ruleset.signature();
        let was_proven = self.tracker.has_enough_evals(ruleset, self.config.min_evals);
        self.tracker.record(ruleset, result.fitness, Some(result));
        let now_proven = self.tracker.has_enough_evals(ruleset, self.config.min_evals);

        if now_proven && !was_proven && self.emitted_signatures.insert(signature.clone()) {
            let record = self.champion_record_for(&signature, generation);
            tracing::info!(
                name = %record.name,
                signature = %record.signature,
                generation,
                mean_fitness = record.mean_fitness,
                "champion emitted"
            );
            self.champions.push(record);
        }
    }

    fn champion_record_for(&self, signature: &str, generation: usize) -> ChampionRecord {
        let ruleset = self.tracker.ruleset_for(signature).expect("signature was just recorded").clone();
        let n_evals = self.tracker.n_evals(signature);
        let mean_fitness = self.tracker.mean_fitness(signature).unwrap_or(0.0);
        let ucb_score = mean_fitness - self.config.ucb_c / (n_evals as f64).sqrt();
        ChampionRecord {
            name: signature_to_name(signature),
            signature: signature.to_string(),
            generation_reached: generation,
            n_evals,
            ucb_score,
            mean_fitness,
            min_fitness: self.tracker.min_fitness(signature).unwrap_or(mean_fitness),
            max_fitness: self.tracker.max_fitness(signature).unwrap_or(mean_fitness),
            ruleset,
        }
    }

    /// Sorts `scored` descending by UCB and keeps the first `elite_count`
    /// distinct signatures.
    fn select_unique_elites(&self, scored: &mut [(Ruleset, f64)]) -> Vec<Ruleset> {
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        let mut seen = HashSet::new();
        let mut elites = Vec::new();
        for (rs, _) in scored.iter() {
            if seen.insert(rs.signature()) {
                elites.push(rs.clone());
                if elites.len() >= self.config.elite_count {
                    break;
                }
            }
        }
        elites
    }

    /// Builds the next generation from this generation's elites: elites
    /// survive once each, then each elite's remaining slot budget goes to
    /// more clones (if it's still under-sampled, so it gets re-evaluated)
    /// or to mutants (if it's already proven, so the budget explores
    /// nearby variants instead), then crossover fills any remaining slots
    /// with novel children, falling back to double-mutated elites if
    /// crossover keeps landing on signatures already in the generation.
    fn reproduce(&mut self, elites: &[Ruleset]) -> Vec<Individual> {
        let target = self.config.population_size;
        let mut next_gen: Vec<Ruleset> = Vec::with_capacity(target);
        let mut seen: HashSet<String> = HashSet::new();

        for elite in elites {
            if next_gen.len() >= target {
                break;
            }
            seen.insert(elite.signature());
            next_gen.push(elite.clone());
        }

        for elite in elites {
            if next_gen.len() >= target {
                break;
            }
            if !self.tracker.has_enough_evals(elite, self.config.min_evals) {
                for _ in 0..SLOTS_PER_ELITE {
                    if next_gen.len() >= target {
                        break;
                    }
                    next_gen.push(elite.clone());
                }
            } else {
                for _ in 0..SLOTS_PER_ELITE {
                    if next_gen.len() >= target {
                        break;
                    }
                    if let Some(mutant) = self.novel_mutant_of(elite, &seen, &next_gen) {
                        seen.insert(mutant.signature());
                        next_gen.push(mutant);
                    }
                }
            }
        }

        if !elites.is_empty() {
            let mut attempts = 0;
            while next_gen.len() < target && attempts < MAX_CROSSOVER_ATTEMPTS {
                attempts += 1;
                let a = self.tournament_select(elites);
                let b = self.tournament_select(elites);
                let win_rate = self.parent_white_win_rate(&a, &b);
                let mut child = mutation::crossover(&a, &b, &mut self.rng);
                mutation::smart_mutation(&mut child, win_rate, &mut self.rng);
                child = self.constrain(child);
                let sig = child.signature();
                if seen.insert(sig) {
                    next_gen.push(child);
                }
            }
        }

        while next_gen.len() < target {
            let Some(parent) = elites.choose(&mut self.rng).or_else(|| next_gen.first()) else { break };
            let mut mutant = parent.clone();
            mutation::random_mutation(&mut mutant, Color::White, &mut self.rng);
            mutation::random_mutation(&mut mutant, Color::Black, &mut self.rng);
            mutant = self.constrain(mutant);
            next_gen.push(mutant);
        }

        next_gen.into_iter().map(|ruleset| Individual { ruleset }).collect()
    }

    fn novel_mutant_of(&mut self, elite: &Ruleset, seen: &HashSet<String>, next_gen: &[Ruleset]) -> Option<Ruleset> {
        for _ in 0..10 {
            let mut mutant = elite.clone();
            mutation::random_mutation(&mut mutant, Color::White, &mut self.rng);
            mutation::random_mutation(&mut mutant, Color::Black, &mut self.rng);
            mutant = self.constrain(mutant);
            let sig = mutant.signature();
            if !seen.contains(&sig) && !next_gen.iter().any(|r| r.signature() == sig) {
                return Some(mutant);
            }
        }
        None
    }

    /// Picks two random elites and returns whichever has the higher UCB --
    /// standard tournament selection, just by UCB instead of raw fitness.
    fn tournament_select(&mut self, elites: &[Ruleset]) -> Ruleset {
        let a = elites.choose(&mut self.rng).expect("elites is non-empty here");
        let b = elites.choose(&mut self.rng).expect("elites is non-empty here");
        let ucb_a = self.tracker.ucb(a, None, self.config.ucb_c);
        let ucb_b = self.tracker.ucb(b, None, self.config.ucb_c);
        if ucb_a >= ucb_b { a.clone() } else { b.clone() }
    }

    /// The win-rate signal fed to a crossover child's `smart_mutation`
    /// pass: the mean of both parents' recorded white win rates, or the
    /// neutral 0.5 if neither parent has a full tournament result on file
    /// yet (e.g. right after a fresh elite was only probed exploratorily).
    fn parent_white_win_rate(&self, a: &Ruleset, b: &Ruleset) -> f64 {
        let rates: Vec<f64> =
            [a, b].iter().filter_map(|parent| self.tracker.white_win_rate_of(parent)).collect();
        if rates.is_empty() { 0.5 } else { rates.iter().sum::<f64>() / rates.len() as f64 }
    }

    /// After the generation loop ends, keeps evaluating the strongest
    /// surviving elites until one of them crosses `min_evals`, then returns
    /// it. If `best_confident` already has a qualifying signature (from
    /// champion emission during the loop), returns that directly instead.
    fn final_verification(&mut self, elites: &[Ruleset], generation: usize) -> ChampionRecord {
        if let Some((signature, _)) = self.tracker.best_confident(self.config.min_evals, self.config.ucb_c) {
            return self.champion_record_for(&signature, generation);
        }

        let mut candidates = elites.to_vec();
        for round in 0..MAX_VERIFICATION_ROUNDS {
            if candidates.is_empty() {
                break;
            }
            let _ = self.evaluate_candidates(&candidates, generation + round + 1);
            if let Some((signature, _)) = self.tracker.best_confident(self.config.min_evals, self.config.ucb_c) {
                return self.champion_record_for(&signature, generation);
            }
        }

        // No signature ever reached the threshold (every worker kept
        // failing, say); fall back to whichever elite has the best mean
        // fitness seen so far rather than looping forever.
        let signature = elites
            .iter()
            .map(|rs| rs.signature())
            .max_by(|a, b| {
                let fa = self.tracker.mean_fitness(a).unwrap_or(0.0);
                let fb = self.tracker.mean_fitness(b).unwrap_or(0.0);
                fa.partial_cmp(&fb).unwrap()
            })
            .expect("max_generations run produced at least one elite");
        self.champion_record_for(&signature, generation)
    }

    /// Shuts down the worker pool. Consumes the driver since the pool
    /// can't be reused afterward.
    pub fn shutdown(self) {
        self.pool.shutdown();
    }
}

/// A cheap real-worker-count probe for `EvolutionDriver::new` when no
/// explicit `worker_count` is configured: spawns `n` workers, times how
/// long they take to clear a small batch of genuinely reduced-depth
/// evaluations, and reports games/sec. Kept separate from
/// `probe_worker_count` itself so that function stays a pure,
/// deterministically-testable decision rule (see `workerpool.rs`).
fn sample_throughput(n: usize, base_depth: u8) -> f64 {
    let mut pool = WorkerPool::new(n);
    let tasks = n.max(4);
    let probe_ruleset = probe_ruleset();
    let start = std::time::Instant::now();
    for i in 0..tasks {
        pool.submit(Command::Evaluate {
            task_id: i as u64,
            ruleset: probe_ruleset.clone(),
            base_depth: base_depth.min(2),
            base_seed: i as u64,
            reduced: true,
        });
    }
    for _ in 0..tasks {
        pool.recv();
    }
    let elapsed = start.elapsed().as_secs_f64().max(1e-6);
    pool.shutdown();
    tasks as f64 / elapsed
}

fn probe_ruleset() -> Ruleset {
    let white_zone: Vec<(i8, i8)> = piece_zone(Color::White).into_iter().take(8).map(|h| (h.q, h.r)).collect();
    let black_zone: Vec<(i8, i8)> = piece_zone(Color::Black).into_iter().take(8).map(|h| (h.q, h.r)).collect();
    Ruleset {
        white_king: PieceId("K1"),
        white_pieces: vec![PieceId("A1"); 8],
        black_king: PieceId("K1"),
        black_pieces: vec![PieceId("A1"); 8],
        white_template: TemplateId::E,
        black_template: TemplateId::E,
        white_positions: Some(
            std::iter::once((WHITE_KING_POS.q, WHITE_KING_POS.r)).chain(white_zone).collect(),
        ),
        black_positions: Some(
            std::iter::once((BLACK_KING_POS.q, BLACK_KING_POS.r)).chain(black_zone).collect(),
        ),
        white_facings: None,
        black_facings: None,
        name: None,
    }
}
