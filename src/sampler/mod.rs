//! The MCMC sampler
//!
//! [`Mcmc`] owns a model graph, a weighted schedule of moves and a set of
//! monitors, and drives the chain generation by generation. Each
//! generation selects one move by weight, performs one Metropolis-Hastings
//! update and then fires every monitor whose interval divides the
//! generation number.
//!
//! Independent replicate chains run in parallel with
//! [`run_independent_chains`]; each chain gets its own deterministically
//! seeded RNG so a run is reproducible regardless of thread scheduling.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution as _;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;

use crate::error::{McmcError, McmcResult};
use crate::graph::model::ModelGraph;
use crate::monitor::Monitor;
use crate::moves::{Heat, Move, MoveOutcome, MoveStats};

/// Redraw attempts before giving up on finding a feasible starting state
const MAX_INITIALIZE_ATTEMPTS: usize = 1000;

/// A single MCMC chain over a model graph
pub struct Mcmc {
    graph: ModelGraph,
    moves: Vec<Move>,
    monitors: Vec<Box<dyn Monitor>>,
    heat: Heat,
    generation: u64,
}

impl Mcmc {
    /// Create a cold chain over `graph` with no moves or monitors yet
    pub fn new(graph: ModelGraph) -> Self {
        Self {
            graph,
            moves: Vec::new(),
            monitors: Vec::new(),
            heat: Heat::cold(),
            generation: 0,
        }
    }

    /// Set the chain heat
    pub fn with_heat(mut self, heat: Heat) -> Self {
        self.heat = heat;
        self
    }

    /// Add a move to the schedule
    pub fn add_move(&mut self, mv: Move) {
        self.moves.push(mv);
    }

    /// Add a monitor
    pub fn add_monitor(&mut self, monitor: Box<dyn Monitor>) {
        self.monitors.push(monitor);
    }

    /// Borrow the model graph
    pub fn graph(&self) -> &ModelGraph {
        &self.graph
    }

    /// Mutably borrow the model graph
    pub fn graph_mut(&mut self) -> &mut ModelGraph {
        &mut self.graph
    }

    /// Current generation number
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The chain heat
    pub fn heat(&self) -> Heat {
        self.heat
    }

    /// Draw fresh starting values for every unclamped stochastic node
    ///
    /// Retries until the posterior is finite, failing after a bounded
    /// number of attempts when the priors cannot produce a feasible state.
    pub fn initialize(&mut self, rng: &mut dyn RngCore) -> McmcResult<()> {
        for _ in 0..MAX_INITIALIZE_ATTEMPTS {
            for id in self.graph.stochastic_nodes() {
                self.graph.redraw(id, rng)?;
                self.graph.keep(id)?;
            }
            if self.graph.ln_posterior().is_finite() {
                return Ok(());
            }
        }
        Err(McmcError::Configuration(
            "could not draw a starting state with finite posterior".to_string(),
        ))
    }

    /// One generation: select a move by weight, update, then monitor
    pub fn step(&mut self, rng: &mut dyn RngCore) -> McmcResult<MoveOutcome> {
        let selector = self.move_selector()?;
        let chosen = selector.sample(&mut *rng);
        let outcome = self.moves[chosen].perform_heated(&mut self.graph, rng, self.heat)?;

        self.generation += 1;
        let Self {
            graph,
            monitors,
            generation,
            ..
        } = self;
        for monitor in monitors.iter_mut() {
            if *generation % monitor.interval() == 0 {
                monitor.sample(*generation, graph)?;
            }
        }
        Ok(outcome)
    }

    /// Run the chain for `generations` generations
    ///
    /// Monitors fire once for the starting state before the first update
    /// when the chain has not stepped before.
    pub fn run(&mut self, generations: u64, rng: &mut dyn RngCore) -> McmcResult<()> {
        if self.moves.is_empty() {
            return Err(McmcError::EmptyMoveSchedule);
        }
        if self.generation == 0 {
            let Self {
                graph, monitors, ..
            } = self;
            for monitor in monitors.iter_mut() {
                monitor.sample(0, graph)?;
            }
        }
        for _ in 0..generations {
            self.step(rng)?;
        }
        Ok(())
    }

    /// Run the chain, retuning step sizes every `tuning_interval`
    /// generations
    pub fn run_with_tuning(
        &mut self,
        generations: u64,
        tuning_interval: u64,
        rng: &mut dyn RngCore,
    ) -> McmcResult<()> {
        if tuning_interval == 0 {
            return Err(McmcError::Configuration(
                "tuning interval must be positive".to_string(),
            ));
        }
        if self.moves.is_empty() {
            return Err(McmcError::EmptyMoveSchedule);
        }
        for _ in 0..generations / tuning_interval {
            self.run(tuning_interval, rng)?;
            self.tune_moves();
        }
        self.run(generations % tuning_interval, rng)?;
        Ok(())
    }

    /// Discard `generations` updates while tuning, without monitoring and
    /// without advancing the generation counter
    pub fn burnin(
        &mut self,
        generations: u64,
        tuning_interval: u64,
        rng: &mut dyn RngCore,
    ) -> McmcResult<()> {
        if tuning_interval == 0 {
            return Err(McmcError::Configuration(
                "tuning interval must be positive".to_string(),
            ));
        }
        if self.moves.is_empty() {
            return Err(McmcError::EmptyMoveSchedule);
        }
        let selector = self.move_selector()?;
        for i in 1..=generations {
            let chosen = selector.sample(&mut *rng);
            self.moves[chosen].perform_heated(&mut self.graph, rng, self.heat)?;
            if i % tuning_interval == 0 {
                self.tune_moves();
            }
        }
        Ok(())
    }

    /// Retune every move from its current period and start a new period
    pub fn tune_moves(&mut self) {
        for mv in &mut self.moves {
            mv.tune();
        }
    }

    /// Acceptance statistics of every move, in schedule order
    pub fn operator_summary(&self) -> Vec<MoveStats> {
        self.moves.iter().map(Move::stats).collect()
    }

    fn move_selector(&self) -> McmcResult<WeightedIndex<f64>> {
        if self.moves.is_empty() {
            return Err(McmcError::EmptyMoveSchedule);
        }
        WeightedIndex::new(self.moves.iter().map(Move::weight))
            .map_err(|e| McmcError::Configuration(format!("bad move weights: {e}")))
    }
}

impl std::fmt::Debug for Mcmc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mcmc")
            .field("nodes", &self.graph.len())
            .field("moves", &self.moves.len())
            .field("monitors", &self.monitors.len())
            .field("generation", &self.generation)
            .finish()
    }
}

/// Run independent replicate chains in parallel
///
/// `factory` builds chain `i` from scratch; chain `i` then runs for
/// `generations` with an RNG seeded from `base_seed + i`. Results come
/// back in chain order.
pub fn run_independent_chains<F>(
    num_chains: usize,
    generations: u64,
    base_seed: u64,
    factory: F,
) -> McmcResult<Vec<Mcmc>>
where
    F: Fn(usize) -> McmcResult<Mcmc> + Sync,
{
    (0..num_chains)
        .into_par_iter()
        .map(|i| {
            let mut chain = factory(i)?;
            let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(i as u64));
            chain.run(generations, &mut rng)?;
            Ok(chain)
        })
        .collect()
}
