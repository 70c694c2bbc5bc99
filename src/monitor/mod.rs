//! Chain monitors
//!
//! Monitors observe the chain at a fixed generation interval. The
//! [`TraceMonitor`] records parameter values and log-density terms in
//! memory and can export them as JSON; the [`ScreenMonitor`] prints a
//! progress line.

use serde::{Deserialize, Serialize};

use crate::error::{McmcError, McmcResult};
use crate::graph::model::ModelGraph;
use crate::graph::NodeId;
use crate::value::Value;

/// An observer sampled every `interval` generations
pub trait Monitor: Send {
    /// Generations between samples
    fn interval(&self) -> u64;

    /// Record or display the current state
    fn sample(&mut self, generation: u64, graph: &mut ModelGraph) -> McmcResult<()>;
}

/// One recorded state of the chain
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceRow {
    /// Generation the row was sampled at
    pub generation: u64,
    /// Sum of all stochastic log-probabilities
    pub ln_posterior: f64,
    /// Sum over unclamped stochastic nodes
    pub ln_prior: f64,
    /// Sum over clamped stochastic nodes
    pub ln_likelihood: f64,
    /// Values of the monitored nodes, in declaration order
    pub values: Vec<Value>,
}

/// In-memory trace of node values and log-density terms
#[derive(Debug)]
pub struct TraceMonitor {
    nodes: Vec<NodeId>,
    interval: u64,
    samples: Vec<TraceRow>,
}

impl TraceMonitor {
    /// Trace `nodes` every `interval` generations
    pub fn new(nodes: Vec<NodeId>, interval: u64) -> Self {
        assert!(interval > 0, "monitor interval must be positive");
        Self {
            nodes,
            interval,
            samples: Vec::new(),
        }
    }

    /// All recorded rows, oldest first
    pub fn samples(&self) -> &[TraceRow] {
        &self.samples
    }

    /// Number of recorded rows
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Recorded real values of the `position`-th monitored node
    ///
    /// Non-real samples are skipped.
    pub fn real_samples(&self, position: usize) -> Vec<f64> {
        self.samples
            .iter()
            .filter_map(|row| row.values.get(position).and_then(Value::as_real))
            .collect()
    }

    /// Sample mean of the `position`-th monitored node
    pub fn mean(&self, position: usize) -> Option<f64> {
        let xs = self.real_samples(position);
        if xs.is_empty() {
            return None;
        }
        Some(xs.iter().sum::<f64>() / xs.len() as f64)
    }

    /// Sample standard deviation of the `position`-th monitored node
    pub fn std_dev(&self, position: usize) -> Option<f64> {
        let xs = self.real_samples(position);
        if xs.len() < 2 {
            return None;
        }
        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
        Some(var.sqrt())
    }

    /// Export the trace as pretty-printed JSON
    pub fn to_json(&self) -> McmcResult<String> {
        serde_json::to_string_pretty(&self.samples)
            .map_err(|e| McmcError::Trace(e.to_string()))
    }
}

impl Monitor for TraceMonitor {
    fn interval(&self) -> u64 {
        self.interval
    }

    fn sample(&mut self, generation: u64, graph: &mut ModelGraph) -> McmcResult<()> {
        let values = self
            .nodes
            .iter()
            .map(|&n| graph.value(n))
            .collect::<McmcResult<Vec<Value>>>()?;
        self.samples.push(TraceRow {
            generation,
            ln_posterior: graph.ln_posterior(),
            ln_prior: graph.ln_prior(),
            ln_likelihood: graph.ln_likelihood(),
            values,
        });
        Ok(())
    }
}

/// Prints one progress line per sample
#[derive(Debug)]
pub struct ScreenMonitor {
    interval: u64,
}

impl ScreenMonitor {
    /// Print every `interval` generations
    pub fn new(interval: u64) -> Self {
        assert!(interval > 0, "monitor interval must be positive");
        Self { interval }
    }
}

impl Monitor for ScreenMonitor {
    fn interval(&self) -> u64 {
        self.interval
    }

    fn sample(&mut self, generation: u64, graph: &mut ModelGraph) -> McmcResult<()> {
        println!(
            "gen {:>8}  lnPosterior {:>12.4}  lnPrior {:>12.4}  lnLikelihood {:>12.4}",
            generation,
            graph.ln_posterior(),
            graph.ln_prior(),
            graph.ln_likelihood()
        );
        Ok(())
    }
}
