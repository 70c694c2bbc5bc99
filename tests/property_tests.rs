//! Property-based tests for dagmc
//!
//! Uses proptest to verify invariants of the graph protocol, the proposal
//! state machine and the accept/reject driver.

use dagmc::prelude::*;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn flat_model(x: f64) -> (ModelGraph, NodeId) {
    let mut graph = ModelGraph::new();
    let lower = graph.add_constant("lower", 0.0);
    let upper = graph.add_constant("upper", 10.0);
    let node = graph
        .add_stochastic("x", Box::new(Uniform), &[lower, upper], x)
        .unwrap();
    (graph, node)
}

/// mu ~ Uniform(0,10); shift = mu + 1; y ~ Normal(shift, 1) clamped at 6
fn hierarchical_model() -> (ModelGraph, NodeId) {
    let mut graph = ModelGraph::new();
    let lower = graph.add_constant("lower", 0.0);
    let upper = graph.add_constant("upper", 10.0);
    let mu = graph
        .add_stochastic("mu", Box::new(Uniform), &[lower, upper], 5.0)
        .unwrap();
    let offset = graph.add_constant("offset", 1.0);
    let shift = graph
        .add_deterministic("shift", Box::new(Sum), &[mu, offset])
        .unwrap();
    let sd = graph.add_constant("sd", 1.0);
    let y = graph
        .add_stochastic("y", Box::new(Normal), &[shift, sd], 6.0)
        .unwrap();
    graph.clamp(y, Value::Real(6.0)).unwrap();
    (graph, mu)
}

/// Improper flat prior over real vectors
#[derive(Clone, Copy, Debug)]
struct FlatVector;

impl Distribution for FlatVector {
    fn name(&self) -> &'static str {
        "flatVector"
    }

    fn param_kinds(&self) -> &'static [ValueKind] {
        &[]
    }

    fn ln_probability(&self, value: &Value, _params: &[Value]) -> f64 {
        match value.as_real_vector() {
            Some(_) => 0.0,
            None => f64::NEG_INFINITY,
        }
    }

    fn redraw(&self, _params: &[Value], _rng: &mut dyn rand::RngCore) -> Value {
        Value::RealVector(Vec::new())
    }
}

proptest! {
    // ==================== Proposal state machine ====================

    #[test]
    fn scale_undo_is_exact(
        x in 0.1f64..100.0,
        lambda in 0.1f64..5.0,
        seed in 0u64..1000
    ) {
        let (mut graph, node) = flat_model(x);
        let mut proposal = ScaleProposal::new(node, lambda);
        let mut rng = StdRng::seed_from_u64(seed);
        proposal.propose(&mut graph, &mut rng).unwrap();
        proposal.undo(&mut graph).unwrap();
        prop_assert_eq!(
            graph.current_value(node).unwrap().as_real().unwrap(),
            x
        );
    }

    #[test]
    fn scale_hastings_is_log_factor(
        x in 0.1f64..9.9,
        lambda in 0.1f64..5.0,
        seed in 0u64..1000
    ) {
        let (mut graph, node) = flat_model(x);
        let mut proposal = ScaleProposal::new(node, lambda);
        let mut rng = StdRng::seed_from_u64(seed);

        let ln_hastings = proposal.propose(&mut graph, &mut rng).unwrap();
        let proposed = graph.current_value(node).unwrap().as_real().unwrap();
        prop_assert!((ln_hastings - (proposed / x).ln()).abs() < 1e-9);
        proposal.undo(&mut graph).unwrap();
    }

    #[test]
    fn slide_hastings_is_zero(
        x in 0.1f64..9.9,
        lambda in 0.1f64..20.0,
        seed in 0u64..1000
    ) {
        let (mut graph, node) = flat_model(x);
        let mut proposal = SlideProposal::new(node, lambda);
        let mut rng = StdRng::seed_from_u64(seed);

        let ln_hastings = proposal.propose(&mut graph, &mut rng).unwrap();
        prop_assert_eq!(ln_hastings, 0.0);
        proposal.undo(&mut graph).unwrap();
        prop_assert_eq!(
            graph.current_value(node).unwrap().as_real().unwrap(),
            x
        );
    }

    #[test]
    fn vector_scale_undo_is_exact(
        values in prop::collection::vec(0.1f64..10.0, 1..10),
        lambda in 0.1f64..5.0,
        seed in 0u64..1000
    ) {
        let mut graph = ModelGraph::new();
        let node = graph
            .add_stochastic("v", Box::new(FlatVector), &[], values.clone())
            .unwrap();
        let mut proposal = VectorScaleProposal::new(node, lambda);
        let mut rng = StdRng::seed_from_u64(seed);

        proposal.propose(&mut graph, &mut rng).unwrap();
        proposal.undo(&mut graph).unwrap();
        prop_assert_eq!(
            graph.current_value(node).unwrap().as_real_vector().unwrap(),
            &values[..]
        );
    }

    // ==================== Step-size tuning ====================

    #[test]
    fn tuning_keeps_step_positive(
        step in 1e-6f64..1e3,
        rate in 0.0f64..1.0
    ) {
        let tuned = dagmc::proposal::tune_step_size(step, rate, 0.44);
        prop_assert!(tuned > 0.0);
        prop_assert!(tuned.is_finite());
        if rate > 0.44 {
            prop_assert!(tuned >= step);
        } else {
            prop_assert!(tuned <= step);
        }
    }

    // ==================== Graph protocol ====================

    #[test]
    fn double_touch_then_restore_recovers_original(
        x0 in 0.5f64..9.5,
        x1 in 0.5f64..9.5
    ) {
        let (mut graph, mu) = hierarchical_model();
        graph.set_value(mu, Value::Real(x0)).unwrap();
        graph.touch(mu).unwrap();
        graph.keep(mu).unwrap();
        let ln_before = graph.ln_posterior();

        graph.set_value(mu, Value::Real(x1)).unwrap();
        graph.touch(mu).unwrap();
        graph.touch(mu).unwrap();
        let _ = graph.ln_posterior();
        graph.restore(mu).unwrap();

        prop_assert_eq!(
            graph.current_value(mu).unwrap().as_real().unwrap(),
            x0
        );
        prop_assert!((graph.ln_posterior() - ln_before).abs() < 1e-12);
    }

    #[test]
    fn subtree_rescale_round_trips(factor in 0.2f64..2.0) {
        let mut tree = TimeTree::from_parents(
            &[Some(4), Some(4), Some(5), Some(5), Some(6), Some(6), None],
            &[0.0, 0.0, 0.0, 0.0, 6.0, 4.0, 10.0],
        )
        .unwrap();
        let original = tree.ages();

        tree.rescale_subtree(6, factor);
        tree.rescale_subtree(6, 1.0 / factor);

        for (before, after) in original.iter().zip(tree.ages().iter()) {
            prop_assert!((before - after).abs() < 1e-9);
        }
        // tips never move at all
        for tip in 0..4 {
            prop_assert_eq!(tree.age(tip), 0.0);
        }
    }

    // ==================== Accept/reject driver ====================

    #[test]
    fn updates_leave_graph_committed(seed in 0u64..500) {
        let (graph, mu) = hierarchical_model();
        let mut chain = Mcmc::new(graph);
        chain.add_move(Move::new(Box::new(SlideProposal::new(mu, 2.0)), 1.0));
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..50 {
            chain.step(&mut rng).unwrap();
            prop_assert!(!chain.graph().node(mu).unwrap().is_touched());
        }
        prop_assert!(chain.graph_mut().ln_posterior().is_finite());
    }

    #[test]
    fn flat_target_has_constant_posterior(seed in 0u64..500) {
        // every reachable state of a flat model scores -ln(10); any drift
        // would mean a stale cache leaked through an accept or reject
        let (graph, x) = flat_model(5.0);
        let mut chain = Mcmc::new(graph);
        chain.add_move(Move::new(Box::new(ScaleProposal::new(x, 3.0)), 1.0));
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..100 {
            chain.step(&mut rng).unwrap();
            let value = chain.graph().current_value(x).unwrap().as_real().unwrap();
            prop_assert!((0.0..=10.0).contains(&value));
            prop_assert!(
                (chain.graph_mut().ln_posterior() + 10.0f64.ln()).abs() < 1e-9
            );
        }
    }
}
