use nt_optimizer::*;
use nt_types::{TuneParameter, BAD_FITNESS_VALUE};
use tracing_subscriber::EnvFilter;

/// Stand-in for a membrane model: fits two conductances to a target
/// response and "diverges" when both are pushed high at once.
fn membrane_error(genes: &[f64]) -> f64 {
    let (gbar_na, gbar_k) = (genes[0], genes[1]);
    if gbar_na > 100.0 && gbar_k > 30.0 {
        return BAD_FITNESS_VALUE;
    }
    let response = gbar_na * 0.1 - gbar_k * 0.25;
    (response - 1.5).powi(2) + 0.001 * (gbar_na - 60.0).powi(2)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    println!("neurotune basic tuning example");

    let tuner = Tuner::new(vec![
        TuneParameter::new("gbar_na", 0.0, 120.0)?,
        TuneParameter::new("gbar_k", 0.0, 40.0)?,
    ])?;

    let config = AlgorithmConfig::new(false)
        .with_population_size(40)
        .with_mutation_rate(0.2)
        .with_seeds(vec![vec![60.0, 18.0].into()])
        .with_rng_seed(7)
        .with_evaluation_mode(EvaluationMode::Parallel);

    let mut strategies: Vec<Box<dyn Algorithm>> = vec![
        Box::new(RandomSearch::new(config.clone()).with_generations(20)),
        Box::new(GridAlgorithm::new(config.clone(), 25)),
        Box::new(EvolutionaryAlgorithm::new(config).with_generations(40)),
    ];

    let evaluator = CachedEvaluator::new(membrane_error);
    for strategy in strategies.iter_mut() {
        let outcome = tuner.tune(strategy.as_mut(), &evaluator)?;
        match outcome.optimum() {
            Some((candidate, fitness)) => println!(
                "{:>12}: best {} -> {:.6} ({} evaluations, {} failed)",
                outcome.algorithm, candidate, fitness, outcome.evaluations, outcome.failures
            ),
            None => println!("{:>12}: no successful evaluation", outcome.algorithm),
        }
    }

    let stats = evaluator.stats();
    println!("Cache: {} hits, {} misses", stats.hits, stats.misses);
    println!("Tuner progress: {:?}", tuner.progress());

    Ok(())
}
