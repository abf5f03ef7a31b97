use clap::Parser;
use hdrhistogram::Histogram;
use stable_match::{BatchConfig, BatchError, PopulationShape, TrialEngine};

/// Solve and verify latency percentiles for one population shape.
#[derive(Parser, Debug)]
#[command(name = "latency-report")]
struct Args {
    /// Trials to time
    #[arg(short, long, default_value_t = 10_000)]
    iterations: u64,

    /// Buyers (and sellers) per trial, one-to-one
    #[arg(short, long, default_value_t = 100)]
    count: u32,

    #[arg(long, default_value_t = 0xFEED)]
    seed: u64,
}

fn print_histogram(title: &str, histogram: &Histogram<u64>) {
    println!("\n=== {} (ns) ===", title);
    println!("Min:    {:9} ns", histogram.min());
    println!("P50:    {:9} ns", histogram.value_at_quantile(0.50));
    println!("P90:    {:9} ns", histogram.value_at_quantile(0.90));
    println!("P99:    {:9} ns", histogram.value_at_quantile(0.99));
    println!("P99.9:  {:9} ns", histogram.value_at_quantile(0.999));
    println!("Max:    {:9} ns", histogram.max());
    println!("Mean:   {:9.0} ns", histogram.mean());
}

fn main() -> Result<(), BatchError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let config = BatchConfig {
        trials: args.iterations,
        shape: PopulationShape::OneToOne { count: args.count },
        seed: args.seed,
        ..BatchConfig::default()
    };
    config.validate()?;

    println!("Preparing Latency Report...");
    println!("Running {} trials of {}x{}...", args.iterations, args.count, args.count);

    let engine = TrialEngine::new(config.shape);
    let mut solve = Histogram::<u64>::new_with_bounds(1, 60_000_000_000, 3)?;
    let mut verify = Histogram::<u64>::new_with_bounds(1, 60_000_000_000, 3)?;
    let mut proposals = 0u64;
    let mut unstable = 0u64;
    let mut total_ns = 0u64;

    for spec in config.trial_specs() {
        let outcome = std::hint::black_box(engine.run_trial(spec)?);
        solve.saturating_record(outcome.solve_ns.max(1));
        verify.saturating_record(outcome.verify_ns.max(1));
        proposals += outcome.proposals;
        total_ns += outcome.solve_ns;
        if !outcome.stable {
            unstable += 1;
        }
    }

    println!("\n=== Latency Report ===");
    println!("Trials:     {}", args.iterations);
    println!("Unstable:   {}", unstable);
    println!("Proposals:  {:.1} per trial", proposals as f64 / args.iterations as f64);
    println!(
        "Throughput: {:.2} solves/sec",
        args.iterations as f64 / (total_ns.max(1) as f64 / 1e9)
    );

    print_histogram("Solve", &solve);
    print_histogram("Verify", &verify);

    println!("\nSolve distribution:");
    for v in solve.iter_log(1_000, 2.0) {
        let count = v.count_since_last_iteration();
        if count > 0 {
            println!("<= {:10} ns: {:10} count", v.value_iterated_to(), count);
        }
    }

    Ok(())
}
