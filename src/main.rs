use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use mratree::{Engine, ExecContext, NodeStore, TreeConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mratree", about = "Adaptive multiresolution tree operators")]
struct Cli {
    #[command(flatten)]
    tree: TreeArgs,

    /// Raise log verbosity to debug (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct TreeArgs {
    /// Layout depth: slots are reserved for depths 0..=max-depth.
    #[arg(long, default_value_t = 10, global = true)]
    max_depth: u32,
    /// Deepest level refinement may reach (defaults to max-depth).
    #[arg(long, global = true)]
    refine_depth: Option<u32>,
    /// Draws at or below this value stop refinement (out of 10).
    #[arg(long, default_value_t = TreeConfig::DEFAULT_LEAF_THRESHOLD, global = true)]
    leaf_threshold: u32,
    /// Subtrees shallower than this depth are forked in parallel.
    #[arg(long, default_value_t = mratree::exec::DEFAULT_PARALLEL_DEPTH, global = true)]
    parallel_depth: u32,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a tree and print every populated node in preorder.
    Refine {
        /// Random seed for refinement.
        #[arg(long, default_value_t = 12345)]
        seed: u64,
    },
    /// Build, compress, and print the compressed tree.
    Compress {
        #[arg(long, default_value_t = 12345)]
        seed: u64,
    },
    /// Build, compress, reconstruct, and check the round trip.
    Reconstruct {
        #[arg(long, default_value_t = 12345)]
        seed: u64,
        /// Value added to the root total before splitting.
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i64,
    },
    /// Sum two independently refined trees.
    Gaxpy {
        #[arg(long, default_value_t = 12345)]
        seed_a: u64,
        #[arg(long, default_value_t = 54321)]
        seed_b: u64,
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        alpha: i64,
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        beta: i64,
    },
    /// Apply the differencing stencil.
    Diff {
        #[arg(long, default_value_t = 12345)]
        seed: u64,
    },
    /// Look up one coefficient with ancestor fallback.
    Coef {
        #[arg(long, default_value_t = 12345)]
        seed: u64,
        /// Query depth.
        depth: u32,
        /// Query label.
        #[arg(allow_hyphen_values = true)]
        label: i64,
    },
    /// Squared norm of one tree and inner product with a second.
    Norm {
        #[arg(long, default_value_t = 12345)]
        seed_a: u64,
        #[arg(long, default_value_t = 54321)]
        seed_b: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let engine = build_engine(&cli.tree)?;

    match cli.command {
        Commands::Refine { seed } => run_refine(&engine, seed)?,
        Commands::Compress { seed } => run_compress(&engine, seed)?,
        Commands::Reconstruct { seed, offset } => run_reconstruct(&engine, seed, offset)?,
        Commands::Gaxpy {
            seed_a,
            seed_b,
            alpha,
            beta,
        } => run_gaxpy(&engine, seed_a, seed_b, alpha, beta)?,
        Commands::Diff { seed } => run_diff(&engine, seed)?,
        Commands::Coef { seed, depth, label } => run_coef(&engine, seed, depth, label)?,
        Commands::Norm { seed_a, seed_b } => run_norm(&engine, seed_a, seed_b)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_engine(args: &TreeArgs) -> Result<Engine> {
    let mut config = TreeConfig::new(args.max_depth)
        .context("invalid --max-depth")?
        .with_leaf_threshold(args.leaf_threshold);
    if let Some(refine_depth) = args.refine_depth {
        config = config
            .with_refine_depth(refine_depth)
            .context("invalid --refine-depth")?;
    }
    let ctx = ExecContext::new().with_parallel_depth(args.parallel_depth);
    Ok(Engine::with_context(config, ctx))
}

fn refine(engine: &Engine, seed: u64) -> Result<NodeStore> {
    engine
        .refine(seed)
        .with_context(|| format!("refinement failed for seed {}", seed))
}

fn run_refine(engine: &Engine, seed: u64) -> Result<()> {
    let store = refine(engine, seed)?;
    print_nodes(&store);
    print_summary(&store);
    Ok(())
}

fn run_compress(engine: &Engine, seed: u64) -> Result<()> {
    let mut store = refine(engine, seed)?;
    engine.compress(&mut store).context("compress failed")?;
    print_nodes(&store);
    print_summary(&store);
    Ok(())
}

fn run_reconstruct(engine: &Engine, seed: u64, offset: i64) -> Result<()> {
    let original = refine(engine, seed)?;
    let mut store = original.clone();
    engine.compress(&mut store).context("compress failed")?;
    engine
        .reconstruct(&mut store, offset)
        .context("reconstruct failed")?;

    print_nodes(&store);
    print_summary(&store);
    if offset == 0 {
        if store != original {
            bail!("round trip mismatch for seed {}", seed);
        }
        println!("round trip: ok");
    }
    Ok(())
}

fn run_gaxpy(engine: &Engine, seed_a: u64, seed_b: u64, alpha: i64, beta: i64) -> Result<()> {
    let a = refine(engine, seed_a)?;
    let b = refine(engine, seed_b)?;
    let c = engine
        .gaxpy_scaled(alpha, &a, beta, &b)
        .context("gaxpy failed")?;

    print_nodes(&c);
    print_summary(&c);
    println!(
        "shape: A={} B={} C={} nodes",
        a.populated_count(),
        b.populated_count(),
        c.populated_count()
    );
    Ok(())
}

fn run_diff(engine: &Engine, seed: u64) -> Result<()> {
    let source = refine(engine, seed)?;
    let result = engine.diff(&source).context("diff failed")?;

    for (pos, idx, slot) in result.store.nodes() {
        let marker = if result.is_estimated(idx) { " (estimated)" } else { "" };
        println!(
            "(n: {}, l: {}), idx: {}, node_value: {}{}",
            pos.depth, pos.label, idx, slot.coef, marker
        );
    }
    print_summary(&result.store);
    println!("estimated: {}", result.estimated_count());
    Ok(())
}

fn run_coef(engine: &Engine, seed: u64, depth: u32, label: i64) -> Result<()> {
    let store = refine(engine, seed)?;
    let coef = engine
        .get_coef(&store, depth, label)
        .context("coefficient lookup failed")?;
    println!("({}, {}): {}", depth, label, coef);
    Ok(())
}

fn run_norm(engine: &Engine, seed_a: u64, seed_b: u64) -> Result<()> {
    let a = refine(engine, seed_a)?;
    let b = refine(engine, seed_b)?;
    let norm = engine.norm(&a).context("norm failed")?;
    let inner = engine.inner_product(&a, &b).context("inner product failed")?;
    println!("norm^2(A) = {}", norm);
    println!("<A, B>    = {}", inner);
    Ok(())
}

fn print_nodes(store: &NodeStore) {
    for (pos, idx, slot) in store.nodes() {
        println!(
            "(n: {}, l: {}), idx: {}, node_value: {}",
            pos.depth, pos.label, idx, slot.coef
        );
    }
}

fn print_summary(store: &NodeStore) {
    println!(
        "form={} depth={} nodes={} leaves={} fingerprint={}",
        store.form(),
        store
            .depth()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string()),
        store.populated_count(),
        store.leaf_count(),
        store.fingerprint().to_hex()
    );
}
