use anyhow::Context;
use canvas_engine::harness::{run_simulation, run_stress, SimulationConfig};
use canvas_engine::EngineConfig;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("canvas-engine")
        .version(canvas_engine::VERSION)
        .about("Research canvas workspace engine harness")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_name("PATH")
                .help("TOML engine configuration"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run a scripted session against in-memory persistence")
                .arg(
                    Arg::new("turns")
                        .long("turns")
                        .default_value("12")
                        .value_parser(value_parser!(usize))
                        .help("Number of chat turns to draft and finalize"),
                )
                .arg(
                    Arg::new("generations")
                        .long("generations")
                        .default_value("6")
                        .value_parser(value_parser!(usize))
                        .help("Number of generation tasks to launch"),
                )
                .arg(
                    Arg::new("topic-every")
                        .long("topic-every")
                        .default_value("4")
                        .value_parser(value_parser!(usize))
                        .help("Start a new topic every N turns (0 = never)"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("stress")
                .about("Bulk-load the spatial index and sweep box queries")
                .arg(
                    Arg::new("nodes")
                        .long("nodes")
                        .default_value("10000")
                        .value_parser(value_parser!(usize))
                        .help("Number of nodes to index"),
                )
                .arg(
                    Arg::new("queries")
                        .long("queries")
                        .default_value("5000")
                        .value_parser(value_parser!(usize))
                        .help("Number of box queries"),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<EngineConfig> {
    match matches.get_one::<String>("config") {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {path}")),
        None => Ok(EngineConfig::default()),
    }
}

fn usize_arg(args: &ArgMatches, name: &str) -> usize {
    args.get_one::<usize>(name).copied().unwrap_or_default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let sim = SimulationConfig {
                turns: usize_arg(args, "turns"),
                generations: usize_arg(args, "generations"),
                topic_every: usize_arg(args, "topic-every"),
            };
            let report = run_simulation(config, sim).await?;

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.generate_text());
            }
            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("stress", args)) => {
            let nodes = usize_arg(args, "nodes");
            let queries = usize_arg(args, "queries");

            println!("Running spatial index stress test...");
            println!("Nodes: {nodes}");
            println!("Queries: {queries}");
            println!();

            let report = run_stress(nodes, queries);

            println!("Stress Test Report:");
            println!("  Nodes: {}", report.nodes);
            println!("  Build Time: {}ms", report.build_ms);
            println!("  Query Time: {}us total", report.query_total_us);
            println!("  Hits: {}", report.hits);
            println!("  Success: {}", report.success);

            std::process::exit(if report.success { 0 } else { 1 });
        }
        _ => {
            cli().print_help()?;
        }
    }
    Ok(())
}
