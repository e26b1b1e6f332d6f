use clap::Parser;
use cvpflow::cvp::flow::arc_flows;
use cvpflow::cvp::mocks::{mock_bottleneck_network, mock_flow_network, mock_parallel_network};
use cvpflow::cvp::utils::draw_with_flow;
use cvpflow::cvp::{
    BprFunction, ClarabelSolver, CostFunction, CvpConfig, CvpMcnf, CvpMcnfKl, CvpNf,
    QuarticFunction,
};
use log::*;

#[derive(Parser, Debug)]
#[command(name = "cvpflow")]
#[command(version, about = "convex min-cost flow on the reference networks", long_about = None)]
struct Args {
    /// TOML file of the engine settings. Defaults are used if omitted.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
    /// Increase the log level (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn load_config(args: &Args) -> Result<CvpConfig, Box<dyn std::error::Error>> {
    match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&text)?)
        }
        None => Ok(CvpConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    let config = load_config(&args)?;
    debug!("{:?}", config);
    let solver = || ClarabelSolver::with_tolerance(config.solver_tolerance);

    // single commodity
    let net = mock_flow_network();
    let cost = QuarticFunction::new(&net);
    let mut nf = CvpNf::new(&cost, &net, solver()?, config)?;
    let x = nf.optimize()?;
    draw_with_flow(&net.graph, &x);
    println!("single commodity flow={:?} f={}", x, cost.value(&x));

    // two commodities sharing a bottleneck
    let net = mock_bottleneck_network();
    let cost = BprFunction::standard(&net);
    let mut mcnf = CvpMcnf::new(&cost, &net, solver()?, config)?;
    let x = mcnf.solve_by_dijkstra()?;
    println!("shortest paths arc flow={:?}", arc_flows(&x, &net));
    let x = mcnf.solve_by_dijkstra_and_socp()?;
    draw_with_flow(&net.graph, &arc_flows(&x, &net));
    println!(
        "bottleneck arc flow={:?} f={}",
        arc_flows(&x, &net),
        cost.value(&x)
    );

    // kleinrock delay
    let net = mock_parallel_network();
    let mut kl = CvpMcnfKl::new(&net, solver()?, config)?;
    let x = kl.optimize()?;
    println!(
        "kleinrock arc flow={:?} delay={}",
        arc_flows(&x, &net),
        kl.engine().cost().value(&x)
    );
    Ok(())
}
