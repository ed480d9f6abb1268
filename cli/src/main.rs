mod interactive;

use std::{fs::File, path::PathBuf};

use anyhow::Result;
use cache_sim::{
    config::CacheConfig,
    sim::System,
    trace::Trace,
    traffic::{self, Locality, Random, Sequential},
};
use clap::{Args, Parser, Subcommand};
use terminal_size::terminal_size;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// File path to cache geometry (json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// File path to initial RAM contents (whitespace separated integers)
    #[arg(long, global = true)]
    ram: Option<PathBuf>,
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Print final statistics as json to stdout
    #[arg(long, global = true)]
    stat_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// enter interactive mode
    Interactive,
    /// read consecutive addresses
    Seq {
        /// Number of requests
        #[arg(short = 'n', long)]
        requests: usize,
        /// Start address
        #[arg(short, long, default_value_t = 0)]
        start: usize,
    },
    /// read uniformly random addresses
    Random {
        /// Number of random accesses
        #[arg(short = 'n', long)]
        count: usize,
        /// Seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },
    /// read clustered addresses around random region bases
    Local {
        /// Number of requests per region
        #[arg(short = 'n', long)]
        requests: usize,
        /// Locality range
        #[arg(short, long)]
        range: usize,
        /// Number of local regions
        #[arg(long)]
        regions: usize,
        /// Seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },
    /// read addresses one by one, tracing each access
    Read {
        addrs: Vec<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    let Cli { common, command } = Cli::parse();
    if common.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::init();
    }
    let config = read_config(common.config)?;
    let mut sys = System::new(config);
    if let Some(ram) = common.ram {
        // a bad RAM file is reported but does not stop the run
        match sys.load_file(&ram) {
            Ok(n) => log::info!("{n} numbers loaded from {}", ram.display()),
            Err(e) => log::error!("{e}"),
        }
    }
    let ram_size = config.ram_size;
    match command {
        Command::Interactive => {
            interactive::execute_interactive(&mut sys)?;
        }
        Command::Seq { requests, start } => {
            traffic::run_traffic(&mut sys, Sequential::new(start, requests, ram_size));
        }
        Command::Random { count, seed } => {
            traffic::run_traffic(&mut sys, Random::new(count, ram_size, seed));
        }
        Command::Local {
            requests,
            range,
            regions,
            seed,
        } => {
            let addrs = Locality::new(requests, range, regions, ram_size, seed)?;
            traffic::run_traffic(&mut sys, addrs);
        }
        Command::Read { addrs } => {
            let mut trace = Some(Trace::new());
            for addr in addrs {
                let r = sys.read(addr, &mut trace);
                if let Some(t) = trace.as_mut().filter(|t| !t.events().is_empty()) {
                    println!("{t}");
                    t.clear();
                }
                match r {
                    Ok(v) => println!("Value at address {addr}: {v}"),
                    Err(e) => println!("{e}"),
                }
            }
        }
    }
    output_stat(&sys);
    if common.stat_json {
        println!("{}", serde_json::to_string_pretty(&sys.stats())?);
    }
    Ok(())
}

fn output_stat(sys: &System) {
    let max_width = get_terminal_width().unwrap_or(120) as usize;
    log::info!("statistics:\n{}", sys.collect_stat().view(max_width));
}

pub(crate) fn get_terminal_width() -> Option<u16> {
    terminal_size().map(|(w, _)| w.0.saturating_sub(20))
}

fn read_config(config: Option<PathBuf>) -> Result<CacheConfig> {
    let config = match config {
        Some(p) => {
            let file = File::open(p)?;
            CacheConfig::deser(file)?
        }
        None => Default::default(),
    };
    Ok(config)
}
