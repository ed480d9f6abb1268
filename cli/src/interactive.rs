use std::{
    fmt,
    io::{stdin, stdout, Write},
    str::FromStr,
};

use anyhow::Result;
use bitmask_enum::bitmask;
use cache_sim::{
    sim::System,
    trace::Trace,
    traffic::{self, Locality, Random, Sequential},
};
use num_enum::TryFromPrimitive;

use crate::get_terminal_width;

peg::parser!(grammar command() for str {
    rule usize() -> usize
        = n:$(quiet!{['0'..='9']+}) {? n.parse().or(Err("usize")) }
        / expected!("usize")
    rule u64() -> u64
        = n:$(quiet!{['0'..='9']+}) {? n.parse().or(Err("u64")) }
        / expected!("u64")
    rule int() -> i32
        = n:$(quiet!{['-' | '+']? ['0'..='9']+}) {? n.parse().or(Err("32-bit integer")) }
        / expected!("integer")
    rule addr() -> usize
        = quiet!{"0" ['x' | 'X']} n:$(quiet!{['0'..='9'|'a'..='f'|'A'..='F']+}) {?
            usize::from_str_radix(n, 16).or(Err("hex address"))
        }
        / usize()
    rule path() -> &'input str
        = $(quiet!{[c if !c.is_whitespace()]+})
        / expected!("file path")
    rule menu() -> MenuItem
        = n:$(['0'..='9']) !['0'..='9'] {?
            n.parse::<u8>()
                .ok()
                .and_then(|n| MenuItem::try_from(n).ok())
                .ok_or("menu item")
        }
    rule mem() = "memory" / "mem" / "ram"
    rule show_kind() -> ShowKind
        = mem() { ShowKind::Memory }
        / "cache" { ShowKind::Cache }
        / ("statistics" / "stats" / "stat") { ShowKind::Stat }
    rule trace_kind() -> TraceKind
        = "on" { TraceKind::all() }
        / "off" { TraceKind::none() }
        / ("read" / "r") { TraceKind::Read }
        / ("write" / "w") { TraceKind::Write }
    rule seed() -> u64
        = __ s:u64() { s }
    rule traffic() -> Traffic
        = ("sequential" / "seq") __ requests:usize() __ start:addr() {
            Traffic::Sequential { requests, start }
        }
        / "random" __ count:usize() seed:seed()? { Traffic::Random { count, seed } }
        / ("locality" / "local") __ requests:usize() __ range:usize() __ regions:usize() seed:seed()? {
            Traffic::Local { requests, range, regions, seed }
        }
    rule cmd() -> Command
        = _ "read" __ a:addr() _ { Command::Read(a) }
        / _ "write" __ a:addr() __ v:int() _ { Command::Write(a, v) }
        / _ "load" __ p:path() _ { Command::Load(p.to_owned()) }
        / _ "show" __ k:show_kind() _ { Command::Show(k) }
        / _ "trace" __ t:trace_kind() _ { Command::Trace(t) }
        / _ t:traffic() _ { Command::Traffic(t) }
        / _ "help" _ { Command::Help }
        / _ ("exit" / "quit") _ { Command::Exit }
    pub(crate) rule parse_input() -> super::Input
        = _ m:menu() _ { super::Input::Menu(m) }
        / c:cmd() { super::Input::Command(c) }
        / expected!("command")

    rule ws() = quiet!{[' ' | '\t' | '\r' | '\n']}
        / expected!("whitespace")
    rule _() = ws()*
    rule __() = ws()+
});

/// one line typed at the prompt.
pub(crate) enum Input {
    Menu(MenuItem),
    Command(Command),
}

pub(crate) enum Command {
    Read(usize),
    Write(usize, i32),
    Load(String),
    Show(ShowKind),
    Trace(TraceKind),
    Traffic(Traffic),
    Help,
    Exit,
}

pub(crate) enum ShowKind {
    Memory,
    Cache,
    Stat,
}

pub(crate) enum Traffic {
    Sequential {
        requests: usize,
        start: usize,
    },
    Random {
        count: usize,
        seed: Option<u64>,
    },
    Local {
        requests: usize,
        range: usize,
        regions: usize,
        seed: Option<u64>,
    },
}

/// numbered entries of the classic menu.
#[derive(Clone, Copy, TryFromPrimitive)]
#[repr(u8)]
pub(crate) enum MenuItem {
    Exit = 0,
    LoadRam = 1,
    ShowRam = 2,
    ShowCache = 3,
    Read = 4,
    Write = 5,
    Sequential = 6,
    Random = 7,
    Local = 8,
    ShowStat = 9,
}

#[bitmask(u8)]
pub(crate) enum TraceKind {
    Read,
    Write,
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contains(Self::Read) {
            write!(f, "read")?;
            if self.contains(Self::Write) {
                write!(f, "/write")?;
            }
        } else if self.contains(Self::Write) {
            write!(f, "write")?;
        } else {
            write!(f, "off")?;
        }
        Ok(())
    }
}

const HELP: &str = "\
commands:
  read ADDR                 read one word (traced)
  write ADDR VALUE          write one word (traced)
  load FILE                 load RAM from whitespace separated integers
  show mem|cache|stat       display RAM, cache or statistics
  seq N START               N sequential reads from START
  random N [SEED]           N random reads
  local N RANGE REGIONS [SEED]
                            N reads per region within RANGE words of a random base
  trace on|off|read|write   choose which accesses are traced
  exit
menu shortcuts:
  1 load RAM   2 show RAM   3 show cache   4 read   5 write
  6 sequential   7 random   8 local   9 statistics   0 exit";

fn ask<T: FromStr>(msg: &str) -> Result<Option<T>> {
    print!("{msg}");
    stdout().flush()?;
    let mut buf = String::new();
    stdin().read_line(&mut buf)?;
    Ok(buf.trim().parse().ok())
}

/// turns a menu number into a command, asking for its arguments.
fn from_menu(item: MenuItem, ram_size: usize) -> Result<Option<Command>> {
    macro_rules! ask {
        ($msg:expr) => {
            match ask($msg)? {
                Some(v) => v,
                None => {
                    println!("invalid input");
                    return Ok(None);
                }
            }
        };
    }
    let last = ram_size.saturating_sub(1);
    Ok(Some(match item {
        MenuItem::Exit => Command::Exit,
        MenuItem::LoadRam => Command::Load(ask!("Enter filename: ")),
        MenuItem::ShowRam => Command::Show(ShowKind::Memory),
        MenuItem::ShowCache => Command::Show(ShowKind::Cache),
        MenuItem::ShowStat => Command::Show(ShowKind::Stat),
        MenuItem::Read => Command::Read(ask!(&format!(
            "Enter address to read (0 - {last}): "
        ))),
        MenuItem::Write => {
            let addr = ask!(&format!("Enter address to write (0 - {last}): "));
            let val = ask!("Enter value: ");
            Command::Write(addr, val)
        }
        MenuItem::Sequential => {
            let requests = ask!("Enter number of requests: ");
            let start = ask!(&format!("Enter start address (0-{last}): "));
            Command::Traffic(Traffic::Sequential { requests, start })
        }
        MenuItem::Random => Command::Traffic(Traffic::Random {
            count: ask!("Enter the number of random accesses: "),
            seed: None,
        }),
        MenuItem::Local => {
            let requests = ask!("Enter number of requests per region: ");
            let range = ask!("Enter locality range: ");
            let regions = ask!("Enter number of local regions: ");
            Command::Traffic(Traffic::Local {
                requests,
                range,
                regions,
                seed: None,
            })
        }
    }))
}

fn run_traffic(sys: &mut System, t: Traffic) {
    let ram_size = sys.config().ram_size;
    let summary = match t {
        Traffic::Sequential { requests, start } => {
            println!("Simulating sequential access...");
            traffic::run_traffic(sys, Sequential::new(start, requests, ram_size))
        }
        Traffic::Random { count, seed } => {
            println!("Simulating random access...");
            traffic::run_traffic(sys, Random::new(count, ram_size, seed))
        }
        Traffic::Local {
            requests,
            range,
            regions,
            seed,
        } => match Locality::new(requests, range, regions, ram_size, seed) {
            Ok(addrs) => {
                println!("Simulating multiple local access regions...");
                traffic::run_traffic(sys, addrs)
            }
            Err(e) => {
                println!("{e}");
                return;
            }
        },
    };
    println!("simulation complete: {summary}");
}

pub fn execute_interactive(sys: &mut System) -> Result<()> {
    let mut tracing = TraceKind::all();
    let width = get_terminal_width();
    println!("entering interactive. type \"help\" for commands.");
    loop {
        print!("[trace {tracing}] > ");
        stdout().flush()?;
        let mut str = String::new();
        if stdin().read_line(&mut str)? == 0 {
            break;
        }
        if str.trim().is_empty() {
            continue;
        }
        let parsed = match command::parse_input(&str) {
            Ok(Input::Command(c)) => c,
            Ok(Input::Menu(item)) => match from_menu(item, sys.config().ram_size)? {
                Some(c) => c,
                None => continue,
            },
            Err(e) => {
                println!("parse error: expected {}", e.expected);
                continue;
            }
        };
        match parsed {
            Command::Read(addr) => {
                let mut trace = tracing.contains(TraceKind::Read).then(Trace::new);
                let r = sys.read(addr, &mut trace);
                if let Some(t) = trace.filter(|t| !t.events().is_empty()) {
                    println!("{t}");
                }
                match r {
                    Ok(v) => println!("Value at address {addr}: {v}"),
                    Err(e) => println!("{e}"),
                }
            }
            Command::Write(addr, val) => {
                let mut trace = tracing.contains(TraceKind::Write).then(Trace::new);
                let r = sys.write(addr, val, &mut trace);
                if let Some(t) = trace.filter(|t| !t.events().is_empty()) {
                    println!("{t}");
                }
                match r {
                    Ok(()) => println!("Value {val} written at address {addr}"),
                    Err(e) => println!("{e}"),
                }
            }
            Command::Load(path) => match sys.load_file(&path) {
                Ok(n) => println!("{n} numbers loaded into RAM."),
                Err(e) => println!("{e}"),
            },
            Command::Show(ShowKind::Memory) => println!("{}", sys.memory_view()),
            Command::Show(ShowKind::Cache) => println!("{}", sys.cache_view()),
            Command::Show(ShowKind::Stat) => {
                println!("{}", sys.collect_stat().view(width.unwrap_or(60) as usize));
            }
            Command::Trace(t) => {
                tracing = t;
                println!("trace {tracing}");
            }
            Command::Traffic(t) => run_traffic(sys, t),
            Command::Help => println!("{HELP}"),
            Command::Exit => break,
        }
    }
    println!("exiting interactive.");
    Ok(())
}
