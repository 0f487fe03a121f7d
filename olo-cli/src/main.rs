use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};

use olo_core::{Commands, ConvState, ForkType, GateState, SearchHit, ensure_initialized_once};

#[derive(Parser)]
#[command(
    name = "olo",
    about = "OLO stamp protocol: session checkpoints, gates, and tier promotion"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Initialize the .olo root (idempotent)
    Init,
    /// Create a project with its decision gates
    New {
        id: String,
        name: String,
        /// Gate specs, e.g. -g "A:Blue channel?" -g "B:JPEG kill?"
        #[arg(short, long = "gate")]
        gates: Vec<String>,
    },
    /// Fork a branch from the current master
    Fork {
        project: String,
        name: String,
        #[arg(long, default_value = "explore")]
        fork_type: String,
    },
    /// Record progress on the master context
    Progress {
        project: String,
        depth: u32,
        pin: String,
    },
    /// Collect content from a branch into the bucket
    Collect {
        project: String,
        branch: String,
        name: String,
        content: String,
    },
    /// Stage a shelf artifact for injection
    Stage { project: String, artifact: String },
    /// Inject a staged artifact: freeze the tier, spawn the next one
    Promote { project: String, artifact: String },
    /// Print the current stamp (compact by default)
    Stamp {
        project: String,
        #[arg(long)]
        full: bool,
        #[arg(long)]
        rehydrate: bool,
    },
    /// Show or change a gate
    Gate {
        project: String,
        letter: char,
        /// Set an explicit state: open|half|yes|no|blocked|revisit
        #[arg(long)]
        set: Option<String>,
        /// Advance one step around the cycle
        #[arg(long)]
        cycle: bool,
    },
    /// Set the master conversation state: OPEN|GATE|DONE|FORK|HOLD|DEAD
    State { project: String, state: String },
    /// Show the tier tree, shelf, bucket and gates
    Status { project: String },
    /// Persist the current master checkpoint as a stamp file
    Save {
        project: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Scan persisted stamps and DOM captures for a query
    Search { query: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Init => init(),
        Cmd::New { id, name, gates } => new_project(&id, &name, &gates),
        Cmd::Fork {
            project,
            name,
            fork_type,
        } => fork(&project, &name, &fork_type),
        Cmd::Progress { project, depth, pin } => progress(&project, depth, &pin),
        Cmd::Collect {
            project,
            branch,
            name,
            content,
        } => collect(&project, &branch, &name, &content),
        Cmd::Stage { project, artifact } => stage(&project, &artifact),
        Cmd::Promote { project, artifact } => promote(&project, &artifact),
        Cmd::Stamp {
            project,
            full,
            rehydrate,
        } => stamp(&project, full, rehydrate),
        Cmd::Gate {
            project,
            letter,
            set,
            cycle,
        } => gate(&project, letter, set.as_deref(), cycle),
        Cmd::State { project, state } => set_state(&project, &state),
        Cmd::Status { project } => status(&project),
        Cmd::Save { project, name } => save(&project, name.as_deref()),
        Cmd::Search { query } => search(&query),
    }
}

fn init() -> Result<()> {
    let report = ensure_initialized_once()?;
    println!("root: {}", report.root.display());
    for d in &report.created {
        println!("  created {d}");
    }
    for d in &report.existed {
        println!("  existed {d}");
    }
    Ok(())
}

/// "A:Blue channel?" -> ('A', "Blue channel?")
fn parse_gate_spec(spec: &str) -> Result<(char, String)> {
    let (letter, question) = spec
        .split_once(':')
        .ok_or_else(|| anyhow!("gate spec must be LETTER:question, got {spec:?}"))?;
    let mut chars = letter.chars();
    match (chars.next(), chars.next()) {
        (Some(l), None) => Ok((l, question.trim().to_string())),
        _ => Err(anyhow!("gate letter must be a single character: {letter:?}")),
    }
}

fn new_project(id: &str, name: &str, gate_specs: &[String]) -> Result<()> {
    let specs: Vec<(char, String)> = gate_specs
        .iter()
        .map(|s| parse_gate_spec(s))
        .collect::<Result<_>>()?;
    let mut cmd = Commands::create_project(id, name, &specs)?;
    println!("{}", cmd.stamp());
    Ok(())
}

fn fork(project: &str, name: &str, fork_type: &str) -> Result<()> {
    let ft = ForkType::parse(fork_type)
        .ok_or_else(|| anyhow!("unknown fork type: {fork_type}"))?;
    let mut cmd = Commands::open(project)?;
    let id = cmd.fork(name, ft)?;
    println!("{id}");
    Ok(())
}

fn progress(project: &str, depth: u32, pin: &str) -> Result<()> {
    let mut cmd = Commands::open(project)?;
    cmd.progress(depth, pin)?;
    println!("{}", cmd.stamp());
    Ok(())
}

fn collect(project: &str, branch: &str, name: &str, content: &str) -> Result<()> {
    let mut cmd = Commands::open(project)?;
    match cmd.collect(branch, name, content)? {
        Some(id) => println!("{id}"),
        None => println!("unknown branch: {branch}"),
    }
    Ok(())
}

fn stage(project: &str, artifact: &str) -> Result<()> {
    let mut cmd = Commands::open(project)?;
    match cmd.stage(artifact)? {
        Some(()) => println!("staged {artifact}"),
        None => println!("cannot stage: {artifact}"),
    }
    Ok(())
}

fn promote(project: &str, artifact: &str) -> Result<()> {
    let mut cmd = Commands::open(project)?;
    match cmd.promote(artifact)? {
        Some((level, auto_id)) => {
            println!("tier {} frozen -> tier {level} active", level - 1);
            println!("auto-artifact: {auto_id}");
            println!("{}", cmd.stamp());
        }
        None => println!("cannot inject: {artifact}"),
    }
    Ok(())
}

fn stamp(project: &str, full: bool, rehydrate: bool) -> Result<()> {
    let mut cmd = Commands::open(project)?;
    if rehydrate {
        let findings: Option<&BTreeMap<String, String>> = None;
        println!("{}", cmd.rehydrate(None, findings));
    } else if full {
        println!("{}", cmd.full_stamp());
    } else {
        println!("{}", cmd.stamp());
    }
    Ok(())
}

fn gate(project: &str, letter: char, set: Option<&str>, cycle: bool) -> Result<()> {
    let mut cmd = Commands::open(project)?;
    if let Some(word) = set {
        let state =
            GateState::parse(word).ok_or_else(|| anyhow!("unknown gate state: {word}"))?;
        match cmd.set_gate(letter, state)? {
            Some(s) => println!("{letter}{}", s.glyph()),
            None => println!("unknown gate: {letter}"),
        }
        return Ok(());
    }
    if cycle {
        match cmd.cycle_gate(letter)? {
            Some(s) => println!("{letter}{}", s.glyph()),
            None => println!("unknown gate: {letter}"),
        }
        return Ok(());
    }
    match cmd.gate(letter) {
        Some(g) => println!("{}  {}", g.symbol(), g.question),
        None => println!("unknown gate: {letter}"),
    }
    Ok(())
}

fn set_state(project: &str, state: &str) -> Result<()> {
    let parsed = ConvState::parse(state).ok_or_else(|| anyhow!("unknown state: {state}"))?;
    let mut cmd = Commands::open(project)?;
    cmd.set_state(parsed)?;
    println!("{}", cmd.stamp());
    Ok(())
}

fn status(project: &str) -> Result<()> {
    let mut cmd = Commands::open(project)?;
    println!("{}", cmd.status());
    Ok(())
}

fn save(project: &str, name: Option<&str>) -> Result<()> {
    let mut cmd = Commands::open(project)?;
    let path = cmd.save_stamp(name)?;
    println!("{}", path.display());
    Ok(())
}

fn search(query: &str) -> Result<()> {
    let report = ensure_initialized_once()?;
    let hits = olo_core::search_sessions(
        &report.config.session.sessions_path,
        query,
        report.config.search.dom_context_chars,
    )?;
    if hits.is_empty() {
        println!("no matches");
        return Ok(());
    }
    for hit in hits {
        match hit {
            SearchHit::Stamp { file, stamp } => {
                println!("{}  {}", file.display(), stamp.compact());
            }
            SearchHit::Dom { file, context } => {
                println!("{}  {}", file.display(), context);
            }
        }
    }
    Ok(())
}
