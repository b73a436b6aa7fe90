use anyhow::Result;
use capability_sandbox::{
    Assembler, AssemblyPlan, CapabilityRegistry, DefinitionSet, Sandbox, Selector,
    builtin_registry,
};
use clap::{Args, Parser, Subcommand};
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sandbox")]
#[command(about = "Assemble sandboxes from named capabilities")]
struct Cli {
    #[command(flatten)]
    mode: ModeArgs,

    /// Sandbox definition files (.toml)
    definitions: Vec<PathBuf>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ModeArgs {
    /// List the built-in capabilities
    #[arg(long, short)]
    list: bool,

    /// Validate definitions and print each resolved plan without assembling
    #[arg(long, short)]
    dry_run: bool,

    /// Start interactive session for assembling sandboxes and calling members
    #[arg(long, short)]
    interactive: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered capabilities
    List,
    /// List loaded sandbox definitions
    Definitions,
    /// Assemble a sandbox from capability names (all when empty)
    Assemble { names: Vec<String> },
    /// Assemble a sandbox from a loaded definition
    Use { definition: String },
    /// Show members of the current sandbox
    Members,
    /// Call a member of the current sandbox
    Call { member: String, args: Vec<String> },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let registry = builtin_registry()?;

    if cli.mode.list {
        print_capabilities(&registry);
        return Ok(());
    }

    let definitions = load(&cli.definitions)?;
    definitions.validate(&registry)?;

    if cli.mode.dry_run {
        if definitions.is_empty() {
            return Err(anyhow::anyhow!("--dry-run requires at least one definition file"));
        }
        let plans = dry_run_plans(&registry, &definitions)?;
        println!("{}", serde_json::to_string_pretty(&plans)?);
    } else if cli.mode.interactive {
        run_interactive_session(&registry, &definitions)?;
    }

    Ok(())
}

fn load(paths: &[PathBuf]) -> Result<DefinitionSet> {
    if paths.is_empty() {
        return Ok(DefinitionSet::default());
    }
    println!("Loading definitions from: {paths:?}...");
    let mut builder = DefinitionSet::builder();
    for path in paths {
        builder = builder.load_file(path);
    }
    builder.build()
}

/// Resolved plan for every definition, keyed by definition name
fn dry_run_plans(
    registry: &CapabilityRegistry,
    definitions: &DefinitionSet,
) -> Result<BTreeMap<String, AssemblyPlan>> {
    let mut plans = BTreeMap::new();
    for definition in definitions.iter() {
        let plan = Assembler::from_definition(registry, definition).plan()?;
        plans.insert(definition.name.clone(), plan);
    }
    Ok(plans)
}

fn print_capabilities(registry: &CapabilityRegistry) {
    for capability in registry.get_capabilities() {
        match &capability.description {
            Some(description) => println!("- {}: {}", capability.name, description),
            None => println!("- {}", capability.name),
        }
    }
}

struct Session<'a> {
    registry: &'a CapabilityRegistry,
    definitions: &'a DefinitionSet,
    current: Option<Sandbox>,
}

fn run_interactive_session(
    registry: &CapabilityRegistry,
    definitions: &DefinitionSet,
) -> Result<()> {
    println!(
        "{} capabilities and {} definitions available.",
        registry.len(),
        definitions.len()
    );
    println!("Starting interactive session. Type 'help' for commands.");

    let mut session = Session {
        registry,
        definitions,
        current: None,
    };
    let mut rl = Editor::<(), DefaultHistory>::new()?;
    loop {
        let readline = rl.readline("> ");
        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                if handle_command(&line, &mut session).is_err() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err:?}");
                break;
            }
        }
    }

    Ok(())
}

fn handle_command(line: &str, session: &mut Session<'_>) -> Result<(), ()> {
    let parts = parse_quoted_args(line);

    let Some(command_str) = parts.first() else {
        return Ok(());
    };
    let command = match command_str.as_str() {
        "list" => Some(Commands::List),
        "definitions" => Some(Commands::Definitions),
        "assemble" => Some(Commands::Assemble {
            names: parts.get(1..).unwrap_or(&[]).to_vec(),
        }),
        "use" => parts.get(1).map_or_else(
            || {
                eprintln!("Usage: use <definition>");
                None
            },
            |definition| {
                Some(Commands::Use {
                    definition: definition.to_string(),
                })
            },
        ),
        "members" => Some(Commands::Members),
        "call" => parts.get(1).map_or_else(
            || {
                eprintln!("Usage: call <member> [args...]");
                None
            },
            |member| {
                Some(Commands::Call {
                    member: member.to_string(),
                    args: parts.get(2..).unwrap_or(&[]).to_vec(),
                })
            },
        ),
        "help" => {
            println!("Available commands:");
            println!("  list                      - List registered capabilities");
            println!("  definitions               - List loaded sandbox definitions");
            println!("  assemble [names...]       - Assemble a sandbox (all when no names)");
            println!("  use <definition>          - Assemble a sandbox from a definition");
            println!("  members                   - Show members of the current sandbox");
            println!("  call <member> [args...]   - Call a member of the current sandbox");
            println!("  help                      - Show this help message");
            println!("  exit, quit                - Exit the interactive session");
            None
        }
        "exit" | "quit" => return Err(()),
        _ => {
            eprintln!("Unknown command. Type 'help' for a list of commands.");
            None
        }
    };

    if let Some(command) = command {
        match command {
            Commands::List => print_capabilities(session.registry),
            Commands::Definitions => {
                for definition in session.definitions.iter() {
                    println!(
                        "- {} (uses: {}, collisions: {:?})",
                        definition.name, definition.uses, definition.collisions
                    );
                }
            }
            Commands::Assemble { names } => {
                let selector = if names.is_empty() {
                    Selector::All
                } else {
                    Selector::from(names)
                };
                let assembler = Assembler::new(session.registry).select(selector);
                replace_current(session, assembler);
            }
            Commands::Use { definition } => {
                let definitions = session.definitions;
                match definitions.get(&definition) {
                    Some(def) => {
                        let assembler = Assembler::from_definition(session.registry, def);
                        replace_current(session, assembler);
                    }
                    None => eprintln!("Error: Definition '{definition}' not found."),
                }
            }
            Commands::Members => match &session.current {
                Some(sandbox) => {
                    for name in sandbox.member_names() {
                        println!("- {} ({})", name, sandbox.owner_of(name).unwrap_or("?"));
                    }
                }
                None => eprintln!("Error: No sandbox assembled yet."),
            },
            Commands::Call { member, args } => match &session.current {
                Some(sandbox) => match sandbox.call(&member, &args) {
                    Ok(result) => println!("{result}"),
                    Err(e) => eprintln!("Error: {e}"),
                },
                None => eprintln!("Error: No sandbox assembled yet."),
            },
        }
    }
    Ok(())
}

fn replace_current(session: &mut Session<'_>, assembler: Assembler<'_>) {
    match assembler.run(|sandbox| sandbox) {
        Ok(sandbox) => {
            println!(
                "Assembled sandbox with {:?} ({} members).",
                sandbox.capabilities(),
                sandbox.member_names().len()
            );
            session.current = Some(sandbox);
        }
        Err(e) => eprintln!("Error: {e}"),
    }
}

fn parse_quoted_args(line: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote_char: Option<char> = None;

    for ch in line.trim().chars() {
        match (ch, quote_char) {
            ('"', None) | ('\'', None) => {
                quote_char = Some(ch);
            }
            (ch, Some(open_char)) if ch == open_char => {
                quote_char = None;
            }
            (' ', None) => {
                if !current.is_empty() {
                    parts.push(current);
                    current = String::new();
                }
            }
            (ch, _) => {
                current.push(ch);
            }
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
