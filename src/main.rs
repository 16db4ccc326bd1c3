use clap::{ArgAction, Args, Parser, Subcommand};
use drone_builder::format::{breadcrumbs, build_subtitle, grams, price_label, weight_label};
use drone_builder::{
    Config, Configurator, CustomPartDraft, FileStore, Origin, Question, Result,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "drone-builder",
    version,
    about = "Pick parts for an FPV drone build",
    infer_subcommands = true,
    arg_required_else_help = true
)]
struct Cli {
    /// Storage directory (overrides DRONE_BUILDER_DATA_DIR).
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Catalog file, .json or .yaml (overrides DRONE_BUILDER_CATALOG).
    #[arg(long, global = true, value_name = "PATH")]
    catalog: Option<PathBuf>,

    /// Machine-readable JSON output.
    #[arg(long, global = true)]
    json: bool,

    /// Debug output (repeat for more).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the current answers, step and the choices for the next question.
    Status,
    /// Answer a question (size, style or video).
    Answer {
        #[arg(value_parser = parse_question)]
        question: Question,
        value: String,
    },
    /// List the part categories for the current answers.
    Parts,
    /// List the options for one part, cheapest first.
    Options { part: String },
    /// Choose an option for a part by name.
    Pick { part: String, option: String },
    /// Fill in default picks and show the build with totals.
    #[command(alias = "results")]
    Summary,
    /// Manage custom parts.
    #[command(subcommand)]
    Custom(CustomCommand),
    /// Save the current build under a name.
    Save { name: String },
    /// List saved builds, newest first.
    #[command(alias = "ls")]
    Builds,
    /// Make a saved build the current selection.
    Load { id: String },
    /// Delete a saved build.
    #[command(alias = "rm")]
    Delete { id: String },
    /// Clear all answers and picks.
    Restart,
}

#[derive(Subcommand, Debug)]
enum CustomCommand {
    /// Add a custom option for the current answers.
    Add(CustomAddArgs),
    /// List stored custom parts.
    List,
    /// Remove a custom part by id.
    Remove { id: String },
}

#[derive(Args, Debug)]
struct CustomAddArgs {
    #[arg(long)]
    part: String,
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    price: String,
    #[arg(long, default_value = "")]
    link: String,
    /// Grams; empty or 0 means unknown.
    #[arg(long, default_value = "")]
    weight: String,
}

fn parse_question(raw: &str) -> std::result::Result<Question, String> {
    Question::parse(raw).ok_or_else(|| format!("unknown question '{raw}' (expected size, style or video)"))
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "drone_builder=info",
        1 => "drone_builder=debug",
        _ => "drone_builder=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(path) = cli.catalog {
        config.catalog_path = Some(path);
    }
    let catalog = config.load_catalog()?;
    let store = config.open_store();
    let mut session = Configurator::with_keys(catalog, store, config.keys.clone());
    let json = cli.json;

    match cli.command {
        Command::Status => status(&session, json)?,
        Command::Answer { question, value } => {
            session.answer(question, &value)?;
            status(&session, json)?;
        }
        Command::Parts => {
            let parts = session.parts();
            if json {
                print_json(&parts)?;
            } else if parts.is_empty() {
                println!("No parts found for this combo yet.");
            } else {
                parts.iter().for_each(|p| println!("{p}"));
            }
        }
        Command::Options { part } => {
            let options = session.options_for(&part);
            if json {
                print_json(&options)?;
            } else if options.is_empty() {
                println!("No options found for {part}.");
            } else {
                for opt in &options {
                    let tag = match (opt.origin, &opt.custom_id) {
                        (Origin::Custom, Some(id)) => format!("  [custom {id}]"),
                        _ => String::new(),
                    };
                    println!(
                        "{:<40} {:>10} {:>8}{tag}",
                        opt.name,
                        price_label(opt.price),
                        grams(opt.weight)
                    );
                }
            }
        }
        Command::Pick { part, option } => {
            let pick = session.pick(&part, &option)?.clone();
            if json {
                print_json(&pick)?;
            } else {
                println!("{part}: {} {}", pick.name, price_label(pick.price));
            }
        }
        Command::Summary => {
            let summary = session.resolve();
            if json {
                print_json(&summary)?;
            } else {
                println!("{}", breadcrumbs(&summary.answers));
                if summary.rows.is_empty() {
                    println!("No parts found for this combo yet.");
                }
                for row in &summary.rows {
                    match &row.pick {
                        Some(pick) => println!(
                            "{:<28} {:<40} {:>10} {:>8}",
                            row.part,
                            pick.name,
                            price_label(pick.price),
                            grams(pick.weight)
                        ),
                        None => println!("{:<28} (no options)", row.part),
                    }
                }
                println!(
                    "Total weight: {}  {}",
                    weight_label(summary.totals.total_weight),
                    price_label(summary.totals.total_price)
                );
            }
        }
        Command::Custom(CustomCommand::Add(args)) => {
            let draft = CustomPartDraft::new(&args.part, &args.name)
                .price(&args.price)
                .link(&args.link)
                .weight(&args.weight);
            let entry = session.add_custom_part(&draft)?;
            if json {
                print_json(&entry)?;
            } else {
                println!("added {} ({})", entry.name, entry.id);
            }
        }
        Command::Custom(CustomCommand::List) => {
            let entries = session.custom_parts();
            if json {
                print_json(&entries)?;
            } else {
                for e in &entries {
                    println!(
                        "{}  {:<20} {:<30} {}",
                        e.id,
                        e.part,
                        e.name,
                        breadcrumbs(&e.answers)
                    );
                }
            }
        }
        Command::Custom(CustomCommand::Remove { id }) => {
            let removed = session.delete_custom_part(&id)?;
            println!("removed {} ({})", removed.name, removed.id);
        }
        Command::Save { name } => {
            let entry = session.save_build(&name)?;
            if json {
                print_json(&entry)?;
            } else {
                println!("saved {} ({})", entry.name, entry.id);
            }
        }
        Command::Builds => {
            let builds = session.builds();
            if json {
                print_json(&builds)?;
            } else if builds.is_empty() {
                println!("No saved builds yet.");
            } else {
                for b in &builds {
                    println!(
                        "{}  {}  {}\n    {}",
                        b.id,
                        b.created_at.format("%Y-%m-%d %H:%M"),
                        b.display_name(),
                        build_subtitle(b)
                    );
                }
            }
        }
        Command::Load { id } => {
            let entry = session.load_build(&id)?;
            println!("loaded {}", entry.display_name());
        }
        Command::Delete { id } => {
            let removed = session.delete_build(&id)?;
            println!("deleted {}", removed.display_name());
        }
        Command::Restart => {
            session.restart();
            println!("selection cleared");
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct StatusView<'a> {
    step: drone_builder::Step,
    answers: &'a drone_builder::AnswerTuple,
    next: Option<Question>,
    choices: &'a [String],
}

fn status(session: &Configurator<FileStore>, json: bool) -> Result<()> {
    let answers = session.state().answers();
    let next = answers.first_unanswered();
    let choices = next
        .map(|q| session.allowed_choices(q))
        .unwrap_or_default();
    if json {
        return print_json(&StatusView {
            step: session.step(),
            answers,
            next,
            choices,
        });
    }
    let crumbs = breadcrumbs(answers);
    if !crumbs.is_empty() {
        println!("{crumbs}");
    }
    match next {
        Some(q) => println!("next: {q} ({})", choices.join(", ")),
        None => println!("all questions answered; run `summary`"),
    }
    Ok(())
}
