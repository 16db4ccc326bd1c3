use clap::Parser;
use drone_builder::{AnswerTuple, Catalog, Config, OptionResolver, Question, SelectionState};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Loads a parts catalog and reports what every answer combination offers.
#[derive(Parser, Debug)]
#[command(name = "catalog_check", version)]
struct Args {
    /// Catalog file (.json, .yaml); defaults to DRONE_BUILDER_CATALOG or the bundled catalog.
    path: Option<PathBuf>,

    /// Only list combinations that offer no parts at all.
    #[arg(long)]
    gaps: bool,
}

fn main() -> ExitCode {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("drone_builder=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(path) = args.path {
        config.catalog_path = Some(path);
    }
    let catalog = match config.load_catalog() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load catalog: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut combos = 0usize;
    let mut gaps = 0usize;
    for answers in answer_tuples(&catalog) {
        combos += 1;
        let parts = catalog.parts_for(&answers);
        if parts.is_empty() {
            gaps += 1;
        } else if args.gaps {
            continue;
        }
        println!(
            "{} / {} / {}",
            answers.size.as_deref().unwrap_or_default(),
            answers.style.as_deref().unwrap_or_default(),
            answers.video.as_deref().unwrap_or_default()
        );
        let resolver = OptionResolver::new(&catalog, &[]);
        for part in &parts {
            let count = resolver.options_for(part, &answers).len();
            println!("    {part:<28} {count} option(s)");
        }
    }
    println!(
        "{combos} combination(s), {gaps} without parts, {} row(s), {} part categories",
        catalog.rows.len(),
        catalog.all_parts().len()
    );
    ExitCode::SUCCESS
}

/// Every answer tuple reachable through the question flow.
fn answer_tuples(catalog: &Catalog) -> Vec<AnswerTuple> {
    let questions = &catalog.questions;
    let mut out = Vec::new();
    for size in &questions.sizes {
        let mut state = SelectionState::new();
        if state.set_answer(Question::Size, size, questions).is_err() {
            continue;
        }
        for style in questions.allowed_styles(Some(size)) {
            for video in questions.allowed_videos(Some(size)) {
                let mut tuple = state.clone();
                let answered = tuple
                    .set_answer(Question::Style, style, questions)
                    .and_then(|_| tuple.set_answer(Question::Video, video, questions));
                if answered.is_ok() {
                    out.push(tuple.answers().clone());
                }
            }
        }
    }
    out
}
