// Console shell for the diagnostic session engine.
// The engine itself is UI-free; this binary is the imperative layer that
// reads clinician input, drives the transitions, and prints the report.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;

use sensory_diagnostic::{
    Catalog, Phase, QuizMode, ReportAggregator, Response, SessionEngine, SqliteStore,
    BIRTH_DATE_FORMAT,
};

const DEFAULT_DB: &str = "diagnostic.db";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() > 1 && args[1] == "seed" {
        let seed_dir = args
            .get(2)
            .context("Usage: sensory-diagnostic seed <catalog-dir> [db-path]")?;
        let db_path = args.get(3).map(String::as_str).unwrap_or(DEFAULT_DB);
        run_seed(Path::new(seed_dir), Path::new(db_path))?;
    } else {
        let db_path = args.get(1).map(String::as_str).unwrap_or(DEFAULT_DB);
        run_interview(Path::new(db_path))?;
    }

    Ok(())
}

fn run_seed(seed_dir: &Path, db_path: &Path) -> Result<()> {
    println!("🗄️  Seeding catalog from {:?}", seed_dir);

    let store = SqliteStore::open(db_path)?;
    let (questions, equipment, links) = store.seed_catalog_dir(seed_dir)?;

    println!("✓ Questions: {}", questions);
    println!("✓ Equipment: {}", equipment);
    println!("✓ Links: {}", links);
    println!("✓ Catalog ready in {:?}", db_path);
    Ok(())
}

fn run_interview(db_path: &Path) -> Result<()> {
    println!("🩺 Sensory Diagnostic v{}", sensory_diagnostic::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let store = SqliteStore::open(db_path)?;
    if store.catalog_is_empty()? {
        eprintln!("❌ Catalog is empty!");
        eprintln!("   Run: sensory-diagnostic seed <catalog-dir>");
        eprintln!("   to load questions and equipment first.");
        std::process::exit(1);
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut engine = SessionEngine::new(&store, &store);

    loop {
        run_session(&mut engine, &store, &mut lines)?;

        let again = prompt(&mut lines, "\nStart a new session? [y/N] ")?;
        if !again.eq_ignore_ascii_case("y") {
            break;
        }
        engine.restart();
    }

    println!("\n✅ Done");
    Ok(())
}

fn run_session(
    engine: &mut SessionEngine<'_>,
    store: &SqliteStore,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<()> {
    // --- Intake ---
    while engine.phase() == Phase::Intake {
        let input = prompt(lines, "\nPatient birth date (DD/MM/YYYY): ")?;
        let birth_date = match NaiveDate::parse_from_str(&input, BIRTH_DATE_FORMAT) {
            Ok(d) => d,
            Err(_) => {
                println!("❌ Not a valid date, try again");
                continue;
            }
        };
        if let Err(e) = engine.submit_patient(birth_date) {
            println!("❌ {}", e);
        }
    }

    let age = engine.patient().map(|p| p.age_at_exam).unwrap_or_default();
    println!("\n🎯 Patient is {} years old", age);

    // --- Mode selection ---
    while engine.phase() == Phase::ModeSelection {
        let categories = store.list_categories()?;

        println!("Choose the analysis scope:");
        println!("  0) Full analysis (every category)");
        for (i, cat) in categories.iter().enumerate() {
            println!("  {}) {}", i + 1, cat);
        }

        let choice = prompt(lines, "Choice: ")?;
        let mode = match choice.parse::<usize>() {
            Ok(0) => QuizMode::All,
            Ok(n) if n <= categories.len() => QuizMode::Category(categories[n - 1].clone()),
            _ => {
                println!("❌ Pick a number from the list");
                continue;
            }
        };

        if let Err(e) = engine.start_quiz(mode) {
            println!("❌ {}", e);
        }
    }

    // --- Interview ---
    while engine.phase() == Phase::Interview {
        let question = engine
            .state()
            .current_question()
            .cloned()
            .context("interview phase without a pending question")?;
        let total = engine.state().questions.len();
        let index = engine.state().cursor + 1;

        println!("\n[{}/{}] Category: {}", index, total, question.category);
        println!("   {}", question.text);

        let notes = if question.precision_required {
            prompt(lines, "   Notes: ")?
        } else {
            String::new()
        };

        let response = loop {
            let input = prompt(lines, "   [t]rue / [f]alse / [u]nknown: ")?;
            match parse_response(&input) {
                Some(r) => break r,
                None => println!("   ❌ Answer t, f, or u"),
            }
        };

        if let Err(e) = engine.answer(response, &notes) {
            // Storage failures leave the step pending; the clinician can retry
            println!("❌ {}", e);
        }
    }

    // --- Summary ---
    let patient = engine
        .patient()
        .context("summary phase without a patient")?
        .clone();
    let payload = ReportAggregator::new().build(&patient, engine.confirmed(), store)?;

    println!("\n📊 Results");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    print!("{}", payload.render_text());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ Answers persisted: {}", store.answer_count(patient.id)?);
    println!("\nReport payload (JSON):");
    println!("{}", serde_json::to_string_pretty(&payload)?);

    Ok(())
}

fn parse_response(input: &str) -> Option<Response> {
    match input.to_ascii_lowercase().as_str() {
        "t" | "true" => Some(Response::True),
        "f" | "false" => Some(Response::False),
        "u" | "unknown" => Some(Response::Unknown),
        _ => None,
    }
}

fn prompt(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    message: &str,
) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let line = lines
        .next()
        .context("stdin closed")?
        .context("failed to read input")?;
    Ok(line.trim().to_string())
}
