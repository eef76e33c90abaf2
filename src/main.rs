//! Command line front end for dance analysis.

use std::{path::PathBuf, sync::Arc};

use dancecoach::{
    analysis_api::{AnalysisClient, AnalysisOptions, Difficulty, VideoFile},
    config::{self, AppConfig},
    history::HistoryLog,
    local_store::LocalStore,
    logging, report,
    session::{SessionController, SessionOutcome, SessionSettings},
};

fn main() {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(command) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    let config = config::load_or_default().map_err(|err| err.to_string())?;
    match command {
        Command::Analyze(options) => analyze(&config, options),
        Command::Health { base_url } => health(&config, base_url),
        Command::Difficulty { level, base_url } => difficulty(config, level, base_url),
        Command::History { json, clear } => history(json, clear),
        Command::Config => show_config(&config),
    }
}

#[derive(Debug, PartialEq)]
enum Command {
    Analyze(AnalyzeOptions),
    Health { base_url: Option<String> },
    Difficulty { level: Difficulty, base_url: Option<String> },
    History { json: bool, clear: bool },
    Config,
}

#[derive(Debug, Default, PartialEq)]
struct AnalyzeOptions {
    original: Option<PathBuf>,
    user: Option<PathBuf>,
    difficulty: Option<Difficulty>,
    fps: Option<f32>,
    base_url: Option<String>,
    json: bool,
}

fn analyze(config: &AppConfig, options: AnalyzeOptions) -> Result<(), String> {
    let original = options
        .original
        .ok_or_else(|| "--original is required".to_string())?;
    let user = options.user.ok_or_else(|| "--user is required".to_string())?;
    let original = VideoFile::open(original).map_err(|err| err.to_string())?;
    let user = VideoFile::open(user).map_err(|err| err.to_string())?;

    let client = client_for(config, options.base_url.as_deref())?;
    let store = LocalStore::open_default().map_err(|err| err.to_string())?;
    let mut session = SessionController::new(
        Arc::new(client),
        store,
        SessionSettings::from_config(config),
    );
    let request = AnalysisOptions {
        difficulty: Some(options.difficulty.unwrap_or(config.analysis.difficulty)),
        fps: Some(options.fps.unwrap_or(config.analysis.fps)),
    };
    eprintln!(
        "Analyzing {} against {}...",
        user.file_name(),
        original.file_name()
    );
    let outcome = session
        .run_analysis(original, user, request)
        .map_err(|err| err.to_string())?;

    match outcome {
        SessionOutcome::Completed(entry) => {
            if options.json {
                let text = serde_json::to_string_pretty(&entry)
                    .map_err(|err| format!("Failed to encode results: {err}"))?;
                println!("{text}");
                return Ok(());
            }
            if let Some(result) = session.result() {
                print!("{}", report::render_summary(result));
                println!();
            }
            print!("{}", report::render_keyframes(&entry.keyframes));
            Ok(())
        }
        SessionOutcome::Failed(message) => Err(message),
        SessionOutcome::Cancelled => Err("Analysis cancelled".to_string()),
    }
}

fn health(config: &AppConfig, base_url: Option<String>) -> Result<(), String> {
    let client = client_for(config, base_url.as_deref())?;
    if client.check_health() {
        println!("Analysis API at {} is healthy", client.base_url());
        Ok(())
    } else {
        Err(format!("Analysis API at {} is not reachable", client.base_url()))
    }
}

fn difficulty(
    mut config: AppConfig,
    level: Difficulty,
    base_url: Option<String>,
) -> Result<(), String> {
    config.analysis.difficulty = level;
    config::save(&config).map_err(|err| err.to_string())?;
    println!("Default difficulty set to {level}");
    let client = client_for(&config, base_url.as_deref())?;
    client
        .update_difficulty(level)
        .map_err(|err| format!("Saved locally, but the backend update failed: {err}"))?;
    println!("Backend difficulty updated");
    Ok(())
}

fn history(json: bool, clear: bool) -> Result<(), String> {
    let store = LocalStore::open_default().map_err(|err| err.to_string())?;
    let log = HistoryLog::new(store);
    if clear {
        log.clear().map_err(|err| err.to_string())?;
        println!("History cleared");
        return Ok(());
    }
    let entries = log.entries();
    if json {
        let text = serde_json::to_string_pretty(&entries)
            .map_err(|err| format!("Failed to encode history: {err}"))?;
        println!("{text}");
    } else {
        print!("{}", report::render_history(&entries));
    }
    Ok(())
}

fn show_config(config: &AppConfig) -> Result<(), String> {
    let path = config::config_path().map_err(|err| err.to_string())?;
    let text = toml::to_string_pretty(config)
        .map_err(|err| format!("Failed to encode settings: {err}"))?;
    println!("# {}", path.display());
    print!("{text}");
    Ok(())
}

fn client_for(config: &AppConfig, base_url: Option<&str>) -> Result<AnalysisClient, String> {
    let mut settings = config.api.clone();
    if let Some(url) = base_url {
        settings.base_url = url.to_string();
    }
    AnalysisClient::from_settings(&settings).map_err(|err| err.to_string())
}

fn parse_args(args: Vec<String>) -> Result<Option<Command>, String> {
    let Some((name, rest)) = args.split_first() else {
        println!("{}", help_text());
        return Ok(None);
    };
    let mut analyze = AnalyzeOptions::default();
    let mut base_url = None;
    let mut json = false;
    let mut clear = false;
    let mut positional = Vec::new();
    let mut idx = 0usize;
    while idx < rest.len() {
        match rest[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--original" => {
                idx += 1;
                let value = rest
                    .get(idx)
                    .ok_or_else(|| "--original requires a value".to_string())?;
                analyze.original = Some(PathBuf::from(value));
            }
            "--user" => {
                idx += 1;
                let value = rest
                    .get(idx)
                    .ok_or_else(|| "--user requires a value".to_string())?;
                analyze.user = Some(PathBuf::from(value));
            }
            "--difficulty" => {
                idx += 1;
                let value = rest
                    .get(idx)
                    .ok_or_else(|| "--difficulty requires a value".to_string())?;
                analyze.difficulty = Some(value.parse()?);
            }
            "--fps" => {
                idx += 1;
                let value = rest
                    .get(idx)
                    .ok_or_else(|| "--fps requires a value".to_string())?;
                let fps: f32 = value
                    .parse()
                    .map_err(|_| format!("Invalid --fps value: {value}"))?;
                if !fps.is_finite() || fps <= 0.0 {
                    return Err("--fps must be greater than 0".to_string());
                }
                analyze.fps = Some(fps);
            }
            "--base-url" => {
                idx += 1;
                let value = rest
                    .get(idx)
                    .ok_or_else(|| "--base-url requires a value".to_string())?;
                base_url = Some(value.to_string());
            }
            "--json" => json = true,
            "--clear" => clear = true,
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown argument: {arg}\n\n{}", help_text()));
            }
            value => positional.push(value.to_string()),
        }
        idx += 1;
    }

    let command = match name.as_str() {
        "-h" | "--help" | "help" => {
            println!("{}", help_text());
            return Ok(None);
        }
        "analyze" => {
            analyze.base_url = base_url;
            analyze.json = json;
            Command::Analyze(analyze)
        }
        "health" => Command::Health { base_url },
        "difficulty" => {
            let level = positional
                .first()
                .ok_or_else(|| "difficulty requires a level".to_string())?
                .parse()?;
            Command::Difficulty { level, base_url }
        }
        "history" => Command::History { json, clear },
        "config" => Command::Config,
        unknown => return Err(format!("Unknown command: {unknown}\n\n{}", help_text())),
    };
    Ok(Some(command))
}

fn help_text() -> String {
    [
        "dancecoach",
        "",
        "Compares a dance performance against a reference video.",
        "",
        "Usage:",
        "  dancecoach analyze --original <path> --user <path> [--difficulty <level>] [--fps <n>] [--json]",
        "  dancecoach health",
        "  dancecoach difficulty <beginner|intermediate|advanced>",
        "  dancecoach history [--json] [--clear]",
        "  dancecoach config",
        "",
        "Options:",
        "  --original <path>    Reference performance video.",
        "  --user <path>        Your attempt.",
        "  --difficulty <lvl>   Angle tolerance level (defaults to the saved setting).",
        "  --fps <n>            Frames per second to sample (defaults to the saved setting).",
        "  --json               Print JSON instead of text.",
        "  --clear              Delete all history entries.",
        "  --base-url <url>     Override the configured API base URL.",
        "  -h, --help           Show this help.",
    ]
    .join("\n")
}
