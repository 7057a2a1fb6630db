use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use glossary_browser::app::{App, HiddenResult, Intent, LoadKind, WorksResult};
use glossary_browser::chunk::HttpChunkSource;
use glossary_browser::config::{ConfigLoader, ConfigOverrides, ResolvedConfig};
use glossary_browser::domain::{WorkFilter, parse_entry_id};
use glossary_browser::error::GlossaryError;
use glossary_browser::loader::DataLoader;
use glossary_browser::mutation::MutationTracker;
use glossary_browser::output::{JsonOutput, OutputMode};
use glossary_browser::store::Store;
use glossary_browser::theme::{EnvThemeObserver, initial_theme};
use glossary_browser::tui::Tui;
use glossary_browser::version::VersionGate;

type GlossaryApp = App<HttpChunkSource, Store, Store>;

#[derive(Parser)]
#[command(name = "glossary")]
#[command(about = "Browse, search and export translation glossaries")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    base_url: Option<String>,

    #[arg(long, global = true)]
    cache_dir: Option<String>,

    #[arg(long, global = true)]
    export_dir: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Open the interactive browser")]
    Browse,
    #[command(about = "Search Chinese and English terms")]
    Search(SearchArgs),
    #[command(about = "List novels that have visible entries")]
    Works,
    #[command(about = "Reload the glossary from the network and rewrite the cache")]
    Refresh,
    #[command(about = "Export the filtered view as CSV")]
    Export(ExportArgs),
    #[command(about = "Hide an entry from every view")]
    Hide(HideArgs),
    #[command(about = "Show all hidden entries again")]
    UnhideAll,
    #[command(about = "List hidden entry ids")]
    Hidden,
    #[command(about = "Write glossary_updated.json without the given entries")]
    Prune(PruneArgs),
}

#[derive(Args)]
struct SearchArgs {
    term: String,

    #[arg(long)]
    work: Option<String>,

    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args)]
struct ExportArgs {
    #[arg(long)]
    work: Option<String>,

    #[arg(long)]
    search: Option<String>,
}

#[derive(Args)]
struct HideArgs {
    id: String,
}

#[derive(Args)]
struct PruneArgs {
    #[arg(required = true)]
    ids: Vec<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<GlossaryError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &GlossaryError) -> u8 {
    match error {
        GlossaryError::ConfigRead(_)
        | GlossaryError::ConfigParse(_)
        | GlossaryError::InvalidEntryId(_) => 2,
        err if err.is_network() => 3,
        err if err.is_storage() => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::resolve(
        cli.config.as_deref(),
        ConfigOverrides {
            base_url: cli.base_url,
            cache_dir: cli.cache_dir,
            export_dir: cli.export_dir,
        },
    )?;
    let mut app = build_app(&config)?;

    match cli.command {
        None | Some(Commands::Browse) => match output_mode {
            OutputMode::Interactive => Tui::new().run(&mut app),
            OutputMode::NonInteractive => {
                app.run_load(LoadKind::Initialize, &JsonOutput)?;
                JsonOutput::print_load(&app.summary()).into_diagnostic()
            }
        },
        Some(Commands::Search(args)) => run_search(args, app),
        Some(Commands::Works) => {
            app.run_load(LoadKind::Initialize, &JsonOutput)?;
            let works = app.works().to_vec();
            JsonOutput::print_works(&WorksResult { works }).into_diagnostic()
        }
        Some(Commands::Refresh) => {
            app.run_load(LoadKind::Refresh, &JsonOutput)?;
            JsonOutput::print_load(&app.summary()).into_diagnostic()
        }
        Some(Commands::Export(args)) => run_export(args, app),
        Some(Commands::Hide(args)) => {
            let id = parse_entry_id(&args.id)?;
            app.hide(id)?;
            print_hidden(&app)
        }
        Some(Commands::UnhideAll) => {
            app.unhide_all()?;
            print_hidden(&app)
        }
        Some(Commands::Hidden) => print_hidden(&app),
        Some(Commands::Prune(args)) => run_prune(args, app),
    }
}

fn build_app(config: &ResolvedConfig) -> Result<GlossaryApp, GlossaryError> {
    let store = match &config.cache_dir {
        Some(dir) => Store::new_with_root(dir.clone()),
        None => Store::new()?,
    };
    if let Err(err) = store.ensure_root() {
        warn!(error = %err, "cache directory unavailable, continuing without it");
    }

    let source = HttpChunkSource::new(
        &config.base_url,
        &config.data_version,
        config.request_timeout,
    )?;
    let loader = DataLoader::new(
        source,
        store.clone(),
        store.clone(),
        VersionGate::new(config.data_version.clone()),
    );
    let mutations = MutationTracker::load(store);
    let theme = initial_theme(config.theme, &EnvThemeObserver);
    Ok(App::new(
        loader,
        mutations,
        theme,
        config.page_size,
        config.export_dir.clone(),
    ))
}

fn apply_filters(app: &mut GlossaryApp, work: Option<String>, search: Option<String>) {
    if let Some(work) = work {
        // WorkFilter parsing never fails.
        let filter = work.parse::<WorkFilter>().unwrap_or_default();
        app.dispatch(Intent::SelectWork(filter));
    }
    if let Some(search) = search {
        app.dispatch(Intent::SetSearch(search));
    }
}

fn run_search(args: SearchArgs, mut app: GlossaryApp) -> miette::Result<()> {
    app.run_load(LoadKind::Initialize, &JsonOutput)?;
    apply_filters(&mut app, args.work, Some(args.term));
    let mut result = app.search_result();
    if let Some(limit) = args.limit {
        result.entries.truncate(limit);
        result.shown = result.entries.len();
    }
    JsonOutput::print_search(&result).into_diagnostic()
}

fn run_export(args: ExportArgs, mut app: GlossaryApp) -> miette::Result<()> {
    app.run_load(LoadKind::Initialize, &JsonOutput)?;
    apply_filters(&mut app, args.work, args.search);
    let result = app.export_csv()?;
    JsonOutput::print_export(&result).into_diagnostic()
}

fn run_prune(args: PruneArgs, mut app: GlossaryApp) -> miette::Result<()> {
    let ids = args
        .ids
        .iter()
        .map(|value| parse_entry_id(value))
        .collect::<Result<Vec<_>, GlossaryError>>()?;
    app.run_load(LoadKind::Initialize, &JsonOutput)?;
    for id in ids {
        if !app.mutations().is_pending(id) {
            app.dispatch(Intent::ToggleDelete(id));
        }
    }
    let result = app.confirm_deletion()?;
    JsonOutput::print_export(&result).into_diagnostic()
}

fn print_hidden(app: &GlossaryApp) -> miette::Result<()> {
    let hidden = app.mutations().hidden().iter().copied().collect();
    JsonOutput::print_hidden(&HiddenResult { hidden }).into_diagnostic()
}
