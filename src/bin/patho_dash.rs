use std::collections::BTreeSet;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use patho_dash::api::HttpListingClient;
use patho_dash::config::{ConfigLoader, ResolvedConfig};
use patho_dash::domain::{Endpoint, FilterInput, FilterModel, Sex, gene_selection};
use patho_dash::error::DashError;
use patho_dash::export::ExportFormat;
use patho_dash::images::{HttpImageFetcher, bundle_images};
use patho_dash::legacy::LegacySource;
use patho_dash::legacy::atlas::AtlasHttpClient;
use patho_dash::output::{ExportResult, InteractionsResult, JsonOutput, LookupResult, OutputMode};
use patho_dash::paging::{ApiSource, PagedResult, RecordSource};
use patho_dash::session::SessionState;
use patho_dash::store::ExportStore;
use patho_dash::tui::{Browser, write_local_export};

#[derive(Parser)]
#[command(name = "patho-dash")]
#[command(about = "Browse pathology gene-expression samples: filter, page, export")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true, help = "Read per-gene protein atlas XML instead of the sample API")]
    legacy: bool,

    #[command(flatten)]
    filters: FilterArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone)]
struct FilterArgs {
    #[arg(long = "gene", global = true)]
    genes: Vec<String>,

    #[arg(long, global = true)]
    patient_id: Option<String>,

    #[arg(long, global = true, value_enum, default_value = "any")]
    sex: Sex,

    #[arg(long, global = true)]
    age_from: Option<u8>,

    #[arg(long, global = true)]
    age_to: Option<u8>,

    #[arg(long, global = true)]
    staining: Vec<String>,

    #[arg(long, global = true)]
    intensity: Vec<String>,

    #[arg(long, global = true, help = "Quantity category; `None` selects samples without one")]
    quantity: Vec<String>,

    #[arg(long, global = true)]
    location: Option<String>,

    #[arg(long, global = true)]
    tissue: Option<String>,

    #[arg(long, global = true, default_value_t = 1, allow_negative_numbers = true)]
    page: i64,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Interactive results table (default)")]
    Browse,
    #[command(about = "Print one page of results as JSON")]
    List,
    #[command(about = "Write the current page as CSV, XLSX or an image URL manifest")]
    Export(ExportArgs),
    #[command(about = "Download the current page's images into a zip archive")]
    Images,
    #[command(about = "Resolve a gene symbol to its Ensembl id")]
    Lookup(GeneArgs),
    #[command(about = "Print the protein interaction table of a gene")]
    Interactions(GeneArgs),
}

#[derive(Args)]
struct ExportArgs {
    #[arg(long, value_enum)]
    format: ExportFormat,

    #[arg(long, help = "Use the server-side download endpoint instead of the local page")]
    remote: bool,
}

#[derive(Args)]
struct GeneArgs {
    gene: String,
}

/// The record source selected by `--legacy`.
enum Backend {
    Api(ApiSource<HttpListingClient>),
    Legacy(LegacySource<AtlasHttpClient>),
}

impl Backend {
    fn open(legacy: bool, config: &ResolvedConfig) -> Result<Self, DashError> {
        if legacy {
            return open_atlas(config).map(Backend::Legacy);
        }
        let client = HttpListingClient::new(config.require_api_url()?, config.timeout)?;
        Ok(Backend::Api(ApiSource::new(client, config.page_size)))
    }

    fn source(&self) -> &dyn RecordSource {
        match self {
            Backend::Api(source) => source,
            Backend::Legacy(source) => source,
        }
    }
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<DashError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &DashError) -> u8 {
    match error {
        DashError::InvalidFilter(_)
        | DashError::MissingApiUrl
        | DashError::ConfigRead(_)
        | DashError::ConfigParse(_)
        | DashError::GeneNotFound(_) => 2,
        DashError::RequestFailed { .. }
        | DashError::ResultSetTooLarge
        | DashError::Decode(_)
        | DashError::AtlasHttp(_)
        | DashError::AtlasStatus { .. }
        | DashError::AtlasParse(_) => 3,
        DashError::Export(_) | DashError::Filesystem(_) => 1,
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
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let store = ExportStore::new(config.output_dir.clone());

    let command = match (cli.command, output_mode) {
        (Some(command), _) => command,
        (None, OutputMode::Interactive) => Commands::Browse,
        (None, OutputMode::NonInteractive) => {
            return Err(miette::Report::msg(
                "command required (try `patho-dash --help`)",
            ));
        }
    };

    match command {
        Commands::Lookup(args) => {
            let atlas = open_atlas(&config)?;
            let ensembl_id = atlas.lookup().ensembl_for(&args.gene)?.to_string();
            JsonOutput::print_lookup(&LookupResult {
                gene: args.gene,
                ensembl_id,
            })
            .into_diagnostic()
        }
        Commands::Interactions(args) => {
            let atlas = open_atlas(&config)?;
            let interactions = atlas.interactions(&args.gene)?;
            JsonOutput::print_interactions(&InteractionsResult {
                gene: args.gene,
                interactions,
            })
            .into_diagnostic()
        }
        command => {
            let (filters, genes) = collect_filters(&cli.filters)?;
            let backend = Backend::open(cli.legacy, &config)?;
            let page = requested_page(cli.filters.page);
            match command {
                Commands::Browse => {
                    if matches!(output_mode, OutputMode::NonInteractive) {
                        return Err(miette::Report::msg(
                            "browse needs an interactive terminal (use `list` instead)",
                        ));
                    }
                    browse(&backend, &store, filters, genes, cli.filters.page)
                }
                Commands::List => {
                    let result = load_page(&backend, &filters, &genes, page)?;
                    JsonOutput::print_page(&result).into_diagnostic()
                }
                Commands::Export(args) if args.remote => {
                    let Backend::Api(source) = &backend else {
                        return Err(miette::Report::msg(
                            "--remote downloads need the sample API (drop --legacy)",
                        ));
                    };
                    let endpoint = match args.format {
                        ExportFormat::Csv => Endpoint::Csv,
                        ExportFormat::Xlsx => Endpoint::Excel,
                        ExportFormat::Images => Endpoint::Images,
                    };
                    let content = source.download(endpoint, &filters, &genes)?;
                    let path = store.write_export(
                        args.format.file_stem(),
                        args.format.extension(),
                        &content,
                    )?;
                    JsonOutput::print_export(&ExportResult {
                        path: path.to_string(),
                        bytes: content.len(),
                        records: None,
                    })
                    .into_diagnostic()
                }
                Commands::Export(args) => {
                    let result = load_page(&backend, &filters, &genes, page)?;
                    let path = write_local_export(&store, &result.records, args.format)?;
                    let bytes = std::fs::metadata(path.as_std_path())
                        .map(|meta| meta.len() as usize)
                        .into_diagnostic()?;
                    JsonOutput::print_export(&ExportResult {
                        path: path.to_string(),
                        bytes,
                        records: Some(result.records.len()),
                    })
                    .into_diagnostic()
                }
                Commands::Images => {
                    let result = load_page(&backend, &filters, &genes, page)?;
                    let urls = result
                        .records
                        .iter()
                        .flat_map(|record| record.image_urls())
                        .collect::<Vec<_>>();
                    let fetcher = HttpImageFetcher::new(&config.image_base_url, config.timeout)?;
                    let archive = bundle_images(&fetcher, &urls)?;
                    let path = store.write_export("images", "zip", &archive)?;
                    info!(path = %path, images = urls.len(), "image archive written");
                    JsonOutput::print_export(&ExportResult {
                        path: path.to_string(),
                        bytes: archive.len(),
                        records: Some(result.records.len()),
                    })
                    .into_diagnostic()
                }
                Commands::Lookup(_) | Commands::Interactions(_) => Ok(()),
            }
        }
    }
}

fn open_atlas(config: &ResolvedConfig) -> Result<LegacySource<AtlasHttpClient>, DashError> {
    let client = AtlasHttpClient::new(&config.atlas_version, config.timeout)?;
    LegacySource::connect(client, config.page_size)
}

fn collect_filters(args: &FilterArgs) -> Result<(FilterModel, BTreeSet<String>), DashError> {
    let defaults = FilterInput::default();
    let input = FilterInput {
        patient_id: args.patient_id.clone().unwrap_or_default(),
        sex: args.sex,
        age_from: args.age_from.unwrap_or(defaults.age_from),
        age_to: args.age_to.unwrap_or(defaults.age_to),
        staining: args.staining.clone(),
        intensity: args.intensity.clone(),
        quantity: args.quantity.clone(),
        location: args.location.clone().unwrap_or_default(),
        tissue_description: args.tissue.clone().unwrap_or_default(),
    };
    Ok((FilterModel::try_from(input)?, gene_selection(&args.genes)))
}

/// Pages below one are requested as page one; the source clamps the upper end.
fn requested_page(page: i64) -> u32 {
    u32::try_from(page.max(1)).unwrap_or(u32::MAX)
}

fn load_page(
    backend: &Backend,
    filters: &FilterModel,
    genes: &BTreeSet<String>,
    page: u32,
) -> Result<PagedResult, DashError> {
    let outcome = backend.source().assemble(filters, genes, page);
    match outcome.error {
        Some(err) => Err(err),
        None => Ok(outcome.page),
    }
}

fn browse(
    backend: &Backend,
    store: &ExportStore,
    filters: FilterModel,
    genes: BTreeSet<String>,
    page: i64,
) -> miette::Result<()> {
    let source = backend.source();
    let mut session = SessionState::new();
    session.apply(source, filters, genes);
    if page > 1 && session.last_error().is_none() {
        session.goto_page(source, page);
    }
    let mut browser = Browser::new(source, store, session);
    browser.run()
}
