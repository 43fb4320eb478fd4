use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use avhrr_metadata_parser::app::{App, MetadataSource, RunOptions, read_input_list};
use avhrr_metadata_parser::audit::AuditLog;
use avhrr_metadata_parser::config::ConfigLoader;
use avhrr_metadata_parser::error::AvhrrError;
use avhrr_metadata_parser::fetch::{CatalogueHttpClient, prepare_catalogue};
use avhrr_metadata_parser::output::{OutputMode, sink_for};
use avhrr_metadata_parser::store::Store;

#[derive(Parser)]
#[command(name = "avhrr-mp")]
#[command(
    about = "Extract metadata for NOAA AVHRR products and optionally reorganize them into a dataset/date tree"
)]
#[command(version)]
struct Cli {
    /// Remote location of the zipped NOAA satellites catalogue
    #[arg(long = "noaa-mtd", visible_alias = "noaa_mtd")]
    noaa_mtd: Option<String>,

    /// Output folder for logs, the catalogue and reorganized products
    #[arg(long)]
    output: PathBuf,

    /// File listing one product path per line
    #[arg(long = "avhrr-list", visible_alias = "avhrr_list")]
    avhrr_list: Option<PathBuf>,

    /// Single product path to process (ignored when --avhrr-list is given)
    #[arg(long = "avhrr-file", visible_alias = "avhrr_file")]
    avhrr_file: Option<PathBuf>,

    /// Dataset name to use instead of the derived one
    #[arg(long)]
    ds: Option<String>,

    /// Organize products into <output>/<dataset>/<year>/<month>/<day>
    #[arg(short = 'O')]
    organize: bool,

    /// Separate products without footprint into a _NOFP dataset
    #[arg(short = 'f')]
    separate_no_footprint: bool,

    /// Remove the product directory after archiving it
    #[arg(short = 'r')]
    remove: bool,

    /// Read the product's embedded .ief file instead of the catalogue CSVs
    #[arg(short = 'd')]
    direct: bool,

    /// Export a CSV list of processed and unprocessed products
    #[arg(short = 'l')]
    list_csv: bool,

    /// JSON file overriding resolver settings
    #[arg(long)]
    config: Option<String>,

    /// Print descriptors as JSON instead of key=value lines
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<AvhrrError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &AvhrrError) -> u8 {
    match error {
        AvhrrError::ConfigRead(_)
        | AvhrrError::ConfigParse(_)
        | AvhrrError::InvalidPattern { .. } => 2,
        AvhrrError::FetchFailed(_) | AvhrrError::FetchStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    std::fs::create_dir_all(&cli.output).into_diagnostic()?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(cli.output.join("avhrr_parser.log"))
        .into_diagnostic()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();

    info!("------STARTED RUN------");
    let result = process(cli);
    info!("------ENDED RUN------");
    result
}

fn process(cli: Cli) -> miette::Result<()> {
    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(url) = cli.noaa_mtd {
        config.catalogue_url = url;
    }

    let inputs = match (&cli.avhrr_list, &cli.avhrr_file) {
        (Some(list), _) => read_input_list(list)?,
        (None, Some(file)) => vec![file.clone()],
        (None, None) => {
            return Err(miette::Report::msg(
                "one of --avhrr-list or --avhrr-file is required",
            ));
        }
    };

    let source = if cli.direct {
        MetadataSource::Embedded
    } else {
        let client = CatalogueHttpClient::new()?;
        MetadataSource::Catalogue(prepare_catalogue(&client, &config, &cli.output)?)
    };

    let store = Store::from_path(&cli.output)?;
    store.ensure_root()?;
    let options = RunOptions {
        dataset_override: cli.ds,
        reorganize: cli.organize,
        separate_no_footprint: cli.separate_no_footprint,
        remove_source: cli.remove,
    };
    let mut app = App::new(config, source, store, options);
    if cli.list_csv {
        let audit = AuditLog::create_in(&cli.output, chrono::Local::now())?;
        info!("Recording products into {}", audit.path().display());
        app = app.with_audit(audit);
    }

    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };
    let summary = app.run(&inputs, sink_for(mode).as_ref())?;
    info!(
        resolved = summary.resolved(),
        unresolved = summary.unresolved(),
        duplicates = summary.duplicates,
        "run finished"
    );
    Ok(())
}
