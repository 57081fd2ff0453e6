use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use qabase::config::{AllureConfig, ConfigProvider, RestConfig, WebUiConfig};
use qabase::report::{downloads_dir, ArchiveFormat, ReportArchiver};
use qabase::support::OsInfo;

#[derive(Parser)]
#[command(name = "qabase")]
#[command(about = "Test-automation helpers: report archiving and config inspection")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress an Allure results directory
    Archive {
        /// Project root holding the results directory
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Results directory, relative to the root
        #[arg(long, default_value = "allure-results")]
        results: PathBuf,

        /// Output directory (default: ~/Downloads)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = Format::TarGz)]
        format: Format,
    },

    /// Print the resolved configuration mappings as YAML
    Config {
        /// Extra YAML file layered over discovered ones
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Print host OS details
    Info,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Zip,
    TarGz,
}

impl From<Format> for ArchiveFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Zip => ArchiveFormat::Zip,
            Format::TarGz => ArchiveFormat::TarGz,
        }
    }
}

#[derive(Serialize)]
struct ResolvedConfig {
    webui: WebUiConfig,
    rest: RestConfig,
    allure: AllureConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = qabase::logging::init(cli.verbose) {
        eprintln!("{}", e);
    }

    let result = run(cli);
    qabase::logging::shutdown();

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, "qabase failed");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Archive {
            root,
            results,
            out_dir,
            format,
        } => archive(root, results, out_dir, format),
        Commands::Config { file } => print_config(file),
        Commands::Info => print_info(),
    }
}

fn archive(
    root: PathBuf,
    results: PathBuf,
    out_dir: Option<PathBuf>,
    format: Format,
) -> anyhow::Result<bool> {
    let out_dir = match out_dir {
        Some(dir) => dir,
        None => downloads_dir()?,
    };

    let archiver = ReportArchiver::new(root)
        .with_results_dir(results)
        .with_out_dir(out_dir)
        .with_format(format.into());

    match archiver.try_archive()? {
        Some(path) => {
            println!("{}", path.display());
            Ok(true)
        }
        None => {
            eprintln!(
                "No results found at {}",
                archiver.results_dir().display()
            );
            Ok(false)
        }
    }
}

fn print_config(file: Option<PathBuf>) -> anyhow::Result<bool> {
    let mut builder = ConfigProvider::builder()
        .add_default_sources()
        .add_discovered_sources();
    if let Some(file) = file {
        builder = builder.with_file(file);
    }
    let provider = builder
        .with_mapping::<WebUiConfig>()
        .with_mapping::<RestConfig>()
        .with_mapping::<AllureConfig>()
        .build()?;

    let mut rest: RestConfig = provider.mapping()?;
    if rest.auth_token.is_some() {
        rest.auth_token = Some("****".to_string());
    }
    let resolved = ResolvedConfig {
        webui: provider.mapping()?,
        rest,
        allure: provider.mapping()?,
    };
    print!("{}", serde_yaml::to_string(&resolved)?);
    Ok(true)
}

fn print_info() -> anyhow::Result<bool> {
    let info = OsInfo::detect();
    print!("{}", serde_yaml::to_string(&info)?);
    Ok(true)
}
