//! odata-codec: decode, stream and convert OData payloads from the command line

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use odata_codec_sdk::cli::CliError;
use odata_codec_sdk::cli::commands::convert::{ConvertArgs, handle_convert};
use odata_codec_sdk::cli::commands::decode::{DecodeArgs, handle_decode};
use odata_codec_sdk::cli::commands::stream::{StreamArgs, handle_stream};
use odata_codec_sdk::cli::commands::build_codec;
use odata_codec_sdk::{CodecConfig, ODataVersion, PubFormat};

#[derive(Parser)]
#[command(name = "odata-codec", version, about = "Read and write OData v3/v4 payloads")]
struct Cli {
    /// Codec configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Protocol version, overriding the configuration file
    #[arg(long = "odata-version", global = true)]
    odata_version: Option<ODataVersion>,

    /// EDMX document used to type unannotated properties
    #[arg(long, global = true)]
    metadata: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode an entry or feed and print its entities
    Decode {
        /// Payload file, or - for stdin
        #[arg(default_value = "-")]
        input: String,
        #[arg(short, long, default_value = "json")]
        format: PubFormat,
        #[arg(long)]
        pretty: bool,
    },
    /// Iterate the entities of a feed without loading it whole
    Stream {
        /// Feed file, or - for stdin
        #[arg(default_value = "-")]
        input: String,
        #[arg(short, long, default_value = "json")]
        format: PubFormat,
        #[arg(long)]
        pretty: bool,
        /// Stop after this many entities
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Re-encode a payload in another format
    Convert {
        /// Payload file, or - for stdin
        #[arg(default_value = "-")]
        input: String,
        #[arg(long)]
        from: PubFormat,
        #[arg(long)]
        to: PubFormat,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<CodecConfig> {
    let mut config = match &cli.config {
        Some(path) => CodecConfig::from_file(path)
            .map_err(CliError::ConfigError)
            .with_context(|| format!("Loading {}", path.display()))?,
        None => CodecConfig::default(),
    };
    if let Some(version) = cli.odata_version {
        config.version = version;
    }
    Ok(config)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    tracing::debug!("Using OData {}", config.version);
    let codec = build_codec(config, cli.metadata.as_deref())?;

    match cli.command {
        Commands::Decode {
            input,
            format,
            pretty,
        } => handle_decode(
            &codec,
            &DecodeArgs {
                input,
                format,
                pretty,
            },
        )?,
        Commands::Stream {
            input,
            format,
            pretty,
            limit,
        } => handle_stream(
            &codec,
            &StreamArgs {
                input,
                format,
                pretty,
                limit,
            },
        )?,
        Commands::Convert {
            input,
            from,
            to,
            output,
        } => handle_convert(
            &codec,
            &ConvertArgs {
                input,
                from,
                to,
                output,
            },
        )?,
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<CliError>() {
                Some(cli_error) => eprintln!("Error: {}", cli_error.user_message()),
                None => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}
