//! Convert command implementation

use std::path::PathBuf;

use crate::cli::commands::load_input;
use crate::cli::error::CliError;
use crate::codec::ODataCodec;
use crate::config::PubFormat;

/// Arguments for the `convert` command
pub struct ConvertArgs {
    /// Payload path, or `-` for stdin
    pub input: String,
    pub from: PubFormat,
    pub to: PubFormat,
    /// Write here instead of stdout
    pub output: Option<PathBuf>,
}

/// Handle the `convert` command
pub fn handle_convert(codec: &ODataCodec, args: &ConvertArgs) -> Result<(), CliError> {
    let content = load_input(&args.input)?;
    let converted = convert_payload(codec, &content, args.from, args.to)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &converted)
                .map_err(|e| CliError::FileWriteError(path.clone(), e.to_string()))?;
            println!("Wrote {} bytes of {} to {}", converted.len(), args.to, path.display());
        }
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&converted)
                .and_then(|_| stdout.write_all(b"\n"))
                .map_err(|e| CliError::FileWriteError("stdout".into(), e.to_string()))?;
        }
    }
    Ok(())
}

/// Decode `content` as `from` and encode it again as `to`
pub fn convert_payload(
    codec: &ODataCodec,
    content: &[u8],
    from: PubFormat,
    to: PubFormat,
) -> Result<Vec<u8>, CliError> {
    let resource = codec.decode(content, from)?;
    Ok(codec.encode(&resource, to)?)
}
