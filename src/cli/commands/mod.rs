//! CLI command implementations

pub mod convert;
pub mod decode;
pub mod stream;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::error::CliError;
use crate::codec::ODataCodec;
use crate::config::CodecConfig;
use crate::edm::EdmMetadata;

/// Load input content from file or stdin
pub fn load_input(input: &str) -> Result<Vec<u8>, CliError> {
    if input == "-" {
        let mut content = Vec::new();
        std::io::stdin()
            .read_to_end(&mut content)
            .map_err(|e| CliError::InvalidArgument(format!("Failed to read stdin: {}", e)))?;
        Ok(content)
    } else {
        let path = PathBuf::from(input);
        std::fs::read(&path).map_err(|e| CliError::FileReadError(path, e.to_string()))
    }
}

/// Open input as a reader without buffering it whole
pub fn open_input(input: &str) -> Result<Box<dyn Read>, CliError> {
    if input == "-" {
        Ok(Box::new(std::io::stdin()))
    } else {
        let path = PathBuf::from(input);
        let file =
            std::fs::File::open(&path).map_err(|e| CliError::FileReadError(path, e.to_string()))?;
        Ok(Box::new(file))
    }
}

/// Build a codec, attaching EDMX metadata when given
pub fn build_codec(config: CodecConfig, metadata: Option<&Path>) -> Result<ODataCodec, CliError> {
    let codec = ODataCodec::new(config);
    let Some(path) = metadata else {
        return Ok(codec);
    };

    let xml = std::fs::read_to_string(path)
        .map_err(|e| CliError::FileReadError(path.to_path_buf(), e.to_string()))?;
    let metadata = EdmMetadata::parse(&xml)?;
    if metadata.version() != codec.config().version {
        tracing::warn!(
            "Metadata is OData {} but the codec is configured for {}",
            metadata.version(),
            codec.config().version
        );
    }
    Ok(codec.with_resolver(Arc::new(metadata)))
}
