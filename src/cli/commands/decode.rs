//! Decode command implementation

use crate::cli::commands::load_input;
use crate::cli::error::CliError;
use crate::cli::output::{format_compact_entity, format_entity_set, format_pretty_entity};
use crate::codec::ODataCodec;
use crate::config::PubFormat;
use crate::resource::Resource;

/// Arguments for the `decode` command
pub struct DecodeArgs {
    /// Payload path, or `-` for stdin
    pub input: String,
    pub format: PubFormat,
    /// One line per property instead of one line per entity
    pub pretty: bool,
}

/// Handle the `decode` command
pub fn handle_decode(codec: &ODataCodec, args: &DecodeArgs) -> Result<(), CliError> {
    let content = load_input(&args.input)?;
    print!("{}", decode_to_string(codec, &content, args.format, args.pretty)?);
    Ok(())
}

fn decode_to_string(
    codec: &ODataCodec,
    content: &[u8],
    format: PubFormat,
    pretty: bool,
) -> Result<String, CliError> {
    let output = match codec.decode(content, format)? {
        Resource::Entry(entry) => {
            let entity = codec.binder().entity_from_entry(&entry)?;
            if pretty {
                format_pretty_entity(&entity)
            } else {
                format!("{}\n", format_compact_entity(&entity))
            }
        }
        Resource::Feed(feed) => {
            let set = codec.binder().entity_set_from_feed(&feed)?;
            format_entity_set(&set, pretty)
        }
    };
    Ok(output)
}
