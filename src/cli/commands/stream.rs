//! Stream command implementation

use std::io::{Read, Write};

use crate::cli::commands::open_input;
use crate::cli::error::CliError;
use crate::cli::output::{format_compact_entity, format_pretty_entity, format_set_summary};
use crate::codec::ODataCodec;
use crate::config::PubFormat;

/// Arguments for the `stream` command
pub struct StreamArgs {
    /// Feed path, or `-` for stdin
    pub input: String,
    pub format: PubFormat,
    pub pretty: bool,
    /// Stop after this many entities
    pub limit: Option<usize>,
}

/// Handle the `stream` command
pub fn handle_stream(codec: &ODataCodec, args: &StreamArgs) -> Result<(), CliError> {
    let reader = open_input(&args.input)?;
    let mut stdout = std::io::stdout().lock();
    stream_to(codec, reader, args, &mut stdout)
}

fn stream_to<R: Read, W: Write>(
    codec: &ODataCodec,
    reader: R,
    args: &StreamArgs,
    out: &mut W,
) -> Result<(), CliError> {
    let write_err = |e: std::io::Error| CliError::FileWriteError("stdout".into(), e.to_string());
    let mut entities = codec.stream_entities(reader, args.format);

    while entities.has_next()? {
        if args.limit.is_some_and(|limit| entities.yielded() >= limit) {
            tracing::info!("Stopping after {} entities", entities.yielded());
            entities.close();
            return Ok(());
        }
        let entity = entities.next_entity()?;
        if args.pretty {
            write!(out, "{}", format_pretty_entity(&entity)).map_err(write_err)?;
        } else {
            writeln!(out, "{}", format_compact_entity(&entity)).map_err(write_err)?;
        }
    }

    let next = entities.next_link()?;
    let count = entities.inline_count()?;
    let summary = format_set_summary(entities.yielded(), count, next.as_deref());
    write!(out, "{}", summary).map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(limit: Option<usize>) -> StreamArgs {
        StreamArgs {
            input: "-".to_string(),
            format: PubFormat::Json,
            pretty: false,
            limit,
        }
    }

    const FEED: &[u8] = br#"{"odata.count":"3","value":[{"Id":1},{"Id":2},{"Id":3}],"odata.nextLink":"http://host/svc/P?$skip=3"}"#;

    #[test]
    fn test_stream_whole_feed() {
        let mut out = Vec::new();
        stream_to(&ODataCodec::default(), FEED, &args(None), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("(untyped) Id=3"));
        assert!(text.contains("3 entities read, 3 in total"));
        assert!(text.contains("Next page: http://host/svc/P?$skip=3"));
    }

    #[test]
    fn test_stream_limit() {
        let mut out = Vec::new();
        stream_to(&ODataCodec::default(), FEED, &args(Some(1)), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "(untyped) Id=1\n");
    }
}
