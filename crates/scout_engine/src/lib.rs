//! Scout engine: scan pipeline IO, ticker and calendar export.
mod calendar;
mod decode;
mod engine;
mod export;
mod filename;
mod normalize;
mod pipeline;
mod source;
mod ticker;
mod types;

pub use calendar::{format_calendar_time, ics_document, quick_add_link, CalendarEntry};
pub use decode::{decode_body, CharsetSource, DecodeError, DecodedBody};
pub use engine::EngineHandle;
pub use export::{ensure_output_dir, write_calendar_file, ExportError};
pub use filename::export_filename;
pub use normalize::{
    build_prompt, parse_records, parse_timestamp, request_body, response_text, truncate_chars,
    GenerativeNormalizer, Normalizer, NormalizerSettings, ScanWindow, DEFAULT_DESCRIPTION,
    UNKNOWN_LOCATION, UNTITLED_EVENT,
};
pub use pipeline::{ChannelProgressSink, ProgressSink, ScanPipeline};
pub use source::{
    default_forwarding_paths, encode_component, looks_structured, FetchSettings, ForwardingPath,
    ReqwestSourceFetcher, SourceFetcher, SourceQuery, DEFAULT_SOURCE_URL,
};
pub use ticker::Ticker;
pub use types::{
    EngineEvent, FailureKind, NormalizedEvent, PathFailure, ScanError, ScanId, ScanProgress,
    ScanStage, SourceBody,
};
