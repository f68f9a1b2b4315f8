//! Gallery engine: URL resolution, browser-like requests and concurrent
//! picture downloads with progress reporting.
mod coordinator;
mod fetch;
mod filename;
mod headers;
mod persist;
mod progress;
mod resolve;
mod types;

pub use coordinator::{Coordinator, RetrievalContext, RetrievalSummary, SettingsError};
pub use fetch::{FetchRequest, FetchSettings, Fetcher, ReqwestFetcher};
pub use filename::{picture_file_name, unique_name, unique_name_with};
pub use headers::{BrowserHeaders, HeaderError, HeaderGroup, RequestHeaders, Role};
pub use persist::{ensure_output_dir, save_document, PersistError};
pub use progress::{ChannelProgressSink, ProgressSink};
pub use resolve::{join_url, resolve, ResolveError};
pub use types::{
    EventKind, FailureKind, FetchError, ProgressEvent, RetrievalError, RetrievalJob,
};
