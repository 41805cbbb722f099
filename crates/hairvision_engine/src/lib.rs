//! HairVision engine: network and file I/O behind the job lifecycle.
mod cancel;
mod classify;
mod demux;
mod download;
mod engine;
mod filename;
mod persist;
mod runner;
mod settings;
mod status;
mod submit;
mod types;

pub use cancel::CancelClient;
pub use classify::{classify, Classification};
pub use demux::{pump_lines, LineAssembler, PumpEnd};
pub use download::{download_artifact, resolve_artifact, sha256_hex, DownloadedArtifact};
pub use engine::EngineHandle;
pub use filename::artifact_filename;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use runner::{run_job, MAX_STRUCTURED_BODY};
pub use settings::{build_http_client, Backend, BackendUrls, EngineSettings};
pub use status::{fetch_status, BackendStatus};
pub use submit::{BodyStream, JobResponse, JobSubmitter, ReqwestSubmitter, PROCESS_ID_HEADER};
pub use types::{
    CancelDelivery, CancelReport, ChannelEventSink, EngineError, EngineEvent, EventSink,
    FailureKind, JobId, JobOutcome, StructuredResponse, Upload,
};
