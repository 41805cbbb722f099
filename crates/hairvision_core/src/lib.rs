//! HairVision core: pure job lifecycle state machine and view-model helpers.
mod artifacts;
mod effect;
mod error;
mod msg;
mod state;
mod update;
mod view_model;

pub use artifacts::{
    ArtifactScanner, ArtifactSet, ENHANCE_MARKER, MARKER_CONTRACT_VERSION, REFINE_MARKER,
};
pub use effect::{CancelDelivery, Effect};
pub use error::JobError;
pub use msg::{CancelReport, CancelTrigger, Msg, StructuredResult};
pub use state::{AppState, JobId, JobState, LogLine, LogSource, SelectedFile, Target};
pub use update::update;
pub use view_model::{AppViewModel, OutcomeView};
