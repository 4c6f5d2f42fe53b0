//! Batched delivery of archived snapshots to the indexing endpoint.

pub mod batch;
pub mod run;
pub mod submit;
pub mod types;

pub use batch::run_source;
pub use run::run;
pub use submit::{IndexClient, SubmitPolicy, TimeoutBreaker};
pub use types::{
    IngestError, RunReport, Selector, SourceFailure, SourceReport, SubmissionResult, SyncOptions,
    SyncOverrides,
};
