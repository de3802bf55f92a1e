pub mod applier;
pub mod logging;
pub mod normalizer;
pub mod pipeline;
pub mod reconciler;
pub mod store;
pub mod tag_filter;

pub use applier::{ApplySummary, UpdateApplier};
pub use logging::init_logging;
pub use normalizer::{normalize, InputItem, InputShape, RawBatch};
pub use pipeline::{PassOutcome, PassReport, SyncPass};
pub use reconciler::{desired_attachments, Reconciler};
pub use store::{RecordSource, RecordWriter, StaticRecords};
pub use tag_filter::{filter_messages, FilterOutcome, TagSet};
