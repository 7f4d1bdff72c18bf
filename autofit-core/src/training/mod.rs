//! Model training: target encoding, search, the single-model trainer, the
//! orchestrator that fans trainers out, and winner selection.

pub mod metrics;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod search;
pub mod selector;
pub mod target;
pub mod trainer;

pub use orchestrator::{Orchestrator, RunOutcome, prepare};
pub use progress::{NoopProgress, ProgressEvent, ProgressSink, RecordingProgress};
pub use selector::{JobOutcome, pick_best, shape_outcome};
pub use target::{ClassLabels, EncodedTarget, encode_target};
pub use trainer::{TrainingData, TrainingResult, train};
