pub mod annotation_planner;
pub mod artifact_writer;
pub mod automation_executor;
pub mod composition;
pub mod narration_composer;
pub mod video_composer;

pub use annotation_planner::plan_annotations;
pub use artifact_writer::ArtifactWriter;
pub use automation_executor::{
    AutomationExecutor, ExecutionReport, ExecutionSummary, StepLogEntry, StepStatus,
};
pub use composition::build_composition;
pub use narration_composer::{extract_emphasis, NarrationComposer, NarrationOutcome};
pub use video_composer::{EnhancementOutcome, VideoComposer};
