pub mod annotation;
pub mod catalog;
pub mod category;
pub mod composition;
pub mod demonstration;
pub mod library;
pub mod loaders;
pub mod narration;
pub mod persona;
pub mod step;

pub use annotation::{AnimationStyle, AnnotationKind, Position, Size, TimeWindow, VideoAnnotation};
pub use catalog::{DemoCatalog, DemoTemplate};
pub use category::{Category, Difficulty};
pub use composition::{CapturedFrame, CompositionSpec, Layer, MediaInfo, Primitive};
pub use demonstration::{ArtifactKind, DemoArtifacts, DemoStatus, DemoType, Demonstration};
pub use library::{DemoLibrary, DemoSummary, LibraryStatus, LibraryStatusReport};
pub use loaders::{load_catalog_folder, load_persona_file};
pub use narration::{EmphasisSpan, Emotion, NarrationSegment, SegmentContext};
pub use persona::{PersonaRegistry, PersonaStyle, PhraseTemplates, Tone};
pub use step::{DemoStep, ScreenshotTiming, StepAction, StepDefaults, StepTemplate};
