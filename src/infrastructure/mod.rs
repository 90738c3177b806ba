//! 基础设施层：浏览器、外部工具和产物目录

pub mod artifacts;
pub mod automation;
pub mod chromium_driver;
#[cfg(any(test, feature = "test-support"))]
pub mod fakes;
pub mod ffmpeg;
pub mod js_executor;
pub mod media;
pub mod recorder;
pub mod speech;

pub use artifacts::ArtifactLayout;
pub use automation::AutomationDriver;
pub use chromium_driver::ChromiumDriver;
pub use ffmpeg::FfmpegToolkit;
pub use js_executor::JsExecutor;
pub use media::MediaToolkit;
pub use recorder::FrameRecorder;
pub use speech::{HttpSpeechSynthesizer, SpeechSynthesizer, UnavailableSpeech};
