pub mod demo_ctx;
pub mod demo_flow;

pub use demo_ctx::DemoCtx;
pub use demo_flow::{DemoFlow, DemoOutcome};
