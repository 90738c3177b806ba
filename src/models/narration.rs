use serde::{Deserialize, Serialize};

/// 旁白情绪
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Calm,
    Encouraging,
    Enthusiastic,
    Friendly,
    /// 普通操作说明
    Instructional,
    /// 含强调关键词的操作说明
    Emphatic,
}

/// 旁白所属位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentContext {
    Intro,
    /// 步骤序号（从 1 开始）
    Step { index: usize },
    Conclusion,
}

/// 强调片段：关键词及其后 1-2 个词
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmphasisSpan {
    pub keyword: String,
    pub phrase: String,
}

/// 带时间码的旁白片段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationSegment {
    pub id: String,
    pub text: String,
    /// 开始时间（秒）
    pub start_time: f64,
    /// 时长（秒）
    pub duration: f64,
    pub emotion: Emotion,
    pub emphasis_spans: Vec<EmphasisSpan>,
    pub persona_ref: String,
    pub context: SegmentContext,
}

impl NarrationSegment {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// 一组旁白的结束时间
pub fn narration_end(segments: &[NarrationSegment]) -> f64 {
    segments.last().map(NarrationSegment::end_time).unwrap_or(0.0)
}
