use serde::{Deserialize, Serialize};

/// 标注类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    HighlightBox,
    ArrowPointer,
    TextCallout,
    CircleHighlight,
    ProgressBar,
    StepNumber,
    Avatar,
}

/// 动画效果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnimationStyle {
    #[default]
    None,
    FadeIn,
    Pulse,
    SlideIn,
    Grow,
}

/// 半开时间窗口 `[start, end)`，单位秒
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    /// 创建窗口并裁剪到 `[0, limit]`
    pub fn clamped(start: f64, end: f64, limit: f64) -> Self {
        let limit = limit.max(0.0);
        let start = start.clamp(0.0, limit);
        let end = end.clamp(start, limit);
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    pub fn within(&self, limit: f64) -> bool {
        self.start >= 0.0 && self.start <= self.end && self.end <= limit
    }
}

/// 画面位置（像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

/// 尺寸（像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// 视频标注
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAnnotation {
    pub id: String,
    pub kind: AnnotationKind,
    pub window: TimeWindow,
    pub position: Position,
    pub size: Size,
    pub text: Option<String>,
    pub animation: AnimationStyle,
}
