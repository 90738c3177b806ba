//! 分层合成描述
//!
//! 背景 → 原始视频 → 每个标注一个叠加层。描述与具体工具无关，
//! 由 `MediaToolkit::compose` 转换成工具自己的参数。

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::annotation::{AnimationStyle, TimeWindow};

/// 媒体元数据
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// 时长（秒）
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// 渲染原语
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "primitive", rename_all = "snake_case")]
pub enum Primitive {
    /// 矩形边框（thickness 为 0 时填充）
    Rect {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        color: String,
        thickness: u32,
    },
    /// 圆环（按外接正方形描述）
    Ring {
        x: u32,
        y: u32,
        diameter: u32,
        color: String,
    },
    /// 文字（boxed 时带底框）
    Text {
        x: u32,
        y: u32,
        text: String,
        font_size: u32,
        color: String,
        boxed: bool,
    },
    /// 箭头指针
    Arrow { x: u32, y: u32, color: String },
    /// 随时间增长的进度条
    Progress {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        color: String,
    },
    /// 圆形徽章（步骤序号 / 头像）
    Badge {
        x: u32,
        y: u32,
        diameter: u32,
        label: String,
        color: String,
    },
}

/// 合成层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum Layer {
    Background { color: String },
    Video { source: PathBuf },
    Overlay {
        annotation_id: String,
        window: TimeWindow,
        primitive: Primitive,
        #[serde(default)]
        animation: AnimationStyle,
    },
}

/// 合成描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionSpec {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration: f64,
    pub layers: Vec<Layer>,
}

impl CompositionSpec {
    pub fn overlay_count(&self) -> usize {
        self.layers
            .iter()
            .filter(|l| matches!(l, Layer::Overlay { .. }))
            .count()
    }
}

/// 录制得到的一帧
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedFrame {
    pub path: PathBuf,
    /// 相对录制开始的偏移（秒）
    pub offset: f64,
}
