//! 合成描述构建 - 业务能力层
//!
//! 背景 → 原始视频 → 每个标注按类型转换成一个叠加原语

use std::path::Path;

use crate::config::EnhancementConfig;
use crate::models::{
    AnnotationKind, CompositionSpec, Layer, MediaInfo, Primitive, VideoAnnotation,
};

/// 说明文字字号
const CALLOUT_FONT_SIZE: u32 = 32;
/// 高亮框线宽
const HIGHLIGHT_THICKNESS: u32 = 6;
const BADGE_COLOR: &str = "0x1e88e5";
const AVATAR_COLOR: &str = "0x6d4c41";
const PROGRESS_COLOR: &str = "0x43a047";

/// 构建分层合成描述
pub fn build_composition(
    raw_video: &Path,
    info: &MediaInfo,
    annotations: &[VideoAnnotation],
    config: &EnhancementConfig,
) -> CompositionSpec {
    let mut layers = Vec::with_capacity(annotations.len() + 2);
    layers.push(Layer::Background {
        color: config.background_color.clone(),
    });
    layers.push(Layer::Video {
        source: raw_video.to_path_buf(),
    });
    layers.extend(annotations.iter().map(|a| Layer::Overlay {
        annotation_id: a.id.clone(),
        window: a.window,
        primitive: primitive_for(a, config),
        animation: a.animation,
    }));

    CompositionSpec {
        width: info.width,
        height: info.height,
        fps: info.fps,
        duration: info.duration,
        layers,
    }
}

fn primitive_for(annotation: &VideoAnnotation, config: &EnhancementConfig) -> Primitive {
    let VideoAnnotation {
        position, size, ..
    } = annotation;
    let label = annotation.text.clone().unwrap_or_default();
    match annotation.kind {
        AnnotationKind::HighlightBox => Primitive::Rect {
            x: position.x,
            y: position.y,
            width: size.width,
            height: size.height,
            color: config.highlight_color.clone(),
            thickness: HIGHLIGHT_THICKNESS,
        },
        AnnotationKind::CircleHighlight => Primitive::Ring {
            x: position.x,
            y: position.y,
            diameter: size.width.min(size.height),
            color: config.highlight_color.clone(),
        },
        AnnotationKind::TextCallout => Primitive::Text {
            x: position.x,
            y: position.y,
            text: label,
            font_size: CALLOUT_FONT_SIZE,
            color: "white".to_string(),
            boxed: true,
        },
        AnnotationKind::ArrowPointer => Primitive::Arrow {
            x: position.x,
            y: position.y,
            color: config.highlight_color.clone(),
        },
        AnnotationKind::ProgressBar => Primitive::Progress {
            x: position.x,
            y: position.y,
            width: size.width,
            height: size.height,
            color: PROGRESS_COLOR.to_string(),
        },
        AnnotationKind::StepNumber => Primitive::Badge {
            x: position.x,
            y: position.y,
            diameter: size.width,
            label,
            color: BADGE_COLOR.to_string(),
        },
        AnnotationKind::Avatar => Primitive::Badge {
            x: position.x,
            y: position.y,
            diameter: size.width,
            label,
            color: AVATAR_COLOR.to_string(),
        },
    }
}
