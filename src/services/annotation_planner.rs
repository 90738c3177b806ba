//! 标注规划 - 业务能力层
//!
//! 每个步骤占用固定宽度的时间槽（时长 / 步数），不依赖录制时的真实时间戳。

use crate::models::{
    AnimationStyle, AnnotationKind, Demonstration, MediaInfo, Position, Size, TimeWindow,
    VideoAnnotation,
};

/// 步骤序号徽章直径
const BADGE_SIZE: u32 = 72;
/// 进度条高度
const PROGRESS_HEIGHT: u32 = 10;
/// 头像直径
const AVATAR_SIZE: u32 = 120;
/// 画面边距
const MARGIN: u32 = 32;
/// 说明文字最多显示的字符数
const CALLOUT_MAX_CHARS: usize = 80;

/// 按固定时间槽生成标注
///
/// 返回的每个窗口都落在 `[0, info.duration]` 内
pub fn plan_annotations(demo: &Demonstration, info: &MediaInfo) -> Vec<VideoAnnotation> {
    let duration = info.duration.max(0.0);
    let (width, height) = (info.width.max(1), info.height.max(1));
    let steps = demo.steps();
    let mut annotations = Vec::new();

    if !steps.is_empty() {
        let slot = duration / steps.len() as f64;
        for (i, step) in steps.iter().enumerate() {
            let index = i + 1;
            let window = TimeWindow::clamped(i as f64 * slot, index as f64 * slot, duration);

            annotations.push(VideoAnnotation {
                id: format!("{}-a{:02}-number", demo.id, index),
                kind: AnnotationKind::StepNumber,
                window,
                position: Position { x: MARGIN, y: MARGIN },
                size: Size {
                    width: BADGE_SIZE,
                    height: BADGE_SIZE,
                },
                text: Some(index.to_string()),
                animation: AnimationStyle::FadeIn,
            });

            if step.highlight {
                annotations.push(VideoAnnotation {
                    id: format!("{}-a{:02}-highlight", demo.id, index),
                    kind: AnnotationKind::HighlightBox,
                    window,
                    position: Position {
                        x: width / 4,
                        y: height / 4,
                    },
                    size: Size {
                        width: width / 2,
                        height: height / 2,
                    },
                    text: None,
                    animation: AnimationStyle::Pulse,
                });
                annotations.push(VideoAnnotation {
                    id: format!("{}-a{:02}-callout", demo.id, index),
                    kind: AnnotationKind::TextCallout,
                    window,
                    position: Position {
                        x: width / 10,
                        y: height.saturating_sub(height / 5),
                    },
                    size: Size {
                        width: width - 2 * (width / 10),
                        height: height / 10,
                    },
                    text: Some(callout_text(&step.description)),
                    animation: AnimationStyle::SlideIn,
                });
            }
        }
    }

    let whole = TimeWindow::clamped(0.0, duration, duration);
    annotations.push(VideoAnnotation {
        id: format!("{}-progress", demo.id),
        kind: AnnotationKind::ProgressBar,
        window: whole,
        position: Position {
            x: 0,
            y: height.saturating_sub(PROGRESS_HEIGHT),
        },
        size: Size {
            width,
            height: PROGRESS_HEIGHT,
        },
        text: None,
        animation: AnimationStyle::Grow,
    });
    annotations.push(VideoAnnotation {
        id: format!("{}-avatar", demo.id),
        kind: AnnotationKind::Avatar,
        window: whole,
        position: Position {
            x: width.saturating_sub(AVATAR_SIZE + MARGIN),
            y: height.saturating_sub(AVATAR_SIZE + MARGIN + PROGRESS_HEIGHT),
        },
        size: Size {
            width: AVATAR_SIZE,
            height: AVATAR_SIZE,
        },
        text: Some(avatar_label(&demo.narration_style)),
        animation: AnimationStyle::None,
    });

    annotations
}

fn callout_text(description: &str) -> String {
    crate::utils::logging::truncate_text(description.trim(), CALLOUT_MAX_CHARS)
}

/// 人设首字母
fn avatar_label(persona: &str) -> String {
    persona
        .chars()
        .find(|c| c.is_alphanumeric())
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, DemoTemplate, StepTemplate};

    fn demo() -> Demonstration {
        let template = DemoTemplate::new(
            "plan",
            Category::WebDevelopment,
            "devtools",
            "https://example.com",
            vec![
                StepTemplate::new("navigate", "https://example.com", "Open"),
                StepTemplate::new("click", "#a", "Click A").highlighted(),
                StepTemplate::new("hover", "#b", "Hover B"),
                StepTemplate::new("click", "#c", "Click C").highlighted(),
            ],
        );
        Demonstration::from_template("demo-p", "WEB220", &template).unwrap()
    }

    fn info(duration: f64) -> MediaInfo {
        MediaInfo {
            duration,
            width: 1920,
            height: 1080,
            fps: 30.0,
        }
    }

    #[test]
    fn test_counts_by_kind() {
        let annotations = plan_annotations(&demo(), &info(40.0));
        let count = |kind| annotations.iter().filter(|a| a.kind == kind).count();
        assert_eq!(count(AnnotationKind::StepNumber), 4);
        assert_eq!(count(AnnotationKind::HighlightBox), 2);
        assert_eq!(count(AnnotationKind::TextCallout), 2);
        assert_eq!(count(AnnotationKind::ProgressBar), 1);
        assert_eq!(count(AnnotationKind::Avatar), 1);
    }

    #[test]
    fn test_slots_are_fixed_width() {
        let annotations = plan_annotations(&demo(), &info(40.0));
        let numbers: Vec<_> = annotations
            .iter()
            .filter(|a| a.kind == AnnotationKind::StepNumber)
            .map(|a| a.window)
            .collect();
        assert_eq!(numbers[1], TimeWindow { start: 10.0, end: 20.0 });
        assert_eq!(numbers[3], TimeWindow { start: 30.0, end: 40.0 });
    }

    #[test]
    fn test_windows_stay_within_duration() {
        for duration in [0.0, 0.3, 7.0, 60.0] {
            for a in plan_annotations(&demo(), &info(duration)) {
                assert!(a.window.within(duration), "{:?} outside {}", a.window, duration);
            }
        }
    }

    #[test]
    fn test_avatar_label() {
        assert_eq!(avatar_label("mentor"), "M");
        assert_eq!(avatar_label(""), "?");
    }
}
