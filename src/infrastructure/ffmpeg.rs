//! 基于 ffmpeg / ffprobe 的媒体工具实现

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::config::MediaToolConfig;
use crate::error::ToolError;
use crate::infrastructure::media::MediaToolkit;
use crate::models::{
    AnimationStyle, CapturedFrame, CompositionSpec, Layer, MediaInfo, Primitive, TimeWindow,
};

/// 编码录制帧时的输出帧率
const ENCODE_FPS: u32 = 30;

/// ffmpeg 工具
pub struct FfmpegToolkit {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegToolkit {
    pub fn new(config: &MediaToolConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_path.clone(),
            ffprobe: config.ffprobe_path.clone(),
        }
    }

    /// 运行外部命令，非零退出视为失败
    async fn run(&self, program: &str, args: &[String]) -> Result<Output, ToolError> {
        debug!("执行: {} {}", program, args.join(" "));
        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ToolError::spawn_failed(program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::NonZeroExit {
                tool: program.to_string(),
                code: output.status.code(),
                stderr: tail(&stderr, 400),
            });
        }
        Ok(output)
    }

    async fn run_ffmpeg(&self, args: Vec<String>, output: &Path) -> Result<PathBuf, ToolError> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::spawn_failed(&self.ffmpeg, e))?;
        }
        self.run(&self.ffmpeg, &args).await?;
        Ok(output.to_path_buf())
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe(&self, media: &Path) -> Result<MediaInfo, ToolError> {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-select_streams".to_string(),
            "v:0".to_string(),
            "-show_entries".to_string(),
            "stream=width,height,r_frame_rate:format=duration".to_string(),
            "-of".to_string(),
            "json".to_string(),
            media.display().to_string(),
        ];
        let output = self.run(&self.ffprobe, &args).await?;
        parse_probe(&String::from_utf8_lossy(&output.stdout))
    }

    async fn compose(&self, spec: &CompositionSpec, output: &Path) -> Result<PathBuf, ToolError> {
        let args = compose_args(spec, output)?;
        self.run_ffmpeg(args, output).await
    }

    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<PathBuf, ToolError> {
        let args = strings(&[
            "-y",
            "-i",
            &video.display().to_string(),
            "-i",
            &audio.display().to_string(),
            "-map",
            "0:v:0",
            "-map",
            "1:a:0",
            "-c:v",
            "copy",
            "-c:a",
            "aac",
            "-shortest",
            &output.display().to_string(),
        ]);
        self.run_ffmpeg(args, output).await
    }

    async fn fade(
        &self,
        input: &Path,
        fade_seconds: f64,
        duration: f64,
        output: &Path,
    ) -> Result<PathBuf, ToolError> {
        let (video_filter, audio_filter) = fade_filters(fade_seconds, duration);
        let args = strings(&[
            "-y",
            "-i",
            &input.display().to_string(),
            "-vf",
            &video_filter,
            "-af",
            &audio_filter,
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-c:a",
            "aac",
            &output.display().to_string(),
        ]);
        self.run_ffmpeg(args, output).await
    }

    async fn encode_frames(
        &self,
        frames: &[CapturedFrame],
        output: &Path,
    ) -> Result<PathBuf, ToolError> {
        if frames.is_empty() {
            return Err(ToolError::BadOutput {
                tool: self.ffmpeg.clone(),
                reason: "没有可编码的帧".to_string(),
            });
        }
        let list_path = output.with_extension("ffconcat");
        tokio::fs::write(&list_path, concat_list(frames))
            .await
            .map_err(|e| ToolError::spawn_failed(&self.ffmpeg, e))?;

        let args = strings(&[
            "-y",
            "-f",
            "concat",
            "-safe",
            "0",
            "-i",
            &list_path.display().to_string(),
            "-vf",
            "scale=trunc(iw/2)*2:trunc(ih/2)*2",
            "-r",
            &ENCODE_FPS.to_string(),
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            &output.display().to_string(),
        ]);
        self.run_ffmpeg(args, output).await
    }
}

// ========== 参数构建（纯函数） ==========

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// 解析 ffprobe 的 JSON 输出
pub fn parse_probe(json: &str) -> Result<MediaInfo, ToolError> {
    let bad = |reason: String| ToolError::BadOutput {
        tool: "ffprobe".to_string(),
        reason,
    };
    let parsed: ProbeOutput = serde_json::from_str(json).map_err(|e| bad(e.to_string()))?;
    let duration = parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| bad("缺少有效的时长".to_string()))?;

    let stream = parsed.streams.first();
    let fps = stream
        .and_then(|s| s.r_frame_rate.as_deref())
        .and_then(parse_frame_rate)
        .unwrap_or(0.0);

    Ok(MediaInfo {
        duration,
        width: stream.and_then(|s| s.width).unwrap_or(0),
        height: stream.and_then(|s| s.height).unwrap_or(0),
        fps,
    })
}

/// 解析 "30000/1001" 形式的帧率
fn parse_frame_rate(raw: &str) -> Option<f64> {
    let (num, den) = raw.split_once('/').unwrap_or((raw, "1"));
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    (den > 0.0).then_some(num / den)
}

/// 合成命令参数：输入 0 为背景色，输入 1 为原始视频
pub fn compose_args(spec: &CompositionSpec, output: &Path) -> Result<Vec<String>, ToolError> {
    let background = spec
        .layers
        .iter()
        .find_map(|l| match l {
            Layer::Background { color } => Some(color.clone()),
            _ => None,
        })
        .unwrap_or_else(|| "black".to_string());
    let source = spec
        .layers
        .iter()
        .find_map(|l| match l {
            Layer::Video { source } => Some(source.clone()),
            _ => None,
        })
        .ok_or_else(|| ToolError::BadOutput {
            tool: "ffmpeg".to_string(),
            reason: "合成描述缺少视频层".to_string(),
        })?;

    let lavfi = format!(
        "color=c={}:s={}x{}:r={}:d={:.3}",
        background, spec.width, spec.height, spec.fps, spec.duration
    );
    Ok(strings(&[
        "-y",
        "-f",
        "lavfi",
        "-i",
        &lavfi,
        "-i",
        &source.display().to_string(),
        "-filter_complex",
        &filter_graph(spec),
        "-map",
        "[out]",
        "-map",
        "1:a?",
        "-t",
        &format!("{:.3}", spec.duration),
        "-c:v",
        "libx264",
        "-pix_fmt",
        "yuv420p",
        &output.display().to_string(),
    ]))
}

/// 入场动画时长（秒）
const ANIMATION_SECONDS: f64 = 0.6;
/// 入场动画的分段数
const ANIMATION_STAGES: u32 = 3;
/// 滑入的起始偏移（像素）
const SLIDE_DISTANCE: u32 = 120;
/// 闪烁周期与可见时长（秒）
const PULSE_PERIOD: f64 = 0.8;
const PULSE_ON: f64 = 0.5;
/// 进度条增长的分段数
const GROW_STAGES: u32 = 20;

/// 分层描述 → filter_complex
pub fn filter_graph(spec: &CompositionSpec) -> String {
    let mut chain = vec!["[0:v][vid]overlay=(W-w)/2:(H-h)/2:shortest=1".to_string()];
    for layer in &spec.layers {
        if let Layer::Overlay {
            window,
            primitive,
            animation,
            ..
        } = layer
        {
            chain.extend(overlay_filters(primitive, *animation, window, spec.duration));
        }
    }
    format!(
        "[1:v]scale={}:{}:force_original_aspect_ratio=decrease[vid];{}[out]",
        spec.width,
        spec.height,
        chain.join(",")
    )
}

fn enable_between(start: f64, end: f64) -> String {
    format!("enable='between(t,{:.3},{:.3})'", start, end)
}

/// 按动画效果展开一个叠加层
///
/// drawbox 的参数不能随时间变化，动画用若干个相邻时间段的静态滤镜拼出来。
fn overlay_filters(
    primitive: &Primitive,
    animation: AnimationStyle,
    window: &TimeWindow,
    duration: f64,
) -> Vec<String> {
    let (start, end) = (window.start, window.end);
    match animation {
        AnimationStyle::None => primitive_filters(primitive, duration, &enable_between(start, end)),
        AnimationStyle::Pulse => {
            let enable = format!(
                "enable='between(t,{:.3},{:.3})*lt(mod(t-{:.3},{}),{})'",
                start, end, start, PULSE_PERIOD, PULSE_ON
            );
            primitive_filters(primitive, duration, &enable)
        }
        AnimationStyle::FadeIn => entrance(primitive, window, duration, |stage| {
            let alpha = f64::from(stage + 1) / f64::from(ANIMATION_STAGES + 1);
            with_alpha(primitive, alpha)
        }),
        AnimationStyle::SlideIn => entrance(primitive, window, duration, |stage| {
            let remaining = ANIMATION_STAGES - stage;
            shifted(primitive, SLIDE_DISTANCE * remaining / ANIMATION_STAGES)
        }),
        AnimationStyle::Grow => match primitive {
            Primitive::Progress { .. } => grow_progress(primitive, start, end, duration),
            // 只有进度条按时间增长
            _ => primitive_filters(primitive, duration, &enable_between(start, end)),
        },
    }
}

/// 入场动画：窗口开头的 ANIMATION_SECONDS 均分成几段，每段画一个中间状态，之后原样绘制
fn entrance(
    primitive: &Primitive,
    window: &TimeWindow,
    duration: f64,
    variant: impl Fn(u32) -> Primitive,
) -> Vec<String> {
    let ramp = ANIMATION_SECONDS.min(window.length()).max(0.0);
    let step = ramp / f64::from(ANIMATION_STAGES);
    let mut filters = Vec::new();
    if step > 0.0 {
        for stage in 0..ANIMATION_STAGES {
            let s = window.start + step * f64::from(stage);
            filters.extend(primitive_filters(
                &variant(stage),
                duration,
                &enable_between(s, s + step),
            ));
        }
    }
    filters.extend(primitive_filters(
        primitive,
        duration,
        &enable_between(window.start + ramp, window.end),
    ));
    filters
}

fn grow_progress(primitive: &Primitive, start: f64, end: f64, duration: f64) -> Vec<String> {
    let Primitive::Progress {
        x,
        y,
        width,
        height,
        color,
    } = primitive
    else {
        return Vec::new();
    };
    let step = (end - start).max(0.0) / f64::from(GROW_STAGES);
    let mut filters: Vec<String> = (0..GROW_STAGES)
        .map(|i| {
            let s = start + step * f64::from(i);
            let e = if i + 1 == GROW_STAGES { end } else { s + step };
            format!(
                "drawbox=x={}:y={}:w={}:h={}:color={}:t=fill:{}",
                x,
                y,
                (width * (i + 1) / GROW_STAGES).max(1),
                height,
                tint(color, 0.5),
                enable_between(s, e)
            )
        })
        .collect();
    filters.push(progress_label(*x, *y, *width, *height, duration, &enable_between(start, end)));
    filters
}

/// 颜色已经带透明度时保持不变
fn tint(color: &str, alpha: f64) -> String {
    if color.contains('@') {
        color.to_string()
    } else {
        format!("{}@{}", color, alpha)
    }
}

fn with_alpha(primitive: &Primitive, alpha: f64) -> Primitive {
    let mut faded = primitive.clone();
    match &mut faded {
        Primitive::Rect { color, .. }
        | Primitive::Ring { color, .. }
        | Primitive::Text { color, .. }
        | Primitive::Arrow { color, .. }
        | Primitive::Progress { color, .. }
        | Primitive::Badge { color, .. } => {
            let base = color.split('@').next().unwrap_or_default().to_string();
            *color = format!("{}@{:.2}", base, alpha);
        }
    }
    faded
}

/// 从右侧偏移 `dx` 像素
fn shifted(primitive: &Primitive, dx: u32) -> Primitive {
    let mut moved = primitive.clone();
    match &mut moved {
        Primitive::Rect { x, .. }
        | Primitive::Ring { x, .. }
        | Primitive::Text { x, .. }
        | Primitive::Arrow { x, .. }
        | Primitive::Progress { x, .. }
        | Primitive::Badge { x, .. } => *x += dx,
    }
    moved
}

fn progress_label(x: u32, y: u32, width: u32, height: u32, duration: f64, enable: &str) -> String {
    format!(
        "drawtext=text='%{{eif\\:t*100/{:.3}\\:d}}':x={}:y={}:fontsize={}:fontcolor=white:{}",
        duration.max(0.001),
        x + width + 10,
        y.saturating_sub(4),
        height.max(12) + 4,
        enable
    )
}

fn primitive_filters(primitive: &Primitive, duration: f64, enable: &str) -> Vec<String> {
    match primitive {
        Primitive::Rect {
            x,
            y,
            width,
            height,
            color,
            thickness,
        } => {
            let t = if *thickness == 0 {
                "fill".to_string()
            } else {
                thickness.to_string()
            };
            vec![format!(
                "drawbox=x={}:y={}:w={}:h={}:color={}:t={}:{}",
                x, y, width, height, color, t, enable
            )]
        }
        Primitive::Ring {
            x,
            y,
            diameter,
            color,
        } => vec![format!(
            "drawbox=x={}:y={}:w={}:h={}:color={}:t=6:{}",
            x,
            y,
            diameter,
            diameter,
            tint(color, 0.8),
            enable
        )],
        Primitive::Text {
            x,
            y,
            text,
            font_size,
            color,
            boxed,
        } => {
            let boxing = if *boxed {
                ":box=1:boxcolor=black@0.6:boxborderw=12"
            } else {
                ""
            };
            vec![format!(
                "drawtext=text='{}':x={}:y={}:fontsize={}:fontcolor={}{}:{}",
                escape_drawtext(text),
                x,
                y,
                font_size,
                color,
                boxing,
                enable
            )]
        }
        Primitive::Arrow { x, y, color } => vec![format!(
            "drawtext=text='-->':x={}:y={}:fontsize=48:fontcolor={}:{}",
            x, y, color, enable
        )],
        Primitive::Progress {
            x,
            y,
            width,
            height,
            color,
        } => vec![
            format!(
                "drawbox=x={}:y={}:w={}:h={}:color={}:t=fill:{}",
                x,
                y,
                width,
                height,
                tint(color, 0.5),
                enable
            ),
            progress_label(*x, *y, *width, *height, duration, enable),
        ],
        Primitive::Badge {
            x,
            y,
            diameter,
            label,
            color,
        } => vec![
            format!(
                "drawbox=x={}:y={}:w={}:h={}:color={}:t=fill:{}",
                x, y, diameter, diameter, color, enable
            ),
            format!(
                "drawtext=text='{}':x={}+({}-text_w)/2:y={}+({}-text_h)/2:fontsize={}:fontcolor=white:{}",
                escape_drawtext(label),
                x,
                diameter,
                y,
                diameter,
                diameter / 2,
                enable
            ),
        ],
    }
}

/// drawtext 的特殊字符转义
fn escape_drawtext(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | ':' | '\'' | '%' | ',' | ';' | '[' | ']' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\n' => escaped.push(' '),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// 淡入淡出滤镜（视频, 音频）
pub fn fade_filters(fade_seconds: f64, duration: f64) -> (String, String) {
    let fade = fade_seconds.min(duration / 2.0).max(0.0);
    let out_start = (duration - fade).max(0.0);
    (
        format!(
            "fade=t=in:st=0:d={:.3},fade=t=out:st={:.3}:d={:.3}",
            fade, out_start, fade
        ),
        format!(
            "afade=t=in:st=0:d={:.3},afade=t=out:st={:.3}:d={:.3}",
            fade, out_start, fade
        ),
    )
}

/// concat demuxer 列表，每帧持续到下一帧
pub fn concat_list(frames: &[CapturedFrame]) -> String {
    let mut list = String::from("ffconcat version 1.0\n");
    for (i, frame) in frames.iter().enumerate() {
        let duration = frames
            .get(i + 1)
            .map(|next| (next.offset - frame.offset).max(0.001))
            .unwrap_or(1.0 / ENCODE_FPS as f64);
        list.push_str(&format!(
            "file '{}'\nduration {:.3}\n",
            frame.path.display().to_string().replace('\'', "'\\''"),
            duration
        ));
    }
    // concat demuxer 会忽略最后一帧的时长，需要重复一次
    if let Some(last) = frames.last() {
        list.push_str(&format!(
            "file '{}'\n",
            last.path.display().to_string().replace('\'', "'\\''")
        ));
    }
    list
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// 取字符串末尾的 max_chars 个字符
fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        text.trim().to_string()
    } else {
        text.chars().skip(count - max_chars).collect::<String>().trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::TimeWindow;

    fn spec() -> CompositionSpec {
        CompositionSpec {
            width: 1280,
            height: 720,
            fps: 30.0,
            duration: 12.0,
            layers: vec![
                Layer::Background {
                    color: "black".to_string(),
                },
                Layer::Video {
                    source: PathBuf::from("/tmp/raw.mp4"),
                },
                Layer::Overlay {
                    annotation_id: "a1".to_string(),
                    window: TimeWindow { start: 0.0, end: 4.0 },
                    primitive: Primitive::Text {
                        x: 10,
                        y: 20,
                        text: "Click: Run".to_string(),
                        font_size: 32,
                        color: "white".to_string(),
                        boxed: true,
                    },
                    animation: AnimationStyle::None,
                },
            ],
        }
    }

    fn overlay(primitive: Primitive, animation: AnimationStyle) -> Vec<String> {
        overlay_filters(
            &primitive,
            animation,
            &TimeWindow { start: 2.0, end: 6.0 },
            12.0,
        )
    }

    fn rect() -> Primitive {
        Primitive::Rect {
            x: 100,
            y: 50,
            width: 40,
            height: 20,
            color: "yellow".to_string(),
            thickness: 6,
        }
    }

    #[test]
    fn test_parse_probe() {
        let json = r#"{
            "streams": [{"width": 1280, "height": 720, "r_frame_rate": "30000/1001"}],
            "format": {"duration": "12.500000"}
        }"#;
        let info = parse_probe(json).unwrap();
        assert_eq!(info.width, 1280);
        assert_eq!(info.height, 720);
        assert!((info.duration - 12.5).abs() < 1e-9);
        assert!((info.fps - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_probe_audio_only() {
        let info = parse_probe(r#"{"streams": [], "format": {"duration": "3.0"}}"#).unwrap();
        assert_eq!(info.width, 0);
        assert_eq!(info.duration, 3.0);
    }

    #[test]
    fn test_parse_probe_without_duration_fails() {
        assert!(parse_probe(r#"{"streams": [], "format": {}}"#).is_err());
        assert!(parse_probe("not json").is_err());
    }

    #[test]
    fn test_filter_graph_contains_overlay_and_escaped_text() {
        let graph = filter_graph(&spec());
        assert!(graph.starts_with("[1:v]scale=1280:720"));
        assert!(graph.contains("overlay=(W-w)/2:(H-h)/2"));
        assert!(graph.contains("text='Click\\: Run'"));
        assert!(graph.contains("enable='between(t,0.000,4.000)'"));
        assert!(graph.ends_with("[out]"));
    }

    #[test]
    fn test_pulse_blinks_inside_window() {
        let filters = overlay(rect(), AnimationStyle::Pulse);
        assert_eq!(filters.len(), 1);
        assert!(filters[0].contains("enable='between(t,2.000,6.000)*lt(mod(t-2.000,0.8),0.5)'"));
    }

    #[test]
    fn test_fade_in_ramps_alpha_then_settles() {
        let filters = overlay(rect(), AnimationStyle::FadeIn);
        assert_eq!(filters.len(), 4);
        assert!(filters[0].contains("color=yellow@0.25"));
        assert!(filters[2].contains("color=yellow@0.75"));
        assert!(filters[3].contains("color=yellow:"));
        assert!(filters[3].contains("enable='between(t,2.600,6.000)'"));
    }

    #[test]
    fn test_slide_in_moves_towards_target() {
        let filters = overlay(rect(), AnimationStyle::SlideIn);
        assert!(filters[0].contains("x=220:"));
        assert!(filters[1].contains("x=180:"));
        assert!(filters[2].contains("x=140:"));
        assert!(filters[3].contains("x=100:"));
    }

    #[test]
    fn test_grow_widens_progress_bar() {
        let bar = Primitive::Progress {
            x: 0,
            y: 700,
            width: 200,
            height: 8,
            color: "0x43a047".to_string(),
        };
        let filters = overlay(bar, AnimationStyle::Grow);
        assert_eq!(filters.len(), GROW_STAGES as usize + 1);
        assert!(filters[0].contains("w=10:"));
        assert!(filters[GROW_STAGES as usize - 1].contains("w=200:"));
        assert!(filters.last().unwrap().starts_with("drawtext"));
        // 其他原语不受影响
        assert_eq!(overlay(rect(), AnimationStyle::Grow).len(), 1);
    }

    #[test]
    fn test_compose_args_require_video_layer() {
        let mut s = spec();
        s.layers.retain(|l| !matches!(l, Layer::Video { .. }));
        assert!(compose_args(&s, Path::new("/tmp/out.mp4")).is_err());

        let args = compose_args(&spec(), Path::new("/tmp/out.mp4")).unwrap();
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out.mp4"));
        assert!(args.contains(&"-filter_complex".to_string()));
    }

    #[test]
    fn test_fade_filters_clamp_to_half_duration() {
        let (video, audio) = fade_filters(5.0, 4.0);
        assert_eq!(video, "fade=t=in:st=0:d=2.000,fade=t=out:st=2.000:d=2.000");
        assert!(audio.starts_with("afade=t=in"));
    }

    #[test]
    fn test_concat_list_uses_frame_offsets() {
        let frames = vec![
            CapturedFrame {
                path: PathBuf::from("/f/0.png"),
                offset: 0.0,
            },
            CapturedFrame {
                path: PathBuf::from("/f/1.png"),
                offset: 0.25,
            },
        ];
        let list = concat_list(&frames);
        assert!(list.contains("file '/f/0.png'\nduration 0.250\n"));
        assert!(list.ends_with("file '/f/1.png'\n"));
    }
}
