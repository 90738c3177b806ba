//! 旁白生成服务 - 业务能力层
//!
//! 把步骤描述和讲解人设转换成带时间码的旁白片段；
//! 语音服务不可用时只输出文字稿和字幕。

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::NarrationConfig;
use crate::infrastructure::speech::{SpeechSynthesizer, UnavailableSpeech};
use crate::models::{
    DemoStep, Demonstration, EmphasisSpan, Emotion, NarrationSegment, PersonaStyle,
    SegmentContext,
};
use crate::services::artifact_writer::ArtifactWriter;

/// 语速倍率的取值范围
pub const MIN_SPEAKING_RATE: f64 = 0.25;
pub const MAX_SPEAKING_RATE: f64 = 4.0;

/// 触发强调的关键词
pub const EMPHASIS_KEYWORDS: &[&str] = &[
    "click", "select", "type", "enter", "important", "notice", "remember", "key", "note",
];

/// 关键词之后最多捕获的词数
const EMPHASIS_TAIL: usize = 2;

const TOKEN_PATTERN: &str = r"[\p{L}\p{N}][\p{L}\p{N}'#_\-]*";

fn token_regex() -> Option<&'static Regex> {
    static TOKEN_RE: OnceLock<Option<Regex>> = OnceLock::new();
    TOKEN_RE.get_or_init(|| Regex::new(TOKEN_PATTERN).ok()).as_ref()
}

fn tokens(text: &str) -> Vec<&str> {
    match token_regex() {
        Some(re) => re.find_iter(text).map(|m| m.as_str()).collect(),
        None => text.split_whitespace().collect(),
    }
}

/// 一次旁白生成的产物
#[derive(Debug, Clone, Default)]
pub struct NarrationOutcome {
    pub segments: Vec<NarrationSegment>,
    pub transcript_path: Option<PathBuf>,
    pub subtitle_path: Option<PathBuf>,
    pub audio_path: Option<PathBuf>,
    pub warnings: Vec<String>,
}

/// 旁白生成服务
pub struct NarrationComposer {
    config: NarrationConfig,
    speech: Arc<dyn SpeechSynthesizer>,
}

impl NarrationComposer {
    /// 不带语音服务（只生成文字稿）
    pub fn new(config: NarrationConfig) -> Self {
        Self {
            config,
            speech: Arc::new(UnavailableSpeech),
        }
    }

    pub fn with_speech(mut self, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        self.speech = speech;
        self
    }

    /// 按人设的默认语速生成旁白
    pub fn generate(&self, demo: &Demonstration, persona: &PersonaStyle) -> Vec<NarrationSegment> {
        self.generate_with_rate(demo, persona, persona.speaking_rate)
    }

    /// 指定语速生成旁白
    ///
    /// 结果只取决于 (demo, persona, rate)，相同输入得到相同的文字、id 和时间码
    pub fn generate_with_rate(
        &self,
        demo: &Demonstration,
        persona: &PersonaStyle,
        rate: f64,
    ) -> Vec<NarrationSegment> {
        let rate = clamp_rate(rate);
        let steps = demo.steps();
        let total = steps.len();
        let mut cursor = 0.0;
        let mut segments = Vec::with_capacity(total + 2);

        let mut push = |id: String, text: String, emotion: Option<Emotion>, context| {
            let emphasis_spans = extract_emphasis(&text);
            let emotion = emotion.unwrap_or(if emphasis_spans.is_empty() {
                Emotion::Instructional
            } else {
                Emotion::Emphatic
            });
            let duration = self.segment_duration(&text, rate);
            segments.push(NarrationSegment {
                id,
                text,
                start_time: cursor,
                duration,
                emotion,
                emphasis_spans,
                persona_ref: persona.id.clone(),
                context,
            });
            cursor += duration + self.config.pause_gap_seconds.max(0.0);
        };

        let tone = persona.tone.emotion();
        push(
            format!("{}-intro", demo.id),
            fill_template(&persona.templates.intro, demo, None, 0, total),
            Some(tone),
            SegmentContext::Intro,
        );

        for (i, step) in steps.iter().enumerate() {
            let index = i + 1;
            let text = match step.narration_text.as_deref().map(str::trim) {
                Some(custom) if !custom.is_empty() => inject_marker(custom, persona, index),
                _ => fill_template(&persona.templates.step, demo, Some(step), index, total),
            };
            push(
                format!("{}-step-{:02}", demo.id, index),
                text,
                None,
                SegmentContext::Step { index },
            );
        }

        push(
            format!("{}-outro", demo.id),
            fill_template(&persona.templates.conclude, demo, None, total, total),
            Some(tone),
            SegmentContext::Conclusion,
        );

        segments
    }

    /// 片段时长（秒）：words × 60 / (wpm × rate)，至少按一个词计算
    pub fn segment_duration(&self, text: &str, rate: f64) -> f64 {
        let words = tokens(text).len().max(1) as f64;
        words * 60.0 / (self.config.words_per_minute * clamp_rate(rate))
    }

    /// 生成旁白并写出文字稿、字幕，再尝试合成语音
    ///
    /// 任何写入或合成失败都只记为警告
    pub async fn narrate(
        &self,
        demo: &Demonstration,
        persona: &PersonaStyle,
        writer: &ArtifactWriter,
    ) -> NarrationOutcome {
        let segments = self.generate(demo, persona);
        let mut outcome = NarrationOutcome::default();
        info!(
            "🗣️ [{}] 生成 {} 段旁白 (人设: {}, 时长 {:.1}s)",
            demo.id,
            segments.len(),
            persona.id,
            crate::models::narration::narration_end(&segments)
        );

        match writer.write_transcript(&demo.id, &segments).await {
            Ok(path) => outcome.transcript_path = Some(path),
            Err(e) => {
                warn!("⚠️ [{}] 文字稿写入失败: {:#}", demo.id, e);
                outcome.warnings.push(format!("文字稿写入失败: {}", e));
            }
        }
        match writer.write_subtitles(&demo.id, &segments).await {
            Ok(path) => outcome.subtitle_path = Some(path),
            Err(e) => {
                warn!("⚠️ [{}] 字幕写入失败: {:#}", demo.id, e);
                outcome.warnings.push(format!("字幕写入失败: {}", e));
            }
        }

        if self.speech.is_available() {
            let output = writer.layout().audio(&demo.id);
            match self
                .speech
                .synthesize(&segments, &persona.voice_profile, &output)
                .await
            {
                Ok(path) => {
                    debug!("[{}] 语音已生成: {}", demo.id, path.display());
                    outcome.audio_path = Some(path);
                }
                Err(e) => {
                    warn!("⚠️ [{}] 语音合成失败，仅保留文字稿: {}", demo.id, e);
                    outcome.warnings.push(format!("语音合成失败: {}", e));
                }
            }
        } else {
            info!("[{}] 语音服务不可用，仅输出文字稿", demo.id);
            outcome.warnings.push("语音服务不可用，仅输出文字稿".to_string());
        }

        outcome.segments = segments;
        outcome
    }
}

fn clamp_rate(rate: f64) -> f64 {
    if rate.is_finite() {
        rate.clamp(MIN_SPEAKING_RATE, MAX_SPEAKING_RATE)
    } else {
        1.0
    }
}

/// 替换 {title} {topic} {description} {index} {total}
fn fill_template(
    template: &str,
    demo: &Demonstration,
    step: Option<&DemoStep>,
    index: usize,
    total: usize,
) -> String {
    let description = step
        .map(|s| s.description.trim().trim_end_matches(['.', '!', '?']))
        .unwrap_or_else(|| demo.description.trim());
    template
        .replace("{title}", &demo.title)
        .replace("{topic}", &demo.topic)
        .replace("{description}", description)
        .replace("{index}", &index.to_string())
        .replace("{total}", &total.to_string())
}

/// 自定义旁白里没有任何人设标记时，按步骤序号轮流加上一个
fn inject_marker(text: &str, persona: &PersonaStyle, index: usize) -> String {
    let markers = &persona.templates.style_markers;
    if markers.is_empty() {
        return text.to_string();
    }
    if markers.iter().any(|m| contains_words(text, m)) {
        return text.to_string();
    }
    let marker = &markers[(index.saturating_sub(1)) % markers.len()];
    format!("{} {}", marker, lower_first(text))
}

/// 按整词匹配（忽略大小写和标点），"So" 不会命中 "also"
fn contains_words(text: &str, phrase: &str) -> bool {
    let needle: Vec<String> = tokens(phrase).iter().map(|t| t.to_lowercase()).collect();
    if needle.is_empty() {
        return false;
    }
    let hay: Vec<String> = tokens(text).iter().map(|t| t.to_lowercase()).collect();
    hay.windows(needle.len()).any(|w| w == needle.as_slice())
}

/// 首字母小写（整词大写的缩写除外）
fn lower_first(text: &str) -> String {
    let first_word = text.split_whitespace().next().unwrap_or("");
    let is_acronym = first_word.chars().filter(|c| c.is_alphabetic()).count() > 1
        && first_word
            .chars()
            .filter(|c| c.is_alphabetic())
            .all(char::is_uppercase);
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if !is_acronym => first.to_lowercase().chain(chars).collect(),
        _ => text.to_string(),
    }
}

/// 扫描强调关键词，捕获其后 1-2 个词
pub fn extract_emphasis(text: &str) -> Vec<EmphasisSpan> {
    let words = tokens(text);
    let mut spans = Vec::new();
    for (i, word) in words.iter().enumerate() {
        let lowered = word.to_lowercase();
        if !EMPHASIS_KEYWORDS.contains(&lowered.as_str()) {
            continue;
        }
        let end = (i + 1 + EMPHASIS_TAIL).min(words.len());
        spans.push(EmphasisSpan {
            keyword: lowered,
            phrase: words[i..end].join(" "),
        });
    }
    spans
}
