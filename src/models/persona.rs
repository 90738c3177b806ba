//! 讲解人设
//!
//! 人设是数据驱动的查找表：`persona_id -> {语速, 语气, 音色, 模板}`，
//! 生成旁白时只查一次表，不按身份写分支。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::narration::Emotion;

/// 回退使用的人设
pub const DEFAULT_PERSONA: &str = "mentor";

/// 语气
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Formal,
    Warm,
    Energetic,
    Casual,
}

impl Tone {
    /// 开场和结尾使用的情绪
    pub fn emotion(self) -> Emotion {
        match self {
            Tone::Formal => Emotion::Calm,
            Tone::Warm => Emotion::Encouraging,
            Tone::Energetic => Emotion::Enthusiastic,
            Tone::Casual => Emotion::Friendly,
        }
    }
}

/// 旁白模板
///
/// 可用占位符：`{title}` `{topic}` `{description}` `{index}` `{total}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseTemplates {
    pub intro: String,
    pub step: String,
    pub conclude: String,
    /// 人设特有的口头语，自定义旁白里缺失时会注入一个
    #[serde(default)]
    pub style_markers: Vec<String>,
}

/// 人设风格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaStyle {
    pub id: String,
    pub display_name: String,
    pub speaking_rate: f64,
    pub tone: Tone,
    pub voice_profile: String,
    pub templates: PhraseTemplates,
}

/// 人设注册表
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: BTreeMap<String, PersonaStyle>,
}

impl PersonaRegistry {
    /// 创建只包含给定人设的注册表
    pub fn new(personas: impl IntoIterator<Item = PersonaStyle>) -> Self {
        Self {
            personas: personas.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    /// 添加或替换人设
    pub fn insert(&mut self, persona: PersonaStyle) {
        self.personas.insert(persona.id.clone(), persona);
    }

    /// 解析人设，未知ID回退到默认人设
    pub fn resolve(&self, id: &str) -> PersonaStyle {
        if let Some(persona) = self.personas.get(id) {
            return persona.clone();
        }
        warn!("⚠️ 未知的人设 '{}'，使用默认人设 '{}'", id, DEFAULT_PERSONA);
        self.personas
            .get(DEFAULT_PERSONA)
            .or_else(|| self.personas.values().next())
            .cloned()
            .unwrap_or_else(mentor)
    }
}

impl Default for PersonaRegistry {
    fn default() -> Self {
        Self::new([professor(), mentor(), coach(), peer()])
    }
}

fn persona(
    id: &str,
    display_name: &str,
    speaking_rate: f64,
    tone: Tone,
    voice_profile: &str,
    intro: &str,
    step: &str,
    conclude: &str,
    markers: &[&str],
) -> PersonaStyle {
    PersonaStyle {
        id: id.to_string(),
        display_name: display_name.to_string(),
        speaking_rate,
        tone,
        voice_profile: voice_profile.to_string(),
        templates: PhraseTemplates {
            intro: intro.to_string(),
            step: step.to_string(),
            conclude: conclude.to_string(),
            style_markers: markers.iter().map(|m| m.to_string()).collect(),
        },
    }
}

fn professor() -> PersonaStyle {
    persona(
        "professor",
        "Professor",
        0.9,
        Tone::Formal,
        "en-US-deep",
        "Welcome. In this lesson we will examine {topic}.",
        "Step {index} of {total}: {description}.",
        "That concludes our examination of {topic}. Review each step before moving on.",
        &["Observe that", "Note that"],
    )
}

fn mentor() -> PersonaStyle {
    persona(
        "mentor",
        "Mentor",
        1.0,
        Tone::Warm,
        "en-US-warm",
        "Hi there! Today we're going to walk through {topic} together.",
        "Next, {description}.",
        "Nice work! You've just seen {topic} from start to finish.",
        &["Let's", "Now"],
    )
}

fn coach() -> PersonaStyle {
    persona(
        "coach",
        "Coach",
        1.15,
        Tone::Energetic,
        "en-US-bright",
        "Alright, let's get moving with {topic}!",
        "Go ahead: {description}!",
        "Great job! {topic} is now in your toolbox.",
        &["Go ahead and", "Quick tip:"],
    )
}

fn peer() -> PersonaStyle {
    persona(
        "peer",
        "Study buddy",
        1.05,
        Tone::Casual,
        "en-US-casual",
        "Hey! So I figured out {topic}, let me show you.",
        "Then {description}.",
        "And that's it for {topic}. Pretty easy, right?",
        &["So", "Basically"],
    )
}
