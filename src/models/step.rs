//! 演示步骤
//!
//! 模板中的步骤是字符串描述的（`action = "click"`），在创建演示时被解析为
//! 强类型的 [`StepAction`]，之后不再变化。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Wait 动作未指定时长时的默认值（秒）
pub const DEFAULT_WAIT_SECONDS: f64 = 2.0;
/// Scroll 动作未指定距离时的默认值（像素）
pub const DEFAULT_SCROLL_DELTA: i64 = 500;

/// 模板未给出参数时使用的默认值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepDefaults {
    pub scroll_delta: i64,
    pub wait_seconds: f64,
}

impl Default for StepDefaults {
    fn default() -> Self {
        Self {
            scroll_delta: DEFAULT_SCROLL_DELTA,
            wait_seconds: DEFAULT_WAIT_SECONDS,
        }
    }
}

/// 单个步骤的动作，携带各自的参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepAction {
    Navigate { url: String },
    Click { selector: String },
    Type { selector: String, text: String },
    Select { selector: String, value: String },
    Hover { selector: String },
    Scroll { delta_y: i64 },
    Wait { seconds: f64 },
    WaitForElement { selector: String },
    Screenshot,
}

impl StepAction {
    /// 动作名称（用于日志和执行记录）
    pub fn kind(&self) -> &'static str {
        match self {
            StepAction::Navigate { .. } => "navigate",
            StepAction::Click { .. } => "click",
            StepAction::Type { .. } => "type",
            StepAction::Select { .. } => "select",
            StepAction::Hover { .. } => "hover",
            StepAction::Scroll { .. } => "scroll",
            StepAction::Wait { .. } => "wait",
            StepAction::WaitForElement { .. } => "wait_for_element",
            StepAction::Screenshot => "screenshot",
        }
    }

    /// 动作作用的 CSS 选择器（没有则返回 None）
    pub fn selector(&self) -> Option<&str> {
        match self {
            StepAction::Click { selector }
            | StepAction::Type { selector, .. }
            | StepAction::Select { selector, .. }
            | StepAction::Hover { selector }
            | StepAction::WaitForElement { selector } => Some(selector),
            StepAction::Navigate { .. }
            | StepAction::Scroll { .. }
            | StepAction::Wait { .. }
            | StepAction::Screenshot => None,
        }
    }

    /// 动作的目标（选择器或 URL）
    pub fn target(&self) -> Option<&str> {
        match self {
            StepAction::Navigate { url } => Some(url),
            other => other.selector(),
        }
    }

    /// 从模板中的字符串描述解析动作
    ///
    /// # 参数
    /// - `step`: 步骤序号（从 1 开始，仅用于错误信息）
    /// - `action`: 动作名称
    /// - `target`: 目标（选择器或 URL）
    /// - `metadata`: 附加参数（`text` / `value` / `seconds` / `delta`）
    /// - `defaults`: 缺少 `seconds` / `delta` 时的取值
    pub fn parse(
        step: usize,
        action: &str,
        target: &str,
        metadata: &BTreeMap<String, String>,
        defaults: &StepDefaults,
    ) -> Result<Self, ValidationError> {
        let normalized = action.trim().to_lowercase().replace(['-', ' '], "_");
        let require_target = |field: &str| -> Result<String, ValidationError> {
            let value = target.trim();
            if value.is_empty() {
                Err(ValidationError::MissingField {
                    step,
                    action: normalized.clone(),
                    field: field.to_string(),
                })
            } else {
                Ok(value.to_string())
            }
        };
        let require_meta = |field: &str| -> Result<String, ValidationError> {
            metadata
                .get(field)
                .cloned()
                .ok_or_else(|| ValidationError::MissingField {
                    step,
                    action: normalized.clone(),
                    field: format!("metadata.{}", field),
                })
        };

        let parsed = match normalized.as_str() {
            "navigate" | "goto" => StepAction::Navigate {
                url: require_target("target")?,
            },
            "click" => StepAction::Click {
                selector: require_target("target")?,
            },
            "type" | "fill" => StepAction::Type {
                selector: require_target("target")?,
                text: require_meta("text")?,
            },
            "select" => StepAction::Select {
                selector: require_target("target")?,
                value: require_meta("value")?,
            },
            "hover" => StepAction::Hover {
                selector: require_target("target")?,
            },
            "scroll" => {
                let delta_y = match metadata.get("delta") {
                    Some(raw) => raw.parse::<i64>().map_err(|_| ValidationError::InvalidValue {
                        step,
                        field: "metadata.delta".to_string(),
                        value: raw.clone(),
                    })?,
                    None => defaults.scroll_delta,
                };
                StepAction::Scroll { delta_y }
            }
            "wait" => {
                let seconds = match metadata.get("seconds") {
                    Some(raw) => parse_non_negative(step, "metadata.seconds", raw)?,
                    None => defaults.wait_seconds,
                };
                StepAction::Wait { seconds }
            }
            "wait_for_element" | "wait_for_selector" => StepAction::WaitForElement {
                selector: require_target("target")?,
            },
            "screenshot" => StepAction::Screenshot,
            _ => {
                return Err(ValidationError::UnknownAction {
                    step,
                    action: action.to_string(),
                })
            }
        };
        Ok(parsed)
    }
}

fn parse_non_negative(step: usize, field: &str, raw: &str) -> Result<f64, ValidationError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(ValidationError::InvalidValue {
            step,
            field: field.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// 截图时机
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScreenshotTiming {
    Before,
    #[default]
    After,
    Both,
    None,
}

impl ScreenshotTiming {
    pub fn before(self) -> bool {
        matches!(self, ScreenshotTiming::Before | ScreenshotTiming::Both)
    }

    pub fn after(self) -> bool {
        matches!(self, ScreenshotTiming::After | ScreenshotTiming::Both)
    }
}

/// 模板中的步骤（未校验）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepTemplate {
    pub action: String,
    #[serde(default)]
    pub target: String,
    pub description: String,
    #[serde(default)]
    pub narration: Option<String>,
    #[serde(default = "default_step_duration")]
    pub duration: f64,
    #[serde(default)]
    pub highlight: bool,
    #[serde(default)]
    pub screenshot: ScreenshotTiming,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

fn default_step_duration() -> f64 {
    1.0
}

impl StepTemplate {
    /// 便捷构造（内置目录使用）
    pub fn new(action: &str, target: &str, description: &str) -> Self {
        Self {
            action: action.to_string(),
            target: target.to_string(),
            description: description.to_string(),
            narration: None,
            duration: default_step_duration(),
            highlight: false,
            screenshot: ScreenshotTiming::After,
            metadata: BTreeMap::new(),
        }
    }

    pub fn highlighted(mut self) -> Self {
        self.highlight = true;
        self
    }

    pub fn with_meta(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_narration(mut self, narration: &str) -> Self {
        self.narration = Some(narration.to_string());
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = seconds;
        self
    }

    pub fn with_screenshot(mut self, timing: ScreenshotTiming) -> Self {
        self.screenshot = timing;
        self
    }
}

/// 校验后的演示步骤，创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoStep {
    pub id: String,
    pub action: StepAction,
    pub description: String,
    pub narration_text: Option<String>,
    pub duration_seconds: f64,
    pub highlight: bool,
    pub screenshot_timing: ScreenshotTiming,
    pub metadata: BTreeMap<String, String>,
}

impl DemoStep {
    /// 从模板步骤创建
    ///
    /// # 参数
    /// - `demo_id`: 所属演示ID（用于生成步骤ID）
    /// - `index`: 步骤序号（从 1 开始）
    pub fn from_template(
        demo_id: &str,
        index: usize,
        template: &StepTemplate,
        defaults: &StepDefaults,
    ) -> Result<Self, ValidationError> {
        let action = StepAction::parse(
            index,
            &template.action,
            &template.target,
            &template.metadata,
            defaults,
        )?;
        if !template.duration.is_finite() || template.duration < 0.0 {
            return Err(ValidationError::InvalidValue {
                step: index,
                field: "duration".to_string(),
                value: template.duration.to_string(),
            });
        }
        let narration_text = template
            .narration
            .as_ref()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Ok(Self {
            id: format!("{}-s{:02}", demo_id, index),
            action,
            description: template.description.trim().to_string(),
            narration_text,
            duration_seconds: template.duration,
            highlight: template.highlight,
            screenshot_timing: template.screenshot,
            metadata: template.metadata.clone(),
        })
    }

    /// 步骤目标（选择器或 URL）
    pub fn target(&self) -> Option<&str> {
        self.action.target()
    }
}
