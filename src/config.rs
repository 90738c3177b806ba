use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::StepDefaults;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 要生成演示库的课程ID
    pub course_id: String,
    /// 产物输出根目录
    pub output_root: PathBuf,
    /// 浏览器调试端口（连接已打开的浏览器）
    pub browser_debug_port: u16,
    /// 是否启动无头浏览器而不是连接已有浏览器
    pub use_headless: bool,
    /// 无头模式下使用的浏览器可执行文件
    pub chrome_executable: Option<PathBuf>,
    /// TOML 模板目录（为空时使用内置目录）
    pub catalog_folder: Option<PathBuf>,
    /// 讲解人设 TOML 文件
    pub persona_file: Option<PathBuf>,
    /// 语音合成服务地址（为空时只生成文字稿）
    pub speech_endpoint: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- 各阶段配置 ---
    pub automation: AutomationConfig,
    pub narration: NarrationConfig,
    pub enhancement: EnhancementConfig,
    pub media: MediaToolConfig,
}

/// 浏览器自动化的时序配置
#[derive(Clone, Debug)]
pub struct AutomationConfig {
    /// 点击后的等待
    pub post_click_delay: Duration,
    /// 悬停停留时长
    pub hover_dwell: Duration,
    /// 高亮保持时长
    pub highlight_hold: Duration,
    /// 导航超时
    pub navigate_timeout: Duration,
    /// 等待元素超时
    pub element_timeout: Duration,
    /// 等待元素时的轮询间隔
    pub poll_interval: Duration,
    /// 默认滚动距离（像素）
    pub scroll_delta: i64,
    /// Wait 动作的默认时长（秒）
    pub default_wait_seconds: f64,
    /// 录制抓帧间隔
    pub frame_interval: Duration,
    /// 是否真正执行 durationSeconds 的等待（测试时关闭）
    pub honor_step_durations: bool,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            post_click_delay: Duration::from_millis(500),
            hover_dwell: Duration::from_secs(1),
            highlight_hold: Duration::from_secs(1),
            navigate_timeout: Duration::from_secs(30),
            element_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
            scroll_delta: 500,
            default_wait_seconds: 2.0,
            frame_interval: Duration::from_millis(200),
            honor_step_durations: true,
        }
    }
}

impl AutomationConfig {
    /// 模板缺省参数（滚动距离、等待时长）
    pub fn step_defaults(&self) -> StepDefaults {
        StepDefaults {
            scroll_delta: self.scroll_delta,
            wait_seconds: self.default_wait_seconds,
        }
    }

    /// 所有等待都为零的配置，用于测试
    pub fn instant() -> Self {
        Self {
            post_click_delay: Duration::ZERO,
            hover_dwell: Duration::ZERO,
            highlight_hold: Duration::ZERO,
            navigate_timeout: Duration::from_millis(50),
            element_timeout: Duration::from_millis(50),
            poll_interval: Duration::from_millis(5),
            honor_step_durations: false,
            ..Self::default()
        }
    }
}

/// 旁白生成配置
#[derive(Clone, Debug)]
pub struct NarrationConfig {
    /// 相邻旁白之间的停顿（秒）
    pub pause_gap_seconds: f64,
    /// 基准语速（每分钟词数）
    pub words_per_minute: f64,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            pause_gap_seconds: 0.5,
            words_per_minute: 150.0,
        }
    }
}

/// 视频增强配置
#[derive(Clone, Debug)]
pub struct EnhancementConfig {
    /// 是否叠加标注
    pub annotations: bool,
    /// 淡入淡出时长（秒）
    pub fade_seconds: f64,
    /// 背景颜色
    pub background_color: String,
    /// 高亮框颜色
    pub highlight_color: String,
    /// 探测失败时使用的时长（秒）
    pub fallback_duration: f64,
    /// 探测失败时使用的分辨率
    pub fallback_width: u32,
    pub fallback_height: u32,
    /// 探测失败时使用的帧率
    pub fallback_fps: f64,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            annotations: true,
            fade_seconds: 1.0,
            background_color: "black".to_string(),
            highlight_color: "yellow".to_string(),
            fallback_duration: 60.0,
            fallback_width: 1920,
            fallback_height: 1080,
            fallback_fps: 30.0,
        }
    }
}

/// 外部媒体工具配置
#[derive(Clone, Debug)]
pub struct MediaToolConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
}

impl Default for MediaToolConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            course_id: "AI501".to_string(),
            output_root: PathBuf::from("output"),
            browser_debug_port: 9222,
            use_headless: true,
            chrome_executable: None,
            catalog_folder: None,
            persona_file: None,
            speech_endpoint: None,
            verbose_logging: false,
            output_log_file: "demo_run.txt".to_string(),
            automation: AutomationConfig::default(),
            narration: NarrationConfig::default(),
            enhancement: EnhancementConfig::default(),
            media: MediaToolConfig::default(),
        }
    }
}

impl Config {
    /// 从环境变量读取配置，未设置的项使用默认值
    ///
    /// 设置了但无法解析的值会返回 [`ConfigError::EnvVarParseFailed`]
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();
        let mut automation = default.automation.clone();
        if let Some(secs) = env_parse::<f64>("STEP_TIMEOUT_SECONDS")? {
            let timeout = Duration::from_secs_f64(secs.max(0.0));
            automation.navigate_timeout = timeout;
            automation.element_timeout = timeout;
        }
        if let Some(ms) = env_parse::<u64>("FRAME_INTERVAL_MS")? {
            automation.frame_interval = Duration::from_millis(ms.max(10));
        }
        let mut narration = default.narration.clone();
        if let Some(gap) = env_parse::<f64>("PAUSE_GAP_SECONDS")? {
            narration.pause_gap_seconds = gap.max(0.0);
        }
        let mut enhancement = default.enhancement.clone();
        if let Some(fade) = env_parse::<f64>("FADE_SECONDS")? {
            enhancement.fade_seconds = fade.max(0.0);
        }
        let media = MediaToolConfig {
            ffmpeg_path: std::env::var("FFMPEG_PATH").unwrap_or(default.media.ffmpeg_path),
            ffprobe_path: std::env::var("FFPROBE_PATH").unwrap_or(default.media.ffprobe_path),
        };

        Ok(Self {
            course_id: std::env::var("COURSE_ID").unwrap_or(default.course_id),
            output_root: std::env::var("OUTPUT_ROOT").map(PathBuf::from).unwrap_or(default.output_root),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT")?.unwrap_or(default.browser_debug_port),
            use_headless: env_parse("USE_HEADLESS")?.unwrap_or(default.use_headless),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().map(PathBuf::from),
            catalog_folder: std::env::var("CATALOG_FOLDER").ok().map(PathBuf::from),
            persona_file: std::env::var("PERSONA_FILE").ok().map(PathBuf::from),
            speech_endpoint: std::env::var("SPEECH_ENDPOINT").ok().filter(|v| !v.is_empty()),
            verbose_logging: env_parse("VERBOSE_LOGGING")?.unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            automation,
            narration,
            enhancement,
            media,
        })
    }
}

/// 读取并解析环境变量：未设置返回 None，无法解析返回错误
fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.course_id, "AI501");
        assert_eq!(config.browser_debug_port, 9222);
        assert_eq!(config.narration.pause_gap_seconds, 0.5);
        assert_eq!(config.enhancement.fallback_duration, 60.0);
    }

    #[test]
    fn test_env_parse_rejects_garbage() {
        std::env::set_var("DEMO_STUDIO_TEST_PORT", "not-a-port");
        let err = env_parse::<u16>("DEMO_STUDIO_TEST_PORT").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarParseFailed { .. }));
        std::env::remove_var("DEMO_STUDIO_TEST_PORT");
        assert!(env_parse::<u16>("DEMO_STUDIO_TEST_PORT").unwrap().is_none());
    }

    #[test]
    fn test_instant_automation_has_no_delays() {
        let a = AutomationConfig::instant();
        assert_eq!(a.post_click_delay, Duration::ZERO);
        assert!(!a.honor_step_durations);
    }
}
