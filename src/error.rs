use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 自动化会话错误（对单个演示是致命的）
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 单步执行错误（只影响当前步骤）
    #[error("步骤错误: {0}")]
    Step(#[from] StepError),
    /// 外部工具错误（语音 / 探测 / 合成 / 混流）
    #[error("外部工具错误: {0}")]
    Tool(#[from] ToolError),
    /// 模板或状态校验错误
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 演示库不存在
    #[error("演示库不存在: {library_id}")]
    LibraryNotFound { library_id: String },
    /// 演示不存在
    #[error("演示不存在: {demo_id}")]
    DemoNotFound { demo_id: String },
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 浏览器自动化会话错误
#[derive(Debug, Error)]
pub enum SessionError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {reason}")]
    ConnectionFailed { port: u16, reason: String },
    /// 启动浏览器失败
    #[error("启动浏览器失败: {reason}")]
    LaunchFailed { reason: String },
    /// 创建页面失败
    #[error("创建页面失败: {reason}")]
    PageCreationFailed { reason: String },
    /// 开始录制失败
    #[error("开始录制失败 (演示: {demo_id}): {reason}")]
    RecordingFailed { demo_id: String, reason: String },
}

/// 单步执行错误
#[derive(Debug, Error)]
pub enum StepError {
    /// 目标元素不存在
    #[error("未找到元素: {selector}")]
    ElementNotFound { selector: String },
    /// 等待超时
    #[error("{action} 超时 ({timeout_secs:.1}s): {target}")]
    Timeout {
        action: String,
        target: String,
        timeout_secs: f64,
    },
    /// 浏览器动作失败
    #[error("{action} 执行失败: {reason}")]
    ActionFailed { action: String, reason: String },
    /// 截图失败
    #[error("截图失败 ({path}): {reason}")]
    ScreenshotFailed { path: String, reason: String },
}

/// 外部工具错误
#[derive(Debug, Error)]
pub enum ToolError {
    /// 工具不可用
    #[error("{tool} 不可用")]
    Unavailable { tool: String },
    /// 无法启动工具进程
    #[error("无法启动 {tool}: {reason}")]
    SpawnFailed { tool: String, reason: String },
    /// 工具以非零状态退出
    #[error("{tool} 执行失败 (退出码: {code:?}): {stderr}")]
    NonZeroExit {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },
    /// 工具输出无法解析
    #[error("{tool} 输出解析失败: {reason}")]
    BadOutput { tool: String, reason: String },
    /// 请求远程服务失败
    #[error("请求 {endpoint} 失败: {reason}")]
    RequestFailed { endpoint: String, reason: String },
}

/// 校验错误
#[derive(Debug, Error)]
pub enum ValidationError {
    /// 未知的动作类型
    #[error("步骤 {step} 的动作类型未知: {action}")]
    UnknownAction { step: usize, action: String },
    /// 缺少必须的字段
    #[error("步骤 {step} ({action}) 缺少字段: {field}")]
    MissingField {
        step: usize,
        action: String,
        field: String,
    },
    /// 数值非法
    #[error("步骤 {step} 的 {field} 非法: {value}")]
    InvalidValue {
        step: usize,
        field: String,
        value: String,
    },
    /// 模板没有任何步骤
    #[error("模板 {template} 没有任何步骤")]
    EmptyTemplate { template: String },
    /// 未知分类
    #[error("未知的分类: {name}")]
    UnknownCategory { name: String },
    /// 未知课程
    #[error("课程 {course_id} 没有对应的分类")]
    UnknownCourse { course_id: String },
    /// 非法状态迁移
    #[error("非法状态迁移: {from} -> {to}")]
    IllegalTransition { from: String, to: String },
    /// 产物已存在，不允许覆盖
    #[error("产物 {artifact} 已存在: {existing}")]
    ArtifactAlreadyAttached { artifact: String, existing: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {reason}")]
    TomlParseFailed { path: String, reason: String },
    /// JSON 序列化失败
    #[error("JSON序列化失败: {0}")]
    Json(#[from] serde_json::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Step(StepError::ActionFailed {
            action: "cdp".to_string(),
            reason: err.to_string(),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::File(FileError::Json(err))
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            reason: err.to_string(),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: String::new(),
            source: err,
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }
}

impl StepError {
    /// 包装浏览器动作失败
    pub fn action_failed(action: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        StepError::ActionFailed {
            action: action.into(),
            reason: reason.to_string(),
        }
    }
}

impl ToolError {
    /// 包装进程启动失败
    pub fn spawn_failed(tool: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ToolError::SpawnFailed {
            tool: tool.into(),
            reason: reason.to_string(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
