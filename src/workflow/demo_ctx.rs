//! 演示处理上下文
//!
//! 封装"我正在处理哪个演示库的第几个演示"这一信息

use std::fmt::Display;

/// 演示处理上下文
#[derive(Debug, Clone)]
pub struct DemoCtx {
    /// 演示库ID
    pub library_id: String,

    /// 演示在库中的序号（从1开始，仅用于日志显示）
    pub demo_index: usize,

    /// 库中演示总数
    pub total: usize,
}

impl DemoCtx {
    pub fn new(library_id: impl Into<String>, demo_index: usize, total: usize) -> Self {
        Self {
            library_id: library_id.into(),
            demo_index,
            total,
        }
    }
}

impl Display for DemoCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[演示 {}/{}]", self.demo_index, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefix() {
        assert_eq!(DemoCtx::new("lib", 2, 5).to_string(), "[演示 2/5]");
    }
}
