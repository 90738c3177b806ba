use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// 演示分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// 机器学习
    MachineLearning,
    /// 数据科学
    DataScience,
    /// Web 开发
    WebDevelopment,
    /// 编程基础
    Programming,
    /// 网络安全
    Cybersecurity,
    /// 云计算
    CloudComputing,
    /// 运维
    #[serde(rename = "devops")]
    DevOps,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::MachineLearning,
        Category::DataScience,
        Category::WebDevelopment,
        Category::Programming,
        Category::Cybersecurity,
        Category::CloudComputing,
        Category::DevOps,
    ];

    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            Category::MachineLearning => "machine_learning",
            Category::DataScience => "data_science",
            Category::WebDevelopment => "web_development",
            Category::Programming => "programming",
            Category::Cybersecurity => "cybersecurity",
            Category::CloudComputing => "cloud_computing",
            Category::DevOps => "devops",
        }
    }
}

/// 从字符串解析分类（忽略大小写、连字符和下划线）
impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "machinelearning" | "ml" => Ok(Category::MachineLearning),
            "datascience" | "ds" => Ok(Category::DataScience),
            "webdevelopment" | "web" => Ok(Category::WebDevelopment),
            "programming" => Ok(Category::Programming),
            "cybersecurity" | "security" => Ok(Category::Cybersecurity),
            "cloudcomputing" | "cloud" => Ok(Category::CloudComputing),
            "devops" => Ok(Category::DevOps),
            _ => Err(ValidationError::UnknownCategory {
                name: s.trim().to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 难度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_common_spellings() {
        assert_eq!("MachineLearning".parse::<Category>().ok(), Some(Category::MachineLearning));
        assert_eq!("machine_learning".parse::<Category>().ok(), Some(Category::MachineLearning));
        assert_eq!("data-science".parse::<Category>().ok(), Some(Category::DataScience));
        assert_eq!(" Cloud ".parse::<Category>().ok(), Some(Category::CloudComputing));
    }

    #[test]
    fn test_unknown_name_is_validation_error() {
        let err = "unknown".parse::<Category>().unwrap_err();
        assert!(matches!(err, ValidationError::UnknownCategory { ref name } if name == "unknown"));
    }

    #[test]
    fn test_name_round_trips() {
        for category in Category::ALL {
            assert_eq!(category.name().parse::<Category>().ok(), Some(category));
        }
    }
}
