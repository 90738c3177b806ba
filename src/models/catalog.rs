//! 演示模板目录
//!
//! 目录是不可变对象，在构造编排器时注入；内置目录之外还可以从 TOML 文件加载。

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::category::{Category, Difficulty};
use crate::models::demonstration::DemoType;
use crate::models::step::{ScreenshotTiming, StepTemplate};

/// 课程ID -> 分类名称（逗号分隔）
static COURSE_CATEGORIES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "AI501" => "machine_learning,data_science",
    "DS201" => "data_science",
    "CS101" => "programming,web_development",
    "WEB220" => "web_development",
    "SEC301" => "cybersecurity",
    "CLD310" => "cloud_computing,devops",
};

/// 演示模板
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoTemplate {
    /// 模板唯一键
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub topic: String,
    pub category: Category,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub demo_type: DemoType,
    pub target_url: String,
    #[serde(default = "default_estimated_duration")]
    pub estimated_duration_minutes: f64,
    #[serde(default = "default_persona")]
    pub narration_style: String,
    pub steps: Vec<StepTemplate>,
}

fn default_estimated_duration() -> f64 {
    3.0
}

fn default_persona() -> String {
    "mentor".to_string()
}

impl DemoTemplate {
    pub fn new(
        key: &str,
        category: Category,
        topic: &str,
        target_url: &str,
        steps: Vec<StepTemplate>,
    ) -> Self {
        Self {
            key: key.to_string(),
            title: topic.to_string(),
            description: String::new(),
            topic: topic.to_string(),
            category,
            difficulty: Difficulty::default(),
            demo_type: DemoType::default(),
            target_url: target_url.to_string(),
            estimated_duration_minutes: default_estimated_duration(),
            narration_style: default_persona(),
            steps,
        }
    }

    fn titled(mut self, title: &str, description: &str) -> Self {
        self.title = title.to_string();
        self.description = description.to_string();
        self
    }

    fn with_profile(mut self, difficulty: Difficulty, minutes: f64, persona: &str) -> Self {
        self.difficulty = difficulty;
        self.estimated_duration_minutes = minutes;
        self.narration_style = persona.to_string();
        self
    }
}

/// 演示模板目录
#[derive(Debug, Clone, Default)]
pub struct DemoCatalog {
    templates: Vec<DemoTemplate>,
    courses: BTreeMap<String, BTreeSet<Category>>,
}

impl DemoCatalog {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加模板（同键模板会被替换）
    pub fn with_template(mut self, template: DemoTemplate) -> Self {
        self.templates.retain(|t| t.key != template.key);
        self.templates.push(template);
        self
    }

    /// 添加课程映射
    pub fn with_course(
        mut self,
        course_id: &str,
        categories: impl IntoIterator<Item = Category>,
    ) -> Self {
        self.courses
            .entry(course_id.to_string())
            .or_default()
            .extend(categories);
        self
    }

    /// 合并另一个目录（后者优先）
    pub fn merge(mut self, other: DemoCatalog) -> Self {
        for template in other.templates {
            self = self.with_template(template);
        }
        for (course, categories) in other.courses {
            self = self.with_course(&course, categories);
        }
        self
    }

    pub fn templates(&self) -> &[DemoTemplate] {
        &self.templates
    }

    /// 课程对应的分类
    pub fn categories_for(&self, course_id: &str) -> Option<&BTreeSet<Category>> {
        self.courses.get(course_id)
    }

    /// 属于指定分类集合的模板（保持目录顺序）
    pub fn templates_for(&self, categories: &BTreeSet<Category>) -> Vec<&DemoTemplate> {
        self.templates
            .iter()
            .filter(|t| categories.contains(&t.category))
            .collect()
    }

    /// 内置目录
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for (course, names) in COURSE_CATEGORIES.entries() {
            let categories = names.split(',').filter_map(|n| n.parse::<Category>().ok());
            catalog = catalog.with_course(course, categories);
        }
        builtin_templates()
            .into_iter()
            .fold(catalog, |catalog, template| catalog.with_template(template))
    }
}

fn builtin_templates() -> Vec<DemoTemplate> {
    vec![
        DemoTemplate::new(
            "ml-playground-classifier",
            Category::MachineLearning,
            "training a neural network classifier",
            "https://playground.tensorflow.org",
            vec![
                StepTemplate::new("navigate", "https://playground.tensorflow.org", "Open the TensorFlow Playground")
                    .with_screenshot(ScreenshotTiming::After),
                StepTemplate::new("wait_for_element", "#play-pause-button", "Wait for the playground controls to load"),
                StepTemplate::new("select", "#problem", "Choose the classification problem type")
                    .with_meta("value", "classification")
                    .highlighted(),
                StepTemplate::new("click", "#add-layers", "Add a hidden layer to the network").highlighted(),
                StepTemplate::new("click", "#play-pause-button", "Start training the model")
                    .highlighted()
                    .with_duration(5.0)
                    .with_screenshot(ScreenshotTiming::Both),
                StepTemplate::new("wait", "", "Watch the decision boundary evolve").with_meta("seconds", "3"),
                StepTemplate::new("screenshot", "", "Capture the trained network"),
            ],
        )
        .titled(
            "Training your first classifier",
            "Build and train a small neural network in the browser.",
        )
        .with_profile(Difficulty::Beginner, 4.0, "professor"),
        DemoTemplate::new(
            "ml-teachable-machine",
            Category::MachineLearning,
            "collecting samples for an image model",
            "https://teachablemachine.withgoogle.com/train",
            vec![
                StepTemplate::new("navigate", "https://teachablemachine.withgoogle.com/train", "Open Teachable Machine"),
                StepTemplate::new("hover", "a[href*='image']", "Point at the image project option").highlighted(),
                StepTemplate::new("click", "a[href*='image']", "Start a new image project").highlighted(),
                StepTemplate::new("scroll", "", "Scroll down to the training panel").with_meta("delta", "600"),
                StepTemplate::new("wait", "", "Pause on the training options"),
            ],
        )
        .titled(
            "Teachable Machine tour",
            "Create an image classification project without code.",
        )
        .with_profile(Difficulty::Beginner, 3.0, "mentor"),
        DemoTemplate::new(
            "ds-kaggle-dataset",
            Category::DataScience,
            "finding and previewing a public dataset",
            "https://www.kaggle.com/datasets",
            vec![
                StepTemplate::new("navigate", "https://www.kaggle.com/datasets", "Open the Kaggle dataset browser"),
                StepTemplate::new("type", "input[type='search']", "Search for a housing prices dataset")
                    .with_meta("text", "housing prices")
                    .highlighted()
                    .with_narration("Type a topic you care about into the search box."),
                StepTemplate::new("wait_for_element", "ul[role='list'] li", "Wait for the search results"),
                StepTemplate::new("click", "ul[role='list'] li a", "Open the first dataset").highlighted(),
                StepTemplate::new("scroll", "", "Scroll to the data preview"),
            ],
        )
        .titled(
            "Finding data on Kaggle",
            "Search the Kaggle catalog and preview a dataset.",
        )
        .with_profile(Difficulty::Beginner, 3.5, "coach"),
        DemoTemplate::new(
            "ds-jupyter-notebook",
            Category::DataScience,
            "running cells in a Jupyter notebook",
            "https://jupyter.org/try-jupyter/lab/",
            vec![
                StepTemplate::new("navigate", "https://jupyter.org/try-jupyter/lab/", "Open JupyterLite"),
                StepTemplate::new("wait_for_element", ".jp-Launcher", "Wait for the launcher to appear"),
                StepTemplate::new("click", ".jp-LauncherCard[title*='Python']", "Create a new Python notebook")
                    .highlighted(),
                StepTemplate::new("type", ".jp-Cell .cm-content", "Write a first line of pandas code")
                    .with_meta("text", "import pandas as pd")
                    .highlighted(),
                StepTemplate::new("screenshot", "", "Capture the notebook"),
            ],
        )
        .titled(
            "Your first notebook",
            "Open JupyterLite in the browser and run Python code.",
        )
        .with_profile(Difficulty::Intermediate, 4.5, "professor"),
        DemoTemplate::new(
            "web-devtools-inspect",
            Category::WebDevelopment,
            "inspecting page structure",
            "https://developer.mozilla.org/en-US/",
            vec![
                StepTemplate::new("navigate", "https://developer.mozilla.org/en-US/", "Open MDN Web Docs"),
                StepTemplate::new("click", "#top-nav-search-input", "Focus the documentation search").highlighted(),
                StepTemplate::new("type", "#top-nav-search-input", "Search for the flexbox guide")
                    .with_meta("text", "flexbox"),
                StepTemplate::new("wait", "", "Wait for suggestions").with_meta("seconds", "1"),
            ],
        )
        .titled(
            "Searching MDN",
            "Use the MDN search to find a CSS layout guide.",
        )
        .with_profile(Difficulty::Beginner, 2.5, "peer"),
        DemoTemplate::new(
            "prog-python-tutor",
            Category::Programming,
            "stepping through code execution",
            "https://pythontutor.com/visualize.html",
            vec![
                StepTemplate::new("navigate", "https://pythontutor.com/visualize.html", "Open Python Tutor"),
                StepTemplate::new("select", "#pythonVersionSelector", "Pick the Python 3 runtime")
                    .with_meta("value", "3"),
                StepTemplate::new("click", "#executeBtn", "Visualize the execution").highlighted(),
                StepTemplate::new("click", "#jmpStepFwd", "Step forward one line").highlighted(),
            ],
        )
        .titled(
            "Visualizing Python",
            "Watch variables change as code runs line by line.",
        )
        .with_profile(Difficulty::Beginner, 3.0, "mentor"),
        DemoTemplate::new(
            "sec-owasp-juice-shop",
            Category::Cybersecurity,
            "spotting insecure login forms",
            "https://demo.owasp-juice.shop",
            vec![
                StepTemplate::new("navigate", "https://demo.owasp-juice.shop", "Open the OWASP Juice Shop"),
                StepTemplate::new("click", "button[aria-label='Close Welcome Banner']", "Dismiss the welcome banner"),
                StepTemplate::new("click", "#navbarAccount", "Open the account menu").highlighted(),
                StepTemplate::new("wait_for_element", "#navbarLoginButton", "Wait for the login entry"),
            ],
        )
        .titled(
            "Exploring a vulnerable app",
            "Tour a deliberately insecure shop used for security training.",
        )
        .with_profile(Difficulty::Intermediate, 3.0, "coach"),
        DemoTemplate::new(
            "cloud-pricing-calculator",
            Category::CloudComputing,
            "estimating cloud costs",
            "https://calculator.aws",
            vec![
                StepTemplate::new("navigate", "https://calculator.aws", "Open the AWS pricing calculator"),
                StepTemplate::new("click", "button[data-testid='create-estimate']", "Create a new estimate")
                    .highlighted(),
                StepTemplate::new("wait", "", "Let the service list load"),
            ],
        )
        .titled("Pricing a workload", "Build a simple cloud cost estimate.")
        .with_profile(Difficulty::Intermediate, 2.5, "professor"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_course_mapping() {
        let catalog = DemoCatalog::builtin();
        let categories = catalog.categories_for("AI501").unwrap();
        assert_eq!(
            categories.iter().copied().collect::<Vec<_>>(),
            vec![Category::MachineLearning, Category::DataScience]
        );
        assert!(catalog.categories_for("NOPE").is_none());
    }

    #[test]
    fn test_templates_for_filters_by_category() {
        let catalog = DemoCatalog::builtin();
        let categories = BTreeSet::from([Category::Cybersecurity]);
        let templates = catalog.templates_for(&categories);
        assert!(!templates.is_empty());
        assert!(templates.iter().all(|t| t.category == Category::Cybersecurity));
    }

    #[test]
    fn test_with_template_replaces_same_key() {
        let t = DemoTemplate::new("k", Category::DevOps, "a", "https://a", vec![]);
        let mut t2 = t.clone();
        t2.topic = "b".to_string();
        let catalog = DemoCatalog::new().with_template(t).with_template(t2);
        assert_eq!(catalog.templates().len(), 1);
        assert_eq!(catalog.templates()[0].topic, "b");
    }
}
