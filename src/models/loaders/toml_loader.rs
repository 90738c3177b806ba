use crate::models::catalog::{DemoCatalog, DemoTemplate};
use crate::models::category::Category;
use crate::models::persona::PersonaStyle;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// TOML 目录文件结构
///
/// ```toml
/// [courses]
/// AI501 = ["machine_learning", "data_science"]
///
/// [[templates]]
/// key = "ml-intro"
/// title = "Intro"
/// topic = "machine learning basics"
/// category = "machine_learning"
/// target_url = "https://example.com"
///
/// [[templates.steps]]
/// action = "navigate"
/// target = "https://example.com"
/// description = "Open the page"
/// ```
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    courses: BTreeMap<String, Vec<Category>>,
    #[serde(default)]
    templates: Vec<DemoTemplate>,
}

/// 人设文件结构
#[derive(Debug, Deserialize)]
struct PersonaFile {
    #[serde(default)]
    personas: Vec<PersonaStyle>,
}

/// 从单个 TOML 文件加载目录
pub async fn load_catalog_file(toml_file_path: &Path) -> Result<DemoCatalog> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    parse_catalog(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))
}

/// 解析目录文本
pub fn parse_catalog(content: &str) -> Result<DemoCatalog> {
    let file: CatalogFile = toml::from_str(content)?;
    let mut catalog = DemoCatalog::new();
    for (course, categories) in file.courses {
        catalog = catalog.with_course(&course, categories);
    }
    for template in file.templates {
        catalog = catalog.with_template(template);
    }
    Ok(catalog)
}

/// 从文件夹中加载所有 TOML 目录文件并合并
///
/// 单个文件解析失败只记录警告，不影响其他文件。
pub async fn load_catalog_folder(folder_path: &Path) -> Result<DemoCatalog> {
    if !folder_path.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path.display());
    }

    let mut toml_files: Vec<PathBuf> = Vec::new();
    let mut entries = fs::read_dir(folder_path)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    // 按文件名排序，保证合并顺序稳定
    toml_files.sort();

    let mut catalog = DemoCatalog::new();
    for path in toml_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_catalog_file(&path).await {
            Ok(loaded) => {
                tracing::info!("成功加载 {} 个模板", loaded.templates().len());
                catalog = catalog.merge(loaded);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {:#}", path.display(), e);
            }
        }
    }

    Ok(catalog)
}

/// 加载人设文件
pub async fn load_persona_file(toml_file_path: &Path) -> Result<Vec<PersonaStyle>> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取人设文件: {}", toml_file_path.display()))?;

    let file: PersonaFile = toml::from_str(&content)
        .with_context(|| format!("无法解析人设文件: {}", toml_file_path.display()))?;

    Ok(file.personas)
}
