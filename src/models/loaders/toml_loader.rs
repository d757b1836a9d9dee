use crate::error::{AppError, AppResult};
use crate::models::question::QuestionBank;
use crate::models::session::SessionFile;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载一个会话
pub async fn load_session_file(toml_file_path: &Path) -> AppResult<SessionFile> {
    let path_str = toml_file_path.display().to_string();
    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|source| AppError::File {
            path: path_str.clone(),
            source,
        })?;

    let mut session: SessionFile = toml::from_str(&content).map_err(|source| AppError::TomlParse {
        path: path_str.clone(),
        source,
    })?;

    session.file_path = Some(path_str);

    Ok(session)
}

/// 从文件夹中加载所有会话文件（按文件名排序，解析失败的文件跳过并告警）
pub async fn load_all_session_files(folder_path: &str) -> Result<Vec<SessionFile>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut toml_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    toml_files.sort();

    let mut sessions = Vec::new();
    for path in toml_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_session_file(&path).await {
            Ok(session) => {
                tracing::info!("成功加载 {} 条答案", session.answers.len());
                sessions.push(session);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(sessions)
}

/// 加载题库：指定文件时从文件读取，否则使用内置题库
pub async fn load_question_bank(path: Option<&str>) -> AppResult<QuestionBank> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path).await.map_err(|source| AppError::File {
                path: path.to_string(),
                source,
            })?;
            Ok(QuestionBank::from_toml_str(&content)?)
        }
        None => Ok(QuestionBank::builtin()?),
    }
}
