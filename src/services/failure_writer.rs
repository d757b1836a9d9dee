//! 失败记录服务 - 业务能力层
//!
//! 只负责把投递耗尽的会话写入失败记录文件，供人工重试

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

/// 失败记录服务
pub struct FailureWriter {
    file_path: String,
}

impl FailureWriter {
    /// 使用指定的记录文件创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            file_path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.file_path
    }

    /// 追加一条失败记录
    ///
    /// # 参数
    /// - `session_index`: 会话索引
    /// - `email`: 联系人邮箱
    /// - `source`: 会话来源文件
    /// - `reason`: 失败原因
    pub fn write(&self, session_index: usize, email: &str, source: Option<&str>, reason: &str) -> Result<()> {
        debug!("写入失败记录: 会话 {} | {}", session_index, email);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
            .with_context(|| format!("无法打开失败记录文件: {}", self.file_path))?;

        let line = format!(
            "{} | 会话 {} | {} | 文件: {} | 原因: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            session_index,
            email,
            source.unwrap_or("-"),
            reason
        );

        file.write_all(line.as_bytes())?;

        Ok(())
    }
}
