/// 日志工具模块
///
/// 提供日志初始化、日志文件头和批量处理各阶段的横幅输出
use anyhow::Result;
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::services::ScoreCard;

/// 初始化 tracing 订阅器
///
/// `RUST_LOG` 优先；未设置时 verbose 为 debug，否则为 info。重复调用是安全的
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n测评提交日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(max_concurrent: usize, portal_id: &str, form_id: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 测评结果批量提交");
    info!("📊 最大并发数: {}", max_concurrent);
    info!("🎯 HubSpot 表单: {}/{}", portal_id, form_id);
    info!("{}", "=".repeat(60));
}

/// 记录会话加载信息
pub fn log_sessions_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 找到 {} 个待提交的会话", total);
    info!("📋 将以每批 {} 个的方式处理", max_concurrent);
}

/// 记录批次开始信息
pub fn log_batch_start(batch_num: usize, total_batches: usize, start: usize, end: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批会话: {}-{} / 共 {} 个", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 成功 {}/{}", batch_num, success, total);
    info!("{}", "─".repeat(60));
}

/// 输出单个会话的计分结果（无论提交是否成功都会显示）
pub fn log_score_card(session_index: usize, card: &ScoreCard) {
    info!(
        "[会话 {}] 📝 总分 {}/{} ({}%) → {}",
        session_index,
        card.total,
        card.max_total,
        card.percentage(),
        card.tier()
    );
    for (pillar, points) in &card.by_pillar {
        info!("[会话 {}]    {}: {}", session_index, pillar, points);
    }
}

/// 打印最终统计信息
pub fn print_final_stats(submitted: usize, exhausted: usize, invalid: usize, total: usize, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已提交: {}/{}", submitted, total);
    info!("❌ 提交耗尽: {}", exhausted);
    info!("⚠️ 数据无效: {}", invalid);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
