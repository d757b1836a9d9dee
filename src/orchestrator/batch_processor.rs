//! 批量会话处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：日志文件、题库、浏览器、三个投递通道
//! 2. **批量加载**：扫描并加载所有待提交的会话（`Vec<SessionFile>`）
//! 3. **并发控制**：使用 Semaphore 限制同时运行的提交编排器数量
//! 4. **分批处理**：每批完成后再开始下一批
//! 5. **全局统计**：汇总所有会话的处理结果

use crate::browser;
use crate::channels::{DeliveryChannel, DirectApiChannel, EmbeddedWidgetChannel, HiddenFormChannel};
use crate::config::Config;
use crate::infrastructure::{JsExecutor, ScriptLoader};
use crate::models::{QuestionBank, SessionFile};
use crate::orchestrator::session_processor::{self, SessionOutcome};
use crate::services::FailureWriter;
use crate::utils::logging::{
    init_log_file, log_batch_complete, log_batch_start, log_sessions_loaded, log_startup,
    print_final_stats,
};
use anyhow::Result;
use chromiumoxide::Browser;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    bank: Arc<QuestionBank>,
    channels: Vec<Arc<dyn DeliveryChannel>>,
    failure_writer: Arc<FailureWriter>,
    _browser: Option<Browser>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)?;

        log_startup(
            config.max_concurrent_submissions,
            &config.hubspot_portal_id,
            &config.hubspot_form_id,
        );

        let bank = crate::models::load_question_bank(config.question_bank_file.as_deref()).await?;
        info!("✓ 题库已加载: {} 题，满分 {}", bank.len(), bank.max_score());

        let (browser, executor) = match open_browser(&config).await {
            Some((browser, page)) => (Some(browser), Some(Arc::new(JsExecutor::new(page)))),
            None => (None, None),
        };

        let channels = build_channels(&config, executor)?;

        Ok(Self {
            failure_writer: Arc::new(FailureWriter::with_path(&config.failed_submissions_file)),
            config,
            bank: Arc::new(bank),
            channels,
            _browser: browser,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let all_sessions = self.load_sessions().await?;

        if all_sessions.is_empty() {
            warn!("⚠️ 没有找到待提交的会话文件，程序结束");
            return Ok(());
        }

        log_sessions_loaded(all_sessions.len(), self.config.max_concurrent_submissions);

        let stats = self.process_all_sessions(all_sessions).await?;

        print_final_stats(
            stats.submitted,
            stats.exhausted,
            stats.invalid,
            stats.total,
            &self.config.output_log_file,
        );

        Ok(())
    }

    async fn load_sessions(&self) -> Result<Vec<SessionFile>> {
        info!("\n📁 正在扫描待提交的会话...");
        crate::models::load_all_session_files(&self.config.sessions_folder).await
    }

    async fn process_all_sessions(&self, all_sessions: Vec<SessionFile>) -> Result<ProcessingStats> {
        let batch_size = self.config.max_concurrent_submissions.max(1);
        let semaphore = Arc::new(Semaphore::new(batch_size));
        let total = all_sessions.len();
        let total_batches = (total + batch_size - 1) / batch_size;
        let mut stats = ProcessingStats {
            total,
            ..Default::default()
        };

        let mut remaining = all_sessions.into_iter();
        for batch_num in 1..=total_batches {
            let batch_start = (batch_num - 1) * batch_size;
            let batch: Vec<SessionFile> = remaining.by_ref().take(batch_size).collect();
            let batch_end = batch_start + batch.len();

            log_batch_start(batch_num, total_batches, batch_start + 1, batch_end, total);

            let batch_stats = self.process_batch(batch, batch_start, semaphore.clone()).await?;

            log_batch_complete(batch_num, batch_stats.submitted, batch_stats.total);

            stats.submitted += batch_stats.submitted;
            stats.exhausted += batch_stats.exhausted;
            stats.invalid += batch_stats.invalid;
        }

        Ok(stats)
    }

    async fn process_batch(
        &self,
        batch: Vec<SessionFile>,
        batch_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> Result<ProcessingStats> {
        let mut handles = Vec::new();

        for (idx, file) in batch.into_iter().enumerate() {
            let session_index = batch_start + idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;

            let channels = self.channels.clone();
            let bank = Arc::clone(&self.bank);
            let config = self.config.clone();
            let failure_writer = Arc::clone(&self.failure_writer);

            let handle = tokio::spawn(async move {
                let _permit = permit;
                session_processor::process_session(
                    channels,
                    &bank,
                    file,
                    session_index,
                    &config,
                    &failure_writer,
                )
                .await
            });
            handles.push((session_index, handle));
        }

        let mut stats = ProcessingStats::default();

        for (session_index, handle) in handles {
            stats.total += 1;
            match handle.await {
                Ok(Ok(SessionOutcome::Submitted)) => stats.submitted += 1,
                Ok(Ok(SessionOutcome::Exhausted)) => stats.exhausted += 1,
                Ok(Ok(SessionOutcome::Invalid)) => stats.invalid += 1,
                Ok(Err(e)) => {
                    error!("[会话 {}] ❌ 处理过程中发生错误: {}", session_index, e);
                    stats.exhausted += 1;
                }
                Err(e) => {
                    error!("[会话 {}] 任务执行失败: {}", session_index, e);
                    stats.exhausted += 1;
                }
            }
        }

        Ok(stats)
    }
}

/// 处理统计
#[derive(Debug, Default)]
struct ProcessingStats {
    submitted: usize,
    exhausted: usize,
    invalid: usize,
    total: usize,
}

/// 按固定顺序构建三个投递通道：嵌入式表单、直接 API、隐藏表单
pub fn build_channels(config: &Config, executor: Option<Arc<JsExecutor>>) -> Result<Vec<Arc<dyn DeliveryChannel>>> {
    let target = config.hubspot_target();
    let (load_timeout, submit_timeout) = config.widget_timeouts();

    let loader = executor.as_ref().map(|executor| {
        Arc::new(ScriptLoader::new(
            Arc::clone(executor),
            target.embed_script_url.clone(),
            load_timeout,
        ))
    });

    let widget = EmbeddedWidgetChannel::new(loader, target.clone(), submit_timeout);
    let api = DirectApiChannel::new(
        target.clone(),
        config.page_uri.clone(),
        config.page_name.clone(),
        config.channel_timeout(),
    )?;
    let hidden = HiddenFormChannel::new(executor, target, config.page_uri.clone(), config.page_name.clone());

    let channels: Vec<Arc<dyn DeliveryChannel>> = vec![Arc::new(widget), Arc::new(api), Arc::new(hidden)];
    Ok(channels)
}

/// 打开浏览器：先连接调试端口，失败则尝试启动无头浏览器
///
/// 都失败时返回 None，依赖浏览器的两个通道会直接报告失败
async fn open_browser(config: &Config) -> Option<(Browser, chromiumoxide::Page)> {
    match browser::connect_to_browser_and_page(config.browser_debug_port, &config.page_uri).await {
        Ok(pair) => return Some(pair),
        Err(e) => warn!("⚠️ 无法连接调试端口浏览器: {}，尝试启动无头浏览器", e),
    }

    let executable = config.chrome_executable.as_deref().map(Path::new);
    match browser::launch_headless_browser(&config.page_uri, executable).await {
        Ok(pair) => Some(pair),
        Err(e) => {
            warn!("⚠️ 浏览器不可用: {}，嵌入式表单与隐藏表单通道将直接失败", e);
            None
        }
    }
}
