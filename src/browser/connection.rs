use anyhow::{Context, Result};
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 连接到已开启调试端口的浏览器，并取得测评页面
///
/// 优先复用 URL 以 `page_uri` 开头的已有标签页（其中已有 hubspotutk cookie），
/// 找不到时新开一个页面并导航过去
pub async fn connect_to_browser_and_page(port: u16, page_uri: &str) -> Result<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url)
        .await
        .map_err(|e| {
            error!("连接浏览器失败: {}", e);
            e
        })
        .with_context(|| format!("无法连接到浏览器调试端口 {}", port))?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());

    for p in pages.iter() {
        if let Ok(Some(url)) = p.url().await {
            if url.starts_with(page_uri) {
                info!("✓ 复用已打开的测评页面: {}", url);
                return Ok((browser, p.clone()));
            }
        }
    }

    debug!("未找到测评页面，新建页面并导航到: {}", page_uri);
    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建新页面失败: {}", e);
        e
    })?;
    page.goto(page_uri)
        .await
        .with_context(|| format!("导航到 {} 失败", page_uri))?;
    info!("已导航到: {}", page_uri);

    Ok((browser, page))
}
