use assessment_submit::channels::{DeliveryChannel, DirectApiChannel};
use assessment_submit::config::Config;
use assessment_submit::models::{AnswerRecord, AssessmentSubmission, FormField, QuestionBank, RawUserInfo, SessionFile};
use assessment_submit::orchestrator::build_channels;
use assessment_submit::services::FailureWriter;
use assessment_submit::{process_session, DeliveryError, SessionOutcome};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_test::{assert_err, assert_ok};

/// 本地假 HubSpot：每个连接都返回同样的响应，并记录收到的请求
async fn serve(status: u16, body: &'static str) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&requests);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let request = read_request(&mut socket).await;
            captured.lock().unwrap().push(request);

            let response = format!(
                "HTTP/1.1 {} Mock\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{}", addr), requests)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= pos + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).to_string()
}

fn test_config(api_base_url: &str, tag: &str) -> Config {
    Config {
        hubspot_portal_id: "123".to_string(),
        hubspot_form_id: "form-1".to_string(),
        hubspot_api_base_url: api_base_url.to_string(),
        submission_delay_ms: 1,
        backoff_step_ms: 1,
        channel_timeout_secs: 5,
        failed_submissions_file: std::env::temp_dir()
            .join(format!("failed_{}_{}.txt", tag, std::process::id()))
            .to_string_lossy()
            .to_string(),
        ..Config::default()
    }
}

fn complete_session(bank: &QuestionBank, points: u32) -> SessionFile {
    let answers = bank
        .questions
        .iter()
        .enumerate()
        .map(|(idx, q)| AnswerRecord {
            question: idx,
            option: q.options.iter().find(|o| o.points == points).unwrap().id.clone(),
        })
        .collect();

    SessionFile {
        user_info: RawUserInfo {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            company: "Analytical Engines".to_string(),
            hutk: Some("hutk-123".to_string()),
        },
        answers,
        file_path: Some("sessions/ada.toml".to_string()),
    }
}

fn submission() -> AssessmentSubmission {
    AssessmentSubmission {
        fields: vec![
            FormField::new("email", "ada@example.com"),
            FormField::new("ai_readiness_score", 100),
        ],
        hutk: None,
        email: "ada@example.com".to_string(),
        created_at: chrono::Local::now(),
    }
}

#[tokio::test]
async fn test_direct_api_posts_fields_and_context() {
    let (url, requests) = serve(200, r#"{"inlineMessage":"Thanks!"}"#).await;
    let config = test_config(&url, "direct");
    let channel = DirectApiChannel::new(
        config.hubspot_target(),
        "https://example.com/quiz",
        "Quiz",
        Duration::from_secs(5),
    )
    .unwrap();

    assert_ok!(channel.deliver(&submission()).await);

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(request.starts_with("POST /submissions/v3/integration/submit/123/form-1 HTTP/1.1"));
    assert!(request.contains(r#""fields":[{"name":"email","value":"ada@example.com"},{"name":"ai_readiness_score","value":"100"}]"#));
    assert!(request.contains(r#""pageUri":"https://example.com/quiz""#));
}

#[tokio::test]
async fn test_direct_api_reports_error_message() {
    let (url, _) = serve(400, r#"{"status":"error","message":"Form not found"}"#).await;
    let config = test_config(&url, "bad_status");
    let channel = DirectApiChannel::new(config.hubspot_target(), "u", "n", Duration::from_secs(5)).unwrap();

    match channel.deliver(&submission()).await {
        Err(DeliveryError::BadStatus { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message.as_deref(), Some("Form not found"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_direct_api_rejects_unparseable_body() {
    let (url, _) = serve(200, "<html>ok</html>").await;
    let config = test_config(&url, "bad_body");
    let channel = DirectApiChannel::new(config.hubspot_target(), "u", "n", Duration::from_secs(5)).unwrap();

    let result = channel.deliver(&submission()).await;
    assert!(matches!(result, Err(DeliveryError::InvalidBody { .. })));
}

#[tokio::test]
async fn test_direct_api_transport_failure() {
    // 绑定后立即释放端口，连接会被拒绝
    let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
    let config = test_config(&format!("http://{}", addr), "transport");
    let channel = DirectApiChannel::new(config.hubspot_target(), "u", "n", Duration::from_secs(5)).unwrap();

    let result = channel.deliver(&submission()).await;
    assert_err!(&result);
    assert!(matches!(result, Err(DeliveryError::Transport { .. })));
}

#[tokio::test]
async fn test_session_submitted_through_direct_api_without_browser() {
    let (url, requests) = serve(200, r#"{"inlineMessage":"Thanks!"}"#).await;
    let config = test_config(&url, "session_ok");
    let bank = QuestionBank::builtin().unwrap();
    let channels = build_channels(&config, None).unwrap();
    let writer = FailureWriter::with_path(config.failed_submissions_file.clone());

    // 嵌入式表单通道没有浏览器直接失败，第 2 次尝试由直接 API 完成
    let outcome = process_session(channels, &bank, complete_session(&bank, 4), 1, &config, &writer)
        .await
        .unwrap();

    assert_eq!(outcome, SessionOutcome::Submitted);
    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].contains(r#"{"name":"ai_readiness_category","value":"AI Innovator"}"#));
    assert!(requests[0].contains(r#""hutk":"hutk-123""#));
}

#[tokio::test]
async fn test_session_exhausted_is_recorded() {
    let (url, requests) = serve(500, r#"{"message":"boom"}"#).await;
    let config = test_config(&url, "session_exhausted");
    let _ = std::fs::remove_file(&config.failed_submissions_file);
    let bank = QuestionBank::builtin().unwrap();
    let channels = build_channels(&config, None).unwrap();
    let writer = FailureWriter::with_path(config.failed_submissions_file.clone());

    let outcome = process_session(channels, &bank, complete_session(&bank, 1), 7, &config, &writer)
        .await
        .unwrap();

    assert_eq!(outcome, SessionOutcome::Exhausted);
    assert_eq!(requests.lock().unwrap().len(), 1);

    let record = std::fs::read_to_string(&config.failed_submissions_file).unwrap();
    assert!(record.contains("会话 7 | ada@example.com | 文件: sessions/ada.toml"));
    let _ = std::fs::remove_file(&config.failed_submissions_file);
}

#[tokio::test]
async fn test_incomplete_session_is_not_submitted() {
    let (url, requests) = serve(200, "{}").await;
    let config = test_config(&url, "incomplete");
    let bank = QuestionBank::builtin().unwrap();
    let channels = build_channels(&config, None).unwrap();
    let writer = FailureWriter::with_path(config.failed_submissions_file.clone());

    let mut file = complete_session(&bank, 2);
    file.answers.truncate(10);

    let outcome = process_session(channels, &bank, file, 2, &config, &writer).await.unwrap();

    assert_eq!(outcome, SessionOutcome::Invalid);
    assert!(requests.lock().unwrap().is_empty());
}

#[tokio::test]
#[ignore] // 需要本机 Chrome 开启调试端口：cargo test -- --ignored
async fn test_browser_connection() {
    assessment_submit::utils::logging::init(true);
    let config = Config::from_env();

    let result =
        assessment_submit::browser::connect_to_browser_and_page(config.browser_debug_port, &config.page_uri).await;

    assert!(result.is_ok(), "应该能够成功连接浏览器");
}
