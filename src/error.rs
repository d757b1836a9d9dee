use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 计分错误
    #[error("计分错误: {0}")]
    Scoring(#[from] ScoringError),
    /// 会话数据错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 文件操作错误
    #[error("文件错误 ({path}): {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 计分错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    /// 题目索引超出题库范围
    #[error("题目索引 {index} 超出范围 [0, {max_index}]")]
    QuestionOutOfRange { index: usize, max_index: usize },
    /// 选项不属于该题
    #[error("题目 {question} 没有选项 {option}")]
    UnknownOption { question: usize, option: String },
    /// 题库为空
    #[error("题库为空")]
    EmptyBank,
    /// 题库定义不合法
    #[error("题库定义不合法: {0}")]
    InvalidBank(String),
}

/// 会话数据错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// 必填字段为空
    #[error("字段 {field} 不能为空")]
    MissingField { field: &'static str },
    /// 邮箱格式错误
    #[error("邮箱格式不正确: {email}")]
    InvalidEmail { email: String },
    /// 当前题目尚未作答
    #[error("题目 {question} 尚未作答")]
    Unanswered { question: usize },
    /// 已经在第一题
    #[error("已经是第一题，无法后退")]
    AtFirstQuestion,
    /// 已经完成全部题目
    #[error("测评已完成")]
    AlreadyComplete,
    /// 答案不连续：该题未作答，但后面的题有答案
    #[error("题目 {question} 尚未作答，但之后的题目已有答案")]
    NonContiguousAnswers { question: usize },
}

/// 投递通道错误
///
/// 通道自身不会向外抛出这些错误，只作为结果交给编排器记录
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// 网络请求失败
    #[error("请求失败 ({endpoint}): {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 返回非 2xx 状态
    #[error("HubSpot 返回错误响应: status={status}, message={message:?}")]
    BadStatus { status: u16, message: Option<String> },
    /// 响应体无法解析为 JSON
    #[error("响应体无法解析: {source}")]
    InvalidBody {
        #[source]
        source: serde_json::Error,
    },
    /// 第三方脚本不可用（全局对象缺失）
    #[error("第三方脚本不可用: {0}")]
    ScriptUnavailable(String),
    /// 浏览器不可用
    #[error("浏览器不可用")]
    BrowserUnavailable,
    /// 页面脚本执行失败或回报失败
    #[error("脚本执行失败: {0}")]
    Script(String),
    /// 超时
    #[error("通道超时 ({0:?})")]
    Timeout(std::time::Duration),
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 单次投递结果
pub type DeliveryResult = Result<(), DeliveryError>;
