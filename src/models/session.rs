//! 测评会话
//!
//! 用户信息只在创建时采集一次，之后不可变；
//! 答案按题目索引记录，前进时增加，后退时移除离开那道题的答案。

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppResult, ScoringError, SessionError};
use crate::models::question::QuestionBank;
use crate::services::scoring::{self, ScoreCard};

/// 用户信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    first_name: String,
    last_name: String,
    email: String,
    company: String,
}

impl UserInfo {
    /// 创建并校验用户信息
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        company: impl Into<String>,
    ) -> Result<Self, SessionError> {
        let first_name = required("first_name", first_name.into())?;
        let last_name = required("last_name", last_name.into())?;
        let email = required("email", email.into())?;
        let company = required("company", company.into())?;

        if !is_valid_email(&email) {
            return Err(SessionError::InvalidEmail { email });
        }

        Ok(Self {
            first_name,
            last_name,
            email,
            company,
        })
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn company(&self) -> &str {
        &self.company
    }
}

fn required(field: &'static str, value: String) -> Result<String, SessionError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        Err(SessionError::MissingField { field })
    } else {
        Ok(value)
    }
}

fn is_valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
        .map(|re| re.is_match(email))
        .unwrap_or(false)
}

// ========== 会话文件格式 ==========

/// 会话文件中的用户信息
#[derive(Debug, Clone, Deserialize)]
pub struct RawUserInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company: String,
    /// HubSpot 跟踪 cookie（hubspotutk）
    #[serde(default)]
    pub hutk: Option<String>,
}

/// 会话文件中的一条答案
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerRecord {
    /// 题目索引（从 0 开始）
    pub question: usize,
    /// 选项 ID
    pub option: String,
}

/// 会话 TOML 文件
#[derive(Debug, Clone, Deserialize)]
pub struct SessionFile {
    pub user_info: RawUserInfo,
    #[serde(default)]
    pub answers: Vec<AnswerRecord>,
    #[serde(skip_deserializing)]
    pub file_path: Option<String>,
}

// ========== 会话 ==========

/// 测评会话
#[derive(Debug, Clone)]
pub struct AssessmentSession {
    user_info: UserInfo,
    hutk: Option<String>,
    answers: BTreeMap<usize, String>,
    current: usize,
    source: Option<String>,
}

impl AssessmentSession {
    /// 开始新的测评
    pub fn new(user_info: UserInfo) -> Self {
        Self {
            user_info,
            hutk: None,
            answers: BTreeMap::new(),
            current: 0,
            source: None,
        }
    }

    pub fn with_hutk(mut self, hutk: Option<String>) -> Self {
        self.hutk = hutk.filter(|h| !h.trim().is_empty());
        self
    }

    /// 从会话文件恢复一次已完成（或部分完成）的测评
    ///
    /// 每条答案都会经过题库校验；答案必须从第 0 题起连续，当前位置停在第一道未作答的题
    pub fn from_file(file: SessionFile, bank: &QuestionBank) -> AppResult<Self> {
        let raw = file.user_info;
        let user_info = UserInfo::new(raw.first_name, raw.last_name, raw.email, raw.company)?;

        let mut answers = BTreeMap::new();
        for record in file.answers {
            scoring::points_for(bank, record.question, &record.option)?;
            answers.insert(record.question, record.option);
        }

        let current = (0..bank.len())
            .find(|idx| !answers.contains_key(idx))
            .unwrap_or(bank.len());

        // 当前题之后不能有答案
        if answers.keys().any(|&idx| idx > current) {
            return Err(SessionError::NonContiguousAnswers { question: current }.into());
        }

        let mut session = Self::new(user_info).with_hutk(raw.hutk);
        session.answers = answers;
        session.current = current;
        session.source = file.file_path;
        Ok(session)
    }

    pub fn user_info(&self) -> &UserInfo {
        &self.user_info
    }

    pub fn hutk(&self) -> Option<&str> {
        self.hutk.as_deref()
    }

    pub fn answers(&self) -> &BTreeMap<usize, String> {
        &self.answers
    }

    /// 当前所在题目索引（等于题库长度时表示已到结果页）
    pub fn current(&self) -> usize {
        self.current
    }

    /// 来源文件（仅用于日志）
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// 为当前题目选择选项（可覆盖之前的选择）
    pub fn select(&mut self, bank: &QuestionBank, option_id: &str) -> AppResult<()> {
        if self.current >= bank.len() {
            return Err(SessionError::AlreadyComplete.into());
        }
        scoring::points_for(bank, self.current, option_id)?;
        self.answers.insert(self.current, option_id.to_string());
        Ok(())
    }

    /// 前进到下一题；当前题必须已作答
    pub fn next(&mut self, bank: &QuestionBank) -> Result<(), SessionError> {
        if self.current >= bank.len() {
            return Err(SessionError::AlreadyComplete);
        }
        if !self.answers.contains_key(&self.current) {
            return Err(SessionError::Unanswered {
                question: self.current,
            });
        }
        self.current += 1;
        Ok(())
    }

    /// 后退一题
    ///
    /// 移除的是离开的那道题的答案，目标题的答案保留以便修改
    pub fn back(&mut self) -> Result<(), SessionError> {
        if self.current == 0 {
            return Err(SessionError::AtFirstQuestion);
        }
        self.answers.remove(&self.current);
        self.current -= 1;
        Ok(())
    }

    /// 是否已到结果页
    pub fn is_complete(&self, bank: &QuestionBank) -> bool {
        self.current >= bank.len() && (0..bank.len()).all(|idx| self.answers.contains_key(&idx))
    }

    /// 从答案表重新计算分数
    pub fn score(&self, bank: &QuestionBank) -> Result<ScoreCard, ScoringError> {
        scoring::tally(bank, &self.answers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::question::Pillar;

    fn user() -> UserInfo {
        UserInfo::new("Ada", "Lovelace", "ada@example.com", "Analytical Engines").unwrap()
    }

    fn option_with_points(bank: &QuestionBank, index: usize, points: u32) -> String {
        bank.get(index)
            .unwrap()
            .options
            .iter()
            .find(|o| o.points == points)
            .unwrap()
            .id
            .clone()
    }

    #[test]
    fn test_user_info_validation() {
        assert_eq!(
            UserInfo::new(" ", "L", "a@b.co", "C").unwrap_err(),
            SessionError::MissingField { field: "first_name" }
        );
        assert!(matches!(
            UserInfo::new("A", "L", "not-an-email", "C").unwrap_err(),
            SessionError::InvalidEmail { .. }
        ));
        assert_eq!(user().email(), "ada@example.com");
    }

    #[test]
    fn test_next_requires_answer() {
        let bank = QuestionBank::builtin().unwrap();
        let mut session = AssessmentSession::new(user());

        assert_eq!(
            session.next(&bank).unwrap_err(),
            SessionError::Unanswered { question: 0 }
        );
        assert_eq!(session.back().unwrap_err(), SessionError::AtFirstQuestion);
    }

    #[test]
    fn test_reanswer_after_back_replaces_points() {
        let bank = QuestionBank::builtin().unwrap();
        let mut session = AssessmentSession::new(user());
        let pillar = bank.get(0).unwrap().pillar;

        session.select(&bank, &option_with_points(&bank, 0, 3)).unwrap();
        session.next(&bank).unwrap();
        assert_eq!(session.score(&bank).unwrap().pillar(pillar), 3);

        session.back().unwrap();
        session.select(&bank, &option_with_points(&bank, 0, 1)).unwrap();

        let card = session.score(&bank).unwrap();
        assert_eq!(card.pillar(pillar), 1);
        assert_eq!(card.total, 1);
    }

    #[test]
    fn test_back_removes_answer_of_question_left() {
        let bank = QuestionBank::builtin().unwrap();
        let mut session = AssessmentSession::new(user());

        session.select(&bank, &option_with_points(&bank, 0, 2)).unwrap();
        session.next(&bank).unwrap();
        session.select(&bank, &option_with_points(&bank, 1, 4)).unwrap();
        assert_eq!(session.score(&bank).unwrap().total, 6);

        session.back().unwrap();
        assert_eq!(session.current(), 0);
        assert!(!session.answers().contains_key(&1));
        assert_eq!(session.score(&bank).unwrap().total, 2);
    }

    #[test]
    fn test_forward_then_back_is_idempotent() {
        let bank = QuestionBank::builtin().unwrap();
        let mut session = AssessmentSession::new(user());

        for idx in 0..10 {
            let points = (idx as u32 % 4) + 1;
            session.select(&bank, &option_with_points(&bank, idx, points)).unwrap();
            session.next(&bank).unwrap();
        }
        let before = session.score(&bank).unwrap();

        session.next(&bank).unwrap_err();
        session.select(&bank, &option_with_points(&bank, 10, 4)).unwrap();
        session.back().unwrap();
        session.next(&bank).unwrap();

        let after = session.score(&bank).unwrap();
        assert_eq!(before, after);
        assert_eq!(after.by_pillar.get(&Pillar::Strategy).copied(), Some(11));
    }

    fn session_file(answers: &[(usize, &str)]) -> SessionFile {
        SessionFile {
            user_info: RawUserInfo {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                company: "AE".to_string(),
                hutk: None,
            },
            answers: answers
                .iter()
                .map(|(question, option)| AnswerRecord {
                    question: *question,
                    option: option.to_string(),
                })
                .collect(),
            file_path: None,
        }
    }

    #[test]
    fn test_from_file_rejects_answers_with_gaps() {
        let bank = QuestionBank::builtin().unwrap();
        let file = session_file(&[(0, "q01-a"), (2, "q03-d")]);

        let err = AssessmentSession::from_file(file, &bank).unwrap_err();
        assert!(matches!(
            err,
            AppError::Session(SessionError::NonContiguousAnswers { question: 1 })
        ));
    }

    #[test]
    fn test_from_file_resumes_at_first_unanswered() {
        let bank = QuestionBank::builtin().unwrap();
        let file = session_file(&[(0, "q01-a"), (1, "q02-b")]);

        let mut session = AssessmentSession::from_file(file, &bank).unwrap();
        assert_eq!(session.current(), 2);
        let before = session.score(&bank).unwrap();

        session.select(&bank, "q03-a").unwrap();
        session.next(&bank).unwrap();
        session.back().unwrap();
        session.back().unwrap();
        session.next(&bank).unwrap();

        assert_eq!(session.current(), 2);
        assert_eq!(session.score(&bank).unwrap(), before);
        assert_eq!(before.total, 3);
    }

    #[test]
    fn test_from_file_rejects_unknown_option() {
        let bank = QuestionBank::builtin().unwrap();
        let file: SessionFile = toml::from_str(
            r#"
            [user_info]
            first_name = "Ada"
            last_name = "Lovelace"
            email = "ada@example.com"
            company = "AE"

            [[answers]]
            question = 0
            option = "q02-a"
            "#,
        )
        .unwrap();

        assert!(matches!(
            AssessmentSession::from_file(file, &bank).unwrap_err(),
            AppError::Scoring(ScoringError::UnknownOption { question: 0, .. })
        ));
    }
}
