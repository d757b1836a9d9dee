use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ScoringError;

/// 内置题库
const BUILTIN_BANK: &str = include_str!("../../assets/questions.toml");

/// 测评维度（Pillar）
///
/// 题库文件中的 `pillar` 可以写短标识，也可以写展示名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Pillar {
    /// 战略与愿景
    Strategy,
    /// 数据基础
    Data,
    /// 技术与基础设施
    Technology,
    /// 人才与文化
    Talent,
    /// 治理与运营
    Governance,
}

/// 维度别名表（用于解析外部输入）
static PILLAR_ALIASES: phf::Map<&'static str, Pillar> = phf::phf_map! {
    "strategy" => Pillar::Strategy,
    "strategy & vision" => Pillar::Strategy,
    "data" => Pillar::Data,
    "data foundation" => Pillar::Data,
    "technology" => Pillar::Technology,
    "technology & infrastructure" => Pillar::Technology,
    "talent" => Pillar::Talent,
    "talent & culture" => Pillar::Talent,
    "governance" => Pillar::Governance,
    "governance & operations" => Pillar::Governance,
};

impl Pillar {
    pub const ALL: [Pillar; 5] = [
        Pillar::Strategy,
        Pillar::Data,
        Pillar::Technology,
        Pillar::Talent,
        Pillar::Governance,
    ];

    /// 获取展示名称
    pub fn name(self) -> &'static str {
        match self {
            Pillar::Strategy => "Strategy & Vision",
            Pillar::Data => "Data Foundation",
            Pillar::Technology => "Technology & Infrastructure",
            Pillar::Talent => "Talent & Culture",
            Pillar::Governance => "Governance & Operations",
        }
    }

    /// 获取字段名用的短标识
    pub fn slug(self) -> &'static str {
        match self {
            Pillar::Strategy => "strategy",
            Pillar::Data => "data",
            Pillar::Technology => "technology",
            Pillar::Talent => "talent",
            Pillar::Governance => "governance",
        }
    }

    /// 从名称或短标识解析维度（忽略大小写）
    pub fn parse(s: &str) -> Option<Self> {
        PILLAR_ALIASES.get(s.trim().to_lowercase().as_str()).copied()
    }
}

impl TryFrom<String> for Pillar {
    type Error = ScoringError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Pillar::parse(&value).ok_or_else(|| ScoringError::InvalidBank(format!("未知维度: {}", value)))
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 题目选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: String,
    pub label: String,
    pub points: u32,
}

/// 单道题目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub pillar: Pillar,
    pub text: String,
    pub options: Vec<AnswerOption>,
}

impl Question {
    /// 按选项 ID 查找选项
    pub fn option(&self, option_id: &str) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    /// 本题最高分
    pub fn max_points(&self) -> u32 {
        self.options.iter().map(|o| o.points).max().unwrap_or(0)
    }
}

/// 有序题库
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    pub questions: Vec<Question>,
}

impl QuestionBank {
    /// 加载内置题库
    pub fn builtin() -> Result<Self, ScoringError> {
        Self::from_toml_str(BUILTIN_BANK)
    }

    /// 从 TOML 文本解析并校验题库
    pub fn from_toml_str(content: &str) -> Result<Self, ScoringError> {
        let bank: QuestionBank =
            toml::from_str(content).map_err(|e| ScoringError::InvalidBank(e.to_string()))?;
        bank.validate()?;
        Ok(bank)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// 满分
    pub fn max_score(&self) -> u32 {
        self.questions.iter().map(Question::max_points).sum()
    }

    /// 校验题库：非空、选项分值 1-4、选项 ID 不重复
    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.questions.is_empty() {
            return Err(ScoringError::EmptyBank);
        }

        for (index, question) in self.questions.iter().enumerate() {
            if question.options.is_empty() {
                return Err(ScoringError::InvalidBank(format!(
                    "题目 {} ({}) 没有选项",
                    index, question.id
                )));
            }

            let mut seen = HashSet::new();
            for option in &question.options {
                if !(1..=4).contains(&option.points) {
                    return Err(ScoringError::InvalidBank(format!(
                        "选项 {} 的分值 {} 不在 1-4 之间",
                        option.id, option.points
                    )));
                }
                if !seen.insert(option.id.as_str()) {
                    return Err(ScoringError::InvalidBank(format!(
                        "题目 {} 存在重复选项 {}",
                        question.id, option.id
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_bank_shape() {
        let bank = QuestionBank::builtin().unwrap();

        assert_eq!(bank.len(), 25);
        assert_eq!(bank.max_score(), 100);

        for pillar in Pillar::ALL {
            let count = bank.questions.iter().filter(|q| q.pillar == pillar).count();
            assert_eq!(count, 5, "维度 {} 应有 5 题", pillar);
        }
    }

    #[test]
    fn test_pillar_parse_aliases() {
        assert_eq!(Pillar::parse("Data Foundation"), Some(Pillar::Data));
        assert_eq!(Pillar::parse("  GOVERNANCE "), Some(Pillar::Governance));
        assert_eq!(Pillar::parse("marketing"), None);
    }

    #[test]
    fn test_bank_accepts_pillar_display_names() {
        let content = r#"
            [[questions]]
            id = "q1"
            pillar = "Talent & Culture"
            text = "?"

            [[questions.options]]
            id = "q1-a"
            label = "a"
            points = 2
        "#;

        let bank = QuestionBank::from_toml_str(content).unwrap();
        assert_eq!(bank.get(0).unwrap().pillar, Pillar::Talent);
        assert_eq!(bank.max_score(), 2);
    }

    #[test]
    fn test_bank_rejects_unknown_pillar() {
        let content = r#"
            [[questions]]
            id = "q1"
            pillar = "marketing"
            text = "?"
            options = []
        "#;

        assert!(QuestionBank::from_toml_str(content).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_points() {
        let content = r#"
            [[questions]]
            id = "q1"
            pillar = "data"
            text = "?"

            [[questions.options]]
            id = "q1-a"
            label = "too much"
            points = 5
        "#;

        let err = QuestionBank::from_toml_str(content).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidBank(_)));
    }

    #[test]
    fn test_rejects_empty_bank() {
        let err = QuestionBank::from_toml_str("questions = []").unwrap_err();
        assert_eq!(err, ScoringError::EmptyBank);
    }
}
