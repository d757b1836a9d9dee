//! 计分服务 - 业务能力层
//!
//! 总分和各维度小计每次都从答案表重新推导，不维护可变的累计值

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::ScoringError;
use crate::models::question::{Pillar, QuestionBank};

/// 成熟度等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReadinessTier {
    Developing,
    Emerging,
    Advancing,
    Innovator,
}

impl ReadinessTier {
    /// 根据百分比得到等级
    pub fn from_percentage(percentage: u32) -> Self {
        match percentage {
            0..=39 => ReadinessTier::Developing,
            40..=59 => ReadinessTier::Emerging,
            60..=79 => ReadinessTier::Advancing,
            _ => ReadinessTier::Innovator,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReadinessTier::Developing => "AI Developing",
            ReadinessTier::Emerging => "AI Emerging",
            ReadinessTier::Advancing => "AI Advancing",
            ReadinessTier::Innovator => "AI Innovator",
        }
    }
}

impl fmt::Display for ReadinessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 计分结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreCard {
    /// 总分
    pub total: u32,
    /// 各维度小计（五个维度始终齐全，未作答为 0）
    pub by_pillar: BTreeMap<Pillar, u32>,
    /// 满分
    pub max_total: u32,
    /// 已作答题数
    pub answered: usize,
}

impl ScoreCard {
    pub fn pillar(&self, pillar: Pillar) -> u32 {
        self.by_pillar.get(&pillar).copied().unwrap_or(0)
    }

    /// 百分比（四舍五入）
    pub fn percentage(&self) -> u32 {
        if self.max_total == 0 {
            return 0;
        }
        (self.total * 100 + self.max_total / 2) / self.max_total
    }

    pub fn tier(&self) -> ReadinessTier {
        ReadinessTier::from_percentage(self.percentage())
    }
}

/// 查询某题某选项的分值
pub fn points_for(bank: &QuestionBank, question: usize, option_id: &str) -> Result<u32, ScoringError> {
    let q = bank.get(question).ok_or(ScoringError::QuestionOutOfRange {
        index: question,
        max_index: bank.len().saturating_sub(1),
    })?;

    q.option(option_id)
        .map(|o| o.points)
        .ok_or_else(|| ScoringError::UnknownOption {
            question,
            option: option_id.to_string(),
        })
}

/// 从答案表计算总分和维度小计
pub fn tally(bank: &QuestionBank, answers: &BTreeMap<usize, String>) -> Result<ScoreCard, ScoringError> {
    let mut by_pillar: BTreeMap<Pillar, u32> = Pillar::ALL.iter().map(|p| (*p, 0)).collect();

    for (&index, option_id) in answers {
        let points = points_for(bank, index, option_id)?;
        // 题号已在 points_for 中校验
        if let Some(question) = bank.get(index) {
            *by_pillar.entry(question.pillar).or_insert(0) += points;
        }
    }

    Ok(ScoreCard {
        total: by_pillar.values().sum(),
        by_pillar,
        max_total: bank.max_score(),
        answered: answers.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers_by(bank: &QuestionBank, pick: impl Fn(usize) -> u32) -> BTreeMap<usize, String> {
        bank.questions
            .iter()
            .enumerate()
            .map(|(idx, q)| {
                let points = pick(idx);
                let option = q.options.iter().find(|o| o.points == points).unwrap();
                (idx, option.id.clone())
            })
            .collect()
    }

    #[test]
    fn test_all_lowest_is_developing() {
        let bank = QuestionBank::builtin().unwrap();
        let card = tally(&bank, &answers_by(&bank, |_| 1)).unwrap();

        assert_eq!(card.total, 25);
        assert_eq!(card.percentage(), 25);
        assert_eq!(card.tier().label(), "AI Developing");
    }

    #[test]
    fn test_all_highest_is_innovator() {
        let bank = QuestionBank::builtin().unwrap();
        let card = tally(&bank, &answers_by(&bank, |_| 4)).unwrap();

        assert_eq!(card.total, 100);
        assert_eq!(card.percentage(), 100);
        assert_eq!(card.tier(), ReadinessTier::Innovator);
        for pillar in Pillar::ALL {
            assert_eq!(card.pillar(pillar), 20);
        }
    }

    #[test]
    fn test_total_equals_sum_of_pillars_at_every_prefix() {
        let bank = QuestionBank::builtin().unwrap();
        let full = answers_by(&bank, |idx| (idx as u32 * 7 % 4) + 1);

        let mut partial = BTreeMap::new();
        let mut expected = 0;
        for (idx, option) in &full {
            partial.insert(*idx, option.clone());
            expected += points_for(&bank, *idx, option).unwrap();

            let card = tally(&bank, &partial).unwrap();
            assert_eq!(card.total, card.by_pillar.values().sum::<u32>());
            assert_eq!(card.total, expected);
            assert_eq!(card.answered, partial.len());
        }
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(ReadinessTier::from_percentage(39), ReadinessTier::Developing);
        assert_eq!(ReadinessTier::from_percentage(40), ReadinessTier::Emerging);
        assert_eq!(ReadinessTier::from_percentage(60), ReadinessTier::Advancing);
        assert_eq!(ReadinessTier::from_percentage(80), ReadinessTier::Innovator);
    }

    #[test]
    fn test_unknown_answers_are_errors() {
        let bank = QuestionBank::builtin().unwrap();

        let mut answers = BTreeMap::new();
        answers.insert(99, "q99-a".to_string());
        assert_eq!(
            tally(&bank, &answers).unwrap_err(),
            ScoringError::QuestionOutOfRange { index: 99, max_index: 24 }
        );

        let mut answers = BTreeMap::new();
        answers.insert(0, "q05-a".to_string());
        assert!(matches!(
            tally(&bank, &answers).unwrap_err(),
            ScoringError::UnknownOption { question: 0, .. }
        ));
    }

    #[test]
    fn test_empty_answers_score_zero() {
        let bank = QuestionBank::builtin().unwrap();
        let card = tally(&bank, &BTreeMap::new()).unwrap();

        assert_eq!(card.total, 0);
        assert_eq!(card.by_pillar.len(), 5);
        assert_eq!(card.tier(), ReadinessTier::Developing);
    }
}
