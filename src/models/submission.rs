use chrono::{DateTime, Local};
use serde::Serialize;

use crate::models::question::Pillar;
use crate::models::session::AssessmentSession;
use crate::services::scoring::ScoreCard;

/// HubSpot 表单字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

impl FormField {
    pub fn new(name: impl Into<String>, value: impl ToString) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
        }
    }
}

/// 交给投递通道的测评结果
///
/// 字段顺序固定：联系人信息、总分、百分比、等级、各维度小计
#[derive(Debug, Clone)]
pub struct AssessmentSubmission {
    pub fields: Vec<FormField>,
    pub hutk: Option<String>,
    pub email: String,
    pub created_at: DateTime<Local>,
}

impl AssessmentSubmission {
    pub fn new(session: &AssessmentSession, card: &ScoreCard) -> Self {
        let user = session.user_info();

        let mut fields = vec![
            FormField::new("firstname", user.first_name()),
            FormField::new("lastname", user.last_name()),
            FormField::new("email", user.email()),
            FormField::new("company", user.company()),
            FormField::new("ai_readiness_score", card.total),
            FormField::new("ai_readiness_percentage", card.percentage()),
            FormField::new("ai_readiness_category", card.tier().label()),
        ];
        fields.extend(
            Pillar::ALL
                .iter()
                .map(|p| FormField::new(format!("ai_pillar_{}", p.slug()), card.pillar(*p))),
        );

        Self {
            fields,
            hutk: session.hutk().map(str::to_string),
            email: user.email().to_string(),
            created_at: Local::now(),
        }
    }

    /// 按名称取字段值
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}
