// ==========================================
// 空间站货舱管理系统 - 操作日志领域模型
// ==========================================
// 红线: 日志只追加, 不修改, 不删除
// 用途: 审计追踪 (由外部查询层读取)
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
// 对齐: action_log 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLog {
    pub action_id: String,            // 日志ID (UUID)
    pub action_ts: DateTime<Utc>,     // 操作时间戳
    pub actor: String,                // 操作人 (宇航员/机器人/system)
    pub action_type: String,          // 操作类型 (存储为字符串)
    pub item_id: String,              // 关联物品
    pub container_id: Option<String>, // 关联货箱
    pub detail: Option<JsonValue>,    // 详细信息 (JSON)
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Placement,   // 放置入箱
    Retrieval,   // 取用目标物品
    Extraction,  // 为取用而临时移出的遮挡物
    Replacement, // 遮挡物归位/重新放置
    Relocation,  // 放置求解器触发的挪位
    WasteMarked, // 转入废弃
    Disposal,    // 随返回舱离站
}

impl ActionType {
    pub const ALL: [ActionType; 7] = [
        ActionType::Placement,
        ActionType::Retrieval,
        ActionType::Extraction,
        ActionType::Replacement,
        ActionType::Relocation,
        ActionType::WasteMarked,
        ActionType::Disposal,
    ];

    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Placement => "placement",
            ActionType::Retrieval => "retrieval",
            ActionType::Extraction => "extraction",
            ActionType::Replacement => "replacement",
            ActionType::Relocation => "relocation",
            ActionType::WasteMarked => "waste_marked",
            ActionType::Disposal => "disposal",
        }
    }

    /// 从字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        ActionType::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

// ==========================================
// ActionLog 辅助方法
// ==========================================
impl ActionLog {
    /// 创建新的操作日志
    ///
    /// # 参数
    /// - `action_type`: 操作类型
    /// - `actor`: 操作人
    /// - `item_id`: 关联物品
    /// - `action_ts`: 操作时间 (由调用方传入, 模拟时钟/请求时间)
    pub fn new(
        action_type: ActionType,
        actor: impl Into<String>,
        item_id: impl Into<String>,
        action_ts: DateTime<Utc>,
    ) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_ts,
            actor: actor.into(),
            action_type: action_type.as_str().to_string(),
            item_id: item_id.into(),
            container_id: None,
            detail: None,
        }
    }

    pub fn with_container(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    /// 设置详细信息 (转换为JSON)
    pub fn with_detail<T: Serialize>(mut self, detail: &T) -> Self {
        self.detail = serde_json::to_value(detail).ok();
        self
    }

    pub fn kind(&self) -> Option<ActionType> {
        ActionType::parse(&self.action_type)
    }
}

// ==========================================
// ActionLogFilter - 日志查询条件
// ==========================================
// 所有条件可选, 组合为 AND
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLogFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub item_id: Option<String>,
    pub actor: Option<String>,
    pub action_type: Option<ActionType>,
}

impl ActionLogFilter {
    pub fn for_item(item_id: impl Into<String>) -> Self {
        Self {
            item_id: Some(item_id.into()),
            ..Self::default()
        }
    }

    pub fn with_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_action_type(mut self, action_type: ActionType) -> Self {
        self.action_type = Some(action_type);
        self
    }
}
