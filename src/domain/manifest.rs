// ==========================================
// 空间站货舱管理系统 - 返还清单
// ==========================================
// 计算视图, 不单独持久化
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ReturnStep - 返还步骤 (源货箱 → 返回舱货箱)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnStep {
    pub step: usize,
    pub item_id: String,
    pub item_name: String,
    pub from_container: Option<String>,
    pub to_container: String,
}

// ==========================================
// ReturnItem - 清单条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnItem {
    pub item_id: String,
    pub name: String,
    pub reason: String,
    pub mass_kg: f64,
    pub volume_cm3: f64,
    pub priority: u32,
}

// ==========================================
// ReturnManifest - 返还清单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnManifest {
    pub undocking_container_id: String,
    pub undocking_date: DateTime<Utc>,
    pub return_items: Vec<ReturnItem>,
    pub total_volume: f64,
    pub total_weight: f64,
    pub total_priority: u64,
}

impl ReturnManifest {
    pub fn new(undocking_container_id: impl Into<String>, undocking_date: DateTime<Utc>) -> Self {
        Self {
            undocking_container_id: undocking_container_id.into(),
            undocking_date,
            return_items: Vec::new(),
            total_volume: 0.0,
            total_weight: 0.0,
            total_priority: 0,
        }
    }

    /// 追加条目并累计合计值
    pub fn push(&mut self, item: ReturnItem) {
        self.total_volume += item.volume_cm3;
        self.total_weight += item.mass_kg;
        self.total_priority += u64::from(item.priority);
        self.return_items.push(item);
    }

    pub fn is_empty(&self) -> bool {
        self.return_items.is_empty()
    }
}
