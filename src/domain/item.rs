// ==========================================
// 空间站货舱管理系统 - 物品领域模型
// ==========================================
// 职责: 物品实体、放置记录、原始导入记录
// 红线: 物品只持有所在货箱的反向引用, 空间布局归货箱所有
// ==========================================

use crate::domain::spatial::{Cuboid, Dimensions, Orientation};
use crate::domain::types::{ItemLifecycle, WasteReason};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Placement - 放置记录
// ==========================================
// position 为货箱局部坐标系下的包围盒
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub item_id: String,
    pub container_id: String,
    pub position: Cuboid,
    pub orientation: Orientation,
}

// ==========================================
// Item - 物品
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    // ===== 主数据 =====
    pub item_id: String,
    pub name: String,
    pub dimensions: Dimensions, // 原始尺寸 (cm)
    pub mass_kg: f64,
    pub priority: u32,          // 越大越关键
    pub expiry: Option<DateTime<Utc>>,
    pub usage_limit: Option<u32>, // None = 不限次数
    pub preferred_zone: Option<String>,

    // ===== 状态 =====
    pub remaining_uses: Option<u32>,
    pub lifecycle: ItemLifecycle,
    pub waste_reason: Option<WasteReason>,
    pub placement: Option<Placement>, // 当前放置; 废弃后保留最后一次放置
}

impl Item {
    /// 以主数据创建物品, 初始状态 Unplaced
    pub fn new(
        item_id: impl Into<String>,
        name: impl Into<String>,
        dimensions: Dimensions,
        mass_kg: f64,
        priority: u32,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            name: name.into(),
            dimensions,
            mass_kg,
            priority,
            expiry: None,
            usage_limit: None,
            preferred_zone: None,
            remaining_uses: None,
            lifecycle: ItemLifecycle::Unplaced,
            waste_reason: None,
            placement: None,
        }
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn with_usage_limit(mut self, limit: u32) -> Self {
        self.usage_limit = Some(limit);
        self.remaining_uses = Some(limit);
        self
    }

    pub fn with_preferred_zone(mut self, zone: impl Into<String>) -> Self {
        self.preferred_zone = Some(zone.into());
        self
    }

    pub fn volume(&self) -> f64 {
        self.dimensions.volume()
    }

    pub fn is_live(&self) -> bool {
        self.lifecycle.is_live()
    }

    pub fn is_stowed(&self) -> bool {
        self.lifecycle == ItemLifecycle::Stowed
    }

    /// 过期判定: 到达或超过 expiry 即视为过期
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry.map(|e| e <= now).unwrap_or(false)
    }

    /// 使用次数已耗尽 (不限次数时永远为 false)
    pub fn is_depleted(&self) -> bool {
        self.remaining_uses == Some(0)
    }

    /// 消耗一次使用; 返回剩余次数 (不限次数返回 None)
    pub fn consume_use(&mut self) -> Option<u32> {
        if let Some(n) = self.remaining_uses.as_mut() {
            *n = n.saturating_sub(1);
        }
        self.remaining_uses
    }

    /// 当前所在货箱
    pub fn container_id(&self) -> Option<&str> {
        self.placement.as_ref().map(|p| p.container_id.as_str())
    }

    /// 转入废弃: 保留最后一次放置用于取用路径计算
    pub fn mark_waste(&mut self, reason: WasteReason) {
        self.lifecycle = ItemLifecycle::Waste;
        self.waste_reason = Some(reason);
    }
}

// ==========================================
// RawItemRecord - 物品原始导入记录
// ==========================================
// 所有字段可缺省, 由 importer 逐条校验; 未知字段直接拒绝
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawItemRecord {
    #[serde(alias = "itemId")]
    pub item_id: Option<String>,
    pub name: Option<String>,
    #[serde(alias = "width_cm")]
    pub width: Option<f64>,
    #[serde(alias = "depth_cm")]
    pub depth: Option<f64>,
    #[serde(alias = "height_cm")]
    pub height: Option<f64>,
    #[serde(alias = "mass_kg")]
    pub mass: Option<f64>,
    pub priority: Option<i64>,
    #[serde(alias = "expiryDate", alias = "expiry_date")]
    pub expiry: Option<String>,
    #[serde(alias = "usageLimit")]
    pub usage_limit: Option<i64>,
    #[serde(alias = "preferredZone")]
    pub preferred_zone: Option<String>,
}
