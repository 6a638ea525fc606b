// ==========================================
// 空间站货舱管理系统 - 模拟时钟
// ==========================================
// 职责: 按整天推进, 消耗使用次数, 判定过期/耗尽
// 每日顺序: 先推进 now 一天, 再对每个在用物品依次判定
//           过期 → 耗尽 → 消耗一次使用
// 红线: 同一天既到期又耗尽的物品记为 Expired
// 红线: 时钟只修改物品状态; 从货箱移除由调用方完成
// ==========================================

use crate::domain::item::Item;
use crate::domain::types::{ItemLifecycle, WasteReason};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRef {
    pub item_id: String,
    pub name: String,
}

/// 单次使用记录; remaining_uses 为 None 表示不限次数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUsage {
    pub item_id: String,
    pub name: String,
    pub remaining_uses: Option<u32>,
}

/// 单日汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub day: u32,
    pub date: DateTime<Utc>,
    pub items_used: Vec<ItemUsage>,
    pub items_expired: Vec<ItemRef>,
    pub items_depleted: Vec<ItemRef>,
}

impl DaySummary {
    /// 当天新转入废弃的物品ID
    pub fn new_waste_ids(&self) -> impl Iterator<Item = &str> {
        self.items_expired
            .iter()
            .chain(self.items_depleted.iter())
            .map(|r| r.item_id.as_str())
    }
}

/// 不推进时间的扫描结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepResult {
    pub expired: Vec<ItemRef>,
    pub depleted: Vec<ItemRef>,
}

impl SweepResult {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.depleted.is_empty()
    }
}

// ==========================================
// SimulationClock
// ==========================================
#[derive(Debug, Clone)]
pub struct SimulationClock {
    now: DateTime<Utc>,
}

impl SimulationClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// 推进 days 天
    #[instrument(skip(self, items), fields(start = %self.now))]
    pub fn advance(&mut self, days: u32, items: &mut BTreeMap<String, Item>) -> Vec<DaySummary> {
        (1..=days).map(|day| self.tick_day(day, items)).collect()
    }

    /// 推进到目标时刻所在的整天数; 目标不晚于当前时刻时不推进
    pub fn advance_to(
        &mut self,
        target: DateTime<Utc>,
        items: &mut BTreeMap<String, Item>,
    ) -> Vec<DaySummary> {
        let days = (target - self.now).num_days().max(0);
        let days = u32::try_from(days).unwrap_or(u32::MAX);
        self.advance(days, items)
    }

    /// 推进一天
    pub fn tick_day(&mut self, day: u32, items: &mut BTreeMap<String, Item>) -> DaySummary {
        self.now += Duration::days(1);
        let now = self.now;

        let mut summary = DaySummary {
            day,
            date: now,
            items_used: Vec::new(),
            items_expired: Vec::new(),
            items_depleted: Vec::new(),
        };

        for item in items.values_mut().filter(|i| i.is_live()) {
            if item.is_expired_at(now) {
                item.mark_waste(WasteReason::Expired);
                summary.items_expired.push(item_ref(item));
            } else if item.is_depleted() {
                item.mark_waste(WasteReason::Depleted);
                summary.items_depleted.push(item_ref(item));
            } else {
                let remaining = item.consume_use();
                summary.items_used.push(ItemUsage {
                    item_id: item.item_id.clone(),
                    name: item.name.clone(),
                    remaining_uses: remaining,
                });
            }
        }

        debug!(
            day,
            used = summary.items_used.len(),
            expired = summary.items_expired.len(),
            depleted = summary.items_depleted.len(),
            "模拟日推进完成"
        );
        summary
    }

    /// 按当前时刻扫描在用物品 (不推进时间, 不消耗使用次数)
    pub fn sweep(&self, items: &mut BTreeMap<String, Item>) -> SweepResult {
        let mut result = SweepResult::default();
        for item in items.values_mut().filter(|i| i.is_live()) {
            if item.is_expired_at(self.now) {
                item.mark_waste(WasteReason::Expired);
                result.expired.push(item_ref(item));
            } else if item.is_depleted() {
                item.mark_waste(WasteReason::Depleted);
                result.depleted.push(item_ref(item));
            }
        }
        result
    }
}

fn item_ref(item: &Item) -> ItemRef {
    debug_assert_eq!(item.lifecycle, ItemLifecycle::Waste);
    ItemRef {
        item_id: item.item_id.clone(),
        name: item.name.clone(),
    }
}
