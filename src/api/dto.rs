// ==========================================
// 空间站货舱管理系统 - API 数据传输对象
// ==========================================
// 所有响应带 success 标志 + 结构化明细; 部分成功不掩盖为失败
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::domain::container::RawContainerRecord;
use crate::domain::item::{Item, Placement, RawItemRecord};
use crate::domain::manifest::{ReturnManifest, ReturnStep};
use crate::domain::spatial::Cuboid;
use crate::domain::types::WasteReason;
use crate::engine::placement_solver::Rearrangement;
use crate::engine::retrieval::RetrievalStep;
use crate::engine::simulation::DaySummary;
use crate::importer::error::RecordViolation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// 导入
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub success: bool,
    pub accepted: Vec<String>,
    pub rejected: Vec<RecordViolation>,
}

impl IngestReport {
    pub(crate) fn finish(mut self) -> Self {
        self.success = !self.accepted.is_empty() || self.rejected.is_empty();
        self
    }

    /// 被拒绝的记录下标 (去重)
    pub fn rejected_indices(&self) -> Vec<usize> {
        let mut idx: Vec<usize> = self.rejected.iter().map(|v| v.index).collect();
        idx.dedup();
        idx
    }
}

// ==========================================
// 放置
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRequest {
    #[serde(default)]
    pub items: Vec<RawItemRecord>,
    #[serde(default)]
    pub containers: Vec<RawContainerRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementResponse {
    pub success: bool,
    pub placements: Vec<Placement>,
    pub rearrangements: Vec<Rearrangement>,
    pub rejected: Vec<RecordViolation>,
}

// ==========================================
// 搜索 / 取用
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub success: bool,
    pub item: Item,
    pub container_id: Option<String>,
    pub zone: Option<String>,
    pub position: Option<Cuboid>,
    pub retrieval_steps: Vec<RetrievalStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResponse {
    pub success: bool,
    pub item_id: String,
    pub steps: Vec<RetrievalStep>,
    pub remaining_uses: Option<u32>,
    /// 重新放置失败 (NoFitFound) 的遮挡物, 已转为 Unplaced
    pub unplaced: Vec<String>,
}

// ==========================================
// 废弃物 / 返还
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteEntry {
    pub item_id: String,
    pub name: String,
    pub reason: WasteReason,
    pub container_id: Option<String>,
    pub position: Option<Cuboid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteListing {
    pub success: bool,
    pub waste_items: Vec<WasteEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnPlan {
    pub success: bool,
    pub return_plan: Vec<ReturnStep>,
    pub retrieval_steps: Vec<RetrievalStep>,
    pub return_manifest: ReturnManifest,
    /// 一件都装不下时为 true, 此时计划为空
    pub budget_exceeded: bool,
    /// 是否为精确最优解
    pub exact: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndockingReport {
    pub success: bool,
    pub undocking_container_id: String,
    pub items_removed: usize,
    pub item_ids: Vec<String>,
}

// ==========================================
// 模拟
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub success: bool,
    pub new_date: DateTime<Utc>,
    pub days: Vec<DaySummary>,
}

impl SimulationReport {
    pub fn expired_ids(&self) -> Vec<&str> {
        self.days
            .iter()
            .flat_map(|d| d.items_expired.iter().map(|r| r.item_id.as_str()))
            .collect()
    }

    pub fn depleted_ids(&self) -> Vec<&str> {
        self.days
            .iter()
            .flat_map(|d| d.items_depleted.iter().map(|r| r.item_id.as_str()))
            .collect()
    }
}

// ==========================================
// 日志 / 审计
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQueryResponse {
    pub success: bool,
    pub logs: Vec<ActionLog>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapViolation {
    pub container_id: String,
    pub first: String,
    pub second: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundsViolation {
    pub container_id: String,
    pub item_id: String,
    pub position: Cuboid,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvariantReport {
    pub containers_checked: usize,
    pub placements_checked: usize,
    pub overlaps: Vec<OverlapViolation>,
    pub out_of_bounds: Vec<BoundsViolation>,
    /// 物品索引与货箱布局不一致的物品
    pub index_mismatches: Vec<String>,
}

impl InvariantReport {
    pub fn is_ok(&self) -> bool {
        self.overlaps.is_empty() && self.out_of_bounds.is_empty() && self.index_mismatches.is_empty()
    }
}
