// ==========================================
// 空间站货舱管理系统 - 运行参数
// ==========================================

use crate::engine::placement_solver::MAX_RELOCATION_DEPTH;
use crate::engine::waste_return::{
    ReturnSelection, DEFAULT_EXACT_MAX_BUDGET_UNITS, DEFAULT_EXACT_MAX_ITEMS,
    DEFAULT_MASS_RESOLUTION_KG,
};
use crate::perf::DEFAULT_SLOW_OPERATION_MS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StowageConfig {
    pub relocation_max_depth: usize,
    pub knapsack_exact_max_items: usize,
    pub knapsack_exact_max_budget_units: usize,
    pub mass_resolution_kg: f64,
    pub slow_operation_ms: u64, // 0 = 不告警
    pub return_selection: ReturnSelection,
    /// 时钟、求解器等系统事件的记录人
    pub system_actor: String,
}

impl Default for StowageConfig {
    fn default() -> Self {
        Self {
            relocation_max_depth: MAX_RELOCATION_DEPTH,
            knapsack_exact_max_items: DEFAULT_EXACT_MAX_ITEMS,
            knapsack_exact_max_budget_units: DEFAULT_EXACT_MAX_BUDGET_UNITS,
            mass_resolution_kg: DEFAULT_MASS_RESOLUTION_KG,
            slow_operation_ms: DEFAULT_SLOW_OPERATION_MS,
            return_selection: ReturnSelection::default(),
            system_actor: "system".to_string(),
        }
    }
}

impl StowageConfig {
    /// 钳制越界值
    pub fn normalized(mut self) -> Self {
        self.relocation_max_depth = self.relocation_max_depth.min(MAX_RELOCATION_DEPTH);
        if !(self.mass_resolution_kg.is_finite() && self.mass_resolution_kg > 0.0) {
            self.mass_resolution_kg = DEFAULT_MASS_RESOLUTION_KG;
        }
        self
    }
}
