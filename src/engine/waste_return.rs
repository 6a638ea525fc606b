// ==========================================
// 空间站货舱管理系统 - 废弃物返还选择器
// ==========================================
// 职责: 在质量/体积上限内选出返还的废弃物子集
// 模式: PriorityKnapsack (默认, 0/1 背包, 价值=优先级, 重量=质量)
//       Fifo (按入废弃顺序先到先走, 遇到放不下即停止)
// 精确解: 小规模 (≤ 20 件) 在真实质量上分支定界;
//         更大规模走离散化质量的动态规划 (规模受配置限制)
// 近似解: 优先级密度贪心, 取 max(贪心, 单件最优) 保证 ≥ ½·OPT
// 红线: 选不出任何物品时返回空结果 + budget_exceeded 标志, 不报错
// ==========================================

use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, instrument};

/// 分支定界精确求解的规模上限, 与预算大小无关
pub const DEFAULT_ENUMERATION_MAX_ITEMS: usize = 20;
/// 默认动态规划规模上限
pub const DEFAULT_EXACT_MAX_ITEMS: usize = 64;
pub const DEFAULT_EXACT_MAX_BUDGET_UNITS: usize = 100_000;
pub const DEFAULT_MASS_RESOLUTION_KG: f64 = 0.01;

const TOLERANCE: f64 = 1e-9;

// ==========================================
// 选择模式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnSelection {
    #[default]
    PriorityKnapsack,
    Fifo,
}

impl ReturnSelection {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "priority" | "priority_knapsack" | "knapsack" => Some(Self::PriorityKnapsack),
            "fifo" => Some(Self::Fifo),
            _ => None,
        }
    }
}

/// 候选废弃物
#[derive(Debug, Clone, PartialEq)]
pub struct WasteCandidate {
    pub item_id: String,
    pub mass_kg: f64,
    pub volume: f64,
    pub priority: u32,
}

/// 选择结果; selected 为输入下标 (升序)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionResult {
    pub selected: Vec<usize>,
    pub total_mass: f64,
    pub total_volume: f64,
    pub total_priority: u64,
    pub exact: bool,
    pub budget_exceeded: bool,
}

impl SelectionResult {
    fn from_indices(candidates: &[WasteCandidate], mut selected: Vec<usize>, exact: bool) -> Self {
        selected.sort_unstable();
        selected.dedup();
        let total_mass = selected.iter().map(|&i| candidates[i].mass_kg).sum();
        let total_volume = selected.iter().map(|&i| candidates[i].volume).sum();
        let total_priority = selected
            .iter()
            .map(|&i| u64::from(candidates[i].priority))
            .sum();
        let budget_exceeded = selected.is_empty() && !candidates.is_empty();
        Self {
            selected,
            total_mass,
            total_volume,
            total_priority,
            exact,
            budget_exceeded,
        }
    }
}

// ==========================================
// WasteReturnPlanner
// ==========================================
#[derive(Debug, Clone)]
pub struct WasteReturnPlanner {
    pub mode: ReturnSelection,
    pub enumeration_max_items: usize,
    pub exact_max_items: usize,
    pub exact_max_budget_units: usize,
    pub mass_resolution_kg: f64,
}

impl Default for WasteReturnPlanner {
    fn default() -> Self {
        Self {
            mode: ReturnSelection::PriorityKnapsack,
            enumeration_max_items: DEFAULT_ENUMERATION_MAX_ITEMS,
            exact_max_items: DEFAULT_EXACT_MAX_ITEMS,
            exact_max_budget_units: DEFAULT_EXACT_MAX_BUDGET_UNITS,
            mass_resolution_kg: DEFAULT_MASS_RESOLUTION_KG,
        }
    }
}

impl WasteReturnPlanner {
    pub fn with_mode(mut self, mode: ReturnSelection) -> Self {
        self.mode = mode;
        self
    }

    /// 选择返还子集
    ///
    /// # 参数
    /// - candidates: 废弃物 (按进入废弃集合的顺序)
    /// - max_mass: 质量上限 (kg)
    /// - max_volume: 体积上限 (cm³), None 表示不限
    #[instrument(skip(self, candidates), fields(n = candidates.len(), mode = ?self.mode))]
    pub fn select(
        &self,
        candidates: &[WasteCandidate],
        max_mass: f64,
        max_volume: Option<f64>,
    ) -> EngineResult<SelectionResult> {
        if !max_mass.is_finite() || max_mass < 0.0 {
            return Err(EngineError::InvalidBudget {
                field: "max_mass",
                value: max_mass,
            });
        }
        if let Some(v) = max_volume {
            if !v.is_finite() || v < 0.0 {
                return Err(EngineError::InvalidBudget {
                    field: "max_volume",
                    value: v,
                });
            }
        }

        let caps = Caps {
            mass: max_mass,
            volume: max_volume,
        };
        let result = match self.mode {
            ReturnSelection::Fifo => Self::select_fifo(candidates, caps),
            ReturnSelection::PriorityKnapsack => self.select_by_priority(candidates, caps),
        };

        debug!(
            selected = result.selected.len(),
            total_mass = result.total_mass,
            total_priority = result.total_priority,
            exact = result.exact,
            "返还子集选择完成"
        );
        Ok(result)
    }

    // ==========================================
    // FIFO
    // ==========================================
    fn select_fifo(candidates: &[WasteCandidate], caps: Caps) -> SelectionResult {
        let mut mass = 0.0;
        let mut volume = 0.0;
        let mut selected = Vec::new();
        for (i, c) in candidates.iter().enumerate() {
            if !caps.admits(mass + c.mass_kg, volume + c.volume) {
                break;
            }
            mass += c.mass_kg;
            volume += c.volume;
            selected.push(i);
        }
        SelectionResult::from_indices(candidates, selected, true)
    }

    // ==========================================
    // 优先级背包
    // ==========================================
    fn select_by_priority(&self, candidates: &[WasteCandidate], caps: Caps) -> SelectionResult {
        // 单件就超限的物品不参与
        let eligible: Vec<usize> = (0..candidates.len())
            .filter(|&i| caps.admits(candidates[i].mass_kg, candidates[i].volume))
            .collect();

        let all_mass: f64 = eligible.iter().map(|&i| candidates[i].mass_kg).sum();
        let all_volume: f64 = eligible.iter().map(|&i| candidates[i].volume).sum();
        if caps.admits(all_mass, all_volume) {
            return SelectionResult::from_indices(candidates, eligible, true);
        }

        if eligible.len() <= self.enumeration_max_items {
            // 真实质量 + 体积双约束下的最优解, 无需修补
            let selected = branch_and_bound(candidates, &eligible, caps);
            return SelectionResult::from_indices(candidates, selected, true);
        }

        let resolution = if self.mass_resolution_kg > 0.0 {
            self.mass_resolution_kg
        } else {
            DEFAULT_MASS_RESOLUTION_KG
        };
        let budget_units = (caps.mass / resolution + TOLERANCE).floor();

        let (mut selected, exact) = if eligible.len() <= self.exact_max_items
            && budget_units <= self.exact_max_budget_units as f64
        {
            // 质量向上取整保证可行; 仅当全部质量落在分辨率网格上时才不丢可行解
            let mut on_grid = true;
            let units: Vec<usize> = eligible
                .iter()
                .map(|&i| {
                    let raw = candidates[i].mass_kg / resolution;
                    if (raw - raw.round()).abs() > 1e-6 {
                        on_grid = false;
                    }
                    (raw - TOLERANCE).ceil().max(0.0) as usize
                })
                .collect();
            (
                knapsack_dp(candidates, &eligible, &units, budget_units as usize),
                on_grid,
            )
        } else {
            (greedy_with_best_single(candidates, &eligible, caps), false)
        };

        // 体积约束生效时的修补: 先按 优先级/体积 由低到高剔除, 再回填
        let mut exact = exact;
        if let Some(cap) = caps.volume {
            let volume: f64 = selected.iter().map(|&i| candidates[i].volume).sum();
            if volume > cap + TOLERANCE {
                exact = false;
                repair_volume(candidates, &mut selected, &eligible, caps);
            }
        }

        SelectionResult::from_indices(candidates, selected, exact)
    }
}

#[derive(Debug, Clone, Copy)]
struct Caps {
    mass: f64,
    volume: Option<f64>,
}

impl Caps {
    fn admits(&self, mass: f64, volume: f64) -> bool {
        mass <= self.mass + TOLERANCE && self.volume.map(|v| volume <= v + TOLERANCE).unwrap_or(true)
    }
}

/// 分支定界: 按优先级密度降序逐件决定取舍, 以分数背包松弛 (只看质量) 作为上界剪枝
fn branch_and_bound(candidates: &[WasteCandidate], eligible: &[usize], caps: Caps) -> Vec<usize> {
    let mut search = BranchSearch {
        candidates,
        order: density_order(candidates, eligible),
        caps,
        current: Vec::new(),
        best: Vec::new(),
        best_value: 0,
    };
    search.visit(0, 0.0, 0.0, 0);
    search.best
}

struct BranchSearch<'a> {
    candidates: &'a [WasteCandidate],
    order: Vec<usize>,
    caps: Caps,
    current: Vec<usize>,
    best: Vec<usize>,
    best_value: u64,
}

impl BranchSearch<'_> {
    fn visit(&mut self, k: usize, mass: f64, volume: f64, value: u64) {
        if value > self.best_value {
            self.best_value = value;
            self.best = self.current.clone();
        }
        if k == self.order.len() {
            return;
        }
        // 优先级为整数, 上界不足 best + 1 则无法改进
        if self.upper_bound(k, mass, value) < (self.best_value + 1) as f64 - 1e-6 {
            return;
        }

        let i = self.order[k];
        let c = &self.candidates[i];
        if self.caps.admits(mass + c.mass_kg, volume + c.volume) {
            self.current.push(i);
            self.visit(k + 1, mass + c.mass_kg, volume + c.volume, value + u64::from(c.priority));
            self.current.pop();
        }
        self.visit(k + 1, mass, volume, value);
    }

    fn upper_bound(&self, k: usize, mass: f64, value: u64) -> f64 {
        let mut room = (self.caps.mass + TOLERANCE - mass).max(0.0);
        let mut bound = value as f64;
        for &i in &self.order[k..] {
            let c = &self.candidates[i];
            let priority = f64::from(c.priority);
            if c.mass_kg <= room {
                room -= c.mass_kg;
                bound += priority;
            } else {
                bound += priority * room / c.mass_kg;
                break;
            }
        }
        bound
    }
}

/// 0/1 背包动态规划 (一维滚动 + 取舍表回溯)
fn knapsack_dp(
    candidates: &[WasteCandidate],
    eligible: &[usize],
    units: &[usize],
    budget: usize,
) -> Vec<usize> {
    let n = eligible.len();
    let mut best = vec![0u64; budget + 1];
    let mut keep = vec![vec![false; budget + 1]; n];

    for k in 0..n {
        let w = units[k];
        let value = u64::from(candidates[eligible[k]].priority);
        if w > budget {
            continue;
        }
        for cap in (w..=budget).rev() {
            let with = best[cap - w] + value;
            if with > best[cap] {
                best[cap] = with;
                keep[k][cap] = true;
            }
        }
    }

    let mut cap = budget;
    let mut out = Vec::new();
    for k in (0..n).rev() {
        if keep[k][cap] {
            out.push(eligible[k]);
            cap -= units[k];
        }
    }
    out
}

/// 优先级密度 (价值/质量) 降序
fn density_order(candidates: &[WasteCandidate], pool: &[usize]) -> Vec<usize> {
    let density = |i: usize| {
        let c = &candidates[i];
        if c.mass_kg <= TOLERANCE {
            f64::INFINITY
        } else {
            f64::from(c.priority) / c.mass_kg
        }
    };
    let mut order = pool.to_vec();
    order.sort_by(|&a, &b| {
        density(b)
            .partial_cmp(&density(a))
            .unwrap_or(Ordering::Equal)
            .then_with(|| candidates[b].priority.cmp(&candidates[a].priority))
            .then_with(|| a.cmp(&b))
    });
    order
}

fn greedy_with_best_single(candidates: &[WasteCandidate], eligible: &[usize], caps: Caps) -> Vec<usize> {
    let mut mass = 0.0;
    let mut volume = 0.0;
    let mut greedy = Vec::new();
    for i in density_order(candidates, eligible) {
        let c = &candidates[i];
        if caps.admits(mass + c.mass_kg, volume + c.volume) {
            mass += c.mass_kg;
            volume += c.volume;
            greedy.push(i);
        }
    }

    let greedy_value: u64 = greedy.iter().map(|&i| u64::from(candidates[i].priority)).sum();
    let best_single = eligible
        .iter()
        .copied()
        .max_by(|&a, &b| candidates[a].priority.cmp(&candidates[b].priority).then_with(|| b.cmp(&a)));
    match best_single {
        Some(i) if u64::from(candidates[i].priority) > greedy_value => vec![i],
        _ => greedy,
    }
}

fn repair_volume(candidates: &[WasteCandidate], selected: &mut Vec<usize>, eligible: &[usize], caps: Caps) {
    let per_volume = |i: usize| {
        let c = &candidates[i];
        if c.volume <= TOLERANCE {
            f64::INFINITY
        } else {
            f64::from(c.priority) / c.volume
        }
    };

    // 剔除
    selected.sort_by(|&a, &b| {
        per_volume(a)
            .partial_cmp(&per_volume(b))
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.cmp(&a))
    });
    let mut volume: f64 = selected.iter().map(|&i| candidates[i].volume).sum();
    let mut mass: f64 = selected.iter().map(|&i| candidates[i].mass_kg).sum();
    let cap = caps.volume.unwrap_or(f64::INFINITY);
    while volume > cap + TOLERANCE && !selected.is_empty() {
        let dropped = selected.remove(0);
        volume -= candidates[dropped].volume;
        mass -= candidates[dropped].mass_kg;
    }

    // 回填
    for i in density_order(candidates, eligible) {
        if selected.contains(&i) {
            continue;
        }
        let c = &candidates[i];
        if caps.admits(mass + c.mass_kg, volume + c.volume) {
            mass += c.mass_kg;
            volume += c.volume;
            selected.push(i);
        }
    }
}
