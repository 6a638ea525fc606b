// ==========================================
// 空间站货舱管理系统 - 取用规划器
// ==========================================
// 职责: 生成并执行 "移开遮挡物 → 取出目标 → 遮挡物归位/重新放置" 的步骤序列
// 红线: 可逆 — 每个被移开的物品要么回到原位, 要么被重新求解放置,
//       放不下时必须以 NoFitFound 显式上报
// 红线: 暂存区窗口内的修改只在 commit 时生效, 任意失败路径不影响在用货箱
// ==========================================

use crate::domain::container::Container;
use crate::domain::item::{Item, Placement};
use crate::domain::spatial::Cuboid;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::geometry::intersection;
use crate::engine::obstruction::ObstructionModel;
use crate::engine::placement_solver::PlacementSolver;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

// ==========================================
// 取用步骤
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RetrievalAction {
    SetAside,   // 遮挡物移入暂存区
    Retrieve,   // 取出目标
    PlaceBack,  // 遮挡物回到原位
    Relocate,   // 遮挡物被重新求解到新位置
    NoFitFound, // 遮挡物无处可放
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalStep {
    pub step: usize,
    pub action: RetrievalAction,
    pub item_id: String,
    pub item_name: String,
    pub position: Option<Cuboid>,
    /// 需要操作员注意的情况 (例如最后位置已被占用)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// 仅规划、不执行的取用方案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalPlan {
    pub target_id: String,
    pub container_id: String,
    pub steps: Vec<RetrievalStep>,
    /// 与目标最后位置重叠的在箱物品
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overlapping: Vec<String>,
}

impl RetrievalPlan {
    /// 需要临时移开的物品数
    pub fn obstruction_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.action == RetrievalAction::SetAside)
            .count()
    }
}

/// 执行结果
#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    pub steps: Vec<RetrievalStep>,
    pub extracted: Placement,
    pub set_aside: Vec<Placement>,
    pub replaced: Vec<Placement>,
    pub unplaced: Vec<String>,
}

// ==========================================
// HoldingArea - 暂存区 (作用域守卫)
// ==========================================
// 在货箱副本上操作; 只有 commit 才写回在用货箱
pub struct HoldingArea {
    working: Container,
    held: Vec<Placement>,
    committed: bool,
}

impl HoldingArea {
    pub fn open(container: &Container) -> Self {
        Self {
            working: container.clone(),
            held: Vec::new(),
            committed: false,
        }
    }

    /// 把物品从货箱移入暂存区
    pub fn set_aside(&mut self, item_id: &str) -> EngineResult<Placement> {
        let p = self.take(item_id)?;
        self.held.push(p.clone());
        Ok(p)
    }

    /// 取出目标 (不进入暂存区)
    pub fn extract(&mut self, item_id: &str) -> EngineResult<Placement> {
        self.take(item_id)
    }

    pub fn held(&self) -> &[Placement] {
        &self.held
    }

    pub fn working_mut(&mut self) -> &mut Container {
        &mut self.working
    }

    /// 暂存物品已处理完 (归位或上报), 从暂存区移除
    pub fn release(&mut self, item_id: &str) {
        self.held.retain(|p| p.item_id != item_id);
    }

    /// 写回在用货箱
    pub fn commit(mut self, live: &mut Container) {
        self.committed = true;
        *live = std::mem::replace(
            &mut self.working,
            Container::new("", "", live.dimensions),
        );
    }

    fn take(&mut self, item_id: &str) -> EngineResult<Placement> {
        self.working
            .take_placement(item_id)
            .ok_or_else(|| EngineError::ItemNotInContainer {
                item_id: item_id.to_string(),
                container_id: self.working.container_id.clone(),
            })
    }
}

impl Drop for HoldingArea {
    fn drop(&mut self) {
        if !self.committed {
            warn!(
                container_id = %self.working.container_id,
                held = self.held.len(),
                "暂存区未提交, 在用货箱保持原状"
            );
        }
    }
}

// ==========================================
// RetrievalPlanner - 取用规划器
// ==========================================
pub struct RetrievalPlanner {
    solver: PlacementSolver,
}

impl Default for RetrievalPlanner {
    fn default() -> Self {
        Self::new(PlacementSolver::default())
    }
}

impl RetrievalPlanner {
    pub fn new(solver: PlacementSolver) -> Self {
        Self { solver }
    }

    /// 规划取用步骤 (不修改货箱)
    ///
    /// 步骤: 遮挡物按离开口由近到远依次移开 → 取出目标 → 遮挡物逆序归位
    pub fn plan(
        &self,
        container: &Container,
        target_id: &str,
        items: &BTreeMap<String, Item>,
    ) -> EngineResult<RetrievalPlan> {
        let blockers = ObstructionModel::removal_order_for(container, target_id)?;
        let name_of = |id: &str| items.get(id).map(|i| i.name.clone()).unwrap_or_default();

        let mut steps = Vec::with_capacity(blockers.len() * 2 + 1);
        for b in &blockers {
            steps.push(RetrievalStep {
                step: steps.len() + 1,
                action: RetrievalAction::SetAside,
                item_id: b.item_id.clone(),
                item_name: name_of(&b.item_id),
                position: Some(b.position),
                note: None,
            });
        }
        steps.push(RetrievalStep {
            step: steps.len() + 1,
            action: RetrievalAction::Retrieve,
            item_id: target_id.to_string(),
            item_name: name_of(target_id),
            position: container.placement_of(target_id).map(|p| p.position),
            note: None,
        });
        for b in blockers.iter().rev() {
            steps.push(RetrievalStep {
                step: steps.len() + 1,
                action: RetrievalAction::PlaceBack,
                item_id: b.item_id.clone(),
                item_name: name_of(&b.item_id),
                position: Some(b.position),
                note: None,
            });
        }

        Ok(RetrievalPlan {
            target_id: target_id.to_string(),
            container_id: container.container_id.clone(),
            steps,
            overlapping: Vec::new(),
        })
    }

    /// 规划一个已不在货箱中的物品 (例如废弃物) 按最后放置位置取出的步骤
    pub fn plan_from_last_position(
        &self,
        container: &Container,
        last: &Placement,
        items: &BTreeMap<String, Item>,
    ) -> RetrievalPlan {
        // 腾出的位置可能已被新物品占用
        let overlapping: Vec<(String, f64)> = container
            .placements
            .iter()
            .filter(|p| p.item_id != last.item_id)
            .filter_map(|p| {
                intersection(&p.position, &last.position).map(|o| (p.item_id.clone(), o.volume()))
            })
            .collect();

        let mut view = container.clone();
        if !view.contains_item(&last.item_id) {
            view.placements.push(last.clone());
        }
        let mut plan = match self.plan(&view, &last.item_id, items) {
            Ok(plan) => plan,
            // 上面已放入目标, 不会走到这里
            Err(_) => RetrievalPlan {
                target_id: last.item_id.clone(),
                container_id: container.container_id.clone(),
                steps: Vec::new(),
                overlapping: Vec::new(),
            },
        };

        if !overlapping.is_empty() {
            let ids: Vec<String> = overlapping.iter().map(|(id, _)| id.clone()).collect();
            let overlap_volume: f64 = overlapping.iter().map(|(_, v)| v).sum();
            warn!(
                item_id = %last.item_id,
                container_id = %container.container_id,
                occupants = ?ids,
                overlap_volume,
                "最后放置位置已被其他物品占用"
            );
            if let Some(step) = plan
                .steps
                .iter_mut()
                .find(|s| s.action == RetrievalAction::Retrieve)
            {
                step.note = Some(format!(
                    "最后放置位置已被 {} 占用, 需现场确认物品实际位置",
                    ids.join(", ")
                ));
            }
            plan.overlapping = ids;
        }
        plan
    }

    /// 执行取用, 成功后写回货箱
    ///
    /// # 返回
    /// - Ok(RetrievalOutcome): 步骤与各物品最终位置
    /// - Err: 目标不在货箱 / 物品主数据缺失 / 几何错误; 此时货箱不变
    #[instrument(skip(self, container, items), fields(container_id = %container.container_id))]
    pub fn execute(
        &self,
        container: &mut Container,
        target_id: &str,
        items: &BTreeMap<String, Item>,
    ) -> EngineResult<RetrievalOutcome> {
        let blockers: Vec<Placement> = ObstructionModel::removal_order_for(container, target_id)?
            .into_iter()
            .cloned()
            .collect();
        let name_of = |id: &str| items.get(id).map(|i| i.name.clone()).unwrap_or_default();

        let mut holding = HoldingArea::open(container);
        let mut steps: Vec<RetrievalStep> = Vec::new();
        let push = |steps: &mut Vec<RetrievalStep>, action, id: &str, position| {
            steps.push(RetrievalStep {
                step: steps.len() + 1,
                action,
                item_id: id.to_string(),
                item_name: name_of(id),
                position,
                note: None,
            });
        };

        // 1) 移开遮挡物
        let mut set_aside = Vec::with_capacity(blockers.len());
        for b in &blockers {
            let p = holding.set_aside(&b.item_id)?;
            push(&mut steps, RetrievalAction::SetAside, &p.item_id, Some(p.position));
            set_aside.push(p);
        }

        // 2) 取出目标
        let extracted = holding.extract(target_id)?;
        push(&mut steps, RetrievalAction::Retrieve, target_id, Some(extracted.position));

        // 3) 按优先级降序重新放置遮挡物, 原位空闲时优先回原位
        let mut order: Vec<Placement> = holding.held().to_vec();
        order.sort_by(|a, b| {
            let pa = items.get(&a.item_id).map(|i| i.priority).unwrap_or(0);
            let pb = items.get(&b.item_id).map(|i| i.priority).unwrap_or(0);
            pb.cmp(&pa)
        });

        let mut replaced = Vec::new();
        let mut unplaced = Vec::new();
        for original in order {
            let item = items
                .get(&original.item_id)
                .ok_or_else(|| EngineError::UnknownItem(original.item_id.clone()))?;
            let result = self
                .solver
                .place_in_container(item, holding.working_mut(), Some(&original))?;
            holding.release(&original.item_id);
            match result {
                Some(p) if p.position == original.position => {
                    push(&mut steps, RetrievalAction::PlaceBack, &p.item_id, Some(p.position));
                    replaced.push(p);
                }
                Some(p) => {
                    push(&mut steps, RetrievalAction::Relocate, &p.item_id, Some(p.position));
                    replaced.push(p);
                }
                None => {
                    warn!(item_id = %original.item_id, "遮挡物无法重新放置: NoFitFound");
                    push(&mut steps, RetrievalAction::NoFitFound, &original.item_id, None);
                    unplaced.push(original.item_id.clone());
                }
            }
        }

        holding.commit(container);
        debug!(
            target_id,
            obstructions = set_aside.len(),
            steps = steps.len(),
            "取用完成"
        );

        Ok(RetrievalOutcome {
            steps,
            extracted,
            set_aside,
            replaced,
            unplaced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::spatial::{Coordinates, Dimensions, Orientation};
    use crate::engine::geometry::intersects;

    fn setup() -> (Container, BTreeMap<String, Item>) {
        let mut c = Container::new("C1", "Lab", Dimensions::new(30.0, 90.0, 30.0));
        let mut items = BTreeMap::new();
        for (id, depth, prio) in [("back", 60.0, 9), ("mid", 30.0, 5), ("front", 0.0, 1)] {
            let item = Item::new(id, id.to_uppercase(), Dimensions::new(30.0, 30.0, 30.0), 2.0, prio);
            c.placements.push(Placement {
                item_id: id.to_string(),
                container_id: "C1".into(),
                position: Cuboid::at(Coordinates::new(0.0, depth, 0.0), &item.dimensions),
                orientation: Orientation::Wdh,
            });
            items.insert(id.to_string(), item);
        }
        (c, items)
    }

    #[test]
    fn test_plan_orders_steps() {
        let (c, items) = setup();
        let plan = RetrievalPlanner::default().plan(&c, "back", &items).unwrap();
        let seq: Vec<_> = plan.steps.iter().map(|s| (s.action, s.item_id.as_str())).collect();
        assert_eq!(
            seq,
            vec![
                (RetrievalAction::SetAside, "front"),
                (RetrievalAction::SetAside, "mid"),
                (RetrievalAction::Retrieve, "back"),
                (RetrievalAction::PlaceBack, "mid"),
                (RetrievalAction::PlaceBack, "front"),
            ]
        );
        assert_eq!(plan.obstruction_count(), 2);
        assert_eq!(plan.steps[2].item_name, "BACK");
    }

    #[test]
    fn test_execute_restores_blockers() {
        let (mut c, items) = setup();
        let before = c.clone();
        let out = RetrievalPlanner::default().execute(&mut c, "back", &items).unwrap();

        assert_eq!(out.set_aside.len(), 2);
        assert!(out.unplaced.is_empty());
        assert!(!c.contains_item("back"));
        for id in ["mid", "front"] {
            let now = c.placement_of(id).unwrap();
            let was = before.placement_of(id).unwrap();
            let moved_validly = c
                .placements
                .iter()
                .filter(|p| p.item_id != id)
                .all(|p| !intersects(&p.position, &now.position));
            assert!(now.position == was.position || moved_validly);
        }
    }

    #[test]
    fn test_execute_missing_target_leaves_container_untouched() {
        let (mut c, items) = setup();
        let before = c.clone();
        let res = RetrievalPlanner::default().execute(&mut c, "ghost", &items);
        assert!(res.is_err());
        assert_eq!(c.placements, before.placements);
    }

    #[test]
    fn test_execute_unknown_blocker_rolls_back() {
        let (mut c, mut items) = setup();
        items.remove("front");
        let before = c.clone();
        let res = RetrievalPlanner::default().execute(&mut c, "back", &items);
        assert!(matches!(res, Err(EngineError::UnknownItem(_))));
        assert_eq!(c.placements, before.placements);
    }

    #[test]
    fn test_plan_from_last_position() {
        let (mut c, items) = setup();
        let last = c.take_placement("back").unwrap();
        let plan = RetrievalPlanner::default().plan_from_last_position(&c, &last, &items);
        assert_eq!(plan.obstruction_count(), 2);
        assert_eq!(plan.target_id, "back");
        assert!(plan.overlapping.is_empty());
        assert!(plan.steps.iter().all(|s| s.note.is_none()));
    }

    #[test]
    fn test_plan_from_last_position_flags_reused_slot() {
        let (mut c, mut items) = setup();
        let last = c.take_placement("back").unwrap();
        let newcomer = Item::new("newcomer", "NEW", Dimensions::new(30.0, 30.0, 30.0), 1.0, 3);
        c.placements.push(Placement {
            item_id: "newcomer".into(),
            container_id: "C1".into(),
            position: last.position,
            orientation: Orientation::Wdh,
        });
        items.insert("newcomer".to_string(), newcomer);

        let plan = RetrievalPlanner::default().plan_from_last_position(&c, &last, &items);
        assert_eq!(plan.overlapping, vec!["newcomer".to_string()]);
        let retrieve = plan
            .steps
            .iter()
            .find(|s| s.action == RetrievalAction::Retrieve)
            .unwrap();
        assert_eq!(retrieve.item_id, "back");
        assert!(retrieve.note.as_deref().unwrap().contains("newcomer"));
    }
}
