// ==========================================
// 空间站货舱管理系统 - 放置求解器
// ==========================================
// 职责: 为待放置物品选择 货箱 + 位置 + 朝向
// 输入: 待放置物品 (按优先级降序) + 货箱当前占用
// 输出: 放置列表 + 重排建议 (挪位 / NoFitFound)
// ==========================================
// 红线: 不允许重叠, 不允许越界
// 红线: 放不下的物品必须以 NoFitFound 上报, 不得静默丢弃
// 红线: 挪位递归深度有界, 保证终止
// ==========================================

use crate::domain::container::Container;
use crate::domain::item::{Item, Placement};
use crate::domain::spatial::{Cuboid, Dimensions, Orientation};
use crate::engine::free_space::FreeSpaceList;
use crate::engine::geometry::{contains, enumerate_orientations, fits, intersects, GeometryError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

/// 挪位递归深度上限
pub const MAX_RELOCATION_DEPTH: usize = 2;

// ==========================================
// 重排建议
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RearrangementAction {
    Relocate,   // 挪动已入箱的低优先级物品
    NoFitFound, // 无可行放置, 需人工重排
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rearrangement {
    pub step: usize,
    pub action: RearrangementAction,
    pub item_id: String,
    pub from_container: Option<String>,
    pub from_position: Option<Cuboid>,
    pub to_container: Option<String>,
    pub to_position: Option<Cuboid>,
    pub reason: Option<String>,
}

/// 求解结果
#[derive(Debug, Clone, Default)]
pub struct SolverOutcome {
    pub placements: Vec<Placement>,
    pub rearrangements: Vec<Rearrangement>,
}

impl SolverOutcome {
    pub fn no_fit_item_ids(&self) -> Vec<&str> {
        self.rearrangements
            .iter()
            .filter(|r| r.action == RearrangementAction::NoFitFound)
            .map(|r| r.item_id.as_str())
            .collect()
    }

    pub fn relocations(&self) -> impl Iterator<Item = &Rearrangement> {
        self.rearrangements
            .iter()
            .filter(|r| r.action == RearrangementAction::Relocate)
    }
}

// ==========================================
// 求解工作区: 货箱副本 + 空闲空间表
// ==========================================
#[derive(Debug, Clone)]
struct Workspace {
    container: Container,
    free: FreeSpaceList,
}

impl Workspace {
    fn new(container: Container) -> Self {
        let free = FreeSpaceList::from_occupants(
            container.bounds(),
            container.placements.iter().map(|p| &p.position),
        );
        Self { container, free }
    }

    fn commit(&mut self, placement: Placement) {
        self.free.occupy(&placement.position);
        self.container.placements.push(placement);
    }

    fn evict(&mut self, item_id: &str) -> Option<Placement> {
        let removed = self.container.take_placement(item_id)?;
        self.free = FreeSpaceList::from_occupants(
            self.container.bounds(),
            self.container.placements.iter().map(|p| &p.position),
        );
        Some(removed)
    }
}

// 单次挪位记录 (内部)
#[derive(Debug, Clone)]
struct Move {
    from: Placement,
    to: Placement,
}

// ==========================================
// PlacementSolver - 放置求解器
// ==========================================
pub struct PlacementSolver {
    max_relocation_depth: usize,
}

impl Default for PlacementSolver {
    fn default() -> Self {
        Self::new(MAX_RELOCATION_DEPTH)
    }
}

impl PlacementSolver {
    /// 构造函数; 深度上限不超过 MAX_RELOCATION_DEPTH
    pub fn new(max_relocation_depth: usize) -> Self {
        Self {
            max_relocation_depth: max_relocation_depth.min(MAX_RELOCATION_DEPTH),
        }
    }

    // ==========================================
    // 排序
    // ==========================================

    /// 待放置顺序: 优先级降序, 同优先级体积升序 (小而关键的先填缝), 再按ID
    pub fn sort_pending(items: &mut [Item]) {
        items.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.volume().partial_cmp(&b.volume()).unwrap_or(Ordering::Equal))
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 批量求解
    ///
    /// # 参数
    /// - `pending`: 待放置物品 (内部会再排序一次)
    /// - `containers`: 货箱 (成功时被就地更新)
    /// - `known`: 已入箱物品索引, 用于挪位时查询优先级与尺寸
    ///
    /// # 返回
    /// - Ok(SolverOutcome): 放置与重排建议; 部分成功同样以 Ok 返回
    /// - Err(GeometryError): 任一待放置物品尺寸非法, 整个请求失败且不修改货箱
    #[instrument(skip(self, pending, containers, known), fields(
        pending_count = pending.len(),
        container_count = containers.len()
    ))]
    pub fn solve(
        &self,
        pending: &[Item],
        containers: &mut [Container],
        known: &BTreeMap<String, Item>,
    ) -> Result<SolverOutcome, GeometryError> {
        for item in pending {
            enumerate_orientations(&item.dimensions)?;
        }

        let mut sorted = pending.to_vec();
        Self::sort_pending(&mut sorted);

        // 挪位查询: 已知物品 + 本批物品
        let mut index: BTreeMap<String, Item> = known.clone();
        for item in &sorted {
            index.insert(item.item_id.clone(), item.clone());
        }

        let mut workspaces: Vec<Workspace> =
            containers.iter().cloned().map(Workspace::new).collect();
        let mut moves: Vec<Move> = Vec::new();
        let mut no_fit: Vec<(String, String)> = Vec::new();
        let mut placed_ids: Vec<String> = Vec::new();

        for item in &sorted {
            match self.place_with_relocation(item, &mut workspaces, &index, 0, &mut moves)? {
                Some(p) => {
                    debug!(
                        item_id = %item.item_id,
                        container_id = %p.container_id,
                        position = %p.position,
                        orientation = %p.orientation,
                        "物品已放置"
                    );
                    placed_ids.push(item.item_id.clone());
                }
                None => {
                    let reason = if workspaces.iter().any(|ws| {
                        Self::shape_fits(&item.dimensions, &ws.container.dimensions)
                    }) {
                        "现有占用下无可行位置".to_string()
                    } else {
                        "物品外形超出所有货箱".to_string()
                    };
                    warn!(item_id = %item.item_id, %reason, "NoFitFound");
                    no_fit.push((item.item_id.clone(), reason));
                }
            }
        }

        // 汇总输出
        let mut outcome = SolverOutcome::default();
        for id in &placed_ids {
            if let Some(p) = workspaces
                .iter()
                .find_map(|ws| ws.container.placement_of(id))
            {
                outcome.placements.push(p.clone());
            }
        }
        let mut step = 0;
        for mv in moves {
            step += 1;
            outcome.rearrangements.push(Rearrangement {
                step,
                action: RearrangementAction::Relocate,
                item_id: mv.from.item_id.clone(),
                from_container: Some(mv.from.container_id.clone()),
                from_position: Some(mv.from.position),
                to_container: Some(mv.to.container_id.clone()),
                to_position: Some(mv.to.position),
                reason: None,
            });
        }
        for (item_id, reason) in no_fit {
            step += 1;
            outcome.rearrangements.push(Rearrangement {
                step,
                action: RearrangementAction::NoFitFound,
                item_id,
                from_container: None,
                from_position: None,
                to_container: None,
                to_position: None,
                reason: Some(reason),
            });
        }

        for (slot, ws) in containers.iter_mut().zip(workspaces) {
            *slot = ws.container;
        }
        Ok(outcome)
    }

    /// 单货箱直接放置 (不挪位), 成功时写入货箱
    ///
    /// preferred 给出时先尝试该位置 (例如遮挡物的原位)
    pub fn place_in_container(
        &self,
        item: &Item,
        container: &mut Container,
        preferred: Option<&Placement>,
    ) -> Result<Option<Placement>, GeometryError> {
        let orientations = enumerate_orientations(&item.dimensions)?;

        if let Some(pref) = preferred {
            if pref.container_id == container.container_id
                && Self::is_free(container, &pref.position, &item.item_id)
            {
                let p = Placement {
                    item_id: item.item_id.clone(),
                    container_id: container.container_id.clone(),
                    position: pref.position,
                    orientation: pref.orientation,
                };
                container.placements.push(p.clone());
                return Ok(Some(p));
            }
        }

        let ws = Workspace::new(container.clone());
        match Self::find_position(item, &ws, &orientations) {
            Some(p) => {
                container.placements.push(p.clone());
                Ok(Some(p))
            }
            None => Ok(None),
        }
    }

    // ==========================================
    // 内部方法
    // ==========================================

    /// 直接放置; 失败且深度允许时尝试一次挪位
    fn place_with_relocation(
        &self,
        item: &Item,
        workspaces: &mut Vec<Workspace>,
        index: &BTreeMap<String, Item>,
        depth: usize,
        moves: &mut Vec<Move>,
    ) -> Result<Option<Placement>, GeometryError> {
        let orientations = enumerate_orientations(&item.dimensions)?;
        let order = Self::container_order(item, workspaces);

        for &idx in &order {
            if let Some(p) = Self::find_position(item, &workspaces[idx], &orientations) {
                workspaces[idx].commit(p.clone());
                return Ok(Some(p));
            }
        }

        if depth >= self.max_relocation_depth {
            return Ok(None);
        }

        // 挪位: 从最低优先级的已入箱物品开始尝试腾挪
        let victims = Self::relocation_candidates(item, workspaces, index);
        for (idx, victim_id) in victims {
            let Some(victim) = index.get(&victim_id) else {
                continue;
            };

            let mut trial = workspaces.clone();
            let Some(old) = trial[idx].evict(&victim_id) else {
                continue;
            };
            let Some(p) = Self::find_position(item, &trial[idx], &orientations) else {
                continue;
            };
            trial[idx].commit(p.clone());

            let mut trial_moves = Vec::new();
            if let Some(new_slot) =
                self.place_with_relocation(victim, &mut trial, index, depth + 1, &mut trial_moves)?
            {
                debug!(
                    item_id = %item.item_id,
                    victim_id = %victim_id,
                    depth,
                    "挪位成功"
                );
                *workspaces = trial;
                moves.extend(trial_moves);
                moves.push(Move {
                    from: old,
                    to: new_slot,
                });
                return Ok(Some(p));
            }
        }

        Ok(None)
    }

    /// 货箱顺序: 偏好区域优先, 其次 空闲体积/物品体积 比值升序 (最紧凑优先)
    fn container_order(item: &Item, workspaces: &[Workspace]) -> Vec<usize> {
        let volume = item.volume();
        let mut order: Vec<(usize, bool, f64)> = workspaces
            .iter()
            .enumerate()
            .filter(|(_, ws)| ws.free.total_volume() + 1e-6 >= volume)
            .filter(|(_, ws)| Self::shape_fits(&item.dimensions, &ws.container.dimensions))
            .map(|(i, ws)| {
                let zone_match = item
                    .preferred_zone
                    .as_deref()
                    .map(|z| z == ws.container.zone)
                    .unwrap_or(false);
                (i, zone_match, ws.free.total_volume() / volume)
            })
            .collect();

        order.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal))
                .then_with(|| {
                    workspaces[a.0]
                        .container
                        .container_id
                        .cmp(&workspaces[b.0].container.container_id)
                })
        });
        order.into_iter().map(|(i, _, _)| i).collect()
    }

    /// 首个满足 不重叠 + 不越界 的位置
    fn find_position(
        item: &Item,
        ws: &Workspace,
        orientations: &[Orientation],
    ) -> Option<Placement> {
        let bounds = ws.container.bounds();
        for &o in orientations {
            if !fits(&item.dimensions, &ws.container.dimensions, o).unwrap_or(false) {
                continue;
            }
            let extents = o.apply(&item.dimensions);
            for anchor in ws.free.anchors(&extents, ws.container.open_face) {
                let position = Cuboid::at(anchor, &extents);
                if !contains(&bounds, &position) {
                    continue;
                }
                if ws
                    .container
                    .placements
                    .iter()
                    .any(|p| intersects(&p.position, &position))
                {
                    continue;
                }
                return Some(Placement {
                    item_id: item.item_id.clone(),
                    container_id: ws.container.container_id.clone(),
                    position,
                    orientation: o,
                });
            }
        }
        None
    }

    /// 挪位候选: 严格低于当前物品优先级的已入箱物品, 优先级升序、体积降序
    ///
    /// 只看外形放得下的货箱; 不按当前空闲体积过滤 (腾挪后才有空间)
    fn relocation_candidates(
        item: &Item,
        workspaces: &[Workspace],
        index: &BTreeMap<String, Item>,
    ) -> Vec<(usize, String)> {
        let mut out: Vec<(usize, u32, f64, String)> = Vec::new();
        for (idx, ws) in workspaces.iter().enumerate() {
            if !Self::shape_fits(&item.dimensions, &ws.container.dimensions) {
                continue;
            }
            for p in &ws.container.placements {
                let Some(stowed) = index.get(&p.item_id) else {
                    continue;
                };
                if stowed.priority < item.priority {
                    out.push((idx, stowed.priority, p.position.volume(), p.item_id.clone()));
                }
            }
        }
        out.sort_by(|a, b| {
            a.1.cmp(&b.1)
                .then_with(|| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal))
                .then_with(|| a.3.cmp(&b.3))
        });
        out.into_iter().map(|(idx, _, _, id)| (idx, id)).collect()
    }

    fn shape_fits(dims: &Dimensions, container_dims: &Dimensions) -> bool {
        enumerate_orientations(dims)
            .map(|os| os.into_iter().any(|o| fits(dims, container_dims, o).unwrap_or(false)))
            .unwrap_or(false)
    }

    fn is_free(container: &Container, position: &Cuboid, self_id: &str) -> bool {
        contains(&container.bounds(), position)
            && !container
                .placements
                .iter()
                .filter(|p| p.item_id != self_id)
                .any(|p| intersects(&p.position, position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::spatial::Coordinates;

    fn item(id: &str, size: f64, priority: u32) -> Item {
        Item::new(id, id, Dimensions::new(size, size, size), 1.0, priority)
    }

    fn container(id: &str, size: f64) -> Container {
        Container::new(id, "Storage", Dimensions::new(size, size, size))
    }

    fn assert_invariants(c: &Container) {
        for (i, a) in c.placements.iter().enumerate() {
            assert!(contains(&c.bounds(), &a.position));
            for b in c.placements.iter().skip(i + 1) {
                assert!(!intersects(&a.position, &b.position), "{} overlaps {}", a.item_id, b.item_id);
            }
        }
    }

    #[test]
    fn test_sort_pending_priority_then_volume() {
        let mut items = vec![item("big", 20.0, 9), item("low", 1.0, 1), item("small", 5.0, 9)];
        PlacementSolver::sort_pending(&mut items);
        let ids: Vec<_> = items.iter().map(|i| i.item_id.as_str()).collect();
        assert_eq!(ids, vec!["small", "big", "low"]);
    }

    #[test]
    fn test_first_item_goes_to_origin() {
        let solver = PlacementSolver::default();
        let mut containers = vec![container("C", 100.0)];
        let out = solver
            .solve(&[item("A", 50.0, 9)], &mut containers, &BTreeMap::new())
            .unwrap();
        assert_eq!(out.placements.len(), 1);
        assert_eq!(out.placements[0].position.start, Coordinates::origin());
        assert_eq!(out.placements[0].position.end, Coordinates::new(50.0, 50.0, 50.0));
    }

    #[test]
    fn test_eight_cubes_fill_container() {
        let solver = PlacementSolver::default();
        let mut containers = vec![container("C", 100.0)];
        let items: Vec<Item> = (0..8).map(|i| item(&format!("I{}", i), 50.0, 5)).collect();
        let out = solver.solve(&items, &mut containers, &BTreeMap::new()).unwrap();
        assert_eq!(out.placements.len(), 8);
        assert!(out.rearrangements.is_empty());
        assert_invariants(&containers[0]);
    }

    #[test]
    fn test_oversized_item_reported_not_dropped() {
        let solver = PlacementSolver::default();
        let mut containers = vec![container("C", 10.0)];
        let out = solver
            .solve(&[item("X", 20.0, 5)], &mut containers, &BTreeMap::new())
            .unwrap();
        assert!(out.placements.is_empty());
        assert_eq!(out.no_fit_item_ids(), vec!["X"]);
    }

    #[test]
    fn test_invalid_dimensions_fail_whole_request() {
        let solver = PlacementSolver::default();
        let mut containers = vec![container("C", 100.0)];
        let bad = Item::new("bad", "bad", Dimensions::new(-1.0, 1.0, 1.0), 1.0, 1);
        let res = solver.solve(&[item("ok", 10.0, 1), bad], &mut containers, &BTreeMap::new());
        assert!(res.is_err());
        assert!(containers[0].placements.is_empty());
    }

    #[test]
    fn test_relocates_lower_priority_item() {
        let solver = PlacementSolver::default();
        // 两个货箱: 小箱只能放 40 的立方体, 大箱 60
        let mut containers = vec![container("S", 40.0), container("L", 60.0)];
        let low = item("low", 40.0, 1);
        let out = solver.solve(&[low.clone()], &mut containers, &BTreeMap::new()).unwrap();
        // 最紧凑优先: low 进入小箱 S
        assert_eq!(out.placements[0].container_id, "S");

        // 先把 low 手动放入大箱, 制造冲突
        let mut containers = vec![container("S", 40.0), container("L", 60.0)];
        containers[1].placements.push(Placement {
            item_id: "low".into(),
            container_id: "L".into(),
            position: Cuboid::at(Coordinates::new(10.0, 10.0, 10.0), &low.dimensions),
            orientation: Orientation::Wdh,
        });
        let mut known = BTreeMap::new();
        known.insert("low".to_string(), low);

        let high = item("high", 60.0, 9);
        let out = solver.solve(&[high], &mut containers, &known).unwrap();
        assert_eq!(out.placements.len(), 1);
        assert_eq!(out.placements[0].container_id, "L");
        let relocations: Vec<_> = out.relocations().collect();
        assert_eq!(relocations.len(), 1);
        assert_eq!(relocations[0].item_id, "low");
        assert_eq!(relocations[0].to_container.as_deref(), Some("S"));
        for c in &containers {
            assert_invariants(c);
        }
    }

    #[test]
    fn test_never_evicts_higher_priority() {
        let solver = PlacementSolver::default();
        let mut containers = vec![container("C", 100.0)];
        let a = item("A", 50.0, 9);
        solver.solve(&[a.clone()], &mut containers, &BTreeMap::new()).unwrap();
        let mut known = BTreeMap::new();
        known.insert("A".to_string(), a);

        let b = item("B", 60.0, 5);
        let out = solver.solve(&[b], &mut containers, &known).unwrap();
        assert!(out.placements.is_empty());
        assert_eq!(out.no_fit_item_ids(), vec!["B"]);
        assert_eq!(containers[0].placements.len(), 1);
    }

    #[test]
    fn test_preferred_zone_wins_over_tightness() {
        let solver = PlacementSolver::default();
        let mut containers = vec![
            Container::new("tight", "Storage", Dimensions::new(10.0, 10.0, 10.0)),
            Container::new("roomy", "Medical", Dimensions::new(100.0, 100.0, 100.0)),
        ];
        let it = item("M", 10.0, 5).with_preferred_zone("Medical");
        let out = solver.solve(&[it], &mut containers, &BTreeMap::new()).unwrap();
        assert_eq!(out.placements[0].container_id, "roomy");
    }

    #[test]
    fn test_place_in_container_prefers_original_slot() {
        let solver = PlacementSolver::default();
        let mut c = container("C", 100.0);
        let it = item("A", 10.0, 5);
        let slot = Placement {
            item_id: "A".into(),
            container_id: "C".into(),
            position: Cuboid::at(Coordinates::new(30.0, 30.0, 30.0), &it.dimensions),
            orientation: Orientation::Wdh,
        };
        let p = solver.place_in_container(&it, &mut c, Some(&slot)).unwrap().unwrap();
        assert_eq!(p.position, slot.position);
    }

    /// L(60) 中间放着 mid(40), M(40) 中间放着 low(20), S(20) 为空
    fn chain_fixture() -> (Vec<Container>, BTreeMap<String, Item>) {
        let mid = item("mid", 40.0, 5);
        let low = item("low", 20.0, 1);
        let mut large = container("L", 60.0);
        large.placements.push(Placement {
            item_id: "mid".into(),
            container_id: "L".into(),
            position: Cuboid::at(Coordinates::new(10.0, 10.0, 10.0), &mid.dimensions),
            orientation: Orientation::Wdh,
        });
        let mut medium = container("M", 40.0);
        medium.placements.push(Placement {
            item_id: "low".into(),
            container_id: "M".into(),
            position: Cuboid::at(Coordinates::new(10.0, 10.0, 10.0), &low.dimensions),
            orientation: Orientation::Wdh,
        });
        let mut known = BTreeMap::new();
        known.insert("mid".to_string(), mid);
        known.insert("low".to_string(), low);
        (vec![large, medium, container("S", 20.0)], known)
    }

    #[test]
    fn test_relocation_chain_at_depth_two() {
        let solver = PlacementSolver::default();
        let (mut containers, known) = chain_fixture();

        let out = solver.solve(&[item("high", 60.0, 9)], &mut containers, &known).unwrap();
        assert_eq!(out.placements.len(), 1);
        assert_eq!(out.placements[0].container_id, "L");

        // 最深一层的挪位先列出
        let moves: Vec<(&str, Option<&str>, Option<&str>)> = out
            .relocations()
            .map(|r| {
                (
                    r.item_id.as_str(),
                    r.from_container.as_deref(),
                    r.to_container.as_deref(),
                )
            })
            .collect();
        assert_eq!(
            moves,
            vec![("low", Some("M"), Some("S")), ("mid", Some("L"), Some("M"))]
        );
        assert!(containers[2].contains_item("low"));
        assert!(containers[1].contains_item("mid"));
        for c in &containers {
            assert_invariants(c);
        }
    }

    #[test]
    fn test_relocation_depth_bound_stops_chain() {
        let solver = PlacementSolver::new(1);
        let (mut containers, known) = chain_fixture();
        let before = containers.clone();

        let out = solver.solve(&[item("high", 60.0, 9)], &mut containers, &known).unwrap();
        assert!(out.placements.is_empty());
        assert_eq!(out.no_fit_item_ids(), vec!["high"]);
        assert_eq!(out.relocations().count(), 0);
        for (after, before) in containers.iter().zip(&before) {
            assert_eq!(after.placements, before.placements);
        }
    }
}
