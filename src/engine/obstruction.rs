// ==========================================
// 空间站货舱管理系统 - 遮挡模型
// ==========================================
// 职责: 计算目标物品与货箱开口之间的遮挡物
// 判定: 占用盒与 "目标近开口面 → 开口" 的扫掠区域有正体积交集即为遮挡
// 排序: 离开口最近者在前 (必须先移走), 同距离按物品ID
// ==========================================

use crate::domain::container::Container;
use crate::domain::item::Placement;
use crate::domain::spatial::{Cuboid, EPSILON};
use crate::domain::types::FaceSide;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::free_space::distance_to_opening;
use crate::engine::geometry::intersects;
use std::cmp::Ordering;
use std::collections::{BTreeSet, VecDeque};

pub struct ObstructionModel;

impl ObstructionModel {
    /// 目标盒到开口的扫掠区域; 目标已贴开口时返回 None
    pub fn swept_region(container: &Container, target: &Cuboid) -> Option<Cuboid> {
        let bounds = container.bounds();
        let axis = container.open_face.axis;
        let (lo, hi) = match container.open_face.side {
            FaceSide::Min => (bounds.min(axis), target.min(axis)),
            FaceSide::Max => (target.max(axis), bounds.max(axis)),
        };
        if hi - lo <= EPSILON {
            return None;
        }
        Some(target.with_span(axis, lo, hi))
    }

    /// 直接遮挡目标的物品 (不含目标自身), 离开口最近者在前
    pub fn obstructions<'a>(
        container: &'a Container,
        target_id: &str,
        target: &Cuboid,
    ) -> Vec<&'a Placement> {
        let Some(region) = Self::swept_region(container, target) else {
            return Vec::new();
        };

        let mut blockers: Vec<&Placement> = container
            .placements
            .iter()
            .filter(|p| p.item_id != target_id)
            .filter(|p| intersects(&p.position, &region))
            .collect();
        Self::sort_nearest_first(container, &mut blockers);
        blockers
    }

    /// 取出目标需要移走的全部物品: 直接遮挡物及其遮挡物 (传递闭包)
    ///
    /// 遮挡物的近开口面一定比被遮挡物更靠近开口, 按距离排序即为合法的移出顺序
    pub fn removal_order<'a>(
        container: &'a Container,
        target_id: &str,
        target: &Cuboid,
    ) -> Vec<&'a Placement> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<(String, Cuboid)> = VecDeque::new();
        let mut out: Vec<&Placement> = Vec::new();
        queue.push_back((target_id.to_string(), *target));

        while let Some((id, position)) = queue.pop_front() {
            for blocker in Self::obstructions(container, &id, &position) {
                if blocker.item_id == target_id || !seen.insert(blocker.item_id.as_str()) {
                    continue;
                }
                queue.push_back((blocker.item_id.clone(), blocker.position));
                out.push(blocker);
            }
        }

        Self::sort_nearest_first(container, &mut out);
        out
    }

    /// 按货箱内放置查找目标并计算移出顺序
    pub fn removal_order_for<'a>(
        container: &'a Container,
        target_id: &str,
    ) -> EngineResult<Vec<&'a Placement>> {
        let target = container
            .placement_of(target_id)
            .ok_or_else(|| EngineError::ItemNotInContainer {
                item_id: target_id.to_string(),
                container_id: container.container_id.clone(),
            })?;
        Ok(Self::removal_order(container, target_id, &target.position))
    }

    fn sort_nearest_first(container: &Container, placements: &mut [&Placement]) {
        let bounds = container.bounds();
        let face = container.open_face;
        placements.sort_by(|a, b| {
            let da = distance_to_opening(&a.position, face, &bounds);
            let db = distance_to_opening(&b.position, face, &bounds);
            da.partial_cmp(&db)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::spatial::{Coordinates, Dimensions, Orientation};
    use crate::domain::types::{Axis, OpenFace};

    fn put(c: &mut Container, id: &str, at: (f64, f64, f64), size: (f64, f64, f64)) {
        c.placements.push(Placement {
            item_id: id.to_string(),
            container_id: c.container_id.clone(),
            position: Cuboid::at(
                Coordinates::new(at.0, at.1, at.2),
                &Dimensions::new(size.0, size.1, size.2),
            ),
            orientation: Orientation::Wdh,
        });
    }

    fn shelf() -> Container {
        // 开口在 depth = 0
        Container::new("C1", "Lab", Dimensions::new(100.0, 90.0, 100.0))
    }

    #[test]
    fn test_front_item_has_no_obstructions() {
        let mut c = shelf();
        put(&mut c, "front", (0.0, 0.0, 0.0), (30.0, 30.0, 30.0));
        let order = ObstructionModel::removal_order_for(&c, "front").unwrap();
        assert!(order.is_empty());
    }

    #[test]
    fn test_column_is_ordered_nearest_opening_first() {
        let mut c = shelf();
        put(&mut c, "target", (0.0, 60.0, 0.0), (30.0, 30.0, 30.0));
        put(&mut c, "middle", (0.0, 30.0, 0.0), (30.0, 30.0, 30.0));
        put(&mut c, "front", (10.0, 0.0, 10.0), (10.0, 30.0, 10.0));
        put(&mut c, "beside", (40.0, 0.0, 0.0), (30.0, 30.0, 30.0));

        let target = c.placement_of("target").unwrap().position;
        let direct: Vec<_> = ObstructionModel::obstructions(&c, "target", &target)
            .iter()
            .map(|p| p.item_id.as_str())
            .collect();
        assert_eq!(direct, vec!["front", "middle"]);
    }

    #[test]
    fn test_transitive_blockers_included() {
        let mut c = shelf();
        put(&mut c, "target", (0.0, 60.0, 0.0), (20.0, 30.0, 20.0));
        // middle 比目标更宽, 挡住目标
        put(&mut c, "middle", (0.0, 30.0, 0.0), (50.0, 30.0, 20.0));
        // front 只挡 middle, 不在目标扫掠区域内
        put(&mut c, "front", (30.0, 0.0, 0.0), (20.0, 30.0, 20.0));

        let target = c.placement_of("target").unwrap().position;
        assert_eq!(ObstructionModel::obstructions(&c, "target", &target).len(), 1);

        let order: Vec<_> = ObstructionModel::removal_order_for(&c, "target")
            .unwrap()
            .iter()
            .map(|p| p.item_id.as_str())
            .collect();
        assert_eq!(order, vec!["front", "middle"]);
    }

    #[test]
    fn test_max_side_opening() {
        let mut c = shelf().with_open_face(OpenFace {
            axis: Axis::Height,
            side: FaceSide::Max,
        });
        put(&mut c, "bottom", (0.0, 0.0, 0.0), (50.0, 50.0, 50.0));
        put(&mut c, "top", (0.0, 0.0, 50.0), (50.0, 50.0, 50.0));
        let bottom = c.placement_of("bottom").unwrap().position;
        let direct = ObstructionModel::obstructions(&c, "bottom", &bottom);
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].item_id, "top");
        assert!(ObstructionModel::removal_order_for(&c, "top").unwrap().is_empty());
    }

    #[test]
    fn test_missing_target_is_error() {
        let c = shelf();
        assert!(matches!(
            ObstructionModel::removal_order_for(&c, "ghost"),
            Err(EngineError::ItemNotInContainer { .. })
        ));
    }
}
