// ==========================================
// 空间站货舱管理系统 - 空闲空间表 (Guillotine Free List)
// ==========================================
// 职责: 以互不相交的轴对齐盒集合维护货箱空闲空间
// 放置时按 guillotine 方式切分, 移除时由占用重建
// ==========================================

use crate::domain::spatial::{Coordinates, Cuboid, Dimensions, EPSILON};
use crate::domain::types::{Axis, FaceSide, OpenFace};
use crate::engine::geometry::intersects;
use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub struct FreeSpaceList {
    bounds: Cuboid,
    boxes: Vec<Cuboid>,
}

impl FreeSpaceList {
    /// 空货箱: 整个边界即一个空闲盒
    pub fn new(bounds: Cuboid) -> Self {
        Self {
            bounds,
            boxes: vec![bounds],
        }
    }

    /// 由现有占用重建
    pub fn from_occupants<'a, I>(bounds: Cuboid, occupants: I) -> Self
    where
        I: IntoIterator<Item = &'a Cuboid>,
    {
        let mut list = Self::new(bounds);
        for occ in occupants {
            list.occupy(occ);
        }
        list
    }

    pub fn boxes(&self) -> &[Cuboid] {
        &self.boxes
    }

    pub fn total_volume(&self) -> f64 {
        self.boxes.iter().map(|b| b.volume()).sum()
    }

    /// 占用一块空间: 与之相交的空闲盒被切分为至多 6 块
    pub fn occupy(&mut self, placed: &Cuboid) {
        let mut next = Vec::with_capacity(self.boxes.len() + 6);
        for free in self.boxes.drain(..) {
            if intersects(&free, placed) {
                next.extend(subtract(&free, placed));
            } else {
                next.push(free);
            }
        }
        self.boxes = next;
    }

    /// 生成候选锚点 (包围盒起点), 按离开口由近到远、由低到高排序
    ///
    /// 每个空闲盒贡献两个候选: 盒的最小角点, 以及贴紧盒内靠开口一侧的位置
    pub fn anchors(&self, extents: &Dimensions, open_face: OpenFace) -> Vec<Coordinates> {
        let axis = open_face.axis;
        let ext = extents.along(axis);
        let mut out: Vec<Coordinates> = Vec::with_capacity(self.boxes.len() * 2);

        for free in &self.boxes {
            out.push(free.start);
            if open_face.side == FaceSide::Max {
                let lo = free.max(axis) - ext;
                if lo >= free.min(axis) - EPSILON {
                    out.push(free.start.with(axis, lo.max(free.min(axis))));
                }
            }
        }

        let bounds = self.bounds;
        let key = |c: &Coordinates| anchor_key(c, extents, open_face, &bounds);
        out.sort_by(|a, b| compare_keys(&key(a), &key(b)));
        out.dedup_by(|a, b| Axis::ALL.iter().all(|ax| (a.along(*ax) - b.along(*ax)).abs() <= EPSILON));
        out
    }
}

/// 从 a 中扣除 b, 返回互不相交的剩余块
fn subtract(a: &Cuboid, b: &Cuboid) -> Vec<Cuboid> {
    let mut pieces = Vec::with_capacity(6);
    let mut rest = *a;
    for axis in Axis::ALL {
        let lo = b.min(axis).max(rest.min(axis));
        let hi = b.max(axis).min(rest.max(axis));
        if lo > rest.min(axis) + EPSILON {
            pieces.push(rest.with_span(axis, rest.min(axis), lo));
        }
        if hi < rest.max(axis) - EPSILON {
            pieces.push(rest.with_span(axis, hi, rest.max(axis)));
        }
        rest = rest.with_span(axis, lo, hi);
    }
    pieces.retain(|p| !p.is_degenerate());
    pieces
}

/// 物品近开口面到开口平面的距离
pub fn distance_to_opening(position: &Cuboid, open_face: OpenFace, bounds: &Cuboid) -> f64 {
    match open_face.side {
        FaceSide::Min => position.min(open_face.axis) - bounds.min(open_face.axis),
        FaceSide::Max => bounds.max(open_face.axis) - position.max(open_face.axis),
    }
}

fn anchor_key(c: &Coordinates, extents: &Dimensions, open_face: OpenFace, bounds: &Cuboid) -> [f64; 3] {
    let placed = Cuboid::at(*c, extents);
    let [first, second] = lateral_axes(open_face.axis);
    [
        distance_to_opening(&placed, open_face, bounds),
        c.along(first),
        c.along(second),
    ]
}

/// 开口轴之外的两个轴, 高度优先 (先填底层)
fn lateral_axes(open_axis: Axis) -> [Axis; 2] {
    match open_axis {
        Axis::Width => [Axis::Height, Axis::Depth],
        Axis::Depth => [Axis::Height, Axis::Width],
        Axis::Height => [Axis::Depth, Axis::Width],
    }
}

fn compare_keys(a: &[f64; 3], b: &[f64; 3]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        if (x - y).abs() > EPSILON {
            return x.partial_cmp(y).unwrap_or(Ordering::Equal);
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(size: f64) -> Cuboid {
        Cuboid::from_dimensions(&Dimensions::new(size, size, size))
    }

    #[test]
    fn test_occupy_keeps_boxes_disjoint_and_volume_consistent() {
        let mut list = FreeSpaceList::new(bounds(100.0));
        let a = Cuboid::from_dimensions(&Dimensions::new(50.0, 50.0, 50.0));
        list.occupy(&a);
        assert!((list.total_volume() - (1_000_000.0 - 125_000.0)).abs() < 1e-6);

        let b = Cuboid::at(Coordinates::new(50.0, 0.0, 0.0), &Dimensions::new(50.0, 30.0, 20.0));
        list.occupy(&b);
        assert!((list.total_volume() - (1_000_000.0 - 125_000.0 - 30_000.0)).abs() < 1e-6);

        let boxes = list.boxes();
        for (i, x) in boxes.iter().enumerate() {
            assert!(!intersects(x, &a));
            assert!(!intersects(x, &b));
            for y in boxes.iter().skip(i + 1) {
                assert!(!intersects(x, y));
            }
        }
    }

    #[test]
    fn test_anchors_start_nearest_opening() {
        let list = FreeSpaceList::new(bounds(100.0));
        let anchors = list.anchors(&Dimensions::new(10.0, 10.0, 10.0), OpenFace::default());
        assert_eq!(anchors[0], Coordinates::origin());
    }

    #[test]
    fn test_anchors_for_max_side_opening() {
        let list = FreeSpaceList::new(bounds(100.0));
        let face = OpenFace {
            axis: Axis::Depth,
            side: FaceSide::Max,
        };
        let anchors = list.anchors(&Dimensions::new(10.0, 10.0, 10.0), face);
        assert!((anchors[0].depth - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_rebuild_from_occupants() {
        let a = Cuboid::from_dimensions(&Dimensions::new(100.0, 40.0, 100.0));
        let list = FreeSpaceList::from_occupants(bounds(100.0), [&a]);
        assert_eq!(list.boxes().len(), 1);
        assert!((list.boxes()[0].min(Axis::Depth) - 40.0).abs() < 1e-9);
    }
}
