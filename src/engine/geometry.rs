// ==========================================
// 空间站货舱管理系统 - 几何内核
// ==========================================
// 职责: 轴对齐包围盒相交/包含判定、朝向枚举
// 红线: 纯函数, 无副作用; 非正尺寸一律报 GeometryError
// ==========================================

use crate::domain::spatial::{Cuboid, Dimensions, Orientation, EPSILON};
use crate::domain::types::Axis;
use thiserror::Error;

/// 几何前置条件错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("尺寸必须为有限正数: {width}×{depth}×{height}")]
    NonPositiveDimension { width: f64, depth: f64, height: f64 },

    #[error("包围盒外形 {extents} 不对应物品 {dims} 的任一朝向")]
    OrientationMismatch { dims: String, extents: String },
}

/// 校验尺寸为有限正数
pub fn validate_dimensions(dims: &Dimensions) -> Result<(), GeometryError> {
    if dims.is_positive() {
        Ok(())
    } else {
        Err(GeometryError::NonPositiveDimension {
            width: dims.width,
            depth: dims.depth,
            height: dims.height,
        })
    }
}

/// 物品在给定朝向下能否放入货箱 (只比较外形, 不考虑占用)
pub fn fits(
    box_dims: &Dimensions,
    container_dims: &Dimensions,
    orientation: Orientation,
) -> Result<bool, GeometryError> {
    validate_dimensions(box_dims)?;
    validate_dimensions(container_dims)?;

    let oriented = orientation.apply(box_dims);
    Ok(Axis::ALL
        .iter()
        .all(|a| oriented.along(*a) <= container_dims.along(*a) + EPSILON))
}

/// 两个包围盒是否共享正体积; 仅面接触不算相交
pub fn intersects(a: &Cuboid, b: &Cuboid) -> bool {
    Axis::ALL
        .iter()
        .all(|axis| a.min(*axis) < b.max(*axis) - EPSILON && b.min(*axis) < a.max(*axis) - EPSILON)
}

/// inner 是否完全落在 outer 内
pub fn contains(outer: &Cuboid, inner: &Cuboid) -> bool {
    Axis::ALL.iter().all(|axis| {
        inner.min(*axis) >= outer.min(*axis) - EPSILON
            && inner.max(*axis) <= outer.max(*axis) + EPSILON
    })
}

/// 两个包围盒的交集 (无正体积交集时返回 None)
pub fn intersection(a: &Cuboid, b: &Cuboid) -> Option<Cuboid> {
    if !intersects(a, b) {
        return None;
    }
    let mut out = *a;
    for axis in Axis::ALL {
        out = out.with_span(axis, a.min(axis).max(b.min(axis)), a.max(axis).min(b.max(axis)));
    }
    Some(out)
}

/// 枚举最多 6 种朝向; 尺寸相同的轴产生的重复外形会被去重
///
/// 返回顺序固定 (Orientation::ALL 顺序), 保证求解结果可复现
pub fn enumerate_orientations(dims: &Dimensions) -> Result<Vec<Orientation>, GeometryError> {
    validate_dimensions(dims)?;

    let mut seen: Vec<Dimensions> = Vec::with_capacity(6);
    let mut out = Vec::with_capacity(6);
    for o in Orientation::ALL {
        let oriented = o.apply(dims);
        if seen.iter().any(|s| s.approx_eq(&oriented)) {
            continue;
        }
        seen.push(oriented);
        out.push(o);
    }
    Ok(out)
}

/// 根据包围盒外形反推朝向
pub fn orientation_for_extents(
    dims: &Dimensions,
    extents: &Dimensions,
) -> Result<Orientation, GeometryError> {
    validate_dimensions(extents)?;
    enumerate_orientations(dims)?
        .into_iter()
        .find(|o| o.apply(dims).approx_eq(extents))
        .ok_or_else(|| GeometryError::OrientationMismatch {
            dims: dims.to_string(),
            extents: extents.to_string(),
        })
}
