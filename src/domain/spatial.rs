// ==========================================
// 空间站货舱管理系统 - 空间值对象
// ==========================================
// 单位: 厘米 (cm)
// 坐标系: 货箱局部坐标, 原点位于货箱角点
// ==========================================

use crate::domain::types::Axis;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 浮点比较容差 (cm)
pub const EPSILON: f64 = 1e-9;

// ==========================================
// Dimensions - 尺寸 (宽×深×高)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub depth: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, depth: f64, height: f64) -> Self {
        Self {
            width,
            depth,
            height,
        }
    }

    pub fn volume(&self) -> f64 {
        self.width * self.depth * self.height
    }

    pub fn along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Width => self.width,
            Axis::Depth => self.depth,
            Axis::Height => self.height,
        }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.width, self.depth, self.height]
    }

    /// 三个维度均为有限正数
    pub fn is_positive(&self) -> bool {
        self.as_array().iter().all(|v| v.is_finite() && *v > 0.0)
    }

    /// 逐轴比较 (容差内)
    pub fn approx_eq(&self, other: &Dimensions) -> bool {
        Axis::ALL
            .iter()
            .all(|a| (self.along(*a) - other.along(*a)).abs() <= 1e-6)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}×{}", self.width, self.depth, self.height)
    }
}

// ==========================================
// Coordinates - 坐标点
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub width: f64,
    pub depth: f64,
    pub height: f64,
}

impl Coordinates {
    pub fn new(width: f64, depth: f64, height: f64) -> Self {
        Self {
            width,
            depth,
            height,
        }
    }

    pub fn origin() -> Self {
        Self::default()
    }

    pub fn along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Width => self.width,
            Axis::Depth => self.depth,
            Axis::Height => self.height,
        }
    }

    pub fn with(mut self, axis: Axis, value: f64) -> Self {
        match axis {
            Axis::Width => self.width = value,
            Axis::Depth => self.depth = value,
            Axis::Height => self.height = value,
        }
        self
    }

    /// 按尺寸平移得到对角点
    pub fn offset(&self, dims: &Dimensions) -> Self {
        Self {
            width: self.width + dims.width,
            depth: self.depth + dims.depth,
            height: self.height + dims.height,
        }
    }
}

// ==========================================
// Cuboid - 轴对齐包围盒
// ==========================================
// 序列化字段对齐外部接口: startCoordinates / endCoordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cuboid {
    #[serde(rename = "startCoordinates")]
    pub start: Coordinates,
    #[serde(rename = "endCoordinates")]
    pub end: Coordinates,
}

impl Cuboid {
    pub fn new(start: Coordinates, end: Coordinates) -> Self {
        Self { start, end }
    }

    /// 以 start 为锚点、按尺寸展开
    pub fn at(start: Coordinates, dims: &Dimensions) -> Self {
        Self {
            start,
            end: start.offset(dims),
        }
    }

    /// 从原点展开 (货箱自身边界)
    pub fn from_dimensions(dims: &Dimensions) -> Self {
        Self::at(Coordinates::origin(), dims)
    }

    pub fn extents(&self) -> Dimensions {
        Dimensions {
            width: self.end.width - self.start.width,
            depth: self.end.depth - self.start.depth,
            height: self.end.height - self.start.height,
        }
    }

    pub fn volume(&self) -> f64 {
        self.extents().volume()
    }

    pub fn min(&self, axis: Axis) -> f64 {
        self.start.along(axis)
    }

    pub fn max(&self, axis: Axis) -> f64 {
        self.end.along(axis)
    }

    /// 在某轴上替换区间
    pub fn with_span(&self, axis: Axis, lo: f64, hi: f64) -> Self {
        Self {
            start: self.start.with(axis, lo),
            end: self.end.with(axis, hi),
        }
    }

    /// 体积是否可忽略
    pub fn is_degenerate(&self) -> bool {
        Axis::ALL
            .iter()
            .any(|a| self.max(*a) - self.min(*a) <= EPSILON)
    }
}

impl fmt::Display for Cuboid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{},{}]-[{},{},{}]",
            self.start.width,
            self.start.depth,
            self.start.height,
            self.end.width,
            self.end.depth,
            self.end.height
        )
    }
}

// ==========================================
// Orientation - 六种轴对齐朝向
// ==========================================
// 命名: 物品原始 (W,D,H) 依次映射到货箱的 width/depth/height 轴
// 例: Dwh 表示 物品深度→货箱宽度, 物品宽度→货箱深度, 物品高度→货箱高度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Orientation {
    Wdh,
    Whd,
    Dwh,
    Dhw,
    Hwd,
    Hdw,
}

impl Orientation {
    pub const ALL: [Orientation; 6] = [
        Orientation::Wdh,
        Orientation::Whd,
        Orientation::Dwh,
        Orientation::Dhw,
        Orientation::Hwd,
        Orientation::Hdw,
    ];

    /// 施加朝向后的外形尺寸
    pub fn apply(&self, dims: &Dimensions) -> Dimensions {
        let (w, d, h) = (dims.width, dims.depth, dims.height);
        match self {
            Orientation::Wdh => Dimensions::new(w, d, h),
            Orientation::Whd => Dimensions::new(w, h, d),
            Orientation::Dwh => Dimensions::new(d, w, h),
            Orientation::Dhw => Dimensions::new(d, h, w),
            Orientation::Hwd => Dimensions::new(h, w, d),
            Orientation::Hdw => Dimensions::new(h, d, w),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Wdh => "WDH",
            Orientation::Whd => "WHD",
            Orientation::Dwh => "DWH",
            Orientation::Dhw => "DHW",
            Orientation::Hwd => "HWD",
            Orientation::Hdw => "HDW",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
