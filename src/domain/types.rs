// ==========================================
// 空间站货舱管理系统 - 领域类型定义
// ==========================================
// 职责: 生命周期状态、废弃原因、取用面方向等枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 坐标轴 (Axis)
// ==========================================
// 货箱局部坐标系: width / depth / height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Width,
    Depth,
    Height,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Width, Axis::Depth, Axis::Height];
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Width => write!(f, "width"),
            Axis::Depth => write!(f, "depth"),
            Axis::Height => write!(f, "height"),
        }
    }
}

// ==========================================
// 开口侧 (Face Side)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceSide {
    Min, // 开口位于坐标 0 处
    Max, // 开口位于该轴的最大坐标处
}

// ==========================================
// 取用面 (Open Face)
// ==========================================
// 货箱唯一的取用开口: 沿 axis 方向, 位于 side 一侧
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpenFace {
    pub axis: Axis,
    pub side: FaceSide,
}

impl Default for OpenFace {
    // 默认开口: depth = 0 的宽×高面
    fn default() -> Self {
        Self {
            axis: Axis::Depth,
            side: FaceSide::Min,
        }
    }
}

impl OpenFace {
    /// 解析形如 "depth" / "depth-", "width+", "height:max" 的描述
    ///
    /// 未写明侧别时按 Min 处理
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim().to_lowercase();
        let (axis_part, side) = if let Some(rest) = s.strip_suffix('+') {
            (rest.to_string(), FaceSide::Max)
        } else if let Some(rest) = s.strip_suffix('-') {
            (rest.to_string(), FaceSide::Min)
        } else if let Some((a, b)) = s.split_once(':') {
            let side = match b {
                "max" => FaceSide::Max,
                "min" => FaceSide::Min,
                _ => return None,
            };
            (a.to_string(), side)
        } else {
            (s.clone(), FaceSide::Min)
        };

        let axis = match axis_part.as_str() {
            "width" => Axis::Width,
            "depth" => Axis::Depth,
            "height" => Axis::Height,
            _ => return None,
        };
        Some(Self { axis, side })
    }
}

impl fmt::Display for OpenFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.side {
            FaceSide::Min => write!(f, "{}-", self.axis),
            FaceSide::Max => write!(f, "{}+", self.axis),
        }
    }
}

// ==========================================
// 物品生命周期 (Item Lifecycle)
// ==========================================
// Unplaced → Stowed → (Retrieved ⇄ Stowed)* → Waste → Returned/Jettisoned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemLifecycle {
    Unplaced,   // 未放置
    Stowed,     // 已入箱
    Retrieved,  // 已取出(使用中)
    Waste,      // 废弃待返还
    Returned,   // 已随返回舱离站
    Jettisoned, // 已抛弃
}

impl ItemLifecycle {
    /// 是否仍参与时钟推进（未进入废弃及之后的状态）
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            ItemLifecycle::Unplaced | ItemLifecycle::Stowed | ItemLifecycle::Retrieved
        )
    }

    /// 状态转换是否合法
    pub fn can_transition_to(&self, next: ItemLifecycle) -> bool {
        use ItemLifecycle::*;
        matches!(
            (self, next),
            (Unplaced, Stowed)
                | (Stowed, Stowed)
                | (Stowed, Retrieved)
                | (Retrieved, Stowed)
                | (Retrieved, Retrieved)
                | (Unplaced, Waste)
                | (Stowed, Waste)
                | (Retrieved, Waste)
                | (Waste, Returned)
                | (Waste, Jettisoned)
        )
    }
}

impl fmt::Display for ItemLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemLifecycle::Unplaced => write!(f, "UNPLACED"),
            ItemLifecycle::Stowed => write!(f, "STOWED"),
            ItemLifecycle::Retrieved => write!(f, "RETRIEVED"),
            ItemLifecycle::Waste => write!(f, "WASTE"),
            ItemLifecycle::Returned => write!(f, "RETURNED"),
            ItemLifecycle::Jettisoned => write!(f, "JETTISONED"),
        }
    }
}

// ==========================================
// 废弃原因 (Waste Reason)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WasteReason {
    #[serde(rename = "Expired")]
    Expired, // 过期
    #[serde(rename = "Out of Uses")]
    Depleted, // 使用次数耗尽
}

impl fmt::Display for WasteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WasteReason::Expired => write!(f, "Expired"),
            WasteReason::Depleted => write!(f, "Out of Uses"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_face_parse() {
        assert_eq!(OpenFace::parse("depth"), Some(OpenFace::default()));
        assert_eq!(
            OpenFace::parse("Width+"),
            Some(OpenFace {
                axis: Axis::Width,
                side: FaceSide::Max
            })
        );
        assert_eq!(
            OpenFace::parse("height:max"),
            Some(OpenFace {
                axis: Axis::Height,
                side: FaceSide::Max
            })
        );
        assert_eq!(OpenFace::parse("diagonal"), None);
    }

    #[test]
    fn test_lifecycle_transitions() {
        assert!(ItemLifecycle::Unplaced.can_transition_to(ItemLifecycle::Stowed));
        assert!(ItemLifecycle::Retrieved.can_transition_to(ItemLifecycle::Stowed));
        assert!(ItemLifecycle::Waste.can_transition_to(ItemLifecycle::Returned));
        assert!(!ItemLifecycle::Waste.can_transition_to(ItemLifecycle::Stowed));
        assert!(!ItemLifecycle::Returned.can_transition_to(ItemLifecycle::Waste));
        assert!(!ItemLifecycle::Waste.is_live());
    }

    #[test]
    fn test_waste_reason_display() {
        assert_eq!(WasteReason::Expired.to_string(), "Expired");
        assert_eq!(WasteReason::Depleted.to_string(), "Out of Uses");
    }
}
