// ==========================================
// 空间站货舱管理系统 - 货箱领域模型
// ==========================================
// 红线: 同一货箱内任意两个放置的包围盒不得重叠
// 红线: 每个放置的包围盒必须完全落在货箱边界内
// ==========================================

use crate::domain::item::Placement;
use crate::domain::spatial::{Cuboid, Dimensions};
use crate::domain::types::OpenFace;
use serde::{Deserialize, Serialize};

// ==========================================
// Container - 货箱
// ==========================================
// 货箱独占其内部放置布局; 物品侧只保留反向引用
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub container_id: String,
    pub zone: String,
    pub dimensions: Dimensions,
    pub open_face: OpenFace,
    pub placements: Vec<Placement>,
}

impl Container {
    pub fn new(
        container_id: impl Into<String>,
        zone: impl Into<String>,
        dimensions: Dimensions,
    ) -> Self {
        Self {
            container_id: container_id.into(),
            zone: zone.into(),
            dimensions,
            open_face: OpenFace::default(),
            placements: Vec::new(),
        }
    }

    pub fn with_open_face(mut self, open_face: OpenFace) -> Self {
        self.open_face = open_face;
        self
    }

    /// 货箱自身边界
    pub fn bounds(&self) -> Cuboid {
        Cuboid::from_dimensions(&self.dimensions)
    }

    pub fn volume(&self) -> f64 {
        self.dimensions.volume()
    }

    pub fn occupied_volume(&self) -> f64 {
        self.placements.iter().map(|p| p.position.volume()).sum()
    }

    pub fn free_volume(&self) -> f64 {
        (self.volume() - self.occupied_volume()).max(0.0)
    }

    pub fn placement_of(&self, item_id: &str) -> Option<&Placement> {
        self.placements.iter().find(|p| p.item_id == item_id)
    }

    pub fn contains_item(&self, item_id: &str) -> bool {
        self.placement_of(item_id).is_some()
    }

    /// 移除并返回某物品的放置
    pub fn take_placement(&mut self, item_id: &str) -> Option<Placement> {
        let idx = self.placements.iter().position(|p| p.item_id == item_id)?;
        Some(self.placements.remove(idx))
    }
}

// ==========================================
// RawContainerRecord - 货箱原始导入记录
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawContainerRecord {
    #[serde(alias = "containerId")]
    pub container_id: Option<String>,
    pub zone: Option<String>,
    #[serde(alias = "width_cm")]
    pub width: Option<f64>,
    #[serde(alias = "depth_cm")]
    pub depth: Option<f64>,
    #[serde(alias = "height_cm")]
    pub height: Option<f64>,
    #[serde(alias = "openFace")]
    pub open_face: Option<String>,
}
