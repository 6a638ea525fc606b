// ==========================================
// 空间站货舱管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、值对象、类型
// 红线: 不含数据访问逻辑, 不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod container;
pub mod item;
pub mod manifest;
pub mod spatial;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionLogFilter, ActionType};
pub use container::{Container, RawContainerRecord};
pub use item::{Item, Placement, RawItemRecord};
pub use manifest::{ReturnItem, ReturnManifest, ReturnStep};
pub use spatial::{Coordinates, Cuboid, Dimensions, Orientation, EPSILON};
pub use types::{Axis, FaceSide, ItemLifecycle, OpenFace, WasteReason};
