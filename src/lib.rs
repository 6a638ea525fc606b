// ==========================================
// 空间站货舱管理系统 - 核心库
// ==========================================
// 职责: 物品放置 / 取用 / 废弃物返还 / 模拟时钟
// 技术栈: Rust + SQLite (操作日志 / 配置)
// 系统定位: 决策支持系统 (宇航员最终控制权)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 操作日志
pub mod repository;

// 引擎层 - 放置/取用/返还/时钟
pub mod engine;

// 导入层 - 原始记录校验
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 性能埋点
pub mod perf;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Axis, FaceSide, ItemLifecycle, OpenFace, WasteReason};

// 领域实体
pub use domain::{
    ActionLog, ActionLogFilter, ActionType, Container, Coordinates, Cuboid, Dimensions, Item,
    Placement, ReturnManifest,
};

// 引擎
pub use engine::{
    PlacementSolver, RetrievalPlanner, ReturnSelection, SimulationClock, WasteReturnPlanner,
};

// API
pub use api::{ApiError, ApiResult, StowageApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "空间站货舱管理系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
