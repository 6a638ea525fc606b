// ==========================================
// 空间站货舱管理系统 - API 层
// ==========================================
// 职责: 对外业务接口 (与传输方式无关), 统一返回 success + 结构化明细
// ==========================================

pub mod dto;
pub mod error;
pub mod stowage_api;

// 重导出核心类型
pub use dto::{
    BoundsViolation, IngestReport, InvariantReport, LogQueryResponse, OverlapViolation,
    PlacementRequest, PlacementResponse, RetrievalResponse, ReturnPlan, SearchResult,
    SimulationReport, UndockingReport, WasteEntry, WasteListing,
};
pub use error::{ApiError, ApiResult};
pub use stowage_api::StowageApi;
