// ==========================================
// 空间站货舱管理系统 - 引擎层
// ==========================================
// 职责: 几何、放置、遮挡、取用、返还、时钟等规则引擎
// 红线: 引擎不访问数据库, 不持有锁; 输入输出均为领域对象
// ==========================================

pub mod error;
pub mod free_space;
pub mod geometry;
pub mod obstruction;
pub mod placement_solver;
pub mod retrieval;
pub mod simulation;
pub mod waste_return;

// 重导出核心引擎
pub use error::{EngineError, EngineResult};
pub use free_space::FreeSpaceList;
pub use geometry::GeometryError;
pub use obstruction::ObstructionModel;
pub use placement_solver::{
    PlacementSolver, Rearrangement, RearrangementAction, SolverOutcome, MAX_RELOCATION_DEPTH,
};
pub use retrieval::{
    HoldingArea, RetrievalAction, RetrievalOutcome, RetrievalPlan, RetrievalPlanner,
    RetrievalStep,
};
pub use simulation::{DaySummary, ItemRef, ItemUsage, SimulationClock, SweepResult};
pub use waste_return::{ReturnSelection, SelectionResult, WasteCandidate, WasteReturnPlanner};
