// ==========================================
// 空间站货舱管理系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::engine::geometry::GeometryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("物品不在货箱中: item_id={item_id}, container_id={container_id}")]
    ItemNotInContainer {
        item_id: String,
        container_id: String,
    },

    #[error("物品主数据缺失: item_id={0}")]
    UnknownItem(String),

    #[error("返还预算非法: {field}={value}")]
    InvalidBudget { field: &'static str, value: f64 },
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
