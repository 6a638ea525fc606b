// ==========================================
// 空间站货舱管理系统 - API层错误类型
// ==========================================
// 职责: 定义调用方可见的错误分类, 转换下层错误
// 说明: NoFitFound / BudgetExceeded 属于结果数据, 不在此列
// ==========================================

use crate::engine::error::EngineError;
use crate::engine::geometry::GeometryError;
use crate::importer::error::{ImportError, RecordViolation};
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
/// 所有错误信息必须包含出错对象的标识
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入错误
    // ==========================================
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("几何前置条件违反 (id={id}): {source}")]
    GeometryError {
        id: String,
        #[source]
        source: GeometryError,
    },

    #[error("资源未找到: {entity}(id={id})")]
    NotFound { entity: &'static str, id: String },

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("放置冲突: item_id={item_id}, container_id={container_id}: {reason}")]
    PlacementConflict {
        item_id: String,
        container_id: String,
        reason: String,
    },

    #[error("无效的状态转换: item_id={item_id}, from={from} to={to}")]
    InvalidStateTransition {
        item_id: String,
        from: String,
        to: String,
    },

    // ==========================================
    // 并发/数据访问错误
    // ==========================================
    #[error("锁获取失败: {0}")]
    LockError(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        ApiError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn geometry(id: impl Into<String>, source: GeometryError) -> Self {
        ApiError::GeometryError {
            id: id.into(),
            source,
        }
    }

    /// 调用方是否可以原样重试
    ///
    /// - 可重试: 锁竞争、数据库忙、放置冲突 (换位置/稍后再试)
    /// - 不可重试: 输入错误、资源不存在、非法状态转换
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::LockError(_) | ApiError::PlacementConflict { .. } => true,
            ApiError::DatabaseError(msg) => {
                let m = msg.to_ascii_lowercase();
                m.contains("busy") || m.contains("locked")
            }
            _ => false,
        }
    }
}

// ==========================================
// 从下层错误转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { id, .. } => ApiError::NotFound {
                entity: "ActionLog",
                id,
            },
            RepositoryError::LockError(msg) => ApiError::LockError(msg),
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DatabaseError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Geometry(source) => ApiError::GeometryError {
                id: String::new(),
                source,
            },
            EngineError::ItemNotInContainer {
                item_id,
                container_id,
            } => ApiError::InternalError(format!(
                "物品索引与货箱布局不一致: item_id={}, container_id={}",
                item_id, container_id
            )),
            EngineError::UnknownItem(id) => ApiError::not_found("Item", id),
            EngineError::InvalidBudget { field, value } => {
                ApiError::ValidationError(format!("{}={} 必须为非负有限数", field, value))
            }
        }
    }
}

impl From<GeometryError> for ApiError {
    fn from(source: GeometryError) -> Self {
        ApiError::GeometryError {
            id: String::new(),
            source,
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl From<RecordViolation> for ApiError {
    fn from(v: RecordViolation) -> Self {
        ApiError::ValidationError(v.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ApiError::LockError("poisoned".into()).is_retryable());
        assert!(ApiError::DatabaseError("database is locked".into()).is_retryable());
        assert!(!ApiError::DatabaseError("no such table".into()).is_retryable());
        assert!(!ApiError::not_found("Item", "X").is_retryable());
        assert!(!ApiError::ValidationError("bad".into()).is_retryable());
    }

    #[test]
    fn test_engine_error_conversion() {
        let e: ApiError = EngineError::UnknownItem("X1".into()).into();
        assert!(matches!(e, ApiError::NotFound { entity: "Item", ref id } if id == "X1"));

        let g = GeometryError::NonPositiveDimension {
            width: 0.0,
            depth: 1.0,
            height: 1.0,
        };
        let e: ApiError = EngineError::Geometry(g.clone()).into();
        assert!(matches!(e, ApiError::GeometryError { source, .. } if source == g));
    }

    #[test]
    fn test_repository_error_conversion() {
        let e: ApiError = RepositoryError::LockError("x".into()).into();
        assert!(matches!(e, ApiError::LockError(_)));
        assert!(e.to_string().contains("锁获取失败"));
    }
}
