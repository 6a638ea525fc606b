// ==========================================
// 空间站货舱管理系统 - 导入层
// ==========================================
// 职责: 原始 JSON 记录解析 + 逐条校验
// 红线: 单条失败不中断整批
// ==========================================

pub mod error;
pub mod record_validator;

pub use error::{ImportError, RecordViolation};
pub use record_validator::{parse_expiry, RecordValidator};
