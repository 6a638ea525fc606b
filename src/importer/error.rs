// ==========================================
// 空间站货舱管理系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 导入模块错误类型 (整批级)
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("JSON 解析失败: {0}")]
    MalformedPayload(String),
}

/// 单条记录违规 (不中断整批)
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("记录校验失败 (第 {index} 条, id={id}, 字段 {field}): {message}")]
pub struct RecordViolation {
    pub index: usize,
    pub id: String,
    pub field: String,
    pub message: String,
}
