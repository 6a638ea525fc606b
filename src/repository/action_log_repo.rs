// ==========================================
// 空间站货舱管理系统 - 操作日志数据仓储
// ==========================================
// 红线: 只追加; 不提供修改/删除接口
// ==========================================

mod core;
mod queries;


pub use self::core::ActionLogRepository;
