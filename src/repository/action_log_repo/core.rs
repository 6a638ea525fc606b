use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::action_log::ActionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

const INSERT_SQL: &str = r#"
    INSERT INTO action_log (
        action_id, action_ts, actor, action_type, item_id, container_id, detail
    ) VALUES (?, ?, ?, ?, ?, ?, ?)
"#;

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的操作日志仓储 (调用方负责建表)
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 打开数据库并建表
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let mut conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;
        crate::perf::install_sqlite_tracing(&mut conn);
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// 共享连接 (供配置管理器复用)
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入操作日志
    ///
    /// # 返回
    /// - `Ok(action_id)`: 成功插入,返回action_id
    /// - `Err(...)`: 数据库错误
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            INSERT_SQL,
            params![
                log.action_id,
                format_ts(&log.action_ts),
                log.actor,
                log.action_type,
                log.item_id,
                log.container_id,
                log.detail.as_ref().map(|v| v.to_string()),
            ],
        )?;
        Ok(log.action_id.clone())
    }

    /// 批量插入操作日志 (单事务, 全部成功或全部失败)
    pub fn batch_insert(&self, logs: &[ActionLog]) -> RepositoryResult<usize> {
        if logs.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(INSERT_SQL)?;
            for log in logs {
                stmt.execute(params![
                    log.action_id,
                    format_ts(&log.action_ts),
                    log.actor,
                    log.action_type,
                    log.item_id,
                    log.container_id,
                    log.detail.as_ref().map(|v| v.to_string()),
                ])?;
            }
        }
        tx.commit()?;
        Ok(logs.len())
    }
}

/// 时间戳存储格式: RFC 3339 UTC 微秒 (定宽, 字典序即时间序)
pub(super) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
