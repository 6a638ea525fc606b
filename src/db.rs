// ==========================================
// 空间站货舱管理系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表幂等: 操作日志表 + 配置表
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 默认数据库路径 (内存库)
pub const DEFAULT_DB_PATH: &str = ":memory:";

/// 指定数据库文件的环境变量
pub const DB_PATH_ENV: &str = "HABITAT_STOWAGE_DB";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS action_log (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,
    action_id    TEXT NOT NULL UNIQUE,
    action_ts    TEXT NOT NULL,
    actor        TEXT NOT NULL,
    action_type  TEXT NOT NULL,
    item_id      TEXT NOT NULL,
    container_id TEXT,
    detail       TEXT
);
CREATE INDEX IF NOT EXISTS idx_action_log_ts ON action_log(action_ts);
CREATE INDEX IF NOT EXISTS idx_action_log_item ON action_log(item_id, action_ts);
CREATE INDEX IF NOT EXISTS idx_action_log_actor ON action_log(actor, action_ts);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id   TEXT NOT NULL DEFAULT 'global',
    key        TEXT NOT NULL,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表 (幂等)
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

/// 读取环境变量中的数据库路径, 未设置时使用内存库
pub fn db_path_from_env() -> String {
    std::env::var(DB_PATH_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_DB_PATH.to_string())
}
