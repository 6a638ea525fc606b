// ==========================================
// 空间站货舱管理系统 - 性能统计
// ==========================================
// PerfGuard: 记录操作耗时 + 期间执行的 SQL 语句数
// 超过慢操作阈值时以 warn 输出
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 默认慢操作阈值（毫秒）
pub const DEFAULT_SLOW_OPERATION_MS: u64 = 200;

static PERF_SQL_ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_OPERATION_MS: AtomicU64 = AtomicU64::new(DEFAULT_SLOW_OPERATION_MS);

thread_local! {
    static PERF_DEPTH: Cell<u32> = const { Cell::new(0) };
    static SQL_COUNT: Cell<u64> = const { Cell::new(0) };
}

fn is_true(v: &str) -> bool {
    matches!(
        v.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// 设置慢操作阈值 (0 表示不告警)
pub fn set_slow_operation_threshold_ms(ms: u64) {
    SLOW_OPERATION_MS.store(ms, Ordering::Relaxed);
}

/// 安装 SQLite 语句 trace（用于 SQL 计数）
///
/// 开关：
/// - Debug 默认开启；Release 默认关闭
/// - `HABITAT_STOWAGE_PERF_SQL=1` 强制开启
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let enabled = match std::env::var("HABITAT_STOWAGE_PERF_SQL") {
        Ok(v) => is_true(&v),
        Err(_) => cfg!(debug_assertions),
    };

    PERF_SQL_ENABLED.store(enabled, Ordering::Relaxed);

    if !enabled {
        conn.trace(None);
        return;
    }
    conn.trace(Some(sql_trace_callback));
}

fn sql_trace_callback(_sql: &str) {
    if !PERF_SQL_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let active = PERF_DEPTH.with(|d| d.get() > 0);
    if !active {
        return;
    }
    SQL_COUNT.with(|c| c.set(c.get().saturating_add(1)));
}

/// 性能统计 Guard
///
/// 使用方式：
/// ```ignore
/// let _perf = habitat_stowage::perf::PerfGuard::new("recommend_placement");
/// // do work...
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    sql_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        PERF_DEPTH.with(|d| d.set(d.get().saturating_add(1)));
        let sql_start = SQL_COUNT.with(|c| c.get());
        Self {
            op,
            start: Instant::now(),
            sql_start,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        let sql_count = SQL_COUNT.with(|c| c.get()).saturating_sub(self.sql_start);
        let threshold = SLOW_OPERATION_MS.load(Ordering::Relaxed);

        if threshold > 0 && elapsed_ms >= threshold {
            tracing::warn!(
                target: "perf",
                op = self.op,
                elapsed_ms,
                sql_count,
                threshold_ms = threshold,
                "slow operation"
            );
        } else {
            tracing::debug!(target: "perf", op = self.op, elapsed_ms, sql_count, "done");
        }

        PERF_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_restores_depth() {
        {
            let _outer = PerfGuard::new("outer");
            let _inner = PerfGuard::new("inner");
            assert_eq!(PERF_DEPTH.with(|d| d.get()), 2);
        }
        assert_eq!(PERF_DEPTH.with(|d| d.get()), 0);
    }
}
