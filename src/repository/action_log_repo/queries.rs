use super::core::{format_ts, ActionLogRepository};
use crate::domain::action_log::{ActionLog, ActionLogFilter};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Result as SqliteResult, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT action_id, action_ts, actor, action_type, item_id, container_id, detail
    FROM action_log
"#;

impl ActionLogRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 action_id 查询单个日志
    pub fn find_by_id(&self, action_id: &str) -> RepositoryResult<Option<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!("{SELECT_COLUMNS} WHERE action_id = ?");
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![action_id], |row| self.map_row(row)) {
            Ok(log) => Ok(Some(log)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按条件查询 (条件组合为 AND), 按时间升序、同一时刻按写入顺序
    ///
    /// 时间范围为闭区间 [start, end]; start 晚于 end 时报 ValidationError
    pub fn query(&self, filter: &ActionLogFilter) -> RepositoryResult<Vec<ActionLog>> {
        if let (Some(start), Some(end)) = (filter.start, filter.end) {
            if start > end {
                return Err(RepositoryError::ValidationError(format!(
                    "时间范围非法: start={} 晚于 end={}",
                    start, end
                )));
            }
        }

        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(start) = &filter.start {
            clauses.push("action_ts >= ?");
            args.push(format_ts(start));
        }
        if let Some(end) = &filter.end {
            clauses.push("action_ts <= ?");
            args.push(format_ts(end));
        }
        if let Some(item_id) = &filter.item_id {
            clauses.push("item_id = ?");
            args.push(item_id.clone());
        }
        if let Some(actor) = &filter.actor {
            clauses.push("actor = ?");
            args.push(actor.clone());
        }
        if let Some(kind) = &filter.action_type {
            clauses.push("action_type = ?");
            args.push(kind.as_str().to_string());
        }

        let mut sql = SELECT_COLUMNS.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY action_ts ASC, seq ASC");

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params_from_iter(args.iter()), |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 统计日志总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM action_log", [], |row| row.get(0))?;
        Ok(count)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 将数据库行映射为 ActionLog 实体
    fn map_row(&self, row: &Row) -> SqliteResult<ActionLog> {
        let action_ts_str: String = row.get(1)?;
        let action_ts = DateTime::parse_from_rfc3339(&action_ts_str)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
            })?;

        // JSON 解析失败时丢弃 detail (日志只读, 不因脏数据中断查询)
        let detail_str: Option<String> = row.get(6)?;
        let detail = detail_str.and_then(|s| serde_json::from_str(&s).ok());

        Ok(ActionLog {
            action_id: row.get(0)?,
            action_ts,
            actor: row.get(2)?,
            action_type: row.get(3)?,
            item_id: row.get(4)?,
            container_id: row.get(5)?,
            detail,
        })
    }
}
