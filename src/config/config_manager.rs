// ==========================================
// 空间站货舱管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::stowage_config::StowageConfig;
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::engine::waste_return::ReturnSelection;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA 并建表（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
            ensure_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值 (UPSERT)
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取并解析; 缺失或格式错误时使用默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr,
    {
        match self.get_config_value(key)? {
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(config_key = key, raw_value = %raw, "配置格式错误，使用默认值");
                    Ok(default)
                }
            },
            None => Ok(default),
        }
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 加载货舱管理配置 (缺失项取默认值)
    pub fn load_stowage_config(&self) -> Result<StowageConfig, Box<dyn Error>> {
        let d = StowageConfig::default();

        let mode_raw = self.get_config_value(config_keys::RETURN_SELECTION_MODE)?;
        let return_selection = match mode_raw.as_deref().map(ReturnSelection::parse) {
            Some(Some(mode)) => mode,
            Some(None) => {
                tracing::warn!(
                    config_key = config_keys::RETURN_SELECTION_MODE,
                    raw_value = ?mode_raw,
                    "返还模式配置无法识别，使用默认值"
                );
                d.return_selection
            }
            None => d.return_selection,
        };

        let system_actor = self
            .get_config_value(config_keys::SYSTEM_ACTOR)?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(d.system_actor.clone());

        let config = StowageConfig {
            relocation_max_depth: self
                .get_parsed_or_default(config_keys::RELOCATION_MAX_DEPTH, d.relocation_max_depth)?,
            knapsack_exact_max_items: self.get_parsed_or_default(
                config_keys::KNAPSACK_EXACT_MAX_ITEMS,
                d.knapsack_exact_max_items,
            )?,
            knapsack_exact_max_budget_units: self.get_parsed_or_default(
                config_keys::KNAPSACK_EXACT_MAX_BUDGET_UNITS,
                d.knapsack_exact_max_budget_units,
            )?,
            mass_resolution_kg: self
                .get_parsed_or_default(config_keys::MASS_RESOLUTION_KG, d.mass_resolution_kg)?,
            slow_operation_ms: self
                .get_parsed_or_default(config_keys::SLOW_OPERATION_MS, d.slow_operation_ms)?,
            return_selection,
            system_actor,
        };
        Ok(config.normalized())
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 放置求解
    pub const RELOCATION_MAX_DEPTH: &str = "relocation_max_depth";

    // 返还选择
    pub const KNAPSACK_EXACT_MAX_ITEMS: &str = "knapsack_exact_max_items";
    pub const KNAPSACK_EXACT_MAX_BUDGET_UNITS: &str = "knapsack_exact_max_budget_units";
    pub const MASS_RESOLUTION_KG: &str = "mass_resolution_kg";
    pub const RETURN_SELECTION_MODE: &str = "return_selection_mode";

    // 运行
    pub const SLOW_OPERATION_MS: &str = "slow_operation_ms";
    pub const SYSTEM_ACTOR: &str = "system_actor";
}
