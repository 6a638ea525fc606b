// ==========================================
// 空间站货舱管理系统 - 货舱管理 API
// ==========================================
// 职责: 唯一的协调服务, 持有物品目录、货箱布局、废弃集合、模拟时钟
// ==========================================
// 锁顺序 (固定, 防止死锁):
//   货箱表 → 各货箱 (按ID升序) → 物品目录 → 废弃集合 → 时钟
// 红线: 每个写操作对单个物品全有或全无, 失败时不破坏空间索引
// 红线: 每个写操作都追加操作日志; 先在工作副本上计算,
//       日志写入成功后才发布到货箱/目录/时钟
// ==========================================

mod audit;
mod ingest;
mod placement;
mod retrieval;
mod simulation;
mod waste;


use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, StowageConfig};
use crate::domain::action_log::ActionLog;
use crate::domain::container::Container;
use crate::domain::item::Item;
use crate::engine::placement_solver::PlacementSolver;
use crate::engine::retrieval::RetrievalPlanner;
use crate::engine::simulation::SimulationClock;
use crate::engine::waste_return::WasteReturnPlanner;
use crate::repository::action_log_repo::ActionLogRepository;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

type ContainerMap = BTreeMap<String, Arc<Mutex<Container>>>;

// ==========================================
// 废弃集合
// ==========================================
#[derive(Debug, Clone, Default)]
pub(crate) struct WasteSet {
    /// 进入废弃的顺序
    order: Vec<String>,
    /// 返回舱货箱ID → 最近一次返还计划选中的物品
    pending_returns: BTreeMap<String, Vec<String>>,
}

impl WasteSet {
    fn push(&mut self, item_id: &str) {
        if !self.order.iter().any(|id| id == item_id) {
            self.order.push(item_id.to_string());
        }
    }

    fn remove(&mut self, item_id: &str) {
        self.order.retain(|id| id != item_id);
        for ids in self.pending_returns.values_mut() {
            ids.retain(|id| id != item_id);
        }
    }
}

// ==========================================
// StowageApi
// ==========================================
pub struct StowageApi {
    containers: RwLock<ContainerMap>,
    catalog: RwLock<BTreeMap<String, Item>>,
    waste: Mutex<WasteSet>,
    clock: Mutex<SimulationClock>,
    action_log_repo: Arc<ActionLogRepository>,
    config: StowageConfig,
    solver: PlacementSolver,
    retrieval_planner: RetrievalPlanner,
    waste_planner: WasteReturnPlanner,
}

impl StowageApi {
    /// 以给定日志仓储与配置创建服务; 目录为空, 时钟从 start 开始
    pub fn new(
        action_log_repo: Arc<ActionLogRepository>,
        config: StowageConfig,
        start: DateTime<Utc>,
    ) -> Self {
        let config = config.normalized();
        crate::perf::set_slow_operation_threshold_ms(config.slow_operation_ms);

        let waste_planner = WasteReturnPlanner {
            mode: config.return_selection,
            enumeration_max_items: crate::engine::waste_return::DEFAULT_ENUMERATION_MAX_ITEMS,
            exact_max_items: config.knapsack_exact_max_items,
            exact_max_budget_units: config.knapsack_exact_max_budget_units,
            mass_resolution_kg: config.mass_resolution_kg,
        };

        info!(start = %start, config = ?config, "货舱管理服务已创建");

        Self {
            containers: RwLock::new(BTreeMap::new()),
            catalog: RwLock::new(BTreeMap::new()),
            waste: Mutex::new(WasteSet::default()),
            clock: Mutex::new(SimulationClock::new(start)),
            action_log_repo,
            solver: PlacementSolver::new(config.relocation_max_depth),
            retrieval_planner: RetrievalPlanner::new(PlacementSolver::new(config.relocation_max_depth)),
            waste_planner,
            config,
        }
    }

    /// 打开数据库 (建表), 从 config_kv 读取配置
    pub fn open(db_path: &str, start: DateTime<Utc>) -> ApiResult<Self> {
        let repo = ActionLogRepository::open(db_path)?;
        let config = ConfigManager::from_connection(repo.connection())
            .and_then(|mgr| mgr.load_stowage_config())
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        Ok(Self::new(Arc::new(repo), config, start))
    }

    /// 内存库 + 默认配置
    pub fn in_memory(start: DateTime<Utc>) -> ApiResult<Self> {
        Self::open(crate::db::DEFAULT_DB_PATH, start)
    }

    pub fn config(&self) -> &StowageConfig {
        &self.config
    }

    /// 模拟时钟当前时刻
    pub fn now(&self) -> ApiResult<DateTime<Utc>> {
        Ok(self.lock_clock()?.now())
    }

    /// 查询物品快照
    pub fn item(&self, item_id: &str) -> ApiResult<Item> {
        self.read_catalog()?
            .get(item_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Item", item_id))
    }

    /// 查询货箱快照
    pub fn container(&self, container_id: &str) -> ApiResult<Container> {
        let map = self.read_containers()?;
        let slot = map
            .get(container_id)
            .ok_or_else(|| ApiError::not_found("Container", container_id))?;
        let guard = Self::lock_container(slot)?;
        Ok(guard.clone())
    }

    pub fn container_ids(&self) -> ApiResult<Vec<String>> {
        Ok(self.read_containers()?.keys().cloned().collect())
    }

    // ==========================================
    // 锁辅助 (中毒锁统一映射为 LockError)
    // ==========================================

    fn read_containers(&self) -> ApiResult<RwLockReadGuard<'_, ContainerMap>> {
        self.containers
            .read()
            .map_err(|e| ApiError::LockError(format!("货箱表: {}", e)))
    }

    fn write_containers(&self) -> ApiResult<RwLockWriteGuard<'_, ContainerMap>> {
        self.containers
            .write()
            .map_err(|e| ApiError::LockError(format!("货箱表: {}", e)))
    }

    fn lock_container(slot: &Arc<Mutex<Container>>) -> ApiResult<MutexGuard<'_, Container>> {
        slot.lock()
            .map_err(|e| ApiError::LockError(format!("货箱: {}", e)))
    }

    /// 按ID升序锁住全部货箱
    fn lock_all_containers(map: &ContainerMap) -> ApiResult<Vec<MutexGuard<'_, Container>>> {
        map.values().map(Self::lock_container).collect()
    }

    fn read_catalog(&self) -> ApiResult<RwLockReadGuard<'_, BTreeMap<String, Item>>> {
        self.catalog
            .read()
            .map_err(|e| ApiError::LockError(format!("物品目录: {}", e)))
    }

    fn write_catalog(&self) -> ApiResult<RwLockWriteGuard<'_, BTreeMap<String, Item>>> {
        self.catalog
            .write()
            .map_err(|e| ApiError::LockError(format!("物品目录: {}", e)))
    }

    fn lock_waste(&self) -> ApiResult<MutexGuard<'_, WasteSet>> {
        self.waste
            .lock()
            .map_err(|e| ApiError::LockError(format!("废弃集合: {}", e)))
    }

    fn lock_clock(&self) -> ApiResult<MutexGuard<'_, SimulationClock>> {
        self.clock
            .lock()
            .map_err(|e| ApiError::LockError(format!("模拟时钟: {}", e)))
    }

    // ==========================================
    // 公共辅助
    // ==========================================

    /// 日志事务写入; 调用方在成功返回后才发布状态变更
    fn append_logs(&self, logs: &[ActionLog]) -> ApiResult<()> {
        self.action_log_repo.batch_insert(logs)?;
        Ok(())
    }

    /// 以货箱布局为准刷新物品目录中的放置记录
    fn sync_placements<'a, I>(containers: I, catalog: &mut BTreeMap<String, Item>)
    where
        I: IntoIterator<Item = &'a Container>,
    {
        for container in containers {
            for p in &container.placements {
                if let Some(item) = catalog.get_mut(&p.item_id) {
                    item.placement = Some(p.clone());
                }
            }
        }
    }
}
