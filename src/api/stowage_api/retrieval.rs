use super::*;
use crate::api::dto::{RetrievalResponse, SearchResult};
use crate::domain::action_log::ActionType;
use crate::domain::types::ItemLifecycle;
use crate::engine::retrieval::{RetrievalAction, RetrievalStep};
use serde_json::json;

impl StowageApi {
    // ==========================================
    // 搜索
    // ==========================================

    /// 按ID或名称查找物品, 附带当前的取用步骤
    ///
    /// 先按ID精确匹配; 否则按名称精确匹配 (已入箱者优先, 再按ID)
    pub fn search(&self, item_id: Option<&str>, item_name: Option<&str>) -> ApiResult<SearchResult> {
        let item_id = item_id.map(str::trim).filter(|s| !s.is_empty());
        let item_name = item_name.map(str::trim).filter(|s| !s.is_empty());
        if item_id.is_none() && item_name.is_none() {
            return Err(ApiError::ValidationError("itemId 与 itemName 至少提供一个".to_string()));
        }

        let item = {
            let catalog = self.read_catalog()?;
            let by_id = item_id.and_then(|id| catalog.get(id));
            let by_name = || {
                item_name.and_then(|name| {
                    let mut matches: Vec<&Item> = catalog.values().filter(|i| i.name == name).collect();
                    matches.sort_by_key(|i| (!i.is_stowed(), i.item_id.clone()));
                    matches.into_iter().next()
                })
            };
            by_id
                .or_else(by_name)
                .cloned()
                .ok_or_else(|| ApiError::not_found("Item", item_id.or(item_name).unwrap_or_default()))?
        };

        let mut result = SearchResult {
            success: true,
            container_id: None,
            zone: None,
            position: None,
            retrieval_steps: Vec::new(),
            item,
        };
        if !result.item.is_stowed() {
            return Ok(result);
        }
        let Some(container_id) = result.item.container_id().map(str::to_string) else {
            return Ok(result);
        };

        let map = self.read_containers()?;
        let slot = map
            .get(&container_id)
            .ok_or_else(|| ApiError::not_found("Container", &container_id))?;
        let container = Self::lock_container(slot)?;
        let catalog = self.read_catalog()?;

        let plan = self
            .retrieval_planner
            .plan(&container, &result.item.item_id, &catalog)?;
        result.position = container.placement_of(&result.item.item_id).map(|p| p.position);
        result.zone = Some(container.zone.clone());
        result.container_id = Some(container_id);
        result.retrieval_steps = plan.steps;
        Ok(result)
    }

    // ==========================================
    // 取用
    // ==========================================

    /// 取用物品: 移开遮挡物 → 取出目标 → 遮挡物归位/重新放置, 并消耗一次使用
    ///
    /// - Stowed: 执行完整取用
    /// - Retrieved: 已在手中, 只记录一次使用
    /// - 其他状态: InvalidStateTransition
    pub fn retrieve(
        &self,
        item_id: &str,
        actor: &str,
        timestamp: DateTime<Utc>,
    ) -> ApiResult<RetrievalResponse> {
        let _perf = crate::perf::PerfGuard::new("retrieve");
        let snapshot = self.item(item_id)?;

        match snapshot.lifecycle {
            ItemLifecycle::Stowed => {}
            ItemLifecycle::Retrieved => return self.record_reuse(item_id, actor, timestamp),
            other => {
                return Err(ApiError::InvalidStateTransition {
                    item_id: item_id.to_string(),
                    from: other.to_string(),
                    to: ItemLifecycle::Retrieved.to_string(),
                })
            }
        }

        let container_id = snapshot
            .container_id()
            .map(str::to_string)
            .ok_or_else(|| ApiError::InternalError(format!("已入箱物品缺少放置记录: {}", item_id)))?;

        let map = self.read_containers()?;
        let slot = map
            .get(&container_id)
            .ok_or_else(|| ApiError::not_found("Container", &container_id))?;
        let mut container = Self::lock_container(slot)?;
        let mut catalog = self.write_catalog()?;

        // 加锁后复核 (期间可能被其他请求移动)
        let still_here = catalog
            .get(item_id)
            .map(|i| i.is_stowed() && i.container_id() == Some(container_id.as_str()))
            .unwrap_or(false);
        if !still_here || !container.contains_item(item_id) {
            return Err(ApiError::PlacementConflict {
                item_id: item_id.to_string(),
                container_id,
                reason: "物品位置在操作期间已变化".to_string(),
            });
        }

        // 在工作副本上执行; 日志落库后才发布
        let mut working = (*container).clone();
        let outcome = self
            .retrieval_planner
            .execute(&mut working, item_id, &catalog)?;

        let mut target = catalog
            .get(item_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Item", item_id))?;
        let remaining = target.consume_use();
        target.lifecycle = ItemLifecycle::Retrieved;
        target.placement = None;

        // 日志: 每个遮挡物一条 extraction / replacement, 目标一条 retrieval
        let logs: Vec<ActionLog> = outcome
            .steps
            .iter()
            .map(|step| step_log(step, actor, &container_id, timestamp, remaining))
            .collect();
        self.append_logs(&logs)?;

        *container = working;
        catalog.insert(item_id.to_string(), target);
        for id in &outcome.unplaced {
            if let Some(item) = catalog.get_mut(id) {
                item.lifecycle = ItemLifecycle::Unplaced;
                item.placement = None;
            }
        }
        Self::sync_placements(std::iter::once(&*container), &mut catalog);

        info!(
            item_id,
            container_id = %container_id,
            obstructions = outcome.set_aside.len(),
            unplaced = outcome.unplaced.len(),
            "取用完成"
        );

        Ok(RetrievalResponse {
            success: true,
            item_id: item_id.to_string(),
            steps: outcome.steps,
            remaining_uses: remaining,
            unplaced: outcome.unplaced,
        })
    }

    /// 已取出的物品再次使用
    fn record_reuse(
        &self,
        item_id: &str,
        actor: &str,
        timestamp: DateTime<Utc>,
    ) -> ApiResult<RetrievalResponse> {
        let mut catalog = self.write_catalog()?;
        let item = catalog
            .get_mut(item_id)
            .ok_or_else(|| ApiError::not_found("Item", item_id))?;
        if item.lifecycle != ItemLifecycle::Retrieved {
            return Err(ApiError::InvalidStateTransition {
                item_id: item_id.to_string(),
                from: item.lifecycle.to_string(),
                to: ItemLifecycle::Retrieved.to_string(),
            });
        }
        let mut next = item.clone();
        let remaining = next.consume_use();

        self.append_logs(&[ActionLog::new(ActionType::Retrieval, actor, item_id, timestamp)
            .with_detail(&json!({ "reuse": true, "remainingUses": remaining }))])?;
        *item = next;

        Ok(RetrievalResponse {
            success: true,
            item_id: item_id.to_string(),
            steps: Vec::new(),
            remaining_uses: remaining,
            unplaced: Vec::new(),
        })
    }
}

fn step_log(
    step: &RetrievalStep,
    actor: &str,
    container_id: &str,
    timestamp: DateTime<Utc>,
    remaining: Option<u32>,
) -> ActionLog {
    let (kind, detail) = match step.action {
        RetrievalAction::SetAside => (ActionType::Extraction, json!({ "from": step.position })),
        RetrievalAction::Retrieve => (
            ActionType::Retrieval,
            json!({ "from": step.position, "remainingUses": remaining }),
        ),
        RetrievalAction::PlaceBack => (
            ActionType::Replacement,
            json!({ "to": step.position, "result": "originalSlot" }),
        ),
        RetrievalAction::Relocate => (
            ActionType::Replacement,
            json!({ "to": step.position, "result": "relocated" }),
        ),
        RetrievalAction::NoFitFound => (ActionType::Replacement, json!({ "result": "noFitFound" })),
    };
    ActionLog::new(kind, actor, &step.item_id, timestamp)
        .with_container(container_id)
        .with_detail(&detail)
}
