use super::*;
use crate::api::dto::{PlacementRequest, PlacementResponse};
use crate::domain::action_log::ActionType;
use crate::domain::item::Placement;
use crate::domain::spatial::Cuboid;
use crate::domain::types::ItemLifecycle;
use crate::engine::geometry::{contains, intersects, orientation_for_extents};
use crate::engine::placement_solver::RearrangementAction;
use serde_json::json;
use tracing::warn;

impl StowageApi {
    // ==========================================
    // 放置接口
    // ==========================================

    /// 放置推荐: 导入请求中的新物品/新货箱, 再为请求涉及的未放置物品求解并落位
    ///
    /// 请求中的物品若已在目录中则按ID引用; 请求为空时处理目录中全部未放置物品
    pub fn recommend_placement(
        &self,
        request: &PlacementRequest,
        actor: &str,
        timestamp: DateTime<Utc>,
    ) -> ApiResult<PlacementResponse> {
        let _perf = crate::perf::PerfGuard::new("recommend_placement");

        // 1) 导入新记录
        let mut rejected = Vec::new();
        let new_containers: Vec<_> = {
            let map = self.read_containers()?;
            request
                .containers
                .iter()
                .filter(|c| {
                    c.container_id
                        .as_deref()
                        .map(|id| !map.contains_key(id.trim()))
                        .unwrap_or(true)
                })
                .cloned()
                .collect()
        };
        rejected.extend(self.ingest_containers(&new_containers)?.rejected);

        let (requested_ids, new_items) = {
            let catalog = self.read_catalog()?;
            let mut ids = Vec::new();
            let mut fresh = Vec::new();
            for raw in &request.items {
                let id = raw.item_id.as_deref().map(str::trim).unwrap_or_default();
                if !id.is_empty() {
                    ids.push(id.to_string());
                }
                if id.is_empty() || !catalog.contains_key(id) {
                    fresh.push(raw.clone());
                }
            }
            (ids, fresh)
        };
        rejected.extend(self.ingest_items(&new_items)?.rejected);

        // 2) 求解
        let mut response = self.stow_items(
            if request.items.is_empty() {
                None
            } else {
                Some(requested_ids.as_slice())
            },
            actor,
            timestamp,
        )?;
        response.rejected = rejected;
        Ok(response)
    }

    /// 为未放置物品求解并落位; item_ids 为 None 时处理全部未放置物品
    pub fn stow_items(
        &self,
        item_ids: Option<&[String]>,
        actor: &str,
        timestamp: DateTime<Utc>,
    ) -> ApiResult<PlacementResponse> {
        let map = self.read_containers()?;
        let mut guards = Self::lock_all_containers(&map)?;
        let mut catalog = self.write_catalog()?;

        let pending: Vec<Item> = catalog
            .values()
            .filter(|i| i.lifecycle == ItemLifecycle::Unplaced)
            .filter(|i| item_ids.map(|ids| ids.contains(&i.item_id)).unwrap_or(true))
            .cloned()
            .collect();

        let mut working: Vec<Container> = guards.iter().map(|g| (**g).clone()).collect();
        let outcome = self
            .solver
            .solve(&pending, &mut working, &catalog)
            .map_err(|e| {
                let id = pending
                    .iter()
                    .find(|i| crate::engine::geometry::validate_dimensions(&i.dimensions).is_err())
                    .map(|i| i.item_id.clone())
                    .unwrap_or_default();
                ApiError::geometry(id, e)
            })?;

        // 日志先落库, 成功后再写回货箱 + 目录
        let mut logs = Vec::new();
        for p in &outcome.placements {
            logs.push(
                ActionLog::new(ActionType::Placement, actor, &p.item_id, timestamp)
                    .with_container(&p.container_id)
                    .with_detail(&json!({
                        "position": p.position,
                        "orientation": p.orientation,
                    })),
            );
        }
        for r in outcome.relocations() {
            let mut log = ActionLog::new(ActionType::Relocation, actor, &r.item_id, timestamp)
                .with_detail(&json!({
                    "fromContainer": r.from_container,
                    "fromPosition": r.from_position,
                    "toPosition": r.to_position,
                }));
            if let Some(to) = &r.to_container {
                log = log.with_container(to);
            }
            logs.push(log);
        }
        self.append_logs(&logs)?;

        for (guard, updated) in guards.iter_mut().zip(working) {
            **guard = updated;
        }
        for p in &outcome.placements {
            if let Some(item) = catalog.get_mut(&p.item_id) {
                item.lifecycle = ItemLifecycle::Stowed;
            }
        }
        Self::sync_placements(guards.iter().map(|g| &**g), &mut catalog);

        let no_fit = outcome
            .rearrangements
            .iter()
            .filter(|r| r.action == RearrangementAction::NoFitFound)
            .count();
        if no_fit > 0 {
            warn!(no_fit, "部分物品无可行放置, 已列入重排建议");
        }
        info!(
            placed = outcome.placements.len(),
            relocated = outcome.relocations().count(),
            no_fit,
            "放置求解完成"
        );

        Ok(PlacementResponse {
            success: true,
            placements: outcome.placements,
            rearrangements: outcome.rearrangements,
            rejected: Vec::new(),
        })
    }

    /// 人工放置: 按给定包围盒把物品放入货箱
    ///
    /// 朝向由包围盒外形反推; 越界或与其他物品重叠时报 PlacementConflict。
    /// 已在其他位置的物品先移出原位 (全有或全无)。
    pub fn place(
        &self,
        item_id: &str,
        actor: &str,
        timestamp: DateTime<Utc>,
        container_id: &str,
        position: Cuboid,
    ) -> ApiResult<Placement> {
        // 目录快照 (先释放, 遵守锁顺序)
        let snapshot = self.item(item_id)?;
        if !snapshot.lifecycle.can_transition_to(ItemLifecycle::Stowed) {
            return Err(ApiError::InvalidStateTransition {
                item_id: item_id.to_string(),
                from: snapshot.lifecycle.to_string(),
                to: ItemLifecycle::Stowed.to_string(),
            });
        }
        let orientation = orientation_for_extents(&snapshot.dimensions, &position.extents())
            .map_err(|e| ApiError::geometry(item_id, e))?;

        let map = self.read_containers()?;
        if !map.contains_key(container_id) {
            return Err(ApiError::not_found("Container", container_id));
        }
        // 目标货箱与原货箱按ID升序加锁
        let previous = snapshot
            .container_id()
            .filter(|c| *c != container_id && snapshot.is_stowed())
            .map(str::to_string);
        let mut guards: BTreeMap<&str, MutexGuard<'_, Container>> = BTreeMap::new();
        for (id, slot) in map.iter() {
            if id == container_id || previous.as_deref() == Some(id.as_str()) {
                guards.insert(id.as_str(), Self::lock_container(slot)?);
            }
        }
        let mut catalog = self.write_catalog()?;

        let item = catalog
            .get(item_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Item", item_id))?;

        let conflict = |reason: String| ApiError::PlacementConflict {
            item_id: item_id.to_string(),
            container_id: container_id.to_string(),
            reason,
        };
        if item.lifecycle != snapshot.lifecycle || item.container_id() != snapshot.container_id() {
            return Err(conflict("物品状态在操作期间已变化".to_string()));
        }

        let target = guards
            .get(container_id)
            .ok_or_else(|| ApiError::not_found("Container", container_id))?;
        if !contains(&target.bounds(), &position) {
            return Err(conflict(format!("包围盒 {} 超出货箱边界", position)));
        }
        if let Some(other) = target
            .placements
            .iter()
            .find(|p| p.item_id != item_id && intersects(&p.position, &position))
        {
            return Err(conflict(format!("与物品 {} 重叠", other.item_id)));
        }

        // 校验通过且日志落库后再修改
        let placement = Placement {
            item_id: item_id.to_string(),
            container_id: container_id.to_string(),
            position,
            orientation,
        };
        self.append_logs(&[ActionLog::new(ActionType::Placement, actor, item_id, timestamp)
            .with_container(container_id)
            .with_detail(&json!({
                "position": position,
                "orientation": orientation,
                "manual": true,
                "previousContainer": item.container_id(),
            }))])?;

        for guard in guards.values_mut() {
            guard.take_placement(item_id);
        }
        if let Some(target) = guards.get_mut(container_id) {
            target.placements.push(placement.clone());
        }
        if let Some(entry) = catalog.get_mut(item_id) {
            entry.lifecycle = ItemLifecycle::Stowed;
            entry.placement = Some(placement.clone());
        }

        info!(item_id, container_id, %position, "人工放置完成");
        Ok(placement)
    }
}
