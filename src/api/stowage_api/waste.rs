use super::*;
use crate::api::dto::{ReturnPlan, UndockingReport, WasteEntry, WasteListing};
use crate::domain::action_log::ActionType;
use crate::domain::manifest::{ReturnItem, ReturnManifest, ReturnStep};
use crate::domain::types::ItemLifecycle;
use crate::engine::retrieval::RetrievalStep;
use crate::engine::waste_return::WasteCandidate;
use serde_json::json;
use tracing::warn;

impl StowageApi {
    // ==========================================
    // 废弃识别
    // ==========================================

    /// 按当前模拟时刻扫描在用物品, 新废弃物移出货箱后列出整个废弃集合
    pub fn identify_waste(&self) -> ApiResult<WasteListing> {
        let _perf = crate::perf::PerfGuard::new("identify_waste");
        let map = self.read_containers()?;
        let mut guards = Self::lock_all_containers(&map)?;
        let mut catalog = self.write_catalog()?;
        let mut waste = self.lock_waste()?;
        let clock = self.lock_clock()?;
        let now = clock.now();

        let mut next_catalog = (*catalog).clone();
        let mut working: Vec<Container> = guards.iter().map(|g| (**g).clone()).collect();
        let mut next_waste = (*waste).clone();

        let swept = clock.sweep(&mut next_catalog);
        drop(clock);

        let new_ids: Vec<String> = swept
            .expired
            .iter()
            .chain(swept.depleted.iter())
            .map(|r| r.item_id.clone())
            .collect();
        let logs = Self::retire_waste(
            &new_ids,
            &mut working,
            &next_catalog,
            &mut next_waste,
            &self.config.system_actor,
            now,
        );
        self.append_logs(&logs)?;

        *catalog = next_catalog;
        *waste = next_waste;
        for (guard, updated) in guards.iter_mut().zip(working) {
            **guard = updated;
        }

        if !swept.is_empty() {
            info!(
                expired = swept.expired.len(),
                depleted = swept.depleted.len(),
                "废弃识别: 发现新废弃物"
            );
        }

        Ok(WasteListing {
            success: true,
            waste_items: Self::list_waste(&waste, &catalog),
        })
    }

    /// 当前废弃集合 (不扫描)
    pub fn waste_items(&self) -> ApiResult<WasteListing> {
        let catalog = self.read_catalog()?;
        let waste = self.lock_waste()?;
        Ok(WasteListing {
            success: true,
            waste_items: Self::list_waste(&waste, &catalog),
        })
    }

    // ==========================================
    // 返还计划
    // ==========================================

    /// 在质量上限与返回舱剩余体积内选择返还子集
    ///
    /// 计划记录为该返回舱的待完成返还, 由 complete_undocking 落实;
    /// 未选中的物品保持 Waste
    pub fn plan_return(
        &self,
        undocking_container_id: &str,
        undocking_date: DateTime<Utc>,
        max_mass: f64,
    ) -> ApiResult<ReturnPlan> {
        let _perf = crate::perf::PerfGuard::new("plan_return");
        let map = self.read_containers()?;
        if !map.contains_key(undocking_container_id) {
            return Err(ApiError::not_found("Container", undocking_container_id));
        }
        let guards = Self::lock_all_containers(&map)?;
        let catalog = self.read_catalog()?;
        let mut waste = self.lock_waste()?;

        let volume_cap = guards
            .iter()
            .find(|c| c.container_id == undocking_container_id)
            .map(|c| c.free_volume());

        let pool: Vec<&Item> = waste
            .order
            .iter()
            .filter_map(|id| catalog.get(id))
            .filter(|i| i.lifecycle == ItemLifecycle::Waste)
            .collect();
        let candidates: Vec<WasteCandidate> = pool
            .iter()
            .map(|i| WasteCandidate {
                item_id: i.item_id.clone(),
                mass_kg: i.mass_kg,
                volume: i.volume(),
                priority: i.priority,
            })
            .collect();

        let selection = self.waste_planner.select(&candidates, max_mass, volume_cap)?;

        let mut return_plan = Vec::with_capacity(selection.selected.len());
        let mut retrieval_steps: Vec<RetrievalStep> = Vec::new();
        let mut manifest = ReturnManifest::new(undocking_container_id, undocking_date);

        for &idx in &selection.selected {
            let item = pool[idx];
            return_plan.push(ReturnStep {
                step: return_plan.len() + 1,
                item_id: item.item_id.clone(),
                item_name: item.name.clone(),
                from_container: item.container_id().map(str::to_string),
                to_container: undocking_container_id.to_string(),
            });

            // 从最后放置位置取出所需的步骤
            if let Some(last) = &item.placement {
                if let Some(source) = guards.iter().find(|c| c.container_id == last.container_id) {
                    let plan = self
                        .retrieval_planner
                        .plan_from_last_position(source, last, &catalog);
                    for mut step in plan.steps {
                        step.step = retrieval_steps.len() + 1;
                        retrieval_steps.push(step);
                    }
                }
            }

            manifest.push(ReturnItem {
                item_id: item.item_id.clone(),
                name: item.name.clone(),
                reason: item.waste_reason.map(|r| r.to_string()).unwrap_or_default(),
                mass_kg: item.mass_kg,
                volume_cm3: item.volume(),
                priority: item.priority,
            });
        }

        let selected_ids: Vec<String> = return_plan.iter().map(|s| s.item_id.clone()).collect();
        waste
            .pending_returns
            .insert(undocking_container_id.to_string(), selected_ids);

        if selection.budget_exceeded {
            warn!(
                undocking_container_id,
                max_mass,
                candidates = candidates.len(),
                "返还预算内装不下任何废弃物"
            );
        }
        info!(
            undocking_container_id,
            selected = return_plan.len(),
            total_mass = manifest.total_weight,
            total_priority = manifest.total_priority,
            exact = selection.exact,
            "返还计划已生成"
        );

        Ok(ReturnPlan {
            success: true,
            return_plan,
            retrieval_steps,
            return_manifest: manifest,
            budget_exceeded: selection.budget_exceeded,
            exact: selection.exact,
        })
    }

    /// 返回舱离站: 最近一次计划中的物品转为 Returned 并移出废弃集合
    pub fn complete_undocking(
        &self,
        undocking_container_id: &str,
        actor: &str,
        timestamp: DateTime<Utc>,
    ) -> ApiResult<UndockingReport> {
        let mut catalog = self.write_catalog()?;
        let mut waste = self.lock_waste()?;

        let planned = waste
            .pending_returns
            .get(undocking_container_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("ReturnPlan", undocking_container_id))?;

        let mut item_ids = Vec::with_capacity(planned.len());
        let mut logs = Vec::with_capacity(planned.len());
        for id in planned {
            let Some(item) = catalog.get(&id) else {
                continue;
            };
            if !item.lifecycle.can_transition_to(ItemLifecycle::Returned) {
                warn!(item_id = %id, lifecycle = %item.lifecycle, "计划内物品已不在废弃状态, 跳过");
                continue;
            }
            logs.push(
                ActionLog::new(ActionType::Disposal, actor, &id, timestamp)
                    .with_container(undocking_container_id)
                    .with_detail(&json!({
                        "reason": item.waste_reason,
                        "fromContainer": item.container_id(),
                    })),
            );
            item_ids.push(id);
        }
        self.append_logs(&logs)?;

        waste.pending_returns.remove(undocking_container_id);
        for id in &item_ids {
            if let Some(item) = catalog.get_mut(id) {
                item.lifecycle = ItemLifecycle::Returned;
            }
            waste.remove(id);
        }

        info!(undocking_container_id, items = item_ids.len(), "返回舱离站完成");
        Ok(UndockingReport {
            success: true,
            undocking_container_id: undocking_container_id.to_string(),
            items_removed: item_ids.len(),
            item_ids,
        })
    }

    // ==========================================
    // 内部实现
    // ==========================================

    /// 新废弃物: 腾出货箱位置, 加入废弃集合, 生成 waste_marked 日志
    ///
    /// 物品保留最后一次放置记录, 供返还时计算取用步骤
    pub(super) fn retire_waste(
        new_ids: &[String],
        containers: &mut [Container],
        catalog: &BTreeMap<String, Item>,
        waste: &mut WasteSet,
        actor: &str,
        timestamp: DateTime<Utc>,
    ) -> Vec<ActionLog> {
        let mut logs = Vec::with_capacity(new_ids.len());
        for id in new_ids {
            let Some(item) = catalog.get(id) else {
                continue;
            };
            let from = item.container_id().map(str::to_string);
            if let Some(cid) = &from {
                if let Some(c) = containers.iter_mut().find(|c| &c.container_id == cid) {
                    c.take_placement(id);
                }
            }
            waste.push(id);

            let mut log = ActionLog::new(ActionType::WasteMarked, actor, id, timestamp)
                .with_detail(&json!({ "reason": item.waste_reason }));
            if let Some(cid) = from {
                log = log.with_container(cid);
            }
            logs.push(log);
        }
        logs
    }

    fn list_waste(waste: &WasteSet, catalog: &BTreeMap<String, Item>) -> Vec<WasteEntry> {
        waste
            .order
            .iter()
            .filter_map(|id| catalog.get(id))
            .filter(|i| i.lifecycle == ItemLifecycle::Waste)
            .filter_map(|i| {
                Some(WasteEntry {
                    item_id: i.item_id.clone(),
                    name: i.name.clone(),
                    reason: i.waste_reason?,
                    container_id: i.container_id().map(str::to_string),
                    position: i.placement.as_ref().map(|p| p.position),
                })
            })
            .collect()
    }
}
