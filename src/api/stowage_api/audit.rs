use super::*;
use crate::api::dto::{BoundsViolation, InvariantReport, LogQueryResponse, OverlapViolation};
use crate::domain::action_log::ActionLogFilter;
use crate::engine::geometry::{contains, intersects};
use std::collections::BTreeSet;
use tracing::warn;

impl StowageApi {
    // ==========================================
    // 日志查询
    // ==========================================

    /// 按时间范围/物品/操作人/操作类型过滤, 按时间戳再按写入顺序排序
    pub fn query_logs(&self, filter: &ActionLogFilter) -> ApiResult<LogQueryResponse> {
        let logs = self.action_log_repo.query(filter)?;
        Ok(LogQueryResponse {
            success: true,
            logs,
        })
    }

    // ==========================================
    // 不变量审计
    // ==========================================

    /// 检查所有货箱: 无重叠、不越界、物品索引与货箱布局一致
    pub fn verify_invariants(&self) -> ApiResult<InvariantReport> {
        let map = self.read_containers()?;
        let guards = Self::lock_all_containers(&map)?;
        let catalog = self.read_catalog()?;

        let mut report = InvariantReport {
            containers_checked: guards.len(),
            ..Default::default()
        };
        let mut indexed: BTreeSet<&str> = BTreeSet::new();

        for container in guards.iter() {
            let bounds = container.bounds();
            let placements = &container.placements;
            report.placements_checked += placements.len();

            for (i, p) in placements.iter().enumerate() {
                if !contains(&bounds, &p.position) {
                    report.out_of_bounds.push(BoundsViolation {
                        container_id: container.container_id.clone(),
                        item_id: p.item_id.clone(),
                        position: p.position,
                    });
                }
                for q in &placements[i + 1..] {
                    if intersects(&p.position, &q.position) {
                        report.overlaps.push(OverlapViolation {
                            container_id: container.container_id.clone(),
                            first: p.item_id.clone(),
                            second: q.item_id.clone(),
                        });
                    }
                }

                let consistent = catalog
                    .get(&p.item_id)
                    .map(|item| item.is_stowed() && item.placement.as_ref() == Some(p))
                    .unwrap_or(false);
                if !consistent || !indexed.insert(p.item_id.as_str()) {
                    report.index_mismatches.push(p.item_id.clone());
                }
            }
        }

        // 目录中 Stowed 却不在任何货箱里
        for item in catalog.values().filter(|i| i.is_stowed()) {
            if !indexed.contains(item.item_id.as_str()) {
                report.index_mismatches.push(item.item_id.clone());
            }
        }

        if !report.is_ok() {
            warn!(
                overlaps = report.overlaps.len(),
                out_of_bounds = report.out_of_bounds.len(),
                index_mismatches = report.index_mismatches.len(),
                "不变量审计未通过"
            );
        }
        Ok(report)
    }
}
