use super::*;
use crate::api::dto::IngestReport;
use crate::domain::container::RawContainerRecord;
use crate::domain::item::RawItemRecord;
use crate::importer::{RecordValidator, RecordViolation};
use std::collections::BTreeSet;
use tracing::warn;

impl StowageApi {
    // ==========================================
    // 导入接口
    // ==========================================

    /// 导入物品记录; 单条失败不影响其余记录
    ///
    /// 重复ID (同批次或目录中已有) 按违规处理
    pub fn ingest_items(&self, records: &[RawItemRecord]) -> ApiResult<IngestReport> {
        let indexed: Vec<(usize, Result<RawItemRecord, RecordViolation>)> =
            records.iter().cloned().map(Ok).enumerate().collect();
        self.ingest_parsed_items(indexed)
    }

    /// 导入 JSON 数组形式的物品记录
    pub fn ingest_items_json(&self, json: &str) -> ApiResult<IngestReport> {
        let parsed = RecordValidator::parse_records::<RawItemRecord>(json, "item_id")?;
        self.ingest_parsed_items(parsed.into_iter().enumerate().collect())
    }

    /// 导入货箱记录
    pub fn ingest_containers(&self, records: &[RawContainerRecord]) -> ApiResult<IngestReport> {
        let indexed: Vec<(usize, Result<RawContainerRecord, RecordViolation>)> =
            records.iter().cloned().map(Ok).enumerate().collect();
        self.ingest_parsed_containers(indexed)
    }

    /// 导入 JSON 数组形式的货箱记录
    pub fn ingest_containers_json(&self, json: &str) -> ApiResult<IngestReport> {
        let parsed = RecordValidator::parse_records::<RawContainerRecord>(json, "container_id")?;
        self.ingest_parsed_containers(parsed.into_iter().enumerate().collect())
    }

    // ==========================================
    // 内部实现
    // ==========================================

    fn ingest_parsed_items(
        &self,
        records: Vec<(usize, Result<RawItemRecord, RecordViolation>)>,
    ) -> ApiResult<IngestReport> {
        let _perf = crate::perf::PerfGuard::new("ingest_items");
        let mut report = IngestReport::default();
        let mut catalog = self.write_catalog()?;
        let mut seen: BTreeSet<String> = BTreeSet::new();

        for (index, parsed) in records {
            let raw = match parsed {
                Ok(raw) => raw,
                Err(v) => {
                    report.rejected.push(v);
                    continue;
                }
            };
            match RecordValidator::validate_item(index, &raw) {
                Ok(item) => {
                    if catalog.contains_key(&item.item_id) || !seen.insert(item.item_id.clone()) {
                        report.rejected.push(duplicate(index, &item.item_id, "item_id"));
                        continue;
                    }
                    report.accepted.push(item.item_id.clone());
                    catalog.insert(item.item_id.clone(), item);
                }
                Err(violations) => report.rejected.extend(violations),
            }
        }

        if !report.rejected.is_empty() {
            warn!(rejected = report.rejected.len(), "部分物品记录未通过校验");
        }
        info!(accepted = report.accepted.len(), "物品导入完成");
        Ok(report.finish())
    }

    fn ingest_parsed_containers(
        &self,
        records: Vec<(usize, Result<RawContainerRecord, RecordViolation>)>,
    ) -> ApiResult<IngestReport> {
        let _perf = crate::perf::PerfGuard::new("ingest_containers");
        let mut report = IngestReport::default();
        let mut map = self.write_containers()?;

        for (index, parsed) in records {
            let raw = match parsed {
                Ok(raw) => raw,
                Err(v) => {
                    report.rejected.push(v);
                    continue;
                }
            };
            match RecordValidator::validate_container(index, &raw) {
                Ok(container) => {
                    if map.contains_key(&container.container_id) {
                        report
                            .rejected
                            .push(duplicate(index, &container.container_id, "container_id"));
                        continue;
                    }
                    report.accepted.push(container.container_id.clone());
                    map.insert(
                        container.container_id.clone(),
                        Arc::new(Mutex::new(container)),
                    );
                }
                Err(violations) => report.rejected.extend(violations),
            }
        }

        if !report.rejected.is_empty() {
            warn!(rejected = report.rejected.len(), "部分货箱记录未通过校验");
        }
        info!(accepted = report.accepted.len(), "货箱导入完成");
        Ok(report.finish())
    }
}

fn duplicate(index: usize, id: &str, field: &str) -> RecordViolation {
    RecordViolation {
        index,
        id: id.to_string(),
        field: field.to_string(),
        message: format!("重复ID: {}", id),
    }
}
