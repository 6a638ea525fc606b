// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、记录构造、服务工厂、不变量检查
// ==========================================

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use habitat_stowage::api::StowageApi;
use habitat_stowage::domain::{Container, RawContainerRecord, RawItemRecord};
use habitat_stowage::engine::geometry::{contains, intersects};
use std::error::Error;
use tempfile::NamedTempFile;

/// 测试统一的模拟起始时刻
pub fn day0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
}

/// 创建临时数据库文件路径 (schema 由服务打开时创建)
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是 UTF-8")?
        .to_string();
    Ok((temp_file, db_path))
}

/// 内存库服务
pub fn memory_api() -> StowageApi {
    StowageApi::in_memory(day0()).unwrap()
}

/// 文件库服务
pub fn file_api(db_path: &str) -> StowageApi {
    StowageApi::open(db_path, day0()).unwrap()
}

// ==========================================
// 记录构造
// ==========================================

pub struct ItemBuilder {
    record: RawItemRecord,
}

impl ItemBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            record: RawItemRecord {
                item_id: Some(id.to_string()),
                name: Some(format!("Item {}", id)),
                width: Some(10.0),
                depth: Some(10.0),
                height: Some(10.0),
                mass: Some(1.0),
                priority: Some(50),
                ..Default::default()
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.record.name = Some(name.to_string());
        self
    }

    pub fn dims(mut self, w: f64, d: f64, h: f64) -> Self {
        self.record.width = Some(w);
        self.record.depth = Some(d);
        self.record.height = Some(h);
        self
    }

    pub fn cube(self, edge: f64) -> Self {
        self.dims(edge, edge, edge)
    }

    pub fn mass(mut self, mass: f64) -> Self {
        self.record.mass = Some(mass);
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.record.priority = Some(priority);
        self
    }

    pub fn expiry(mut self, expiry: &str) -> Self {
        self.record.expiry = Some(expiry.to_string());
        self
    }

    pub fn usage_limit(mut self, limit: i64) -> Self {
        self.record.usage_limit = Some(limit);
        self
    }

    pub fn zone(mut self, zone: &str) -> Self {
        self.record.preferred_zone = Some(zone.to_string());
        self
    }

    pub fn build(self) -> RawItemRecord {
        self.record
    }
}

pub fn container(id: &str, zone: &str, w: f64, d: f64, h: f64) -> RawContainerRecord {
    RawContainerRecord {
        container_id: Some(id.to_string()),
        zone: Some(zone.to_string()),
        width: Some(w),
        depth: Some(d),
        height: Some(h),
        open_face: None,
    }
}

// ==========================================
// 不变量检查
// ==========================================

/// 无重叠 + 不越界
pub fn assert_container_invariants(c: &Container) {
    let bounds = c.bounds();
    for (i, p) in c.placements.iter().enumerate() {
        assert!(
            contains(&bounds, &p.position),
            "{} 越界: {}",
            p.item_id,
            p.position
        );
        for q in &c.placements[i + 1..] {
            assert!(
                !intersects(&p.position, &q.position),
                "{} 与 {} 重叠",
                p.item_id,
                q.item_id
            );
        }
    }
}

/// 服务级审计 + 逐货箱检查
pub fn assert_all_invariants(api: &StowageApi) {
    let report = api.verify_invariants().unwrap();
    assert!(report.is_ok(), "不变量审计未通过: {:?}", report);
    for id in api.container_ids().unwrap() {
        assert_container_invariants(&api.container(&id).unwrap());
    }
}
