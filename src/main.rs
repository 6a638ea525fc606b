// ==========================================
// 空间站货舱管理系统 - 场景运行入口
// ==========================================
// 用法: habitat-stowage <scenario.json>
// 场景文件: { startDate?, containers, items, days?, undocking? }
// 数据库: 环境变量 HABITAT_STOWAGE_DB 指定文件, 缺省为内存库
// ==========================================

use anyhow::Context;
use chrono::{DateTime, Utc};
use habitat_stowage::api::PlacementRequest;
use habitat_stowage::domain::{RawContainerRecord, RawItemRecord};
use habitat_stowage::{db, logging, StowageApi};
use serde::Deserialize;
use serde_json::json;

const DEFAULT_ACTOR: &str = "scenario";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Scenario {
    start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    containers: Vec<RawContainerRecord>,
    #[serde(default)]
    items: Vec<RawItemRecord>,
    #[serde(default)]
    days: u32,
    undocking: Option<Undocking>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Undocking {
    container_id: String,
    date: Option<DateTime<Utc>>,
    max_mass: f64,
}

fn main() -> anyhow::Result<()> {
    logging::init();

    let path = std::env::args()
        .nth(1)
        .context("用法: habitat-stowage <scenario.json>")?;
    let raw = std::fs::read_to_string(&path).with_context(|| format!("无法读取场景文件: {}", path))?;
    let scenario: Scenario =
        serde_json::from_str(&raw).with_context(|| format!("场景文件格式错误: {}", path))?;

    let start = scenario.start_date.unwrap_or_else(Utc::now);
    let db_path = db::db_path_from_env();
    tracing::info!(
        "{} v{} | 场景: {} | 数据库: {}",
        habitat_stowage::APP_NAME,
        habitat_stowage::VERSION,
        path,
        db_path
    );

    let api = StowageApi::open(&db_path, start)?;

    let placement = api.recommend_placement(
        &PlacementRequest {
            items: scenario.items,
            containers: scenario.containers,
        },
        DEFAULT_ACTOR,
        start,
    )?;
    let simulation = api.advance_simulation(scenario.days)?;
    let waste = api.identify_waste()?;

    let return_plan = match &scenario.undocking {
        Some(u) => {
            let date = u.date.unwrap_or(api.now()?);
            Some(api.plan_return(&u.container_id, date, u.max_mass)?)
        }
        None => None,
    };
    let audit = api.verify_invariants()?;
    if !audit.is_ok() {
        tracing::warn!(?audit, "场景结束时不变量审计未通过");
    }

    let output = json!({
        "placement": placement,
        "simulation": simulation,
        "waste": waste,
        "returnPlan": return_plan,
        "audit": audit,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
