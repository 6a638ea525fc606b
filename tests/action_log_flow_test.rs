// ==========================================
// 操作日志集成测试
// ==========================================
// 职责: 验证日志查询过滤、排序与文件库持久化
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod action_log_flow_test {
    use crate::test_helpers::*;
    use chrono::Duration;
    use habitat_stowage::domain::{ActionLogFilter, ActionType};
    use habitat_stowage::repository::ActionLogRepository;

    // ==========================================
    // 测试1: 按时间范围 / 操作人 / 类型组合过滤
    // ==========================================

    #[test]
    fn test_query_logs_combined_filters() {
        let api = memory_api();
        api.ingest_containers(&[container("C1", "Lab", 50.0, 50.0, 50.0)])
            .unwrap();
        api.ingest_items(&[
            ItemBuilder::new("A").build(),
            ItemBuilder::new("B").build(),
        ])
        .unwrap();

        let t1 = day0() + Duration::hours(1);
        let t2 = day0() + Duration::hours(5);
        api.stow_items(Some(&["A".to_string()][..]), "astro-1", t1).unwrap();
        api.stow_items(Some(&["B".to_string()][..]), "astro-2", t2).unwrap();
        api.retrieve("A", "astro-2", t2).unwrap();

        let all = api.query_logs(&ActionLogFilter::default()).unwrap().logs;
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].action_ts <= w[1].action_ts));

        let early = api
            .query_logs(&ActionLogFilter::default().with_range(day0(), t1))
            .unwrap()
            .logs;
        assert_eq!(early.len(), 1);
        assert_eq!(early[0].item_id, "A");

        let astro2_placements = api
            .query_logs(
                &ActionLogFilter::default()
                    .with_actor("astro-2")
                    .with_action_type(ActionType::Placement),
            )
            .unwrap()
            .logs;
        assert_eq!(astro2_placements.len(), 1);
        assert_eq!(astro2_placements[0].item_id, "B");

        let for_a = api.query_logs(&ActionLogFilter::for_item("A")).unwrap().logs;
        let kinds: Vec<ActionType> = for_a.iter().filter_map(|l| l.kind()).collect();
        assert_eq!(kinds, vec![ActionType::Placement, ActionType::Retrieval]);
    }

    // ==========================================
    // 测试2: 文件库重开后日志仍在
    // ==========================================

    #[test]
    fn test_logs_persist_in_file_database() {
        let (_tmp, db_path) = create_test_db().unwrap();
        {
            let api = file_api(&db_path);
            api.ingest_containers(&[container("C1", "Lab", 50.0, 50.0, 50.0)])
                .unwrap();
            api.ingest_items(&[ItemBuilder::new("A").build()]).unwrap();
            api.stow_items(None, "astro-1", day0()).unwrap();
        }

        let repo = ActionLogRepository::open(&db_path).unwrap();
        assert_eq!(repo.count().unwrap(), 1);
        let logs = repo.query(&ActionLogFilter::for_item("A")).unwrap();
        assert_eq!(logs[0].actor, "astro-1");
        assert_eq!(logs[0].action_ts, day0());
        assert_eq!(logs[0].container_id.as_deref(), Some("C1"));
        assert!(logs[0].detail.as_ref().and_then(|d| d.get("position")).is_some());
    }
}
