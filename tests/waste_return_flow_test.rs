// ==========================================
// 废弃物与返还流程集成测试
// ==========================================
// 职责: 验证废弃识别、时钟判定顺序、返还选择最优性
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod waste_return_flow_test {
    use crate::test_helpers::*;
    use chrono::Duration;
    use habitat_stowage::config::{config_keys, ConfigManager};
    use habitat_stowage::domain::{
        ActionLogFilter, ActionType, Coordinates, Cuboid, ItemLifecycle, WasteReason,
    };
    use habitat_stowage::engine::{RetrievalAction, WasteCandidate, WasteReturnPlanner};
    use habitat_stowage::ReturnSelection;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    /// 线性同余序列, 生成可复现的测试数据
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, bound: u64) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.0 >> 33) % bound
        }
    }

    fn brute_force_best(candidates: &[WasteCandidate], max_mass: f64) -> u64 {
        let n = candidates.len();
        let mut best = 0;
        for mask in 0u32..(1 << n) {
            let mut mass = 0.0;
            let mut priority = 0u64;
            for (i, c) in candidates.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    mass += c.mass_kg;
                    priority += u64::from(c.priority);
                }
            }
            if mass <= max_mass + 1e-9 {
                best = best.max(priority);
            }
        }
        best
    }

    // ==========================================
    // 测试1: 小规模废弃集合的选择与暴力枚举一致
    // ==========================================

    #[test]
    fn test_knapsack_matches_brute_force() {
        let planner = WasteReturnPlanner::default();
        let mut rng = Lcg(42);

        for round in 0..30 {
            let n = 1 + (round % 14) as usize;
            let candidates: Vec<WasteCandidate> = (0..n)
                .map(|i| WasteCandidate {
                    item_id: format!("W{}", i),
                    // 任意小数质量 (0.001kg 精度)
                    mass_kg: (1 + rng.next(20_000)) as f64 * 0.001,
                    volume: 1000.0,
                    priority: rng.next(100) as u32,
                })
                .collect();
            let max_mass = rng.next(60_000) as f64 * 0.001;

            let result = planner.select(&candidates, max_mass, None).unwrap();
            let best = brute_force_best(&candidates, max_mass);

            assert!(result.exact, "round {}", round);
            assert!(result.total_mass <= max_mass + 1e-9, "round {}", round);
            assert_eq!(result.total_priority, best, "round {}", round);
        }
    }

    // ==========================================
    // 测试1b: 预算超过 1000kg 时小规模仍为最优解
    // ==========================================

    #[test]
    fn test_knapsack_exact_with_large_budget() {
        let planner = WasteReturnPlanner::default();
        let mut rng = Lcg(7);
        for round in 0..10 {
            let candidates: Vec<WasteCandidate> = (0..10)
                .map(|i| WasteCandidate {
                    item_id: format!("H{}", i),
                    mass_kg: 100.0 + rng.next(900_000) as f64 * 0.001,
                    volume: 1000.0,
                    priority: 1 + rng.next(100) as u32,
                })
                .collect();
            let max_mass = 1500.0 + rng.next(2000) as f64;

            let result = planner.select(&candidates, max_mass, None).unwrap();
            assert!(result.exact, "round {}", round);
            assert!(result.total_mass <= max_mass + 1e-9, "round {}", round);
            assert_eq!(
                result.total_priority,
                brute_force_best(&candidates, max_mass),
                "round {}",
                round
            );
        }
    }

    // ==========================================
    // 测试2: 同一天既到期又耗尽, 记为 Expired
    // ==========================================

    #[test]
    fn test_expiry_beats_depletion_on_same_day() {
        let api = memory_api();
        api.ingest_containers(&[container("C1", "Medical", 30.0, 30.0, 30.0)])
            .unwrap();
        api.ingest_items(&[ItemBuilder::new("X")
            .usage_limit(1)
            .expiry("2025-03-02")
            .build()])
            .unwrap();
        api.stow_items(None, "astro-1", day0()).unwrap();
        // 用掉唯一一次
        api.retrieve("X", "astro-1", day0()).unwrap();

        let report = api.advance_simulation(1).unwrap();
        assert_eq!(report.expired_ids(), vec!["X"]);
        assert!(report.depleted_ids().is_empty());
        assert_eq!(
            api.item("X").unwrap().waste_reason,
            Some(WasteReason::Expired)
        );
    }

    // ==========================================
    // 测试3: 导入时已过期, 不推进时钟即可识别
    // ==========================================

    #[test]
    fn test_identify_waste_without_tick() {
        let api = memory_api();
        api.ingest_containers(&[container("C1", "Medical", 30.0, 30.0, 30.0)])
            .unwrap();
        api.ingest_items(&[
            ItemBuilder::new("D").expiry("2024-12-31T00:00:00Z").build(),
            ItemBuilder::new("E").expiry("2026-01-01").build(),
        ])
        .unwrap();
        api.stow_items(None, "astro-1", day0()).unwrap();

        let listing = api.identify_waste().unwrap();
        assert_eq!(listing.waste_items.len(), 1);
        assert_eq!(listing.waste_items[0].item_id, "D");
        assert_eq!(listing.waste_items[0].reason, WasteReason::Expired);
        assert_eq!(api.item("E").unwrap().lifecycle, ItemLifecycle::Stowed);
        assert_eq!(api.now().unwrap(), day0());

        let marked = api
            .query_logs(&ActionLogFilter::default().with_action_type(ActionType::WasteMarked))
            .unwrap()
            .logs;
        assert_eq!(marked.len(), 1);
        assert_eq!(marked[0].item_id, "D");
        assert_all_invariants(&api);
    }

    // ==========================================
    // 测试4: 返还计划包含从最后位置取出的步骤
    // ==========================================

    #[test]
    fn test_return_plan_includes_retrieval_steps() {
        let api = memory_api();
        api.ingest_containers(&[
            container("C1", "Storage", 10.0, 20.0, 10.0),
            container("U1", "Airlock", 50.0, 50.0, 50.0),
        ])
        .unwrap();
        api.ingest_items(&[
            ItemBuilder::new("W").expiry("2025-01-01").mass(3.0).build(),
            ItemBuilder::new("B").mass(1.0).build(),
        ])
        .unwrap();
        let back = Cuboid::new(
            Coordinates::new(0.0, 10.0, 0.0),
            Coordinates::new(10.0, 20.0, 10.0),
        );
        let front = Cuboid::new(
            Coordinates::new(0.0, 0.0, 0.0),
            Coordinates::new(10.0, 10.0, 10.0),
        );
        api.place("W", "astro-1", day0(), "C1", back).unwrap();
        api.place("B", "astro-1", day0(), "C1", front).unwrap();
        api.identify_waste().unwrap();

        let plan = api
            .plan_return("U1", day0() + Duration::days(3), 100.0)
            .unwrap();
        assert_eq!(plan.return_plan.len(), 1);
        assert_eq!(plan.return_plan[0].from_container.as_deref(), Some("C1"));
        assert_eq!(plan.return_plan[0].to_container, "U1");

        let steps: Vec<(RetrievalAction, &str)> = plan
            .retrieval_steps
            .iter()
            .map(|s| (s.action, s.item_id.as_str()))
            .collect();
        assert_eq!(
            steps,
            vec![
                (RetrievalAction::SetAside, "B"),
                (RetrievalAction::Retrieve, "W"),
                (RetrievalAction::PlaceBack, "B"),
            ]
        );
        assert_eq!(plan.return_manifest.return_items[0].reason, "Expired");
        assert!((plan.return_manifest.total_weight - 3.0).abs() < 1e-9);
    }

    // ==========================================
    // 测试4b: 废弃物腾出的位置被新物品占用时, 取出步骤带提示
    // ==========================================

    #[test]
    fn test_return_steps_flag_reused_slot() {
        let api = memory_api();
        api.ingest_containers(&[
            container("C1", "Storage", 10.0, 20.0, 10.0),
            container("U1", "Airlock", 50.0, 50.0, 50.0),
        ])
        .unwrap();
        api.ingest_items(&[
            ItemBuilder::new("W").expiry("2025-01-01").build(),
            ItemBuilder::new("N").build(),
        ])
        .unwrap();
        let back = Cuboid::new(
            Coordinates::new(0.0, 10.0, 0.0),
            Coordinates::new(10.0, 20.0, 10.0),
        );
        api.place("W", "astro-1", day0(), "C1", back).unwrap();
        api.identify_waste().unwrap();
        api.place("N", "astro-1", day0(), "C1", back).unwrap();

        let plan = api.plan_return("U1", day0(), 100.0).unwrap();
        let retrieve = plan
            .retrieval_steps
            .iter()
            .find(|s| s.action == RetrievalAction::Retrieve)
            .unwrap();
        assert_eq!(retrieve.item_id, "W");
        assert!(retrieve.note.as_deref().unwrap_or_default().contains("N 占用"));
        assert_all_invariants(&api);
    }

    // ==========================================
    // 测试5: 返回舱剩余体积约束选择
    // ==========================================

    #[test]
    fn test_return_respects_undocking_free_volume() {
        let api = memory_api();
        api.ingest_containers(&[container("U1", "Airlock", 10.0, 10.0, 10.0)])
            .unwrap();
        api.ingest_items(&[
            ItemBuilder::new("LOW").priority(10).expiry("2025-01-01").build(),
            ItemBuilder::new("HIGH").priority(80).expiry("2025-01-01").build(),
        ])
        .unwrap();
        api.identify_waste().unwrap();

        let plan = api.plan_return("U1", day0(), 100.0).unwrap();
        let ids: Vec<&str> = plan.return_plan.iter().map(|s| s.item_id.as_str()).collect();
        assert_eq!(ids, vec!["HIGH"]);
        assert!(plan.return_manifest.total_volume <= 1000.0 + 1e-9);
    }

    // ==========================================
    // 测试6: 配置为 FIFO 时按进入废弃的顺序装载
    // ==========================================

    #[test]
    fn test_fifo_mode_from_config() {
        let (_tmp, db_path) = create_test_db().unwrap();
        ConfigManager::new(&db_path)
            .unwrap()
            .set_config_value(config_keys::RETURN_SELECTION_MODE, "fifo")
            .unwrap();

        let api = file_api(&db_path);
        assert_eq!(api.config().return_selection, ReturnSelection::Fifo);

        api.ingest_containers(&[container("U1", "Airlock", 50.0, 50.0, 50.0)])
            .unwrap();
        api.ingest_items(&[
            ItemBuilder::new("A1").mass(6.0).priority(1).expiry("2025-01-01").build(),
            ItemBuilder::new("A2").mass(5.0).priority(50).expiry("2025-01-01").build(),
            ItemBuilder::new("A3").mass(5.0).priority(50).expiry("2025-01-01").build(),
        ])
        .unwrap();
        api.identify_waste().unwrap();

        // 优先级背包会选 A2+A3; FIFO 装入 A1 后 A2 装不下即停止
        let plan = api.plan_return("U1", day0(), 10.0).unwrap();
        let ids: Vec<&str> = plan.return_plan.iter().map(|s| s.item_id.as_str()).collect();
        assert_eq!(ids, vec!["A1"]);
    }

    // ==========================================
    // 测试7: 离站后物品转为 Returned, 未选中者留在废弃集合
    // ==========================================

    #[test]
    fn test_undocking_completes_plan() {
        let api = memory_api();
        api.ingest_containers(&[container("U1", "Airlock", 50.0, 50.0, 50.0)])
            .unwrap();
        api.ingest_items(&[
            ItemBuilder::new("R1").mass(8.0).priority(70).expiry("2025-01-01").build(),
            ItemBuilder::new("R2").mass(8.0).priority(20).expiry("2025-01-01").build(),
        ])
        .unwrap();
        api.identify_waste().unwrap();

        api.plan_return("U1", day0(), 10.0).unwrap();
        let report = api.complete_undocking("U1", "astro-1", day0()).unwrap();
        assert_eq!(report.item_ids, vec!["R1".to_string()]);
        assert_eq!(api.item("R1").unwrap().lifecycle, ItemLifecycle::Returned);
        assert_eq!(api.item("R2").unwrap().lifecycle, ItemLifecycle::Waste);

        let disposal = api
            .query_logs(&ActionLogFilter::default().with_action_type(ActionType::Disposal))
            .unwrap()
            .logs;
        assert_eq!(disposal.len(), 1);
        assert_eq!(disposal[0].container_id.as_deref(), Some("U1"));
    }
}
