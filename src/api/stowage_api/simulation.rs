use super::*;
use crate::api::dto::SimulationReport;
use crate::engine::simulation::DaySummary;

impl StowageApi {
    // ==========================================
    // 模拟推进
    // ==========================================

    /// 推进 days 个整天
    pub fn advance_simulation(&self, days: u32) -> ApiResult<SimulationReport> {
        self.run_clock(|clock, catalog| clock.advance(days, catalog))
    }

    /// 推进到目标日期 (按整天计); 目标不晚于当前时刻时不推进
    pub fn advance_to(&self, target: DateTime<Utc>) -> ApiResult<SimulationReport> {
        self.run_clock(|clock, catalog| clock.advance_to(target, catalog))
    }

    fn run_clock<F>(&self, step: F) -> ApiResult<SimulationReport>
    where
        F: FnOnce(&mut SimulationClock, &mut BTreeMap<String, Item>) -> Vec<DaySummary>,
    {
        let _perf = crate::perf::PerfGuard::new("advance_simulation");
        let map = self.read_containers()?;
        let mut guards = Self::lock_all_containers(&map)?;
        let mut catalog = self.write_catalog()?;
        let mut waste = self.lock_waste()?;
        let mut clock = self.lock_clock()?;

        // 时钟/目录/货箱/废弃集合均在副本上推进, 日志落库后一并发布
        let mut next_clock = (*clock).clone();
        let mut next_catalog = (*catalog).clone();
        let mut working: Vec<Container> = guards.iter().map(|g| (**g).clone()).collect();
        let mut next_waste = (*waste).clone();

        let days = step(&mut next_clock, &mut next_catalog);
        let new_date = next_clock.now();

        // 每天的新废弃物按当天日期记录, 并立即腾出货箱空间
        let mut logs = Vec::new();
        for day in &days {
            let ids: Vec<String> = day.new_waste_ids().map(str::to_string).collect();
            logs.extend(Self::retire_waste(
                &ids,
                &mut working,
                &next_catalog,
                &mut next_waste,
                &self.config.system_actor,
                day.date,
            ));
        }
        self.append_logs(&logs)?;

        *clock = next_clock;
        *catalog = next_catalog;
        *waste = next_waste;
        for (guard, updated) in guards.iter_mut().zip(working) {
            **guard = updated;
        }
        drop(clock);

        info!(
            days = days.len(),
            new_date = %new_date,
            new_waste = logs.len(),
            "模拟推进完成"
        );

        Ok(SimulationReport {
            success: true,
            new_date,
            days,
        })
    }
}
