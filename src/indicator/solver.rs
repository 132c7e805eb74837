//! Fixed-point indicator dependency solver (spec §4.2 "Algorithm").

use crate::ledger::{Ledger, Stage};
use tracing::debug;

/// Bookkeeping returned by [`ensure_solved`], used by tests asserting the
/// "indicator stage reaches a fixed point in bounded iterations" property
/// (spec §8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverReport {
    pub steps_taken: usize,
    pub systems_installed: usize,
}

/// A generous bound on fixed-point iterations — far beyond the deepest
/// prerequisite chain any registration rule in spec §4.2 can produce
/// (the longest chain, `RSI -> EMA -> UpDown -> Difference -> S`, is 4
/// deep) — purely a runaway-loop backstop.
const MAX_STEPS: usize = 64;

/// Runs the fixed-point loop of spec §4.2: for every indicator component
/// currently wanted, ensure its own column exists and register any
/// transitive prerequisite it implies, until the wanted set and the
/// resulting system count stop changing. Then installs the `indicators`
/// stage, positioned immediately after `main` (or appended if no `main`
/// stage exists), with every resulting calculator system, deduplicated by
/// name.
///
/// Calling this twice without adding any new wanted indicator in between
/// is a no-op (spec §8 idempotence property): the second call's
/// `steps_taken` is 1 and `systems_installed` is unchanged.
pub fn ensure_solved(ledger: &mut Ledger) -> SolverReport {
    let mut steps_taken = 0;

    loop {
        steps_taken += 1;
        let before_components = ledger.indicators_wanted_len();

        let snapshot: Vec<_> = ledger.wanted_indicators().copied().collect();
        let mut new_prereqs = Vec::new();
        for spec in &snapshot {
            (spec.ensure_self)(ledger);
            for prereq in (spec.prerequisites)() {
                new_prereqs.push(prereq);
            }
        }
        for prereq in new_prereqs {
            debug!(component = prereq.component_name, kind = ?prereq.kind, "registration rule ensures prerequisite component");
            ledger.want_indicator(prereq);
        }

        let after_components = ledger.indicators_wanted_len();
        if after_components == before_components || steps_taken >= MAX_STEPS {
            break;
        }
    }

    // Installation order matters: a calculator must run after every system
    // that produces the components it reads, so a spec's prerequisites are
    // visited (and their systems pushed) before the spec's own systems, via
    // a post-order walk over the fixed-point-closed wanted set.
    let mut stage = Stage::new("indicators");
    let mut installed_names = std::collections::HashSet::new();
    let mut visited_components = std::collections::HashSet::new();
    let wanted: Vec<_> = ledger.wanted_indicators().copied().collect();
    for spec in &wanted {
        install_post_order(*spec, &mut stage, &mut installed_names, &mut visited_components);
    }
    let systems_installed = stage.len();

    let position = ledger.stage_position("main").map(|p| p + 1).unwrap_or(ledger.stages().len());
    replace_stage(ledger, position, stage);

    SolverReport {
        steps_taken,
        systems_installed,
    }
}

fn install_post_order(
    spec: crate::indicator::IndicatorSpec,
    stage: &mut Stage,
    installed_names: &mut std::collections::HashSet<&'static str>,
    visited_components: &mut std::collections::HashSet<std::any::TypeId>,
) {
    if !visited_components.insert(spec.component_type) {
        return;
    }
    for prereq in (spec.prerequisites)() {
        install_post_order(prereq, stage, installed_names, visited_components);
    }
    for system in (spec.install_systems)() {
        if installed_names.insert(system.name()) {
            debug!(system = system.name(), "indicator solver installing calculator system");
            stage.push(system);
        }
    }
}

fn replace_stage(ledger: &mut Ledger, position: usize, stage: Stage) {
    let stages = ledger.stages_mut();
    if let Some(existing) = stages.iter().position(|s| s.name() == "indicators") {
        stages.remove(existing);
    }
    let position = position.min(stages.len());
    stages.insert(position, stage);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bars::Close;
    use crate::indicator::want_sma;

    #[test]
    fn solver_reaches_fixed_point_and_is_idempotent() {
        let mut ledger = Ledger::new("AAPL");
        want_sma::<3, Close>(&mut ledger);

        let first = ensure_solved(&mut ledger);
        assert!(first.systems_installed >= 1);
        assert!(ledger.has_column::<Close>());
        assert!(ledger.has_column::<crate::indicator::SMA<3, Close>>());

        let second = ensure_solved(&mut ledger);
        assert_eq!(second.steps_taken, 1);
        assert_eq!(second.systems_installed, first.systems_installed);
    }

    #[test]
    fn rsi_registration_pulls_in_full_prerequisite_chain() {
        let mut ledger = Ledger::new("AAPL");
        crate::indicator::want_rsi::<14, Close>(&mut ledger);
        let report = ensure_solved(&mut ledger);

        assert!(ledger.has_column::<crate::indicator::Difference<Close>>());
        assert!(ledger.has_column::<crate::indicator::UpDown<crate::indicator::Difference<Close>>>());
        assert!(ledger.has_column::<crate::indicator::EMA<14, crate::indicator::UpDown<crate::indicator::Difference<Close>>>>());
        assert!(ledger.has_column::<crate::indicator::RSI<14, Close>>());
        assert!(report.steps_taken <= MAX_STEPS);
    }
}
