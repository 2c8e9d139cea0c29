use crate::output::{print_json, print_table};
use uavsim_core::scenario;

pub fn run(json: bool) -> anyhow::Result<()> {
    let catalogue = scenario::catalogue();
    if json {
        return print_json(&catalogue);
    }

    let rows = catalogue
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                s.uav_count().to_string(),
                s.steps.to_string(),
                format!("{}s", s.interval_s),
                format!("{}s", s.duration_s()),
                s.capacity_prb.to_string(),
                s.description.clone(),
            ]
        })
        .collect();
    print_table(
        &["NAME", "UAVS", "STEPS", "INTERVAL", "DURATION", "PRB", "DESCRIPTION"],
        rows,
    );
    Ok(())
}
