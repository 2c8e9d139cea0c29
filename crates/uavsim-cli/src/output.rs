use serde::Serialize;
use uavsim_core::result::ComparisonRow;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    // Calculate column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  "));

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  "));
    }
}

pub fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

fn comparison_cells(r: &ComparisonRow) -> Vec<String> {
    vec![
        r.scenario.clone(),
        r.strategy.clone(),
        r.uavs.to_string(),
        r.steps.to_string(),
        percent(r.mean_prb_utilization),
        percent(r.overrun_rate),
        format!("{:.2}", r.mean_system_throughput_mbps),
        r.interference_events.to_string(),
        percent(r.mean_qos_satisfaction),
        format!("{:.1}", r.total_energy_j),
        format!("{:.3}", r.energy_efficiency_mbits_per_j),
        percent(r.failed_step_fraction),
        percent(r.failed_decision_fraction),
        r.completion.clone(),
    ]
}

/// One line per scenario result.
pub fn print_comparison(rows: &[ComparisonRow]) {
    let table = rows.iter().map(comparison_cells).collect();
    print_table(
        &[
            "SCENARIO",
            "STRATEGY",
            "UAVS",
            "STEPS",
            "PRB UTIL",
            "OVERRUN",
            "TPUT Mbps",
            "INTERF",
            "QOS",
            "ENERGY J",
            "Mbit/J",
            "FAILED STEPS",
            "FAILED CALLS",
            "STATUS",
        ],
        table,
    );
}
