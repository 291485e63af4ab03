use anyhow::Result;

use crosspost::scheduler::CyclePlanner;

pub fn plan(items: u32, window: u32, seed: Option<u64>) -> Result<()> {
    if window == 0 {
        anyhow::bail!("window must be greater than 0");
    }
    if items > window {
        anyhow::bail!("items ({items}) cannot exceed window ({window}): every slot needs at least one minute");
    }

    let mut planner = CyclePlanner::new(items, window, seed);
    let plan = planner.next_plan();

    println!("Cycle plan: {} slot(s) over {} minutes", plan.len(), plan.total_minutes());
    println!("================================");

    let mut offset = 0u32;
    for (index, minutes) in plan.intervals().iter().enumerate() {
        println!(
            "  slot {:>2}: transfer at +{:>2}m, then wait {:>2}m",
            index + 1,
            offset,
            minutes
        );
        offset += minutes;
    }
    println!("  next plan at +{offset}m");

    Ok(())
}
