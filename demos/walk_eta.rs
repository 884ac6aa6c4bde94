//! Resolve a walking route and a week of walking totals.
//!
//! Tries the configured backend first and falls back to the built-in
//! campus catalog and straight-line routes when it is unreachable.
//!
//! Run with: RUST_LOG=info cargo run --example walk_eta [config.json]

use std::sync::Arc;

use campus_nav::{
    campus, HttpPathService, NameResolver, NavigatorConfig, RouteOutcome, RouteResolver,
    RouteSession, Schedule, Weekday,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => NavigatorConfig::from_json(&std::fs::read(path)?)?,
        None => NavigatorConfig::default(),
    };

    let service = HttpPathService::new(&config)?;
    let names = Arc::new(NameResolver::new());

    match service.refresh(&names).await {
        Ok(count) => println!("Loaded {} waypoints from {}", count, config.base_url),
        Err(e) => {
            println!("Waypoint source unavailable ({}); using built-in catalog", e);
            names.build(campus::default_waypoints())?;
        }
    }

    if let Some(building) = service.course_location("COMP 182").await {
        println!("COMP 182 meets in {}", building);
    }

    let session = RouteSession::new(RouteResolver::new(service, Arc::clone(&names)));
    match session.select("Fondren Library", "Duncan Hall (CS)").await? {
        Some(RouteOutcome::Found(route)) => {
            println!("\nRoute ({:?}): {}", route.source, route.ordered_names.join(" -> "));
            if let (Some(meters), Some(minutes)) = (route.total_meters, route.walk_minutes(config.walk_speed_mps)) {
                println!("  {:.0} m, about {:.1} min", meters, minutes);
            }
        }
        Some(RouteOutcome::NoRoute { unresolved }) => println!("\nNo route; unknown: {:?}", unresolved),
        None => println!("\nSelection superseded"),
    }

    let mut schedule = Schedule::new();
    schedule.add("COMP 182", "Duncan Hall (CS)", Weekday::Mon, "10:00", "10:50");
    schedule.add("PHYS 101", "Brockman Hall for Physics", Weekday::Mon, "11:00 AM", "11:50 AM");
    schedule.add("Lunch", "North Servery", Weekday::Mon, "12:00 PM", "12:45 PM");
    schedule.add("MATH 212", "Herzstein Hall", Weekday::Wed, "1:00 PM", "1:50 PM");
    schedule.add("Workout", "Gibbs Recreation Center", Weekday::Wed, "3:00 PM", "4:00 PM");

    println!("\nWeekly walking:");
    for (day, summary) in schedule.summarize(&names.snapshot()) {
        println!(
            "  {}: {} events, {:.0} m, {:.1} min",
            day,
            summary.ordered_events.len(),
            summary.total_meters,
            summary.total_minutes
        );
    }

    Ok(())
}
