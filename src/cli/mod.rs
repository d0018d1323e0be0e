use crate::{render::render_ics, PlanEvent, PlannerConfig, PlannerFactory, TripPreferences};
use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use futures::{pin_mut, StreamExt};
use tracing::{error, info};

fn command() -> Command {
    Command::new("trip-planner")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Plan a budget- and calendar-aware travel itinerary with an LLM")
        .arg(
            Arg::new("destination")
                .help("Destination, e.g. \"Lisbon\" or \"Paris and London\"")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("budget")
                .short('b')
                .long("budget")
                .value_name("USD")
                .help("Total budget in USD")
                .value_parser(clap::value_parser!(f64))
                .default_value("1000"),
        )
        .arg(
            Arg::new("days")
                .short('d')
                .long("days")
                .value_name("COUNT")
                .help("Trip length in days")
                .value_parser(clap::value_parser!(u32))
                .default_value("3"),
        )
        .arg(
            Arg::new("interest")
                .short('i')
                .long("interest")
                .value_name("TAG")
                .help("Interest to plan around (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("start-date")
                .short('s')
                .long("start-date")
                .value_name("DATE")
                .help("First day of the trip, YYYY-MM-DD or DD-MM-YYYY"),
        )
        .arg(
            Arg::new("stream")
                .long("stream")
                .help("Print progress and result as NDJSON records")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the final itinerary as JSON")
                .action(ArgAction::SetTrue)
                .conflicts_with("stream"),
        )
        .arg(
            Arg::new("ics")
                .long("ics")
                .value_name("PATH")
                .help("Write the itinerary as an iCalendar file"),
        )
        .arg(
            Arg::new("max-repairs")
                .long("max-repairs")
                .value_name("COUNT")
                .help("Re-planning attempts after a constraint violation (or set PLANNER_MAX_REPAIRS)")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("no-images")
                .long("no-images")
                .help("Skip image search and use generated images")
                .action(ArgAction::SetTrue),
        )
}

fn preferences_from(matches: &ArgMatches) -> anyhow::Result<TripPreferences> {
    let destination = matches
        .get_one::<String>("destination")
        .context("destination is required")?;
    let budget = *matches.get_one::<f64>("budget").context("budget is required")?;
    let days = *matches.get_one::<u32>("days").context("days is required")?;

    let mut preferences = TripPreferences::new(destination.as_str(), budget, days);
    if let Some(interests) = matches.get_many::<String>("interest") {
        preferences = preferences.with_interests(interests.cloned());
    }
    if let Some(start_date) = matches.get_one::<String>("start-date") {
        preferences = preferences.with_start_date(start_date.as_str());
    }
    Ok(preferences)
}

/// CLI entry point for the trip planner
pub async fn run() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let matches = command().get_matches();
    let preferences = preferences_from(&matches)?;

    // Flags override environment
    let mut config = PlannerConfig::from_env()?;
    if let Some(max_repairs) = matches.get_one::<usize>("max-repairs") {
        config.max_repairs = *max_repairs;
    }
    if matches.get_flag("no-images") {
        config.image_search = false;
    }
    if !config.has_any_credential() {
        anyhow::bail!("No API key found. Set GOOGLE_API_KEY or OPENROUTER_API_KEY (a .env file works too)");
    }

    info!(
        "Planning {} days in {} with a ${:.2} budget",
        preferences.days, preferences.city, preferences.budget
    );

    let agent = PlannerFactory::new(config).build()?;
    let stream_mode = matches.get_flag("stream");

    let events = agent.plan_trip_stream(&preferences);
    pin_mut!(events);

    let mut itinerary = None;
    while let Some(event) = events.next().await {
        if stream_mode {
            println!("{}", event.to_wire());
        }
        match event {
            status @ PlanEvent::Status(_) => {
                if !stream_mode {
                    eprintln!("{}", status.describe());
                }
            }
            PlanEvent::Finished(plan) => itinerary = Some(plan),
            PlanEvent::Failed(err) => {
                error!("Planning failed: {}", err);
                anyhow::bail!(err.user_message());
            }
        }
    }

    let itinerary = itinerary.context("planner stopped without producing an itinerary")?;

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&itinerary)?);
    } else if !stream_mode {
        print_itinerary(&itinerary);
    }

    if let Some(path) = matches.get_one::<String>("ics") {
        let calendar = render_ics(&itinerary, preferences.start_date.as_deref());
        std::fs::write(path, calendar).with_context(|| format!("failed to write {path}"))?;
        info!("Calendar written to {}", path);
    }

    Ok(())
}

fn print_itinerary(itinerary: &crate::Itinerary) {
    println!("\nItinerary for {}", itinerary.city);
    for day in &itinerary.days {
        let city = day.city.as_deref().unwrap_or(&itinerary.city);
        println!("\nDay {} ({}) - ${:.2}", day.day_number, city, day.total_cost());
        for activity in &day.activities {
            println!(
                "  - {} [{}] ${:.2}: {}",
                activity.name, activity.duration_str, activity.cost, activity.description
            );
        }
    }
    println!("\nTotal: ${:.2}", itinerary.total_cost());
    match &itinerary.validation_error {
        Some(reason) if !itinerary.valid => println!("Best effort only: {}", reason),
        _ => println!("All constraints met."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_preferences() {
        let matches = command().get_matches_from([
            "trip-planner",
            "Lisbon",
            "--budget",
            "750",
            "--days",
            "2",
            "-i",
            "Food",
            "-i",
            "History",
            "--start-date",
            "2025-06-01",
        ]);
        let prefs = preferences_from(&matches).unwrap();
        assert_eq!(prefs.city, "Lisbon");
        assert_eq!(prefs.budget, 750.0);
        assert_eq!(prefs.days, 2);
        assert_eq!(prefs.interests, vec!["Food", "History"]);
        assert_eq!(prefs.start_date.as_deref(), Some("2025-06-01"));
    }

    #[test]
    fn defaults_apply() {
        let matches = command().get_matches_from(["trip-planner", "Rome"]);
        let prefs = preferences_from(&matches).unwrap();
        assert_eq!(prefs.budget, 1000.0);
        assert_eq!(prefs.days, 3);
        assert!(prefs.interests.is_empty());
        assert!(!matches.get_flag("stream"));
    }

    #[test]
    fn json_and_stream_conflict() {
        assert!(command()
            .try_get_matches_from(["trip-planner", "Rome", "--json", "--stream"])
            .is_err());
    }
}
