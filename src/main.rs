//! FitTrack command line.
//!
//! Replays recorded tracks through a session and prints statistics from the
//! local database.

use std::path::PathBuf;
use std::sync::MutexGuard;

use anyhow::{anyhow, bail, Context};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fittrack::calibration::{ActivityType, CalibrationSession};
use fittrack::goals::{Goal, GoalManager, GoalType};
use fittrack::replay::{load_gpx, replay_track, ReplayLocationProvider};
use fittrack::statistics::{
    calculate_period_stats, calculate_streaks, compare_periods, get_personal_records, DateRange,
    MAX_RANGE_DAYS,
};
use fittrack::storage::{load_config, AppContext, Database};
use fittrack::tracking::{ActivityKind, ManualClock};

#[derive(Parser)]
#[command(name = "fittrack", version, about = "Activity tracking and statistics")]
struct Cli {
    /// Override the data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Calibrate stride length from a walk over a known distance
    Calibrate {
        /// walking, running or hiking
        activity_type: String,
        /// Distance covered, in meters
        distance_m: f64,
        /// Steps counted over that distance
        steps: u32,
    },
    /// Record a session from a GPX track
    Replay {
        file: PathBuf,
        #[arg(default_value = "walking")]
        kind: String,
    },
    /// Set a goal
    Goal {
        /// daily_steps, weekly_steps or daily_distance
        goal_type: String,
        target: f64,
        /// Day the goal applies to (YYYY-MM-DD), default today
        date: Option<NaiveDate>,
    },
    /// Print statistics for the last N days
    Stats {
        #[arg(
            default_value_t = 7,
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_RANGE_DAYS))
        )]
        days: u32,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = load_config().context("Failed to load config")?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    tracing::info!("Starting FitTrack v{}", env!("CARGO_PKG_VERSION"));
    let ctx = AppContext::open(config).context("Failed to open database")?;

    match cli.command {
        Command::Calibrate {
            activity_type,
            distance_m,
            steps,
        } => calibrate(&ctx, &activity_type, distance_m, steps),
        Command::Replay { file, kind } => replay(&ctx, file, &kind),
        Command::Goal {
            goal_type,
            target,
            date,
        } => set_goal(&ctx, &goal_type, target, date),
        Command::Stats { days } => stats(&ctx, days),
    }
}

fn lock_db(ctx: &AppContext) -> anyhow::Result<MutexGuard<'_, Database>> {
    ctx.database
        .lock()
        .map_err(|e| anyhow!("Database lock poisoned: {}", e))
}

fn calibrate(ctx: &AppContext, activity_type: &str, distance_m: f64, steps: u32) -> anyhow::Result<()> {
    let activity_type = ActivityType::parse(activity_type)
        .ok_or_else(|| anyhow!("Unknown activity type: {}", activity_type))?;

    let mut session = CalibrationSession::new(activity_type, distance_m)?;
    session.record_pedometer_steps(steps);
    let measurement = session.finish()?;

    let db = lock_db(ctx)?;
    let profile = match db.get_profile_for_type(activity_type)? {
        Some(mut profile) => {
            measurement.apply_to(&mut profile)?;
            db.update_profile(&profile)?;
            profile
        }
        None => {
            let profile = measurement.into_profile()?;
            db.insert_profile(&profile)?;
            profile
        }
    };

    println!(
        "{} stride: {:.3} m (confidence {:.2})",
        profile.activity_type, profile.step_length_m, profile.confidence
    );
    Ok(())
}

fn replay(ctx: &AppContext, file: PathBuf, kind: &str) -> anyhow::Result<()> {
    let kind = ActivityKind::parse(kind).ok_or_else(|| anyhow!("Unknown activity kind: {}", kind))?;
    if !kind.uses_location() {
        bail!("{} sessions do not use location", kind);
    }

    let fixes = load_gpx(&file).with_context(|| format!("Failed to load {}", file.display()))?;
    let first = fixes
        .first()
        .map(|fix| fix.timestamp)
        .ok_or_else(|| anyhow!("{} has no points", file.display()))?;
    tracing::info!("Replaying {} fixes from {}", fixes.len(), file.display());

    let provider = ReplayLocationProvider::new(fixes);
    let clock = ManualClock::new(first);
    let mut controller =
        ctx.session_controller(Box::new(provider.clone()), Box::new(clock.clone()));

    let activity = replay_track(&mut controller, &provider, &clock, kind)?;

    println!("Activity {}", activity.id);
    println!("  kind:       {}", activity.kind);
    println!("  duration:   {:.1} min", activity.duration_ms as f64 / 60_000.0);
    println!("  distance:   {:.1} m", activity.distance_m);
    println!("  steps:      {}", activity.steps);
    println!("  elevation:  +{:.1} m / -{:.1} m", activity.elevation_gain_m, activity.elevation_loss_m);

    let day = activity.day();
    let db = lock_db(ctx)?;
    let activities = db.list_all_completed_activities()?;
    let goals = GoalManager::new(db.connection()).refresh_range(day, day, &activities)?;
    for goal in goals {
        println!("  goal:       {} {:.0}%", goal.goal_type, goal.progress_percent());
    }
    Ok(())
}

fn set_goal(
    ctx: &AppContext,
    goal_type: &str,
    target: f64,
    date: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let goal_type =
        GoalType::parse(goal_type).ok_or_else(|| anyhow!("Unknown goal type: {}", goal_type))?;
    let date = date.unwrap_or_else(|| Utc::now().date_naive());

    let db = lock_db(ctx)?;
    let mut goal = Goal::new(goal_type, target, date);
    goal.refresh_progress(&db.list_all_completed_activities()?);

    let manager = GoalManager::new(db.connection());
    manager.create(&goal)?;

    println!(
        "{} goal for {}: {:.0} ({:.0}% done)",
        goal.goal_type,
        goal.date,
        goal.target,
        goal.progress_percent()
    );
    Ok(())
}

fn stats(ctx: &AppContext, days: u32) -> anyhow::Result<()> {
    let today = Utc::now().date_naive();
    let range = DateRange::last_days(today, days);

    let db = lock_db(ctx)?;
    if db.count_completed_activities()? == 0 {
        println!("No completed activities yet");
        return Ok(());
    }
    let activities = db.list_all_completed_activities()?;
    let goals = GoalManager::new(db.connection()).list_for_range(range.start, range.end)?;

    let period = calculate_period_stats(&activities, &goals, range);
    let streaks = calculate_streaks(&activities, today, ctx.config.statistics.streak_min_steps);
    let records = get_personal_records(&activities);
    let comparison = compare_periods(&activities, range);

    println!("Last {} days ({} to {})", range.days(), range.start, range.end);
    println!("  activities: {} on {} days", period.activity_count, period.active_days);
    println!("  steps:      {} ({:.0}/day)", period.total_steps, period.average_daily_steps);
    println!("  distance:   {:.2} km", period.total_distance_m / 1000.0);
    println!("  time:       {:.1} h", period.total_duration_ms as f64 / 3_600_000.0);
    if let Some(best) = period.best_day {
        println!("  best day:   {} ({} steps)", best.date, best.steps);
    }
    println!("  goals met:  {:.0}%", period.goal_completion_rate);
    println!();
    println!("Streak: {} days (longest {})", streaks.current, streaks.longest);
    println!(
        "vs previous {} days: steps {:+.0}%, distance {:+.0}%, time {:+.0}%",
        range.days(),
        comparison.steps_change_pct,
        comparison.distance_change_pct,
        comparison.duration_change_pct
    );

    if let Some(record) = records.most_steps {
        println!("Most steps:       {:.0} on {}", record.value, record.date);
    }
    if let Some(record) = records.longest_distance {
        println!("Longest distance: {:.2} km on {}", record.value / 1000.0, record.date);
    }
    if let Some(record) = records.longest_duration {
        println!("Longest session:  {:.1} min on {}", record.value / 60_000.0, record.date);
    }
    Ok(())
}
