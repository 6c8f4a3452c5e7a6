use clap::Parser;
use tracing_subscriber::EnvFilter;

use devscope::{
    AggregationConfig, AggregationEngine, AuthContext, Config, DashboardReport, Error,
    GitHubClient, MetricsConfig, MonthBucketing, RefreshPipeline, Storage, SummaryService,
};
use devscope::models::Goal;

#[derive(Parser, Debug)]
#[command(name = "devscope")]
#[command(version = "0.1.0")]
#[command(about = "Aggregate GitHub activity into a developer dashboard")]
struct Args {
    /// Output format (json, text, markdown)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Database path for storing results (defaults to DATABASE_PATH)
    #[arg(long)]
    database: Option<String>,

    /// Print the stored dashboard for --login instead of refreshing
    #[arg(long, requires = "login")]
    cached: bool,

    /// GitHub login to read from storage
    #[arg(long)]
    login: Option<String>,

    /// Number of recently updated repositories to fetch commits from
    #[arg(long)]
    commit_repo_limit: Option<usize>,

    /// Concurrent commit and pull request requests
    #[arg(long)]
    concurrency: Option<usize>,

    /// Include forked repositories when fetching commits
    #[arg(long)]
    include_forks: bool,

    /// Month bucketing (year-month, month-of-year)
    #[arg(long)]
    bucketing: Option<MonthBucketing>,

    /// Days covered by the contribution calendar
    #[arg(long)]
    calendar_days: Option<u32>,

    /// Skip Gemini and always write the local summary
    #[arg(long)]
    local_summary: bool,

    /// Show a progress bar while fetching commits
    #[arg(long)]
    progress: bool,

    /// Add a goal (or change its target), e.g. --goal "GitHub Stars=250"
    #[arg(long = "goal", value_name = "NAME=TARGET", value_parser = parse_goal)]
    goals: Vec<Goal>,
}

fn parse_goal(value: &str) -> Result<Goal, String> {
    let (name, target) = value
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=TARGET, got '{}'", value))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("goal name is empty".to_string());
    }
    let target: u32 = target
        .trim()
        .parse()
        .map_err(|_| format!("goal target '{}' is not a positive number", target.trim()))?;
    if target == 0 {
        return Err("goal target must be greater than zero".to_string());
    }
    Ok(Goal::new(name, target, "Trophy"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("devscope=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = Config::from_env()?;
    apply_overrides(&mut config, &args);

    let database = args
        .database
        .clone()
        .unwrap_or_else(|| config.database_path.clone());
    let storage = Storage::new(&database)?;
    let metrics_config = MetricsConfig::from(&config);

    if args.cached {
        if let Some(login) = args.login.as_deref() {
            if let Some(stored) = storage.load_dashboard(login)? {
                tracing::info!("Using stored dashboard from {}", stored.updated_at);
                let report = DashboardReport::from_stored(stored, &metrics_config);
                output_report(&report, &args)?;
                return Ok(());
            }
            tracing::info!("No stored dashboard for {}, refreshing", login);
        }
    }

    let auth = AuthContext::from_optional(config.github_token.clone())?;

    let aggregation_config = AggregationConfig {
        include_forks_in_commits: args.include_forks,
        show_progress: args.progress,
        ..AggregationConfig::from(&config)
    };
    let engine = AggregationEngine::new(GitHubClient::new()?, aggregation_config);

    let summaries = if args.local_summary {
        SummaryService::local_only()
    } else {
        SummaryService::from_config(&config)?
    };

    let pipeline = RefreshPipeline::new(engine, summaries, storage, metrics_config)
        .with_goals(args.goals.clone());

    let report = match pipeline.refresh(&auth).await {
        Ok(report) => report,
        Err(Error::Aggregation(e)) => {
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    output_report(&report, &args)?;

    Ok(())
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(limit) = args.commit_repo_limit {
        config.commit_repo_limit = limit;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency_limit = concurrency.max(1);
    }
    if let Some(bucketing) = args.bucketing {
        config.month_bucketing = bucketing;
    }
    if let Some(days) = args.calendar_days {
        config.calendar_window_days = days.max(1);
    }
}

fn output_report(report: &DashboardReport, args: &Args) -> anyhow::Result<()> {
    let output = match args.format.as_str() {
        "json" => serde_json::to_string_pretty(report)?,
        "markdown" => format_markdown(report),
        _ => format_text(report),
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &output)?;
        tracing::info!("Output written to: {}", path);
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn bar(value: u32, max: u32, width: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let filled = (value as usize * width + max as usize - 1) / max as usize;
    "#".repeat(filled)
}

fn month_label(month: &devscope::models::MonthlyActivity) -> String {
    match month.year {
        Some(year) => format!("{} {}", month.label, year),
        None => month.label.clone(),
    }
}

fn format_text(report: &DashboardReport) -> String {
    let mut output = String::new();
    let profile = &report.profile;
    let stats = &report.metrics.stats;

    output.push_str(&format!("\n=== Developer Dashboard: {} ===\n\n", profile.login));

    if let Some(ref name) = profile.name {
        output.push_str(&format!("Name: {}\n", name));
    }
    if let Some(ref bio) = profile.bio {
        output.push_str(&format!("Bio: {}\n", bio));
    }
    if let Some(ref location) = profile.location {
        output.push_str(&format!("Location: {}\n", location));
    }
    output.push_str(&format!(
        "Followers: {}  Following: {}  Public repos: {}\n\n",
        profile.followers, profile.following, profile.public_repos
    ));

    output.push_str(&format!("Commits: {}\n", stats.total_commits));
    output.push_str(&format!("Pull requests: {}\n", stats.total_prs));
    output.push_str(&format!("Issues: {}\n", stats.total_issues));
    output.push_str(&format!("Stars: {}\n", stats.total_stars));

    output.push_str(&format!("\nSummary ({}):\n  {}\n", report.summary.source, report.summary.content));

    if !report.metrics.languages.is_empty() {
        output.push_str("\nLanguages:\n");
        for language in &report.metrics.languages {
            output.push_str(&format!(
                "  {:<16} {:>3}% {}\n",
                language.name,
                language.percent,
                bar(language.percent, 100, 30)
            ));
        }
    }

    let busiest = report
        .metrics
        .monthly_activity
        .iter()
        .map(|m| m.total())
        .max()
        .unwrap_or(0);
    if !report.metrics.monthly_activity.is_empty() {
        output.push_str("\nMonthly activity (commits / PRs / issues):\n");
        for month in &report.metrics.monthly_activity {
            output.push_str(&format!(
                "  {:<9} {:>4} {:>4} {:>4} {}\n",
                month_label(month),
                month.commits,
                month.prs,
                month.issues,
                bar(month.total(), busiest, 30)
            ));
        }
    }

    if !report.metrics.contribution_calendar.is_empty() {
        output.push_str(&format!(
            "\nActive days: {} of the last {}\n",
            report.metrics.active_days(),
            report.metrics.contribution_calendar.len()
        ));
    }

    if !report.metrics.topics.is_empty() {
        let topics: Vec<&str> = report.metrics.topics.iter().map(|t| t.topic.as_str()).collect();
        output.push_str(&format!("\nTopics: {}\n", topics.join(", ")));
    }

    if !report.goals.is_empty() {
        output.push_str("\nGoals:\n");
        for goal in &report.goals {
            output.push_str(&format!(
                "  {:<22} {:>6}/{:<6} {:>3}% {}\n",
                goal.name,
                goal.current,
                goal.target,
                goal.percent,
                if goal.completed { "done" } else { "" }
            ));
        }
    }

    if !report.recent_activity.is_empty() {
        output.push_str("\nRecent activity:\n");
        for entry in report.recent_activity.iter().take(10) {
            output.push_str(&format!(
                "  {}  {}\n",
                entry.occurred_at.format("%Y-%m-%d"),
                entry.description
            ));
        }
    }

    if !report.partial_failures.is_empty() {
        output.push_str("\nIncomplete data:\n");
        for failure in &report.partial_failures {
            output.push_str(&format!("  ! {}: {}\n", failure.sub_fetch, failure.error));
        }
    }

    if let Some(rate_limit) = report.rate_limit {
        output.push_str(&format!("\nGitHub requests remaining: {}\n", rate_limit.remaining));
    }

    output.push_str(&format!(
        "\n{} {}\n",
        if report.cached { "Stored on:" } else { "Fetched on:" },
        report.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}

fn format_markdown(report: &DashboardReport) -> String {
    let mut output = String::new();
    let profile = &report.profile;
    let stats = &report.metrics.stats;

    output.push_str(&format!("# Developer Dashboard: {}\n\n", profile.login));

    if let Some(ref name) = profile.name {
        output.push_str(&format!("**Name:** {}\n\n", name));
    }
    if let Some(ref bio) = profile.bio {
        output.push_str(&format!("> {}\n\n", bio));
    }

    output.push_str("## Summary\n\n");
    output.push_str(&format!("{}\n\n", report.summary.content));

    output.push_str("| Metric | Value |\n|--------|-------|\n");
    output.push_str(&format!("| Commits | {} |\n", stats.total_commits));
    output.push_str(&format!("| Pull Requests | {} |\n", stats.total_prs));
    output.push_str(&format!("| Issues | {} |\n", stats.total_issues));
    output.push_str(&format!("| Stars | {} |\n", stats.total_stars));
    output.push_str(&format!("| Followers | {} |\n", profile.followers));

    if !report.metrics.languages.is_empty() {
        output.push_str("\n## Languages\n\n");
        output.push_str("| Language | Share |\n|----------|-------|\n");
        for language in &report.metrics.languages {
            output.push_str(&format!("| {} | {}% |\n", language.name, language.percent));
        }
    }

    if !report.metrics.monthly_activity.is_empty() {
        output.push_str("\n## Monthly Activity\n\n");
        output.push_str("| Month | Commits | PRs | Issues |\n");
        output.push_str("|-------|---------|-----|--------|\n");
        for month in &report.metrics.monthly_activity {
            output.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                month_label(month),
                month.commits,
                month.prs,
                month.issues
            ));
        }
    }

    if !report.metrics.topics.is_empty() {
        output.push_str("\n## Topics\n\n");
        for topic in &report.metrics.topics {
            output.push_str(&format!("- {} ({})\n", topic.topic, topic.count));
        }
    }

    if !report.goals.is_empty() {
        output.push_str("\n## Goals\n\n");
        output.push_str("| Goal | Progress | Done |\n|------|----------|------|\n");
        for goal in &report.goals {
            output.push_str(&format!(
                "| {} | {}/{} ({}%) | {} |\n",
                goal.name,
                goal.current,
                goal.target,
                goal.percent,
                if goal.completed { "yes" } else { "" }
            ));
        }
    }

    if !report.recent_activity.is_empty() {
        output.push_str("\n## Recent Activity\n\n");
        for entry in report.recent_activity.iter().take(10) {
            output.push_str(&format!(
                "- {} {}\n",
                entry.occurred_at.format("%Y-%m-%d"),
                entry.description
            ));
        }
    }

    if !report.partial_failures.is_empty() {
        output.push_str("\n## Incomplete Data\n\n");
        for failure in &report.partial_failures {
            output.push_str(&format!("- **{}**: {}\n", failure.sub_fetch, failure.error));
        }
    }

    output.push_str(&format!(
        "\n---\n*{} {}*\n",
        if report.cached { "Stored on" } else { "Fetched on" },
        report.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}
