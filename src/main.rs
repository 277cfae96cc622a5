use anyhow::Result;
use clap::Parser;
use tagdiff::analysis::{compare_single, ComparisonTarget};
use tagdiff::canonicalize::{canonicalize, CanonicalizeOptions, Dataset};
use tagdiff::cli::{Cli, OutputFormat};
use tagdiff::error::Error;
use tagdiff::loader;
use tagdiff::output;
use tagdiff::rank::{render_rows, top_and_worst_tags, RenderRow};
use tagdiff::segment::{segment, segment_hours_by_day, Dimension, SegmentRow};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for pipeline stage reporting
fn init_tracing(debug: bool) {
    let default_level = if debug {
        tracing::Level::TRACE
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.into()))
        .with_writer(std::io::stderr)
        .init();
}

/// Print one block of segment rows in the requested format
fn print_rows(title: &str, rows: &[SegmentRow], confidence: f32, format: OutputFormat) -> Result<()> {
    let rendered = render_rows(rows, confidence);
    print_rendered(title, &rendered, format)
}

fn print_rendered(title: &str, rows: &[RenderRow], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", output::format_text(title, rows)),
        OutputFormat::Json => println!("{}", output::format_json(rows)?),
        OutputFormat::Csv => print!("{}", output::format_csv(rows)),
    }
    println!();
    Ok(())
}

/// Run one dimension, treating the single-subreddit sentinel as a skip
/// rather than a failure when sweeping the full suite.
fn run_dimension(
    dataset: &Dataset,
    dimension: &Dimension,
    title: &str,
    cli: &Cli,
    lenient: bool,
) -> Result<()> {
    match segment(dataset, dimension, cli.confidence) {
        Ok(rows) => print_rows(title, &rows, cli.confidence, cli.format),
        Err(Error::SingleSubreddit) if lenient => {
            println!("Only one subreddit in dataset, subreddit segmentation skipped.\n");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn run_suite(dataset: &Dataset, cli: &Cli) -> Result<()> {
    run_dimension(
        dataset,
        &Dimension::Subreddit,
        "Upvote difference by subreddit",
        cli,
        true,
    )?;
    run_dimension(
        dataset,
        &Dimension::Hour {
            block: cli.hour_block,
        },
        "Upvote difference by hour",
        cli,
        false,
    )?;
    run_dimension(
        dataset,
        &Dimension::Day,
        "Upvote difference by day of week",
        cli,
        false,
    )?;
    run_dimension(
        dataset,
        &Dimension::Tag {
            top: Some(cli.top_tags),
        },
        &format!("Upvote difference in top {} tags", cli.top_tags),
        cli,
        false,
    )?;
    run_dimension(
        dataset,
        &Dimension::TagCount,
        "Upvote difference by number of tags",
        cli,
        false,
    )?;
    run_dimension(
        dataset,
        &Dimension::DurationBlock {
            minutes: cli.duration_block,
        },
        &format!(
            "Upvote difference by duration blocks of {} minutes",
            cli.duration_block
        ),
        cli,
        false,
    )?;
    run_dimension(
        dataset,
        &Dimension::WordCountBlock {
            words: cli.word_block,
        },
        &format!(
            "Upvote difference by script length blocks of {} words",
            cli.word_block
        ),
        cli,
        false,
    )?;
    Ok(())
}

fn run_best_worst(dataset: &Dataset, n: usize, cli: &Cli) -> Result<()> {
    let (best, worst) = top_and_worst_tags(dataset, cli.confidence, n)?;
    let best_rows: Vec<RenderRow> = best
        .iter()
        .map(|t| RenderRow::from_ranked(t, cli.confidence))
        .collect();
    let worst_rows: Vec<RenderRow> = worst
        .iter()
        .map(|t| RenderRow::from_ranked(t, cli.confidence))
        .collect();
    print_rendered(&format!("Top {n} tags"), &best_rows, cli.format)?;
    print_rendered(&format!("Worst {n} tags"), &worst_rows, cli.format)?;
    Ok(())
}

fn run_hours_by_day(dataset: &Dataset, cli: &Cli) -> Result<()> {
    let per_day = segment_hours_by_day(dataset, cli.hour_block, cli.confidence)?;
    for (day, rows) in per_day {
        print_rows(
            &format!("Upvote difference by hour on {day}"),
            &rows,
            cli.confidence,
            cli.format,
        )?;
    }
    Ok(())
}

fn single_target(cli: &Cli) -> Option<ComparisonTarget> {
    if let Some(tag) = &cli.compare_tag {
        return Some(ComparisonTarget::Tag(tag.clone()));
    }
    if let Some(subreddit) = &cli.compare_subreddit {
        return Some(ComparisonTarget::Subreddit(subreddit.clone()));
    }
    cli.compare_hour.map(|hour| ComparisonTarget::LocalHour {
        hour,
        span_hours: cli.span_hours,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let sources = loader::load_sources(&cli.files)?;
    let options = CanonicalizeOptions {
        subreddit: cli.subreddit.clone(),
        tag_filters: cli.tags.clone(),
        time_cutoff_months: cli.months,
        normalize_subreddits: cli.normalize_subreddits,
        adjust_inflation: cli.adjust_inflation,
    };
    let dataset = canonicalize(sources, &options)?;

    if let Some(target) = single_target(&cli) {
        let report = compare_single(&dataset, &target, cli.confidence)?;
        println!("{}", report.summary);
        return Ok(());
    }
    if let Some(n) = cli.best_worst {
        return run_best_worst(&dataset, n, &cli);
    }
    if cli.hours_by_day {
        return run_hours_by_day(&dataset, &cli);
    }
    if let Some(dimension) = cli.to_dimension() {
        return run_dimension(&dataset, &dimension, "Upvote difference", &cli, false);
    }
    run_suite(&dataset, &cli)
}
