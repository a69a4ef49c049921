use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use oceanus::aggregate::{Aggregate, Dimension, group_by};
use oceanus::chart::{ChartConfig, write_json};
use oceanus::config::AppConfig;
use oceanus::genres::GenreMap;
use oceanus::graph::KnowledgeGraph;
use oceanus::score::{Metric, build_scores};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "oceanus", version, about = "Music-scene knowledge graph charts")]
struct Cli {
    /// Path to the node-link graph JSON
    #[arg(long, global = true)]
    graph: Option<PathBuf>,

    /// Directory chart configs are written to
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    /// Config file (defaults to ~/.config/oceanus/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum MetricName {
    Activity,
    Influence,
    Popularity,
    Composite,
}

impl MetricName {
    fn metric(self) -> Metric {
        match self {
            Self::Activity => Metric::Activity,
            Self::Influence => Metric::Influence,
            Self::Popularity => Metric::Popularity,
            Self::Composite => Metric::Composite,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupBy {
    Overall,
    Family,
    #[value(alias = "era")]
    Bucket,
}

#[derive(Subcommand)]
enum Commands {
    /// Yearly counts of works influenced by the target genre, per genre family
    Waves,

    /// Contribution tables and the family/artist network for influenced works
    Network,

    /// Target-genre releases, the spotlight artist's share, and inspirations
    Evolution,

    /// Forecast and cluster the target genre's artists
    Forecast,

    /// Rank artists by a derived score and export the chart
    Rank {
        /// Which score to rank by
        #[arg(long, value_enum, default_value = "composite")]
        metric: MetricName,

        /// How to group the ranking
        #[arg(long = "by", value_enum, default_value = "overall")]
        by: GroupBy,

        /// Years per bucket when grouping by bucket
        #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
        width: u32,

        /// Entries kept per group
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Run every analysis and write every chart
    All,

    /// Show graph statistics
    Stats,
}

/// Everything a command needs, resolved once.
struct Session {
    graph: KnowledgeGraph,
    genres: GenreMap,
    config: AppConfig,
    out_dir: PathBuf,
}

impl Session {
    fn out(&self, file: &str) -> PathBuf {
        self.out_dir.join(file)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = AppConfig::load(cli.config.as_deref());
    let genres = GenreMap::new(&config.custom_genres);

    // Resolve paths: CLI > config > default
    let graph_path = cli
        .graph
        .or(config.graph_path.clone())
        .unwrap_or_else(oceanus::config::default_graph_path);
    let out_dir = cli
        .out_dir
        .or(config.out_dir.clone())
        .unwrap_or_else(oceanus::config::default_out_dir);
    log::info!("Graph: {}", graph_path.display());
    log::info!("Output: {}", out_dir.display());

    let graph = KnowledgeGraph::load(&graph_path)
        .with_context(|| format!("Failed to load graph from {}", graph_path.display()))?;

    let session = Session {
        graph,
        genres,
        config,
        out_dir,
    };

    match cli.command {
        Commands::Waves => println!("{}", run_waves(&session)?),
        Commands::Network => println!("{}", run_network(&session)?),
        Commands::Evolution => println!("{}", run_evolution(&session)?),
        Commands::Forecast => println!("{}", run_forecast(&session)?),

        Commands::Rank {
            metric,
            by,
            width,
            limit,
        } => {
            let dimension = match by {
                GroupBy::Overall => Dimension::Overall,
                GroupBy::Family => Dimension::GenreFamily,
                GroupBy::Bucket => Dimension::TimeBucket(width),
            };
            let (aggregates, summary) = run_rank(&session, metric.metric(), dimension, limit)?;
            print_rankings(&aggregates);
            println!("{summary}");
        }

        Commands::All => run_all(&session)?,

        Commands::Stats => print_stats(&session),
    }

    Ok(())
}

fn run_waves(s: &Session) -> Result<String> {
    let payload = oceanus::waves::build_waves(&s.graph, &s.genres, &s.config.analysis)
        .context("Waves analysis failed")?;
    write_json(&s.out("waves.json"), &payload)?;
    let k = &payload.kpis;
    Ok(format!(
        "Waves: {} influenced works {}-{}, peak {} ({}), top family {} ({})",
        k.total_influenced, k.span_start, k.span_end, k.peak_year, k.peak_count, k.top_family, k.top_family_count
    ))
}

fn run_network(s: &Session) -> Result<String> {
    let report = oceanus::network::build_network(&s.graph, &s.genres, &s.config.analysis);
    write_json(&s.out("network_contributions.json"), &report.contributions)?;
    write_json(&s.out("network.json"), &report.network)?;
    let k = &report.network.kpis;
    Ok(format!(
        "Network: {} works, {} artists, top genre {}, top artist {}",
        k.works, k.artists, k.top_genre, k.top_artist
    ))
}

fn run_evolution(s: &Session) -> Result<String> {
    let payload = oceanus::evolution::build_evolution(&s.graph, &s.config.analysis)
        .context("Evolution analysis failed")?;
    write_json(&s.out("evolution.json"), &payload)?;
    let k = &payload.kpis;
    Ok(format!(
        "Evolution: {} {} works, {} by {}, top inspiration {}, peak share {}",
        k.target_total,
        payload.target_label,
        k.spotlight_total,
        s.config.analysis.spotlight_artist,
        k.top_genre,
        k.peak_share
    ))
}

fn run_forecast(s: &Session) -> Result<String> {
    let payload = oceanus::forecast::build_forecast(&s.graph, &s.config.analysis, &s.config.forecast)
        .context("Forecast failed")?;
    write_json(&s.out("forecast.json"), &payload)?;
    let m = &payload.meta;
    Ok(format!(
        "Forecast: {} candidates ({} excluding {}), {} -> {}, {} clusters",
        m.candidates,
        m.candidates_excl_spotlight,
        s.config.analysis.spotlight_artist,
        m.max_year,
        m.pred_year,
        m.cluster_k
    ))
}

fn run_rank(
    s: &Session,
    metric: Metric,
    dimension: Dimension,
    limit: usize,
) -> Result<(Vec<Aggregate>, String)> {
    let records = build_scores(&s.graph, &s.config.scoring, metric);
    let aggregates = group_by(&records, &s.graph, &s.genres, dimension, Some(limit));
    let title = format!("Top {} artists by {} ({})", limit, metric, dimension.slug());
    let chart = ChartConfig::from_aggregates(&title, &aggregates);

    let path = s.out(&format!("rank_{}_{}.json", metric, dimension.slug()));
    write_json(&path, &chart)?;
    let summary = format!(
        "Rank: {} artists scored by {}, {} groups -> {}",
        records.len(),
        metric,
        aggregates.len(),
        path.display()
    );
    Ok((aggregates, summary))
}

fn run_all(s: &Session) -> Result<()> {
    let dimensions = [Dimension::Overall, Dimension::GenreFamily];
    let total = 4 + Metric::ALL.len() * dimensions.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let analyses: [(&str, fn(&Session) -> Result<String>); 4] = [
        ("waves", run_waves),
        ("network", run_network),
        ("evolution", run_evolution),
        ("forecast", run_forecast),
    ];
    for (name, run) in analyses {
        pb.set_message(name);
        let summary = run(s)?;
        pb.println(summary);
        pb.inc(1);
    }

    for metric in Metric::ALL {
        for dimension in dimensions {
            pb.set_message(format!("rank {} {}", metric, dimension.slug()));
            let (_, summary) = run_rank(s, metric, dimension, 10)?;
            pb.println(summary);
            pb.inc(1);
        }
    }

    pb.finish_with_message("done");
    println!("Wrote {} chart files to {}", total + 1, s.out_dir.display());
    Ok(())
}

fn print_rankings(aggregates: &[Aggregate]) {
    for aggregate in aggregates {
        println!("{} (total {:.3})", aggregate.label, aggregate.total);
        for (i, record) in aggregate.ranking.iter().enumerate() {
            let window = match (record.window_start, record.window_end) {
                (Some(a), Some(b)) => format!("{a}-{b}"),
                _ => "-".to_string(),
            };
            println!("  {:>3}. {:<30} {:>8.3}  {}", i + 1, record.name, record.value, window);
        }
        println!();
    }
}

fn print_stats(s: &Session) {
    let graph = &s.graph;
    let analysis = &s.config.analysis;
    let targets = oceanus::influence::target_works(graph, &analysis.target_genre);

    println!("Graph Statistics");
    println!("================");
    println!("Nodes:            {}", graph.node_count());
    println!("Edges:            {}", graph.edge_count());
    match graph.year_range() {
        Some((start, end)) => println!("Release years:    {start}-{end}"),
        None => println!("Release years:    -"),
    }
    println!("{:<18}{}", format!("{}:", analysis.target_genre), targets.len());
    println!();

    println!("Node types:");
    for (kind, count) in graph.node_type_counts() {
        println!("  {:<20} {}", kind, count);
    }
    println!();

    println!("Edge types:");
    for (kind, count) in graph.edge_type_counts() {
        println!("  {:<20} {}", kind, count);
    }
}
