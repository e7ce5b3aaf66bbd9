use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use engine::persist::{save_snapshot, IndexPaths};
use engine::{
    CatalogOptions, EngineConfig, Recommendation, Recommender, RecommenderError, VectorizerConfig, DEFAULT_LIST_LIMIT,
    DEFAULT_SEARCH_LIMIT, DEFAULT_TOP_N,
};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "gamerec")]
#[command(about = "Recommend games with similar genres, themes and modes", long_about = None)]
struct Cli {
    #[command(flatten)]
    source: Source,
    /// Print JSON instead of plain text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Source {
    /// Catalog CSV to load and fit at startup
    #[arg(long, global = true, default_value = "./data/games.csv")]
    catalog: String,
    /// Load a prebuilt snapshot directory instead of fitting the catalog
    #[arg(long, global = true)]
    snapshot: Option<String>,
    /// Column holding the serialized tag list
    #[arg(long, global = true, default_value = "genres")]
    tag_column: String,
    /// Stem tag terms before weighting
    #[arg(long, global = true, default_value_t = false)]
    stem: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit the catalog and write a snapshot directory
    Build {
        /// Output snapshot directory
        #[arg(long)]
        output: String,
    },
    /// Recommend games similar to a comma-separated list of liked games
    Recommend {
        /// Liked games, e.g. "Dredge, Portal 2"
        #[arg(long)]
        games: String,
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,
    },
    /// Find games whose name contains the query
    Search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// List the first games of the catalog
    List {
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },
    /// Show the tag weights of the game a name resolves to
    Inspect { name: String },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    let cli = Cli::parse();
    let recommender = load(&cli.source)?;

    match cli.command {
        Commands::Build { output } => {
            let meta = save_snapshot(&IndexPaths::new(&output), &recommender)?;
            tracing::info!(output = %output, items = meta.num_items, terms = meta.vocabulary_size, created_at = %meta.created_at, "snapshot built");
            println!("wrote {} games, {} terms to {}", meta.num_items, meta.vocabulary_size, output);
        }
        Commands::Recommend { games, top_n } => {
            let (items, unresolved) = recommend(&recommender, &games, top_n)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "recommendations": items, "unresolved": unresolved }))?);
            } else {
                for rec in &items {
                    println!("{}", rec.name);
                    if !rec.genres.is_empty() {
                        println!("    {}", rec.genres.join(", "));
                    }
                    if !rec.cover_url.is_empty() {
                        println!("    cover: {}", rec.cover_url);
                    }
                }
            }
        }
        Commands::Search { query, limit } => {
            let hits = recommender.search(&query, limit);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "results": hits }))?);
            } else {
                hits.iter().for_each(|h| println!("{}", h.name));
            }
        }
        Commands::List { limit } => {
            let names = recommender.list(limit);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "games": names }))?);
            } else {
                names.iter().for_each(|n| println!("{n}"));
            }
        }
        Commands::Inspect { name } => inspect(&recommender, &name, cli.json)?,
    }
    Ok(())
}

fn load(source: &Source) -> Result<Recommender> {
    let recommender = match &source.snapshot {
        Some(dir) => Recommender::from_snapshot(dir)?,
        None => {
            let config = EngineConfig {
                catalog: CatalogOptions { tag_column: source.tag_column.clone() },
                vectorizer: VectorizerConfig { stem: source.stem, ..VectorizerConfig::default() },
            };
            Recommender::load(&source.catalog, &config)?
        }
    };
    Ok(recommender)
}

/// Recommend for a comma-separated list of liked games. When nothing resolves
/// the sentinel record stands in for the results.
fn recommend(recommender: &Recommender, games: &str, top_n: usize) -> Result<(Vec<Recommendation>, Vec<String>)> {
    let games: Vec<String> = games.split(',').map(|g| g.trim().to_string()).collect();
    let (items, unresolved) = match recommender.recommend(games, top_n) {
        Ok(recs) => (recs.items, recs.unresolved),
        Err(RecommenderError::NoValidItemsFound { unresolved }) => (vec![Recommendation::no_valid_items()], unresolved),
        Err(e) => return Err(e.into()),
    };
    for name in &unresolved {
        tracing::warn!(game = %name, "no game matches");
    }
    Ok((items, unresolved))
}

fn inspect(recommender: &Recommender, name: &str, json: bool) -> Result<()> {
    let resolution = engine::resolver::resolve(&[name], recommender.catalog());
    let Some(hit) = resolution.resolved.first() else {
        anyhow::bail!("no game matches {name:?}");
    };
    let item = &recommender.catalog().items()[hit.index];
    let weights = recommender.model().term_weights(&item.tags_text);
    tracing::debug!(index = hit.index, terms = weights.len(), "inspecting");

    if json {
        let terms: serde_json::Map<String, serde_json::Value> =
            weights.iter().map(|(t, w)| (t.to_string(), serde_json::json!(w))).collect();
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "index": hit.index, "item": item, "weights": terms }))?);
    } else {
        println!("#{} {}", hit.index, item.name);
        println!("tags: {}", item.tags.join(", "));
        for (term, w) in weights {
            println!("  {term:<20} {w:.4}");
        }
    }
    Ok(())
}
