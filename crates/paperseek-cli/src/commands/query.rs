use anyhow::{Context, Result};
use paperseek_core::schema::Database;
use paperseek_etl::Config;
use paperseek_search::{Embedder, QueryRunner, SearchHit};

#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    pub limit: usize,
    pub max_distance: Option<f32>,
    pub json: bool,
}

/// Embed `text` and print the titles of the nearest papers.
pub fn run_query(
    config: &Config,
    mut embedder: Box<dyn Embedder>,
    text: &str,
    options: &QueryOptions,
) -> Result<()> {
    if !config.database_path.exists() {
        anyhow::bail!(
            "Database not found: {}\n\nRun 'paperseek ingest' first.",
            config.database_path.display()
        );
    }
    let db = Database::open(&config.database_path)?;

    let hits = QueryRunner::new()
        .with_limit(options.limit)
        .with_max_distance(options.max_distance)
        .run(&db, embedder.as_mut(), text)
        .context("Query failed")?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else {
        print_hits(text, &hits);
    }

    Ok(())
}

fn print_hits(text: &str, hits: &[SearchHit]) {
    println!("\n🔎 Papers closest to \"{text}\"\n");

    if hits.is_empty() {
        println!("  No matching papers.");
        return;
    }

    for (rank, hit) in hits.iter().enumerate() {
        match hit.certainty {
            Some(certainty) => println!(
                "  {:>2}. {}  (distance {:.4}, certainty {:.4})",
                rank + 1,
                hit.title,
                hit.distance,
                certainty
            ),
            None => println!(
                "  {:>2}. {}  (distance {:.4})",
                rank + 1,
                hit.title,
                hit.distance
            ),
        }
    }
}
