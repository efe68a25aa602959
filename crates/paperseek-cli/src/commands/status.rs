use anyhow::Result;
use paperseek_core::model::PAPER_COLLECTION;
use paperseek_core::schema::Database;
use paperseek_etl::Config;

pub fn show_status(config: &Config) -> Result<()> {
    let db_path = &config.database_path;

    println!("\n📊 Paperseek Status\n");
    println!("  Database: {}", db_path.display());

    if !db_path.exists() {
        println!("  No database yet.");
        println!("\n  Run `paperseek ingest` to sample and index papers");
        return Ok(());
    }

    let db = Database::open(db_path)?;
    let staged = db.count_papers()?;
    let embedded = db.count_embedded_papers()?;

    println!("  Papers staged: {staged}");
    println!("  Papers embedded: {embedded}");
    if let Some(sample) = db.sample_provenance()? {
        println!("  Sample: {sample}");
    }

    match db.get_collection(PAPER_COLLECTION)? {
        Some(schema) => {
            println!("\n  Collection: {}", schema.name);
            println!("    Objects: {}", db.count_objects(&schema.name)?);
            println!("    Metric: {}", schema.metric);
            println!("    Model: {}", schema.model.as_deref().unwrap_or("<unknown>"));
            match schema.dimension {
                Some(dimension) => println!("    Dimension: {dimension}"),
                None => println!("    Dimension: <empty>"),
            }
            let properties: Vec<&str> = schema.properties.iter().map(|p| p.name.as_str()).collect();
            println!("    Properties: {}", properties.join(", "));
        }
        None => println!("\n  Collection {PAPER_COLLECTION} has not been created"),
    }

    if staged == 0 || embedded < staged {
        println!("\n  Run `paperseek ingest` to finish the pipeline");
    }

    Ok(())
}
