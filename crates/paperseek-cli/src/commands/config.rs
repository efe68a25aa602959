use anyhow::{Context, Result};
use paperseek_etl::{config, Config};
use serde_json::Value;
use toml_edit::DocumentMut;

/// Show the current effective configuration.
pub fn show_config(config: &Config) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    let config_path = config::config_file_path();
    println!("Config file: {}", config_path.display());
    let exists = config_path.exists();
    println!("File exists: {}\n", if exists { "yes" } else { "no (using defaults)" });

    println!("Settings:");
    println!("  database_path: {}", config.database_path.display());
    println!(
        "  dataset: {} ({}/{})",
        config.dataset.name, config.dataset.subset, config.dataset.split
    );
    println!(
        "  dataset.columns: {}, {}",
        config.dataset.title_column, config.dataset.abstract_column
    );
    if let Some(path) = &config.dataset.local_file {
        println!("  dataset.local_file: {}", path.display());
    }
    println!("  sampling.seed: {}", config.sampling.seed);
    println!("  sampling.size: {}", config.sampling.size);
    println!("  embedding.model: {}", config.embedding.model);
    println!("  embedding.batch_size: {}", config.embedding.batch_size);
    println!("  search.limit: {}", config.search.limit);
    println!("  search.metric: {}", config.search.metric);
    match config.search.max_distance {
        Some(max) => println!("  search.max_distance: {max}"),
        None => println!("  search.max_distance: <not set>"),
    }
    println!("  logging.level: {:?}", config.logging.level());
    println!("  logging.coloured: {}", config.logging.coloured());
    println!("  logging.output: {:?}", config.logging.output());

    println!("\nPriority: CLI args > ENV vars (PAPERSEEK_*) > Config file > Defaults");

    Ok(())
}

/// Get a config value by dotted key, or print the config file.
pub fn get_config(config: &Config, key: Option<String>) -> Result<()> {
    if let Some(key) = key {
        let value = serde_json::to_value(config)?;
        match lookup(&value, &key) {
            Some(Value::Null) => println!("<not set>"),
            Some(Value::String(s)) => println!("{s}"),
            Some(other) => println!("{other}"),
            None => anyhow::bail!("Unknown config key: {key}"),
        }
    } else {
        let config_path = config::config_file_path();

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            print!("{contents}");
        } else {
            println!("Config file does not exist: {}", config_path.display());
            println!("\nRun 'paperseek config init' to create it.");
        }
    }

    Ok(())
}

/// Set a config value by dotted key, keeping the file's comments and layout.
pub fn set_config(key: &str, value: &str) -> Result<()> {
    let defaults = serde_json::to_value(Config::default())?;
    let Some(default) = lookup(&defaults, key) else {
        anyhow::bail!("Unknown config key: {key}");
    };
    let item = typed_value(default, value);

    let config_path = config::config_file_path();
    config::ensure_config_file()?;

    let contents = std::fs::read_to_string(&config_path).context("Failed to read config file")?;
    let mut doc: DocumentMut = contents.parse().context("Failed to parse config file")?;
    set_dotted(&mut doc, key, item)?;

    std::fs::write(&config_path, doc.to_string()).context("Failed to write config file")?;

    println!("✓ Updated {key} = {value}");
    println!("  in {}", config_path.display());

    Ok(())
}

/// Show the config file path.
pub fn show_path() {
    println!("{}", config::config_file_path().display());
}

/// Show example configuration.
pub fn show_example() {
    print!("{}", config::example_config());
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure paperseek.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}

fn lookup<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(value, |current, part| current.as_object()?.get(part))
}

/// Convert the raw CLI string to a TOML value shaped like the default.
fn typed_value(default: &Value, raw: &str) -> toml_edit::Value {
    if !default.is_string() {
        if let Ok(b) = raw.parse::<bool>() {
            return b.into();
        }
        if let Ok(i) = raw.parse::<i64>() {
            return i.into();
        }
        if let Ok(f) = raw.parse::<f64>() {
            return f.into();
        }
    }
    raw.into()
}

fn set_dotted(doc: &mut DocumentMut, key: &str, value: toml_edit::Value) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((last, tables)) = parts.split_last() else {
        anyhow::bail!("Empty config key");
    };

    let mut table = doc.as_table_mut();
    for name in tables {
        table = table
            .entry(name)
            .or_insert(toml_edit::table())
            .as_table_mut()
            .ok_or_else(|| anyhow::anyhow!("{name} is not a table in the config file"))?;
    }
    // Replace in place so the key keeps its leading comments
    match table.get_mut(last) {
        Some(item) => *item = toml_edit::Item::Value(value),
        None => {
            table.insert(last, toml_edit::Item::Value(value));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_dotted_keys() {
        let value = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(lookup(&value, "sampling.seed"), Some(&Value::from(42)));
        assert_eq!(lookup(&value, "search.max_distance"), Some(&Value::Null));
        assert!(lookup(&value, "sampling.missing").is_none());
        assert!(lookup(&value, "nope").is_none());
    }

    #[test]
    fn test_typed_value_follows_default() {
        let number = typed_value(&Value::from(42), "7");
        assert_eq!(number.as_integer(), Some(7));

        let float = typed_value(&Value::Null, "0.5");
        assert_eq!(float.as_float(), Some(0.5));

        // String settings stay strings even when they look numeric
        let text = typed_value(&Value::from("all-MiniLM-L6-v2"), "123");
        assert_eq!(text.as_str(), Some("123"));
    }

    #[test]
    fn test_set_dotted_keeps_comments() {
        let mut doc: DocumentMut = "# top comment\n[sampling]\n# the seed\nseed = 42\nsize = 100\n"
            .parse()
            .unwrap();

        set_dotted(&mut doc, "sampling.seed", 7i64.into()).unwrap();
        set_dotted(&mut doc, "embedding.model", "BAAI/bge-small-en-v1.5".into()).unwrap();

        let rendered = doc.to_string();
        assert!(rendered.contains("# top comment"));
        assert!(rendered.contains("# the seed"));
        assert!(rendered.contains("seed = 7"));
        assert!(rendered.contains("size = 100"));
        assert!(rendered.contains("[embedding]"));
        assert!(rendered.contains(r#"model = "BAAI/bge-small-en-v1.5""#));
    }

    #[test]
    fn test_set_dotted_rejects_non_table() {
        let mut doc: DocumentMut = "database_path = \"/tmp/a.db\"\n".parse().unwrap();
        let err = set_dotted(&mut doc, "database_path.inner", 1i64.into());
        assert!(err.is_err());
    }
}
