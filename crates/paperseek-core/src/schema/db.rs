use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{ObjectId, Paper, PaperId, SampleProvenance};
use crate::vector::{decode_vector, encode_vector, DistanceMetric};

use super::collection::{CollectionSchema, DataObject, Hit, NearVector, Property};
use super::migrations::MIGRATIONS;

const PAPER_COLUMNS: &str =
    "id, dataset_row, title, abstract, text, embedding, created_at, updated_at";

const COLLECTION_COLUMNS: &str = "name, properties, metric, dimension, model";

const SAMPLE_KEY: &str = "sample";
const EMBEDDING_MODEL_KEY: &str = "embedding.model";

/// A database connection holding staged papers and vector collections.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.configure()?;
        db.apply_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.configure()?;
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn configure(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(())
    }

    fn apply_migrations(&self) -> Result<()> {
        // Create migrations table if it doesn't exist
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                self.conn.execute_batch(migration.sql)?;
                self.conn.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    rusqlite::params![migration.version, migration.name],
                )?;
            }
        }

        Ok(())
    }
}

// Paper staging
impl Database {
    /// Insert papers in a single transaction, preserving their order.
    pub fn insert_papers(&self, papers: &[Paper]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO papers ({PAPER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ))?;
            for paper in papers {
                let dataset_row = i64::try_from(paper.dataset_row).map_err(|_| {
                    Error::InvalidData(format!("dataset row {} out of range", paper.dataset_row))
                })?;
                stmt.execute(rusqlite::params![
                    paper.id.to_string(),
                    dataset_row,
                    paper.title,
                    paper.abstract_text,
                    paper.text,
                    paper.embedding.as_deref().map(encode_vector),
                    paper.created_at.to_rfc3339(),
                    paper.updated_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(papers.len())
    }

    /// List all staged papers in sample order.
    pub fn list_papers(&self) -> Result<Vec<Paper>> {
        self.query_papers(&format!(
            "SELECT {PAPER_COLUMNS} FROM papers ORDER BY rowid"
        ))
    }

    /// List staged papers that have no embedding yet.
    pub fn list_unembedded_papers(&self) -> Result<Vec<Paper>> {
        self.query_papers(&format!(
            "SELECT {PAPER_COLUMNS} FROM papers WHERE embedding IS NULL ORDER BY rowid"
        ))
    }

    /// Store the embedding of a paper.
    pub fn set_paper_embedding(&self, id: &PaperId, embedding: &[f32]) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE papers SET embedding = ?2, updated_at = ?3 WHERE id = ?1",
            rusqlite::params![
                id.to_string(),
                encode_vector(embedding),
                Utc::now().to_rfc3339()
            ],
        )?;

        if updated == 0 {
            return Err(Error::NotFound {
                entity: "paper",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    pub fn count_papers(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM papers", rusqlite::params![])
    }

    pub fn count_embedded_papers(&self) -> Result<usize> {
        self.count(
            "SELECT COUNT(*) FROM papers WHERE embedding IS NOT NULL",
            rusqlite::params![],
        )
    }

    /// Remove every staged paper. Returns the number removed.
    pub fn clear_papers(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM papers", [])?)
    }

    /// Drop the embedding of every staged paper. Returns the number cleared.
    pub fn clear_embeddings(&self) -> Result<usize> {
        Ok(self.conn.execute(
            "UPDATE papers SET embedding = NULL, updated_at = ?1 WHERE embedding IS NOT NULL",
            [Utc::now().to_rfc3339()],
        )?)
    }

    fn query_papers(&self, sql: &str) -> Result<Vec<Paper>> {
        let mut stmt = self.conn.prepare(sql)?;
        let papers = stmt
            .query_map([], row_to_paper)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(papers)
    }

    fn count<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<usize> {
        let count: i64 = self.conn.query_row(sql, params, |row| row.get(0))?;
        usize::try_from(count).map_err(|_| Error::InvalidData(format!("invalid count {count}")))
    }
}

// Store metadata
impl Database {
    /// The sample the staged papers were drawn from, if recorded.
    pub fn sample_provenance(&self) -> Result<Option<SampleProvenance>> {
        self.get_meta(SAMPLE_KEY)?
            .map(|value| serde_json::from_str(&value).map_err(Error::from))
            .transpose()
    }

    pub fn set_sample_provenance(&self, provenance: &SampleProvenance) -> Result<()> {
        self.set_meta(SAMPLE_KEY, &serde_json::to_string(provenance)?)
    }

    /// The model the staged embeddings were computed with, if recorded.
    pub fn embedding_model(&self) -> Result<Option<String>> {
        self.get_meta(EMBEDDING_MODEL_KEY)
    }

    pub fn set_embedding_model(&self, model: &str) -> Result<()> {
        self.set_meta(EMBEDDING_MODEL_KEY, model)
    }

    fn get_meta(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT value FROM store_meta WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?)
    }

    fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO store_meta (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

// Collections
impl Database {
    /// Define a collection.
    ///
    /// Creating a collection that already exists with a compatible schema is
    /// a no-op; an incompatible schema is rejected.
    pub fn create_collection(&self, schema: &CollectionSchema) -> Result<()> {
        if let Some(existing) = self.get_collection(&schema.name)? {
            if existing.is_compatible_with(schema) {
                log::debug!("Collection {} already exists", schema.name);
                return Ok(());
            }
            return Err(Error::InvalidData(format!(
                "collection '{}' already exists with a different schema",
                schema.name
            )));
        }

        insert_collection_row(&self.conn, schema)?;
        log::info!(
            "Created collection {} ({} properties, {} metric)",
            schema.name,
            schema.properties.len(),
            schema.metric
        );
        Ok(())
    }

    /// Look up a collection by name.
    pub fn get_collection(&self, name: &str) -> Result<Option<CollectionSchema>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {COLLECTION_COLUMNS} FROM collections WHERE name = ?1"),
                [name],
                collection_row,
            )
            .optional()?;

        row.map(collection_from_row).transpose()
    }

    /// List every collection, ordered by name.
    pub fn list_collections(&self) -> Result<Vec<CollectionSchema>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM collections ORDER BY name"
        ))?;
        let rows = stmt
            .query_map([], collection_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(collection_from_row).collect()
    }

    /// Delete a collection and all of its objects.
    ///
    /// Returns `false` if the collection did not exist.
    pub fn delete_collection(&self, name: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM objects WHERE collection = ?1", [name])?;
        let deleted = tx.execute("DELETE FROM collections WHERE name = ?1", [name])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    /// Redefine a collection and fill it with `objects` in one transaction.
    ///
    /// Objects are validated against `schema` before anything is written; on
    /// any failure the previous collection and its objects are left intact.
    pub fn replace_collection(
        &self,
        schema: &CollectionSchema,
        objects: &[DataObject],
    ) -> Result<usize> {
        let mut stored = schema.clone();
        if let Some(dimension) = validate_objects(schema, objects)? {
            stored.dimension = Some(dimension);
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM objects WHERE collection = ?1", [&stored.name])?;
        tx.execute("DELETE FROM collections WHERE name = ?1", [&stored.name])?;
        insert_collection_row(&tx, &stored)?;
        write_objects(&tx, &stored.name, objects)?;
        tx.commit()?;

        log::info!(
            "Replaced collection {} with {} objects ({} metric)",
            stored.name,
            objects.len(),
            stored.metric
        );
        Ok(objects.len())
    }

    fn require_collection(&self, name: &str) -> Result<CollectionSchema> {
        self.get_collection(name)?.ok_or_else(|| Error::NotFound {
            entity: "collection",
            id: name.to_string(),
        })
    }
}

// Objects
impl Database {
    /// Bulk-insert objects into a collection in a single transaction.
    ///
    /// Every vector must match the collection dimension. When the collection
    /// has no dimension yet, the first object fixes it.
    pub fn insert_objects(&self, collection: &str, objects: &[DataObject]) -> Result<usize> {
        let schema = self.require_collection(collection)?;
        let Some(dimension) = validate_objects(&schema, objects)? else {
            return Ok(0);
        };

        let tx = self.conn.unchecked_transaction()?;
        if schema.dimension.is_none() {
            tx.execute(
                "UPDATE collections SET dimension = ?2 WHERE name = ?1",
                rusqlite::params![collection, dimension_to_sql(dimension)?],
            )?;
        }
        write_objects(&tx, collection, objects)?;
        tx.commit()?;

        log::debug!("Inserted {} objects into {}", objects.len(), collection);
        Ok(objects.len())
    }

    pub fn count_objects(&self, collection: &str) -> Result<usize> {
        self.count(
            "SELECT COUNT(*) FROM objects WHERE collection = ?1",
            [collection],
        )
    }

    /// Exact nearest-vector search over a collection.
    ///
    /// Returns at most `query.limit` hits ordered by ascending distance.
    pub fn near_vector(&self, collection: &str, query: &NearVector) -> Result<Vec<Hit>> {
        let schema = self.require_collection(collection)?;
        let Some(dimension) = schema.dimension else {
            return Ok(Vec::new());
        };
        if query.vector.len() != dimension {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                actual: query.vector.len(),
            });
        }
        if query.limit == 0 {
            return Ok(Vec::new());
        }

        let mut stmt = self
            .conn
            .prepare("SELECT id, properties, vector FROM objects WHERE collection = ?1")?;
        let rows = stmt
            .query_map([collection], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut hits = Vec::with_capacity(rows.len());
        for (id, properties, blob) in rows {
            let vector = decode_vector(&blob)?;
            let distance = schema.metric.distance(&query.vector, &vector)?;
            if query.max_distance.is_some_and(|max| distance > max) {
                continue;
            }
            hits.push(Hit {
                id: id
                    .parse::<ObjectId>()
                    .map_err(|e| Error::InvalidData(format!("invalid object id {id}: {e}")))?,
                properties: serde_json::from_str(&properties)?,
                distance,
                certainty: schema.metric.certainty(distance),
            });
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(query.limit);
        Ok(hits)
    }
}

fn dimension_to_sql(dimension: usize) -> Result<i64> {
    i64::try_from(dimension)
        .map_err(|_| Error::InvalidData(format!("dimension {dimension} out of range")))
}

/// Check vectors and properties against `schema`.
///
/// Returns the dimension the objects share, or `None` when there are none.
fn validate_objects(schema: &CollectionSchema, objects: &[DataObject]) -> Result<Option<usize>> {
    let Some(first) = objects.first() else {
        return Ok(None);
    };

    let dimension = schema.dimension.unwrap_or(first.vector.len());
    if dimension == 0 {
        return Err(Error::InvalidData("vectors must not be empty".to_string()));
    }

    for object in objects {
        if object.vector.len() != dimension {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                actual: object.vector.len(),
            });
        }
        schema.validate_properties(&object.properties)?;
    }
    Ok(Some(dimension))
}

fn write_objects(conn: &Connection, collection: &str, objects: &[DataObject]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO objects (id, collection, properties, vector, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    let now = Utc::now().to_rfc3339();
    for object in objects {
        stmt.execute(rusqlite::params![
            object.id.to_string(),
            collection,
            serde_json::to_string(&object.properties)?,
            encode_vector(&object.vector),
            now,
        ])?;
    }
    Ok(())
}

fn insert_collection_row(conn: &Connection, schema: &CollectionSchema) -> Result<()> {
    let dimension = schema.dimension.map(dimension_to_sql).transpose()?;
    conn.execute(
        "INSERT INTO collections (name, properties, metric, dimension, model, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            schema.name,
            serde_json::to_string(&schema.properties)?,
            schema.metric.as_str(),
            dimension,
            schema.model,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

type CollectionRow = (String, String, String, Option<i64>, Option<String>);

fn collection_row(row: &rusqlite::Row) -> rusqlite::Result<CollectionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn collection_from_row(
    (name, properties, metric, dimension, model): CollectionRow,
) -> Result<CollectionSchema> {
    let properties: Vec<Property> = serde_json::from_str(&properties)?;
    let dimension = dimension
        .map(|d| {
            usize::try_from(d)
                .map_err(|_| Error::InvalidData(format!("invalid dimension {d} for {name}")))
        })
        .transpose()?;

    Ok(CollectionSchema {
        properties,
        metric: metric.parse::<DistanceMetric>()?,
        dimension,
        model,
        name,
    })
}

fn conversion_error<E>(idx: usize, ty: Type, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(Into::into)
        .map_err(|e| conversion_error(idx, Type::Text, e))
}

fn row_to_paper(row: &rusqlite::Row) -> rusqlite::Result<Paper> {
    let id_str: String = row.get(0)?;
    let dataset_row: i64 = row.get(1)?;
    let embedding: Option<Vec<u8>> = row.get(5)?;
    let created_at_str: String = row.get(6)?;
    let updated_at_str: String = row.get(7)?;

    Ok(Paper {
        id: id_str
            .parse::<PaperId>()
            .map_err(|e| conversion_error(0, Type::Text, e))?,
        dataset_row: u64::try_from(dataset_row)
            .map_err(|e| conversion_error(1, Type::Integer, e))?,
        title: row.get(2)?,
        abstract_text: row.get(3)?,
        text: row.get(4)?,
        embedding: embedding
            .map(|blob| decode_vector(&blob))
            .transpose()
            .map_err(|e| conversion_error(5, Type::Blob, e))?,
        created_at: parse_timestamp(6, &created_at_str)?,
        updated_at: parse_timestamp(7, &updated_at_str)?,
    })
}
