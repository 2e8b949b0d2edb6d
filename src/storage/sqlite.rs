//! SQLite-backed stores
//!
//! `SqliteGraphStore` persists the literature graph in two tables (nodes,
//! edges) with adjacency answered from either endpoint. Behind the
//! `embeddings` feature, `SqliteChunkIndex` serves both retrieval
//! modalities from one database: an FTS5 table with bm25() for the sparse
//! sub-query and a sqlite-vec vec0 virtual table for the dense sub-query.
//!
//! Vectors are L2-normalized on insert so vec0's L2 distance converts to
//! cosine similarity: `sim = 1 - dist² / 2`. Both stores use WAL mode and
//! their own connection.

use super::traits::{GraphStore, Neighbor, StoreError, StoreResult};
use crate::graph::{passes_weight, GraphNode, NodeId, NodeKind, Relationship, RelationshipKind};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Node and edge counts for a graph database
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct GraphStats {
    pub papers: usize,
    pub concepts: usize,
    pub methods: usize,
    pub research_areas: usize,
    pub edges: usize,
}

/// Persistent knowledge graph store backed by SQLite
pub struct SqliteGraphStore {
    conn: Mutex<Connection>,
}

impl SqliteGraphStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Create an in-memory store (useful for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             CREATE TABLE IF NOT EXISTS nodes (
                 id       TEXT PRIMARY KEY,
                 kind     TEXT NOT NULL,
                 name     TEXT NOT NULL,
                 category TEXT
             );
             CREATE TABLE IF NOT EXISTS edges (
                 source TEXT NOT NULL,
                 target TEXT NOT NULL,
                 kind   TEXT NOT NULL,
                 weight INTEGER NOT NULL DEFAULT 1,
                 PRIMARY KEY (source, target, kind)
             );
             CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source);
             CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert or replace a node
    pub fn upsert_node(&self, node: &GraphNode) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO nodes (id, kind, name, category) VALUES (?1, ?2, ?3, ?4)",
            params![
                node.id.as_str(),
                node.kind.as_str(),
                node.name,
                node.category
            ],
        )?;
        Ok(())
    }

    /// Insert or replace a relationship
    pub fn upsert_relationship(&self, rel: &Relationship) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO edges (source, target, kind, weight) VALUES (?1, ?2, ?3, ?4)",
            params![
                rel.source.as_str(),
                rel.target.as_str(),
                rel.kind.as_str(),
                rel.weight
            ],
        )?;
        Ok(())
    }

    /// Node and edge counts, for diagnostics
    pub fn stats(&self) -> StoreResult<GraphStats> {
        let conn = self.conn.lock().unwrap();
        let mut stats = GraphStats::default();
        let mut stmt = conn.prepare("SELECT kind, COUNT(*) FROM nodes GROUP BY kind")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, usize>(1)?))
        })?;
        for row in rows {
            let (kind, count) = row?;
            match NodeKind::parse(&kind) {
                Some(NodeKind::Paper) => stats.papers = count,
                Some(NodeKind::Concept) => stats.concepts = count,
                Some(NodeKind::Method) => stats.methods = count,
                Some(NodeKind::ResearchArea) => stats.research_areas = count,
                None => {}
            }
        }
        stats.edges = conn.query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        Ok(stats)
    }
}

fn node_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String, Option<String>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn build_node(
    id: String,
    kind: String,
    name: String,
    category: Option<String>,
) -> StoreResult<GraphNode> {
    let kind = NodeKind::parse(&kind)
        .ok_or_else(|| StoreError::Malformed(format!("unknown node kind '{}' for {}", kind, id)))?;
    Ok(GraphNode {
        id: NodeId::from_string(id),
        kind,
        name,
        category,
    })
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn get_node(&self, id: &NodeId) -> StoreResult<Option<GraphNode>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, kind, name, category FROM nodes WHERE id = ?1",
                params![id.as_str()],
                node_from_row,
            )
            .optional()?;
        match row {
            Some((id, kind, name, category)) => Ok(Some(build_node(id, kind, name, category)?)),
            None => Ok(None),
        }
    }

    async fn neighbors(
        &self,
        id: &NodeId,
        kinds: &[RelationshipKind],
        min_weight: u32,
    ) -> StoreResult<Vec<Neighbor>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT n.id, n.kind, n.name, n.category, e.kind, e.weight
             FROM edges e
             JOIN nodes n
               ON n.id = CASE WHEN e.source = ?1 THEN e.target ELSE e.source END
             WHERE e.source = ?1 OR e.target = ?1",
        )?;
        let rows = stmt.query_map(params![id.as_str()], |row| {
            let node = node_from_row(row)?;
            let edge_kind: String = row.get(4)?;
            let weight: u32 = row.get(5)?;
            Ok((node, edge_kind, weight))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let ((nid, nkind, name, category), edge_kind, weight) = row?;
            let Some(kind) = RelationshipKind::parse(&edge_kind) else {
                return Err(StoreError::Malformed(format!(
                    "unknown relationship kind '{}'",
                    edge_kind
                )));
            };
            if !kinds.contains(&kind) || !passes_weight(kind, weight, min_weight) {
                continue;
            }
            out.push(Neighbor {
                node: build_node(nid, nkind, name, category)?,
                kind,
                weight,
            });
        }

        out.sort_by(|a, b| a.node.id.cmp(&b.node.id));
        Ok(out)
    }
}

#[cfg(feature = "embeddings")]
mod chunk_index {
    use super::super::traits::{ChunkIndex, PaperFilter, StoreError, StoreResult};
    use crate::graph::NodeId;
    use crate::retrieval::types::{ChunkId, ChunkRecord};
    use async_trait::async_trait;
    use rusqlite::{params, params_from_iter, Connection};
    use sqlite_vec::sqlite3_vec_init;
    use std::path::Path;
    use std::sync::Mutex;

    /// Default embedding dimensions (nomic-embed-text-v1.5 produces 768-dim vectors).
    pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 768;

    /// KNN over-fetch floor: vec0 cannot take a paper-id set predicate, so
    /// the dense query fetches extra rows and filters afterwards.
    const KNN_OVERFETCH: usize = 64;

    /// Register the sqlite-vec extension globally (safe under parallel test execution).
    fn register_vec_extension() {
        use std::sync::Once;
        static INIT: Once = Once::new();
        INIT.call_once(|| unsafe {
            rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
                sqlite3_vec_init as *const (),
            )));
        });
    }

    /// Reinterpret a `&[f32]` slice as raw bytes for sqlite-vec blob parameters.
    ///
    /// # Safety
    /// f32 has no padding and a fixed layout; this is a trivial reinterpretation.
    fn f32_slice_as_bytes(slice: &[f32]) -> &[u8] {
        unsafe { std::slice::from_raw_parts(slice.as_ptr() as *const u8, slice.len() * 4) }
    }

    /// L2-normalize a vector in place.
    fn l2_normalize(v: &mut [f32]) {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
    }

    /// Build a safe FTS5 MATCH expression from free text: each token quoted,
    /// tokens OR'd together.
    fn fts_match_expr(text: &str) -> String {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| format!("\"{}\"", t))
            .collect::<Vec<_>>()
            .join(" OR ")
    }

    /// Persistent dense+sparse chunk index backed by SQLite
    ///
    /// One database, three tables: chunk payloads, an FTS5 shadow for
    /// bm25() ranking, and a vec0 table for KNN.
    pub struct SqliteChunkIndex {
        conn: Mutex<Connection>,
        dimensions: usize,
    }

    impl SqliteChunkIndex {
        /// Open or create an index at the given path
        pub fn open(path: impl AsRef<Path>, dimensions: usize) -> StoreResult<Self> {
            register_vec_extension();
            let conn = Connection::open(path)?;
            Self::init(conn, dimensions)
        }

        /// Create an in-memory index (useful for testing)
        pub fn open_in_memory(dimensions: usize) -> StoreResult<Self> {
            register_vec_extension();
            let conn = Connection::open_in_memory()?;
            Self::init(conn, dimensions)
        }

        fn init(conn: Connection, dimensions: usize) -> StoreResult<Self> {
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS chunks (
                     id       TEXT PRIMARY KEY,
                     paper_id TEXT NOT NULL,
                     body     TEXT NOT NULL
                 );
                 CREATE VIRTUAL TABLE IF NOT EXISTS fts_chunks
                     USING fts5(body, chunk_id UNINDEXED, paper_id UNINDEXED);",
            )?;
            let create_vec = format!(
                "CREATE VIRTUAL TABLE IF NOT EXISTS vec_chunks USING vec0(\
                     chunk_id TEXT,\
                     embedding float[{}]\
                 )",
                dimensions
            );
            conn.execute_batch(&create_vec)?;
            Ok(Self {
                conn: Mutex::new(conn),
                dimensions,
            })
        }

        /// The dimensionality of vectors stored in this index.
        pub fn dimensions(&self) -> usize {
            self.dimensions
        }

        /// Insert a chunk with its embedding into all three tables
        pub fn insert_chunk(&self, record: &ChunkRecord, embedding: &[f32]) -> StoreResult<()> {
            if embedding.len() != self.dimensions {
                return Err(StoreError::Malformed(format!(
                    "embedding for chunk {} has {} dimensions, index expects {}",
                    record.id,
                    embedding.len(),
                    self.dimensions
                )));
            }
            let mut normalized = embedding.to_vec();
            l2_normalize(&mut normalized);

            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT OR REPLACE INTO chunks (id, paper_id, body) VALUES (?1, ?2, ?3)",
                params![record.id.as_str(), record.paper_id.as_str(), record.text],
            )?;
            // FTS5 has no conflict clause; drop any prior row for this chunk.
            conn.execute(
                "DELETE FROM fts_chunks WHERE chunk_id = ?1",
                params![record.id.as_str()],
            )?;
            conn.execute(
                "INSERT INTO fts_chunks (body, chunk_id, paper_id) VALUES (?1, ?2, ?3)",
                params![record.text, record.id.as_str(), record.paper_id.as_str()],
            )?;
            conn.execute(
                "INSERT OR REPLACE INTO vec_chunks (chunk_id, embedding) VALUES (?1, ?2)",
                params![record.id.as_str(), f32_slice_as_bytes(&normalized)],
            )?;
            Ok(())
        }

        /// Number of indexed chunks
        pub fn chunk_count(&self) -> StoreResult<usize> {
            let conn = self.conn.lock().unwrap();
            Ok(conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?)
        }
    }

    #[async_trait]
    impl ChunkIndex for SqliteChunkIndex {
        async fn dense_query(
            &self,
            embedding: &[f32],
            top_k: usize,
            filter: Option<&PaperFilter>,
        ) -> StoreResult<Vec<(ChunkId, f32)>> {
            if embedding.len() != self.dimensions {
                return Err(StoreError::Malformed(format!(
                    "query embedding has {} dimensions, index expects {}",
                    embedding.len(),
                    self.dimensions
                )));
            }
            let mut normalized = embedding.to_vec();
            l2_normalize(&mut normalized);

            let fetch = if filter.is_some() {
                (top_k * 4).max(KNN_OVERFETCH)
            } else {
                top_k.max(1)
            };

            let conn = self.conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT chunk_id, distance FROM vec_chunks
                 WHERE embedding MATCH ?1 AND k = ?2",
            )?;
            let rows = stmt.query_map(params![f32_slice_as_bytes(&normalized), fetch], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f32>(1)?))
            })?;
            let hits: Vec<(String, f32)> = rows.collect::<Result<_, _>>()?;

            let mut paper_of = conn.prepare("SELECT paper_id FROM chunks WHERE id = ?1")?;
            let mut out = Vec::new();
            for (id, distance) in hits {
                if let Some(allowed) = filter {
                    let paper: String =
                        paper_of.query_row(params![id], |row| row.get(0))?;
                    if !allowed.contains(&NodeId::from_string(paper)) {
                        continue;
                    }
                }
                // L2 distance on unit vectors → cosine similarity.
                let similarity = 1.0 - (distance * distance) / 2.0;
                out.push((ChunkId::from_string(id), similarity));
            }
            out.truncate(top_k);
            Ok(out)
        }

        async fn sparse_query(
            &self,
            text: &str,
            top_k: usize,
            filter: Option<&PaperFilter>,
        ) -> StoreResult<Vec<(ChunkId, f32)>> {
            let expr = fts_match_expr(text);
            if expr.is_empty() {
                return Ok(Vec::new());
            }

            let conn = self.conn.lock().unwrap();
            let mut out = Vec::new();
            match filter {
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT chunk_id, bm25(fts_chunks) FROM fts_chunks
                         WHERE fts_chunks MATCH ?1
                         ORDER BY bm25(fts_chunks) LIMIT ?2",
                    )?;
                    let rows = stmt.query_map(params![expr, top_k], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, f32>(1)?))
                    })?;
                    for row in rows {
                        let (id, rank) = row?;
                        out.push((ChunkId::from_string(id), -rank));
                    }
                }
                Some(allowed) => {
                    let placeholders = vec!["?"; allowed.len()].join(",");
                    let sql = format!(
                        "SELECT chunk_id, bm25(fts_chunks) FROM fts_chunks
                         WHERE fts_chunks MATCH ? AND paper_id IN ({})
                         ORDER BY bm25(fts_chunks) LIMIT {}",
                        placeholders, top_k
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let params_iter = std::iter::once(expr.clone())
                        .chain(allowed.iter().map(|p| p.as_str().to_string()));
                    let rows = stmt.query_map(params_from_iter(params_iter), |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, f32>(1)?))
                    })?;
                    for row in rows {
                        let (id, rank) = row?;
                        out.push((ChunkId::from_string(id), -rank));
                    }
                }
            }
            Ok(out)
        }

        async fn load_chunks(&self, ids: &[ChunkId]) -> StoreResult<Vec<ChunkRecord>> {
            let conn = self.conn.lock().unwrap();
            let mut stmt =
                conn.prepare("SELECT id, paper_id, body FROM chunks WHERE id = ?1")?;
            let mut out = Vec::with_capacity(ids.len());
            for id in ids {
                let row = stmt
                    .query_row(params![id.as_str()], |row| {
                        Ok(ChunkRecord {
                            id: ChunkId::from_string(row.get::<_, String>(0)?),
                            paper_id: NodeId::from_string(row.get::<_, String>(1)?),
                            text: row.get(2)?,
                        })
                    })
                    .map_err(|e| match e {
                        rusqlite::Error::QueryReturnedNoRows => {
                            StoreError::Malformed(format!("unknown chunk id {}", id))
                        }
                        other => StoreError::Database(other),
                    })?;
                out.push(row);
            }
            Ok(out)
        }
    }

}

#[cfg(feature = "embeddings")]
pub use chunk_index::{SqliteChunkIndex, DEFAULT_EMBEDDING_DIMENSIONS};
