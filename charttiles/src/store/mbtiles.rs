//! Single-file MBTiles database used as the tile cache backend.
//!
//! Layout is the deduplicated MBTiles schema: `map` rows reference
//! content-addressed blobs in `images`, plus the standard `tiles` view so
//! the file stays readable by stock MBTiles tooling. Rows use the TMS
//! row convention on disk; the XYZ/TMS flip happens only inside this
//! module.

use super::StoreError;
use crate::coord::{flip_row, tile_at, tile_to_bbox, Tile};
use crate::region::{polygon_bbox, rect_intersects_polygon, Polygon};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Metadata written into the MBTiles `metadata` table on open.
#[derive(Debug, Clone)]
pub struct StoreMetadata {
    pub name: String,
    pub format: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl StoreMetadata {
    pub fn new(name: impl Into<String>, format: impl Into<String>, min_zoom: u8, max_zoom: u8) -> Self {
        Self {
            name: name.into(),
            format: format.into(),
            min_zoom,
            max_zoom,
        }
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS metadata (
  name TEXT NOT NULL,
  value TEXT NOT NULL,
  UNIQUE (name)
);
CREATE TABLE IF NOT EXISTS map (
  zoom_level INTEGER NOT NULL,
  tile_column INTEGER NOT NULL,
  tile_row INTEGER NOT NULL,
  tile_id TEXT NOT NULL,
  UNIQUE (zoom_level, tile_column, tile_row)
);
CREATE TABLE IF NOT EXISTS images (
  tile_id TEXT NOT NULL PRIMARY KEY,
  tile_data BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS map_tile_id ON map (tile_id);
CREATE VIEW IF NOT EXISTS tiles AS
  SELECT map.zoom_level, map.tile_column, map.tile_row, images.tile_data
  FROM map JOIN images ON map.tile_id = images.tile_id;
";

// Tuned for a long-lived single-writer cache file: WAL with relaxed
// syncs, a 20 MB page cache, 4 KiB pages, and a 256 MiB mmap window.
const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA temp_store = MEMORY;
PRAGMA locking_mode = EXCLUSIVE;
PRAGMA cache_size = -20000;
PRAGMA page_size = 4096;
PRAGMA mmap_size = 268435456;
PRAGMA auto_vacuum = INCREMENTAL;
";

/// A single MBTiles cache file.
///
/// All access goes through one connection guarded by a mutex, which is
/// also what serializes deletes against concurrent seeds on the same
/// store.
pub struct MbtilesStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl fmt::Debug for MbtilesStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MbtilesStore")
            .field("path", &self.path)
            .finish()
    }
}

impl MbtilesStore {
    /// Opens an existing MBTiles file or creates a new one, applying the
    /// cache pragmas and writing provider metadata.
    pub fn open(path: impl AsRef<Path>, meta: &StoreMetadata) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let open_err = |source| StoreError::Open {
            path: path.clone(),
            source,
        };

        let conn = Connection::open(&path).map_err(open_err)?;
        conn.execute_batch(PRAGMAS).map_err(open_err)?;
        conn.execute_batch(SCHEMA).map_err(open_err)?;

        {
            let mut stmt = conn
                .prepare("INSERT OR REPLACE INTO metadata (name, value) VALUES (?1, ?2)")
                .map_err(open_err)?;
            let rows: [(&str, String); 6] = [
                ("name", meta.name.clone()),
                ("type", "overlay".to_string()),
                ("version", "1".to_string()),
                ("format", meta.format.clone()),
                ("minzoom", meta.min_zoom.to_string()),
                ("maxzoom", meta.max_zoom.to_string()),
            ];
            for (name, value) in rows {
                stmt.execute(params![name, value]).map_err(open_err)?;
            }
        }

        debug!(path = %path.display(), "opened MBTiles store");
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads a tile; `Ok(None)` means the tile is absent.
    pub fn get_tile(&self, tile: &Tile) -> Result<Option<Vec<u8>>, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT images.tile_data FROM map
             JOIN images ON map.tile_id = images.tile_id
             WHERE map.zoom_level = ?1 AND map.tile_column = ?2 AND map.tile_row = ?3",
            params![tile.zoom, tile.x, tile.tms_row()],
            |row| row.get::<_, Vec<u8>>(0),
        )
        .optional()
        .map_err(StoreError::Read)
    }

    /// Writes a tile, deduplicating the blob by content hash. Idempotent;
    /// re-writing the same coordinates replaces the mapping.
    pub fn put_tile(&self, tile: &Tile, bytes: &[u8]) -> Result<(), StoreError> {
        let tile_id = format!("{:x}", Sha256::digest(bytes));

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(StoreError::Write)?;
        tx.execute(
            "INSERT OR IGNORE INTO images (tile_id, tile_data) VALUES (?1, ?2)",
            params![tile_id, bytes],
        )
        .map_err(StoreError::Write)?;
        tx.execute(
            "INSERT OR REPLACE INTO map (zoom_level, tile_column, tile_row, tile_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![tile.zoom, tile.x, tile.tms_row(), tile_id],
        )
        .map_err(StoreError::Write)?;
        tx.commit().map_err(StoreError::Write)
    }

    /// Deletes the `map` rows of a tile sequence in transactions of
    /// `chunk_size`, reporting the cumulative count after each chunk.
    ///
    /// `on_progress` returns whether to continue; a `false` stops between
    /// chunks (cooperative cancellation). `images` rows are left behind
    /// for [`MbtilesStore::purge_orphan_images`].
    pub fn delete_tiles_in_chunks(
        &self,
        tiles: impl Iterator<Item = Tile>,
        chunk_size: usize,
        mut on_progress: impl FnMut(u64) -> bool,
    ) -> Result<u64, StoreError> {
        let mut total = 0u64;
        let mut tiles = tiles.peekable();

        while tiles.peek().is_some() {
            let batch: Vec<Tile> = tiles.by_ref().take(chunk_size).collect();

            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction().map_err(StoreError::Write)?;
            {
                let mut stmt = tx
                    .prepare_cached(
                        "DELETE FROM map
                         WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
                    )
                    .map_err(StoreError::Write)?;
                for tile in &batch {
                    total += stmt
                        .execute(params![tile.zoom, tile.x, tile.tms_row()])
                        .map_err(StoreError::Write)? as u64;
                }
            }
            tx.commit().map_err(StoreError::Write)?;
            drop(conn);

            if !on_progress(total) {
                break;
            }
        }
        Ok(total)
    }

    /// Repeatedly deletes up to `chunk_size` unreferenced `images` rows
    /// until none remain, then truncates the WAL.
    ///
    /// `on_progress` receives the size of the last chunk and the
    /// cumulative count.
    pub fn purge_orphan_images(
        &self,
        chunk_size: usize,
        mut on_progress: impl FnMut(u64, u64),
    ) -> Result<u64, StoreError> {
        let mut total = 0u64;
        loop {
            let deleted = {
                let conn = self.conn.lock().unwrap();
                conn.execute(
                    "DELETE FROM images WHERE tile_id IN (
                       SELECT tile_id FROM images
                       WHERE tile_id NOT IN (SELECT tile_id FROM map)
                       LIMIT ?1
                     )",
                    params![chunk_size],
                )
                .map_err(StoreError::Write)? as u64
            };
            total += deleted;
            on_progress(deleted, total);
            if deleted == 0 {
                break;
            }
        }
        self.checkpoint_truncate()?;
        Ok(total)
    }

    /// Truncates the write-ahead log back into the main database file.
    pub fn checkpoint_truncate(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            .map_err(StoreError::Write)
    }

    /// Runs VACUUM. WAL does not permit vacuuming, so the journal is
    /// switched to DELETE for the duration and restored afterwards.
    pub fn vacuum(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "PRAGMA journal_mode = DELETE;
             VACUUM;
             PRAGMA journal_mode = WAL;",
        )
        .map_err(StoreError::Write)
    }

    /// Number of tile mappings in the store.
    pub fn tile_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM map", [], |row| row.get(0))
            .map_err(StoreError::Read)
    }

    /// Number of distinct image blobs in the store.
    pub fn image_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))
            .map_err(StoreError::Read)
    }

    /// Lazily enumerates the stored tiles that intersect any of the
    /// polygons across the zoom range.
    ///
    /// One query per polygon and zoom level, restricted to the polygon's
    /// bbox in TMS row space; hits are then filtered by exact
    /// polygon/tile intersection. Used by region-scoped deletes so they
    /// never enumerate tiles that were not cached.
    pub fn tiles_for_polygon(
        self: Arc<Self>,
        polygons: Vec<Polygon>,
        min_zoom: u8,
        max_zoom: u8,
    ) -> StoreRegionTiles {
        let mut pending = Vec::new();
        for poly in polygons {
            for zoom in min_zoom..=max_zoom {
                pending.push((poly.clone(), zoom));
            }
        }
        // Stack order; reverse so zoom levels come out ascending.
        pending.reverse();
        StoreRegionTiles {
            store: self,
            pending,
            buffer: VecDeque::new(),
        }
    }

    fn query_region_zoom(&self, poly: &Polygon, zoom: u8) -> Result<Vec<Tile>, StoreError> {
        let Some(bbox) = polygon_bbox(poly) else {
            return Ok(Vec::new());
        };

        let nw = tile_at(bbox.max_lat, bbox.min_lon, zoom);
        let se = tile_at(bbox.min_lat, bbox.max_lon, zoom);
        let (min_row, max_row) = (flip_row(se.y, zoom), flip_row(nw.y, zoom));

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(
                "SELECT tile_column, tile_row FROM map
                 WHERE zoom_level = ?1
                   AND tile_column BETWEEN ?2 AND ?3
                   AND tile_row BETWEEN ?4 AND ?5",
            )
            .map_err(StoreError::Read)?;
        let rows = stmt
            .query_map(params![zoom, nw.x, se.x, min_row, max_row], |row| {
                Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?))
            })
            .map_err(StoreError::Read)?;

        let mut tiles = Vec::new();
        for row in rows {
            let (x, tms_row) = row.map_err(StoreError::Read)?;
            let tile = Tile {
                x,
                y: flip_row(tms_row, zoom),
                zoom,
            };
            if rect_intersects_polygon(&tile_to_bbox(&tile), poly) {
                tiles.push(tile);
            }
        }
        Ok(tiles)
    }
}

/// Lazy iterator over the stored tiles of a region; owns its store
/// reference so job workers can carry it across tasks.
pub struct StoreRegionTiles {
    store: Arc<MbtilesStore>,
    pending: Vec<(Polygon, u8)>,
    buffer: VecDeque<Tile>,
}

impl Iterator for StoreRegionTiles {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        loop {
            if let Some(tile) = self.buffer.pop_front() {
                return Some(tile);
            }
            let (poly, zoom) = self.pending.pop()?;
            match self.store.query_region_zoom(&poly, zoom) {
                Ok(tiles) => self.buffer.extend(tiles),
                Err(e) => {
                    warn!(zoom, error = %e, "region query failed, skipping zoom level");
                }
            }
        }
    }
}
