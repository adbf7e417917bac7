use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub const DEFAULT_MAP_WIDTH: u32 = 20;
pub const DEFAULT_MAP_HEIGHT: u32 = 20;

pub type TileId = u16;

pub const TILE_GRASS: TileId = 0;
pub const TILE_ROAD: TileId = 1;
pub const TILE_RUBBLE: TileId = 2;
pub const TILE_WATER: TileId = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.offset(dx, dy)
    }

    pub fn manhattan_distance(self, other: TileCoord) -> u32 {
        self.x
            .abs_diff(other.x)
            .saturating_add(self.y.abs_diff(other.y))
    }

    pub fn is_adjacent(self, other: TileCoord) -> bool {
        self.manhattan_distance(other) == 1
    }

    /// Cardinal neighbours in expansion order: east, west, south, north.
    pub fn neighbors(self) -> [TileCoord; 4] {
        Direction::ALL.map(|direction| self.step(direction))
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    East,
    West,
    South,
    North,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::East,
        Direction::West,
        Direction::South,
        Direction::North,
    ];

    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::East => (1, 0),
            Self::West => (-1, 0),
            Self::South => (0, 1),
            Self::North => (0, -1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileDef {
    pub name: &'static str,
    pub walkable: bool,
    pub move_cost: u32,
}

pub const DEFAULT_TILE_DEFS: [TileDef; 4] = [
    TileDef {
        name: "grass",
        walkable: true,
        move_cost: 1,
    },
    TileDef {
        name: "road",
        walkable: true,
        move_cost: 1,
    },
    TileDef {
        name: "rubble",
        walkable: true,
        move_cost: 2,
    },
    TileDef {
        name: "water",
        walkable: false,
        move_cost: 0,
    },
];

#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("failed to read map file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("map dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },
    #[error("invalid tile token {token:?} at value index {index}")]
    InvalidToken { index: usize, token: String },
    #[error("map has too few tiles: expected {expected}, got {actual}")]
    TooFewTiles { expected: usize, actual: usize },
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("unknown tile type {id} at ({x},{y})")]
    UnknownTileType { x: u32, y: u32, id: i64 },
    #[error("walkable tile type {id} ({name}) has move cost 0; entering a tile must cost at least 1")]
    ZeroMoveCost { id: TileId, name: &'static str },
}

/// Row-major tile grid. Queries outside the map answer "not walkable".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridMap {
    width: u32,
    height: u32,
    tiles: Vec<TileId>,
    defs: Vec<TileDef>,
}

impl GridMap {
    pub fn from_tiles(width: u32, height: u32, tiles: Vec<TileId>) -> Result<Self, MapLoadError> {
        Self::from_tiles_with_defs(width, height, tiles, DEFAULT_TILE_DEFS.to_vec())
    }

    pub fn from_tiles_with_defs(
        width: u32,
        height: u32,
        tiles: Vec<TileId>,
        defs: Vec<TileDef>,
    ) -> Result<Self, MapLoadError> {
        if width == 0 || height == 0 {
            return Err(MapLoadError::EmptyDimensions { width, height });
        }
        if let Some((id, def)) = defs
            .iter()
            .enumerate()
            .find(|(_, def)| def.walkable && def.move_cost == 0)
        {
            return Err(MapLoadError::ZeroMoveCost {
                id: TileId::try_from(id).unwrap_or(TileId::MAX),
                name: def.name,
            });
        }
        let expected = width as usize * height as usize;
        if tiles.len() != expected {
            return Err(MapLoadError::TileCountMismatch {
                expected,
                actual: tiles.len(),
            });
        }
        for (index, id) in tiles.iter().enumerate() {
            if usize::from(*id) >= defs.len() {
                return Err(MapLoadError::UnknownTileType {
                    x: (index % width as usize) as u32,
                    y: (index / width as usize) as u32,
                    id: i64::from(*id),
                });
            }
        }
        Ok(Self {
            width,
            height,
            tiles,
            defs,
        })
    }

    pub fn filled(width: u32, height: u32, id: TileId) -> Result<Self, MapLoadError> {
        Self::from_tiles(width, height, vec![id; width as usize * height as usize])
    }

    /// Parses whitespace-separated integers, row-major. Values past
    /// `width * height` are ignored.
    pub fn parse(text: &str, width: u32, height: u32) -> Result<Self, MapLoadError> {
        if width == 0 || height == 0 {
            return Err(MapLoadError::EmptyDimensions { width, height });
        }
        let expected = width as usize * height as usize;
        let mut tiles = Vec::with_capacity(expected);
        for (index, token) in text.split_whitespace().take(expected).enumerate() {
            let value: i64 = token.parse().map_err(|_| MapLoadError::InvalidToken {
                index,
                token: token.to_string(),
            })?;
            let id = TileId::try_from(value)
                .ok()
                .filter(|id| usize::from(*id) < DEFAULT_TILE_DEFS.len())
                .ok_or(MapLoadError::UnknownTileType {
                    x: (index % width as usize) as u32,
                    y: (index / width as usize) as u32,
                    id: value,
                })?;
            tiles.push(id);
        }
        if tiles.len() < expected {
            return Err(MapLoadError::TooFewTiles {
                expected,
                actual: tiles.len(),
            });
        }
        Self::from_tiles(width, height, tiles)
    }

    pub fn load(path: &Path, width: u32, height: u32) -> Result<Self, MapLoadError> {
        let raw = fs::read_to_string(path).map_err(|source| MapLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map = Self::parse(&raw, width, height)?;
        info!(path = %path.display(), width, height, "map_loaded");
        Ok(map)
    }

    pub fn with_tile(mut self, coord: TileCoord, id: TileId) -> Self {
        if usize::from(id) < self.defs.len() {
            if let Some(index) = self.index_of(coord) {
                self.tiles[index] = id;
            }
        }
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tiles(&self) -> &[TileId] {
        &self.tiles
    }

    pub fn in_bounds(&self, coord: TileCoord) -> bool {
        coord.x >= 0 && coord.y >= 0 && (coord.x as u32) < self.width && (coord.y as u32) < self.height
    }

    pub fn index_of(&self, coord: TileCoord) -> Option<usize> {
        if !self.in_bounds(coord) {
            return None;
        }
        Some(coord.y as usize * self.width as usize + coord.x as usize)
    }

    pub fn coord_of(&self, index: usize) -> Option<TileCoord> {
        if index >= self.tiles.len() {
            return None;
        }
        let width = self.width as usize;
        Some(TileCoord::new((index % width) as i32, (index / width) as i32))
    }

    pub fn tile_at(&self, coord: TileCoord) -> Option<TileId> {
        self.index_of(coord)
            .and_then(|index| self.tiles.get(index).copied())
    }

    pub fn tile_def(&self, coord: TileCoord) -> Option<&TileDef> {
        self.tile_at(coord)
            .and_then(|id| self.defs.get(usize::from(id)))
    }

    pub fn is_walkable(&self, coord: TileCoord) -> bool {
        self.tile_def(coord).is_some_and(|def| def.walkable)
    }

    pub fn move_cost(&self, coord: TileCoord) -> u32 {
        match self.tile_def(coord) {
            Some(def) if def.walkable => def.move_cost,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn out_of_bounds_is_never_walkable() {
        let map = GridMap::filled(3, 3, TILE_GRASS).expect("map");
        assert!(map.is_walkable(TileCoord::new(0, 0)));
        assert!(map.is_walkable(TileCoord::new(2, 2)));
        for coord in [
            TileCoord::new(-1, 0),
            TileCoord::new(0, -1),
            TileCoord::new(3, 0),
            TileCoord::new(0, 3),
        ] {
            assert!(!map.is_walkable(coord), "{coord} should be blocked");
            assert_eq!(map.move_cost(coord), 0);
            assert_eq!(map.tile_at(coord), None);
        }
    }

    #[test]
    fn tile_table_drives_walkability_and_cost() {
        let map = GridMap::from_tiles(4, 1, vec![TILE_GRASS, TILE_ROAD, TILE_RUBBLE, TILE_WATER])
            .expect("map");
        assert_eq!(map.move_cost(TileCoord::new(0, 0)), 1);
        assert_eq!(map.move_cost(TileCoord::new(1, 0)), 1);
        assert_eq!(map.move_cost(TileCoord::new(2, 0)), 2);
        assert!(!map.is_walkable(TileCoord::new(3, 0)));
        assert_eq!(map.move_cost(TileCoord::new(3, 0)), 0);
    }

    #[test]
    fn parse_reads_row_major_and_ignores_trailing_values() {
        let map = GridMap::parse("0 1\n2 3\n0 0 0", 2, 2).expect("map");
        assert_eq!(map.tile_at(TileCoord::new(1, 0)), Some(TILE_ROAD));
        assert_eq!(map.tile_at(TileCoord::new(0, 1)), Some(TILE_RUBBLE));
        assert_eq!(map.tile_at(TileCoord::new(1, 1)), Some(TILE_WATER));
    }

    #[test]
    fn parse_rejects_short_maps() {
        let err = GridMap::parse("0 0 0", 2, 2).expect_err("short map");
        assert!(matches!(
            err,
            MapLoadError::TooFewTiles {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn parse_rejects_garbage_and_unknown_ids() {
        let err = GridMap::parse("0 x 0 0", 2, 2).expect_err("garbage");
        assert!(matches!(err, MapLoadError::InvalidToken { index: 1, .. }));

        let err = GridMap::parse("0 0 9 0", 2, 2).expect_err("unknown id");
        assert!(matches!(
            err,
            MapLoadError::UnknownTileType { x: 0, y: 1, id: 9 }
        ));

        let err = GridMap::parse("0 0 -1 0", 2, 2).expect_err("negative id");
        assert!(matches!(err, MapLoadError::UnknownTileType { id: -1, .. }));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = GridMap::load(&dir.path().join("missing.txt"), 2, 2).expect_err("missing");
        assert!(matches!(err, MapLoadError::Io { .. }));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "0 3\n1 2").expect("write");
        let map = GridMap::load(file.path(), 2, 2).expect("map");
        assert!(!map.is_walkable(TileCoord::new(1, 0)));
        assert_eq!(map.move_cost(TileCoord::new(1, 1)), 2);
    }

    #[test]
    fn from_tiles_requires_exact_count() {
        let err = GridMap::from_tiles(2, 2, vec![0; 5]).expect_err("count");
        assert!(matches!(
            err,
            MapLoadError::TileCountMismatch {
                expected: 4,
                actual: 5
            }
        ));
    }

    #[test]
    fn walkable_defs_must_cost_at_least_one() {
        let mut defs = DEFAULT_TILE_DEFS.to_vec();
        defs[TILE_ROAD as usize].move_cost = 0;
        let err = GridMap::from_tiles_with_defs(2, 1, vec![TILE_GRASS, TILE_GRASS], defs)
            .expect_err("zero cost road");
        assert!(matches!(
            err,
            MapLoadError::ZeroMoveCost {
                id: TILE_ROAD,
                name: "road"
            }
        ));

        let mut defs = DEFAULT_TILE_DEFS.to_vec();
        defs[TILE_WATER as usize].move_cost = 0;
        assert!(GridMap::from_tiles_with_defs(1, 1, vec![TILE_WATER], defs).is_ok());
    }

    #[test]
    fn neighbors_follow_expansion_order() {
        let origin = TileCoord::new(2, 2);
        assert_eq!(
            origin.neighbors(),
            [
                TileCoord::new(3, 2),
                TileCoord::new(1, 2),
                TileCoord::new(2, 3),
                TileCoord::new(2, 1),
            ]
        );
        assert!(origin.is_adjacent(TileCoord::new(2, 1)));
        assert!(!origin.is_adjacent(TileCoord::new(3, 3)));
    }
}
