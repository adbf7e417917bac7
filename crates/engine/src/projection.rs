use crate::grid::TileCoord;

pub const TILE_WIDTH_PX: i32 = 64;
pub const TILE_HEIGHT_PX: i32 = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn from_tile(tile: TileCoord) -> Self {
        Self {
            x: tile.x as f32,
            y: tile.y as f32,
        }
    }

    pub fn lerp(from: Vec2, to: Vec2, t: f32) -> Self {
        Self {
            x: from.x + (to.x - from.x) * t,
            y: from.y + (to.y - from.y) * t,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

/// Diamond projection: `screen = ((x - y) * w/2, (x + y) * h/2) - camera + map_offset`.
#[derive(Debug, Clone, Copy)]
pub struct IsoProjection {
    pub tile_width: i32,
    pub tile_height: i32,
    pub map_offset: ScreenPoint,
    pub camera: ScreenPoint,
    pub viewport: Viewport,
}

impl Default for IsoProjection {
    fn default() -> Self {
        Self {
            tile_width: TILE_WIDTH_PX,
            tile_height: TILE_HEIGHT_PX,
            map_offset: ScreenPoint::default(),
            camera: ScreenPoint::default(),
            viewport: Viewport::default(),
        }
    }
}

impl IsoProjection {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            ..Self::default()
        }
    }

    fn half_width(&self) -> i32 {
        (self.tile_width / 2).max(1)
    }

    fn half_height(&self) -> i32 {
        (self.tile_height / 2).max(1)
    }

    pub fn center_map(&mut self, map_width: u32, map_height: u32) {
        let center = TileCoord::new((map_width / 2) as i32, (map_height / 2) as i32);
        let raw = self.raw_iso(Vec2::from_tile(center));
        self.map_offset = ScreenPoint {
            x: self.viewport.width as i32 / 2 - raw.x,
            y: self.viewport.height as i32 / 2 - raw.y,
        };
    }

    pub fn follow(&mut self, tile: TileCoord) {
        let raw = self.raw_iso(Vec2::from_tile(tile));
        self.camera = ScreenPoint {
            x: raw.x + self.map_offset.x - self.viewport.width as i32 / 2,
            y: raw.y + self.map_offset.y - self.viewport.height as i32 / 2,
        };
    }

    fn raw_iso(&self, position: Vec2) -> ScreenPoint {
        ScreenPoint {
            x: ((position.x - position.y) * self.half_width() as f32).round() as i32,
            y: ((position.x + position.y) * self.half_height() as f32).round() as i32,
        }
    }

    pub fn to_screen(&self, position: Vec2) -> ScreenPoint {
        let raw = self.raw_iso(position);
        ScreenPoint {
            x: raw.x - self.camera.x + self.map_offset.x,
            y: raw.y - self.camera.y + self.map_offset.y,
        }
    }

    pub fn tile_to_screen(&self, tile: TileCoord) -> ScreenPoint {
        self.to_screen(Vec2::from_tile(tile))
    }

    /// Inverse of [`Self::tile_to_screen`] for pointer clicks. Uses floor
    /// division so points left of or above the map resolve to negative tiles
    /// instead of folding onto row/column zero.
    pub fn screen_to_tile(&self, screen: ScreenPoint) -> TileCoord {
        let world_x = screen.x + self.camera.x - self.map_offset.x;
        let world_y = screen.y + self.camera.y - self.map_offset.y;
        let a = world_x.div_euclid(self.half_width());
        let b = world_y.div_euclid(self.half_height());
        TileCoord::new((a + b).div_euclid(2), (b - a).div_euclid(2))
    }
}
