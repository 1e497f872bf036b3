//! Demo host: a tile overworld with one player walking tile to tile.

use anyhow::{bail, ensure};
use pacer_core::{Backbuffer, Color, DrawTarget, HostBridge, InputLatch, KeyCode};

pub const TILE_SIZE: i32 = 16;

const SKY: Color = Color::rgb(10, 50, 10);
const GRASS: Color = Color::rgb(48, 140, 56);
const GRASS_TUFT: Color = Color::rgb(36, 112, 44);
const WATER: Color = Color::rgb(30, 70, 200);
const WATER_CREST: Color = Color::rgb(110, 150, 240);
const TRUNK: Color = Color::rgb(90, 60, 30);
const CANOPY: Color = Color::rgb(20, 80, 24);
const PLAYER_BODY: Color = Color::rgb(200, 40, 40);
const PLAYER_FACE: Color = Color::rgb(240, 200, 160);

/// `~` water, `.` grass, `T` tree on grass, `@` player start on grass.
pub const OVERWORLD: &[&str] = &[
    "~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~",
    "~....T.........~~~.....T.....~",
    "~..........T...~~~...........~",
    "~...T..........~~....T....T..~",
    "~.......~~~.........~~.......~",
    "~..T....~~~~.......~~~~...T..~",
    "~........~~..T......~~.......~",
    "~...T..........@.............~",
    "~.........T..........T.......~",
    "~..~~~...........T.......~~..~",
    "~..~~~~...T..............~~~.~",
    "~...~~.............T.........~",
    "~.........~~~~...............~",
    "~..T.....~~~~~~....T....T....~",
    "~.........~~~~...............~",
    "~....T...........T......~~~..~",
    "~..........T.........T..~~~..~",
    "~..T..............~~.........~",
    "~.........T.......~~....T....~",
    "~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dir {
    North,
    South,
    West,
    East,
}

impl Dir {
    fn delta(self) -> (i32, i32) {
        match self {
            Dir::North => (0, -1),
            Dir::South => (0, 1),
            Dir::West => (-1, 0),
            Dir::East => (1, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
    Grass,
    Water,
    Tree,
}

impl TileKind {
    fn passable(self) -> bool {
        matches!(self, TileKind::Grass)
    }
}

#[derive(Debug, Clone)]
pub struct Tile {
    kind: TileKind,
    x: i32,
    y: i32,
}

impl Tile {
    fn render(&self, g: &mut DrawTarget<'_>, sx: i32, sy: i32) {
        let s = TILE_SIZE as u32;
        match self.kind {
            TileKind::Grass => {
                g.fill_rect(sx, sy, s, s, GRASS);
                // Deterministic tufts so neighbouring tiles differ.
                let seed = (self.x / TILE_SIZE * 7 + self.y / TILE_SIZE * 13) & 7;
                g.fill_rect(sx + 3 + seed, sy + 4, 1, 2, GRASS_TUFT);
                g.fill_rect(sx + 10 - seed / 2, sy + 11, 1, 2, GRASS_TUFT);
            }
            TileKind::Water => {
                g.fill_rect(sx, sy, s, s, WATER);
                g.fill_rect(sx + 2, sy + 5, 5, 1, WATER_CREST);
                g.fill_rect(sx + 9, sy + 11, 5, 1, WATER_CREST);
            }
            TileKind::Tree => {
                g.fill_rect(sx + 6, sy + 10, 4, 6, TRUNK);
                g.fill_rect(sx + 2, sy + 1, 12, 10, CANOPY);
            }
        }
    }
}

/// Walks exactly one tile per accepted step, one pixel per tick.
#[derive(Debug, Clone)]
pub struct Player {
    x: i32,
    y: i32,
    facing: Dir,
    moving: Option<Dir>,
    remaining: i32,
}

impl Player {
    fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            facing: Dir::South,
            moving: None,
            remaining: 0,
        }
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn facing(&self) -> Dir {
        self.facing
    }

    pub fn is_moving(&self) -> bool {
        self.moving.is_some()
    }

    fn handle_input(&mut self, input: &InputLatch, map: &TileMap) {
        if self.moving.is_some() {
            return;
        }

        let dir = if input.is_pressed(KeyCode::KeyW) {
            Dir::North
        } else if input.is_pressed(KeyCode::KeyS) {
            Dir::South
        } else if input.is_pressed(KeyCode::KeyA) {
            Dir::West
        } else if input.is_pressed(KeyCode::KeyD) {
            Dir::East
        } else {
            return;
        };

        self.facing = dir;
        let (dx, dy) = dir.delta();
        if map.passable(self.x / TILE_SIZE + dx, self.y / TILE_SIZE + dy) {
            self.moving = Some(dir);
            self.remaining = TILE_SIZE;
        }
    }

    fn update(&mut self) {
        let Some(dir) = self.moving else {
            return;
        };
        if self.remaining == 0 {
            self.moving = None;
            assert!(
                self.x % TILE_SIZE == 0 && self.y % TILE_SIZE == 0,
                "player ended a step off the tile grid at ({}, {})",
                self.x,
                self.y
            );
            return;
        }
        let (dx, dy) = dir.delta();
        self.x += dx;
        self.y += dy;
        self.remaining -= 1;
    }

    fn render(&self, g: &mut DrawTarget<'_>, sx: i32, sy: i32) {
        g.fill_rect(sx + 4, sy + 6, 8, 9, PLAYER_BODY);
        g.fill_rect(sx + 5, sy + 1, 6, 5, PLAYER_FACE);
        let (ex, ey) = match self.facing {
            Dir::North => return,
            Dir::South => (sx + 6, sy + 3),
            Dir::West => (sx + 5, sy + 3),
            Dir::East => (sx + 8, sy + 3),
        };
        g.fill_rect(ex, ey, 1, 1, Color::BLACK);
        if self.facing == Dir::South {
            g.fill_rect(ex + 3, ey, 1, 1, Color::BLACK);
        }
    }
}

/// Everything placed in the world, dispatched by variant.
#[derive(Debug, Clone)]
pub enum Entity {
    Tile(Tile),
    Player(Player),
}

impl Entity {
    fn bounds(&self) -> (i32, i32, i32, i32) {
        match self {
            Entity::Tile(t) => (t.x, t.y, TILE_SIZE, TILE_SIZE),
            Entity::Player(p) => (p.x, p.y, TILE_SIZE, TILE_SIZE),
        }
    }

    fn handle_input(&mut self, input: &InputLatch, map: &TileMap) {
        if let Entity::Player(p) = self {
            p.handle_input(input, map);
        }
    }

    fn update(&mut self) {
        if let Entity::Player(p) = self {
            p.update();
        }
    }

    fn render(&self, g: &mut DrawTarget<'_>, camera: &Camera) {
        let (x, y, _, _) = self.bounds();
        let (sx, sy) = (x - camera.x, y - camera.y);
        match self {
            Entity::Tile(t) => t.render(g, sx, sy),
            Entity::Player(p) => p.render(g, sx, sy),
        }
    }
}

/// Static passability grid, one cell per tile.
#[derive(Debug, Clone)]
pub struct TileMap {
    width: i32,
    height: i32,
    passable: Vec<bool>,
}

impl TileMap {
    pub fn passable(&self, tx: i32, ty: i32) -> bool {
        if tx < 0 || ty < 0 || tx >= self.width || ty >= self.height {
            return false;
        }
        self.passable[(ty * self.width + tx) as usize]
    }
}

/// Follows the player while keeping the view inside the map.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    x: i32,
    y: i32,
    view_w: i32,
    view_h: i32,
    map_w: i32,
    map_h: i32,
}

impl Camera {
    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    fn center_on(&mut self, (x, y, w, h): (i32, i32, i32, i32)) {
        let cx = x + w / 2 - self.view_w / 2;
        let cy = y + h / 2 - self.view_h / 2;
        self.x = cx.clamp(0, (self.map_w - self.view_w).max(0));
        self.y = cy.clamp(0, (self.map_h - self.view_h).max(0));
    }

    fn sees(&self, (x, y, w, h): (i32, i32, i32, i32)) -> bool {
        x + w >= self.x && y + h >= self.y && x <= self.x + self.view_w && y <= self.y + self.view_h
    }
}

pub struct Overworld {
    map: TileMap,
    entities: Vec<Entity>,
    player: usize,
    camera: Camera,
    ticks: u64,
}

impl Overworld {
    pub fn new(view_w: u32, view_h: u32) -> anyhow::Result<Self> {
        Self::from_rows(OVERWORLD, view_w, view_h)
    }

    pub fn from_rows(rows: &[&str], view_w: u32, view_h: u32) -> anyhow::Result<Self> {
        ensure!(!rows.is_empty(), "empty map");
        let width = rows[0].len();
        let height = rows.len();

        let mut passable = Vec::with_capacity(width * height);
        let mut entities = Vec::with_capacity(width * height);
        let mut start = None;

        for (ty, row) in rows.iter().enumerate() {
            ensure!(row.len() == width, "map row {ty} is {} wide, expected {width}", row.len());
            for (tx, ch) in row.bytes().enumerate() {
                let (x, y) = (tx as i32 * TILE_SIZE, ty as i32 * TILE_SIZE);
                let kind = match ch {
                    b'.' | b'@' => TileKind::Grass,
                    b'~' => TileKind::Water,
                    b'T' => TileKind::Tree,
                    other => bail!("unknown tile {:?} at {tx},{ty}", other as char),
                };
                if kind == TileKind::Tree {
                    // Grass under the tree so the canopy has a floor.
                    entities.push(Entity::Tile(Tile {
                        kind: TileKind::Grass,
                        x,
                        y,
                    }));
                }
                entities.push(Entity::Tile(Tile { kind, x, y }));
                passable.push(kind.passable());
                if ch == b'@' {
                    ensure!(start.is_none(), "second player start at {tx},{ty}");
                    start = Some((x, y));
                }
            }
        }

        let Some((px, py)) = start else {
            bail!("map has no player start");
        };
        // Player goes last so it draws over the tiles.
        entities.push(Entity::Player(Player::new(px, py)));
        let player = entities.len() - 1;

        let mut camera = Camera {
            x: 0,
            y: 0,
            view_w: view_w as i32,
            view_h: view_h as i32,
            map_w: width as i32 * TILE_SIZE,
            map_h: height as i32 * TILE_SIZE,
        };
        camera.center_on(entities[player].bounds());

        Ok(Self {
            map: TileMap {
                width: width as i32,
                height: height as i32,
                passable,
            },
            entities,
            player,
            camera,
            ticks: 0,
        })
    }

    pub fn player(&self) -> &Player {
        match &self.entities[self.player] {
            Entity::Player(p) => p,
            Entity::Tile(_) => unreachable!("player slot holds a tile"),
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    fn is_active(&self, index: usize) -> bool {
        index == self.player || self.camera.sees(self.entities[index].bounds())
    }
}

impl HostBridge for Overworld {
    fn init(&mut self) -> anyhow::Result<()> {
        log::info!(
            target: "runtime",
            "overworld {}x{} tiles, {} entities",
            self.map.width,
            self.map.height,
            self.entities.len()
        );
        Ok(())
    }

    fn update(&mut self, input: &InputLatch) -> anyhow::Result<()> {
        for i in 0..self.entities.len() {
            if self.is_active(i) {
                self.entities[i].handle_input(input, &self.map);
            }
        }
        for i in 0..self.entities.len() {
            if self.is_active(i) {
                self.entities[i].update();
            }
        }
        self.camera.center_on(self.entities[self.player].bounds());
        self.ticks += 1;
        Ok(())
    }

    fn render(&mut self, target: &mut Backbuffer) -> anyhow::Result<()> {
        let mut g = target.draw();
        g.clear(SKY);
        for e in &self.entities {
            if self.camera.sees(e.bounds()) {
                e.render(&mut g, &self.camera);
            }
        }
        Ok(())
    }

    fn destroy(&mut self) -> anyhow::Result<()> {
        log::info!(target: "runtime", "overworld closed after {} ticks", self.ticks);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POND: &[&str] = &[
        "~~~~~", //
        "~.@T~", //
        "~...~", //
        "~~~~~",
    ];

    fn hold(key: KeyCode) -> InputLatch {
        let mut latch = InputLatch::new();
        latch.on_key_pressed(key);
        latch
    }

    #[test]
    fn bundled_map_loads() {
        let world = Overworld::new(320, 240).unwrap();
        assert_eq!(world.player().position(), (15 * TILE_SIZE, 7 * TILE_SIZE));
    }

    #[test]
    fn ragged_or_playerless_maps_are_rejected() {
        assert!(Overworld::from_rows(&["~~", "~"], 320, 240).is_err());
        assert!(Overworld::from_rows(&["~~", "~~"], 320, 240).is_err());
        assert!(Overworld::from_rows(&["~x"], 320, 240).is_err());
    }

    #[test]
    fn step_takes_one_tick_per_pixel() {
        let mut world = Overworld::from_rows(POND, 320, 240).unwrap();
        let start = world.player().position();
        let keys = hold(KeyCode::KeyS);

        world.update(&keys).unwrap();
        assert!(world.player().is_moving());
        for _ in 0..15 {
            world.update(&InputLatch::new()).unwrap();
        }
        assert_eq!(world.player().position(), (start.0, start.1 + TILE_SIZE));
        world.update(&InputLatch::new()).unwrap();
        assert!(!world.player().is_moving());
    }

    #[test]
    fn trees_and_water_block() {
        let mut world = Overworld::from_rows(POND, 320, 240).unwrap();
        let start = world.player().position();

        world.update(&hold(KeyCode::KeyD)).unwrap();
        assert!(!world.player().is_moving());
        assert_eq!(world.player().facing(), Dir::East);

        world.update(&hold(KeyCode::KeyW)).unwrap();
        assert!(!world.player().is_moving());
        assert_eq!(world.player().position(), start);
    }

    #[test]
    fn camera_stays_inside_the_map() {
        let world = Overworld::from_rows(POND, 320, 240).unwrap();
        assert_eq!(world.camera().position(), (0, 0));

        let world = Overworld::new(320, 240).unwrap();
        let (cx, cy) = world.camera().position();
        assert_eq!((cx, cy), (240 + 8 - 160, 112 + 8 - 120));
    }

    #[test]
    fn render_fills_the_whole_backbuffer() {
        let mut world = Overworld::new(320, 240).unwrap();
        let mut bb = Backbuffer::new(320, 240);
        world.render(&mut bb).unwrap();
        assert!(bb.pixels().iter().all(|&p| Color(p).alpha() == 0xFF));
    }
}
