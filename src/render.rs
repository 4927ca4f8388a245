use macroquad::color::Color;
use macroquad::color::colors::{BLACK, GRAY, WHITE};
use macroquad::shapes::{draw_rectangle, draw_rectangle_lines};
use macroquad::text::{TextParams, draw_text, draw_text_ex, measure_text};
use macroquad::window::{clear_background, screen_height, screen_width};

use crate::grid::{Cell, Direction, GRID_HEIGHT, GRID_WIDTH};
use crate::keymap::KeyMap;
use crate::session::{Phase, Session};

// Matrix-style palette
const MATRIX_HEAD: Color = Color::new(0.64, 1.0, 0.64, 1.0);
const MATRIX_BODY: Color = Color::new(0.25, 0.9, 0.25, 1.0);
const MATRIX_DIM: Color = Color::new(0.08, 0.4, 0.08, 1.0);
const MATRIX_FOOD: Color = Color::new(0.9, 1.0, 0.9, 1.0);
const MATRIX_RAIN: Color = Color::new(0.2, 0.8, 0.2, 0.35);
const BAR_BACKGROUND: Color = Color::new(0.2, 0.2, 0.2, 1.0);
const KEY_HIGHLIGHT: Color = Color::new(1.0, 1.0, 0.0, 1.0);

/// Rows below the playfield reserved for the status bar.
const BAR_ROWS: i32 = 3;

const MATRIX_GLYPHS: &[u8] = b"01<>[]{}()/\\|-=+*;:.,^~ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Where the playfield and the status bar land on a screen of a given size.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Layout {
    pub tile: f32,
    pub off_x: f32,
    pub off_y: f32,
}

impl Layout {
    pub fn fit(screen_w: f32, screen_h: f32) -> Self {
        let rows = (GRID_HEIGHT + BAR_ROWS) as f32;
        let tile = (screen_w / GRID_WIDTH as f32).min(screen_h / rows).max(1.0);
        Self {
            tile,
            off_x: (screen_w - tile * GRID_WIDTH as f32) * 0.5,
            off_y: (screen_h - tile * rows) * 0.5,
        }
    }

    pub fn cell_origin(&self, cell: Cell) -> (f32, f32) {
        (
            self.off_x + cell.x as f32 * self.tile,
            self.off_y + cell.y as f32 * self.tile,
        )
    }

    pub fn board_size(&self) -> (f32, f32) {
        (self.tile * GRID_WIDTH as f32, self.tile * GRID_HEIGHT as f32)
    }

    pub fn bar_top(&self) -> f32 {
        self.off_y + self.tile * GRID_HEIGHT as f32
    }
}

/// One "Up: K" entry of the status bar legend.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LegendEntry {
    pub direction: Direction,
    pub key: Option<char>,
}

pub fn legend(keymap: &KeyMap) -> [LegendEntry; 4] {
    Direction::ALL.map(|direction| LegendEntry {
        direction,
        key: keymap.key_for(direction).map(|key| key.to_ascii_uppercase()),
    })
}

fn matrix_char_for_cell(c: Cell) -> char {
    let hx = (c.x as i64).wrapping_mul(73_856_093);
    let hy = (c.y as i64).wrapping_mul(19_349_663);
    let h = (hx ^ hy).unsigned_abs() as usize;
    MATRIX_GLYPHS[h % MATRIX_GLYPHS.len()] as char
}

fn random_matrix_char() -> char {
    MATRIX_GLYPHS[macroquad::rand::gen_range(0, MATRIX_GLYPHS.len())] as char
}

fn draw_glyph(ch: char, cell: Cell, color: Color, layout: &Layout) {
    let (x, y) = layout.cell_origin(cell);
    let params = TextParams {
        font_size: layout.tile.max(6.0) as u16,
        font_scale: 1.0,
        font_scale_aspect: 1.0,
        color,
        ..Default::default()
    };
    // baseline sits at the bottom of the cell
    draw_text_ex(&ch.to_string(), x + 1.0, y + layout.tile - 1.0, params);
}

#[derive(Clone, Copy)]
struct Streak {
    x: i32,
    y: f32,
    speed: f32,
}

/// Falling glyph columns behind the board.
pub struct Rain {
    streaks: Vec<Streak>,
}

impl Rain {
    pub fn new() -> Self {
        let streaks = (0..GRID_WIDTH / 2)
            .map(|i| Streak {
                x: (i * 2) % GRID_WIDTH,
                y: macroquad::rand::gen_range(0, GRID_HEIGHT) as f32,
                speed: macroquad::rand::gen_range(6.0, 18.0),
            })
            .collect();
        Self { streaks }
    }

    fn draw(&mut self, layout: &Layout, dt: f32) {
        for streak in &mut self.streaks {
            streak.y += streak.speed * dt;
            if streak.y >= GRID_HEIGHT as f32 {
                streak.y = 0.0;
            }
            let cell = Cell::new(streak.x, (streak.y as i32).clamp(0, GRID_HEIGHT - 1));
            draw_glyph(random_matrix_char(), cell, MATRIX_RAIN, layout);
        }
    }
}

fn draw_centered(text: &str, y: f32, size: u16, color: Color) {
    let m = measure_text(text, None, size, 1.0);
    draw_text(text, (screen_width() - m.width) * 0.5, y, size as f32, color);
}

fn draw_board(session: &Session, layout: &Layout) {
    let (w, h) = layout.board_size();
    draw_rectangle_lines(layout.off_x, layout.off_y, w, h, 1.0, MATRIX_DIM);

    let grid = session.grid();
    for (i, cell) in grid.snake().iter().enumerate() {
        let color = if i == 0 { MATRIX_HEAD } else { MATRIX_BODY };
        draw_glyph(matrix_char_for_cell(*cell), *cell, color, layout);
    }
    if let Some(food) = grid.food() {
        draw_glyph('*', food, MATRIX_FOOD, layout);
    }
}

fn draw_bar(session: &Session, layout: &Layout) {
    let top = layout.bar_top();
    let (w, _) = layout.board_size();
    let height = layout.tile * BAR_ROWS as f32;
    draw_rectangle(layout.off_x, top, w, height, BAR_BACKGROUND);

    let size = (layout.tile * 0.9).max(12.0);
    let baseline = top + height * 0.5 + size * 0.3;
    let mut x = layout.off_x + layout.tile;

    let score = format!("Score: {}", session.score());
    draw_text(&score, x, baseline, size, WHITE);
    x += measure_text(&score, None, size as u16, 1.0).width + layout.tile * 2.0;

    let high = format!("High Score: {}", session.high_score());
    draw_text(&high, x, baseline, size, KEY_HIGHLIGHT);

    // Legend is right-aligned: "Up: K  Down: L  ..."
    let slot = layout.tile * 5.0;
    let mut x = layout.off_x + w - slot * 4.0;
    for entry in legend(session.keymap()) {
        let label = format!("{}: ", entry.direction.label());
        draw_text(&label, x, baseline, size, WHITE);
        let label_w = measure_text(&label, None, size as u16, 1.0).width;
        let key = entry.key.map_or_else(|| "None".to_string(), |key| key.to_string());
        draw_text(&key, x + label_w, baseline, size, KEY_HIGHLIGHT);
        x += slot;
    }
}

fn draw_game_over(session: &Session) {
    draw_rectangle(0.0, 0.0, screen_width(), screen_height(), Color::new(0.0, 0.0, 0.0, 0.6));
    let sh = screen_height();
    draw_centered("GAME OVER", sh * 0.4, 72, KEY_HIGHLIGHT);
    draw_centered(session.rules().restart.hint(), sh * 0.4 + 60.0, 28, WHITE);
    draw_centered("Esc: Quit", sh * 0.4 + 96.0, 20, GRAY);
}

/// Draws one frame of the session. `dt` drives the background animation.
pub fn draw(session: &Session, rain: &mut Rain, dt: f32) {
    clear_background(BLACK);
    let layout = Layout::fit(screen_width(), screen_height());

    rain.draw(&layout, dt);
    draw_board(session, &layout);
    draw_bar(session, &layout);

    if session.phase() == Phase::GameOver {
        draw_game_over(session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::KeyPool;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_layout_fits_wide_screen() {
        let layout = Layout::fit(1600.0, 690.0);
        assert_eq!(layout.tile, 30.0);
        assert_eq!(layout.off_x, 200.0);
        assert_eq!(layout.off_y, 0.0);
        assert_eq!(layout.cell_origin(Cell::new(1, 2)), (230.0, 60.0));
        assert_eq!(layout.bar_top(), 600.0);
    }

    #[test]
    fn test_layout_fits_tall_screen() {
        let layout = Layout::fit(800.0, 1000.0);
        assert_eq!(layout.tile, 20.0);
        assert_eq!(layout.off_x, 0.0);
        assert_eq!(layout.off_y, (1000.0 - 20.0 * 23.0) * 0.5);
    }

    #[test]
    fn test_legend_lists_every_direction_once() {
        let mut rng = StdRng::seed_from_u64(3);
        let keymap = KeyMap::generate(&KeyPool::letters(), &mut rng).unwrap();

        let entries = legend(&keymap);

        assert_eq!(entries.map(|entry| entry.direction), Direction::ALL);
        for entry in entries {
            let key = entry.key.unwrap();
            assert!(key.is_ascii_uppercase());
            assert_eq!(keymap.resolve(key.to_ascii_lowercase()), Some(entry.direction));
        }
    }

    #[test]
    fn test_cell_glyph_is_stable() {
        let cell = Cell::new(7, 3);
        assert_eq!(matrix_char_for_cell(cell), matrix_char_for_cell(cell));
    }
}
