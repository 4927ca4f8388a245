use std::collections::{HashSet, VecDeque};

use log::{debug, warn};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

// Playfield size in cells. The status bar is drawn below it.
pub const GRID_WIDTH: i32 = 40;
pub const GRID_HEIGHT: i32 = 20;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    fn offset(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// Unit vector in screen coordinates (y grows downwards).
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn is_opposite(self, other: Direction) -> bool {
        self.opposite() == other
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Up => "Up",
            Direction::Down => "Down",
            Direction::Left => "Left",
            Direction::Right => "Right",
        }
    }
}

/// What happens when the head leaves the playfield.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// Re-enter on the opposite edge.
    #[default]
    Wrap,
    /// Hitting the edge ends the game.
    Clamp,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeathReason {
    SelfCollision,
    OutOfBounds,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Moved,
    Ate,
    Died(DeathReason),
    /// The game was already over; nothing changed.
    Halted,
}

/// Picks a uniformly random cell of a `width` x `height` board that is not in
/// `occupied`. Returns `None` when every cell is taken.
///
/// Rejection sampling is tried first since the board is usually sparse; after
/// a bounded number of misses the free cells are enumerated and one is chosen
/// directly.
pub fn random_free_cell<R: Rng + ?Sized>(
    width: i32,
    height: i32,
    occupied: &HashSet<Cell>,
    rng: &mut R,
) -> Option<Cell> {
    if width <= 0 || height <= 0 {
        return None;
    }

    let attempts = (width * height) as usize;
    for _ in 0..attempts {
        let cell = Cell::new(rng.random_range(0..width), rng.random_range(0..height));
        if !occupied.contains(&cell) {
            return Some(cell);
        }
    }

    let free: Vec<Cell> = (0..height)
        .flat_map(|y| (0..width).map(move |x| Cell::new(x, y)))
        .filter(|cell| !occupied.contains(cell))
        .collect();
    free.choose(rng).copied()
}

/// The snake board: body, heading, food and score of one round.
#[derive(Clone, Debug)]
pub struct Grid {
    width: i32,
    height: i32,
    boundary: Boundary,
    start_length: usize,
    snake: VecDeque<Cell>,
    direction: Direction,
    next_direction: Direction,
    food: Option<Cell>,
    target_length: usize,
    score: u32,
    game_over: bool,
}

impl Grid {
    pub fn new<R: Rng + ?Sized>(
        width: i32,
        height: i32,
        boundary: Boundary,
        start_length: usize,
        rng: &mut R,
    ) -> Self {
        let mut grid = Self {
            width,
            height,
            boundary,
            start_length: start_length.max(1),
            snake: VecDeque::new(),
            direction: Direction::Right,
            next_direction: Direction::Right,
            food: None,
            target_length: 1,
            score: 0,
            game_over: false,
        };
        grid.reset(rng);
        grid
    }

    /// Back to a one-cell snake in the centre heading right.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.snake.clear();
        self.snake.push_back(Cell::new(self.width / 2, self.height / 2));
        self.direction = Direction::Right;
        self.next_direction = Direction::Right;
        self.target_length = self.start_length;
        self.score = 0;
        self.game_over = false;
        self.respawn_food(rng);
    }

    pub fn snake(&self) -> &VecDeque<Cell> {
        &self.snake
    }

    pub fn head(&self) -> Cell {
        // The body is never empty: `reset` always seeds one cell and `step`
        // only pops after pushing.
        self.snake[0]
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn food(&self) -> Option<Cell> {
        self.food
    }

    pub fn target_length(&self) -> usize {
        self.target_length
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Buffers a turn for the next step. A reversal of the committed heading
    /// is dropped; otherwise the latest request wins.
    pub fn steer(&mut self, direction: Direction) -> bool {
        if direction.is_opposite(self.direction) {
            debug!("ignoring reversal {:?} while heading {:?}", direction, self.direction);
            return false;
        }
        self.next_direction = direction;
        true
    }

    /// Commits the buffered heading and moves one cell.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> StepOutcome {
        self.step(self.next_direction, rng)
    }

    pub fn step<R: Rng + ?Sized>(&mut self, direction: Direction, rng: &mut R) -> StepOutcome {
        if self.game_over {
            return StepOutcome::Halted;
        }
        self.direction = direction;
        self.next_direction = direction;

        let Some(new_head) = self.bounded(self.head().offset(direction)) else {
            self.game_over = true;
            return StepOutcome::Died(DeathReason::OutOfBounds);
        };

        if self.snake.contains(&new_head) {
            self.game_over = true;
            return StepOutcome::Died(DeathReason::SelfCollision);
        }

        self.snake.push_front(new_head);

        if self.food == Some(new_head) {
            self.target_length += 1;
            self.score += 1;
            self.respawn_food(rng);
            return StepOutcome::Ate;
        }

        if self.snake.len() > self.target_length {
            self.snake.pop_back();
        }
        StepOutcome::Moved
    }

    fn bounded(&self, cell: Cell) -> Option<Cell> {
        match self.boundary {
            Boundary::Wrap => Some(Cell::new(
                cell.x.rem_euclid(self.width),
                cell.y.rem_euclid(self.height),
            )),
            Boundary::Clamp => {
                let inside = (0..self.width).contains(&cell.x) && (0..self.height).contains(&cell.y);
                inside.then_some(cell)
            }
        }
    }

    fn respawn_food<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let occupied: HashSet<Cell> = self.snake.iter().copied().collect();
        self.food = random_free_cell(self.width, self.height, &occupied, rng);
        match self.food {
            Some(food) => debug!("food spawned at ({}, {})", food.x, food.y),
            None => warn!("no free cell left for food"),
        }
    }

    #[cfg(test)]
    pub(crate) fn place(&mut self, body: &[Cell], direction: Direction, food: Option<Cell>) {
        self.snake = body.iter().copied().collect();
        self.direction = direction;
        self.next_direction = direction;
        self.target_length = body.len();
        self.food = food;
        self.game_over = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn grid(boundary: Boundary) -> (Grid, StdRng) {
        let mut rng = StdRng::seed_from_u64(7);
        let grid = Grid::new(10, 10, boundary, 1, &mut rng);
        (grid, rng)
    }

    fn body(grid: &Grid) -> Vec<Cell> {
        grid.snake().iter().copied().collect()
    }

    #[test]
    fn test_reset_centres_single_segment() {
        let mut rng = StdRng::seed_from_u64(1);
        let grid = Grid::new(GRID_WIDTH, GRID_HEIGHT, Boundary::Wrap, 6, &mut rng);
        assert_eq!(body(&grid), vec![Cell::new(20, 10)]);
        assert_eq!(grid.direction(), Direction::Right);
        assert_eq!(grid.target_length(), 6);
        assert_eq!(grid.score(), 0);
        assert!(!grid.is_game_over());
        assert!(grid.food().is_some_and(|food| food != Cell::new(20, 10)));
    }

    #[test]
    fn test_eating_grows_target_and_scores() {
        let (mut grid, mut rng) = grid(Boundary::Wrap);
        grid.place(&[Cell::new(5, 5)], Direction::Right, Some(Cell::new(6, 5)));

        let outcome = grid.step(Direction::Right, &mut rng);

        assert_eq!(outcome, StepOutcome::Ate);
        assert_eq!(grid.head(), Cell::new(6, 5));
        assert_eq!(body(&grid), vec![Cell::new(6, 5), Cell::new(5, 5)]);
        assert_eq!(grid.target_length(), 2);
        assert_eq!(grid.score(), 1);
        let food = grid.food().expect("board has free cells");
        assert!(!grid.snake().contains(&food));
    }

    #[test]
    fn test_plain_move_drops_tail() {
        let (mut grid, mut rng) = grid(Boundary::Wrap);
        grid.place(
            &[Cell::new(2, 2), Cell::new(1, 2), Cell::new(0, 2)],
            Direction::Right,
            Some(Cell::new(8, 8)),
        );

        let outcome = grid.step(Direction::Right, &mut rng);

        assert_eq!(outcome, StepOutcome::Moved);
        assert_eq!(body(&grid), vec![Cell::new(3, 2), Cell::new(2, 2), Cell::new(1, 2)]);
        assert_eq!(grid.score(), 0);
        assert_eq!(grid.food(), Some(Cell::new(8, 8)));
    }

    #[test]
    fn test_snake_grows_toward_target_before_trimming() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut grid = Grid::new(10, 10, Boundary::Wrap, 3, &mut rng);
        grid.food = Some(Cell::new(0, 0));

        assert_eq!(grid.step(Direction::Right, &mut rng), StepOutcome::Moved);
        assert_eq!(grid.snake().len(), 2);
        assert_eq!(grid.step(Direction::Right, &mut rng), StepOutcome::Moved);
        assert_eq!(grid.snake().len(), 3);
        assert_eq!(grid.step(Direction::Right, &mut rng), StepOutcome::Moved);
        assert_eq!(grid.snake().len(), 3);
    }

    #[test]
    fn test_moving_into_own_body_ends_game() {
        let (mut grid, mut rng) = grid(Boundary::Wrap);
        let start = [Cell::new(4, 4), Cell::new(3, 4), Cell::new(2, 4)];
        grid.place(&start, Direction::Right, Some(Cell::new(8, 8)));

        let outcome = grid.step(Direction::Left, &mut rng);

        assert_eq!(outcome, StepOutcome::Died(DeathReason::SelfCollision));
        assert!(grid.is_game_over());
        assert_eq!(body(&grid), start.to_vec());
        assert_eq!(grid.food(), Some(Cell::new(8, 8)));
        assert_eq!(grid.step(Direction::Up, &mut rng), StepOutcome::Halted);
        assert_eq!(body(&grid), start.to_vec());
    }

    #[test]
    fn test_moving_into_tail_cell_ends_game() {
        let (mut grid, mut rng) = grid(Boundary::Wrap);
        // A 2x2 loop: the head turns into the cell the tail still occupies.
        grid.place(
            &[Cell::new(4, 4), Cell::new(4, 5), Cell::new(5, 5), Cell::new(5, 4)],
            Direction::Up,
            Some(Cell::new(8, 8)),
        );

        let outcome = grid.step(Direction::Right, &mut rng);

        assert_eq!(outcome, StepOutcome::Died(DeathReason::SelfCollision));
    }

    #[test]
    fn test_wrap_mode_crosses_edges() {
        let (mut grid, mut rng) = grid(Boundary::Wrap);
        grid.place(&[Cell::new(9, 3)], Direction::Right, Some(Cell::new(5, 5)));
        assert_eq!(grid.step(Direction::Right, &mut rng), StepOutcome::Moved);
        assert_eq!(grid.head(), Cell::new(0, 3));

        grid.place(&[Cell::new(4, 0)], Direction::Up, Some(Cell::new(5, 5)));
        assert_eq!(grid.step(Direction::Up, &mut rng), StepOutcome::Moved);
        assert_eq!(grid.head(), Cell::new(4, 9));

        grid.place(&[Cell::new(0, 6)], Direction::Left, Some(Cell::new(5, 5)));
        assert_eq!(grid.step(Direction::Left, &mut rng), StepOutcome::Moved);
        assert_eq!(grid.head(), Cell::new(9, 6));
    }

    #[test]
    fn test_clamp_mode_dies_at_edge() {
        let (mut grid, mut rng) = grid(Boundary::Clamp);
        grid.place(&[Cell::new(9, 3)], Direction::Right, Some(Cell::new(5, 5)));

        let outcome = grid.step(Direction::Right, &mut rng);

        assert_eq!(outcome, StepOutcome::Died(DeathReason::OutOfBounds));
        assert!(grid.is_game_over());
        assert_eq!(grid.head(), Cell::new(9, 3));
    }

    #[test]
    fn test_reversal_is_rejected() {
        let (mut grid, mut rng) = grid(Boundary::Wrap);
        grid.place(&[Cell::new(5, 5), Cell::new(4, 5)], Direction::Right, Some(Cell::new(0, 0)));

        assert!(!grid.steer(Direction::Left));
        assert_eq!(grid.advance(&mut rng), StepOutcome::Moved);
        assert_eq!(grid.direction(), Direction::Right);
        assert_eq!(grid.head(), Cell::new(6, 5));
    }

    #[test]
    fn test_latest_buffered_turn_wins() {
        let (mut grid, mut rng) = grid(Boundary::Wrap);
        grid.place(&[Cell::new(5, 5), Cell::new(4, 5)], Direction::Right, Some(Cell::new(0, 0)));

        assert!(grid.steer(Direction::Up));
        assert!(grid.steer(Direction::Down));
        // Checked against the committed heading, not the buffered one.
        assert!(!grid.steer(Direction::Left));
        assert_eq!(grid.advance(&mut rng), StepOutcome::Moved);

        assert_eq!(grid.direction(), Direction::Down);
        assert_eq!(grid.head(), Cell::new(5, 6));
    }

    #[test]
    fn test_random_walk_keeps_invariants() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut grid = Grid::new(8, 8, Boundary::Wrap, 4, &mut rng);

        for _ in 0..2000 {
            let direction = Direction::ALL[rng.random_range(0..4)];
            grid.steer(direction);
            let outcome = grid.advance(&mut rng);

            let cells: HashSet<Cell> = grid.snake().iter().copied().collect();
            assert!(grid.snake().len() <= grid.target_length());
            if let Some(food) = grid.food() {
                assert!(!cells.contains(&food));
            }
            if matches!(outcome, StepOutcome::Died(_)) {
                grid.reset(&mut rng);
            } else {
                assert_eq!(cells.len(), grid.snake().len());
            }
        }
    }

    #[test]
    fn test_random_free_cell_finds_last_hole() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut occupied = HashSet::new();
        for y in 0..3 {
            for x in 0..3 {
                occupied.insert(Cell::new(x, y));
            }
        }
        occupied.remove(&Cell::new(2, 1));

        assert_eq!(random_free_cell(3, 3, &occupied, &mut rng), Some(Cell::new(2, 1)));

        occupied.insert(Cell::new(2, 1));
        assert_eq!(random_free_cell(3, 3, &occupied, &mut rng), None);
    }

    #[test]
    fn test_opposites() {
        for direction in Direction::ALL {
            assert!(direction.is_opposite(direction.opposite()));
            assert!(!direction.is_opposite(direction));
            assert_eq!(direction.opposite().opposite(), direction);
        }
    }
}
