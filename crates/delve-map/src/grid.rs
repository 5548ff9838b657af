//! The tile grid, its bounded lock, and movement rules.

use crate::error::MapError;
use delve_core::{Direction, EntityId, Position};
use delve_entity::EntityKind;
use indexmap::IndexMap;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Smallest legal grid edge.
pub const MIN_DIMENSION: u32 = 10;

/// Fog-of-war reveal radius in Manhattan distance.
pub const REVEAL_RADIUS: u32 = 2;

/// Default bound on waiting for the map lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(200);

/// One entity's placement record within a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Occupant {
    /// The placed entity.
    pub id: EntityId,
    /// What kind of thing it is, for movement blocking.
    pub kind: EntityKind,
    /// Fog-of-war flag; flipped by [`TileMap::reveal_nearby`].
    pub visible: bool,
}

/// Interior grid state, guarded by the map lock.
///
/// `cells` is an `IndexMap` so iteration (reveals, restores, displays)
/// follows insertion order deterministically; `index` is the reverse
/// lookup from entity to cell.
#[derive(Debug)]
struct Grid {
    cells: IndexMap<Position, Vec<Occupant>>,
    index: HashMap<EntityId, Position>,
}

/// The game map: a fixed rows×cols grid of entity placements.
///
/// Multiple entities may share one cell (an item under a revealed
/// enemy, loot on a corpse tile). All mutation goes through a single
/// internal lock acquired with a bounded deadline; callers receiving
/// [`MapError::LockTimeout`] retry on their next tick or input rather
/// than blocking.
#[derive(Debug)]
pub struct TileMap {
    rows: u32,
    cols: u32,
    lock_timeout: Duration,
    grid: Mutex<Grid>,
}

impl TileMap {
    /// New empty map. Fails below the 10×10 minimum.
    pub fn new(rows: u32, cols: u32) -> Result<Self, MapError> {
        if rows < MIN_DIMENSION || cols < MIN_DIMENSION {
            return Err(MapError::TooSmall { rows, cols });
        }
        Ok(Self {
            rows,
            cols,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            grid: Mutex::new(Grid {
                cells: IndexMap::new(),
                index: HashMap::new(),
            }),
        })
    }

    /// Override the bounded lock timeout (tests, tuning).
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Number of rows.
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Total cell count.
    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Whether `pos` lies on the grid.
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row >= 0 && pos.col >= 0 && (pos.row as u32) < self.rows && (pos.col as u32) < self.cols
    }

    /// Acquire the grid lock within the bounded timeout.
    ///
    /// Spins on `try_lock` with `yield_now` until the deadline, so a
    /// caller stalled behind a slow holder fails with
    /// [`MapError::LockTimeout`] instead of blocking indefinitely.
    fn lock_grid(&self) -> Result<MutexGuard<'_, Grid>, MapError> {
        let deadline = Instant::now() + self.lock_timeout;
        loop {
            match self.grid.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::Poisoned(poisoned)) => {
                    return Ok(poisoned.into_inner());
                }
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        debug!(timeout_ms = self.lock_timeout.as_millis() as u64, "map lock timed out");
                        return Err(MapError::LockTimeout);
                    }
                    std::thread::yield_now();
                }
            }
        }
    }

    /// Place an entity at `pos`, appending to the cell's occupant list.
    ///
    /// An entity already on the map is moved (its old placement is
    /// dropped). New placements start hidden.
    pub fn place(&self, pos: Position, id: EntityId, kind: EntityKind) -> Result<(), MapError> {
        if !self.in_bounds(pos) {
            return Err(MapError::OutOfBounds { pos });
        }
        let mut grid = self.lock_grid()?;
        let visible = remove_from_cells(&mut grid, id).map_or(false, |occ| occ.visible);
        grid.cells
            .entry(pos)
            .or_default()
            .push(Occupant { id, kind, visible });
        grid.index.insert(id, pos);
        Ok(())
    }

    /// Remove an entity from its cell, dropping the cell entry if now
    /// empty.
    pub fn remove(&self, id: EntityId) -> Result<(), MapError> {
        let mut grid = self.lock_grid()?;
        match remove_from_cells(&mut grid, id) {
            Some(_) => Ok(()),
            None => Err(MapError::NotPlaced { id }),
        }
    }

    /// True iff no entities occupy the cell.
    pub fn is_free(&self, pos: Position) -> Result<bool, MapError> {
        let grid = self.lock_grid()?;
        Ok(grid.cells.get(&pos).map_or(true, |c| c.is_empty()))
    }

    /// The occupants of a cell, in placement order.
    pub fn occupants_at(&self, pos: Position) -> Result<Vec<Occupant>, MapError> {
        let grid = self.lock_grid()?;
        Ok(grid.cells.get(&pos).cloned().unwrap_or_default())
    }

    /// The cell an entity currently occupies.
    pub fn position_of(&self, id: EntityId) -> Result<Option<Position>, MapError> {
        let grid = self.lock_grid()?;
        Ok(grid.index.get(&id).copied())
    }

    /// Move an entity one cell in a cardinal direction.
    ///
    /// Rejects moves off the grid and moves into a cell containing a
    /// wall or an enemy. Source removal and destination insertion
    /// happen under one lock acquisition — no observer with the lock
    /// can see the entity in two places or in neither. Returns the new
    /// position.
    pub fn move_entity(&self, id: EntityId, direction: Direction) -> Result<Position, MapError> {
        let mut grid = self.lock_grid()?;

        let current = *grid.index.get(&id).ok_or(MapError::NotPlaced { id })?;
        let next = current.step(direction);
        if !self.in_bounds(next) {
            debug!(%id, %direction, "move rejected: out of bounds");
            return Err(MapError::OutOfBounds { pos: next });
        }
        if let Some(blocker) = grid
            .cells
            .get(&next)
            .and_then(|occs| occs.iter().find(|o| o.kind.blocks_movement()))
        {
            debug!(%id, %direction, by = ?blocker.kind, "move rejected: blocked");
            return Err(MapError::Blocked {
                pos: next,
                by: blocker.kind,
            });
        }

        let occupant = remove_from_cells(&mut grid, id).ok_or(MapError::NotPlaced { id })?;
        grid.cells.entry(next).or_default().push(occupant);
        grid.index.insert(id, next);
        Ok(next)
    }

    /// Reveal every hidden entity within [`REVEAL_RADIUS`] of `pos`.
    ///
    /// Idempotent: already-visible entities are untouched. Returns the
    /// newly revealed placements, for event logging.
    pub fn reveal_nearby(&self, pos: Position) -> Result<Vec<(EntityId, Position)>, MapError> {
        let mut grid = self.lock_grid()?;
        let mut revealed = Vec::new();
        for (cell, occupants) in grid.cells.iter_mut() {
            if pos.manhattan_distance(cell) > REVEAL_RADIUS {
                continue;
            }
            for occ in occupants.iter_mut() {
                if !occ.visible {
                    occ.visible = true;
                    revealed.push((occ.id, *cell));
                }
            }
        }
        Ok(revealed)
    }

    /// Force an entity visible (snapshot restore).
    pub fn set_visible(&self, id: EntityId) -> Result<(), MapError> {
        let mut grid = self.lock_grid()?;
        let pos = *grid.index.get(&id).ok_or(MapError::NotPlaced { id })?;
        if let Some(occ) = grid
            .cells
            .get_mut(&pos)
            .and_then(|occs| occs.iter_mut().find(|o| o.id == id))
        {
            occ.visible = true;
        }
        Ok(())
    }

    /// Whether an entity has been revealed. Unplaced entities are
    /// reported hidden.
    pub fn is_visible(&self, id: EntityId) -> Result<bool, MapError> {
        let grid = self.lock_grid()?;
        let Some(pos) = grid.index.get(&id) else {
            return Ok(false);
        };
        Ok(grid
            .cells
            .get(pos)
            .map_or(false, |occs| occs.iter().any(|o| o.id == id && o.visible)))
    }

    /// A uniformly random unoccupied cell, or `None` if `attempts`
    /// rolls all land on occupied cells.
    pub fn random_free_position<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        attempts: u32,
    ) -> Result<Option<Position>, MapError> {
        let grid = self.lock_grid()?;
        for _ in 0..attempts {
            let pos = Position::new(
                rng.gen_range(0..self.rows as i32),
                rng.gen_range(0..self.cols as i32),
            );
            if grid.cells.get(&pos).map_or(true, |c| c.is_empty()) {
                return Ok(Some(pos));
            }
        }
        Ok(None)
    }

    /// Drop every placement (snapshot restore).
    pub fn clear(&self) -> Result<(), MapError> {
        let mut grid = self.lock_grid()?;
        grid.cells.clear();
        grid.index.clear();
        Ok(())
    }

    #[cfg(test)]
    fn hold_lock(&self) -> MutexGuard<'_, Grid> {
        self.grid
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Remove `id` from its cell, dropping the cell entry if now empty.
/// Returns the removed occupant record.
fn remove_from_cells(grid: &mut Grid, id: EntityId) -> Option<Occupant> {
    let pos = grid.index.remove(&id)?;
    let occupants = grid.cells.get_mut(&pos)?;
    let idx = occupants.iter().position(|o| o.id == id)?;
    let occ = occupants.remove(idx);
    if occupants.is_empty() {
        grid.cells.shift_remove(&pos);
    }
    Some(occ)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn map() -> TileMap {
        TileMap::new(10, 10).unwrap()
    }

    #[test]
    fn rejects_grids_below_minimum() {
        assert_eq!(
            TileMap::new(9, 10).unwrap_err(),
            MapError::TooSmall { rows: 9, cols: 10 }
        );
        assert!(TileMap::new(10, 10).is_ok());
    }

    #[test]
    fn place_then_remove_frees_the_cell() {
        let map = map();
        let id = EntityId::next();
        let pos = Position::new(3, 3);

        map.place(pos, id, EntityKind::Item).unwrap();
        assert!(!map.is_free(pos).unwrap());
        assert_eq!(map.position_of(id).unwrap(), Some(pos));

        map.remove(id).unwrap();
        assert!(map.is_free(pos).unwrap());
        assert_eq!(map.position_of(id).unwrap(), None);
    }

    #[test]
    fn remove_unplaced_is_an_error() {
        let map = map();
        let id = EntityId::next();
        assert_eq!(map.remove(id).unwrap_err(), MapError::NotPlaced { id });
    }

    #[test]
    fn replacing_moves_instead_of_duplicating() {
        let map = map();
        let id = EntityId::next();
        map.place(Position::new(1, 1), id, EntityKind::Enemy).unwrap();
        map.place(Position::new(2, 2), id, EntityKind::Enemy).unwrap();

        assert!(map.is_free(Position::new(1, 1)).unwrap());
        assert_eq!(map.position_of(id).unwrap(), Some(Position::new(2, 2)));
    }

    #[test]
    fn move_entity_updates_both_cells_atomically() {
        let map = map();
        let id = EntityId::next();
        let from = Position::new(5, 5);
        map.place(from, id, EntityKind::Player).unwrap();

        let to = map.move_entity(id, Direction::East).unwrap();

        assert_eq!(to, Position::new(5, 6));
        assert!(map.is_free(from).unwrap());
        assert_eq!(map.position_of(id).unwrap(), Some(to));
    }

    #[test]
    fn move_off_the_grid_is_rejected() {
        let map = map();
        let id = EntityId::next();
        map.place(Position::new(0, 0), id, EntityKind::Player).unwrap();

        let err = map.move_entity(id, Direction::North).unwrap_err();
        assert!(matches!(err, MapError::OutOfBounds { .. }));
        assert_eq!(map.position_of(id).unwrap(), Some(Position::new(0, 0)));
    }

    #[test]
    fn walls_and_enemies_block_movement() {
        let map = map();
        let player = EntityId::next();
        map.place(Position::new(4, 4), player, EntityKind::Player).unwrap();

        let wall = EntityId::next();
        map.place(Position::new(4, 5), wall, EntityKind::Wall).unwrap();
        let err = map.move_entity(player, Direction::East).unwrap_err();
        assert_eq!(
            err,
            MapError::Blocked {
                pos: Position::new(4, 5),
                by: EntityKind::Wall
            }
        );

        let enemy = EntityId::next();
        map.place(Position::new(5, 4), enemy, EntityKind::Enemy).unwrap();
        assert!(map.move_entity(player, Direction::South).is_err());

        // Items do not block.
        let potion = EntityId::next();
        map.place(Position::new(3, 4), potion, EntityKind::Item).unwrap();
        assert_eq!(
            map.move_entity(player, Direction::North).unwrap(),
            Position::new(3, 4)
        );
    }

    #[test]
    fn reveal_nearby_is_idempotent() {
        let map = map();
        let near = EntityId::next();
        let far = EntityId::next();
        map.place(Position::new(5, 6), near, EntityKind::Item).unwrap();
        map.place(Position::new(5, 9), far, EntityKind::Item).unwrap();

        let first = map.reveal_nearby(Position::new(5, 5)).unwrap();
        assert_eq!(first, vec![(near, Position::new(5, 6))]);
        assert!(map.is_visible(near).unwrap());
        assert!(!map.is_visible(far).unwrap());

        let second = map.reveal_nearby(Position::new(5, 5)).unwrap();
        assert!(second.is_empty());
        assert!(map.is_visible(near).unwrap());
    }

    #[test]
    fn reveal_covers_the_full_radius() {
        let map = map();
        let edge = EntityId::next();
        map.place(Position::new(5, 7), edge, EntityKind::Enemy).unwrap();

        let revealed = map.reveal_nearby(Position::new(5, 5)).unwrap();
        assert_eq!(revealed.len(), 1);
    }

    #[test]
    fn moving_preserves_visibility() {
        let map = map();
        let id = EntityId::next();
        map.place(Position::new(5, 5), id, EntityKind::Player).unwrap();
        map.set_visible(id).unwrap();

        map.move_entity(id, Direction::West).unwrap();
        assert!(map.is_visible(id).unwrap());
    }

    #[test]
    fn lock_timeout_surfaces_as_retryable_error() {
        let map = std::sync::Arc::new(
            TileMap::new(10, 10)
                .unwrap()
                .with_lock_timeout(Duration::from_millis(20)),
        );
        let guard = map.hold_lock();

        let contender = std::sync::Arc::clone(&map);
        let handle = std::thread::spawn(move || {
            contender.place(Position::new(0, 0), EntityId::next(), EntityKind::Item)
        });
        assert_eq!(handle.join().unwrap().unwrap_err(), MapError::LockTimeout);
        drop(guard);

        // Lock released: the same operation now succeeds.
        map.place(Position::new(0, 0), EntityId::next(), EntityKind::Item)
            .unwrap();
    }

    #[test]
    fn random_free_position_avoids_occupied_cells() {
        use rand::SeedableRng;
        let map = map();
        // Fill all but one cell of the top-left 10x10 block's first row.
        for c in 0..9 {
            map.place(Position::new(0, c), EntityId::next(), EntityKind::Wall)
                .unwrap();
        }
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(12);
        for _ in 0..32 {
            let pos = map.random_free_position(&mut rng, 200).unwrap().unwrap();
            assert!(map.is_free(pos).unwrap());
        }
    }

    #[test]
    fn clear_empties_everything() {
        let map = map();
        let id = EntityId::next();
        map.place(Position::new(2, 2), id, EntityKind::Item).unwrap();
        map.clear().unwrap();
        assert!(map.is_free(Position::new(2, 2)).unwrap());
        assert_eq!(map.position_of(id).unwrap(), None);
    }

    proptest! {
        /// For all positions, is_free(p) ⇔ occupants_at(p) is empty.
        #[test]
        fn is_free_iff_no_occupants(row in 0i32..10, col in 0i32..10,
                                    place_row in 0i32..10, place_col in 0i32..10) {
            let map = map();
            map.place(Position::new(place_row, place_col), EntityId::next(), EntityKind::Item)
                .unwrap();
            let pos = Position::new(row, col);
            let free = map.is_free(pos).unwrap();
            let occupants = map.occupants_at(pos).unwrap();
            prop_assert_eq!(free, occupants.is_empty());
        }
    }
}
