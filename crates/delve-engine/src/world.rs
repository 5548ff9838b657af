//! The world orchestrator: shared state, locking discipline, player
//! actions, enemy scheduling, and observer fan-out.

use crate::config::{ConfigError, WorldConfig};
use crate::cues;
use crate::error::{ActionError, WorldError};
use crate::pool::WorkerPool;
use crate::scheduler::{Due, Scheduler};
use delve_combat::{resolve_combat, BattleResult, CombatHooks, CombatReaction};
use delve_core::{AudioSink, EntityId, EventSink, Position, WorldObserver};
use delve_effects::{EffectRegistry, EffectSweeper};
use delve_entity::{
    Combatant, Enemy, EnemyKind, EntityKind, Item, ItemKind, Player, HEALTH_POTION_HEAL,
    POWER_POTION_BOOST,
};
use delve_map::TileMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock, TryLockError, Weak};
use std::time::Duration;
use tracing::debug;

/// Attempts when looking for a free cell to respawn or teleport onto.
const PLACEMENT_ATTEMPTS: u32 = 50;

/// Chance (percent) that an enemy steps toward the player on a tick.
const TICK_MOVE_CHANCE: u32 = 20;

/// Chance (percent) that a respawned enemy carries a random effect.
const RESPAWN_EFFECT_CHANCE: u32 = 30;

/// Duration of the effect a respawned enemy may carry.
const RESPAWN_EFFECT_SECS: u64 = 45;

/// The kind of the last player-visible action, kept for transient
/// highlighting by the rendering layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// A combat exchange.
    Combat,
    /// An item pickup or use.
    Pickup,
    /// A player move.
    Move,
}

/// The last action taken and where it happened.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionMarker {
    /// What happened.
    pub action: Action,
    /// Where it happened.
    pub pos: Position,
}

/// Everything guarded by the world lock.
pub(crate) struct WorldState {
    pub(crate) player: Player,
    pub(crate) enemies: Vec<Enemy>,
    pub(crate) items: Vec<Item>,
    pub(crate) history: Vec<BattleResult>,
    pub(crate) last_action: Option<ActionMarker>,
}

/// Threads owned by a running world.
struct Runtime {
    scheduler: Scheduler,
    pool: WorkerPool,
    sweeper: EffectSweeper,
    grace: Duration,
}

impl Runtime {
    fn shutdown(mut self) {
        self.scheduler.shutdown();
        self.sweeper.shutdown();
        self.pool.shutdown(self.grace);
    }
}

/// The unique root object of a game.
///
/// Explicitly constructed and shared via `Arc` — "only one" is
/// construction discipline, not a global. Lifecycle: construct,
/// [`attach_map`](World::attach_map) exactly once,
/// [`initialize`](World::initialize) exactly once, then
/// [`start`](World::start) / [`stop`](World::stop).
///
/// Locking: cross-cutting player actions take the world lock with
/// non-blocking `try_lock` semantics (a contended action is abandoned,
/// not queued); map structure has its own bounded lock inside
/// [`TileMap`]; the effect registry locks independently of both.
pub struct World {
    config: WorldConfig,
    pub(crate) state: Mutex<Option<WorldState>>,
    pub(crate) map: OnceLock<TileMap>,
    pub(crate) effects: Arc<EffectRegistry>,
    observers: RwLock<Vec<Arc<dyn WorldObserver>>>,
    running: AtomicBool,
    event_flag: AtomicBool,
    pub(crate) sink: Arc<dyn EventSink>,
    audio: Arc<dyn AudioSink>,
    rng: Mutex<ChaCha8Rng>,
    runtime: Mutex<Option<Runtime>>,
    weak_self: Mutex<Weak<World>>,
}

impl World {
    /// Construct a world from a validated configuration.
    pub fn new(
        config: WorldConfig,
        sink: Arc<dyn EventSink>,
        audio: Arc<dyn AudioSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self {
            effects: Arc::new(EffectRegistry::new(Arc::clone(&sink))),
            config,
            state: Mutex::new(None),
            map: OnceLock::new(),
            observers: RwLock::new(Vec::new()),
            running: AtomicBool::new(false),
            event_flag: AtomicBool::new(false),
            sink,
            audio,
            rng: Mutex::new(rng),
            runtime: Mutex::new(None),
            weak_self: Mutex::new(Weak::new()),
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The effect registry tracking this world's characters.
    pub fn effects(&self) -> &Arc<EffectRegistry> {
        &self.effects
    }

    /// Attach the map. Calling twice is a usage error.
    pub fn attach_map(&self, map: TileMap) -> Result<(), WorldError> {
        self.map
            .set(map)
            .map_err(|_| WorldError::MapAlreadyAttached)
    }

    /// The attached map.
    pub fn map(&self) -> Result<&TileMap, WorldError> {
        self.map.get().ok_or(WorldError::MapNotAttached)
    }

    /// Populate the world with its starting entities. Calling twice is
    /// a usage error.
    pub fn initialize(
        &self,
        player: Player,
        enemies: Vec<Enemy>,
        items: Vec<Item>,
    ) -> Result<(), WorldError> {
        let mut guard = self.lock_state();
        if guard.is_some() {
            return Err(WorldError::AlreadyInitialized);
        }
        *guard = Some(WorldState {
            player,
            enemies,
            items,
            history: Vec::new(),
            last_action: None,
        });
        Ok(())
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start the game: flip the running flag, spawn the worker pool,
    /// scheduler, and effect sweeper, and schedule every live enemy
    /// with independent jitter plus the periodic global event and
    /// maintenance ticks.
    pub fn start(world: &Arc<World>) -> Result<(), WorldError> {
        world.map()?;
        {
            let guard = world.lock_state();
            if guard.is_none() {
                return Err(WorldError::NotInitialized);
            }
        }
        if world.running.swap(true, Ordering::SeqCst) {
            return Err(WorldError::AlreadyRunning);
        }

        *lock_plain(&world.weak_self) = Arc::downgrade(world);

        let pool = WorkerPool::new(world.config.resolved_worker_count());
        let sweeper = EffectSweeper::spawn(
            Arc::clone(&world.effects),
            world.config.sweep_interval,
        );
        let weak = Arc::downgrade(world);
        let scheduler = Scheduler::spawn(move |due| {
            if let Some(w) = weak.upgrade() {
                w.on_due(due);
            }
        });

        *lock_plain(&world.runtime) = Some(Runtime {
            scheduler,
            pool,
            sweeper,
            grace: world.config.stop_grace,
        });

        world.audio.play(cues::BACKGROUND);
        world.sink.log("game started");

        // Schedule every live enemy with its own jitter so they do not
        // act in lockstep.
        let ids: Vec<EntityId> = {
            let guard = world.lock_state();
            guard
                .as_ref()
                .map(|s| s.enemies.iter().filter(|e| !e.is_dead()).map(|e| e.id()).collect())
                .unwrap_or_default()
        };
        for id in ids {
            let delay = world.tick_jitter();
            world.schedule_due(delay, Due::EnemyTick(id));
        }
        world.schedule_due(world.config.global_event_period, Due::GlobalEvent);
        world.schedule_due(world.config.maintenance_period, Due::Maintenance);
        Ok(())
    }

    /// Stop the game: flip the running flag, then shut down the
    /// scheduler, sweeper, and pool with a bounded grace period.
    /// Safe without a prior `start`, and safe to call twice.
    pub fn stop(&self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        let runtime = lock_plain(&self.runtime).take();
        if let Some(rt) = runtime {
            rt.shutdown();
        }
        if was_running {
            self.sink.log("game ended");
        }
    }

    /// Whether the world is between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Consume the "a global event fired since you last asked" flag.
    pub fn take_event_flag(&self) -> bool {
        self.event_flag.swap(false, Ordering::SeqCst)
    }

    // ── Observers ────────────────────────────────────────────────

    /// Register an observer. Observers are notified synchronously, in
    /// registration order, on whatever thread performed the mutation.
    pub fn register_observer(&self, observer: Arc<dyn WorldObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Remove a previously registered observer.
    pub fn unregister_observer(&self, observer: &Arc<dyn WorldObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|o| !Arc::ptr_eq(o, observer));
    }

    /// Invoke every registered observer once.
    pub fn notify_observers(&self) {
        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer.on_world_changed();
        }
    }

    // ── Player actions ───────────────────────────────────────────

    /// Attack a living enemy: resolve combat, record the result in the
    /// append-only history, convert a defeated enemy into its loot,
    /// and respawn a replacement if capacity allows.
    pub fn attack(&self, target: EntityId) -> Result<(), ActionError> {
        let map = self.map()?;
        let mut guard = self.try_state()?;
        let state = guard.as_mut().ok_or(WorldError::NotInitialized)?;

        let idx = state
            .enemies
            .iter()
            .position(|e| e.id() == target && !e.is_dead())
            .ok_or(ActionError::NoSuchEnemy { id: target })?;

        if state.player.is_dead() {
            return Err(ActionError::PlayerDead);
        }

        self.audio.play(cues::player_attack(state.player.class()));
        self.sink.log(&format!(
            "{} attacked {} at {}",
            state.player.display_name(),
            state.enemies[idx].display_name(),
            state.enemies[idx].position()
        ));

        let mut rng = self.rng();
        let outcome = {
            let WorldState {
                player, enemies, ..
            } = &mut *state;
            resolve_combat(player, &mut enemies[idx], self.effects.as_ref(), &mut *rng)
        };

        let enemy_pos = state.enemies[idx].position();
        state.history.push(outcome.result.clone());
        state.last_action = Some(ActionMarker {
            action: Action::Combat,
            pos: enemy_pos,
        });

        self.apply_reactions(map, state, &outcome.reactions, &mut rng);

        if state.player.is_dead() {
            self.audio.play(cues::GAME_OVER);
            self.sink.log(&format!(
                "{} died in battle — game over",
                state.player.display_name()
            ));
            drop(rng);
            drop(guard);
            self.notify_observers();
            return Ok(());
        }

        if state.enemies[idx].is_dead() {
            self.audio.play(cues::ENEMY_DIE);
            self.sink.log(&format!(
                "{} was defeated by {}",
                state.enemies[idx].display_name(),
                state.player.display_name()
            ));
            self.handle_enemy_death(map, state, idx, &mut rng);
        } else {
            self.audio
                .play(cues::enemy_attack(state.enemies[idx].kind()));
            self.sink.log(&format!(
                "{} has {} health remaining",
                state.enemies[idx].display_name(),
                state.enemies[idx].health()
            ));
        }

        self.reveal_around(state.player.position());
        drop(rng);
        drop(guard);
        self.notify_observers();
        Ok(())
    }

    /// Move the player onto an adjacent cell. Non-adjacent targets,
    /// walls, enemies, and the map edge are rejected with no state
    /// change.
    pub fn move_player(&self, to: Position) -> Result<(), ActionError> {
        let map = self.map()?;
        let mut guard = self.try_state()?;
        let state = guard.as_mut().ok_or(WorldError::NotInitialized)?;

        let from = state.player.position();
        let Some(direction) = from.direction_to(&to) else {
            self.sink.log(&format!(
                "{} cannot reach {} from {}",
                state.player.display_name(),
                to,
                from
            ));
            return Err(ActionError::NotAdjacent);
        };

        match map.move_entity(state.player.id(), direction) {
            Ok(new_pos) => {
                state.player.set_position(new_pos);
                state.last_action = Some(ActionMarker {
                    action: Action::Move,
                    pos: new_pos,
                });
                self.sink.log(&format!(
                    "{} moved from {} to {}",
                    state.player.display_name(),
                    from,
                    new_pos
                ));
                self.reveal_around(new_pos);
                self.audio.play(cues::FOOTSTEPS);
                drop(guard);
                self.notify_observers();
                Ok(())
            }
            Err(e) => {
                self.sink.log(&format!(
                    "{} could not move {}: {}",
                    state.player.display_name(),
                    direction,
                    e
                ));
                Err(ActionError::Map(e))
            }
        }
    }

    /// Pick up an item from the map: potions go to the inventory,
    /// treasure is credited to the treasure counter.
    pub fn pick_up_item(&self, item: EntityId) -> Result<(), ActionError> {
        let map = self.map()?;
        let mut guard = self.try_state()?;
        let state = guard.as_mut().ok_or(WorldError::NotInitialized)?;

        let idx = state
            .items
            .iter()
            .position(|i| i.id() == item && i.kind() != ItemKind::Wall)
            .ok_or(ActionError::NoSuchItem { id: item })?;

        map.remove(item)?;
        let taken = state.items.remove(idx);
        let pos = taken.position();

        match taken.kind() {
            ItemKind::Treasure { value } => {
                state.player.add_treasure_points(value);
                self.audio.play(cues::TREASURE);
                self.sink.log(&format!(
                    "{} picked up treasure worth {} at {}",
                    state.player.display_name(),
                    value,
                    pos
                ));
            }
            kind => {
                self.sink.log(&format!(
                    "{} picked up {} at {}",
                    state.player.display_name(),
                    kind,
                    pos
                ));
                state.player.add_to_inventory(taken);
            }
        }

        state.last_action = Some(ActionMarker {
            action: Action::Pickup,
            pos,
        });
        drop(guard);
        self.notify_observers();
        Ok(())
    }

    /// Drink a carried potion. Items with no usable effect are put
    /// back and reported as [`ActionError::NoEffect`].
    pub fn use_item(&self, item: EntityId) -> Result<(), ActionError> {
        self.map()?;
        let mut guard = self.try_state()?;
        let state = guard.as_mut().ok_or(WorldError::NotInitialized)?;

        let taken = state
            .player
            .take_from_inventory(item)
            .ok_or(ActionError::NoSuchItem { id: item })?;

        match taken.kind() {
            ItemKind::HealthPotion => {
                state.player.heal(HEALTH_POTION_HEAL);
                self.audio.play(cues::DRINK_POTION);
                self.sink.log(&format!(
                    "{} drank a health potion ({} health)",
                    state.player.display_name(),
                    state.player.health()
                ));
            }
            ItemKind::PowerPotion => {
                let power = state.player.power() + POWER_POTION_BOOST;
                state.player.set_power(power);
                self.audio.play(cues::DRINK_POTION);
                self.sink.log(&format!(
                    "{} drank a power potion ({} power)",
                    state.player.display_name(),
                    power
                ));
            }
            _ => {
                self.sink.log(&format!(
                    "{} failed to use {}",
                    state.player.display_name(),
                    taken.kind()
                ));
                state.player.add_to_inventory(taken);
                return Err(ActionError::NoEffect);
            }
        }

        let pos = state.player.position();
        self.reveal_around(pos);
        state.last_action = Some(ActionMarker {
            action: Action::Pickup,
            pos,
        });
        drop(guard);
        self.notify_observers();
        Ok(())
    }

    /// Whether the player has an unspent speed-boost extra action.
    pub fn player_has_extra_action(&self) -> bool {
        let guard = self.lock_state();
        guard
            .as_ref()
            .is_some_and(|s| self.effects.has_extra_action(s.player.id()))
    }

    /// Give each live enemy a 20% chance of a random timed effect
    /// lasting 30–60 seconds.
    pub fn apply_random_enemy_effects(&self) -> Result<(), WorldError> {
        let mut guard = self.lock_state();
        let state = guard.as_mut().ok_or(WorldError::NotInitialized)?;
        let mut rng = self.rng();
        for enemy in state.enemies.iter().filter(|e| !e.is_dead()) {
            if rng.gen_range(0..100) < 20 {
                let duration = Duration::from_secs(rng.gen_range(30..=60));
                self.effects.apply_random(enemy, duration, &mut *rng);
            }
        }
        Ok(())
    }

    // ── Read accessors (for observers and rendering) ─────────────

    /// A clone of the player, if initialized.
    pub fn player_view(&self) -> Option<Player> {
        self.lock_state().as_ref().map(|s| s.player.clone())
    }

    /// Clones of the current enemies.
    pub fn enemy_views(&self) -> Vec<Enemy> {
        self.lock_state()
            .as_ref()
            .map(|s| s.enemies.clone())
            .unwrap_or_default()
    }

    /// Clones of the items currently on the ground.
    pub fn item_views(&self) -> Vec<Item> {
        self.lock_state()
            .as_ref()
            .map(|s| s.items.clone())
            .unwrap_or_default()
    }

    /// The append-only battle history.
    pub fn battle_history(&self) -> Vec<BattleResult> {
        self.lock_state()
            .as_ref()
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }

    /// The last action marker, for transient highlighting.
    pub fn last_action(&self) -> Option<ActionMarker> {
        self.lock_state().as_ref().and_then(|s| s.last_action)
    }

    // ── Scheduled work ───────────────────────────────────────────

    /// Scheduler callback: runs on the scheduler thread.
    fn on_due(&self, due: Due) {
        match due {
            Due::EnemyTick(id) => {
                let weak = lock_plain(&self.weak_self).clone();
                if let Some(rt) = lock_plain(&self.runtime).as_ref() {
                    rt.pool.execute(move || {
                        if let Some(world) = weak.upgrade() {
                            world.run_enemy_tick(id);
                        }
                    });
                }
            }
            Due::GlobalEvent => {
                self.fire_global_event();
                if self.is_running() {
                    self.schedule_due(self.config.global_event_period, Due::GlobalEvent);
                }
            }
            Due::Maintenance => {
                self.run_maintenance();
                if self.is_running() {
                    self.schedule_due(self.config.maintenance_period, Due::Maintenance);
                }
            }
        }
    }

    /// One autonomous enemy action, run on a pool worker.
    ///
    /// Skipped (but still re-armed) when the world lock is contended;
    /// the chain stops silently once the enemy is gone or the world
    /// stops.
    fn run_enemy_tick(&self, id: EntityId) {
        if !self.is_running() {
            return;
        }
        let Ok(map) = self.map() else { return };

        let mut moved = false;
        match self.state.try_lock() {
            Err(TryLockError::WouldBlock) => {
                debug!(%id, "tick skipped: world lock contended");
            }
            Err(TryLockError::Poisoned(_)) => return,
            Ok(mut guard) => {
                let Some(state) = guard.as_mut() else { return };
                let Some(idx) = state.enemies.iter().position(|e| e.id() == id) else {
                    return; // removed from the world: the chain ends
                };

                let mut rng = self.rng();
                if state.enemies[idx].is_dead() {
                    // Died outside combat and not yet reaped.
                    self.handle_enemy_death(map, state, idx, &mut rng);
                    return;
                }

                if rng.gen_range(0..100) < TICK_MOVE_CHANCE {
                    let enemy_pos = state.enemies[idx].position();
                    let direction = step_toward(enemy_pos, state.player.position());
                    match map.move_entity(id, direction) {
                        Ok(new_pos) => {
                            state.enemies[idx].set_position(new_pos);
                            moved = true;
                        }
                        Err(e) => {
                            debug!(%id, %direction, error = %e, "enemy move rejected");
                        }
                    }
                }
            }
        }

        if moved {
            self.notify_observers();
        }
        if self.is_running() {
            let delay = self.tick_jitter();
            self.schedule_due(delay, Due::EnemyTick(id));
        }
    }

    /// The periodic world-wide event: a damage wave or a power wave,
    /// chosen at random each firing.
    fn fire_global_event(&self) {
        if !self.is_running() {
            return;
        }
        let Ok(map) = self.map() else { return };
        let mut guard = match self.state.try_lock() {
            Ok(g) => g,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!("global event skipped: world lock contended");
                return;
            }
        };
        let Some(state) = guard.as_mut() else { return };

        let mut rng = self.rng();
        let amount = rng.gen_range(5..=15);
        if rng.gen_bool(0.5) {
            self.sink
                .log(&format!("a magic wave damages everyone for {amount}"));
            if !state.player.is_dead() {
                let through = self.effects.absorb_damage(&state.player, amount);
                state.player.apply_damage(through);
            }
            let mut fallen = Vec::new();
            for (i, enemy) in state.enemies.iter_mut().enumerate() {
                if enemy.is_dead() {
                    continue;
                }
                let through = self.effects.absorb_damage(&*enemy, amount);
                enemy.apply_damage(through);
                if enemy.is_dead() {
                    fallen.push(i);
                }
            }
            // Reap wave deaths, highest index first so positions hold.
            for &i in fallen.iter().rev() {
                let reactions = self.effects.death_reactions(&state.enemies[i]);
                self.apply_reactions(map, state, &reactions, &mut rng);
                self.handle_enemy_death(map, state, i, &mut rng);
            }
        } else {
            self.sink
                .log(&format!("a power wave raises everyone's power by {amount}"));
            if !state.player.is_dead() {
                let power = state.player.power() + amount;
                state.player.set_power(power);
            }
            for enemy in state.enemies.iter_mut().filter(|e| !e.is_dead()) {
                let power = enemy.power() + amount;
                enemy.set_power(power);
            }
        }

        self.event_flag.store(true, Ordering::SeqCst);
        drop(rng);
        drop(guard);
        self.notify_observers();
    }

    /// Maintenance tick: apply due regeneration heals under the world
    /// lock.
    fn run_maintenance(&self) {
        if !self.is_running() {
            return;
        }
        let due = self.effects.regen_heals_due(std::time::Instant::now());
        if due.is_empty() {
            return;
        }
        let mut guard = match self.state.try_lock() {
            Ok(g) => g,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => return,
        };
        let Some(state) = guard.as_mut() else { return };

        let mut healed = false;
        for (id, amount) in due {
            if state.player.id() == id && !state.player.is_dead() {
                state.player.heal(amount);
                self.sink.log(&format!(
                    "regeneration healed {} for {amount}",
                    state.player.display_name()
                ));
                healed = true;
            }
        }
        drop(guard);
        if healed {
            self.notify_observers();
        }
    }

    // ── Death, loot, respawn ─────────────────────────────────────

    /// Reap a dead enemy: convert its loot into a visible Treasure in
    /// place of the corpse, detach its effects, and — if the live
    /// count is under capacity — spawn exactly one replacement.
    fn handle_enemy_death(
        &self,
        map: &TileMap,
        state: &mut WorldState,
        idx: usize,
        rng: &mut ChaCha8Rng,
    ) {
        let enemy = state.enemies.remove(idx);
        let pos = enemy.position();
        self.sink
            .log(&format!("{} at {} has died", enemy.display_name(), pos));

        if let Err(e) = map.remove(enemy.id()) {
            debug!(error = %e, "corpse was not on the map");
        }
        self.effects.remove_all(enemy.id());

        let loot = Item::new(
            ItemKind::Treasure {
                value: enemy.loot(),
            },
            pos,
        );
        if map.place(pos, loot.id(), EntityKind::Item).is_ok() {
            let _ = map.set_visible(loot.id());
            self.sink
                .log(&format!("loot worth {} appeared at {}", enemy.loot(), pos));
            state.items.push(loot);
        }

        let live = state.enemies.iter().filter(|e| !e.is_dead()).count();
        let capacity = self.config.enemy_capacity();
        self.sink
            .log(&format!("active enemies: {live}, capacity: {capacity}"));
        if live < capacity {
            self.spawn_replacement(map, state, rng);
        }
    }

    /// Spawn one replacement enemy, biased toward kinds currently
    /// absent from the board, optionally carrying a random effect, and
    /// schedule it like any other enemy.
    fn spawn_replacement(&self, map: &TileMap, state: &mut WorldState, rng: &mut ChaCha8Rng) {
        let present: HashSet<EnemyKind> = state
            .enemies
            .iter()
            .filter(|e| !e.is_dead())
            .map(|e| e.kind())
            .collect();
        let kind = EnemyKind::choose_biased(&present, rng);

        let pos = match map.random_free_position(rng, PLACEMENT_ATTEMPTS) {
            Ok(Some(pos)) => pos,
            _ => {
                self.sink.log("no free cell for a replacement enemy");
                return;
            }
        };

        let enemy = Enemy::spawn(kind, pos, rng);
        if map.place(pos, enemy.id(), EntityKind::Enemy).is_err() {
            return;
        }
        self.sink
            .log(&format!("a new {} appeared at {}", kind, pos));

        if rng.gen_range(0..100) < RESPAWN_EFFECT_CHANCE {
            self.effects
                .apply_random(&enemy, Duration::from_secs(RESPAWN_EFFECT_SECS), rng);
        }

        let id = enemy.id();
        state.enemies.push(enemy);
        if self.is_running() {
            let (min, max) = self.config.tick_delay_ms;
            let delay = Duration::from_millis(rng.gen_range(min..=max));
            self.schedule_due(delay, Due::EnemyTick(id));
        }
    }

    /// Apply deferred combat reactions: teleports and explosions.
    fn apply_reactions(
        &self,
        map: &TileMap,
        state: &mut WorldState,
        reactions: &[CombatReaction],
        rng: &mut ChaCha8Rng,
    ) {
        for reaction in reactions {
            match reaction {
                CombatReaction::Teleport { target } => {
                    self.teleport_enemy(map, state, *target, rng);
                }
                CombatReaction::Explode { at, damage, range } => {
                    if !state.player.is_dead()
                        && state.player.position().manhattan_distance(at) <= *range
                    {
                        state.player.apply_damage(*damage);
                        self.sink.log(&format!(
                            "an explosion at {} dealt {} damage to {}",
                            at,
                            damage,
                            state.player.display_name()
                        ));
                    }
                }
            }
        }
    }

    /// Relocate an enemy to a random free cell.
    fn teleport_enemy(
        &self,
        map: &TileMap,
        state: &mut WorldState,
        id: EntityId,
        rng: &mut ChaCha8Rng,
    ) {
        let Some(enemy) = state.enemies.iter_mut().find(|e| e.id() == id) else {
            return;
        };
        let Ok(Some(pos)) = map.random_free_position(rng, PLACEMENT_ATTEMPTS) else {
            return;
        };
        if map.place(pos, id, EntityKind::Enemy).is_ok() {
            let from = enemy.position();
            enemy.set_position(pos);
            self.sink.log(&format!(
                "{} teleported from {} to {}",
                enemy.display_name(),
                from,
                pos
            ));
        }
    }

    // ── Internals ────────────────────────────────────────────────

    fn reveal_around(&self, pos: Position) {
        let Ok(map) = self.map() else { return };
        if let Ok(revealed) = map.reveal_nearby(pos) {
            for (id, at) in revealed {
                self.sink.log(&format!("revealed {id} at {at}"));
            }
        }
    }

    fn tick_jitter(&self) -> Duration {
        let (min, max) = self.config.tick_delay_ms;
        let mut rng = self.rng();
        Duration::from_millis(rng.gen_range(min..=max))
    }

    fn schedule_due(&self, delay: Duration, due: Due) {
        if let Some(rt) = lock_plain(&self.runtime).as_ref() {
            rt.scheduler.schedule(delay, due);
        }
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, Option<WorldState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_state(&self) -> Result<MutexGuard<'_, Option<WorldState>>, ActionError> {
        match self.state.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::Poisoned(p)) => Ok(p.into_inner()),
            Err(TryLockError::WouldBlock) => {
                debug!("player action abandoned: world lock contended");
                Err(ActionError::Contended)
            }
        }
    }

    pub(crate) fn rng(&self) -> MutexGuard<'_, ChaCha8Rng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for World {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Lock a plain mutex, recovering from poisoning.
fn lock_plain<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The cardinal step that closes the larger axis gap toward `target`.
fn step_toward(from: Position, target: Position) -> delve_core::Direction {
    use delve_core::Direction;
    let row_gap = target.row - from.row;
    let col_gap = target.col - from.col;
    if row_gap.abs() > col_gap.abs() {
        if row_gap > 0 {
            Direction::South
        } else {
            Direction::North
        }
    } else if col_gap > 0 {
        Direction::East
    } else {
        Direction::West
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delve_core::CountingObserver;
    use delve_effects::EffectKind;
    use delve_map::MapError;
    use delve_test_utils::{test_enemy, RecordingAudio, RecordingSink};

    struct Fixture {
        world: Arc<World>,
        sink: Arc<RecordingSink>,
        audio: Arc<RecordingAudio>,
    }

    /// A 10x10 world: player at (5,5), a wall at (5,4), and whatever
    /// enemies the test places before calling `initialize`.
    fn fixture_with(enemies: Vec<Enemy>, items: Vec<Item>) -> Fixture {
        let sink = Arc::new(RecordingSink::new());
        let audio = Arc::new(RecordingAudio::new());
        let world = Arc::new(
            World::new(
                WorldConfig {
                    seed: 7,
                    ..WorldConfig::default()
                },
                Arc::clone(&sink) as Arc<dyn EventSink>,
                Arc::clone(&audio) as Arc<dyn AudioSink>,
            )
            .unwrap(),
        );
        world.attach_map(TileMap::new(10, 10).unwrap()).unwrap();
        let map = world.map().unwrap();

        let player = Player::new("Aria", delve_entity::PlayerClass::Warrior, Position::new(5, 5));
        map.place(player.position(), player.id(), EntityKind::Player)
            .unwrap();

        let wall = Item::new(ItemKind::Wall, Position::new(5, 4));
        map.place(wall.position(), wall.id(), EntityKind::Wall)
            .unwrap();

        for enemy in &enemies {
            map.place(enemy.position(), enemy.id(), EntityKind::Enemy)
                .unwrap();
        }
        let mut all_items = vec![wall];
        for item in items {
            map.place(item.position(), item.id(), EntityKind::Item)
                .unwrap();
            all_items.push(item);
        }

        world.initialize(player, enemies, all_items).unwrap();
        Fixture { world, sink, audio }
    }

    /// A weak melee enemy the player reliably defeats.
    fn weak_enemy(kind: EnemyKind, pos: Position) -> Enemy {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        Enemy::restore(kind, pos, 10, 2, &mut rng)
    }

    #[test]
    fn initialize_twice_is_a_usage_error() {
        let f = fixture_with(vec![], vec![]);
        let player = Player::new("Twin", delve_entity::PlayerClass::Mage, Position::new(0, 0));
        assert_eq!(
            f.world.initialize(player, vec![], vec![]),
            Err(WorldError::AlreadyInitialized)
        );
    }

    #[test]
    fn attach_map_twice_is_a_usage_error() {
        let f = fixture_with(vec![], vec![]);
        assert_eq!(
            f.world.attach_map(TileMap::new(10, 10).unwrap()),
            Err(WorldError::MapAlreadyAttached)
        );
    }

    #[test]
    fn start_requires_initialization() {
        let world = Arc::new(
            World::new(
                WorldConfig::default(),
                Arc::new(delve_core::NullSink),
                Arc::new(delve_core::NullSink),
            )
            .unwrap(),
        );
        assert_eq!(World::start(&world), Err(WorldError::MapNotAttached));
        world.attach_map(TileMap::new(10, 10).unwrap()).unwrap();
        assert_eq!(World::start(&world), Err(WorldError::NotInitialized));
    }

    #[test]
    fn stop_without_start_is_safe() {
        let f = fixture_with(vec![], vec![]);
        f.world.stop();
        f.world.stop();
        assert!(!f.world.is_running());
    }

    #[test]
    fn attack_records_history_marker_and_notifies_once() {
        let enemy = weak_enemy(EnemyKind::Orc, Position::new(5, 6));
        let id = enemy.id();
        let f = fixture_with(vec![enemy], vec![]);
        let observer = Arc::new(CountingObserver::new());
        f.world
            .register_observer(Arc::clone(&observer) as Arc<dyn WorldObserver>);

        f.world.attack(id).unwrap();

        let history = f.world.battle_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].defender_name, "Orc");
        assert_eq!(observer.count(), 1);
        let marker = f.world.last_action().unwrap();
        assert_eq!(marker.action, Action::Combat);

        let player = f.world.player_view().unwrap();
        assert!(player.health() >= 0);
        if f.world.enemy_views().iter().all(|e| e.id() != id) {
            // Defeated: loot appeared and the death was logged.
            assert!(f
                .world
                .item_views()
                .iter()
                .any(|i| matches!(i.kind(), ItemKind::Treasure { .. })));
            assert!(f.sink.contains("was defeated"));
        } else {
            assert!(player.is_dead());
        }
    }

    #[test]
    fn attack_plays_the_class_cue() {
        let enemy = test_enemy(EnemyKind::Orc, Position::new(5, 6));
        let id = enemy.id();
        let f = fixture_with(vec![enemy], vec![]);
        f.world.attack(id).unwrap();
        assert!(f.audio.cues().contains(&"warrior_attack.wav".to_string()));
    }

    #[test]
    fn attack_on_a_missing_enemy_is_rejected() {
        let f = fixture_with(vec![], vec![]);
        let ghost = EntityId::next();
        assert_eq!(
            f.world.attack(ghost),
            Err(ActionError::NoSuchEnemy { id: ghost })
        );
        assert!(f.world.battle_history().is_empty());
    }

    #[test]
    fn defeated_enemy_respawns_a_replacement_under_capacity() {
        let enemy = weak_enemy(EnemyKind::Orc, Position::new(5, 6));
        let id = enemy.id();
        let f = fixture_with(vec![enemy], vec![]);

        f.world.attack(id).unwrap();
        if f.world.enemy_views().iter().all(|e| e.id() != id) {
            // One death, one replacement: the live count stays at one.
            assert_eq!(f.world.enemy_views().len(), 1);
            assert!(f.sink.contains("appeared at"));
        }
    }

    #[test]
    fn moving_onto_a_wall_is_rejected_and_position_unchanged() {
        let f = fixture_with(vec![], vec![]);
        let before = f.world.player_view().unwrap().position();

        let result = f.world.move_player(Position::new(5, 4));
        assert!(matches!(result, Err(ActionError::Map(MapError::Blocked { .. }))));
        assert_eq!(f.world.player_view().unwrap().position(), before);
    }

    #[test]
    fn moving_to_a_non_adjacent_cell_is_rejected() {
        let f = fixture_with(vec![], vec![]);
        assert_eq!(
            f.world.move_player(Position::new(7, 7)),
            Err(ActionError::NotAdjacent)
        );
    }

    #[test]
    fn moving_to_a_free_cell_updates_marker_and_plays_footsteps() {
        let f = fixture_with(vec![], vec![]);
        f.world.move_player(Position::new(5, 6)).unwrap();

        let player = f.world.player_view().unwrap();
        assert_eq!(player.position(), Position::new(5, 6));
        let marker = f.world.last_action().unwrap();
        assert_eq!(marker.action, Action::Move);
        assert_eq!(marker.pos, Position::new(5, 6));
        assert!(f.audio.cues().contains(&cues::FOOTSTEPS.to_string()));
    }

    #[test]
    fn picking_up_a_potion_fills_the_inventory() {
        let potion = Item::new(ItemKind::HealthPotion, Position::new(5, 6));
        let id = potion.id();
        let f = fixture_with(vec![], vec![potion]);

        f.world.pick_up_item(id).unwrap();

        let player = f.world.player_view().unwrap();
        assert_eq!(player.inventory().len(), 1);
        assert!(f.world.item_views().iter().all(|i| i.id() != id));
        assert!(f.world.map().unwrap().is_free(Position::new(5, 6)).unwrap());
        assert_eq!(f.world.last_action().unwrap().action, Action::Pickup);
    }

    #[test]
    fn picking_up_treasure_credits_points() {
        let loot = Item::new(ItemKind::Treasure { value: 120 }, Position::new(4, 5));
        let id = loot.id();
        let f = fixture_with(vec![], vec![loot]);

        f.world.pick_up_item(id).unwrap();

        let player = f.world.player_view().unwrap();
        assert_eq!(player.treasure_points(), 120);
        assert!(player.inventory().is_empty());
        assert!(f.audio.cues().contains(&cues::TREASURE.to_string()));
    }

    #[test]
    fn walls_cannot_be_picked_up() {
        let f = fixture_with(vec![], vec![]);
        let wall_id = f
            .world
            .item_views()
            .iter()
            .find(|i| i.kind() == ItemKind::Wall)
            .unwrap()
            .id();
        assert_eq!(
            f.world.pick_up_item(wall_id),
            Err(ActionError::NoSuchItem { id: wall_id })
        );
    }

    #[test]
    fn using_a_power_potion_raises_power() {
        let potion = Item::new(ItemKind::PowerPotion, Position::new(5, 6));
        let id = potion.id();
        let f = fixture_with(vec![], vec![potion]);
        f.world.pick_up_item(id).unwrap();

        f.world.use_item(id).unwrap();

        let player = f.world.player_view().unwrap();
        assert_eq!(player.power(), 15);
        assert!(player.inventory().is_empty());
        assert!(f.audio.cues().contains(&cues::DRINK_POTION.to_string()));
    }

    #[test]
    fn using_an_uncarried_item_is_rejected() {
        let f = fixture_with(vec![], vec![]);
        let ghost = EntityId::next();
        assert_eq!(
            f.world.use_item(ghost),
            Err(ActionError::NoSuchItem { id: ghost })
        );
    }

    #[test]
    fn exploding_enemy_death_splashes_the_player() {
        let enemy = weak_enemy(EnemyKind::Orc, Position::new(5, 6));
        let id = enemy.id();
        let f = fixture_with(vec![], vec![]);
        // Attach the effect, then slot the enemy into the running world
        // state via a fresh fixture: apply before initialize instead.
        drop(f);

        let sink = Arc::new(RecordingSink::new());
        let world = Arc::new(
            World::new(
                WorldConfig { seed: 11, ..WorldConfig::default() },
                Arc::clone(&sink) as Arc<dyn EventSink>,
                Arc::new(delve_core::NullSink),
            )
            .unwrap(),
        );
        world.attach_map(TileMap::new(10, 10).unwrap()).unwrap();
        let map = world.map().unwrap();
        let player = Player::new("Aria", delve_entity::PlayerClass::Warrior, Position::new(5, 5));
        map.place(player.position(), player.id(), EntityKind::Player)
            .unwrap();
        map.place(enemy.position(), id, EntityKind::Enemy).unwrap();
        world
            .effects()
            .apply(&enemy, EffectKind::Exploding, Duration::from_secs(600))
            .unwrap();
        world.initialize(player, vec![enemy], vec![]).unwrap();

        world.attack(id).unwrap();

        let player = world.player_view().unwrap();
        if world.enemy_views().iter().all(|e| e.id() != id) {
            let dmg_by_enemy = world.battle_history()[0].damage_by_defender;
            // Combat damage plus the 20%-of-max-health blast.
            assert_eq!(player.health(), 100 - dmg_by_enemy - 10);
            assert!(sink.contains("explosion"));
        }
    }

    #[test]
    fn concurrent_attacks_on_distinct_enemies_never_tear_state() {
        let goblin = weak_enemy(EnemyKind::Goblin, Position::new(5, 6));
        let orc = weak_enemy(EnemyKind::Orc, Position::new(4, 5));
        let (goblin_id, orc_id) = (goblin.id(), orc.id());
        let f = fixture_with(vec![goblin, orc], vec![]);

        let world_a = Arc::clone(&f.world);
        let world_b = Arc::clone(&f.world);
        let attack_until_done = |world: Arc<World>, id: EntityId| {
            std::thread::spawn(move || loop {
                match world.attack(id) {
                    Ok(()) => break,
                    Err(ActionError::Contended) => std::thread::yield_now(),
                    Err(e) => panic!("unexpected action error: {e}"),
                }
            })
        };
        let a = attack_until_done(world_a, goblin_id);
        let b = attack_until_done(world_b, orc_id);
        a.join().unwrap();
        b.join().unwrap();

        let history = f.world.battle_history();
        assert_eq!(history.len(), 2);
        let names: Vec<&str> = history.iter().map(|r| r.defender_name.as_str()).collect();
        assert!(names.contains(&"Goblin"));
        assert!(names.contains(&"Orc"));
    }

    #[test]
    fn step_toward_prefers_the_larger_axis_gap() {
        use delve_core::Direction;
        assert_eq!(
            step_toward(Position::new(5, 5), Position::new(1, 4)),
            Direction::North
        );
        assert_eq!(
            step_toward(Position::new(5, 5), Position::new(6, 9)),
            Direction::East
        );
        assert_eq!(
            step_toward(Position::new(5, 5), Position::new(5, 2)),
            Direction::West
        );
    }

    #[test]
    fn event_flag_is_consumed_on_read() {
        let f = fixture_with(vec![], vec![]);
        assert!(!f.world.take_event_flag());
        f.world.event_flag.store(true, Ordering::SeqCst);
        assert!(f.world.take_event_flag());
        assert!(!f.world.take_event_flag());
    }

    #[test]
    fn unregistered_observers_are_not_notified() {
        let f = fixture_with(vec![], vec![]);
        let observer = Arc::new(CountingObserver::new());
        let as_trait: Arc<dyn WorldObserver> = Arc::clone(&observer) as Arc<dyn WorldObserver>;
        f.world.register_observer(Arc::clone(&as_trait));
        f.world.unregister_observer(&as_trait);
        f.world.move_player(Position::new(5, 6)).unwrap();
        assert_eq!(observer.count(), 0);
    }
}
