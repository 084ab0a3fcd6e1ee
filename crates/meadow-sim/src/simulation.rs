//! Simulation wrapper around the world lock.

use crate::world::World;
use log::debug;
use meadow_protocol::{SimulationId, WorldConstants};
use parking_lot::{Mutex, MutexGuard};

/// Owns the [`World`] behind a single mutex and drives time forward.
///
/// Lock ordering: the world lock is always taken before any per-agent state
/// lock. Code holding an agent lock must never call back into the world.
pub struct Simulation {
    id: SimulationId,
    world: Mutex<World>,
}

impl Simulation {
    pub fn new(constants: WorldConstants) -> Self {
        Self {
            id: SimulationId::new(),
            world: Mutex::new(World::new(constants)),
        }
    }

    pub fn id(&self) -> SimulationId {
        self.id
    }

    /// Exclusive access to the world. All multi-step operations hold this
    /// guard for their whole read-modify-write.
    pub fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock()
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.world.lock().time()
    }

    /// Advance time by `dt` and fire queued callbacks whose predicates hold.
    pub fn tick(&self, dt: f64) {
        let mut world = self.world.lock();
        world.advance_time(dt);
        world.fire_ready_callbacks();
        debug!("tick (time={:.2})", world.time());
    }
}

#[cfg(test)]
mod tests {
    use super::Simulation;
    use crate::entity::Entity;
    use crate::results::MoveResult;
    use meadow_protocol::{EntityId, Point, WorldConstants};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn callbacks_fire_once_when_predicate_holds() {
        let sim = Simulation::new(WorldConstants::default());
        let fired = Arc::new(AtomicUsize::new(0));
        {
            let fired = fired.clone();
            sim.world().queue_callback(
                |world| world.time() >= 1.0,
                move |_world| {
                    fired.fetch_add(1, Ordering::SeqCst);
                },
            );
        }

        sim.tick(0.5);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        sim.tick(0.5);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        sim.tick(0.5);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn movement_resolves_along_keyframes() {
        let sim = Simulation::new(WorldConstants {
            world_width: 1000.0,
            world_height: 1000.0,
            walk_speed: 10.0,
        });
        let id = EntityId::new();
        sim.world()
            .spawn_entity(Entity::new(id).at(Point { x: 0.0, y: 0.0 }));

        let result = sim.world().start_movement(id, Point { x: 100.0, y: 0.0 });
        let MoveResult::Success { movement_id } = result else {
            panic!("unexpected result: {result:?}");
        };

        sim.tick(5.0);
        assert_eq!(
            sim.world().resolve_position(id),
            Some(Point { x: 50.0, y: 0.0 })
        );

        // Halting snaps the track to the current resolved position.
        let halted = sim.world().start_movement(id, Point { x: 50.0, y: 0.0 });
        let MoveResult::Success {
            movement_id: halt_id,
        } = halted
        else {
            panic!("unexpected result: {halted:?}");
        };
        assert_eq!(movement_id == halt_id, false);
        sim.tick(10.0);
        assert_eq!(
            sim.world().resolve_position(id),
            Some(Point { x: 50.0, y: 0.0 })
        );
    }

    #[test]
    fn action_guard_is_exclusive() {
        let sim = Simulation::new(WorldConstants::default());
        let id = EntityId::new();
        sim.world()
            .spawn_entity(Entity::new(id).at(Point { x: 0.0, y: 0.0 }));

        let mut world = sim.world();
        assert_eq!(world.is_available_to_act(id), true);
        assert_eq!(world.try_begin_action(id), true);
        assert_eq!(world.try_begin_action(id), false);
        assert_eq!(world.is_available_to_act(id), false);
        world.end_action(id);
        assert_eq!(world.is_available_to_act(id), true);
    }
}
