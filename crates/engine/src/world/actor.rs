//! Scripted behavior for characters.
//!
//! An [`Actor`] owns a queue of [`Action`]s and advances the head of that queue once
//! per tick. Actions never block: each poll either finishes or leaves its captured
//! progress in place for the next tick. Scripts are built with a fluent API, with
//! `repeat_begin`/`repeat_end` pairs nesting actions inside [`Repeater`]s.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::warn;

use super::clock::{ClockQuery, Hour};
use super::geom::{Direction, TilePos, Vec2};
use super::map::MapId;
use super::movement::{Body, MoveSpeed};
use super::registry::MapRegistry;
use super::timer::Timer;

/// Everything an action may read while it runs.
pub struct ActionContext<'a> {
    pub dt: Duration,
    pub clock: &'a dyn ClockQuery,
    pub maps: &'a MapRegistry,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RepeatUntil {
    Times(u32),
    Forever,
    Hour(Hour),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Repeater {
    until: RepeatUntil,
    children: Vec<Action>,
}

impl Repeater {
    pub fn new(until: RepeatUntil) -> Self {
        Self {
            until,
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, step: Step) {
        self.children.push(Action::new(step));
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn can_finish(&self, loops: u32, ctx: &ActionContext<'_>) -> bool {
        match self.until {
            RepeatUntil::Times(times) => loops >= times,
            RepeatUntil::Forever => false,
            RepeatUntil::Hour(hour) => ctx.clock.hour() >= hour,
        }
    }

    /// Runs children from `cursor` until one is still in progress or the finish
    /// condition holds. A finished pass starts the next one within the same tick.
    fn play(
        &mut self,
        cursor: &mut usize,
        loops: &mut u32,
        body: &mut Body,
        ctx: &ActionContext<'_>,
    ) -> bool {
        if self.children.is_empty() {
            loop {
                *loops += 1;
                if self.can_finish(*loops, ctx) {
                    return true;
                }
            }
        }

        while self.children[*cursor].execute(body, ctx) {
            self.children[*cursor].reinit();
            *cursor += 1;
            if *cursor < self.children.len() {
                continue;
            }
            *loops += 1;
            if self.can_finish(*loops, ctx) {
                return true;
            }
            *cursor = 0;
        }
        false
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Move {
        direction: Direction,
        speed: MoveSpeed,
        tiles: u32,
    },
    Face(Direction),
    Reposition {
        tile: TilePos,
        map: Option<String>,
    },
    WaitDuration(Duration),
    WaitUntilHour(Hour),
    Repeat(Repeater),
}

#[derive(Debug, Clone, PartialEq)]
struct MoveProgress {
    last_map: MapId,
    last_position: Vec2,
    traveled: f32,
    destination: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
enum Progress {
    Move(MoveProgress),
    Wait(Timer),
    Repeat { cursor: usize, loops: u32 },
    Settled,
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    NotStarted,
    Running(Progress),
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    step: Step,
    phase: Phase,
}

impl Action {
    pub fn new(step: Step) -> Self {
        Self {
            step,
            phase: Phase::NotStarted,
        }
    }

    pub fn step(&self) -> &Step {
        &self.step
    }

    /// Starts the action on first call, then polls it. Returns true once complete.
    pub fn execute(&mut self, body: &mut Body, ctx: &ActionContext<'_>) -> bool {
        if matches!(self.phase, Phase::NotStarted) {
            self.phase = Phase::Running(self.step.init(body, ctx));
        }
        let Phase::Running(progress) = &mut self.phase else {
            return true;
        };
        let complete = self.step.play(progress, body, ctx);
        if complete {
            self.phase = Phase::Done;
        }
        complete
    }

    pub fn reinit(&mut self) {
        self.phase = Phase::NotStarted;
    }
}

impl Step {
    fn init(&mut self, body: &mut Body, ctx: &ActionContext<'_>) -> Progress {
        match self {
            Step::Move {
                direction,
                speed,
                tiles,
            } => {
                let start = body.position;
                body.set_movement(*speed, *direction);
                let span = *tiles as f32 * direction.tile_extent();
                Progress::Move(MoveProgress {
                    last_map: body.map,
                    last_position: start,
                    traveled: 0.0,
                    destination: start + direction.unit() * span,
                })
            }
            Step::Face(direction) => {
                body.set_movement(MoveSpeed::Idle, *direction);
                Progress::Settled
            }
            Step::Reposition { tile, map } => {
                let position = tile.center();
                match map.as_deref() {
                    None => body.set_position(position),
                    Some(name) => match ctx.maps.id_of(name) {
                        Some(id) => body.place(id, position),
                        None => {
                            warn!(map = name, tile = %tile, "actor_reposition_unknown_map");
                            body.set_position(position);
                        }
                    },
                }
                Progress::Settled
            }
            Step::WaitDuration(duration) => Progress::Wait(Timer::started(*duration)),
            Step::WaitUntilHour(_) => Progress::Settled,
            Step::Repeat(repeater) => {
                for child in &mut repeater.children {
                    child.reinit();
                }
                Progress::Repeat { cursor: 0, loops: 0 }
            }
        }
    }

    fn play(&mut self, progress: &mut Progress, body: &mut Body, ctx: &ActionContext<'_>) -> bool {
        match (self, progress) {
            (
                Step::Move {
                    direction, tiles, ..
                },
                Progress::Move(state),
            ) => play_move(*direction, *tiles, state, body, ctx),
            (Step::WaitDuration(_), Progress::Wait(timer)) => {
                let finished = timer.finished();
                timer.advance(ctx.dt);
                finished
            }
            (Step::WaitUntilHour(hour), _) => ctx.clock.hour() >= *hour,
            (Step::Repeat(repeater), Progress::Repeat { cursor, loops }) => {
                if matches!(repeater.until, RepeatUntil::Times(0)) {
                    return true;
                }
                repeater.play(cursor, loops, body, ctx)
            }
            _ => true,
        }
    }
}

fn play_move(
    direction: Direction,
    tiles: u32,
    state: &mut MoveProgress,
    body: &mut Body,
    ctx: &ActionContext<'_>,
) -> bool {
    if body.map == state.last_map {
        state.traveled += state.last_position.distance(body.position);
    } else {
        match ctx.maps.seam(state.last_map, direction) {
            Some((next, seam)) if next == body.map => {
                state.traveled += state.last_position.distance(seam.back(body.position));
                state.destination = seam.forward(state.destination);
            }
            _ => {
                // Moved by something other than this action; nothing to measure.
            }
        }
    }
    state.last_map = body.map;
    state.last_position = body.position;

    let complete = state.traveled >= tiles as f32 * direction.tile_extent();
    if complete {
        body.set_position(state.destination);
        body.set_movement(MoveSpeed::Idle, direction);
    }
    complete
}

/// A character's script: a queue of top-level actions plus the repeaters still open
/// in the builder.
#[derive(Debug, Clone, Default)]
pub struct Actor {
    actions: VecDeque<Action>,
    open: Vec<Repeater>,
}

impl Actor {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, step: Step) -> &mut Self {
        match self.open.last_mut() {
            Some(repeater) => repeater.push(step),
            None => self.actions.push_back(Action::new(step)),
        }
        self
    }

    pub fn move_by(&mut self, direction: Direction, speed: MoveSpeed, tiles: u32) -> &mut Self {
        self.push(Step::Move {
            direction,
            speed,
            tiles,
        })
    }

    pub fn face(&mut self, direction: Direction) -> &mut Self {
        self.push(Step::Face(direction))
    }

    pub fn reposition(&mut self, tile: TilePos, map: Option<&str>) -> &mut Self {
        self.push(Step::Reposition {
            tile,
            map: map.map(str::to_string),
        })
    }

    pub fn wait(&mut self, duration: Duration) -> &mut Self {
        self.push(Step::WaitDuration(duration))
    }

    pub fn wait_until(&mut self, hour: Hour) -> &mut Self {
        self.push(Step::WaitUntilHour(hour))
    }

    /// Opens a repeater that runs its body `times` times. Close it with [`Actor::repeat_end`].
    pub fn repeat_begin(&mut self, times: u32) -> &mut Self {
        self.open.push(Repeater::new(RepeatUntil::Times(times)));
        self
    }

    pub fn repeat_forever(&mut self) -> &mut Self {
        self.open.push(Repeater::new(RepeatUntil::Forever));
        self
    }

    pub fn repeat_until(&mut self, hour: Hour) -> &mut Self {
        self.open.push(Repeater::new(RepeatUntil::Hour(hour)));
        self
    }

    /// Closes the innermost open repeater and appends it to the enclosing scope.
    ///
    /// # Panics
    ///
    /// Panics when no repeater is open.
    pub fn repeat_end(&mut self) -> &mut Self {
        let repeater = self.open.pop();
        assert!(repeater.is_some(), "repeat_end called with no open repeater");
        match repeater {
            Some(repeater) => self.push(Step::Repeat(repeater)),
            None => self,
        }
    }

    /// Polls the head action, popping it and moving on for as long as actions finish.
    pub fn update(&mut self, body: &mut Body, ctx: &ActionContext<'_>) {
        while let Some(front) = self.actions.front_mut() {
            if !front.execute(body, ctx) {
                break;
            }
            self.actions.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.actions.clear();
        self.open.clear();
    }

    pub fn is_idle(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.actions.len()
    }
}
