//! Per-host gesture state machines and the coordinator that routes events
//! between them.
//!
//! Every swipeable host (a stage host, or the desktop collection itself)
//! registers one engine; engines form a forest mirroring host nesting, each
//! holding its parent's id. A gesture that pushes past a host's edge is
//! forwarded up that chain rather than consumed locally. The engine never
//! mutates the layout tree: it reads counts and widths and emits events;
//! applying a committed index is the caller's job.
//!
//! Sign convention: positive deltas accumulate positive `amount`, which
//! travels toward lower stage indices. One host width equals one full step.

use slotmap::SlotMap;
use tracing::{debug, trace};

use super::physics::{rubber_band, Spring, SpringState};
use crate::common::config::GestureSettings;

slotmap::new_key_type! {
    /// A navigation engine in the coordinator's forest.
    pub struct EngineId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollPhase {
    Began,
    Changed,
    Ended,
    Cancelled,
}

/// One raw scroll/swipe sample. `delta_t` is the time since the previous
/// sample; it only feeds the velocity estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollEvent {
    pub phase: ScrollPhase,
    pub delta_x: f64,
    pub delta_t: f64,
}

impl ScrollEvent {
    pub fn began() -> ScrollEvent {
        ScrollEvent { phase: ScrollPhase::Began, delta_x: 0.0, delta_t: 0.0 }
    }

    pub fn changed(delta_x: f64, delta_t: f64) -> ScrollEvent {
        ScrollEvent { phase: ScrollPhase::Changed, delta_x, delta_t }
    }

    pub fn ended() -> ScrollEvent {
        ScrollEvent { phase: ScrollPhase::Ended, delta_x: 0.0, delta_t: 0.0 }
    }

    pub fn cancelled() -> ScrollEvent {
        ScrollEvent { phase: ScrollPhase::Cancelled, delta_x: 0.0, delta_t: 0.0 }
    }
}

/// What a host has to know about an engine's activity. Offset feedback is
/// derived from position only; velocity is consulted exactly once, at
/// commit time, so indicators never flicker with the velocity estimate.
#[derive(Debug, Clone, PartialEq)]
pub enum NavEvent {
    /// The strip for this host should render translated by `offset` px
    /// relative to the rest position of `base_index`.
    OffsetChanged { base_index: usize, offset: f64 },
    /// A settle finished on a new stage; apply it to the tree.
    IndexCommitted { index: usize },
    /// The gesture is over; `committed` says whether an index change is on
    /// its way (it fires when the settle lands).
    GestureEnded { committed: bool },
    /// The gesture pushed past this host's edge and was handed to the
    /// parent engine.
    BubbledToParent,
}

#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventResponse {
    pub events: Vec<(EngineId, NavEvent)>,
}

impl EventResponse {
    fn push(&mut self, id: EngineId, event: NavEvent) {
        self.events.push((id, event));
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events for one engine, in order.
    pub fn for_engine(&self, id: EngineId) -> impl Iterator<Item = &NavEvent> + '_ {
        self.events.iter().filter(move |(e, _)| *e == id).map(|(_, ev)| ev)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    Gesturing {
        amount: f64,
        velocity: f64,
    },
    /// Pinned at an edge while the parent consumes the gesture.
    /// `direction` is the sign of the deltas being forwarded.
    Bubbling {
        edge_amount: f64,
        direction: f64,
    },
    Settling {
        target_index: usize,
        spring: SpringState,
    },
}

#[derive(Debug)]
struct NavEngine {
    host_width: f64,
    stage_count: usize,
    active_index: usize,
    parent: Option<EngineId>,
    phase: Phase,
}

impl NavEngine {
    /// Steps available toward lower indices (positive amount).
    fn max_left(&self) -> f64 {
        self.active_index as f64
    }

    /// Steps available toward higher indices (negative amount).
    fn max_right(&self) -> f64 {
        self.stage_count.saturating_sub(1 + self.active_index) as f64
    }

    /// Raw accumulated amount mapped to what the user sees: linear within
    /// bounds, rubber-banded past them.
    fn visual_amount(&self, amount: f64, settings: &GestureSettings) -> f64 {
        let d = settings.rubber_band_dimension;
        let c = settings.rubber_band_coefficient;
        let max_left = self.max_left();
        let max_right = self.max_right();
        if amount > max_left {
            max_left + rubber_band(amount - max_left, d, c)
        } else if amount < -max_right {
            -(max_right + rubber_band(-amount - max_right, d, c))
        } else {
            amount
        }
    }
}

/// Owns every navigation engine and routes scroll events and clock ticks
/// through them.
#[derive(Debug)]
pub struct GestureCoordinator {
    engines: SlotMap<EngineId, NavEngine>,
    settings: GestureSettings,
}

impl Default for GestureCoordinator {
    fn default() -> Self {
        GestureCoordinator::new(GestureSettings::default())
    }
}

impl GestureCoordinator {
    pub fn new(settings: GestureSettings) -> Self {
        GestureCoordinator { engines: SlotMap::default(), settings }
    }

    pub fn settings(&self) -> &GestureSettings {
        &self.settings
    }

    pub fn update_settings(&mut self, settings: &GestureSettings) {
        self.settings = settings.clone();
    }

    pub fn register_host(
        &mut self,
        stage_count: usize,
        active_index: usize,
        host_width: f64,
        parent: Option<EngineId>,
    ) -> EngineId {
        let active_index = active_index.min(stage_count.saturating_sub(1));
        self.engines.insert(NavEngine {
            host_width,
            stage_count,
            active_index,
            parent,
            phase: Phase::Idle,
        })
    }

    pub fn remove_host(&mut self, id: EngineId) {
        self.engines.remove(id);
        for engine in self.engines.values_mut() {
            if engine.parent == Some(id) {
                engine.parent = None;
            }
        }
    }

    pub fn contains(&self, id: EngineId) -> bool {
        self.engines.contains_key(id)
    }

    pub fn active_index(&self, id: EngineId) -> Option<usize> {
        self.engines.get(id).map(|e| e.active_index)
    }

    pub fn is_idle(&self, id: EngineId) -> bool {
        self.engines.get(id).map(|e| matches!(e.phase, Phase::Idle)).unwrap_or(true)
    }

    pub fn set_host_width(&mut self, id: EngineId, width: f64) {
        if let Some(engine) = self.engines.get_mut(id) {
            engine.host_width = width;
        }
    }

    /// Reflects an external tree change (stage added/removed, index applied
    /// by command). Any gesture or settle in flight is abandoned; the last
    /// committed state is the one being synced in.
    pub fn sync_host(&mut self, id: EngineId, stage_count: usize, active_index: usize) {
        if let Some(engine) = self.engines.get_mut(id) {
            engine.stage_count = stage_count;
            engine.active_index = active_index.min(stage_count.saturating_sub(1));
            engine.phase = Phase::Idle;
        }
    }

    pub fn handle_scroll(&mut self, id: EngineId, event: ScrollEvent) -> EventResponse {
        let mut response = EventResponse::default();
        self.scroll_inner(id, event, &mut response);
        response
    }

    /// Advances every in-flight settle by `dt` seconds of wall-clock time.
    /// The slow-motion debug scale applies here and only here.
    pub fn tick(&mut self, dt: f64) -> EventResponse {
        let dt = dt * self.settings.time_scale();
        let spring = self.spring();
        let mut response = EventResponse::default();
        for (id, engine) in self.engines.iter_mut() {
            let Phase::Settling { target_index, spring: state } = &mut engine.phase else {
                continue;
            };
            *state = spring.step(*state, dt);
            if spring.is_settled(*state) {
                let target = *target_index;
                let committed = target != engine.active_index;
                engine.active_index = target;
                engine.phase = Phase::Idle;
                response.push(id, NavEvent::OffsetChanged { base_index: target, offset: 0.0 });
                if committed {
                    debug!(?id, index = target, "stage index committed");
                    response.push(id, NavEvent::IndexCommitted { index: target });
                }
            } else {
                response.push(id, NavEvent::OffsetChanged {
                    base_index: *target_index,
                    offset: state.displacement,
                });
            }
        }
        response
    }

    fn spring(&self) -> Spring {
        Spring {
            stiffness: self.settings.spring_stiffness,
            damping: self.settings.spring_damping,
            mass: self.settings.spring_mass,
        }
    }

    fn scroll_inner(&mut self, id: EngineId, event: ScrollEvent, out: &mut EventResponse) {
        let Some(engine) = self.engines.get(id) else { return };
        if engine.host_width <= 0.0 {
            return;
        }
        let phase = engine.phase;
        let parent = engine.parent;

        match event.phase {
            ScrollPhase::Began => {
                self.begin_gesture(id, event, out);
            }
            ScrollPhase::Changed => match phase {
                // Tolerate a missed `began`: adopt whatever position the
                // host is at and continue.
                Phase::Idle | Phase::Settling { .. } => {
                    self.begin_gesture(id, event, out);
                }
                Phase::Gesturing { .. } => {
                    self.continue_gesture(id, event, out);
                }
                Phase::Bubbling { .. } => {
                    self.continue_bubbling(id, event, out);
                }
            },
            ScrollPhase::Ended | ScrollPhase::Cancelled => {
                let cancelled = event.phase == ScrollPhase::Cancelled;
                match phase {
                    Phase::Gesturing { amount, velocity } => {
                        self.end_gesture(id, amount, velocity, cancelled, out);
                    }
                    Phase::Bubbling { edge_amount, .. } => {
                        // The parent owns the live part of this gesture.
                        if let Some(parent) = parent {
                            self.scroll_inner(parent, event, out);
                        }
                        self.end_gesture(id, edge_amount, 0.0, cancelled, out);
                    }
                    Phase::Idle | Phase::Settling { .. } => {}
                }
            }
        }
    }

    /// Starts (or restarts) a gesture, folding in any in-flight settle so
    /// the visible offset carries over without a jump.
    fn begin_gesture(&mut self, id: EngineId, event: ScrollEvent, out: &mut EventResponse) {
        let Some(engine) = self.engines.get_mut(id) else { return };
        let baseline = match engine.phase {
            Phase::Settling { target_index, spring } => {
                // The settle was gliding toward `target_index`; its rest
                // position expressed in the still-active coordinate is one
                // full step, plus whatever displacement remains.
                let step = engine.active_index as f64 - target_index as f64;
                step + spring.displacement / engine.host_width
            }
            Phase::Gesturing { amount, .. } | Phase::Bubbling { edge_amount: amount, .. } => amount,
            Phase::Idle => 0.0,
        };
        let amount = baseline + event.delta_x / engine.host_width;
        engine.phase = Phase::Gesturing { amount, velocity: 0.0 };
        let offset = engine.visual_amount(amount, &self.settings) * engine.host_width;
        let base_index = engine.active_index;
        trace!(?id, amount, "gesture began");
        out.push(id, NavEvent::OffsetChanged { base_index, offset });
    }

    fn continue_gesture(&mut self, id: EngineId, event: ScrollEvent, out: &mut EventResponse) {
        let Some(engine) = self.engines.get_mut(id) else { return };
        let Phase::Gesturing { amount, velocity } = engine.phase else { return };

        let velocity = if event.delta_t > 0.0 {
            0.7 * velocity + 0.3 * (event.delta_x / event.delta_t)
        } else {
            velocity
        };
        let prev_amount = amount;
        let amount = amount + event.delta_x / engine.host_width;

        // Already at an edge with the delta still pushing outward: hand the
        // gesture to the parent host. Local state pins to the edge first so
        // no motion is double-counted.
        let max_left = engine.max_left();
        let max_right = engine.max_right();
        let outward_left = prev_amount >= max_left && event.delta_x > 0.0;
        let outward_right = prev_amount <= -max_right && event.delta_x < 0.0;
        if (outward_left || outward_right) && engine.parent.is_some() {
            let edge_amount = if outward_left { max_left } else { -max_right };
            let direction = if outward_left { 1.0 } else { -1.0 };
            let parent = engine.parent;
            let base_index = engine.active_index;
            let offset = edge_amount * engine.host_width;
            engine.phase = Phase::Bubbling { edge_amount, direction };
            trace!(?id, ?parent, "gesture bubbled to parent");
            out.push(id, NavEvent::OffsetChanged { base_index, offset });
            out.push(id, NavEvent::BubbledToParent);
            if let Some(parent) = parent {
                self.scroll_inner(parent, event, out);
            }
            return;
        }

        engine.phase = Phase::Gesturing { amount, velocity };
        let offset = engine.visual_amount(amount, &self.settings) * engine.host_width;
        let base_index = engine.active_index;
        out.push(id, NavEvent::OffsetChanged { base_index, offset });
    }

    fn continue_bubbling(&mut self, id: EngineId, event: ScrollEvent, out: &mut EventResponse) {
        let Some(engine) = self.engines.get(id) else { return };
        let Phase::Bubbling { edge_amount, direction } = engine.phase else { return };
        let parent = engine.parent;

        let reversed = event.delta_x != 0.0 && event.delta_x.signum() == -direction;
        if reversed {
            // Coming back into bounds: the parent's share of the gesture is
            // over; resume consuming locally from the edge.
            if let Some(parent) = parent {
                self.scroll_inner(parent, ScrollEvent::ended(), out);
            }
            if let Some(engine) = self.engines.get_mut(id) {
                engine.phase = Phase::Gesturing { amount: edge_amount, velocity: 0.0 };
            }
            self.continue_gesture(id, event, out);
            return;
        }

        if let Some(parent) = parent {
            self.scroll_inner(parent, event, out);
        }
    }

    fn end_gesture(
        &mut self,
        id: EngineId,
        amount: f64,
        velocity: f64,
        cancelled: bool,
        out: &mut EventResponse,
    ) {
        let spring = self.spring();
        let Some(engine) = self.engines.get_mut(id) else { return };
        let max_left = engine.max_left();
        let max_right = engine.max_right();

        // Velocity wins over position; either way at most one step commits
        // per gesture, however far it was dragged.
        let step = if cancelled {
            0.0
        } else if velocity.abs() > self.settings.flick_threshold {
            velocity.signum()
        } else {
            let clamped = amount.clamp(-max_right, max_left);
            if clamped.abs() >= self.settings.drag_threshold {
                clamped.signum()
            } else {
                0.0
            }
        };

        let target_index = if step > 0.0 && engine.active_index > 0 {
            engine.active_index - 1
        } else if step < 0.0 && engine.active_index + 1 < engine.stage_count {
            engine.active_index + 1
        } else {
            engine.active_index
        };
        let committed = target_index != engine.active_index;
        let step_taken = engine.active_index as f64 - target_index as f64;

        let visual = engine.visual_amount(amount, &self.settings);
        let displacement = (visual - step_taken) * engine.host_width;
        let spring_velocity = if cancelled { 0.0 } else { velocity };
        let state = SpringState { displacement, velocity: spring_velocity };

        debug!(
            ?id,
            amount,
            velocity,
            committed,
            target = target_index,
            cancelled,
            "gesture ended"
        );
        out.push(id, NavEvent::GestureEnded { committed });

        if spring.is_settled(state) {
            // Nothing visible left to animate; land immediately.
            engine.active_index = target_index;
            engine.phase = Phase::Idle;
            out.push(id, NavEvent::OffsetChanged { base_index: target_index, offset: 0.0 });
            if committed {
                out.push(id, NavEvent::IndexCommitted { index: target_index });
            }
        } else {
            engine.phase = Phase::Settling { target_index, spring: state };
            out.push(id, NavEvent::OffsetChanged {
                base_index: target_index,
                offset: state.displacement,
            });
        }
    }
}
