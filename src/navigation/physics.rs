//! Motion primitives for the gesture engine: rubber-band edge resistance
//! and the damped spring used for settling. Both are pure; the spring is
//! advanced by an externally driven tick so tests run without timers.

/// Settle stops once displacement is within half a pixel...
pub const REST_DISPLACEMENT: f64 = 0.5;
/// ...and velocity is below this (px/s).
pub const REST_VELOCITY: f64 = 10.0;

/// Sub-linear resistance applied to travel past a navigation edge.
///
/// Strictly increasing, always below the identity, and asymptotically
/// bounded by `dimension / coefficient`: pushing harder keeps yielding
/// less visual travel.
pub fn rubber_band(excess: f64, dimension: f64, coefficient: f64) -> f64 {
    (excess * dimension * coefficient) / (dimension + coefficient * excess)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    pub stiffness: f64,
    pub damping: f64,
    pub mass: f64,
}

impl Default for Spring {
    fn default() -> Self {
        Spring { stiffness: 300.0, damping: 25.0, mass: 1.0 }
    }
}

/// Displacement (px from the rest position) and velocity (px/s) of a
/// settling host.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpringState {
    pub displacement: f64,
    pub velocity: f64,
}

impl Spring {
    /// Semi-implicit Euler step of `a = (-k·x - c·v) / m`.
    pub fn step(&self, state: SpringState, dt: f64) -> SpringState {
        let accel =
            (-self.stiffness * state.displacement - self.damping * state.velocity) / self.mass;
        let velocity = state.velocity + accel * dt;
        let displacement = state.displacement + velocity * dt;
        SpringState { displacement, velocity }
    }

    pub fn is_settled(&self, state: SpringState) -> bool {
        state.displacement.abs() < REST_DISPLACEMENT && state.velocity.abs() < REST_VELOCITY
    }
}
