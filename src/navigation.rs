pub mod engine;
pub mod physics;

pub use engine::{
    EngineId, EventResponse, GestureCoordinator, NavEvent, ScrollEvent, ScrollPhase,
};
pub use physics::{rubber_band, Spring, SpringState};

#[cfg(test)]
mod tests;
