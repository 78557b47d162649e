//! Probabilistic admission machinery: the doorkeeper filter and the
//! count-min frequency sketch.

mod doorkeeper;
mod frequency;

pub(crate) use doorkeeper::Doorkeeper;
pub(crate) use frequency::FrequencySketch;
