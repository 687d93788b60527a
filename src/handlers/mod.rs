mod geo;
mod health;

pub use geo::{lookup, whoami};
pub use health::health_check;
