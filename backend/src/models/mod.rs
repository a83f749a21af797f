//! Domain types shared by the engine, the services and the HTTP layer.

pub mod bloom;
pub mod observation;
pub mod prediction;
pub mod series;
pub mod time;

pub use bloom::*;
pub use observation::*;
pub use prediction::*;
pub use series::*;
pub use time::*;
