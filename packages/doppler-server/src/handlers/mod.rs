mod audio;
mod car;
mod health;
mod upload;

pub use audio::*;
pub use car::*;
pub use health::*;
