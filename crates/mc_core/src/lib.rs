pub mod catalog;
pub mod clip;
pub mod easing;
pub mod input;
pub mod media;
pub mod random;
pub mod time;
