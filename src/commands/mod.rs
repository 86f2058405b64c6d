pub mod detect;
pub mod extract;
pub mod papers;
pub mod score;
