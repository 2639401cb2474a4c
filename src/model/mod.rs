pub mod architecture;
pub mod constants;
pub mod data;
pub mod sampling;
pub mod training;
