pub mod generator;
pub mod magics;
pub mod perft;
pub mod tables;
