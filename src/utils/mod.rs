pub mod algebraic;
pub mod fen;
pub mod long_algebraic;
pub mod render;
