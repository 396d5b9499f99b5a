pub mod types;
pub mod errors;
pub mod board;
pub mod movegen;
pub mod executor;
pub mod game;
pub mod view;
pub mod engine;
pub mod perft;
