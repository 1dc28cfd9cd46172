pub mod accumulator;
pub mod backend;
pub mod conversation;
pub mod decoder;
pub mod session;
