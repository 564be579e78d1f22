pub mod blob;
pub mod data;
pub mod system;
pub mod ws;
