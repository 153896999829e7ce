//! Domain layer - Pure business logic.

pub mod compression;
pub mod gate;
pub mod media;
pub mod naming;
pub mod selection;
