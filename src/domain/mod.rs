//! Domain layer: the pointer record and the values that identify clones,
//! prefixes and tags.

pub mod entities;
pub mod value_objects;
