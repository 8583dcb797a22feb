pub mod hygiene;
pub mod macros;
pub mod scripts;
pub mod tags;
