pub mod station;
pub mod track;
