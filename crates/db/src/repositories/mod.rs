pub mod station_repo;
pub mod track_repo;

pub use station_repo::StationRepo;
pub use track_repo::TrackRepo;
