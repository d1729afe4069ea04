pub mod dimension_repository;
pub mod fact_repository;

// Re-export all repositories for convenient access
pub use dimension_repository::DimensionRepository;
pub use fact_repository::FactRepository;
