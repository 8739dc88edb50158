//! IMDb to TMDB identifier cross-reference with a persistent memo.

pub mod postgres;
pub mod repository;
pub mod resolver;

pub use postgres::PostgresIdMappingRepository;
pub use repository::{
    Disposition, IdMapping, IdMappingRepository, MemoryIdMappingRepository, RepositoryError,
};
pub use resolver::{IdentifierResolver, TitleMatch, TmdbMatch};
