// Service exports
pub mod appwrite;
pub mod matching;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use appwrite::{AppwriteRepository, AppwriteCollections, AppwriteError};
pub use matching::{MatchingService, MatchOutcome, MatchServiceError};
pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;
pub use repository::{MentorshipRepository, RepositoryError};
