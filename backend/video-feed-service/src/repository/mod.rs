mod videos;

pub use videos::{PgVideoRepository, RecordStore};
