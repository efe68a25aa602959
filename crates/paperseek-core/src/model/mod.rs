pub mod ids;
pub mod paper;
pub mod provenance;

pub use ids::{ObjectId, PaperId};
pub use paper::{Paper, PAPER_COLLECTION, TEXT_PROPERTY, TEXT_SEPARATOR, TITLE_PROPERTY};
pub use provenance::SampleProvenance;
