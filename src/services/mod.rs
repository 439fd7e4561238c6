pub mod artifact_store;
pub mod assembler;
pub mod distributor;
pub mod export_fetcher;

pub use artifact_store::ArtifactStore;
pub use assembler::Assembler;
pub use distributor::Distributor;
pub use export_fetcher::ExportFetcher;
