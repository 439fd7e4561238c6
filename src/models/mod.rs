pub mod artifact;
pub mod edition;

pub use artifact::{DistributionOutcome, MergedDocument, PageArtifact, PageStatus, RunResult};
pub use edition::Edition;
