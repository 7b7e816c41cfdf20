pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use stub::StubExtractor;

#[cfg(feature = "backend-tract")]
pub use tract::TractExtractor;
