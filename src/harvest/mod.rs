//! Concrete collaborators for the article-harvest pipeline: the catalog
//! source, the TDM download processor, and the filesystem sink. The pipeline
//! core only ever sees them through its boundary traits.

pub mod catalog;
pub mod fetch;
pub mod sink;

pub use catalog::CrossrefCatalog;
pub use fetch::TdmClient;
pub use sink::{PdfDirSink, doi_to_filename};
