pub mod crawler;
pub mod error;
pub mod parser;
pub mod requester;
pub mod result;
pub mod scope;
pub mod throttle;

pub use crawler::{CancelFlag, Crawler, PageCallback, ProgressCallback};
pub use error::ScanError;
pub use parser::FormRecord;
pub use requester::{HttpMethod, HttpResponse, Requester, RequesterConfig};
pub use result::{CrawlOutput, CrawlResult};
pub use scope::TargetScope;
