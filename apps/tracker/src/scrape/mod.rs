pub mod collector;
pub mod driver;
pub mod fetch;
pub mod parser;

pub use collector::PageCollector;
pub use driver::{PaginationDriver, PaginationSettings};
pub use fetch::HttpPageFetcher;
pub use parser::MalPeopleParser;
