pub mod captions;
pub mod db;
pub mod doc_extract;
pub mod gen_llm;
pub mod web_fetch;

pub use captions::TimedTextCaptions;
pub use db::DbAdapter;
pub use doc_extract::DocTextAdapter;
pub use gen_llm::OpenAiGenAdapter;
pub use web_fetch::HttpPageFetcher;
