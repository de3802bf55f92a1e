pub mod client;
pub mod mapping;

pub use client::{NotionSettings, NotionStore};
pub use mapping::{native_properties, page_to_record, NotionPage, PropertyNames};
