//! Direct-message threads

pub mod entity;
pub mod repository;
pub mod service;

pub use entity::{DmMessage, DmThread, MessageContent, MessagePage, PageRequest, ThreadSummary};
pub use repository::ThreadRepository;
pub use service::MessagingService;
