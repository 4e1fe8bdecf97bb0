//! User domain

pub mod entity;
pub mod repository;
pub mod service;

pub use entity::{CreateUser, User};
pub use repository::UserRepository;
pub use service::UserService;
