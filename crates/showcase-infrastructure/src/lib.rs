pub mod config_service;
pub mod dto;
pub mod identity_provider;
pub mod paths;
pub mod rest_message_repository;
pub mod storage;
pub mod toml_message_repository;

pub use crate::config_service::ConfigService;
pub use crate::identity_provider::ConfiguredIdentityProvider;
pub use crate::paths::ShowcasePaths;
pub use crate::rest_message_repository::RestMessageRepository;
pub use crate::storage::SecretStorage;
pub use crate::toml_message_repository::TomlMessageRepository;
