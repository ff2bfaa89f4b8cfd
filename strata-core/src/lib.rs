//! Strata Core - Entity Types
//!
//! Pure data structures shared by every strata crate: the six cached entity
//! kinds, their field descriptor tables, cache options and error types.
//! This crate contains no cache behavior beyond the pure field projector.

mod config;
mod entities;
mod enums;
mod error;
mod fields;
mod identity;
mod projection;

pub use config::{CacheOptions, KindOptions};
pub use entities::{CachedEntity, Channel, Guild, Member, Message, Role, User};
pub use enums::{ChannelKind, EntityKind};
pub use error::{CacheError, CacheResult, ConfigError, StorageError, ValidationError};
pub use fields::{field_names, FieldDescriptor, ID_FIELD};
pub use identity::{parse_snowflake, snowflake, IntoSnowflake, Snowflake, Timestamp};
pub use projection::{present_fields, project, FieldProjection};
