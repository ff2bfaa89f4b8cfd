//! Configuration types

use serde::{Deserialize, Serialize};

use crate::{field_names, CacheResult, ConfigError, EntityKind};

/// Placement and projection settings for one entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindOptions {
    /// Keep entities of this kind in memory. Nestable kinds are stored
    /// inside their parent when the parent kind is also kept in memory.
    pub in_memory: bool,
    /// Write entities of this kind through to the persistent tier.
    pub outside_memory: bool,
    /// Fields to keep. When non-empty, every other field is dropped.
    pub desired_props: Vec<String>,
    /// Fields to drop when `desired_props` is empty.
    pub undesired_props: Vec<String>,
}

impl KindOptions {
    /// Memory only.
    pub fn memory() -> Self {
        Self {
            in_memory: true,
            ..Default::default()
        }
    }

    /// Persistent tier only.
    pub fn persistent() -> Self {
        Self {
            outside_memory: true,
            ..Default::default()
        }
    }

    /// Memory and persistent tier.
    pub fn write_through() -> Self {
        Self {
            in_memory: true,
            outside_memory: true,
            ..Default::default()
        }
    }

    /// Never cached.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_desired<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.desired_props = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_undesired<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.undesired_props = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_cached(&self) -> bool {
        self.in_memory || self.outside_memory
    }
}

/// Cache options for all six kinds.
///
/// Loaded once at construction. Runtime collaborators (persistent tier,
/// admission policies) are attached separately by the cache builder.
///
/// ```toml
/// [guilds]
/// in_memory = true
///
/// [users]
/// in_memory = true
/// outside_memory = true
/// undesired_props = ["email"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    pub guilds: KindOptions,
    pub channels: KindOptions,
    pub roles: KindOptions,
    pub members: KindOptions,
    pub messages: KindOptions,
    pub users: KindOptions,
}

impl CacheOptions {
    /// Same settings for every kind.
    pub fn uniform(options: KindOptions) -> Self {
        Self {
            guilds: options.clone(),
            channels: options.clone(),
            roles: options.clone(),
            members: options.clone(),
            messages: options.clone(),
            users: options,
        }
    }

    /// Every kind in memory, which nests every nestable kind.
    pub fn all_in_memory() -> Self {
        Self::uniform(KindOptions::memory())
    }

    /// Parse options from TOML and validate them.
    pub fn from_toml_str(raw: &str) -> CacheResult<Self> {
        let options: Self = toml::from_str(raw).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        options.validate()?;
        Ok(options)
    }

    pub fn kind(&self, kind: EntityKind) -> &KindOptions {
        match kind {
            EntityKind::Guild => &self.guilds,
            EntityKind::Channel => &self.channels,
            EntityKind::Role => &self.roles,
            EntityKind::Member => &self.members,
            EntityKind::Message => &self.messages,
            EntityKind::User => &self.users,
        }
    }

    pub fn kind_mut(&mut self, kind: EntityKind) -> &mut KindOptions {
        match kind {
            EntityKind::Guild => &mut self.guilds,
            EntityKind::Channel => &mut self.channels,
            EntityKind::Role => &mut self.roles,
            EntityKind::Member => &mut self.members,
            EntityKind::Message => &mut self.messages,
            EntityKind::User => &mut self.users,
        }
    }

    /// Replace the settings for one kind.
    pub fn with_kind(mut self, kind: EntityKind, options: KindOptions) -> Self {
        *self.kind_mut(kind) = options;
        self
    }

    /// Whether in-memory entities of `kind` live inside their parent.
    pub fn is_nested(&self, kind: EntityKind) -> bool {
        match kind.parent() {
            Some(parent) => self.kind(kind).in_memory && self.kind(parent).in_memory,
            None => false,
        }
    }

    /// Validate the configuration.
    ///
    /// Every name in a desired/undesired list must be a field of its kind.
    pub fn validate(&self) -> CacheResult<()> {
        for kind in EntityKind::ALL {
            let known = field_names(kind);
            let options = self.kind(kind);
            for field in options.desired_props.iter().chain(&options.undesired_props) {
                if !known.contains(&field.as_str()) {
                    return Err(ConfigError::UnknownField {
                        kind,
                        field: field.clone(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CacheError;

    #[test]
    fn test_nesting_requires_parent_in_memory() {
        let options = CacheOptions::all_in_memory();
        assert!(options.is_nested(EntityKind::Channel));
        assert!(options.is_nested(EntityKind::Message));
        assert!(!options.is_nested(EntityKind::Guild));
        assert!(!options.is_nested(EntityKind::User));

        let options = options.with_kind(EntityKind::Guild, KindOptions::persistent());
        assert!(!options.is_nested(EntityKind::Role));
        assert!(!options.is_nested(EntityKind::Member));
        assert!(options.is_nested(EntityKind::Message));
    }

    #[test]
    fn test_from_toml_str() {
        let options = CacheOptions::from_toml_str(
            r#"
            [guilds]
            in_memory = true

            [users]
            in_memory = true
            outside_memory = true
            undesired_props = ["email"]
            "#,
        )
        .unwrap();
        assert!(options.guilds.in_memory);
        assert!(!options.guilds.outside_memory);
        assert!(options.users.outside_memory);
        assert_eq!(options.users.undesired_props, vec!["email".to_string()]);
        assert!(!options.messages.is_cached());
    }

    #[test]
    fn test_from_toml_str_rejects_unknown_field() {
        let err = CacheOptions::from_toml_str(
            r#"
            [members]
            in_memory = true
            desired_props = ["nick", "nickname"]
            "#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            CacheError::Config(ConfigError::UnknownField {
                kind: EntityKind::Member,
                field: "nickname".to_string(),
            })
        );
    }

    #[test]
    fn test_from_toml_str_reports_parse_errors() {
        let err = CacheOptions::from_toml_str("[guilds\nin_memory = yes").unwrap_err();
        assert!(matches!(err, CacheError::Config(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_validate_accepts_id_field() {
        let options = CacheOptions::default().with_kind(
            EntityKind::Role,
            KindOptions::memory().with_desired(["id", "name"]),
        );
        assert!(options.validate().is_ok());
    }
}
