//! Identity types for cached entities

use chrono::{DateTime, Utc};

use crate::{CacheResult, ValidationError};

/// Platform identifier: a 64-bit unsigned integer.
///
/// Upstream payloads carry these as decimal strings because JSON numbers
/// lose precision past 2^53. The cache works on the integer form; the
/// [`IntoSnowflake`] boundary and the [`snowflake`] serde helpers do the
/// coercion.
pub type Snowflake = u64;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Parse a decimal identifier string.
pub fn parse_snowflake(raw: &str) -> CacheResult<Snowflake> {
    raw.trim().parse::<u64>().map_err(|_| {
        ValidationError::InvalidSnowflake {
            raw: raw.to_string(),
        }
        .into()
    })
}

/// Anything that can name an entity at the store boundary.
pub trait IntoSnowflake {
    fn into_snowflake(self) -> CacheResult<Snowflake>;
}

impl IntoSnowflake for Snowflake {
    fn into_snowflake(self) -> CacheResult<Snowflake> {
        Ok(self)
    }
}

impl IntoSnowflake for &str {
    fn into_snowflake(self) -> CacheResult<Snowflake> {
        parse_snowflake(self)
    }
}

impl IntoSnowflake for String {
    fn into_snowflake(self) -> CacheResult<Snowflake> {
        parse_snowflake(&self)
    }
}

impl IntoSnowflake for &String {
    fn into_snowflake(self) -> CacheResult<Snowflake> {
        parse_snowflake(self)
    }
}

/// Serde helpers for identifier fields.
///
/// Serializes as a decimal string; deserializes from either a string or an
/// unsigned integer.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Row {
///     #[serde(with = "snowflake")]
///     id: Snowflake,
///     #[serde(with = "snowflake::option", default)]
///     guild_id: Option<Snowflake>,
/// }
/// ```
pub mod snowflake {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Snowflake;

    pub fn serialize<S: Serializer>(id: &Snowflake, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Snowflake, D::Error> {
        deserializer.deserialize_any(SnowflakeVisitor)
    }

    struct SnowflakeVisitor;

    impl<'de> Visitor<'de> for SnowflakeVisitor {
        type Value = Snowflake;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a snowflake as a decimal string or unsigned integer")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Snowflake, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Snowflake, E> {
            u64::try_from(value).map_err(|_| E::custom(format!("negative snowflake: {value}")))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Snowflake, E> {
            value
                .trim()
                .parse::<u64>()
                .map_err(|_| E::custom(format!("invalid snowflake: {value:?}")))
        }
    }

    #[derive(Deserialize)]
    struct Wrapped(#[serde(deserialize_with = "deserialize")] Snowflake);

    /// Helpers for `Option<Snowflake>` fields. Pair with `#[serde(default)]`.
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        use super::{Snowflake, Wrapped};

        pub fn serialize<S: Serializer>(
            id: &Option<Snowflake>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match id {
                Some(id) => serializer.serialize_some(&id.to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Snowflake>, D::Error> {
            Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|w| w.0))
        }
    }

    /// Helpers for `Vec<Snowflake>` fields. Pair with `#[serde(default)]`.
    pub mod list {
        use serde::{Deserialize, Deserializer, Serializer};

        use super::{Snowflake, Wrapped};

        pub fn serialize<S: Serializer>(ids: &[Snowflake], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(ids.iter().map(|id| id.to_string()))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<Snowflake>, D::Error> {
            Ok(Vec::<Wrapped>::deserialize(deserializer)?
                .into_iter()
                .map(|w| w.0)
                .collect())
        }
    }
}
