//! Field projection.
//!
//! Rules, in order: the identifier is always kept; a field named in the
//! desired list is kept; when the desired list is non-empty nothing else is
//! kept; otherwise a field is kept unless it is named in the undesired list.

use crate::{CacheOptions, CachedEntity, KindOptions, ID_FIELD};

/// Desired/undesired field lists for one kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldProjection {
    desired: Vec<String>,
    undesired: Vec<String>,
}

impl FieldProjection {
    pub fn new(desired: Vec<String>, undesired: Vec<String>) -> Self {
        Self { desired, undesired }
    }

    pub fn from_options(options: &KindOptions) -> Self {
        Self::new(options.desired_props.clone(), options.undesired_props.clone())
    }

    /// True when projection keeps every field.
    pub fn is_identity(&self) -> bool {
        self.desired.is_empty() && self.undesired.is_empty()
    }

    pub fn retains(&self, field: &str) -> bool {
        if field == ID_FIELD || self.desired.iter().any(|f| f == field) {
            return true;
        }
        if !self.desired.is_empty() {
            return false;
        }
        !self.undesired.iter().any(|f| f == field)
    }

    pub fn project<T: CachedEntity>(&self, mut entity: T) -> T {
        if self.is_identity() {
            return entity;
        }
        for field in T::fields() {
            if !self.retains(field.name()) {
                field.clear(&mut entity);
            }
        }
        entity
    }
}

/// Project `entity` with the lists configured for its kind.
pub fn project<T: CachedEntity>(entity: T, options: &CacheOptions) -> T {
    FieldProjection::from_options(options.kind(T::KIND)).project(entity)
}

/// Names of the fields that carry a value, identifier first.
pub fn present_fields<T: CachedEntity>(entity: &T) -> Vec<&'static str> {
    std::iter::once(ID_FIELD)
        .chain(
            T::fields()
                .iter()
                .filter(|field| field.is_present(entity))
                .map(|field| field.name()),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntityKind, User};

    fn full_user() -> User {
        User {
            id: 42,
            username: Some("wumpus".into()),
            discriminator: Some("0001".into()),
            global_name: Some("Wumpus".into()),
            avatar: Some("a_1".into()),
            bot: Some(false),
            email: Some("wumpus@example.com".into()),
            locale: Some("en-US".into()),
        }
    }

    fn lists(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_identity_projection_keeps_everything() {
        let projection = FieldProjection::default();
        assert!(projection.is_identity());
        assert_eq!(projection.project(full_user()), full_user());
    }

    #[test]
    fn test_undesired_fields_are_dropped() {
        let projection = FieldProjection::new(vec![], lists(&["email", "locale"]));
        let user = projection.project(full_user());
        assert_eq!(user.email, None);
        assert_eq!(user.locale, None);
        assert_eq!(user.username.as_deref(), Some("wumpus"));
    }

    #[test]
    fn test_desired_fields_are_exclusive() {
        let projection = FieldProjection::new(lists(&["username"]), vec![]);
        let user = projection.project(full_user());
        assert_eq!(present_fields(&user), vec!["id", "username"]);
    }

    #[test]
    fn test_desired_wins_over_undesired() {
        let projection = FieldProjection::new(lists(&["username"]), lists(&["username"]));
        let user = projection.project(full_user());
        assert_eq!(user.username.as_deref(), Some("wumpus"));
        assert_eq!(user.id, 42);
    }

    #[test]
    fn test_id_is_always_retained() {
        let projection = FieldProjection::new(vec![], lists(&["id"]));
        assert!(projection.retains("id"));
        let user = projection.project(full_user());
        assert_eq!(user.id, 42);
    }

    #[test]
    fn test_unknown_names_are_ignored() {
        let projection = FieldProjection::new(vec![], lists(&["no_such_field"]));
        assert_eq!(projection.project(full_user()), full_user());
    }

    #[test]
    fn test_project_uses_kind_options() {
        let mut options = CacheOptions::all_in_memory();
        options.kind_mut(EntityKind::User).undesired_props = lists(&["email"]);
        let user = project(full_user(), &options);
        assert_eq!(user.email, None);
        assert!(user.avatar.is_some());
    }
}
