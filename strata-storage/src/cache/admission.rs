//! Admission filter.
//!
//! A per-kind async predicate, supplied at construction, that decides whether
//! an entity may enter any tier. It runs before projection and sees the full
//! decoded entity.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use strata_core::{CacheResult, CachedEntity, Channel, Guild, Member, Message, Role, User};

use super::kind::TieredEntity;

/// Decides whether an entity of kind `T` may be cached.
#[async_trait]
pub trait AdmissionPolicy<T: CachedEntity>: Send + Sync {
    /// `Ok(false)` and `Err(_)` both leave every tier untouched.
    async fn admit(&self, entity: &T) -> CacheResult<bool>;
}

/// Adapter for synchronous predicates.
pub struct FnAdmission<T, F> {
    predicate: F,
    _kind: PhantomData<fn(&T)>,
}

impl<T, F> FnAdmission<T, F>
where
    F: Fn(&T) -> bool,
{
    pub fn new(predicate: F) -> Self {
        Self {
            predicate,
            _kind: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F> AdmissionPolicy<T> for FnAdmission<T, F>
where
    T: CachedEntity,
    F: Fn(&T) -> bool + Send + Sync,
{
    async fn admit(&self, entity: &T) -> CacheResult<bool> {
        Ok((self.predicate)(entity))
    }
}

/// Wrap a closure as a shareable admission policy.
pub fn admit_fn<T, F>(predicate: F) -> Arc<dyn AdmissionPolicy<T>>
where
    T: CachedEntity,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    Arc::new(FnAdmission::new(predicate))
}

/// One optional policy per kind.
#[derive(Clone, Default)]
pub struct AdmissionTable {
    pub(crate) guilds: Option<Arc<dyn AdmissionPolicy<Guild>>>,
    pub(crate) channels: Option<Arc<dyn AdmissionPolicy<Channel>>>,
    pub(crate) roles: Option<Arc<dyn AdmissionPolicy<Role>>>,
    pub(crate) members: Option<Arc<dyn AdmissionPolicy<Member>>>,
    pub(crate) messages: Option<Arc<dyn AdmissionPolicy<Message>>>,
    pub(crate) users: Option<Arc<dyn AdmissionPolicy<User>>>,
}

impl AdmissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: TieredEntity>(&mut self, policy: Arc<dyn AdmissionPolicy<T>>) {
        *T::admission_mut(self) = Some(policy);
    }

    pub fn has<T: TieredEntity>(&self) -> bool {
        T::admission(self).is_some()
    }

    /// Run the policy for `T`, if one is installed.
    ///
    /// A policy error is logged and counts as a rejection.
    pub async fn admits<T: TieredEntity>(&self, entity: &T) -> bool {
        let Some(policy) = T::admission(self) else {
            return true;
        };
        match policy.admit(entity).await {
            Ok(admitted) => admitted,
            Err(e) => {
                tracing::warn!(
                    kind = %T::KIND,
                    id = entity.id(),
                    error = %e,
                    "Admission policy failed, treating as rejection"
                );
                false
            }
        }
    }
}

impl fmt::Debug for AdmissionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionTable")
            .field("guilds", &self.guilds.is_some())
            .field("channels", &self.channels.is_some())
            .field("roles", &self.roles.is_some())
            .field("members", &self.members.is_some())
            .field("messages", &self.messages.is_some())
            .field("users", &self.users.is_some())
            .finish()
    }
}
