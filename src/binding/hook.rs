use super::binding::{Binding, Setter};
use super::options::Options;
use crate::error::{Result, StorageError};
use crate::runtime::Context;
use crate::storage::{FnStorage, StorageArea};
use std::sync::Arc;

/// Binding factory tied to one store and one context.
///
/// Every binding it creates reads and writes the same store and
/// coordinates through the same context, whichever store that is.
#[derive(Clone)]
pub struct StorageHook {
    context: Context,
    storage: Arc<dyn StorageArea>,
}

impl StorageHook {
    pub fn new(context: &Context, storage: Arc<dyn StorageArea>) -> Self {
        Self {
            context: context.clone(),
            storage,
        }
    }

    /// A hook over a store given as a `get` closure and a `set` closure.
    pub fn from_fns<G, S>(context: &Context, get: G, set: S) -> Self
    where
        G: Fn(&str) -> std::result::Result<Option<String>, StorageError> + Send + Sync + 'static,
        S: Fn(&str, &str) -> std::result::Result<(), StorageError> + Send + Sync + 'static,
    {
        Self::new(context, Arc::new(FnStorage::new(get, set)))
    }

    /// Bind `key`, seeding it with `initial` if it holds nothing usable.
    ///
    /// Fails only if the store fails or `initial` cannot be encoded.
    pub fn use_storage<T>(
        &self,
        key: &str,
        initial: T,
        options: Options<T>,
    ) -> Result<(Binding<T>, Setter<T>)>
    where
        T: Clone + Send + Sync + 'static,
    {
        let binding = Binding::create(
            &self.context,
            Arc::clone(&self.storage),
            key,
            initial,
            options,
        )?;
        let setter = binding.setter();
        Ok((binding, setter))
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn storage(&self) -> &Arc<dyn StorageArea> {
        &self.storage
    }
}

/// Bind `key` in the current context's persistent store.
pub fn use_local_storage<T>(
    key: &str,
    initial: T,
    options: Options<T>,
) -> Result<(Binding<T>, Setter<T>)>
where
    T: Clone + Send + Sync + 'static,
{
    Context::current()
        .local_storage_hook()
        .use_storage(key, initial, options)
}

/// Bind `key` in the current context's session store.
pub fn use_session_storage<T>(
    key: &str,
    initial: T,
    options: Options<T>,
) -> Result<(Binding<T>, Setter<T>)>
where
    T: Clone + Send + Sync + 'static,
{
    Context::current()
        .session_storage_hook()
        .use_storage(key, initial, options)
}
