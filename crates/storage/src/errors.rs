pub(crate) use subgate_domain::storage::StorageError;
