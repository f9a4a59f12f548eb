use synapse_db::Database;
use synapse_types::error::StorageError;

use crate::boundary::KeyValueStorage;

impl KeyValueStorage for Database {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.get_preference(key)
            .map_err(|e| StorageError::Read(e.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set_preference(key, value)
            .map_err(|e| StorageError::Write(e.to_string()))
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.delete_preference(key)
            .map_err(|e| StorageError::Write(e.to_string()))
    }
}
