use crate::client::lock;
use crate::Result;
use std::sync::{Arc, Mutex};
use tooldex_index::{ComponentFilter, ComponentRow, Database};
use tooldex_types::ComponentKey;

pub struct ComponentOps {
    db: Arc<Mutex<Database>>,
}

impl ComponentOps {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    pub fn list(&self, filter: &ComponentFilter) -> Result<Vec<ComponentRow>> {
        let db = lock(&self.db)?;
        Ok(db.list_components(filter)?)
    }

    pub fn count(&self, filter: &ComponentFilter) -> Result<usize> {
        let db = lock(&self.db)?;
        Ok(db.count_components(filter)?)
    }

    pub fn get(&self, key: &ComponentKey) -> Result<Option<ComponentRow>> {
        let db = lock(&self.db)?;
        Ok(db.get_component(key)?)
    }

    /// Full-text search ranked by relevance; blank queries match nothing
    pub fn search(&self, query: &str, filter: &ComponentFilter) -> Result<Vec<ComponentRow>> {
        let db = lock(&self.db)?;
        Ok(db.search(query, filter)?)
    }
}
