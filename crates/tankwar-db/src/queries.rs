//! Common query patterns for a stored session.

use crate::error::{Error, Result};
use crate::models::*;
use crate::store::SessionStore;
use tankwar_core::{ComponentKind, EntityId};

/// Summary of one stored (component, entity) table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub component: ComponentKind,
    pub entity: EntityId,
    pub len: u64,
}

impl SessionStore {
    /// List every table in the session, ordered by component then entity.
    pub fn tables(&self) -> Result<Vec<TableInfo>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredTable>()?;
        let iter = scan.all()?;
        let tables: std::result::Result<Vec<StoredTable>, _> = iter.collect();
        let tables = tables.map_err(|e| Error::Database(e.to_string()))?;

        let mut infos = tables
            .into_iter()
            .map(|t| t.to_info())
            .collect::<Result<Vec<_>>>()?;
        infos.sort_by_key(|info| (info.component, info.entity));
        Ok(infos)
    }

    /// Entities that have a table for the given component.
    pub fn entities_with(&self, component: ComponentKind) -> Result<Vec<EntityId>> {
        let r = self.db.r_transaction()?;
        let scan = r
            .scan()
            .secondary::<StoredTable>(StoredTableKey::component)?;
        let iter = scan.start_with(component.name())?;
        let tables: std::result::Result<Vec<StoredTable>, _> = iter.collect();
        let tables = tables.map_err(|e| Error::Database(e.to_string()))?;

        // Prefix match also hits longer names ("turret" vs "turrets")
        let mut ids: Vec<EntityId> = tables
            .into_iter()
            .filter(|t| t.component == component.name())
            .map(|t| EntityId::from_raw(t.entity))
            .collect();
        ids.sort();
        Ok(ids)
    }
}

impl StoredTable {
    fn to_info(&self) -> Result<TableInfo> {
        let component = self
            .component
            .parse()
            .map_err(|e: tankwar_core::Error| Error::Database(e.to_string()))?;
        Ok(TableInfo {
            component,
            entity: EntityId::from_raw(self.entity),
            len: self.len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tankwar_core::ComponentValue;

    #[test]
    fn test_tables_and_entities_with() {
        let store = SessionStore::in_memory().unwrap();
        let a = EntityId::new(1, 0);
        let b = EntityId::new(2, 0);

        store
            .append_sample(b, ComponentKind::Reward, 0, &ComponentValue::Reward(1.0))
            .unwrap();
        store
            .append_sample(a, ComponentKind::Reward, 0, &ComponentValue::Reward(1.0))
            .unwrap();
        store
            .append_sample(a, ComponentKind::Reward, 1, &ComponentValue::Reward(1.0))
            .unwrap();
        store
            .append_sample(a, ComponentKind::Rotation, 0, &ComponentValue::Rotation(0.5))
            .unwrap();

        assert_eq!(store.entities_with(ComponentKind::Reward).unwrap(), vec![a, b]);
        assert_eq!(store.entities_with(ComponentKind::Rotation).unwrap(), vec![a]);
        assert!(store.entities_with(ComponentKind::Image).unwrap().is_empty());

        let tables = store.tables().unwrap();
        assert_eq!(
            tables,
            vec![
                TableInfo { component: ComponentKind::Reward, entity: a, len: 2 },
                TableInfo { component: ComponentKind::Reward, entity: b, len: 1 },
                TableInfo { component: ComponentKind::Rotation, entity: a, len: 1 },
            ]
        );
    }
}
