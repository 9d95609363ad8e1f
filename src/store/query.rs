use crate::codec::ObjectCodec;
use crate::error::Result;
use crate::model::ItemId;
use crate::store::Store;

/// A filtered scan over the items of a [`Store`].
///
/// The id set is snapshotted when the query is built; intermediate
/// operations add predicates, terminal operations materialize matching
/// items through the store (and its cache). The query borrows the store
/// exclusively, so the snapshot cannot go stale.
pub struct Query<'s, C: ObjectCodec> {
    store: &'s mut Store<C>,
    ids: Vec<ItemId>,
    id_filters: Vec<Box<dyn Fn(ItemId) -> bool + 's>>,
    value_filters: Vec<Box<dyn Fn(&C::Value) -> bool + 's>>,
}

impl<'s, C: ObjectCodec> Query<'s, C>
where
    C::Value: Clone,
{
    pub(crate) fn new(store: &'s mut Store<C>) -> Self {
        let ids = store.ids();
        Self {
            store,
            ids,
            id_filters: Vec::new(),
            value_filters: Vec::new(),
        }
    }

    /// Keeps only items whose id satisfies `pred`.
    pub fn where_id(mut self, pred: impl Fn(ItemId) -> bool + 's) -> Self {
        self.id_filters.push(Box::new(pred));
        self
    }

    /// Keeps only items whose decoded value satisfies `pred`.
    pub fn where_value(mut self, pred: impl Fn(&C::Value) -> bool + 's) -> Self {
        self.value_filters.push(Box::new(pred));
        self
    }

    fn matches_id(&self, id: ItemId) -> bool {
        self.id_filters.iter().all(|pred| pred(id))
    }

    fn matches_value(&self, value: &C::Value) -> bool {
        self.value_filters.iter().all(|pred| pred(value))
    }

    /// The lowest-id item matching every predicate.
    pub fn first(mut self) -> Result<Option<(ItemId, C::Value)>> {
        let ids = std::mem::take(&mut self.ids);
        for id in ids {
            if !self.matches_id(id) {
                continue;
            }
            let value = self.store.get(id)?;
            if self.matches_value(&value) {
                return Ok(Some((id, value)));
            }
        }
        Ok(None)
    }

    /// The highest-id item matching every predicate.
    pub fn last(mut self) -> Result<Option<(ItemId, C::Value)>> {
        let ids = std::mem::take(&mut self.ids);
        for id in ids.into_iter().rev() {
            if !self.matches_id(id) {
                continue;
            }
            let value = self.store.get(id)?;
            if self.matches_value(&value) {
                return Ok(Some((id, value)));
            }
        }
        Ok(None)
    }

    /// Every matching item in ascending id order.
    pub fn all(mut self) -> Result<Vec<(ItemId, C::Value)>> {
        let ids = std::mem::take(&mut self.ids);
        let mut items = Vec::new();
        for id in ids {
            if !self.matches_id(id) {
                continue;
            }
            let value = self.store.get(id)?;
            if self.matches_value(&value) {
                items.push((id, value));
            }
        }
        Ok(items)
    }
}
