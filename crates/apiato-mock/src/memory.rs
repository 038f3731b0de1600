use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::{Map, Value};

pub type Record = Map<String, Value>;

/// Apiato's `PAGINATION_LIMIT_DEFAULT`.
pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// A parsed list request. `limit == Some(0)` disables pagination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub page: Option<usize>,
    pub order_by: Option<String>,
    pub direction: Option<Direction>,
    pub ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    pub total: usize,
    pub per_page: usize,
    pub current_page: usize,
}

impl Page {
    pub fn total_pages(&self) -> usize {
        if self.per_page == 0 {
            return 1;
        }
        self.total.div_ceil(self.per_page).max(1)
    }
}

/// Records per resource, keyed by id. Ids come from one counter shared by
/// every resource.
#[derive(Clone)]
pub struct MemoryStore {
    resources: Arc<DashMap<String, BTreeMap<i64, Record>>>,
    next_id: Arc<AtomicI64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            resources: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    pub fn list(&self, resource: &str, query: &ListQuery) -> Page {
        let mut records: Vec<Record> = self
            .resources
            .get(resource)
            .map(|r| {
                r.iter()
                    .filter(|(id, _)| query.ids.as_ref().map_or(true, |ids| ids.contains(*id)))
                    .map(|(_, rec)| rec.clone())
                    .collect()
            })
            .unwrap_or_default();

        if let Some(field) = &query.order_by {
            records.sort_by(|a, b| compare_values(a.get(field), b.get(field)));
            if query.direction == Some(Direction::Desc) {
                records.reverse();
            }
        }

        let total = records.len();
        let per_page = query.limit.unwrap_or(DEFAULT_LIMIT);
        let current_page = query.page.unwrap_or(1).max(1);
        if per_page > 0 {
            let start = (current_page - 1).saturating_mul(per_page);
            records = records.into_iter().skip(start).take(per_page).collect();
        }

        Page {
            records,
            total,
            per_page,
            current_page,
        }
    }

    pub fn get(&self, resource: &str, id: i64) -> Option<Record> {
        self.resources.get(resource)?.get(&id).cloned()
    }

    pub fn create(&self, resource: &str, mut fields: Record) -> Record {
        let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
        let now = Value::from(Utc::now().to_rfc3339());
        fields.insert("id".into(), Value::from(id));
        fields.insert("created_at".into(), now.clone());
        fields.insert("updated_at".into(), now);
        self.resources
            .entry(resource.to_string())
            .or_default()
            .insert(id, fields.clone());
        fields
    }

    /// Shallow merge of `changes` into the stored record. `id` is immutable.
    pub fn update(&self, resource: &str, id: i64, mut changes: Record) -> Option<Record> {
        changes.remove("id");
        let mut records = self.resources.get_mut(resource)?;
        let record = records.get_mut(&id)?;
        record.extend(changes);
        record.insert("updated_at".into(), Value::from(Utc::now().to_rfc3339()));
        Some(record.clone())
    }

    pub fn delete(&self, resource: &str, id: i64) -> Option<Record> {
        self.resources.get_mut(resource)?.remove(&id)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Missing fields sort first, numbers numerically, strings lexically;
/// anything else by its JSON text.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}
