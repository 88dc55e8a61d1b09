//! Pagination engine.
//!
//! Takes a [`PageRequest`] straight off the wire, composes the search and
//! find predicates onto one query, and returns a counted [`Page`]. The
//! total count is taken before offset and limit so it reflects the whole
//! matching set.

use crate::find::{apply_find, FindOperator};
use crate::search::apply_search;
use atrium_core::error::{AtriumResult, StorageError};
use atrium_core::query::{Join, SelectQuery, SortDirection, SortKey};
use atrium_core::schema::{Entity, EntityDescriptor, Record};
use atrium_core::EngineConfig;
use atrium_storage::SharedBackend;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Listing parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: Option<i64>,
    /// Page size; negative disables the limit entirely.
    #[serde(rename = "limit", default)]
    pub page_size: Option<i64>,
    /// `created_at,desc|updated_at,asc`
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(rename = "sort[]", default)]
    pub sort_array: Vec<String>,
    /// `name,like,john|email,like,john`
    #[serde(default)]
    pub search: Option<String>,
    #[serde(rename = "search[]", default)]
    pub search_array: Vec<String>,
    #[serde(default)]
    pub find: Option<String>,
    #[serde(rename = "find[]", default)]
    pub finds: Vec<String>,
    #[serde(default)]
    pub operator_find: FindOperator,
    #[serde(skip)]
    pub no_limit: bool,
}

impl PageRequest {
    /// The repeated form wins over the single form, joined with `&` so
    /// array entries AND together.
    fn effective_search(&self) -> Option<String> {
        if !self.search_array.is_empty() {
            return Some(self.search_array.join("&"));
        }
        self.search.clone().filter(|s| !s.is_empty())
    }

    fn find_values(&self) -> Vec<String> {
        let mut values = Vec::new();
        if let Some(find) = &self.find {
            if !find.is_empty() {
                values.push(find.clone());
            }
        }
        values.extend(self.finds.iter().filter(|f| !f.is_empty()).cloned());
        values
    }
}

/// One page of results plus the totals the client needs to render a
/// pager.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub page: i64,
    #[serde(rename = "limit")]
    pub page_size: i64,
    pub total_count: u64,
    pub total_page: u64,
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_count: Option<Value>,
}

/// Drives listing queries against a backend.
#[derive(Clone)]
pub struct Paginator {
    backend: SharedBackend,
    config: EngineConfig,
}

impl Paginator {
    pub fn new(backend: SharedBackend, config: EngineConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Paginate an entity listing, joining every declared relation so
    /// search and find can reach foreign columns.
    pub async fn paginate<T: Entity>(&self, request: &PageRequest) -> AtriumResult<Page<T>> {
        let descriptor = T::descriptor();
        let mut query = SelectQuery::table(descriptor.table);
        for relation in &descriptor.relations {
            query.join(Join {
                alias: relation.alias.to_string(),
                table: relation.table.to_string(),
                local_key: relation.local_key.to_string(),
            });
        }
        self.paginate_query(request, descriptor, query).await
    }

    /// Paginate an arbitrary base query, e.g. a changelog table scoped to
    /// one model. The caller owns the base predicate and table name.
    pub async fn paginate_query<T: Record>(
        &self,
        request: &PageRequest,
        descriptor: &EntityDescriptor,
        mut query: SelectQuery,
    ) -> AtriumResult<Page<T>> {
        if let Some(search) = request.effective_search() {
            apply_search(&mut query, descriptor, &search)?;
        }
        let finds = request.find_values();
        if !finds.is_empty() {
            apply_find(&mut query, descriptor, &finds, request.operator_find)?;
        }

        let total_count = self.backend.count(&query).await?;

        let page = request.page.unwrap_or(1).max(1);
        let mut page_size = request.page_size.unwrap_or(self.config.limit_per_page as i64);
        if request.no_limit {
            page_size = -1;
        }

        let total_page;
        if page_size < 0 {
            // unbounded: everything on one page
            total_page = 1;
            page_size = total_count as i64;
        } else {
            query.offset = Some((page as u64 - 1) * page_size as u64);
            query.limit = Some(page_size as u64);
            total_page = if page_size == 0 {
                0
            } else {
                let size = page_size as u64;
                total_count / size + u64::from(total_count % size != 0)
            };
        }

        apply_sort(&mut query, descriptor, &self.sort_spec(request));

        let rows = self.backend.select(&query).await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let item = serde_json::from_value(row).map_err(|e| StorageError::Serialization {
                entity: descriptor.entity,
                reason: e.to_string(),
            })?;
            items.push(item);
        }

        Ok(Page {
            page,
            page_size,
            total_count,
            total_page,
            items,
            meta_count: None,
        })
    }

    fn sort_spec(&self, request: &PageRequest) -> String {
        if !request.sort_array.is_empty() {
            return request.sort_array.join("|");
        }
        match &request.sort {
            Some(sort) if !sort.is_empty() => sort.clone(),
            _ => self.config.default_sort.clone(),
        }
    }
}

/// Parse a `field,dir|field,dir` sort spec onto the query. A bare
/// direction orders by `created_at`; keys with an unknown direction or a
/// column the descriptor does not declare are logged and skipped rather
/// than failing the listing. Columns land in identifier position of the
/// rendered statement, so undeclared names must never get through.
fn apply_sort(query: &mut SelectQuery, descriptor: &EntityDescriptor, spec: &str) {
    for token in spec.split('|') {
        if token.is_empty() {
            continue;
        }
        let parts: Vec<&str> = token.split(',').collect();
        let (column, direction) = match parts.as_slice() {
            [direction] => ("created_at", *direction),
            [column, direction] => (*column, *direction),
            _ => {
                tracing::warn!(sort = token, "skipping malformed sort key");
                continue;
            }
        };
        if descriptor.field(column).is_err() {
            tracing::warn!(sort = token, "skipping sort key with undeclared column");
            continue;
        }
        match SortDirection::parse(direction) {
            Some(direction) => query.sort.push(SortKey {
                column: column.to_string(),
                direction,
            }),
            None => {
                tracing::warn!(sort = token, "skipping sort key with unknown direction");
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_core::entities::Asset;
    use atrium_storage::MemoryBackend;
    use serde_json::json;

    async fn seeded() -> Paginator {
        let backend = MemoryBackend::new();
        for i in 0..25u32 {
            let zone = if i % 2 == 0 { "Sukhumvit" } else { "Silom" };
            backend
                .insert(
                    "assets",
                    json!({
                        "id": atrium_core::new_entity_id(),
                        "created_at": atrium_core::now(),
                        "updated_at": atrium_core::now(),
                        "project_id": atrium_core::new_entity_id(),
                        "no": format!("A-{i:03}"),
                        "zone": zone,
                        "price": 100 + i,
                    }),
                )
                .await
                .unwrap();
        }
        Paginator::new(backend.into_shared(), EngineConfig::default())
    }

    use atrium_storage::Backend;

    #[tokio::test]
    async fn test_defaults_page_one_size_ten() {
        let paginator = seeded().await;
        let page: Page<Asset> = paginator.paginate(&PageRequest::default()).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 10);
        assert_eq!(page.total_count, 25);
        assert_eq!(page.total_page, 3);
        assert_eq!(page.items.len(), 10);
    }

    #[tokio::test]
    async fn test_page_clamped_to_one() {
        let paginator = seeded().await;
        let request = PageRequest {
            page: Some(-3),
            ..Default::default()
        };
        let page: Page<Asset> = paginator.paginate(&request).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.items.len(), 10);
    }

    #[tokio::test]
    async fn test_negative_page_size_returns_everything() {
        let paginator = seeded().await;
        let request = PageRequest {
            page_size: Some(-1),
            ..Default::default()
        };
        let page: Page<Asset> = paginator.paginate(&request).await.unwrap();
        assert_eq!(page.items.len(), 25);
        assert_eq!(page.total_page, 1);
        // echoed size reflects the actual row count
        assert_eq!(page.page_size, 25);
    }

    #[tokio::test]
    async fn test_zero_page_size_returns_no_rows() {
        let paginator = seeded().await;
        let request = PageRequest {
            page_size: Some(0),
            ..Default::default()
        };
        let page: Page<Asset> = paginator.paginate(&request).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 25);
        assert_eq!(page.total_page, 0);
    }

    #[tokio::test]
    async fn test_pages_tile_without_overlap() {
        let paginator = seeded().await;
        let mut seen = Vec::new();
        for page_no in 1..=3 {
            let request = PageRequest {
                page: Some(page_no),
                sort: Some("no,asc".to_string()),
                ..Default::default()
            };
            let page: Page<Asset> = paginator.paginate(&request).await.unwrap();
            seen.extend(page.items.into_iter().map(|a| a.no.unwrap()));
        }
        assert_eq!(seen.len(), 25);
        let mut sorted = seen.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 25);
        assert_eq!(seen, sorted);
    }

    #[tokio::test]
    async fn test_search_narrows_and_counts() {
        let paginator = seeded().await;
        let request = PageRequest {
            search: Some("zone,eq,Sukhumvit".to_string()),
            ..Default::default()
        };
        let page: Page<Asset> = paginator.paginate(&request).await.unwrap();
        assert_eq!(page.total_count, 13);
        assert!(page.items.iter().all(|a| a.zone.as_deref() == Some("Sukhumvit")));
    }

    #[tokio::test]
    async fn test_find_broadcast_matches() {
        let paginator = seeded().await;
        let request = PageRequest {
            find: Some("A-007".to_string()),
            ..Default::default()
        };
        let page: Page<Asset> = paginator.paginate(&request).await.unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].no.as_deref(), Some("A-007"));
    }

    #[tokio::test]
    async fn test_search_and_find_combine_with_and() {
        let paginator = seeded().await;
        // find matches one row in Sukhumvit; search restricted to Silom
        let request = PageRequest {
            find: Some("A-008".to_string()),
            search: Some("zone,eq,Silom".to_string()),
            ..Default::default()
        };
        let page: Page<Asset> = paginator.paginate(&request).await.unwrap();
        assert_eq!(page.total_count, 0);
    }

    #[tokio::test]
    async fn test_invalid_sort_direction_skipped() {
        let paginator = seeded().await;
        let request = PageRequest {
            sort: Some("price,sideways".to_string()),
            ..Default::default()
        };
        // listing still succeeds, just unsorted
        let page: Page<Asset> = paginator.paginate(&request).await.unwrap();
        assert_eq!(page.items.len(), 10);
    }

    #[tokio::test]
    async fn test_bare_direction_sorts_created_at() {
        let mut query = SelectQuery::table("assets");
        apply_sort(&mut query, Asset::descriptor(), "desc");
        assert_eq!(query.sort.len(), 1);
        assert_eq!(query.sort[0].column, "created_at");
        assert_eq!(query.sort[0].direction, SortDirection::Desc);
    }

    #[test]
    fn test_undeclared_sort_column_skipped() {
        // sort columns render in identifier position, so anything the
        // descriptor does not declare stays out of the statement
        let mut query = SelectQuery::table("assets");
        apply_sort(
            &mut query,
            Asset::descriptor(),
            "price;DROP TABLE assets--,asc|price,asc",
        );
        assert_eq!(query.sort.len(), 1);
        assert_eq!(query.sort[0].column, "price");
    }

    #[tokio::test]
    async fn test_sort_array_overrides_single() {
        let paginator = seeded().await;
        let request = PageRequest {
            sort: Some("price,asc".to_string()),
            sort_array: vec!["price,desc".to_string()],
            ..Default::default()
        };
        let page: Page<Asset> = paginator.paginate(&request).await.unwrap();
        assert_eq!(page.items[0].price, Some(124.0));
    }

    #[test]
    fn test_request_wire_names() {
        let request: PageRequest = serde_json::from_value(json!({
            "page": 2,
            "limit": 5,
            "sort[]": ["price,asc"],
            "find[]": ["x"],
            "operator_find": "and"
        }))
        .unwrap();
        assert_eq!(request.page, Some(2));
        assert_eq!(request.page_size, Some(5));
        assert_eq!(request.sort_array, vec!["price,asc"]);
        assert_eq!(request.operator_find, FindOperator::And);
    }
}
