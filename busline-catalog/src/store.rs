use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use busline_core::{CoreError, CoreResult, Route, RouteId, RouteRepository};

use crate::seed;

/// Immutable, in-memory route catalog. Built once at startup and shared
/// behind an `Arc`, so readers never contend.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    routes: BTreeMap<RouteId, Route>,
}

impl CatalogStore {
    pub fn from_routes(routes: Vec<Route>) -> Result<Self, CatalogError> {
        let mut by_id = BTreeMap::new();

        for route in routes {
            if route.capacity == 0 {
                return Err(CatalogError::ZeroCapacity(route.id));
            }
            let id = route.id;
            if by_id.insert(id, route).is_some() {
                return Err(CatalogError::DuplicateRoute(id));
            }
        }

        Ok(Self { routes: by_id })
    }

    /// Loads a JSON array of routes.
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let routes: Vec<Route> = serde_json::from_str(&raw)?;
        let store = Self::from_routes(routes)?;
        info!("Loaded {} routes from {}", store.len(), path.display());
        Ok(store)
    }

    pub fn builtin() -> Self {
        Self {
            routes: seed::builtin_routes().into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    /// Routes between two cities on a date, earliest departure first.
    pub fn search(&self, origin: &str, destination: &str, date: NaiveDate) -> Vec<Route> {
        let mut found: Vec<Route> = self
            .routes
            .values()
            .filter(|r| r.serves(origin, destination) && r.operates_on(date))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.departure.cmp(&b.departure).then(a.id.cmp(&b.id)));
        found
    }

    pub fn get_by_id(&self, id: RouteId) -> Option<&Route> {
        self.routes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[async_trait]
impl RouteRepository for CatalogStore {
    async fn search_routes(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> CoreResult<Vec<Route>> {
        Ok(self.search(origin, destination, date))
    }

    async fn get_route(&self, id: RouteId) -> CoreResult<Route> {
        self.get_by_id(id).cloned().ok_or(CoreError::RouteNotFound(id))
    }

    async fn list_routes(&self) -> CoreResult<Vec<Route>> {
        Ok(self.routes.values().cloned().collect())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog seed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed catalog seed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate route id in catalog: {0}")]
    DuplicateRoute(RouteId),

    #[error("Route {0} has zero seat capacity")]
    ZeroCapacity(RouteId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    #[test]
    fn test_search_is_case_insensitive_and_date_filtered() {
        let catalog = CatalogStore::builtin();

        let found = catalog.search("pune", "HYDERABAD", date(3));
        let ids: Vec<RouteId> = found.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 5, 6]);

        assert!(catalog.search("Pune", "Hyderabad", date(9)).is_empty());
        assert!(catalog.search("Pune", "Chennai", date(3)).is_empty());
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let mut routes = seed::builtin_routes();
        routes.push(routes[0].clone());

        let err = CatalogStore::from_routes(routes).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateRoute(1)));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let mut routes = seed::builtin_routes();
        routes[2].capacity = 0;

        let err = CatalogStore::from_routes(routes).unwrap_err();
        assert!(matches!(err, CatalogError::ZeroCapacity(3)));
    }

    #[test]
    fn test_loads_seed_file() {
        let routes = vec![seed::builtin_routes().remove(0)];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&routes).unwrap().as_bytes()).unwrap();

        let catalog = CatalogStore::from_seed_file(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get_by_id(1).unwrap().name, "Luxury Express");
    }

    #[tokio::test]
    async fn test_repository_not_found() {
        let catalog = CatalogStore::builtin();

        let route = catalog.get_route(3).await.unwrap();
        assert_eq!(route.origin, "Delhi");

        let err = catalog.get_route(99).await.unwrap_err();
        assert!(matches!(err, CoreError::RouteNotFound(99)));
    }
}
