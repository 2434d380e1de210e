//! Query result type

/// Where a query answer came from
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult<T> {
    /// Fresh cached data; no fetch was issued
    Hit(T),
    /// Stale cached data, served while a refetch may run in the background
    Stale(T),
    /// Data produced by a fetch this call waited on (possibly shared)
    Fetched(T),
}

impl<T> QueryResult<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, QueryResult::Hit(_))
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, QueryResult::Stale(_))
    }

    pub fn is_fetched(&self) -> bool {
        matches!(self, QueryResult::Fetched(_))
    }

    /// Borrow the payload
    pub fn get(&self) -> &T {
        match self {
            QueryResult::Hit(value) | QueryResult::Stale(value) | QueryResult::Fetched(value) => {
                value
            }
        }
    }

    /// Extract the payload, consuming the result
    pub fn value(self) -> T {
        match self {
            QueryResult::Hit(value) | QueryResult::Stale(value) | QueryResult::Fetched(value) => {
                value
            }
        }
    }

    /// Map the payload, keeping the origin
    pub fn map<U, F>(self, f: F) -> QueryResult<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            QueryResult::Hit(value) => QueryResult::Hit(f(value)),
            QueryResult::Stale(value) => QueryResult::Stale(f(value)),
            QueryResult::Fetched(value) => QueryResult::Fetched(f(value)),
        }
    }
}
