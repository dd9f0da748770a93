//! Pagination-related DTOs for API requests.

use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

/// Query parameters for `GET /api/users`.
#[derive(Debug, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// Maximum number of users to return
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    #[param(minimum = 1, maximum = 100, example = 20)]
    pub limit: u32,

    /// Number of active users to skip
    #[serde(default)]
    #[param(minimum = 0, example = 0)]
    pub offset: u32,
}

impl Default for ListUsersQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults_when_absent() {
        let query: ListUsersQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert_eq!(query.offset, 0);
        assert!(query.validate().is_ok());
    }

    proptest! {
        #[test]
        fn prop_limit_accepted_only_within_bounds(limit in 0u32..1000, offset in any::<u32>()) {
            let query = ListUsersQuery { limit, offset };
            prop_assert_eq!(query.validate().is_ok(), (1..=MAX_LIMIT).contains(&limit));
        }
    }
}
