// Collection names and index layout.

/// One index on a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Indexed fields with direction (`1` ascending, `-1` descending).
    pub keys: Vec<(&'static str, i32)>,
    pub unique: bool,
}

impl IndexSpec {
    pub fn asc(field: &'static str) -> Self {
        Self {
            keys: vec![(field, 1)],
            unique: false,
        }
    }

    pub fn unique(field: &'static str) -> Self {
        Self {
            keys: vec![(field, 1)],
            unique: true,
        }
    }

    pub fn compound(keys: Vec<(&'static str, i32)>) -> Self {
        Self { keys, unique: false }
    }
}

#[derive(Debug, Clone)]
pub struct CollectionSchema {
    pub name: &'static str,
    pub indexes: Vec<IndexSpec>,
}

/// The full storage layout.
#[derive(Debug, Clone)]
pub struct Schema {
    pub collections: Vec<CollectionSchema>,
}

pub const USERS: &str = "users";
pub const SUBSCRIPTIONS: &str = "subscriptions";
pub const NOTIFICATIONS: &str = "notifications";

impl Default for Schema {
    fn default() -> Self {
        Self {
            collections: vec![
                CollectionSchema {
                    name: USERS,
                    indexes: vec![
                        IndexSpec::unique("email"),
                        IndexSpec::asc("isSubscribed"),
                        IndexSpec::asc("subscriptionType"),
                    ],
                },
                CollectionSchema {
                    name: SUBSCRIPTIONS,
                    indexes: vec![
                        IndexSpec::asc("userId"),
                        IndexSpec::asc("status"),
                        IndexSpec::asc("type"),
                        IndexSpec::asc("endDate"),
                    ],
                },
                CollectionSchema {
                    name: NOTIFICATIONS,
                    indexes: vec![
                        IndexSpec::compound(vec![("userId", 1), ("createdAt", -1)]),
                        IndexSpec::asc("isRead"),
                        IndexSpec::asc("isSent"),
                        IndexSpec::asc("type"),
                    ],
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_has_unique_email() {
        let schema = Schema::default();
        let users = schema
            .collections
            .iter()
            .find(|c| c.name == USERS)
            .unwrap();
        assert!(users
            .indexes
            .iter()
            .any(|i| i.unique && i.keys == vec![("email", 1)]));
    }
}
