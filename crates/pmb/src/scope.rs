//! Which databases an operation covers.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseScope {
    /// No database filter at all.
    All,
    Named(String),
}

impl DatabaseScope {
    /// Pick the scope from the command-line flags and the configured default.
    ///
    /// Arguments are the positions of `--all-databases` and `--database` on
    /// the command line, if given. When both are present the one that comes
    /// first wins.
    pub fn resolve(
        all_databases_at: Option<usize>,
        database_at: Option<(usize, &str)>,
        default: &str,
    ) -> Self {
        match (all_databases_at, database_at) {
            (Some(all), Some((named, _))) if all < named => DatabaseScope::All,
            (_, Some((_, name))) => DatabaseScope::Named(name.to_string()),
            (Some(_), None) => DatabaseScope::All,
            (None, None) => DatabaseScope::Named(default.to_string()),
        }
    }

    /// The database filter, or `None` for all databases.
    pub fn database(&self) -> Option<&str> {
        match self {
            DatabaseScope::All => None,
            DatabaseScope::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for DatabaseScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseScope::All => write!(f, "all databases"),
            DatabaseScope::Named(name) => write!(f, "database {name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_applies_without_flags() {
        assert_eq!(
            DatabaseScope::resolve(None, None, "app"),
            DatabaseScope::Named("app".into())
        );
    }

    #[test]
    fn single_flags() {
        assert_eq!(DatabaseScope::resolve(Some(2), None, "app"), DatabaseScope::All);
        assert_eq!(
            DatabaseScope::resolve(None, Some((2, "crm")), "app"),
            DatabaseScope::Named("crm".into())
        );
    }

    #[test]
    fn first_flag_wins() {
        assert_eq!(
            DatabaseScope::resolve(Some(1), Some((3, "crm")), "app"),
            DatabaseScope::All
        );
        assert_eq!(
            DatabaseScope::resolve(Some(4), Some((2, "crm")), "app"),
            DatabaseScope::Named("crm".into())
        );
    }
}
