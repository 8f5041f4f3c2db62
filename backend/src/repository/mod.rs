mod matches;

pub use matches::SqliteMatchStore;
