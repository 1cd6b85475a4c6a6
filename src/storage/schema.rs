//! Database schema definitions

/// SQL to create the migration bookkeeping table
pub const CREATE_SCHEMA_MIGRATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
)
"#;

/// SQL to create the businesses table
/// Ids come from the CSV feed, so there is no AUTOINCREMENT
pub const CREATE_BUSINESSES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS businesses (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL CHECK (name <> '')
)
"#;

/// SQL to create the symptoms table
pub const CREATE_SYMPTOMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS symptoms (
    code TEXT PRIMARY KEY CHECK (code <> ''),
    name TEXT NOT NULL CHECK (name <> '')
)
"#;

/// SQL to create the business_symptoms link table
pub const CREATE_BUSINESS_SYMPTOMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS business_symptoms (
    business_id INTEGER NOT NULL REFERENCES businesses(id),
    symptom_code TEXT NOT NULL REFERENCES symptoms(code),
    diagnostic INTEGER NOT NULL CHECK (diagnostic IN (0, 1)),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (business_id, symptom_code)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_business_symptoms_symptom ON business_symptoms(symptom_code)",
    "CREATE INDEX IF NOT EXISTS idx_business_symptoms_diagnostic ON business_symptoms(diagnostic)",
];

/// A numbered schema step, applied once and recorded in `schema_migrations`
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub statements: fn() -> Vec<&'static str>,
}

fn initial_schema() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_BUSINESSES_TABLE,
        CREATE_SYMPTOMS_TABLE,
        CREATE_BUSINESS_SYMPTOMS_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}

/// All migrations, in ascending version order
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "businesses, symptoms and business_symptoms",
    statements: initial_schema,
}];

/// Highest version known to this build
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}
