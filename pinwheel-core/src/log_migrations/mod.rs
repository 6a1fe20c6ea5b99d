//! Event-log database migrations, embedded at compile time.
//! Kept separate from the main schema so the event log can be wiped or
//! exported without touching portal data.

/// Format: (filename, sql_content)
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_event_log.sql", include_str!("001_event_log.sql")),
];
