use sqlx::{Pool, Sqlite};

use crate::error::Result;

/// Schema files, embedded at build time. The three digit prefix orders them.
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_entries.sql",
    include_str!("../migrations/001_entries.sql"),
)];

/// Applies every migration in order. Each file only creates what is missing,
/// so running this on a populated database keeps its rows.
pub async fn migrate(p: &Pool<Sqlite>) -> Result<()> {
    let mut migration_files: Vec<(&str, &str, &str)> = MIGRATIONS
        .iter()
        .map(|(name, sql)| {
            let (migration_number, _) = name.split_at(3);
            (migration_number, *name, *sql)
        })
        .collect();

    migration_files.sort_by_key(|v| v.0);

    log::debug!("starting migration");
    for (_, name, sql) in &migration_files {
        log::debug!("migrating {}", name);
        let mut tx = p.begin().await?;
        sqlx::raw_sql(sql).execute(&mut *tx).await?;
        tx.commit().await?;
    }

    log::debug!("migration end");
    Ok(())
}
