//! Database migrations for the insurance schema

use crate::persistence::error::PersistenceError;
use crate::persistence::pool::ConnectionPool;
use sqlx::Row;

/// Initial schema migration SQL
const MIGRATION_001_INITIAL: &str = r#"
-- Product catalog
CREATE TABLE IF NOT EXISTS produits (
    code_produit TEXT PRIMARY KEY,
    lib_produit TEXT NOT NULL,
    branche TEXT NOT NULL,
    description TEXT,
    profils_cibles TEXT
);

-- Guarantees bundled with a product
CREATE TABLE IF NOT EXISTS garanties_produit (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code_produit TEXT NOT NULL,
    lib_garantie TEXT NOT NULL,
    FOREIGN KEY (code_produit) REFERENCES produits(code_produit)
);

-- Individual clients
CREATE TABLE IF NOT EXISTS personnes_physiques (
    ref_personne INTEGER PRIMARY KEY,
    nom_prenom TEXT NOT NULL,
    date_naissance TEXT,
    lieu_naissance TEXT,
    num_piece_identite INTEGER,
    ville_gouvernorat TEXT
);

-- Corporate clients
CREATE TABLE IF NOT EXISTS personnes_morales (
    ref_personne INTEGER PRIMARY KEY,
    raison_sociale TEXT NOT NULL,
    matricule_fiscale TEXT,
    ville_gouvernorat TEXT
);

-- Insurance contracts
CREATE TABLE IF NOT EXISTS contrats (
    num_contrat TEXT PRIMARY KEY,
    ref_personne INTEGER NOT NULL,
    code_produit TEXT,
    lib_produit TEXT NOT NULL,
    branche TEXT,
    effet_contrat TEXT NOT NULL,
    date_expiration TEXT,
    prochain_terme TEXT,
    lib_etat_contrat TEXT,
    somme_quittances REAL NOT NULL DEFAULT 0,
    capital_assure REAL
);

-- Guarantees subscribed on a contract
CREATE TABLE IF NOT EXISTS garanties_contrat (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    num_contrat TEXT NOT NULL,
    lib_garantie TEXT NOT NULL,
    FOREIGN KEY (num_contrat) REFERENCES contrats(num_contrat)
);

-- Declared claims
CREATE TABLE IF NOT EXISTS sinistres (
    num_sinistre TEXT PRIMARY KEY,
    num_contrat TEXT NOT NULL,
    lib_branche TEXT,
    lib_sous_branche TEXT,
    lib_produit TEXT,
    nature_sinistre TEXT,
    lib_type_sinistre TEXT,
    taux_responsabilite REAL,
    date_survenance TEXT,
    date_declaration TEXT,
    date_ouverture TEXT,
    observation_sinistre TEXT,
    lib_etat_sinistre TEXT,
    lieu_accident TEXT,
    motif_reouverture TEXT,
    montant_encaisse REAL,
    montant_a_encaisser REAL,
    FOREIGN KEY (num_contrat) REFERENCES contrats(num_contrat)
);

-- Migration tracking table
CREATE TABLE IF NOT EXISTS _aegis_migrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    applied_at TEXT NOT NULL,
    checksum TEXT NOT NULL
);

-- Lookup indexes for the tool queries
CREATE INDEX IF NOT EXISTS idx_garanties_produit ON garanties_produit(code_produit);
CREATE INDEX IF NOT EXISTS idx_contrats_personne ON contrats(ref_personne);
CREATE INDEX IF NOT EXISTS idx_garanties_contrat ON garanties_contrat(num_contrat);
CREATE INDEX IF NOT EXISTS idx_sinistres_contrat ON sinistres(num_contrat);
CREATE INDEX IF NOT EXISTS idx_pp_piece ON personnes_physiques(num_piece_identite);
CREATE INDEX IF NOT EXISTS idx_pm_matricule ON personnes_morales(matricule_fiscale);
"#;

/// Migration definition
struct Migration {
    name: &'static str,
    sql: &'static str,
    checksum: &'static str,
}

/// Get all migrations in order
fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        name: "001_insurance_schema",
        sql: MIGRATION_001_INITIAL,
        checksum: "v1",
    }]
}

/// Migration runner for the persistence layer
pub struct MigrationRunner {
    pool: ConnectionPool,
}

impl MigrationRunner {
    /// Create a new migration runner
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Run all pending migrations
    pub async fn migrate_up(&self) -> Result<MigrationResult, PersistenceError> {
        let migrations = get_migrations();
        let mut applied = 0;
        let mut skipped = 0;

        // Bootstrap the tracking table
        self.ensure_migrations_table().await?;

        for migration in migrations {
            if let Some(recorded) = self.applied_checksum(migration.name).await? {
                if recorded != migration.checksum {
                    return Err(PersistenceError::Migration(format!(
                        "Checksum mismatch for migration '{}': recorded {}, expected {}",
                        migration.name, recorded, migration.checksum
                    )));
                }
                tracing::debug!("Migration '{}' already applied, skipping", migration.name);
                skipped += 1;
                continue;
            }

            tracing::info!("Applying migration: {}", migration.name);

            // SQLite requires statements to be executed one by one
            for statement in migration.sql.split(';') {
                // Comment lines would otherwise hide the statement below them
                let statement = statement
                    .lines()
                    .filter(|line| !line.trim_start().starts_with("--"))
                    .collect::<Vec<_>>()
                    .join("\n");
                let statement = statement.trim();
                if statement.is_empty() {
                    continue;
                }

                sqlx::query(statement)
                    .execute(self.pool.pool())
                    .await
                    .map_err(|e| {
                        PersistenceError::Migration(format!(
                            "Failed to execute migration '{}': {}",
                            migration.name, e
                        ))
                    })?;
            }

            self.record_migration(migration.name, migration.checksum)
                .await?;

            tracing::info!("Migration '{}' applied successfully", migration.name);
            applied += 1;
        }

        Ok(MigrationResult { applied, skipped })
    }

    /// Ensure the migrations tracking table exists
    async fn ensure_migrations_table(&self) -> Result<(), PersistenceError> {
        let sql = r#"
            CREATE TABLE IF NOT EXISTS _aegis_migrations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                applied_at TEXT NOT NULL,
                checksum TEXT NOT NULL
            )
        "#;

        sqlx::query(sql)
            .execute(self.pool.pool())
            .await
            .map_err(|e| {
                PersistenceError::Migration(format!("Failed to create migrations table: {}", e))
            })?;

        Ok(())
    }

    /// Checksum of an applied migration, None when not yet applied
    async fn applied_checksum(&self, name: &str) -> Result<Option<String>, PersistenceError> {
        let row = sqlx::query("SELECT checksum FROM _aegis_migrations WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| {
                PersistenceError::Migration(format!("Failed to check migration status: {}", e))
            })?;

        Ok(row.map(|r| r.try_get("checksum").unwrap_or_default()))
    }

    /// Record a migration as applied
    async fn record_migration(&self, name: &str, checksum: &str) -> Result<(), PersistenceError> {
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query("INSERT INTO _aegis_migrations (name, applied_at, checksum) VALUES (?, ?, ?)")
            .bind(name)
            .bind(&now)
            .bind(checksum)
            .execute(self.pool.pool())
            .await
            .map_err(|e| {
                PersistenceError::Migration(format!("Failed to record migration: {}", e))
            })?;

        Ok(())
    }
}

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationResult {
    /// Number of migrations applied
    pub applied: usize,
    /// Number of migrations skipped (already applied)
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrate_up_is_idempotent() {
        let pool = ConnectionPool::new("sqlite::memory:", 1, 5).await.unwrap();
        let runner = MigrationRunner::new(pool.clone());

        let first = runner.migrate_up().await.unwrap();
        assert_eq!(first.applied, 1);
        assert_eq!(first.skipped, 0);

        let second = runner.migrate_up().await.unwrap();
        assert_eq!(second.applied, 0);
        assert_eq!(second.skipped, 1);

        // Schema is usable after migration
        sqlx::query("SELECT COUNT(*) AS n FROM contrats")
            .fetch_one(pool.pool())
            .await
            .unwrap();
    }
}
