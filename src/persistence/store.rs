//! Repository for the insurance database
//!
//! One store over the connection pool with the finder methods the chat
//! tools need. Queries are written with `?` placeholders for the Any
//! driver; free-text identity matching (names, company names) is done in
//! Rust because it must be accent insensitive.

use crate::persistence::error::PersistenceError;
use crate::persistence::models::{
    ContratRow, PersonneMoraleRow, PersonnePhysiqueRow, ProduitRow, SinistreRow,
};
use crate::persistence::pool::ConnectionPool;
use crate::text::contains_normalized;
use sqlx::Row;

/// SQLx-backed store for products, clients, contracts and claims
#[derive(Clone)]
pub struct InsuranceStore {
    pool: ConnectionPool,
}

impl InsuranceStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool, for health checks
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    // ---- products ----

    /// List catalog products, optionally filtered by name substring and branch
    pub async fn list_produits(
        &self,
        lib_produit: Option<&str>,
        branche: Option<&str>,
    ) -> Result<Vec<ProduitRow>, PersistenceError> {
        let rows = sqlx::query("SELECT * FROM produits ORDER BY lib_produit")
            .fetch_all(self.pool.pool())
            .await?;

        let mut produits = Vec::new();
        for row in &rows {
            let produit = Self::parse_produit(row)?;
            if let Some(lib) = lib_produit {
                if !contains_normalized(&produit.lib_produit, lib) {
                    continue;
                }
            }
            if let Some(br) = branche {
                if !contains_normalized(&produit.branche, br) {
                    continue;
                }
            }
            produits.push(produit);
        }
        Ok(produits)
    }

    /// Guarantee labels bundled with a catalog product
    pub async fn garanties_produit(
        &self,
        code_produit: &str,
    ) -> Result<Vec<String>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT lib_garantie FROM garanties_produit WHERE code_produit = ? ORDER BY id",
        )
        .bind(code_produit)
        .fetch_all(self.pool.pool())
        .await?;

        rows.iter()
            .map(|row| row.try_get("lib_garantie").map_err(PersistenceError::from))
            .collect()
    }

    // ---- clients ----

    pub async fn personne_physique_by_ref(
        &self,
        ref_personne: i64,
    ) -> Result<Option<PersonnePhysiqueRow>, PersistenceError> {
        let row = sqlx::query("SELECT * FROM personnes_physiques WHERE ref_personne = ?")
            .bind(ref_personne)
            .fetch_optional(self.pool.pool())
            .await?;

        row.as_ref().map(Self::parse_personne_physique).transpose()
    }

    pub async fn personne_physique_by_piece(
        &self,
        num_piece_identite: i64,
    ) -> Result<Option<PersonnePhysiqueRow>, PersistenceError> {
        let row = sqlx::query("SELECT * FROM personnes_physiques WHERE num_piece_identite = ?")
            .bind(num_piece_identite)
            .fetch_optional(self.pool.pool())
            .await?;

        row.as_ref().map(Self::parse_personne_physique).transpose()
    }

    /// First individual client whose name contains the given text
    pub async fn personne_physique_by_nom(
        &self,
        nom_prenom: &str,
    ) -> Result<Option<PersonnePhysiqueRow>, PersistenceError> {
        let rows = sqlx::query("SELECT * FROM personnes_physiques ORDER BY ref_personne")
            .fetch_all(self.pool.pool())
            .await?;

        for row in &rows {
            let personne = Self::parse_personne_physique(row)?;
            if contains_normalized(&personne.nom_prenom, nom_prenom) {
                return Ok(Some(personne));
            }
        }
        Ok(None)
    }

    pub async fn personne_morale_by_ref(
        &self,
        ref_personne: i64,
    ) -> Result<Option<PersonneMoraleRow>, PersistenceError> {
        let row = sqlx::query("SELECT * FROM personnes_morales WHERE ref_personne = ?")
            .bind(ref_personne)
            .fetch_optional(self.pool.pool())
            .await?;

        row.as_ref().map(Self::parse_personne_morale).transpose()
    }

    pub async fn personne_morale_by_matricule(
        &self,
        matricule_fiscale: &str,
    ) -> Result<Option<PersonneMoraleRow>, PersistenceError> {
        let row = sqlx::query("SELECT * FROM personnes_morales WHERE matricule_fiscale = ?")
            .bind(matricule_fiscale)
            .fetch_optional(self.pool.pool())
            .await?;

        row.as_ref().map(Self::parse_personne_morale).transpose()
    }

    /// First corporate client whose company name contains the given text
    pub async fn personne_morale_by_raison(
        &self,
        raison_sociale: &str,
    ) -> Result<Option<PersonneMoraleRow>, PersistenceError> {
        let rows = sqlx::query("SELECT * FROM personnes_morales ORDER BY ref_personne")
            .fetch_all(self.pool.pool())
            .await?;

        for row in &rows {
            let personne = Self::parse_personne_morale(row)?;
            if contains_normalized(&personne.raison_sociale, raison_sociale) {
                return Ok(Some(personne));
            }
        }
        Ok(None)
    }

    // ---- contracts ----

    pub async fn contrat_by_num(
        &self,
        num_contrat: &str,
    ) -> Result<Option<ContratRow>, PersistenceError> {
        let row = sqlx::query("SELECT * FROM contrats WHERE num_contrat = ?")
            .bind(num_contrat)
            .fetch_optional(self.pool.pool())
            .await?;

        row.as_ref().map(Self::parse_contrat).transpose()
    }

    pub async fn contrats_by_personne(
        &self,
        ref_personne: i64,
    ) -> Result<Vec<ContratRow>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT * FROM contrats WHERE ref_personne = ? ORDER BY effet_contrat DESC",
        )
        .bind(ref_personne)
        .fetch_all(self.pool.pool())
        .await?;

        rows.iter().map(Self::parse_contrat).collect()
    }

    /// Guarantee labels subscribed on a contract
    pub async fn garanties_contrat(
        &self,
        num_contrat: &str,
    ) -> Result<Vec<String>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT lib_garantie FROM garanties_contrat WHERE num_contrat = ? ORDER BY id",
        )
        .bind(num_contrat)
        .fetch_all(self.pool.pool())
        .await?;

        rows.iter()
            .map(|row| row.try_get("lib_garantie").map_err(PersistenceError::from))
            .collect()
    }

    // ---- claims ----

    pub async fn sinistre_by_num(
        &self,
        num_sinistre: &str,
    ) -> Result<Option<SinistreRow>, PersistenceError> {
        let row = sqlx::query("SELECT * FROM sinistres WHERE num_sinistre = ?")
            .bind(num_sinistre)
            .fetch_optional(self.pool.pool())
            .await?;

        row.as_ref().map(Self::parse_sinistre).transpose()
    }

    pub async fn sinistres_by_contrat(
        &self,
        num_contrat: &str,
    ) -> Result<Vec<SinistreRow>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT * FROM sinistres WHERE num_contrat = ? ORDER BY date_declaration DESC",
        )
        .bind(num_contrat)
        .fetch_all(self.pool.pool())
        .await?;

        rows.iter().map(Self::parse_sinistre).collect()
    }

    pub async fn sinistres_by_personne(
        &self,
        ref_personne: i64,
    ) -> Result<Vec<SinistreRow>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT s.* FROM sinistres s \
             JOIN contrats c ON s.num_contrat = c.num_contrat \
             WHERE c.ref_personne = ? ORDER BY s.date_declaration DESC",
        )
        .bind(ref_personne)
        .fetch_all(self.pool.pool())
        .await?;

        rows.iter().map(Self::parse_sinistre).collect()
    }

    /// Number of catalog products, used to decide whether to seed demo data
    pub async fn count_produits(&self) -> Result<i64, PersistenceError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM produits")
            .fetch_one(self.pool.pool())
            .await?;
        Ok(row.try_get("n")?)
    }

    // ---- row parsing ----

    fn parse_produit(row: &sqlx::any::AnyRow) -> Result<ProduitRow, PersistenceError> {
        Ok(ProduitRow {
            code_produit: row.try_get("code_produit")?,
            lib_produit: row.try_get("lib_produit")?,
            branche: row.try_get("branche")?,
            description: row.try_get("description")?,
            profils_cibles: row.try_get("profils_cibles")?,
        })
    }

    fn parse_personne_physique(
        row: &sqlx::any::AnyRow,
    ) -> Result<PersonnePhysiqueRow, PersistenceError> {
        Ok(PersonnePhysiqueRow {
            ref_personne: row.try_get("ref_personne")?,
            nom_prenom: row.try_get("nom_prenom")?,
            date_naissance: row.try_get("date_naissance")?,
            lieu_naissance: row.try_get("lieu_naissance")?,
            num_piece_identite: row.try_get("num_piece_identite")?,
            ville_gouvernorat: row.try_get("ville_gouvernorat")?,
        })
    }

    fn parse_personne_morale(
        row: &sqlx::any::AnyRow,
    ) -> Result<PersonneMoraleRow, PersistenceError> {
        Ok(PersonneMoraleRow {
            ref_personne: row.try_get("ref_personne")?,
            raison_sociale: row.try_get("raison_sociale")?,
            matricule_fiscale: row.try_get("matricule_fiscale")?,
            ville_gouvernorat: row.try_get("ville_gouvernorat")?,
        })
    }

    fn parse_contrat(row: &sqlx::any::AnyRow) -> Result<ContratRow, PersistenceError> {
        Ok(ContratRow {
            num_contrat: row.try_get("num_contrat")?,
            ref_personne: row.try_get("ref_personne")?,
            code_produit: row.try_get("code_produit")?,
            lib_produit: row.try_get("lib_produit")?,
            branche: row.try_get("branche")?,
            effet_contrat: row.try_get("effet_contrat")?,
            date_expiration: row.try_get("date_expiration")?,
            prochain_terme: row.try_get("prochain_terme")?,
            lib_etat_contrat: row.try_get("lib_etat_contrat")?,
            somme_quittances: row.try_get("somme_quittances")?,
            capital_assure: row.try_get("capital_assure")?,
        })
    }

    fn parse_sinistre(row: &sqlx::any::AnyRow) -> Result<SinistreRow, PersistenceError> {
        Ok(SinistreRow {
            num_sinistre: row.try_get("num_sinistre")?,
            num_contrat: row.try_get("num_contrat")?,
            lib_branche: row.try_get("lib_branche")?,
            lib_sous_branche: row.try_get("lib_sous_branche")?,
            lib_produit: row.try_get("lib_produit")?,
            nature_sinistre: row.try_get("nature_sinistre")?,
            lib_type_sinistre: row.try_get("lib_type_sinistre")?,
            taux_responsabilite: row.try_get("taux_responsabilite")?,
            date_survenance: row.try_get("date_survenance")?,
            date_declaration: row.try_get("date_declaration")?,
            date_ouverture: row.try_get("date_ouverture")?,
            observation_sinistre: row.try_get("observation_sinistre")?,
            lib_etat_sinistre: row.try_get("lib_etat_sinistre")?,
            lieu_accident: row.try_get("lieu_accident")?,
            motif_reouverture: row.try_get("motif_reouverture")?,
            montant_encaisse: row.try_get("montant_encaisse")?,
            montant_a_encaisser: row.try_get("montant_a_encaisser")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::fixtures;
    use crate::persistence::migrations::MigrationRunner;

    async fn seeded_store() -> InsuranceStore {
        let pool = ConnectionPool::new("sqlite::memory:", 1, 5).await.unwrap();
        MigrationRunner::new(pool.clone()).migrate_up().await.unwrap();
        let store = InsuranceStore::new(pool);
        fixtures::seed_demo_data(&store).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_product_catalog_filtering() {
        let store = seeded_store().await;

        let all = store.list_produits(None, None).await.unwrap();
        assert!(all.len() >= 4);

        let auto = store.list_produits(Some("auto"), None).await.unwrap();
        assert!(!auto.is_empty());
        assert!(auto.iter().all(|p| p.lib_produit.to_lowercase().contains("auto")));

        let none = store.list_produits(Some("spatiale"), None).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_client_lookup_by_name_is_accent_insensitive() {
        let store = seeded_store().await;

        let by_ref = store.personne_physique_by_ref(1001).await.unwrap().unwrap();
        let by_name = store
            .personne_physique_by_nom("ben salah")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_ref.ref_personne, by_name.ref_personne);
    }

    #[tokio::test]
    async fn test_contract_and_guarantees() {
        let store = seeded_store().await;

        let contrat = store
            .contrat_by_num("BH-AUTO-2024-001234")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(contrat.ref_personne, 1001);

        let garanties = store.garanties_contrat(&contrat.num_contrat).await.unwrap();
        assert!(garanties.iter().any(|g| g == "Vol et incendie"));
    }

    #[tokio::test]
    async fn test_claims_by_person_joins_contracts() {
        let store = seeded_store().await;

        let sinistres = store.sinistres_by_personne(1001).await.unwrap();
        assert!(!sinistres.is_empty());
        assert!(sinistres.iter().all(|s| s.num_contrat.starts_with("BH-")));
    }
}
