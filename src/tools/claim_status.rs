//! Claim progress lookup

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::persistence::{InsuranceStore, SinistreRow};
use crate::text::{contains_normalized, normalize};

use super::{input_schema_for, ok_envelope, parse_input, InsuranceTool, ToolError};

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClaimStatusInput {
    /// Numéro de sinistre spécifique
    pub num_sinistre: Option<String>,
    /// Numéro de contrat
    pub num_contrat: Option<String>,
    /// Référence de la personne
    pub ref_personne: Option<i64>,
    /// État du sinistre (filtre optionnel)
    pub lib_etat_sinistre: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SinistreInfo {
    pub num_sinistre: String,
    pub num_contrat: String,
    pub lib_branche: Option<String>,
    pub lib_sous_branche: Option<String>,
    pub lib_produit: Option<String>,
    pub nature_sinistre: Option<String>,
    pub lib_type_sinistre: Option<String>,
    pub taux_responsabilite: Option<f64>,
    pub date_survenance: Option<String>,
    pub date_declaration: Option<String>,
    pub date_ouverture: Option<String>,
    pub observation_sinistre: Option<String>,
    pub lib_etat_sinistre: Option<String>,
    /// Canonical processing track derived from the state label
    pub statut: &'static str,
    pub lieu_accident: Option<String>,
    pub motif_reouverture: Option<String>,
    pub montant_encaisse: Option<f64>,
    pub montant_a_encaisser: Option<f64>,
}

/// `getClaimStatus`: resolve the single most relevant claim. A claim
/// number pins it directly; a contract number picks that contract's newest
/// claim; a client reference picks the newest claim across every contract
/// the client owns. The optional state label narrows the candidates before
/// the pick. Back-office state labels are free text; the answer also
/// carries a canonical `statut` derived by keyword.
pub struct ClaimStatusTool {
    store: InsuranceStore,
}

impl ClaimStatusTool {
    pub fn new(store: InsuranceStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl InsuranceTool for ClaimStatusTool {
    fn name(&self) -> &'static str {
        "getClaimStatus"
    }

    fn description(&self) -> &'static str {
        "Get status and details of insurance claims"
    }

    fn input_schema(&self) -> Value {
        input_schema_for::<ClaimStatusInput>()
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let input: ClaimStatusInput = parse_input(input)?;

        let mut candidates = if let Some(num) = &input.num_sinistre {
            self.store.sinistre_by_num(num).await?.into_iter().collect()
        } else if let Some(num) = &input.num_contrat {
            self.store.sinistres_by_contrat(num).await?
        } else if let Some(ref_personne) = input.ref_personne {
            self.store.sinistres_by_personne(ref_personne).await?
        } else {
            return Err(ToolError::SchemaViolation(
                "a claim number, contract number or client reference is required".to_string(),
            ));
        };

        if let Some(filter) = &input.lib_etat_sinistre {
            candidates.retain(|s| {
                s.lib_etat_sinistre
                    .as_deref()
                    .is_some_and(|etat| contains_normalized(etat, filter))
            });
        }

        // Candidates arrive newest first, so the head is the most relevant.
        let Some(row) = candidates.into_iter().next() else {
            return Err(ToolError::NotFound(
                "no claim matches the given criteria".to_string(),
            ));
        };

        Ok(ok_envelope(&sinistre_info(row)))
    }
}

fn sinistre_info(row: SinistreRow) -> SinistreInfo {
    let statut = statut_track(row.lib_etat_sinistre.as_deref());
    SinistreInfo {
        num_sinistre: row.num_sinistre,
        num_contrat: row.num_contrat,
        lib_branche: row.lib_branche,
        lib_sous_branche: row.lib_sous_branche,
        lib_produit: row.lib_produit,
        nature_sinistre: row.nature_sinistre,
        lib_type_sinistre: row.lib_type_sinistre,
        taux_responsabilite: row.taux_responsabilite,
        date_survenance: row.date_survenance,
        date_declaration: row.date_declaration,
        date_ouverture: row.date_ouverture,
        observation_sinistre: row.observation_sinistre,
        lib_etat_sinistre: row.lib_etat_sinistre,
        statut,
        lieu_accident: row.lieu_accident,
        motif_reouverture: row.motif_reouverture,
        montant_encaisse: row.montant_encaisse,
        montant_a_encaisser: row.montant_a_encaisser,
    }
}

/// Map a free-text back-office state label to a canonical track.
/// Keywords are checked in settlement order; an unrecognized or missing
/// label counts as freshly submitted.
fn statut_track(lib_etat: Option<&str>) -> &'static str {
    let Some(etat) = lib_etat else {
        return "submitted";
    };
    let etat = normalize(etat);
    if etat.contains("pay") || etat.contains("regl") {
        "paid"
    } else if etat.contains("approu") || etat.contains("accept") || etat.contains("valid") {
        "approved"
    } else if etat.contains("rejet") || etat.contains("refus") {
        "denied"
    } else if etat.contains("cours") || etat.contains("trait") || etat.contains("expert") {
        "processing"
    } else {
        "submitted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::fixtures;
    use crate::persistence::migrations::MigrationRunner;
    use crate::persistence::ConnectionPool;
    use serde_json::json;

    async fn tool() -> ClaimStatusTool {
        let pool = ConnectionPool::new("sqlite::memory:", 1, 5).await.unwrap();
        MigrationRunner::new(pool.clone()).migrate_up().await.unwrap();
        let store = InsuranceStore::new(pool);
        fixtures::seed_demo_data(&store).await.unwrap();
        ClaimStatusTool::new(store)
    }

    #[test]
    fn test_statut_track_keywords() {
        assert_eq!(statut_track(Some("Réglé")), "paid");
        assert_eq!(statut_track(Some("Payé partiellement")), "paid");
        assert_eq!(statut_track(Some("Approuvé")), "approved");
        assert_eq!(statut_track(Some("Validé par l'expert")), "approved");
        assert_eq!(statut_track(Some("Rejeté")), "denied");
        assert_eq!(statut_track(Some("Refusé")), "denied");
        assert_eq!(statut_track(Some("En cours d'expertise")), "processing");
        assert_eq!(statut_track(Some("En traitement")), "processing");
        assert_eq!(statut_track(Some("Déclaré")), "submitted");
        assert_eq!(statut_track(None), "submitted");
    }

    #[tokio::test]
    async fn test_lookup_by_claim_number() {
        let out = tool()
            .await
            .execute(json!({"numSinistre": "SIN-2024-00042"}))
            .await
            .unwrap();

        assert_eq!(out["status"], "ok");
        assert_eq!(out["numSinistre"], "SIN-2024-00042");
        assert_eq!(out["statut"], "processing");
        assert_eq!(out["natureSinistre"], "vol");
    }

    #[tokio::test]
    async fn test_contract_resolves_to_its_newest_claim() {
        // The auto contract has an older settled windshield claim and a
        // fresher theft claim; the fresher one wins.
        let out = tool()
            .await
            .execute(json!({"numContrat": "BH-AUTO-2024-001234"}))
            .await
            .unwrap();

        assert_eq!(out["numSinistre"], "SIN-2024-00042");
        assert_eq!(out["statut"], "processing");
    }

    #[tokio::test]
    async fn test_client_reference_spans_all_contracts() {
        let out = tool()
            .await
            .execute(json!({"refPersonne": 1001}))
            .await
            .unwrap();

        // The water-damage claim on the home contract is the newest one.
        assert_eq!(out["numSinistre"], "SIN-2024-00117");
        assert_eq!(out["statut"], "submitted");
    }

    #[tokio::test]
    async fn test_state_filter_is_accent_insensitive() {
        let out = tool()
            .await
            .execute(json!({"refPersonne": 1001, "libEtatSinistre": "regle"}))
            .await
            .unwrap();

        assert_eq!(out["numSinistre"], "SIN-2023-00891");
        assert_eq!(out["statut"], "paid");
        assert_eq!(out["montantEncaisse"], 420.0);
    }

    #[tokio::test]
    async fn test_state_filter_alone_is_not_enough() {
        let err = tool()
            .await
            .execute(json!({"libEtatSinistre": "réglé"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SchemaViolation(_)));
    }

    #[tokio::test]
    async fn test_contract_without_claims_is_not_found() {
        let err = tool()
            .await
            .execute(json!({"numContrat": "BH-SANTE-2024-002211"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_claim_is_not_found() {
        let err = tool()
            .await
            .execute(json!({"numSinistre": "SIN-0000-00000"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }
}
