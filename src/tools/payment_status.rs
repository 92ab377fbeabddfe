//! Premium payment standing for a client's contracts

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::persistence::InsuranceStore;

use super::lookup::{resolve_client, statut_paiement, ClientLookupInput};
use super::{input_schema_for, ok_envelope, parse_input, InsuranceTool, ToolError};

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PaymentStatusInput {
    /// Référence de la personne
    pub ref_personne: Option<i64>,
    /// Numéro de contrat spécifique
    pub num_contrat: Option<String>,
    /// Raison sociale (pour personne morale)
    pub raison_sociale: Option<String>,
    /// Nom et prénom (pour personne physique)
    pub nom_prenom: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContratPaiement {
    pub num_contrat: String,
    pub lib_produit: String,
    pub somme_quittances: f64,
    pub statut_paiement: String,
    pub prochain_terme: Option<String>,
    pub lib_etat_contrat: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatus {
    pub ref_personne: Option<i64>,
    pub identite: Option<String>,
    pub contrats: Vec<ContratPaiement>,
}

/// `getPaymentStatus`: report outstanding premium receipts per contract.
/// `somme_quittances` holds what remains to be paid; zero means the
/// contract is settled. An identifier that matches nobody yields an empty
/// contract list rather than an error.
pub struct PaymentStatusTool {
    store: InsuranceStore,
}

impl PaymentStatusTool {
    pub fn new(store: InsuranceStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl InsuranceTool for PaymentStatusTool {
    fn name(&self) -> &'static str {
        "getPaymentStatus"
    }

    fn description(&self) -> &'static str {
        "Get client payment status and history"
    }

    fn input_schema(&self) -> Value {
        input_schema_for::<PaymentStatusInput>()
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let input: PaymentStatusInput = parse_input(input)?;
        let lookup = ClientLookupInput {
            ref_personne: input.ref_personne,
            num_contrat: input.num_contrat,
            raison_sociale: input.raison_sociale,
            nom_prenom: input.nom_prenom,
            ..Default::default()
        };

        let client = match resolve_client(&self.store, &lookup).await {
            Ok(client) => client,
            Err(ToolError::NotFound(_)) => {
                return Ok(ok_envelope(&PaymentStatus {
                    ref_personne: None,
                    identite: None,
                    contrats: Vec::new(),
                }))
            }
            Err(err) => return Err(err),
        };

        let contrats = client
            .contrats
            .iter()
            .map(|contrat| ContratPaiement {
                num_contrat: contrat.num_contrat.clone(),
                lib_produit: contrat.lib_produit.clone(),
                somme_quittances: contrat.somme_quittances,
                statut_paiement: statut_paiement(contrat.somme_quittances).to_string(),
                prochain_terme: contrat.prochain_terme.clone(),
                lib_etat_contrat: contrat.lib_etat_contrat.clone(),
            })
            .collect();

        Ok(ok_envelope(&PaymentStatus {
            ref_personne: client.ref_personne,
            identite: client.identite(),
            contrats,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::fixtures;
    use crate::persistence::migrations::MigrationRunner;
    use crate::persistence::ConnectionPool;
    use serde_json::json;

    async fn tool() -> PaymentStatusTool {
        let pool = ConnectionPool::new("sqlite::memory:", 1, 5).await.unwrap();
        MigrationRunner::new(pool.clone()).migrate_up().await.unwrap();
        let store = InsuranceStore::new(pool);
        fixtures::seed_demo_data(&store).await.unwrap();
        PaymentStatusTool::new(store)
    }

    #[tokio::test]
    async fn test_settled_contract_is_reported_up_to_date() {
        let out = tool()
            .await
            .execute(json!({"numContrat": "BH-AUTO-2024-001234"}))
            .await
            .unwrap();

        assert_eq!(out["status"], "ok");
        assert_eq!(out["identite"], "Ahmed Ben Salah");
        let contrats = out["contrats"].as_array().unwrap();
        assert_eq!(contrats.len(), 1);
        assert_eq!(contrats[0]["sommeQuittances"], 0.0);
        assert_eq!(contrats[0]["statutPaiement"], "à jour");
    }

    #[tokio::test]
    async fn test_outstanding_receipts_flag_the_contract_unpaid() {
        let out = tool()
            .await
            .execute(json!({"refPersonne": 1001}))
            .await
            .unwrap();

        let contrats = out["contrats"].as_array().unwrap();
        let hab = contrats
            .iter()
            .find(|c| c["numContrat"] == "BH-HAB-2023-004567")
            .unwrap();
        assert_eq!(hab["statutPaiement"], "impayé");
        assert_eq!(hab["sommeQuittances"], 240.5);
    }

    #[tokio::test]
    async fn test_corporate_client_identity() {
        let out = tool()
            .await
            .execute(json!({"raisonSociale": "EL MOUROUJ"}))
            .await
            .unwrap();
        assert_eq!(out["identite"], "STE EL MOUROUJ DISTRIBUTION");
        assert!(!out["contrats"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_client_yields_an_empty_list() {
        let out = tool()
            .await
            .execute(json!({"nomPrenom": "Personne Inconnue"}))
            .await
            .unwrap();

        assert_eq!(out["status"], "ok");
        assert!(out["contrats"].as_array().unwrap().is_empty());
        assert!(out["identite"].is_null());
        assert!(out["refPersonne"].is_null());
    }

    #[tokio::test]
    async fn test_requires_an_identifier() {
        let err = tool().await.execute(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::SchemaViolation(_)));
    }

    #[tokio::test]
    async fn test_fiscal_id_is_not_part_of_this_schema() {
        let err = tool()
            .await
            .execute(json!({"matriculeFiscale": "1234567A"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SchemaViolation(_)));
    }
}
