//! Coverage check for a declared loss against a contract's guarantees

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::persistence::{ContratRow, InsuranceStore};
use crate::text::normalize;

use super::{input_schema_for, ok_envelope, parse_input, InsuranceTool, ToolError};

const COVERAGE_PERCENTAGE: u32 = 90;
const DEDUCTIBLE_TND: f64 = 500.0;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClaimCoverageInput {
    /// Numéro de contrat pour vérification de couverture
    pub num_contrat: String,
    /// Nature du sinistre
    pub nature_sinistre: String,
    /// Type de sinistre
    pub lib_type_sinistre: Option<String>,
    /// Description détaillée du sinistre
    pub observation_sinistre: Option<String>,
    /// Montant estimé du sinistre
    pub montant_encaisse: Option<f64>,
    /// Lieu de l'accident
    pub lieu_accident: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageAssessment {
    pub is_covered: bool,
    pub coverage_percentage: u32,
    pub explanation: String,
    pub applicable_conditions: Vec<String>,
    pub estimated_payout: Option<f64>,
    pub deductible: Option<f64>,
    pub exclusions: Option<Vec<String>>,
    pub garanties_applicables: Vec<String>,
}

/// `checkClaimCoverage`: decide whether a declared loss is covered by the
/// guarantees subscribed on a contract.
///
/// The decision is a label heuristic: the loss nature and the guarantee
/// labels are compared after lowercasing and accent folding. A guarantee
/// applies when one label contains the other, or when a token of one is a
/// prefix (at least 4 characters) of a token of the other.
pub struct ClaimCoverageTool {
    store: InsuranceStore,
}

impl ClaimCoverageTool {
    pub fn new(store: InsuranceStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl InsuranceTool for ClaimCoverageTool {
    fn name(&self) -> &'static str {
        "checkClaimCoverage"
    }

    fn description(&self) -> &'static str {
        "Check if a claim is covered under the client's policy"
    }

    fn input_schema(&self) -> Value {
        input_schema_for::<ClaimCoverageInput>()
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let input: ClaimCoverageInput = parse_input(input)?;

        // An unknown contract fails closed rather than erroring out.
        let Some(contrat) = self.store.contrat_by_num(&input.num_contrat).await? else {
            return Ok(ok_envelope(&CoverageAssessment {
                is_covered: false,
                coverage_percentage: 0,
                explanation: format!(
                    "Aucun contrat trouvé avec le numéro {}; aucune prise en charge n'est possible.",
                    input.num_contrat
                ),
                applicable_conditions: Vec::new(),
                estimated_payout: None,
                deductible: None,
                exclusions: None,
                garanties_applicables: Vec::new(),
            }));
        };

        if let Some(motif) = out_of_force_reason(&contrat, Utc::now().date_naive()) {
            return Ok(ok_envelope(&CoverageAssessment {
                is_covered: false,
                coverage_percentage: 0,
                explanation: format!(
                    "Le contrat {} n'est pas en vigueur ({motif}); aucune prise en charge n'est possible.",
                    contrat.num_contrat
                ),
                applicable_conditions: Vec::new(),
                estimated_payout: None,
                deductible: None,
                exclusions: None,
                garanties_applicables: Vec::new(),
            }));
        }

        let garanties = self.store.garanties_contrat(&contrat.num_contrat).await?;
        let applicables: Vec<String> = garanties
            .iter()
            .filter(|g| guarantee_matches(&input.nature_sinistre, g))
            .cloned()
            .collect();

        let assessment = match applicables.first() {
            Some(first) => CoverageAssessment {
                is_covered: true,
                coverage_percentage: COVERAGE_PERCENTAGE,
                explanation: format!(
                    "Le sinistre est couvert par votre garantie {first}. \
                     Une franchise de 500 TND s'applique."
                ),
                applicable_conditions: vec![
                    "Franchise de 500 TND".to_string(),
                    "Déclaration dans les 5 jours ouvrés".to_string(),
                    "Constat amiable requis".to_string(),
                ],
                estimated_payout: input.montant_encaisse.map(estimated_payout),
                deductible: Some(DEDUCTIBLE_TND),
                exclusions: None,
                garanties_applicables: applicables,
            },
            None => CoverageAssessment {
                is_covered: false,
                coverage_percentage: 0,
                explanation: format!(
                    "Le sinistre déclaré (\"{}\") ne correspond à aucune garantie souscrite sur le contrat {}.",
                    input.nature_sinistre, contrat.num_contrat
                ),
                applicable_conditions: Vec::new(),
                estimated_payout: None,
                deductible: None,
                exclusions: Some(vec![
                    "Conduite en état d'ivresse".to_string(),
                    "Usage professionnel non déclaré".to_string(),
                    "Catastrophes naturelles non couvertes".to_string(),
                ]),
                garanties_applicables: Vec::new(),
            },
        };

        Ok(ok_envelope(&assessment))
    }
}

/// Reason the contract is out of force, or None when it still applies.
///
/// A contract is in force when today falls inside [effet, expiration]; a
/// missing expiration means open-ended.
fn out_of_force_reason(contrat: &ContratRow, today: NaiveDate) -> Option<&'static str> {
    if let Some(etat) = &contrat.lib_etat_contrat {
        if normalize(etat).contains("resili") {
            return Some("résilié");
        }
    }
    if let Ok(effet) = NaiveDate::parse_from_str(&contrat.effet_contrat, "%Y-%m-%d") {
        if effet > today {
            return Some("pas encore effectif");
        }
    }
    if let Some(expiration) = &contrat.date_expiration {
        if let Ok(date) = NaiveDate::parse_from_str(expiration, "%Y-%m-%d") {
            if date < today {
                return Some("expiré");
            }
        }
    }
    None
}

/// Label heuristic deciding whether a guarantee applies to a loss nature.
fn guarantee_matches(nature: &str, garantie: &str) -> bool {
    let nature = normalize(nature);
    let garantie = normalize(garantie);
    if nature.is_empty() || garantie.is_empty() {
        return false;
    }
    if garantie.contains(&nature) || nature.contains(&garantie) {
        return true;
    }
    nature.split_whitespace().any(|nt| {
        garantie
            .split_whitespace()
            .any(|gt| token_prefix_match(nt, gt))
    })
}

/// True when one token is a prefix of the other and the prefix itself is
/// at least 4 characters long. Short function words never match.
fn token_prefix_match(a: &str, b: &str) -> bool {
    (a.len() >= 4 && b.starts_with(a)) || (b.len() >= 4 && a.starts_with(b))
}

fn estimated_payout(montant: f64) -> f64 {
    (montant * f64::from(COVERAGE_PERCENTAGE) / 100.0 - DEDUCTIBLE_TND).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::fixtures;
    use crate::persistence::migrations::MigrationRunner;
    use crate::persistence::ConnectionPool;
    use serde_json::json;

    async fn tool() -> ClaimCoverageTool {
        let pool = ConnectionPool::new("sqlite::memory:", 1, 5).await.unwrap();
        MigrationRunner::new(pool.clone()).migrate_up().await.unwrap();
        let store = InsuranceStore::new(pool);
        fixtures::seed_demo_data(&store).await.unwrap();
        ClaimCoverageTool::new(store)
    }

    #[test]
    fn test_guarantee_matching_rules() {
        // Containment either direction, accents folded.
        assert!(guarantee_matches("vol", "Vol et incendie"));
        assert!(guarantee_matches("bris de glace arrière", "Bris de glace"));
        // Token prefix of at least 4 characters.
        assert!(guarantee_matches(
            "collision avec un autre véhicule",
            "Dommages collision"
        ));
        // Short tokens never match on their own.
        assert!(!guarantee_matches("vol de voiture", "Responsabilité civile"));
        assert!(!guarantee_matches("tremblement de terre", "Vol et incendie"));
    }

    #[test]
    fn test_payout_is_never_negative() {
        assert_eq!(estimated_payout(2000.0), 1300.0);
        assert_eq!(estimated_payout(300.0), 0.0);
    }

    #[tokio::test]
    async fn test_covered_claim_on_active_contract() {
        let out = tool()
            .await
            .execute(json!({
                "numContrat": "BH-AUTO-2024-001234",
                "natureSinistre": "vol",
                "montantEncaisse": 2000.0
            }))
            .await
            .unwrap();

        assert_eq!(out["status"], "ok");
        assert_eq!(out["isCovered"], true);
        assert_eq!(out["coveragePercentage"], 90);
        assert_eq!(out["deductible"], 500.0);
        assert_eq!(out["estimatedPayout"], 1300.0);
        assert!(out["garantiesApplicables"]
            .as_array()
            .unwrap()
            .contains(&json!("Vol et incendie")));
    }

    #[tokio::test]
    async fn test_unmatched_nature_is_not_covered() {
        let out = tool()
            .await
            .execute(json!({
                "numContrat": "BH-AUTO-2024-001234",
                "natureSinistre": "tremblement de terre"
            }))
            .await
            .unwrap();

        assert_eq!(out["isCovered"], false);
        assert_eq!(out["coveragePercentage"], 0);
        assert!(out["estimatedPayout"].is_null());
        assert!(!out["exclusions"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_terminated_contract_is_reported_not_errored() {
        let out = tool()
            .await
            .execute(json!({
                "numContrat": "BH-AUTO-2022-009876",
                "natureSinistre": "vol"
            }))
            .await
            .unwrap();

        assert_eq!(out["status"], "ok");
        assert_eq!(out["isCovered"], false);
        assert!(out["explanation"]
            .as_str()
            .unwrap()
            .contains("n'est pas en vigueur"));
    }

    #[test]
    fn test_contract_not_yet_effective_is_out_of_force() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let contrat = ContratRow {
            num_contrat: "BH-AUTO-2024-009999".to_string(),
            ref_personne: 1001,
            code_produit: Some("P-AUTO-TR".to_string()),
            lib_produit: "Assurance Auto Tous Risques".to_string(),
            branche: Some("Automobile".to_string()),
            effet_contrat: "2024-07-01".to_string(),
            date_expiration: Some("2025-07-01".to_string()),
            prochain_terme: None,
            lib_etat_contrat: Some("En cours".to_string()),
            somme_quittances: 0.0,
            capital_assure: None,
        };

        assert_eq!(
            out_of_force_reason(&contrat, today),
            Some("pas encore effectif")
        );
        let in_force = ContratRow {
            effet_contrat: "2024-05-01".to_string(),
            ..contrat
        };
        assert_eq!(out_of_force_reason(&in_force, today), None);
    }

    #[tokio::test]
    async fn test_unknown_contract_fails_closed() {
        let out = tool()
            .await
            .execute(json!({
                "numContrat": "BH-XXX-0000-000000",
                "natureSinistre": "vol"
            }))
            .await
            .unwrap();

        assert_eq!(out["status"], "ok");
        assert_eq!(out["isCovered"], false);
        assert_eq!(out["coveragePercentage"], 0);
        assert!(out["explanation"]
            .as_str()
            .unwrap()
            .contains("Aucun contrat trouvé"));
    }

    #[tokio::test]
    async fn test_missing_required_fields_are_rejected() {
        let err = tool()
            .await
            .execute(json!({"numContrat": "BH-AUTO-2024-001234"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SchemaViolation(_)));
    }
}
