//! Quote generation through the external rating API

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::QuoteApiSettings;

use super::{input_schema_for, ok_envelope, parse_input, InsuranceTool, ToolError};

// Rating parameters substituted when the conversation did not provide them.
const DEFAULT_NATURE_CONTRAT: &str = "n";
const DEFAULT_NOMBRE_PLACE: u32 = 5;
const DEFAULT_MISE_EN_CIRCULATION: &str = "2020-01-01";
const DEFAULT_CAPITAL_BRIS_DE_GLACE: f64 = 1000.0;
const DEFAULT_CAPITAL_DOMMAGE_COLLISION: f64 = 15000.0;
const DEFAULT_PUISSANCE: u32 = 6;
const DEFAULT_CLASSE: u32 = 8;
const DEFAULT_CAPITAL_ASSURE: f64 = 50000.0;

const QUOTE_VALIDITY_DAYS: i64 = 30;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GenerateQuoteInput {
    pub client_info: ClientInfo,
    pub product_info: ProductInfo,
    #[serde(default)]
    pub additional_info: Option<AdditionalInfo>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClientInfo {
    /// Nom et prénom du client (personne physique)
    pub nom_prenom: Option<String>,
    /// Date de naissance (YYYY-MM-DD)
    pub date_naissance: Option<String>,
    /// Lieu de naissance
    pub lieu_naissance: Option<String>,
    /// Ville / gouvernorat de résidence
    pub ville_gouvernorat: Option<String>,
    /// Numéro de pièce d'identité (CIN)
    pub num_piece_identite: Option<i64>,
    /// Raison sociale (personne morale)
    pub raison_sociale: Option<String>,
    /// Matricule fiscal (personne morale)
    pub matricule_fiscale: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductInfo {
    /// Libellé du produit d'assurance
    pub lib_produit: String,
    /// Branche d'assurance
    pub branche: Option<String>,
    /// Capital assuré souhaité (valeur vénale du véhicule), strictement positif
    pub capital_assure: Option<f64>,
}

#[derive(Debug, Default, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AdditionalInfo {
    /// Nature du contrat (n pour nouveau, r pour renouvellement)
    pub nature_contrat: Option<String>,
    /// Nombre de places du véhicule
    pub nombre_place: Option<u32>,
    /// Date de première mise en circulation (YYYY-MM-DD)
    pub date_premiere_mise_en_circulation: Option<String>,
    /// Capital bris de glace
    pub capital_bris_de_glace: Option<f64>,
    /// Capital dommage collision
    pub capital_dommage_collision: Option<f64>,
    /// Puissance fiscale du véhicule
    pub puissance: Option<u32>,
    /// Classe bonus-malus
    pub classe: Option<u32>,
}

/// Query parameters of the outbound rating call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteParams {
    pub num_piece_identite: i64,
    pub capital_assure: f64,
    pub nature_contrat: String,
    pub nombre_place: u32,
    pub date_premiere_mise_en_circulation: String,
    pub capital_bris_de_glace: f64,
    pub capital_dommage_collision: f64,
    pub puissance: u32,
    pub classe: u32,
}

/// Rating service response. Every field is optional; missing values fall
/// back to the standard tariff.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteApiResponse {
    pub prime_mensuelle: Option<f64>,
    pub prime_annuelle: Option<f64>,
    pub prime_semestrielle: Option<f64>,
    pub garanties: Option<Vec<String>>,
    pub remises: Option<Vec<Remise>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Remise {
    pub nom: String,
    pub montant: f64,
    pub pourcentage: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prime {
    pub mensuelle: f64,
    pub annuelle: f64,
    pub semestrielle: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub quote_id: String,
    pub lib_produit: String,
    pub branche: Option<String>,
    pub capital_assure: Option<f64>,
    pub prime: Prime,
    pub garanties: Vec<String>,
    pub remises: Vec<Remise>,
    pub valid_jusquau: String,
    pub conditions: String,
    pub prochain_etapes: Vec<String>,
}

/// Outbound rating call, abstracted so the tool can be driven by a fake
/// in tests.
#[async_trait]
pub trait QuoteApi: Send + Sync {
    async fn fetch_quote(&self, params: &QuoteParams) -> Result<QuoteApiResponse, ToolError>;
}

/// HTTP client for the rating endpoint. One GET per quote, no retry.
#[derive(Clone)]
pub struct QuoteClient {
    client: reqwest::Client,
    base_url: String,
}

impl QuoteClient {
    pub fn new(config: &QuoteApiSettings) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| {
                ToolError::UpstreamFailure(format!("failed to build HTTP client: {err}"))
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl QuoteApi for QuoteClient {
    async fn fetch_quote(&self, params: &QuoteParams) -> Result<QuoteApiResponse, ToolError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .send()
            .await
            .map_err(|err| ToolError::UpstreamFailure(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::UpstreamFailure(format!(
                "quote endpoint returned {status}"
            )));
        }

        response
            .json::<QuoteApiResponse>()
            .await
            .map_err(|err| ToolError::UpstreamFailure(format!("invalid response body: {err}")))
    }
}

/// `generateQuote`: assemble a rating parameter set from the conversation,
/// call the external quote API once, and shape the response into a quote
/// valid for 30 days.
pub struct GenerateQuoteTool {
    quotes: Arc<dyn QuoteApi>,
}

impl GenerateQuoteTool {
    pub fn new(quotes: Arc<dyn QuoteApi>) -> Self {
        Self { quotes }
    }
}

#[async_trait]
impl InsuranceTool for GenerateQuoteTool {
    fn name(&self) -> &'static str {
        "generateQuote"
    }

    fn description(&self) -> &'static str {
        "Generate an insurance quote using the Aegis rating API"
    }

    fn input_schema(&self) -> Value {
        input_schema_for::<GenerateQuoteInput>()
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let input: GenerateQuoteInput = parse_input(input)?;
        if let Some(capital) = input.product_info.capital_assure {
            if capital <= 0.0 {
                return Err(ToolError::SchemaViolation(
                    "capitalAssure must be positive".to_string(),
                ));
            }
        }

        let params = build_params(&input);
        let response = self.quotes.fetch_quote(&params).await?;
        Ok(ok_envelope(&build_quote(input, response)))
    }
}

fn build_params(input: &GenerateQuoteInput) -> QuoteParams {
    let additional = input.additional_info.clone().unwrap_or_default();
    QuoteParams {
        num_piece_identite: input.client_info.num_piece_identite.unwrap_or(0),
        capital_assure: input
            .product_info
            .capital_assure
            .unwrap_or(DEFAULT_CAPITAL_ASSURE),
        nature_contrat: additional
            .nature_contrat
            .unwrap_or_else(|| DEFAULT_NATURE_CONTRAT.to_string()),
        nombre_place: additional.nombre_place.unwrap_or(DEFAULT_NOMBRE_PLACE),
        date_premiere_mise_en_circulation: additional
            .date_premiere_mise_en_circulation
            .unwrap_or_else(|| DEFAULT_MISE_EN_CIRCULATION.to_string()),
        capital_bris_de_glace: additional
            .capital_bris_de_glace
            .unwrap_or(DEFAULT_CAPITAL_BRIS_DE_GLACE),
        capital_dommage_collision: additional
            .capital_dommage_collision
            .unwrap_or(DEFAULT_CAPITAL_DOMMAGE_COLLISION),
        puissance: additional.puissance.unwrap_or(DEFAULT_PUISSANCE),
        classe: additional.classe.unwrap_or(DEFAULT_CLASSE),
    }
}

fn build_quote(input: GenerateQuoteInput, response: QuoteApiResponse) -> Quote {
    let now = Utc::now();
    Quote {
        quote_id: format!("QTE-{}", now.timestamp_millis()),
        lib_produit: input.product_info.lib_produit,
        branche: input.product_info.branche,
        capital_assure: input.product_info.capital_assure,
        prime: Prime {
            mensuelle: response.prime_mensuelle.unwrap_or(65.0),
            annuelle: response.prime_annuelle.unwrap_or(720.0),
            semestrielle: response.prime_semestrielle.unwrap_or(380.0),
        },
        garanties: response
            .garanties
            .filter(|g| !g.is_empty())
            .unwrap_or_else(standard_garanties),
        remises: response
            .remises
            .filter(|r| !r.is_empty())
            .unwrap_or_else(standard_remises),
        valid_jusquau: (now + chrono::Duration::days(QUOTE_VALIDITY_DAYS))
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        conditions: "Devis valable 30 jours. Souscription possible en ligne ou en agence."
            .to_string(),
        prochain_etapes: vec![
            "Valider les informations personnelles".to_string(),
            "Fournir les documents requis".to_string(),
            "Signer le contrat électroniquement".to_string(),
            "Effectuer le premier paiement".to_string(),
        ],
    }
}

fn standard_garanties() -> Vec<String> {
    [
        "Responsabilité civile",
        "Dommages collision",
        "Vol et incendie",
        "Bris de glace",
        "Assistance dépannage",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn standard_remises() -> Vec<Remise> {
    vec![
        Remise {
            nom: "Bonus jeune conducteur".to_string(),
            montant: 50.0,
            pourcentage: 7.0,
        },
        Remise {
            nom: "Multi-contrats".to_string(),
            montant: 30.0,
            pourcentage: 4.0,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FakeQuoteApi {
        response: QuoteApiResponse,
    }

    #[async_trait]
    impl QuoteApi for FakeQuoteApi {
        async fn fetch_quote(&self, _params: &QuoteParams) -> Result<QuoteApiResponse, ToolError> {
            Ok(self.response.clone())
        }
    }

    struct FailingQuoteApi;

    #[async_trait]
    impl QuoteApi for FailingQuoteApi {
        async fn fetch_quote(&self, _params: &QuoteParams) -> Result<QuoteApiResponse, ToolError> {
            Err(ToolError::UpstreamFailure("quote endpoint returned 503".to_string()))
        }
    }

    fn minimal_input() -> Value {
        json!({
            "clientInfo": { "nomPrenom": "Ahmed Ben Salah" },
            "productInfo": { "libProduit": "Assurance Auto Tous Risques" }
        })
    }

    #[test]
    fn test_params_fall_back_to_standard_rating_values() {
        let input: GenerateQuoteInput = serde_json::from_value(minimal_input()).unwrap();
        let params = build_params(&input);
        assert_eq!(params.num_piece_identite, 0);
        assert_eq!(params.capital_assure, 50000.0);
        assert_eq!(params.nature_contrat, "n");
        assert_eq!(params.nombre_place, 5);
        assert_eq!(params.date_premiere_mise_en_circulation, "2020-01-01");
        assert_eq!(params.capital_bris_de_glace, 1000.0);
        assert_eq!(params.capital_dommage_collision, 15000.0);
        assert_eq!(params.puissance, 6);
        assert_eq!(params.classe, 8);
    }

    #[test]
    fn test_provided_values_override_defaults() {
        let input: GenerateQuoteInput = serde_json::from_value(json!({
            "clientInfo": { "numPieceIdentite": 12345678 },
            "productInfo": { "libProduit": "Auto", "capitalAssure": 45000.0 },
            "additionalInfo": { "puissance": 9, "natureContrat": "r" }
        }))
        .unwrap();
        let params = build_params(&input);
        assert_eq!(params.num_piece_identite, 12345678);
        assert_eq!(params.capital_assure, 45000.0);
        assert_eq!(params.puissance, 9);
        assert_eq!(params.nature_contrat, "r");
        // Untouched fields keep their defaults.
        assert_eq!(params.classe, 8);
    }

    #[tokio::test]
    async fn test_empty_response_yields_standard_tariff() {
        let tool = GenerateQuoteTool::new(Arc::new(FakeQuoteApi {
            response: QuoteApiResponse::default(),
        }));
        let out = tool.execute(minimal_input()).await.unwrap();

        assert_eq!(out["status"], "ok");
        assert!(out["quoteId"].as_str().unwrap().starts_with("QTE-"));
        assert_eq!(out["prime"]["mensuelle"], 65.0);
        assert_eq!(out["prime"]["annuelle"], 720.0);
        assert_eq!(out["prime"]["semestrielle"], 380.0);
        assert_eq!(out["garanties"].as_array().unwrap().len(), 5);
        assert_eq!(out["remises"][0]["nom"], "Bonus jeune conducteur");
        assert_eq!(out["prochainEtapes"].as_array().unwrap().len(), 4);
        assert!(out["validJusquau"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_rated_fields_pass_through() {
        let tool = GenerateQuoteTool::new(Arc::new(FakeQuoteApi {
            response: QuoteApiResponse {
                prime_mensuelle: Some(82.5),
                prime_annuelle: Some(950.0),
                garanties: Some(vec!["Tous risques".to_string()]),
                ..Default::default()
            },
        }));
        let out = tool.execute(minimal_input()).await.unwrap();

        assert_eq!(out["prime"]["mensuelle"], 82.5);
        assert_eq!(out["prime"]["annuelle"], 950.0);
        // Unrated frequency falls back.
        assert_eq!(out["prime"]["semestrielle"], 380.0);
        assert_eq!(out["garanties"], json!(["Tous risques"]));
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let tool = GenerateQuoteTool::new(Arc::new(FailingQuoteApi));
        let err = tool.execute(minimal_input()).await.unwrap_err();
        assert!(matches!(err, ToolError::UpstreamFailure(_)));
        assert!(err.user_message().contains("devis"));
    }

    #[tokio::test]
    async fn test_non_positive_capital_is_rejected() {
        let tool = GenerateQuoteTool::new(Arc::new(FailingQuoteApi));
        let err = tool
            .execute(json!({
                "clientInfo": {},
                "productInfo": { "libProduit": "Auto", "capitalAssure": -1.0 }
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SchemaViolation(_)));
    }

    #[tokio::test]
    async fn test_missing_product_info_is_rejected() {
        let tool = GenerateQuoteTool::new(Arc::new(FailingQuoteApi));
        let err = tool
            .execute(json!({"clientInfo": {}}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SchemaViolation(_)));
    }
}
