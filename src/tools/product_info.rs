//! Product catalog lookup

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::persistence::{InsuranceStore, ProduitRow};
use crate::text::contains_normalized;

use super::{input_schema_for, ok_envelope, parse_input, InsuranceTool, ToolError};

/// Cap on the general listing returned when no filter matches
const FALLBACK_LIMIT: usize = 10;

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductInfoInput {
    /// Code du produit (ex: P-AUTO-TR)
    pub code_produit: Option<String>,
    /// Libellé (ou partie du libellé) du produit
    pub lib_produit: Option<String>,
    /// Branche d'assurance (Automobile, Habitation, Santé, Vie...)
    pub branche: Option<String>,
    /// Libellé d'une garantie recherchée
    pub lib_garantie: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProduitEntry {
    pub code_produit: String,
    pub lib_produit: String,
    pub branche: String,
    pub description: Option<String>,
    pub garanties: Vec<String>,
    pub profils_cibles: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCatalog {
    pub produits: Vec<ProduitEntry>,
}

/// `getInsuranceProductInfo`: look up catalog products by code, name,
/// branch or guarantee label. Name matches are partial and accent
/// insensitive; the code must match exactly (case aside). When no filter
/// matches, the answer falls back to a capped general listing so the model
/// can still present the catalog; only an empty catalog is an error.
pub struct ProductInfoTool {
    store: InsuranceStore,
}

impl ProductInfoTool {
    pub fn new(store: InsuranceStore) -> Self {
        Self { store }
    }

    async fn entry(&self, row: ProduitRow) -> Result<ProduitEntry, ToolError> {
        let garanties = self.store.garanties_produit(&row.code_produit).await?;
        Ok(ProduitEntry {
            code_produit: row.code_produit,
            lib_produit: row.lib_produit,
            branche: row.branche,
            description: row.description,
            garanties,
            profils_cibles: split_profils(row.profils_cibles.as_deref()),
        })
    }
}

#[async_trait]
impl InsuranceTool for ProductInfoTool {
    fn name(&self) -> &'static str {
        "getInsuranceProductInfo"
    }

    fn description(&self) -> &'static str {
        "Get detailed information about Aegis Assurances insurance products, guarantees, and conditions"
    }

    fn input_schema(&self) -> Value {
        input_schema_for::<ProductInfoInput>()
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let input: ProductInfoInput = parse_input(input)?;
        let rows = self
            .store
            .list_produits(input.lib_produit.as_deref(), input.branche.as_deref())
            .await?;

        let mut produits = Vec::new();
        for row in rows {
            if let Some(code) = &input.code_produit {
                if !row.code_produit.eq_ignore_ascii_case(code) {
                    continue;
                }
            }
            let entry = self.entry(row).await?;
            if let Some(garantie) = &input.lib_garantie {
                if !entry.garanties.iter().any(|g| contains_normalized(g, garantie)) {
                    continue;
                }
            }
            produits.push(entry);
        }

        if produits.is_empty() {
            // Nothing matched the filters; answer with the catalog instead.
            let rows = self.store.list_produits(None, None).await?;
            for row in rows.into_iter().take(FALLBACK_LIMIT) {
                produits.push(self.entry(row).await?);
            }
        }

        if produits.is_empty() {
            return Err(ToolError::NotFound(
                "the product catalog is empty".to_string(),
            ));
        }

        Ok(ok_envelope(&ProductCatalog { produits }))
    }
}

fn split_profils(raw: Option<&str>) -> Vec<String> {
    raw.map(|profils| {
        profils
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
