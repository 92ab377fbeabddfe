//! Subscribed guarantees and contracts for a client

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::persistence::InsuranceStore;

use super::lookup::{resolve_client, statut_paiement, ClientLookupInput};
use super::{input_schema_for, ok_envelope, parse_input, InsuranceTool, ToolError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonnePhysiqueInfo {
    pub nom_prenom: String,
    pub date_naissance: Option<String>,
    pub lieu_naissance: Option<String>,
    pub num_piece_identite: Option<i64>,
    pub ville_gouvernorat: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonneMoraleInfo {
    pub raison_sociale: String,
    pub matricule_fiscale: Option<String>,
    pub ville_gouvernorat: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContratInfo {
    pub num_contrat: String,
    pub lib_produit: String,
    pub effet_contrat: String,
    pub date_expiration: Option<String>,
    pub prochain_terme: Option<String>,
    pub lib_etat_contrat: Option<String>,
    pub branche: Option<String>,
    pub somme_quittances: f64,
    pub statut_paiement: String,
    pub capital_assure: Option<f64>,
    pub garanties: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyInfo {
    pub ref_personne: Option<i64>,
    pub personne_physique: Option<PersonnePhysiqueInfo>,
    pub personne_morale: Option<PersonneMoraleInfo>,
    pub contrats: Vec<ContratInfo>,
}

/// `getClientPolicyInfo`: resolve a client by any accepted identifier and
/// report their contracts with the subscribed guarantee labels.
pub struct PolicyInfoTool {
    store: InsuranceStore,
}

impl PolicyInfoTool {
    pub fn new(store: InsuranceStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl InsuranceTool for PolicyInfoTool {
    fn name(&self) -> &'static str {
        "getClientPolicyInfo"
    }

    fn description(&self) -> &'static str {
        "Retrieve client policy information and subscribed guarantees"
    }

    fn input_schema(&self) -> Value {
        input_schema_for::<ClientLookupInput>()
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let input: ClientLookupInput = parse_input(input)?;
        let client = resolve_client(&self.store, &input).await?;

        let mut contrats = Vec::with_capacity(client.contrats.len());
        for contrat in &client.contrats {
            let garanties = self.store.garanties_contrat(&contrat.num_contrat).await?;
            contrats.push(ContratInfo {
                num_contrat: contrat.num_contrat.clone(),
                lib_produit: contrat.lib_produit.clone(),
                effet_contrat: contrat.effet_contrat.clone(),
                date_expiration: contrat.date_expiration.clone(),
                prochain_terme: contrat.prochain_terme.clone(),
                lib_etat_contrat: contrat.lib_etat_contrat.clone(),
                branche: contrat.branche.clone(),
                somme_quittances: contrat.somme_quittances,
                statut_paiement: statut_paiement(contrat.somme_quittances).to_string(),
                capital_assure: contrat.capital_assure,
                garanties,
            });
        }

        Ok(ok_envelope(&PolicyInfo {
            ref_personne: client.ref_personne,
            personne_physique: client.physique.map(|p| PersonnePhysiqueInfo {
                nom_prenom: p.nom_prenom,
                date_naissance: p.date_naissance,
                lieu_naissance: p.lieu_naissance,
                num_piece_identite: p.num_piece_identite,
                ville_gouvernorat: p.ville_gouvernorat,
            }),
            personne_morale: client.morale.map(|m| PersonneMoraleInfo {
                raison_sociale: m.raison_sociale,
                matricule_fiscale: m.matricule_fiscale,
                ville_gouvernorat: m.ville_gouvernorat,
            }),
            contrats,
        }))
    }
}
