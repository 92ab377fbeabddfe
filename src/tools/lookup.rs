//! Client resolution shared by the policy and payment tools

use schemars::JsonSchema;
use serde::Deserialize;

use crate::persistence::{ContratRow, InsuranceStore, PersonneMoraleRow, PersonnePhysiqueRow};

use super::ToolError;

/// Identifier set accepted by the client-centric tools. At least one
/// identifier must be present.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClientLookupInput {
    /// Référence de la personne (physique ou morale)
    pub ref_personne: Option<i64>,
    /// Numéro de contrat spécifique
    pub num_contrat: Option<String>,
    /// Raison sociale (pour personne morale)
    pub raison_sociale: Option<String>,
    /// Nom et prénom (pour personne physique)
    pub nom_prenom: Option<String>,
    /// Matricule fiscal (pour personne morale)
    pub matricule_fiscale: Option<String>,
    /// Numéro de pièce d'identité (pour personne physique)
    pub num_piece_identite: Option<i64>,
}

impl ClientLookupInput {
    pub fn has_identifier(&self) -> bool {
        self.ref_personne.is_some()
            || self.num_contrat.is_some()
            || self.raison_sociale.is_some()
            || self.nom_prenom.is_some()
            || self.matricule_fiscale.is_some()
            || self.num_piece_identite.is_some()
    }
}

/// A resolved client and the contracts attached to them
#[derive(Debug, Clone)]
pub struct ResolvedClient {
    pub ref_personne: Option<i64>,
    pub physique: Option<PersonnePhysiqueRow>,
    pub morale: Option<PersonneMoraleRow>,
    pub contrats: Vec<ContratRow>,
}

impl ResolvedClient {
    /// Display name of whichever client kind was resolved
    pub fn identite(&self) -> Option<String> {
        if let Some(personne) = &self.physique {
            return Some(personne.nom_prenom.clone());
        }
        self.morale.as_ref().map(|m| m.raison_sociale.clone())
    }
}

/// Resolve a client from whichever identifiers were provided.
///
/// Identifiers are tried in a fixed order: contract number, client
/// reference, identity document, name, fiscal id, company name. The first
/// one that matches wins; when a contract number matches, only that
/// contract is returned.
pub async fn resolve_client(
    store: &InsuranceStore,
    input: &ClientLookupInput,
) -> Result<ResolvedClient, ToolError> {
    if !input.has_identifier() {
        return Err(ToolError::SchemaViolation(
            "at least one client identifier is required".to_string(),
        ));
    }

    if let Some(num) = &input.num_contrat {
        if let Some(contrat) = store.contrat_by_num(num).await? {
            let physique = store.personne_physique_by_ref(contrat.ref_personne).await?;
            let morale = if physique.is_none() {
                store.personne_morale_by_ref(contrat.ref_personne).await?
            } else {
                None
            };
            return Ok(ResolvedClient {
                ref_personne: Some(contrat.ref_personne),
                physique,
                morale,
                contrats: vec![contrat],
            });
        }
    }

    if let Some(resolved) = resolve_personne(store, input).await? {
        return Ok(resolved);
    }

    Err(ToolError::NotFound(
        "no client matches the given identifiers".to_string(),
    ))
}

async fn resolve_personne(
    store: &InsuranceStore,
    input: &ClientLookupInput,
) -> Result<Option<ResolvedClient>, ToolError> {
    if let Some(ref_personne) = input.ref_personne {
        if let Some(personne) = store.personne_physique_by_ref(ref_personne).await? {
            return Ok(Some(with_contrats(store, Some(personne), None).await?));
        }
        if let Some(morale) = store.personne_morale_by_ref(ref_personne).await? {
            return Ok(Some(with_contrats(store, None, Some(morale)).await?));
        }
    }
    if let Some(piece) = input.num_piece_identite {
        if let Some(personne) = store.personne_physique_by_piece(piece).await? {
            return Ok(Some(with_contrats(store, Some(personne), None).await?));
        }
    }
    if let Some(nom) = &input.nom_prenom {
        if let Some(personne) = store.personne_physique_by_nom(nom).await? {
            return Ok(Some(with_contrats(store, Some(personne), None).await?));
        }
    }
    if let Some(matricule) = &input.matricule_fiscale {
        if let Some(morale) = store.personne_morale_by_matricule(matricule).await? {
            return Ok(Some(with_contrats(store, None, Some(morale)).await?));
        }
    }
    if let Some(raison) = &input.raison_sociale {
        if let Some(morale) = store.personne_morale_by_raison(raison).await? {
            return Ok(Some(with_contrats(store, None, Some(morale)).await?));
        }
    }
    Ok(None)
}

async fn with_contrats(
    store: &InsuranceStore,
    physique: Option<PersonnePhysiqueRow>,
    morale: Option<PersonneMoraleRow>,
) -> Result<ResolvedClient, ToolError> {
    let ref_personne = physique
        .as_ref()
        .map(|p| p.ref_personne)
        .or_else(|| morale.as_ref().map(|m| m.ref_personne));
    let contrats = match ref_personne {
        Some(r) => store.contrats_by_personne(r).await?,
        None => Vec::new(),
    };
    Ok(ResolvedClient {
        ref_personne,
        physique,
        morale,
        contrats,
    })
}

/// Payment standing derived from outstanding premium receipts
pub fn statut_paiement(somme_quittances: f64) -> &'static str {
    if somme_quittances <= 0.0 {
        "à jour"
    } else {
        "impayé"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::fixtures;
    use crate::persistence::migrations::MigrationRunner;
    use crate::persistence::ConnectionPool;

    async fn seeded_store() -> InsuranceStore {
        let pool = ConnectionPool::new("sqlite::memory:", 1, 5).await.unwrap();
        MigrationRunner::new(pool.clone()).migrate_up().await.unwrap();
        let store = InsuranceStore::new(pool);
        fixtures::seed_demo_data(&store).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_no_identifier_is_a_schema_violation() {
        let store = seeded_store().await;
        let err = resolve_client(&store, &ClientLookupInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SchemaViolation(_)));
    }

    #[tokio::test]
    async fn test_contract_number_pins_a_single_contract() {
        let store = seeded_store().await;
        let input = ClientLookupInput {
            num_contrat: Some("BH-AUTO-2024-001234".to_string()),
            ..Default::default()
        };
        let client = resolve_client(&store, &input).await.unwrap();
        assert_eq!(client.ref_personne, Some(1001));
        assert_eq!(client.contrats.len(), 1);
        assert_eq!(client.identite().as_deref(), Some("Ahmed Ben Salah"));
    }

    #[tokio::test]
    async fn test_name_lookup_returns_all_contracts() {
        let store = seeded_store().await;
        let input = ClientLookupInput {
            nom_prenom: Some("ben salah".to_string()),
            ..Default::default()
        };
        let client = resolve_client(&store, &input).await.unwrap();
        assert_eq!(client.ref_personne, Some(1001));
        assert!(client.contrats.len() >= 2);
    }

    #[tokio::test]
    async fn test_company_resolution_by_matricule() {
        let store = seeded_store().await;
        let input = ClientLookupInput {
            matricule_fiscale: Some("1234567A".to_string()),
            ..Default::default()
        };
        let client = resolve_client(&store, &input).await.unwrap();
        assert!(client.morale.is_some());
        assert!(client
            .identite()
            .unwrap()
            .contains("EL MOUROUJ"));
    }

    #[tokio::test]
    async fn test_unknown_identifiers_are_not_found() {
        let store = seeded_store().await;
        let input = ClientLookupInput {
            nom_prenom: Some("Personne Inexistante".to_string()),
            ..Default::default()
        };
        let err = resolve_client(&store, &input).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn test_statut_paiement_threshold() {
        assert_eq!(statut_paiement(0.0), "à jour");
        assert_eq!(statut_paiement(-10.0), "à jour");
        assert_eq!(statut_paiement(0.5), "impayé");
    }
}
