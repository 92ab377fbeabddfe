//! Database models for the insurance schema
//!
//! Column names follow the upstream policy-management system (French
//! snake_case); dates are stored as ISO8601 text for portability across
//! backends.

use serde::{Deserialize, Serialize};

/// Insurance product from the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProduitRow {
    /// Product code (primary key)
    pub code_produit: String,
    /// Commercial product name
    pub lib_produit: String,
    /// Branch (AUTOMOBILE, HABITATION, SANTE, VIE...)
    pub branche: String,
    /// Free-form description
    pub description: Option<String>,
    /// Target customer segments, semicolon separated
    pub profils_cibles: Option<String>,
}

/// Individual client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonnePhysiqueRow {
    /// Client reference (primary key)
    pub ref_personne: i64,
    /// Full name
    pub nom_prenom: String,
    /// Birth date (ISO8601 date)
    pub date_naissance: Option<String>,
    /// Birth place
    pub lieu_naissance: Option<String>,
    /// National identity document number
    pub num_piece_identite: Option<i64>,
    /// City / governorate
    pub ville_gouvernorat: Option<String>,
}

/// Corporate client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonneMoraleRow {
    /// Client reference (primary key)
    pub ref_personne: i64,
    /// Company name
    pub raison_sociale: String,
    /// Fiscal registration number
    pub matricule_fiscale: Option<String>,
    /// City / governorate
    pub ville_gouvernorat: Option<String>,
}

/// Insurance contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContratRow {
    /// Contract number (primary key)
    pub num_contrat: String,
    /// Owning client reference
    pub ref_personne: i64,
    /// Product code, when the contract maps to a catalog product
    pub code_produit: Option<String>,
    /// Product name as written on the contract
    pub lib_produit: String,
    /// Branch
    pub branche: Option<String>,
    /// Effective date (ISO8601 date)
    pub effet_contrat: String,
    /// Expiration date (ISO8601 date)
    pub date_expiration: Option<String>,
    /// Next premium due date (ISO8601 date)
    pub prochain_terme: Option<String>,
    /// Contract state label (En cours, Résilié...)
    pub lib_etat_contrat: Option<String>,
    /// Outstanding premium receipts, 0 when fully paid
    pub somme_quittances: f64,
    /// Insured capital
    pub capital_assure: Option<f64>,
}

/// Declared claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinistreRow {
    /// Claim number (primary key)
    pub num_sinistre: String,
    /// Contract the claim was declared on
    pub num_contrat: String,
    /// Branch label
    pub lib_branche: Option<String>,
    /// Sub-branch label
    pub lib_sous_branche: Option<String>,
    /// Product name
    pub lib_produit: Option<String>,
    /// Nature of the loss (vol, incendie, collision...)
    pub nature_sinistre: Option<String>,
    /// Loss type label
    pub lib_type_sinistre: Option<String>,
    /// Liability rate percentage
    pub taux_responsabilite: Option<f64>,
    /// Date the loss occurred (ISO8601 date)
    pub date_survenance: Option<String>,
    /// Date the loss was declared (ISO8601 date)
    pub date_declaration: Option<String>,
    /// Date the file was opened (ISO8601 date)
    pub date_ouverture: Option<String>,
    /// Adjuster observations
    pub observation_sinistre: Option<String>,
    /// Claim state label as written by the back office
    pub lib_etat_sinistre: Option<String>,
    /// Accident location
    pub lieu_accident: Option<String>,
    /// Reopening reason
    pub motif_reouverture: Option<String>,
    /// Amount already paid out
    pub montant_encaisse: Option<f64>,
    /// Amount still to be paid
    pub montant_a_encaisser: Option<f64>,
}
