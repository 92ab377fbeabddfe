//! Demo dataset for local runs and tests
//!
//! Seeded once when the catalog is empty so the assistant has something to
//! talk about out of the box. Contract dates are anchored to the current
//! day to keep the in-force checks meaningful.

use crate::persistence::error::PersistenceError;
use crate::persistence::store::InsuranceStore;
use chrono::{Duration, Utc};

/// Insert the demo dataset if the product catalog is empty.
///
/// Returns `true` when data was inserted, `false` when the database
/// already had content.
pub async fn seed_demo_data(store: &InsuranceStore) -> Result<bool, PersistenceError> {
    if store.count_produits().await? > 0 {
        tracing::debug!("Database already populated, skipping demo seed");
        return Ok(false);
    }

    tracing::info!("Seeding demo insurance dataset");

    let pool = store.pool().pool();
    let today = Utc::now().date_naive();
    let day = |offset: i64| (today + Duration::days(offset)).to_string();

    // Product catalog
    let produits: &[(&str, &str, &str, &str, &str, &[&str])] = &[
        (
            "P-AUTO-TR",
            "Assurance Auto Tous Risques",
            "AUTOMOBILE",
            "Couverture complète du véhicule, dommages tous accidents",
            "Conducteurs de véhicules récents;Familles",
            &[
                "Responsabilité civile",
                "Dommages collision",
                "Vol et incendie",
                "Bris de glace",
                "Assistance dépannage",
            ],
        ),
        (
            "P-AUTO-RC",
            "Assurance Auto au Tiers",
            "AUTOMOBILE",
            "Couverture minimale légale, responsabilité civile seule",
            "Petits budgets;Véhicules anciens",
            &["Responsabilité civile", "Défense et recours", "Assistance dépannage"],
        ),
        (
            "P-HAB",
            "Multirisque Habitation",
            "HABITATION",
            "Protection du logement et de son contenu",
            "Propriétaires;Locataires",
            &[
                "Incendie et explosion",
                "Dégâts des eaux",
                "Vol",
                "Bris de glace",
                "Responsabilité civile vie privée",
            ],
        ),
        (
            "P-SANTE",
            "Assurance Santé Famille",
            "SANTE",
            "Frais de soins pour toute la famille",
            "Familles;Travailleurs indépendants",
            &["Hospitalisation", "Soins ambulatoires", "Pharmacie", "Optique et dentaire"],
        ),
        (
            "P-VIE",
            "Assurance Vie Épargne",
            "VIE",
            "Épargne long terme avec capital décès",
            "Épargnants long terme;Jeunes actifs",
            &["Capital décès", "Épargne retraite", "Rachat partiel"],
        ),
    ];

    for (code, lib, branche, description, profils, garanties) in produits {
        sqlx::query(
            "INSERT INTO produits (code_produit, lib_produit, branche, description, profils_cibles) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(code)
        .bind(lib)
        .bind(branche)
        .bind(description)
        .bind(profils)
        .execute(pool)
        .await?;

        for garantie in *garanties {
            sqlx::query(
                "INSERT INTO garanties_produit (code_produit, lib_garantie) VALUES (?, ?)",
            )
            .bind(code)
            .bind(garantie)
            .execute(pool)
            .await?;
        }
    }

    // Clients
    sqlx::query(
        "INSERT INTO personnes_physiques \
         (ref_personne, nom_prenom, date_naissance, lieu_naissance, num_piece_identite, ville_gouvernorat) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(1001i64)
    .bind("Ahmed Ben Salah")
    .bind("1985-03-22")
    .bind("Tunis")
    .bind(12345678i64)
    .bind("Tunis")
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT INTO personnes_physiques \
         (ref_personne, nom_prenom, date_naissance, lieu_naissance, num_piece_identite, ville_gouvernorat) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(1002i64)
    .bind("Leïla Haddad")
    .bind("1992-07-14")
    .bind("Sfax")
    .bind(98765432i64)
    .bind("Sfax")
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT INTO personnes_morales \
         (ref_personne, raison_sociale, matricule_fiscale, ville_gouvernorat) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(2001i64)
    .bind("STE EL MOUROUJ DISTRIBUTION")
    .bind("1234567A")
    .bind("Ben Arous")
    .execute(pool)
    .await?;

    // Contracts: (num, ref, code, lib, branche, effet, expiration, terme, etat, quittances, capital, garanties)
    struct DemoContrat<'a> {
        num: &'a str,
        ref_personne: i64,
        code: &'a str,
        lib: &'a str,
        branche: &'a str,
        effet: String,
        expiration: Option<String>,
        terme: Option<String>,
        etat: &'a str,
        quittances: f64,
        capital: Option<f64>,
        garanties: &'a [&'a str],
    }

    let contrats = vec![
        DemoContrat {
            num: "BH-AUTO-2024-001234",
            ref_personne: 1001,
            code: "P-AUTO-TR",
            lib: "Assurance Auto Tous Risques",
            branche: "AUTOMOBILE",
            effet: day(-200),
            expiration: Some(day(165)),
            terme: Some(day(45)),
            etat: "En cours",
            quittances: 0.0,
            capital: Some(45000.0),
            garanties: &[
                "Responsabilité civile",
                "Dommages collision",
                "Vol et incendie",
                "Bris de glace",
                "Assistance dépannage",
            ],
        },
        DemoContrat {
            num: "BH-HAB-2023-004567",
            ref_personne: 1001,
            code: "P-HAB",
            lib: "Multirisque Habitation",
            branche: "HABITATION",
            effet: day(-400),
            expiration: Some(day(330)),
            terme: Some(day(-20)),
            etat: "En cours",
            quittances: 240.5,
            capital: Some(120000.0),
            garanties: &["Incendie et explosion", "Dégâts des eaux", "Vol", "Bris de glace"],
        },
        DemoContrat {
            num: "BH-AUTO-2022-009876",
            ref_personne: 1002,
            code: "P-AUTO-RC",
            lib: "Assurance Auto au Tiers",
            branche: "AUTOMOBILE",
            effet: day(-800),
            expiration: Some(day(-435)),
            terme: None,
            etat: "Résilié",
            quittances: 0.0,
            capital: None,
            garanties: &["Responsabilité civile", "Défense et recours"],
        },
        DemoContrat {
            num: "BH-SANTE-2024-002211",
            ref_personne: 2001,
            code: "P-SANTE",
            lib: "Assurance Santé Famille",
            branche: "SANTE",
            effet: day(-100),
            expiration: Some(day(265)),
            terme: Some(day(80)),
            etat: "En cours",
            quittances: 1380.0,
            capital: None,
            garanties: &["Hospitalisation", "Soins ambulatoires", "Pharmacie"],
        },
    ];

    for c in &contrats {
        sqlx::query(
            "INSERT INTO contrats \
             (num_contrat, ref_personne, code_produit, lib_produit, branche, effet_contrat, \
              date_expiration, prochain_terme, lib_etat_contrat, somme_quittances, capital_assure) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(c.num)
        .bind(c.ref_personne)
        .bind(c.code)
        .bind(c.lib)
        .bind(c.branche)
        .bind(&c.effet)
        .bind(&c.expiration)
        .bind(&c.terme)
        .bind(c.etat)
        .bind(c.quittances)
        .bind(c.capital)
        .execute(pool)
        .await?;

        for garantie in c.garanties {
            sqlx::query(
                "INSERT INTO garanties_contrat (num_contrat, lib_garantie) VALUES (?, ?)",
            )
            .bind(c.num)
            .bind(garantie)
            .execute(pool)
            .await?;
        }
    }

    // Claims
    sqlx::query(
        "INSERT INTO sinistres \
         (num_sinistre, num_contrat, lib_branche, lib_sous_branche, lib_produit, nature_sinistre, \
          lib_type_sinistre, date_survenance, date_declaration, date_ouverture, observation_sinistre, \
          lib_etat_sinistre, lieu_accident, montant_encaisse, montant_a_encaisser) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind("SIN-2024-00042")
    .bind("BH-AUTO-2024-001234")
    .bind("AUTOMOBILE")
    .bind("VEHICULES PARTICULIERS")
    .bind("Assurance Auto Tous Risques")
    .bind("vol")
    .bind("Vol de véhicule")
    .bind(day(-35))
    .bind(day(-33))
    .bind(day(-32))
    .bind("Véhicule dérobé sur un parking surveillé, plainte déposée")
    .bind("En cours d'expertise")
    .bind("Tunis, La Marsa")
    .bind(0.0f64)
    .bind(Option::<f64>::None)
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT INTO sinistres \
         (num_sinistre, num_contrat, lib_branche, lib_sous_branche, lib_produit, nature_sinistre, \
          lib_type_sinistre, date_survenance, date_declaration, date_ouverture, observation_sinistre, \
          lib_etat_sinistre, lieu_accident, montant_encaisse, montant_a_encaisser) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind("SIN-2023-00891")
    .bind("BH-AUTO-2024-001234")
    .bind("AUTOMOBILE")
    .bind("VEHICULES PARTICULIERS")
    .bind("Assurance Auto Tous Risques")
    .bind("bris de glace")
    .bind("Pare-brise")
    .bind(day(-160))
    .bind(day(-158))
    .bind(day(-157))
    .bind("Impact sur autoroute, remplacement effectué")
    .bind("Réglé")
    .bind("Autoroute A1")
    .bind(420.0f64)
    .bind(Some(0.0f64))
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT INTO sinistres \
         (num_sinistre, num_contrat, lib_branche, lib_produit, nature_sinistre, \
          date_survenance, date_declaration, lib_etat_sinistre) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind("SIN-2024-00117")
    .bind("BH-HAB-2023-004567")
    .bind("HABITATION")
    .bind("Multirisque Habitation")
    .bind("dégâts des eaux")
    .bind(day(-10))
    .bind(day(-9))
    .bind("Déclaré")
    .execute(pool)
    .await?;

    tracing::info!("Demo dataset seeded");
    Ok(true)
}
