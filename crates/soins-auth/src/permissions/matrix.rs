use serde::{Deserialize, Serialize};

/// One rubric-level grant inside a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricGrant {
    pub code: String,
    pub nom: String,
    #[serde(default)]
    pub description: Option<String>,
    pub ordre_affichage: i32,
}

/// One module-level grant. `acces_toutes_rubriques` is set only when some
/// contributing source granted full access; it always comes with an empty
/// `rubriques` list. A restricted grant that reaches no rubric keeps the flag
/// unset and conveys no rubric at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleGrant {
    pub code: String,
    pub nom_standard: String,
    #[serde(default)]
    pub nom_personnalise: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub acces_toutes_rubriques: bool,
    pub rubriques: Vec<RubricGrant>,
}

impl ModuleGrant {
    pub fn is_full_access(&self) -> bool {
        self.acces_toutes_rubriques
    }
}

/// A user's effective grants, derived on demand and cached in two shapes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMatrix {
    pub modules: Vec<ModuleGrant>,
}

impl PermissionMatrix {
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// In-memory equivalent of the set-membership check.
    pub fn allows(&self, module: &str, rubric: Option<&str>) -> bool {
        self.modules.iter().any(|grant| {
            grant.code == module
                && (grant.is_full_access()
                    || rubric
                        .map(|code| grant.rubriques.iter().any(|r| r.code == code))
                        .unwrap_or(false))
        })
    }

    /// Membership entries for the set-shaped cache: `module:{code}` for full
    /// access, `rubric:{module}:{code}` for partial grants. A restricted
    /// module that reaches no rubric contributes no entry.
    pub fn cache_entries(&self) -> Vec<String> {
        let mut entries = Vec::new();
        for grant in &self.modules {
            if grant.is_full_access() {
                entries.push(format!("module:{}", grant.code));
            } else {
                for rubric in &grant.rubriques {
                    entries.push(format!("rubric:{}:{}", grant.code, rubric.code));
                }
            }
        }
        entries
    }
}

/// One flattened row out of the effective-grants query: module columns plus
/// an optional rubric, `acces_toutes_rubriques` carrying the per-source OR.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionRow {
    pub module_code: String,
    pub nom_standard: String,
    pub nom_personnalise: Option<String>,
    pub description: Option<String>,
    pub acces_toutes_rubriques: bool,
    pub rubrique_code: Option<String>,
    pub rubrique_nom: Option<String>,
    pub rubrique_description: Option<String>,
    pub ordre_affichage: Option<i32>,
}

/// Folds flattened rows into the matrix. Aggregation rule: if any source
/// granted `acces_toutes_rubriques`, the module keeps the flag and an empty
/// rubric list; otherwise rubrics from all sources are deduplicated and
/// sorted by `(code, nom, description, ordre_affichage)`.
pub fn aggregate_rows(rows: Vec<PermissionRow>) -> PermissionMatrix {
    let mut modules: Vec<ModuleGrant> = Vec::new();

    for row in rows {
        let position = modules.iter().position(|m| m.code == row.module_code);
        let index = match position {
            Some(index) => {
                if row.acces_toutes_rubriques {
                    modules[index].acces_toutes_rubriques = true;
                }
                index
            }
            None => {
                modules.push(ModuleGrant {
                    code: row.module_code.clone(),
                    nom_standard: row.nom_standard.clone(),
                    nom_personnalise: row.nom_personnalise.clone(),
                    description: row.description.clone(),
                    acces_toutes_rubriques: row.acces_toutes_rubriques,
                    rubriques: Vec::new(),
                });
                modules.len() - 1
            }
        };

        if let (Some(code), Some(nom)) = (row.rubrique_code, row.rubrique_nom) {
            modules[index].rubriques.push(RubricGrant {
                code,
                nom,
                description: row.rubrique_description,
                ordre_affichage: row.ordre_affichage.unwrap_or(0),
            });
        }
    }

    for module in modules.iter_mut() {
        if module.acces_toutes_rubriques {
            module.rubriques.clear();
        } else {
            module.rubriques.sort_by(|a, b| {
                (&a.code, &a.nom, &a.description, a.ordre_affichage).cmp(&(
                    &b.code,
                    &b.nom,
                    &b.description,
                    b.ordre_affichage,
                ))
            });
            module.rubriques.dedup();
        }
    }

    PermissionMatrix { modules }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(module: &str, full: bool, rubric: Option<(&str, i32)>) -> PermissionRow {
        PermissionRow {
            module_code: module.to_string(),
            nom_standard: format!("Module {module}"),
            nom_personnalise: None,
            description: None,
            acces_toutes_rubriques: full,
            rubrique_code: rubric.map(|(code, _)| code.to_string()),
            rubrique_nom: rubric.map(|(code, _)| format!("Rubrique {code}")),
            rubrique_description: None,
            ordre_affichage: rubric.map(|(_, ordre)| ordre),
        }
    }

    #[test]
    fn full_access_from_any_source_empties_the_rubric_list() {
        let matrix = aggregate_rows(vec![
            row("ACCUEIL", false, Some(("AG", 1))),
            row("ACCUEIL", true, Some(("RDV", 2))),
        ]);

        assert_eq!(matrix.modules.len(), 1);
        assert!(matrix.modules[0].is_full_access());
    }

    #[test]
    fn partial_grants_are_deduplicated_and_sorted() {
        let matrix = aggregate_rows(vec![
            row("CAISSE", false, Some(("REMBOURSEMENT", 2))),
            row("CAISSE", false, Some(("ENCAISSEMENT", 1))),
            row("CAISSE", false, Some(("ENCAISSEMENT", 1))),
        ]);

        let rubriques = &matrix.modules[0].rubriques;
        assert_eq!(rubriques.len(), 2);
        assert_eq!(rubriques[0].code, "ENCAISSEMENT");
        assert_eq!(rubriques[1].code, "REMBOURSEMENT");
    }

    #[test]
    fn module_without_rubric_rows_and_without_full_access_stays_empty_handed() {
        // A direct module grant with acces_toutes_rubriques=false and no
        // rubric grants yields a module with no reachable rubric, NOT full
        // access.
        let matrix = aggregate_rows(vec![row("PHARMACIE", false, None)]);
        assert_eq!(matrix.modules.len(), 1);
        assert!(matrix.modules[0].rubriques.is_empty());
        assert!(!matrix.modules[0].is_full_access());
        assert!(!matrix.allows("PHARMACIE", None));
        assert!(!matrix.allows("PHARMACIE", Some("STOCK")));
    }

    #[test]
    fn restricted_module_with_no_rubrics_is_never_cached_as_full_access() {
        // The membership set mirrors allows(): a restricted grant that
        // reaches no rubric must not produce a module:{code} entry, or the
        // SISMEMBER fast path would answer true for every rubric under it.
        let matrix = aggregate_rows(vec![
            row("PHARMACIE", false, None),
            row("ACCUEIL", true, None),
        ]);

        let entries = matrix.cache_entries();
        assert!(!entries.contains(&"module:PHARMACIE".to_string()));
        assert!(entries.contains(&"module:ACCUEIL".to_string()));
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn allows_honours_full_and_partial_grants() {
        let matrix = aggregate_rows(vec![
            row("ACCUEIL", true, None),
            row("CAISSE", false, Some(("ENCAISSEMENT", 1))),
        ]);

        assert!(matrix.allows("ACCUEIL", None));
        assert!(matrix.allows("ACCUEIL", Some("NIMPORTE")));
        assert!(matrix.allows("CAISSE", Some("ENCAISSEMENT")));
        assert!(!matrix.allows("CAISSE", Some("REMBOURSEMENT")));
        assert!(!matrix.allows("CAISSE", None));
        assert!(!matrix.allows("PHARMACIE", None));
    }

    #[test]
    fn cache_entries_follow_the_membership_layout() {
        let matrix = aggregate_rows(vec![
            row("ACCUEIL", true, None),
            row("CAISSE", false, Some(("ENCAISSEMENT", 1))),
        ]);

        let entries = matrix.cache_entries();
        assert!(entries.contains(&"module:ACCUEIL".to_string()));
        assert!(entries.contains(&"rubric:CAISSE:ENCAISSEMENT".to_string()));
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn membership_set_check_agrees_with_allows() {
        // Same decision procedure as the SISMEMBER fast path: module entry
        // first, then the rubric entry.
        fn set_check(entries: &[String], module: &str, rubric: Option<&str>) -> bool {
            if entries.contains(&format!("module:{module}")) {
                return true;
            }
            match rubric {
                Some(rubric) => entries.contains(&format!("rubric:{module}:{rubric}")),
                None => false,
            }
        }

        let matrix = aggregate_rows(vec![
            row("ACCUEIL", true, None),
            row("CAISSE", false, Some(("ENCAISSEMENT", 1))),
            row("PHARMACIE", false, None),
        ]);
        let entries = matrix.cache_entries();

        for module in ["ACCUEIL", "CAISSE", "PHARMACIE", "INCONNU"] {
            for rubric in [None, Some("ENCAISSEMENT"), Some("STOCK")] {
                assert_eq!(
                    set_check(&entries, module, rubric),
                    matrix.allows(module, rubric),
                    "divergence for {module}/{rubric:?}"
                );
            }
        }
    }

    #[test]
    fn json_cache_shape_round_trips() {
        let matrix = aggregate_rows(vec![
            row("ACCUEIL", true, None),
            row("CAISSE", false, Some(("ENCAISSEMENT", 3))),
        ]);

        let json = serde_json::to_string(&matrix).unwrap();
        let restored: PermissionMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, matrix);
    }
}
