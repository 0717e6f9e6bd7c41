//! Resolving human names to record ids.
//!
//! [`Resolver`] is implemented for every [`Storage`], so a store handed to a
//! query doubles as its lookup collaborator.

use crate::{
    condition::{GENUS_RANK, GROUP_RANK},
    error::Result,
    model::Model,
    pattern::{clean_pattern, like},
};
use hashbrown::HashSet;
use mycoquery_core::{Id, Sql, Storage, Token, Value};
use regex::Regex;
use std::sync::LazyLock;

static LOGIN_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<\s*([^<>]+?)\s*>\s*$").unwrap());
static CLASSIFICATION_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_([^_]+)_").unwrap());

/// Which table a by-name reference is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    Herbaria,
    HerbariumRecords,
    Licenses,
    Locations,
    Names,
    Observations,
    Projects,
    SpeciesLists,
    Users,
}

impl LookupKind {
    pub const fn for_model(model: Model) -> Option<LookupKind> {
        Some(match model {
            Model::Herbarium => LookupKind::Herbaria,
            Model::HerbariumRecord => LookupKind::HerbariumRecords,
            Model::License => LookupKind::Licenses,
            Model::Location => LookupKind::Locations,
            Model::Name => LookupKind::Names,
            Model::Observation => LookupKind::Observations,
            Model::Project => LookupKind::Projects,
            Model::SpeciesList => LookupKind::SpeciesLists,
            Model::User => LookupKind::Users,
            _ => return None,
        })
    }

    pub const fn label(self) -> &'static str {
        match self {
            LookupKind::Herbaria => "herbarium",
            LookupKind::HerbariumRecords => "herbarium record",
            LookupKind::Licenses => "license",
            LookupKind::Locations => "location",
            LookupKind::Names => "name",
            LookupKind::Observations => "observation",
            LookupKind::Projects => "project",
            LookupKind::SpeciesLists => "species list",
            LookupKind::Users => "user",
        }
    }
}

/// Taxonomic relatives of a set of names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRelation {
    /// The names themselves plus every name in their synonym groups.
    Synonyms,
    /// Names recorded as misspellings of these.
    Misspellings,
    /// Immediate children, or every descendant when `all`.
    Children { all: bool },
    /// The nearest parent, or every ancestor when `all`.
    Parents { all: bool },
}

/// Name lookups consulted while a query initializes.
pub trait Resolver {
    /// Ids of records of `kind` called `name`; empty when nothing matches.
    fn resolve_name(&self, kind: LookupKind, name: &str) -> Result<Vec<Id>>;

    fn name_relatives(&self, ids: &[Id], relation: NameRelation) -> Result<Vec<Id>>;
}

fn ids_where(table: &'static str, cond: Sql) -> Sql {
    Sql::token(Token::SELECT)
        .append(Sql::column(table, "id"))
        .push(Token::FROM)
        .append(Sql::ident(table))
        .push(Token::WHERE)
        .append(cond)
        .push(Token::ORDER_BY)
        .append(Sql::column(table, "id"))
}

fn first_match<S: Storage + ?Sized>(store: &S, table: &'static str, conds: Vec<Sql>) -> Result<Vec<Id>> {
    for cond in conds {
        let ids = store.select_ids(&ids_where(table, cond))?;
        if !ids.is_empty() {
            return Ok(ids);
        }
    }
    Ok(Vec::new())
}

fn dedup(ids: Vec<Id>) -> Vec<Id> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

struct NameRow {
    id: Id,
    text_name: String,
    rank: i64,
    classification: String,
}

fn name_rows<S: Storage + ?Sized>(store: &S, cond: Sql) -> Result<Vec<NameRow>> {
    let sql = Sql::token(Token::SELECT)
        .append(Sql::join(
            ["id", "text_name", "rank", "classification"]
                .into_iter()
                .map(|c| Sql::column("names", c)),
            Token::COMMA,
        ))
        .push(Token::FROM)
        .append(Sql::ident("names"))
        .push(Token::WHERE)
        .append(cond)
        .push(Token::ORDER_BY)
        .append(Sql::column("names", "id"));
    Ok(store
        .select_rows(&sql)?
        .into_iter()
        .filter_map(|row| {
            let mut cells = row.into_iter();
            let id = cells.next()?.as_i64()?;
            let text_name = cells.next()?.as_str()?.to_owned();
            let rank = cells.next().and_then(|v| v.as_i64()).unwrap_or(0);
            let classification = cells
                .next()
                .and_then(|v| v.as_str().map(str::to_owned))
                .unwrap_or_default();
            Some(NameRow {
                id,
                text_name,
                rank,
                classification,
            })
        })
        .collect())
}

fn is_below_genus(rank: i64) -> bool {
    rank <= GENUS_RANK || rank == GROUP_RANK
}

fn children<S: Storage + ?Sized>(store: &S, parent: &NameRow, all: bool) -> Result<Vec<Id>> {
    let cond = if is_below_genus(parent.rank) {
        like(
            Sql::column("names", "text_name"),
            format!("{} %", clean_pattern(&parent.text_name)),
            true,
        )
    } else {
        like(
            Sql::column("names", "classification"),
            format!("%: _{}_%", clean_pattern(&parent.text_name)),
            true,
        )
    };
    let rows = name_rows(store, cond)?;
    if all {
        return Ok(rows.into_iter().map(|r| r.id).collect());
    }
    // keep only rows with no ancestor among the matches
    let texts: Vec<&str> = rows.iter().map(|r| r.text_name.as_str()).collect();
    Ok(rows
        .iter()
        .filter(|row| {
            !texts.iter().any(|other| {
                *other != row.text_name
                    && row.text_name.len() > other.len()
                    && row.text_name.starts_with(other)
                    && row.text_name.as_bytes()[other.len()] == b' '
            })
        })
        .filter(|row| is_below_genus(parent.rank) || row.rank < parent.rank)
        .map(|r| r.id)
        .collect())
}

fn parents<S: Storage + ?Sized>(store: &S, child: &NameRow, all: bool) -> Result<Vec<Id>> {
    let words: Vec<&str> = child.text_name.split(' ').collect();
    let mut candidates: Vec<String> = (1..words.len()).map(|n| words[..n].join(" ")).collect();
    candidates.extend(
        CLASSIFICATION_NAME
            .captures_iter(&child.classification)
            .map(|c| c[1].to_owned()),
    );
    candidates.retain(|c| *c != child.text_name && !c.ends_with('.'));
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    let mut rows = name_rows(store, Sql::column("names", "text_name").in_list(candidates))?;
    rows.retain(|r| r.id != child.id);
    if all {
        return Ok(rows.into_iter().map(|r| r.id).collect());
    }
    // nearest parent: the longest syntactic prefix, else the lowest rank
    let nearest = rows
        .iter()
        .filter(|r| child.text_name.starts_with(&format!("{} ", r.text_name)))
        .max_by_key(|r| r.text_name.len())
        .or_else(|| rows.iter().min_by_key(|r| r.rank));
    Ok(nearest.map(|r| vec![r.id]).unwrap_or_default())
}

impl<S: Storage + ?Sized> Resolver for S {
    fn resolve_name(&self, kind: LookupKind, name: &str) -> Result<Vec<Id>> {
        let text = name.trim();
        let eq = |table: &'static str, col: &'static str| Sql::column(table, col).equals(Sql::param(text));
        let ids = match kind {
            LookupKind::Users => {
                let login = LOGIN_SUFFIX
                    .captures(text)
                    .map(|c| c[1].to_owned())
                    .unwrap_or_else(|| text.to_owned());
                first_match(
                    self,
                    "users",
                    vec![
                        Sql::column("users", "login").equals(Sql::param(login)),
                        eq("users", "name"),
                    ],
                )?
            }
            LookupKind::Locations => first_match(
                self,
                "locations",
                vec![
                    eq("locations", "name"),
                    like(
                        Sql::column("locations", "name"),
                        format!("%{}%", clean_pattern(text)),
                        true,
                    ),
                ],
            )?,
            LookupKind::Names => first_match(
                self,
                "names",
                vec![eq("names", "search_name"), eq("names", "text_name")],
            )?,
            LookupKind::Herbaria => first_match(
                self,
                "herbaria",
                vec![eq("herbaria", "name"), eq("herbaria", "code")],
            )?,
            LookupKind::HerbariumRecords => first_match(
                self,
                "herbarium_records",
                vec![eq("herbarium_records", "accession_number")],
            )?,
            LookupKind::Licenses => {
                first_match(self, "licenses", vec![eq("licenses", "display_name")])?
            }
            LookupKind::Projects => first_match(self, "projects", vec![eq("projects", "title")])?,
            LookupKind::SpeciesLists => {
                first_match(self, "species_lists", vec![eq("species_lists", "title")])?
            }
            LookupKind::Observations => Vec::new(),
        };
        Ok(ids)
    }

    fn name_relatives(&self, ids: &[Id], relation: NameRelation) -> Result<Vec<Id>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let id_values = || ids.iter().copied().map(Value::Integer);
        match relation {
            NameRelation::Synonyms => {
                let groups = Sql::token(Token::SELECT)
                    .append(Sql::column("names", "synonym_id"))
                    .push(Token::FROM)
                    .append(Sql::ident("names"))
                    .push(Token::WHERE)
                    .append(Sql::column("names", "id").in_list(id_values()))
                    .push(Token::AND)
                    .append(Sql::column("names", "synonym_id").is_not_null());
                let cond = Sql::column("names", "id")
                    .in_list(id_values())
                    .push(Token::OR)
                    .append(Sql::column("names", "synonym_id"))
                    .push(Token::IN)
                    .append(groups.parens());
                let mut out = ids.to_vec();
                out.extend(self.select_ids(&ids_where("names", cond))?);
                Ok(dedup(out))
            }
            NameRelation::Misspellings => Ok(self.select_ids(&ids_where(
                "names",
                Sql::column("names", "correct_spelling_id").in_list(id_values()),
            ))?),
            NameRelation::Children { all } => {
                let mut out = Vec::new();
                for row in name_rows(self, Sql::column("names", "id").in_list(id_values()))? {
                    out.extend(children(self, &row, all)?);
                }
                Ok(dedup(out))
            }
            NameRelation::Parents { all } => {
                let mut out = Vec::new();
                for row in name_rows(self, Sql::column("names", "id").in_list(id_values()))? {
                    out.extend(parents(self, &row, all)?);
                }
                Ok(dedup(out))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use mycoquery_core::{Dialect, StorageError};
    use std::cell::RefCell;

    /// Answers every select with canned rows and records the statements.
    #[derive(Default)]
    struct Canned {
        ids: Vec<Vec<Id>>,
        seen: RefCell<Vec<String>>,
    }

    impl Storage for Canned {
        fn dialect(&self) -> Dialect {
            Dialect::SQLite
        }

        fn select_ids(&self, sql: &Sql) -> mycoquery_core::Result<Vec<Id>> {
            let mut seen = self.seen.borrow_mut();
            seen.push(sql.sql(Dialect::SQLite));
            Ok(self.ids.get(seen.len() - 1).cloned().unwrap_or_default())
        }

        fn select_rows(&self, _sql: &Sql) -> mycoquery_core::Result<Vec<Vec<Value>>> {
            Err(StorageError::Execution("rows not canned".into()))
        }

        fn select_value(&self, _sql: &Sql) -> mycoquery_core::Result<Option<Value>> {
            Ok(None)
        }
    }

    #[test]
    fn test_location_falls_back_to_substring() {
        let store = Canned {
            ids: vec![vec![], vec![7, 9]],
            ..Canned::default()
        };
        let ids = store.resolve_name(LookupKind::Locations, "Albion").unwrap();
        assert_eq!(ids, vec![7, 9]);
        let seen = store.seen.borrow();
        assert!(seen[0].contains(r#""locations"."name" = ?"#));
        assert!(seen[1].contains("LIKE ?"));
    }

    #[test]
    fn test_exact_match_wins() {
        let store = Canned {
            ids: vec![vec![3]],
            ..Canned::default()
        };
        assert_eq!(store.resolve_name(LookupKind::Names, "Amanita").unwrap(), vec![3]);
        assert_eq!(store.seen.borrow().len(), 1);
    }

    #[test]
    fn test_synonyms_include_self_first() {
        let store = Canned {
            ids: vec![vec![2, 5, 8]],
            ..Canned::default()
        };
        let ids = store.name_relatives(&[5], NameRelation::Synonyms).unwrap();
        assert_eq!(ids, vec![5, 2, 8]);
    }

    #[test]
    fn test_misspellings_and_storage_errors() {
        let store = Canned {
            ids: vec![vec![4, 6]],
            ..Canned::default()
        };
        let ids = store.name_relatives(&[2], NameRelation::Misspellings).unwrap();
        assert_eq!(ids, vec![4, 6]);
        assert!(store.seen.borrow()[0].contains(r#""names"."correct_spelling_id" IN (?)"#));

        struct Broken;
        impl Storage for Broken {
            fn dialect(&self) -> Dialect {
                Dialect::SQLite
            }
            fn select_ids(&self, _sql: &Sql) -> mycoquery_core::Result<Vec<Id>> {
                Err(StorageError::Execution("gone".into()))
            }
            fn select_rows(&self, _sql: &Sql) -> mycoquery_core::Result<Vec<Vec<Value>>> {
                Ok(Vec::new())
            }
            fn select_value(&self, _sql: &Sql) -> mycoquery_core::Result<Option<Value>> {
                Ok(None)
            }
        }
        assert!(matches!(
            Broken.name_relatives(&[2], NameRelation::Misspellings),
            Err(QueryError::Storage(StorageError::Execution(_)))
        ));
    }

    #[test]
    fn test_no_ids_no_query() {
        let store = Canned::default();
        assert!(store.name_relatives(&[], NameRelation::Misspellings).unwrap().is_empty());
        assert!(store.seen.borrow().is_empty());
    }
}
