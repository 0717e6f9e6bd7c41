//! Named query behaviors and which models support them.

use crate::{error::QueryError, model::Model};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    AdvancedSearch,
    All,
    AtLocation,
    AtWhere,
    ByAuthor,
    ByEditor,
    ByRssLog,
    ByUser,
    ForProject,
    ForTarget,
    ForUser,
    InSet,
    InSpeciesList,
    InsideObservation,
    OfChildren,
    OfName,
    OfParents,
    PatternSearch,
    RegexpSearch,
    WithDescriptions,
    WithDescriptionsByAuthor,
    WithDescriptionsByEditor,
    WithDescriptionsByUser,
    WithDescriptionsInSet,
    WithObservations,
    WithObservationsAtLocation,
    WithObservationsAtWhere,
    WithObservationsByUser,
    WithObservationsForProject,
    WithObservationsInSet,
    WithObservationsInSpeciesList,
    WithObservationsOfChildren,
    WithObservationsOfName,
}

impl Variant {
    pub const ALL: [Variant; 33] = [
        Variant::AdvancedSearch,
        Variant::All,
        Variant::AtLocation,
        Variant::AtWhere,
        Variant::ByAuthor,
        Variant::ByEditor,
        Variant::ByRssLog,
        Variant::ByUser,
        Variant::ForProject,
        Variant::ForTarget,
        Variant::ForUser,
        Variant::InSet,
        Variant::InSpeciesList,
        Variant::InsideObservation,
        Variant::OfChildren,
        Variant::OfName,
        Variant::OfParents,
        Variant::PatternSearch,
        Variant::RegexpSearch,
        Variant::WithDescriptions,
        Variant::WithDescriptionsByAuthor,
        Variant::WithDescriptionsByEditor,
        Variant::WithDescriptionsByUser,
        Variant::WithDescriptionsInSet,
        Variant::WithObservations,
        Variant::WithObservationsAtLocation,
        Variant::WithObservationsAtWhere,
        Variant::WithObservationsByUser,
        Variant::WithObservationsForProject,
        Variant::WithObservationsInSet,
        Variant::WithObservationsInSpeciesList,
        Variant::WithObservationsOfChildren,
        Variant::WithObservationsOfName,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Variant::AdvancedSearch => "advanced_search",
            Variant::All => "all",
            Variant::AtLocation => "at_location",
            Variant::AtWhere => "at_where",
            Variant::ByAuthor => "by_author",
            Variant::ByEditor => "by_editor",
            Variant::ByRssLog => "by_rss_log",
            Variant::ByUser => "by_user",
            Variant::ForProject => "for_project",
            Variant::ForTarget => "for_target",
            Variant::ForUser => "for_user",
            Variant::InSet => "in_set",
            Variant::InSpeciesList => "in_species_list",
            Variant::InsideObservation => "inside_observation",
            Variant::OfChildren => "of_children",
            Variant::OfName => "of_name",
            Variant::OfParents => "of_parents",
            Variant::PatternSearch => "pattern_search",
            Variant::RegexpSearch => "regexp_search",
            Variant::WithDescriptions => "with_descriptions",
            Variant::WithDescriptionsByAuthor => "with_descriptions_by_author",
            Variant::WithDescriptionsByEditor => "with_descriptions_by_editor",
            Variant::WithDescriptionsByUser => "with_descriptions_by_user",
            Variant::WithDescriptionsInSet => "with_descriptions_in_set",
            Variant::WithObservations => "with_observations",
            Variant::WithObservationsAtLocation => "with_observations_at_location",
            Variant::WithObservationsAtWhere => "with_observations_at_where",
            Variant::WithObservationsByUser => "with_observations_by_user",
            Variant::WithObservationsForProject => "with_observations_for_project",
            Variant::WithObservationsInSet => "with_observations_in_set",
            Variant::WithObservationsInSpeciesList => "with_observations_in_species_list",
            Variant::WithObservationsOfChildren => "with_observations_of_children",
            Variant::WithObservationsOfName => "with_observations_of_name",
        }
    }

    /// The observation variant a `with_observations_*` variant wraps.
    pub const fn observation_inner(self) -> Option<Variant> {
        Some(match self {
            Variant::WithObservations => Variant::All,
            Variant::WithObservationsAtLocation => Variant::AtLocation,
            Variant::WithObservationsAtWhere => Variant::AtWhere,
            Variant::WithObservationsByUser => Variant::ByUser,
            Variant::WithObservationsForProject => Variant::ForProject,
            Variant::WithObservationsInSet => Variant::InSet,
            Variant::WithObservationsInSpeciesList => Variant::InSpeciesList,
            Variant::WithObservationsOfChildren => Variant::OfChildren,
            Variant::WithObservationsOfName => Variant::OfName,
            _ => return None,
        })
    }

    /// Inverse of [`Variant::observation_inner`].
    pub const fn with_observations(inner: Variant) -> Option<Variant> {
        Some(match inner {
            Variant::All => Variant::WithObservations,
            Variant::AtLocation => Variant::WithObservationsAtLocation,
            Variant::AtWhere => Variant::WithObservationsAtWhere,
            Variant::ByUser => Variant::WithObservationsByUser,
            Variant::ForProject => Variant::WithObservationsForProject,
            Variant::InSet => Variant::WithObservationsInSet,
            Variant::InSpeciesList => Variant::WithObservationsInSpeciesList,
            Variant::OfChildren => Variant::WithObservationsOfChildren,
            Variant::OfName => Variant::WithObservationsOfName,
            _ => return None,
        })
    }

    /// The description variant a `with_descriptions_*` variant wraps.
    pub const fn description_inner(self) -> Option<Variant> {
        Some(match self {
            Variant::WithDescriptions => Variant::All,
            Variant::WithDescriptionsByAuthor => Variant::ByAuthor,
            Variant::WithDescriptionsByEditor => Variant::ByEditor,
            Variant::WithDescriptionsByUser => Variant::ByUser,
            Variant::WithDescriptionsInSet => Variant::InSet,
            _ => return None,
        })
    }

    pub const fn with_descriptions(inner: Variant) -> Option<Variant> {
        Some(match inner {
            Variant::All => Variant::WithDescriptions,
            Variant::ByAuthor => Variant::WithDescriptionsByAuthor,
            Variant::ByEditor => Variant::WithDescriptionsByEditor,
            Variant::ByUser => Variant::WithDescriptionsByUser,
            Variant::InSet => Variant::WithDescriptionsInSet,
            _ => return None,
        })
    }
}

use Variant::*;

const COMMENT_VARIANTS: &[Variant] = &[All, ByUser, ForTarget, ForUser, InSet, PatternSearch];
const HERBARIUM_VARIANTS: &[Variant] = &[All, InSet, PatternSearch];
const HERBARIUM_RECORD_VARIANTS: &[Variant] = &[All, ByUser, InSet, PatternSearch];
const IMAGE_VARIANTS: &[Variant] = &[
    AdvancedSearch,
    All,
    ByUser,
    ForProject,
    InSet,
    InsideObservation,
    PatternSearch,
    WithObservations,
    WithObservationsAtLocation,
    WithObservationsAtWhere,
    WithObservationsByUser,
    WithObservationsForProject,
    WithObservationsInSet,
    WithObservationsInSpeciesList,
    WithObservationsOfChildren,
    WithObservationsOfName,
];
const LICENSE_VARIANTS: &[Variant] = &[All, InSet];
const LOCATION_VARIANTS: &[Variant] = &[
    AdvancedSearch,
    All,
    ByEditor,
    ByRssLog,
    ByUser,
    InSet,
    PatternSearch,
    RegexpSearch,
    WithDescriptions,
    WithDescriptionsByAuthor,
    WithDescriptionsByEditor,
    WithDescriptionsByUser,
    WithDescriptionsInSet,
    WithObservations,
    WithObservationsByUser,
    WithObservationsForProject,
    WithObservationsInSet,
    WithObservationsInSpeciesList,
    WithObservationsOfChildren,
    WithObservationsOfName,
];
const DESCRIPTION_VARIANTS: &[Variant] = &[All, ByAuthor, ByEditor, ByUser, InSet, PatternSearch];
const NAME_VARIANTS: &[Variant] = &[
    AdvancedSearch,
    All,
    ByEditor,
    ByRssLog,
    ByUser,
    InSet,
    OfChildren,
    OfParents,
    PatternSearch,
    WithDescriptions,
    WithDescriptionsByAuthor,
    WithDescriptionsByEditor,
    WithDescriptionsByUser,
    WithDescriptionsInSet,
    WithObservations,
    WithObservationsAtLocation,
    WithObservationsAtWhere,
    WithObservationsByUser,
    WithObservationsForProject,
    WithObservationsInSet,
    WithObservationsInSpeciesList,
];
const OBSERVATION_VARIANTS: &[Variant] = &[
    AdvancedSearch,
    All,
    AtLocation,
    AtWhere,
    ByRssLog,
    ByUser,
    ForProject,
    InSet,
    InSpeciesList,
    OfChildren,
    OfName,
    PatternSearch,
];
const PROJECT_VARIANTS: &[Variant] = &[All, ByRssLog, InSet, PatternSearch];
const RSS_LOG_VARIANTS: &[Variant] = &[All, InSet];
const SEQUENCE_VARIANTS: &[Variant] = &[All, ByUser, InSet, PatternSearch];
const SPECIES_LIST_VARIANTS: &[Variant] = &[
    All,
    AtLocation,
    AtWhere,
    ByRssLog,
    ByUser,
    ForProject,
    InSet,
    PatternSearch,
];
const USER_VARIANTS: &[Variant] = &[All, InSet, PatternSearch];

/// Variants registered for `model`.
pub const fn allowed_variants(model: Model) -> &'static [Variant] {
    match model {
        Model::Comment => COMMENT_VARIANTS,
        Model::Herbarium => HERBARIUM_VARIANTS,
        Model::HerbariumRecord => HERBARIUM_RECORD_VARIANTS,
        Model::Image => IMAGE_VARIANTS,
        Model::License => LICENSE_VARIANTS,
        Model::Location => LOCATION_VARIANTS,
        Model::LocationDescription | Model::NameDescription => DESCRIPTION_VARIANTS,
        Model::Name => NAME_VARIANTS,
        Model::Observation => OBSERVATION_VARIANTS,
        Model::Project => PROJECT_VARIANTS,
        Model::RssLog => RSS_LOG_VARIANTS,
        Model::Sequence => SEQUENCE_VARIANTS,
        Model::SpeciesList => SPECIES_LIST_VARIANTS,
        Model::User => USER_VARIANTS,
    }
}

pub fn is_allowed(model: Model, variant: Variant) -> bool {
    allowed_variants(model).contains(&variant)
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| QueryError::UnknownVariant(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for variant in Variant::ALL {
            assert_eq!(variant.name().parse::<Variant>().unwrap(), variant);
        }
        assert!(matches!("by_colour".parse::<Variant>(), Err(QueryError::UnknownVariant(_))));
    }

    #[test]
    fn test_wrappers_invert() {
        for variant in Variant::ALL {
            if let Some(inner) = variant.observation_inner() {
                assert_eq!(Variant::with_observations(inner), Some(variant));
            }
            if let Some(inner) = variant.description_inner() {
                assert_eq!(Variant::with_descriptions(inner), Some(variant));
            }
        }
    }

    #[test]
    fn test_every_model_has_all() {
        for model in Model::ALL {
            assert!(is_allowed(model, Variant::All), "{model}");
            assert!(is_allowed(model, Variant::InSet), "{model}");
        }
        assert!(!is_allowed(Model::License, Variant::PatternSearch));
        assert!(!is_allowed(Model::Name, Variant::WithObservationsOfName));
    }
}
