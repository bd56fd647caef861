//! Blueprint eligibility policy
//!
//! `t1` keeps Tech I modules, charges and drones. `full` keeps every
//! blueprint with a published product and also captures the copying,
//! invention and research activities.

use std::collections::BTreeSet;
use std::fmt;

use clap::ValueEnum;
use regex::Regex;
use serde::Serialize;

use crate::models::{MetaGroup, TypeId, TypeRecord};

pub const CATEGORY_MODULE: TypeId = 7;
pub const CATEGORY_CHARGE: TypeId = 8;
pub const CATEGORY_DRONE: TypeId = 18;

/// meta_groups: 1 = Tech I, 2 = Tech II, ...
pub const META_GROUP_TECH_I: TypeId = 1;

const ADVANCED_TIER_NUMERALS: &str = r"\b(II|III|IV|V|VI|VII|VIII|IX|X)\b";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Tech I modules, charges and drones; manufacturing only
    #[default]
    T1,
    /// Every published blueprint with all activities
    Full,
}

impl Mode {
    pub fn captures_extra_activities(self) -> bool {
        self == Mode::Full
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::T1 => write!(f, "t1"),
            Mode::Full => write!(f, "full"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterPolicy {
    pub mode: Mode,
    pub allowed_categories: BTreeSet<TypeId>,
    pub required_meta_group: TypeId,
    /// Fallback tier check for products without a meta group
    pub advanced_tier_pattern: Regex,
}

impl FilterPolicy {
    pub fn for_mode(mode: Mode) -> Self {
        FilterPolicy {
            mode,
            allowed_categories: BTreeSet::from([CATEGORY_MODULE, CATEGORY_CHARGE, CATEGORY_DRONE]),
            required_meta_group: META_GROUP_TECH_I,
            advanced_tier_pattern: Regex::new(ADVANCED_TIER_NUMERALS)
                .expect("tier numeral pattern is valid"),
        }
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = TypeId>) -> Self {
        self.allowed_categories = categories.into_iter().collect();
        self
    }

    pub fn with_meta_group(mut self, meta_group: TypeId) -> Self {
        self.required_meta_group = meta_group;
        self
    }

    /// Decide whether a blueprint producing `product` is kept.
    ///
    /// The caller has already checked that the product exists and is
    /// published.
    pub fn is_eligible(&self, product: &TypeRecord) -> bool {
        if self.mode == Mode::Full {
            return true;
        }

        match product.category_id {
            Some(category) if self.allowed_categories.contains(&category) => {}
            _ => return false,
        }

        match product.meta_group_id {
            Some(MetaGroup::Id(meta_group)) => meta_group == self.required_meta_group,
            Some(MetaGroup::Unparsable) => true,
            None => !self.advanced_tier_pattern.is_match(&product.name),
        }
    }
}

impl Default for FilterPolicy {
    fn default() -> Self {
        FilterPolicy::for_mode(Mode::default())
    }
}
