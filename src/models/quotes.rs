use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Quote {
    #[serde(default, alias = "title")]
    pub text: String,

    #[serde(default)]
    pub category: String,
}

impl Quote {
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
        }
    }

    pub fn category_label(&self) -> &str {
        category_label(&self.category)
    }
}

// server quotes arrive without a category.
pub fn category_label(category: &str) -> &str {
    if category.is_empty() {
        CategoryFilter::UNCATEGORIZED
    } else {
        category
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" - {}", self.text, self.category_label())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(String),
}

impl CategoryFilter {
    pub const ALL: &'static str = "all";
    pub const UNCATEGORIZED: &'static str = "uncategorized";

    pub fn matches(&self, quote: &Quote) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Category(category) => quote.category == *category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.is_empty() || s == Self::ALL {
            Ok(CategoryFilter::All)
        } else if s == Self::UNCATEGORIZED {
            Ok(CategoryFilter::Category(String::new()))
        } else {
            Ok(CategoryFilter::Category(s.to_string()))
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str(Self::ALL),
            CategoryFilter::Category(category) => f.write_str(category_label(category)),
        }
    }
}
