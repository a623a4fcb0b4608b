use std::sync::LazyLock;

use crate::models::quotes::Quote;

pub mod sync;
pub mod version;

pub static POISE_VERSION: &str = "0.6.1";
pub static STARTUP_TIME: LazyLock<std::time::SystemTime> =
    LazyLock::new(std::time::SystemTime::now);

pub static QUOTES_KEY: &str = "quotes";
pub static SELECTED_CATEGORY_KEY: &str = "selectedCategory";
pub static LAST_VIEWED_QUOTE_KEY: &str = "lastViewedQuote";
pub static LAST_SYNC_KEY: &str = "lastSync";

pub static SEED_QUOTES: LazyLock<Vec<Quote>> = LazyLock::new(|| {
    vec![
        Quote::new(
            "The only limit to our realization of tomorrow is our doubts of today.",
            "Motivation",
        ),
        Quote::new(
            "Life is 10% what happens to us and 90% how we react to it.",
            "Life",
        ),
    ]
});
