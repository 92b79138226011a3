//! TTL Policy Module
//!
//! How long each kind of stock data stays cached, and the keys it is cached
//! under. The cache itself stores whatever TTL it is given; this is the
//! policy the data-fetch layer applies.

use std::fmt;
use std::time::Duration;

// == Cache Category ==
/// The kinds of upstream data that get cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheCategory {
    /// Trending tickers list
    Trending,
    /// Top gainers list
    Gainers,
    /// Top losers list
    Losers,
    /// Symbol search results
    Search,
    /// Live quote for one symbol
    Quote,
    /// Historical price series
    Chart,
    /// Generated commentary for one symbol
    AiInsights,
}

impl CacheCategory {
    /// Validity window for data of this category.
    pub const fn ttl(self) -> Duration {
        match self {
            CacheCategory::Trending | CacheCategory::Gainers | CacheCategory::Losers => {
                Duration::from_secs(10 * 60)
            }
            CacheCategory::Quote => Duration::from_secs(5 * 60),
            CacheCategory::Search | CacheCategory::Chart => Duration::from_secs(15 * 60),
            CacheCategory::AiInsights => Duration::from_secs(24 * 60 * 60),
        }
    }

    /// Key prefix used for this category.
    pub const fn prefix(self) -> &'static str {
        match self {
            CacheCategory::Trending => "trending",
            CacheCategory::Gainers => "gainers",
            CacheCategory::Losers => "losers",
            CacheCategory::Search => "search",
            CacheCategory::Quote => "quote",
            CacheCategory::Chart => "chart",
            CacheCategory::AiInsights => "ai_insights",
        }
    }
}

// == Cache Key ==
/// A caller key paired with the category that decides its TTL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    category: CacheCategory,
    key: String,
}

impl CacheKey {
    fn build(category: CacheCategory, parts: &[&str]) -> Self {
        let mut key = category.prefix().to_string();
        for part in parts {
            key.push('_');
            key.push_str(part);
        }
        Self { category, key }
    }

    /// `trending_{count}`
    pub fn trending(count: usize) -> Self {
        Self::build(CacheCategory::Trending, &[&count.to_string()])
    }

    /// `gainers_{count}`
    pub fn gainers(count: usize) -> Self {
        Self::build(CacheCategory::Gainers, &[&count.to_string()])
    }

    /// `losers_{count}`
    pub fn losers(count: usize) -> Self {
        Self::build(CacheCategory::Losers, &[&count.to_string()])
    }

    /// `search_{query}`, with the query kept verbatim.
    pub fn search(query: &str) -> Self {
        Self::build(CacheCategory::Search, &[query])
    }

    /// `quote_{symbol}`
    pub fn quote(symbol: &str) -> Self {
        Self::build(CacheCategory::Quote, &[symbol])
    }

    /// `chart_{symbol}_{range}_{interval}`
    pub fn chart(symbol: &str, range: &str, interval: &str) -> Self {
        Self::build(CacheCategory::Chart, &[symbol, range, interval])
    }

    /// `ai_insights_{symbol}`
    pub fn ai_insights(symbol: &str) -> Self {
        Self::build(CacheCategory::AiInsights, &[symbol])
    }

    pub fn category(&self) -> CacheCategory {
        self.category
    }

    pub fn ttl(&self) -> Duration {
        self.category.ttl()
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
