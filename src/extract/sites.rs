use scraper::{Html, Selector};

/// Per-retailer extraction strategy. One implementation per retailer family;
/// adding a retailer means adding one strategy and registering it.
pub trait SiteStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this strategy handles the given (lowercased) URL host.
    fn matches(&self, host: &str) -> bool;

    fn extract_title(&self, document: &Html) -> Option<String>;

    /// Raw price text as it appears on the page; numeric normalization
    /// happens in the extractor.
    fn extract_price_text(&self, document: &Html) -> Option<String>;
}

/// Host-pattern keyed registry of site strategies.
pub struct SiteRegistry {
    strategies: Vec<Box<dyn SiteStrategy>>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Registry with the built-in retailer families.
    pub fn with_default_sites() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(AmazonStrategy));
        registry.register(Box::new(FlipkartStrategy));
        registry.register(Box::new(MyntraStrategy));
        registry
    }

    pub fn register(&mut self, strategy: Box<dyn SiteStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn strategy_for(&self, host: &str) -> Option<&dyn SiteStrategy> {
        self.strategies
            .iter()
            .find(|s| s.matches(host))
            .map(|s| s.as_ref())
    }

    pub fn supports(&self, host: &str) -> bool {
        self.strategy_for(host).is_some()
    }

    pub fn site_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::with_default_sites()
    }
}

/// First non-empty text content matched by any of the selectors, in order.
fn first_text(document: &Html, selectors: &[&str]) -> Option<String> {
    for selector in selectors {
        let Ok(parsed) = Selector::parse(selector) else {
            continue;
        };
        if let Some(element) = document.select(&parsed).next() {
            let text = element
                .text()
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

pub struct AmazonStrategy;

impl SiteStrategy for AmazonStrategy {
    fn name(&self) -> &str {
        "amazon"
    }

    fn matches(&self, host: &str) -> bool {
        host.contains("amazon.")
    }

    fn extract_title(&self, document: &Html) -> Option<String> {
        first_text(document, &["#productTitle", "h1#title span"])
    }

    fn extract_price_text(&self, document: &Html) -> Option<String> {
        first_text(
            document,
            &[
                "#corePrice_feature_div .a-offscreen",
                ".a-price .a-offscreen",
                ".a-price-whole",
            ],
        )
    }
}

pub struct FlipkartStrategy;

impl SiteStrategy for FlipkartStrategy {
    fn name(&self) -> &str {
        "flipkart"
    }

    fn matches(&self, host: &str) -> bool {
        host.ends_with("flipkart.com")
    }

    fn extract_title(&self, document: &Html) -> Option<String> {
        first_text(document, &["span.B_NuCI", "h1.yhB1nd"])
    }

    fn extract_price_text(&self, document: &Html) -> Option<String> {
        first_text(document, &["div._30jeq3._16Jk6d", "div._30jeq3"])
    }
}

pub struct MyntraStrategy;

impl SiteStrategy for MyntraStrategy {
    fn name(&self) -> &str {
        "myntra"
    }

    fn matches(&self, host: &str) -> bool {
        host.ends_with("myntra.com")
    }

    fn extract_title(&self, document: &Html) -> Option<String> {
        first_text(document, &["h1.pdp-title", "h1.pdp-name"])
    }

    fn extract_price_text(&self, document: &Html) -> Option<String> {
        first_text(document, &["span.pdp-price strong", "span.pdp-price"])
    }
}

/// Configurable strategy for deployments tracking shops without a dedicated
/// implementation. Hosts are matched by substring.
pub struct SelectorStrategy {
    name: String,
    host_patterns: Vec<String>,
    title_selectors: Vec<String>,
    price_selectors: Vec<String>,
}

impl SelectorStrategy {
    pub fn new(
        name: impl Into<String>,
        host_patterns: Vec<String>,
        title_selectors: Vec<String>,
        price_selectors: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host_patterns,
            title_selectors,
            price_selectors,
        }
    }
}

impl SiteStrategy for SelectorStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, host: &str) -> bool {
        self.host_patterns.iter().any(|p| host.contains(p.as_str()))
    }

    fn extract_title(&self, document: &Html) -> Option<String> {
        let selectors: Vec<&str> = self.title_selectors.iter().map(String::as_str).collect();
        first_text(document, &selectors)
    }

    fn extract_price_text(&self, document: &Html) -> Option<String> {
        let selectors: Vec<&str> = self.price_selectors.iter().map(String::as_str).collect();
        first_text(document, &selectors)
    }
}
