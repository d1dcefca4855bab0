use serde::{Deserialize, Serialize};

/// XPath locators for the map-search markup.
///
/// Every component takes its locators from here, so a markup change is a
/// configuration change. Defaults target Google Maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selectors {
    #[serde(default = "default_search_bar")]
    pub search_bar: String,

    /// Every entry currently loaded in the result feed
    #[serde(default = "default_result_items")]
    pub result_items: String,

    /// Anchors inside the feed that may point to a detail view
    #[serde(default = "default_result_links")]
    pub result_links: String,

    #[serde(default = "default_place_name")]
    pub place_name: String,

    #[serde(default = "default_place_type")]
    pub place_type: String,

    #[serde(default = "default_place_address")]
    pub place_address: String,

    #[serde(default = "default_place_website")]
    pub place_website: String,

    #[serde(default = "default_place_phone")]
    pub place_phone: String,

    #[serde(default = "default_place_plus_code")]
    pub place_plus_code: String,

    #[serde(default = "default_review_stars")]
    pub review_stars: String,

    #[serde(default = "default_review_count")]
    pub review_count: String,

    /// Scrollable container of the detail view
    #[serde(default = "default_detail_pane")]
    pub detail_pane: String,

    /// Embedded frame hosting the outbound link entries
    #[serde(default = "default_overlay_frame")]
    pub overlay_frame: String,

    /// Clickable link entries, relative to the overlay frame document
    #[serde(default = "default_overlay_entries")]
    pub overlay_entries: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            search_bar: default_search_bar(),
            result_items: default_result_items(),
            result_links: default_result_links(),
            place_name: default_place_name(),
            place_type: default_place_type(),
            place_address: default_place_address(),
            place_website: default_place_website(),
            place_phone: default_place_phone(),
            place_plus_code: default_place_plus_code(),
            review_stars: default_review_stars(),
            review_count: default_review_count(),
            detail_pane: default_detail_pane(),
            overlay_frame: default_overlay_frame(),
            overlay_entries: default_overlay_entries(),
        }
    }
}

fn default_search_bar() -> String {
    "//input[@id='searchboxinput']".into()
}

fn default_result_items() -> String {
    "//div[@role='feed']/*".into()
}

fn default_result_links() -> String {
    "//div[@role='feed']//div//a[contains(@href, '/place/')]".into()
}

fn default_place_name() -> String {
    "//h1".into()
}

fn default_place_type() -> String {
    "(//h1/following::div[1]//button)[1]".into()
}

fn default_place_address() -> String {
    "(//button[@data-item-id = 'address']//div)[4]".into()
}

fn default_place_website() -> String {
    "(//*[@aria-label[contains(., 'Website')]]//div)[4]".into()
}

fn default_place_phone() -> String {
    "(//*[@aria-label[contains(., 'Phone')]]//div)[4]".into()
}

fn default_place_plus_code() -> String {
    "(//button[@aria-label[contains(., 'Plus code')]]//div)[4]".into()
}

fn default_review_stars() -> String {
    "//span[@role='img' and contains(@aria-label, 'stars')]/preceding-sibling::span[1]".into()
}

fn default_review_count() -> String {
    "//span[@aria-label[contains(., 'reviews')]]".into()
}

fn default_detail_pane() -> String {
    "(//div[@jsaction = 'focus:scrollable.focus; blur:scrollable.blur'])[6]".into()
}

fn default_overlay_frame() -> String {
    "(//iframe)[1]".into()
}

fn default_overlay_entries() -> String {
    "//body//div[@role='button']//span[@role='text']".into()
}
